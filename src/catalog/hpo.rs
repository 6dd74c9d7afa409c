//! HPO term catalog construction.
//!
//! Parses the `hp.obo` ontology file, computes ancestor closures, and joins
//! `phenotype_to_genes.txt` through the gene index to associate HGNC ids
//! with terms.

use indexmap::{IndexMap, IndexSet};

use crate::catalog::genes::GeneIndex;

/// The ontology root; excluded from all ancestor closures.
pub const HPO_ROOT: &str = "HP:0000001";

/// One HPO term.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HpoTerm {
    /// Term id, e.g. `HP:0001250`.
    pub hpo_id: String,
    /// Term name.
    pub description: String,
    /// Alternative ids.
    pub aliases: Vec<String>,
    /// Direct `is_a` parents.
    pub ancestors: IndexSet<String>,
    /// Transitive closure of `ancestors`, excluding the root.
    pub all_ancestors: IndexSet<String>,
    /// Direct children (inverted `is_a`).
    pub children: IndexSet<String>,
    /// Associated HGNC gene ids.
    pub genes: IndexSet<u32>,
}

/// The assembled HPO catalog.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct HpoIndex {
    /// Terms by id.
    pub terms: IndexMap<String, HpoTerm>,
}

impl HpoIndex {
    /// Look up a term by id.
    pub fn term(&self, hpo_id: &str) -> Option<&HpoTerm> {
        self.terms.get(hpo_id)
    }
}

/// Error type for OBO parsing.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("problem reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: term block without id")]
    TermWithoutId { path: String },
}

/// Parse the OBO 1.2 subset used by `hp.obo`.
///
/// Only `[Term]` blocks with `id:`, `name:`, `alt_id:`, and `is_a:` tags are
/// interpreted; `[Typedef]` blocks and unknown tags are skipped.
pub fn parse_obo(content: &str, path: &str) -> Result<Vec<HpoTerm>, Error> {
    let mut terms = Vec::new();
    let mut current: Option<HpoTerm> = None;
    let mut in_term = false;

    for line in content.lines() {
        let line = line.trim();
        if line == "[Term]" {
            if let Some(term) = current.take() {
                terms.push(term);
            }
            current = Some(HpoTerm::default());
            in_term = true;
            continue;
        }
        if line.starts_with('[') {
            // [Typedef] or other stanza
            if let Some(term) = current.take() {
                terms.push(term);
            }
            in_term = false;
            continue;
        }
        if !in_term {
            continue;
        }
        let term = current.as_mut().expect("in_term implies current term");
        if let Some(value) = line.strip_prefix("id: ") {
            term.hpo_id = value.to_string();
        } else if let Some(value) = line.strip_prefix("name: ") {
            term.description = value.to_string();
        } else if let Some(value) = line.strip_prefix("alt_id: ") {
            term.aliases.push(value.to_string());
        } else if let Some(value) = line.strip_prefix("is_a: ") {
            // `is_a: HP:0000118 ! Phenotypic abnormality`
            let parent = value.split(" ! ").next().unwrap_or(value).trim();
            term.ancestors.insert(parent.to_string());
        }
    }
    if let Some(term) = current.take() {
        terms.push(term);
    }

    if terms.iter().any(|term| term.hpo_id.is_empty()) {
        return Err(Error::TermWithoutId {
            path: path.to_string(),
        });
    }
    Ok(terms)
}

/// Load and parse an `hp.obo` file.
pub fn load_obo<P: AsRef<std::path::Path>>(path: &P) -> Result<Vec<HpoTerm>, Error> {
    let path_str = path.as_ref().display().to_string();
    let content =
        crate::common::io::read_to_string_maybe_gz(path.as_ref()).map_err(|source| Error::Io {
            path: path_str.clone(),
            source,
        })?;
    parse_obo(&content, &path_str)
}

/// Compute the reflexive-transitive ancestor closure of one term.
///
/// The DFS keeps an explicit visited set so that accidental `is_a` cycles
/// terminate; the term itself and the ontology root are excluded from the
/// result.
fn ancestor_closure(start: &str, terms: &IndexMap<String, HpoTerm>) -> IndexSet<String> {
    let mut result = IndexSet::new();
    let mut visited = IndexSet::new();
    let mut stack: Vec<String> = terms
        .get(start)
        .map(|term| term.ancestors.iter().cloned().collect())
        .unwrap_or_default();

    while let Some(current) = stack.pop() {
        if !visited.insert(current.clone()) {
            continue;
        }
        if current == HPO_ROOT || current == start {
            continue;
        }
        if let Some(term) = terms.get(&current) {
            stack.extend(term.ancestors.iter().cloned());
        }
        result.insert(current);
    }
    result
}

/// Build the HPO index: invert `is_a` into `children` and fill closures.
pub fn build_hpo_index(parsed: Vec<HpoTerm>) -> HpoIndex {
    let mut terms: IndexMap<String, HpoTerm> = parsed
        .into_iter()
        .map(|term| (term.hpo_id.clone(), term))
        .collect();

    let child_edges: Vec<(String, String)> = terms
        .values()
        .flat_map(|term| {
            term.ancestors
                .iter()
                .map(|parent| (parent.clone(), term.hpo_id.clone()))
                .collect::<Vec<_>>()
        })
        .collect();
    for (parent, child) in child_edges {
        if let Some(parent_term) = terms.get_mut(&parent) {
            parent_term.children.insert(child);
        }
    }

    let closures: Vec<(String, IndexSet<String>)> = terms
        .keys()
        .map(|hpo_id| (hpo_id.clone(), ancestor_closure(hpo_id, &terms)))
        .collect();
    for (hpo_id, closure) in closures {
        if let Some(term) = terms.get_mut(&hpo_id) {
            term.all_ancestors = closure;
        }
    }

    HpoIndex { terms }
}

/// Code for accessing the `phenotype_to_genes.txt` file.
pub mod phenotype_to_genes {
    /// Data structure for representing an entry of the table.
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    #[serde_with::skip_serializing_none]
    pub struct Entry {
        /// HPO id.
        pub hpo_id: String,
        /// HPO term name.
        pub hpo_name: String,
        /// Entrez gene id.
        #[serde(alias = "entrez_id")]
        pub ncbi_gene_id: Option<u32>,
        /// Gene symbol.
        pub gene_symbol: String,
        /// Annotation source.
        #[serde(default)]
        pub source: Option<String>,
        /// Disease id the association came from.
        #[serde(default)]
        pub disease_id: Option<String>,
    }

    /// Read the `phenotype_to_genes.txt` file using the `csv` crate via serde.
    pub fn load_entries<P: AsRef<std::path::Path>>(path: &P) -> Result<Vec<Entry>, anyhow::Error> {
        let reader = crate::common::io::open_read_maybe_gz(path.as_ref())?;
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let mut entries = Vec::new();
        for result in rdr.deserialize() {
            let entry: Entry = result?;
            entries.push(entry);
        }
        Ok(entries)
    }
}

/// Associate genes with HPO terms through the gene index (by symbol).
///
/// Symbols that cannot be resolved are warned about and skipped.
pub fn associate_genes(
    index: &mut HpoIndex,
    entries: &[phenotype_to_genes::Entry],
    gene_index: &GeneIndex,
) {
    for entry in entries {
        let hgnc_id = match gene_index.resolve_symbol(&entry.gene_symbol) {
            Some(hgnc_id) => hgnc_id,
            None => {
                tracing::warn!(
                    "could not resolve gene symbol {} for term {}",
                    entry.gene_symbol,
                    entry.hpo_id
                );
                continue;
            }
        };
        if let Some(term) = index.terms.get_mut(&entry.hpo_id) {
            term.genes.insert(hgnc_id);
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    const EXAMPLE_OBO: &str = "\
format-version: 1.2

[Term]
id: HP:0000001
name: All

[Term]
id: HP:0000118
name: Phenotypic abnormality
is_a: HP:0000001 ! All

[Term]
id: HP:0000707
name: Abnormality of the nervous system
alt_id: HP:0001333
is_a: HP:0000118 ! Phenotypic abnormality

[Term]
id: HP:0001250
name: Seizure
is_a: HP:0000707 ! Abnormality of the nervous system

[Typedef]
id: part_of
name: part of
";

    fn example_index() -> HpoIndex {
        let terms = parse_obo(EXAMPLE_OBO, "hp.obo").expect("parsing should succeed");
        build_hpo_index(terms)
    }

    #[test]
    fn parse_obo_terms() -> Result<(), Error> {
        let terms = parse_obo(EXAMPLE_OBO, "hp.obo")?;
        assert_eq!(terms.len(), 4);
        assert_eq!(terms[2].hpo_id, "HP:0000707");
        assert_eq!(terms[2].description, "Abnormality of the nervous system");
        assert_eq!(terms[2].aliases, vec![String::from("HP:0001333")]);
        assert!(terms[2].ancestors.contains("HP:0000118"));
        Ok(())
    }

    #[test]
    fn closure_excludes_root_and_self() {
        let index = example_index();
        let seizure = index.term("HP:0001250").expect("term should exist");
        assert!(!seizure.all_ancestors.contains("HP:0001250"));
        assert!(!seizure.all_ancestors.contains(HPO_ROOT));
        assert!(seizure.all_ancestors.contains("HP:0000707"));
        assert!(seizure.all_ancestors.contains("HP:0000118"));
    }

    #[test]
    fn closure_contains_direct_ancestors() {
        let index = example_index();
        for term in index.terms.values() {
            for parent in term.ancestors.iter().filter(|p| p.as_str() != HPO_ROOT) {
                assert!(
                    term.all_ancestors.contains(parent),
                    "{} missing direct ancestor {}",
                    term.hpo_id,
                    parent
                );
            }
        }
    }

    #[test]
    fn children_are_inverted_is_a() {
        let index = example_index();
        let nervous = index.term("HP:0000707").expect("term should exist");
        assert!(nervous.children.contains("HP:0001250"));
    }

    #[test]
    fn closure_terminates_on_cycle() {
        let mut a = HpoTerm {
            hpo_id: String::from("HP:0000002"),
            ..Default::default()
        };
        a.ancestors.insert(String::from("HP:0000003"));
        let mut b = HpoTerm {
            hpo_id: String::from("HP:0000003"),
            ..Default::default()
        };
        b.ancestors.insert(String::from("HP:0000002"));

        let index = build_hpo_index(vec![a, b]);
        let term = index.term("HP:0000002").expect("term should exist");
        // The cycle partner is an ancestor; the term itself is not.
        assert!(term.all_ancestors.contains("HP:0000003"));
        assert!(!term.all_ancestors.contains("HP:0000002"));
    }

    #[test]
    fn gene_association_via_alias_map() {
        let mut hpo_index = example_index();
        let gene_index = {
            let mut genes = indexmap::IndexMap::new();
            genes.insert(
                17978,
                crate::catalog::genes::GeneRecord {
                    hgnc_id: 17978,
                    hgnc_symbol: String::from("B3GALT6"),
                    ..Default::default()
                },
            );
            let mut alias_map = indexmap::IndexMap::new();
            alias_map.insert(
                String::from("B3GALT6"),
                crate::catalog::genes::AliasEntry {
                    true_id: Some(17978),
                    ids: vec![17978],
                },
            );
            GeneIndex {
                genes,
                alias_map,
                ..Default::default()
            }
        };
        let entries = vec![
            phenotype_to_genes::Entry {
                hpo_id: String::from("HP:0001250"),
                hpo_name: String::from("Seizure"),
                ncbi_gene_id: Some(126792),
                gene_symbol: String::from("B3GALT6"),
                source: None,
                disease_id: Some(String::from("OMIM:615349")),
            },
            phenotype_to_genes::Entry {
                hpo_id: String::from("HP:0001250"),
                hpo_name: String::from("Seizure"),
                ncbi_gene_id: None,
                gene_symbol: String::from("UNKNOWN_SYMBOL"),
                source: None,
                disease_id: None,
            },
        ];
        associate_genes(&mut hpo_index, &entries, &gene_index);
        let term = hpo_index.term("HP:0001250").expect("term should exist");
        assert_eq!(term.genes.iter().copied().collect::<Vec<_>>(), vec![17978]);
    }
}
