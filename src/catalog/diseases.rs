//! Disease term catalog construction.
//!
//! Diseases come from two sources: OMIM (`genemap2.txt` phenotypes joined
//! with `phenotype.hpoa`) and Orphanet (`product6` gene associations,
//! `product4` HPO associations, `product9` inheritance).  Both are merged by
//! disease id; ids appearing in both sources union their sets.

use indexmap::{IndexMap, IndexSet};

use crate::catalog::genes::GeneIndex;
use crate::catalog::omim::GenemapEntry;

/// One disease term, keyed by `SOURCE:nnnnnn`.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DiseaseTerm {
    /// Full id, e.g. `OMIM:615349` or `ORPHA:558`.
    pub disease_id: String,
    /// Source catalog, `OMIM`, `ORPHA`, or `DECIPHER`.
    pub source: String,
    /// Numeric id within the source.
    pub disease_nr: u32,
    /// Description of the disease.
    pub description: String,
    /// Abbreviated inheritance models.
    pub inheritance: IndexSet<String>,
    /// Associated HPO term ids.
    pub hpo_terms: IndexSet<String>,
    /// Associated HGNC gene ids.
    pub genes: IndexSet<u32>,
}

/// The assembled disease catalog.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct DiseaseIndex {
    /// Disease terms by full id.
    pub terms: IndexMap<String, DiseaseTerm>,
}

impl DiseaseIndex {
    /// Look up a disease by full id.
    pub fn term(&self, disease_id: &str) -> Option<&DiseaseTerm> {
        self.terms.get(disease_id)
    }
}

/// Code for accessing the `phenotype.hpoa` annotation file.
pub mod hpoa {
    /// Data structure for representing an entry of the table.
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    pub struct Entry {
        /// Disease id, e.g. `OMIM:615349`.
        pub database_id: String,
        /// Disease name.
        pub disease_name: String,
        /// Qualifier; `NOT` negates the association.
        #[serde(default)]
        pub qualifier: Option<String>,
        /// HPO term id.
        pub hpo_id: String,
    }

    /// Read the `phenotype.hpoa` file using the `csv` crate via serde.
    ///
    /// Leading `#` comment lines are skipped.
    pub fn load_entries<P: AsRef<std::path::Path>>(path: &P) -> Result<Vec<Entry>, anyhow::Error> {
        let reader = crate::common::io::open_read_maybe_gz(path.as_ref())?;
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .comment(Some(b'#'))
            .from_reader(reader);
        let mut entries = Vec::new();
        for result in rdr.deserialize() {
            let entry: Entry = result?;
            entries.push(entry);
        }
        Ok(entries)
    }
}

/// Build OMIM disease terms from genemap phenotypes and HPOA annotations.
///
/// OMIM rows carry gene *symbols*; they are resolved to HGNC ids through the
/// gene index, unresolved symbols are warned about and skipped.
pub fn from_omim(
    genemap_entries: &[GenemapEntry],
    hpoa_entries: &[hpoa::Entry],
    gene_index: &GeneIndex,
) -> Vec<DiseaseTerm> {
    let mut terms: IndexMap<String, DiseaseTerm> = IndexMap::new();

    for entry in genemap_entries {
        let hgnc_id = entry
            .approved_symbol
            .as_deref()
            .and_then(|symbol| {
                let resolved = gene_index.resolve_symbol(symbol);
                if resolved.is_none() {
                    tracing::warn!("could not resolve OMIM gene symbol {}", symbol);
                }
                resolved
            });
        for phenotype in &entry.phenotypes {
            let disease_id = format!("OMIM:{}", phenotype.mim_number);
            let term = terms
                .entry(disease_id.clone())
                .or_insert_with(|| DiseaseTerm {
                    disease_id,
                    source: String::from("OMIM"),
                    disease_nr: phenotype.mim_number,
                    description: phenotype.description.clone(),
                    ..Default::default()
                });
            term.inheritance.extend(phenotype.inheritance.iter().cloned());
            if let Some(hgnc_id) = hgnc_id {
                term.genes.insert(hgnc_id);
            }
        }
    }

    for entry in hpoa_entries {
        if entry.qualifier.as_deref() == Some("NOT") {
            continue;
        }
        if let Some(term) = terms.get_mut(&entry.database_id) {
            term.hpo_terms.insert(entry.hpo_id.clone());
        }
    }

    terms.into_values().collect()
}

/// Code for parsing the Orphanet XML product files.
pub mod orpha {
    use indexmap::{IndexMap, IndexSet};
    use quick_xml::events::Event;

    /// Error type for Orphanet XML parsing.
    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("XML error: {0}")]
        Xml(#[from] quick_xml::Error),
        #[error("invalid OrphaCode: {0}")]
        InvalidOrphaCode(String),
    }

    /// State shared by the three product parsers.
    struct DisorderWalker<'a> {
        reader: quick_xml::Reader<&'a [u8]>,
        buf: Vec<u8>,
    }

    impl<'a> DisorderWalker<'a> {
        fn new(xml: &'a str) -> Self {
            Self {
                reader: quick_xml::Reader::from_str(xml),
                buf: Vec::new(),
            }
        }

        fn next_event(&mut self) -> Result<Event<'static>, Error> {
            self.buf.clear();
            Ok(self.reader.read_event_into(&mut self.buf)?.into_owned())
        }
    }

    fn element_name(event: &quick_xml::events::BytesStart<'_>) -> String {
        String::from_utf8_lossy(event.name().as_ref()).into_owned()
    }

    fn text_of(event: &quick_xml::events::BytesText<'_>) -> Result<String, Error> {
        Ok(event.unescape()?.trim().to_string())
    }

    /// Per-disorder data collected from any of the product files.
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct Disorder {
        /// Orpha code.
        pub orpha_code: u32,
        /// Disorder name.
        pub name: String,
        /// HGNC ids (product6).
        pub hgnc_ids: IndexSet<u32>,
        /// HPO term ids (product4).
        pub hpo_terms: IndexSet<String>,
        /// Inheritance names (product9).
        pub inheritance: IndexSet<String>,
    }

    /// Parse any Orphanet product XML into per-disorder records.
    ///
    /// The product files share their skeleton: `Disorder` elements with an
    /// `OrphaCode` and `Name`, plus product-specific association lists.  The
    /// walker collects HGNC references (`ExternalReference` with `Source`
    /// `HGNC`), `HPOId` elements, and `TypeOfInheritance` names wherever
    /// they occur.
    pub fn parse_product(xml: &str) -> Result<IndexMap<u32, Disorder>, Error> {
        let mut walker = DisorderWalker::new(xml);
        let mut result: IndexMap<u32, Disorder> = IndexMap::new();

        let mut current: Option<Disorder> = None;
        let mut path: Vec<String> = Vec::new();
        let mut reference_source = String::new();

        loop {
            match walker.next_event()? {
                Event::Start(start) => {
                    let name = element_name(&start);
                    if name == "Disorder" {
                        current = Some(Disorder::default());
                    }
                    path.push(name);
                }
                Event::End(_) => {
                    if path.pop().as_deref() == Some("Disorder") {
                        if let Some(disorder) = current.take() {
                            if disorder.orpha_code != 0 {
                                result
                                    .entry(disorder.orpha_code)
                                    .or_insert(disorder);
                            }
                        }
                    }
                }
                Event::Text(text) => {
                    let value = text_of(&text)?;
                    if value.is_empty() {
                        continue;
                    }
                    let element = path.last().map(|s| s.as_str()).unwrap_or_default();
                    let disorder = match current.as_mut() {
                        Some(disorder) => disorder,
                        None => continue,
                    };
                    match element {
                        "OrphaCode" => {
                            if disorder.orpha_code == 0 {
                                disorder.orpha_code = value
                                    .parse()
                                    .map_err(|_| Error::InvalidOrphaCode(value.clone()))?;
                            }
                        }
                        "Name" => {
                            let parent =
                                path.iter().rev().nth(1).map(|s| s.as_str()).unwrap_or("");
                            if parent == "Disorder" && disorder.name.is_empty() {
                                disorder.name = value;
                            } else if parent == "TypeOfInheritance" {
                                disorder.inheritance.insert(value);
                            }
                        }
                        "Source" => {
                            reference_source = value;
                        }
                        "Reference" => {
                            if reference_source == "HGNC" {
                                if let Ok(hgnc_id) = value.parse::<u32>() {
                                    disorder.hgnc_ids.insert(hgnc_id);
                                }
                            }
                        }
                        "HPOId" => {
                            disorder.hpo_terms.insert(value);
                        }
                        _ => {}
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(result)
    }

    /// Load and parse one Orphanet product file.
    pub fn load_product<P: AsRef<std::path::Path>>(
        path: &P,
    ) -> Result<IndexMap<u32, Disorder>, anyhow::Error> {
        let xml = crate::common::io::read_to_string_maybe_gz(path.as_ref()).map_err(|e| {
            anyhow::anyhow!("could not read {}: {}", path.as_ref().display(), e)
        })?;
        parse_product(&xml).map_err(|e| {
            anyhow::anyhow!("problem parsing {}: {}", path.as_ref().display(), e)
        })
    }

    /// Mapping from Orphanet inheritance names to the catalog abbreviations.
    pub fn abbreviate_inheritance(name: &str) -> Option<&'static str> {
        match name {
            "Autosomal dominant" => Some("AD"),
            "Autosomal recessive" => Some("AR"),
            "X-linked dominant" => Some("XD"),
            "X-linked recessive" => Some("XR"),
            "Y-linked" => Some("Y"),
            "Mitochondrial inheritance" => Some("MT"),
            _ => None,
        }
    }
}

/// Build ORPHA disease terms from the three parsed product files.
///
/// ORPHA rows carry HGNC *ids* directly, so no symbol resolution is needed.
pub fn from_orpha(
    genes: &IndexMap<u32, orpha::Disorder>,
    hpo: &IndexMap<u32, orpha::Disorder>,
    inheritance: &IndexMap<u32, orpha::Disorder>,
) -> Vec<DiseaseTerm> {
    let mut terms: IndexMap<String, DiseaseTerm> = IndexMap::new();

    let codes: IndexSet<u32> = genes.keys().chain(hpo.keys()).copied().collect();
    for orpha_code in codes {
        let disease_id = format!("ORPHA:{}", orpha_code);
        let mut term = DiseaseTerm {
            disease_id: disease_id.clone(),
            source: String::from("ORPHA"),
            disease_nr: orpha_code,
            ..Default::default()
        };
        if let Some(disorder) = genes.get(&orpha_code) {
            term.description = disorder.name.clone();
            term.genes.extend(disorder.hgnc_ids.iter().copied());
        }
        if let Some(disorder) = hpo.get(&orpha_code) {
            if term.description.is_empty() {
                term.description = disorder.name.clone();
            }
            term.hpo_terms.extend(disorder.hpo_terms.iter().cloned());
        }
        if let Some(disorder) = inheritance.get(&orpha_code) {
            term.inheritance.extend(
                disorder
                    .inheritance
                    .iter()
                    .filter_map(|name| orpha::abbreviate_inheritance(name))
                    .map(String::from),
            );
        }
        terms.insert(disease_id, term);
    }

    terms.into_values().collect()
}

/// Merge disease terms from all sources into one index.
///
/// Terms with the same id union their HPO, gene, and inheritance sets.
pub fn merge_diseases(sources: Vec<Vec<DiseaseTerm>>) -> DiseaseIndex {
    let mut terms: IndexMap<String, DiseaseTerm> = IndexMap::new();
    for source in sources {
        for term in source {
            match terms.entry(term.disease_id.clone()) {
                indexmap::map::Entry::Vacant(entry) => {
                    entry.insert(term);
                }
                indexmap::map::Entry::Occupied(mut entry) => {
                    let existing = entry.get_mut();
                    existing.hpo_terms.extend(term.hpo_terms);
                    existing.genes.extend(term.genes);
                    existing.inheritance.extend(term.inheritance);
                    if existing.description.is_empty() {
                        existing.description = term.description;
                    }
                }
            }
        }
    }
    DiseaseIndex { terms }
}
