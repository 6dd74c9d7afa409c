//! Persistence contract and the in-memory reference backend.

use indexmap::IndexMap;

use crate::catalog::diseases::DiseaseTerm;
use crate::catalog::genes::{AliasEntry, GeneIndex, GeneRecord, TranscriptRecord};
use crate::catalog::hpo::{HpoIndex, HpoTerm};
use crate::query::Query;
use crate::variant::{Variant, VariantType};

/// Error type for store operations.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("variant {0} already stored; delete the scope before reloading")]
    DuplicateDocument(String),
    #[error("variant {0} not found")]
    NotFound(String),
}

/// The persistence operations the pipeline requires.
///
/// Backends translate the query structure; the in-memory implementation
/// evaluates it directly.
pub trait Store {
    /// Insert one parsed variant.
    fn insert_variant(&mut self, variant: Variant) -> Result<String, Error>;

    /// Insert a batch of parsed variants.
    fn insert_many_variants(&mut self, variants: Vec<Variant>) -> Result<usize, Error> {
        let mut inserted = 0;
        for variant in variants {
            self.insert_variant(variant)?;
            inserted += 1;
        }
        Ok(inserted)
    }

    /// Delete all variants of one `(case, variant_type)` scope.
    fn delete_variants(&mut self, case_id: &str, variant_type: VariantType) -> usize;

    /// Look up one variant by document id.
    fn variant(&self, document_id: &str) -> Option<&Variant>;

    /// All variants matching the query, ordered by `variant_rank` where
    /// assigned.
    fn variants(&self, query: &Query) -> Vec<&Variant>;

    /// Assign 1-based `variant_rank` by descending rank score over the
    /// finished `(case, variant_type)` set.
    fn update_variant_rank(&mut self, case_id: &str, variant_type: VariantType) -> usize;

    /// Neighbors of a variant by `variant_rank` within its scope.
    fn adjacent_variants(&self, document_id: &str) -> (Option<&Variant>, Option<&Variant>);

    /// Replace the gene catalog.
    fn load_gene_index(&mut self, index: GeneIndex);
    /// Replace the HPO catalog.
    fn load_hpo_index(&mut self, index: HpoIndex);
    /// Replace the disease catalog.
    fn load_disease_terms(&mut self, terms: Vec<DiseaseTerm>);

    /// Look up a gene by HGNC id.
    fn gene(&self, hgnc_id: u32) -> Option<&GeneRecord>;
    /// Look up the alias entry for a symbol.
    fn gene_by_alias(&self, symbol: &str) -> Option<&AliasEntry>;
    /// Look up a transcript by id.
    fn transcript(&self, transcript_id: &str) -> Option<&TranscriptRecord>;
    /// Look up an HPO term by id.
    fn hpo_term(&self, hpo_id: &str) -> Option<&HpoTerm>;
    /// Look up a disease term by full id.
    fn disease_term(&self, disease_id: &str) -> Option<&DiseaseTerm>;
}

/// In-memory store backing the CLI and the tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    variants: IndexMap<String, Variant>,
    genes: IndexMap<u32, GeneRecord>,
    aliases: IndexMap<String, AliasEntry>,
    transcripts: IndexMap<String, TranscriptRecord>,
    hpo_terms: IndexMap<String, HpoTerm>,
    disease_terms: IndexMap<String, DiseaseTerm>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored variants.
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    /// Whether the store holds no variants.
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    fn scope_document_ids(&self, case_id: &str, variant_type: VariantType) -> Vec<String> {
        self.variants
            .values()
            .filter(|variant| {
                variant.case_id == case_id && variant.variant_type == variant_type
            })
            .map(|variant| variant.document_id.clone())
            .collect()
    }
}

impl Store for MemoryStore {
    fn insert_variant(&mut self, variant: Variant) -> Result<String, Error> {
        let document_id = variant.document_id.clone();
        if self.variants.contains_key(&document_id) {
            return Err(Error::DuplicateDocument(document_id));
        }
        self.variants.insert(document_id.clone(), variant);
        Ok(document_id)
    }

    fn delete_variants(&mut self, case_id: &str, variant_type: VariantType) -> usize {
        let document_ids = self.scope_document_ids(case_id, variant_type);
        for document_id in &document_ids {
            self.variants.shift_remove(document_id);
        }
        document_ids.len()
    }

    fn variant(&self, document_id: &str) -> Option<&Variant> {
        self.variants.get(document_id)
    }

    fn variants(&self, query: &Query) -> Vec<&Variant> {
        let mut result: Vec<&Variant> = self
            .variants
            .values()
            .filter(|variant| query.matches(variant))
            .collect();
        result.sort_by_key(|variant| variant.variant_rank.unwrap_or(i64::MAX));
        result
    }

    fn update_variant_rank(&mut self, case_id: &str, variant_type: VariantType) -> usize {
        let mut document_ids = self.scope_document_ids(case_id, variant_type);
        // descending rank score; unscored variants go last
        document_ids.sort_by(|a, b| {
            let score = |id: &String| {
                self.variants
                    .get(id)
                    .and_then(|variant| variant.rank_score)
                    .unwrap_or(f64::NEG_INFINITY)
            };
            score(b)
                .partial_cmp(&score(a))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for (index, document_id) in document_ids.iter().enumerate() {
            if let Some(variant) = self.variants.get_mut(document_id) {
                variant.variant_rank = Some(index as i64 + 1);
            }
        }
        document_ids.len()
    }

    fn adjacent_variants(&self, document_id: &str) -> (Option<&Variant>, Option<&Variant>) {
        let current = match self.variants.get(document_id) {
            Some(variant) => variant,
            None => return (None, None),
        };
        let rank = match current.variant_rank {
            Some(rank) => rank,
            None => return (None, None),
        };
        let neighbor = |target: i64| {
            self.variants.values().find(|variant| {
                variant.case_id == current.case_id
                    && variant.variant_type == current.variant_type
                    && variant.variant_rank == Some(target)
            })
        };
        (neighbor(rank - 1), neighbor(rank + 1))
    }

    fn load_gene_index(&mut self, index: GeneIndex) {
        self.genes = index.genes;
        self.aliases = index.alias_map;
        self.transcripts = index.transcripts;
    }

    fn load_hpo_index(&mut self, index: HpoIndex) {
        self.hpo_terms = index.terms;
    }

    fn load_disease_terms(&mut self, terms: Vec<DiseaseTerm>) {
        self.disease_terms = terms
            .into_iter()
            .map(|term| (term.disease_id.clone(), term))
            .collect();
    }

    fn gene(&self, hgnc_id: u32) -> Option<&GeneRecord> {
        self.genes.get(&hgnc_id)
    }

    fn gene_by_alias(&self, symbol: &str) -> Option<&AliasEntry> {
        self.aliases.get(symbol)
    }

    fn transcript(&self, transcript_id: &str) -> Option<&TranscriptRecord> {
        self.transcripts.get(transcript_id)
    }

    fn hpo_term(&self, hpo_id: &str) -> Option<&HpoTerm> {
        self.hpo_terms.get(hpo_id)
    }

    fn disease_term(&self, disease_id: &str) -> Option<&DiseaseTerm> {
        self.disease_terms.get(disease_id)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::query::{build_query, FilterOptions};
    use crate::variant::Category;

    fn variant(document_id: &str, case_id: &str, rank_score: Option<f64>) -> Variant {
        Variant {
            document_id: document_id.to_string(),
            case_id: case_id.to_string(),
            variant_type: VariantType::Clinical,
            category: Category::Snv,
            rank_score,
            ..Default::default()
        }
    }

    #[test]
    fn insert_and_fetch() -> Result<(), Error> {
        let mut store = MemoryStore::new();
        store.insert_variant(variant("doc1", "case_1", Some(10.0)))?;
        assert_eq!(store.len(), 1);
        assert!(store.variant("doc1").is_some());
        assert!(store.variant("doc2").is_none());
        Ok(())
    }

    #[test]
    fn duplicate_insert_rejected() -> Result<(), Error> {
        let mut store = MemoryStore::new();
        store.insert_variant(variant("doc1", "case_1", None))?;
        let result = store.insert_variant(variant("doc1", "case_1", None));
        assert!(matches!(result, Err(Error::DuplicateDocument(_))));
        Ok(())
    }

    #[test]
    fn delete_scoped_to_case_and_type() -> Result<(), Error> {
        let mut store = MemoryStore::new();
        store.insert_variant(variant("doc1", "case_1", None))?;
        store.insert_variant(variant("doc2", "case_2", None))?;
        let mut research = variant("doc3", "case_1", None);
        research.variant_type = VariantType::Research;
        store.insert_variant(research)?;

        assert_eq!(store.delete_variants("case_1", VariantType::Clinical), 1);
        assert!(store.variant("doc1").is_none());
        assert!(store.variant("doc2").is_some());
        assert!(store.variant("doc3").is_some());
        Ok(())
    }

    #[test]
    fn rank_assignment_by_descending_score() -> Result<(), Error> {
        let mut store = MemoryStore::new();
        store.insert_variant(variant("low", "case_1", Some(5.0)))?;
        store.insert_variant(variant("high", "case_1", Some(24.0)))?;
        store.insert_variant(variant("mid", "case_1", Some(17.0)))?;
        store.insert_variant(variant("unscored", "case_1", None))?;

        assert_eq!(store.update_variant_rank("case_1", VariantType::Clinical), 4);
        assert_eq!(store.variant("high").unwrap().variant_rank, Some(1));
        assert_eq!(store.variant("mid").unwrap().variant_rank, Some(2));
        assert_eq!(store.variant("low").unwrap().variant_rank, Some(3));
        assert_eq!(store.variant("unscored").unwrap().variant_rank, Some(4));
        Ok(())
    }

    #[test]
    fn rank_consistency() -> Result<(), Error> {
        let mut store = MemoryStore::new();
        store.insert_variant(variant("a", "case_1", Some(12.0)))?;
        store.insert_variant(variant("b", "case_1", Some(3.0)))?;
        store.update_variant_rank("case_1", VariantType::Clinical);

        let a = store.variant("a").unwrap();
        let b = store.variant("b").unwrap();
        assert!(a.rank_score > b.rank_score);
        assert!(a.variant_rank < b.variant_rank);
        Ok(())
    }

    #[test]
    fn query_results_ordered_by_rank() -> Result<(), Error> {
        let mut store = MemoryStore::new();
        store.insert_variant(variant("low", "case_1", Some(1.0)))?;
        store.insert_variant(variant("high", "case_1", Some(9.0)))?;
        store.update_variant_rank("case_1", VariantType::Clinical);

        let query = build_query("case_1", &FilterOptions::default(), None, None);
        let results = store.variants(&query);
        assert_eq!(
            results
                .iter()
                .map(|variant| variant.document_id.as_str())
                .collect::<Vec<_>>(),
            vec!["high", "low"]
        );
        Ok(())
    }

    #[test]
    fn navigation_by_rank() -> Result<(), Error> {
        let mut store = MemoryStore::new();
        store.insert_variant(variant("a", "case_1", Some(9.0)))?;
        store.insert_variant(variant("b", "case_1", Some(5.0)))?;
        store.insert_variant(variant("c", "case_1", Some(1.0)))?;
        store.update_variant_rank("case_1", VariantType::Clinical);

        let (previous, next) = store.adjacent_variants("b");
        assert_eq!(previous.map(|v| v.document_id.as_str()), Some("a"));
        assert_eq!(next.map(|v| v.document_id.as_str()), Some("c"));

        let (previous, next) = store.adjacent_variants("a");
        assert_eq!(previous, None);
        assert_eq!(next.map(|v| v.document_id.as_str()), Some("b"));
        Ok(())
    }
}
