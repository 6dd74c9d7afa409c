//! Parsing of the license-gated OMIM files (`genemap2.txt`, `mim2gene.txt`).
//!
//! `genemap2.txt` drives both the per-gene inheritance annotation of the
//! gene index and the OMIM side of the disease catalog.

use indexmap::{IndexMap, IndexSet};

/// Error type for OMIM file parsing.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("problem reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}, line {line}: expected at least {expected} columns")]
    MissingColumns {
        path: String,
        line: usize,
        expected: usize,
    },
}

/// One row of `genemap2.txt`.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GenemapEntry {
    /// MIM number of the gene.
    pub mim_number: u32,
    /// All gene symbols of the row.
    pub gene_symbols: Vec<String>,
    /// The approved gene symbol, if present.
    pub approved_symbol: Option<String>,
    /// Raw phenotype descriptions.
    pub phenotypes: Vec<PhenotypeEntry>,
}

/// One phenotype parsed out of the `Phenotypes` column.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PhenotypeEntry {
    /// MIM number of the phenotype.
    pub mim_number: u32,
    /// Free-text description.
    pub description: String,
    /// Abbreviated inheritance models, e.g. `AR`.
    pub inheritance: IndexSet<String>,
}

/// Per-gene annotation derived from `genemap2.txt`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneAnnotation {
    /// MIM number of the gene itself.
    pub mim_number: u32,
    /// Union of inheritance models over the gene's phenotypes.
    pub inheritance: IndexSet<String>,
    /// MIM numbers of the associated phenotypes.
    pub phenotype_mim_numbers: Vec<u32>,
}

/// Map from gene symbol to OMIM gene annotation.
#[derive(Debug, Clone, Default)]
pub struct OmimGeneMap {
    annotations: IndexMap<String, GeneAnnotation>,
}

impl OmimGeneMap {
    /// Look up the annotation for a gene symbol.
    pub fn annotation_for(&self, symbol: &str) -> Option<&GeneAnnotation> {
        self.annotations.get(symbol)
    }
}

/// Mapping from OMIM inheritance phrases to their abbreviations.
const INHERITANCE_TERMS: &[(&str, &str)] = &[
    ("Autosomal recessive", "AR"),
    ("Autosomal dominant", "AD"),
    ("X-linked recessive", "XR"),
    ("X-linked dominant", "XD"),
    ("X-linked", "XL"),
    ("Y-linked", "Y"),
    ("Mitochondrial", "MT"),
    ("Digenic recessive", "DR"),
];

/// Extract abbreviated inheritance models from a phenotype description.
fn parse_inheritance(text: &str) -> IndexSet<String> {
    let mut result = IndexSet::new();
    for (phrase, abbreviation) in INHERITANCE_TERMS {
        if text.contains(phrase) {
            result.insert((*abbreviation).to_string());
        }
    }
    // "X-linked" alone is subsumed by the recessive/dominant variants.
    if result.contains("XR") || result.contains("XD") {
        result.shift_remove("XL");
    }
    result
}

/// Parse the `Phenotypes` cell of one genemap2 row.
///
/// Entries are `; `-separated and look like
/// `Description, 612345 (3), Autosomal recessive`.  Entries without a MIM
/// number are skipped.
fn parse_phenotypes(cell: &str) -> Vec<PhenotypeEntry> {
    let mut result = Vec::new();
    for raw in cell.split(';') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let mut mim_number = None;
        let mut description_end = raw.len();
        for (offset, token) in raw.split(", ").scan(0usize, |acc, token| {
            let offset = *acc;
            *acc += token.len() + 2;
            Some((offset, token))
        }) {
            let number = token.split_whitespace().next().unwrap_or_default();
            if number.len() == 6 && number.chars().all(|c| c.is_ascii_digit()) {
                mim_number = number.parse::<u32>().ok();
                description_end = offset.saturating_sub(2);
                break;
            }
        }
        if let Some(mim_number) = mim_number {
            result.push(PhenotypeEntry {
                mim_number,
                description: raw[..description_end.min(raw.len())]
                    .trim_start_matches(['?', '{', '['])
                    .trim_end_matches(['}', ']'])
                    .to_string(),
                inheritance: parse_inheritance(raw),
            });
        }
    }
    result
}

/// Load `genemap2.txt`, skipping `#` comment lines.
pub fn load_genemap<P: AsRef<std::path::Path>>(path: &P) -> Result<Vec<GenemapEntry>, Error> {
    let path_str = path.as_ref().display().to_string();
    let content =
        crate::common::io::read_to_string_maybe_gz(path.as_ref()).map_err(|source| Error::Io {
            path: path_str.clone(),
            source,
        })?;
    parse_genemap(&content, &path_str)
}

/// Parse the contents of a `genemap2.txt` file.
pub fn parse_genemap(content: &str, path: &str) -> Result<Vec<GenemapEntry>, Error> {
    let mut entries = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 13 {
            return Err(Error::MissingColumns {
                path: path.to_string(),
                line: line_no + 1,
                expected: 13,
            });
        }
        let mim_number = match fields[5].trim().parse::<u32>() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("{}, line {}: unparseable MIM number", path, line_no + 1);
                continue;
            }
        };
        entries.push(GenemapEntry {
            mim_number,
            gene_symbols: fields[6]
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            approved_symbol: {
                let symbol = fields[8].trim();
                if symbol.is_empty() {
                    None
                } else {
                    Some(symbol.to_string())
                }
            },
            phenotypes: parse_phenotypes(fields[12]),
        });
    }
    Ok(entries)
}

/// Reduce genemap entries to a symbol-keyed gene annotation map.
pub fn build_gene_map(entries: &[GenemapEntry]) -> OmimGeneMap {
    let mut annotations: IndexMap<String, GeneAnnotation> = IndexMap::new();
    for entry in entries {
        let symbol = match entry
            .approved_symbol
            .as_deref()
            .or_else(|| entry.gene_symbols.first().map(|s| s.as_str()))
        {
            Some(symbol) => symbol.to_string(),
            None => continue,
        };
        let annotation = annotations.entry(symbol).or_insert_with(|| GeneAnnotation {
            mim_number: entry.mim_number,
            ..Default::default()
        });
        for phenotype in &entry.phenotypes {
            annotation
                .inheritance
                .extend(phenotype.inheritance.iter().cloned());
            annotation.phenotype_mim_numbers.push(phenotype.mim_number);
        }
    }
    OmimGeneMap { annotations }
}
