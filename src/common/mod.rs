//! Common functionality.

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use indexmap::IndexMap;
use noodles::vcf;

pub mod io;

/// Commonly used command line arguments.
#[derive(Parser, Debug)]
pub struct Args {
    /// Verbosity of the program
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            verbose: Verbosity::new(0, 0),
        }
    }
}

/// Definition of canonical chromosome names.
pub const CHROMS: &[&str] = &[
    "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "13", "14", "15", "16", "17",
    "18", "19", "20", "21", "22", "X", "Y", "MT",
];

/// Build mapping of chromosome names to chromosome counts.
pub fn build_chrom_map() -> IndexMap<String, usize> {
    let mut result = IndexMap::new();
    for (i, &chrom_name) in CHROMS.iter().enumerate() {
        result.insert(chrom_name.to_owned(), i);
        result.insert(format!("chr{chrom_name}").to_owned(), i);
    }
    result.insert("x".to_owned(), 22);
    result.insert("y".to_owned(), 23);
    result.insert("chrx".to_owned(), 22);
    result.insert("chry".to_owned(), 23);
    result.insert("m".to_owned(), 24);
    result.insert("M".to_owned(), 24);
    result.insert("chrm".to_owned(), 24);
    result.insert("chrMT".to_owned(), 24);
    result
}

/// Strip an optional leading `chr`/`CHR` prefix from a chromosome name.
pub fn strip_chr_prefix(chrom: &str) -> &str {
    if chrom.len() > 3 && chrom[..3].eq_ignore_ascii_case("chr") {
        &chrom[3..]
    } else {
        chrom
    }
}

/// Select the genome build of a case.
#[derive(
    clap::ValueEnum,
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumString,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum GenomeBuild {
    /// GRCh37 / hg19
    #[default]
    #[strum(serialize = "37")]
    #[serde(rename = "37")]
    #[clap(name = "37")]
    Build37,
    /// GRCh38 / hg38
    #[strum(serialize = "38")]
    #[serde(rename = "38")]
    #[clap(name = "38")]
    Build38,
}

impl GenomeBuild {
    pub fn name(&self) -> String {
        match self {
            GenomeBuild::Build37 => String::from("GRCh37"),
            GenomeBuild::Build38 => String::from("GRCh38"),
        }
    }
}

/// Compute the case-scoped document id of a variant.
///
/// The id is the md5 hex digest over `chrom|pos|ref|alt|variant_type|case_id`.
pub fn document_id(
    chrom: &str,
    pos: i64,
    reference: &str,
    alternative: &str,
    variant_type: &str,
    case_id: &str,
) -> String {
    md5_key(&[
        chrom,
        &pos.to_string(),
        reference,
        alternative,
        variant_type,
        case_id,
    ])
}

/// Compute the case-independent simple id of a variant.
pub fn variant_id(
    chrom: &str,
    pos: i64,
    reference: &str,
    alternative: &str,
    variant_type: &str,
) -> String {
    md5_key(&[chrom, &pos.to_string(), reference, alternative, variant_type])
}

/// md5 hex digest over the `_`-joined parts.
pub fn md5_key(parts: &[&str]) -> String {
    format!("{:x}", md5::compute(parts.join("_")))
}

/// Supporting code for `genotype_to_string`.
#[derive(thiserror::Error, Debug, Clone)]
pub enum GenotypeToStringError {
    #[error("Problem reading genotype allele: {0}")]
    AlleleReading(String),
}

/// Convert a noodles genotype value to a `a/b`-style string.
pub fn genotype_to_string(
    gt: &vcf::variant::record_buf::samples::sample::value::Genotype,
) -> Result<String, GenotypeToStringError> {
    use noodles::vcf::variant::record::samples::series::value::genotype::Phasing;
    use noodles::vcf::variant::record::samples::series::value::Genotype as _;

    let mut result = String::new();
    for (i, allele) in gt.iter().enumerate() {
        let (position, phasing) = allele
            .map_err(|e| GenotypeToStringError::AlleleReading(e.to_string()))?;
        if i > 0 {
            result.push(match phasing {
                Phasing::Phased => '|',
                Phasing::Unphased => '/',
            });
        }
        match position {
            Some(pos) => result.push_str(&pos.to_string()),
            None => result.push('.'),
        }
    }
    Ok(result)
}

/// The version of the `scout-worker` package.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Return the version of the `scout-worker` crate and `x.y.z` in tests.
pub fn worker_version() -> &'static str {
    if cfg!(test) {
        "x.y.z"
    } else {
        env!("CARGO_PKG_VERSION")
    }
}
