//! DROP RNA outlier TSV parsing (OUTRIDER expression, FRASER splicing).

use indexmap::IndexMap;

use crate::case::Case;
use crate::common::{md5_key, strip_chr_prefix, GenomeBuild};
use crate::variant::VariantType;

/// Error type for omics file parsing.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("problem reading {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("{path}: missing mandatory column {column}")]
    MissingColumn { path: String, column: String },
}

/// Which DROP module produced the file.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    parse_display::Display,
    parse_display::FromStr,
    clap::ValueEnum,
)]
#[display(style = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OmicsSubCategory {
    Expression,
    Splicing,
}

/// One RNA outlier record, decorated with its case context.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OmicsVariant {
    /// Case the outlier belongs to.
    pub case_id: String,
    /// Display name of the case.
    pub display_name: String,
    /// Owning institute.
    pub institute: String,
    /// Genome build of the coordinates.
    pub build: GenomeBuild,
    /// clinical or research.
    pub variant_type: VariantType,
    /// Always `outlier`.
    pub category: String,
    /// expression or splicing.
    pub sub_category: OmicsSubCategory,
    /// Deterministic id over coordinates, gene, and scope.
    pub omics_variant_id: String,
    /// Sample the outlier was called in.
    pub sample_id: Option<String>,
    /// Gene symbol.
    pub hgnc_symbol: Option<String>,
    /// Ensembl gene id.
    pub gene_id: Option<String>,
    /// Chromosome without `chr` prefix.
    pub chrom: String,
    /// Start position.
    pub start: i64,
    /// End position.
    pub end: i64,
    /// `up`/`down` for expression, the potential impact for splicing.
    pub qualification: Option<String>,
    /// OUTRIDER z score.
    pub z_score: Option<f64>,
    /// Adjusted p value.
    pub p_value: Option<f64>,
    /// FRASER psi value.
    pub psi_value: Option<f64>,
    /// FRASER delta psi.
    pub delta_psi: Option<f64>,
    /// FRASER potential impact label.
    pub potential_impact: Option<String>,
    /// Remaining columns, kept verbatim.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub extra: IndexMap<String, String>,
}

const HANDLED_COLUMNS: &[&str] = &[
    "sampleID",
    "hgncSymbol",
    "geneID",
    "seqnames",
    "start",
    "end",
    "width",
    "zScore",
    "pValue",
    "psiValue",
    "deltaPsi",
    "potentialImpact",
];

/// Load one DROP TSV and decorate every row with the case scope.
pub fn load_omics_file<P: AsRef<std::path::Path>>(
    path: &P,
    case: &Case,
    variant_type: VariantType,
    sub_category: OmicsSubCategory,
) -> Result<Vec<OmicsVariant>, Error> {
    let path_str = path.as_ref().display().to_string();
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .from_path(path.as_ref())
        .map_err(|source| Error::Csv {
            path: path_str.clone(),
            source,
        })?;

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|source| Error::Csv {
            path: path_str.clone(),
            source,
        })?
        .iter()
        .map(String::from)
        .collect();
    for column in ["seqnames", "start"] {
        if !headers.iter().any(|h| h == column) {
            return Err(Error::MissingColumn {
                path: path_str,
                column: column.to_string(),
            });
        }
    }

    let mut variants = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|source| Error::Csv {
            path: path_str.clone(),
            source,
        })?;
        let row: IndexMap<String, String> = headers
            .iter()
            .cloned()
            .zip(record.iter().map(String::from))
            .collect();
        match parse_omics_row(&row, case, variant_type, sub_category) {
            Some(variant) => variants.push(variant),
            None => tracing::warn!("skipping unparseable outlier row in {}", path_str),
        }
    }
    Ok(variants)
}

/// Parse one decorated row; `None` when coordinates do not parse.
pub fn parse_omics_row(
    row: &IndexMap<String, String>,
    case: &Case,
    variant_type: VariantType,
    sub_category: OmicsSubCategory,
) -> Option<OmicsVariant> {
    let cell = |key: &str| {
        row.get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty() && *v != "NA")
    };

    let chrom = strip_chr_prefix(cell("seqnames")?).to_string();
    let start: i64 = cell("start")?.parse().ok()?;
    // FRASER sometimes writes the literal `Imp` instead of an end position
    let end = cell("end")
        .filter(|v| *v != "Imp")
        .and_then(|v| v.parse().ok())
        .unwrap_or_else(|| {
            let width: i64 = cell("width").and_then(|v| v.parse().ok()).unwrap_or(0);
            start + width
        });

    let z_score: Option<f64> = cell("zScore").and_then(|v| v.parse().ok());
    let potential_impact = cell("potentialImpact").map(String::from);
    let qualification = match sub_category {
        OmicsSubCategory::Expression => {
            z_score.map(|z| String::from(if z >= 0.0 { "up" } else { "down" }))
        }
        OmicsSubCategory::Splicing => potential_impact.clone(),
    };

    let hgnc_symbol = cell("hgncSymbol").map(String::from);
    let omics_variant_id = md5_key(&[
        &chrom,
        &start.to_string(),
        &end.to_string(),
        hgnc_symbol.as_deref().unwrap_or("."),
        &sub_category.to_string(),
        variant_type.as_str(),
        &case.case_id,
    ]);

    Some(OmicsVariant {
        case_id: case.case_id.clone(),
        display_name: case
            .display_name
            .clone()
            .unwrap_or_else(|| case.case_id.clone()),
        institute: case.owner.clone().unwrap_or_default(),
        build: case.genome_build,
        variant_type,
        category: String::from("outlier"),
        sub_category,
        omics_variant_id,
        sample_id: cell("sampleID").map(String::from),
        hgnc_symbol,
        gene_id: cell("geneID").map(String::from),
        chrom,
        start,
        end,
        qualification,
        z_score,
        p_value: cell("pValue").and_then(|v| v.parse().ok()),
        psi_value: cell("psiValue").and_then(|v| v.parse().ok()),
        delta_psi: cell("deltaPsi").and_then(|v| v.parse().ok()),
        potential_impact,
        extra: row
            .iter()
            .filter(|(key, value)| {
                !HANDLED_COLUMNS.contains(&key.as_str()) && !value.is_empty()
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
    })
}

/// Command line arguments for the `omics ingest` subcommand.
#[derive(Debug, clap::Parser)]
#[command(author, version, about = "ingest a DROP RNA outlier TSV", long_about = None)]
pub struct Args {
    /// Path to the case description JSON.
    #[clap(long)]
    pub path_case: String,
    /// Path to the input TSV.
    #[clap(long)]
    pub path_in: String,
    /// Which DROP module produced the file.
    #[clap(long, value_enum)]
    pub sub_category: OmicsSubCategory,
    /// Scope to load the outliers into.
    #[clap(long, value_enum, default_value_t = VariantType::Clinical)]
    pub variant_type: VariantType,
    /// Path to the output JSONL; stdout when absent.
    #[clap(long)]
    pub path_out: Option<String>,
}

/// Main entry point for the `omics ingest` subcommand.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    use std::io::Write as _;

    tracing::info!("args_common = {:#?}", &args_common);
    tracing::info!("args = {:#?}", &args);

    let case = Case::from_path(&args.path_case)?;
    let variants = load_omics_file(&args.path_in, &case, args.variant_type, args.sub_category)?;

    let mut writer: Box<dyn std::io::Write> = match &args.path_out {
        Some(path) => Box::new(std::io::BufWriter::new(std::fs::File::create(path)?)),
        None => Box::new(std::io::stdout().lock()),
    };
    for variant in &variants {
        serde_json::to_writer(&mut writer, variant)?;
        writeln!(writer)?;
    }
    tracing::info!("wrote {} outlier documents", variants.len());

    Ok(())
}
