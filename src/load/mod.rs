//! VCF ingest: parse, delete-then-insert, then rank assignment.

use noodles::vcf;
use thousands::Separable as _;

use crate::case::Case;
use crate::catalog::cytoband::CytobandIndex;
use crate::catalog::genes::GeneIndex;
use crate::store::{MemoryStore, Store};
use crate::variant::csq::CsqHeader;
use crate::variant::{parse_variant, Category, ParseConfig, RawRecord, VariantType};

/// Counters reported after one ingest run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Variants removed before the reload.
    pub deleted: usize,
    /// Variants inserted from the VCF.
    pub inserted: usize,
}

/// Extract the `RankResult` category labels from the VCF header.
///
/// genmod writes the pipe-joined labels as the INFO description, in the
/// same order as the per-variant values.
pub fn rank_result_header(header: &vcf::Header) -> Vec<String> {
    header
        .infos()
        .get("RankResult")
        .map(|info| {
            info.description()
                .trim()
                .split('|')
                .map(|label| label.trim().to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Catalog context handed through to the record parser.
#[derive(Debug, Default)]
pub struct LoadContext<'a> {
    /// Explicit category; inferred per record when `None`.
    pub category: Option<Category>,
    /// Gene catalog for symbol resolution.
    pub gene_index: Option<&'a GeneIndex>,
    /// Cytoband catalog for band annotation.
    pub cytobands: Option<&'a CytobandIndex>,
}

/// Load one VCF into the store for a `(case, variant_type)` scope.
///
/// The scope is emptied first so a reload never leaves stale documents
/// behind.  Ranks are assigned only after the whole file is in, so
/// `variant_rank` is always consistent across the scope.
pub fn load_vcf<S: Store, P: AsRef<std::path::Path>>(
    store: &mut S,
    path: P,
    case: &Case,
    variant_type: VariantType,
    context: &LoadContext<'_>,
) -> Result<LoadStats, anyhow::Error> {
    let path_str = path.as_ref().display().to_string();
    tracing::info!("opening {}", &path_str);
    let mut vcf_reader = vcf::io::reader::Builder::default().build_from_path(path.as_ref())?;
    let header = vcf_reader.read_header()?;

    let csq_header = CsqHeader::from_vcf_header(&header).unwrap_or_default();
    if csq_header.is_empty() {
        tracing::warn!("{} carries no CSQ header, transcripts will be empty", &path_str);
    }
    let rank_result_header = rank_result_header(&header);

    let config = ParseConfig {
        case,
        variant_type,
        category: context.category,
        rank_result_header: &rank_result_header,
        csq_header: &csq_header,
        gene_index: context.gene_index,
        cytobands: context.cytobands,
    };

    let deleted = store.delete_variants(&case.case_id, variant_type);
    if deleted > 0 {
        tracing::info!(
            "removed {} previously loaded variants for case {}",
            deleted.separate_with_commas(),
            &case.case_id
        );
    }

    let start = std::time::Instant::now();
    let mut prev = std::time::Instant::now();
    let mut inserted = 0usize;
    for record in vcf_reader.records() {
        let record = record?;
        let record_buf = vcf::variant::RecordBuf::try_from_variant_record(&header, &record)?;
        let raw = RawRecord::try_from_record(&header, &record_buf)?;
        let variant = parse_variant(&raw, &config)?;
        store.insert_variant(variant)?;
        inserted += 1;

        if prev.elapsed().as_secs() >= 60 {
            tracing::info!("at {} records", inserted.separate_with_commas());
            prev = std::time::Instant::now();
        }
    }

    let ranked = store.update_variant_rank(&case.case_id, variant_type);
    tracing::info!(
        "loaded {} variants ({} ranked) from {} in {:?}",
        inserted.separate_with_commas(),
        ranked.separate_with_commas(),
        &path_str,
        start.elapsed()
    );

    Ok(LoadStats { deleted, inserted })
}

/// Command line arguments for the `variants ingest` subcommand.
#[derive(Debug, clap::Parser)]
#[command(author, version, about = "ingest an annotated variant VCF", long_about = None)]
pub struct Args {
    /// Path to the case description JSON.
    #[clap(long)]
    pub path_case: String,
    /// Path to the input VCF.
    #[clap(long)]
    pub path_in: String,
    /// Path to the output JSONL, one document per line in rank order.
    #[clap(long)]
    pub path_out: String,
    /// Scope to load the variants into.
    #[clap(long, value_enum, default_value_t = VariantType::Clinical)]
    pub variant_type: VariantType,
    /// Explicit category; inferred per record when absent.
    #[clap(long, value_enum)]
    pub category: Option<Category>,
    /// Path to the gene index JSON built by `catalog genes`.
    #[clap(long)]
    pub path_genes: Option<String>,
    /// Path to the cytoband TSV.
    #[clap(long)]
    pub path_cytobands: Option<String>,
}

/// Main entry point for the `variants ingest` subcommand.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    use std::io::Write as _;

    tracing::info!("args_common = {:#?}", &args_common);
    tracing::info!("args = {:#?}", &args);

    let case = Case::from_path(&args.path_case)?;
    let gene_index = args
        .path_genes
        .as_ref()
        .map(|path| -> Result<GeneIndex, anyhow::Error> {
            let file = std::fs::File::open(path)
                .map_err(|e| anyhow::anyhow!("could not open gene index {}: {}", path, e))?;
            Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
        })
        .transpose()?;
    let cytobands = args
        .path_cytobands
        .as_ref()
        .map(CytobandIndex::from_path)
        .transpose()?;

    let context = LoadContext {
        category: args.category,
        gene_index: gene_index.as_ref(),
        cytobands: cytobands.as_ref(),
    };
    let mut store = MemoryStore::new();
    load_vcf(&mut store, &args.path_in, &case, args.variant_type, &context)?;

    let scope = crate::query::build_query(
        &case.case_id,
        &crate::query::FilterOptions {
            variant_type: Some(args.variant_type),
            ..Default::default()
        },
        None,
        None,
    );
    let mut writer = std::io::BufWriter::new(std::fs::File::create(&args.path_out)?);
    for variant in store.variants(&scope) {
        serde_json::to_writer(&mut writer, variant)?;
        writeln!(writer)?;
    }
    tracing::info!("wrote documents to {}", &args.path_out);

    Ok(())
}

#[cfg(test)]
mod test {
    use std::io::Write as _;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::store::MemoryStore;

    fn example_case() -> Case {
        Case {
            case_id: String::from("case_1"),
            display_name: Some(String::from("case_1")),
            ..Default::default()
        }
    }

    fn write_vcf(body: &str) -> Result<tempfile::NamedTempFile, anyhow::Error> {
        let mut file = tempfile::Builder::new().suffix(".vcf").tempfile()?;
        writeln!(file, "##fileformat=VCFv4.2")?;
        writeln!(file, "##contig=<ID=1>")?;
        writeln!(
            file,
            "##INFO=<ID=RankScore,Number=.,Type=String,Description=\"Rank score per family\">"
        )?;
        writeln!(
            file,
            "##INFO=<ID=RankResult,Number=1,Type=String,Description=\
             \"variant_length|protein_prediction|gene_intolerance\">"
        )?;
        writeln!(
            file,
            "##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">"
        )?;
        writeln!(
            file,
            "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tsample_1"
        )?;
        write!(file, "{}", body)?;
        file.flush()?;
        Ok(file)
    }

    #[test]
    fn rank_result_labels_from_header() -> Result<(), anyhow::Error> {
        let file = write_vcf("")?;
        let mut reader = vcf::io::reader::Builder::default().build_from_path(file.path())?;
        let header = reader.read_header()?;
        assert_eq!(
            rank_result_header(&header),
            vec![
                String::from("variant_length"),
                String::from("protein_prediction"),
                String::from("gene_intolerance"),
            ]
        );
        Ok(())
    }

    #[test]
    fn load_assigns_ranks() -> Result<(), anyhow::Error> {
        let file = write_vcf(
            "1\t1000\t.\tA\tC\t30\tPASS\tRankScore=case_1:5\tGT\t0/1\n\
             1\t2000\t.\tG\tT\t30\tPASS\tRankScore=case_1:17\tGT\t0/1\n",
        )?;
        let mut store = MemoryStore::new();
        let stats = load_vcf(
            &mut store,
            file.path(),
            &example_case(),
            VariantType::Clinical,
            &LoadContext::default(),
        )?;
        assert_eq!(stats.deleted, 0);
        assert_eq!(stats.inserted, 2);
        assert_eq!(store.len(), 2);

        let top = crate::common::document_id("1", 2000, "G", "T", "clinical", "case_1");
        assert_eq!(
            store.variant(&top).and_then(|v| v.variant_rank),
            Some(1)
        );
        Ok(())
    }

    #[test]
    fn reload_replaces_scope() -> Result<(), anyhow::Error> {
        let file = write_vcf("1\t1000\t.\tA\tC\t30\tPASS\tRankScore=case_1:5\tGT\t0/1\n")?;
        let mut store = MemoryStore::new();
        let case = example_case();
        load_vcf(
            &mut store,
            file.path(),
            &case,
            VariantType::Clinical,
            &LoadContext::default(),
        )?;
        let stats = load_vcf(
            &mut store,
            file.path(),
            &case,
            VariantType::Clinical,
            &LoadContext::default(),
        )?;
        assert_eq!(stats.deleted, 1);
        assert_eq!(stats.inserted, 1);
        assert_eq!(store.len(), 1);
        Ok(())
    }

    #[test]
    fn multi_allelic_record_aborts_load() -> Result<(), anyhow::Error> {
        let file = write_vcf("1\t1000\t.\tA\tC,T\t30\tPASS\t.\tGT\t1/2\n")?;
        let mut store = MemoryStore::new();
        let result = load_vcf(
            &mut store,
            file.path(),
            &example_case(),
            VariantType::Clinical,
            &LoadContext::default(),
        );
        assert!(result.is_err());
        Ok(())
    }
}
