//! Variant parsing: the canonical record and the per-record orchestrator.

pub mod clnsig;
pub mod coordinates;
pub mod csq;
pub mod frequency;
pub mod fusion;
pub mod gene_reduce;
pub mod genotype;
pub mod info;
pub mod mei;
pub mod omics;
pub mod rank;
pub mod repeats;

use indexmap::IndexMap;
use itertools::Itertools as _;
use noodles::vcf;

use crate::case::Case;
use crate::catalog::cytoband::CytobandIndex;
use crate::catalog::genes::GeneIndex;
use crate::common::{document_id, md5_key, strip_chr_prefix, variant_id, GenomeBuild};
use crate::variant::clnsig::{ClnsigRecord, OncRecord};
use crate::variant::coordinates::SvInfo;
use crate::variant::csq::{CsqHeader, Transcript};
use crate::variant::frequency::Frequencies;
use crate::variant::fusion::FusionInfo;
use crate::variant::gene_reduce::Gene;
use crate::variant::genotype::GenotypeRecord;
use crate::variant::info::{FieldMap, Value};
use crate::variant::mei::MeiInfo;
use crate::variant::rank::Compound;
use crate::variant::repeats::StrInfo;

/// Top-level variant category.
#[derive(
    serde::Serialize,
    serde::Deserialize,
    parse_display::Display,
    parse_display::FromStr,
    clap::ValueEnum,
    Default,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
)]
#[display(style = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[default]
    Snv,
    Sv,
    Cancer,
    CancerSv,
    Str,
    Mei,
    Fusion,
    Outlier,
}

/// Sub-category within a variant category.
#[derive(
    serde::Serialize,
    serde::Deserialize,
    parse_display::Display,
    parse_display::FromStr,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
)]
#[display(style = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubCategory {
    Snv,
    Indel,
    Mnv,
    Del,
    Dup,
    Ins,
    Inv,
    Cnv,
    Bnd,
    Str,
}

/// Scope of the loaded variant set.
#[derive(
    serde::Serialize,
    serde::Deserialize,
    parse_display::Display,
    parse_display::FromStr,
    clap::ValueEnum,
    Default,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
)]
#[display(style = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VariantType {
    #[default]
    Clinical,
    Research,
}

impl VariantType {
    /// The wire string of the variant type.
    pub fn as_str(&self) -> &'static str {
        match self {
            VariantType::Clinical => "clinical",
            VariantType::Research => "research",
        }
    }
}

/// Fatal problems with the VCF input.
#[derive(thiserror::Error, Debug)]
pub enum VcfError {
    #[error("multi-allelic record at {chrom}:{pos} ({alts} ALT alleles); input must be normalized")]
    MultiAllelic { chrom: String, pos: i64, alts: usize },
    #[error("record at {chrom}:{pos} has no ALT allele")]
    MissingAlt { chrom: String, pos: i64 },
    #[error("record without a variant start position")]
    MissingVariantStart,
}

/// Owned, reader-independent view of one VCF record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub chrom: String,
    pub pos: i64,
    pub reference: String,
    pub alternatives: Vec<String>,
    pub quality: Option<f64>,
    pub filters: Vec<String>,
    pub info: FieldMap,
    /// Per-sample FORMAT values keyed by sample name, in header order.
    pub samples: IndexMap<String, FieldMap>,
}

impl RawRecord {
    /// Convert a noodles record buffer into the owned representation.
    pub fn try_from_record(
        header: &vcf::Header,
        record: &vcf::variant::RecordBuf,
    ) -> Result<Self, VcfError> {
        let chrom = record.reference_sequence_name().to_string();
        let pos = usize::from(
            record
                .variant_start()
                .ok_or(VcfError::MissingVariantStart)?,
        ) as i64;

        let mut info = FieldMap::default();
        for (key, value) in record.info().as_ref() {
            if let Some(value) = value {
                info.insert(key.clone(), Value::from_info(value));
            }
        }

        let mut samples = IndexMap::new();
        for (name, sample) in header.sample_names().iter().zip(record.samples().values()) {
            let mut fields = FieldMap::default();
            for (key, value) in record.samples().keys().as_ref().iter().zip(sample.values()) {
                if let Some(value) = value.as_ref() {
                    fields.insert(key.clone(), Value::from_sample(value));
                }
            }
            samples.insert(name.clone(), fields);
        }

        Ok(Self {
            chrom,
            pos,
            reference: record.reference_bases().to_string(),
            alternatives: record
                .alternate_bases()
                .as_ref()
                .iter()
                .cloned()
                .collect(),
            quality: record.quality_score().map(|q| q as f64),
            filters: record.filters().as_ref().iter().cloned().collect(),
            info,
            samples,
        })
    }
}

/// The canonical parsed variant.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Variant {
    /// Document id, scoped to the case.
    #[serde(rename = "_id")]
    pub document_id: String,
    /// Case-independent variant id.
    pub variant_id: String,
    /// Readable `chrom_pos_ref_alt` id.
    pub simple_id: String,
    /// Owning case.
    pub case_id: String,
    /// clinical or research.
    pub variant_type: VariantType,
    /// Variant category.
    pub category: Category,
    /// Resolved sub-category.
    pub sub_category: Option<SubCategory>,
    /// Genome build of the coordinates.
    pub genome_build: GenomeBuild,

    /// Chromosome without `chr` prefix.
    pub chromosome: String,
    /// 1-based position.
    pub position: i64,
    /// End position.
    pub end: i64,
    /// Chromosome of the end position.
    pub end_chrom: String,
    /// Length; `-1` unknown, `10^10` inter-chromosomal.
    pub length: i64,
    /// Cytoband at the start position.
    pub cytoband_start: Option<String>,
    /// Cytoband at the end position.
    pub cytoband_end: Option<String>,
    /// Breakend partner id.
    pub mate_id: Option<String>,

    /// Reference allele.
    pub reference: String,
    /// Alternative allele.
    pub alternative: String,
    /// Call quality.
    pub quality: Option<f64>,
    /// VCF FILTER entries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<String>,

    /// Per-gene summaries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genes: Vec<Gene>,
    /// All parsed transcripts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transcripts: Vec<Transcript>,
    /// HGNC ids of the affected genes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hgnc_ids: Vec<u32>,
    /// Symbols of the affected genes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hgnc_symbols: Vec<String>,

    /// Aggregated population frequencies.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub frequencies: Frequencies,
    /// Local archive observation counts and frequencies.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub local_archive: IndexMap<String, f64>,
    /// Conservation scores.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub conservation: IndexMap<String, String>,
    /// CADD phred score.
    pub cadd_score: Option<f64>,
    /// REVEL rank score, maximum over transcripts.
    pub revel: Option<f64>,
    /// SpliceAI maximum delta score over transcripts.
    pub spliceai_delta_score: Option<f64>,
    /// Delta position of the maximum SpliceAI score.
    pub spliceai_delta_position: Option<i32>,
    /// Readable SpliceAI summary.
    pub spliceai_prediction: Option<String>,
    /// dbSNP ids.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dbsnp_ids: Vec<String>,
    /// COSMIC ids.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cosmic_ids: Vec<String>,

    /// ClinVar significance assertions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clnsig: Vec<ClnsigRecord>,
    /// ClinVar oncogenicity assertions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clnsig_onc: Vec<OncRecord>,

    /// Callers that reported the variant.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub callers: IndexMap<String, String>,
    /// Per-individual genotypes in case order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<GenotypeRecord>,

    /// Genmod rank score for this case.
    pub rank_score: Option<f64>,
    /// Normalized genmod rank score.
    pub rank_score_normalized: Option<f64>,
    /// Rank score breakdown by component.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub rank_result: IndexMap<String, i64>,
    /// 1-based rank within the `(case, variant_type)` set; assigned by the
    /// loader after the batch is complete.
    pub variant_rank: Option<i64>,
    /// Compatible inheritance models.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genetic_models: Vec<String>,
    /// Compound-heterozygous peers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compounds: Vec<Compound>,

    /// AZ homozygosity run length.
    pub azlength: Option<f64>,
    /// AZ homozygosity quality.
    pub azqual: Option<f64>,
    /// Somatic score from cancer callers.
    pub somatic_score: Option<f64>,
    /// SPIDEX splicing z score.
    pub spidex: Option<f64>,
    /// Managed variant list tag.
    pub mvl_tag: Option<String>,
    /// Free-form annotation from `SCOUT_CUSTOM`.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub custom: IndexMap<String, String>,
    /// HmtVar id for MT variants.
    pub hmtvar: Option<String>,
    /// Mitomap disease annotation for MT variants.
    pub mitomap_associated_diseases: Option<String>,

    /// STR annotation, present for `str` records.
    pub str_info: Option<StrInfo>,
    /// MEI annotation, present for `mei` records.
    pub mei_info: Option<MeiInfo>,
    /// Fusion annotation, present for `fusion` records.
    pub fusion_info: Option<FusionInfo>,
}

/// Inputs shared by all records of one load.
#[derive(Debug, Clone)]
pub struct ParseConfig<'a> {
    /// The case the VCF belongs to.
    pub case: &'a Case,
    /// Scope of the load.
    pub variant_type: VariantType,
    /// Explicit category; inferred from the record when `None`.
    pub category: Option<Category>,
    /// `RankResult` labels from the VCF header.
    pub rank_result_header: &'a [String],
    /// CSQ field list from the VCF header.
    pub csq_header: &'a CsqHeader,
    /// Gene catalog for symbol resolution.
    pub gene_index: Option<&'a GeneIndex>,
    /// Cytoband catalog for band lookups.
    pub cytobands: Option<&'a CytobandIndex>,
}

/// Parse one record into the canonical variant.
///
/// Records must carry exactly one ALT allele; anything else aborts the
/// load.  Everything downstream of that check is total.
pub fn parse_variant(record: &RawRecord, config: &ParseConfig) -> Result<Variant, VcfError> {
    if record.alternatives.len() > 1 {
        return Err(VcfError::MultiAllelic {
            chrom: record.chrom.clone(),
            pos: record.pos,
            alts: record.alternatives.len(),
        });
    }
    let alternative = record
        .alternatives
        .first()
        .ok_or_else(|| VcfError::MissingAlt {
            chrom: record.chrom.clone(),
            pos: record.pos,
        })?
        .clone();

    let chromosome = strip_chr_prefix(&record.chrom).to_string();
    let info = &record.info;
    let case = config.case;

    let category = config.category.unwrap_or_else(|| {
        if info.contains("SVTYPE") {
            Category::Sv
        } else {
            Category::Snv
        }
    });

    let transcripts = match info.get_string("CSQ") {
        Some(csq) if !config.csq_header.is_empty() => {
            csq::parse_transcripts(&csq, config.csq_header, config.gene_index)
        }
        _ => Vec::new(),
    };

    let sv_info = SvInfo {
        svtype: info.get_string("SVTYPE"),
        svlen: info.get_i64("SVLEN"),
        end: info.get_i64("END"),
        mate_id: info.get_string("MATEID"),
        rl: info.get_i64("RL"),
    };
    let coordinates = coordinates::resolve(
        &chromosome,
        record.pos,
        &record.reference,
        &alternative,
        category,
        &sv_info,
    );

    let genes = match category {
        Category::Fusion => fusion::fusion_genes(&fusion::parse_fusion_info(info)),
        _ => gene_reduce::reduce_genes(&transcripts),
    };
    let hgnc_ids: Vec<u32> = genes.iter().filter_map(|gene| gene.hgnc_id).collect();
    let hgnc_symbols: Vec<String> = genes
        .iter()
        .filter_map(|gene| gene.hgnc_symbol.clone())
        .collect();

    let genmod_key = case.genmod_key().to_string();
    let pathologic_struc = repeats::parse_pathologic_struc(info);
    let samples = extract_genotypes(record, case, pathologic_struc.as_deref());

    let first_transcript = transcripts.first();
    let conservation = first_transcript
        .map(|tx| {
            let mut conservation = IndexMap::new();
            if let Some(gerp) = &tx.gerp {
                conservation.insert(String::from("gerp"), gerp.clone());
            }
            if let Some(phast) = &tx.phast_conservation {
                conservation.insert(String::from("phast_cons"), phast.clone());
            }
            if let Some(phylop) = &tx.phylop_conservation {
                conservation.insert(String::from("phylop"), phylop.clone());
            }
            conservation
        })
        .unwrap_or_default();

    let spliceai_best = transcripts
        .iter()
        .filter(|tx| tx.spliceai_delta_score.is_some())
        .max_by(|a, b| {
            a.spliceai_delta_score
                .partial_cmp(&b.spliceai_delta_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

    let mut variant = Variant {
        document_id: document_id(
            &chromosome,
            record.pos,
            &record.reference,
            &alternative,
            config.variant_type.as_str(),
            &case.case_id,
        ),
        variant_id: variant_id(
            &chromosome,
            record.pos,
            &record.reference,
            &alternative,
            config.variant_type.as_str(),
        ),
        simple_id: format!(
            "{}_{}_{}_{}",
            chromosome, record.pos, record.reference, alternative
        ),
        case_id: case.case_id.clone(),
        variant_type: config.variant_type,
        category,
        sub_category: coordinates.sub_category,
        genome_build: case.genome_build,
        chromosome: chromosome.clone(),
        position: record.pos,
        end: coordinates.end,
        end_chrom: coordinates.end_chrom.clone(),
        length: coordinates.length,
        cytoband_start: config
            .cytobands
            .and_then(|cytobands| cytobands.band_at(&chromosome, record.pos)),
        cytoband_end: config
            .cytobands
            .and_then(|cytobands| cytobands.band_at(&coordinates.end_chrom, coordinates.end)),
        mate_id: coordinates.mate_id,
        reference: record.reference.clone(),
        alternative: alternative.clone(),
        quality: record.quality,
        filters: record.filters.clone(),
        hgnc_ids,
        hgnc_symbols,
        frequencies: frequency::parse_frequencies(info, category, &transcripts),
        local_archive: parse_local_archive(info),
        conservation,
        cadd_score: info.get_f64("CADD").or_else(|| info.get_f64("CADD_PHRED")),
        revel: transcripts
            .iter()
            .filter_map(|tx| tx.revel)
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v)))),
        spliceai_delta_score: spliceai_best.and_then(|tx| tx.spliceai_delta_score),
        spliceai_delta_position: spliceai_best.and_then(|tx| tx.spliceai_delta_position),
        spliceai_prediction: spliceai_best.and_then(|tx| tx.spliceai_prediction.clone()),
        dbsnp_ids: transcripts
            .iter()
            .flat_map(|tx| tx.dbsnp_ids.iter().cloned())
            .unique()
            .collect(),
        cosmic_ids: transcripts
            .iter()
            .flat_map(|tx| tx.cosmic_ids.iter().cloned())
            .unique()
            .collect(),
        clnsig: clnsig::parse_clnsig(info, &transcripts),
        clnsig_onc: clnsig::parse_clnsig_onc(info),
        callers: parse_callers(info),
        samples,
        rank_score: rank::parse_rank_score(info, "RankScore", &genmod_key),
        rank_score_normalized: rank::parse_rank_score(info, "RankScoreNormalized", &genmod_key),
        rank_result: rank::parse_rank_result(info, config.rank_result_header),
        variant_rank: None,
        genetic_models: rank::parse_genetic_models(info, &genmod_key),
        compounds: rank::parse_compounds(
            info,
            &case.case_id,
            &genmod_key,
            config.variant_type,
        ),
        azlength: info.get_f64("AZLENGTH"),
        azqual: info.get_f64("AZQUAL"),
        somatic_score: info.get_f64("SOMATICSCORE"),
        spidex: info.get_f64("SPIDEX"),
        mvl_tag: info.get_string("MSK_MVL"),
        custom: parse_custom(info),
        hmtvar: info.get_string("HmtVar"),
        mitomap_associated_diseases: info.get_string("MitomapAssociatedDiseases"),
        genes,
        transcripts,
        str_info: None,
        mei_info: None,
        fusion_info: None,
    };

    match category {
        Category::Str => variant.str_info = Some(repeats::parse_str_info(info)),
        Category::Mei => variant.mei_info = Some(mei::parse_mei_info(info)),
        Category::Fusion => variant.fusion_info = Some(fusion::parse_fusion_info(info)),
        _ => {}
    }

    Ok(variant)
}

/// Match sample columns to the case's positional individual order.
fn extract_genotypes(
    record: &RawRecord,
    case: &Case,
    pathologic_struc: Option<&[usize]>,
) -> Vec<GenotypeRecord> {
    case.individuals
        .iter()
        .enumerate()
        .map(|(position, individual)| {
            let sample = record
                .samples
                .get(individual.individual_id.as_str())
                .or_else(|| record.samples.get_index(position).map(|(_, sample)| sample));
            match sample {
                Some(sample) => genotype::parse_genotype(individual, sample, pathologic_struc),
                None => GenotypeRecord {
                    individual_id: individual.individual_id.clone(),
                    display_name: individual.display_name().to_string(),
                    genotype_call: String::from("./."),
                    ..Default::default()
                },
            }
        })
        .collect()
}

/// Caller status map from the `FOUND_IN` INFO key.
fn parse_callers(info: &FieldMap) -> IndexMap<String, String> {
    let raw = match info.get_string("FOUND_IN") {
        Some(raw) => raw,
        None => return IndexMap::new(),
    };
    raw.split([',', '|'])
        .filter(|caller| !caller.is_empty())
        .map(|caller| (caller.trim().to_string(), String::from("Pass")))
        .collect()
}

/// Parse `SCOUT_CUSTOM="key1|value1,key2|value2"`.
fn parse_custom(info: &FieldMap) -> IndexMap<String, String> {
    let raw = match info.get_string("SCOUT_CUSTOM") {
        Some(raw) => raw,
        None => return IndexMap::new(),
    };
    raw.split(',')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('|')?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Local frequency archive counts, germline and cancer-prefixed.
fn parse_local_archive(info: &FieldMap) -> IndexMap<String, f64> {
    let prefixes = [
        ("", "local_"),
        ("Cancer_Germline_", "cancer_germline_"),
        ("Cancer_Somatic_", "cancer_somatic_"),
        ("Cancer_Somatic_Panel_", "cancer_somatic_panel_"),
    ];
    let suffixes = [("Obs", "obs"), ("Hom", "hom"), ("Frq", "frq")];

    let mut archive = IndexMap::new();
    for (info_prefix, name_prefix) in prefixes {
        for (info_suffix, name_suffix) in suffixes {
            if let Some(value) = info.get_f64(&format!("{}{}", info_prefix, info_suffix)) {
                archive.insert(format!("{}{}", name_prefix, name_suffix), value);
            }
        }
    }
    archive
}

/// Deterministic id for a stored omics variant, mirroring `document_id`.
pub fn omics_document_id(omics_variant_id: &str, case_id: &str) -> String {
    md5_key(&[omics_variant_id, case_id])
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::case::Individual;

    fn example_case() -> Case {
        Case {
            case_id: String::from("internal_id"),
            display_name: Some(String::from("643594")),
            owner: Some(String::from("cust000")),
            individuals: vec![Individual {
                individual_id: String::from("ADM1059A2"),
                display_name: Some(String::from("proband")),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn example_csq_header() -> CsqHeader {
        CsqHeader::new(
            ["Allele", "Consequence", "SYMBOL", "Feature", "HGNC_ID"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }

    fn config<'a>(case: &'a Case, csq_header: &'a CsqHeader) -> ParseConfig<'a> {
        ParseConfig {
            case,
            variant_type: VariantType::Clinical,
            category: None,
            rank_result_header: &[],
            csq_header,
            gene_index: None,
            cytobands: None,
        }
    }

    fn snv_record() -> RawRecord {
        let mut record = RawRecord {
            chrom: String::from("1"),
            pos: 80_000,
            reference: String::from("A"),
            alternatives: vec![String::from("C")],
            quality: Some(1258.1),
            filters: vec![String::from("PASS")],
            ..Default::default()
        };
        record.info.insert(
            "CSQ",
            Value::String(String::from("C|missense_variant|POC1A|ENST00000394963|24488")),
        );
        record.samples.insert(
            String::from("ADM1059A2"),
            FieldMap::from_pairs([
                ("GT", Value::String(String::from("0/1"))),
                ("AD", Value::IntegerArray(vec![Some(20), Some(18)])),
                ("DP", Value::Integer(38)),
            ]),
        );
        record
    }

    #[test]
    fn parse_snv() -> Result<(), VcfError> {
        let case = example_case();
        let csq_header = example_csq_header();
        let variant = parse_variant(&snv_record(), &config(&case, &csq_header))?;

        assert_eq!(variant.category, Category::Snv);
        assert_eq!(variant.sub_category, Some(SubCategory::Snv));
        assert_eq!(variant.length, 1);
        assert_eq!(variant.end, 80_000);
        assert_eq!(variant.genes.len(), 1);
        assert_eq!(variant.genes[0].hgnc_id, Some(24488));
        assert_eq!(
            variant.genes[0].most_severe_consequence,
            Some(csq::Consequence::MissenseVariant)
        );
        assert_eq!(variant.hgnc_ids, vec![24488]);
        assert_eq!(variant.samples.len(), 1);
        assert_eq!(variant.samples[0].genotype_call, "0/1");
        assert_eq!(variant.simple_id, "1_80000_A_C");
        Ok(())
    }

    #[test]
    fn multi_allelic_rejected() {
        let case = example_case();
        let csq_header = CsqHeader::default();
        let mut record = snv_record();
        record.alternatives.push(String::from("T"));
        let result = parse_variant(&record, &config(&case, &csq_header));
        assert!(matches!(result, Err(VcfError::MultiAllelic { alts: 2, .. })));
    }

    #[test]
    fn chr_prefix_stripped() -> Result<(), VcfError> {
        let case = example_case();
        let csq_header = CsqHeader::default();
        let mut record = snv_record();
        record.chrom = String::from("chr1");
        let variant = parse_variant(&record, &config(&case, &csq_header))?;
        assert_eq!(variant.chromosome, "1");
        assert_eq!(variant.end_chrom, "1");
        Ok(())
    }

    #[test]
    fn document_id_is_stable() -> Result<(), VcfError> {
        let case = example_case();
        let csq_header = CsqHeader::default();
        let first = parse_variant(&snv_record(), &config(&case, &csq_header))?;
        let second = parse_variant(&snv_record(), &config(&case, &csq_header))?;
        assert_eq!(first.document_id, second.document_id);
        assert_eq!(first.variant_id, second.variant_id);
        Ok(())
    }

    #[test]
    fn sv_category_inferred_from_svtype() -> Result<(), VcfError> {
        let case = example_case();
        let csq_header = CsqHeader::default();
        let mut record = snv_record();
        record.info.insert("SVTYPE", Value::String(String::from("DEL")));
        record.info.insert("SVLEN", Value::Integer(-500));
        let variant = parse_variant(&record, &config(&case, &csq_header))?;
        assert_eq!(variant.category, Category::Sv);
        assert_eq!(variant.sub_category, Some(SubCategory::Del));
        assert_eq!(variant.length, 500);
        Ok(())
    }

    #[test]
    fn bnd_translocation() -> Result<(), VcfError> {
        let case = example_case();
        let csq_header = CsqHeader::default();
        let mut record = RawRecord {
            chrom: String::from("2"),
            pos: 724_779,
            reference: String::from("N"),
            alternatives: vec![String::from("N[hs37d5:12060532[")],
            ..Default::default()
        };
        record.info.insert("SVTYPE", Value::String(String::from("BND")));
        let mut cfg = config(&case, &csq_header);
        cfg.category = Some(Category::Sv);
        let variant = parse_variant(&record, &cfg)?;
        assert_eq!(variant.sub_category, Some(SubCategory::Bnd));
        assert_eq!(variant.end_chrom, "hs37d5");
        assert_eq!(variant.end, 12_060_532);
        assert_eq!(variant.length, coordinates::INTER_CHROM_LENGTH);
        Ok(())
    }

    #[test]
    fn rank_scores_and_compounds() -> Result<(), VcfError> {
        let case = example_case();
        let csq_header = CsqHeader::default();
        let mut record = snv_record();
        record.info.insert(
            "RankScore",
            Value::String(String::from("643594:24,other:1")),
        );
        record.info.insert(
            "Compounds",
            Value::String(String::from("643594:chr1_1000_A_G>15")),
        );
        let variant = parse_variant(&record, &config(&case, &csq_header))?;
        // case id contains `_` but no `-`, so the genmod key is the case id;
        // `internal_id` matches neither group
        assert_eq!(variant.rank_score, None);
        assert!(variant.compounds.is_empty());

        let mut dash_case = example_case();
        dash_case.case_id = String::from("internal-id");
        let variant = parse_variant(&record, &config(&dash_case, &csq_header))?;
        assert_eq!(variant.rank_score, Some(24.0));
        assert_eq!(variant.compounds.len(), 1);
        assert_eq!(variant.compounds[0].display_name, "1_1000_A_G");
        Ok(())
    }

    #[test]
    fn custom_and_archive_annotations() -> Result<(), VcfError> {
        let case = example_case();
        let csq_header = CsqHeader::default();
        let mut record = snv_record();
        record.info.insert(
            "SCOUT_CUSTOM",
            Value::String(String::from("Panel|Cardiology,Confirmed|yes")),
        );
        record.info.insert("Obs", Value::Integer(12));
        record.info.insert("Frq", Value::Float(0.004));
        record.info.insert("Cancer_Somatic_Obs", Value::Integer(3));
        let variant = parse_variant(&record, &config(&case, &csq_header))?;
        assert_eq!(variant.custom.get("Panel").map(String::as_str), Some("Cardiology"));
        assert_eq!(variant.local_archive.get("local_obs"), Some(&12.0));
        assert_eq!(variant.local_archive.get("local_frq"), Some(&0.004));
        assert_eq!(variant.local_archive.get("cancer_somatic_obs"), Some(&3.0));
        Ok(())
    }

    #[test]
    fn str_info_attached_for_str_category() -> Result<(), VcfError> {
        let case = example_case();
        let csq_header = CsqHeader::default();
        let mut record = snv_record();
        record.info.insert("REPID", Value::String(String::from("HTT")));
        record.info.insert("RL", Value::Integer(57));
        let mut cfg = config(&case, &csq_header);
        cfg.category = Some(Category::Str);
        let variant = parse_variant(&record, &cfg)?;
        assert_eq!(variant.category, Category::Str);
        assert_eq!(variant.sub_category, Some(SubCategory::Str));
        let str_info = variant.str_info.expect("STR info should be attached");
        assert_eq!(str_info.str_repid.as_deref(), Some("HTT"));
        assert_eq!(variant.length, 57);
        Ok(())
    }

    #[test]
    fn none_keys_dropped_from_json() -> Result<(), VcfError> {
        let case = example_case();
        let csq_header = CsqHeader::default();
        let mut record = snv_record();
        record.info.insert("CSQ", Value::String(String::new()));
        let variant = parse_variant(&record, &config(&case, &csq_header))?;
        let json = serde_json::to_value(&variant).expect("variant should serialize");
        let object = json.as_object().expect("variant serializes to an object");
        assert!(!object.contains_key("cadd_score"));
        assert!(!object.contains_key("mate_id"));
        assert!(!object.contains_key("str_info"));
        assert!(object.contains_key("_id"));
        Ok(())
    }
}
