//! Parsing of VEP `CSQ` INFO strings into transcript records.
//!
//! The `CSQ` header line carries the pipe-separated field list; each comma
//! separated CSQ entry is zipped against it and turned into a `Transcript`.

use indexmap::IndexMap;
use noodles::vcf;

use crate::catalog::genes::GeneIndex;

/// Putative impact level of a consequence, most severe first.
///
/// The declaration order is the severity rank: deriving `Ord` makes
/// "lower is more severe" comparisons direct.
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
    PartialOrd,
    Ord,
    Hash,
)]
#[display(style = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Consequence {
    TranscriptAblation,
    SpliceDonorVariant,
    SpliceAcceptorVariant,
    StopGained,
    FrameshiftVariant,
    StopLost,
    StartLost,
    InitiatorCodonVariant,
    InframeInsertion,
    InframeDeletion,
    MissenseVariant,
    ProteinAlteringVariant,
    TranscriptAmplification,
    SpliceRegionVariant,
    #[display("splice_donor_5th_base_variant")]
    #[serde(rename = "splice_donor_5th_base_variant")]
    SpliceDonorFifthBaseVariant,
    SpliceDonorRegionVariant,
    SplicePolypyrimidineTractVariant,
    IncompleteTerminalCodonVariant,
    SynonymousVariant,
    StartRetainedVariant,
    StopRetainedVariant,
    CodingSequenceVariant,
    #[display("mature_miRNA_variant")]
    #[serde(rename = "mature_miRNA_variant")]
    MatureMirnaVariant,
    #[display("5_prime_UTR_variant")]
    #[serde(rename = "5_prime_UTR_variant")]
    FivePrimeUtrVariant,
    #[display("3_prime_UTR_variant")]
    #[serde(rename = "3_prime_UTR_variant")]
    ThreePrimeUtrVariant,
    NonCodingTranscriptExonVariant,
    NonCodingTranscriptVariant,
    IntronVariant,
    #[display("NMD_transcript_variant")]
    #[serde(rename = "NMD_transcript_variant")]
    NmdTranscriptVariant,
    UpstreamGeneVariant,
    DownstreamGeneVariant,
    #[display("TFBS_ablation")]
    #[serde(rename = "TFBS_ablation")]
    TfbsAblation,
    #[display("TFBS_amplification")]
    #[serde(rename = "TFBS_amplification")]
    TfbsAmplification,
    #[display("TF_binding_site_variant")]
    #[serde(rename = "TF_binding_site_variant")]
    TfBindingSiteVariant,
    RegulatoryRegionAblation,
    RegulatoryRegionAmplification,
    RegulatoryRegionVariant,
    FeatureElongation,
    FeatureTruncation,
    IntergenicVariant,
}

impl Consequence {
    /// The genomic region label used for filtering.
    pub fn region(&self) -> Region {
        use Consequence::*;
        match self {
            TranscriptAblation | StopGained | FrameshiftVariant | StopLost | StartLost
            | InitiatorCodonVariant | InframeInsertion | InframeDeletion | MissenseVariant
            | ProteinAlteringVariant | TranscriptAmplification
            | IncompleteTerminalCodonVariant | SynonymousVariant | StartRetainedVariant
            | StopRetainedVariant | CodingSequenceVariant => Region::Exonic,
            SpliceDonorVariant | SpliceAcceptorVariant | SpliceRegionVariant
            | SpliceDonorFifthBaseVariant | SpliceDonorRegionVariant
            | SplicePolypyrimidineTractVariant => Region::Splicing,
            MatureMirnaVariant | NonCodingTranscriptExonVariant => Region::NcRnaExonic,
            FivePrimeUtrVariant => Region::FivePrimeUtr,
            ThreePrimeUtrVariant => Region::ThreePrimeUtr,
            NonCodingTranscriptVariant | NmdTranscriptVariant => Region::NcRna,
            IntronVariant => Region::Intronic,
            UpstreamGeneVariant => Region::Upstream,
            DownstreamGeneVariant => Region::Downstream,
            TfbsAblation | TfbsAmplification | TfBindingSiteVariant => Region::Tfbs,
            RegulatoryRegionAblation | RegulatoryRegionAmplification
            | RegulatoryRegionVariant => Region::RegulatoryRegion,
            FeatureElongation | FeatureTruncation => Region::GenomicFeature,
            IntergenicVariant => Region::Intergenic,
        }
    }
}

/// Genomic region annotation derived from a consequence.
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
pub enum Region {
    #[display("exonic")]
    #[serde(rename = "exonic")]
    Exonic,
    #[display("splicing")]
    #[serde(rename = "splicing")]
    Splicing,
    #[display("5UTR")]
    #[serde(rename = "5UTR")]
    FivePrimeUtr,
    #[display("3UTR")]
    #[serde(rename = "3UTR")]
    ThreePrimeUtr,
    #[display("ncRNA_exonic")]
    #[serde(rename = "ncRNA_exonic")]
    NcRnaExonic,
    #[display("ncRNA")]
    #[serde(rename = "ncRNA")]
    NcRna,
    #[display("intronic")]
    #[serde(rename = "intronic")]
    Intronic,
    #[display("upstream")]
    #[serde(rename = "upstream")]
    Upstream,
    #[display("downstream")]
    #[serde(rename = "downstream")]
    Downstream,
    #[display("TFBS")]
    #[serde(rename = "TFBS")]
    Tfbs,
    #[display("regulatory_region")]
    #[serde(rename = "regulatory_region")]
    RegulatoryRegion,
    #[display("genomic_feature")]
    #[serde(rename = "genomic_feature")]
    GenomicFeature,
    #[display("intergenic_variant")]
    #[serde(rename = "intergenic_variant")]
    Intergenic,
}

/// The uppercased CSQ field names extracted from the VCF header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsqHeader {
    fields: Vec<String>,
}

impl CsqHeader {
    /// Build from an explicit field list.
    pub fn new(fields: Vec<String>) -> Self {
        Self {
            fields: fields.iter().map(|f| f.to_uppercase()).collect(),
        }
    }

    /// Extract the field list from the `##INFO=<ID=CSQ,...>` description.
    ///
    /// VEP writes `Description="Consequence annotations ... Format: A|B|C"`.
    pub fn from_vcf_header(header: &vcf::Header) -> Option<Self> {
        let description = header.infos().get("CSQ")?.description();
        let format = description.rsplit("Format:").next()?;
        Some(Self::new(
            format.trim().split('|').map(|s| s.trim().to_string()).collect(),
        ))
    }

    /// Whether any field names were extracted.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Zip one raw CSQ entry against the header into a field map.
    ///
    /// Entries shorter than the header keep their missing fields empty.
    fn entry_map<'a>(&'a self, raw: &str) -> IndexMap<&'a str, String> {
        let values: Vec<&str> = raw.split('|').collect();
        if values.len() != self.fields.len() {
            tracing::warn!(
                "CSQ entry has {} fields, header has {}",
                values.len(),
                self.fields.len()
            );
        }
        self.fields
            .iter()
            .enumerate()
            .map(|(i, name)| {
                (
                    name.as_str(),
                    values.get(i).copied().unwrap_or_default().to_string(),
                )
            })
            .collect()
    }
}

/// One parsed VEP transcript annotation.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Transcript {
    /// Ensembl transcript id.
    pub transcript_id: String,
    /// HGNC id, numeric from `HGNC_ID` or resolved from the symbol.
    pub hgnc_id: Option<u32>,
    /// Gene symbol.
    pub hgnc_symbol: Option<String>,
    /// Ensembl protein id.
    pub protein_id: Option<String>,
    /// SIFT prediction, `(score)` suffix stripped.
    pub sift_prediction: Option<String>,
    /// PolyPhen prediction, `(score)` suffix stripped.
    pub polyphen_prediction: Option<String>,
    /// REVEL rank score.
    pub revel: Option<f64>,
    /// Maximum SpliceAI delta score over the four classes.
    pub spliceai_delta_score: Option<f64>,
    /// Delta position matching the maximum delta score.
    pub spliceai_delta_position: Option<i32>,
    /// Readable summary of all four SpliceAI class predictions.
    pub spliceai_prediction: Option<String>,
    /// 1000 Genomes allele frequency.
    pub thousand_g_maf: Option<f64>,
    /// Maximum 1000 Genomes population frequency.
    pub thousandg_max: Option<f64>,
    /// gnomAD allele frequency.
    pub gnomad_maf: Option<f64>,
    /// Maximum gnomAD population frequency.
    pub gnomad_max: Option<f64>,
    /// ExAC allele frequency.
    pub exac_maf: Option<f64>,
    /// Maximum ExAC population frequency.
    pub exac_max: Option<f64>,
    /// GERP++ conservation score.
    pub gerp: Option<String>,
    /// phastCons 100-way vertebrate score.
    pub phast_conservation: Option<String>,
    /// phyloP 100-way vertebrate score.
    pub phylop_conservation: Option<String>,
    /// ClinVar significance terms on this transcript, lower-cased.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clnsig: Vec<String>,
    /// ClinVar variation id.
    pub clinvar_clnvid: Option<u32>,
    /// ClinVar review status.
    pub clinvar_revstat: Option<String>,
    /// HGVS coding sequence name (right of the `:`).
    pub coding_sequence_name: Option<String>,
    /// HGVS protein sequence name (right of the `:`).
    pub protein_sequence_name: Option<String>,
    /// Pfam domain id.
    pub pfam_domain: Option<String>,
    /// PROSITE profile id.
    pub prosite_profile: Option<String>,
    /// SMART domain id.
    pub smart_domain: Option<String>,
    /// Whether VEP flags the transcript as canonical.
    pub is_canonical: bool,
    /// MANE Select transcript tag.
    pub mane_select_transcript: Option<String>,
    /// MANE Plus Clinical transcript tag.
    pub mane_plus_clinical_transcript: Option<String>,
    /// All consequence terms of the entry.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub functional_annotations: Vec<Consequence>,
    /// Region label per consequence term.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub region_annotations: Vec<Region>,
    /// Exon number, e.g. `2/11`.
    pub exon: Option<String>,
    /// Intron number.
    pub intron: Option<String>,
    /// dbSNP ids from `EXISTING_VARIATION`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dbsnp_ids: Vec<String>,
    /// COSMIC ids from `EXISTING_VARIATION` and `COSMIC`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cosmic_ids: Vec<String>,
}

impl Transcript {
    /// The most severe of the entry's consequences.
    pub fn most_severe_consequence(&self) -> Option<Consequence> {
        self.functional_annotations.iter().min().copied()
    }
}

/// Strip a trailing `(score)` from a VEP predictor value.
fn strip_prediction_score(value: &str) -> String {
    match value.find('(') {
        Some(pos) => value[..pos].to_string(),
        None => value.to_string(),
    }
}

/// Parse a VEP float cell, taking the maximum of `&`-joined values.
fn parse_float(value: &str) -> Option<f64> {
    value
        .split('&')
        .filter_map(|v| v.trim().parse::<f64>().ok())
        .fold(None, |acc: Option<f64>, v| {
            Some(acc.map_or(v, |a| a.max(v)))
        })
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value == "." {
        None
    } else {
        Some(value.to_string())
    }
}

/// Parse the `HGNC_ID` cell, which may carry a `HGNC:` prefix.
fn parse_hgnc_id(value: &str) -> Option<u32> {
    value.trim().trim_start_matches("HGNC:").parse().ok()
}

const SPLICEAI_CLASSES: &[&str] = &["AG", "AL", "DG", "DL"];

/// Parse one raw CSQ string (the full INFO value) into transcripts.
pub fn parse_transcripts(
    csq: &str,
    header: &CsqHeader,
    gene_index: Option<&GeneIndex>,
) -> Vec<Transcript> {
    csq.split(',')
        .filter(|entry| !entry.is_empty())
        .map(|entry| parse_entry(&header.entry_map(entry), gene_index))
        .collect()
}

fn parse_entry(fields: &IndexMap<&str, String>, gene_index: Option<&GeneIndex>) -> Transcript {
    let get = |key: &str| fields.get(key).map(|s| s.as_str()).unwrap_or_default();

    let mut transcript = Transcript {
        transcript_id: get("FEATURE").to_string(),
        hgnc_symbol: non_empty(get("SYMBOL")),
        protein_id: non_empty(get("ENSP")),
        ..Default::default()
    };

    transcript.hgnc_id = parse_hgnc_id(get("HGNC_ID")).or_else(|| {
        transcript
            .hgnc_symbol
            .as_deref()
            .and_then(|symbol| gene_index.and_then(|index| index.resolve_symbol(symbol)))
    });

    for raw in get("CONSEQUENCE").split('&').filter(|s| !s.is_empty()) {
        match raw.parse::<Consequence>() {
            Ok(consequence) => {
                transcript.functional_annotations.push(consequence);
                transcript.region_annotations.push(consequence.region());
            }
            Err(_) => {
                tracing::warn!("unknown consequence term {}", raw);
            }
        }
    }

    transcript.sift_prediction = non_empty(get("SIFT"))
        .map(|v| strip_prediction_score(&v))
        .or_else(|| Some(String::from("unknown")));
    transcript.polyphen_prediction = non_empty(get("POLYPHEN"))
        .map(|v| strip_prediction_score(&v))
        .or_else(|| Some(String::from("unknown")));
    transcript.revel = parse_float(get("REVEL_RANKSCORE"));

    let mut predictions = Vec::new();
    for class in SPLICEAI_CLASSES {
        let score = parse_float(get(&format!("SPLICEAI_PRED_DS_{}", class)));
        let position = get(&format!("SPLICEAI_PRED_DP_{}", class))
            .trim()
            .parse::<i32>()
            .ok();
        if let Some(score) = score {
            predictions.push(format!(
                "{} {} {}",
                class,
                score,
                position.map_or_else(|| String::from("."), |p| p.to_string())
            ));
            if transcript.spliceai_delta_score.map_or(true, |max| score > max) {
                transcript.spliceai_delta_score = Some(score);
                transcript.spliceai_delta_position = position;
            }
        }
    }
    if !predictions.is_empty() {
        transcript.spliceai_prediction = Some(predictions.join(", "));
    }

    for (key, value) in fields {
        if !key.ends_with("AF") {
            continue;
        }
        let value = match parse_float(value) {
            Some(value) => value,
            None => continue,
        };
        match *key {
            "AF" | "1000GAF" => transcript.thousand_g_maf = Some(value),
            "GNOMAD_AF" => transcript.gnomad_maf = Some(value),
            "EXAC_MAX_AF" => {
                transcript.exac_maf = Some(value);
                transcript.exac_max = Some(value);
            }
            key if key.contains("GNOMAD") => {
                transcript.gnomad_max =
                    Some(transcript.gnomad_max.map_or(value, |max| max.max(value)));
            }
            _ => {
                transcript.thousandg_max =
                    Some(transcript.thousandg_max.map_or(value, |max| max.max(value)));
            }
        }
    }

    transcript.gerp = non_empty(get("GERP++_RS"));
    transcript.phast_conservation = non_empty(get("PHASTCONS100WAY_VERTEBRATE"));
    transcript.phylop_conservation = non_empty(get("PHYLOP100WAY_VERTEBRATE"));

    if let Some(clnsig) = non_empty(get("CLINVAR_CLNSIG")) {
        transcript.clnsig = clnsig
            .split('&')
            .map(|term| term.to_lowercase())
            .collect();
    } else if let Some(clin_sig) = non_empty(get("CLIN_SIG")) {
        transcript.clnsig = clin_sig
            .split('&')
            .map(|term| term.to_lowercase())
            .collect();
    }
    transcript.clinvar_clnvid = get("CLINVAR_CLNVID").trim().parse().ok();
    transcript.clinvar_revstat = non_empty(get("CLINVAR_CLNREVSTAT")).map(|v| v.to_lowercase());

    transcript.coding_sequence_name = non_empty(get("HGVSC"))
        .map(|v| v.rsplit(':').next().unwrap_or(&v).to_string());
    transcript.protein_sequence_name = non_empty(get("HGVSP"))
        .map(|v| v.rsplit(':').next().unwrap_or(&v).to_string());

    for domain in get("DOMAINS").split('&').filter(|s| !s.is_empty()) {
        let mut parts = domain.splitn(2, ':');
        let source = parts.next().unwrap_or_default().to_lowercase();
        let id = match parts.next() {
            Some(id) => id.to_string(),
            None => continue,
        };
        if source.contains("pfam") {
            transcript.pfam_domain.get_or_insert(id);
        } else if source.contains("prosite") {
            transcript.prosite_profile.get_or_insert(id);
        } else if source.contains("smart") {
            transcript.smart_domain.get_or_insert(id);
        }
    }

    transcript.is_canonical = get("CANONICAL") == "YES";
    transcript.mane_select_transcript = non_empty(get("MANE_SELECT")).or_else(|| non_empty(get("MANE")));
    transcript.mane_plus_clinical_transcript = non_empty(get("MANE_PLUS_CLINICAL"));

    transcript.exon = non_empty(get("EXON"));
    transcript.intron = non_empty(get("INTRON"));

    for id in get("EXISTING_VARIATION")
        .split('&')
        .chain(get("COSMIC").split('&'))
        .filter(|s| !s.is_empty())
    {
        if id.starts_with("rs") {
            transcript.dbsnp_ids.push(id.to_string());
        } else if id.starts_with("COS") {
            transcript.cosmic_ids.push(id.to_string());
        }
    }

    transcript
}
