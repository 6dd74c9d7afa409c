//! RNA fusion annotation (Arriba/STAR-Fusion via MegaFusion VCFs).

use crate::variant::csq::Transcript;
use crate::variant::gene_reduce::Gene;
use crate::variant::info::FieldMap;

/// Fusion annotation flattened onto the variant.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FusionInfo {
    /// 5' partner gene symbol.
    pub gene_a: Option<String>,
    /// 3' partner gene symbol.
    pub gene_b: Option<String>,
    /// Number of callers supporting the fusion.
    pub tool_hits: Option<i64>,
    /// Databases where the fusion is known.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub found_db: Vec<String>,
    /// Caller confidence score.
    pub fusion_score: Option<f64>,
    /// HGNC id of the 5' partner.
    pub hgnc_id_a: Option<u32>,
    /// HGNC id of the 3' partner.
    pub hgnc_id_b: Option<u32>,
    /// Strand orientation of the partners.
    pub orientation: Option<String>,
    /// Reading frame status.
    pub frame_status: Option<String>,
    /// Transcript id of the 5' partner.
    pub transcript_id_a: Option<String>,
    /// Transcript id of the 3' partner.
    pub transcript_id_b: Option<String>,
    /// Fused exon of the 5' partner.
    pub exon_number_a: Option<String>,
    /// Fused exon of the 3' partner.
    pub exon_number_b: Option<String>,
}

/// Treat MegaFusion `nan` placeholders as absent.
fn drop_nan(value: Option<String>) -> Option<String> {
    value.filter(|v| {
        let v = v.trim();
        !v.is_empty() && v != "nan" && v != "nan,nan" && v != "."
    })
}

fn parse_u32(info: &FieldMap, key: &str) -> Option<u32> {
    info.get_i64(key).and_then(|id| u32::try_from(id).ok())
}

/// Parse fusion INFO keys.
pub fn parse_fusion_info(info: &FieldMap) -> FusionInfo {
    FusionInfo {
        gene_a: drop_nan(info.get_string("GENEA")),
        gene_b: drop_nan(info.get_string("GENEB")),
        tool_hits: info.get_i64("TOOL_HITS"),
        found_db: drop_nan(info.get_string("FOUND_DB"))
            .map(|dbs| dbs.split(',').map(|db| db.trim().to_string()).collect())
            .unwrap_or_default(),
        fusion_score: info.get_f64("SCORE"),
        hgnc_id_a: parse_u32(info, "HGNC_ID_A"),
        hgnc_id_b: parse_u32(info, "HGNC_ID_B"),
        orientation: drop_nan(info.get_string("ORIENTATION")),
        frame_status: drop_nan(info.get_string("FRAME_STATUS")),
        transcript_id_a: drop_nan(info.get_string("TRANSCRIPT_ID_A")),
        transcript_id_b: drop_nan(info.get_string("TRANSCRIPT_ID_B")),
        exon_number_a: drop_nan(info.get_string("EXON_NUMBER_A")),
        exon_number_b: drop_nan(info.get_string("EXON_NUMBER_B")),
    }
}

/// Build one synthetic transcript and gene per available fusion partner.
///
/// Fusion VCFs carry no CSQ; the partner annotation stands in so that the
/// variant still exposes `genes` and `transcripts`.
pub fn fusion_genes(fusion: &FusionInfo) -> Vec<Gene> {
    let partners = [
        (
            fusion.hgnc_id_a,
            fusion.gene_a.as_ref(),
            fusion.transcript_id_a.as_ref(),
            fusion.exon_number_a.as_ref(),
        ),
        (
            fusion.hgnc_id_b,
            fusion.gene_b.as_ref(),
            fusion.transcript_id_b.as_ref(),
            fusion.exon_number_b.as_ref(),
        ),
    ];

    partners
        .into_iter()
        .filter(|(hgnc_id, symbol, _, _)| hgnc_id.is_some() || symbol.is_some())
        .map(|(hgnc_id, symbol, transcript_id, exon)| {
            let transcript = Transcript {
                transcript_id: transcript_id.cloned().unwrap_or_default(),
                hgnc_id,
                hgnc_symbol: symbol.cloned(),
                exon: exon.cloned(),
                ..Default::default()
            };
            Gene {
                transcripts: vec![transcript],
                hgnc_id,
                hgnc_symbol: symbol.cloned(),
                exon: exon.cloned(),
                ..Default::default()
            }
        })
        .collect()
}
