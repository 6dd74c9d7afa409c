//! Reduction of per-transcript annotations to per-gene summaries.

use indexmap::IndexMap;

use crate::variant::csq::{Consequence, Region, Transcript};

/// Per-gene summary over the variant's transcripts.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Gene {
    /// All transcripts of the gene that annotate this variant.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transcripts: Vec<Transcript>,
    /// The transcript carrying the most severe consequence.
    pub most_severe_transcript: Option<Transcript>,
    /// Most severe consequence over all transcripts.
    pub most_severe_consequence: Option<Consequence>,
    /// SIFT prediction of the most severe transcript.
    pub most_severe_sift: Option<String>,
    /// PolyPhen prediction of the most severe transcript.
    pub most_severe_polyphen: Option<String>,
    /// Region label of the most severe consequence.
    pub most_severe_region: Option<Region>,
    /// HGNC id of the gene.
    pub hgnc_id: Option<u32>,
    /// Gene symbol.
    pub hgnc_symbol: Option<String>,
    /// Preferred HGVS coding sequence identifier.
    pub hgvs_identifier: Option<String>,
    /// Id of the canonical transcript, if one is flagged.
    pub canonical_transcript: Option<String>,
    /// Exon of the most severe transcript.
    pub exon: Option<String>,
}

/// Group transcripts by gene and summarize each group.
///
/// Grouping is by HGNC id with the symbol as fallback key.  Within a group
/// the most severe transcript wins; on ties the first by appearance does.
pub fn reduce_genes(transcripts: &[Transcript]) -> Vec<Gene> {
    let mut groups: IndexMap<String, Vec<&Transcript>> = IndexMap::new();
    for transcript in transcripts {
        let key = match (&transcript.hgnc_id, &transcript.hgnc_symbol) {
            (Some(hgnc_id), _) => hgnc_id.to_string(),
            (None, Some(symbol)) => symbol.clone(),
            (None, None) => continue,
        };
        groups.entry(key).or_default().push(transcript);
    }

    groups
        .into_values()
        .map(|group| reduce_group(&group))
        .collect()
}

fn reduce_group(group: &[&Transcript]) -> Gene {
    // first strictly-smaller rank wins, which keeps appearance order on ties
    let mut most_severe: Option<(&Transcript, Consequence)> = None;
    for transcript in group.iter().copied() {
        if let Some(consequence) = transcript.most_severe_consequence() {
            let replace = match most_severe {
                Some((_, best)) => consequence < best,
                None => true,
            };
            if replace {
                most_severe = Some((transcript, consequence));
            }
        }
    }

    let canonical = group.iter().find(|tx| tx.is_canonical);
    let hgvs_identifier = canonical
        .filter(|tx| tx.coding_sequence_name.is_some())
        .or_else(|| group.first())
        .and_then(|tx| tx.coding_sequence_name.clone());

    Gene {
        transcripts: group.iter().map(|tx| (*tx).clone()).collect(),
        most_severe_transcript: most_severe.map(|(tx, _)| tx.clone()),
        most_severe_consequence: most_severe.map(|(_, consequence)| consequence),
        most_severe_sift: most_severe.and_then(|(tx, _)| tx.sift_prediction.clone()),
        most_severe_polyphen: most_severe.and_then(|(tx, _)| tx.polyphen_prediction.clone()),
        most_severe_region: most_severe.map(|(_, consequence)| consequence.region()),
        hgnc_id: group.iter().find_map(|tx| tx.hgnc_id),
        hgnc_symbol: group.iter().find_map(|tx| tx.hgnc_symbol.clone()),
        hgvs_identifier,
        canonical_transcript: canonical.map(|tx| tx.transcript_id.clone()),
        exon: most_severe.and_then(|(tx, _)| tx.exon.clone()),
    }
}
