//! Genmod rank scores, rank result breakdowns, and compound links.

use indexmap::IndexMap;

use crate::common::{document_id, strip_chr_prefix};
use crate::variant::info::FieldMap;
use crate::variant::VariantType;

/// A compound-heterozygous peer variant reference.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Compound {
    /// Document id of the peer variant, which may not be loaded yet.
    pub variant: String,
    /// Human readable `chrom_pos_ref_alt` name.
    pub display_name: String,
    /// Genmod combined score; `0.0` when missing.
    pub combined_score: f64,
    /// Lazily resolved by the consumer once the peer is loaded.
    pub not_loaded: bool,
}

/// Select the value of a `case:value` pair list matching the genmod key.
///
/// Genmod writes one `,`-separated `case_id:value` pair per family; the
/// case is addressed by its genmod key (§ the case model).  Pairs for other
/// cases are ignored.
fn select_case_value<'a>(raw: &'a str, genmod_key: &str) -> Option<&'a str> {
    raw.split(',').find_map(|pair| {
        let (case, value) = pair.trim().rsplit_once(':')?;
        if case == genmod_key {
            Some(value)
        } else {
            None
        }
    })
}

/// Parse `RankScore` or `RankScoreNormalized` for the given case.
pub fn parse_rank_score(info: &FieldMap, key: &str, genmod_key: &str) -> Option<f64> {
    let raw = info.get_string(key)?;
    select_case_value(&raw, genmod_key)?.trim().parse().ok()
}

/// Zip the pipe-separated `RankResult` scores with the header labels.
pub fn parse_rank_result(info: &FieldMap, header: &[String]) -> IndexMap<String, i64> {
    let raw = match info.get_string("RankResult") {
        Some(raw) => raw,
        None => return IndexMap::new(),
    };
    header
        .iter()
        .zip(raw.split('|'))
        .filter_map(|(label, score)| {
            score
                .trim()
                .parse::<i64>()
                .ok()
                .map(|score| (label.clone(), score))
        })
        .collect()
}

/// Parse the `GeneticModels` entry for the given case.
pub fn parse_genetic_models(info: &FieldMap, genmod_key: &str) -> Vec<String> {
    let raw = match info.get_string("GeneticModels") {
        Some(raw) => raw,
        None => return Vec::new(),
    };
    match select_case_value(&raw, genmod_key) {
        Some(models) => models
            .split('|')
            .filter(|model| !model.is_empty())
            .map(String::from)
            .collect(),
        None => Vec::new(),
    }
}

/// Parse the `Compounds` entry for the given case.
///
/// Format: `case:chr1_1000_A_G>15|chr2_2000_T_C>9,other_case:...`.  Only
/// the group matching the genmod key is kept; the peer's document id is
/// computed from its coordinates so it can be resolved once loaded.
pub fn parse_compounds(
    info: &FieldMap,
    case_id: &str,
    genmod_key: &str,
    variant_type: VariantType,
) -> Vec<Compound> {
    let raw = match info.get_string("Compounds") {
        Some(raw) => raw,
        None => return Vec::new(),
    };
    let group = match select_case_value(&raw, genmod_key) {
        Some(group) => group,
        None => return Vec::new(),
    };

    group
        .split('|')
        .filter(|compound| !compound.is_empty())
        .filter_map(|compound| {
            let (name, score) = match compound.split_once('>') {
                Some((name, score)) => (name, score.trim().parse::<f64>().unwrap_or(0.0)),
                None => (compound, 0.0),
            };
            let name = strip_chr_prefix(name.trim());
            let mut parts = name.splitn(4, '_');
            let chrom = strip_chr_prefix(parts.next()?);
            let pos = parts.next()?.parse::<i64>().ok()?;
            let reference = parts.next()?;
            let alternative = parts.next()?;
            Some(Compound {
                variant: document_id(
                    chrom,
                    pos,
                    reference,
                    alternative,
                    variant_type.as_str(),
                    case_id,
                ),
                display_name: format!("{}_{}_{}_{}", chrom, pos, reference, alternative),
                combined_score: score,
                not_loaded: true,
            })
        })
        .collect()
}
