//! End position, length, and sub-category resolution.

use crate::common::strip_chr_prefix;
use crate::variant::{Category, SubCategory};

/// Length sentinel for inter-chromosomal rearrangements.
pub const INTER_CHROM_LENGTH: i64 = 10_000_000_000;

/// Length sentinel for "unknown".
pub const UNKNOWN_LENGTH: i64 = -1;

/// Resolved coordinates of one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinates {
    /// End position.
    pub end: i64,
    /// Chromosome of the end position; differs from the record's chromosome
    /// only for inter-chromosomal breakends.
    pub end_chrom: String,
    /// Variant length; `-1` means unknown.
    pub length: i64,
    /// Resolved sub-category.
    pub sub_category: Option<SubCategory>,
    /// Mate id for breakends.
    pub mate_id: Option<String>,
}

/// The INFO fields that coordinate resolution consults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SvInfo {
    pub svtype: Option<String>,
    pub svlen: Option<i64>,
    pub end: Option<i64>,
    pub mate_id: Option<String>,
    /// Repeat length (STR callers).
    pub rl: Option<i64>,
}

/// Parse the partner locus out of a breakend ALT such as `N[hs37d5:12060532[`.
///
/// Both bracket orientations are accepted; the partner is the bracketed
/// `chrom:pos` pair.
fn parse_bnd_alt(alt: &str) -> Option<(String, i64)> {
    let inner = alt
        .split(['[', ']'])
        .find(|segment| segment.contains(':'))?;
    let (chrom, pos) = inner.rsplit_once(':')?;
    let pos = pos.parse::<i64>().ok()?;
    Some((strip_chr_prefix(chrom).to_string(), pos))
}

/// Resolve end, length, and sub-category for one record.
pub fn resolve(
    chrom: &str,
    pos: i64,
    reference: &str,
    alternative: &str,
    category: Category,
    info: &SvInfo,
) -> Coordinates {
    let chrom = strip_chr_prefix(chrom).to_string();
    match category {
        Category::Snv | Category::Cancer => {
            let sub_category = if reference.len() == 1 && alternative.len() == 1 {
                SubCategory::Snv
            } else {
                SubCategory::Indel
            };
            let length = match sub_category {
                SubCategory::Snv => 1,
                _ => (reference.len() as i64 - alternative.len() as i64).abs(),
            };
            Coordinates {
                end: pos + reference.len() as i64 - 1,
                end_chrom: chrom,
                length,
                sub_category: Some(sub_category),
                mate_id: None,
            }
        }
        Category::Sv | Category::CancerSv | Category::Mei => {
            resolve_sv(&chrom, pos, alternative, category, info)
        }
        Category::Str => {
            let length = info
                .rl
                .or(info.svlen.map(i64::abs))
                .unwrap_or(UNKNOWN_LENGTH);
            let end = info.end.unwrap_or(if length >= 0 { pos + length } else { pos });
            Coordinates {
                end,
                end_chrom: chrom,
                length,
                sub_category: Some(SubCategory::Str),
                mate_id: None,
            }
        }
        Category::Fusion | Category::Outlier => Coordinates {
            end: info.end.unwrap_or(pos),
            end_chrom: chrom,
            length: UNKNOWN_LENGTH,
            sub_category: None,
            mate_id: None,
        },
    }
}

fn resolve_sv(
    chrom: &str,
    pos: i64,
    alternative: &str,
    category: Category,
    info: &SvInfo,
) -> Coordinates {
    let svtype = info.svtype.as_deref().map(str::to_lowercase);
    let sub_category = match svtype.as_deref() {
        Some(svtype) => {
            // compound types such as `DUP:TANDEM` reduce to their prefix
            let prefix = svtype.split(':').next().unwrap_or(svtype);
            match prefix.parse::<SubCategory>() {
                Ok(sub_category) => Some(sub_category),
                Err(_) => {
                    tracing::warn!("unknown SVTYPE {}", svtype);
                    None
                }
            }
        }
        None => {
            if category == Category::Mei {
                Some(SubCategory::Ins)
            } else {
                tracing::warn!("SV record without SVTYPE at {}:{}", chrom, pos);
                None
            }
        }
    };

    if sub_category == Some(SubCategory::Bnd) {
        let (end_chrom, end) = parse_bnd_alt(alternative)
            .unwrap_or_else(|| (chrom.to_string(), info.end.unwrap_or(pos)));
        return Coordinates {
            end,
            end_chrom,
            length: INTER_CHROM_LENGTH,
            sub_category,
            mate_id: info.mate_id.clone(),
        };
    }

    let length = info.svlen.map(i64::abs).unwrap_or(UNKNOWN_LENGTH);
    let end = info.end.unwrap_or(if length >= 0 { pos + length } else { pos });
    Coordinates {
        end,
        end_chrom: chrom.to_string(),
        length,
        sub_category,
        mate_id: None,
    }
}
