//! Per-individual genotype extraction across caller FORMAT dialects.

use crate::case::Individual;
use crate::variant::info::FieldMap;

/// Genotype information for one individual at one variant.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GenotypeRecord {
    /// Individual id.
    pub individual_id: String,
    /// Display name of the individual.
    pub display_name: String,
    /// Genotype call, e.g. `0/1`; `./.` when missing.
    pub genotype_call: String,
    /// Total read depth.
    pub read_depth: Option<i64>,
    /// Reads supporting the reference allele.
    pub ref_depth: Option<i64>,
    /// Reads supporting the alternative allele.
    pub alt_depth: Option<i64>,
    /// Fraction of reads supporting the alternative allele.
    pub alt_frequency: Option<f64>,
    /// Genotype quality.
    pub genotype_quality: Option<i64>,
    /// Split reads supporting the alternative allele.
    pub split_read: Option<i64>,
    /// Copy number (SV callers).
    pub copy_number: Option<i64>,
    /// Read-class tag from STR callers.
    pub so: Option<String>,
    /// Motif count of the alternative allele (TRGT).
    pub alt_mc: Option<i64>,
    /// Motif count of the reference allele (TRGT).
    pub ref_mc: Option<i64>,
    /// Fusion fragments per million.
    pub ffpm: Option<f64>,
}

/// Negative depth accessors mean "unknown" and must surface as null.
fn non_negative(value: Option<i64>) -> Option<i64> {
    value.filter(|v| *v >= 0)
}

/// Pull element `index` out of a two-element per-allele FORMAT array.
fn allele_component(sample: &FieldMap, key: &str, index: usize) -> Option<i64> {
    let values = sample.get_i64_list(key)?;
    non_negative(values.get(index).copied())
}

/// Parse a `ref/alt` or `ref,alt` STR depth cell.
fn str_components(sample: &FieldMap, key: &str) -> Option<(i64, i64)> {
    let raw = sample.get_string(key)?;
    let mut parts = raw.split(['/', ',']).map(|v| v.trim().parse::<i64>().ok());
    let reference = parts.next()??;
    let alternative = parts.next()??;
    Some((reference, alternative))
}

/// Sum available non-negative components, `None` when nothing is present.
fn sum_components(components: &[Option<i64>]) -> Option<i64> {
    let present: Vec<i64> = components.iter().copied().flatten().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum())
    }
}

/// Extract genotype records for all individuals of the case.
///
/// `samples` is aligned with the case's positional individual order.
/// `pathologic_struc` carries the TRGT pathologic motif indices from INFO.
pub fn parse_genotypes(
    individuals: &[Individual],
    samples: &[FieldMap],
    pathologic_struc: Option<&[usize]>,
) -> Vec<GenotypeRecord> {
    individuals
        .iter()
        .zip(samples.iter())
        .map(|(individual, sample)| parse_genotype(individual, sample, pathologic_struc))
        .collect()
}

/// Extract one individual's genotype record.
pub fn parse_genotype(
    individual: &Individual,
    sample: &FieldMap,
    pathologic_struc: Option<&[usize]>,
) -> GenotypeRecord {
    let genotype_call = sample
        .get_string("GT")
        .filter(|call| !call.is_empty())
        .unwrap_or_else(|| String::from("./."));

    let (mut ref_depth, mut alt_depth) = match sample.get_i64_list("AD") {
        Some(ad) if !ad.is_empty() => (
            non_negative(ad.first().copied()),
            non_negative(ad.get(1).copied()),
        ),
        _ => (None, None),
    };

    if ref_depth.is_none() && alt_depth.is_none() {
        // SV caller dialects: Delly DR/DV, TIDDIT RR/RV, Manta PR/SR
        let str_sp = str_components(sample, "ADSP");
        let str_fl = str_components(sample, "ADFL");
        let str_ir = str_components(sample, "ADIR");
        ref_depth = sum_components(&[
            non_negative(sample.get_i64("DR")),
            non_negative(sample.get_i64("RR")),
            allele_component(sample, "PR", 0),
            allele_component(sample, "SR", 0),
            str_sp.map(|(r, _)| r),
            str_fl.map(|(r, _)| r),
            str_ir.map(|(r, _)| r),
        ]);
        alt_depth = sum_components(&[
            non_negative(sample.get_i64("DV")),
            non_negative(sample.get_i64("RV")),
            allele_component(sample, "PR", 1),
            allele_component(sample, "SR", 1),
            str_sp.map(|(_, a)| a),
            str_fl.map(|(_, a)| a),
            str_ir.map(|(_, a)| a),
            // MEI callers report alt support only
            non_negative(sample.get_i64("SP")),
            non_negative(sample.get_i64("CLIP5")),
            non_negative(sample.get_i64("CLIP3")),
        ]);
    }

    let read_depth = non_negative(sample.get_i64("DP"))
        .or_else(|| sample.get_f64("LC").map(|lc| lc.round() as i64))
        .or_else(|| match (ref_depth, alt_depth) {
            (Some(reference), Some(alternative)) => Some(reference + alternative),
            _ => None,
        });

    let alt_frequency = sample.get_f64("AF").or_else(|| {
        match (alt_depth, read_depth) {
            (Some(alternative), Some(depth)) if depth > 0 => {
                Some(alternative as f64 / depth as f64)
            }
            _ => None,
        }
    });

    let (ref_mc, alt_mc) = parse_motif_counts(sample, &genotype_call, pathologic_struc);

    GenotypeRecord {
        individual_id: individual.individual_id.clone(),
        display_name: individual.display_name().to_string(),
        genotype_call,
        read_depth,
        ref_depth,
        alt_depth,
        alt_frequency,
        genotype_quality: non_negative(sample.get_i64("GQ")),
        split_read: allele_component(sample, "SR", 1),
        copy_number: non_negative(sample.get_i64("CN")),
        so: sample
            .get_string("SO")
            .filter(|so| !so.is_empty() && so.as_str() != "."),
        alt_mc,
        ref_mc,
        ffpm: sample.get_f64("FFPM"),
    }
}

/// Parse TRGT `MC` motif counts for the ref and alt alleles.
///
/// `MC` carries one `_`-separated motif count list per genotype allele.
/// The pathologic indices select which motifs to sum; absent indices mean
/// all motifs.  A `GT`/`MC` length mismatch yields no counts.
fn parse_motif_counts(
    sample: &FieldMap,
    genotype_call: &str,
    pathologic_struc: Option<&[usize]>,
) -> (Option<i64>, Option<i64>) {
    let raw = match sample.get_string("MC") {
        Some(raw) if !raw.is_empty() && raw != "." => raw,
        _ => return (None, None),
    };
    let per_allele: Vec<Vec<i64>> = raw
        .split(',')
        .map(|allele| {
            allele
                .split('_')
                .filter_map(|count| count.trim().parse().ok())
                .collect()
        })
        .collect();

    let alleles: Vec<&str> = genotype_call.split(['/', '|']).collect();
    if alleles.len() != per_allele.len() {
        tracing::warn!(
            "GT has {} alleles but MC has {} entries",
            alleles.len(),
            per_allele.len()
        );
        return (None, None);
    }

    let sum_pathologic = |counts: &[i64]| -> i64 {
        match pathologic_struc {
            Some(indices) => indices
                .iter()
                .filter_map(|index| counts.get(*index))
                .sum(),
            None => counts.iter().sum(),
        }
    };

    let mut ref_mc = None;
    let mut alt_mc = None;
    for (allele, counts) in alleles.iter().zip(per_allele.iter()) {
        if *allele == "0" {
            ref_mc = Some(sum_pathologic(counts));
        } else if *allele != "." {
            alt_mc = Some(sum_pathologic(counts));
        }
    }
    (ref_mc, alt_mc)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::case::{AnalysisType, PhenotypeStatus, Sex};
    use crate::variant::info::Value;

    fn individual() -> Individual {
        Individual {
            individual_id: String::from("ADM1059A2"),
            display_name: Some(String::from("proband")),
            sex: Sex::Male,
            phenotype: PhenotypeStatus::Affected,
            analysis_type: AnalysisType::Wgs,
        }
    }

    #[test]
    fn snv_with_ad() {
        let sample = FieldMap::from_pairs([
            ("GT", Value::String(String::from("0/1"))),
            ("AD", Value::IntegerArray(vec![Some(20), Some(18)])),
            ("DP", Value::Integer(38)),
            ("GQ", Value::Integer(99)),
        ]);
        let record = parse_genotype(&individual(), &sample, None);
        assert_eq!(record.genotype_call, "0/1");
        assert_eq!(record.ref_depth, Some(20));
        assert_eq!(record.alt_depth, Some(18));
        assert_eq!(record.read_depth, Some(38));
        assert_eq!(record.genotype_quality, Some(99));
        assert_eq!(record.display_name, "proband");
    }

    #[test]
    fn missing_depths_stay_null() {
        let sample = FieldMap::from_pairs([("GT", Value::String(String::from("./.")))]);
        let record = parse_genotype(&individual(), &sample, None);
        assert_eq!(record.genotype_call, "./.");
        assert_eq!(record.ref_depth, None);
        assert_eq!(record.alt_depth, None);
        assert_eq!(record.read_depth, None);
        assert_eq!(record.alt_frequency, None);
    }

    #[test]
    fn negative_ad_means_unknown() {
        let sample = FieldMap::from_pairs([
            ("GT", Value::String(String::from("0/1"))),
            ("AD", Value::IntegerArray(vec![Some(-1), Some(-1)])),
        ]);
        let record = parse_genotype(&individual(), &sample, None);
        assert_eq!(record.ref_depth, None);
        assert_eq!(record.alt_depth, None);
    }

    #[test]
    fn manta_paired_and_split_reads() {
        let sample = FieldMap::from_pairs([
            ("GT", Value::String(String::from("0/1"))),
            ("PR", Value::IntegerArray(vec![Some(30), Some(12)])),
            ("SR", Value::IntegerArray(vec![Some(10), Some(7)])),
        ]);
        let record = parse_genotype(&individual(), &sample, None);
        assert_eq!(record.ref_depth, Some(40));
        assert_eq!(record.alt_depth, Some(19));
        assert_eq!(record.read_depth, Some(59));
        assert_eq!(record.split_read, Some(7));
    }

    #[test]
    fn delly_discordant_reads() {
        let sample = FieldMap::from_pairs([
            ("GT", Value::String(String::from("0/1"))),
            ("DR", Value::Integer(25)),
            ("DV", Value::Integer(9)),
        ]);
        let record = parse_genotype(&individual(), &sample, None);
        assert_eq!(record.ref_depth, Some(25));
        assert_eq!(record.alt_depth, Some(9));
    }

    #[test]
    fn mei_clip_support() {
        let sample = FieldMap::from_pairs([
            ("GT", Value::String(String::from("0/1"))),
            ("SP", Value::Integer(5)),
            ("CLIP5", Value::Integer(3)),
            ("CLIP3", Value::Integer(2)),
        ]);
        let record = parse_genotype(&individual(), &sample, None);
        assert_eq!(record.alt_depth, Some(10));
        assert_eq!(record.ref_depth, None);
    }

    #[test]
    fn lc_rounds_to_read_depth() {
        let sample = FieldMap::from_pairs([
            ("GT", Value::String(String::from("0/1"))),
            ("LC", Value::Float(37.6)),
        ]);
        let record = parse_genotype(&individual(), &sample, None);
        assert_eq!(record.read_depth, Some(38));
    }

    #[test]
    fn alt_frequency_from_depths() {
        let sample = FieldMap::from_pairs([
            ("GT", Value::String(String::from("0/1"))),
            ("AD", Value::IntegerArray(vec![Some(30), Some(10)])),
        ]);
        let record = parse_genotype(&individual(), &sample, None);
        let alt_frequency = record.alt_frequency.expect("depths are present");
        assert!(float_cmp::approx_eq!(f64, alt_frequency, 0.25, ulps = 2));
    }

    #[test]
    fn trgt_motif_counts_with_pathologic_struc() {
        let sample = FieldMap::from_pairs([
            ("GT", Value::String(String::from("1/2"))),
            (
                "MC",
                Value::StringArray(vec![
                    Some(String::from("12_3")),
                    Some(String::from("5_0")),
                ]),
            ),
        ]);
        let record = parse_genotype(&individual(), &sample, Some(&[1]));
        // both alleles are alt; the later one wins, no allele is ref
        assert_eq!(record.alt_mc, Some(0));
        assert_eq!(record.ref_mc, None);
    }

    #[test]
    fn trgt_motif_counts_without_pathologic_struc_sum_all() {
        let sample = FieldMap::from_pairs([
            ("GT", Value::String(String::from("0/1"))),
            (
                "MC",
                Value::StringArray(vec![
                    Some(String::from("12_3")),
                    Some(String::from("5_2")),
                ]),
            ),
        ]);
        let record = parse_genotype(&individual(), &sample, None);
        assert_eq!(record.ref_mc, Some(15));
        assert_eq!(record.alt_mc, Some(7));
    }

    #[test]
    fn trgt_gt_mc_mismatch() {
        let sample = FieldMap::from_pairs([
            ("GT", Value::String(String::from("0/1"))),
            ("MC", Value::String(String::from("12_3"))),
        ]);
        let record = parse_genotype(&individual(), &sample, None);
        assert_eq!(record.ref_mc, None);
        assert_eq!(record.alt_mc, None);
    }

    #[test]
    fn copy_number_sentinel() {
        let sample = FieldMap::from_pairs([
            ("GT", Value::String(String::from("0/1"))),
            ("CN", Value::Integer(-1)),
        ]);
        let record = parse_genotype(&individual(), &sample, None);
        assert_eq!(record.copy_number, None);
    }
}
