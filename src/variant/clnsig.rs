//! ClinVar significance and oncogenicity parsing.
//!
//! Two INFO layouts exist in the wild: the modern one with a numeric
//! `CLNACC`/`CLNVID` accession, and the legacy one where `CLNACC`, `CLNSIG`,
//! and `CLNREVSTAT` are parallel pipe-separated lists.  When INFO carries no
//! ClinVar at all, records are synthesized from the first CSQ transcript.

use itertools::izip;

use crate::variant::csq::Transcript;
use crate::variant::info::FieldMap;

/// One clinical significance assertion.
///
/// `accession` and `revstat` are always part of the record shape; absent
/// source fields yield `None` rather than a missing key.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ClnsigRecord {
    /// Significance term, normalized to lower snake case, or a legacy
    /// numeric code.
    pub value: String,
    /// ClinVar accession.
    pub accession: Option<String>,
    /// Review status.
    pub revstat: Option<String>,
}

/// One oncogenicity assertion.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OncRecord {
    /// Oncogenicity term.
    pub value: String,
    /// Disease name from `ONCDN`.
    pub dn: Option<String>,
    /// Review status from `ONCREVSTAT`.
    pub revstat: Option<String>,
    /// ClinVar variation id.
    pub accession: Option<String>,
}

const ONCOGENICITY_TERMS: &[&str] = &[
    "benign",
    "likely_benign",
    "uncertain_significance",
    "likely_oncogenic",
    "oncogenic",
];

const PATHOGENIC_TERMS: &[&str] = &[
    "pathogenic",
    "likely_pathogenic",
    "conflicting_classifications_of_pathogenicity",
    "conflicting_interpretations_of_pathogenicity",
    "4",
    "5",
    "8",
];

/// Normalize a raw significance cell into individual terms.
///
/// Groups split on `,` and `&`, then on `/`; terms lose a leading `_`, are
/// lower-cased, and spaces become underscores.  A bare `low_penetrance`
/// entry folds into the preceding term.
fn normalize_terms(raw: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for group in raw.split([',', '&']) {
        for term in group.trim().trim_start_matches('_').split('/') {
            let term = term.trim().to_lowercase().replace(' ', "_");
            if term.is_empty() {
                continue;
            }
            if term == "low_penetrance" {
                if let Some(previous) = terms.last_mut() {
                    previous.push_str("_low_penetrance");
                    continue;
                }
            }
            terms.push(term);
        }
    }
    terms
}

/// Parse `clnsig` records from INFO, falling back to CSQ.
pub fn parse_clnsig(info: &FieldMap, transcripts: &[Transcript]) -> Vec<ClnsigRecord> {
    let accession = info
        .get_i64("CLNACC")
        .or_else(|| info.get_i64("CLNVID"))
        .map(|id| id.to_string());

    if let Some(accession) = accession {
        // modern layout with a single numeric accession
        let revstat = info
            .get_string_list("CLNREVSTAT")
            .map(|tokens| tokens.join(","));
        let raw = info.get_string("CLNSIG").unwrap_or_default();
        return normalize_terms(&raw)
            .into_iter()
            .map(|value| ClnsigRecord {
                value,
                accession: Some(accession.clone()),
                revstat: revstat.clone(),
            })
            .collect();
    }

    if let Some(raw_sig) = info.get_string("CLNSIG") {
        // legacy layout: parallel pipe-separated lists
        let raw_acc = info.get_string("CLNACC").unwrap_or_default();
        let raw_rev = info.get_string("CLNREVSTAT").unwrap_or_default();
        let mut records = Vec::new();
        for (acc, sig, rev) in izip!(
            raw_acc.split('|').chain(std::iter::repeat("")),
            raw_sig.split('|'),
            raw_rev.split('|').chain(std::iter::repeat("")),
        ) {
            for value in sig.split(',').filter(|v| !v.is_empty()) {
                records.push(ClnsigRecord {
                    value: value.trim().to_lowercase(),
                    accession: non_empty(acc),
                    revstat: non_empty(rev),
                });
            }
        }
        return records;
    }

    // no ClinVar INFO at all: synthesize from the first annotated transcript
    if let Some(transcript) = transcripts
        .iter()
        .find(|tx| !tx.clnsig.is_empty() || tx.clinvar_clnvid.is_some())
    {
        let accession = transcript.clinvar_clnvid.map(|id| id.to_string());
        return transcript
            .clnsig
            .iter()
            .map(|value| ClnsigRecord {
                value: value.clone(),
                accession: accession.clone(),
                revstat: transcript.clinvar_revstat.clone(),
            })
            .collect();
    }

    Vec::new()
}

/// Parse oncogenicity records from the `ONC*` INFO companions.
///
/// Terms outside the recognized oncogenicity vocabulary are dropped.
pub fn parse_clnsig_onc(info: &FieldMap) -> Vec<OncRecord> {
    let raw = match info.get_string("ONC") {
        Some(raw) => raw,
        None => return Vec::new(),
    };
    let accession = info.get_i64("CLNVID").map(|id| id.to_string());
    let dn = info.get_string("ONCDN");
    let revstat = info
        .get_string_list("ONCREVSTAT")
        .map(|tokens| tokens.join(","));

    normalize_terms(&raw)
        .into_iter()
        .filter(|term| ONCOGENICITY_TERMS.contains(&term.as_str()))
        .map(|value| OncRecord {
            value,
            dn: dn.clone(),
            revstat: revstat.clone(),
            accession: accession.clone(),
        })
        .collect()
}

/// Whether any parsed term counts as pathogenic.
pub fn is_pathogenic(records: &[ClnsigRecord]) -> bool {
    records
        .iter()
        .any(|record| PATHOGENIC_TERMS.contains(&record.value.as_str()))
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::variant::info::Value;

    #[test]
    fn modern_numeric_accession() {
        let info = FieldMap::from_pairs([
            ("CLNACC", Value::Integer(265_359)),
            (
                "CLNSIG",
                Value::String(String::from("Pathogenic/Likely_pathogenic")),
            ),
            (
                "CLNREVSTAT",
                Value::String(String::from("criteria_provided,multiple_submitters")),
            ),
        ]);
        let records = parse_clnsig(&info, &[]);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].value, "pathogenic");
        assert_eq!(records[1].value, "likely_pathogenic");
        assert_eq!(records[0].accession.as_deref(), Some("265359"));
        assert_eq!(
            records[0].revstat.as_deref(),
            Some("criteria_provided,multiple_submitters")
        );
    }

    #[test]
    fn low_penetrance_folds_into_preceding_term() {
        let info = FieldMap::from_pairs([
            ("CLNVID", Value::Integer(1)),
            (
                "CLNSIG",
                Value::String(String::from("Pathogenic,_low_penetrance")),
            ),
        ]);
        let records = parse_clnsig(&info, &[]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].value, "pathogenic_low_penetrance");
    }

    #[test]
    fn legacy_pipe_mode() {
        let info = FieldMap::from_pairs([
            (
                "CLNACC",
                Value::String(String::from("RCV000014440.17|RCV000014441.25")),
            ),
            ("CLNSIG", Value::String(String::from("5|5"))),
            ("CLNREVSTAT", Value::String(String::from("conf|single"))),
        ]);
        let records = parse_clnsig(&info, &[]);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].value, "5");
        assert_eq!(records[0].accession.as_deref(), Some("RCV000014440.17"));
        assert_eq!(records[0].revstat.as_deref(), Some("conf"));
        assert_eq!(records[1].value, "5");
        assert_eq!(records[1].accession.as_deref(), Some("RCV000014441.25"));
    }

    #[test]
    fn csq_synthesis_when_info_is_silent() {
        let transcript = Transcript {
            clnsig: vec![String::from("likely_pathogenic")],
            clinvar_clnvid: Some(12345),
            clinvar_revstat: Some(String::from("criteria_provided")),
            ..Default::default()
        };
        let records = parse_clnsig(&FieldMap::default(), &[transcript]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].value, "likely_pathogenic");
        assert_eq!(records[0].accession.as_deref(), Some("12345"));
        assert_eq!(records[0].revstat.as_deref(), Some("criteria_provided"));
    }

    #[test]
    fn oncogenicity_vocabulary_filter() {
        let info = FieldMap::from_pairs([
            ("CLNVID", Value::Integer(99)),
            (
                "ONC",
                Value::String(String::from("Oncogenic,not_a_real_term")),
            ),
            ("ONCDN", Value::String(String::from("Melanoma"))),
            (
                "ONCREVSTAT",
                Value::String(String::from("criteria_provided")),
            ),
        ]);
        let records = parse_clnsig_onc(&info);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].value, "oncogenic");
        assert_eq!(records[0].dn.as_deref(), Some("Melanoma"));
        assert_eq!(records[0].accession.as_deref(), Some("99"));
    }

    #[rstest::rstest]
    #[case("pathogenic", true)]
    #[case("likely_pathogenic", true)]
    #[case("5", true)]
    #[case("conflicting_interpretations_of_pathogenicity", true)]
    #[case("benign", false)]
    #[case("uncertain_significance", false)]
    fn pathogenicity(#[case] value: &str, #[case] expected: bool) {
        let records = vec![ClnsigRecord {
            value: value.to_string(),
            ..Default::default()
        }];
        assert_eq!(is_pathogenic(&records), expected);
    }
}
