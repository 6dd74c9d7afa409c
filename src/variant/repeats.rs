//! Short-tandem-repeat INFO annotation (ExpansionHunter, TRGT, Stranger).

use crate::variant::info::FieldMap;

/// STR annotation flattened onto the variant.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StrInfo {
    /// ExpansionHunter repeat id.
    pub str_repid: Option<String>,
    /// TRGT repeat id.
    pub str_trid: Option<String>,
    /// Repeat structure.
    pub str_struc: Option<String>,
    /// Motifs of a compound repeat.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub str_motifs: Vec<String>,
    /// Indices of the pathologic motifs within `str_motifs`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub str_pathologic_struc: Vec<usize>,
    /// Repeat unit.
    pub str_ru: Option<String>,
    /// Repeat unit as shown to the user.
    pub str_display_ru: Option<String>,
    /// Reference copy number.
    pub str_ref: Option<i64>,
    /// Repeat length.
    pub str_len: Option<i64>,
    /// Stranger status, e.g. `full_mutation`.
    pub str_status: Option<String>,
    /// Upper bound of the normal range.
    pub str_normal_max: Option<i64>,
    /// Lower bound of the pathologic range.
    pub str_pathologic_min: Option<i64>,
    /// Associated disease.
    pub str_disease: Option<String>,
    /// Inheritance mode of the associated disease.
    pub str_inheritance_mode: Option<String>,
    /// HGNC id of the repeat locus.
    pub str_hgnc_id: Option<u32>,
    /// Source catalog display string.
    pub str_source_display: Option<String>,
    /// Source catalog type.
    pub str_source_type: Option<String>,
    /// Source catalog id.
    pub str_source_id: Option<String>,
}

/// Parse the `PathologicStruc` motif index list.
///
/// Written either as a bare list `0,1` or bracketed `[1]`.
pub fn parse_pathologic_struc(info: &FieldMap) -> Option<Vec<usize>> {
    let raw = info.get_string("PathologicStruc")?;
    let indices: Vec<usize> = raw
        .trim_matches(['[', ']'])
        .split(',')
        .filter_map(|index| index.trim().parse().ok())
        .collect();
    if indices.is_empty() {
        None
    } else {
        Some(indices)
    }
}

/// Flatten STR INFO keys into an `StrInfo`.
pub fn parse_str_info(info: &FieldMap) -> StrInfo {
    StrInfo {
        str_repid: info.get_string("REPID"),
        str_trid: info.get_string("TRID"),
        str_struc: info.get_string("STRUC"),
        str_motifs: info.get_string_list("MOTIFS").unwrap_or_default(),
        str_pathologic_struc: parse_pathologic_struc(info).unwrap_or_default(),
        str_ru: info.get_string("RU"),
        str_display_ru: info.get_string("DisplayRU"),
        str_ref: info.get_i64("REF"),
        str_len: info.get_i64("RL"),
        str_status: info.get_string("STR_STATUS"),
        str_normal_max: info.get_i64("STR_NORMAL_MAX"),
        str_pathologic_min: info.get_i64("STR_PATHOLOGIC_MIN"),
        str_disease: info.get_string("Disease"),
        str_inheritance_mode: info.get_string("InheritanceMode"),
        str_hgnc_id: info.get_i64("HGNCId").and_then(|id| u32::try_from(id).ok()),
        str_source_display: info.get_string("SourceDisplay"),
        str_source_type: info.get_string("Source"),
        str_source_id: info.get_string("SourceId"),
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::variant::info::Value;

    #[test]
    fn expansion_hunter_annotation() {
        let info = FieldMap::from_pairs([
            ("REPID", Value::String(String::from("HTT"))),
            ("RU", Value::String(String::from("CAG"))),
            ("DisplayRU", Value::String(String::from("CAG"))),
            ("REF", Value::Integer(19)),
            ("RL", Value::Integer(57)),
            ("STR_STATUS", Value::String(String::from("full_mutation"))),
            ("STR_NORMAL_MAX", Value::Integer(35)),
            ("STR_PATHOLOGIC_MIN", Value::Integer(40)),
            ("Disease", Value::String(String::from("HD"))),
            ("InheritanceMode", Value::String(String::from("AD"))),
            ("HGNCId", Value::Integer(4851)),
        ]);
        let parsed = parse_str_info(&info);
        assert_eq!(parsed.str_repid.as_deref(), Some("HTT"));
        assert_eq!(parsed.str_ref, Some(19));
        assert_eq!(parsed.str_len, Some(57));
        assert_eq!(parsed.str_status.as_deref(), Some("full_mutation"));
        assert_eq!(parsed.str_hgnc_id, Some(4851));
    }

    #[rstest::rstest]
    #[case("[1]", Some(vec![1]))]
    #[case("0,1", Some(vec![0, 1]))]
    #[case("[]", None)]
    fn pathologic_struc_forms(#[case] raw: &str, #[case] expected: Option<Vec<usize>>) {
        let info = FieldMap::from_pairs([("PathologicStruc", Value::String(raw.to_string()))]);
        assert_eq!(parse_pathologic_struc(&info), expected);
    }

    #[test]
    fn trgt_compound_motifs() {
        let info = FieldMap::from_pairs([
            ("TRID", Value::String(String::from("RFC1"))),
            (
                "MOTIFS",
                Value::StringArray(vec![
                    Some(String::from("AAAAG")),
                    Some(String::from("AAGGG")),
                ]),
            ),
            ("PathologicStruc", Value::String(String::from("1"))),
        ]);
        let parsed = parse_str_info(&info);
        assert_eq!(parsed.str_trid.as_deref(), Some("RFC1"));
        assert_eq!(
            parsed.str_motifs,
            vec![String::from("AAAAG"), String::from("AAGGG")]
        );
        assert_eq!(parsed.str_pathologic_struc, vec![1]);
    }
}
