//! Mobile-element insertion annotation.

use crate::variant::info::FieldMap;

/// MEI annotation from the `MEINFO` INFO key.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MeiInfo {
    /// Element name, e.g. `ALU`.
    pub mei_name: Option<String>,
    /// Insertion polarity, `+` or `-`.
    pub mei_polarity: Option<String>,
}

/// Parse `MEINFO=NAME,START,END,POLARITY`.
pub fn parse_mei_info(info: &FieldMap) -> MeiInfo {
    let parts = match info.get_string_list("MEINFO") {
        Some(parts) => parts,
        None => return MeiInfo::default(),
    };
    let field = |index: usize| {
        parts
            .get(index)
            .filter(|v| !v.is_empty() && v.as_str() != ".")
            .cloned()
    };
    MeiInfo {
        mei_name: field(0),
        mei_polarity: field(3),
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::variant::info::Value;

    #[test]
    fn meinfo_parsed() {
        let info = FieldMap::from_pairs([(
            "MEINFO",
            Value::String(String::from("ALU,1,280,+")),
        )]);
        let parsed = parse_mei_info(&info);
        assert_eq!(parsed.mei_name.as_deref(), Some("ALU"));
        assert_eq!(parsed.mei_polarity.as_deref(), Some("+"));
    }

    #[test]
    fn missing_meinfo() {
        assert_eq!(parse_mei_info(&FieldMap::default()), MeiInfo::default());
    }

    #[test]
    fn placeholder_polarity_dropped() {
        let info = FieldMap::from_pairs([(
            "MEINFO",
            Value::String(String::from("L1,.,.,.")),
        )]);
        let parsed = parse_mei_info(&info);
        assert_eq!(parsed.mei_name.as_deref(), Some("L1"));
        assert_eq!(parsed.mei_polarity, None);
    }
}
