//! Population frequency aggregation from INFO keys and CSQ fallback.

use indexmap::IndexMap;

use crate::variant::csq::Transcript;
use crate::variant::info::FieldMap;
use crate::variant::Category;

/// Aggregated frequencies keyed by canonical name.
pub type Frequencies = IndexMap<String, f64>;

/// Structural-variant frequency resources: `<base>AF` carries the
/// frequency, `<base>` alone the observation count.
const SV_FREQUENCY_BASES: &[&str] = &[
    "clingen_cgh_benign",
    "clingen_cgh_pathogenic",
    "clingen_ngi",
    "clinical_genomics_mip",
    "swegen",
    "decipher",
];

const MEI_MOTIFS: &[&str] = &["alu", "herv", "l1", "sva"];

/// Aggregate frequencies for one record.
///
/// INFO keys win; per-transcript CSQ frequencies from the first transcript
/// fill the gaps.  `gnomad_max` and `thousand_g_max` are raised to at least
/// the base frequency when both are present.
pub fn parse_frequencies(
    info: &FieldMap,
    category: Category,
    transcripts: &[Transcript],
) -> Frequencies {
    let mut frequencies = Frequencies::new();
    let first = transcripts.first();

    let mut set = |key: &str, value: Option<f64>| {
        if let Some(value) = value {
            frequencies.insert(key.to_string(), value);
        }
    };

    set(
        "thousand_g",
        info.get_f64("1000GAF")
            .or_else(|| first.and_then(|tx| tx.thousand_g_maf)),
    );
    set(
        "thousand_g_max",
        first.and_then(|tx| tx.thousandg_max),
    );
    set(
        "gnomad",
        info.get_f64("GNOMADAF")
            .or_else(|| first.and_then(|tx| tx.gnomad_maf)),
    );
    set(
        "gnomad_max",
        info.get_f64("GNOMADAF_popmax")
            .or_else(|| info.get_f64("GNOMADAF_POPMAX"))
            .or_else(|| first.and_then(|tx| tx.gnomad_max)),
    );
    set(
        "exac",
        info.get_f64("EXACAF")
            .or_else(|| first.and_then(|tx| tx.exac_maf)),
    );
    set(
        "exac_max",
        info.get_f64("EXAC_MAX_AF")
            .or_else(|| first.and_then(|tx| tx.exac_max)),
    );
    set("swegen", info.get_f64("SWEGENAF"));
    set("gnomad_mt_homoplasmic", info.get_f64("GNOMAD_MT_AF_HOM"));
    set("gnomad_mt_heteroplasmic", info.get_f64("GNOMAD_MT_AF_HET"));

    raise_to_base(&mut frequencies, "gnomad", "gnomad_max");
    raise_to_base(&mut frequencies, "thousand_g", "thousand_g_max");

    if matches!(category, Category::Sv | Category::CancerSv) {
        for base in SV_FREQUENCY_BASES {
            if let Some(value) = info.get_f64(&format!("{}AF", base)) {
                frequencies.insert((*base).to_string(), value);
            }
            if let Some(count) = info.get_f64(base) {
                frequencies.insert(format!("{}_occurrences", base), count);
            }
        }
    }

    if category == Category::Mei {
        let mut mei_max: Option<f64> = None;
        for motif in MEI_MOTIFS {
            if let Some(value) = info.get_f64(&format!("swegen_{}_FRQ", motif)) {
                frequencies.insert(format!("swegen_{}", motif), value);
                mei_max = Some(mei_max.map_or(value, |max| max.max(value)));
            }
            if let Some(count) = info.get_f64(&format!("swegen_{}_OCC", motif)) {
                frequencies.insert(format!("swegen_{}_occurrences", motif), count);
            }
        }
        if let Some(mei_max) = mei_max {
            frequencies.insert(String::from("swegen_mei_max"), mei_max);
        }
    }

    frequencies
}

/// Guarantee `max_key >= base_key` whenever the base is present.
fn raise_to_base(frequencies: &mut Frequencies, base_key: &str, max_key: &str) {
    if let Some(base) = frequencies.get(base_key).copied() {
        let max = frequencies.get(max_key).copied().unwrap_or(base);
        frequencies.insert(max_key.to_string(), max.max(base));
    }
}
