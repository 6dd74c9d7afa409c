//! Case and individual representation.
//!
//! A case bundles the individuals whose genotype columns appear in the VCF.
//! The positional ordering of `individuals` must equal the sample column
//! order of the VCF that is loaded for the case.

use indexmap::IndexMap;

/// Sex of an individual.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
    #[default]
    Unknown,
}

/// Affection status of an individual.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PhenotypeStatus {
    Affected,
    Unaffected,
    #[default]
    Unknown,
}

/// Analysis type of one individual's data.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AnalysisType {
    Wgs,
    Wes,
    Wts,
    Panel,
    External,
    Mixed,
    #[default]
    Unknown,
}

/// One individual of a case.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Individual {
    /// Internal individual id.
    pub individual_id: String,
    /// Name used for display.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Sex of the individual.
    #[serde(default)]
    pub sex: Sex,
    /// Affection status.
    #[serde(default)]
    pub phenotype: PhenotypeStatus,
    /// Analysis type of the data of this individual.
    #[serde(default)]
    pub analysis_type: AnalysisType,
}

impl Individual {
    /// The display name, falling back to the individual id.
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.individual_id)
    }
}

/// A case as described by scout-server.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Case {
    /// Internal case id.
    #[serde(rename = "_id")]
    pub case_id: String,
    /// Name used for display.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Genome build of the case, "37" or "38".
    #[serde(default)]
    pub genome_build: crate::common::GenomeBuild,
    /// The individuals, in VCF sample column order.
    #[serde(default)]
    pub individuals: Vec<Individual>,
    /// Default gene panels of the case.
    #[serde(default)]
    pub panels: Vec<String>,
    /// Owning institute.
    #[serde(default)]
    pub owner: Option<String>,
}

impl Case {
    /// Load a case description from a JSON file.
    pub fn from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self, anyhow::Error> {
        let file = std::fs::File::open(path.as_ref()).map_err(|e| {
            anyhow::anyhow!(
                "could not open case file {}: {}",
                path.as_ref().display(),
                e
            )
        })?;
        serde_json::from_reader(std::io::BufReader::new(file))
            .map_err(|e| anyhow::anyhow!("problem parsing case JSON: {}", e))
    }

    /// The key under which Genmod annotates this case in INFO fields.
    ///
    /// Genmod uses the family id from the input PED file.  For cases whose
    /// internal id carries a `-` suffix this is the display name, otherwise
    /// the internal id itself.
    pub fn genmod_key(&self) -> &str {
        if self.case_id.contains('-') {
            self.display_name.as_deref().unwrap_or(&self.case_id)
        } else {
            &self.case_id
        }
    }

    /// Mapping from individual id to positional index in the VCF sample columns.
    pub fn individual_positions(&self) -> IndexMap<String, usize> {
        self.individuals
            .iter()
            .enumerate()
            .map(|(i, ind)| (ind.individual_id.clone(), i))
            .collect()
    }
}
