use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::records::UnknownCodePolicy;

/// Source locations, output paths and column names for every pipeline.
///
/// Stored as a JSON object on disk. Every field is optional; omitted fields
/// fall back to the directory layout and file names of the published exports:
/// ```json
/// {
///   "chicago": { "data_dir": "/data/chicago", "unknown_codes": "skip" },
///   "santa_clara": { "columns": { "vaccinated": "Fully Vaccinated" } }
/// }
/// ```
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub chicago: ChicagoConfig,
    pub santa_clara: SantaClaraConfig,
}

impl PipelineConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChicagoConfig {
    pub data_dir: PathBuf,
    pub cases_file: String,
    pub locations_file: String,
    pub vaccinations_file: String,
    pub adi_file: String,
    pub population_output: PathBuf,
    pub facility_output: PathBuf,
    pub unknown_codes: UnknownCodePolicy,
}

impl Default for ChicagoConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("chicago"),
            cases_file: "COVID-19_Cases__Tests__and_Deaths_by_ZIP_Code.csv".into(),
            locations_file: "COVID-19_Vaccination_Locations.csv".into(),
            vaccinations_file: "COVID-19_Vaccinations_by_ZIP_Code.csv".into(),
            adi_file: "IL_2020_ADI_9 Digit Zip Code_v3.2.csv".into(),
            population_output: PathBuf::from("chicago_pop.tsv"),
            facility_output: PathBuf::from("chicago_fac.tsv"),
            unknown_codes: UnknownCodePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SantaClaraConfig {
    pub data_dir: PathBuf,
    pub tracts_file: String,
    pub vaccinations_file: String,
    pub adi_file: String,
    pub population_output: PathBuf,
    pub facility_output: PathBuf,
    pub unknown_codes: UnknownCodePolicy,
    pub columns: SantaClaraColumns,
}

impl Default for SantaClaraConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("santa_clara"),
            tracts_file: "CensusTract2020.csv".into(),
            vaccinations_file:
                "COVID-19_Vaccination_among_County_Residents_by_Census_Tract.csv".into(),
            adi_file: "CA_2020_ADI_Census Block Group_v3.2.csv".into(),
            population_output: PathBuf::from("santa_clara_pop.tsv"),
            facility_output: PathBuf::from("santa_clara_fac.tsv"),
            unknown_codes: UnknownCodePolicy::default(),
            columns: SantaClaraColumns::default(),
        }
    }
}

/// Header names of the Santa Clara source columns.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SantaClaraColumns {
    pub tract_id: String,
    pub latitude: String,
    pub longitude: String,
    pub population: String,
    pub vaccination_tract: String,
    pub vaccinated: String,
    pub block_group: String,
    pub adi: String,
}

impl Default for SantaClaraColumns {
    fn default() -> Self {
        Self {
            tract_id: "GEOID".into(),
            latitude: "INTPTLAT".into(),
            longitude: "INTPTLON".into(),
            population: "POPULATION".into(),
            vaccination_tract: "Census Tract".into(),
            vaccinated: "Total Vaccinated".into(),
            block_group: "FIPS".into(),
            adi: "ADI_NATRANK".into(),
        }
    }
}
