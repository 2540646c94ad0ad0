use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::constants;
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub inputs: InputsConfig,
    pub output: OutputConfig,
    pub columns: ColumnsConfig,
    pub exports: ExportsConfig,
    pub country_tables: Vec<CountryTableConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputsConfig {
    pub process_metadata: PathBuf,
    pub impacts: PathBuf,
    pub category_metadata: PathBuf,
    /// Field delimiter of the impacts CSV (and of CSV-exported workbooks)
    pub delimiter: char,
    /// WHATWG encoding label of the impacts CSV
    pub encoding: String,
}

impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            process_metadata: PathBuf::from(constants::DEFAULT_PROCESS_METADATA_PATH),
            impacts: PathBuf::from(constants::DEFAULT_IMPACTS_PATH),
            category_metadata: PathBuf::from(constants::DEFAULT_CATEGORY_METADATA_PATH),
            delimiter: ';',
            encoding: "latin1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(constants::DEFAULT_OUTPUT_DIR),
        }
    }
}

/// Source header labels, as they appear after dual-header resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnsConfig {
    pub process_uuid: String,
    pub process_name: String,
    pub category_levels: [String; 4],
    pub flow_name: String,
    pub unit: String,
    pub reference_quantity: String,
    pub geographic_zone: String,
    pub dataset_type: String,
    pub category_uuid: String,
    pub category_name_primary: String,
    pub category_name_secondary: String,
    pub reference_unit: String,
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            process_uuid: "UUID".to_string(),
            process_name: "Nom".to_string(),
            category_levels: [
                "Catégorisation (niveau 1)".to_string(),
                "Catégorisation (niveau 2)".to_string(),
                "Catégorisation (niveau 3)".to_string(),
                "Catégorisation (niveau 4)".to_string(),
            ],
            flow_name: "Nom du flux".to_string(),
            unit: "Unité".to_string(),
            reference_quantity: "Quantité de référence".to_string(),
            geographic_zone: "Zone géographique".to_string(),
            dataset_type: "Type de données".to_string(),
            category_uuid: "UUID".to_string(),
            category_name_primary: "Nom français".to_string(),
            category_name_secondary: "Nom anglais".to_string(),
            reference_unit: "Unité de référence".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportsConfig {
    pub impacts_merged: bool,
    pub categories: bool,
    pub correlations: bool,
    pub global_impact: bool,
    pub breakdowns: bool,
    pub distinct_lists: bool,
    pub metadata_columns: bool,
    pub hierarchy: bool,
    pub country_tables: bool,
    pub manifest: bool,
}

impl Default for ExportsConfig {
    fn default() -> Self {
        Self {
            impacts_merged: true,
            categories: true,
            correlations: true,
            global_impact: true,
            breakdowns: true,
            distinct_lists: true,
            metadata_columns: true,
            hierarchy: true,
            country_tables: true,
            manifest: true,
        }
    }
}

/// Named filter over the enriched impacts, exported as `<name>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryTableConfig {
    pub name: String,
    pub level_2: Option<String>,
    pub level_3: Option<String>,
    pub level_4: Option<String>,
    /// Drop rows whose process name contains this text
    pub exclude_name_containing: Option<String>,
}

impl CountryTableConfig {
    pub fn defaults() -> Vec<Self> {
        vec![
            Self {
                name: "mix_electriques".to_string(),
                level_2: Some("Electricité".to_string()),
                level_3: Some("Mix moyen".to_string()),
                level_4: None,
                exclude_name_containing: None,
            },
            Self {
                name: "transport_ferro".to_string(),
                level_2: Some("Ferroviaire".to_string()),
                level_3: Some("Flotte moyenne nationale européenne".to_string()),
                level_4: None,
                exclude_name_containing: None,
            },
            Self {
                name: "transport_routier".to_string(),
                level_2: Some("Routier".to_string()),
                level_3: Some("Transport à température ambiante".to_string()),
                level_4: Some("Flotte moyenne nationale européenne".to_string()),
                exclude_name_containing: Some("100%".to_string()),
            },
        ]
    }
}

impl Config {
    /// Load configuration from `EMPREINTE_CONFIG` or `config.toml`,
    /// falling back to built-in defaults when no file exists.
    pub fn load() -> Result<Self> {
        let path = std::env::var("EMPREINTE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(constants::DEFAULT_CONFIG_PATH));
        if path.exists() {
            Self::from_path(&path)
        } else {
            debug!("No config file at {}, using defaults", path.display());
            Ok(Self::with_default_tables())
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config = Self::from_toml(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        if config.country_tables.is_empty() {
            config.country_tables = CountryTableConfig::defaults();
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_default_tables() -> Self {
        Self {
            country_tables: CountryTableConfig::defaults(),
            ..Default::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.inputs.delimiter.is_ascii() {
            return Err(PipelineError::Config(format!(
                "delimiter must be a single ASCII character, got '{}'",
                self.inputs.delimiter
            )));
        }
        if encoding_rs::Encoding::for_label(self.inputs.encoding.as_bytes()).is_none() {
            return Err(PipelineError::Config(format!(
                "unknown encoding label '{}'",
                self.inputs.encoding
            )));
        }
        for table in &self.country_tables {
            if table.name.trim().is_empty() {
                return Err(PipelineError::Config(
                    "country table names must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.inputs.delimiter, ';');
        assert_eq!(config.inputs.encoding, "latin1");
        assert_eq!(config.columns.category_levels[0], "Catégorisation (niveau 1)");
        assert_eq!(config.country_tables.len(), 3);
        assert!(config.exports.correlations);
    }

    #[test]
    fn partial_sections_override_defaults() {
        let toml = r#"
            [inputs]
            impacts = "fixtures/impacts.csv"
            delimiter = ","

            [exports]
            correlations = false

            [[country_tables]]
            name = "rail"
            level_2 = "Ferroviaire"
        "#;
        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.inputs.impacts, PathBuf::from("fixtures/impacts.csv"));
        assert_eq!(config.inputs.delimiter, ',');
        assert_eq!(config.inputs.encoding, "latin1");
        assert!(!config.exports.correlations);
        assert!(config.exports.impacts_merged);
        assert_eq!(config.country_tables.len(), 1);
        assert_eq!(config.country_tables[0].level_3, None);
    }

    #[test]
    fn shipped_config_matches_defaults() {
        let config = Config::from_toml(include_str!("../config.toml")).unwrap();
        let defaults = Config::with_default_tables();
        assert_eq!(config.inputs.impacts, defaults.inputs.impacts);
        assert_eq!(config.columns.category_levels, defaults.columns.category_levels);
        assert_eq!(config.country_tables, defaults.country_tables);
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        let err = Config::from_toml("[inputs]\nencoding = \"klingon\"").unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }
}
