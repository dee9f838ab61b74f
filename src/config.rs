//! Assay configuration loading
//!
//! A configuration describes the expected table for one
//! (measurement type, technology type) pair: its columns in order, which
//! are required, their data types and the protocol types expected between
//! node columns. Configurations come from `*.yaml` / `*.yml` files in a
//! directory or from the embedded default set.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::IsaError;

/// Key of the investigation-file configuration
pub const INVESTIGATION_KEY: &str = "[investigation]";
/// Key of the study-sample table configuration
pub const STUDY_SAMPLE_KEY: &str = "[sample]";

const EMBEDDED: &[(&str, &str)] = &[
    ("investigation.yaml", include_str!("../resources/configs/investigation.yaml")),
    ("study_sample.yaml", include_str!("../resources/configs/study_sample.yaml")),
    ("transcription_micro.yaml", include_str!("../resources/configs/transcription_micro.yaml")),
    ("metabolite_profiling_ms.yaml", include_str!("../resources/configs/metabolite_profiling_ms.yaml")),
    ("metabolite_profiling_nmr.yaml", include_str!("../resources/configs/metabolite_profiling_nmr.yaml")),
    ("genome_seq.yaml", include_str!("../resources/configs/genome_seq.yaml")),
];

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DataType {
    #[default]
    String,
    Boolean,
    Date,
    Integer,
    Double,
    List,
    #[serde(alias = "ontology term")]
    OntologyTerm,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FieldConfig {
    pub header: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub data_type: DataType,
    #[serde(default)]
    pub list_values: Vec<String>,
}

impl FieldConfig {
    /// Whether a non-empty cell matches the field's data type
    pub fn accepts(&self, cell: &str) -> bool {
        let cell = cell.trim();
        match self.data_type {
            DataType::String | DataType::OntologyTerm => true,
            DataType::Boolean => cell == "true" || cell == "false",
            DataType::Date => crate::validators::is_iso8601(cell),
            DataType::Integer => cell.parse::<i64>().is_ok(),
            DataType::Double => cell.parse::<f64>().is_ok(),
            DataType::List => self.list_values.iter().any(|v| v.eq_ignore_ascii_case(cell)),
        }
    }
}

/// One entry of a configuration's column list
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ConfigColumn {
    /// A protocol of this type is expected at this position
    Protocol { protocol: String },
    Field(FieldConfig),
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AssayConfig {
    pub measurement_type: String,
    #[serde(default)]
    pub technology_type: String,
    #[serde(default)]
    pub table_name: String,
    #[serde(default)]
    pub columns: Vec<ConfigColumn>,
}

impl AssayConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn key(&self) -> (String, String) {
        config_key(&self.measurement_type, &self.technology_type)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldConfig> {
        self.columns.iter().filter_map(|c| match c {
            ConfigColumn::Field(f) => Some(f),
            ConfigColumn::Protocol { .. } => None,
        })
    }

    pub fn required_headers(&self) -> impl Iterator<Item = &str> {
        self.fields().filter(|f| f.required).map(|f| f.header.as_str())
    }

    pub fn field(&self, header: &str) -> Option<&FieldConfig> {
        self.fields().find(|f| f.header.eq_ignore_ascii_case(header))
    }

    /// Protocol types configured strictly between two field headers
    pub fn protocols_between(&self, left: &str, right: &str) -> Vec<&str> {
        let position = |header: &str| {
            self.columns
                .iter()
                .position(|c| matches!(c, ConfigColumn::Field(f) if f.header.eq_ignore_ascii_case(header)))
        };
        let (Some(l), Some(r)) = (position(left), position(right)) else {
            return Vec::new();
        };
        if l >= r {
            return Vec::new();
        }
        self.columns[l + 1..r]
            .iter()
            .filter_map(|c| match c {
                ConfigColumn::Protocol { protocol } => Some(protocol.as_str()),
                ConfigColumn::Field(_) => None,
            })
            .collect()
    }
}

fn config_key(measurement_type: &str, technology_type: &str) -> (String, String) {
    (
        measurement_type.trim().to_lowercase(),
        technology_type.trim().to_lowercase(),
    )
}

/// Configurations keyed by lowercased (measurement type, technology type)
#[derive(Debug, Clone, Default)]
pub struct ConfigSet {
    configs: HashMap<(String, String), AssayConfig>,
}

impl ConfigSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, config: AssayConfig) {
        if let Some(previous) = self.configs.insert(config.key(), config) {
            tracing::warn!(
                measurement = %previous.measurement_type,
                technology = %previous.technology_type,
                "configuration replaced"
            );
        }
    }

    /// The built-in configuration set
    pub fn embedded() -> Result<Self, IsaError> {
        let mut set = Self::new();
        for (name, yaml) in EMBEDDED {
            let config = AssayConfig::from_yaml(yaml).map_err(|e| IsaError::Config {
                path: PathBuf::from(name),
                details: e.to_string(),
            })?;
            set.insert(config);
        }
        Ok(set)
    }

    /// Load every `*.yaml` / `*.yml` file of a directory
    pub fn load_dir(dir: &Path) -> Result<Self, IsaError> {
        if !dir.is_dir() {
            return Err(IsaError::Config {
                path: dir.to_path_buf(),
                details: "not a directory".to_string(),
            });
        }
        let mut set = Self::new();
        for extension in ["yaml", "yml"] {
            let pattern = dir.join(format!("*.{}", extension)).to_string_lossy().to_string();
            let entries = glob::glob(&pattern).map_err(|e| IsaError::Config {
                path: dir.to_path_buf(),
                details: e.to_string(),
            })?;
            for entry in entries {
                let path = entry.map_err(|e| IsaError::Config {
                    path: dir.to_path_buf(),
                    details: e.to_string(),
                })?;
                let content = std::fs::read_to_string(&path)?;
                let config = AssayConfig::from_yaml(&content).map_err(|e| IsaError::Config {
                    path: path.clone(),
                    details: e.to_string(),
                })?;
                tracing::debug!(
                    path = %path.display(),
                    table = %config.table_name,
                    "loaded configuration"
                );
                set.insert(config);
            }
        }
        Ok(set)
    }

    pub fn get(&self, measurement_type: &str, technology_type: &str) -> Option<&AssayConfig> {
        self.configs.get(&config_key(measurement_type, technology_type))
    }

    pub fn investigation(&self) -> Option<&AssayConfig> {
        self.get(INVESTIGATION_KEY, "")
    }

    pub fn study_sample(&self) -> Option<&AssayConfig> {
        self.get(STUDY_SAMPLE_KEY, "")
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}
