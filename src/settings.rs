//! Runtime settings
//!
//! Read from the `--settings` file, else the file named by
//! `ISAKIT_SETTINGS`, else defaults.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::isajson::JsonOptions;
use crate::isatab::TabOptions;

/// Environment variable naming a settings file
pub const SETTINGS_ENV: &str = "ISAKIT_SETTINGS";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Default tracing directive, overridden by `RUST_LOG`
    pub log_level: String,
    pub tab: TabOptions,
    pub json: JsonOptions,
    /// Assay configuration directory; the embedded set is used when unset
    pub config_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            tab: TabOptions::default(),
            json: JsonOptions::default(),
            config_dir: None,
        }
    }
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;
        let settings = Self::from_yaml(&yaml).with_context(|| format!("Failed to parse settings in {:?}", path))?;
        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Settings from an explicit path, else `ISAKIT_SETTINGS`, else defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match std::env::var_os(SETTINGS_ENV) {
            Some(path) if !path.is_empty() => Self::from_file(Path::new(&path))
                .with_context(|| format!("{} points at an unusable file", SETTINGS_ENV)),
            _ => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.log_level, "warn");
        assert!(!settings.tab.keep_cell_quotes);
        assert!(!settings.json.strict);
        assert!(settings.config_dir.is_none());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let settings = Settings::from_yaml(
            r#"
log_level: debug
tab:
  write_cell_quotes: true
json:
  strict: true
config_dir: /opt/isa/configs
"#,
        )
        .unwrap();
        assert_eq!(settings.log_level, "debug");
        assert!(settings.tab.write_cell_quotes);
        assert!(!settings.tab.write_factor_values_in_assay_table);
        assert!(settings.json.strict);
        assert_eq!(settings.config_dir, Some(PathBuf::from("/opt/isa/configs")));
    }

    #[test]
    fn test_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("isakit.yaml");
        std::fs::write(&path, "log_level: info\n").unwrap();
        assert_eq!(Settings::load(Some(&path)).unwrap().log_level, "info");

        std::fs::write(&path, "log_level: [").unwrap();
        let err = Settings::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Failed to parse settings"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::load(Some(&dir.path().join("nope.yaml"))).is_err());
    }
}
