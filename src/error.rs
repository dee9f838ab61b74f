//! Error types with fix suggestions
//!
//! Fatal errors only. Non-fatal findings live in [`crate::errors`].

use std::path::PathBuf;
use thiserror::Error;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

#[derive(Error, Debug)]
pub enum IsaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // ─────────────────────────────────────────────────────────────
    // Input errors (ISA-001 to ISA-009)
    // ─────────────────────────────────────────────────────────────
    #[error("ISA-001: No investigation file (i_*.txt) found in {}", dir.display())]
    InvestigationNotFound { dir: PathBuf },

    #[error("ISA-002: File {} is not UTF-8 encoded", path.display())]
    NotUtf8 { path: PathBuf },

    #[error("ISA-003: Table file {} referenced by the investigation does not exist", path.display())]
    TableNotFound { path: PathBuf },

    #[error("ISA-004: Required column '{column}' missing from {file}")]
    MissingColumn { column: String, file: String },

    #[error("ISA-005: Malformed investigation file at line {line}: {details}")]
    MalformedInvestigation { line: usize, details: String },

    #[error("ISA-006: Table {file} is empty")]
    EmptyTable { file: String },

    #[error("ISA-007: Invalid attribute while building the model: {0}")]
    Attribute(#[from] AttributeError),

    // ─────────────────────────────────────────────────────────────
    // JSON errors (ISA-010 to ISA-014)
    // ─────────────────────────────────────────────────────────────
    #[error("ISA-010: There was an error when trying to parse the JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("ISA-011: The JSON does not validate against the ISA-JSON schema: {details}")]
    SchemaFailed { details: String },

    #[error("ISA-012: Unresolved reference '{reference}' in {context}")]
    UnresolvedReference { reference: String, context: String },

    #[error("ISA-013: Embedded ISA-JSON schema is invalid: {details}")]
    SchemaUnavailable { details: String },

    // ─────────────────────────────────────────────────────────────
    // Write errors (ISA-020 to ISA-022)
    // ─────────────────────────────────────────────────────────────
    #[error("ISA-020: Investigation file name '{name}' must match i_*.txt")]
    InvalidInvestigationFileName { name: String },

    #[error("ISA-021: Could not find any valid end-to-end path in the graph of {file}")]
    NoCanonicalPath { file: String },

    #[error("ISA-022: Output directory {} does not exist", dir.display())]
    OutputDirMissing { dir: PathBuf },

    // ─────────────────────────────────────────────────────────────
    // Configuration errors (ISA-030 to ISA-031)
    // ─────────────────────────────────────────────────────────────
    #[error("ISA-030: Configuration error in {}: {details}", path.display())]
    Config { path: PathBuf, details: String },

    #[error("ISA-031: SampleTab input is missing the {section} section")]
    SampleTabSection { section: String },
}

impl FixSuggestion for IsaError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            IsaError::Io(_) => Some("Check file path and permissions"),
            IsaError::YamlParse(_) => Some("Check YAML syntax: indentation and quoting"),
            IsaError::InvestigationNotFound { .. } => {
                Some("Point at the directory holding i_*.txt, s_*.txt and a_*.txt files")
            }
            IsaError::NotUtf8 { .. } => Some("Re-save the file with UTF-8 encoding"),
            IsaError::TableNotFound { .. } => {
                Some("Fix 'Study File Name' / 'Study Assay File Name' in the investigation file")
            }
            IsaError::MissingColumn { .. } => Some("Add the column to the table header row"),
            IsaError::MalformedInvestigation { .. } => {
                Some("Each row must be a label followed by tab-separated values")
            }
            IsaError::EmptyTable { .. } => Some("Tables need at least a header row"),
            IsaError::Attribute(_) => None,
            IsaError::JsonParse(_) => Some("Check JSON syntax (try parsing with jq)"),
            IsaError::SchemaFailed { .. } => Some("Fix the document to match the ISA-JSON schema"),
            IsaError::UnresolvedReference { .. } => {
                Some("Declare the referenced entity or drop --strict to get a report instead")
            }
            IsaError::SchemaUnavailable { .. } => None,
            IsaError::InvalidInvestigationFileName { .. } => {
                Some("Name the investigation file like i_investigation.txt")
            }
            IsaError::NoCanonicalPath { .. } => {
                Some("Make sure every process has inputs and outputs linking sources or samples")
            }
            IsaError::OutputDirMissing { .. } => Some("Create the output directory first"),
            IsaError::Config { .. } => Some("Check the configuration YAML against the documented fields"),
            IsaError::SampleTabSection { .. } => Some("SampleTab files need both [MSI] and [SCD] sections"),
        }
    }
}

/// Raised by model setters when a value has the wrong shape.
///
/// These are programmer errors and are never caught internally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{entity}.{attribute}: {reason}")]
pub struct AttributeError {
    pub entity: &'static str,
    pub attribute: &'static str,
    pub reason: String,
}

impl AttributeError {
    pub fn new(entity: &'static str, attribute: &'static str, reason: impl Into<String>) -> Self {
        Self {
            entity,
            attribute,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_coded_error_has_code_prefix() {
        let err = IsaError::MissingColumn {
            column: "Sample Name".to_string(),
            file: "s_study.txt".to_string(),
        };
        assert!(err.to_string().starts_with("ISA-004"));
        assert!(err.fix_suggestion().is_some());
    }

    #[test]
    fn test_attribute_error_display() {
        let err = AttributeError::new("Characteristic", "unit", "unit not allowed");
        assert_eq!(err.to_string(), "Characteristic.unit: unit not allowed");
    }
}
