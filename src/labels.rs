//! Column label vocabulary of ISA-Tab tables
//!
//! Fixed header strings, bracketed-label patterns and the protocol-type
//! lookup that decides which assay-name column a process writes.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

pub const SOURCE_NAME: &str = "Source Name";
pub const SAMPLE_NAME: &str = "Sample Name";
pub const EXTRACT_NAME: &str = "Extract Name";
pub const LABELED_EXTRACT_NAME: &str = "Labeled Extract Name";
pub const PROTOCOL_REF: &str = "Protocol REF";
pub const TERM_SOURCE_REF: &str = "Term Source REF";
pub const TERM_ACCESSION_NUMBER: &str = "Term Accession Number";
pub const UNIT: &str = "Unit";
pub const PERFORMER: &str = "Performer";
pub const DATE: &str = "Date";
pub const MATERIAL_TYPE: &str = "Material Type";
pub const LABEL: &str = "Label";
pub const ARRAY_DESIGN_REF: &str = "Array Design REF";

/// Columns naming a process rather than a material
pub const ASSAY_NAME_LABELS: &[&str] = &[
    "Assay Name",
    "MS Assay Name",
    "NMR Assay Name",
    "Hybridization Assay Name",
    "Scan Name",
    "Normalization Name",
    "Data Transformation Name",
];

/// Qualifier columns attached to the preceding subject column
pub const QUALIFIER_LABELS: &[&str] = &[TERM_SOURCE_REF, TERM_ACCESSION_NUMBER, UNIT, PERFORMER, DATE];

/// `Characteristics[...]`, also accepting the `Characteristic[...]` spelling
pub static RX_CHARACTERISTICS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Characteristics?\s*\[(.*)\]$").unwrap());
pub static RX_PARAMETER_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Parameter Value\s*\[(.*)\]$").unwrap());
pub static RX_FACTOR_VALUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Factor Value\s*\[(.*)\]$").unwrap());
pub static RX_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Comment\s*\[(.*)\]$").unwrap());
pub static RX_INVESTIGATION_FILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^i_(.*?)\.txt$").unwrap());

/// Text inside the brackets of a bracketed label
pub fn bracketed<'a>(rx: &Regex, label: &'a str) -> Option<&'a str> {
    rx.captures(label)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

/// Lowercase label prefix before any bracket, spaces removed
pub fn squashed(label: &str) -> String {
    let prefix = label.split('[').next().unwrap_or(label);
    prefix.replace(' ', "").to_lowercase()
}

pub fn is_assay_name(label: &str) -> bool {
    ASSAY_NAME_LABELS.contains(&label)
}

pub fn is_qualifier(label: &str) -> bool {
    QUALIFIER_LABELS.contains(&label)
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolTypeEntry {
    pub term: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
    pub headers: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProtocolTypes {
    #[serde(default)]
    pub version: String,
    pub types: Vec<ProtocolTypeEntry>,
}

const PROTOCOL_TYPES_YAML: &str = include_str!("../resources/protocol-types.yaml");

static PROTOCOL_TYPES: Lazy<ProtocolTypes> = Lazy::new(|| {
    ProtocolTypes::from_yaml(PROTOCOL_TYPES_YAML).unwrap_or_else(|e| {
        tracing::error!("embedded protocol types are invalid: {}", e);
        ProtocolTypes::default()
    })
});

impl ProtocolTypes {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Built-in table
    pub fn embedded() -> &'static ProtocolTypes {
        &PROTOCOL_TYPES
    }

    /// Assay-name columns written after `Protocol REF` for a protocol type
    pub fn headers_for(&self, protocol_type: &str) -> &[String] {
        let wanted = protocol_type.trim().to_lowercase();
        if wanted.is_empty() {
            return &[];
        }
        self.types
            .iter()
            .find(|t| t.term == wanted || t.synonyms.iter().any(|s| s == &wanted))
            .map(|t| t.headers.as_slice())
            .unwrap_or(&[])
    }
}
