//! Embedded JSON Schema for ISA-JSON investigation documents

use std::sync::OnceLock;

use crate::error::IsaError;

const SCHEMA_JSON: &str = include_str!("../../resources/isa-investigation.schema.json");

static VALIDATOR: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

fn validator() -> Result<&'static jsonschema::Validator, IsaError> {
    VALIDATOR
        .get_or_init(|| {
            let schema: serde_json::Value =
                serde_json::from_str(SCHEMA_JSON).map_err(|e| format!("schema is not JSON: {}", e))?;
            jsonschema::validator_for(&schema).map_err(|e| e.to_string())
        })
        .as_ref()
        .map_err(|details| IsaError::SchemaUnavailable {
            details: details.clone(),
        })
}

/// Messages of every schema violation, empty when the document conforms
pub fn schema_errors(document: &serde_json::Value) -> Result<Vec<String>, IsaError> {
    let validator = validator()?;
    Ok(validator.iter_errors(document).map(|e| e.to_string()).collect())
}
