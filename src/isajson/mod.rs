//! ISA-JSON serialization
//!
//! One JSON object per investigation, studies and assays nested inside it.
//! Entities point at each other with `{"@id": "..."}` references; the
//! reader resolves them in a second pass and reports the ones that dangle.

pub mod dto;
mod read;
pub mod schema;
mod write;

use serde::Deserialize;

pub use read::{load, loads};
pub use schema::schema_errors;
pub use write::{dump, dumps, to_document};

/// Process comment carrying the hybridization array design
pub const ARRAY_DESIGN_COMMENT: &str = "Array Design REF";

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct JsonOptions {
    /// Fail on schema violations and unresolved references instead of
    /// reporting them
    pub strict: bool,
}
