//! isakit - ISA-Tab and ISA-JSON toolkit

pub mod config;
pub mod error;
pub mod errors;
pub mod graph;
pub mod isajson;
pub mod isatab;
pub mod labels;
pub mod model;
pub mod sampletab;
pub mod settings;
pub mod validator;
pub mod validators;

pub use config::{AssayConfig, ConfigSet};
pub use error::{FixSuggestion, IsaError};
pub use errors::{BatchReport, Code, Finding, Severity, ValidationReport};
pub use graph::ProcessGraph;
pub use model::Investigation;
pub use settings::Settings;
pub use validator::{InputFormat, Validator};
