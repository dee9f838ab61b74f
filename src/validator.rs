//! Unified Validator
//!
//! Runs every validation layer over an ISA-Tab directory, an ISA-JSON
//! document or an in-memory model and returns one report per input.
//! Table-level configuration checks run on the tables as read for ISA-Tab
//! and on rendered tables for everything else.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::ConfigSet;
use crate::error::IsaError;
use crate::errors::{BatchReport, Code, Finding, Severity, ValidationReport};
use crate::isajson::{self, JsonOptions};
use crate::isatab::{
    self, assay_table, read_investigation_file, render_investigation, study_table, InvestigationFile, LoadedTable,
    TabOptions,
};
use crate::model::Investigation;
use crate::validators::{
    validate_factor_values, validate_investigation_config, validate_links, validate_names, validate_ontology_sources,
    validate_references, validate_study_groups, validate_syntax, validate_table_config, validate_usage,
};

/// Warnings that become errors in strict mode
const STRICT_CODES: &[Code] = &[
    Code::ProtocolUnused,
    Code::ParameterUnused,
    Code::FactorUnused,
    Code::OntologySourceUnused,
    Code::TermSourceNotDeclared,
    Code::NoConfiguration,
];

/// Serialization of a validated input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Tab,
    Json,
}

impl InputFormat {
    /// Directories are ISA-Tab, `*.json` files ISA-JSON
    pub fn detect(path: &Path) -> Option<Self> {
        if path.is_dir() {
            Some(InputFormat::Tab)
        } else if path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("json"))
        {
            Some(InputFormat::Json)
        } else {
            None
        }
    }
}

/// Where a model came from, which decides the model-level layers to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Model,
    Tab,
    Json,
}

/// Map a fatal loading error to the finding that stands for it
fn load_failure(error: &IsaError) -> Finding {
    let code = match error {
        IsaError::NotUtf8 { .. } => Code::NotUtf8,
        IsaError::InvestigationNotFound { .. } | IsaError::MalformedInvestigation { .. } => Code::InvestigationFile,
        IsaError::TableNotFound { .. } => Code::StudyFile,
        IsaError::MissingColumn { .. } | IsaError::EmptyTable { .. } => {
            return Finding::new(Code::RequiredColumnMissing, error.to_string()).with_severity(Severity::Error)
        }
        IsaError::JsonParse(_) => Code::JsonParse,
        IsaError::SchemaFailed { .. } => Code::JsonSchema,
        _ => Code::SystemError,
    };
    Finding::new(code, error.to_string())
}

/// The validator that runs every layer
pub struct Validator {
    configs: Option<ConfigSet>,
    /// Findings from loading the configurations, repeated in every report
    config_findings: Vec<Finding>,
    tab_options: TabOptions,
    strict: bool,
}

impl Validator {
    pub fn new(configs: ConfigSet) -> Self {
        let mut config_findings = Vec::new();
        if configs.is_empty() {
            config_findings.push(Finding::new(Code::ConfigsNotLoaded, "No configuration was found"));
        }
        Self {
            configs: Some(configs),
            config_findings,
            tab_options: TabOptions::default(),
            strict: false,
        }
    }

    /// Validator with the built-in configurations
    pub fn embedded() -> Result<Self, IsaError> {
        Ok(Self::new(ConfigSet::embedded()?))
    }

    /// Validator with configurations from a directory
    ///
    /// A directory that cannot be loaded does not stop validation: every
    /// report carries a 4001 error and the configuration layer is skipped.
    pub fn from_config_dir(dir: &Path) -> Self {
        match ConfigSet::load_dir(dir) {
            Ok(configs) => {
                tracing::info!(dir = %dir.display(), configs = configs.len(), "loaded configurations");
                Self::new(configs)
            }
            Err(e) => {
                tracing::error!(dir = %dir.display(), error = %e, "configurations not loaded");
                Self {
                    configs: None,
                    config_findings: vec![Finding::new(Code::ConfigsNotLoaded, e.to_string()).with_severity(Severity::Error)],
                    tab_options: TabOptions::default(),
                    strict: false,
                }
            }
        }
    }

    /// Validator that skips the configuration layer
    pub fn without_configs() -> Self {
        Self {
            configs: None,
            config_findings: Vec::new(),
            tab_options: TabOptions::default(),
            strict: false,
        }
    }

    pub fn with_tab_options(mut self, options: TabOptions) -> Self {
        self.tab_options = options;
        self
    }

    /// Turn usage, ontology and configuration warnings into errors
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn configs(&self) -> Option<&ConfigSet> {
        self.configs.as_ref()
    }

    fn model_layers(&self, investigation: &Investigation, origin: Origin, report: &mut ValidationReport) {
        report.extend(validate_names(investigation));
        // Readers already report and drop unresolved references
        if origin == Origin::Model {
            report.extend(validate_references(investigation));
        }
        // the table reader builds its own links; JSON carries them verbatim
        if origin != Origin::Tab {
            report.extend(validate_links(investigation));
        }
        report.extend(validate_usage(investigation));
        report.extend(validate_syntax(investigation));
        report.extend(validate_ontology_sources(investigation, origin != Origin::Tab));
    }

    fn table_layers(
        &self,
        investigation: &Investigation,
        file: &InvestigationFile,
        tables: &[LoadedTable],
        report: &mut ValidationReport,
    ) {
        report.extend(self.config_findings.iter().cloned());
        if let Some(configs) = &self.configs {
            report.extend(validate_investigation_config(file, investigation, configs));
        }
        for loaded in tables {
            let Some(study) = investigation.studies.get(loaded.study) else {
                continue;
            };
            report.extend(validate_factor_values(&loaded.table));
            let config = self.configs.as_ref().and_then(|configs| match loaded.assay {
                None => configs.study_sample(),
                Some(a) => study
                    .assays
                    .get(a)
                    .and_then(|assay| configs.get(&assay.measurement_type.term, &assay.technology_type.term)),
            });
            if let Some(config) = config {
                report.extend(validate_table_config(&loaded.table, config, study));
            }
            if loaded.assay.is_none() {
                report.extend(validate_study_groups(&loaded.table, study));
            }
        }
    }

    fn finish(&self, mut report: ValidationReport) -> ValidationReport {
        if self.strict {
            report.escalate(STRICT_CODES);
        }
        report.validation_finished = true;
        tracing::info!(
            file = %report.file,
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "validation finished"
        );
        report
    }

    /// Validate an in-memory investigation
    pub fn validate_model(&self, investigation: &Investigation, file: &str) -> ValidationReport {
        let mut report = ValidationReport::new(file);
        self.model_layers(investigation, Origin::Model, &mut report);
        let tables = rendered_tables(investigation, &mut report);
        self.table_layers(investigation, &render_investigation(investigation), &tables, &mut report);
        self.finish(report)
    }

    /// Validate an ISA-Tab directory
    pub fn validate_tab_dir(&self, dir: &Path) -> ValidationReport {
        let mut report = ValidationReport::new(&dir.display().to_string());
        let loaded = match isatab::load(dir, &self.tab_options) {
            Ok(loaded) => loaded,
            Err(e) => {
                report.add(load_failure(&e));
                return self.finish(report);
            }
        };
        report.absorb(loaded.report);
        self.model_layers(&loaded.investigation, Origin::Tab, &mut report);

        let file = match isatab::table::read_utf8(&loaded.path) {
            Ok(text) => read_investigation_file(&text).0,
            Err(_) => render_investigation(&loaded.investigation),
        };
        self.table_layers(&loaded.investigation, &file, &loaded.tables, &mut report);
        self.finish(report)
    }

    /// Validate an ISA-JSON file
    ///
    /// The document is read leniently: schema violations and dangling
    /// references become findings.
    pub fn validate_json_file(&self, path: &Path) -> ValidationReport {
        let mut report = ValidationReport::new(&path.display().to_string());
        let text = match isatab::table::read_utf8(path) {
            Ok(text) => text,
            Err(e) => {
                report.add(load_failure(&e));
                return self.finish(report);
            }
        };
        let document: serde_json::Value = match serde_json::from_str(&text) {
            Ok(document) => document,
            Err(e) => {
                report.add(Finding::new(Code::JsonParse, e.to_string()));
                return self.finish(report);
            }
        };

        let (investigation, loaded) = match isajson::loads(&text, &JsonOptions::default()) {
            Ok(result) => result,
            Err(IsaError::JsonParse(e)) => {
                // Well-formed JSON that does not fit the model
                match isajson::schema_errors(&document) {
                    Ok(violations) if !violations.is_empty() => {
                        report.extend(violations.into_iter().map(|v| Finding::new(Code::JsonSchema, v)));
                    }
                    _ => report.add(Finding::new(Code::JsonSchema, e.to_string())),
                }
                return self.finish(report);
            }
            Err(e) => {
                report.add(load_failure(&e));
                return self.finish(report);
            }
        };
        report.absorb(loaded);
        self.model_layers(&investigation, Origin::Json, &mut report);
        let tables = rendered_tables(&investigation, &mut report);
        self.table_layers(&investigation, &render_investigation(&investigation), &tables, &mut report);
        self.finish(report)
    }

    /// Validate a path, detecting its format unless one is given
    pub fn validate_path(&self, path: &Path, format: Option<InputFormat>) -> ValidationReport {
        match format.or_else(|| InputFormat::detect(path)) {
            Some(InputFormat::Tab) => self.validate_tab_dir(path),
            Some(InputFormat::Json) => self.validate_json_file(path),
            None => {
                let mut report = ValidationReport::new(&path.display().to_string());
                report.add(Finding::new(
                    Code::SystemError,
                    "Expected an ISA-Tab directory or an ISA-JSON (*.json) file",
                ));
                self.finish(report)
            }
        }
    }

    /// Validate several inputs, collecting one report per document
    ///
    /// Directories without an investigation file are searched for ISA-Tab
    /// directories and ISA-JSON files.
    pub fn batch(&self, paths: &[PathBuf]) -> BatchReport {
        let mut batch = BatchReport::new();
        for path in paths {
            for (input, format) in discover(path) {
                batch.push(self.validate_path(&input, Some(format)));
            }
        }
        batch
    }
}

/// Expand one batch argument into validatable inputs
fn discover(path: &Path) -> Vec<(PathBuf, InputFormat)> {
    if !path.is_dir() {
        let format = InputFormat::detect(path).unwrap_or(InputFormat::Json);
        return vec![(path.to_path_buf(), format)];
    }
    if isatab::find_investigation_file(path).is_ok() {
        return vec![(path.to_path_buf(), InputFormat::Tab)];
    }
    let mut found = Vec::new();
    for entry in WalkDir::new(path).min_depth(1).sort_by_file_name().into_iter().filter_map(Result::ok) {
        let entry_path = entry.path();
        if entry.file_type().is_dir() {
            if isatab::find_investigation_file(entry_path).is_ok() {
                found.push((entry_path.to_path_buf(), InputFormat::Tab));
            }
        } else if InputFormat::detect(entry_path) == Some(InputFormat::Json) {
            found.push((entry_path.to_path_buf(), InputFormat::Json));
        }
    }
    if found.is_empty() {
        tracing::warn!(dir = %path.display(), "no ISA-Tab directory or ISA-JSON file found");
    }
    found
}

/// Render every study and assay table of a model
fn rendered_tables(investigation: &Investigation, report: &mut ValidationReport) -> Vec<LoadedTable> {
    let options = TabOptions::default();
    let mut tables = Vec::new();
    for (s, study) in investigation.studies.iter().enumerate() {
        match study_table(study) {
            Ok(table) => tables.push(LoadedTable {
                study: s,
                assay: None,
                table,
            }),
            Err(e) => report.add(Finding::new(
                Code::SystemError,
                format!("Table of study '{}' could not be rendered: {}", study.identifier, e),
            )),
        }
        for (a, assay) in study.assays.iter().enumerate() {
            match assay_table(study, assay, &options) {
                Ok(table) => tables.push(LoadedTable {
                    study: s,
                    assay: Some(a),
                    table,
                }),
                Err(e) => report.add(Finding::new(
                    Code::SystemError,
                    format!("Table {} could not be rendered: {}", assay.filename, e),
                )),
            }
        }
    }
    tables
}
