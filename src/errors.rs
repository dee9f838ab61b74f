//! Validation findings
//!
//! Every check emits a [`Finding`] tagged with a stable numeric [`Code`].
//! Findings are collected in a [`ValidationReport`]; batch runs aggregate
//! reports by filename in a [`BatchReport`].

use serde::Serialize;
use std::fmt;

use crate::model::IdKind;

/// Check family a code belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationLayer {
    Document,
    Syntax,
    Referential,
    Ontology,
    Configuration,
    StudyGroups,
}

impl fmt::Display for ValidationLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationLayer::Document => write!(f, "Document"),
            ValidationLayer::Syntax => write!(f, "Syntax"),
            ValidationLayer::Referential => write!(f, "Referential"),
            ValidationLayer::Ontology => write!(f, "Ontology"),
            ValidationLayer::Configuration => write!(f, "Configuration"),
            ValidationLayer::StudyGroups => write!(f, "StudyGroups"),
        }
    }
}

/// Severity of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Stable validation codes shared by the ISA-Tab and ISA-JSON checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    // Document level
    SystemError,
    JsonParse,
    JsonSchema,
    NotUtf8,
    InvestigationFile,
    StudyFile,
    AssayFile,

    // 10xx referential
    SourceLink,
    SampleLink,
    DataFileLink,
    MaterialLink,
    ProcessLink,
    ProtocolRef,
    FactorRef,
    ParameterRef,
    ProtocolMissingName,
    ParameterMissingName,
    FactorMissingName,
    AssaySamplesNotInStudy,
    CharacteristicCategoryLink,
    UnitLink,
    ProtocolUnused,
    ParameterUnused,
    FactorUnused,

    // 30xx syntax and ontology
    DateFormat,
    DoiFormat,
    PubMedIdFormat,
    MissingFileName,
    OntologySourceUnused,
    OntologySourceMissingName,
    TermSourceNotDeclared,
    QualifierPlacement,

    // 40xx configuration
    ConfigsNotLoaded,
    NoConfiguration,
    InvestigationLabelMissing,
    ProtocolSequence,
    FactorValueMissing,
    RequiredColumnMissing,
    InvalidDataType,
    RequiredCellMissing,
    ColumnRepeated,
    UnrecognisedHeading,

    // 50xx study groups
    StudyGroupInfo,
    StudyGroupMismatch,
}

impl Code {
    /// Numeric code used in reports
    pub fn number(&self) -> u16 {
        match self {
            Code::SystemError => 0,
            Code::JsonParse => 1,
            Code::JsonSchema => 2,
            Code::InvestigationFile => 5,
            Code::StudyFile => 6,
            Code::AssayFile => 8,
            Code::NotUtf8 => 10,
            Code::SourceLink => 1002,
            Code::SampleLink => 1003,
            Code::DataFileLink => 1004,
            Code::MaterialLink => 1005,
            Code::ProcessLink => 1006,
            Code::ProtocolRef => 1007,
            Code::FactorRef => 1008,
            Code::ParameterRef => 1009,
            Code::ProtocolMissingName => 1010,
            Code::ParameterMissingName => 1011,
            Code::FactorMissingName => 1012,
            Code::AssaySamplesNotInStudy => 1013,
            Code::CharacteristicCategoryLink => 1014,
            Code::UnitLink => 1015,
            Code::ProtocolUnused => 1019,
            Code::ParameterUnused => 1020,
            Code::FactorUnused => 1021,
            Code::DateFormat => 3001,
            Code::DoiFormat => 3002,
            Code::PubMedIdFormat => 3003,
            Code::MissingFileName => 3005,
            Code::OntologySourceUnused => 3007,
            Code::OntologySourceMissingName => 3008,
            Code::TermSourceNotDeclared => 3011,
            Code::QualifierPlacement => 3012,
            Code::ConfigsNotLoaded => 4001,
            Code::NoConfiguration => 4002,
            Code::InvestigationLabelMissing => 4003,
            Code::ProtocolSequence => 4004,
            Code::FactorValueMissing => 4007,
            Code::RequiredColumnMissing => 4010,
            Code::InvalidDataType => 4011,
            Code::RequiredCellMissing => 4012,
            Code::ColumnRepeated => 4013,
            Code::UnrecognisedHeading => 4014,
            Code::StudyGroupInfo => 5001,
            Code::StudyGroupMismatch => 5002,
        }
    }

    /// Link code for a dangling node reference, picked by its `@id` prefix
    pub fn node_link(reference: &str) -> Code {
        if reference.starts_with(IdKind::Source.prefix()) {
            Code::SourceLink
        } else if reference.starts_with(IdKind::Sample.prefix()) {
            Code::SampleLink
        } else if reference.starts_with(IdKind::DataFile.prefix()) {
            Code::DataFileLink
        } else {
            Code::MaterialLink
        }
    }

    pub fn layer(&self) -> ValidationLayer {
        match self.number() {
            0..=99 => ValidationLayer::Document,
            1000..=1999 => ValidationLayer::Referential,
            3000..=3006 | 3012 => ValidationLayer::Syntax,
            3007..=3999 => ValidationLayer::Ontology,
            4000..=4999 => ValidationLayer::Configuration,
            _ => ValidationLayer::StudyGroups,
        }
    }

    /// Severity a finding gets unless the caller overrides it
    pub fn default_severity(&self) -> Severity {
        match self {
            Code::SystemError
            | Code::JsonParse
            | Code::JsonSchema
            | Code::NotUtf8
            | Code::InvestigationFile
            | Code::StudyFile
            | Code::AssayFile
            | Code::SourceLink
            | Code::SampleLink
            | Code::DataFileLink
            | Code::MaterialLink
            | Code::ProcessLink
            | Code::ProtocolRef
            | Code::FactorRef
            | Code::ParameterRef
            | Code::AssaySamplesNotInStudy
            | Code::CharacteristicCategoryLink
            | Code::UnitLink
            | Code::UnrecognisedHeading => Severity::Error,
            Code::StudyGroupInfo => Severity::Info,
            _ => Severity::Warning,
        }
    }

    /// Short headline used as the finding message
    pub fn headline(&self) -> &'static str {
        match self {
            Code::SystemError => "Unexpected failure while validating",
            Code::JsonParse => "There was an error when trying to parse the JSON",
            Code::JsonSchema => "The JSON does not validate against the provided ISA-JSON schemas!",
            Code::NotUtf8 => "File should be UTF-8 encoding",
            Code::InvestigationFile => "Investigation file could not be loaded",
            Code::StudyFile => "Missing study file",
            Code::AssayFile => "Missing assay file",
            Code::SourceLink => "Source link not found",
            Code::SampleLink => "Sample link not found",
            Code::DataFileLink => "Data file link not found",
            Code::MaterialLink => "Material link not found",
            Code::ProcessLink => "Process link not found",
            Code::ProtocolRef => "Protocol REF not declared",
            Code::FactorRef => "Factor not declared",
            Code::ParameterRef => "Protocol parameter not declared",
            Code::ProtocolMissingName => "Protocol missing name",
            Code::ParameterMissingName => "Protocol parameter missing name",
            Code::FactorMissingName => "Study factor missing name",
            Code::AssaySamplesNotInStudy => "Some assay samples are not in the study",
            Code::CharacteristicCategoryLink => "Characteristic category not declared",
            Code::UnitLink => "Unit category not declared",
            Code::ProtocolUnused => "Protocol declared but not used",
            Code::ParameterUnused => "Protocol parameter declared but not used",
            Code::FactorUnused => "Study factor declared but not used",
            Code::DateFormat => "Date is not ISO8601 formatted",
            Code::DoiFormat => "DOI is not valid format",
            Code::PubMedIdFormat => "PubMed ID is not valid format",
            Code::MissingFileName => "Missing file name",
            Code::OntologySourceUnused => "Ontology source declared but not used",
            Code::OntologySourceMissingName => "Ontology Source missing name ref",
            Code::TermSourceNotDeclared => "Term Source REF reference broken",
            Code::QualifierPlacement => "Qualifier column in the wrong place",
            Code::ConfigsNotLoaded => "Configurations could not be loaded",
            Code::NoConfiguration => "Measurement/technology type invalid",
            Code::InvestigationLabelMissing => "A required label is missing from the investigation file",
            Code::ProtocolSequence => "Missing Protocol declaration",
            Code::FactorValueMissing => "A required node factor value is missing value",
            Code::RequiredColumnMissing => "A required column in assay table is not present",
            Code::InvalidDataType => "A value does not correspond to the correct data type",
            Code::RequiredCellMissing => "A required cell value is missing",
            Code::ColumnRepeated => "Multiple columns found",
            Code::UnrecognisedHeading => "Unrecognised header",
            Code::StudyGroupInfo => "Found study groups",
            Code::StudyGroupMismatch => "Reported study group count differs from the table",
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.number())
    }
}

impl Serialize for Code {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.number())
    }
}

/// A single validation finding with context
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub message: String,
    pub supplemental: String,
    pub code: Code,
    #[serde(skip)]
    pub severity: Severity,
}

impl Finding {
    /// Finding with the code's headline and default severity
    pub fn new(code: Code, supplemental: impl Into<String>) -> Self {
        Self {
            message: code.headline().to_string(),
            supplemental: supplemental.into(),
            code,
            severity: code.default_severity(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn layer(&self) -> ValidationLayer {
        self.code.layer()
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.supplemental.is_empty() {
            write!(f, "[{}] {}", self.code, self.message)
        } else {
            write!(f, "[{}] {}: {}", self.code, self.message, self.supplemental)
        }
    }
}

/// Result of validating one document
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub file: String,
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
    pub info: Vec<Finding>,
    pub validation_finished: bool,
}

impl ValidationReport {
    pub fn new(file: &str) -> Self {
        Self {
            file: file.to_string(),
            ..Default::default()
        }
    }

    /// Route a finding to errors, warnings or info by its severity
    pub fn add(&mut self, finding: Finding) {
        match finding.severity {
            Severity::Error => {
                tracing::error!(code = finding.code.number(), "{}", finding);
                self.errors.push(finding);
            }
            Severity::Warning => {
                tracing::warn!(code = finding.code.number(), "{}", finding);
                self.warnings.push(finding);
            }
            Severity::Info => {
                tracing::info!(code = finding.code.number(), "{}", finding);
                self.info.push(finding);
            }
        }
    }

    pub fn extend(&mut self, findings: impl IntoIterator<Item = Finding>) {
        for finding in findings {
            self.add(finding);
        }
    }

    /// Move every finding of `other` into this report
    pub fn absorb(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.info.extend(other.info);
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn all(&self) -> impl Iterator<Item = &Finding> {
        self.errors.iter().chain(&self.warnings).chain(&self.info)
    }

    /// Numeric codes of every finding, errors first
    pub fn codes(&self) -> Vec<u16> {
        self.all().map(|f| f.code.number()).collect()
    }

    pub fn error_codes(&self) -> Vec<u16> {
        self.errors.iter().map(|f| f.code.number()).collect()
    }

    pub fn contains(&self, code: Code) -> bool {
        self.all().any(|f| f.code == code)
    }

    /// Turn every warning of the given codes into an error
    pub fn escalate(&mut self, codes: &[Code]) {
        let (escalated, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.warnings)
            .into_iter()
            .partition(|f| codes.contains(&f.code));
        self.warnings = kept;
        self.errors.extend(
            escalated
                .into_iter()
                .map(|f| f.with_severity(Severity::Error)),
        );
    }
}

/// Reports of a batch run, keyed by filename in input order
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub reports: Vec<ValidationReport>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, report: ValidationReport) {
        self.reports.push(report);
    }

    pub fn get(&self, file: &str) -> Option<&ValidationReport> {
        self.reports.iter().find(|r| r.file == file)
    }

    pub fn is_valid(&self) -> bool {
        self.reports.iter().all(ValidationReport::is_valid)
    }

    pub fn error_count(&self) -> usize {
        self.reports.iter().map(|r| r.errors.len()).sum()
    }

    pub fn warning_count(&self) -> usize {
        self.reports.iter().map(|r| r.warnings.len()).sum()
    }
}
