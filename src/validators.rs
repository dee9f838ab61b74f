//! Validation layer implementations
//!
//! Each function checks one concern and returns its findings:
//! - Referential: node and process links, names, usage and references of
//!   declared protocols, parameters and factors (10xx)
//! - Syntax: dates, DOIs and PubMed IDs (30xx)
//! - Ontology: ontology source declarations (30xx)
//! - Configuration: investigation labels and table layout (40xx)
//! - Study groups: factor value combinations (50xx)

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};

use crate::config::{AssayConfig, ConfigSet};
use crate::errors::{Code, Finding};
use crate::isatab::{InvestigationFile, Table};
use crate::labels::{PROTOCOL_REF, RX_FACTOR_VALUE};
use crate::model::{
    Id, Investigation, Measured, NodeRef, OntologyAnnotation, Person, Process, Publication, Sample, Study, StudyIndex,
    Unit,
};

/// Study comment carrying the expected number of study groups
pub const STUDY_GROUP_COMMENT: &str = "Number of Study Groups";

static RX_DOI: Lazy<Regex> = Lazy::new(|| Regex::new(r"^10\.\d{4,9}/[-._;()/:a-zA-Z0-9]+$").unwrap());
static RX_PUBMED_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(PMC)?[0-9]{8}$").unwrap());

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS` and RFC 3339 timestamps
pub fn is_iso8601(value: &str) -> bool {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value).is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").is_ok()
        || NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

fn processes(study: &Study) -> impl Iterator<Item = &Process> {
    study
        .process_sequence
        .iter()
        .chain(study.assays.iter().flat_map(|a| a.process_sequence.iter()))
}

fn samples(study: &Study) -> impl Iterator<Item = &Sample> {
    study
        .samples
        .iter()
        .chain(study.assays.iter().flat_map(|a| a.samples.iter()))
}

// ─────────────────────────────────────────────────────────────
// Referential (10xx)
// ─────────────────────────────────────────────────────────────

/// Protocols, parameters and factors must be named (1010, 1011, 1012)
pub fn validate_names(investigation: &Investigation) -> Vec<Finding> {
    let mut findings = Vec::new();
    for study in &investigation.studies {
        for protocol in &study.protocols {
            if protocol.name.trim().is_empty() {
                findings.push(Finding::new(
                    Code::ProtocolMissingName,
                    format!("{} in study '{}'", protocol.id, study.identifier),
                ));
            }
            for parameter in &protocol.parameters {
                if parameter.name.term.trim().is_empty() {
                    findings.push(Finding::new(
                        Code::ParameterMissingName,
                        format!("{} of protocol '{}'", parameter.id, protocol.name),
                    ));
                }
            }
        }
        for factor in &study.factors {
            if factor.name.trim().is_empty() {
                findings.push(Finding::new(
                    Code::FactorMissingName,
                    format!("{} in study '{}'", factor.id, study.identifier),
                ));
            }
        }
    }
    findings
}

/// Declared protocols, parameters and factors should be used (1019, 1020, 1021)
pub fn validate_usage(investigation: &Investigation) -> Vec<Finding> {
    let mut findings = Vec::new();
    for study in &investigation.studies {
        let mut protocols_used: HashSet<&Id> = HashSet::new();
        let mut parameters_used: HashSet<&Id> = HashSet::new();
        for process in processes(study) {
            protocols_used.insert(&process.executes_protocol);
            parameters_used.extend(process.parameter_values.iter().map(|pv| &pv.category));
        }
        let factors_used: HashSet<&Id> = samples(study)
            .flat_map(|s| s.factor_values.iter())
            .map(|fv| &fv.factor)
            .collect();

        for protocol in &study.protocols {
            if !protocols_used.contains(&protocol.id) {
                findings.push(Finding::new(
                    Code::ProtocolUnused,
                    format!("Protocol '{}' of study '{}' is not executed by any process", protocol.name, study.identifier),
                ));
                continue;
            }
            for parameter in &protocol.parameters {
                if !parameters_used.contains(&parameter.id) {
                    findings.push(Finding::new(
                        Code::ParameterUnused,
                        format!("Parameter '{}' of protocol '{}' has no value", parameter.name.term, protocol.name),
                    ));
                }
            }
        }
        for factor in &study.factors {
            if !factors_used.contains(&factor.id) {
                findings.push(Finding::new(
                    Code::FactorUnused,
                    format!("Factor '{}' of study '{}' has no sample value", factor.name, study.identifier),
                ));
            }
        }
    }
    findings
}

/// Processes, parameter values and factor values must point at declared
/// entities (1007, 1009, 1008)
///
/// Readers already report and drop the references they cannot resolve, so
/// this only matters for models assembled in code.
pub fn validate_references(investigation: &Investigation) -> Vec<Finding> {
    let mut findings = Vec::new();
    for study in &investigation.studies {
        for process in processes(study) {
            let Some(protocol) = study.protocol(&process.executes_protocol) else {
                findings.push(Finding::new(
                    Code::ProtocolRef,
                    format!("{} executes {} which study '{}' does not declare", process.id, process.executes_protocol, study.identifier),
                ));
                continue;
            };
            for pv in &process.parameter_values {
                if protocol.parameter(&pv.category).is_none() {
                    findings.push(Finding::new(
                        Code::ParameterRef,
                        format!("{} used by {} is not a parameter of protocol '{}'", pv.category, process.id, protocol.name),
                    ));
                }
            }
        }
        for sample in samples(study) {
            for fv in &sample.factor_values {
                if study.factor(&fv.factor).is_none() {
                    findings.push(Finding::new(
                        Code::FactorRef,
                        format!("{} on sample '{}' is not a factor of study '{}'", fv.factor, sample.name, study.identifier),
                    ));
                }
            }
        }
    }
    findings
}

fn link_code(node: &NodeRef) -> Code {
    match node {
        NodeRef::Source(_) => Code::SourceLink,
        NodeRef::Sample(_) => Code::SampleLink,
        NodeRef::Material(_) => Code::MaterialLink,
        NodeRef::DataFile(_) => Code::DataFileLink,
    }
}

fn check_chain(findings: &mut Vec<Finding>, index: &StudyIndex<'_>, process: &Process) {
    if let Some(prev) = &process.prev_process {
        match index.process(prev) {
            None => findings.push(Finding::new(
                Code::ProcessLink,
                format!("previous process {} of {} is not declared", prev, process.id),
            )),
            Some(p) if p.next_process.as_ref() != Some(&process.id) => findings.push(Finding::new(
                Code::ProcessLink,
                format!("{} follows {} but {} does not lead back to it", process.id, prev, prev),
            )),
            Some(_) => {}
        }
    }
    if let Some(next) = &process.next_process {
        match index.process(next) {
            None => findings.push(Finding::new(
                Code::ProcessLink,
                format!("next process {} of {} is not declared", next, process.id),
            )),
            Some(p) if p.prev_process.as_ref() != Some(&process.id) => findings.push(Finding::new(
                Code::ProcessLink,
                format!("{} precedes {} but {} does not point back to it", process.id, next, next),
            )),
            Some(_) => {}
        }
    }
}

/// Process inputs and outputs, derivations and process chains must resolve
/// inside their study (1002, 1003, 1004, 1005, 1006)
///
/// Sample outputs of study processes must be study samples, and linked
/// processes must agree: `prev.next == self` and `next.prev == self`.
pub fn validate_links(investigation: &Investigation) -> Vec<Finding> {
    let mut findings = Vec::new();
    for study in &investigation.studies {
        let index = StudyIndex::new(study);
        let study_samples: HashSet<&Id> = study.samples.iter().map(|s| &s.id).collect();

        let study_processes = study.process_sequence.iter().map(|p| (p, true));
        let assay_processes = study
            .assays
            .iter()
            .flat_map(|a| a.process_sequence.iter())
            .map(|p| (p, false));
        for (process, in_study) in study_processes.chain(assay_processes) {
            for node in &process.inputs {
                if index.node(node).is_none() {
                    findings.push(Finding::new(
                        link_code(node),
                        format!("{} used by {} is not declared in study '{}'", node.id(), process.id, study.identifier),
                    ));
                }
            }
            for node in &process.outputs {
                match node {
                    NodeRef::Sample(id) if in_study && !study_samples.contains(id) => findings.push(Finding::new(
                        Code::SampleLink,
                        format!("{} output of {} is not a sample of study '{}'", id, process.id, study.identifier),
                    )),
                    NodeRef::Sample(_) if in_study => {}
                    _ if index.node(node).is_none() => findings.push(Finding::new(
                        link_code(node),
                        format!("{} made by {} is not declared in study '{}'", node.id(), process.id, study.identifier),
                    )),
                    _ => {}
                }
            }
            check_chain(&mut findings, &index, process);
        }

        let sample_upstream = samples(study).map(|s| (s.name.as_str(), &s.derives_from));
        let material_upstream = study
            .other_material
            .iter()
            .chain(study.assays.iter().flat_map(|a| a.other_material.iter()))
            .map(|m| (m.name.as_str(), &m.derives_from));
        let data_file_upstream = study
            .assays
            .iter()
            .flat_map(|a| a.data_files.iter())
            .map(|d| (d.filename.as_str(), &d.generated_from));
        for (name, upstream) in sample_upstream.chain(material_upstream).chain(data_file_upstream) {
            for id in upstream.iter().filter(|id| !index.has_node(id)) {
                findings.push(Finding::new(
                    Code::node_link(id.as_str()),
                    format!("'{}' derives from {} which study '{}' does not declare", name, id, study.identifier),
                ));
            }
        }
    }
    findings
}

// ─────────────────────────────────────────────────────────────
// Syntax (30xx)
// ─────────────────────────────────────────────────────────────

fn check_date(findings: &mut Vec<Finding>, owner: &str, label: &str, value: &str) {
    if !value.trim().is_empty() && !is_iso8601(value) {
        findings.push(Finding::new(
            Code::DateFormat,
            format!("{} of {} is '{}'", label, owner, value),
        ));
    }
}

fn check_publications(findings: &mut Vec<Finding>, owner: &str, publications: &[Publication]) {
    for publication in publications {
        let doi = publication.doi.trim();
        if !doi.is_empty() && !RX_DOI.is_match(doi) {
            findings.push(Finding::new(Code::DoiFormat, format!("'{}' in {}", doi, owner)));
        }
        let pubmed_id = publication.pubmed_id.trim();
        if !pubmed_id.is_empty() && !RX_PUBMED_ID.is_match(pubmed_id) {
            findings.push(Finding::new(Code::PubMedIdFormat, format!("'{}' in {}", pubmed_id, owner)));
        }
    }
}

/// Dates, DOIs and PubMed IDs (3001, 3002, 3003)
pub fn validate_syntax(investigation: &Investigation) -> Vec<Finding> {
    let mut findings = Vec::new();
    let owner = format!("investigation '{}'", investigation.identifier);
    check_date(&mut findings, &owner, "Submission Date", &investigation.submission_date);
    check_date(&mut findings, &owner, "Public Release Date", &investigation.public_release_date);
    check_publications(&mut findings, &owner, &investigation.publications);
    for study in &investigation.studies {
        let owner = format!("study '{}'", study.identifier);
        check_date(&mut findings, &owner, "Submission Date", &study.submission_date);
        check_date(&mut findings, &owner, "Public Release Date", &study.public_release_date);
        check_publications(&mut findings, &owner, &study.publications);
    }
    findings
}

// ─────────────────────────────────────────────────────────────
// Ontology (30xx)
// ─────────────────────────────────────────────────────────────

fn measured<'a, M: Measured>(m: &'a M, out: &mut Vec<&'a OntologyAnnotation>) {
    out.extend(m.value().as_term());
    if let Some(Unit::Term(unit)) = m.unit() {
        out.push(unit);
    }
}

fn people_and_publications<'a>(
    contacts: &'a [Person],
    publications: &'a [Publication],
    out: &mut Vec<&'a OntologyAnnotation>,
) {
    out.extend(contacts.iter().flat_map(|p| p.roles.iter()));
    out.extend(publications.iter().filter_map(|p| p.status.as_ref()));
}

fn study_annotations<'a>(study: &'a Study, out: &mut Vec<&'a OntologyAnnotation>) {
    out.extend(study.design_descriptors.iter());
    people_and_publications(&study.contacts, &study.publications, out);
    out.extend(study.factors.iter().filter_map(|f| f.factor_type.as_ref()));
    for protocol in &study.protocols {
        out.extend(protocol.protocol_type.as_ref());
        out.extend(protocol.parameters.iter().map(|p| &p.name));
        out.extend(protocol.components.iter().filter_map(|c| c.component_type.as_ref()));
    }
    out.extend(study.characteristic_categories.iter());
    out.extend(study.units.iter());
    for assay in &study.assays {
        out.push(&assay.measurement_type);
        out.push(&assay.technology_type);
        out.extend(assay.characteristic_categories.iter());
        out.extend(assay.units.iter());
    }

    let characteristics = study
        .sources
        .iter()
        .flat_map(|s| s.characteristics.iter())
        .chain(samples(study).flat_map(|s| s.characteristics.iter()))
        .chain(study.other_material.iter().flat_map(|m| m.characteristics.iter()))
        .chain(
            study
                .assays
                .iter()
                .flat_map(|a| a.other_material.iter())
                .flat_map(|m| m.characteristics.iter()),
        );
    for characteristic in characteristics {
        out.push(&characteristic.category);
        measured(characteristic, out);
    }
    for fv in samples(study).flat_map(|s| s.factor_values.iter()) {
        measured(fv, out);
    }
    for pv in processes(study).flat_map(|p| p.parameter_values.iter()) {
        measured(pv, out);
    }
}

/// Every annotation of the investigation, in document order
pub fn annotations(investigation: &Investigation) -> Vec<&OntologyAnnotation> {
    let mut out = Vec::new();
    people_and_publications(&investigation.contacts, &investigation.publications, &mut out);
    for study in &investigation.studies {
        study_annotations(study, &mut out);
    }
    out
}

/// Ontology source declarations (3008, 3011 and, when `check_unused`, 3007)
pub fn validate_ontology_sources(investigation: &Investigation, check_unused: bool) -> Vec<Finding> {
    let mut findings = Vec::new();
    let declared: HashSet<&str> = investigation
        .ontology_source_references
        .iter()
        .map(|s| s.name.as_str())
        .collect();
    for source in &investigation.ontology_source_references {
        if source.name.trim().is_empty() {
            findings.push(Finding::new(
                Code::OntologySourceMissingName,
                format!("Ontology source with file '{}' has no name", source.file),
            ));
        }
    }

    let mut used: HashSet<&str> = HashSet::new();
    let mut undeclared: BTreeSet<&str> = BTreeSet::new();
    for annotation in annotations(investigation) {
        let source = annotation.term_source.as_str();
        if source.is_empty() {
            continue;
        }
        used.insert(source);
        if !declared.contains(source) {
            undeclared.insert(source);
        }
    }
    for source in undeclared {
        findings.push(Finding::new(
            Code::TermSourceNotDeclared,
            format!("Term Source REF '{}' is not an ontology source of the investigation", source),
        ));
    }

    if check_unused {
        for source in &investigation.ontology_source_references {
            if !source.name.is_empty() && !used.contains(source.name.as_str()) {
                findings.push(Finding::new(
                    Code::OntologySourceUnused,
                    format!("'{}' is not referenced by any annotation", source.name),
                ));
            }
        }
    }
    findings
}

// ─────────────────────────────────────────────────────────────
// Configuration (40xx)
// ─────────────────────────────────────────────────────────────

/// Investigation labels required by the configuration (4003) and a
/// configuration for every assay type (4002)
pub fn validate_investigation_config(
    file: &InvestigationFile,
    investigation: &Investigation,
    configs: &ConfigSet,
) -> Vec<Finding> {
    let mut findings = Vec::new();
    if let Some(config) = configs.investigation() {
        for field in config.fields() {
            let rows: Vec<_> = file
                .sections
                .iter()
                .filter_map(|s| s.row(&field.header).map(|r| (s, r)))
                .collect();
            if rows.is_empty() {
                findings.push(Finding::new(
                    Code::InvestigationLabelMissing,
                    format!("Label '{}' is missing", field.header),
                ));
                continue;
            }
            if !field.required {
                continue;
            }
            for (section, row) in rows {
                for i in 0..section.entity_count() {
                    if row.values.get(i).map_or(true, |v| v.trim().is_empty()) {
                        findings.push(Finding::new(
                            Code::InvestigationLabelMissing,
                            format!("'{}' has no value for entry {} of {}", field.header, i + 1, section.name),
                        ));
                    }
                }
            }
        }
    }

    for study in &investigation.studies {
        for assay in &study.assays {
            let (measurement, technology) = (&assay.measurement_type.term, &assay.technology_type.term);
            if configs.get(measurement, technology).is_none() {
                findings.push(Finding::new(
                    Code::NoConfiguration,
                    format!(
                        "No configuration for measurement '{}' and technology '{}' used by {}",
                        measurement, technology, assay.filename
                    ),
                ));
            }
        }
    }
    findings
}

fn header_positions(table: &Table, header: &str) -> Vec<usize> {
    table
        .header
        .iter()
        .enumerate()
        .filter(|(_, h)| h.trim().eq_ignore_ascii_case(header))
        .map(|(i, _)| i)
        .collect()
}

/// Required columns (4010, 4013), required cells (4012), data types (4011)
/// and protocol order (4004) of a table against its configuration
pub fn validate_table_config(table: &Table, config: &AssayConfig, study: &Study) -> Vec<Finding> {
    let mut findings = Vec::new();
    for field in config.fields() {
        let found = header_positions(table, &field.header);
        match found.len() {
            0 => {
                if field.required {
                    findings.push(Finding::new(
                        Code::RequiredColumnMissing,
                        format!("'{}' not found in {}", field.header, table.name),
                    ));
                }
                continue;
            }
            1 => {}
            n => findings.push(Finding::new(
                Code::ColumnRepeated,
                format!("'{}' appears {} times in {}", field.header, n, table.name),
            )),
        }
        let col = found[0];
        for row in 0..table.rows.len() {
            let cell = table.cell(row, col).trim();
            if cell.is_empty() {
                if field.required {
                    findings.push(Finding::new(
                        Code::RequiredCellMissing,
                        format!("'{}' is empty at row {} of {}", field.header, row + 1, table.name),
                    ));
                }
            } else if !field.accepts(cell) {
                findings.push(Finding::new(
                    Code::InvalidDataType,
                    format!(
                        "'{}' in '{}' at row {} of {} is not a valid {:?}",
                        cell,
                        field.header,
                        row + 1,
                        table.name,
                        field.data_type
                    ),
                ));
            }
        }
    }
    findings.extend(validate_protocol_sequence(table, config, study));
    findings
}

fn is_node_header(header: &str) -> bool {
    let header = header.trim().to_lowercase();
    header.ends_with(" name") || header.ends_with(" data file") || header.ends_with(" data matrix file")
}

/// Protocol types configured between two consecutive node columns must be
/// executed there (4004)
pub fn validate_protocol_sequence(table: &Table, config: &AssayConfig, study: &Study) -> Vec<Finding> {
    let mut findings = Vec::new();
    let nodes: Vec<usize> = (0..table.width()).filter(|&i| is_node_header(&table.header[i])).collect();
    let protocols: Vec<usize> = (0..table.width())
        .filter(|&i| table.header[i].trim() == PROTOCOL_REF)
        .collect();

    if let (Some(&last_protocol), Some(&last_node)) = (protocols.last(), nodes.last()) {
        if last_protocol > last_node {
            findings.push(Finding::new(
                Code::ProtocolSequence,
                format!("Protocol REF column is not followed by a material or data node in {}", table.name),
            ));
        }
    }

    for pair in nodes.windows(2) {
        let (left, right) = (pair[0], pair[1]);
        let expected = config.protocols_between(&table.header[left], &table.header[right]);
        if expected.is_empty() {
            continue;
        }
        let mut executed: HashSet<String> = HashSet::new();
        for &col in protocols.iter().filter(|&&c| left < c && c < right) {
            for row in 0..table.rows.len() {
                if let Some(protocol) = study.protocol_by_name(table.cell(row, col).trim()) {
                    executed.insert(protocol.type_term().to_lowercase());
                }
            }
        }
        let missing: Vec<&str> = expected
            .into_iter()
            .filter(|t| !executed.contains(&t.to_lowercase()))
            .collect();
        if !missing.is_empty() {
            findings.push(Finding::new(
                Code::ProtocolSequence,
                format!(
                    "Protocol type(s) {:?} expected between '{}' and '{}' but not found in {}",
                    missing, table.header[left], table.header[right], table.name
                ),
            ));
        }
    }
    findings
}

/// Factor Value cells must not be empty (4007)
pub fn validate_factor_values(table: &Table) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (col, header) in table.header.iter().enumerate() {
        if !RX_FACTOR_VALUE.is_match(header.trim()) {
            continue;
        }
        for row in 0..table.rows.len() {
            if table.cell(row, col).trim().is_empty() {
                findings.push(Finding::new(
                    Code::FactorValueMissing,
                    format!("Missing value for '{}' at row {} in {}", header, row + 1, table.name),
                ));
            }
        }
    }
    findings
}

// ─────────────────────────────────────────────────────────────
// Study groups (50xx)
// ─────────────────────────────────────────────────────────────

/// Count distinct factor value combinations of a study table (5001) and
/// compare with `Comment[Number of Study Groups]` (5002)
pub fn validate_study_groups(table: &Table, study: &Study) -> Vec<Finding> {
    let factor_columns: Vec<usize> = (0..table.width())
        .filter(|&i| RX_FACTOR_VALUE.is_match(table.header[i].trim()))
        .collect();
    if factor_columns.is_empty() {
        tracing::debug!(file = %table.name, "no factor value columns, study groups not counted");
        return Vec::new();
    }
    let groups: HashSet<Vec<&str>> = (0..table.rows.len())
        .map(|row| factor_columns.iter().map(|&c| table.cell(row, c).trim()).collect())
        .collect();
    let count = groups.len();

    let mut findings = vec![Finding::new(
        Code::StudyGroupInfo,
        format!("Found {} study groups in {}", count, table.name),
    )];
    if let Some(reported) = study.comments.iter().find(|c| c.name == STUDY_GROUP_COMMENT) {
        match reported.value.trim().parse::<usize>() {
            Ok(expected) if expected == count => {}
            Ok(expected) => findings.push(Finding::new(
                Code::StudyGroupMismatch,
                format!("Study group size reported as {} but found {} in {}", expected, count, table.name),
            )),
            Err(_) => findings.push(Finding::new(
                Code::StudyGroupMismatch,
                format!("Comment[{}] '{}' is not a number", STUDY_GROUP_COMMENT, reported.value),
            )),
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Severity;
    use crate::isatab::read_investigation_file;
    use crate::model::{
        Characteristic, Comment, FactorValue, OntologySource, ParameterValue, Protocol, ProtocolParameter, Source,
        StudyFactor, Value,
    };

    fn codes(findings: &[Finding]) -> Vec<u16> {
        findings.iter().map(|f| f.code.number()).collect()
    }

    fn table(text: &str) -> Table {
        Table::parse("a_test.txt", text, false).unwrap()
    }

    const MS_CONFIG: &str = r#"
measurement_type: metabolite profiling
technology_type: mass spectrometry
columns:
  - header: Sample Name
    required: true
  - protocol: extraction
  - header: Extract Name
  - protocol: mass spectrometry
  - header: MS Assay Name
    required: true
  - header: Parameter Value[injection volume]
    data_type: double
"#;

    /// Study with one collection process, one parameter value and one factor value
    fn collected_study() -> Study {
        let mut study = Study::new("s_test.txt");
        study.identifier = "S1".to_string();
        let mut protocol = Protocol::typed("collect", "sample collection");
        protocol.parameters.push(ProtocolParameter::named("volume"));
        let parameter = protocol.parameters[0].id.clone();
        let factor = StudyFactor::new("dose");

        let source = Source::new("source1");
        let mut sample = Sample::new("sample1");
        sample.factor_values.push(FactorValue::new(factor.id.clone(), Value::from("high")));
        let mut process = Process::new(protocol.id.clone());
        process.parameter_values.push(ParameterValue::new(parameter, Value::Integer(5)));
        process.add_input(crate::model::NodeRef::Source(source.id.clone()));
        process.add_output(crate::model::NodeRef::Sample(sample.id.clone()));

        study.protocols.push(protocol);
        study.factors.push(factor);
        study.sources.push(source);
        study.samples.push(sample);
        study.process_sequence.push(process);
        study
    }

    fn investigation_with(study: Study) -> Investigation {
        let mut investigation = Investigation::new();
        investigation.studies.push(study);
        investigation
    }

    #[test]
    fn test_is_iso8601() {
        assert!(is_iso8601("2008-08-15"));
        assert!(is_iso8601("2008-08-15T10:30:00"));
        assert!(is_iso8601("2008-08-15T10:30:00+01:00"));
        assert!(!is_iso8601("15/08/2008"));
        assert!(!is_iso8601("2008-13-01"));
    }

    #[test]
    fn test_syntax_checks() {
        let mut investigation = Investigation::new();
        investigation.submission_date = "2007-04-30".to_string();
        investigation.public_release_date = "30.04.2009".to_string();
        investigation.publications.push(Publication {
            doi: "10.1186/jbiol54".to_string(),
            pubmed_id: "17439666".to_string(),
            ..Default::default()
        });
        investigation.publications.push(Publication {
            doi: "doi:10.1186".to_string(),
            pubmed_id: "1743".to_string(),
            ..Default::default()
        });
        let findings = validate_syntax(&investigation);
        assert_eq!(codes(&findings), vec![3001, 3002, 3003]);
        assert!(findings.iter().all(|f| f.severity == Severity::Warning));
    }

    #[test]
    fn test_names_and_usage() {
        let mut study = collected_study();
        study.protocols.push(Protocol::new(""));
        study.factors.push(StudyFactor::new("time"));
        study.protocols[0].parameters.push(ProtocolParameter::named("speed"));
        let investigation = investigation_with(study);

        assert_eq!(codes(&validate_names(&investigation)), vec![1010]);
        let usage = validate_usage(&investigation);
        assert_eq!(codes(&usage), vec![1020, 1019, 1021]);
        assert!(usage[0].supplemental.contains("speed"));
        assert!(usage[2].supplemental.contains("time"));
    }

    #[test]
    fn test_unknown_parameter_is_the_only_reference_error() {
        let mut study = collected_study();
        let stray = ProtocolParameter::named("stray").id;
        study.process_sequence[0]
            .parameter_values
            .push(ParameterValue::new(stray, Value::Integer(1)));
        let findings = validate_references(&investigation_with(study));
        assert_eq!(codes(&findings), vec![1009]);
    }

    #[test]
    fn test_dangling_protocol_and_factor() {
        let mut study = collected_study();
        study.process_sequence[0].executes_protocol = Id::new("#protocol/ghost");
        study.samples[0]
            .factor_values
            .push(FactorValue::new(Id::new("#factor/ghost"), Value::from("x")));
        let findings = validate_references(&investigation_with(study));
        assert_eq!(codes(&findings), vec![1007, 1008]);
    }

    #[test]
    fn test_links_resolve_in_collected_study() {
        assert!(validate_links(&investigation_with(collected_study())).is_empty());
    }

    #[test]
    fn test_dangling_links() {
        let mut study = collected_study();
        let mut assay = crate::model::Assay::new("a_test.txt");
        let mut raw = crate::model::DataFile::new("raw.cel", crate::model::DataFileKind::Raw);
        raw.generated_from.push(Id::new("#sample/ghost"));
        let mut scan = Process::new(study.protocols[0].id.clone());
        scan.add_input(crate::model::NodeRef::Sample(study.samples[0].id.clone()));
        scan.add_output(crate::model::NodeRef::DataFile(Id::new("#data/ghost")));
        assay.data_files.push(raw);
        assay.process_sequence.push(scan);
        study.assays.push(assay);
        study.process_sequence[0].add_input(crate::model::NodeRef::Source(Id::new("#source/ghost")));
        study.process_sequence[0].next_process = Some(Id::new("#process/ghost"));

        let findings = validate_links(&investigation_with(study));
        assert_eq!(codes(&findings), vec![1002, 1006, 1004, 1003]);
        assert!(findings.iter().all(|f| f.severity == Severity::Error));
    }

    #[test]
    fn test_one_sided_process_link() {
        let mut study = collected_study();
        let mut second = study.process_sequence[0].duplicate();
        second.prev_process = Some(study.process_sequence[0].id.clone());
        study.process_sequence[0].next_process = None;
        study.process_sequence.push(second);
        let findings = validate_links(&investigation_with(study));
        assert_eq!(codes(&findings), vec![1006]);
        assert!(findings[0].supplemental.contains("does not lead back"));
    }

    #[test]
    fn test_ontology_sources() {
        let mut study = collected_study();
        let organism = OntologyAnnotation::sourced("organism", "OBI", "");
        let value = OntologyAnnotation::sourced("Homo sapiens", "NCBITAXON", "9606");
        study.sources[0]
            .characteristics
            .push(Characteristic::new(organism, Value::Term(value)));
        let mut investigation = investigation_with(study);
        investigation.ontology_source_references.push(OntologySource::new("OBI"));
        investigation.ontology_source_references.push(OntologySource::new("EFO"));
        investigation.ontology_source_references.push(OntologySource::new(""));

        let findings = validate_ontology_sources(&investigation, false);
        assert_eq!(codes(&findings), vec![3008, 3011]);
        assert!(findings[1].supplemental.contains("NCBITAXON"));

        let findings = validate_ontology_sources(&investigation, true);
        assert_eq!(codes(&findings), vec![3008, 3011, 3007]);
        assert!(findings[2].supplemental.contains("EFO"));
    }

    #[test]
    fn test_investigation_labels_and_assay_types() {
        let text = "INVESTIGATION\nInvestigation Identifier\tI1\n\
                    STUDY\nStudy Identifier\tS1\nStudy Title\t\nStudy File Name\ts_1.txt\n\
                    STUDY ASSAYS\nStudy Assay Measurement Type\tmetabolite profiling\n\
                    Study Assay Technology Type\tmass spectrometry\nStudy Assay File Name\ta_1.txt\n";
        let (file, _) = read_investigation_file(text);
        let mut investigation = Investigation::new();
        let mut study = Study::new("s_1.txt");
        let mut assay = crate::model::Assay::new("a_1.txt");
        assay.measurement_type = OntologyAnnotation::new("metabolite profiling");
        assay.technology_type = OntologyAnnotation::new("mass spectrometry");
        study.assays.push(assay);
        let mut odd = crate::model::Assay::new("a_2.txt");
        odd.measurement_type = OntologyAnnotation::new("cell counting");
        study.assays.push(odd);
        investigation.studies.push(study);

        let configs = ConfigSet::embedded().unwrap();
        let findings = validate_investigation_config(&file, &investigation, &configs);
        let missing: Vec<&str> = findings
            .iter()
            .filter(|f| f.code == Code::InvestigationLabelMissing)
            .map(|f| f.supplemental.as_str())
            .collect();
        assert!(missing.iter().any(|s| s.contains("Study Protocol Name")));
        assert!(missing.iter().any(|s| s.contains("'Study Title' has no value")));
        let no_config: Vec<&Finding> = findings.iter().filter(|f| f.code == Code::NoConfiguration).collect();
        assert_eq!(no_config.len(), 1);
        assert!(no_config[0].supplemental.contains("a_2.txt"));
        assert_eq!(no_config[0].severity, Severity::Warning);
    }

    #[test]
    fn test_table_columns_and_cells() {
        let config = AssayConfig::from_yaml(MS_CONFIG).unwrap();
        let table = table(
            "Sample Name\tProtocol REF\tExtract Name\tParameter Value[injection volume]\tParameter Value[Injection Volume]\n\
             s1\textract\te1\t5.0\t5.0\n\
             \textract\te2\tlots\tlots\n",
        );
        let mut study = Study::new("s_test.txt");
        study.protocols.push(Protocol::typed("extract", "extraction"));
        let found = codes(&validate_table_config(&table, &config, &study));
        assert_eq!(found, vec![4012, 4010, 4013, 4011]);
    }

    #[test]
    fn test_protocol_sequence() {
        let config = AssayConfig::from_yaml(MS_CONFIG).unwrap();
        let table = table(
            "Sample Name\tProtocol REF\tExtract Name\tProtocol REF\tMS Assay Name\n\
             s1\textract\te1\tms run\tassay1\n",
        );
        let mut study = Study::new("s_test.txt");
        study.protocols.push(Protocol::typed("extract", "Extraction"));
        assert_eq!(codes(&validate_protocol_sequence(&table, &config, &study)), vec![4004]);

        study.protocols.push(Protocol::typed("ms run", "mass spectrometry"));
        assert!(validate_protocol_sequence(&table, &config, &study).is_empty());

        study.protocols[1] = Protocol::typed("ms run", "nmr spectroscopy");
        let findings = validate_protocol_sequence(&table, &config, &study);
        assert_eq!(codes(&findings), vec![4004]);
        assert!(findings[0].supplemental.contains("mass spectrometry"));
    }

    #[test]
    fn test_trailing_protocol_ref() {
        let config = AssayConfig::from_yaml(MS_CONFIG).unwrap();
        let table = table("Sample Name\tProtocol REF\ns1\textract\n");
        let findings = validate_protocol_sequence(&table, &config, &Study::default());
        assert_eq!(codes(&findings), vec![4004]);
    }

    #[test]
    fn test_factor_values_present() {
        let table = table("Sample Name\tFactor Value[dose]\ns1\thigh\ns2\t\n");
        let findings = validate_factor_values(&table);
        assert_eq!(codes(&findings), vec![4007]);
        assert!(findings[0].supplemental.contains("row 2"));
    }

    #[test]
    fn test_study_groups() {
        let table = table(
            "Source Name\tProtocol REF\tSample Name\tFactor Value[dose]\tFactor Value[time]\n\
             src1\tcollect\ts1\thigh\t1\n\
             src1\tcollect\ts2\thigh\t1\n\
             src2\tcollect\ts3\tlow\t1\n",
        );
        let mut study = Study::new("s_test.txt");
        let findings = validate_study_groups(&table, &study);
        assert_eq!(codes(&findings), vec![5001]);
        assert_eq!(findings[0].severity, Severity::Info);
        assert!(findings[0].supplemental.starts_with("Found 2 study groups"));

        study.comments.push(Comment::new(STUDY_GROUP_COMMENT, "3"));
        assert_eq!(codes(&validate_study_groups(&table, &study)), vec![5001, 5002]);

        let no_factors = Table::parse("s_x.txt", "Sample Name\ns1\n", false).unwrap();
        assert!(validate_study_groups(&no_factors, &study).is_empty());
    }
}
