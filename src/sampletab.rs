//! SampleTab adapter
//!
//! A SampleTab file has two sections. `[MSI]` holds submission metadata
//! as `<Label>\t<values>` rows; `[SCD]` is a sample table with one row
//! per biological sample. Rows without `Derived From` become sources, the
//! others samples collected from the row they derive from. The result is
//! an investigation with a single study.

use std::collections::HashMap;
use std::path::Path;

use crate::error::IsaError;
use crate::isatab::investigation::Section;
use crate::isatab::table::{read_utf8, split_line, unquote};
use crate::isatab::Table;
use crate::labels::{bracketed, RX_CHARACTERISTICS, TERM_SOURCE_REF, UNIT};
use crate::model::{
    Characteristic, Comment, FactorValue, IdKind, Investigation, Measured, NodeRef, OntologyAnnotation,
    OntologySource, Person, Process, Protocol, Sample, Source, Study, StudyFactor, Unit, Value,
};

pub const MSI: &str = "[MSI]";
pub const SCD: &str = "[SCD]";

const SAMPLE_NAME: &str = "Sample Name";
const SAMPLE_ACCESSION: &str = "Sample Accession";
const SAMPLE_DESCRIPTION: &str = "Sample Description";
const DERIVED_FROM: &str = "Derived From";
const CHILD_OF: &str = "Child Of";
const GROUP_NAME: &str = "Group Name";
const GROUP_ACCESSION: &str = "Group Accession";
const TERM_SOURCE_ID: &str = "Term Source ID";
const SAMPLE_COLLECTION: &str = "sample collection";

const SUBMISSION_LABELS: [&str; 7] = [
    "Submission Title",
    "Submission Identifier",
    "Submission Description",
    "Submission Version",
    "Submission Reference Layer",
    "Submission Release Date",
    "Submission Update Date",
];
const SUBMISSION_COMMENTS: [&str; 3] = ["Submission Version", "Submission Reference Layer", "Submission Update Date"];
const ORGANIZATION_LABELS: [&str; 5] = [
    "Organization Name",
    "Organization Address",
    "Organization URI",
    "Organization Email",
    "Organization Role",
];
const PERSON_LABELS: [&str; 5] = [
    "Person Last Name",
    "Person Initials",
    "Person First Name",
    "Person Email",
    "Person Role",
];
const TERM_SOURCE_LABELS: [&str; 3] = ["Term Source Name", "Term Source URI", "Term Source Version"];

/// Characteristics the SCD table carries in dedicated columns
const RESERVED_CATEGORIES: [&str; 5] = [SAMPLE_ACCESSION, SAMPLE_DESCRIPTION, DERIVED_FROM, GROUP_NAME, GROUP_ACCESSION];

// ─────────────────────────────────────────────────────────────
// Reading
// ─────────────────────────────────────────────────────────────

/// Split SampleTab text into the MSI rows and the SCD table
fn split_sections(text: &str) -> Result<(Section, Table), IsaError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut msi: Option<Section> = None;
    let mut scd: Option<Vec<&str>> = None;
    for line in text.lines() {
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        match unquote(line.trim()) {
            MSI => {
                msi = Some(Section::new(MSI));
                continue;
            }
            SCD => {
                scd = Some(Vec::new());
                continue;
            }
            _ => {}
        }
        if let Some(lines) = scd.as_mut() {
            lines.push(line);
        } else if let Some(section) = msi.as_mut() {
            let mut cells = split_line(line, false).into_iter();
            let label = cells.next().unwrap_or_default();
            section.push(label.trim(), cells.collect());
        }
    }
    let msi = msi.ok_or_else(|| IsaError::SampleTabSection { section: MSI.to_string() })?;
    let scd = scd.ok_or_else(|| IsaError::SampleTabSection { section: SCD.to_string() })?;
    let table = Table::parse(SCD, &scd.join("\n"), false)?;
    Ok((msi, table))
}

/// Number of entries of a label block, trailing empty columns ignored
fn block_count(section: &Section, labels: &[&str]) -> usize {
    labels
        .iter()
        .filter_map(|label| section.row(label))
        .filter_map(|row| row.values.iter().rposition(|v| !v.trim().is_empty()))
        .map(|last| last + 1)
        .max()
        .unwrap_or(0)
}

fn read_msi(msi: &Section, investigation: &mut Investigation) {
    for i in 0..block_count(msi, &TERM_SOURCE_LABELS) {
        let mut source = OntologySource::new(msi.value("Term Source Name", i));
        source.file = msi.value("Term Source URI", i).to_string();
        source.version = msi.value("Term Source Version", i).to_string();
        source.description = source.name.clone();
        investigation.ontology_source_references.push(source);
    }

    investigation.identifier = msi.value("Submission Identifier", 0).to_string();
    investigation.title = msi.value("Submission Title", 0).to_string();
    investigation.description = msi.value("Submission Description", 0).to_string();
    investigation.submission_date = msi.value("Submission Release Date", 0).to_string();
    for label in SUBMISSION_COMMENTS {
        let value = msi.value(label, 0);
        if !value.is_empty() {
            investigation.comments.push(Comment::new(label, value));
        }
    }

    for i in 0..block_count(msi, &PERSON_LABELS) {
        let mut person = Person {
            last_name: msi.value("Person Last Name", i).to_string(),
            first_name: msi.value("Person First Name", i).to_string(),
            mid_initials: msi.value("Person Initials", i).to_string(),
            email: msi.value("Person Email", i).to_string(),
            ..Default::default()
        };
        let role = msi.value("Person Role", i);
        if !role.is_empty() {
            person.roles.push(OntologyAnnotation::new(role));
        }
        investigation.contacts.push(person);
    }

    for i in 0..block_count(msi, &ORGANIZATION_LABELS) {
        for label in ORGANIZATION_LABELS {
            investigation
                .comments
                .push(Comment::new(format!("{}.{}", label, i + 1), msi.value(label, i)));
        }
    }
}

/// Per-study category and unit interning
#[derive(Default)]
struct Categories {
    categories: Vec<OntologyAnnotation>,
    units: Vec<OntologyAnnotation>,
}

impl Categories {
    fn category(&mut self, term: &str) -> OntologyAnnotation {
        if let Some(c) = self.categories.iter().find(|c| c.term == term) {
            return c.clone();
        }
        let c = OntologyAnnotation::with_kind(term, IdKind::CharacteristicCategory);
        self.categories.push(c.clone());
        c
    }

    fn unit(&mut self, term: &str, source: &str, accession: &str) -> OntologyAnnotation {
        if let Some(u) = self.units.iter().find(|u| u.term == term) {
            return u.clone();
        }
        let mut u = OntologyAnnotation::with_kind(term, IdKind::Unit);
        u.term_source = source.to_string();
        u.term_accession = accession.to_string();
        self.units.push(u.clone());
        u
    }

    fn text(&mut self, term: &str, value: &str) -> Characteristic {
        Characteristic::new(self.category(term), Value::from(value))
    }
}

/// Value of a `Characteristic[...]` column and the qualifiers after it
fn characteristic_value(
    table: &Table,
    row: usize,
    col: usize,
    categories: &mut Categories,
) -> Option<(Value, Option<Unit>)> {
    let cell = table.cell(row, col).trim();
    if cell.is_empty() {
        return None;
    }
    let label = |offset: usize| table.header.get(col + offset).map(|h| h.trim()).unwrap_or("");
    let qualifier = |offset: usize| table.cell(row, col + offset).trim();

    if label(1) == TERM_SOURCE_REF && label(2) == TERM_SOURCE_ID {
        let term = OntologyAnnotation::sourced(cell, qualifier(1), qualifier(2));
        return Some((Value::Term(term), None));
    }
    if label(1) == UNIT {
        let unit_term = qualifier(1);
        if unit_term.is_empty() {
            return Some((Value::parse_number(cell), None));
        }
        let unit = if label(2) == TERM_SOURCE_REF && label(3) == TERM_SOURCE_ID {
            Unit::Term(categories.unit(unit_term, qualifier(2), qualifier(3)))
        } else {
            Unit::Text(unit_term.to_string())
        };
        return Some((Value::parse_number(cell), Some(unit)));
    }
    Some((Value::from(cell), None))
}

enum Node {
    Source(Source),
    Sample(Sample),
}

impl Node {
    fn characteristics_mut(&mut self) -> &mut Vec<Characteristic> {
        match self {
            Node::Source(s) => &mut s.characteristics,
            Node::Sample(s) => &mut s.characteristics,
        }
    }

    fn node_ref(&self) -> NodeRef {
        match self {
            Node::Source(s) => NodeRef::Source(s.id.clone()),
            Node::Sample(s) => NodeRef::Sample(s.id.clone()),
        }
    }
}

fn read_scd(table: &Table, identifier: &str) -> Result<Study, IsaError> {
    let name_col = table.column(SAMPLE_NAME).ok_or_else(|| IsaError::MissingColumn {
        column: SAMPLE_NAME.to_string(),
        file: SCD.to_string(),
    })?;
    let col = |label: &str| table.column(label);
    let cell = |row: usize, label: &str| col(label).map(|c| table.cell(row, c).trim()).unwrap_or("");

    let mut study = Study::new(format!("s_{}.txt", identifier));
    study.identifier = identifier.to_string();
    let collection = Protocol::typed(SAMPLE_COLLECTION, SAMPLE_COLLECTION);
    let group_name = StudyFactor::new(GROUP_NAME);
    let group_accession = StudyFactor::new(GROUP_ACCESSION);
    let mut categories = Categories::default();

    // Nodes keyed by accession, name when the accession is empty
    let mut order: Vec<String> = Vec::new();
    let mut nodes: HashMap<String, (usize, Node)> = HashMap::new();
    for row in 0..table.rows.len() {
        let name = table.cell(row, name_col).trim();
        let accession = cell(row, SAMPLE_ACCESSION);
        let key = if accession.is_empty() { name } else { accession }.to_string();
        if key.is_empty() || nodes.contains_key(&key) {
            continue;
        }

        let derived_from = cell(row, DERIVED_FROM);
        let mut node = if derived_from.is_empty() {
            Node::Source(Source::new(name))
        } else {
            Node::Sample(Sample::new(name))
        };
        for label in [SAMPLE_ACCESSION, SAMPLE_DESCRIPTION, DERIVED_FROM, CHILD_OF] {
            let value = cell(row, label);
            if !value.is_empty() {
                let characteristic = categories.text(label, value);
                node.characteristics_mut().push(characteristic);
            }
        }
        for (label, factor) in [(GROUP_NAME, &group_name), (GROUP_ACCESSION, &group_accession)] {
            let value = cell(row, label);
            if value.is_empty() {
                continue;
            }
            match &mut node {
                Node::Sample(s) => s.factor_values.push(FactorValue::new(factor.id.clone(), Value::from(value))),
                Node::Source(s) => s.characteristics.push(categories.text(label, value)),
            }
        }
        for (c, header) in table.header.iter().enumerate() {
            let Some(term) = bracketed(&RX_CHARACTERISTICS, header.trim()) else {
                continue;
            };
            let Some((value, unit)) = characteristic_value(table, row, c, &mut categories) else {
                continue;
            };
            let mut characteristic = Characteristic::new(categories.category(term), value);
            characteristic.set_unit(unit)?;
            node.characteristics_mut().push(characteristic);
        }
        order.push(key.clone());
        nodes.insert(key, (row, node));
    }

    // One collection process per upstream node
    let mut processes: Vec<Process> = Vec::new();
    let mut process_of: HashMap<String, usize> = HashMap::new();
    let mut derives: Vec<(String, String)> = Vec::new();
    for key in &order {
        let Some((row, Node::Sample(_))) = nodes.get(key) else {
            continue;
        };
        let upstream = cell(*row, DERIVED_FROM).to_string();
        if !nodes.contains_key(&upstream) {
            tracing::warn!(sample = %key, derived_from = %upstream, "Derived From names no row of the SCD table");
            continue;
        }
        derives.push((key.clone(), upstream));
    }
    for (key, upstream) in derives {
        let upstream_ref = nodes[&upstream].1.node_ref();
        let upstream_id = upstream_ref.id().clone();
        let index = *process_of.entry(upstream.clone()).or_insert_with(|| {
            let mut process = Process::new(collection.id.clone());
            process.add_input(upstream_ref.clone());
            processes.push(process);
            processes.len() - 1
        });
        if let Some((_, Node::Sample(sample))) = nodes.get_mut(&key) {
            sample.derives_from.push(upstream_id);
            processes[index].add_output(NodeRef::Sample(sample.id.clone()));
        }
    }

    for key in order {
        match nodes.remove(&key) {
            Some((_, Node::Source(s))) => study.sources.push(s),
            Some((_, Node::Sample(s))) => study.samples.push(s),
            None => {}
        }
    }
    study.protocols.push(collection);
    study.factors = vec![group_name, group_accession];
    study.characteristic_categories = categories.categories;
    study.units = categories.units;
    study.process_sequence = processes;
    tracing::debug!(
        sources = study.sources.len(),
        samples = study.samples.len(),
        processes = study.process_sequence.len(),
        "read SCD table"
    );
    Ok(study)
}

/// Read an investigation from SampleTab text
pub fn loads(text: &str) -> Result<Investigation, IsaError> {
    let (msi, scd) = split_sections(text)?;
    let mut investigation = Investigation::new();
    read_msi(&msi, &mut investigation);
    let study = read_scd(&scd, &investigation.identifier)?;
    investigation.studies.push(study);
    Ok(investigation)
}

pub fn load(path: &Path) -> Result<Investigation, IsaError> {
    let investigation = loads(&read_utf8(path)?)?;
    tracing::info!(path = %path.display(), "loaded SampleTab");
    Ok(investigation)
}

// ─────────────────────────────────────────────────────────────
// Writing
// ─────────────────────────────────────────────────────────────

fn tsv_row(label: &str, values: &[String]) -> String {
    let mut cells = vec![label.to_string()];
    cells.extend(values.iter().cloned());
    while cells.len() > 1 && cells.last().is_some_and(|c| c.is_empty()) {
        cells.pop();
    }
    cells.join("\t")
}

fn render_msi(investigation: &Investigation) -> Vec<String> {
    let comment = |name: &str| {
        investigation
            .comments
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value.clone())
            .unwrap_or_default()
    };
    let submission = [
        investigation.title.clone(),
        investigation.identifier.clone(),
        investigation.description.clone(),
        comment("Submission Version"),
        comment("Submission Reference Layer"),
        investigation.submission_date.clone(),
        comment("Submission Update Date"),
    ];
    let mut lines = vec![MSI.to_string()];
    for (label, value) in SUBMISSION_LABELS.iter().zip(submission) {
        lines.push(tsv_row(label, &[value]));
    }

    for label in ORGANIZATION_LABELS {
        let values: Vec<String> = investigation
            .comments
            .iter()
            .filter(|c| c.name.starts_with(label))
            .map(|c| c.value.clone())
            .collect();
        lines.push(tsv_row(label, &values));
    }

    let people = &investigation.contacts;
    let person_values: [Vec<String>; 5] = [
        people.iter().map(|p| p.last_name.clone()).collect(),
        people.iter().map(|p| p.mid_initials.clone()).collect(),
        people.iter().map(|p| p.first_name.clone()).collect(),
        people.iter().map(|p| p.email.clone()).collect(),
        people
            .iter()
            .map(|p| match p.roles.as_slice() {
                [role] => role.term.clone(),
                _ => String::new(),
            })
            .collect(),
    ];
    for (label, values) in PERSON_LABELS.iter().zip(person_values) {
        lines.push(tsv_row(label, &values));
    }

    let sources = &investigation.ontology_source_references;
    let source_values: [Vec<String>; 3] = [
        sources.iter().map(|s| s.name.clone()).collect(),
        sources.iter().map(|s| s.file.clone()).collect(),
        sources.iter().map(|s| s.version.clone()).collect(),
    ];
    for (label, values) in TERM_SOURCE_LABELS.iter().zip(source_values) {
        lines.push(tsv_row(label, &values));
    }
    lines
}

/// Column layout of one characteristic category in the SCD table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Plain,
    Term,
    Unit,
    UnitTerm,
}

impl Shape {
    fn of(characteristic: &Characteristic) -> Self {
        match (characteristic.value(), characteristic.unit()) {
            (Value::Term(_), _) => Shape::Term,
            (_, Some(Unit::Term(_))) => Shape::UnitTerm,
            (_, Some(Unit::Text(_))) => Shape::Unit,
            _ => Shape::Plain,
        }
    }

    fn qualifiers(&self) -> &'static [&'static str] {
        match self {
            Shape::Plain => &[],
            Shape::Term => &[TERM_SOURCE_REF, TERM_SOURCE_ID],
            Shape::Unit => &[UNIT],
            Shape::UnitTerm => &[UNIT, TERM_SOURCE_REF, TERM_SOURCE_ID],
        }
    }

    fn cells(&self, characteristic: &Characteristic) -> Vec<String> {
        let value = characteristic.value();
        let mut cells = vec![value.cell()];
        match (self, value, characteristic.unit()) {
            (Shape::Term, Value::Term(term), _) => {
                cells.push(term.term_source.clone());
                cells.push(term.term_accession.clone());
            }
            (Shape::Unit, _, Some(unit)) => cells.push(unit.term().to_string()),
            (Shape::UnitTerm, _, Some(Unit::Term(unit))) => {
                cells.push(unit.term.clone());
                cells.push(unit.term_source.clone());
                cells.push(unit.term_accession.clone());
            }
            (Shape::UnitTerm, _, Some(Unit::Text(unit))) => cells.push(unit.clone()),
            _ => {}
        }
        cells
    }
}

/// Borrowed SCD row source
struct ScdNode<'a> {
    study: &'a Study,
    name: &'a str,
    characteristics: &'a [Characteristic],
    sample: Option<&'a Sample>,
}

impl<'a> ScdNode<'a> {
    fn characteristic(&self, term: &str) -> String {
        self.characteristics
            .iter()
            .find(|c| c.category.term == term)
            .map(|c| c.value().cell())
            .unwrap_or_default()
    }

    fn group(&self, term: &str) -> String {
        match self.sample {
            Some(sample) => sample
                .factor_values
                .iter()
                .find(|fv| self.study.factor(&fv.factor).is_some_and(|f| f.name == term))
                .map(|fv| fv.value().cell())
                .unwrap_or_default(),
            None => self.characteristic(term),
        }
    }

    fn derived_from(&self) -> String {
        let Some(upstream) = self.sample.and_then(|s| s.derives_from.first()) else {
            return String::new();
        };
        let study = self.study;
        let (name, characteristics) = if let Some(source) = study.sources.iter().find(|s| &s.id == upstream) {
            (source.name.as_str(), source.characteristics.as_slice())
        } else if let Some(sample) = study.samples.iter().find(|s| &s.id == upstream) {
            (sample.name.as_str(), sample.characteristics.as_slice())
        } else {
            return String::new();
        };
        match characteristics.iter().find(|c| c.category.term == SAMPLE_ACCESSION) {
            Some(c) => c.value().cell(),
            None => {
                tracing::warn!(name, "no Sample Accession, Derived From uses the sample name");
                name.to_string()
            }
        }
    }
}

fn render_scd(investigation: &Investigation) -> Table {
    let nodes: Vec<ScdNode> = investigation
        .studies
        .iter()
        .flat_map(|study| {
            let sources = study.sources.iter().map(move |s| ScdNode {
                study,
                name: &s.name,
                characteristics: &s.characteristics,
                sample: None,
            });
            let samples = study.samples.iter().map(move |s| ScdNode {
                study,
                name: &s.name,
                characteristics: &s.characteristics,
                sample: Some(s),
            });
            sources.chain(samples)
        })
        .collect();

    let mut header: Vec<String> = [SAMPLE_NAME, SAMPLE_ACCESSION, SAMPLE_DESCRIPTION, DERIVED_FROM, GROUP_NAME, GROUP_ACCESSION]
        .iter()
        .map(|h| h.to_string())
        .collect();
    let mut layout: HashMap<String, (usize, Shape)> = HashMap::new();
    for node in &nodes {
        for c in node.characteristics {
            let term = c.category.term.as_str();
            if RESERVED_CATEGORIES.contains(&term) || layout.contains_key(term) {
                continue;
            }
            let shape = Shape::of(c);
            layout.insert(term.to_string(), (header.len(), shape));
            header.push(format!("Characteristic[{}]", term));
            header.extend(shape.qualifiers().iter().map(|q| q.to_string()));
        }
    }

    let mut table = Table::new(SCD, header);
    for node in &nodes {
        let mut row = vec![String::new(); table.width()];
        row[0] = node.name.to_string();
        row[1] = node.characteristic(SAMPLE_ACCESSION);
        row[2] = node.characteristic(SAMPLE_DESCRIPTION);
        row[3] = node.derived_from();
        row[4] = node.group(GROUP_NAME);
        row[5] = node.group(GROUP_ACCESSION);
        for c in node.characteristics {
            let Some(&(start, shape)) = layout.get(c.category.term.as_str()) else {
                continue;
            };
            let width = 1 + shape.qualifiers().len();
            for (offset, cell) in shape.cells(c).into_iter().take(width).enumerate() {
                row[start + offset] = cell;
            }
        }
        table.rows.push(row);
    }
    table
}

/// Render an investigation as SampleTab text
pub fn dumps(investigation: &Investigation) -> String {
    let mut out = render_msi(investigation).join("\n");
    out.push('\n');
    out.push_str(SCD);
    out.push('\n');
    out.push_str(&render_scd(investigation).to_tsv(false));
    out
}

pub fn dump(investigation: &Investigation, path: &Path) -> Result<(), IsaError> {
    std::fs::write(path, dumps(investigation))?;
    tracing::info!(path = %path.display(), "wrote SampleTab");
    Ok(())
}
