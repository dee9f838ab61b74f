//! Process-sequence reconstruction from study and assay tables
//!
//! Each table row is walked left to right over its column groups, giving
//! a chain material -> process -> material (-> process -> data file).
//! Nodes and processes are shared between rows by key, so splits and
//! pools come out as processes with several outputs or inputs.

use std::collections::{HashMap, HashSet};

use super::columns::{group_columns, ColumnGroup, ColumnKind};
use super::table::Table;
use crate::error::IsaError;
use crate::errors::{Code, Finding, ValidationReport};
use crate::labels::SAMPLE_NAME;
use crate::model::{
    plink, Characteristic, Comment, DataFile, FactorValue, Id, IdKind, Material, Measured, NodeRef,
    OntologyAnnotation, ParameterValue, Process, Protocol, Sample, Source, StudyFactor, Unit, Value,
};

pub const UNKNOWN_PROTOCOL: &str = "unknown protocol";
pub const UNKNOWN_PROTOCOL_DESCRIPTION: &str =
    "This protocol was auto-generated where a protocol could not be determined.";

/// Protocol REF value assumed before an assay-name column that lacks one
const IMPLICIT_PROTOCOL_REF: &str = "unknown";

const SEP: char = '\u{1f}';

/// Study-level declarations a table is resolved against
///
/// Unknown protocols, new characteristic categories and units are added
/// to the study while reading.
pub struct Catalog<'a> {
    pub protocols: &'a mut Vec<Protocol>,
    pub factors: &'a [StudyFactor],
    /// Study samples; set when reading an assay table
    pub study_samples: Option<&'a [Sample]>,
    pub categories: &'a mut Vec<OntologyAnnotation>,
    pub units: &'a mut Vec<OntologyAnnotation>,
}

impl Catalog<'_> {
    fn category(&mut self, term: &str) -> OntologyAnnotation {
        if let Some(found) = self.categories.iter().find(|c| c.term == term) {
            return found.clone();
        }
        let category = OntologyAnnotation::with_kind(term, IdKind::CharacteristicCategory);
        self.categories.push(category.clone());
        category
    }

    fn unit(&mut self, unit: OntologyAnnotation) -> OntologyAnnotation {
        if let Some(found) = self.units.iter().find(|u| **u == unit) {
            return found.clone();
        }
        let mut unit = unit;
        unit.id = Id::mint(IdKind::Unit);
        self.units.push(unit.clone());
        unit
    }

    fn unknown_protocol(&mut self) -> Id {
        if let Some(p) = self.protocols.iter().find(|p| p.name == UNKNOWN_PROTOCOL) {
            return p.id.clone();
        }
        let mut protocol = Protocol::new(UNKNOWN_PROTOCOL);
        protocol.description = UNKNOWN_PROTOCOL_DESCRIPTION.to_string();
        let id = protocol.id.clone();
        self.protocols.push(protocol);
        id
    }
}

/// Entities recovered from one table
#[derive(Debug, Default)]
pub struct TableGraph {
    pub sources: Vec<Source>,
    pub samples: Vec<Sample>,
    pub materials: Vec<Material>,
    pub data_files: Vec<DataFile>,
    pub processes: Vec<Process>,
    /// Characteristic categories used by this table
    pub categories: Vec<OntologyAnnotation>,
    pub units: Vec<OntologyAnnotation>,
}

impl TableGraph {
    fn note_category(&mut self, category: &OntologyAnnotation) {
        if !self.categories.iter().any(|c| c.id == category.id) {
            self.categories.push(category.clone());
        }
    }

    fn note_unit(&mut self, unit: &OntologyAnnotation) {
        if !self.units.iter().any(|u| u.id == unit.id) {
            self.units.push(unit.clone());
        }
    }
}

#[derive(Debug)]
enum Step {
    Node {
        group: usize,
        attributes: Vec<usize>,
        comments: Vec<usize>,
    },
    Process {
        protocol: Option<usize>,
        name: Option<usize>,
        array_design: Option<usize>,
        parameters: Vec<usize>,
        comments: Vec<usize>,
    },
}

#[derive(Debug)]
struct Plan {
    groups: Vec<ColumnGroup>,
    steps: Vec<Step>,
    /// Process steps keyed by their output node rather than their input
    keyed_by_output: HashSet<usize>,
}

fn orphan(report: &mut ValidationReport, file: &str, group: &ColumnGroup, expected: &str) {
    report.add(Finding::new(
        Code::UnrecognisedHeading,
        format!("'{}' in {} does not follow {}", group.label, file, expected),
    ));
}

impl Plan {
    fn new(table: &Table, report: &mut ValidationReport) -> Self {
        let file = table.name.as_str();
        let groups = group_columns(&table.header, file, report);
        let mut steps: Vec<Step> = Vec::new();
        for (i, g) in groups.iter().enumerate() {
            match &g.kind {
                k if k.is_node() => steps.push(Step::Node {
                    group: i,
                    attributes: Vec::new(),
                    comments: Vec::new(),
                }),
                ColumnKind::ProtocolRef => steps.push(Step::Process {
                    protocol: Some(i),
                    name: None,
                    array_design: None,
                    parameters: Vec::new(),
                    comments: Vec::new(),
                }),
                ColumnKind::ProcessName => match steps.last_mut() {
                    Some(Step::Process { name, .. }) if name.is_none() => *name = Some(i),
                    _ => steps.push(Step::Process {
                        protocol: None,
                        name: Some(i),
                        array_design: None,
                        parameters: Vec::new(),
                        comments: Vec::new(),
                    }),
                },
                ColumnKind::ArrayDesignRef => match steps.last_mut() {
                    Some(Step::Process { array_design, .. }) => *array_design = Some(i),
                    _ => orphan(report, file, g, "a process column"),
                },
                ColumnKind::ParameterValue(_) => match steps.last_mut() {
                    Some(Step::Process { parameters, .. }) => parameters.push(i),
                    _ => orphan(report, file, g, "a Protocol REF"),
                },
                ColumnKind::Characteristic(_) | ColumnKind::FactorValue(_) => match steps.last_mut() {
                    Some(Step::Node { attributes, .. }) => attributes.push(i),
                    _ => orphan(report, file, g, "a material column"),
                },
                ColumnKind::Comment(_) => match steps.last_mut() {
                    Some(Step::Node { comments, .. }) | Some(Step::Process { comments, .. }) => comments.push(i),
                    None => orphan(report, file, g, "a node or process column"),
                },
                _ => {}
            }
        }
        let mut plan = Self {
            groups,
            steps,
            keyed_by_output: HashSet::new(),
        };
        plan.keyed_by_output = plan.pooling_steps(table);
        plan
    }

    fn node_group(&self, step: usize) -> Option<&ColumnGroup> {
        match self.steps.get(step)? {
            Step::Node { group, .. } => self.groups.get(*group),
            Step::Process { .. } => None,
        }
    }

    fn protocol_cell<'t>(&self, table: &'t Table, step: usize, row: usize) -> &'t str {
        match self.steps.get(step) {
            Some(Step::Process {
                protocol: Some(g), ..
            }) => table.cell(row, self.groups[*g].index).trim(),
            _ => IMPLICIT_PROTOCOL_REF,
        }
    }

    /// A process is keyed by its output when it sees more distinct inputs
    /// than outputs (a pool)
    fn pooling_steps(&self, table: &Table) -> HashSet<usize> {
        let mut pooled = HashSet::new();
        for (s, step) in self.steps.iter().enumerate() {
            if !matches!(step, Step::Process { .. }) {
                continue;
            }
            let input = s.checked_sub(1).and_then(|i| self.node_group(i));
            let output = self.node_group(s + 1);
            let distinct = |g: Option<&ColumnGroup>| -> usize {
                let Some(g) = g else { return 0 };
                (0..table.rows.len())
                    .map(|r| (self.protocol_cell(table, s, r), table.cell(r, g.index)))
                    .collect::<HashSet<_>>()
                    .len()
            };
            let (inputs, outputs) = (distinct(input), distinct(output));
            if input.is_none() || inputs > outputs {
                pooled.insert(s);
            }
        }
        pooled
    }
}

enum Item {
    Node(NodeRef),
    Process(usize),
}

struct TableReader<'p, 'c, 'a> {
    table: &'p Table,
    plan: &'p Plan,
    catalog: &'c mut Catalog<'a>,
    graph: TableGraph,
    node_keys: HashMap<String, NodeRef>,
    positions: HashMap<Id, usize>,
    process_keys: HashMap<String, usize>,
    missing_protocols: HashSet<String>,
    missing_parameters: HashSet<(String, String)>,
    missing_factors: HashSet<String>,
    missing_samples: Vec<String>,
}

impl<'p, 'c, 'a> TableReader<'p, 'c, 'a> {
    fn value(&mut self, group: &ColumnGroup, row: usize) -> Option<(Value, Option<Unit>)> {
        let table = self.table;
        let cell = table.cell(row, group.index).trim();
        if cell.is_empty() {
            return None;
        }
        let text = |i: Option<usize>| i.map(|i| table.cell(row, i).trim().to_string()).unwrap_or_default();

        if let Some(u) = group.unit {
            let unit_cell = table.cell(row, u).trim();
            if !unit_cell.is_empty() {
                let unit = if group.unit_term.is_present() {
                    let oa = OntologyAnnotation::sourced(
                        unit_cell,
                        text(group.unit_term.term_source),
                        text(group.unit_term.term_accession),
                    );
                    let unit = self.catalog.unit(oa);
                    self.graph.note_unit(&unit);
                    Unit::Term(unit)
                } else {
                    Unit::Text(unit_cell.to_string())
                };
                return Some((Value::parse_number(cell), Some(unit)));
            }
        }
        if group.term.is_present() {
            let oa = OntologyAnnotation::sourced(cell, text(group.term.term_source), text(group.term.term_accession));
            return Some((Value::Term(oa), None));
        }
        Some((Value::Text(cell.to_string()), None))
    }

    fn characteristics(&mut self, attributes: &[usize], row: usize) -> Result<Vec<Characteristic>, IsaError> {
        let plan = self.plan;
        let mut out: Vec<Characteristic> = Vec::new();
        for &a in attributes {
            let group = &plan.groups[a];
            let ColumnKind::Characteristic(term) = &group.kind else {
                continue;
            };
            if out.iter().any(|c| &c.category.term == term) {
                tracing::warn!(category = %term, "duplicate characteristic column, keeping the first");
                continue;
            }
            let Some((value, unit)) = self.value(group, row) else {
                continue;
            };
            let category = self.catalog.category(term);
            self.graph.note_category(&category);
            let mut characteristic = Characteristic::new(category, value);
            characteristic.set_unit(unit)?;
            out.push(characteristic);
        }
        Ok(out)
    }

    fn factor_values(
        &mut self,
        attributes: &[usize],
        row: usize,
        report: &mut ValidationReport,
    ) -> Result<Vec<FactorValue>, IsaError> {
        let plan = self.plan;
        let factors = self.catalog.factors;
        let mut out = Vec::new();
        for &a in attributes {
            let group = &plan.groups[a];
            let ColumnKind::FactorValue(name) = &group.kind else {
                continue;
            };
            let Some((value, unit)) = self.value(group, row) else {
                continue;
            };
            let Some(factor) = factors.iter().find(|f| &f.name == name) else {
                if self.missing_factors.insert(name.clone()) {
                    report.add(Finding::new(
                        Code::FactorRef,
                        format!("Factor Value[{}] in {} names no study factor", name, self.table.name),
                    ));
                }
                continue;
            };
            let mut fv = FactorValue::new(factor.id.clone(), value);
            fv.set_unit(unit)?;
            out.push(fv);
        }
        Ok(out)
    }

    fn comments(&self, groups: &[usize], row: usize) -> Vec<Comment> {
        groups
            .iter()
            .filter_map(|&g| {
                let group = &self.plan.groups[g];
                let ColumnKind::Comment(name) = &group.kind else {
                    return None;
                };
                let value = self.table.cell(row, group.index).trim();
                (!value.is_empty()).then(|| Comment::new(name.clone(), value))
            })
            .collect()
    }

    /// Cells identifying a node beyond its name
    fn signature(&self, attributes: &[usize], row: usize) -> String {
        let mut cells = Vec::new();
        for &a in attributes {
            for pos in self.plan.groups[a].positions() {
                cells.push(self.table.cell(row, pos).trim());
            }
        }
        cells.join(&SEP.to_string())
    }

    fn register(&mut self, key: String, node: NodeRef, position: usize) -> NodeRef {
        self.positions.insert(node.id().clone(), position);
        self.node_keys.insert(key, node.clone());
        node
    }

    fn assay_sample(&mut self, name: &str) -> NodeRef {
        let key = format!("{}{}{}", SAMPLE_NAME, SEP, name);
        if let Some(node) = self.node_keys.get(&key) {
            return node.clone();
        }
        let known = self
            .catalog
            .study_samples
            .and_then(|samples| samples.iter().find(|s| s.name == name));
        let sample = match known {
            Some(s) => s.clone(),
            None => {
                self.missing_samples.push(name.to_string());
                Sample::new(name)
            }
        };
        let node = NodeRef::Sample(sample.id.clone());
        self.graph.samples.push(sample);
        let position = self.graph.samples.len() - 1;
        self.register(key, node, position)
    }

    fn node(&mut self, step: usize, row: usize, report: &mut ValidationReport) -> Result<Option<NodeRef>, IsaError> {
        let plan = self.plan;
        let Step::Node {
            group,
            attributes,
            comments,
        } = &plan.steps[step]
        else {
            return Ok(None);
        };
        let group = &plan.groups[*group];
        let name = self.table.cell(row, group.index).trim();
        if name.is_empty() {
            return Ok(None);
        }
        if group.kind == ColumnKind::Sample && self.catalog.study_samples.is_some() {
            return Ok(Some(self.assay_sample(name)));
        }

        let key = match group.kind {
            ColumnKind::DataFile(_) => format!("{}{}{}", group.label, SEP, name),
            _ => format!("{}{}{}{}{}", group.label, SEP, name, SEP, self.signature(attributes, row)),
        };
        if let Some(node) = self.node_keys.get(&key) {
            return Ok(Some(node.clone()));
        }

        let comments = self.comments(comments, row);
        let (node, position) = match &group.kind {
            ColumnKind::Source => {
                let mut source = Source::new(name);
                source.characteristics = self.characteristics(attributes, row)?;
                source.comments = comments;
                let node = NodeRef::Source(source.id.clone());
                self.graph.sources.push(source);
                (node, self.graph.sources.len() - 1)
            }
            ColumnKind::Sample => {
                let mut sample = Sample::new(name);
                sample.characteristics = self.characteristics(attributes, row)?;
                sample.factor_values = self.factor_values(attributes, row, report)?;
                sample.comments = comments;
                let node = NodeRef::Sample(sample.id.clone());
                self.graph.samples.push(sample);
                (node, self.graph.samples.len() - 1)
            }
            ColumnKind::Material(material_type) => {
                let mut material = Material::new(name, *material_type);
                material.characteristics = self.characteristics(attributes, row)?;
                material.comments = comments;
                let node = NodeRef::Material(material.id.clone());
                self.graph.materials.push(material);
                (node, self.graph.materials.len() - 1)
            }
            ColumnKind::DataFile(kind) => {
                let mut data_file = DataFile::new(name, *kind);
                data_file.comments = comments;
                let node = NodeRef::DataFile(data_file.id.clone());
                self.graph.data_files.push(data_file);
                (node, self.graph.data_files.len() - 1)
            }
            _ => return Ok(None),
        };
        Ok(Some(self.register(key, node, position)))
    }

    fn resolve_protocol(&mut self, name: &str, report: &mut ValidationReport) -> Id {
        if let Some(p) = self.catalog.protocols.iter().find(|p| p.name == name) {
            return p.id.clone();
        }
        if self.missing_protocols.insert(name.to_string()) {
            report.add(Finding::new(
                Code::ProtocolRef,
                format!("Protocol REF '{}' in {} is not declared in the investigation file", name, self.table.name),
            ));
        }
        self.catalog.unknown_protocol()
    }

    fn neighbour_cell(&self, step: Option<usize>, row: usize) -> &'p str {
        step.and_then(|s| self.plan.node_group(s))
            .map(|g| self.table.cell(row, g.index).trim())
            .unwrap_or("")
    }

    fn process_key(&self, step: usize, row: usize, protocol: &str, name_group: Option<&ColumnGroup>) -> String {
        if let Some(g) = name_group {
            let name = self.table.cell(row, g.index).trim();
            if !name.is_empty() {
                return format!("{}{}{}", g.label, SEP, name);
            }
        }
        let node = if self.plan.keyed_by_output.contains(&step) {
            self.neighbour_cell(Some(step + 1), row)
        } else {
            self.neighbour_cell(step.checked_sub(1), row)
        };
        let mut parts = vec![step.to_string(), protocol.to_string(), node.to_string()];
        if let Step::Process {
            protocol: Some(p),
            parameters,
            ..
        } = &self.plan.steps[step]
        {
            let values: Vec<&str> = parameters
                .iter()
                .map(|&g| self.table.cell(row, self.plan.groups[g].index).trim())
                .collect();
            parts.push(values.join("/"));
            let group = &self.plan.groups[*p];
            for q in [group.date, group.performer].into_iter().flatten() {
                parts.push(self.table.cell(row, q).trim().to_string());
            }
        }
        parts.join(&SEP.to_string())
    }

    fn process(&mut self, step: usize, row: usize, report: &mut ValidationReport) -> Result<Option<usize>, IsaError> {
        let plan = self.plan;
        let table = self.table;
        let Step::Process {
            protocol,
            name,
            array_design,
            parameters,
            comments,
        } = &plan.steps[step]
        else {
            return Ok(None);
        };
        let name_group = name.map(|g| &plan.groups[g]);
        let name_cell = name_group.map(|g| table.cell(row, g.index).trim()).unwrap_or("");
        let mut protocol_cell = plan.protocol_cell(table, step, row);
        if protocol_cell.is_empty() {
            if name_cell.is_empty() {
                return Ok(None);
            }
            protocol_cell = IMPLICIT_PROTOCOL_REF;
        }

        let key = self.process_key(step, row, protocol_cell, name_group);
        if let Some(&p) = self.process_keys.get(&key) {
            return Ok(Some(p));
        }

        let protocol_id = self.resolve_protocol(protocol_cell, report);
        let mut process = Process::new(protocol_id.clone());
        process.name = name_cell.to_string();
        if let Some(g) = protocol.map(|g| &plan.groups[g]) {
            let cell = |i: Option<usize>| {
                i.map(|i| table.cell(row, i).trim())
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
            };
            process.performer = cell(g.performer);
            process.date = cell(g.date);
        }
        if let Some(g) = array_design.map(|g| &plan.groups[g]) {
            let cell = table.cell(row, g.index).trim();
            if !cell.is_empty() {
                process.array_design_ref = Some(cell.to_string());
            }
        }

        for &pg in parameters {
            let group = &plan.groups[pg];
            let ColumnKind::ParameterValue(parameter_name) = &group.kind else {
                continue;
            };
            let Some((value, unit)) = self.value(group, row) else {
                continue;
            };
            let declared = self
                .catalog
                .protocols
                .iter()
                .find(|p| p.id == protocol_id)
                .and_then(|p| p.parameter_by_name(parameter_name))
                .map(|p| p.id.clone());
            let Some(parameter_id) = declared else {
                let missing = (protocol_cell.to_string(), parameter_name.clone());
                if self.missing_parameters.insert(missing) {
                    report.add(Finding::new(
                        Code::ParameterRef,
                        format!(
                            "Parameter Value[{}] in {} is not a parameter of protocol '{}'",
                            parameter_name, table.name, protocol_cell
                        ),
                    ));
                }
                continue;
            };
            let mut pv = ParameterValue::new(parameter_id, value);
            pv.set_unit(unit)?;
            process.parameter_values.push(pv);
        }
        process.comments = self.comments(comments, row);

        let index = self.graph.processes.len();
        self.graph.processes.push(process);
        self.process_keys.insert(key, index);
        Ok(Some(index))
    }

    fn derive(&mut self, node: &NodeRef, upstream: &Id) {
        let Some(&i) = self.positions.get(node.id()) else {
            return;
        };
        let list = match node {
            NodeRef::Sample(_) => &mut self.graph.samples[i].derives_from,
            NodeRef::Material(_) => &mut self.graph.materials[i].derives_from,
            NodeRef::DataFile(_) => &mut self.graph.data_files[i].generated_from,
            NodeRef::Source(_) => return,
        };
        if !list.contains(upstream) {
            list.push(upstream.clone());
        }
    }

    fn read_row(&mut self, row: usize, report: &mut ValidationReport) -> Result<(), IsaError> {
        let mut items: Vec<Option<Item>> = Vec::with_capacity(self.plan.steps.len());
        let mut last_source: Option<Id> = None;
        let mut last_sample: Option<Id> = None;
        let mut last_material: Option<Id> = None;
        let in_assay = self.catalog.study_samples.is_some();

        for step in 0..self.plan.steps.len() {
            let item = match self.plan.steps[step] {
                Step::Node { .. } => self.node(step, row, report)?.map(Item::Node),
                Step::Process { .. } => self.process(step, row, report)?.map(Item::Process),
            };
            if let Some(Item::Node(node)) = &item {
                match node {
                    NodeRef::Source(id) => last_source = Some(id.clone()),
                    NodeRef::Sample(id) => {
                        if let (Some(source), false) = (&last_source, in_assay) {
                            self.derive(node, source);
                        }
                        last_sample = Some(id.clone());
                    }
                    NodeRef::Material(id) => {
                        if let Some(upstream) = last_material.as_ref().or(last_sample.as_ref()) {
                            self.derive(node, upstream);
                        }
                        last_material = Some(id.clone());
                    }
                    NodeRef::DataFile(_) => {
                        if let Some(sample) = &last_sample {
                            self.derive(node, sample);
                        }
                    }
                }
            }
            items.push(item);
        }

        for (k, item) in items.iter().enumerate() {
            let Some(Item::Process(p)) = item else {
                continue;
            };
            if let Some(Some(Item::Node(input))) = k.checked_sub(1).map(|i| &items[i]) {
                self.graph.processes[*p].add_input(input.clone());
            }
            // a run of data files right after a process are all its outputs
            for (j, next) in items.iter().skip(k + 1).enumerate() {
                let Some(Item::Node(output)) = next else {
                    break;
                };
                if j > 0 && !output.is_data_file() {
                    break;
                }
                self.graph.processes[*p].add_output(output.clone());
                if !output.is_data_file() {
                    break;
                }
            }
        }

        let chain: Vec<usize> = items
            .iter()
            .filter_map(|i| match i {
                Some(Item::Process(p)) => Some(*p),
                _ => None,
            })
            .collect();
        // a split shares its upstream process between rows; the first row
        // that reaches a free pair of slots owns the link
        for pair in chain.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let processes = &self.graph.processes;
            if a == b || processes[a].next_process.is_some() || processes[b].prev_process.is_some() {
                continue;
            }
            let (left, right) = if a < b {
                let (l, r) = self.graph.processes.split_at_mut(b);
                (&mut l[a], &mut r[0])
            } else {
                let (l, r) = self.graph.processes.split_at_mut(a);
                (&mut r[0], &mut l[b])
            };
            plink(left, right);
        }
        Ok(())
    }
}

/// Rebuild the entities and process sequence encoded in one table
///
/// A table without a `Sample Name` column is a fatal error; every other
/// inconsistency becomes a finding in `report`.
pub fn read_table(
    table: &Table,
    catalog: &mut Catalog<'_>,
    report: &mut ValidationReport,
) -> Result<TableGraph, IsaError> {
    let plan = Plan::new(table, report);
    if !plan.groups.iter().any(|g| g.kind == ColumnKind::Sample) {
        return Err(IsaError::MissingColumn {
            column: SAMPLE_NAME.to_string(),
            file: table.name.clone(),
        });
    }

    let mut reader = TableReader {
        table,
        plan: &plan,
        catalog,
        graph: TableGraph::default(),
        node_keys: HashMap::new(),
        positions: HashMap::new(),
        process_keys: HashMap::new(),
        missing_protocols: HashSet::new(),
        missing_parameters: HashSet::new(),
        missing_factors: HashSet::new(),
        missing_samples: Vec::new(),
    };
    for row in 0..table.rows.len() {
        reader.read_row(row, report)?;
    }

    if !reader.missing_samples.is_empty() {
        report.add(Finding::new(
            Code::AssaySamplesNotInStudy,
            format!("{} in {}", reader.missing_samples.join(", "), table.name),
        ));
    }
    let graph = reader.graph;
    tracing::debug!(
        file = %table.name,
        rows = table.rows.len(),
        processes = graph.processes.len(),
        samples = graph.samples.len(),
        "read table"
    );
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ProtocolParameter, Study};

    fn study_with(protocols: &[&str]) -> Study {
        let mut study = Study::new("s_test.txt");
        for p in protocols {
            study.protocols.push(Protocol::new(*p));
        }
        study
    }

    fn read(study: &mut Study, text: &str) -> (TableGraph, ValidationReport) {
        let table = Table::parse("s_test.txt", text, false).unwrap();
        let mut report = ValidationReport::new("s_test.txt");
        let mut catalog = Catalog {
            protocols: &mut study.protocols,
            factors: &study.factors,
            study_samples: None,
            categories: &mut study.characteristic_categories,
            units: &mut study.units,
        };
        let graph = read_table(&table, &mut catalog, &mut report).unwrap();
        (graph, report)
    }

    #[test]
    fn test_one_to_one() {
        let mut study = study_with(&["sample collection"]);
        let (graph, report) = read(
            &mut study,
            "Source Name\tProtocol REF\tSample Name\nsource1\tsample collection\tsample1\n",
        );
        assert!(report.is_valid());
        assert_eq!(graph.processes.len(), 1);
        let p = &graph.processes[0];
        assert_eq!(p.inputs, vec![NodeRef::Source(graph.sources[0].id.clone())]);
        assert_eq!(p.outputs, vec![NodeRef::Sample(graph.samples[0].id.clone())]);
        assert_eq!(graph.samples[0].derives_from, vec![graph.sources[0].id.clone()]);
    }

    #[test]
    fn test_split_gives_one_process_with_many_outputs() {
        let mut study = study_with(&["sample collection"]);
        let text = "Source Name\tProtocol REF\tSample Name\n\
                    source1\tsample collection\tsample1\n\
                    source1\tsample collection\tsample2\n\
                    source1\tsample collection\tsample3\n\
                    source1\tsample collection\tsample4\n";
        let (graph, _) = read(&mut study, text);
        assert_eq!(graph.sources.len(), 1);
        assert_eq!(graph.processes.len(), 1);
        assert_eq!(graph.processes[0].outputs.len(), 4);
    }

    #[test]
    fn test_pool_gives_one_process_with_many_inputs() {
        let mut study = study_with(&["sample collection"]);
        let text = "Source Name\tProtocol REF\tSample Name\n\
                    source1\tsample collection\tsample1\n\
                    source2\tsample collection\tsample1\n\
                    source3\tsample collection\tsample1\n";
        let (graph, _) = read(&mut study, text);
        assert_eq!(graph.processes.len(), 1);
        assert_eq!(graph.processes[0].inputs.len(), 3);
        assert_eq!(graph.samples.len(), 1);
        assert_eq!(graph.samples[0].derives_from.len(), 3);
    }

    #[test]
    fn test_split_keeps_process_links_consistent() {
        let mut study = study_with(&["extraction", "labeling"]);
        let text = "Sample Name\tProtocol REF\tExtract Name\tProtocol REF\tLabeled Extract Name\tLabel\n\
                    sample1\textraction\te1\tlabeling\tle1\tCy3\n\
                    sample1\textraction\te2\tlabeling\tle2\tCy5\n";
        let (graph, report) = read(&mut study, text);
        assert!(report.is_valid(), "{:?}", report.errors);
        assert_eq!(graph.processes.len(), 3);
        assert_eq!(graph.processes[0].outputs.len(), 2);

        let by_id = |id: &Id| graph.processes.iter().find(|p| &p.id == id).unwrap();
        for process in &graph.processes {
            if let Some(prev) = &process.prev_process {
                assert_eq!(by_id(prev).next_process.as_ref(), Some(&process.id));
            }
            if let Some(next) = &process.next_process {
                assert_eq!(by_id(next).prev_process.as_ref(), Some(&process.id));
            }
        }
        let linked = graph.processes.iter().filter(|p| p.prev_process.is_some()).count();
        assert_eq!(linked, 1);
    }

    #[test]
    fn test_characteristics_units_and_terms() {
        let mut study = study_with(&["sample collection"]);
        let text = "Source Name\tCharacteristics[organism]\tTerm Source REF\tTerm Accession Number\t\
                    Protocol REF\tSample Name\tCharacteristics[weight]\tUnit\tTerm Source REF\tTerm Accession Number\n\
                    source1\tMus musculus\tNCBITAXON\t10090\tsample collection\tsample1\t2.5\tgram\tUO\tUO:0000021\n";
        let (graph, report) = read(&mut study, text);
        assert!(report.is_valid());
        let organism = &graph.sources[0].characteristics[0];
        let term = organism.value().as_term().unwrap();
        assert_eq!(term.term_source, "NCBITAXON");
        assert!(organism.category.id.has_kind(IdKind::CharacteristicCategory));

        let weight = &graph.samples[0].characteristics[0];
        assert_eq!(weight.value(), &Value::Float(2.5));
        assert!(matches!(weight.unit(), Some(Unit::Term(u)) if u.term == "gram" && u.id.has_kind(IdKind::Unit)));
        assert_eq!(study.units.len(), 1);
        assert_eq!(study.characteristic_categories.len(), 2);
    }

    #[test]
    fn test_unknown_protocol_ref() {
        let mut study = study_with(&[]);
        let (graph, report) = read(
            &mut study,
            "Source Name\tProtocol REF\tSample Name\nsource1\tcollection\tsample1\nsource2\tcollection\tsample2\n",
        );
        assert_eq!(report.error_codes(), vec![1007]);
        assert_eq!(study.protocols.len(), 1);
        assert_eq!(study.protocols[0].name, UNKNOWN_PROTOCOL);
        assert_eq!(study.protocols[0].description, UNKNOWN_PROTOCOL_DESCRIPTION);
        assert_eq!(graph.processes[0].executes_protocol, study.protocols[0].id);
    }

    #[test]
    fn test_undeclared_parameter_is_reported_and_skipped() {
        let mut study = study_with(&["sample collection"]);
        study.protocols[0].parameters.push(ProtocolParameter::named("volume"));
        let (graph, report) = read(
            &mut study,
            "Source Name\tProtocol REF\tParameter Value[temperature]\tParameter Value[volume]\tSample Name\n\
             source1\tsample collection\t4\t10\tsample1\n",
        );
        assert_eq!(report.error_codes(), vec![1009]);
        assert_eq!(graph.processes[0].parameter_values.len(), 1);
        assert_eq!(graph.processes[0].parameter_values[0].category, study.protocols[0].parameters[0].id);
    }

    #[test]
    fn test_missing_sample_column_is_fatal() {
        let mut study = study_with(&[]);
        let table = Table::parse("s_bad.txt", "Source Name\nsource1\n", false).unwrap();
        let mut report = ValidationReport::new("s_bad.txt");
        let mut catalog = Catalog {
            protocols: &mut study.protocols,
            factors: &study.factors,
            study_samples: None,
            categories: &mut study.characteristic_categories,
            units: &mut study.units,
        };
        let err = read_table(&table, &mut catalog, &mut report).unwrap_err();
        assert!(matches!(err, IsaError::MissingColumn { column, .. } if column == "Sample Name"));
    }

    #[test]
    fn test_assay_chain_reuses_study_samples_and_links_processes() {
        let mut study = study_with(&["extraction", "sequencing"]);
        study.protocols[1].protocol_type = Some(OntologyAnnotation::new("nucleic acid sequencing"));
        let sample = Sample::new("sample1");
        let sample_id = sample.id.clone();
        study.samples.push(sample);

        let text = "Sample Name\tProtocol REF\tExtract Name\tProtocol REF\tAssay Name\tRaw Data File\n\
                    sample1\textraction\textract1\tsequencing\trun1\traw1.fastq\n\
                    sample2\textraction\textract2\tsequencing\trun2\traw2.fastq\n";
        let table = Table::parse("a_test.txt", text, false).unwrap();
        let mut report = ValidationReport::new("a_test.txt");
        let mut catalog = Catalog {
            protocols: &mut study.protocols,
            factors: &study.factors,
            study_samples: Some(&study.samples),
            categories: &mut study.characteristic_categories,
            units: &mut study.units,
        };
        let graph = read_table(&table, &mut catalog, &mut report).unwrap();

        assert_eq!(report.error_codes(), vec![1013]);
        assert_eq!(graph.samples[0].id, sample_id);
        assert_eq!(graph.processes.len(), 4);
        let extraction = &graph.processes[0];
        let sequencing = &graph.processes[1];
        assert_eq!(extraction.next_process.as_ref(), Some(&sequencing.id));
        assert_eq!(sequencing.prev_process.as_ref(), Some(&extraction.id));
        assert_eq!(sequencing.name, "run1");
        assert!(sequencing.outputs[0].is_data_file());
        assert_eq!(graph.data_files[0].generated_from, vec![sample_id]);
        assert_eq!(graph.materials[0].derives_from, vec![graph.samples[0].id.clone()]);
    }
}
