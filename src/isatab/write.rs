//! Study and assay table rendering
//!
//! Every end-to-end path of the process graph becomes one row. The
//! canonical path fixes the column order; columns only other paths need
//! are slotted in after the column that precedes them in those paths.

use std::collections::HashMap;

use super::table::Table;
use super::TabOptions;
use crate::error::IsaError;
use crate::graph::{GraphNode, ProcessGraph};
use crate::labels::{
    is_assay_name, ProtocolTypes, ARRAY_DESIGN_REF, DATE, LABEL, PERFORMER, PROTOCOL_REF, SAMPLE_NAME,
    TERM_ACCESSION_NUMBER, TERM_SOURCE_REF, UNIT,
};
use crate::model::{
    Assay, Comment, MaterialType, Measured, NodeEntity, NodeRef, OntologyAnnotation, Process, Study, StudyIndex,
    Unit, Value,
};

struct Cell {
    key: String,
    header: String,
    value: String,
}

#[derive(Debug, Clone, Copy)]
struct Layout {
    in_assay: bool,
    assay_factor_values: bool,
}

/// One row under construction; keys identify logical columns across rows
#[derive(Default)]
struct RowBuilder {
    cells: Vec<Cell>,
    occurrences: HashMap<&'static str, usize>,
}

impl RowBuilder {
    fn open(&mut self, label: &'static str) -> String {
        let n = self.occurrences.entry(label).or_insert(0);
        *n += 1;
        format!("{}.{}", label, n)
    }

    fn push(&mut self, key: String, header: impl Into<String>, value: impl Into<String>) {
        self.cells.push(Cell {
            key,
            header: header.into(),
            value: value.into(),
        });
    }

    fn term(&mut self, key: &str, oa: &OntologyAnnotation) {
        self.push(format!("{}/{}", key, TERM_SOURCE_REF), TERM_SOURCE_REF, oa.term_source.clone());
        self.push(format!("{}/{}", key, TERM_ACCESSION_NUMBER), TERM_ACCESSION_NUMBER, oa.term_accession.clone());
    }

    fn value(&mut self, owner: &str, header: String, value: &Value, unit: Option<&Unit>) {
        let key = format!("{}/{}", owner, header);
        self.push(key.clone(), header, value.cell());
        if let Value::Term(oa) = value {
            self.term(&key, oa);
        }
        if let Some(unit) = unit {
            let unit_key = format!("{}/{}", key, UNIT);
            self.push(unit_key.clone(), UNIT, unit.term());
            if let Unit::Term(oa) = unit {
                self.term(&unit_key, oa);
            }
        }
    }

    fn comments(&mut self, owner: &str, comments: &[Comment]) {
        for c in comments {
            let header = format!("Comment[{}]", c.name);
            self.push(format!("{}/{}", owner, header), header, c.value.clone());
        }
    }

    fn node(&mut self, entity: NodeEntity<'_>, index: &StudyIndex<'_>, layout: Layout) {
        let label = entity.label();
        let key = self.open(label);
        self.push(key.clone(), label, entity.name());

        let assay_sample = layout.in_assay && matches!(entity, NodeEntity::Sample(_));
        if !assay_sample {
            let labeled = matches!(entity, NodeEntity::Material(m) if m.material_type == MaterialType::LabeledExtract);
            for c in entity.characteristics() {
                let header = if labeled && c.category.term == LABEL {
                    LABEL.to_string()
                } else {
                    format!("Characteristics[{}]", c.category.term)
                };
                self.value(&key, header, c.value(), c.unit());
            }
        }
        if !assay_sample || layout.assay_factor_values {
            for fv in entity.factor_values() {
                let header = format!("Factor Value[{}]", index.factor_name(&fv.factor));
                self.value(&key, header, fv.value(), fv.unit());
            }
        }
        if !assay_sample {
            self.comments(&key, entity.comments());
        }
    }

    fn process(&mut self, process: &Process, index: &StudyIndex<'_>) {
        let key = self.open(PROTOCOL_REF);
        self.push(key.clone(), PROTOCOL_REF, index.protocol_name(process));
        for pv in &process.parameter_values {
            let header = format!("Parameter Value[{}]", index.parameter_name(&pv.category));
            self.value(&key, header, pv.value(), pv.unit());
        }
        if let Some(performer) = &process.performer {
            self.push(format!("{}/{}", key, PERFORMER), PERFORMER, performer.clone());
        }
        if let Some(date) = &process.date {
            self.push(format!("{}/{}", key, DATE), DATE, date.clone());
        }

        let protocol_type = index
            .protocol(&process.executes_protocol)
            .map(|p| p.type_term())
            .unwrap_or("");
        let mut named = false;
        let mut array_design = false;
        for header in ProtocolTypes::embedded().headers_for(protocol_type) {
            if header == ARRAY_DESIGN_REF {
                if let Some(design) = &process.array_design_ref {
                    self.push(format!("{}/{}", key, header), header.clone(), design.clone());
                }
                array_design = true;
            } else if is_assay_name(header) && !named {
                self.push(format!("{}/name", key), header.clone(), process.name.clone());
                named = true;
            }
        }
        if !named && !process.name.is_empty() {
            self.push(format!("{}/name", key), "Assay Name", process.name.clone());
        }
        if !array_design {
            if let Some(design) = &process.array_design_ref {
                self.push(format!("{}/{}", key, ARRAY_DESIGN_REF), ARRAY_DESIGN_REF, design.clone());
            }
        }
        self.comments(&key, &process.comments);
    }

    /// Data-file outputs, one per label; the file on the current path wins
    fn data_outputs(&mut self, process: &Process, on_path: Option<&NodeRef>, index: &StudyIndex<'_>) {
        let preferred = on_path.filter(|n| n.is_data_file()).and_then(|n| index.node(n));
        let mut written: Vec<&'static str> = Vec::new();
        for output in process.outputs.iter().filter(|o| o.is_data_file()) {
            let Some(entity) = index.node(output) else {
                continue;
            };
            let label = entity.label();
            if written.contains(&label) {
                continue;
            }
            written.push(label);
            let chosen = match preferred {
                Some(p) if p.label() == label => p,
                _ => entity,
            };
            let key = self.open(label);
            self.push(key.clone(), label, chosen.name());
            self.comments(&key, chosen.comments());
        }
    }
}

fn render_path(graph: &ProcessGraph, path: &[usize], index: &StudyIndex<'_>, layout: Layout) -> Vec<Cell> {
    let mut row = RowBuilder::default();
    for (k, &pos) in path.iter().enumerate() {
        match graph.node(pos) {
            GraphNode::Node(node) => {
                if node.is_data_file() {
                    continue;
                }
                if let Some(entity) = index.node(node) {
                    row.node(entity, index, layout);
                }
            }
            GraphNode::Process(id) => {
                let Some(process) = index.process(id) else {
                    continue;
                };
                row.process(process, index);
                let next = path.get(k + 1).and_then(|&n| match graph.node(n) {
                    GraphNode::Node(r) => Some(r),
                    GraphNode::Process(_) => None,
                });
                row.data_outputs(process, next, index);
            }
        }
    }
    row.cells
}

/// Lay rows out under one header; the first row's keys come first
fn assemble(name: &str, rows: Vec<Vec<Cell>>) -> Table {
    let mut order: Vec<String> = Vec::new();
    let mut headers: HashMap<String, String> = HashMap::new();
    for row in &rows {
        let mut previous: Option<usize> = None;
        for cell in row {
            match order.iter().position(|k| *k == cell.key) {
                Some(p) => previous = Some(p),
                None => {
                    let at = previous.map_or(0, |p| p + 1);
                    order.insert(at, cell.key.clone());
                    headers.insert(cell.key.clone(), cell.header.clone());
                    previous = Some(at);
                }
            }
        }
    }

    let header = order.iter().map(|k| headers[k].clone()).collect();
    let mut table = Table::new(name, header);
    for row in rows {
        let mut values: HashMap<String, String> = row.into_iter().map(|c| (c.key, c.value)).collect();
        table
            .rows
            .push(order.iter().map(|k| values.remove(k).unwrap_or_default()).collect());
    }
    table.normalize();
    table
}

fn render_graph(
    name: &str,
    graph: &ProcessGraph,
    starts: &[usize],
    index: &StudyIndex<'_>,
    layout: Layout,
) -> Result<Table, IsaError> {
    let paths = graph.end_to_end_paths(starts);
    let canonical = graph
        .canonical_path(&paths, index)
        .ok_or_else(|| IsaError::NoCanonicalPath { file: name.to_string() })?;

    let mut rows = vec![render_path(graph, canonical, index, layout)];
    rows.extend(
        paths
            .iter()
            .filter(|p| !std::ptr::eq(*p, canonical))
            .map(|p| render_path(graph, p, index, layout)),
    );
    let table = assemble(name, rows);
    tracing::debug!(file = %name, paths = paths.len(), columns = table.width(), "rendered table");
    Ok(table)
}

fn sample_rows<'a>(name: &str, samples: impl Iterator<Item = NodeEntity<'a>>, index: &StudyIndex<'_>, layout: Layout) -> Table {
    let rows = samples
        .map(|s| {
            let mut row = RowBuilder::default();
            row.node(s, index, layout);
            row.cells
        })
        .collect();
    assemble(name, rows)
}

/// Render the study table (`s_*.txt`)
pub fn study_table(study: &Study) -> Result<Table, IsaError> {
    let index = StudyIndex::new(study);
    let layout = Layout {
        in_assay: false,
        assay_factor_values: false,
    };
    let Some(graph) = study.graph() else {
        let mut table = sample_rows(&study.filename, study.samples.iter().map(NodeEntity::Sample), &index, layout);
        if table.header.is_empty() {
            table.header.push(SAMPLE_NAME.to_string());
        }
        return Ok(table);
    };
    let mut starts = graph.sources();
    if starts.is_empty() {
        starts = graph.start_nodes();
    }
    render_graph(&study.filename, &graph, &starts, &index, layout)
}

/// Render one assay table (`a_*.txt`)
pub fn assay_table(study: &Study, assay: &Assay, options: &TabOptions) -> Result<Table, IsaError> {
    let index = StudyIndex::new(study);
    let layout = Layout {
        in_assay: true,
        assay_factor_values: options.write_factor_values_in_assay_table,
    };
    let Some(graph) = assay.graph() else {
        let mut table = sample_rows(&assay.filename, assay.samples.iter().map(NodeEntity::Sample), &index, layout);
        if table.header.is_empty() {
            table.header.push(SAMPLE_NAME.to_string());
        }
        return Ok(table);
    };
    let mut starts: Vec<usize> = graph
        .samples()
        .into_iter()
        .filter(|&s| graph.predecessors(s).is_empty())
        .collect();
    if starts.is_empty() {
        starts = graph.start_nodes();
    }
    render_graph(&assay.filename, &graph, &starts, &index, layout)
}
