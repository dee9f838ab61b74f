//! Per-operation identifier index over one study and its assays
//!
//! Readers, writers and the validator build one of these instead of
//! sharing global lookup tables.

use std::collections::HashMap;

use super::identifier::Id;
use super::material::{DataFile, Material, NodeRef, Sample, Source};
use super::process::{Process, Protocol, ProtocolParameter, StudyFactor};
use super::investigation::Study;
use super::value::{Characteristic, FactorValue};
use super::ontology::Comment;

/// Borrowed view of a process input/output
#[derive(Debug, Clone, Copy)]
pub enum NodeEntity<'a> {
    Source(&'a Source),
    Sample(&'a Sample),
    Material(&'a Material),
    DataFile(&'a DataFile),
}

impl<'a> NodeEntity<'a> {
    pub fn name(&self) -> &'a str {
        match *self {
            NodeEntity::Source(s) => &s.name,
            NodeEntity::Sample(s) => &s.name,
            NodeEntity::Material(m) => &m.name,
            NodeEntity::DataFile(d) => &d.filename,
        }
    }

    /// Column label of the node in a table
    pub fn label(&self) -> &'static str {
        match *self {
            NodeEntity::Source(_) => "Source Name",
            NodeEntity::Sample(_) => "Sample Name",
            NodeEntity::Material(m) => m.material_type.label(),
            NodeEntity::DataFile(d) => d.kind.label(),
        }
    }

    pub fn characteristics(&self) -> &'a [Characteristic] {
        match *self {
            NodeEntity::Source(s) => &s.characteristics,
            NodeEntity::Sample(s) => &s.characteristics,
            NodeEntity::Material(m) => &m.characteristics,
            NodeEntity::DataFile(_) => &[],
        }
    }

    pub fn factor_values(&self) -> &'a [FactorValue] {
        match *self {
            NodeEntity::Sample(s) => &s.factor_values,
            _ => &[],
        }
    }

    pub fn comments(&self) -> &'a [Comment] {
        match *self {
            NodeEntity::Source(s) => &s.comments,
            NodeEntity::Sample(s) => &s.comments,
            NodeEntity::Material(m) => &m.comments,
            NodeEntity::DataFile(d) => &d.comments,
        }
    }
}

#[derive(Debug, Default)]
pub struct StudyIndex<'a> {
    sources: HashMap<&'a str, &'a Source>,
    samples: HashMap<&'a str, &'a Sample>,
    materials: HashMap<&'a str, &'a Material>,
    data_files: HashMap<&'a str, &'a DataFile>,
    processes: HashMap<&'a str, &'a Process>,
    protocols: HashMap<&'a str, &'a Protocol>,
    parameters: HashMap<&'a str, &'a ProtocolParameter>,
    factors: HashMap<&'a str, &'a StudyFactor>,
}

impl<'a> StudyIndex<'a> {
    pub fn new(study: &'a Study) -> Self {
        let mut index = Self::default();
        for s in &study.sources {
            index.sources.insert(s.id.as_str(), s);
        }
        for s in &study.samples {
            index.samples.insert(s.id.as_str(), s);
        }
        for m in &study.other_material {
            index.materials.insert(m.id.as_str(), m);
        }
        for p in &study.process_sequence {
            index.processes.insert(p.id.as_str(), p);
        }
        for protocol in &study.protocols {
            index.protocols.insert(protocol.id.as_str(), protocol);
            for param in &protocol.parameters {
                index.parameters.insert(param.id.as_str(), param);
            }
        }
        for f in &study.factors {
            index.factors.insert(f.id.as_str(), f);
        }
        for assay in &study.assays {
            // study samples stay canonical
            for s in &assay.samples {
                index.samples.entry(s.id.as_str()).or_insert(s);
            }
            for m in &assay.other_material {
                index.materials.insert(m.id.as_str(), m);
            }
            for d in &assay.data_files {
                index.data_files.insert(d.id.as_str(), d);
            }
            for p in &assay.process_sequence {
                index.processes.insert(p.id.as_str(), p);
            }
        }
        index
    }

    /// Resolve a tagged reference; the tag must match the entity kind
    pub fn node(&self, node: &NodeRef) -> Option<NodeEntity<'a>> {
        match node {
            NodeRef::Source(id) => self.sources.get(id.as_str()).copied().map(NodeEntity::Source),
            NodeRef::Sample(id) => self.samples.get(id.as_str()).copied().map(NodeEntity::Sample),
            NodeRef::Material(id) => self.materials.get(id.as_str()).copied().map(NodeEntity::Material),
            NodeRef::DataFile(id) => self.data_files.get(id.as_str()).copied().map(NodeEntity::DataFile),
        }
    }

    /// True when any source, sample, material or data file has this id
    pub fn has_node(&self, id: &Id) -> bool {
        let key = id.as_str();
        self.sources.contains_key(key)
            || self.samples.contains_key(key)
            || self.materials.contains_key(key)
            || self.data_files.contains_key(key)
    }

    pub fn source(&self, id: &Id) -> Option<&'a Source> {
        self.sources.get(id.as_str()).copied()
    }

    pub fn sample(&self, id: &Id) -> Option<&'a Sample> {
        self.samples.get(id.as_str()).copied()
    }

    pub fn process(&self, id: &Id) -> Option<&'a Process> {
        self.processes.get(id.as_str()).copied()
    }

    pub fn protocol(&self, id: &Id) -> Option<&'a Protocol> {
        self.protocols.get(id.as_str()).copied()
    }

    pub fn parameter(&self, id: &Id) -> Option<&'a ProtocolParameter> {
        self.parameters.get(id.as_str()).copied()
    }

    pub fn factor(&self, id: &Id) -> Option<&'a StudyFactor> {
        self.factors.get(id.as_str()).copied()
    }

    /// Protocol name of a process, empty when the reference is dangling
    pub fn protocol_name(&self, process: &Process) -> &'a str {
        self.protocol(&process.executes_protocol)
            .map(|p| p.name.as_str())
            .unwrap_or("")
    }

    pub fn parameter_name(&self, id: &Id) -> &'a str {
        self.parameter(id).map(|p| p.name.term.as_str()).unwrap_or("")
    }

    pub fn factor_name(&self, id: &Id) -> &'a str {
        self.factor(id).map(|f| f.name.as_str()).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Assay, MaterialType};

    #[test]
    fn test_resolves_assay_and_study_entities() {
        let mut study = Study::new("s.txt");
        let sample = Sample::new("sample1");
        let sample_id = sample.id.clone();
        study.samples.push(sample.clone());

        let mut assay = Assay::new("a.txt");
        let mut shadow = sample.clone();
        shadow.name = "shadow".to_string();
        assay.samples.push(shadow);
        assay.other_material.push(Material::new("extract1", MaterialType::Extract));
        let extract_id = assay.other_material[0].id.clone();
        study.assays.push(assay);

        let index = StudyIndex::new(&study);
        let node = index.node(&NodeRef::Sample(sample_id.clone())).unwrap();
        assert_eq!(node.name(), "sample1");
        assert_eq!(node.label(), "Sample Name");

        let extract = index.node(&NodeRef::Material(extract_id.clone())).unwrap();
        assert_eq!(extract.label(), "Extract Name");
        // wrong tag does not resolve
        assert!(index.node(&NodeRef::Sample(extract_id)).is_none());
    }
}
