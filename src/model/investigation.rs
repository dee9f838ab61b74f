//! Investigation, Study, Assay and their metadata bags

use super::identifier::Id;
use super::material::{DataFile, Material, Sample, Source};
use super::ontology::{Comment, OntologyAnnotation, OntologySource};
use super::process::{Process, Protocol, ProtocolParameter, StudyFactor};
use crate::graph::ProcessGraph;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Person {
    pub last_name: String,
    pub first_name: String,
    pub mid_initials: String,
    pub email: String,
    pub phone: String,
    pub fax: String,
    pub address: String,
    /// Kept verbatim, semicolons included
    pub affiliation: String,
    pub roles: Vec<OntologyAnnotation>,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Publication {
    pub pubmed_id: String,
    pub doi: String,
    pub author_list: String,
    pub title: String,
    pub status: Option<OntologyAnnotation>,
    pub comments: Vec<Comment>,
}

/// Root of the model
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Investigation {
    /// Investigation file name, `i_investigation.txt` unless read from disk
    pub filename: String,
    pub identifier: String,
    pub title: String,
    pub description: String,
    pub submission_date: String,
    pub public_release_date: String,
    pub ontology_source_references: Vec<OntologySource>,
    pub publications: Vec<Publication>,
    pub contacts: Vec<Person>,
    pub studies: Vec<Study>,
    pub comments: Vec<Comment>,
}

impl Investigation {
    pub fn new() -> Self {
        Self {
            filename: "i_investigation.txt".to_string(),
            ..Default::default()
        }
    }

    pub fn ontology_source(&self, name: &str) -> Option<&OntologySource> {
        self.ontology_source_references.iter().find(|s| s.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Study {
    pub filename: String,
    pub identifier: String,
    pub title: String,
    pub description: String,
    pub submission_date: String,
    pub public_release_date: String,
    pub design_descriptors: Vec<OntologyAnnotation>,
    pub publications: Vec<Publication>,
    pub contacts: Vec<Person>,
    pub factors: Vec<StudyFactor>,
    pub protocols: Vec<Protocol>,
    pub characteristic_categories: Vec<OntologyAnnotation>,
    pub units: Vec<OntologyAnnotation>,
    pub sources: Vec<Source>,
    pub samples: Vec<Sample>,
    pub other_material: Vec<Material>,
    pub process_sequence: Vec<Process>,
    pub assays: Vec<Assay>,
    pub comments: Vec<Comment>,
}

impl Study {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Default::default()
        }
    }

    pub fn protocol(&self, id: &Id) -> Option<&Protocol> {
        self.protocols.iter().find(|p| &p.id == id)
    }

    pub fn protocol_by_name(&self, name: &str) -> Option<&Protocol> {
        self.protocols.iter().find(|p| p.name == name)
    }

    /// Parameter of any of this study's protocols
    pub fn parameter(&self, id: &Id) -> Option<(&Protocol, &ProtocolParameter)> {
        self.protocols
            .iter()
            .find_map(|p| p.parameter(id).map(|param| (p, param)))
    }

    pub fn factor(&self, id: &Id) -> Option<&StudyFactor> {
        self.factors.iter().find(|f| &f.id == id)
    }

    pub fn factor_by_name(&self, name: &str) -> Option<&StudyFactor> {
        self.factors.iter().find(|f| f.name == name)
    }

    pub fn source_by_name(&self, name: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.name == name)
    }

    pub fn sample_by_name(&self, name: &str) -> Option<&Sample> {
        self.samples.iter().find(|s| s.name == name)
    }

    /// Graph of the study's own process sequence, None when empty
    pub fn graph(&self) -> Option<ProcessGraph> {
        if self.process_sequence.is_empty() {
            None
        } else {
            Some(ProcessGraph::from_processes(&self.process_sequence))
        }
    }
}

/// One measurement campaign within a study
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Assay {
    pub filename: String,
    pub measurement_type: OntologyAnnotation,
    pub technology_type: OntologyAnnotation,
    pub technology_platform: String,
    pub characteristic_categories: Vec<OntologyAnnotation>,
    pub units: Vec<OntologyAnnotation>,
    /// Samples used by this assay; identifiers match the study's samples
    pub samples: Vec<Sample>,
    pub other_material: Vec<Material>,
    pub data_files: Vec<DataFile>,
    pub process_sequence: Vec<Process>,
    pub comments: Vec<Comment>,
}

impl Assay {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Default::default()
        }
    }

    pub fn graph(&self) -> Option<ProcessGraph> {
        if self.process_sequence.is_empty() {
            None
        } else {
            Some(ProcessGraph::from_processes(&self.process_sequence))
        }
    }

    pub fn material_by_name(&self, name: &str) -> Option<&Material> {
        self.other_material.iter().find(|m| m.name == name)
    }
}
