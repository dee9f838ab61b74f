//! Protocols, factors and protocol applications (processes)

use std::hash::{Hash, Hasher};

use super::identifier::{next_sequence, Id, IdKind};
use super::material::NodeRef;
use super::ontology::{Comment, OntologyAnnotation};
use super::value::ParameterValue;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolParameter {
    pub id: Id,
    pub name: OntologyAnnotation,
    pub comments: Vec<Comment>,
}

impl ProtocolParameter {
    pub fn new(name: OntologyAnnotation) -> Self {
        Self {
            id: Id::mint(IdKind::Parameter),
            name,
            comments: Vec::new(),
        }
    }

    pub fn named(name: &str) -> Self {
        Self::new(OntologyAnnotation::new(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProtocolComponent {
    pub name: String,
    pub component_type: Option<OntologyAnnotation>,
    pub comments: Vec<Comment>,
}

/// Reusable procedure definition owned by a study
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Protocol {
    pub id: Id,
    pub name: String,
    pub protocol_type: Option<OntologyAnnotation>,
    pub description: String,
    pub uri: String,
    pub version: String,
    pub parameters: Vec<ProtocolParameter>,
    pub components: Vec<ProtocolComponent>,
    pub comments: Vec<Comment>,
}

impl Protocol {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Id::mint(IdKind::Protocol),
            name: name.into(),
            protocol_type: None,
            description: String::new(),
            uri: String::new(),
            version: String::new(),
            parameters: Vec::new(),
            components: Vec::new(),
            comments: Vec::new(),
        }
    }

    pub fn typed(name: impl Into<String>, protocol_type: &str) -> Self {
        let mut p = Self::new(name);
        p.protocol_type = Some(OntologyAnnotation::new(protocol_type));
        p
    }

    pub fn type_term(&self) -> &str {
        self.protocol_type.as_ref().map(|t| t.term.as_str()).unwrap_or("")
    }

    pub fn parameter(&self, id: &Id) -> Option<&ProtocolParameter> {
        self.parameters.iter().find(|p| &p.id == id)
    }

    pub fn parameter_by_name(&self, name: &str) -> Option<&ProtocolParameter> {
        self.parameters.iter().find(|p| p.name.term == name)
    }
}

/// Experimental variable declared by a study
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyFactor {
    pub id: Id,
    pub name: String,
    pub factor_type: Option<OntologyAnnotation>,
    pub comments: Vec<Comment>,
}

impl StudyFactor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Id::mint(IdKind::Factor),
            name: name.into(),
            factor_type: None,
            comments: Vec::new(),
        }
    }
}

/// Protocol application: a node of the experimental graph
#[derive(Debug, Clone)]
pub struct Process {
    pub id: Id,
    sequence_identifier: u64,
    /// Value of the assay-name column, empty when the table has none
    pub name: String,
    /// Identifier of the executed [`Protocol`]
    pub executes_protocol: Id,
    pub performer: Option<String>,
    pub date: Option<String>,
    pub inputs: Vec<NodeRef>,
    pub outputs: Vec<NodeRef>,
    pub parameter_values: Vec<ParameterValue>,
    pub prev_process: Option<Id>,
    pub next_process: Option<Id>,
    pub array_design_ref: Option<String>,
    pub comments: Vec<Comment>,
}

impl Process {
    pub fn new(executes_protocol: Id) -> Self {
        Self::with_id(Id::mint(IdKind::Process), executes_protocol)
    }

    pub fn with_id(id: Id, executes_protocol: Id) -> Self {
        Self {
            id,
            sequence_identifier: next_sequence(),
            name: String::new(),
            executes_protocol,
            performer: None,
            date: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            parameter_values: Vec::new(),
            prev_process: None,
            next_process: None,
            array_design_ref: None,
            comments: Vec::new(),
        }
    }

    /// Allocation order of this process within the running program
    pub fn sequence_identifier(&self) -> u64 {
        self.sequence_identifier
    }

    /// Copy with fresh identity and no chain links
    pub fn duplicate(&self) -> Self {
        let mut copy = self.clone();
        copy.id = Id::mint(IdKind::Process);
        copy.sequence_identifier = next_sequence();
        copy.prev_process = None;
        copy.next_process = None;
        copy
    }

    pub fn add_input(&mut self, node: NodeRef) {
        if !self.inputs.contains(&node) {
            self.inputs.push(node);
        }
    }

    pub fn add_output(&mut self, node: NodeRef) {
        if !self.outputs.contains(&node) {
            self.outputs.push(node);
        }
    }
}

impl PartialEq for Process {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Process {}

impl Hash for Process {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Link two processes both ways: `prev.next == next` and `next.prev == prev`
///
/// Former partners are not touched; [`plink_by_id`] detaches them.
pub fn plink(prev: &mut Process, next: &mut Process) {
    prev.next_process = Some(next.id.clone());
    next.prev_process = Some(prev.id.clone());
}

/// [`plink`] two members of a process sequence by identifier
///
/// A process that pointed back at either end loses that link, so every
/// `prev_process` still has a matching `next_process`. Returns false when
/// either identifier is missing or both are the same.
pub fn plink_by_id(processes: &mut [Process], prev: &Id, next: &Id) -> bool {
    let Some(i) = processes.iter().position(|p| &p.id == prev) else {
        return false;
    };
    let Some(j) = processes.iter().position(|p| &p.id == next) else {
        return false;
    };
    if i == j {
        return false;
    }
    let old_next = processes[i].next_process.take();
    let old_prev = processes[j].prev_process.take();
    for p in processes.iter_mut() {
        if old_next.as_ref() == Some(&p.id) && p.prev_process.as_ref() == Some(prev) {
            p.prev_process = None;
        }
        if old_prev.as_ref() == Some(&p.id) && p.next_process.as_ref() == Some(next) {
            p.next_process = None;
        }
    }
    let (a, b) = if i < j {
        let (left, right) = processes.split_at_mut(j);
        (&mut left[i], &mut right[0])
    } else {
        let (left, right) = processes.split_at_mut(i);
        (&mut right[0], &mut left[j])
    };
    plink(a, b);
    true
}
