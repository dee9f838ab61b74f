//! ISA object model
//!
//! Entities own their value content; edges between graph-bearing
//! entities (process inputs/outputs, protocol and factor references,
//! process chain links, derives-from) are identifier-based and resolved
//! through a [`StudyIndex`].

mod identifier;
mod index;
mod investigation;
mod material;
mod ontology;
mod process;
mod value;

pub use identifier::{next_sequence, Id, IdKind};
pub use index::{NodeEntity, StudyIndex};
pub use investigation::{Assay, Investigation, Person, Publication, Study};
pub use material::{DataFile, DataFileKind, Material, MaterialNode, MaterialType, NodeRef, Sample, Source};
pub use ontology::{Comment, OntologyAnnotation, OntologySource};
pub use process::{plink, plink_by_id, Process, Protocol, ProtocolComponent, ProtocolParameter, StudyFactor};
pub use value::{Characteristic, FactorValue, Measure, Measured, ParameterValue, Unit, Value};

/// Clone a material prototype `n` times, naming the copies `<name>-0 .. <name>-(n-1)`
///
/// Characteristics and derives-from links are carried forward; every copy
/// gets a fresh identifier.
pub fn batch_create_materials<M: MaterialNode>(prototype: &M, n: usize) -> Vec<M> {
    (0..n)
        .map(|x| {
            let mut copy = prototype.clone();
            copy.set_name(format!("{}-{}", prototype.name(), x));
            copy.reassign_id();
            copy
        })
        .collect()
}

/// Prototype of a node position in [`batch_create_assays`]
#[derive(Debug, Clone)]
pub enum NodePrototype {
    Source(Source),
    Sample(Sample),
    Material(Material),
    DataFile(DataFile),
}

/// One position of an alternating material/process prototype chain
#[derive(Debug, Clone)]
pub enum ChainStep {
    Nodes(Vec<NodePrototype>),
    Process(Process),
}

/// Entities produced by [`batch_create_assays`]
#[derive(Debug, Default)]
pub struct AssayBatch {
    pub processes: Vec<Process>,
    pub sources: Vec<Source>,
    pub samples: Vec<Sample>,
    pub materials: Vec<Material>,
    pub data_files: Vec<DataFile>,
}

impl AssayBatch {
    fn instantiate(&mut self, prototype: &NodePrototype, chain: usize, upstream: &[Id]) -> NodeRef {
        match prototype {
            NodePrototype::Source(s) => {
                let mut s = s.clone();
                s.name = format!("{}-{}", s.name, chain);
                s.reassign_id();
                let node = s.node_ref();
                self.sources.push(s);
                node
            }
            NodePrototype::Sample(s) => {
                let mut s = s.clone();
                s.name = format!("{}-{}", s.name, chain);
                s.reassign_id();
                if !upstream.is_empty() {
                    s.derives_from = upstream.to_vec();
                }
                let node = s.node_ref();
                self.samples.push(s);
                node
            }
            NodePrototype::Material(m) => {
                let mut m = m.clone();
                m.name = format!("{}-{}", m.name, chain);
                m.reassign_id();
                if !upstream.is_empty() {
                    m.derives_from = upstream.to_vec();
                }
                let node = m.node_ref();
                self.materials.push(m);
                node
            }
            NodePrototype::DataFile(d) => {
                let mut d = d.clone();
                d.id = Id::mint(IdKind::DataFile);
                if !upstream.is_empty() {
                    d.generated_from = upstream.to_vec();
                }
                let node = NodeRef::DataFile(d.id.clone());
                self.data_files.push(d);
                node
            }
        }
    }
}

/// Build `n` independent linear chains from a material/process prototype sequence
///
/// Steps alternate between node groups and processes. Each process of a
/// chain takes the preceding node group as inputs and the following one
/// as outputs; outputs derive from the inputs and consecutive processes
/// are [`plink`]ed.
pub fn batch_create_assays(steps: &[ChainStep], n: usize) -> AssayBatch {
    let mut batch = AssayBatch::default();
    for chain in 0..n {
        let mut previous_nodes: Vec<NodeRef> = Vec::new();
        let mut pending: Option<Process> = None;
        let mut chain_processes: Vec<Process> = Vec::new();

        for step in steps {
            match step {
                ChainStep::Nodes(prototypes) => {
                    let upstream: Vec<Id> = previous_nodes
                        .iter()
                        .filter(|n| !n.is_data_file())
                        .map(|n| n.id().clone())
                        .collect();
                    let nodes: Vec<NodeRef> = prototypes
                        .iter()
                        .map(|p| {
                            let from = if pending.is_some() { upstream.as_slice() } else { &[] };
                            batch.instantiate(p, chain, from)
                        })
                        .collect();
                    if let Some(mut process) = pending.take() {
                        for input in &previous_nodes {
                            process.add_input(input.clone());
                        }
                        for output in &nodes {
                            process.add_output(output.clone());
                        }
                        chain_processes.push(process);
                    }
                    previous_nodes = nodes;
                }
                ChainStep::Process(prototype) => {
                    if let Some(mut dangling) = pending.take() {
                        for input in &previous_nodes {
                            dangling.add_input(input.clone());
                        }
                        chain_processes.push(dangling);
                        previous_nodes.clear();
                    }
                    let mut process = prototype.duplicate();
                    process.inputs.clear();
                    process.outputs.clear();
                    pending = Some(process);
                }
            }
        }
        if let Some(mut process) = pending.take() {
            for input in &previous_nodes {
                process.add_input(input.clone());
            }
            chain_processes.push(process);
        }

        for i in 1..chain_processes.len() {
            let (left, right) = chain_processes.split_at_mut(i);
            plink(&mut left[i - 1], &mut right[0]);
        }
        batch.processes.extend(chain_processes);
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_create_materials_names_and_ids() {
        let source = Source::new("source_material");
        let mut prototype = Sample::new("sample_material");
        prototype.derives_from.push(source.id.clone());
        prototype.characteristics.push(Characteristic::new(
            OntologyAnnotation::new("organism"),
            Value::from("Mus musculus"),
        ));

        let batch = batch_create_materials(&prototype, 3);
        let names: Vec<_> = batch.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["sample_material-0", "sample_material-1", "sample_material-2"]);
        assert!(batch.iter().all(|s| s.derives_from == vec![source.id.clone()]));
        assert!(batch.iter().all(|s| s.characteristics.len() == 1));
        assert!(batch.iter().all(|s| s.id != prototype.id));
    }

    #[test]
    fn test_batch_create_assays_builds_independent_chains() {
        let extraction = Protocol::new("extraction");
        let labeling = Protocol::new("labeling");
        let steps = vec![
            ChainStep::Nodes(vec![NodePrototype::Sample(Sample::new("sample"))]),
            ChainStep::Process(Process::new(extraction.id.clone())),
            ChainStep::Nodes(vec![NodePrototype::Material(Material::new("extract", MaterialType::Extract))]),
            ChainStep::Process(Process::new(labeling.id.clone())),
            ChainStep::Nodes(vec![NodePrototype::Material(Material::new(
                "lextract",
                MaterialType::LabeledExtract,
            ))]),
        ];

        let batch = batch_create_assays(&steps, 3);
        assert_eq!(batch.processes.len(), 6);
        assert_eq!(batch.samples.len(), 3);
        assert_eq!(batch.materials.len(), 6);

        let first = &batch.processes[0];
        let second = &batch.processes[1];
        assert_eq!(first.next_process.as_ref(), Some(&second.id));
        assert_eq!(second.prev_process.as_ref(), Some(&first.id));
        assert_eq!(first.outputs, second.inputs);
        // chains are not linked to each other
        assert!(second.next_process.is_none());
        assert!(batch.processes[2].prev_process.is_none());

        let extract = &batch.materials[0];
        assert_eq!(extract.derives_from, vec![batch.samples[0].id.clone()]);
    }
}
