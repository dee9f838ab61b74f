//! Experimental graph built from a process sequence
//!
//! Nodes are materials, data files and processes. Each node gets a
//! sequence identifier: its insertion position. Edges run input -> process
//! -> output, plus process -> next process when a process has no outputs.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::model::{Id, NodeEntity, NodeRef, Process, StudyIndex};

/// Graph node key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GraphNode {
    Node(NodeRef),
    Process(Id),
}

impl GraphNode {
    pub fn id(&self) -> &Id {
        match self {
            GraphNode::Node(n) => n.id(),
            GraphNode::Process(id) => id,
        }
    }

    pub fn is_source(&self) -> bool {
        matches!(self, GraphNode::Node(NodeRef::Source(_)))
    }

    pub fn is_sample(&self) -> bool {
        matches!(self, GraphNode::Node(NodeRef::Sample(_)))
    }

    pub fn is_process(&self) -> bool {
        matches!(self, GraphNode::Process(_))
    }
}

/// An end-to-end path as a list of sequence identifiers
pub type Path = Vec<usize>;

/// Shape of a single process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    Linear,
    /// One input, several outputs
    Split(usize),
    /// Several inputs, one output
    Pool(usize),
    /// Several inputs and outputs
    Mixed { inputs: usize, outputs: usize },
}

#[derive(Debug, Clone, Default)]
struct ProcessLinks {
    inputs: Vec<usize>,
    outputs: Vec<usize>,
    has_prev: bool,
    has_next: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ProcessGraph {
    nodes: Vec<GraphNode>,
    positions: HashMap<GraphNode, usize>,
    successors: Vec<Vec<usize>>,
    predecessors: Vec<Vec<usize>>,
    processes: HashMap<usize, ProcessLinks>,
}

impl ProcessGraph {
    pub fn from_processes(processes: &[Process]) -> Self {
        let mut graph = Self::default();

        for process in processes {
            let p = graph.ensure(GraphNode::Process(process.id.clone()));
            let mut links = ProcessLinks {
                has_prev: process.prev_process.is_some(),
                has_next: process.next_process.is_some(),
                ..Default::default()
            };
            for input in &process.inputs {
                let i = graph.ensure(GraphNode::Node(input.clone()));
                graph.add_edge(i, p);
                links.inputs.push(i);
            }
            for output in &process.outputs {
                let o = graph.ensure(GraphNode::Node(output.clone()));
                graph.add_edge(p, o);
                links.outputs.push(o);
            }
            graph.processes.insert(p, links);
        }

        // Chain links only where a process has no outputs to carry the flow
        for process in processes {
            if !process.outputs.is_empty() {
                continue;
            }
            if let Some(next) = &process.next_process {
                let key = GraphNode::Process(next.clone());
                if let (Some(&from), Some(&to)) = (
                    graph.positions.get(&GraphNode::Process(process.id.clone())),
                    graph.positions.get(&key),
                ) {
                    graph.add_edge(from, to);
                }
            }
        }
        graph
    }

    fn ensure(&mut self, node: GraphNode) -> usize {
        if let Some(&pos) = self.positions.get(&node) {
            return pos;
        }
        let pos = self.nodes.len();
        self.nodes.push(node.clone());
        self.positions.insert(node, pos);
        self.successors.push(Vec::new());
        self.predecessors.push(Vec::new());
        pos
    }

    fn add_edge(&mut self, from: usize, to: usize) {
        if !self.successors[from].contains(&to) {
            self.successors[from].push(to);
            self.predecessors[to].push(from);
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, pos: usize) -> &GraphNode {
        &self.nodes[pos]
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn position(&self, node: &GraphNode) -> Option<usize> {
        self.positions.get(node).copied()
    }

    pub fn successors(&self, pos: usize) -> &[usize] {
        &self.successors[pos]
    }

    pub fn predecessors(&self, pos: usize) -> &[usize] {
        &self.predecessors[pos]
    }

    pub fn edge_count(&self) -> usize {
        self.successors.iter().map(Vec::len).sum()
    }

    /// Materials fed into processes that have no previous process
    pub fn start_nodes(&self) -> Vec<usize> {
        let mut starts = Vec::new();
        for pos in self.process_positions() {
            let links = &self.processes[&pos];
            if links.has_prev {
                continue;
            }
            for &i in &links.inputs {
                if !self.is_data_file(i) && !starts.contains(&i) {
                    starts.push(i);
                }
            }
        }
        starts
    }

    /// Non-data outputs of processes without a next process, or the
    /// process itself when it only outputs data
    pub fn end_nodes(&self) -> Vec<usize> {
        let mut ends = Vec::new();
        for pos in self.process_positions() {
            let links = &self.processes[&pos];
            if links.has_next {
                continue;
            }
            let materials: Vec<usize> = links
                .outputs
                .iter()
                .copied()
                .filter(|&o| !self.is_data_file(o))
                .collect();
            if materials.is_empty() {
                if !ends.contains(&pos) {
                    ends.push(pos);
                }
            } else {
                for m in materials {
                    if !ends.contains(&m) {
                        ends.push(m);
                    }
                }
            }
        }
        ends
    }

    fn process_positions(&self) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|&p| self.nodes[p].is_process())
            .collect()
    }

    fn is_data_file(&self, pos: usize) -> bool {
        matches!(self.nodes[pos], GraphNode::Node(NodeRef::DataFile(_)))
    }

    pub fn topology(&self, process: usize) -> Option<Topology> {
        let links = self.processes.get(&process)?;
        Some(match (links.inputs.len(), links.outputs.len()) {
            (i, o) if i <= 1 && o <= 1 => Topology::Linear,
            (i, o) if i <= 1 => Topology::Split(o),
            (i, o) if o <= 1 => Topology::Pool(i),
            (inputs, outputs) => Topology::Mixed { inputs, outputs },
        })
    }

    /// Every node reachable from `from`, excluding `from`
    pub fn descendants(&self, from: usize) -> HashSet<usize> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([from]);
        while let Some(current) = queue.pop_front() {
            for &next in &self.successors[current] {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        seen.remove(&from);
        seen
    }

    pub fn has_path(&self, from: usize, to: usize) -> bool {
        from == to || self.descendants(from).contains(&to)
    }

    /// Sequence identifiers of all source nodes, in insertion order
    pub fn sources(&self) -> Vec<usize> {
        (0..self.nodes.len()).filter(|&p| self.nodes[p].is_source()).collect()
    }

    pub fn samples(&self) -> Vec<usize> {
        (0..self.nodes.len()).filter(|&p| self.nodes[p].is_sample()).collect()
    }

    /// All simple paths from each start to its ends
    ///
    /// A Source start ends at Samples without outgoing edges; any other
    /// start ends at sink nodes. A process whose input and output counts
    /// match (and exceed one) pairs them by index; any other process
    /// connects every input to every output.
    pub fn end_to_end_paths(&self, starts: &[usize]) -> Vec<Path> {
        let mut paths = Vec::new();
        for &start in starts {
            let source_start = self.nodes[start].is_source();
            let mut path = vec![start];
            let mut on_path = HashSet::from([start]);
            self.walk(start, None, source_start, &mut path, &mut on_path, &mut paths);
        }
        tracing::debug!(starts = starts.len(), paths = paths.len(), "enumerated end-to-end paths");
        paths
    }

    fn walk(
        &self,
        current: usize,
        came_from: Option<usize>,
        source_start: bool,
        path: &mut Path,
        on_path: &mut HashSet<usize>,
        out: &mut Vec<Path>,
    ) {
        let successors = self.allowed_successors(current, came_from);
        let is_sink = self.successors[current].is_empty();
        if path.len() > 1 {
            let is_end = if source_start {
                self.nodes[current].is_sample() && is_sink
            } else {
                is_sink
            };
            if is_end {
                out.push(path.clone());
                return;
            }
        }
        for next in successors {
            if on_path.insert(next) {
                path.push(next);
                self.walk(next, Some(current), source_start, path, on_path, out);
                path.pop();
                on_path.remove(&next);
            }
        }
    }

    fn allowed_successors(&self, current: usize, came_from: Option<usize>) -> Vec<usize> {
        if let (Some(links), Some(from)) = (self.processes.get(&current), came_from) {
            let paired = links.inputs.len() == links.outputs.len() && links.inputs.len() > 1;
            if paired {
                if let Some(i) = links.inputs.iter().position(|&x| x == from) {
                    return vec![links.outputs[i]];
                }
            }
        }
        self.successors[current].clone()
    }

    /// Weight of a path: node count plus the attribute columns each node needs
    pub fn path_weight(&self, path: &[usize], index: &StudyIndex) -> usize {
        let mut weight = path.len();
        for &pos in path {
            match &self.nodes[pos] {
                GraphNode::Node(node) => {
                    if let Some(entity) = index.node(node) {
                        weight += match entity {
                            NodeEntity::Sample(s) => s.characteristics.len() + s.factor_values.len(),
                            other => other.characteristics().len(),
                        };
                        weight += entity.comments().len();
                    }
                }
                GraphNode::Process(id) => {
                    if let Some(p) = index.process(id) {
                        weight += p.outputs.iter().filter(|o| o.is_data_file()).count();
                        weight += usize::from(p.date.is_some());
                        weight += usize::from(p.performer.is_some());
                        weight += usize::from(!p.name.is_empty());
                        weight += p.comments.len();
                    }
                }
            }
        }
        weight
    }

    fn start_name<'a>(&self, path: &[usize], index: &StudyIndex<'a>) -> &'a str {
        path.first()
            .and_then(|&pos| match &self.nodes[pos] {
                GraphNode::Node(node) => index.node(node).map(|e| e.name()),
                GraphNode::Process(_) => None,
            })
            .unwrap_or("")
    }

    /// Heaviest path; ties go to the smaller start-node name, then to the
    /// earlier path
    pub fn canonical_path<'p>(&self, paths: &'p [Path], index: &StudyIndex) -> Option<&'p Path> {
        let mut best: Option<(usize, &str, &'p Path)> = None;
        for path in paths {
            let weight = self.path_weight(path, index);
            let name = self.start_name(path, index);
            let better = match best {
                None => true,
                Some((w, n, _)) => weight > w || (weight == w && name < n),
            };
            if better {
                best = Some((weight, name, path));
            }
        }
        best.map(|(_, _, path)| path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DataFile, DataFileKind, Material, MaterialType, Protocol, Sample, Source, Study};

    fn collection_study(sources: usize, samples: usize) -> Study {
        let mut study = Study::new("s_test.txt");
        let protocol = Protocol::new("sample collection");
        let mut process = Process::new(protocol.id.clone());
        for i in 1..=sources {
            let s = Source::new(format!("source{}", i));
            process.inputs.push(NodeRef::Source(s.id.clone()));
            study.sources.push(s);
        }
        for i in 1..=samples {
            let s = Sample::new(format!("sample{}", i));
            process.outputs.push(NodeRef::Sample(s.id.clone()));
            study.samples.push(s);
        }
        study.protocols.push(protocol);
        study.process_sequence.push(process);
        study
    }

    #[test]
    fn test_split_gives_one_path_per_sample() {
        let study = collection_study(1, 4);
        let graph = study.graph().unwrap();
        let paths = graph.end_to_end_paths(&graph.sources());
        assert_eq!(paths.len(), 4);
        assert_eq!(graph.topology(0), Some(Topology::Split(4)));
    }

    #[test]
    fn test_pool_gives_one_path_per_source() {
        let study = collection_study(4, 1);
        let graph = study.graph().unwrap();
        assert_eq!(graph.end_to_end_paths(&graph.sources()).len(), 4);
        assert_eq!(graph.topology(0), Some(Topology::Pool(4)));
    }

    #[test]
    fn test_matching_counts_pair_by_index() {
        let study = collection_study(3, 3);
        let graph = study.graph().unwrap();
        let paths = graph.end_to_end_paths(&graph.sources());
        assert_eq!(paths.len(), 3);
        let index = StudyIndex::new(&study);
        for path in &paths {
            let first = match graph.node(path[0]) {
                GraphNode::Node(n) => index.node(n).unwrap().name(),
                _ => unreachable!(),
            };
            let last = match graph.node(*path.last().unwrap()) {
                GraphNode::Node(n) => index.node(n).unwrap().name(),
                _ => unreachable!(),
            };
            assert_eq!(first.trim_start_matches("source"), last.trim_start_matches("sample"));
        }
    }

    #[test]
    fn test_mismatched_counts_use_cartesian_product() {
        let study = collection_study(2, 3);
        let graph = study.graph().unwrap();
        assert_eq!(graph.end_to_end_paths(&graph.sources()).len(), 6);
    }

    #[test]
    fn test_assay_chain_ends_at_data_file() {
        let mut study = Study::new("s.txt");
        let extraction = Protocol::new("extraction");
        let sequencing = Protocol::new("sequencing");
        let sample = Sample::new("sample1");
        let extract = Material::new("extract1", MaterialType::Extract);
        let data = DataFile::new("raw1.fastq", DataFileKind::Raw);

        let mut p1 = Process::new(extraction.id.clone());
        p1.inputs.push(NodeRef::Sample(sample.id.clone()));
        p1.outputs.push(NodeRef::Material(extract.id.clone()));
        let mut p2 = Process::new(sequencing.id.clone());
        p2.inputs.push(NodeRef::Material(extract.id.clone()));
        p2.outputs.push(NodeRef::DataFile(data.id.clone()));
        crate::model::plink(&mut p1, &mut p2);

        let processes = vec![p1, p2];
        let graph = ProcessGraph::from_processes(&processes);
        let starts = graph.start_nodes();
        assert_eq!(starts.len(), 1);
        assert!(graph.node(starts[0]).is_sample());
        let ends = graph.end_nodes();
        assert_eq!(ends.len(), 1);
        assert!(graph.node(ends[0]).is_process());

        let paths = graph.end_to_end_paths(&graph.samples());
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].len(), 5);
        assert!(graph.has_path(starts[0], ends[0]));

        study.samples.push(sample);
        study.protocols.extend([extraction, sequencing]);
        let index = StudyIndex::new(&study);
        assert!(graph.canonical_path(&paths, &index).is_some());
    }

    #[test]
    fn test_chain_edge_when_process_has_no_outputs() {
        let protocol = Protocol::new("p");
        let sample = Sample::new("s");
        let mut p1 = Process::new(protocol.id.clone());
        p1.inputs.push(NodeRef::Sample(sample.id.clone()));
        let mut p2 = Process::new(protocol.id.clone());
        crate::model::plink(&mut p1, &mut p2);
        let graph = ProcessGraph::from_processes(&[p1, p2]);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.end_to_end_paths(&graph.samples()).len(), 1);
    }

    #[test]
    fn test_canonical_path_prefers_weight_then_name() {
        let mut study = collection_study(2, 2);
        // sample2 carries an extra characteristic; with index pairing
        // the path through source2 is heavier
        study.samples[1].characteristics.push(crate::model::Characteristic::new(
            crate::model::OntologyAnnotation::new("organism"),
            "Mus musculus".into(),
        ));
        let graph = study.graph().unwrap();
        let paths = graph.end_to_end_paths(&graph.sources());
        let index = StudyIndex::new(&study);
        let best = graph.canonical_path(&paths, &index).unwrap();
        let GraphNode::Node(start) = graph.node(best[0]) else {
            panic!("path must start at a material");
        };
        assert_eq!(index.node(start).unwrap().name(), "source2");

        study.samples[1].characteristics.clear();
        let index = StudyIndex::new(&study);
        let best = graph.canonical_path(&paths, &index).unwrap();
        let GraphNode::Node(start) = graph.node(best[0]) else {
            panic!("path must start at a material");
        };
        assert_eq!(index.node(start).unwrap().name(), "source1");
    }
}
