//! ISA-JSON → object model
//!
//! Two passes per study. The first allocates every entity carrying an
//! `@id` and indexes it; the second builds attributes and processes,
//! resolving each reference against that index. Dangling references are
//! reported (or fatal in strict mode) and dropped, except the executed
//! protocol of a process which is kept as written.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use super::dto::*;
use super::schema::schema_errors;
use super::{JsonOptions, ARRAY_DESIGN_COMMENT};
use crate::error::IsaError;
use crate::errors::{Code, Finding, ValidationReport};
use crate::model::{
    Assay, Characteristic, Comment, DataFile, DataFileKind, FactorValue, Id, IdKind, Investigation, Material,
    MaterialType, Measured, NodeRef, OntologyAnnotation, OntologySource, ParameterValue, Person, Process, Protocol,
    ProtocolComponent, ProtocolParameter, Publication, Sample, Source, Study, StudyFactor, Unit, Value,
};

/// Where unresolved references go
struct Resolver<'r> {
    report: &'r mut ValidationReport,
    strict: bool,
}

impl Resolver<'_> {
    fn unresolved(&mut self, code: Code, reference: &str, context: &str) -> Result<(), IsaError> {
        if self.strict {
            return Err(IsaError::UnresolvedReference {
                reference: reference.to_string(),
                context: context.to_string(),
            });
        }
        self.report.add(Finding::new(
            code,
            format!("'{}' referenced by {} is not declared", reference, context),
        ));
        Ok(())
    }
}

fn id_or_mint(id: &str, kind: IdKind) -> Id {
    if id.is_empty() {
        Id::mint(kind)
    } else {
        Id::new(id)
    }
}

fn comments(docs: &[CommentDoc]) -> Vec<Comment> {
    docs.iter().map(|c| Comment::new(c.name.as_str(), c.value.as_str())).collect()
}

fn annotation(doc: &AnnotationDoc, kind: IdKind) -> OntologyAnnotation {
    OntologyAnnotation {
        id: id_or_mint(&doc.id, kind),
        term: doc.annotation_value.clone(),
        term_source: doc.term_source.clone(),
        term_accession: doc.term_accession.clone(),
        comments: comments(&doc.comments),
    }
}

fn term(doc: &AnnotationDoc) -> OntologyAnnotation {
    annotation(doc, IdKind::OntologyAnnotation)
}

fn value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::String(s) => Value::Text(s.clone()),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n.as_f64().map(Value::Float).unwrap_or_else(|| Value::Text(n.to_string())),
        },
        serde_json::Value::Object(_) => match serde_json::from_value::<AnnotationDoc>(json.clone()) {
            Ok(doc) => Value::Term(term(&doc)),
            Err(_) => Value::Text(json.to_string()),
        },
        serde_json::Value::Null => Value::default(),
        other => Value::Text(other.to_string()),
    }
}

/// Identifier index of one study, extended per assay
#[derive(Debug, Clone, Default)]
struct Scope {
    protocols: HashSet<Id>,
    parameters: HashSet<Id>,
    factors: HashSet<Id>,
    categories: HashMap<String, OntologyAnnotation>,
    units: HashMap<String, OntologyAnnotation>,
    nodes: HashMap<String, NodeRef>,
    processes: HashSet<String>,
}

impl Scope {
    fn declare_categories(&mut self, docs: &[CategoryDoc]) -> Vec<OntologyAnnotation> {
        docs.iter()
            .map(|doc| {
                let mut category = annotation(&doc.characteristic_type, IdKind::CharacteristicCategory);
                category.id = id_or_mint(&doc.id, IdKind::CharacteristicCategory);
                self.categories.insert(category.id.to_string(), category.clone());
                category
            })
            .collect()
    }

    fn declare_units(&mut self, docs: &[AnnotationDoc]) -> Vec<OntologyAnnotation> {
        docs.iter()
            .map(|doc| {
                let unit = annotation(doc, IdKind::Unit);
                self.units.insert(unit.id.to_string(), unit.clone());
                unit
            })
            .collect()
    }

    /// Index one node per document and return their identifiers, minting
    /// the ones with an empty `@id`
    fn declare_nodes<T>(&mut self, docs: &[T], node: impl Fn(&T) -> NodeRef) -> Vec<Id> {
        docs.iter()
            .map(|doc| {
                let node = node(doc);
                let id = node.id().clone();
                self.nodes.insert(id.to_string(), node);
                id
            })
            .collect()
    }

    fn unit(&self, unit: Option<&IdRef>, context: &str, r: &mut Resolver) -> Result<Option<Unit>, IsaError> {
        let Some(unit) = unit else {
            return Ok(None);
        };
        match self.units.get(&unit.id) {
            Some(oa) => Ok(Some(Unit::Term(oa.clone()))),
            None => {
                r.unresolved(Code::UnitLink, &unit.id, context)?;
                Ok(None)
            }
        }
    }

    fn characteristics(
        &self,
        docs: &[AttributeDoc],
        context: &str,
        r: &mut Resolver,
    ) -> Result<Vec<Characteristic>, IsaError> {
        let mut out = Vec::with_capacity(docs.len());
        for doc in docs {
            let Some(category) = self.categories.get(&doc.category.id) else {
                r.unresolved(Code::CharacteristicCategoryLink, &doc.category.id, context)?;
                continue;
            };
            let mut characteristic = Characteristic::new(category.clone(), value(&doc.value));
            characteristic.set_unit(self.unit(doc.unit.as_ref(), context, r)?)?;
            characteristic.comments = comments(&doc.comments);
            out.push(characteristic);
        }
        Ok(out)
    }

    fn factor_values(&self, docs: &[AttributeDoc], context: &str, r: &mut Resolver) -> Result<Vec<FactorValue>, IsaError> {
        let mut out = Vec::with_capacity(docs.len());
        for doc in docs {
            let factor = Id::new(&doc.category.id);
            if !self.factors.contains(&factor) {
                r.unresolved(Code::FactorRef, &doc.category.id, context)?;
                continue;
            }
            let mut fv = FactorValue::new(factor, value(&doc.value));
            fv.set_unit(self.unit(doc.unit.as_ref(), context, r)?)?;
            out.push(fv);
        }
        Ok(out)
    }

    fn parameter_values(
        &self,
        docs: &[AttributeDoc],
        context: &str,
        r: &mut Resolver,
    ) -> Result<Vec<ParameterValue>, IsaError> {
        let mut out = Vec::with_capacity(docs.len());
        for doc in docs {
            let parameter = Id::new(&doc.category.id);
            if !self.parameters.contains(&parameter) {
                r.unresolved(Code::ParameterRef, &doc.category.id, context)?;
                continue;
            }
            let mut pv = ParameterValue::new(parameter, value(&doc.value));
            pv.set_unit(self.unit(doc.unit.as_ref(), context, r)?)?;
            pv.comments = comments(&doc.comments);
            out.push(pv);
        }
        Ok(out)
    }

    fn node(&self, reference: &IdRef, context: &str, r: &mut Resolver) -> Result<Option<NodeRef>, IsaError> {
        if let Some(node) = self.nodes.get(&reference.id) {
            return Ok(Some(node.clone()));
        }
        r.unresolved(Code::node_link(&reference.id), &reference.id, context)?;
        Ok(None)
    }

    fn upstream(&self, docs: &[IdRef], context: &str, r: &mut Resolver) -> Result<Vec<Id>, IsaError> {
        let mut out = Vec::with_capacity(docs.len());
        for doc in docs {
            if let Some(node) = self.node(doc, context, r)? {
                out.push(node.id().clone());
            }
        }
        Ok(out)
    }

    fn process_link(&self, link: Option<&IdRef>, context: &str, r: &mut Resolver) -> Result<Option<Id>, IsaError> {
        let Some(link) = link else {
            return Ok(None);
        };
        if self.processes.contains(&link.id) {
            return Ok(Some(Id::new(&link.id)));
        }
        r.unresolved(Code::ProcessLink, &link.id, context)?;
        Ok(None)
    }

    fn process(&self, doc: &ProcessDoc, r: &mut Resolver) -> Result<Process, IsaError> {
        let context = format!("process '{}'", doc.id);
        let protocol = Id::new(&doc.executes_protocol.id);
        if !self.protocols.contains(&protocol) {
            r.unresolved(Code::ProtocolRef, &doc.executes_protocol.id, &context)?;
        }
        let mut process = Process::with_id(id_or_mint(&doc.id, IdKind::Process), protocol);
        process.name = doc.name.clone();
        process.performer = doc.performer.clone();
        process.date = doc.date.clone();
        process.parameter_values = self.parameter_values(&doc.parameter_values, &context, r)?;
        for input in &doc.inputs {
            if let Some(node) = self.node(input, &context, r)? {
                process.add_input(node);
            }
        }
        for output in &doc.outputs {
            if let Some(node) = self.node(output, &context, r)? {
                process.add_output(node);
            }
        }
        process.prev_process = self.process_link(doc.previous_process.as_ref(), &context, r)?;
        process.next_process = self.process_link(doc.next_process.as_ref(), &context, r)?;
        for comment in comments(&doc.comments) {
            if comment.name == ARRAY_DESIGN_COMMENT {
                process.array_design_ref = Some(comment.value);
            } else {
                process.comments.push(comment);
            }
        }
        Ok(process)
    }

    fn sample(&self, doc: &SampleDoc, id: Id, r: &mut Resolver) -> Result<Sample, IsaError> {
        let context = format!("sample '{}'", doc.name);
        let mut sample = Sample::new(doc.name.as_str());
        sample.id = id;
        sample.characteristics = self.characteristics(&doc.characteristics, &context, r)?;
        sample.factor_values = self.factor_values(&doc.factor_values, &context, r)?;
        sample.derives_from = self.upstream(&doc.derives_from, &context, r)?;
        sample.comments = comments(&doc.comments);
        Ok(sample)
    }

    fn material(&self, doc: &MaterialDoc, id: Id, r: &mut Resolver) -> Result<Material, IsaError> {
        let context = format!("material '{}'", doc.name);
        let mut material = Material::from_label(doc.name.as_str(), &doc.material_type)?;
        material.id = id;
        material.characteristics = self.characteristics(&doc.characteristics, &context, r)?;
        material.derives_from = self.upstream(&doc.derives_from, &context, r)?;
        material.comments = comments(&doc.comments);
        Ok(material)
    }

    fn data_file(&self, doc: &DataFileDoc, id: Id, r: &mut Resolver) -> Result<DataFile, IsaError> {
        let context = format!("data file '{}'", doc.name);
        let mut data_file = DataFile::new(doc.name.as_str(), DataFileKind::from_label(&doc.kind)?);
        data_file.id = id;
        data_file.generated_from = self.upstream(&doc.derives_from, &context, r)?;
        data_file.comments = comments(&doc.comments);
        Ok(data_file)
    }
}

fn material_kind(doc: &MaterialDoc) -> IdKind {
    MaterialType::from_label(&doc.material_type)
        .map(|t| t.id_kind())
        .unwrap_or(IdKind::Material)
}

fn protocol(doc: &ProtocolDoc) -> Protocol {
    let mut protocol = Protocol::new(doc.name.as_str());
    protocol.id = id_or_mint(&doc.id, IdKind::Protocol);
    protocol.protocol_type = doc.protocol_type.as_ref().map(term);
    protocol.description = doc.description.clone();
    protocol.uri = doc.uri.clone();
    protocol.version = doc.version.clone();
    protocol.parameters = doc
        .parameters
        .iter()
        .map(|p| {
            let mut parameter = ProtocolParameter::new(term(&p.parameter_name));
            parameter.id = id_or_mint(&p.id, IdKind::Parameter);
            parameter
        })
        .collect();
    protocol.components = doc
        .components
        .iter()
        .map(|c| ProtocolComponent {
            name: c.component_name.clone(),
            component_type: c.component_type.as_ref().map(term),
            comments: Vec::new(),
        })
        .collect();
    protocol.comments = comments(&doc.comments);
    protocol
}

fn factor(doc: &FactorDoc) -> StudyFactor {
    let mut factor = StudyFactor::new(doc.factor_name.as_str());
    factor.id = id_or_mint(&doc.id, IdKind::Factor);
    factor.factor_type = doc.factor_type.as_ref().map(term);
    factor.comments = comments(&doc.comments);
    factor
}

fn person(doc: &PersonDoc) -> Person {
    Person {
        last_name: doc.last_name.clone(),
        first_name: doc.first_name.clone(),
        mid_initials: doc.mid_initials.clone(),
        email: doc.email.clone(),
        phone: doc.phone.clone(),
        fax: doc.fax.clone(),
        address: doc.address.clone(),
        affiliation: doc.affiliation.clone(),
        roles: doc.roles.iter().map(term).collect(),
        comments: comments(&doc.comments),
    }
}

fn publication(doc: &PublicationDoc) -> Publication {
    Publication {
        pubmed_id: doc.pubmed_id.clone(),
        doi: doc.doi.clone(),
        author_list: doc.author_list.clone(),
        title: doc.title.clone(),
        status: doc.status.as_ref().map(term),
        comments: comments(&doc.comments),
    }
}

fn ontology_source(doc: &OntologySourceDoc) -> OntologySource {
    OntologySource {
        name: doc.name.clone(),
        file: doc.file.clone(),
        version: doc.version.clone(),
        description: doc.description.clone(),
        comments: comments(&doc.comments),
    }
}

fn read_assay(doc: &AssayDoc, study_scope: &Scope, r: &mut Resolver) -> Result<Assay, IsaError> {
    let mut scope = study_scope.clone();
    let mut assay = Assay::new(doc.filename.as_str());
    assay.measurement_type = term(&doc.measurement_type);
    assay.technology_type = term(&doc.technology_type);
    assay.technology_platform = doc.technology_platform.clone();
    assay.comments = comments(&doc.comments);

    // pass 1
    assay.characteristic_categories = scope.declare_categories(&doc.characteristic_categories);
    assay.units = scope.declare_units(&doc.unit_categories);
    let sample_ids = scope.declare_nodes(&doc.materials.samples, |s| {
        NodeRef::Sample(id_or_mint(&s.id, IdKind::Sample))
    });
    let material_ids = scope.declare_nodes(&doc.materials.other_materials, |m| {
        NodeRef::Material(id_or_mint(&m.id, material_kind(m)))
    });
    let data_file_ids = scope.declare_nodes(&doc.data_files, |d| {
        NodeRef::DataFile(id_or_mint(&d.id, IdKind::DataFile))
    });
    scope.processes = doc.process_sequence.iter().map(|p| p.id.clone()).collect();

    // pass 2
    for (s, id) in doc.materials.samples.iter().zip(sample_ids) {
        assay.samples.push(scope.sample(s, id, r)?);
    }
    for (m, id) in doc.materials.other_materials.iter().zip(material_ids) {
        assay.other_material.push(scope.material(m, id, r)?);
    }
    for (d, id) in doc.data_files.iter().zip(data_file_ids) {
        assay.data_files.push(scope.data_file(d, id, r)?);
    }
    for p in &doc.process_sequence {
        assay.process_sequence.push(scope.process(p, r)?);
    }
    Ok(assay)
}

fn read_study(doc: &StudyDoc, r: &mut Resolver) -> Result<Study, IsaError> {
    let mut study = Study::new(doc.filename.as_str());
    study.identifier = doc.identifier.clone();
    study.title = doc.title.clone();
    study.description = doc.description.clone();
    study.submission_date = doc.submission_date.clone();
    study.public_release_date = doc.public_release_date.clone();
    study.publications = doc.publications.iter().map(publication).collect();
    study.contacts = doc.people.iter().map(person).collect();
    study.design_descriptors = doc.study_design_descriptors.iter().map(term).collect();
    study.comments = comments(&doc.comments);

    // pass 1
    let mut scope = Scope::default();
    study.protocols = doc.protocols.iter().map(protocol).collect();
    for p in &study.protocols {
        scope.protocols.insert(p.id.clone());
        scope.parameters.extend(p.parameters.iter().map(|param| param.id.clone()));
    }
    study.factors = doc.factors.iter().map(factor).collect();
    scope.factors = study.factors.iter().map(|f| f.id.clone()).collect();
    study.characteristic_categories = scope.declare_categories(&doc.characteristic_categories);
    study.units = scope.declare_units(&doc.unit_categories);
    let source_ids = scope.declare_nodes(&doc.materials.sources, |s| {
        NodeRef::Source(id_or_mint(&s.id, IdKind::Source))
    });
    let sample_ids = scope.declare_nodes(&doc.materials.samples, |s| {
        NodeRef::Sample(id_or_mint(&s.id, IdKind::Sample))
    });
    let material_ids = scope.declare_nodes(&doc.materials.other_materials, |m| {
        NodeRef::Material(id_or_mint(&m.id, material_kind(m)))
    });
    scope.processes = doc.process_sequence.iter().map(|p| p.id.clone()).collect();

    // pass 2
    for (s, id) in doc.materials.sources.iter().zip(source_ids) {
        let context = format!("source '{}'", s.name);
        let mut source = Source::new(s.name.as_str());
        source.id = id;
        source.characteristics = scope.characteristics(&s.characteristics, &context, r)?;
        source.comments = comments(&s.comments);
        study.sources.push(source);
    }
    for (s, id) in doc.materials.samples.iter().zip(sample_ids) {
        study.samples.push(scope.sample(s, id, r)?);
    }
    for (m, id) in doc.materials.other_materials.iter().zip(material_ids) {
        study.other_material.push(scope.material(m, id, r)?);
    }
    for p in &doc.process_sequence {
        study.process_sequence.push(scope.process(p, r)?);
    }
    for a in &doc.assays {
        study.assays.push(read_assay(a, &scope, r)?);
    }
    tracing::debug!(
        study = %study.identifier,
        processes = study.process_sequence.len(),
        assays = study.assays.len(),
        "read study"
    );
    Ok(study)
}

fn read_document(name: &str, text: &str, options: &JsonOptions) -> Result<(Investigation, ValidationReport), IsaError> {
    let document: serde_json::Value = serde_json::from_str(text)?;
    let mut report = ValidationReport::new(name);

    let violations = schema_errors(&document)?;
    if !violations.is_empty() {
        if options.strict {
            return Err(IsaError::SchemaFailed {
                details: violations.join("; "),
            });
        }
        for violation in violations {
            report.add(Finding::new(Code::JsonSchema, violation));
        }
    }

    let doc: InvestigationDoc = serde_json::from_value(document)?;
    let mut investigation = Investigation::new();
    if !doc.filename.is_empty() {
        investigation.filename = doc.filename.clone();
    }
    investigation.identifier = doc.identifier.clone();
    investigation.title = doc.title.clone();
    investigation.description = doc.description.clone();
    investigation.submission_date = doc.submission_date.clone();
    investigation.public_release_date = doc.public_release_date.clone();
    investigation.ontology_source_references = doc.ontology_source_references.iter().map(ontology_source).collect();
    investigation.publications = doc.publications.iter().map(publication).collect();
    investigation.contacts = doc.people.iter().map(person).collect();
    investigation.comments = comments(&doc.comments);

    let mut resolver = Resolver {
        report: &mut report,
        strict: options.strict,
    };
    for study in &doc.studies {
        investigation.studies.push(read_study(study, &mut resolver)?);
    }

    report.validation_finished = true;
    tracing::info!(
        file = name,
        studies = investigation.studies.len(),
        errors = report.errors.len(),
        "loaded ISA-JSON"
    );
    Ok((investigation, report))
}

/// Read an investigation from ISA-JSON text
pub fn loads(text: &str, options: &JsonOptions) -> Result<(Investigation, ValidationReport), IsaError> {
    read_document("investigation.json", text, options)
}

/// Read an investigation from an ISA-JSON file
pub fn load(path: &Path, options: &JsonOptions) -> Result<(Investigation, ValidationReport), IsaError> {
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8(bytes).map_err(|_| IsaError::NotUtf8 { path: path.to_path_buf() })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    read_document(&name, &text, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> serde_json::Value {
        json!({
            "identifier": "i1",
            "studies": [{
                "filename": "s_study.txt",
                "identifier": "s1",
                "protocols": [{
                    "@id": "#protocol/collect",
                    "name": "sample collection",
                    "parameters": [{ "@id": "#parameter/temp", "parameterName": { "annotationValue": "temperature" } }]
                }],
                "factors": [{ "@id": "#factor/dose", "factorName": "dose" }],
                "characteristicCategories": [{
                    "@id": "#characteristic_category/organism",
                    "characteristicType": { "annotationValue": "organism" }
                }],
                "unitCategories": [{ "@id": "#unit/celsius", "annotationValue": "degree Celsius" }],
                "materials": {
                    "sources": [{
                        "@id": "#source/s1",
                        "name": "source1",
                        "characteristics": [{
                            "category": { "@id": "#characteristic_category/organism" },
                            "value": { "annotationValue": "Homo sapiens", "termSource": "NCBITAXON", "termAccession": "9606" }
                        }]
                    }],
                    "samples": [{
                        "@id": "#sample/a",
                        "name": "sample1",
                        "factorValues": [{ "category": { "@id": "#factor/dose" }, "value": 5 }],
                        "derivesFrom": [{ "@id": "#source/s1" }]
                    }],
                    "otherMaterials": []
                },
                "processSequence": [{
                    "@id": "#process/p1",
                    "executesProtocol": { "@id": "#protocol/collect" },
                    "parameterValues": [{
                        "category": { "@id": "#parameter/temp" },
                        "value": 37.5,
                        "unit": { "@id": "#unit/celsius" }
                    }],
                    "inputs": [{ "@id": "#source/s1" }],
                    "outputs": [{ "@id": "#sample/a" }]
                }],
                "assays": [{
                    "filename": "a_assay.txt",
                    "materials": { "samples": [{ "@id": "#sample/a", "name": "sample1" }], "otherMaterials": [] },
                    "dataFiles": [{ "@id": "#data/raw1", "name": "raw1.cel", "type": "Raw Data File" }],
                    "processSequence": [{
                        "@id": "#process/p2",
                        "executesProtocol": { "@id": "#protocol/collect" },
                        "inputs": [{ "@id": "#sample/a" }],
                        "outputs": [{ "@id": "#data/raw1" }]
                    }]
                }]
            }]
        })
    }

    fn read(doc: &serde_json::Value, strict: bool) -> Result<(Investigation, ValidationReport), IsaError> {
        loads(&doc.to_string(), &JsonOptions { strict })
    }

    #[test]
    fn test_resolves_every_reference() {
        let (investigation, report) = read(&document(), false).unwrap();
        assert!(report.is_valid(), "{:?}", report.errors);
        assert!(report.warnings.is_empty());

        let study = &investigation.studies[0];
        assert_eq!(study.sources[0].characteristics[0].value().as_term().unwrap().term_accession, "9606");
        assert_eq!(study.samples[0].derives_from, vec![Id::new("#source/s1")]);
        assert_eq!(study.samples[0].factor_values[0].value(), &Value::Integer(5));

        let process = &study.process_sequence[0];
        assert_eq!(process.inputs, vec![NodeRef::Source(Id::new("#source/s1"))]);
        assert_eq!(process.outputs, vec![NodeRef::Sample(Id::new("#sample/a"))]);
        assert_eq!(process.parameter_values[0].value(), &Value::Float(37.5));
        assert_eq!(process.parameter_values[0].unit().map(|u| u.term()), Some("degree Celsius"));

        let assay = &study.assays[0];
        assert_eq!(assay.process_sequence[0].outputs, vec![NodeRef::DataFile(Id::new("#data/raw1"))]);
        assert_eq!(assay.data_files[0].kind, DataFileKind::Raw);
    }

    #[test]
    fn test_dangling_references_are_reported_and_dropped() {
        let mut doc = document();
        let process = &mut doc["studies"][0]["processSequence"][0];
        process["inputs"] = json!([{ "@id": "#source/ghost" }]);
        process["executesProtocol"] = json!({ "@id": "#protocol/ghost" });
        process["nextProcess"] = json!({ "@id": "#process/ghost" });
        doc["studies"][0]["materials"]["sources"][0]["characteristics"][0]["category"] =
            json!({ "@id": "#characteristic_category/ghost" });

        let (investigation, report) = read(&doc, false).unwrap();
        let codes = report.codes();
        assert!(codes.contains(&1002));
        assert!(codes.contains(&1006));
        assert!(codes.contains(&1007));
        assert!(codes.contains(&1014));

        let process = &investigation.studies[0].process_sequence[0];
        assert!(process.inputs.is_empty());
        assert!(process.next_process.is_none());
        assert_eq!(process.executes_protocol, Id::new("#protocol/ghost"));
        assert!(investigation.studies[0].sources[0].characteristics.is_empty());
    }

    #[test]
    fn test_empty_ids_are_minted_once() {
        let docs = vec![
            SampleDoc { name: "s1".to_string(), ..Default::default() },
            SampleDoc { name: "s2".to_string(), ..Default::default() },
        ];
        let mut scope = Scope::default();
        let ids = scope.declare_nodes(&docs, |s| NodeRef::Sample(id_or_mint(&s.id, IdKind::Sample)));

        let mut report = ValidationReport::new("test");
        let mut r = Resolver { report: &mut report, strict: true };
        let samples: Vec<Sample> = docs
            .iter()
            .zip(ids)
            .map(|(doc, id)| scope.sample(doc, id, &mut r).unwrap())
            .collect();

        assert_eq!(scope.nodes.len(), 2);
        assert_ne!(samples[0].id, samples[1].id);
        for sample in &samples {
            assert!(sample.id.as_str().starts_with("#sample/"));
            assert_eq!(scope.nodes.get(sample.id.as_str()), Some(&NodeRef::Sample(sample.id.clone())));
        }
    }

    #[test]
    fn test_strict_mode_fails_on_dangling_reference() {
        let mut doc = document();
        doc["studies"][0]["materials"]["samples"][0]["factorValues"][0]["category"] = json!({ "@id": "#factor/ghost" });
        let err = read(&doc, true).unwrap_err();
        assert!(matches!(err, IsaError::UnresolvedReference { ref reference, .. } if reference == "#factor/ghost"));
    }

    #[test]
    fn test_schema_violation_reported_or_fatal() {
        let mut doc = document();
        doc["studies"][0]["processSequence"][0]
            .as_object_mut()
            .unwrap()
            .remove("executesProtocol");

        assert!(matches!(read(&doc, true), Err(IsaError::SchemaFailed { .. })));
        let (_, report) = read(&doc, false).unwrap();
        assert!(report.codes().contains(&2));
        assert!(report.codes().contains(&1007));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            loads("{ not json", &JsonOptions::default()),
            Err(IsaError::JsonParse(_))
        ));
    }

    #[test]
    fn test_non_utf8_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, [0x7b, 0xff, 0xfe, 0x7d]).unwrap();
        assert!(matches!(
            load(&path, &JsonOptions::default()),
            Err(IsaError::NotUtf8 { .. })
        ));
    }
}
