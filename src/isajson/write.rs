//! Object model → ISA-JSON

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde_json::json;

use super::dto::*;
use super::ARRAY_DESIGN_COMMENT;
use crate::error::IsaError;
use crate::model::{
    Assay, Characteristic, Comment, DataFile, FactorValue, Id, IdKind, Investigation, Material, Measured,
    OntologyAnnotation, OntologySource, ParameterValue, Person, Process, Protocol, Publication, Sample, Source,
    Study, StudyFactor, Unit, Value,
};

/// Characteristic categories and units referenced inside one study or assay
///
/// Every category or unit seen while serializing gets an entry in the
/// owning study's (or assay's) top-level lists, so attributes can point at
/// it by `@id`. An assay scope also sees what its study already declared.
struct Scope<'p> {
    parent: Option<&'p Scope<'p>>,
    seen: HashSet<Id>,
    text_units: HashMap<String, Id>,
    categories: Vec<CategoryDoc>,
    units: Vec<AnnotationDoc>,
}

impl<'p> Scope<'p> {
    fn new(parent: Option<&'p Scope<'p>>, categories: &[OntologyAnnotation], units: &[OntologyAnnotation]) -> Self {
        let mut scope = Self {
            parent,
            seen: HashSet::new(),
            text_units: HashMap::new(),
            categories: Vec::new(),
            units: Vec::new(),
        };
        for category in categories {
            scope.declare_category(category);
        }
        for unit in units {
            scope.declare_unit(unit);
        }
        scope
    }

    fn knows(&self, id: &Id) -> bool {
        self.seen.contains(id) || self.parent.is_some_and(|p| p.knows(id))
    }

    fn text_unit(&self, term: &str) -> Option<Id> {
        self.text_units
            .get(term)
            .cloned()
            .or_else(|| self.parent.and_then(|p| p.text_unit(term)))
    }

    fn declare_category(&mut self, category: &OntologyAnnotation) {
        if self.seen.insert(category.id.clone()) {
            self.categories.push(CategoryDoc {
                id: category.id.to_string(),
                characteristic_type: annotation(category),
            });
        }
    }

    fn declare_unit(&mut self, unit: &OntologyAnnotation) {
        if self.seen.insert(unit.id.clone()) {
            self.text_units.entry(unit.term.clone()).or_insert_with(|| unit.id.clone());
            self.units.push(annotation(unit));
        }
    }

    fn category(&mut self, category: &OntologyAnnotation) -> IdRef {
        if !self.knows(&category.id) {
            self.declare_category(category);
        }
        IdRef::new(category.id.as_str())
    }

    fn unit(&mut self, unit: &Unit) -> IdRef {
        match unit {
            Unit::Term(oa) => {
                if !self.knows(&oa.id) {
                    self.declare_unit(oa);
                }
                IdRef::new(oa.id.as_str())
            }
            Unit::Text(term) => {
                if let Some(id) = self.text_unit(term) {
                    return IdRef::new(id.as_str());
                }
                let promoted = OntologyAnnotation::with_kind(term.as_str(), IdKind::Unit);
                self.declare_unit(&promoted);
                IdRef::new(promoted.id.as_str())
            }
        }
    }
}

fn comments(list: &[Comment]) -> Vec<CommentDoc> {
    list.iter()
        .map(|c| CommentDoc {
            name: c.name.clone(),
            value: c.value.clone(),
        })
        .collect()
}

fn annotation(oa: &OntologyAnnotation) -> AnnotationDoc {
    AnnotationDoc {
        id: oa.id.to_string(),
        annotation_value: oa.term.clone(),
        term_source: oa.term_source.clone(),
        term_accession: oa.term_accession.clone(),
        comments: comments(&oa.comments),
    }
}

fn value(v: &Value) -> serde_json::Value {
    match v {
        Value::Text(s) => json!(s),
        Value::Integer(i) => json!(i),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or_else(|| json!(f.to_string())),
        Value::Term(oa) => json!({
            "@id": oa.id.as_str(),
            "annotationValue": oa.term,
            "termSource": oa.term_source,
            "termAccession": oa.term_accession,
        }),
    }
}

fn refs(ids: &[Id]) -> Vec<IdRef> {
    ids.iter().map(|id| IdRef::new(id.as_str())).collect()
}

fn characteristic(c: &Characteristic, scope: &mut Scope) -> AttributeDoc {
    AttributeDoc {
        category: scope.category(&c.category),
        value: value(c.value()),
        unit: c.unit().map(|u| scope.unit(u)),
        comments: comments(&c.comments),
    }
}

fn factor_value(fv: &FactorValue, scope: &mut Scope) -> AttributeDoc {
    AttributeDoc {
        category: IdRef::new(fv.factor.as_str()),
        value: value(fv.value()),
        unit: fv.unit().map(|u| scope.unit(u)),
        comments: Vec::new(),
    }
}

fn parameter_value(pv: &ParameterValue, scope: &mut Scope) -> AttributeDoc {
    AttributeDoc {
        category: IdRef::new(pv.category.as_str()),
        value: value(pv.value()),
        unit: pv.unit().map(|u| scope.unit(u)),
        comments: comments(&pv.comments),
    }
}

fn source(s: &Source, scope: &mut Scope) -> SourceDoc {
    SourceDoc {
        id: s.id.to_string(),
        name: s.name.clone(),
        characteristics: s.characteristics.iter().map(|c| characteristic(c, scope)).collect(),
        comments: comments(&s.comments),
    }
}

fn sample(s: &Sample, scope: &mut Scope) -> SampleDoc {
    SampleDoc {
        id: s.id.to_string(),
        name: s.name.clone(),
        characteristics: s.characteristics.iter().map(|c| characteristic(c, scope)).collect(),
        factor_values: s.factor_values.iter().map(|fv| factor_value(fv, scope)).collect(),
        derives_from: refs(&s.derives_from),
        comments: comments(&s.comments),
    }
}

fn material(m: &Material, scope: &mut Scope) -> MaterialDoc {
    MaterialDoc {
        id: m.id.to_string(),
        name: m.name.clone(),
        material_type: m.material_type.label().to_string(),
        characteristics: m.characteristics.iter().map(|c| characteristic(c, scope)).collect(),
        derives_from: refs(&m.derives_from),
        comments: comments(&m.comments),
    }
}

fn data_file(d: &DataFile) -> DataFileDoc {
    DataFileDoc {
        id: d.id.to_string(),
        name: d.filename.clone(),
        kind: d.kind.label().to_string(),
        derives_from: refs(&d.generated_from),
        comments: comments(&d.comments),
    }
}

fn process(p: &Process, scope: &mut Scope) -> ProcessDoc {
    let mut process_comments = comments(&p.comments);
    if let Some(design) = &p.array_design_ref {
        process_comments.push(CommentDoc {
            name: ARRAY_DESIGN_COMMENT.to_string(),
            value: design.clone(),
        });
    }
    ProcessDoc {
        id: p.id.to_string(),
        name: p.name.clone(),
        executes_protocol: IdRef::new(p.executes_protocol.as_str()),
        parameter_values: p.parameter_values.iter().map(|pv| parameter_value(pv, scope)).collect(),
        performer: p.performer.clone(),
        date: p.date.clone(),
        previous_process: p.prev_process.as_ref().map(|id| IdRef::new(id.as_str())),
        next_process: p.next_process.as_ref().map(|id| IdRef::new(id.as_str())),
        inputs: p.inputs.iter().map(|n| IdRef::new(n.id().as_str())).collect(),
        outputs: p.outputs.iter().map(|n| IdRef::new(n.id().as_str())).collect(),
        comments: process_comments,
    }
}

fn protocol(p: &Protocol) -> ProtocolDoc {
    ProtocolDoc {
        id: p.id.to_string(),
        name: p.name.clone(),
        protocol_type: p.protocol_type.as_ref().map(annotation),
        description: p.description.clone(),
        uri: p.uri.clone(),
        version: p.version.clone(),
        parameters: p
            .parameters
            .iter()
            .map(|param| ParameterDoc {
                id: param.id.to_string(),
                parameter_name: annotation(&param.name),
            })
            .collect(),
        components: p
            .components
            .iter()
            .map(|c| ComponentDoc {
                component_name: c.name.clone(),
                component_type: c.component_type.as_ref().map(annotation),
            })
            .collect(),
        comments: comments(&p.comments),
    }
}

fn factor(f: &StudyFactor) -> FactorDoc {
    FactorDoc {
        id: f.id.to_string(),
        factor_name: f.name.clone(),
        factor_type: f.factor_type.as_ref().map(annotation),
        comments: comments(&f.comments),
    }
}

fn person(p: &Person) -> PersonDoc {
    PersonDoc {
        last_name: p.last_name.clone(),
        first_name: p.first_name.clone(),
        mid_initials: p.mid_initials.clone(),
        email: p.email.clone(),
        phone: p.phone.clone(),
        fax: p.fax.clone(),
        address: p.address.clone(),
        affiliation: p.affiliation.clone(),
        roles: p.roles.iter().map(annotation).collect(),
        comments: comments(&p.comments),
    }
}

fn publication(p: &Publication) -> PublicationDoc {
    PublicationDoc {
        pubmed_id: p.pubmed_id.clone(),
        doi: p.doi.clone(),
        author_list: p.author_list.clone(),
        title: p.title.clone(),
        status: p.status.as_ref().map(annotation),
        comments: comments(&p.comments),
    }
}

fn ontology_source(s: &OntologySource) -> OntologySourceDoc {
    OntologySourceDoc {
        name: s.name.clone(),
        file: s.file.clone(),
        version: s.version.clone(),
        description: s.description.clone(),
        comments: comments(&s.comments),
    }
}

fn assay(a: &Assay, study_scope: &Scope) -> AssayDoc {
    let mut scope = Scope::new(Some(study_scope), &a.characteristic_categories, &a.units);
    let materials = MaterialsDoc {
        sources: Vec::new(),
        samples: a.samples.iter().map(|s| sample(s, &mut scope)).collect(),
        other_materials: a.other_material.iter().map(|m| material(m, &mut scope)).collect(),
    };
    let process_sequence = a.process_sequence.iter().map(|p| process(p, &mut scope)).collect();
    AssayDoc {
        filename: a.filename.clone(),
        measurement_type: annotation(&a.measurement_type),
        technology_type: annotation(&a.technology_type),
        technology_platform: a.technology_platform.clone(),
        characteristic_categories: scope.categories,
        unit_categories: scope.units,
        materials,
        data_files: a.data_files.iter().map(data_file).collect(),
        process_sequence,
        comments: comments(&a.comments),
    }
}

fn study(s: &Study) -> StudyDoc {
    let mut scope = Scope::new(None, &s.characteristic_categories, &s.units);
    let materials = MaterialsDoc {
        sources: s.sources.iter().map(|x| source(x, &mut scope)).collect(),
        samples: s.samples.iter().map(|x| sample(x, &mut scope)).collect(),
        other_materials: s.other_material.iter().map(|m| material(m, &mut scope)).collect(),
    };
    let process_sequence = s.process_sequence.iter().map(|p| process(p, &mut scope)).collect();
    let assays = s.assays.iter().map(|a| assay(a, &scope)).collect();
    StudyDoc {
        filename: s.filename.clone(),
        identifier: s.identifier.clone(),
        title: s.title.clone(),
        description: s.description.clone(),
        submission_date: s.submission_date.clone(),
        public_release_date: s.public_release_date.clone(),
        publications: s.publications.iter().map(publication).collect(),
        people: s.contacts.iter().map(person).collect(),
        study_design_descriptors: s.design_descriptors.iter().map(annotation).collect(),
        protocols: s.protocols.iter().map(protocol).collect(),
        materials,
        process_sequence,
        factors: s.factors.iter().map(factor).collect(),
        characteristic_categories: scope.categories,
        unit_categories: scope.units,
        assays,
        comments: comments(&s.comments),
    }
}

/// Build the serializable document for an investigation
pub fn to_document(investigation: &Investigation) -> InvestigationDoc {
    InvestigationDoc {
        filename: investigation.filename.clone(),
        identifier: investigation.identifier.clone(),
        title: investigation.title.clone(),
        description: investigation.description.clone(),
        submission_date: investigation.submission_date.clone(),
        public_release_date: investigation.public_release_date.clone(),
        ontology_source_references: investigation.ontology_source_references.iter().map(ontology_source).collect(),
        publications: investigation.publications.iter().map(publication).collect(),
        people: investigation.contacts.iter().map(person).collect(),
        studies: investigation.studies.iter().map(study).collect(),
        comments: comments(&investigation.comments),
    }
}

/// Serialize to a pretty-printed JSON string
pub fn dumps(investigation: &Investigation) -> Result<String, IsaError> {
    Ok(serde_json::to_string_pretty(&to_document(investigation))?)
}

pub fn dump(investigation: &Investigation, path: &Path) -> Result<(), IsaError> {
    std::fs::write(path, dumps(investigation)?)?;
    tracing::info!(path = %path.display(), studies = investigation.studies.len(), "wrote ISA-JSON");
    Ok(())
}
