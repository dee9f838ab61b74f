//! Serde shapes of the ISA-JSON document
//!
//! Field names follow the published ISA-JSON keys. Every field defaults so
//! that partially filled documents still deserialize; the schema check and
//! the reader's reference pass report what is missing.

use serde::{Deserialize, Deserializer, Serialize};

/// `{"@id": "..."}`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdRef {
    #[serde(rename = "@id", default)]
    pub id: String,
}

impl IdRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Strings pass through; numbers and booleans are rendered as text.
fn text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CommentDoc {
    pub name: String,
    #[serde(deserialize_with = "text_or_number")]
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AnnotationDoc {
    #[serde(rename = "@id", skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(deserialize_with = "text_or_number")]
    pub annotation_value: String,
    pub term_source: String,
    pub term_accession: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<CommentDoc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OntologySourceDoc {
    pub name: String,
    pub file: String,
    pub version: String,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<CommentDoc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonDoc {
    pub last_name: String,
    pub first_name: String,
    pub mid_initials: String,
    pub email: String,
    pub phone: String,
    pub fax: String,
    pub address: String,
    pub affiliation: String,
    pub roles: Vec<AnnotationDoc>,
    pub comments: Vec<CommentDoc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PublicationDoc {
    #[serde(rename = "pubMedID")]
    pub pubmed_id: String,
    pub doi: String,
    pub author_list: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AnnotationDoc>,
    pub comments: Vec<CommentDoc>,
}

/// Characteristic, factor value or parameter value
///
/// `value` is a string, a number or an annotation object.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AttributeDoc {
    pub category: IdRef,
    pub value: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<IdRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<CommentDoc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryDoc {
    #[serde(rename = "@id")]
    pub id: String,
    pub characteristic_type: AnnotationDoc,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourceDoc {
    #[serde(rename = "@id")]
    pub id: String,
    pub name: String,
    pub characteristics: Vec<AttributeDoc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<CommentDoc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SampleDoc {
    #[serde(rename = "@id")]
    pub id: String,
    pub name: String,
    pub characteristics: Vec<AttributeDoc>,
    pub factor_values: Vec<AttributeDoc>,
    pub derives_from: Vec<IdRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<CommentDoc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MaterialDoc {
    #[serde(rename = "@id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub material_type: String,
    pub characteristics: Vec<AttributeDoc>,
    pub derives_from: Vec<IdRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<CommentDoc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DataFileDoc {
    #[serde(rename = "@id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub derives_from: Vec<IdRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<CommentDoc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ParameterDoc {
    #[serde(rename = "@id")]
    pub id: String,
    pub parameter_name: AnnotationDoc,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ComponentDoc {
    pub component_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_type: Option<AnnotationDoc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ProtocolDoc {
    #[serde(rename = "@id")]
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol_type: Option<AnnotationDoc>,
    pub description: String,
    pub uri: String,
    pub version: String,
    pub parameters: Vec<ParameterDoc>,
    pub components: Vec<ComponentDoc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<CommentDoc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FactorDoc {
    #[serde(rename = "@id")]
    pub id: String,
    pub factor_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub factor_type: Option<AnnotationDoc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<CommentDoc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessDoc {
    #[serde(rename = "@id")]
    pub id: String,
    pub name: String,
    pub executes_protocol: IdRef,
    pub parameter_values: Vec<AttributeDoc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_process: Option<IdRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_process: Option<IdRef>,
    pub inputs: Vec<IdRef>,
    pub outputs: Vec<IdRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<CommentDoc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MaterialsDoc {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceDoc>,
    pub samples: Vec<SampleDoc>,
    pub other_materials: Vec<MaterialDoc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AssayDoc {
    pub filename: String,
    pub measurement_type: AnnotationDoc,
    pub technology_type: AnnotationDoc,
    pub technology_platform: String,
    pub characteristic_categories: Vec<CategoryDoc>,
    pub unit_categories: Vec<AnnotationDoc>,
    pub materials: MaterialsDoc,
    pub data_files: Vec<DataFileDoc>,
    pub process_sequence: Vec<ProcessDoc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<CommentDoc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StudyDoc {
    pub filename: String,
    pub identifier: String,
    pub title: String,
    pub description: String,
    pub submission_date: String,
    pub public_release_date: String,
    pub publications: Vec<PublicationDoc>,
    pub people: Vec<PersonDoc>,
    pub study_design_descriptors: Vec<AnnotationDoc>,
    pub protocols: Vec<ProtocolDoc>,
    pub materials: MaterialsDoc,
    pub process_sequence: Vec<ProcessDoc>,
    pub factors: Vec<FactorDoc>,
    pub characteristic_categories: Vec<CategoryDoc>,
    pub unit_categories: Vec<AnnotationDoc>,
    pub assays: Vec<AssayDoc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<CommentDoc>,
}

/// Root of an ISA-JSON document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct InvestigationDoc {
    pub filename: String,
    pub identifier: String,
    pub title: String,
    pub description: String,
    pub submission_date: String,
    pub public_release_date: String,
    pub ontology_source_references: Vec<OntologySourceDoc>,
    pub publications: Vec<PublicationDoc>,
    pub people: Vec<PersonDoc>,
    pub studies: Vec<StudyDoc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<CommentDoc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_annotation_value_becomes_text() {
        let oa: AnnotationDoc = serde_json::from_value(json!({ "annotationValue": 9606 })).unwrap();
        assert_eq!(oa.annotation_value, "9606");
        assert!(oa.id.is_empty());
    }

    #[test]
    fn test_process_keys() {
        let doc = ProcessDoc {
            id: "#process/a".to_string(),
            executes_protocol: IdRef::new("#protocol/p"),
            previous_process: Some(IdRef::new("#process/z")),
            ..Default::default()
        };
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["executesProtocol"]["@id"], "#protocol/p");
        assert_eq!(value["previousProcess"]["@id"], "#process/z");
        assert!(value.get("nextProcess").is_none());
        assert!(value.get("performer").is_none());
    }

    #[test]
    fn test_missing_fields_default() {
        let doc: InvestigationDoc = serde_json::from_str(r#"{"studies": [{"identifier": "s1"}]}"#).unwrap();
        assert_eq!(doc.studies[0].identifier, "s1");
        assert!(doc.studies[0].materials.sources.is_empty());
    }

    #[test]
    fn test_publication_pubmed_key() {
        let value = serde_json::to_value(PublicationDoc {
            pubmed_id: "123".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(value["pubMedID"], "123");
    }
}
