//! Process inputs and outputs: sources, samples, other materials, data files

use std::hash::{Hash, Hasher};

use super::identifier::{Id, IdKind};
use super::ontology::Comment;
use super::value::{Characteristic, FactorValue};
use crate::error::AttributeError;

/// Type tag of a generic material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialType {
    Extract,
    LabeledExtract,
}

impl MaterialType {
    /// Column label used in assay tables
    pub fn label(&self) -> &'static str {
        match self {
            MaterialType::Extract => "Extract Name",
            MaterialType::LabeledExtract => "Labeled Extract Name",
        }
    }

    pub fn from_label(label: &str) -> Result<Self, AttributeError> {
        match label {
            "Extract Name" => Ok(MaterialType::Extract),
            "Labeled Extract Name" => Ok(MaterialType::LabeledExtract),
            other => Err(AttributeError::new(
                "Material",
                "type",
                format!("'{}' is not one of Extract Name, Labeled Extract Name", other),
            )),
        }
    }

    pub fn id_kind(&self) -> IdKind {
        match self {
            MaterialType::Extract => IdKind::Extract,
            MaterialType::LabeledExtract => IdKind::LabeledExtract,
        }
    }
}

/// Data file variant, carried as the file's label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataFileKind {
    Raw,
    RawSpectral,
    Derived,
    DerivedSpectral,
    DerivedArray,
    DerivedArrayDataMatrix,
    Array,
    ArrayDataMatrix,
    ProteinAssignment,
    PeptideAssignment,
    PostTranslationalModificationAssignment,
    AcquisitionParameter,
    FreeInductionDecay,
    Image,
    MetaboliteAssignment,
    MetaboliteIdentification,
}

impl DataFileKind {
    pub const ALL: [DataFileKind; 16] = [
        DataFileKind::Raw,
        DataFileKind::RawSpectral,
        DataFileKind::Derived,
        DataFileKind::DerivedSpectral,
        DataFileKind::DerivedArray,
        DataFileKind::DerivedArrayDataMatrix,
        DataFileKind::Array,
        DataFileKind::ArrayDataMatrix,
        DataFileKind::ProteinAssignment,
        DataFileKind::PeptideAssignment,
        DataFileKind::PostTranslationalModificationAssignment,
        DataFileKind::AcquisitionParameter,
        DataFileKind::FreeInductionDecay,
        DataFileKind::Image,
        DataFileKind::MetaboliteAssignment,
        DataFileKind::MetaboliteIdentification,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DataFileKind::Raw => "Raw Data File",
            DataFileKind::RawSpectral => "Raw Spectral Data File",
            DataFileKind::Derived => "Derived Data File",
            DataFileKind::DerivedSpectral => "Derived Spectral Data File",
            DataFileKind::DerivedArray => "Derived Array Data File",
            DataFileKind::DerivedArrayDataMatrix => "Derived Array Data Matrix File",
            DataFileKind::Array => "Array Data File",
            DataFileKind::ArrayDataMatrix => "Array Data Matrix File",
            DataFileKind::ProteinAssignment => "Protein Assignment File",
            DataFileKind::PeptideAssignment => "Peptide Assignment File",
            DataFileKind::PostTranslationalModificationAssignment => {
                "Post Translational Modification Assignment File"
            }
            DataFileKind::AcquisitionParameter => "Acquisition Parameter Data File",
            DataFileKind::FreeInductionDecay => "Free Induction Decay Data File",
            DataFileKind::Image => "Image File",
            DataFileKind::MetaboliteAssignment => "Metabolite Assignment File",
            DataFileKind::MetaboliteIdentification => "Metabolite Identification File",
        }
    }

    pub fn from_label(label: &str) -> Result<Self, AttributeError> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.label() == label)
            .ok_or_else(|| AttributeError::new("DataFile", "label", format!("unknown data file label '{}'", label)))
    }

    /// Squashed label used in identifiers, e.g. `rawdatafile`
    pub fn squashed(&self) -> String {
        self.label().replace(' ', "").to_lowercase()
    }
}

/// Root material of a study
#[derive(Debug, Clone)]
pub struct Source {
    pub id: Id,
    pub name: String,
    pub characteristics: Vec<Characteristic>,
    pub comments: Vec<Comment>,
}

impl Source {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Id::mint(IdKind::Source),
            name: name.into(),
            characteristics: Vec::new(),
            comments: Vec::new(),
        }
    }
}

/// Material collected from sources, shared between study and assays
#[derive(Debug, Clone)]
pub struct Sample {
    pub id: Id,
    pub name: String,
    pub characteristics: Vec<Characteristic>,
    pub factor_values: Vec<FactorValue>,
    /// Identifiers of upstream sources
    pub derives_from: Vec<Id>,
    pub comments: Vec<Comment>,
}

impl Sample {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Id::mint(IdKind::Sample),
            name: name.into(),
            characteristics: Vec::new(),
            factor_values: Vec::new(),
            derives_from: Vec::new(),
            comments: Vec::new(),
        }
    }
}

/// Extract or labeled extract
#[derive(Debug, Clone)]
pub struct Material {
    pub id: Id,
    pub name: String,
    pub material_type: MaterialType,
    pub characteristics: Vec<Characteristic>,
    pub derives_from: Vec<Id>,
    pub comments: Vec<Comment>,
}

impl Material {
    pub fn new(name: impl Into<String>, material_type: MaterialType) -> Self {
        Self {
            id: Id::mint(material_type.id_kind()),
            name: name.into(),
            material_type,
            characteristics: Vec::new(),
            derives_from: Vec::new(),
            comments: Vec::new(),
        }
    }

    /// Build from a column label, rejecting anything but the two material labels
    pub fn from_label(name: impl Into<String>, label: &str) -> Result<Self, AttributeError> {
        Ok(Self::new(name, MaterialType::from_label(label)?))
    }

    pub fn set_type(&mut self, label: &str) -> Result<(), AttributeError> {
        self.material_type = MaterialType::from_label(label)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DataFile {
    pub id: Id,
    pub filename: String,
    pub kind: DataFileKind,
    /// Identifiers of the samples the file was generated from
    pub generated_from: Vec<Id>,
    pub comments: Vec<Comment>,
}

impl DataFile {
    pub fn new(filename: impl Into<String>, kind: DataFileKind) -> Self {
        Self {
            id: Id::mint(IdKind::DataFile),
            filename: filename.into(),
            kind,
            generated_from: Vec::new(),
            comments: Vec::new(),
        }
    }

    pub fn label(&self) -> &'static str {
        self.kind.label()
    }
}

// Graph-bearing entities compare by identifier.
macro_rules! identity_eq {
    ($($ty:ty),*) => {
        $(
            impl PartialEq for $ty {
                fn eq(&self, other: &Self) -> bool {
                    self.id == other.id
                }
            }

            impl Eq for $ty {}

            impl Hash for $ty {
                fn hash<H: Hasher>(&self, state: &mut H) {
                    self.id.hash(state);
                }
            }
        )*
    };
}

identity_eq!(Source, Sample, Material, DataFile);

/// Tagged reference to a process input or output
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Source(Id),
    Sample(Id),
    Material(Id),
    DataFile(Id),
}

impl NodeRef {
    pub fn id(&self) -> &Id {
        match self {
            NodeRef::Source(id) | NodeRef::Sample(id) | NodeRef::Material(id) | NodeRef::DataFile(id) => id,
        }
    }

    pub fn is_data_file(&self) -> bool {
        matches!(self, NodeRef::DataFile(_))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeRef::Source(_) => "source",
            NodeRef::Sample(_) => "sample",
            NodeRef::Material(_) => "material",
            NodeRef::DataFile(_) => "data file",
        }
    }
}

/// Common surface of the three material kinds, used by batch helpers
pub trait MaterialNode: Clone {
    const KIND: IdKind;

    fn id(&self) -> &Id;
    fn name(&self) -> &str;
    fn set_name(&mut self, name: String);
    fn reassign_id(&mut self);
    fn node_ref(&self) -> NodeRef;
    fn set_derives_from(&mut self, upstream: Vec<Id>);
}

impl MaterialNode for Source {
    const KIND: IdKind = IdKind::Source;

    fn id(&self) -> &Id {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn reassign_id(&mut self) {
        self.id = Id::mint(Self::KIND);
    }

    fn node_ref(&self) -> NodeRef {
        NodeRef::Source(self.id.clone())
    }

    // Sources have no upstream.
    fn set_derives_from(&mut self, _upstream: Vec<Id>) {}
}

impl MaterialNode for Sample {
    const KIND: IdKind = IdKind::Sample;

    fn id(&self) -> &Id {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn reassign_id(&mut self) {
        self.id = Id::mint(Self::KIND);
    }

    fn node_ref(&self) -> NodeRef {
        NodeRef::Sample(self.id.clone())
    }

    fn set_derives_from(&mut self, upstream: Vec<Id>) {
        self.derives_from = upstream;
    }
}

impl MaterialNode for Material {
    const KIND: IdKind = IdKind::Material;

    fn id(&self) -> &Id {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn reassign_id(&mut self) {
        self.id = Id::mint(self.material_type.id_kind());
    }

    fn node_ref(&self) -> NodeRef {
        NodeRef::Material(self.id.clone())
    }

    fn set_derives_from(&mut self, upstream: Vec<Id>) {
        self.derives_from = upstream;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_type_tag_is_checked() {
        assert!(Material::from_label("e1", "Extract Name").is_ok());
        let err = Material::from_label("x", "Sample Name").unwrap_err();
        assert_eq!(err.attribute, "type");
    }

    #[test]
    fn test_data_file_labels_round_trip() {
        for kind in DataFileKind::ALL {
            assert_eq!(DataFileKind::from_label(kind.label()).unwrap(), kind);
        }
        assert!(DataFileKind::from_label("Raw File").is_err());
        assert_eq!(DataFileKind::Raw.squashed(), "rawdatafile");
    }

    #[test]
    fn test_identity_equality() {
        let a = Sample::new("s1");
        let mut b = a.clone();
        b.name = "renamed".to_string();
        assert_eq!(a, b);
        assert_ne!(a, Sample::new("s1"));
    }

    #[test]
    fn test_labeled_extract_id_namespace() {
        let m = Material::new("le1", MaterialType::LabeledExtract);
        assert!(m.id.as_str().starts_with("#material/labeledextract-"));
    }
}
