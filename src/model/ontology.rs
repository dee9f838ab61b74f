//! Ontology sources, annotations and comments

use std::hash::{Hash, Hasher};

use super::identifier::{Id, IdKind};

/// Named free-text comment attached to most entities
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Comment {
    pub name: String,
    pub value: String,
}

impl Comment {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A controlled vocabulary declared at investigation level
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OntologySource {
    pub name: String,
    pub file: String,
    pub version: String,
    pub description: String,
    pub comments: Vec<Comment>,
}

impl OntologySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// A term + accession + source triple
///
/// Equality and hashing ignore the identifier: two annotations naming
/// the same term from the same source are the same value.
#[derive(Debug, Clone)]
pub struct OntologyAnnotation {
    pub id: Id,
    pub term: String,
    /// Name of the declaring [`OntologySource`], empty when unset
    pub term_source: String,
    pub term_accession: String,
    pub comments: Vec<Comment>,
}

impl OntologyAnnotation {
    pub fn new(term: impl Into<String>) -> Self {
        Self::with_kind(term, IdKind::OntologyAnnotation)
    }

    /// Annotation whose identifier lives in a specific namespace
    /// (`#characteristic_category/`, `#unit/`)
    pub fn with_kind(term: impl Into<String>, kind: IdKind) -> Self {
        Self {
            id: Id::mint(kind),
            term: term.into(),
            term_source: String::new(),
            term_accession: String::new(),
            comments: Vec::new(),
        }
    }

    pub fn sourced(
        term: impl Into<String>,
        term_source: impl Into<String>,
        term_accession: impl Into<String>,
    ) -> Self {
        let mut oa = Self::new(term);
        oa.term_source = term_source.into();
        oa.term_accession = term_accession.into();
        oa
    }

    pub fn has_term_source(&self) -> bool {
        !self.term_source.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.term.is_empty() && self.term_source.is_empty() && self.term_accession.is_empty()
    }
}

impl Default for OntologyAnnotation {
    fn default() -> Self {
        Self::new("")
    }
}

impl PartialEq for OntologyAnnotation {
    fn eq(&self, other: &Self) -> bool {
        self.term == other.term
            && self.term_source == other.term_source
            && self.term_accession == other.term_accession
            && self.comments == other.comments
    }
}

impl Eq for OntologyAnnotation {}

impl Hash for OntologyAnnotation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.term.hash(state);
        self.term_source.hash(state);
        self.term_accession.hash(state);
        self.comments.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_equality_ignores_identifier() {
        let a = OntologyAnnotation::sourced("Homo sapiens", "NCBITAXON", "9606");
        let b = OntologyAnnotation::sourced("Homo sapiens", "NCBITAXON", "9606");
        assert_ne!(a.id, b.id);
        assert_eq!(a, b);

        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_kind_namespace() {
        let category = OntologyAnnotation::with_kind("organism", IdKind::CharacteristicCategory);
        assert!(category.id.as_str().starts_with("#characteristic_category/"));
        assert!(!category.has_term_source());
    }
}
