//! Entity identifiers (Arc<str> backed)
//!
//! Identifiers look like `#sample/<suffix>`. Cloning is a refcount bump.

use std::borrow::Borrow;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Stable identifier of a model entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(Arc<str>);

/// Namespace of a minted identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    Source,
    Sample,
    Extract,
    LabeledExtract,
    Material,
    DataFile,
    Process,
    Protocol,
    Parameter,
    Factor,
    OntologyAnnotation,
    CharacteristicCategory,
    Unit,
}

impl IdKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            IdKind::Source => "#source/",
            IdKind::Sample => "#sample/",
            IdKind::Extract => "#material/extract-",
            IdKind::LabeledExtract => "#material/labeledextract-",
            IdKind::Material => "#material/",
            IdKind::DataFile => "#data/",
            IdKind::Process => "#process/",
            IdKind::Protocol => "#protocol/",
            IdKind::Parameter => "#parameter/",
            IdKind::Factor => "#factor/",
            IdKind::OntologyAnnotation => "#ontology_annotation/",
            IdKind::CharacteristicCategory => "#characteristic_category/",
            IdKind::Unit => "#unit/",
        }
    }
}

static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Next value of the process-wide monotonically increasing counter
pub fn next_sequence() -> u64 {
    NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed)
}

impl Id {
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(Arc::from(value.as_ref()))
    }

    /// Mint a globally unique identifier in the given namespace
    pub fn mint(kind: IdKind) -> Self {
        Self::new(format!("{}{}", kind.prefix(), uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn has_kind(&self, kind: IdKind) -> bool {
        self.0.starts_with(kind.prefix())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Id {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Id {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_mint_uses_prefix_and_is_unique() {
        let a = Id::mint(IdKind::Sample);
        let b = Id::mint(IdKind::Sample);
        assert!(a.as_str().starts_with("#sample/"));
        assert!(a.has_kind(IdKind::Sample));
        assert_ne!(a, b);
    }

    #[test]
    fn test_sequence_is_monotonic() {
        let first = next_sequence();
        let second = next_sequence();
        assert!(second > first);
    }

    #[test]
    fn test_lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(Id::new("#process/1"), 1);
        assert_eq!(map.get("#process/1"), Some(&1));
    }
}
