//! Attribute values: characteristics, factor values, parameter values
//!
//! A value is text, a number or an ontology annotation. A unit may only
//! accompany text or numbers; the setters reject a unit on an annotation.

use std::fmt;
use std::hash::{Hash, Hasher};

use super::identifier::Id;
use super::ontology::{Comment, OntologyAnnotation};
use crate::error::AttributeError;

#[derive(Debug, Clone)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Term(OntologyAnnotation),
}

impl Value {
    /// Integer if the cell parses as one, then float, else text
    pub fn parse_number(cell: &str) -> Value {
        let trimmed = cell.trim();
        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::Integer(i);
        }
        match trimmed.parse::<f64>() {
            Ok(f) if f.is_finite() => Value::Float(f),
            _ => Value::Text(cell.to_string()),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    pub fn as_term(&self) -> Option<&OntologyAnnotation> {
        match self {
            Value::Term(oa) => Some(oa),
            _ => None,
        }
    }

    /// Text written in the table cell
    pub fn cell(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => format!("{:?}", f),
            Value::Term(oa) => oa.term.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Value::Text(s) => s.is_empty(),
            Value::Term(oa) => oa.is_empty(),
            _ => false,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Text(String::new())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Term(a), Value::Term(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Text(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Term(oa) => oa.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cell())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<OntologyAnnotation> for Value {
    fn from(value: OntologyAnnotation) -> Self {
        Value::Term(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Unit {
    Text(String),
    Term(OntologyAnnotation),
}

impl Unit {
    pub fn term(&self) -> &str {
        match self {
            Unit::Text(s) => s,
            Unit::Term(oa) => &oa.term,
        }
    }
}

/// Value + optional unit, shape-checked on every mutation
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Measure {
    value: Value,
    unit: Option<Unit>,
}

impl Measure {
    fn check(entity: &'static str, value: &Value, unit: &Option<Unit>) -> Result<(), AttributeError> {
        if unit.is_some() && matches!(value, Value::Term(_)) {
            return Err(AttributeError::new(
                entity,
                "unit",
                "a unit cannot accompany an ontology annotation value",
            ));
        }
        Ok(())
    }
}

/// Shared accessors of entities carrying a [`Measure`]
pub trait Measured {
    const ENTITY: &'static str;

    fn measure(&self) -> &Measure;
    fn measure_mut(&mut self) -> &mut Measure;

    fn value(&self) -> &Value {
        &self.measure().value
    }

    fn unit(&self) -> Option<&Unit> {
        self.measure().unit.as_ref()
    }

    fn set_value(&mut self, value: Value) -> Result<(), AttributeError> {
        Measure::check(Self::ENTITY, &value, &self.measure().unit)?;
        self.measure_mut().value = value;
        Ok(())
    }

    fn set_unit(&mut self, unit: Option<Unit>) -> Result<(), AttributeError> {
        Measure::check(Self::ENTITY, &self.measure().value, &unit)?;
        self.measure_mut().unit = unit;
        Ok(())
    }
}

/// Attribute of a material
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Characteristic {
    pub category: OntologyAnnotation,
    measure: Measure,
    pub comments: Vec<Comment>,
}

impl Characteristic {
    pub fn new(category: OntologyAnnotation, value: Value) -> Self {
        Self {
            category,
            measure: Measure { value, unit: None },
            comments: Vec::new(),
        }
    }

    pub fn with_unit(category: OntologyAnnotation, value: Value, unit: Unit) -> Result<Self, AttributeError> {
        let mut c = Self::new(category, value);
        c.set_unit(Some(unit))?;
        Ok(c)
    }
}

impl Measured for Characteristic {
    const ENTITY: &'static str = "Characteristic";

    fn measure(&self) -> &Measure {
        &self.measure
    }

    fn measure_mut(&mut self) -> &mut Measure {
        &mut self.measure
    }
}

/// Realized value of a study factor on a sample
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FactorValue {
    /// Identifier of the [`StudyFactor`](super::StudyFactor)
    pub factor: Id,
    measure: Measure,
}

impl FactorValue {
    pub fn new(factor: Id, value: Value) -> Self {
        Self {
            factor,
            measure: Measure { value, unit: None },
        }
    }

    pub fn with_unit(factor: Id, value: Value, unit: Unit) -> Result<Self, AttributeError> {
        let mut fv = Self::new(factor, value);
        fv.set_unit(Some(unit))?;
        Ok(fv)
    }
}

impl Measured for FactorValue {
    const ENTITY: &'static str = "FactorValue";

    fn measure(&self) -> &Measure {
        &self.measure
    }

    fn measure_mut(&mut self) -> &mut Measure {
        &mut self.measure
    }
}

/// Value of a protocol parameter on a process
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterValue {
    /// Identifier of the [`ProtocolParameter`](super::ProtocolParameter)
    pub category: Id,
    measure: Measure,
    pub comments: Vec<Comment>,
}

impl ParameterValue {
    pub fn new(category: Id, value: Value) -> Self {
        Self {
            category,
            measure: Measure { value, unit: None },
            comments: Vec::new(),
        }
    }

    pub fn with_unit(category: Id, value: Value, unit: Unit) -> Result<Self, AttributeError> {
        let mut pv = Self::new(category, value);
        pv.set_unit(Some(unit))?;
        Ok(pv)
    }
}

impl Measured for ParameterValue {
    const ENTITY: &'static str = "ParameterValue";

    fn measure(&self) -> &Measure {
        &self.measure
    }

    fn measure_mut(&mut self) -> &mut Measure {
        &mut self.measure
    }
}
