//! Record model shared by every view
//!
//! Records arrive from an external loader with their identities already
//! assigned. The core only reads them.

use std::fmt;
use std::sync::Arc;

use ahash::AHashSet;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Stable identity of a record, assigned once at load time
pub type RecordId = usize;

/// Label used for an attribute a record does not carry
pub const MISSING_LABEL: &str = "(missing)";

/// A single attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    /// Numeric coercion: finite numbers, or text that parses as one
    pub fn as_number(&self) -> Option<f64> {
        let number = match self {
            Value::Number(n) => *n,
            Value::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        number.is_finite().then_some(number)
    }

    /// Label used when the value sits on a categorical axis
    pub fn label(&self) -> String {
        match self {
            Value::Number(n) => n.to_string(),
            Value::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

/// Category label of a possibly missing value
pub fn category_label(value: Option<&Value>) -> String {
    value.map(Value::label).unwrap_or_else(|| MISSING_LABEL.to_string())
}

/// One dataset row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    id: RecordId,
    values: IndexMap<String, Value>,
}

impl Record {
    pub fn new(id: RecordId, values: IndexMap<String, Value>) -> Self {
        Self { id, values }
    }

    /// Build a record from `(attribute, value)` pairs
    pub fn from_pairs<K, V, I>(id: RecordId, pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            id,
            values: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.values.get(attribute)
    }

    /// Numeric value of an attribute, if it coerces
    pub fn number(&self, attribute: &str) -> Option<f64> {
        self.get(attribute).and_then(Value::as_number)
    }

    /// Attribute names in load order
    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// An immutable, shared sequence of records.
///
/// Clones share the same allocation. Two datasets are the *same* dataset only
/// if they share it; a reload always produces a new one.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Arc<Vec<Record>>,
}

impl Dataset {
    /// Wrap loaded records, rejecting duplicate identities
    pub fn new(records: Vec<Record>) -> Result<Self, CoreError> {
        let mut seen = AHashSet::with_capacity(records.len());
        for record in &records {
            if !seen.insert(record.id()) {
                return Err(CoreError::DuplicateRecordId(record.id()));
            }
        }

        Ok(Self {
            records: Arc::new(records),
        })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Identity comparison: true when both handles share one load
    pub fn same_as(&self, other: &Dataset) -> bool {
        Arc::ptr_eq(&self.records, &other.records)
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(Value::from(3.5).as_number(), Some(3.5));
        assert_eq!(Value::from(" 42 ").as_number(), Some(42.0));
        assert_eq!(Value::from("yes").as_number(), None);
        assert_eq!(Value::from("").as_number(), None);
        assert_eq!(Value::Number(f64::NAN).as_number(), None);
        assert_eq!(Value::from("inf").as_number(), None);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let records = vec![
            Record::from_pairs(0, [("price", 1.0)]),
            Record::from_pairs(0, [("price", 2.0)]),
        ];
        assert!(matches!(Dataset::new(records), Err(CoreError::DuplicateRecordId(0))));
    }

    #[test]
    fn test_dataset_identity() {
        let a = Dataset::new(vec![Record::from_pairs(0, [("area", 1000.0)])]).unwrap();
        let b = a.clone();
        let c = Dataset::new(a.records().to_vec()).unwrap();

        assert!(a.same_as(&b));
        assert!(!a.same_as(&c));
    }

    #[test]
    fn test_category_label() {
        let record = Record::from_pairs(1, [("mainroad", Value::from("yes")), ("stories", Value::from(2.0))]);
        assert_eq!(category_label(record.get("mainroad")), "yes");
        assert_eq!(category_label(record.get("stories")), "2");
        assert_eq!(category_label(record.get("basement")), MISSING_LABEL);
    }
}
