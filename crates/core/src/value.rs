//! Object snapshot values
//!
//! Objects crossing the change-notification boundary are snapshotted into a
//! canonical value model rather than exposing live ledger references: by the
//! time a listener runs, the underlying object may already have been mutated
//! again or deleted.
//!
//! Eight variants only; no implicit coercions. `Int(1) != Float(1.0)`, and
//! float equality follows IEEE-754 (`NaN != NaN`). Object fields are kept in
//! a `BTreeMap` so snapshots render in a stable field order in logs and
//! dumps.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Canonical snapshot value for objects in the ledger object database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point (IEEE-754)
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// Array of values
    Array(Vec<Value>),
    /// Object with string keys, iterated in key order
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Build an object value from field pairs.
    pub fn object<K, I>(fields: I) -> Value
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Object(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        )
    }

    /// Get the type name as a string.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::Bytes(_) => "Bytes",
            Value::Array(_) => "Array",
            Value::Object(_) => "Object",
        }
    }

    /// Whether this is an object value.
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// The fields of an object value, or None for any other variant.
    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// Look up a field on an object value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.as_object().and_then(|fields| fields.get(field))
    }

    /// The integer payload, or None for any other variant.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The string payload, or None for any other variant.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_cross_type_equality() {
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::Bytes(b"hello".to_vec()), Value::String("hello".into()));
        assert_ne!(Value::Null, Value::Bool(false));
    }

    #[test]
    fn float_follows_ieee754() {
        assert_ne!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_eq!(Value::Float(-0.0), Value::Float(0.0));
    }

    #[test]
    fn object_builder_and_lookup() {
        let v = Value::object([("name", Value::from("alice")), ("age", Value::from(30))]);
        assert!(v.is_object());
        assert_eq!(v.get("name").and_then(Value::as_str), Some("alice"));
        assert_eq!(v.get("age").and_then(Value::as_int), Some(30));
        assert_eq!(v.get("missing"), None);
    }

    #[test]
    fn object_fields_iterate_in_key_order() {
        let v = Value::object([("z", Value::Null), ("a", Value::Null), ("m", Value::Null)]);
        let keys: Vec<&str> = v.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "m", "z"]);
    }

    #[test]
    fn type_names() {
        assert_eq!(Value::Null.type_name(), "Null");
        assert_eq!(Value::Array(vec![]).type_name(), "Array");
        assert_eq!(Value::object::<&str, _>([]).type_name(), "Object");
    }

    #[test]
    fn renders_to_json_in_stable_field_order() {
        let v = Value::object([
            ("b", Value::Int(2)),
            ("a", Value::Int(1)),
            ("c", Value::from("three")),
        ]);
        let json = serde_json::to_string(&v).unwrap();
        let a = json.find("\"a\"").unwrap();
        let b = json.find("\"b\"").unwrap();
        let c = json.find("\"c\"").unwrap();
        assert!(a < b && b < c);
    }
}
