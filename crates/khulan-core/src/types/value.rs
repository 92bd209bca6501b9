//! Field value type for content maps and indexed documents
//!
//! `Value` mirrors JSON with two store-native additions: a UTC date/time used
//! for range queries and a reference to another indexed document. Both
//! serialize as extended JSON (`{"$date": ...}` and `{"$ref": ...}`) so any
//! document store that speaks JSON can persist them.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Canonical content of an entity variant: field name -> value
pub type FieldMap = BTreeMap<String, Value>;

/// A document as persisted in the document store
pub type Document = BTreeMap<String, Value>;

const DATE_TAG: &str = "$date";
const REF_TAG: &str = "$ref";

/// Field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
    /// Array of values
    Array(Vec<Value>),
    /// Object (key-value map)
    Object(BTreeMap<String, Value>),
    /// Store-native date/time
    DateTime(DateTime<Utc>),
    /// Store-native reference to another document's primary key
    Ref(String),
}

impl Value {
    /// Whether the value is empty-equivalent (null, "", [] or {})
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Strip store-native wrappers, recursively, down to plain scalars/lists/maps
    pub fn to_plain(&self) -> Value {
        match self {
            Value::DateTime(dt) => Value::String(format_date(dt)),
            Value::Ref(id) => Value::String(id.clone()),
            Value::Array(items) => Value::Array(items.iter().map(Value::to_plain).collect()),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_plain()))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Convert to extended JSON
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::String(s) => Json::String(s.clone()),
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(map) => Json::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
            Value::DateTime(dt) => tagged(DATE_TAG, format_date(dt)),
            Value::Ref(id) => tagged(REF_TAG, id.clone()),
        }
    }
}

fn tagged(tag: &str, content: String) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    map.insert(tag.to_string(), serde_json::Value::String(content));
    serde_json::Value::Object(map)
}

fn format_date(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Recognize `{"$date": "..."}` and `{"$ref": "..."}` wrappers
fn untag(map: &serde_json::Map<String, serde_json::Value>) -> Option<Value> {
    if map.len() != 1 {
        return None;
    }
    if let Some(serde_json::Value::String(raw)) = map.get(DATE_TAG) {
        return DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| Value::DateTime(dt.with_timezone(&Utc)));
    }
    if let Some(serde_json::Value::String(id)) = map.get(REF_TAG) {
        return Some(Value::Ref(id.clone()));
    }
    None
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or_default()),
            },
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            Json::Object(map) => match untag(&map) {
                Some(native) => native,
                None => Value::Object(
                    map.into_iter()
                        .map(|(key, value)| (key, Value::from(value)))
                        .collect(),
                ),
            },
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => items.serialize(serializer),
            Value::Object(map) => map.serialize(serializer),
            Value::DateTime(dt) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(DATE_TAG, &format_date(dt))?;
                map.end()
            }
            Value::Ref(id) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(REF_TAG, id)?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Object(map)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Value::DateTime(dt)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Drop every empty-equivalent field (null, "", [] and {})
pub fn remove_empty(fields: FieldMap) -> FieldMap {
    fields
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .collect()
}
