//! Document filters
//!
//! A small Mongo-style filter dialect: field equality (array fields match any
//! element), `$in`, `$nin`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`, `$exists`,
//! `$and` and `$or`. Dotted field names address nested objects.

use crate::error::{StoreError, StoreResult};
use khulan_core::{Document, Value};
use serde_json::Value as Json;
use std::cmp::Ordering;

/// Filter over stored documents
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Match every document
    All,
    Eq(String, Value),
    Ne(String, Value),
    In(String, Vec<Value>),
    Nin(String, Vec<Value>),
    Gt(String, Value),
    Gte(String, Value),
    Lt(String, Value),
    Lte(String, Value),
    Exists(String, bool),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

const OPERATORS: [&str; 9] = [
    "$eq", "$ne", "$in", "$nin", "$gt", "$gte", "$lt", "$lte", "$exists",
];

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Filter::In(field.into(), values)
    }

    /// Whether a document satisfies this filter
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(field, value) => field_equals(lookup(doc, field), value),
            Filter::Ne(field, value) => !field_equals(lookup(doc, field), value),
            Filter::In(field, values) => {
                let found = lookup(doc, field);
                values.iter().any(|value| field_equals(found, value))
            }
            Filter::Nin(field, values) => {
                let found = lookup(doc, field);
                !values.iter().any(|value| field_equals(found, value))
            }
            Filter::Gt(field, value) => field_compares(lookup(doc, field), value, |o| o.is_gt()),
            Filter::Gte(field, value) => field_compares(lookup(doc, field), value, |o| o.is_ge()),
            Filter::Lt(field, value) => field_compares(lookup(doc, field), value, |o| o.is_lt()),
            Filter::Lte(field, value) => field_compares(lookup(doc, field), value, |o| o.is_le()),
            Filter::Exists(field, expected) => lookup(doc, field).is_some() == *expected,
            Filter::And(filters) => filters.iter().all(|f| f.matches(doc)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(doc)),
        }
    }

    /// Parse a JSON filter document
    pub fn from_json(json: &Json) -> StoreResult<Self> {
        let Json::Object(map) = json else {
            return Err(StoreError::InvalidFilter(format!(
                "expected an object, got {}",
                json
            )));
        };

        let mut clauses = Vec::new();
        for (key, value) in map {
            match key.as_str() {
                "$and" => clauses.push(Filter::And(parse_list(key, value)?)),
                "$or" => clauses.push(Filter::Or(parse_list(key, value)?)),
                op if op.starts_with('$') => {
                    return Err(StoreError::InvalidFilter(format!(
                        "unsupported top-level operator {}",
                        op
                    )))
                }
                field => clauses.push(parse_field(field, value)?),
            }
        }

        Ok(match clauses.len() {
            0 => Filter::All,
            1 => clauses.remove(0),
            _ => Filter::And(clauses),
        })
    }
}

fn parse_list(key: &str, value: &Json) -> StoreResult<Vec<Filter>> {
    let Json::Array(items) = value else {
        return Err(StoreError::InvalidFilter(format!("{} expects an array", key)));
    };
    items.iter().map(Filter::from_json).collect()
}

fn is_operator_map(map: &serde_json::Map<String, Json>) -> bool {
    !map.is_empty() && map.keys().all(|key| key.starts_with('$'))
}

// `{"$date": ..}` and `{"$ref": ..}` are values, not operators
fn is_extended_value(map: &serde_json::Map<String, Json>) -> bool {
    map.len() == 1 && (map.contains_key("$date") || map.contains_key("$ref"))
}

fn parse_field(field: &str, value: &Json) -> StoreResult<Filter> {
    match value {
        Json::Object(ops) if is_operator_map(ops) && !is_extended_value(ops) => {
            let mut clauses = Vec::new();
            for (op, operand) in ops {
                clauses.push(parse_operator(field, op, operand)?);
            }
            Ok(if clauses.len() == 1 {
                clauses.remove(0)
            } else {
                Filter::And(clauses)
            })
        }
        other => Ok(Filter::Eq(field.to_string(), Value::from(other.clone()))),
    }
}

fn parse_operator(field: &str, op: &str, operand: &Json) -> StoreResult<Filter> {
    let field = field.to_string();
    let value = || Value::from(operand.clone());
    let values = || -> StoreResult<Vec<Value>> {
        match operand {
            Json::Array(items) => Ok(items.iter().cloned().map(Value::from).collect()),
            _ => Err(StoreError::InvalidFilter(format!("{} expects an array", op))),
        }
    };

    match op {
        "$eq" => Ok(Filter::Eq(field, value())),
        "$ne" => Ok(Filter::Ne(field, value())),
        "$in" => Ok(Filter::In(field, values()?)),
        "$nin" => Ok(Filter::Nin(field, values()?)),
        "$gt" => Ok(Filter::Gt(field, value())),
        "$gte" => Ok(Filter::Gte(field, value())),
        "$lt" => Ok(Filter::Lt(field, value())),
        "$lte" => Ok(Filter::Lte(field, value())),
        "$exists" => match operand {
            Json::Bool(expected) => Ok(Filter::Exists(field, *expected)),
            _ => Err(StoreError::InvalidFilter("$exists expects a boolean".to_string())),
        },
        other => Err(StoreError::InvalidFilter(format!(
            "unsupported operator {} (supported: {})",
            other,
            OPERATORS.join(", ")
        ))),
    }
}

/// Resolve a possibly dotted field name inside a document
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    if let Some(value) = doc.get(path) {
        return Some(value);
    }

    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn field_equals(found: Option<&Value>, expected: &Value) -> bool {
    match found {
        // A null filter value also matches missing fields
        None => matches!(expected, Value::Null),
        Some(Value::Array(items)) if !matches!(expected, Value::Array(_)) => {
            items.iter().any(|item| values_equal(item, expected))
        }
        Some(value) => values_equal(value, expected),
    }
}

fn field_compares(found: Option<&Value>, expected: &Value, accept: fn(Ordering) -> bool) -> bool {
    match found {
        Some(Value::Array(items)) => items
            .iter()
            .any(|item| compare_values(item, expected).map_or(false, accept)),
        Some(value) => compare_values(value, expected).map_or(false, accept),
        None => false,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            compare_values(a, b) == Some(Ordering::Equal)
        }
        _ => a == b,
    }
}

/// Order two values of the same type family; `None` when incomparable
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            a.as_f64()?.partial_cmp(&b.as_f64()?)
        }
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::DateTime(x), Value::DateTime(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Ref(x), Value::Ref(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
