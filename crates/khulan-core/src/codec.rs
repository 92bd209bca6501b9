//! Content codec
//!
//! Translates between the canonical content of an entity variant (a flat map
//! of field name -> value, as read from the backing store) and the document
//! persisted in the document store.
//!
//! Encoding adds derived fields next to the originals, keyed by marker
//! suffixes:
//! - `field[,]` comma-separated option lists split into a list
//! - `field{}` native date for date fields
//! - `field[]` YAML-parsed lists and maps for relation and nested fields
//! - `field{}` native references resolved from relation fields
//!
//! Date and relation fields never share a schema type, so both uses of `{}`
//! never collide. Decoding strips derived fields and metadata again.

use crate::entity::{fields, reserved_keys, EntityKind, Metadata};
use crate::key::CacheKey;
use crate::schema::{FieldType, SchemaLookup};
use crate::types::{remove_empty, Document, FieldMap, Value};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

pub const LIST_SUFFIX: &str = "[,]";
pub const DATE_SUFFIX: &str = "{}";
pub const PARSED_SUFFIX: &str = "[]";
pub const REFS_SUFFIX: &str = "{}";

static OPTION_LIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\w\s-]+(,\s*[\w\s-]+)*$").expect("option list pattern is valid")
});

const NAIVE_DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Reference to an entity as written in relation fields, e.g. `page://abc`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityUri {
    pub kind: EntityKind,
    /// Entity id or uuid, without the scheme
    pub id: String,
}

impl EntityUri {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        EntityKind::ALL.iter().find_map(|kind| {
            raw.strip_prefix(kind.scheme().as_str())
                .map(|rest| EntityUri {
                    kind: *kind,
                    id: rest.to_string(),
                })
        })
    }

    /// The uri as written in content, scheme included
    pub fn to_uri(&self) -> String {
        format!("{}{}", self.kind.scheme(), self.id)
    }
}

/// Resolves relation entries to the key of an already indexed document
#[async_trait]
pub trait ReferenceResolver: Send + Sync {
    /// Key of the document whose `id` or `uuid` equals `target.id`, restricted
    /// to `language` when the site is multilingual
    async fn resolve(&self, target: &EntityUri, language: Option<&str>) -> Option<CacheKey>;
}

/// Resolver that never finds anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopResolver;

#[async_trait]
impl ReferenceResolver for NoopResolver {
    async fn resolve(&self, _target: &EntityUri, _language: Option<&str>) -> Option<CacheKey> {
        None
    }
}

/// Encoder/decoder between canonical content and indexed documents
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentCodec;

impl ContentCodec {
    pub fn new() -> Self {
        Self
    }

    /// Encode raw content and merge the metadata block over it
    pub async fn encode(
        &self,
        raw: &FieldMap,
        meta: Metadata,
        schema: Option<&dyn SchemaLookup>,
        resolver: &dyn ReferenceResolver,
    ) -> Document {
        let language = meta.language.clone();
        let mut doc = self
            .encode_fields(raw, language.as_deref(), schema, resolver)
            .await;

        doc.extend(meta.into_fields());
        doc.remove(fields::PRIMARY_KEY);
        doc
    }

    /// Add derived fields for every string field with a known schema type
    pub async fn encode_fields(
        &self,
        raw: &FieldMap,
        language: Option<&str>,
        schema: Option<&dyn SchemaLookup>,
        resolver: &dyn ReferenceResolver,
    ) -> Document {
        let mut doc = raw.clone();
        let Some(schema) = schema else {
            return doc;
        };

        for (name, value) in raw {
            let Value::String(text) = value else {
                continue;
            };
            let Some(field_type) = schema.field_type(name) else {
                continue;
            };

            if field_type.is_list() {
                if let Some(items) = split_option_list(text) {
                    doc.insert(format!("{}{}", name, LIST_SUFFIX), items);
                }
            } else if field_type == FieldType::Date {
                match parse_date(text) {
                    Some(date) => {
                        doc.insert(format!("{}{}", name, DATE_SUFFIX), Value::DateTime(date));
                    }
                    None => debug!("Skipping unparseable date in field '{}'", name),
                }
            } else if field_type.is_relation() {
                if let Some(parsed) = parse_structured(text) {
                    let refs = resolve_references(&parsed, language, resolver).await;
                    doc.insert(format!("{}{}", name, PARSED_SUFFIX), parsed);
                    doc.insert(format!("{}{}", name, REFS_SUFFIX), Value::Array(refs));
                }
            } else if field_type.is_nested() {
                if let Some(parsed) = parse_structured(text) {
                    doc.insert(format!("{}{}", name, PARSED_SUFFIX), parsed);
                }
            }
        }

        doc
    }

    /// Recover canonical content from a stored document
    pub fn decode(&self, stored: &Document) -> FieldMap {
        let kind = stored
            .get(fields::MODEL_TYPE)
            .and_then(Value::as_str)
            .and_then(|name| name.parse::<EntityKind>().ok());
        let reserved = reserved_keys(kind);

        let content = stored
            .iter()
            .filter(|(name, _)| name.as_str() != fields::PRIMARY_KEY)
            .filter(|(name, value)| !(is_derived(name) && is_generated(value)))
            .filter(|(name, _)| !reserved.contains(&name.as_str()))
            .map(|(name, value)| (name.clone(), value.to_plain()))
            .collect();

        remove_empty(content)
    }
}

/// Whether a field name carries a derived-key marker
pub fn is_derived(name: &str) -> bool {
    name.ends_with(LIST_SUFFIX) || name.ends_with(PARSED_SUFFIX) || name.ends_with(DATE_SUFFIX)
}

// Derived fields only ever hold lists, maps, dates or references
fn is_generated(value: &Value) -> bool {
    matches!(
        value,
        Value::Array(_) | Value::Object(_) | Value::DateTime(_) | Value::Ref(_)
    )
}

fn split_option_list(text: &str) -> Option<Value> {
    if !OPTION_LIST.is_match(text) {
        return None;
    }
    let items = text
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(Value::from)
        .collect();
    Some(Value::Array(items))
}

/// Parse an ISO-8601 date or date-time; naive values are taken as UTC
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Some(date.with_timezone(&Utc));
    }
    for format in NAIVE_DATE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parse YAML content, keeping only lists and maps
pub fn parse_structured(text: &str) -> Option<Value> {
    match serde_yaml::from_str::<Value>(text) {
        Ok(value @ (Value::Array(_) | Value::Object(_))) => Some(value),
        Ok(_) => None,
        Err(e) => {
            debug!("Skipping malformed structured content: {}", e);
            None
        }
    }
}

async fn resolve_references(
    parsed: &Value,
    language: Option<&str>,
    resolver: &dyn ReferenceResolver,
) -> Vec<Value> {
    let entries: Vec<&Value> = match parsed {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => map.values().collect(),
        _ => Vec::new(),
    };

    let mut refs = Vec::new();
    for entry in entries {
        let Some(uri) = entry.as_str().and_then(EntityUri::parse) else {
            continue;
        };
        match resolver.resolve(&uri, language).await {
            Some(key) => refs.push(Value::Ref(key.into_string())),
            None => debug!("Unresolved reference {}", uri.to_uri()),
        }
    }
    refs
}
