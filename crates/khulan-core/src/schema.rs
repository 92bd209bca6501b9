//! Blueprint (schema) lookup
//!
//! The codec only needs to know the declared type of a field. Blueprints are
//! YAML documents with a `fields:` map, each entry carrying a `type:`.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declared type of a content field
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    Tags,
    Select,
    Multiselect,
    Radio,
    Checkbox,
    Date,
    Pages,
    Files,
    Users,
    Object,
    Structure,
    Other(String),
}

impl FieldType {
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "tags" => FieldType::Tags,
            "select" => FieldType::Select,
            "multiselect" => FieldType::Multiselect,
            "radio" => FieldType::Radio,
            "checkbox" | "checkboxes" => FieldType::Checkbox,
            "date" => FieldType::Date,
            "pages" => FieldType::Pages,
            "files" => FieldType::Files,
            "users" => FieldType::Users,
            "object" => FieldType::Object,
            "structure" => FieldType::Structure,
            other => FieldType::Other(other.to_string()),
        }
    }

    /// Comma-separated option lists
    pub fn is_list(&self) -> bool {
        matches!(
            self,
            FieldType::Tags
                | FieldType::Select
                | FieldType::Multiselect
                | FieldType::Radio
                | FieldType::Checkbox
        )
    }

    /// YAML lists of entity references
    pub fn is_relation(&self) -> bool {
        matches!(self, FieldType::Pages | FieldType::Files | FieldType::Users)
    }

    /// YAML-encoded nested content
    pub fn is_nested(&self) -> bool {
        matches!(self, FieldType::Object | FieldType::Structure)
    }
}

/// Field-type lookup consumed by the codec
pub trait SchemaLookup: Send + Sync {
    /// Declared type of `field`, `None` when the field is not declared
    fn field_type(&self, field: &str) -> Option<FieldType>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    #[serde(rename = "type", default)]
    pub field_type: Option<String>,
}

/// Parsed blueprint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    #[serde(default)]
    pub title: Option<String>,

    /// Opt-out of bulk indexing with `khulan: false`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub khulan: Option<bool>,

    #[serde(default)]
    pub fields: BTreeMap<String, FieldDefinition>,
}

impl Blueprint {
    pub fn from_yaml(source: &str) -> Result<Self> {
        let blueprint: Blueprint = serde_yaml::from_str(source)?;
        Ok(blueprint.normalized())
    }

    /// Declare a field, mostly for tests and programmatic blueprints
    pub fn with_field(mut self, name: &str, field_type: &str) -> Self {
        self.fields.insert(
            name.to_lowercase(),
            FieldDefinition {
                field_type: Some(field_type.to_string()),
            },
        );
        self
    }

    /// Whether entities using this blueprint take part in bulk indexing
    pub fn is_cacheable(&self) -> bool {
        self.khulan.unwrap_or(true)
    }

    // Content field names are case-insensitive
    fn normalized(self) -> Self {
        Self {
            title: self.title,
            khulan: self.khulan,
            fields: self
                .fields
                .into_iter()
                .map(|(name, def)| (name.to_lowercase(), def))
                .collect(),
        }
    }
}

impl SchemaLookup for Blueprint {
    fn field_type(&self, field: &str) -> Option<FieldType> {
        self.fields
            .get(&field.to_lowercase())
            .and_then(|def| def.field_type.as_deref())
            .map(FieldType::parse)
    }
}
