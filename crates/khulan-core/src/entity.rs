//! Entity kinds, languages and the metadata block injected into indexed documents

use crate::error::CoreError;
use crate::key::CacheKey;
use crate::types::{Document, Value};
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reserved field names written by the cache layer
pub mod fields {
    pub const PRIMARY_KEY: &str = "_id";
    pub const ID: &str = "id";
    pub const UUID: &str = "uuid";
    pub const MODIFIED: &str = "modified";
    pub const MODIFIED_DATE: &str = "modified{}";
    pub const CLASS: &str = "class";
    pub const LANGUAGE: &str = "language";
    pub const MODEL_TYPE: &str = "modelType";

    pub const NUM: &str = "num";
    pub const SLUG: &str = "slug";
    pub const STATUS: &str = "status";
    pub const TEMPLATE: &str = "template";

    pub const FILENAME: &str = "filename";
    pub const MIME_TYPE: &str = "mimeType";
    pub const SORT: &str = "sort";
    pub const PARENT: &str = "parent{}";

    pub const EMAIL: &str = "email";
    pub const NAME: &str = "name";
    pub const ROLE: &str = "role";
}

/// Kind discriminant stored as `modelType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Page,
    File,
    User,
    Site,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Page,
        EntityKind::File,
        EntityKind::User,
        EntityKind::Site,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Page => "page",
            EntityKind::File => "file",
            EntityKind::User => "user",
            EntityKind::Site => "site",
        }
    }

    /// URI scheme used by relation fields, e.g. `page://`
    pub fn scheme(&self) -> String {
        format!("{}://", self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "page" => Ok(EntityKind::Page),
            "file" => Ok(EntityKind::File),
            "user" => Ok(EntityKind::User),
            "site" => Ok(EntityKind::Site),
            other => Err(CoreError::UnknownEntityKind(other.to_string())),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Publication status of a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    Listed,
    Unlisted,
    Draft,
}

impl PageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageStatus::Listed => "listed",
            PageStatus::Unlisted => "unlisted",
            PageStatus::Draft => "draft",
        }
    }
}

impl FromStr for PageStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "listed" => Ok(PageStatus::Listed),
            "unlisted" => Ok(PageStatus::Unlisted),
            "draft" => Ok(PageStatus::Draft),
            other => Err(CoreError::UnknownPageStatus(other.to_string())),
        }
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Language setup of a site
///
/// An empty code list means a single-language site: every entity has exactly
/// one variant and keys carry no language suffix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Languages {
    codes: Vec<String>,
    current: Option<String>,
}

impl Languages {
    /// Single-language site
    pub fn single() -> Self {
        Self::default()
    }

    /// Multilingual site; the first code is the default language
    pub fn new(codes: Vec<String>) -> Self {
        let current = codes.first().cloned();
        Self { codes, current }
    }

    /// Switch the current language
    pub fn with_current(mut self, code: impl Into<String>) -> Self {
        self.current = Some(code.into());
        self
    }

    pub fn is_multilingual(&self) -> bool {
        !self.codes.is_empty()
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Resolve a requested language, defaulting to the current one on
    /// multilingual sites
    pub fn resolve(&self, language: Option<&str>) -> Option<String> {
        match language {
            Some(code) => Some(code.to_string()),
            None if self.is_multilingual() => self.current.clone(),
            None => None,
        }
    }

    /// Every language variant an entity has
    pub fn variants(&self) -> Vec<Option<String>> {
        if self.is_multilingual() {
            self.codes.iter().cloned().map(Some).collect()
        } else {
            vec![None]
        }
    }
}

/// Kind-specific metadata fields
#[derive(Debug, Clone, PartialEq)]
pub enum KindMeta {
    Page {
        template: String,
        status: PageStatus,
        num: Option<i64>,
        slug: String,
    },
    File {
        filename: String,
        mime_type: Option<String>,
        /// Mirrored from the file's own content
        template: Option<String>,
        /// Mirrored from the file's own content, as a number
        sort: Option<i64>,
        parent: Option<CacheKey>,
    },
    User {
        email: String,
        name: Option<String>,
        role: String,
    },
    Site,
}

impl KindMeta {
    pub fn kind(&self) -> EntityKind {
        match self {
            KindMeta::Page { .. } => EntityKind::Page,
            KindMeta::File { .. } => EntityKind::File,
            KindMeta::User { .. } => EntityKind::User,
            KindMeta::Site => EntityKind::Site,
        }
    }
}

/// Metadata block merged into every indexed document
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    pub id: String,
    /// Unix seconds of the backing store's last modification
    pub modified: i64,
    pub class_name: String,
    pub language: Option<String>,
    pub kind: KindMeta,
}

impl Metadata {
    /// Flatten into document fields
    pub fn into_fields(self) -> Document {
        let mut doc = Document::new();
        doc.insert(fields::ID.to_string(), Value::String(self.id));
        doc.insert(fields::MODIFIED.to_string(), Value::Int(self.modified));
        if let Some(date) = Utc.timestamp_opt(self.modified, 0).single() {
            doc.insert(fields::MODIFIED_DATE.to_string(), Value::DateTime(date));
        }
        doc.insert(fields::CLASS.to_string(), Value::String(self.class_name));
        doc.insert(fields::LANGUAGE.to_string(), Value::from(self.language));
        doc.insert(
            fields::MODEL_TYPE.to_string(),
            Value::from(self.kind.kind().as_str()),
        );

        match self.kind {
            KindMeta::Page {
                template,
                status,
                num,
                slug,
            } => {
                doc.insert(fields::TEMPLATE.to_string(), Value::String(template));
                doc.insert(fields::STATUS.to_string(), Value::from(status.as_str()));
                doc.insert(fields::NUM.to_string(), Value::from(num));
                doc.insert(fields::SLUG.to_string(), Value::String(slug));
            }
            KindMeta::File {
                filename,
                mime_type,
                template,
                sort,
                parent,
            } => {
                doc.insert(fields::FILENAME.to_string(), Value::String(filename));
                doc.insert(fields::MIME_TYPE.to_string(), Value::from(mime_type));
                doc.insert(fields::TEMPLATE.to_string(), Value::from(template));
                doc.insert(fields::SORT.to_string(), Value::from(sort));
                doc.insert(
                    fields::PARENT.to_string(),
                    parent
                        .map(|key| Value::Ref(key.into_string()))
                        .unwrap_or(Value::Null),
                );
            }
            KindMeta::User { email, name, role } => {
                doc.insert(fields::EMAIL.to_string(), Value::String(email));
                doc.insert(fields::NAME.to_string(), Value::from(name));
                doc.insert(fields::ROLE.to_string(), Value::String(role));
            }
            KindMeta::Site => {}
        }

        doc
    }
}

/// Metadata keys stripped from a document of the given kind on decode
pub fn reserved_keys(kind: Option<EntityKind>) -> Vec<&'static str> {
    let mut keys = vec![
        fields::ID,
        fields::MODIFIED,
        fields::MODIFIED_DATE,
        fields::CLASS,
        fields::LANGUAGE,
        fields::MODEL_TYPE,
    ];
    match kind {
        Some(EntityKind::Page) => {
            keys.extend([fields::NUM, fields::SLUG, fields::STATUS, fields::TEMPLATE])
        }
        Some(EntityKind::File) => keys.extend([
            fields::SORT,
            fields::FILENAME,
            fields::MIME_TYPE,
            fields::TEMPLATE,
        ]),
        Some(EntityKind::User) => keys.extend([fields::EMAIL, fields::NAME, fields::ROLE]),
        Some(EntityKind::Site) | None => {}
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_kind_parse() {
        assert_eq!("page".parse::<EntityKind>().unwrap(), EntityKind::Page);
        assert_eq!("site".parse::<EntityKind>().unwrap(), EntityKind::Site);
        assert!("block".parse::<EntityKind>().is_err());
        assert_eq!(EntityKind::File.scheme(), "file://");
    }

    #[test]
    fn test_language_variants() {
        assert_eq!(Languages::single().variants(), vec![None]);

        let multi = Languages::new(vec!["en".to_string(), "de".to_string()]);
        assert_eq!(
            multi.variants(),
            vec![Some("en".to_string()), Some("de".to_string())]
        );
        assert_eq!(multi.resolve(None), Some("en".to_string()));
        assert_eq!(
            multi.clone().with_current("de").resolve(None),
            Some("de".to_string())
        );
        assert_eq!(Languages::single().resolve(None), None);
    }

    #[test]
    fn test_page_metadata_fields() {
        let meta = Metadata {
            id: "blog/hello".to_string(),
            modified: 1_700_000_000,
            class_name: "Page".to_string(),
            language: Some("en".to_string()),
            kind: KindMeta::Page {
                template: "article".to_string(),
                status: PageStatus::Listed,
                num: Some(3),
                slug: "hello".to_string(),
            },
        };

        let doc = meta.into_fields();
        assert_eq!(doc[fields::ID], Value::from("blog/hello"));
        assert_eq!(doc[fields::MODIFIED], Value::Int(1_700_000_000));
        assert!(matches!(doc[fields::MODIFIED_DATE], Value::DateTime(_)));
        assert_eq!(doc[fields::MODEL_TYPE], Value::from("page"));
        assert_eq!(doc[fields::STATUS], Value::from("listed"));
        assert_eq!(doc[fields::NUM], Value::Int(3));
    }

    #[test]
    fn test_file_parent_is_native_reference() {
        let parent = CacheKey::derive("blog/hello", None);
        let meta = Metadata {
            id: "blog/hello/cover.jpg".to_string(),
            modified: 0,
            class_name: "File".to_string(),
            language: None,
            kind: KindMeta::File {
                filename: "cover.jpg".to_string(),
                mime_type: Some("image/jpeg".to_string()),
                template: None,
                sort: Some(2),
                parent: Some(parent.clone()),
            },
        };

        let doc = meta.into_fields();
        assert!(!doc.contains_key(fields::UUID));
        assert_eq!(doc[fields::LANGUAGE], Value::Null);
        assert_eq!(doc[fields::PARENT], Value::Ref(parent.into_string()));
        assert_eq!(doc[fields::SORT], Value::Int(2));
    }

    #[test]
    fn test_reserved_keys_per_kind() {
        assert!(reserved_keys(Some(EntityKind::Page)).contains(&"template"));
        assert!(reserved_keys(Some(EntityKind::File)).contains(&"template"));
        assert!(reserved_keys(Some(EntityKind::File)).contains(&"sort"));
        assert!(reserved_keys(Some(EntityKind::User)).contains(&"email"));
        assert_eq!(reserved_keys(None).len(), 6);
    }
}
