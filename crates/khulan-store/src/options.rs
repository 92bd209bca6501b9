//! Find options, index specifications and aggregation stages

use crate::filter::{compare_values, lookup, Filter};
use khulan_core::entity::fields;
use khulan_core::Document;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Options for multi-document finds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Fields to keep; `_id` is always kept
    pub projection: Option<Vec<String>>,
    pub sort: Vec<(String, SortOrder)>,
    pub limit: Option<usize>,
    pub skip: usize,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_projection<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort.push((field.into(), order));
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    /// Sort, page and project already filtered documents
    pub fn apply(&self, mut docs: Vec<Document>) -> Vec<Document> {
        sort_documents(&mut docs, &self.sort);
        let docs = docs
            .into_iter()
            .skip(self.skip)
            .take(self.limit.unwrap_or(usize::MAX));

        match &self.projection {
            Some(projection) => docs.map(|doc| project(doc, projection)).collect(),
            None => docs.collect(),
        }
    }
}

/// Secondary index definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub keys: Vec<(String, SortOrder)>,
    /// Unique indexes are sparse: documents missing any key field are not indexed
    pub unique: bool,
}

impl IndexSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keys: Vec::new(),
            unique: false,
        }
    }

    pub fn key(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.keys.push((field.into(), order));
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(|(field, _)| field.as_str())
    }
}

/// Aggregation pipeline stage
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Filter),
    Sort(Vec<(String, SortOrder)>),
    Skip(usize),
    Limit(usize),
    Project(Vec<String>),
}

/// Run a pipeline over documents in memory
pub fn apply_stages(mut docs: Vec<Document>, stages: &[Stage]) -> Vec<Document> {
    for stage in stages {
        docs = match stage {
            Stage::Match(filter) => docs.into_iter().filter(|d| filter.matches(d)).collect(),
            Stage::Sort(keys) => {
                sort_documents(&mut docs, keys);
                docs
            }
            Stage::Skip(n) => docs.into_iter().skip(*n).collect(),
            Stage::Limit(n) => docs.into_iter().take(*n).collect(),
            Stage::Project(projection) => {
                docs.into_iter().map(|d| project(d, projection)).collect()
            }
        };
    }
    docs
}

/// Keep only the projected top-level fields plus `_id`
pub fn project(doc: Document, projection: &[String]) -> Document {
    doc.into_iter()
        .filter(|(name, _)| name == fields::PRIMARY_KEY || projection.iter().any(|p| p == name))
        .collect()
}

/// Stable multi-key sort; missing and incomparable values sort first
pub fn sort_documents(docs: &mut [Document], keys: &[(String, SortOrder)]) {
    if keys.is_empty() {
        return;
    }
    docs.sort_by(|a, b| {
        for (field, order) in keys {
            let ordering = match (lookup(a, field), lookup(b, field)) {
                (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            let ordering = match order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use khulan_core::Value;

    fn page(id: &str, num: i64) -> Document {
        Document::from([
            ("_id".to_string(), Value::from(format!("key-{}", id))),
            ("id".to_string(), Value::from(id)),
            ("num".to_string(), Value::Int(num)),
            ("title".to_string(), Value::from(id.to_uppercase())),
        ])
    }

    #[test]
    fn test_find_options_apply() {
        let docs = vec![page("b", 2), page("c", 3), page("a", 1)];
        let options = FindOptions::new()
            .sort_by("num", SortOrder::Descending)
            .with_skip(1)
            .with_limit(1)
            .with_projection(["id"]);

        let result = options.apply(docs);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0]["id"], Value::from("b"));
        assert!(result[0].contains_key("_id"));
        assert!(!result[0].contains_key("title"));
    }

    #[test]
    fn test_pipeline_stages() {
        let docs = vec![page("b", 2), page("c", 3), page("a", 1)];
        let result = apply_stages(
            docs,
            &[
                Stage::Match(Filter::Gt("num".to_string(), Value::Int(1))),
                Stage::Sort(vec![("id".to_string(), SortOrder::Ascending)]),
                Stage::Project(vec!["num".to_string()]),
            ],
        );

        assert_eq!(result.len(), 2);
        assert_eq!(result[0]["num"], Value::Int(2));
        assert_eq!(result[1]["num"], Value::Int(3));
        assert!(!result[0].contains_key("id"));
    }

    #[test]
    fn test_index_spec_builder() {
        let spec = IndexSpec::new("id_language")
            .key("id", SortOrder::Ascending)
            .key("language", SortOrder::Ascending)
            .unique();

        assert!(spec.unique);
        assert_eq!(spec.field_names().collect::<Vec<_>>(), vec!["id", "language"]);
    }
}
