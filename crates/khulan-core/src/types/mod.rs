//! Value types shared by content maps and stored documents

pub mod value;

pub use value::{remove_empty, Document, FieldMap, Value};
