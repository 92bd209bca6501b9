//! Khulan Core - shared building blocks of the content cache
//!
//! This crate provides the pieces every other Khulan crate builds on:
//! - Value types for content fields and stored documents
//! - Cache key derivation per (entity, language) variant
//! - Entity kinds and the metadata injected into indexed documents
//! - Blueprint (schema) lookup
//! - The content codec translating between canonical content and indexed documents

pub mod codec;
pub mod entity;
pub mod error;
pub mod key;
pub mod schema;
pub mod types;

// Re-export commonly used types
pub use codec::{ContentCodec, EntityUri, NoopResolver, ReferenceResolver};
pub use entity::{EntityKind, KindMeta, Languages, Metadata, PageStatus};
pub use error::{CoreError, Result};
pub use key::{derive_key, CacheKey};
pub use schema::{Blueprint, FieldType, SchemaLookup};
pub use types::{remove_empty, Document, FieldMap, Value};
