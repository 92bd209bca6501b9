//! Backing store for the Khulan content cache
//!
//! The backing store is the source of truth for pages, files, users and the
//! site. This crate defines the contract the cache layer consumes and ships a
//! file-system implementation.
//!
//! # Quick Start
//!
//! ```no_run
//! use khulan_repository::{ContentSource, FileSystemContentSource, SourceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SourceConfig::new("site").with_languages(["en", "de"]);
//!     let source = FileSystemContentSource::from_config(&config)?;
//!
//!     for page in source.pages().await? {
//!         let content = page.read_content(Some("de")).await?;
//!         println!("{}: {} fields", page.id(), content.len());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod file_system;
pub mod traits;

pub use config::{ConfigError, SourceConfig};
pub use error::{RepositoryError, RepositoryResult};
pub use file_system::{FileSystemContentSource, FileSystemEntity};
pub use traits::{ContentEntity, ContentSource};
