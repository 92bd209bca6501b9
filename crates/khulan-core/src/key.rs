//! Cache key derivation
//!
//! Every (entity id, language) variant is stored under a fixed-length key: the
//! first 24 hex characters of the SHA-256 digest of `id` or `id-lang`.

use crate::entity::Languages;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Length of a content key in hex characters (12 bytes)
pub const KEY_LENGTH: usize = 24;

/// Primary key of a document in the content or cache collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key of an entity variant
    ///
    /// SHA-256 (from `sha2`) stands in for a fast non-cryptographic hash: keys
    /// only need to be stable across processes and machines, and a truncated
    /// digest of that shape is 24 hex characters either way. Changing the
    /// hash changes every stored key and requires a full reindex.
    pub fn derive(id: &str, language: Option<&str>) -> Self {
        let raw = match language {
            Some(code) => format!("{}-{}", id, code),
            None => id.to_string(),
        };
        let mut digest = Self::hashed(&raw).0;
        digest.truncate(KEY_LENGTH);
        Self(digest)
    }

    /// Full-length digest of an opaque key, as used by the key-value cache
    pub fn hashed(raw: &str) -> Self {
        Self(hex::encode(Sha256::digest(raw.as_bytes())))
    }

    /// Wrap a key read back from the store
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derive the key of an entity variant, falling back to the current language
/// on multilingual sites when none is given
pub fn derive_key(id: &str, language: Option<&str>, languages: &Languages) -> CacheKey {
    let language = languages.resolve(language);
    CacheKey::derive(id, language.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_fixed_length_lowercase_hex() {
        let key = CacheKey::derive("blog/hello-world", Some("en"));
        assert_eq!(key.as_str().len(), KEY_LENGTH);
        assert!(key
            .as_str()
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_key_is_deterministic() {
        assert_eq!(
            CacheKey::derive("home", Some("de")),
            CacheKey::derive("home", Some("de"))
        );
        assert_ne!(
            CacheKey::derive("home", Some("de")),
            CacheKey::derive("home", Some("en"))
        );
        assert_ne!(CacheKey::derive("home", None), CacheKey::derive("home", Some("en")));
    }

    #[test]
    fn test_key_matches_language_suffixed_digest() {
        let expected = &CacheKey::hashed("home-en").into_string()[..KEY_LENGTH];
        assert_eq!(CacheKey::derive("home", Some("en")).as_str(), expected);
    }

    #[test]
    fn test_hashed_keeps_full_digest() {
        let key = CacheKey::hashed("sessions/abc");
        assert_eq!(key.as_str().len(), 64);
    }

    #[test]
    fn test_derive_key_resolves_current_language() {
        let single = Languages::single();
        assert_eq!(derive_key("home", None, &single), CacheKey::derive("home", None));

        let multi = Languages::new(vec!["en".to_string(), "de".to_string()]);
        assert_eq!(
            derive_key("home", None, &multi),
            CacheKey::derive("home", Some("en"))
        );
        assert_eq!(
            derive_key("home", Some("de"), &multi),
            CacheKey::derive("home", Some("de"))
        );
    }
}
