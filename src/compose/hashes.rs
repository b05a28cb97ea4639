//! Compose content-hash store (`.compose_metadata.json`).
//!
//! Maps an issue directory (relative to the data root) to the SHA-256 of the
//! `issue.json` and `comments.json` bytes it was last rendered from. An absent
//! comments file hashes to the empty string.

use crate::error::Result;
use crate::util::{read_json_or_default, sha256_hex, write_json_pretty};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentHashes {
    pub issue: String,
    pub comments: String,
}

impl ContentHashes {
    #[must_use]
    pub fn of(issue: &[u8], comments: Option<&[u8]>) -> Self {
        Self {
            issue: sha256_hex(issue),
            comments: comments.map(sha256_hex).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComposeMetadata {
    entries: BTreeMap<String, ContentHashes>,
}

impl ComposeMetadata {
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        read_json_or_default(path)
    }

    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_pretty(path, self)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ContentHashes> {
        self.entries.get(key)
    }

    /// True iff both hashes match the recorded pair.
    #[must_use]
    pub fn is_unchanged(&self, key: &str, hashes: &ContentHashes) -> bool {
        self.entries.get(key) == Some(hashes)
    }

    /// Record a pair. Returns `true` if the store changed.
    pub fn insert(&mut self, key: impl Into<String>, hashes: ContentHashes) -> bool {
        self.entries.insert(key.into(), hashes.clone()) != Some(hashes)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
