//! Fetch watermark store (`.fetch_metadata.json`).
//!
//! Tracks, per `"{label}/{number}"`, the last `updated_at` written to disk and
//! where it was written, plus the lower bound for the next incremental query.
//! Each label keeps its own query bound; the global one is only the fallback
//! for stores written before labels were tracked separately.
//! Every watermark is monotonic: an update that would move it backwards is
//! ignored.

use crate::error::Result;
use crate::util::{read_json_or_default, time, write_json_pretty};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Last synchronized state of one issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueWatermark {
    #[serde(with = "time::wire")]
    pub updated_at: DateTime<Utc>,
    /// Directory of the record, relative to the data root.
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelWatermark {
    #[serde(with = "time::wire")]
    pub last_fetch: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchMetadata {
    /// Advanced only when every label of a run succeeded.
    #[serde(with = "time::wire", default = "epoch")]
    pub last_fetch: DateTime<Utc>,
    #[serde(default)]
    pub labels: BTreeMap<String, LabelWatermark>,
    #[serde(default)]
    pub issues: BTreeMap<String, IssueWatermark>,
}

const fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

impl Default for FetchMetadata {
    fn default() -> Self {
        Self {
            last_fetch: epoch(),
            labels: BTreeMap::new(),
            issues: BTreeMap::new(),
        }
    }
}

/// Store key for an issue under a label.
#[must_use]
pub fn issue_key(label: &str, number: u64) -> String {
    format!("{label}/{number}")
}

impl FetchMetadata {
    /// Load the store, or an empty one if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        read_json_or_default(path)
    }

    /// Rewrite the store atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_pretty(path, self)
    }

    /// Lower bound for the next query on `label`.
    ///
    /// A label missing from a store that already tracks labels was added to
    /// the configuration later, so its whole history is fetched from the
    /// epoch. Stores written before per-label tracking fall back to the
    /// global `last_fetch`.
    #[must_use]
    pub fn since(&self, label: &str) -> DateTime<Utc> {
        match self.labels.get(label) {
            Some(watermark) => watermark.last_fetch,
            None if self.labels.is_empty() => self.last_fetch,
            None => epoch(),
        }
    }

    #[must_use]
    pub fn issue(&self, label: &str, number: u64) -> Option<&IssueWatermark> {
        self.issues.get(&issue_key(label, number))
    }

    /// True when `updated_at` is strictly newer than what was last written.
    #[must_use]
    pub fn needs_update(&self, label: &str, number: u64, updated_at: DateTime<Utc>) -> bool {
        self.issue(label, number)
            .is_none_or(|watermark| updated_at > watermark.updated_at)
    }

    /// Record that an issue was written. Returns `false` if the stored
    /// watermark is newer and was kept.
    pub fn record_issue(
        &mut self,
        label: &str,
        number: u64,
        updated_at: DateTime<Utc>,
        path: impl Into<String>,
    ) -> bool {
        let key = issue_key(label, number);
        if let Some(existing) = self.issues.get(&key) {
            if updated_at < existing.updated_at {
                return false;
            }
        }
        self.issues.insert(
            key,
            IssueWatermark {
                updated_at,
                path: path.into(),
            },
        );
        true
    }

    pub fn advance_label(&mut self, label: &str, at: DateTime<Utc>) {
        let current = self.since(label);
        self.labels.insert(
            label.to_string(),
            LabelWatermark {
                last_fetch: current.max(at),
            },
        );
    }

    pub fn advance_global(&mut self, at: DateTime<Utc>) {
        self.last_fetch = self.last_fetch.max(at);
    }
}
