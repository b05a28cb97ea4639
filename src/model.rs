//! Records exchanged with the issue tracker and persisted on disk.
//!
//! Only the fields the jobs read are typed. Everything else the tracker sends
//! is kept in `extra` so that `issue.json` and `comments.json` hold the full
//! payload.

use crate::util::time;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Issue payload inside `<label>/<slug>/<number>/`.
pub const ISSUE_FILE: &str = "issue.json";
/// Comment list, present only when the issue had comments.
pub const COMMENTS_FILE: &str = "comments.json";
/// Rendered thread document.
pub const THREAD_FILE: &str = "thread.md";

/// Slug used when a title carries no `[token]`.
pub const UNKNOWN_SLUG: &str = "unknown";

static SLUG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([\w-]+)\]").expect("valid regex"));

/// Extract the slug from an issue title.
///
/// The slug is the first bracketed token made of word characters and hyphens.
#[must_use]
pub fn extract_slug(title: &str) -> &str {
    SLUG_PATTERN
        .captures(title)
        .and_then(|caps| caps.get(1))
        .map_or(UNKNOWN_SLUG, |m| m.as_str())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct User {
    pub login: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Label {
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Label {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    #[default]
    Open,
    Closed,
}

impl IssueState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for IssueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An issue as returned by the issues endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub user: User,
    #[serde(with = "time::wire")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "time::wire")]
    pub updated_at: DateTime<Utc>,
    pub state: IssueState,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub body: Option<String>,
    /// Comment count reported by the tracker.
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub comments_url: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Issue {
    #[must_use]
    pub fn slug(&self) -> &str {
        extract_slug(&self.title)
    }

    /// Comma-joined label names, in payload order.
    #[must_use]
    pub fn label_names(&self) -> String {
        self.labels
            .iter()
            .map(|label| label.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    #[must_use]
    pub fn body_text(&self) -> &str {
        self.body.as_deref().unwrap_or_default()
    }
}

/// A comment as returned by the comments endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub user: User,
    #[serde(with = "time::wire")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Comment {
    #[must_use]
    pub fn body_text(&self) -> &str {
        self.body.as_deref().unwrap_or_default()
    }
}
