//! Access to the remote issue tracker.
//!
//! [`IssueSource`] is the seam between the fetch job and the network.
//! [`GitHubClient`] talks to a GitHub-compatible REST API with blocking
//! requests; [`MockIssueSource`] serves canned pages for tests.

mod client;
mod mock;

pub use client::GitHubClient;
pub use mock::{MockFailure, MockIssueSource, RecordedQuery};

use crate::error::Result;
use crate::model::{Comment, Issue};
use chrono::{DateTime, Utc};

/// One page request against the issues endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueQuery<'a> {
    pub label: &'a str,
    pub since: DateTime<Utc>,
    /// 1-based page number.
    pub page: u32,
    pub per_page: u32,
}

/// Source of issues and comments.
pub trait IssueSource {
    /// Fetch one page of issues (all states) carrying `query.label` and
    /// updated at or after `query.since`. An empty page means no more results.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ThreadsError::Unauthorized`] / [`crate::ThreadsError::Forbidden`]
    /// for 401/403, and transport, status or decode errors otherwise.
    fn list_issues(&self, query: &IssueQuery<'_>) -> Result<Vec<Issue>>;

    /// Fetch every comment at `comments_url`, in the order the API returns them.
    ///
    /// # Errors
    ///
    /// Returns an error if any page request or decode fails.
    fn list_comments(&self, comments_url: &str) -> Result<Vec<Comment>>;
}
