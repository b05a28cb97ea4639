use super::{IssueQuery, IssueSource};
use crate::error::{Result, ThreadsError};
use crate::model::{Comment, Issue};
use chrono::{DateTime, Utc};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

/// Failure a [`MockIssueSource`] can inject into an issue page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    Unauthorized,
    Forbidden,
    Status(u16),
    Decode,
}

impl MockFailure {
    fn to_error(self, url: &str) -> ThreadsError {
        match self {
            Self::Unauthorized => ThreadsError::Unauthorized {
                body: "Bad credentials".to_string(),
            },
            Self::Forbidden => ThreadsError::Forbidden {
                body: "API rate limit exceeded".to_string(),
            },
            Self::Status(status) => ThreadsError::Http {
                status,
                url: url.to_string(),
                body: "mock failure".to_string(),
            },
            Self::Decode => ThreadsError::Json(<serde_json::Error as serde::de::Error>::custom(
                "invalid issue page",
            )),
        }
    }
}

/// A request observed by a [`MockIssueSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedQuery {
    pub label: String,
    pub since: DateTime<Utc>,
    pub page: u32,
}

/// In-memory [`IssueSource`] serving canned pages.
///
/// Pages beyond those configured for a label are empty.
#[derive(Debug, Default)]
pub struct MockIssueSource {
    pages: HashMap<String, Vec<Vec<Issue>>>,
    label_failures: HashMap<String, (u32, MockFailure)>,
    comments: HashMap<String, Vec<Comment>>,
    failing_comments: HashSet<String>,
    queries: RefCell<Vec<RecordedQuery>>,
    comment_requests: RefCell<Vec<String>>,
}

impl MockIssueSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one page of results for `label`.
    #[must_use]
    pub fn with_page(mut self, label: &str, issues: Vec<Issue>) -> Self {
        self.pages.entry(label.to_string()).or_default().push(issues);
        self
    }

    /// Fail the request for `page` of `label`.
    #[must_use]
    pub fn with_failure(mut self, label: &str, page: u32, failure: MockFailure) -> Self {
        self.label_failures
            .insert(label.to_string(), (page, failure));
        self
    }

    #[must_use]
    pub fn with_comments(mut self, comments_url: &str, comments: Vec<Comment>) -> Self {
        self.comments.insert(comments_url.to_string(), comments);
        self
    }

    #[must_use]
    pub fn with_failing_comments(mut self, comments_url: &str) -> Self {
        self.failing_comments.insert(comments_url.to_string());
        self
    }

    /// Issue page requests seen so far, in order.
    #[must_use]
    pub fn queries(&self) -> Vec<RecordedQuery> {
        self.queries.borrow().clone()
    }

    /// Comment URLs requested so far, in order.
    #[must_use]
    pub fn comment_requests(&self) -> Vec<String> {
        self.comment_requests.borrow().clone()
    }
}

impl IssueSource for MockIssueSource {
    fn list_issues(&self, query: &IssueQuery<'_>) -> Result<Vec<Issue>> {
        self.queries.borrow_mut().push(RecordedQuery {
            label: query.label.to_string(),
            since: query.since,
            page: query.page,
        });

        if let Some((page, failure)) = self.label_failures.get(query.label) {
            if *page == query.page {
                return Err(failure.to_error(query.label));
            }
        }

        let index = (query.page as usize).saturating_sub(1);
        Ok(self
            .pages
            .get(query.label)
            .and_then(|pages| pages.get(index))
            .cloned()
            .unwrap_or_default())
    }

    fn list_comments(&self, comments_url: &str) -> Result<Vec<Comment>> {
        self.comment_requests
            .borrow_mut()
            .push(comments_url.to_string());

        if self.failing_comments.contains(comments_url) {
            return Err(ThreadsError::Http {
                status: 502,
                url: comments_url.to_string(),
                body: "mock failure".to_string(),
            });
        }
        Ok(self.comments.get(comments_url).cloned().unwrap_or_default())
    }
}
