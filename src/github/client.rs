use super::{IssueQuery, IssueSource};
use crate::config::FetchConfig;
use crate::error::{Result, ThreadsError};
use crate::model::{Comment, Issue};
use crate::util::format_wire;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

const USER_AGENT: &str = concat!("issue_threads/", env!("CARGO_PKG_VERSION"));
const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// Blocking client for a GitHub-compatible REST API.
pub struct GitHubClient {
    http: Client,
    token: SecretString,
    issues_url: String,
    per_page: u32,
}

impl GitHubClient {
    /// Build a client from the fetch configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            token: SecretString::from(config.token.expose_secret().to_owned()),
            issues_url: config.issues_url(),
            per_page: config.per_page,
        })
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str, params: &[(&str, String)]) -> Result<T> {
        let response = self
            .http
            .get(url)
            .query(params)
            .header(ACCEPT, GITHUB_ACCEPT)
            .bearer_auth(self.token.expose_secret())
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "No response text".to_string());
            return Err(status_error(status, url, body));
        }

        let bytes = response.bytes()?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn status_error(status: StatusCode, url: &str, body: String) -> ThreadsError {
    match status {
        StatusCode::UNAUTHORIZED => ThreadsError::Unauthorized { body },
        StatusCode::FORBIDDEN => ThreadsError::Forbidden { body },
        _ => ThreadsError::Http {
            status: status.as_u16(),
            url: url.to_string(),
            body,
        },
    }
}

impl IssueSource for GitHubClient {
    #[instrument(skip(self, query), fields(label = query.label, page = query.page))]
    fn list_issues(&self, query: &IssueQuery<'_>) -> Result<Vec<Issue>> {
        let params = [
            ("state", "all".to_string()),
            ("labels", query.label.to_string()),
            ("since", format_wire(&query.since)),
            ("per_page", query.per_page.to_string()),
            ("page", query.page.to_string()),
        ];
        let issues: Vec<Issue> = self.get_json(&self.issues_url, &params)?;
        debug!(count = issues.len(), "Fetched issue page");
        Ok(issues)
    }

    /// A page shorter than `per_page` is the last one; config keeps
    /// `per_page` within the tracker's cap so full pages are never truncated.
    #[instrument(skip(self))]
    fn list_comments(&self, comments_url: &str) -> Result<Vec<Comment>> {
        let mut comments = Vec::new();
        let mut page = 1_u32;
        loop {
            let params = [
                ("per_page", self.per_page.to_string()),
                ("page", page.to_string()),
            ];
            let batch: Vec<Comment> = self.get_json(comments_url, &params)?;
            let last_page = batch.len() < self.per_page as usize;
            comments.extend(batch);
            if last_page {
                break;
            }
            page += 1;
        }
        debug!(count = comments.len(), "Fetched comments");
        Ok(comments)
    }
}
