//! Configuration management for `issue_threads`.
//!
//! Values come from command-line flags, which fall back to environment
//! variables (handled by clap). This module validates the collected raw
//! values and builds one explicit configuration value per job:
//!
//! - [`FetchConfig`] needs a credential, a repository and a label set.
//! - [`ComposeConfig`] needs only the label set.
//!
//! Nothing here is global; `main` builds the config and hands it to the job.

use crate::error::{Result, ThreadsError};
use secrecy::SecretString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const REPO_ENV: &str = "GITHUB_REPO";
pub const LABELS_ENV: &str = "VALID_LABELS";
pub const DATA_DIR_ENV: &str = "ITHREADS_DIR";
pub const API_URL_ENV: &str = "GITHUB_API_URL";

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_PER_PAGE: u32 = 100;
/// Largest page size the tracker honors; larger requests are silently capped.
pub const MAX_PER_PAGE: u32 = 100;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Watermark store written by the fetcher.
pub const FETCH_METADATA_FILE: &str = ".fetch_metadata.json";
/// Content-hash store written by the composer.
pub const COMPOSE_METADATA_FILE: &str = ".compose_metadata.json";

/// Raw, unvalidated settings collected from flags and environment.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub token: Option<String>,
    pub repo: Option<String>,
    pub labels: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub api_url: Option<String>,
    pub per_page: Option<u32>,
    pub timeout_secs: Option<u64>,
}

/// Repository identifier in `owner/name` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoName {
    pub owner: String,
    pub name: String,
}

impl FromStr for RepoName {
    type Err = ThreadsError;

    fn from_str(s: &str) -> Result<Self> {
        let components: Vec<&str> = s.trim().split('/').collect();
        match components[..] {
            [owner, name] if !owner.is_empty() && !name.is_empty() => Ok(Self {
                owner: owner.to_string(),
                name: name.to_string(),
            }),
            _ => Err(ThreadsError::config(format!(
                "{REPO_ENV} must be <owner>/<repo>, got '{s}'"
            ))),
        }
    }
}

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Resolved locations of everything the jobs read and write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    pub data_dir: PathBuf,
    pub fetch_metadata: PathBuf,
    pub compose_metadata: PathBuf,
}

impl ConfigPaths {
    #[must_use]
    pub fn new(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            fetch_metadata: data_dir.join(FETCH_METADATA_FILE),
            compose_metadata: data_dir.join(COMPOSE_METADATA_FILE),
        }
    }
}

/// Settings for the fetch job.
#[derive(Debug)]
pub struct FetchConfig {
    pub token: SecretString,
    pub repo: RepoName,
    pub labels: Vec<String>,
    pub paths: ConfigPaths,
    pub api_url: String,
    pub per_page: u32,
    pub timeout: Duration,
}

impl FetchConfig {
    /// Validate raw settings for the fetch job.
    ///
    /// # Errors
    ///
    /// Returns [`ThreadsError::Config`] if the credential, repository or label
    /// set is missing, or if a value is malformed.
    pub fn resolve(cli: &CliOverrides) -> Result<Self> {
        let token = required(cli.token.as_deref(), TOKEN_ENV)?;
        let repo: RepoName = required(cli.repo.as_deref(), REPO_ENV)?.parse()?;
        let labels = resolve_labels(cli.labels.as_deref())?;

        let api_url = cli
            .api_url
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_API_URL)
            .trim_end_matches('/')
            .to_string();

        let per_page = cli.per_page.unwrap_or(DEFAULT_PER_PAGE);
        if per_page == 0 {
            return Err(ThreadsError::config("--per-page must be at least 1"));
        }
        if per_page > MAX_PER_PAGE {
            return Err(ThreadsError::config(format!(
                "--per-page must be at most {MAX_PER_PAGE}, got {per_page}"
            )));
        }

        let timeout_secs = cli.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ThreadsError::config("--timeout must be at least 1 second"));
        }

        Ok(Self {
            token: SecretString::from(token.to_string()),
            repo,
            labels,
            paths: ConfigPaths::new(&resolve_data_dir(cli)),
            api_url,
            per_page,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Endpoint listing the repository's issues.
    #[must_use]
    pub fn issues_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/issues",
            self.api_url, self.repo.owner, self.repo.name
        )
    }
}

/// Settings for the compose job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeConfig {
    pub labels: Vec<String>,
    pub paths: ConfigPaths,
}

impl ComposeConfig {
    /// Validate raw settings for the compose job.
    ///
    /// # Errors
    ///
    /// Returns [`ThreadsError::Config`] if the label set is missing.
    pub fn resolve(cli: &CliOverrides) -> Result<Self> {
        Ok(Self {
            labels: resolve_labels(cli.labels.as_deref())?,
            paths: ConfigPaths::new(&resolve_data_dir(cli)),
        })
    }
}

fn required<'a>(value: Option<&'a str>, env_name: &str) -> Result<&'a str> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            ThreadsError::config(format!(
                "{env_name} not found in environment, .env file or command-line flags"
            ))
        })
}

fn resolve_data_dir(cli: &CliOverrides) -> PathBuf {
    cli.data_dir
        .clone()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn resolve_labels(raw: Option<&str>) -> Result<Vec<String>> {
    let labels = parse_labels(required(raw, LABELS_ENV)?);
    if labels.is_empty() {
        return Err(ThreadsError::config(format!(
            "{LABELS_ENV} must name at least one label"
        )));
    }
    Ok(labels)
}

/// Split a comma-separated label list.
///
/// Entries are trimmed, blanks dropped, and the result sorted and
/// de-duplicated so label processing order is stable.
#[must_use]
pub fn parse_labels(raw: &str) -> Vec<String> {
    let mut labels: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(ToString::to_string)
        .collect();
    labels.sort();
    labels.dedup();
    labels
}
