//! Thread composition.
//!
//! Walks `<label>/<slug>/<number>/` under each configured label and renders
//! `thread.md` for every directory whose `issue.json`/`comments.json` bytes
//! differ from the pair recorded in the content-hash store.

pub mod hashes;
pub mod render;

pub use hashes::{ComposeMetadata, ContentHashes};
pub use render::{render_from_bytes, render_thread};

use crate::config::ComposeConfig;
use crate::error::{Result, ThreadsError};
use crate::model::{COMMENTS_FILE, ISSUE_FILE, THREAD_FILE};
use crate::util::write_atomic;
use serde::Serialize;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// How a failing issue directory affects the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ComposeErrorPolicy {
    /// Abort the run on the first failing directory (default).
    #[default]
    Strict,
    /// Record the failure and continue with the next directory.
    BestEffort,
}

impl std::fmt::Display for ComposeErrorPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match self {
            Self::Strict => "strict",
            Self::BestEffort => "best-effort",
        };
        write!(f, "{value}")
    }
}

impl std::str::FromStr for ComposeErrorPolicy {
    type Err = String;

    fn from_str(input: &str) -> std::result::Result<Self, Self::Err> {
        match input.to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "best-effort" | "best_effort" | "best" => Ok(Self::BestEffort),
            other => Err(format!(
                "Invalid error policy: {other}. Must be one of: strict, best-effort"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ComposeOptions {
    /// Render even when the hashes match.
    pub force: bool,
    pub error_policy: ComposeErrorPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadOutcome {
    Rendered,
    Unchanged,
}

/// A directory that failed under the best-effort policy.
#[derive(Debug, Clone, Serialize)]
pub struct ComposeFailure {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComposeReport {
    pub checked: usize,
    pub rendered: usize,
    pub skipped: usize,
    pub failures: Vec<ComposeFailure>,
    pub policy_used: ComposeErrorPolicy,
}

impl ComposeReport {
    const fn new(policy: ComposeErrorPolicy) -> Self {
        Self {
            checked: 0,
            rendered: 0,
            skipped: 0,
            failures: Vec::new(),
            policy_used: policy,
        }
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// An issue directory found by [`issue_dirs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueDir {
    /// `label/slug/number`, the key in the content-hash store.
    pub key: String,
    pub path: PathBuf,
}

/// List `<slug>/<number>/` directories under a label root that contain an
/// issue record, sorted by slug then number name.
///
/// # Errors
///
/// Returns an error if a directory cannot be read.
pub fn issue_dirs(data_dir: &Path, label: &str) -> Result<Vec<IssueDir>> {
    let root = data_dir.join(label);
    let mut found = Vec::new();
    for (slug, slug_path) in sorted_subdirs(&root)? {
        for (number, issue_path) in sorted_subdirs(&slug_path)? {
            if issue_path.join(ISSUE_FILE).is_file() {
                found.push(IssueDir {
                    key: format!("{label}/{slug}/{number}"),
                    path: issue_path,
                });
            }
        }
    }
    Ok(found)
}

fn sorted_subdirs(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push((entry.file_name().to_string_lossy().into_owned(), path));
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Run the compose job over every configured label.
///
/// The hash store is rewritten only if it changed.
///
/// # Errors
///
/// Under [`ComposeErrorPolicy::Strict`], the first failing directory aborts
/// the run (after saving the hashes of directories already rendered).
/// Store and progress-write failures are always returned.
pub fn run_compose<W: Write>(
    config: &ComposeConfig,
    options: &ComposeOptions,
    out: &mut W,
) -> Result<ComposeReport> {
    let store_path = &config.paths.compose_metadata;
    let mut metadata = ComposeMetadata::load(store_path)?;
    let mut dirty = false;
    let mut report = ComposeReport::new(options.error_policy);

    for label in &config.labels {
        if !config.paths.data_dir.join(label).is_dir() {
            debug!(label = %label, "No records for label");
            continue;
        }
        writeln!(out, "\nProcessing {label} issues...")?;

        for dir in issue_dirs(&config.paths.data_dir, label)? {
            writeln!(out, "Checking thread for {}", dir.key)?;
            report.checked += 1;

            match compose_thread(&dir, &mut metadata, options.force, out) {
                Ok(ThreadOutcome::Rendered) => {
                    report.rendered += 1;
                    dirty = true;
                }
                Ok(ThreadOutcome::Unchanged) => report.skipped += 1,
                Err(err) => {
                    error!(path = %dir.key, error = %err, "Failed to compose thread");
                    match options.error_policy {
                        ComposeErrorPolicy::Strict => {
                            if dirty {
                                metadata.save(store_path)?;
                            }
                            return Err(err);
                        }
                        ComposeErrorPolicy::BestEffort => {
                            writeln!(out, "Error composing {}: {err}", dir.key)?;
                            report.failures.push(ComposeFailure {
                                path: dir.key.clone(),
                                message: err.to_string(),
                            });
                        }
                    }
                }
            }
        }
    }

    if dirty {
        metadata.save(store_path)?;
    }

    writeln!(
        out,
        "\nDone! Processed {} issue directories",
        report.checked
    )?;
    info!(
        checked = report.checked,
        rendered = report.rendered,
        skipped = report.skipped,
        "Compose finished"
    );
    Ok(report)
}

/// Render one issue directory unless its content hashes are unchanged.
///
/// # Errors
///
/// Returns an error if a record cannot be read or decoded, or the thread
/// document cannot be written. The store is untouched on error.
pub fn compose_thread<W: Write>(
    dir: &IssueDir,
    metadata: &mut ComposeMetadata,
    force: bool,
    out: &mut W,
) -> Result<ThreadOutcome> {
    let issue_path = dir.path.join(ISSUE_FILE);
    let comments_path = dir.path.join(COMMENTS_FILE);

    let issue_bytes = fs::read(&issue_path)?;
    let comments_bytes = match fs::read(&comments_path) {
        Ok(bytes) => Some(bytes),
        Err(err) if err.kind() == ErrorKind::NotFound => None,
        Err(err) => return Err(err.into()),
    };

    let hashes = ContentHashes::of(&issue_bytes, comments_bytes.as_deref());
    if !force && metadata.is_unchanged(&dir.key, &hashes) {
        writeln!(out, "Skipping {} - no changes detected", dir.key)?;
        return Ok(ThreadOutcome::Unchanged);
    }

    let document = render_from_bytes(&issue_bytes, comments_bytes.as_deref())
        .map_err(|err| ThreadsError::record(&dir.path, err))?;
    write_atomic(&dir.path.join(THREAD_FILE), document.as_bytes())?;

    metadata.insert(dir.key.clone(), hashes);
    debug!(path = %dir.key, "Rendered thread");
    Ok(ThreadOutcome::Rendered)
}
