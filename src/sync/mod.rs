//! Incremental fetch of labeled issues into the on-disk record tree.
//!
//! For each label the issues endpoint is paged until an empty page comes
//! back. Each issue newer than its watermark is written to
//! `<label>/<slug>/<number>/issue.json`, with `comments.json` beside it when
//! the issue has comments.
//!
//! Failure handling:
//! - 401/403 abort the run (the store is still saved so per-issue watermarks
//!   for records already written are kept)
//! - any other page error aborts only that label; its watermark is not
//!   advanced and the run reports it as failed
//! - comment fetch errors are logged and the issue is saved without them

pub mod watermark;

pub use watermark::{FetchMetadata, IssueWatermark, LabelWatermark, issue_key};

use crate::config::ConfigPaths;
use crate::error::{Result, ThreadsError};
use crate::github::{IssueQuery, IssueSource};
use crate::model::{COMMENTS_FILE, ISSUE_FILE, Issue};
use crate::util::{format_wire, time, write_json_pretty};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Options for one fetch run.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub per_page: u32,
    /// Watermark applied to every successful label; normally the run start.
    pub started_at: DateTime<Utc>,
}

/// What happened to one issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueOutcome {
    /// Not newer than its watermark; nothing written.
    Unchanged,
    Saved { comments_failed: bool },
}

/// Per-label summary.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LabelReport {
    pub label: String,
    pub pages: u32,
    pub seen: usize,
    pub saved: usize,
    pub skipped: usize,
    pub comment_failures: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LabelReport {
    fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Summary of a fetch run.
#[derive(Debug, Clone, Serialize)]
pub struct FetchReport {
    #[serde(with = "time::wire")]
    pub started_at: DateTime<Utc>,
    pub labels: Vec<LabelReport>,
}

impl FetchReport {
    #[must_use]
    pub fn total_seen(&self) -> usize {
        self.labels.iter().map(|label| label.seen).sum()
    }

    #[must_use]
    pub fn total_saved(&self) -> usize {
        self.labels.iter().map(|label| label.saved).sum()
    }

    #[must_use]
    pub fn failed_labels(&self) -> Vec<String> {
        self.labels
            .iter()
            .filter(|label| !label.is_complete())
            .map(|label| label.label.clone())
            .collect()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.labels.iter().all(LabelReport::is_complete)
    }
}

/// Run the fetch job over every label.
///
/// Progress lines go to `out`. The watermark store is rewritten at the end,
/// or before returning a run-fatal error.
///
/// # Errors
///
/// Returns run-fatal errors (401/403), failures to load or save the store,
/// and failures writing progress. Label-level failures are recorded in the
/// report instead.
pub fn run_fetch<S: IssueSource, W: Write>(
    source: &S,
    labels: &[String],
    paths: &ConfigPaths,
    options: &FetchOptions,
    out: &mut W,
) -> Result<FetchReport> {
    let mut metadata = FetchMetadata::load(&paths.fetch_metadata)?;
    let mut report = FetchReport {
        started_at: options.started_at,
        labels: Vec::with_capacity(labels.len()),
    };

    for label in labels {
        writeln!(out, "\nProcessing issues with label: {label}")?;
        let mut label_report = LabelReport::new(label);

        match fetch_label(
            source,
            label,
            &mut metadata,
            &paths.data_dir,
            options.per_page,
            &mut label_report,
            out,
        ) {
            Ok(()) => {
                metadata.advance_label(label, options.started_at);
                writeln!(
                    out,
                    "Completed processing {} issues for label '{label}'",
                    label_report.seen
                )?;
            }
            Err(err) if err.is_run_fatal() => {
                error!(label = %label, error = %err, "Aborting fetch");
                metadata.save(&paths.fetch_metadata)?;
                return Err(err);
            }
            Err(err) => {
                error!(label = %label, error = %err, "Label fetch failed");
                writeln!(out, "Error processing label '{label}': {err}")?;
                label_report.error = Some(err.to_string());
            }
        }
        report.labels.push(label_report);
    }

    if report.is_complete() {
        metadata.advance_global(options.started_at);
    } else {
        warn!(
            failed = ?report.failed_labels(),
            "Global watermark left unchanged; failed labels will be retried from their own watermark"
        );
    }
    metadata.save(&paths.fetch_metadata)?;

    writeln!(out, "\nDone! Processed {} total issues", report.total_seen())?;
    info!(
        seen = report.total_seen(),
        saved = report.total_saved(),
        "Fetch finished"
    );
    Ok(report)
}

/// Page through one label until an empty page.
///
/// # Errors
///
/// Returns the first page or write error; issues already saved stay
/// recorded in `metadata`.
pub fn fetch_label<S: IssueSource, W: Write>(
    source: &S,
    label: &str,
    metadata: &mut FetchMetadata,
    data_dir: &Path,
    per_page: u32,
    report: &mut LabelReport,
    out: &mut W,
) -> Result<()> {
    let since = metadata.since(label);
    debug!(label, since = %format_wire(&since), "Starting label fetch");

    let mut page = 1_u32;
    loop {
        writeln!(out, "Fetching page {page} for label '{label}'...")?;
        let batch = source.list_issues(&IssueQuery {
            label,
            since,
            page,
            per_page,
        })?;
        if batch.is_empty() {
            break;
        }
        writeln!(out, "Retrieved {} issues", batch.len())?;
        report.pages += 1;

        for issue in &batch {
            report.seen += 1;
            match process_issue(source, label, issue, metadata, data_dir, out)? {
                IssueOutcome::Unchanged => report.skipped += 1,
                IssueOutcome::Saved { comments_failed } => {
                    report.saved += 1;
                    if comments_failed {
                        report.comment_failures += 1;
                    }
                }
            }
        }
        page += 1;
    }
    Ok(())
}

/// Persist one issue (and its comments) if it is newer than its watermark.
///
/// # Errors
///
/// Returns an error if the record cannot be written. Comment fetch failures
/// are not errors.
pub fn process_issue<S: IssueSource, W: Write>(
    source: &S,
    label: &str,
    issue: &Issue,
    metadata: &mut FetchMetadata,
    data_dir: &Path,
    out: &mut W,
) -> Result<IssueOutcome> {
    if !metadata.needs_update(label, issue.number, issue.updated_at) {
        let since = metadata
            .issue(label, issue.number)
            .map_or(issue.updated_at, |previous| previous.updated_at);
        writeln!(
            out,
            "Skipping issue {} - no updates since {}",
            issue.number,
            format_wire(&since)
        )?;
        return Ok(IssueOutcome::Unchanged);
    }

    let slug = issue.slug();
    let number = issue.number.to_string();
    let relative = format!("{label}/{slug}/{number}");
    let dir = data_dir.join(label).join(slug).join(&number);

    write_json_pretty(&dir.join(ISSUE_FILE), issue)?;

    let mut comments_failed = false;
    let comments_path = dir.join(COMMENTS_FILE);
    if issue.comments > 0 {
        writeln!(
            out,
            "Fetching {} comments for issue {}",
            issue.comments, issue.number
        )?;
        match source.list_comments(&issue.comments_url) {
            Ok(comments) if comments.is_empty() => {
                debug!(issue = issue.number, "Comment endpoint returned no comments");
            }
            Ok(comments) => write_json_pretty(&comments_path, &comments)?,
            Err(err) => {
                warn!(issue = issue.number, error = %err, "Comment fetch failed");
                writeln!(out, "Error fetching comments for issue {}: {err}", issue.number)?;
                comments_failed = true;
            }
        }
    } else {
        remove_stale(&comments_path)?;
    }

    metadata.record_issue(label, issue.number, issue.updated_at, relative);
    writeln!(
        out,
        "Saved issue {} with slug '{slug}' under label '{label}' ({} comments)",
        issue.number, issue.comments
    )?;
    Ok(IssueOutcome::Saved { comments_failed })
}

/// Drop a comments file left over from when the issue still had comments.
fn remove_stale(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Removed stale comments file");
            Ok(())
        }
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(ThreadsError::Io(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::{MockFailure, MockIssueSource};
    use crate::model::{Comment, IssueState, Label, User};
    use crate::util::parse_wire;
    use serde_json::Map;
    use std::io;
    use tempfile::TempDir;

    fn ts(value: &str) -> DateTime<Utc> {
        parse_wire(value).unwrap()
    }

    fn make_issue(number: u64, title: &str, updated_at: &str, comments: u64) -> Issue {
        Issue {
            number,
            title: title.to_string(),
            user: User::new("alice"),
            created_at: ts("2024-01-01T00:00:00Z"),
            updated_at: ts(updated_at),
            state: IssueState::Open,
            labels: vec![Label::new("faro")],
            body: Some("body".to_string()),
            comments,
            comments_url: format!("https://api.test/repos/o/r/issues/{number}/comments"),
            extra: Map::new(),
        }
    }

    fn make_comment(login: &str, body: &str) -> Comment {
        Comment {
            user: User::new(login),
            created_at: ts("2024-01-02T00:00:00Z"),
            body: Some(body.to_string()),
            extra: Map::new(),
        }
    }

    fn options() -> FetchOptions {
        FetchOptions {
            per_page: 100,
            started_at: ts("2024-06-01T00:00:00Z"),
        }
    }

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn saves_issue_under_label_slug_number() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths::new(temp.path());
        let source = MockIssueSource::new()
            .with_page("faro", vec![make_issue(12, "[faro-sdk] crash", "2024-01-05T00:00:00Z", 0)]);

        let report = run_fetch(&source, &labels(&["faro"]), &paths, &options(), &mut io::sink())
            .unwrap();

        assert!(report.is_complete());
        assert_eq!(report.total_saved(), 1);
        let issue_path = temp.path().join("faro/faro-sdk/12").join(ISSUE_FILE);
        assert!(issue_path.exists());
        assert!(!temp.path().join("faro/faro-sdk/12").join(COMMENTS_FILE).exists());

        let metadata = FetchMetadata::load(&paths.fetch_metadata).unwrap();
        let watermark = metadata.issue("faro", 12).unwrap();
        assert_eq!(watermark.path, "faro/faro-sdk/12");
        assert_eq!(watermark.updated_at, ts("2024-01-05T00:00:00Z"));
        assert_eq!(metadata.last_fetch, options().started_at);
        assert_eq!(metadata.since("faro"), options().started_at);
    }

    #[test]
    fn empty_first_page_terminates_without_error() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths::new(temp.path());
        let source = MockIssueSource::new();

        let report = run_fetch(&source, &labels(&["faro"]), &paths, &options(), &mut io::sink())
            .unwrap();

        assert!(report.is_complete());
        assert_eq!(report.labels[0].pages, 0);
        assert_eq!(source.queries().len(), 1);
    }

    #[test]
    fn pages_until_an_empty_page() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths::new(temp.path());
        let source = MockIssueSource::new()
            .with_page("faro", vec![make_issue(1, "[a] one", "2024-01-05T00:00:00Z", 0)])
            .with_page("faro", vec![make_issue(2, "[b] two", "2024-01-05T00:00:00Z", 0)]);

        let report = run_fetch(&source, &labels(&["faro"]), &paths, &options(), &mut io::sink())
            .unwrap();

        assert_eq!(report.labels[0].pages, 2);
        assert_eq!(report.total_saved(), 2);
        let pages: Vec<u32> = source.queries().iter().map(|q| q.page).collect();
        assert_eq!(pages, vec![1, 2, 3]);
    }

    #[test]
    fn unchanged_issue_is_not_rewritten() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths::new(temp.path());

        let mut metadata = FetchMetadata::default();
        metadata.record_issue("faro", 7, ts("2024-01-05T00:00:00Z"), "faro/x/7");
        metadata.save(&paths.fetch_metadata).unwrap();

        let source = MockIssueSource::new()
            .with_page("faro", vec![make_issue(7, "[x] same", "2024-01-05T00:00:00Z", 3)]);
        let report = run_fetch(&source, &labels(&["faro"]), &paths, &options(), &mut io::sink())
            .unwrap();

        assert_eq!(report.labels[0].skipped, 1);
        assert_eq!(report.labels[0].saved, 0);
        assert!(!temp.path().join("faro").exists());
        assert!(source.comment_requests().is_empty());

        let metadata = FetchMetadata::load(&paths.fetch_metadata).unwrap();
        assert_eq!(
            metadata.issue("faro", 7).unwrap().updated_at,
            ts("2024-01-05T00:00:00Z")
        );
    }

    #[test]
    fn older_issue_keeps_newer_record() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths::new(temp.path());

        let mut metadata = FetchMetadata::default();
        metadata.record_issue("faro", 8, ts("2024-02-01T00:00:00Z"), "faro/x/8");
        metadata.save(&paths.fetch_metadata).unwrap();

        let source = MockIssueSource::new()
            .with_page("faro", vec![make_issue(8, "[x] stale copy", "2024-01-15T00:00:00Z", 1)]);
        let mut out = Vec::new();
        let report =
            run_fetch(&source, &labels(&["faro"]), &paths, &options(), &mut out).unwrap();

        assert_eq!(report.labels[0].skipped, 1);
        assert!(!temp.path().join("faro").exists());
        assert!(source.comment_requests().is_empty());
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Skipping issue 8 - no updates since 2024-02-01T00:00:00Z"));

        let stored = FetchMetadata::load(&paths.fetch_metadata).unwrap();
        let watermark = stored.issue("faro", 8).unwrap();
        assert_eq!(watermark.updated_at, ts("2024-02-01T00:00:00Z"));
        assert_eq!(watermark.path, "faro/x/8");
    }

    #[test]
    fn query_uses_label_watermark() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths::new(temp.path());

        let mut metadata = FetchMetadata::default();
        metadata.advance_label("faro", ts("2024-05-01T00:00:00Z"));
        metadata.save(&paths.fetch_metadata).unwrap();

        let source = MockIssueSource::new();
        run_fetch(&source, &labels(&["faro"]), &paths, &options(), &mut io::sink()).unwrap();

        assert_eq!(source.queries()[0].since, ts("2024-05-01T00:00:00Z"));
    }

    #[test]
    fn newly_configured_label_fetches_full_history() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths::new(temp.path());
        let first = MockIssueSource::new();
        run_fetch(&first, &labels(&["faro"]), &paths, &options(), &mut io::sink()).unwrap();

        let second = MockIssueSource::new();
        let later = FetchOptions {
            per_page: 100,
            started_at: ts("2024-07-01T00:00:00Z"),
        };
        run_fetch(&second, &labels(&["faro", "k6"]), &paths, &later, &mut io::sink()).unwrap();

        let queries = second.queries();
        assert_eq!(queries[0].label, "faro");
        assert_eq!(queries[0].since, options().started_at);
        assert_eq!(queries[1].label, "k6");
        assert_eq!(queries[1].since, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn comments_are_saved_in_source_order() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths::new(temp.path());
        let issue = make_issue(3, "[sdk] thread", "2024-01-05T00:00:00Z", 2);
        let source = MockIssueSource::new()
            .with_comments(
                &issue.comments_url,
                vec![make_comment("bob", "second?"), make_comment("carol", "first?")],
            )
            .with_page("faro", vec![issue]);

        run_fetch(&source, &labels(&["faro"]), &paths, &options(), &mut io::sink()).unwrap();

        let raw = fs::read(temp.path().join("faro/sdk/3").join(COMMENTS_FILE)).unwrap();
        let comments: Vec<Comment> = serde_json::from_slice(&raw).unwrap();
        let logins: Vec<&str> = comments.iter().map(|c| c.user.login.as_str()).collect();
        assert_eq!(logins, vec!["bob", "carol"]);
    }

    #[test]
    fn comment_failure_still_saves_issue() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths::new(temp.path());
        let issue = make_issue(4, "[sdk] flaky", "2024-01-05T00:00:00Z", 5);
        let source = MockIssueSource::new()
            .with_failing_comments(&issue.comments_url)
            .with_page("faro", vec![issue]);

        let report = run_fetch(&source, &labels(&["faro"]), &paths, &options(), &mut io::sink())
            .unwrap();

        assert!(report.is_complete());
        assert_eq!(report.labels[0].comment_failures, 1);
        let dir = temp.path().join("faro/sdk/4");
        assert!(dir.join(ISSUE_FILE).exists());
        assert!(!dir.join(COMMENTS_FILE).exists());
        assert!(FetchMetadata::load(&paths.fetch_metadata)
            .unwrap()
            .issue("faro", 4)
            .is_some());
    }

    #[test]
    fn comments_file_removed_when_count_drops_to_zero() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths::new(temp.path());
        let dir = temp.path().join("faro/sdk/5");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(COMMENTS_FILE), "[]").unwrap();

        let source = MockIssueSource::new()
            .with_page("faro", vec![make_issue(5, "[sdk] quiet", "2024-01-05T00:00:00Z", 0)]);
        run_fetch(&source, &labels(&["faro"]), &paths, &options(), &mut io::sink()).unwrap();

        assert!(!dir.join(COMMENTS_FILE).exists());
    }

    #[test]
    fn decode_failure_isolates_the_label() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths::new(temp.path());
        let source = MockIssueSource::new()
            .with_page("app-o11y", vec![make_issue(1, "[a] ok", "2024-01-05T00:00:00Z", 0)])
            .with_page("faro", vec![make_issue(2, "[b] saved", "2024-01-05T00:00:00Z", 0)])
            .with_failure("faro", 2, MockFailure::Decode);

        let report = run_fetch(
            &source,
            &labels(&["app-o11y", "faro"]),
            &paths,
            &options(),
            &mut io::sink(),
        )
        .unwrap();

        assert!(!report.is_complete());
        assert_eq!(report.failed_labels(), vec!["faro".to_string()]);

        let metadata = FetchMetadata::load(&paths.fetch_metadata).unwrap();
        assert_eq!(metadata.since("app-o11y"), options().started_at);
        assert_eq!(metadata.since("faro"), DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(metadata.last_fetch, DateTime::<Utc>::UNIX_EPOCH);
        // The issue from the page before the failure keeps its watermark.
        assert!(metadata.issue("faro", 2).is_some());
    }

    #[test]
    fn unauthorized_aborts_the_run_but_keeps_progress() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths::new(temp.path());
        let source = MockIssueSource::new()
            .with_page("app-o11y", vec![make_issue(1, "[a] ok", "2024-01-05T00:00:00Z", 0)])
            .with_failure("faro", 1, MockFailure::Unauthorized)
            .with_page("zeta", vec![make_issue(9, "[z] never", "2024-01-05T00:00:00Z", 0)]);

        let err = run_fetch(
            &source,
            &labels(&["app-o11y", "faro", "zeta"]),
            &paths,
            &options(),
            &mut io::sink(),
        )
        .unwrap_err();

        assert!(matches!(err, ThreadsError::Unauthorized { .. }));
        assert!(!temp.path().join("zeta").exists());

        let metadata = FetchMetadata::load(&paths.fetch_metadata).unwrap();
        assert!(metadata.issue("app-o11y", 1).is_some());
        assert_eq!(metadata.last_fetch, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn forbidden_is_run_fatal() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths::new(temp.path());
        let source = MockIssueSource::new().with_failure("faro", 1, MockFailure::Forbidden);

        let err = run_fetch(&source, &labels(&["faro"]), &paths, &options(), &mut io::sink())
            .unwrap_err();
        assert!(matches!(err, ThreadsError::Forbidden { .. }));
    }

    #[test]
    fn progress_lines_are_written() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths::new(temp.path());
        let source = MockIssueSource::new()
            .with_page("faro", vec![make_issue(12, "no brackets", "2024-01-05T00:00:00Z", 0)]);

        let mut out = Vec::new();
        run_fetch(&source, &labels(&["faro"]), &paths, &options(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Fetching page 1 for label 'faro'..."));
        assert!(text.contains("Saved issue 12 with slug 'unknown' under label 'faro' (0 comments)"));
        assert!(text.contains("Done! Processed 1 total issues"));
    }
}
