//! Fetch command implementation.

use crate::config::{CliOverrides, FetchConfig};
use crate::error::{Result, ThreadsError};
use crate::github::GitHubClient;
use crate::sync::{FetchOptions, run_fetch};
use chrono::Utc;
use std::io::{self, Write};
use tracing::info;

/// Execute the fetch command.
///
/// The fetch-only flags arrive in `cli`, see [`crate::cli::Cli::overrides`].
///
/// # Errors
///
/// Returns a configuration error before any request is made, a run-fatal
/// error from the tracker, or [`ThreadsError::IncompleteFetch`] when some
/// labels failed.
pub fn execute(json: bool, cli: &CliOverrides) -> Result<()> {
    let config = FetchConfig::resolve(cli)?;
    info!(
        repo = %config.repo,
        labels = ?config.labels,
        data_dir = %config.paths.data_dir.display(),
        "Starting fetch"
    );

    let client = GitHubClient::new(&config)?;
    let options = FetchOptions {
        per_page: config.per_page,
        started_at: Utc::now(),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let report = if json {
        run_fetch(&client, &config.labels, &config.paths, &options, &mut io::sink())?
    } else {
        run_fetch(&client, &config.labels, &config.paths, &options, &mut out)?
    };

    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    }

    if report.is_complete() {
        Ok(())
    } else {
        Err(ThreadsError::IncompleteFetch {
            labels: report.failed_labels(),
        })
    }
}
