//! Compose command implementation.

use crate::cli::ComposeArgs;
use crate::compose::{ComposeOptions, run_compose};
use crate::config::{CliOverrides, ComposeConfig};
use crate::error::{Result, ThreadsError};
use std::io::{self, Write};
use tracing::info;

/// Execute the compose command.
///
/// # Errors
///
/// Returns a configuration error, the first failing directory under the
/// strict policy, or [`ThreadsError::IncompleteCompose`] when a best-effort
/// run skipped directories.
pub fn execute(args: &ComposeArgs, json: bool, cli: &CliOverrides) -> Result<()> {
    let config = ComposeConfig::resolve(cli)?;
    let options = ComposeOptions {
        force: args.force,
        error_policy: args.error_policy,
    };
    info!(
        labels = ?config.labels,
        force = options.force,
        policy = %options.error_policy,
        "Starting compose"
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let report = if json {
        run_compose(&config, &options, &mut io::sink())?
    } else {
        run_compose(&config, &options, &mut out)?
    };

    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    }

    if report.has_errors() {
        Err(ThreadsError::IncompleteCompose {
            failed: report.failures.len(),
        })
    } else {
        Ok(())
    }
}
