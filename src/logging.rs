//! Logging configuration and initialization.
//!
//! Diagnostics go to stderr through tracing so that progress lines on stdout
//! stay clean. `RUST_LOG` overrides the verbosity flags.

use std::io::IsTerminal;
use std::path::Path;
use std::sync::{Mutex, Once};

use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize logging for the CLI.
///
/// Stderr honors `RUST_LOG` if set; otherwise a default filter is used based
/// on verbosity and quiet flags. The optional JSON log file has its own
/// filter and always records at least debug events for this crate.
///
/// # Errors
///
/// Returns an error if the log file cannot be created or a subscriber is
/// already installed.
pub fn init_logging(verbosity: u8, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let stderr_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter(verbosity, quiet)))?;

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_file(cfg!(debug_assertions))
        .with_line_number(cfg!(debug_assertions))
        .with_ansi(std::io::stderr().is_terminal())
        .with_filter(stderr_filter);

    let file_layer = match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .json()
                    .with_filter(EnvFilter::try_new(file_filter(verbosity))?),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;
    Ok(())
}

fn file_filter(verbosity: u8) -> &'static str {
    if verbosity >= 4 {
        "issue_threads=trace,reqwest=debug"
    } else {
        "issue_threads=debug,reqwest=info"
    }
}

/// Progress lines go to stdout, so by default stderr only carries warnings
/// (skipped comment fetches, failed labels) and errors.
fn default_filter(verbosity: u8, quiet: bool) -> String {
    if quiet {
        return "error".to_string();
    }

    match verbosity {
        0 => "issue_threads=warn".to_string(),
        1 => "issue_threads=info".to_string(),
        2 => "issue_threads=debug".to_string(),
        3 => "issue_threads=debug,reqwest=debug".to_string(),
        _ => "issue_threads=trace,reqwest=trace".to_string(),
    }
}

/// Initialize logging for tests with the test writer.
pub fn init_test_logging() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("issue_threads=debug,test=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}
