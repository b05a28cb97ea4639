//! Command-line interface for `ithreads`.
//!
//! Flags fall back to environment variables through clap's `env` support;
//! [`Cli::overrides`] collects them for [`crate::config`] to validate.

pub mod commands;

use crate::compose::ComposeErrorPolicy;
use crate::config::{self, CliOverrides};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ithreads", author, version, about = "Mirror labeled issues and render them as thread documents", long_about = None)]
pub struct Cli {
    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Also write JSON logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Root of the record tree
    #[arg(long, global = true, env = config::DATA_DIR_ENV)]
    pub data_dir: Option<PathBuf>,

    /// Comma-separated labels to process
    #[arg(long, global = true, env = config::LABELS_ENV)]
    pub labels: Option<String>,

    /// Print the run report as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download issues updated since the last run, with their comments
    Fetch(FetchArgs),
    /// Render thread.md for every issue directory whose records changed
    Compose(ComposeArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct FetchArgs {
    /// API credential
    #[arg(long, env = config::TOKEN_ENV, hide_env_values = true)]
    pub token: Option<String>,

    /// Repository as owner/name
    #[arg(long, env = config::REPO_ENV)]
    pub repo: Option<String>,

    /// API base URL
    #[arg(long, env = config::API_URL_ENV)]
    pub api_url: Option<String>,

    /// Issues requested per page
    #[arg(long)]
    pub per_page: Option<u32>,

    /// Request timeout in seconds
    #[arg(long = "timeout")]
    pub timeout_secs: Option<u64>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ComposeArgs {
    /// Re-render every thread even if its records are unchanged
    #[arg(long)]
    pub force: bool,

    /// How a failing issue directory affects the run (strict, best-effort)
    #[arg(long, default_value_t = ComposeErrorPolicy::Strict)]
    pub error_policy: ComposeErrorPolicy,
}

impl Cli {
    /// Raw settings shared by both subcommands plus the fetch-only ones.
    #[must_use]
    pub fn overrides(&self) -> CliOverrides {
        let mut overrides = CliOverrides {
            labels: self.labels.clone(),
            data_dir: self.data_dir.clone(),
            ..CliOverrides::default()
        };
        if let Commands::Fetch(args) = &self.command {
            overrides.token.clone_from(&args.token);
            overrides.repo.clone_from(&args.repo);
            overrides.api_url.clone_from(&args.api_url);
            overrides.per_page = args.per_page;
            overrides.timeout_secs = args.timeout_secs;
        }
        overrides
    }
}
