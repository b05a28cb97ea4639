use clap::Parser;
use issue_threads::cli::{Cli, Commands, commands};
use issue_threads::logging::init_logging;
use std::process::ExitCode;
use tracing::error;

fn main() -> ExitCode {
    // Values already in the environment win over `.env`.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Err(err) = init_logging(cli.verbose, cli.quiet, cli.log_file.as_deref()) {
        eprintln!("Failed to initialize logging: {err}");
        return ExitCode::FAILURE;
    }

    let overrides = cli.overrides();
    let result = match &cli.command {
        Commands::Fetch(_) => commands::fetch::execute(cli.json, &overrides),
        Commands::Compose(args) => commands::compose::execute(args, cli.json, &overrides),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "Command failed");
            eprintln!("Error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}
