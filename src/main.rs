//! buildctl - build client for a BuildKit-style engine
//!
//! CLI entry point that dispatches to subcommands.

use buildctl::cli::{Cli, Commands};
use buildctl::config::ConfigManager;
use buildctl::error::BuildResult;
use clap::Parser;
use console::style;
use std::process::ExitCode;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// How long shutdown waits for blocking work, such as a stdin read
/// abandoned by a cancelled build
const SHUTDOWN_GRACE: Duration = Duration::from_millis(200);

fn main() -> ExitCode {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{} failed to start async runtime: {}", style("Error:").red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run());
    runtime.shutdown_timeout(SHUTDOWN_GRACE);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> BuildResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_manager = ConfigManager::resolve(cli.config.clone());
    let config = config_manager.load().await?;

    // Initialize logging: 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("buildctl=warn"),
        1 => EnvFilter::new("buildctl=info"),
        _ => EnvFilter::new("buildctl=debug"),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if config.general.json_logs() {
        subscriber.json().init();
    } else {
        subscriber.without_time().init();
    }

    debug!("Using config file {}", config_manager.path().display());

    // Dispatch to command
    match cli.command {
        Commands::Build(args) => buildctl::cli::commands::build(args, &config, cli.addr).await,
        Commands::Config(args) => {
            buildctl::cli::commands::config(args, &config_manager, &config).await
        }
    }
}
