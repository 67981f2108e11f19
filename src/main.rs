//! ItemHub command-line entry point.
//!
//! Loads configuration, initializes logging, and dispatches to the
//! selected subcommand.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use itemhub_core::config::{AppConfig, LoggingConfig};
use itemhub_core::error::AppError;

mod commands;
mod output;

use commands::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_configuration(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config.logging);

    if let Err(e) = cli.execute(&config).await {
        output::print_error(&e.to_string());
        std::process::exit(1);
    }
}

/// Load configuration from file, environment overlay and variables.
fn load_configuration(path: &str) -> Result<AppConfig, AppError> {
    let env = std::env::var("ITEMHUB_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(path, &env)
}

/// Initialize tracing/logging
fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}
