//! Unified logging coordinator
//!
//! CLI entry point: loads configuration and serves the coordinator API.

use clap::Parser;
use eyre::{Context, Result};
use tracing::{debug, info};

use unified_logging_coord::cli::{Cli, Command};
use unified_logging_coord::config::Config;
use unified_logging_coord::service::Service;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .try_init()
        .map_err(|e| eyre::eyre!("{e}"))?;

    debug!(?level, "setup_logging: logging initialized");
    Ok(())
}

#[actix_web::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    match cli.command {
        Command::Run(args) => {
            args.apply(&mut config);
            setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;

            let service = Service::new(config).context("Failed to create service")?;
            info!("Starting unified logging coordinator");
            service.run().await.context("Coordinator service failed")?;
            Ok(())
        }
        Command::Config(args) => {
            args.apply(&mut config);
            print!("{}", config.to_yaml()?);
            Ok(())
        }
    }
}
