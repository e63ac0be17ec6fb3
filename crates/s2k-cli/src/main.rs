//! S2K CLI - social-stream to Kafka ingestion tool.

use anyhow::Result;
use clap::{Parser, Subcommand};
use s2k_core::config::LogFormat;
use s2k_core::{BootstrapError, Config, Error, StreamError};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod server;

/// Exit codes for CLI operations.
///
/// Following Unix conventions:
/// - 0: Success
/// - 1-127: Application errors
/// - 128+N: Signal N received (e.g., 130 = SIGINT)
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Successful execution
    Success = 0,
    /// Configuration error (invalid config file, missing required fields)
    ConfigError = 1,
    /// Topic provisioning phase of bootstrap failed
    ProvisioningError = 2,
    /// Schema registry phase of bootstrap failed
    RegistryError = 3,
    /// Kafka client error (admin, producer)
    KafkaError = 4,
    /// Stream provider error (connect, subscription)
    StreamError = 5,
    /// General runtime error
    RuntimeError = 10,
    /// Signal interrupt (SIGINT = 2, so 128 + 2 = 130)
    SignalInterrupt = 130,
}

impl ExitCode {
    /// Map an error to an exit code by inspecting the core error type.
    fn from_error(error: &anyhow::Error) -> Self {
        if let Some(core) = error.downcast_ref::<Error>() {
            return match core {
                Error::Config(_) => ExitCode::ConfigError,
                Error::Bootstrap(BootstrapError::ProvisioningFailed { .. }) => {
                    ExitCode::ProvisioningError
                }
                Error::Bootstrap(BootstrapError::RegistryUnreachable { .. }) => {
                    ExitCode::RegistryError
                }
                // Shutdown during bootstrap is a deliberate stop, not a fault.
                Error::Bootstrap(BootstrapError::Interrupted { .. }) => ExitCode::SignalInterrupt,
                Error::Kafka(_) => ExitCode::KafkaError,
                Error::Stream(StreamError::Connect(_)) => ExitCode::StreamError,
                Error::Stream(_) => ExitCode::RuntimeError,
                _ => ExitCode::RuntimeError,
            };
        }

        if error.downcast_ref::<toml::de::Error>().is_some()
            || error.downcast_ref::<std::io::Error>().is_some()
        {
            ExitCode::ConfigError
        } else {
            ExitCode::RuntimeError
        }
    }
}

#[derive(Parser)]
#[command(name = "s2k")]
#[command(about = "Social-stream to Kafka ingestion CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Bootstrap the backend and run the ingestion pipeline
    Run {
        /// Override Kafka bootstrap servers
        #[arg(long)]
        bootstrap_servers: Option<String>,

        /// Override the publish topic
        #[arg(long)]
        topic: Option<String>,

        /// Override the tracked keywords (comma separated)
        #[arg(long)]
        keywords: Option<String>,
    },

    /// Show status and health of a running instance
    Status {
        /// Health endpoint URL
        #[arg(long, default_value = "http://localhost:8080")]
        url: String,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() {
    let exit_code = run_cli().await;
    std::process::exit(exit_code as i32);
}

/// Main CLI execution logic with proper error handling.
async fn run_cli() -> ExitCode {
    let cli = Cli::parse();

    // Try to load config for log format settings (optional - falls back to JSON)
    let monitoring = cli
        .config
        .as_ref()
        .and_then(|path| std::fs::read_to_string(path).ok())
        .and_then(|content| toml::from_str::<Config>(&content).ok())
        .map(|config| config.monitoring)
        .unwrap_or_default();

    // Initialize logging
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match cli.verbose {
            0 => EnvFilter::new(monitoring.log_level.as_str()),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    match monitoring.log_format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json())
                .with(filter)
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer())
                .with(filter)
                .init();
        }
    }

    let result = execute_command(cli).await;

    match result {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            ExitCode::from_error(&e)
        }
    }
}

/// Execute the CLI command.
async fn execute_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run {
            bootstrap_servers,
            topic,
            keywords,
        } => {
            let config = load_config(&cli.config)?;
            commands::run::run(config, bootstrap_servers, topic, keywords).await?;
        }

        Commands::Status { url } => {
            commands::status::run(&url).await?;
        }

        Commands::Validate => {
            let config = load_config(&cli.config)?;
            config.validate()?;
            println!("Configuration is valid");
        }
    }

    Ok(())
}

fn load_config(path: &Option<PathBuf>) -> Result<Config> {
    let path = path.clone().unwrap_or_else(|| PathBuf::from("config.toml"));

    let content = std::fs::read_to_string(&path)?;
    let config: Config = toml::from_str(&content)?;
    Ok(config)
}
