//! # Webhook Receiver CLI
//!
//! Operator tooling for the webhook receiver.
//!
//! This module provides CLI commands for:
//! - Signing a payload file the way a sender would
//! - Checking a signature against a payload file
//! - Validating and printing the service configuration
//! - Generating shell completions

use clap::{CommandFactory, Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use webhook_receiver_api::{ConfigError, ServiceConfig};
use webhook_receiver_core::{
    webhook::{compute_signature, verify_signature, SecretValue, DEFAULT_SECRET_ENV_VAR},
    LogLevel,
};

// ============================================================================
// CLI Structure
// ============================================================================

/// Webhook Receiver CLI - signing and configuration tooling
#[derive(Parser)]
#[command(name = "webhook-receiver")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Operator tooling for the webhook receiver")]
#[command(
    long_about = "Signs and verifies webhook payloads with the shared secret and validates the service configuration"
)]
pub struct Cli {
    /// Logging level (logs go to stderr)
    #[arg(short, long, default_value = "warn", global = true)]
    pub log_level: String,

    /// Enable JSON logging
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Print the signature header value for a payload file
    Sign {
        /// Payload file; signed byte for byte
        #[arg(short, long)]
        file: PathBuf,

        /// Shared secret
        #[arg(short, long, env = "WEBHOOK_SECRET", hide_env_values = true)]
        secret: Option<String>,
    },

    /// Check a signature header value against a payload file
    Verify {
        /// Payload file
        #[arg(short, long)]
        file: PathBuf,

        /// Signature header value, `sha256=<hex>`
        #[arg(long)]
        signature: String,

        /// Shared secret
        #[arg(short, long, env = "WEBHOOK_SECRET", hide_env_values = true)]
        secret: Option<String>,
    },

    /// Validate configuration
    Config {
        /// Configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Show resolved configuration
        #[arg(long)]
        show: bool,

        /// Output format for configuration
        #[arg(long, default_value = "yaml")]
        format: ConfigFormat,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Configuration format options
#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ConfigFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
    /// TOML format
    Toml,
}

// ============================================================================
// Error Types
// ============================================================================

/// CLI error types
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Signing failed: {message}")]
    Signing { message: String },

    #[error("Signature does not match the payload")]
    VerificationFailed,

    #[error("Invalid argument: {arg} - {message}")]
    InvalidArgument { arg: String, message: String },

    #[error("Could not render output: {message}")]
    Output { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Process exit code for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => 1,
            Self::Signing { .. } => 2,
            Self::VerificationFailed => 3,
            Self::InvalidArgument { .. } => 4,
            Self::Output { .. } => 5,
            Self::Io(_) => 6,
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Main CLI entry point
///
/// `.env` is read before argument parsing so it can supply `WEBHOOK_SECRET`.
pub fn run_cli() -> Result<(), CliError> {
    // Absence of a .env file is not an error.
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    initialize_logging(&cli)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    execute(cli.command, &mut out)
}

/// Run a parsed command, writing its result to `out`.
pub fn execute<W: Write>(command: Commands, out: &mut W) -> Result<(), CliError> {
    match command {
        Commands::Sign { file, secret } => execute_sign_command(&file, secret, out),
        Commands::Verify {
            file,
            signature,
            secret,
        } => execute_verify_command(&file, &signature, secret, out),
        Commands::Config { file, show, format } => {
            execute_config_command(file.as_deref(), show, format, out)
        }
        Commands::Completions { shell } => execute_completions_command(shell, out),
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// Initialize logging based on CLI arguments
fn initialize_logging(cli: &Cli) -> Result<(), CliError> {
    let level = cli
        .log_level
        .parse::<LogLevel>()
        .map_err(|e| CliError::InvalidArgument {
            arg: "--log-level".to_string(),
            message: e.to_string(),
        })?;

    let filter = EnvFilter::new(format!(
        "webhook_receiver_cli={level},webhook_receiver_api={level},webhook_receiver_core={level}",
        level = level.as_str()
    ));
    let registry = tracing_subscriber::registry().with(filter);

    // stdout is reserved for command output.
    if cli.json_logs {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

/// Execute sign command
fn execute_sign_command<W: Write>(
    file: &Path,
    secret: Option<String>,
    out: &mut W,
) -> Result<(), CliError> {
    let secret = resolve_secret(secret)?;
    let body = std::fs::read(file)?;

    debug!(file = %file.display(), bytes = body.len(), "Signing payload");
    writeln!(out, "{}", compute_signature(secret.expose_bytes(), &body))?;
    Ok(())
}

/// Execute verify command
fn execute_verify_command<W: Write>(
    file: &Path,
    signature: &str,
    secret: Option<String>,
    out: &mut W,
) -> Result<(), CliError> {
    let secret = resolve_secret(secret)?;
    let body = std::fs::read(file)?;

    if !verify_signature(secret.expose_bytes(), &body, Some(signature)) {
        return Err(CliError::VerificationFailed);
    }

    writeln!(out, "valid")?;
    Ok(())
}

/// Execute config command
fn execute_config_command<W: Write>(
    file: Option<&Path>,
    show: bool,
    format: ConfigFormat,
    out: &mut W,
) -> Result<(), CliError> {
    let config = ServiceConfig::load(file)?;
    info!(
        endpoint = %config.webhooks.endpoint_path,
        port = config.server.port,
        "Configuration is valid"
    );

    if !show {
        writeln!(out, "Configuration is valid")?;
        return Ok(());
    }

    let rendered = render_config(&config, &format)?;
    write!(out, "{}", rendered)?;
    if !rendered.ends_with('\n') {
        writeln!(out)?;
    }
    Ok(())
}

/// Execute completions command
fn execute_completions_command<W: Write>(
    shell: clap_complete::Shell,
    out: &mut W,
) -> Result<(), CliError> {
    let mut command = Cli::command();
    clap_complete::generate(shell, &mut command, "webhook-receiver", out);
    Ok(())
}

/// Serialize the configuration in the requested format.
pub fn render_config(config: &ServiceConfig, format: &ConfigFormat) -> Result<String, CliError> {
    let output = |message: String| CliError::Output { message };

    match format {
        ConfigFormat::Yaml => serde_yaml::to_string(config).map_err(|e| output(e.to_string())),
        ConfigFormat::Json => {
            serde_json::to_string_pretty(config).map_err(|e| output(e.to_string()))
        }
        ConfigFormat::Toml => toml::to_string_pretty(config).map_err(|e| output(e.to_string())),
    }
}

/// Use the given secret, treating an empty value as absent.
fn resolve_secret(secret: Option<String>) -> Result<SecretValue, CliError> {
    secret
        .filter(|s| !s.is_empty())
        .map(SecretValue::new)
        .ok_or_else(|| CliError::Signing {
            message: format!(
                "{} is not set; pass --secret or define it in the environment or a .env file",
                DEFAULT_SECRET_ENV_VAR
            ),
        })
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
