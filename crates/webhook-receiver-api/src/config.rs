//! Configuration types for the HTTP service

use crate::errors::ConfigError;
use axum::http::HeaderName;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;
use webhook_receiver_core::{webhook::DEFAULT_SECRET_ENV_VAR, LogLevel};

/// System-wide configuration file, loaded when present.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/webhook-receiver/service.yaml";

/// Deployment-local configuration file, relative to the working directory.
pub const LOCAL_CONFIG_PATH: &str = "config/service.yaml";

/// Environment variable naming an additional configuration file.
pub const CONFIG_FILE_ENV_VAR: &str = "WEBHOOK_RECEIVER_CONFIG";

/// Prefix of environment variable overrides, e.g. `WR__SERVER__PORT=9090`.
pub const ENV_PREFIX: &str = "WR";

/// Service configuration
///
/// Every field has a default, so an empty or absent configuration source
/// produces a usable configuration. The webhook secret itself is never part
/// of this structure; only the name of the variable holding it is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Webhook processing settings
    pub webhooks: WebhookConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,

    /// Maximum request size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_seconds: 30,
            max_body_size: 1024 * 1024, // 1MiB
        }
    }
}

/// Webhook processing configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Webhook endpoint path
    pub endpoint_path: String,

    /// Name of the header carrying `sha256=<hex>`
    pub signature_header: String,

    /// Environment variable holding the shared secret
    pub secret_env_var: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            endpoint_path: "/webhooks".to_string(),
            signature_header: "X-Signature".to_string(),
            secret_env_var: DEFAULT_SECRET_ENV_VAR.to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from files and the environment.
    ///
    /// Sources, later ones overriding earlier ones:
    ///
    /// 1. [`SYSTEM_CONFIG_PATH`], if present
    /// 2. [`LOCAL_CONFIG_PATH`], if present
    /// 3. `explicit_path`, or else the file named by [`CONFIG_FILE_ENV_VAR`];
    ///    must exist when given
    /// 4. environment variables prefixed `WR__`, with `__` between sections
    ///
    /// The result is validated before it is returned.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] for unreadable or malformed sources and
    /// [`ConfigError::Invalid`] when validation fails.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(
                config::File::with_name(SYSTEM_CONFIG_PATH)
                    .required(false)
                    .format(config::FileFormat::Yaml),
            )
            .add_source(
                config::File::with_name(LOCAL_CONFIG_PATH)
                    .required(false)
                    .format(config::FileFormat::Yaml),
            );

        let env_path = std::env::var(CONFIG_FILE_ENV_VAR)
            .ok()
            .filter(|p| !p.is_empty());
        let explicit = explicit_path
            .map(Path::to_path_buf)
            .or_else(|| env_path.map(Into::into));

        if let Some(path) = explicit {
            info!(path = %path.display(), "Loading configuration from explicit path");
            // Format follows the file extension.
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let service_config: ServiceConfig = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;

        service_config.validate()?;
        Ok(service_config)
    }

    /// Check values that deserialize cleanly but cannot be served.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(invalid("server.host must not be empty"));
        }

        if self.server.port == 0 {
            return Err(invalid("server.port must be between 1 and 65535"));
        }

        if self.server.max_body_size == 0 {
            return Err(invalid("server.max_body_size must be greater than zero"));
        }

        if !self.webhooks.endpoint_path.starts_with('/') {
            return Err(invalid(format!(
                "webhooks.endpoint_path must start with '/', got '{}'",
                self.webhooks.endpoint_path
            )));
        }

        if self.webhooks.signature_header.is_empty()
            || HeaderName::from_bytes(self.webhooks.signature_header.as_bytes()).is_err()
        {
            return Err(invalid(format!(
                "webhooks.signature_header is not a valid header name: '{}'",
                self.webhooks.signature_header
            )));
        }

        if self.webhooks.secret_env_var.trim().is_empty() {
            return Err(invalid("webhooks.secret_env_var must not be empty"));
        }

        self.log_level()?;

        Ok(())
    }

    /// Parsed `logging.level`
    pub fn log_level(&self) -> Result<LogLevel, ConfigError> {
        self.logging
            .level
            .parse::<LogLevel>()
            .map_err(|e| invalid(format!("logging.level: {}", e)))
    }

    /// Address the server binds to, as `host:port`
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        message: message.into(),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
