//! # Webhook Receiver Service
//!
//! Binary entry point for the webhook receiver HTTP service.
//!
//! This executable:
//! - Loads `.env` and the service configuration
//! - Initializes structured logging
//! - Wires the gatekeeper, dedup registry and dispatcher into a processor
//! - Starts the HTTP server from webhook-receiver-api

use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use webhook_receiver_api::{start_server, LoggingConfig, ServiceConfig};
use webhook_receiver_core::{
    dispatch::Dispatcher,
    webhook::{EnvSecretSource, Gatekeeper, ProcessedEventRegistry, WebhookProcessorImpl},
    LogLevel,
};

/// Exit code for configuration that cannot be loaded or validated.
const EXIT_CONFIGURATION: i32 = 3;

#[tokio::main]
async fn main() {
    // A missing .env file is normal in production.
    let dotenv_result = dotenv::dotenv();

    let service_config = match ServiceConfig::load(None) {
        Ok(config) => config,
        Err(e) => {
            init_tracing(&LoggingConfig::default());
            error!(error = %e, "Service configuration is invalid; aborting");
            std::process::exit(EXIT_CONFIGURATION);
        }
    };

    init_tracing(&service_config.logging);

    match dotenv_result {
        Ok(path) => info!(path = %path.display(), "Loaded environment from .env file"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "Ignoring unreadable .env file"),
    }

    info!("Starting Webhook Receiver Service");

    let secret_source = Arc::new(EnvSecretSource::new(
        service_config.webhooks.secret_env_var.clone(),
    ));
    let gatekeeper = Gatekeeper::new(secret_source, Arc::new(ProcessedEventRegistry::new()));
    let processor = WebhookProcessorImpl::new(gatekeeper, Dispatcher::with_default_handlers());

    // Startup continues without a secret; every delivery then gets a 500.
    if !processor.gatekeeper().secret_configured() {
        warn!(
            secret_env_var = %service_config.webhooks.secret_env_var,
            "Webhook secret is not configured; deliveries will be rejected until it is set"
        );
    }

    info!(
        host = %service_config.server.host,
        port = service_config.server.port,
        endpoint = %service_config.webhooks.endpoint_path,
        "Starting HTTP server"
    );

    if let Err(e) = start_server(service_config, Arc::new(processor)).await {
        error!("Failed to start server: {}", e);
        std::process::exit(e.exit_code());
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
fn init_tracing(logging: &LoggingConfig) {
    let level = logging
        .level
        .parse::<LogLevel>()
        .unwrap_or(LogLevel::Info);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level.as_str())));

    let registry = tracing_subscriber::registry().with(filter);

    if logging.json_format {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Filter directives applying `level` to this workspace's crates.
fn default_directives(level: &str) -> String {
    format!(
        "webhook_receiver_service={level},webhook_receiver_api={level},webhook_receiver_core={level},tower_http=info",
        level = level
    )
}
