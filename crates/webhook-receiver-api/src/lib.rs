//! # Webhook Receiver HTTP Service
//!
//! HTTP server for receiving signed webhooks and running them through the
//! [`WebhookProcessor`] pipeline.
//!
//! This service provides:
//! - the webhook endpoint (`POST /webhooks` by default)
//! - health and readiness endpoints
//! - a Prometheus metrics endpoint

pub mod config;
pub mod errors;
pub mod metrics;
pub mod responses;

pub use config::{LoggingConfig, ServerConfig, ServiceConfig, WebhookConfig};
pub use errors::{ConfigError, ServiceError, WebhookHandlerError, REQUEST_ID_HEADER};
pub use metrics::ServiceMetrics;
pub use responses::{ErrorResponse, HealthResponse, ReadinessResponse, WebhookResponse};

use axum::{
    extract::{DefaultBodyLimit, Extension, State},
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use std::{future::IntoFuture, sync::Arc, time::Duration};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument, warn};
use webhook_receiver_core::{
    webhook::{InboundDelivery, WebhookProcessor},
    RequestId, Timestamp,
};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration for the service
    pub config: ServiceConfig,

    /// Pipeline every webhook delivery runs through
    pub webhook_processor: Arc<dyn WebhookProcessor>,

    /// Metrics collector for observability
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        config: ServiceConfig,
        webhook_processor: Arc<dyn WebhookProcessor>,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        Self {
            config,
            webhook_processor,
            metrics,
        }
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Create HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let webhook_routes =
        Router::new().route(&state.config.webhooks.endpoint_path, post(handle_webhook));

    let health_routes = Router::new()
        .route("/health", get(handle_health_check))
        .route("/ready", get(handle_readiness_check));

    let observability_routes = Router::new().route("/metrics", get(metrics_endpoint));

    let max_body_size = state.config.server.max_body_size;

    Router::new()
        .merge(webhook_routes)
        .merge(health_routes)
        .merge(observability_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(request_logging_middleware))
                .into_inner(),
        )
        .layer(DefaultBodyLimit::max(max_body_size))
        .with_state(state)
}

/// Start HTTP server
///
/// Serves until SIGINT or SIGTERM. In-flight requests are given
/// `server.shutdown_timeout_seconds` to finish after the signal.
pub async fn start_server(
    config: ServiceConfig,
    webhook_processor: Arc<dyn WebhookProcessor>,
) -> Result<(), ServiceError> {
    let metrics = ServiceMetrics::new().map_err(|e| {
        ServiceError::Configuration(ConfigError::Invalid {
            message: format!("Failed to initialize metrics: {}", e),
        })
    })?;

    let address = config.bind_address();
    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);

    let state = AppState::new(config, webhook_processor, metrics);
    let app = create_router(state);

    let listener =
        tokio::net::TcpListener::bind(&address)
            .await
            .map_err(|e| ServiceError::BindFailed {
                address: address.clone(),
                message: e.to_string(),
            })?;

    info!("Starting HTTP server on {}", address);

    let shutdown_started = Arc::new(tokio::sync::Notify::new());
    let notify_shutdown = Arc::clone(&shutdown_started);

    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal(shutdown_timeout).await;
        notify_shutdown.notify_one();
    });

    // Resolves only once a shutdown signal was seen and the drain period has run out.
    let drain_deadline = async move {
        shutdown_started.notified().await;
        tokio::time::sleep(shutdown_timeout).await;
    };

    tokio::select! {
        result = server.into_future() => {
            result.map_err(|e| ServiceError::ServerFailed {
                message: e.to_string(),
            })?;
        }
        _ = drain_deadline => {
            warn!(
                timeout_seconds = shutdown_timeout.as_secs(),
                "Graceful shutdown timed out; abandoning in-flight requests"
            );
        }
    }

    info!("HTTP server shutdown complete");
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal(shutdown_timeout: Duration) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown with {}s timeout", shutdown_timeout.as_secs());
        },
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown with {}s timeout", shutdown_timeout.as_secs());
        },
    }
}

// ============================================================================
// Webhook Handlers
// ============================================================================

/// Handle a webhook delivery
///
/// The raw body is handed to the processor untouched, so the signature is
/// verified over exactly the bytes that were received. Every response, success
/// or failure, carries the request ID in its body and in `x-request-id`.
#[instrument(skip_all, fields(request_id = %request_id))]
pub async fn handle_webhook(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, WebhookHandlerError> {
    state.metrics.webhook_requests_total.inc();
    let timer = state.metrics.webhook_processing_duration.start_timer();

    // A header value that is not visible ASCII can never match a hex digest.
    let signature = headers
        .get(&state.config.webhooks.signature_header)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let delivery = InboundDelivery::with_request_id(request_id, body, signature);
    let result = state.webhook_processor.process_webhook(delivery).await;

    timer.observe_duration();
    state.metrics.record(&result);

    let outcome = result.map_err(|e| WebhookHandlerError::new(request_id, e))?;

    let body = WebhookResponse::from_outcome(request_id, &outcome);
    Ok((StatusCode::OK, Json(body)).into_response())
}

// ============================================================================
// Health Check Handlers
// ============================================================================

/// Liveness check endpoint
#[instrument(skip_all)]
async fn handle_health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Timestamp::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness check: ready once a webhook secret is available
#[instrument(skip(state))]
async fn handle_readiness_check(State(state): State<AppState>) -> Response {
    let secret_configured = state.webhook_processor.secret_configured();

    let response = ReadinessResponse {
        ready: secret_configured,
        secret_configured,
        timestamp: Timestamp::now(),
    };

    let status = if secret_configured {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response)).into_response()
}

/// Prometheus metrics endpoint
#[instrument(skip_all)]
async fn metrics_endpoint(State(state): State<AppState>) -> Result<String, StatusCode> {
    state.metrics.render().map_err(|e| {
        error!(error = %e, "Failed to encode metrics");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

// ============================================================================
// Middleware
// ============================================================================

/// Request logging middleware
///
/// Assigns a fresh [`RequestId`] to every request, makes it available to
/// handlers as an extension, returns it in `x-request-id`, and logs the
/// completed request at a level chosen by status class.
#[instrument(skip_all, fields(
    method = %request.method(),
    uri = %request.uri(),
    request_id
))]
async fn request_logging_middleware(
    mut request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let request_id = RequestId::new();
    tracing::Span::current().record("request_id", tracing::field::display(request_id));
    request.extensions_mut().insert(request_id);

    let mut response = next.run(request).await;
    let duration = start.elapsed();

    if let Ok(header_value) = request_id.to_string().parse() {
        response
            .headers_mut()
            .insert(REQUEST_ID_HEADER, header_value);
    }

    let status = response.status();

    if status.is_server_error() {
        error!(
            request_id = %request_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with server error"
        );
    } else if status.is_client_error() {
        warn!(
            request_id = %request_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with client error"
        );
    } else {
        info!(
            request_id = %request_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed successfully"
        );
    }

    response
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
