//! Error types for the HTTP service

use crate::responses::ErrorResponse;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::error;
use webhook_receiver_core::{RejectionReason, RequestId, WebhookError};

/// Header carrying the server-generated request ID on every response.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Webhook handler errors with HTTP status code mapping
///
/// - `401 Unauthorized`: missing or invalid signature
/// - `400 Bad Request`: body is not JSON, or carries no event id
/// - `500 Internal Server Error`: no secret configured, or a handler failed
///
/// The body is always `{request_id, error, message}`. Messages come from
/// [`RejectionReason::client_message`] and never reveal signatures or parser
/// internals; details stay in the server log.
#[derive(Debug, thiserror::Error)]
#[error("Webhook processing failed: {source}")]
pub struct WebhookHandlerError {
    pub request_id: RequestId,
    #[source]
    pub source: WebhookError,
}

impl WebhookHandlerError {
    pub fn new(request_id: RequestId, source: WebhookError) -> Self {
        Self { request_id, source }
    }

    /// HTTP status for the underlying failure
    pub fn status_code(&self) -> StatusCode {
        match &self.source {
            WebhookError::Rejected(reason) => match reason {
                RejectionReason::ServerMisconfigured { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                RejectionReason::InvalidSignature => StatusCode::UNAUTHORIZED,
                RejectionReason::InvalidJson { .. } | RejectionReason::MissingEventId => {
                    StatusCode::BAD_REQUEST
                }
            },
            WebhookError::Handler { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the client
    pub fn client_message(&self) -> String {
        match &self.source {
            WebhookError::Rejected(reason) => reason.client_message(),
            WebhookError::Handler { .. } => "Event handler failed.".to_string(),
        }
    }
}

impl IntoResponse for WebhookHandlerError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if let WebhookError::Handler { .. } = self.source {
            error!(
                request_id = %self.request_id,
                error = %self.source,
                "Webhook handler failed; returning internal server error"
            );
        }

        let body = ErrorResponse {
            request_id: self.request_id.to_string(),
            error: self.source.code().to_string(),
            message: self.client_message(),
        };

        let mut response = (status, Json(body)).into_response();
        if let Ok(header_value) = self.request_id.to_string().parse() {
            response
                .headers_mut()
                .insert(REQUEST_ID_HEADER, header_value);
        }

        response
    }
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

impl ServiceError {
    /// Process exit code for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::BindFailed { .. } => 1,
            Self::ServerFailed { .. } => 2,
            Self::Configuration(_) => 3,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration loading failed: {0}")]
    Load(#[from] config::ConfigError),
}
