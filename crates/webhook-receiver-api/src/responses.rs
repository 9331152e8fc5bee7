//! Response bodies returned by the HTTP service.

use serde::{Deserialize, Serialize};
use webhook_receiver_core::{ProcessingOutcome, RequestId, Timestamp};

/// Body of a `200 OK` webhook response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub request_id: String,
    /// `handled`, `ignored` or `duplicate`
    pub status: String,
    pub event_id: String,
    pub event_type: String,
}

impl WebhookResponse {
    pub fn from_outcome(request_id: RequestId, outcome: &ProcessingOutcome) -> Self {
        Self {
            request_id: request_id.to_string(),
            status: outcome.status().to_string(),
            event_id: outcome.event_id().to_string(),
            event_type: outcome.event_type().to_string(),
        }
    }
}

/// Body of every webhook error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub request_id: String,
    /// Stable machine-readable code, e.g. `invalid_signature`
    pub error: String,
    pub message: String,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: Timestamp,
    pub version: String,
}

/// Readiness check response
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub secret_configured: bool,
    pub timestamp: Timestamp,
}
