//! # Webhook Processing Module
//!
//! Authenticates inbound deliveries, parses them into [`WebhookEvent`]s and
//! suppresses repeated deliveries of the same event.
//!
//! The [`WebhookProcessor`] trait is the seam the HTTP layer depends on; the
//! default [`WebhookProcessorImpl`] runs a [`Gatekeeper`] followed by a
//! [`Dispatcher`].

use crate::dispatch::{DispatchResult, Dispatcher, HandlerError};
use crate::{RequestId, Timestamp};
use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use tracing::{error, info};

mod gatekeeper;
mod registry;
mod secret;
mod signature;

pub use gatekeeper::Gatekeeper;
pub use registry::ProcessedEventRegistry;
pub use secret::{
    EnvSecretSource, SecretSource, SecretValue, StaticSecretSource, DEFAULT_SECRET_ENV_VAR,
};
pub use signature::{compute_signature, verify_signature, SIGNATURE_PREFIX};

/// Event type assigned when a payload carries neither `type` nor `event_type`.
pub const UNKNOWN_EVENT_TYPE: &str = "unknown";

// ============================================================================
// Core Types
// ============================================================================

/// Raw unit of work: one inbound HTTP call.
///
/// Created once per request and never modified. The body is kept exactly as
/// received so that the bytes that are verified are the bytes that are parsed.
#[derive(Debug, Clone)]
pub struct InboundDelivery {
    request_id: RequestId,
    body: Bytes,
    signature: Option<String>,
    received_at: Timestamp,
}

impl InboundDelivery {
    /// Create a delivery with a freshly generated request ID.
    pub fn new(body: Bytes, signature: Option<String>) -> Self {
        Self::with_request_id(RequestId::new(), body, signature)
    }

    /// Create a delivery correlated with an existing request ID.
    pub fn with_request_id(request_id: RequestId, body: Bytes, signature: Option<String>) -> Self {
        Self {
            request_id,
            body,
            signature,
            received_at: Timestamp::now(),
        }
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Get signature header value if present
    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    pub fn received_at(&self) -> Timestamp {
        self.received_at
    }
}

/// Trusted representation of a delivery.
///
/// Only the [`Gatekeeper`] constructs these, after the signature has been
/// verified and the body parsed. An instance is never partially valid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: serde_json::Map<String, serde_json::Value>,
}

impl WebhookEvent {
    pub(crate) fn new(
        id: String,
        event_type: String,
        data: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            id,
            event_type,
            data,
        }
    }

    /// Idempotency key of the event
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Event body, empty when the payload carried no `data` object
    pub fn data(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.data
    }
}

/// Result of a delivery that passed every gatekeeper check.
#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    /// First arrival of this event id; ready for dispatch.
    Accepted(WebhookEvent),

    /// The event id was seen before. Not an error: acknowledged idempotently.
    Duplicate {
        event_id: String,
        event_type: String,
    },
}

/// Final result of a delivery that was not rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingOutcome {
    Dispatched(DispatchResult),
    Duplicate {
        event_id: String,
        event_type: String,
    },
}

impl ProcessingOutcome {
    /// Status string reported to the caller
    pub fn status(&self) -> &'static str {
        match self {
            Self::Dispatched(result) => result.status.as_str(),
            Self::Duplicate { .. } => "duplicate",
        }
    }

    pub fn event_id(&self) -> &str {
        match self {
            Self::Dispatched(result) => &result.event_id,
            Self::Duplicate { event_id, .. } => event_id,
        }
    }

    pub fn event_type(&self) -> &str {
        match self {
            Self::Dispatched(result) => &result.event_type,
            Self::Duplicate { event_type, .. } => event_type,
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Reasons a delivery is refused before any handler runs.
///
/// Variants are listed in evaluation order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RejectionReason {
    /// No shared secret is available. Operator error, not attacker input.
    #[error("Webhook secret {secret_name} is not configured")]
    ServerMisconfigured { secret_name: String },

    /// Signature header missing or not matching the body.
    #[error("Request signature is missing or invalid")]
    InvalidSignature,

    #[error("Request body is not valid JSON: {detail}")]
    InvalidJson { detail: String },

    #[error("Payload does not contain an event id")]
    MissingEventId,
}

impl RejectionReason {
    /// Stable machine-readable code returned to clients
    pub fn code(&self) -> &'static str {
        match self {
            Self::ServerMisconfigured { .. } => "server_misconfigured",
            Self::InvalidSignature => "invalid_signature",
            Self::InvalidJson { .. } => "invalid_json",
            Self::MissingEventId => "missing_event_id",
        }
    }

    /// Message safe to return to the client.
    ///
    /// Never includes signatures or parser internals.
    pub fn client_message(&self) -> String {
        match self {
            Self::ServerMisconfigured { secret_name } => {
                format!("{} is not configured.", secret_name)
            }
            Self::InvalidSignature => "Request signature is missing or invalid.".to_string(),
            Self::InvalidJson { .. } => "Request body must be valid JSON.".to_string(),
            Self::MissingEventId => {
                "Payload must include an event id (id/event_id).".to_string()
            }
        }
    }

    /// Whether the rejection is the server's fault rather than the caller's
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ServerMisconfigured { .. })
    }
}

/// Top-level error for webhook processing failures
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Delivery rejected: {0}")]
    Rejected(#[from] RejectionReason),

    /// A handler failed after the event id was recorded. A redelivery of the
    /// same event will be reported as a duplicate.
    #[error("Handler for event {event_id} ({event_type}) failed: {source}")]
    Handler {
        event_id: String,
        event_type: String,
        #[source]
        source: HandlerError,
    },
}

impl WebhookError {
    /// Stable machine-readable code returned to clients
    pub fn code(&self) -> &'static str {
        match self {
            Self::Rejected(reason) => reason.code(),
            Self::Handler { .. } => "handler_failed",
        }
    }
}

// ============================================================================
// Core Operations (Traits)
// ============================================================================

/// Main interface for the webhook processing pipeline
#[async_trait]
pub trait WebhookProcessor: Send + Sync {
    /// Run a delivery through authentication, deduplication and dispatch.
    async fn process_webhook(
        &self,
        delivery: InboundDelivery,
    ) -> Result<ProcessingOutcome, WebhookError>;

    /// Whether a shared secret is currently available.
    fn secret_configured(&self) -> bool;
}

// ============================================================================
// Default Implementations
// ============================================================================

/// Webhook processor composing a [`Gatekeeper`] and a [`Dispatcher`].
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use webhook_receiver_core::dispatch::Dispatcher;
/// use webhook_receiver_core::webhook::{
///     Gatekeeper, ProcessedEventRegistry, StaticSecretSource, WebhookProcessorImpl,
/// };
///
/// let gatekeeper = Gatekeeper::new(
///     Arc::new(StaticSecretSource::new("topsecret")),
///     Arc::new(ProcessedEventRegistry::new()),
/// );
/// let processor = WebhookProcessorImpl::new(gatekeeper, Dispatcher::with_default_handlers());
/// ```
pub struct WebhookProcessorImpl {
    gatekeeper: Gatekeeper,
    dispatcher: Dispatcher,
}

impl WebhookProcessorImpl {
    pub fn new(gatekeeper: Gatekeeper, dispatcher: Dispatcher) -> Self {
        Self {
            gatekeeper,
            dispatcher,
        }
    }

    pub fn gatekeeper(&self) -> &Gatekeeper {
        &self.gatekeeper
    }

    /// Synchronous form of [`WebhookProcessor::process_webhook`].
    pub fn process(&self, delivery: &InboundDelivery) -> Result<ProcessingOutcome, WebhookError> {
        let request_id = delivery.request_id();

        let event = match self.gatekeeper.admit(delivery)? {
            GateOutcome::Accepted(event) => event,
            GateOutcome::Duplicate {
                event_id,
                event_type,
            } => {
                return Ok(ProcessingOutcome::Duplicate {
                    event_id,
                    event_type,
                })
            }
        };

        let result: DispatchResult =
            self.dispatcher
                .dispatch(&event, request_id)
                .map_err(|source| {
                    error!(
                        request_id = %request_id,
                        event_id = %event.id(),
                        event_type = %event.event_type(),
                        error = %source,
                        "webhook_handler_failed"
                    );
                    WebhookError::Handler {
                        event_id: event.id().to_string(),
                        event_type: event.event_type().to_string(),
                        source,
                    }
                })?;

        info!(
            request_id = %request_id,
            event_id = %result.event_id,
            event_type = %result.event_type,
            status = result.status.as_str(),
            "webhook_received"
        );

        Ok(ProcessingOutcome::Dispatched(result))
    }
}

#[async_trait]
impl WebhookProcessor for WebhookProcessorImpl {
    async fn process_webhook(
        &self,
        delivery: InboundDelivery,
    ) -> Result<ProcessingOutcome, WebhookError> {
        self.process(&delivery)
    }

    fn secret_configured(&self) -> bool {
        self.gatekeeper.secret_configured()
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
