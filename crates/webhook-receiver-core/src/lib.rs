//! # Webhook Receiver Core
//!
//! Core business logic for the webhook ingress endpoint.
//!
//! This crate authenticates inbound webhook deliveries with a shared-secret
//! HMAC, suppresses repeated deliveries of the same event, and routes the
//! surviving events to domain handlers.
//!
//! ## Architecture
//!
//! Every delivery flows through two components:
//! - [`webhook::Gatekeeper`] verifies the signature, parses the payload and
//!   performs deduplication against a [`webhook::ProcessedEventRegistry`]
//! - [`dispatch::Dispatcher`] invokes the handler bound to the event's type,
//!   or reports the event as ignored
//!
//! The HTTP layer depends only on the [`webhook::WebhookProcessor`] trait,
//! which composes the two.
//!
//! ## Usage
//!
//! ```rust
//! use webhook_receiver_core::webhook::{compute_signature, verify_signature};
//!
//! let body = br#"{"id":"evt_1","type":"payment_succeeded"}"#;
//! let header = compute_signature(b"topsecret", body);
//! assert!(verify_signature(b"topsecret", body, Some(&header)));
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Correlation and time
// ============================================================================

/// Server-generated correlation id for one inbound request.
///
/// Echoed in responses and log lines; never part of authentication or
/// deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// UTC instant, rendered as RFC 3339.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339())
    }
}

// ============================================================================
// Configuration Types
// ============================================================================

/// Logging level configuration
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(ParseError::InvalidFormat {
                expected: "error, warn, info, debug, or trace".to_string(),
                actual: s.to_string(),
            }),
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Failure to parse a configuration or command-line value
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid format: expected {expected}, got '{actual}'")]
    InvalidFormat { expected: String, actual: String },
}

// ============================================================================
// Module declarations
// ============================================================================

/// Authentication, parsing and deduplication of inbound deliveries
pub mod webhook;

/// Routing of accepted events to domain handlers
pub mod dispatch;

// Re-export key types for convenience
pub use dispatch::{
    DispatchResult, DispatchStatus, Dispatcher, EventHandler, EventKind, HandlerError,
};
pub use webhook::{
    GateOutcome, Gatekeeper, InboundDelivery, ProcessedEventRegistry, ProcessingOutcome,
    RejectionReason, WebhookError, WebhookEvent, WebhookProcessor, WebhookProcessorImpl,
};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
