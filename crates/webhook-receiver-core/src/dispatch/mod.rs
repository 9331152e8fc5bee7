//! # Event Dispatch Module
//!
//! Routes accepted [`WebhookEvent`]s to the handler bound to their type.
//!
//! Recognized types form the closed [`EventKind`] enumeration. A type that is
//! not a known kind, or a kind with no bound handler, is reported as
//! [`DispatchStatus::Ignored`] rather than treated as an error, so new event
//! types introduced by the sender are acknowledged without any change here.

use crate::webhook::WebhookEvent;
use crate::{ParseError, RequestId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;

pub mod handlers;

pub use handlers::{PaymentFailedHandler, PaymentSucceededHandler, SubscriptionCreatedHandler};

// ============================================================================
// Event kinds
// ============================================================================

/// Event types this service has domain logic for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PaymentSucceeded,
    PaymentFailed,
    SubscriptionCreated,
}

impl EventKind {
    /// Every recognized kind
    pub const ALL: [EventKind; 3] = [
        Self::PaymentSucceeded,
        Self::PaymentFailed,
        Self::SubscriptionCreated,
    ];

    /// Wire name as it appears in the payload's type field
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PaymentSucceeded => "payment_succeeded",
            Self::PaymentFailed => "payment_failed",
            Self::SubscriptionCreated => "subscription_created",
        }
    }

    /// Exact, case-sensitive match against the wire names.
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == event_type)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_event_type(s).ok_or_else(|| ParseError::InvalidFormat {
            expected: "payment_succeeded, payment_failed, or subscription_created".to_string(),
            actual: s.to_string(),
        })
    }
}

// ============================================================================
// Handler contract
// ============================================================================

/// Error raised by a domain handler.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
    #[error("Handler failed: {message}")]
    Failed { message: String },
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// Domain logic for one [`EventKind`].
///
/// Handlers run synchronously on the request path. A returned error is not
/// caught by the [`Dispatcher`]; it propagates to the caller.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &WebhookEvent, request_id: RequestId) -> Result<(), HandlerError>;
}

// ============================================================================
// Dispatch results
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchStatus {
    /// A handler ran and returned normally
    Handled,
    /// No handler is bound to the event type
    Ignored,
}

impl DispatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Handled => "handled",
            Self::Ignored => "ignored",
        }
    }
}

/// Outcome of dispatching one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchResult {
    pub event_id: String,
    pub event_type: String,
    pub status: DispatchStatus,
}

impl DispatchResult {
    fn new(event: &WebhookEvent, status: DispatchStatus) -> Self {
        Self {
            event_id: event.id().to_string(),
            event_type: event.event_type().to_string(),
            status,
        }
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Invokes the handler bound to an event's kind.
///
/// Built once at startup and used read-only afterwards, so it can be shared
/// between concurrent requests without locking.
///
/// # Examples
///
/// ```rust
/// use webhook_receiver_core::dispatch::{Dispatcher, EventKind};
///
/// let dispatcher = Dispatcher::with_default_handlers();
/// assert!(dispatcher.is_registered(EventKind::PaymentSucceeded));
/// ```
#[derive(Clone, Default)]
pub struct Dispatcher {
    handlers: HashMap<EventKind, Arc<dyn EventHandler>>,
}

impl Dispatcher {
    /// Create a dispatcher with no handlers; every event is ignored.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a dispatcher with the built-in handler for every [`EventKind`].
    pub fn with_default_handlers() -> Self {
        let mut dispatcher = Self::new();
        dispatcher
            .register(EventKind::PaymentSucceeded, Arc::new(PaymentSucceededHandler))
            .register(EventKind::PaymentFailed, Arc::new(PaymentFailedHandler))
            .register(
                EventKind::SubscriptionCreated,
                Arc::new(SubscriptionCreatedHandler),
            );
        dispatcher
    }

    /// Bind `handler` to `kind`, replacing any previous binding.
    pub fn register(&mut self, kind: EventKind, handler: Arc<dyn EventHandler>) -> &mut Self {
        self.handlers.insert(kind, handler);
        self
    }

    pub fn is_registered(&self, kind: EventKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Route `event` to its handler.
    ///
    /// # Errors
    ///
    /// Returns the handler's [`HandlerError`] unchanged.
    pub fn dispatch(
        &self,
        event: &WebhookEvent,
        request_id: RequestId,
    ) -> Result<DispatchResult, HandlerError> {
        let handler = EventKind::from_event_type(event.event_type())
            .and_then(|kind| self.handlers.get(&kind));

        match handler {
            Some(handler) => {
                handler.handle(event, request_id)?;
                Ok(DispatchResult::new(event, DispatchStatus::Handled))
            }
            None => {
                warn!(
                    request_id = %request_id,
                    event_type = %event.event_type(),
                    "webhook_ignored_unknown_event_type"
                );
                Ok(DispatchResult::new(event, DispatchStatus::Ignored))
            }
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
