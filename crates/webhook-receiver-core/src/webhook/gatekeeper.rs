//! Authentication, parsing and deduplication of inbound deliveries.

use super::{
    signature::verify_signature, GateOutcome, InboundDelivery, ProcessedEventRegistry,
    RejectionReason, SecretSource, WebhookEvent, UNKNOWN_EVENT_TYPE,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{error, info};

/// Payload keys holding the event id, in lookup order.
const EVENT_ID_KEYS: [&str; 2] = ["id", "event_id"];

/// Payload keys holding the event type, in lookup order.
const EVENT_TYPE_KEYS: [&str; 2] = ["type", "event_type"];

/// Turns an [`InboundDelivery`] into a dispatchable [`WebhookEvent`], a
/// duplicate acknowledgement, or a [`RejectionReason`].
///
/// Checks run in a fixed order and each one short-circuits the rest:
///
/// 1. a secret must be configured
/// 2. the signature must match the raw body
/// 3. the body must be JSON (an empty body counts as `{}`)
/// 4. an event id must be present under `id` or `event_id`
/// 5. the event type is read from `type` or `event_type`, defaulting to `"unknown"`
/// 6. the event id is atomically recorded in the registry
///
/// The registry is touched only in the last step, so a rejected delivery
/// never marks its id as seen.
pub struct Gatekeeper {
    secret_source: Arc<dyn SecretSource>,
    registry: Arc<ProcessedEventRegistry>,
}

impl Gatekeeper {
    pub fn new(
        secret_source: Arc<dyn SecretSource>,
        registry: Arc<ProcessedEventRegistry>,
    ) -> Self {
        Self {
            secret_source,
            registry,
        }
    }

    /// Registry of processed event ids shared by this gatekeeper
    pub fn registry(&self) -> &Arc<ProcessedEventRegistry> {
        &self.registry
    }

    pub fn secret_configured(&self) -> bool {
        self.secret_source.current_secret().is_some()
    }

    /// Run every check against `delivery`.
    ///
    /// # Errors
    ///
    /// Returns the first [`RejectionReason`] encountered, in evaluation order.
    pub fn admit(&self, delivery: &InboundDelivery) -> Result<GateOutcome, RejectionReason> {
        let request_id = delivery.request_id();

        // Must be decided before the signature header is looked at.
        let secret = match self.secret_source.current_secret() {
            Some(secret) => secret,
            None => {
                error!(
                    request_id = %request_id,
                    status = "missing_webhook_secret",
                    "webhook_misconfigured"
                );
                return Err(RejectionReason::ServerMisconfigured {
                    secret_name: self.secret_source.secret_name().to_string(),
                });
            }
        };

        if !verify_signature(secret.expose_bytes(), delivery.body(), delivery.signature()) {
            info!(
                request_id = %request_id,
                status = "invalid_signature",
                "webhook_rejected"
            );
            return Err(RejectionReason::InvalidSignature);
        }

        let payload = parse_payload(delivery.body()).inspect_err(|_| {
            info!(
                request_id = %request_id,
                status = "invalid_json",
                "webhook_received"
            );
        })?;

        let event_id = match first_non_empty_str(&payload, &EVENT_ID_KEYS) {
            Some(id) => id.to_string(),
            None => {
                info!(
                    request_id = %request_id,
                    status = "missing_event_id",
                    "webhook_received"
                );
                return Err(RejectionReason::MissingEventId);
            }
        };

        let event_type = first_non_empty_str(&payload, &EVENT_TYPE_KEYS)
            .unwrap_or(UNKNOWN_EVENT_TYPE)
            .to_string();

        if !self.registry.try_insert(&event_id) {
            info!(
                request_id = %request_id,
                event_id = %event_id,
                event_type = %event_type,
                status = "duplicate",
                "webhook_duplicate_ignored"
            );
            return Ok(GateOutcome::Duplicate {
                event_id,
                event_type,
            });
        }

        let data = match payload {
            Value::Object(mut fields) => match fields.remove("data") {
                Some(Value::Object(data)) => data,
                _ => Map::new(),
            },
            _ => Map::new(),
        };

        Ok(GateOutcome::Accepted(WebhookEvent::new(
            event_id, event_type, data,
        )))
    }
}

/// Decode the verified body. A zero-length body is an empty object.
fn parse_payload(body: &[u8]) -> Result<Value, RejectionReason> {
    if body.is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    serde_json::from_slice(body).map_err(|e| RejectionReason::InvalidJson {
        detail: e.to_string(),
    })
}

/// First non-empty string found under `keys`. Non-object payloads yield `None`.
fn first_non_empty_str<'a>(payload: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| {
        payload
            .get(*key)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    })
}

#[cfg(test)]
#[path = "gatekeeper_tests.rs"]
mod tests;
