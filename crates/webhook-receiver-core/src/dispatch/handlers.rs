//! Built-in domain handlers.
//!
//! These only record that the event arrived. Real business logic replaces the
//! bodies without touching the dispatch contract.

use super::{EventHandler, HandlerError};
use crate::webhook::WebhookEvent;
use crate::RequestId;
use serde_json::Value;
use tracing::info;

/// Handles `payment_succeeded`
#[derive(Debug, Default, Clone, Copy)]
pub struct PaymentSucceededHandler;

impl EventHandler for PaymentSucceededHandler {
    fn handle(&self, event: &WebhookEvent, request_id: RequestId) -> Result<(), HandlerError> {
        let amount = event.data().get("amount");
        info!(
            request_id = %request_id,
            event_id = %event.id(),
            amount = ?amount,
            "handler:payment_succeeded"
        );
        Ok(())
    }
}

/// Handles `payment_failed`
#[derive(Debug, Default, Clone, Copy)]
pub struct PaymentFailedHandler;

impl EventHandler for PaymentFailedHandler {
    fn handle(&self, event: &WebhookEvent, request_id: RequestId) -> Result<(), HandlerError> {
        let reason = event.data().get("reason").and_then(Value::as_str);
        info!(
            request_id = %request_id,
            event_id = %event.id(),
            reason = ?reason,
            "handler:payment_failed"
        );
        Ok(())
    }
}

/// Handles `subscription_created`
#[derive(Debug, Default, Clone, Copy)]
pub struct SubscriptionCreatedHandler;

impl EventHandler for SubscriptionCreatedHandler {
    fn handle(&self, event: &WebhookEvent, request_id: RequestId) -> Result<(), HandlerError> {
        let plan = event.data().get("plan").and_then(Value::as_str);
        info!(
            request_id = %request_id,
            event_id = %event.id(),
            plan = ?plan,
            "handler:subscription_created"
        );
        Ok(())
    }
}
