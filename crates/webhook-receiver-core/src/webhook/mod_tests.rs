//! Tests for the webhook processing pipeline.

use super::*;
use crate::dispatch::{DispatchStatus, EventHandler, EventKind};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================================
// Helpers
// ============================================================================

const SECRET: &str = "topsecret";

#[derive(Default)]
struct CountingHandler {
    calls: AtomicUsize,
}

impl CountingHandler {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EventHandler for CountingHandler {
    fn handle(&self, _event: &WebhookEvent, _request_id: RequestId) -> Result<(), HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct FailingHandler {
    calls: AtomicUsize,
}

impl EventHandler for FailingHandler {
    fn handle(&self, _event: &WebhookEvent, _request_id: RequestId) -> Result<(), HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(HandlerError::failed("downstream unavailable"))
    }
}

fn processor_with(kind: EventKind, handler: Arc<dyn EventHandler>) -> WebhookProcessorImpl {
    let gatekeeper = Gatekeeper::new(
        Arc::new(StaticSecretSource::new(SECRET)),
        Arc::new(ProcessedEventRegistry::new()),
    );
    let mut dispatcher = Dispatcher::new();
    dispatcher.register(kind, handler);
    WebhookProcessorImpl::new(gatekeeper, dispatcher)
}

fn signed(body: &str) -> InboundDelivery {
    let signature = compute_signature(SECRET.as_bytes(), body.as_bytes());
    InboundDelivery::new(Bytes::from(body.to_string()), Some(signature))
}

// ============================================================================
// InboundDelivery
// ============================================================================

mod delivery_tests {
    use super::*;

    #[test]
    fn test_delivery_preserves_body_and_signature() {
        let request_id = RequestId::new();
        let delivery = InboundDelivery::with_request_id(
            request_id,
            Bytes::from_static(b"{\"id\":\"evt_1\"}"),
            Some("sha256=abc".to_string()),
        );

        assert_eq!(delivery.request_id(), request_id);
        assert_eq!(delivery.body().as_ref(), b"{\"id\":\"evt_1\"}");
        assert_eq!(delivery.signature(), Some("sha256=abc"));
        assert!(delivery.received_at() <= Timestamp::now());
    }

    #[test]
    fn test_each_delivery_gets_its_own_request_id() {
        let a = InboundDelivery::new(Bytes::new(), None);
        let b = InboundDelivery::new(Bytes::new(), None);
        assert_ne!(a.request_id(), b.request_id());
        assert_eq!(a.signature(), None);
    }

    #[test]
    fn test_event_serializes_type_field() {
        let event = WebhookEvent::new(
            "evt_1".to_string(),
            "payment_succeeded".to_string(),
            serde_json::Map::new(),
        );
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(
            value,
            json!({"id": "evt_1", "type": "payment_succeeded", "data": {}})
        );
    }
}

// ============================================================================
// Rejection reasons
// ============================================================================

mod rejection_tests {
    use super::*;

    #[test]
    fn test_codes_and_messages() {
        let misconfigured = RejectionReason::ServerMisconfigured {
            secret_name: "WEBHOOK_SECRET".to_string(),
        };
        assert_eq!(misconfigured.code(), "server_misconfigured");
        assert_eq!(
            misconfigured.client_message(),
            "WEBHOOK_SECRET is not configured."
        );
        assert!(misconfigured.is_server_error());

        assert_eq!(RejectionReason::InvalidSignature.code(), "invalid_signature");
        assert_eq!(
            RejectionReason::InvalidSignature.client_message(),
            "Request signature is missing or invalid."
        );
        assert!(!RejectionReason::InvalidSignature.is_server_error());

        let invalid_json = RejectionReason::InvalidJson {
            detail: "EOF while parsing".to_string(),
        };
        assert_eq!(invalid_json.code(), "invalid_json");
        assert_eq!(invalid_json.client_message(), "Request body must be valid JSON.");

        assert_eq!(RejectionReason::MissingEventId.code(), "missing_event_id");
        assert_eq!(
            RejectionReason::MissingEventId.client_message(),
            "Payload must include an event id (id/event_id)."
        );
    }

    /// Parser internals stay in the log, not the response.
    #[test]
    fn test_client_message_hides_parser_detail() {
        let reason = RejectionReason::InvalidJson {
            detail: "expected value at line 1 column 2".to_string(),
        };
        assert!(!reason.client_message().contains("line 1"));
    }

    #[test]
    fn test_webhook_error_codes() {
        let rejected: WebhookError = RejectionReason::MissingEventId.into();
        assert_eq!(rejected.code(), "missing_event_id");

        let handler = WebhookError::Handler {
            event_id: "evt_1".to_string(),
            event_type: "payment_succeeded".to_string(),
            source: HandlerError::failed("boom"),
        };
        assert_eq!(handler.code(), "handler_failed");
    }
}

// ============================================================================
// End-to-end processing
// ============================================================================

mod processing_tests {
    use super::*;

    #[test]
    fn test_known_event_is_handled() {
        let handler = Arc::new(CountingHandler::default());
        let processor = processor_with(EventKind::PaymentSucceeded, handler.clone());

        let outcome = processor
            .process(&signed(
                r#"{"id":"evt_1","type":"payment_succeeded","data":{}}"#,
            ))
            .unwrap();

        assert_eq!(outcome.status(), "handled");
        assert_eq!(outcome.event_id(), "evt_1");
        assert_eq!(outcome.event_type(), "payment_succeeded");
        assert_eq!(handler.calls(), 1);
    }

    #[test]
    fn test_unknown_event_type_is_ignored() {
        let handler = Arc::new(CountingHandler::default());
        let processor = processor_with(EventKind::PaymentSucceeded, handler.clone());

        let outcome = processor
            .process(&signed(r#"{"id":"evt_9","type":"refund_issued"}"#))
            .unwrap();

        assert_eq!(outcome.status(), "ignored");
        assert_eq!(outcome.event_type(), "refund_issued");
        assert_eq!(handler.calls(), 0);
    }

    #[test]
    fn test_alias_only_payload_is_ignored_as_unknown() {
        let processor = processor_with(
            EventKind::PaymentSucceeded,
            Arc::new(CountingHandler::default()),
        );

        let outcome = processor.process(&signed(r#"{"event_id":"evt_2"}"#)).unwrap();

        match outcome {
            ProcessingOutcome::Dispatched(result) => {
                assert_eq!(result.event_id, "evt_2");
                assert_eq!(result.event_type, "unknown");
                assert_eq!(result.status, DispatchStatus::Ignored);
            }
            other => panic!("expected Dispatched, got {:?}", other),
        }
    }

    #[test]
    fn test_redelivery_is_duplicate_and_not_dispatched() {
        let handler = Arc::new(CountingHandler::default());
        let processor = processor_with(EventKind::PaymentSucceeded, handler.clone());
        let body = r#"{"id":"evt_1","type":"payment_succeeded","data":{}}"#;

        processor.process(&signed(body)).unwrap();
        let second = processor.process(&signed(body)).unwrap();

        assert_eq!(
            second,
            ProcessingOutcome::Duplicate {
                event_id: "evt_1".to_string(),
                event_type: "payment_succeeded".to_string(),
            }
        );
        assert_eq!(second.status(), "duplicate");
        assert_eq!(handler.calls(), 1);
    }

    #[test]
    fn test_default_handlers_accept_fractional_amount() {
        let gatekeeper = Gatekeeper::new(
            Arc::new(StaticSecretSource::new(SECRET)),
            Arc::new(ProcessedEventRegistry::new()),
        );
        let processor =
            WebhookProcessorImpl::new(gatekeeper, Dispatcher::with_default_handlers());
        let body = r#"{"id":"evt_pay","type":"payment_succeeded","data":{"amount":19.99}}"#;

        let first = processor.process(&signed(body)).unwrap();
        let redelivery = processor.process(&signed(body)).unwrap();

        assert_eq!(first.status(), "handled");
        assert_eq!(redelivery.status(), "duplicate");
    }

    #[test]
    fn test_rejection_is_returned_as_error() {
        let processor = processor_with(
            EventKind::PaymentSucceeded,
            Arc::new(CountingHandler::default()),
        );
        let delivery = InboundDelivery::new(Bytes::from_static(b"{\"id\":\"evt_1\"}"), None);

        let err = processor.process(&delivery).unwrap_err();

        assert!(matches!(
            err,
            WebhookError::Rejected(RejectionReason::InvalidSignature)
        ));
        assert!(!processor.gatekeeper().registry().contains("evt_1"));
    }

    /// The id stays registered after a handler failure, so the event is
    /// delivered to the handler at most once.
    #[test]
    fn test_handler_failure_leaves_event_registered() {
        let handler = Arc::new(FailingHandler::default());
        let processor = processor_with(EventKind::PaymentFailed, handler.clone());
        let body = r#"{"id":"evt_f","type":"payment_failed"}"#;

        let err = processor.process(&signed(body)).unwrap_err();
        match err {
            WebhookError::Handler {
                ref event_id,
                ref event_type,
                ..
            } => {
                assert_eq!(event_id, "evt_f");
                assert_eq!(event_type, "payment_failed");
            }
            ref other => panic!("expected Handler error, got {:?}", other),
        }
        assert_eq!(err.code(), "handler_failed");

        let retry = processor.process(&signed(body)).unwrap();
        assert_eq!(retry.status(), "duplicate");
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_redeliveries_dispatch_once() {
        const DELIVERIES: usize = 24;

        let handler = Arc::new(CountingHandler::default());
        let processor = processor_with(EventKind::SubscriptionCreated, handler.clone());
        let body = r#"{"id":"evt_sub","type":"subscription_created","data":{"plan":"pro"}}"#;

        let statuses: Vec<&'static str> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..DELIVERIES)
                .map(|_| scope.spawn(|| processor.process(&signed(body)).unwrap().status()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(statuses.iter().filter(|s| **s == "handled").count(), 1);
        assert_eq!(
            statuses.iter().filter(|s| **s == "duplicate").count(),
            DELIVERIES - 1
        );
        assert_eq!(handler.calls(), 1);
    }

    #[tokio::test]
    async fn test_trait_object_processes_delivery() {
        let processor: Arc<dyn WebhookProcessor> = Arc::new(processor_with(
            EventKind::PaymentSucceeded,
            Arc::new(CountingHandler::default()),
        ));

        assert!(processor.secret_configured());

        let outcome = processor
            .process_webhook(signed(r#"{"id":"evt_1","type":"payment_succeeded"}"#))
            .await
            .unwrap();
        assert_eq!(outcome.status(), "handled");
    }

    #[tokio::test]
    async fn test_unconfigured_secret_reported() {
        let gatekeeper = Gatekeeper::new(
            Arc::new(StaticSecretSource::unconfigured()),
            Arc::new(ProcessedEventRegistry::new()),
        );
        let processor = WebhookProcessorImpl::new(gatekeeper, Dispatcher::with_default_handlers());

        assert!(!processor.secret_configured());

        let err = processor
            .process_webhook(signed(r#"{"id":"evt_1"}"#))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "server_misconfigured");
    }
}
