//! Common test utilities for webhook-receiver integration tests
//!
//! This module provides:
//! - A recording event handler
//! - A router wired to the real gatekeeper and dispatcher
//! - Request builders and response readers

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use webhook_receiver_api::{create_router, AppState, ServiceConfig, ServiceMetrics};
use webhook_receiver_core::{
    dispatch::{Dispatcher, EventHandler, EventKind, HandlerError},
    webhook::{
        compute_signature, Gatekeeper, ProcessedEventRegistry, SecretSource, StaticSecretSource,
        WebhookEvent, WebhookProcessorImpl,
    },
    RequestId,
};

#[allow(dead_code)]
pub const SECRET: &str = "topsecret";

// ============================================================================
// Recording handler
// ============================================================================

/// Handler that records the id of every event it receives.
#[derive(Default)]
pub struct RecordingHandler {
    seen: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingHandler {
    #[allow(dead_code)]
    pub fn failing() -> Self {
        Self {
            seen: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    #[allow(dead_code)]
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

impl EventHandler for RecordingHandler {
    fn handle(&self, event: &WebhookEvent, _request_id: RequestId) -> Result<(), HandlerError> {
        self.seen.lock().unwrap().push(event.id().to_string());
        if self.fail {
            return Err(HandlerError::failed("recording handler configured to fail"));
        }
        Ok(())
    }
}

// ============================================================================
// Test application
// ============================================================================

/// Router plus handles on the state the tests assert against.
#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub registry: Arc<ProcessedEventRegistry>,
    pub payment_succeeded: Arc<RecordingHandler>,
    pub metrics: Arc<ServiceMetrics>,
}

#[allow(dead_code)]
impl TestApp {
    /// App with the shared test secret and a recording `payment_succeeded` handler.
    pub fn new() -> Self {
        Self::with(
            Arc::new(StaticSecretSource::new(SECRET)),
            Arc::new(RecordingHandler::default()),
        )
    }

    pub fn with(secret: Arc<dyn SecretSource>, payment_succeeded: Arc<RecordingHandler>) -> Self {
        let registry = Arc::new(ProcessedEventRegistry::new());
        let gatekeeper = Gatekeeper::new(secret, Arc::clone(&registry));

        let mut dispatcher = Dispatcher::with_default_handlers();
        dispatcher.register(EventKind::PaymentSucceeded, payment_succeeded.clone());

        let metrics = ServiceMetrics::new().expect("metrics registry must build");
        let state = AppState::new(
            ServiceConfig::default(),
            Arc::new(WebhookProcessorImpl::new(gatekeeper, dispatcher)),
            Arc::clone(&metrics),
        );

        Self {
            router: create_router(state),
            registry,
            payment_succeeded,
            metrics,
        }
    }

    /// Send `request` and return the status with the parsed JSON body.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }
}

// ============================================================================
// Request builders
// ============================================================================

/// POST `body` to the default endpoint signed with [`SECRET`].
#[allow(dead_code)]
pub fn signed_webhook(body: &str) -> Request<Body> {
    webhook_with_signature(body, Some(compute_signature(SECRET.as_bytes(), body.as_bytes())))
}

/// POST `body` to the default endpoint with an explicit header value, or none.
#[allow(dead_code)]
pub fn webhook_with_signature(body: &str, signature: Option<String>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/webhooks")
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header("X-Signature", signature);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[allow(dead_code)]
pub fn get(path: &str) -> Request<Body> {
    Request::builder().uri(path).body(Body::empty()).unwrap()
}
