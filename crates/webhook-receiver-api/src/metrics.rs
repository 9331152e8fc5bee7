//! Metrics collection for the webhook endpoint.

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use webhook_receiver_core::{ProcessingOutcome, WebhookError};

/// Service metrics for observability
///
/// Each instance owns its own [`Registry`], so several routers (in tests, for
/// instance) can coexist in one process without duplicate-registration errors.
#[derive(Debug)]
pub struct ServiceMetrics {
    registry: Registry,

    pub webhook_requests_total: IntCounter,
    pub webhook_rejections_total: IntCounterVec,
    pub webhook_duplicates_total: IntCounter,
    pub webhook_dispatch_total: IntCounterVec,
    pub webhook_handler_failures_total: IntCounter,
    pub webhook_processing_duration: Histogram,
}

impl ServiceMetrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        let webhook_requests_total = IntCounter::with_opts(Opts::new(
            "webhook_requests_total",
            "Total webhook requests received",
        ))?;
        let webhook_rejections_total = IntCounterVec::new(
            Opts::new(
                "webhook_rejections_total",
                "Webhook requests rejected before dispatch, by reason",
            ),
            &["reason"],
        )?;
        let webhook_duplicates_total = IntCounter::with_opts(Opts::new(
            "webhook_duplicates_total",
            "Deliveries of an already processed event id",
        ))?;
        let webhook_dispatch_total = IntCounterVec::new(
            Opts::new(
                "webhook_dispatch_total",
                "Events dispatched, by handled/ignored status",
            ),
            &["status"],
        )?;
        let webhook_handler_failures_total = IntCounter::with_opts(Opts::new(
            "webhook_handler_failures_total",
            "Events whose handler returned an error",
        ))?;
        let webhook_processing_duration = Histogram::with_opts(
            HistogramOpts::new(
                "webhook_processing_duration_seconds",
                "Webhook processing time distribution",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        )?;

        registry.register(Box::new(webhook_requests_total.clone()))?;
        registry.register(Box::new(webhook_rejections_total.clone()))?;
        registry.register(Box::new(webhook_duplicates_total.clone()))?;
        registry.register(Box::new(webhook_dispatch_total.clone()))?;
        registry.register(Box::new(webhook_handler_failures_total.clone()))?;
        registry.register(Box::new(webhook_processing_duration.clone()))?;

        Ok(Arc::new(Self {
            registry,
            webhook_requests_total,
            webhook_rejections_total,
            webhook_duplicates_total,
            webhook_dispatch_total,
            webhook_handler_failures_total,
            webhook_processing_duration,
        }))
    }

    /// Count the result of one delivery.
    pub fn record(&self, result: &Result<ProcessingOutcome, WebhookError>) {
        match result {
            Ok(ProcessingOutcome::Dispatched(dispatched)) => self
                .webhook_dispatch_total
                .with_label_values(&[dispatched.status.as_str()])
                .inc(),
            Ok(ProcessingOutcome::Duplicate { .. }) => self.webhook_duplicates_total.inc(),
            Err(WebhookError::Rejected(reason)) => self
                .webhook_rejections_total
                .with_label_values(&[reason.code()])
                .inc(),
            Err(WebhookError::Handler { .. }) => self.webhook_handler_failures_total.inc(),
        }
    }

    /// Render all metrics in the Prometheus text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
