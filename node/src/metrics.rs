//! # Prometheus Metrics
//!
//! Exposes operational metrics for the payment service. Scraped by
//! Prometheus at the `/metrics` HTTP endpoint on the configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`]
//! prefixed `tpv`, so they do not collide with any default global registry
//! consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

use tpv_gateway::PaymentOutcome;

/// Holds all Prometheus metric handles for the service.
///
/// Clone-friendly (prometheus handles are `Arc`s internally) so it can be
/// shared across request handlers.
#[derive(Clone)]
pub struct PaymentMetrics {
    registry: Registry,
    /// Payment requests signed and handed back to the caller.
    pub payloads_signed_total: IntCounter,
    /// Payment requests refused before signing (validation failures).
    pub payment_requests_rejected_total: IntCounter,
    /// Gateway notifications received, labelled by outcome.
    pub notifications_total: IntCounterVec,
    /// Time spent building and signing one request, in seconds.
    pub signing_latency_seconds: Histogram,
}

impl PaymentMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("tpv".into()), None)?;

        let payloads_signed_total = IntCounter::new(
            "payloads_signed_total",
            "Total number of payment requests signed",
        )?;
        registry.register(Box::new(payloads_signed_total.clone()))?;

        let payment_requests_rejected_total = IntCounter::new(
            "payment_requests_rejected_total",
            "Total number of payment requests rejected by validation",
        )?;
        registry.register(Box::new(payment_requests_rejected_total.clone()))?;

        let notifications_total = IntCounterVec::new(
            Opts::new(
                "notifications_total",
                "Total number of gateway notifications by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(notifications_total.clone()))?;

        let signing_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "signing_latency_seconds",
                "Latency of building and signing a payment request in seconds",
            )
            .buckets(vec![
                0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05,
            ]),
        )?;
        registry.register(Box::new(signing_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            payloads_signed_total,
            payment_requests_rejected_total,
            notifications_total,
            signing_latency_seconds,
        })
    }

    /// Counts one notification under its outcome label.
    pub fn record_notification(&self, outcome: PaymentOutcome) {
        self.notifications_total
            .with_label_values(&[&outcome.to_string()])
            .inc();
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<PaymentMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
