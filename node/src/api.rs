//! # REST API
//!
//! Builds the axum router that exposes the payment service's HTTP interface.
//! All endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                        | Description                              |
//! |--------|-----------------------------|------------------------------------------|
//! | GET    | `/health`                   | Liveness probe                           |
//! | POST   | `/payments`                 | Sign a payment request for a reservation |
//! | GET    | `/payments/:reservation_id` | Current payment status                   |
//! | POST   | `/payments/notify`          | Gateway notification (form-encoded)      |
//!
//! A notification only changes a reservation after the gateway's signature
//! has been verified. Anything else gets a 400 with a generic body and the
//! reservation stays as it was.

use axum::{
    extract::{rejection::FormRejection, Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use tpv_gateway::callback::{CallbackPayload, CallbackValidator, PaymentOutcome, SECURITY_LOG_TARGET};
use tpv_gateway::transaction::types::parse_minor_units;
use tpv_gateway::transaction::{sign_request, Currency, TransactionBuilder, TransactionType};
use tpv_gateway::{GatewayConfig, GatewayError, SignedPayload};

use crate::metrics::SharedMetrics;
use crate::store::{PaymentRecord, PaymentStatus, ReservationStore, StoreError};

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone — everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Merchant configuration, immutable after startup.
    pub config: Arc<GatewayConfig>,
    /// Reservation payment state.
    pub store: Arc<dyn ReservationStore>,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/payments", post(create_payment_handler))
        .route("/payments/notify", post(notify_handler))
        .route("/payments/:reservation_id", get(payment_status_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Body of `POST /payments`.
#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    pub reservation_id: String,
    /// Major units, e.g. `"180.00"`.
    pub amount: Decimal,
    /// ISO alpha or numeric code. Defaults to the configured currency.
    pub currency: Option<String>,
    /// Name (`"authorization"`) or gateway code (`"1"`). Defaults to payment.
    pub transaction_type: Option<String>,
}

/// Response of `POST /payments`: everything a front end needs to render the
/// auto-submitting form that sends the customer to the gateway.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePaymentResponse {
    pub reservation_id: String,
    pub order_id: String,
    /// Minor units as signed.
    pub amount: String,
    pub gateway_url: String,
    pub form: SignedPayload,
}

/// Response of `POST /payments/notify` once a notification is applied.
#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationAck {
    pub order_id: String,
    pub outcome: PaymentOutcome,
    pub status: PaymentStatus,
}

/// Generic error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Body returned for every rejected notification. Says nothing about why.
const NOTIFICATION_REJECTED: &str = "notification rejected";

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — returns 200 if the service is alive.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `POST /payments` — builds and signs a payment request for a reservation
/// and records it as pending.
async fn create_payment_handler(
    State(state): State<AppState>,
    Json(body): Json<CreatePaymentRequest>,
) -> Response {
    let timer = state.metrics.signing_latency_seconds.start_timer();
    let signed = sign_for_reservation(&state.config, &body);
    timer.observe_duration();

    let (record, payload, gateway_url) = match signed {
        Ok(signed) => signed,
        Err(e) => {
            state.metrics.payment_requests_rejected_total.inc();
            tracing::info!(reservation_id = %body.reservation_id, error = %e, "payment request rejected");
            return if e.is_fatal() {
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "gateway misconfigured")
            } else {
                error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
            };
        }
    };

    let response = CreatePaymentResponse {
        reservation_id: record.reservation_id.clone(),
        order_id: record.order_id.clone(),
        amount: record.amount.clone(),
        gateway_url,
        form: payload,
    };

    if let Err(e) = state.store.record_pending(record) {
        state.metrics.payment_requests_rejected_total.inc();
        return error_response(StatusCode::CONFLICT, e.to_string());
    }

    state.metrics.payloads_signed_total.inc();
    tracing::info!(
        reservation_id = %response.reservation_id,
        order_id = %response.order_id,
        amount = %response.amount,
        "payment request signed"
    );
    (StatusCode::OK, Json(response)).into_response()
}

fn sign_for_reservation(
    config: &GatewayConfig,
    body: &CreatePaymentRequest,
) -> Result<(PaymentRecord, SignedPayload, String), GatewayError> {
    let currency = match body.currency.as_deref() {
        Some(code) => code.parse::<Currency>()?,
        None => config.currency(),
    };
    let transaction_type = match body.transaction_type.as_deref() {
        Some(code) => code.parse::<TransactionType>()?,
        None => TransactionType::Payment,
    };

    let request = TransactionBuilder::new(config)
        .reservation_id(&body.reservation_id)
        .amount(body.amount)
        .currency(currency)
        .transaction_type(transaction_type)
        .build()?;
    let payload = sign_request(config, &request)?;

    let record = PaymentRecord::pending(
        body.reservation_id.trim(),
        request.order_id().as_str(),
        request.amount(),
        currency,
        transaction_type,
    );
    Ok((record, payload, request.gateway_url().to_string()))
}

/// `GET /payments/:reservation_id` — current payment record.
async fn payment_status_handler(
    Path(reservation_id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    match state.store.get(&reservation_id) {
        Some(record) => (StatusCode::OK, Json(record)).into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("no payment for reservation {}", reservation_id),
        ),
    }
}

/// `POST /payments/notify` — the gateway's server-to-server notification.
async fn notify_handler(
    State(state): State<AppState>,
    form: Result<Form<CallbackPayload>, FormRejection>,
) -> Response {
    let Ok(Form(payload)) = form else {
        state.metrics.record_notification(PaymentOutcome::MalformedCallback);
        tracing::warn!(target: SECURITY_LOG_TARGET, "unparseable payment notification");
        return error_response(StatusCode::BAD_REQUEST, NOTIFICATION_REJECTED);
    };

    let verdict = CallbackValidator::new(&state.config).validate(&payload);
    state.metrics.record_notification(verdict.outcome);

    let Some(order_id) = verdict.order_id.as_ref().filter(|_| verdict.is_valid()) else {
        return error_response(StatusCode::BAD_REQUEST, NOTIFICATION_REJECTED);
    };

    let Some(record) = state.store.find_by_order(order_id.as_str()) else {
        tracing::warn!(order_id = %order_id, "notification for unknown order");
        return error_response(
            StatusCode::NOT_FOUND,
            format!("no payment for order {}", order_id),
        );
    };

    let new_status = if verdict.confirms_payment() {
        let notified = verdict.amount().and_then(parse_minor_units);
        let recorded = parse_minor_units(&record.amount);
        if notified.is_none() || notified != recorded {
            tracing::warn!(
                target: SECURITY_LOG_TARGET,
                order_id = %order_id,
                recorded = %record.amount,
                notified = ?verdict.amount(),
                "authorized amount does not match recorded payment"
            );
            return error_response(StatusCode::BAD_REQUEST, NOTIFICATION_REJECTED);
        }
        PaymentStatus::Paid
    } else {
        PaymentStatus::Declined
    };

    match state
        .store
        .update_status(order_id.as_str(), new_status, verdict.response_code)
    {
        Ok(updated) => {
            tracing::info!(
                reservation_id = %updated.reservation_id,
                order_id = %order_id,
                status = %updated.status,
                "reservation payment updated"
            );
            let ack = NotificationAck {
                order_id: order_id.to_string(),
                outcome: verdict.outcome,
                status: updated.status,
            };
            (StatusCode::OK, Json(ack)).into_response()
        }
        Err(e @ StoreError::InvalidTransition { .. }) => {
            tracing::warn!(order_id = %order_id, error = %e, "notification conflicts with settled payment");
            error_response(StatusCode::CONFLICT, e.to_string())
        }
        Err(e) => error_response(StatusCode::NOT_FOUND, e.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
