//! Reservation payment state.
//!
//! Tracks which booking reservations have a payment in flight and what the
//! gateway said about them. Records are keyed by reservation id and indexed
//! by gateway order id, since notifications only carry the latter.
//!
//! ## Transitions
//!
//! ```text
//! Pending ──authorized──▶ Paid
//!    └─────declined─────▶ Declined
//! ```
//!
//! Repeating a transition is a no-op, because the gateway retries
//! notifications until it gets a 200. Leaving a terminal state is refused.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use tpv_gateway::transaction::{Currency, TransactionType};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Request signed and handed to the customer; no notification yet.
    Pending,
    /// Gateway confirmed the payment with a valid notification.
    Paid,
    /// Gateway declined the payment with a valid notification.
    Declined,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Paid => write!(f, "paid"),
            Self::Declined => write!(f, "declined"),
        }
    }
}

/// One reservation's payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub reservation_id: String,
    pub order_id: String,
    /// Minor units exactly as signed.
    pub amount: String,
    pub currency: Currency,
    pub transaction_type: TransactionType,
    pub status: PaymentStatus,
    /// Response code from the last valid notification.
    pub response_code: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRecord {
    pub fn pending(
        reservation_id: &str,
        order_id: &str,
        amount: &str,
        currency: Currency,
        transaction_type: TransactionType,
    ) -> Self {
        let now = Utc::now();
        Self {
            reservation_id: reservation_id.to_string(),
            order_id: order_id.to_string(),
            amount: amount.to_string(),
            currency,
            transaction_type,
            status: PaymentStatus::Pending,
            response_code: None,
            created_at: now,
            updated_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No payment is recorded for this order id.
    UnknownOrder(String),

    /// The order id is already used by a different reservation.
    OrderConflict { order_id: String, reservation_id: String },

    /// The reservation has already been paid; a new request is refused.
    AlreadySettled { reservation_id: String, status: PaymentStatus },

    /// The record is in a terminal state and cannot move to `to`.
    InvalidTransition { from: PaymentStatus, to: PaymentStatus },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownOrder(order_id) => write!(f, "no payment recorded for order {}", order_id),
            Self::OrderConflict { order_id, reservation_id } => write!(
                f,
                "order {} already belongs to reservation {}",
                order_id, reservation_id
            ),
            Self::AlreadySettled { reservation_id, status } => {
                write!(f, "reservation {} is already {}", reservation_id, status)
            }
            Self::InvalidTransition { from, to } => {
                write!(f, "cannot move payment from {} to {}", from, to)
            }
        }
    }
}

impl std::error::Error for StoreError {}

// ---------------------------------------------------------------------------
// ReservationStore
// ---------------------------------------------------------------------------

/// Persistence seam for reservation payment state.
pub trait ReservationStore: Send + Sync {
    /// Records (or re-issues) a pending payment for a reservation.
    fn record_pending(&self, record: PaymentRecord) -> Result<(), StoreError>;

    fn get(&self, reservation_id: &str) -> Option<PaymentRecord>;

    fn find_by_order(&self, order_id: &str) -> Option<PaymentRecord>;

    /// Moves the payment for `order_id` to `status`. Idempotent.
    fn update_status(
        &self,
        order_id: &str,
        status: PaymentStatus,
        response_code: Option<u32>,
    ) -> Result<PaymentRecord, StoreError>;
}

/// Process-local store. Lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryReservationStore {
    by_reservation: DashMap<String, PaymentRecord>,
    order_index: DashMap<String, String>,
}

impl InMemoryReservationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReservationStore for InMemoryReservationStore {
    fn record_pending(&self, record: PaymentRecord) -> Result<(), StoreError> {
        if let Some(owner) = self.order_index.get(&record.order_id) {
            if *owner != record.reservation_id {
                return Err(StoreError::OrderConflict {
                    order_id: record.order_id.clone(),
                    reservation_id: owner.clone(),
                });
            }
        }

        if let Some(existing) = self.by_reservation.get(&record.reservation_id) {
            if existing.status.is_terminal() {
                return Err(StoreError::AlreadySettled {
                    reservation_id: record.reservation_id.clone(),
                    status: existing.status,
                });
            }
        }

        self.order_index
            .insert(record.order_id.clone(), record.reservation_id.clone());
        self.by_reservation
            .insert(record.reservation_id.clone(), record);
        Ok(())
    }

    fn get(&self, reservation_id: &str) -> Option<PaymentRecord> {
        self.by_reservation.get(reservation_id).map(|r| r.clone())
    }

    fn find_by_order(&self, order_id: &str) -> Option<PaymentRecord> {
        let reservation_id = self.order_index.get(order_id)?.clone();
        self.get(&reservation_id)
    }

    fn update_status(
        &self,
        order_id: &str,
        status: PaymentStatus,
        response_code: Option<u32>,
    ) -> Result<PaymentRecord, StoreError> {
        let reservation_id = self
            .order_index
            .get(order_id)
            .map(|r| r.clone())
            .ok_or_else(|| StoreError::UnknownOrder(order_id.to_string()))?;

        let mut record = self
            .by_reservation
            .get_mut(&reservation_id)
            .ok_or_else(|| StoreError::UnknownOrder(order_id.to_string()))?;

        if record.status == status {
            return Ok(record.clone());
        }
        if record.status.is_terminal() {
            return Err(StoreError::InvalidTransition {
                from: record.status,
                to: status,
            });
        }

        record.status = status;
        record.response_code = response_code;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
