//! Error types for the gateway signature core.
//!
//! Every fallible operation on the outbound path returns a [`GatewayError`].
//! Inbound callback failures are not represented here; they are classified
//! into [`crate::callback::PaymentOutcome`] values instead.

use thiserror::Error;

/// Errors raised while configuring the gateway or building a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The deployment itself is broken (bad secret encoding or size, bad
    /// merchant code, missing gateway URL). Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The transaction request is malformed (bad amount, empty id, unknown
    /// currency or transaction type). Nothing is sent to the gateway.
    #[error("validation error: {0}")]
    Validation(String),

    /// A cryptographic input is out of bounds (order id empty, too long, or
    /// not ASCII).
    #[error("crypto error: {0}")]
    Crypto(String),
}

impl GatewayError {
    pub(crate) fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub(crate) fn crypto(msg: impl Into<String>) -> Self {
        Self::Crypto(msg.into())
    }

    /// Returns `true` for errors that must stop request processing entirely.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, GatewayError>;
