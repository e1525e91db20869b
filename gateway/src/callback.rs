//! # Callback Validation
//!
//! The gateway reports each payment result to the merchant's notification
//! URL with the same envelope the merchant sent out: base64 parameters plus
//! an HMAC signature keyed by the order id. A notification is trusted only
//! after the signature is recomputed and matches.
//!
//! ```text
//! Received ──decode──▶ params ──order id──▶ derive key ──HMAC──▶ compare
//!     │                  │                     │                    │
//!     └── Malformed ◀────┴─────────────────────┘       InvalidSignature
//!                                                               │
//!                                              Valid(Authorized | Declined)
//! ```
//!
//! Validation never fails with an error. Every outcome is a
//! [`CallbackVerdict`], and only [`CallbackVerdict::confirms_payment`] may
//! be used to mark a reservation as paid.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{GatewayConfig, AUTHORIZED_RESPONSE_LIMIT, SIGNATURE_VERSION};
use crate::crypto::signature::verify_encoded;
use crate::transaction::params::{
    CanonicalParams, FIELD_NOTIFY_AMOUNT, FIELD_NOTIFY_ORDER, FIELD_NOTIFY_RESPONSE,
};
use crate::transaction::types::OrderId;

/// Security events are logged under this target.
pub const SECURITY_LOG_TARGET: &str = "tpv::security";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Raw notification as posted by the gateway (form or JSON body).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackPayload {
    #[serde(rename = "Ds_SignatureVersion", alias = "signatureVersion", default)]
    pub signature_version: Option<String>,
    #[serde(rename = "Ds_MerchantParameters", alias = "merchantParameters")]
    pub merchant_parameters: String,
    #[serde(rename = "Ds_Signature", alias = "signature")]
    pub signature: String,
}

/// Classification of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    /// Correctly signed, response code below 100.
    Authorized,
    /// Correctly signed, any other response code.
    Declined,
    /// Parameters parsed but the signature did not match.
    InvalidSignature,
    /// Could not be parsed far enough to check a signature, or a correctly
    /// signed payload lacks a usable response code.
    MalformedCallback,
}

impl fmt::Display for PaymentOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authorized => write!(f, "authorized"),
            Self::Declined => write!(f, "declined"),
            Self::InvalidSignature => write!(f, "invalid_signature"),
            Self::MalformedCallback => write!(f, "malformed_callback"),
        }
    }
}

/// Terminal state of the validation state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackState {
    Valid,
    Invalid,
}

/// Result of validating one notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallbackVerdict {
    pub state: CallbackState,
    pub outcome: PaymentOutcome,
    /// Order id from the parameters, when one could be extracted.
    pub order_id: Option<OrderId>,
    /// Parsed `Ds_Response`, when present and numeric.
    pub response_code: Option<u32>,
    /// Decoded parameters. Empty when decoding failed.
    #[serde(skip)]
    pub params: CanonicalParams,
}

impl CallbackVerdict {
    fn invalid(
        outcome: PaymentOutcome,
        order_id: Option<OrderId>,
        response_code: Option<u32>,
        params: CanonicalParams,
    ) -> Self {
        Self {
            state: CallbackState::Invalid,
            outcome,
            order_id,
            response_code,
            params,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.state == CallbackState::Valid
    }

    /// `true` only for a correctly signed, authorized notification.
    pub fn confirms_payment(&self) -> bool {
        self.state == CallbackState::Valid && self.outcome == PaymentOutcome::Authorized
    }

    /// Minor-unit amount the gateway reports (`Ds_Amount`), if any.
    pub fn amount(&self) -> Option<&str> {
        self.params.get_ignore_case(FIELD_NOTIFY_AMOUNT)
    }
}

// ---------------------------------------------------------------------------
// CallbackValidator
// ---------------------------------------------------------------------------

/// Validates inbound notifications against one merchant config.
#[derive(Debug, Clone)]
pub struct CallbackValidator<'a> {
    config: &'a GatewayConfig,
}

impl<'a> CallbackValidator<'a> {
    pub fn new(config: &'a GatewayConfig) -> Self {
        Self { config }
    }

    /// Runs the full check and classifies the notification.
    ///
    /// The signature is checked against the canonical re-encoding of the
    /// decoded parameters, not the received `Ds_MerchantParameters` text.
    /// Any encoding of the same key/value set verifies, whatever its key
    /// order, surrounding whitespace, or base64 alphabet. A gateway that
    /// signs its own unsorted JSON will therefore fail verification.
    pub fn validate(&self, payload: &CallbackPayload) -> CallbackVerdict {
        let verdict = self.classify(payload);
        if verdict.is_valid() {
            tracing::info!(
                order_id = ?verdict.order_id.as_ref().map(OrderId::as_str),
                response_code = ?verdict.response_code,
                outcome = %verdict.outcome,
                "payment notification accepted"
            );
        } else {
            tracing::warn!(
                target: SECURITY_LOG_TARGET,
                order_id = ?verdict.order_id.as_ref().map(OrderId::as_str),
                outcome = %verdict.outcome,
                "payment notification rejected"
            );
        }
        verdict
    }

    fn classify(&self, payload: &CallbackPayload) -> CallbackVerdict {
        let Some(params) = CanonicalParams::from_base64(&payload.merchant_parameters) else {
            return CallbackVerdict::invalid(
                PaymentOutcome::MalformedCallback,
                None,
                None,
                CanonicalParams::new(),
            );
        };

        if let Some(version) = payload.signature_version.as_deref() {
            if version.trim() != SIGNATURE_VERSION {
                return CallbackVerdict::invalid(PaymentOutcome::MalformedCallback, None, None, params);
            }
        }

        let order_id = match params
            .get_ignore_case(FIELD_NOTIFY_ORDER)
            .map(OrderId::parse)
        {
            Some(Ok(order_id)) => order_id,
            _ => {
                return CallbackVerdict::invalid(PaymentOutcome::MalformedCallback, None, None, params)
            }
        };

        let signature_ok = verify_encoded(
            self.config.secret(),
            self.config.order_padding(),
            order_id.as_str(),
            &params,
            payload.signature.trim(),
            self.config.signature_encoding(),
        );
        if !signature_ok {
            return CallbackVerdict::invalid(
                PaymentOutcome::InvalidSignature,
                Some(order_id),
                None,
                params,
            );
        }

        let response_code = params
            .get_ignore_case(FIELD_NOTIFY_RESPONSE)
            .map(str::trim)
            .filter(|code| !code.is_empty() && code.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|code| code.parse::<u32>().ok());

        let Some(code) = response_code else {
            return CallbackVerdict::invalid(
                PaymentOutcome::MalformedCallback,
                Some(order_id),
                None,
                params,
            );
        };

        let outcome = if code < AUTHORIZED_RESPONSE_LIMIT {
            PaymentOutcome::Authorized
        } else {
            PaymentOutcome::Declined
        };

        CallbackVerdict {
            state: CallbackState::Valid,
            outcome,
            order_id: Some(order_id),
            response_code: Some(code),
            params,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
