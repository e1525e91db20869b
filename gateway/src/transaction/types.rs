//! Core value types for gateway transactions.
//!
//! Every code the gateway accepts is an enumerated, `Copy` type here. The
//! string forms the wire format wants are produced only at the
//! canonicalization boundary.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::{AMOUNT_WIDTH, MAX_ORDER_ID_LENGTH, MINOR_UNITS_PER_MAJOR};
use crate::crypto::cipher::validate_order_id;
use crate::error::{GatewayError, Result};

// ---------------------------------------------------------------------------
// TransactionType
// ---------------------------------------------------------------------------

/// Operation requested from the gateway (`Ds_Merchant_TransactionType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Authorize and capture in one step.
    Payment,
    /// Reserve funds without collecting them (pre-authorization).
    Authorization,
    /// Collect funds from an earlier authorization (confirmation).
    Capture,
    /// Return captured funds.
    Refund,
    /// Release an authorization without capturing it.
    Cancellation,
}

impl TransactionType {
    /// Numeric code the gateway expects.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Payment => "0",
            Self::Authorization => "1",
            Self::Capture => "2",
            Self::Refund => "3",
            Self::Cancellation => "9",
        }
    }

    /// Parses a gateway code back into a type.
    pub fn from_code(code: &str) -> Result<Self> {
        match code {
            "0" => Ok(Self::Payment),
            "1" => Ok(Self::Authorization),
            "2" => Ok(Self::Capture),
            "3" => Ok(Self::Refund),
            "9" => Ok(Self::Cancellation),
            other => Err(GatewayError::validation(format!(
                "unsupported transaction type code: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Payment => write!(f, "payment"),
            Self::Authorization => write!(f, "authorization"),
            Self::Capture => write!(f, "capture"),
            Self::Refund => write!(f, "refund"),
            Self::Cancellation => write!(f, "cancellation"),
        }
    }
}

impl FromStr for TransactionType {
    type Err = GatewayError;

    /// Accepts either the name (`"authorization"`) or the code (`"1"`).
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "payment" => Ok(Self::Payment),
            "authorization" | "preauthorization" => Ok(Self::Authorization),
            "capture" | "confirmation" => Ok(Self::Capture),
            "refund" => Ok(Self::Refund),
            "cancellation" => Ok(Self::Cancellation),
            code => Self::from_code(code),
        }
    }
}

// ---------------------------------------------------------------------------
// Currency
// ---------------------------------------------------------------------------

/// Currencies the merchant contract accepts. All use two minor-unit digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    EUR,
    USD,
    GBP,
    CHF,
}

impl Currency {
    /// ISO 4217 numeric code (`Ds_Merchant_Currency`).
    pub fn numeric_code(&self) -> &'static str {
        match self {
            Self::EUR => "978",
            Self::USD => "840",
            Self::GBP => "826",
            Self::CHF => "756",
        }
    }

    /// ISO 4217 alphabetic code.
    pub fn alpha_code(&self) -> &'static str {
        match self {
            Self::EUR => "EUR",
            Self::USD => "USD",
            Self::GBP => "GBP",
            Self::CHF => "CHF",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.alpha_code())
    }
}

impl FromStr for Currency {
    type Err = GatewayError;

    /// Accepts the alphabetic (`"EUR"`) or numeric (`"978"`) ISO code.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EUR" | "978" => Ok(Self::EUR),
            "USD" | "840" => Ok(Self::USD),
            "GBP" | "826" => Ok(Self::GBP),
            "CHF" | "756" => Ok(Self::CHF),
            other => Err(GatewayError::validation(format!(
                "unsupported currency: {}",
                other
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// OrderId
// ---------------------------------------------------------------------------

/// Gateway order identifier: 1..=12 ASCII characters.
///
/// Distinct from the booking's internal reservation id, which is usually a
/// UUID and far too long for the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderId(String);

impl OrderId {
    /// Wraps an order id as the gateway echoed it back.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Crypto`] if it is empty, too long, or not ASCII.
    pub fn parse(value: &str) -> Result<Self> {
        validate_order_id(value)?;
        Ok(Self(value.to_string()))
    }

    /// Derives an order id from a reservation id: keep ASCII alphanumerics,
    /// then truncate to [`MAX_ORDER_ID_LENGTH`].
    ///
    /// ```
    /// use tpv_gateway::transaction::types::OrderId;
    ///
    /// let order = OrderId::from_reservation("test-reservation-42").unwrap();
    /// assert_eq!(order.as_str(), "testreservat");
    /// ```
    ///
    /// # Errors
    ///
    /// [`GatewayError::Validation`] if nothing alphanumeric is left.
    pub fn from_reservation(reservation_id: &str) -> Result<Self> {
        let order: String = reservation_id
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(MAX_ORDER_ID_LENGTH)
            .collect();

        if order.is_empty() {
            return Err(GatewayError::validation(
                "reservation id has no alphanumeric characters",
            ));
        }
        Ok(Self(order))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for OrderId {
    type Error = GatewayError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<OrderId> for String {
    fn from(order: OrderId) -> Self {
        order.0
    }
}

// ---------------------------------------------------------------------------
// Amount
// ---------------------------------------------------------------------------

/// Converts a major-unit decimal amount into the gateway's fixed-width
/// minor-unit string.
///
/// Multiplies by 100, rounds half away from zero, and zero-pads to
/// [`AMOUNT_WIDTH`] digits.
///
/// ```
/// use rust_decimal::Decimal;
/// use tpv_gateway::transaction::types::minor_units;
///
/// assert_eq!(minor_units(Decimal::new(1800, 2)).unwrap(), "000000001800");
/// ```
///
/// # Errors
///
/// [`GatewayError::Validation`] if the amount is not positive, rounds to
/// zero minor units, or does not fit in the fixed width.
pub fn minor_units(amount: Decimal) -> Result<String> {
    if amount <= Decimal::ZERO {
        return Err(GatewayError::validation(format!(
            "amount must be > 0, got {}",
            amount
        )));
    }

    let minor = amount
        .checked_mul(Decimal::from(MINOR_UNITS_PER_MAJOR))
        .ok_or_else(|| GatewayError::validation("amount is out of range"))?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

    let value = minor
        .to_u64()
        .ok_or_else(|| GatewayError::validation("amount is out of range"))?;
    if value == 0 {
        return Err(GatewayError::validation(
            "amount rounds to zero minor units",
        ));
    }

    let rendered = format!("{:0width$}", value, width = AMOUNT_WIDTH);
    if rendered.len() > AMOUNT_WIDTH {
        return Err(GatewayError::validation(format!(
            "amount exceeds {} digits in minor units",
            AMOUNT_WIDTH
        )));
    }
    Ok(rendered)
}

/// Parses a minor-unit amount string (as echoed in `Ds_Amount`) back into
/// major units. Leading zeros are accepted.
pub fn parse_minor_units(value: &str) -> Option<Decimal> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let minor: u64 = value.parse().ok()?;
    Some(Decimal::from(minor) / Decimal::from(MINOR_UNITS_PER_MAJOR))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
