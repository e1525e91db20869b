//! Payment request construction via the builder pattern.
//!
//! The [`TransactionBuilder`] turns a booking's reservation id and a decimal
//! amount into typed [`MerchantParameters`]: set the fields, call
//! `.build()`, and get back an unsigned [`PaymentRequest`]. Every input is
//! validated here, so nothing malformed ever reaches the signer.
//!
//! The builder is pure. It never talks to the gateway; the gateway URL is
//! carried on the request for the caller to post to.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::params::{CanonicalParams, MerchantParameters};
use super::signing::{sign_request, SignedPayload};
use super::types::{minor_units, Currency, OrderId, TransactionType};
use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};

// ---------------------------------------------------------------------------
// PaymentRequest
// ---------------------------------------------------------------------------

/// An unsigned, fully validated payment request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    params: MerchantParameters,
    gateway_url: String,
}

impl PaymentRequest {
    pub fn params(&self) -> &MerchantParameters {
        &self.params
    }

    pub fn order_id(&self) -> &OrderId {
        &self.params.order_id
    }

    /// Minor-unit amount exactly as it will be signed.
    pub fn amount(&self) -> &str {
        &self.params.amount
    }

    /// Endpoint the signed form must be posted to.
    pub fn gateway_url(&self) -> &str {
        &self.gateway_url
    }

    /// The string map that gets signed.
    pub fn canonical(&self) -> CanonicalParams {
        self.params.to_canonical()
    }
}

// ---------------------------------------------------------------------------
// TransactionBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`PaymentRequest`] instances.
///
/// # Usage
///
/// ```rust
/// use rust_decimal::Decimal;
/// use tpv_gateway::config::{GatewayConfig, TEST_GATEWAY_URL};
/// use tpv_gateway::transaction::{TransactionBuilder, TransactionType};
///
/// let config = GatewayConfig::new(
///     "367529286",
///     "1",
///     "AQIDBAUGBwgJCgsMDQ4PEBESExQVFhcY",
///     TEST_GATEWAY_URL,
/// )
/// .unwrap();
///
/// let request = TransactionBuilder::new(&config)
///     .reservation_id("test-reservation")
///     .amount(Decimal::new(18000, 2))
///     .transaction_type(TransactionType::Authorization)
///     .build()
///     .unwrap();
///
/// assert_eq!(request.order_id().as_str(), "testreservat");
/// assert_eq!(request.amount(), "000000018000");
/// ```
///
/// Defaults: the config's currency and [`TransactionType::Payment`].
pub struct TransactionBuilder<'a> {
    config: &'a GatewayConfig,
    reservation_id: Option<String>,
    amount: Option<Decimal>,
    currency: Currency,
    transaction_type: TransactionType,
}

impl<'a> TransactionBuilder<'a> {
    pub fn new(config: &'a GatewayConfig) -> Self {
        Self {
            config,
            reservation_id: None,
            amount: None,
            currency: config.currency(),
            transaction_type: TransactionType::Payment,
        }
    }

    /// Sets the booking reservation id the order id is derived from.
    pub fn reservation_id(mut self, reservation_id: &str) -> Self {
        self.reservation_id = Some(reservation_id.to_string());
        self
    }

    /// Sets the amount in major units (e.g. `18.00`).
    pub fn amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn transaction_type(mut self, transaction_type: TransactionType) -> Self {
        self.transaction_type = transaction_type;
        self
    }

    /// Validates the inputs and produces an unsigned [`PaymentRequest`].
    ///
    /// # Errors
    ///
    /// [`GatewayError::Validation`] for a missing or unusable reservation id
    /// and for a missing, non-positive or oversized amount.
    pub fn build(self) -> Result<PaymentRequest> {
        let reservation_id = self
            .reservation_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| GatewayError::validation("reservation id is required"))?;
        let order_id = OrderId::from_reservation(reservation_id)?;

        let amount = self
            .amount
            .ok_or_else(|| GatewayError::validation("amount is required"))?;
        let amount = minor_units(amount)?;

        let config = self.config;
        let params = MerchantParameters {
            amount,
            order_id,
            merchant_code: config.merchant_code().to_string(),
            currency: self.currency,
            transaction_type: self.transaction_type,
            terminal: config.terminal().to_string(),
            notify_url: config.notify_url().map(str::to_string),
            url_ok: config.url_ok().map(str::to_string),
            url_ko: config.url_ko().map(str::to_string),
        };

        Ok(PaymentRequest {
            params,
            gateway_url: config.gateway_url().to_string(),
        })
    }

    /// Builds and signs in one step.
    pub fn sign(self) -> Result<SignedPayload> {
        let config = self.config;
        let request = self.build()?;
        sign_request(config, &request)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TEST_GATEWAY_URL;
    use crate::transaction::params::{FIELD_CURRENCY, FIELD_MERCHANT_URL, FIELD_TRANSACTION_TYPE};
    use std::str::FromStr;

    const SECRET: &str = "AQIDBAUGBwgJCgsMDQ4PEBESExQVFhcY";

    fn config() -> GatewayConfig {
        GatewayConfig::new("367529286", "1", SECRET, TEST_GATEWAY_URL).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn builds_scenario_request() {
        let cfg = config();
        let request = TransactionBuilder::new(&cfg)
            .reservation_id("testreservation")
            .amount(dec("180.00"))
            .transaction_type(TransactionType::Authorization)
            .build()
            .unwrap();

        let p = request.params();
        assert_eq!(p.order_id.as_str(), "testreservat");
        assert_eq!(p.amount, "000000018000");
        assert_eq!(p.merchant_code, "367529286");
        assert_eq!(p.terminal, "1");
        assert_eq!(p.currency, Currency::EUR);
        assert_eq!(p.transaction_type.code(), "1");
        assert_eq!(request.gateway_url(), TEST_GATEWAY_URL);
    }

    #[test]
    fn defaults_come_from_config() {
        let cfg = config().with_currency(Currency::GBP);
        let request = TransactionBuilder::new(&cfg)
            .reservation_id("r1")
            .amount(dec("1"))
            .build()
            .unwrap();
        let canonical = request.canonical();
        assert_eq!(canonical.get(FIELD_CURRENCY), Some("826"));
        assert_eq!(canonical.get(FIELD_TRANSACTION_TYPE), Some("0"));
    }

    #[test]
    fn explicit_currency_overrides_config() {
        let cfg = config();
        let request = TransactionBuilder::new(&cfg)
            .reservation_id("r1")
            .amount(dec("1"))
            .currency(Currency::USD)
            .build()
            .unwrap();
        assert_eq!(request.canonical().get(FIELD_CURRENCY), Some("840"));
    }

    #[test]
    fn notify_url_flows_into_parameters() {
        let cfg = config().with_notify_url("https://hotel.example/payments/notify");
        let request = TransactionBuilder::new(&cfg)
            .reservation_id("r1")
            .amount(dec("1"))
            .build()
            .unwrap();
        assert_eq!(
            request.canonical().get(FIELD_MERCHANT_URL),
            Some("https://hotel.example/payments/notify")
        );
    }

    #[test]
    fn missing_reservation_id_is_rejected() {
        let cfg = config();
        match TransactionBuilder::new(&cfg).amount(dec("10")).build() {
            Err(GatewayError::Validation(_)) => {}
            other => panic!("expected Validation error, got {:?}", other),
        }
        match TransactionBuilder::new(&cfg).reservation_id("   ").amount(dec("10")).build() {
            Err(GatewayError::Validation(_)) => {}
            other => panic!("expected Validation error, got {:?}", other),
        }
    }

    #[test]
    fn punctuation_only_reservation_id_is_rejected() {
        let cfg = config();
        let result = TransactionBuilder::new(&cfg)
            .reservation_id("---")
            .amount(dec("10"))
            .build();
        assert!(matches!(result, Err(GatewayError::Validation(_))));
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        let cfg = config();
        for amount in ["0", "-1", "0.001"] {
            let result = TransactionBuilder::new(&cfg)
                .reservation_id("r1")
                .amount(dec(amount))
                .build();
            assert!(
                matches!(result, Err(GatewayError::Validation(_))),
                "amount {} should be rejected",
                amount
            );
        }
    }

    #[test]
    fn missing_amount_is_rejected() {
        let cfg = config();
        let result = TransactionBuilder::new(&cfg).reservation_id("r1").build();
        assert!(matches!(result, Err(GatewayError::Validation(_))));
    }

    #[test]
    fn sign_shortcut_matches_two_step_signing() {
        let cfg = config();
        let builder = || {
            TransactionBuilder::new(&cfg)
                .reservation_id("booking-77")
                .amount(dec("99.95"))
        };
        let one_step = builder().sign().unwrap();
        let two_step = sign_request(&cfg, &builder().build().unwrap()).unwrap();
        assert_eq!(one_step, two_step);
    }
}
