//! # Gateway Configuration & Constants
//!
//! Every protocol constant the signature core depends on lives here, next to
//! the [`GatewayConfig`] that carries the per-merchant values. Both the
//! outbound signer and the inbound validator read the same config, which is
//! what keeps their cipher padding and signature alphabet in lockstep.
//!
//! The config is built once at process start and then shared read-only.
//! There is no global instance.

use crate::crypto::cipher::OrderPadding;
use crate::crypto::key::SharedSecret;
use crate::crypto::signature::SignatureEncoding;
use crate::error::{GatewayError, Result};
use crate::transaction::types::Currency;

// ---------------------------------------------------------------------------
// Signature Protocol
// ---------------------------------------------------------------------------

/// Version tag sent as `Ds_SignatureVersion` with every signed payload.
pub const SIGNATURE_VERSION: &str = "HMAC_SHA256_V1";

/// Triple-DES block size. The order id is padded to a multiple of this.
pub const CIPHER_BLOCK_LENGTH: usize = 8;

/// The gateway mandates a fixed all-zero IV so both sides derive the same key.
pub const CIPHER_IV: [u8; CIPHER_BLOCK_LENGTH] = [0u8; CIPHER_BLOCK_LENGTH];

/// Two-key triple-DES secret length (K1 K2 K1).
pub const SECRET_LENGTH_TWO_KEY: usize = 16;

/// Three-key triple-DES secret length (K1 K2 K3).
pub const SECRET_LENGTH_THREE_KEY: usize = 24;

/// HMAC-SHA-256 digest length in bytes.
pub const SIGNATURE_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Transaction Limits
// ---------------------------------------------------------------------------

/// Maximum order id length accepted by the gateway.
pub const MAX_ORDER_ID_LENGTH: usize = 12;

/// Width of the zero-padded minor-unit amount string.
pub const AMOUNT_WIDTH: usize = 12;

/// Minor units per major unit for every supported currency.
pub const MINOR_UNITS_PER_MAJOR: u32 = 100;

/// Maximum merchant code (FUC) length. Merchant codes are numeric.
pub const MAX_MERCHANT_CODE_LENGTH: usize = 9;

/// Maximum terminal id length. Terminal ids are numeric.
pub const MAX_TERMINAL_LENGTH: usize = 3;

/// Response codes strictly below this value mean the payment was authorized.
pub const AUTHORIZED_RESPONSE_LIMIT: u32 = 100;

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

/// Redirect-payment endpoint of the gateway's test environment.
pub const TEST_GATEWAY_URL: &str = "https://sis-t.redsys.es:25443/sis/realizarPago";

/// Redirect-payment endpoint of the gateway's production environment.
pub const LIVE_GATEWAY_URL: &str = "https://sis.redsys.es/sis/realizarPago";

// ---------------------------------------------------------------------------
// GatewayConfig
// ---------------------------------------------------------------------------

/// Per-merchant gateway configuration.
///
/// Construct with [`GatewayConfig::new`], which validates every field and
/// decodes the shared secret. A config that fails validation is a
/// [`GatewayError::Configuration`]: the process should refuse to start.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    merchant_code: String,
    terminal: String,
    secret: SharedSecret,
    currency: Currency,
    gateway_url: String,
    notify_url: Option<String>,
    url_ok: Option<String>,
    url_ko: Option<String>,
    order_padding: OrderPadding,
    signature_encoding: SignatureEncoding,
}

impl GatewayConfig {
    /// Creates a validated config.
    ///
    /// Defaults: currency EUR, PKCS#7 order padding, standard base64 for
    /// inbound signatures, no notification or redirect URLs.
    pub fn new(
        merchant_code: &str,
        terminal: &str,
        secret_base64: &str,
        gateway_url: &str,
    ) -> Result<Self> {
        validate_numeric("merchant code", merchant_code, MAX_MERCHANT_CODE_LENGTH)?;
        validate_numeric("terminal", terminal, MAX_TERMINAL_LENGTH)?;

        let gateway_url = gateway_url.trim();
        if gateway_url.is_empty() {
            return Err(GatewayError::configuration("gateway URL must not be empty"));
        }

        let secret = SharedSecret::from_base64(secret_base64)?;

        Ok(Self {
            merchant_code: merchant_code.to_string(),
            terminal: terminal.to_string(),
            secret,
            currency: Currency::EUR,
            gateway_url: gateway_url.to_string(),
            notify_url: None,
            url_ok: None,
            url_ko: None,
            order_padding: OrderPadding::default(),
            signature_encoding: SignatureEncoding::default(),
        })
    }

    /// Sets the default currency used when a request names none.
    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    /// Sets the server-to-server notification URL (`Ds_Merchant_MerchantURL`).
    pub fn with_notify_url(mut self, url: impl Into<String>) -> Self {
        self.notify_url = Some(url.into());
        self
    }

    /// Sets the browser redirect URLs after a successful / failed payment.
    pub fn with_redirect_urls(mut self, ok: impl Into<String>, ko: impl Into<String>) -> Self {
        self.url_ok = Some(ok.into());
        self.url_ko = Some(ko.into());
        self
    }

    /// Selects the block padding used when deriving per-order keys.
    pub fn with_order_padding(mut self, padding: OrderPadding) -> Self {
        self.order_padding = padding;
        self
    }

    /// Selects the base64 alphabet inbound notification signatures use.
    pub fn with_signature_encoding(mut self, encoding: SignatureEncoding) -> Self {
        self.signature_encoding = encoding;
        self
    }

    pub fn merchant_code(&self) -> &str {
        &self.merchant_code
    }

    pub fn terminal(&self) -> &str {
        &self.terminal
    }

    pub fn secret(&self) -> &SharedSecret {
        &self.secret
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn gateway_url(&self) -> &str {
        &self.gateway_url
    }

    pub fn notify_url(&self) -> Option<&str> {
        self.notify_url.as_deref()
    }

    pub fn url_ok(&self) -> Option<&str> {
        self.url_ok.as_deref()
    }

    pub fn url_ko(&self) -> Option<&str> {
        self.url_ko.as_deref()
    }

    pub fn order_padding(&self) -> OrderPadding {
        self.order_padding
    }

    pub fn signature_encoding(&self) -> SignatureEncoding {
        self.signature_encoding
    }
}

fn validate_numeric(field: &str, value: &str, max_len: usize) -> Result<()> {
    if value.is_empty() || value.len() > max_len {
        return Err(GatewayError::configuration(format!(
            "{} must be 1..={} digits, got {} characters",
            field,
            max_len,
            value.len()
        )));
    }
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(GatewayError::configuration(format!(
            "{} must be numeric",
            field
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // 24 bytes of 0x01..=0x18, base64-encoded.
    const SECRET: &str = "AQIDBAUGBwgJCgsMDQ4PEBESExQVFhcY";

    #[test]
    fn new_config_applies_defaults() {
        let config = GatewayConfig::new("367529286", "1", SECRET, TEST_GATEWAY_URL).unwrap();
        assert_eq!(config.merchant_code(), "367529286");
        assert_eq!(config.terminal(), "1");
        assert_eq!(config.currency(), Currency::EUR);
        assert_eq!(config.order_padding(), OrderPadding::Pkcs7);
        assert_eq!(config.signature_encoding(), SignatureEncoding::Standard);
        assert!(config.notify_url().is_none());
    }

    #[test]
    fn rejects_non_numeric_merchant_code() {
        let err = GatewayConfig::new("ABC", "1", SECRET, TEST_GATEWAY_URL).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn rejects_overlong_terminal() {
        let err = GatewayConfig::new("367529286", "1234", SECRET, TEST_GATEWAY_URL).unwrap_err();
        assert!(matches!(err, GatewayError::Configuration(_)));
    }

    #[test]
    fn rejects_empty_gateway_url() {
        let err = GatewayConfig::new("367529286", "1", SECRET, "  ").unwrap_err();
        assert!(matches!(err, GatewayError::Configuration(_)));
    }

    #[test]
    fn rejects_bad_secret() {
        let err = GatewayConfig::new("367529286", "1", "AAAA", TEST_GATEWAY_URL).unwrap_err();
        assert!(matches!(err, GatewayError::Configuration(_)));
    }

    #[test]
    fn debug_output_never_contains_secret() {
        let config = GatewayConfig::new("367529286", "1", SECRET, TEST_GATEWAY_URL).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains(SECRET));
        assert!(debug.contains("redacted"));
    }

    #[test]
    fn builder_setters_override_defaults() {
        let config = GatewayConfig::new("367529286", "1", SECRET, TEST_GATEWAY_URL)
            .unwrap()
            .with_currency(Currency::USD)
            .with_notify_url("https://example.com/notify")
            .with_redirect_urls("https://example.com/ok", "https://example.com/ko")
            .with_order_padding(OrderPadding::Zero)
            .with_signature_encoding(SignatureEncoding::UrlSafe);

        assert_eq!(config.currency(), Currency::USD);
        assert_eq!(config.notify_url(), Some("https://example.com/notify"));
        assert_eq!(config.url_ok(), Some("https://example.com/ok"));
        assert_eq!(config.url_ko(), Some("https://example.com/ko"));
        assert_eq!(config.order_padding(), OrderPadding::Zero);
        assert_eq!(config.signature_encoding(), SignatureEncoding::UrlSafe);
    }

    #[test]
    fn limits_sanity() {
        assert_eq!(CIPHER_IV.len(), CIPHER_BLOCK_LENGTH);
        assert!(SECRET_LENGTH_TWO_KEY < SECRET_LENGTH_THREE_KEY);
        assert_eq!(MAX_ORDER_ID_LENGTH, 12);
        assert_eq!(AMOUNT_WIDTH, 12);
    }
}
