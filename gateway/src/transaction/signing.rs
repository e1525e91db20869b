//! Signing a built payment request into the three-field gateway envelope.
//!
//! Signing is separate from building so a [`PaymentRequest`] can be
//! inspected and tested without touching key material. The signing data is
//! the canonical base64 from [`super::params::CanonicalParams`], and the same
//! string is what gets sent as `Ds_MerchantParameters`.

use serde::{Deserialize, Serialize};

use super::builder::PaymentRequest;
use crate::config::{GatewayConfig, SIGNATURE_VERSION};
use crate::crypto::cipher::derive_key;
use crate::crypto::signature::sign;
use crate::error::Result;

/// Form field names posted to the gateway.
pub const FORM_SIGNATURE_VERSION: &str = "Ds_SignatureVersion";
pub const FORM_MERCHANT_PARAMETERS: &str = "Ds_MerchantParameters";
pub const FORM_SIGNATURE: &str = "Ds_Signature";

/// The signed envelope: exactly what the browser form posts to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedPayload {
    #[serde(rename = "Ds_SignatureVersion")]
    pub signature_version: String,
    #[serde(rename = "Ds_MerchantParameters")]
    pub merchant_parameters: String,
    #[serde(rename = "Ds_Signature")]
    pub signature: String,
}

impl SignedPayload {
    /// Name/value pairs in the order the gateway documents them.
    pub fn form_fields(&self) -> [(&'static str, &str); 3] {
        [
            (FORM_SIGNATURE_VERSION, self.signature_version.as_str()),
            (FORM_MERCHANT_PARAMETERS, self.merchant_parameters.as_str()),
            (FORM_SIGNATURE, self.signature.as_str()),
        ]
    }
}

/// Signs `request` with the merchant secret from `config`.
///
/// The per-order key is derived from the request's own order id, so the
/// signature is bound to that order and nothing else.
///
/// # Example
///
/// ```
/// use rust_decimal::Decimal;
/// use tpv_gateway::config::{GatewayConfig, TEST_GATEWAY_URL};
/// use tpv_gateway::transaction::{sign_request, TransactionBuilder};
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
///     .reservation_id("booking-2041")
///     .amount(Decimal::new(4250, 2))
///     .build()
///     .unwrap();
///
/// let payload = sign_request(&config, &request).unwrap();
/// assert_eq!(payload.signature_version, "HMAC_SHA256_V1");
/// assert_eq!(payload.signature.len(), 44);
/// ```
pub fn sign_request(config: &GatewayConfig, request: &PaymentRequest) -> Result<SignedPayload> {
    let order_id = request.order_id();
    let merchant_parameters = request.canonical().canonical_base64();

    let derived = derive_key(config.secret(), order_id.as_str(), config.order_padding())?;
    let signature = sign(&derived, &merchant_parameters)?;

    tracing::debug!(
        order_id = %order_id,
        transaction_type = %request.params().transaction_type,
        "signed merchant parameters"
    );

    Ok(SignedPayload {
        signature_version: SIGNATURE_VERSION.to_string(),
        merchant_parameters,
        signature,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TEST_GATEWAY_URL;
    use crate::crypto::cipher::OrderPadding;
    use crate::crypto::signature::verify;
    use crate::transaction::builder::TransactionBuilder;
    use crate::transaction::params::CanonicalParams;
    use rust_decimal::Decimal;

    const SECRET: &str = "AQIDBAUGBwgJCgsMDQ4PEBESExQVFhcY";

    fn config() -> GatewayConfig {
        GatewayConfig::new("367529286", "1", SECRET, TEST_GATEWAY_URL).unwrap()
    }

    fn request(config: &GatewayConfig) -> PaymentRequest {
        TransactionBuilder::new(config)
            .reservation_id("test-reservation-1")
            .amount(Decimal::new(180, 0))
            .build()
            .unwrap()
    }

    #[test]
    fn payload_carries_version_tag() {
        let cfg = config();
        let payload = sign_request(&cfg, &request(&cfg)).unwrap();
        assert_eq!(payload.signature_version, SIGNATURE_VERSION);
    }

    #[test]
    fn merchant_parameters_are_the_canonical_base64() {
        let cfg = config();
        let req = request(&cfg);
        let payload = sign_request(&cfg, &req).unwrap();
        assert_eq!(payload.merchant_parameters, req.canonical().canonical_base64());
    }

    #[test]
    fn signature_verifies_against_decoded_parameters() {
        let cfg = config();
        let payload = sign_request(&cfg, &request(&cfg)).unwrap();
        let params = CanonicalParams::from_base64(&payload.merchant_parameters).unwrap();
        assert!(verify(
            cfg.secret(),
            OrderPadding::Pkcs7,
            "testreservat",
            &params,
            &payload.signature
        ));
    }

    #[test]
    fn padding_follows_config() {
        let pkcs = config();
        let zero = config().with_order_padding(OrderPadding::Zero);
        let a = sign_request(&pkcs, &request(&pkcs)).unwrap();
        let b = sign_request(&zero, &request(&zero)).unwrap();
        assert_eq!(a.merchant_parameters, b.merchant_parameters);
        assert_ne!(a.signature, b.signature);
    }

    #[test]
    fn form_fields_use_gateway_names() {
        let cfg = config();
        let payload = sign_request(&cfg, &request(&cfg)).unwrap();
        let names: Vec<&str> = payload.form_fields().iter().map(|(k, _)| *k).collect();
        assert_eq!(names, vec!["Ds_SignatureVersion", "Ds_MerchantParameters", "Ds_Signature"]);
    }

    #[test]
    fn payload_serializes_with_gateway_names() {
        let cfg = config();
        let payload = sign_request(&cfg, &request(&cfg)).unwrap();
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["Ds_SignatureVersion"], "HMAC_SHA256_V1");
        assert!(json.get("Ds_Signature").is_some());
        assert!(json.get("signature").is_none());
    }
}
