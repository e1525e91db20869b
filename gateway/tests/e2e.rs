//! End-to-end integration tests for the TPV signature core.
//!
//! These tests drive the public API the way the booking node does: build a
//! request from a reservation, sign it, play the gateway's part by sending a
//! signed notification back, and validate that notification. Known-answer
//! vectors were computed independently of this crate.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use tpv_gateway::callback::{CallbackPayload, CallbackState, CallbackValidator, PaymentOutcome};
use tpv_gateway::config::{GatewayConfig, SIGNATURE_VERSION, TEST_GATEWAY_URL};
use tpv_gateway::crypto::cipher::OrderPadding;
use tpv_gateway::crypto::key::SharedSecret;
use tpv_gateway::crypto::signature::{sign_params, verify};
use tpv_gateway::error::GatewayError;
use tpv_gateway::transaction::params::CanonicalParams;
use tpv_gateway::transaction::types::TransactionType;
use tpv_gateway::transaction::{sign_request, TransactionBuilder};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

/// Bytes 0x01..=0x18.
const SECRET: &str = "AQIDBAUGBwgJCgsMDQ4PEBESExQVFhcY";

const SCENARIO_PARAMETERS: &str = "eyJEU19NRVJDSEFOVF9BTU9VTlQiOiIwMDAwMDAwMTgwMDAiLCJEU19NRVJDSEFOVF9DVVJSRU5DWSI6Ijk3OCIsIkRTX01FUkNIQU5UX01FUkNIQU5UQ09ERSI6IjM2NzUyOTI4NiIsIkRTX01FUkNIQU5UX09SREVSIjoidGVzdHJlc2VydmF0IiwiRFNfTUVSQ0hBTlRfVEVSTUlOQUwiOiIxIiwiRFNfTUVSQ0hBTlRfVFJBTlNBQ1RJT05UWVBFIjoiMSJ9";
const SCENARIO_SIGNATURE: &str = "/fD6ow/hDrbYahclX/aN67K3nuOaFG5/DDjSMVrQaf0=";
const TAMPERED_SIGNATURE: &str = "kcUBnAVreNuB51oJ8terPpAsKGBHfG+Zo3lzgcGYHi0=";

fn config() -> GatewayConfig {
    GatewayConfig::new("367529286", "1", SECRET, TEST_GATEWAY_URL).expect("valid config")
}

fn secret() -> SharedSecret {
    SharedSecret::from_base64(SECRET).expect("valid secret")
}

fn scenario_params(amount: &str) -> CanonicalParams {
    [
        ("DS_MERCHANT_AMOUNT", amount),
        ("DS_MERCHANT_ORDER", "testreservat"),
        ("DS_MERCHANT_MERCHANTCODE", "367529286"),
        ("DS_MERCHANT_CURRENCY", "978"),
        ("DS_MERCHANT_TRANSACTIONTYPE", "1"),
        ("DS_MERCHANT_TERMINAL", "1"),
    ]
    .into_iter()
    .collect()
}

/// Plays the gateway: signs a notification for `order` with `response`.
fn gateway_notification(cfg: &GatewayConfig, order: &str, amount: &str, response: &str) -> CallbackPayload {
    let params: CanonicalParams = [
        ("Ds_Date", "19/10/2026"),
        ("Ds_Hour", "12:04"),
        ("Ds_Order", order),
        ("Ds_Amount", amount),
        ("Ds_Currency", "978"),
        ("Ds_MerchantCode", "367529286"),
        ("Ds_Terminal", "1"),
        ("Ds_Response", response),
        ("Ds_AuthorisationCode", "093215"),
    ]
    .into_iter()
    .collect();
    let signature = sign_params(cfg.secret(), cfg.order_padding(), order, &params).unwrap();
    CallbackPayload {
        signature_version: Some(SIGNATURE_VERSION.to_string()),
        merchant_parameters: params.canonical_base64(),
        signature,
    }
}

// ---------------------------------------------------------------------------
// Reference Scenario
// ---------------------------------------------------------------------------

#[test]
fn scenario_parameters_and_signature_match_known_answer() {
    let params = scenario_params("000000018000");
    assert_eq!(params.canonical_base64(), SCENARIO_PARAMETERS);

    let signature = sign_params(&secret(), OrderPadding::Pkcs7, "testreservat", &params).unwrap();
    assert_eq!(signature, SCENARIO_SIGNATURE);
    assert!(verify(&secret(), OrderPadding::Pkcs7, "testreservat", &params, &signature));
}

#[test]
fn scenario_built_through_builder_is_identical() {
    let cfg = config();
    let payload = TransactionBuilder::new(&cfg)
        .reservation_id("test-reservation-2026")
        .amount(Decimal::from_str("180.00").unwrap())
        .transaction_type(TransactionType::Authorization)
        .sign()
        .unwrap();

    assert_eq!(payload.signature_version, "HMAC_SHA256_V1");
    assert_eq!(payload.merchant_parameters, SCENARIO_PARAMETERS);
    assert_eq!(payload.signature, SCENARIO_SIGNATURE);
}

#[test]
fn scenario_fails_after_amount_tamper() {
    let tampered = scenario_params("000000019000");
    assert!(!verify(&secret(), OrderPadding::Pkcs7, "testreservat", &tampered, SCENARIO_SIGNATURE));

    let resigned = sign_params(&secret(), OrderPadding::Pkcs7, "testreservat", &tampered).unwrap();
    assert_eq!(resigned, TAMPERED_SIGNATURE);
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[test]
fn signing_is_deterministic_across_configs() {
    let a = TransactionBuilder::new(&config())
        .reservation_id("res-1")
        .amount(Decimal::new(5000, 2))
        .sign()
        .unwrap();
    let b = TransactionBuilder::new(&config())
        .reservation_id("res-1")
        .amount(Decimal::new(5000, 2))
        .sign()
        .unwrap();
    assert_eq!(a, b);
}

#[test]
fn key_size_enforcement() {
    for len in [0usize, 8, 15, 17, 23, 25, 32] {
        let encoded = STANDARD.encode(vec![0x11u8; len]);
        match GatewayConfig::new("367529286", "1", &encoded, TEST_GATEWAY_URL) {
            Err(GatewayError::Configuration(_)) => {}
            other => panic!("{}-byte secret should be rejected, got {:?}", len, other),
        }
    }
    let two_key = STANDARD.encode([0x11u8; 16]);
    assert!(GatewayConfig::new("367529286", "1", &two_key, TEST_GATEWAY_URL).is_ok());
}

#[test]
fn amount_boundaries() {
    let cfg = config();
    let request = TransactionBuilder::new(&cfg)
        .reservation_id("r")
        .amount(Decimal::from_str("18.00").unwrap())
        .build()
        .unwrap();
    assert_eq!(request.amount(), "000000001800");

    for bad in ["0", "-18.00"] {
        let result = TransactionBuilder::new(&cfg)
            .reservation_id("r")
            .amount(Decimal::from_str(bad).unwrap())
            .build();
        assert!(matches!(result, Err(GatewayError::Validation(_))));
    }
}

// ---------------------------------------------------------------------------
// Round Trip Through the Gateway
// ---------------------------------------------------------------------------

#[test]
fn request_then_authorized_notification() {
    let cfg = config();
    let request = TransactionBuilder::new(&cfg)
        .reservation_id("0d9e4f1a-room-204")
        .amount(Decimal::new(12950, 2))
        .build()
        .unwrap();
    let payload = sign_request(&cfg, &request).unwrap();
    assert_eq!(payload.signature.len(), 44);

    let notification = gateway_notification(&cfg, request.order_id().as_str(), request.amount(), "0000");
    let verdict = CallbackValidator::new(&cfg).validate(&notification);

    assert_eq!(verdict.state, CallbackState::Valid);
    assert_eq!(verdict.outcome, PaymentOutcome::Authorized);
    assert_eq!(verdict.order_id.as_ref(), Some(request.order_id()));
    assert_eq!(verdict.amount(), Some(request.amount()));
    assert!(verdict.confirms_payment());
}

#[test]
fn callback_classification() {
    let cfg = config();
    let validator = CallbackValidator::new(&cfg);

    let declined = validator.validate(&gateway_notification(&cfg, "testreservat", "000000018000", "0190"));
    assert_eq!(declined.outcome, PaymentOutcome::Declined);
    assert!(!declined.confirms_payment());

    let malformed = validator.validate(&CallbackPayload {
        signature_version: None,
        merchant_parameters: "@@@".into(),
        signature: SCENARIO_SIGNATURE.into(),
    });
    assert_eq!(malformed.outcome, PaymentOutcome::MalformedCallback);

    let mut forged = gateway_notification(&cfg, "testreservat", "000000018000", "0000");
    forged.signature = SCENARIO_SIGNATURE.into();
    let forged = validator.validate(&forged);
    assert_eq!(forged.outcome, PaymentOutcome::InvalidSignature);
    assert!(!forged.confirms_payment());
}

#[test]
fn notification_amount_tamper_is_detected() {
    let cfg = config();
    let genuine = gateway_notification(&cfg, "testreservat", "000000018000", "0000");

    let mut params = CanonicalParams::from_base64(&genuine.merchant_parameters).unwrap();
    params.insert("Ds_Amount", "000000000100");
    let tampered = CallbackPayload {
        merchant_parameters: params.canonical_base64(),
        ..genuine
    };

    let verdict = CallbackValidator::new(&cfg).validate(&tampered);
    assert_eq!(verdict.outcome, PaymentOutcome::InvalidSignature);
}

#[test]
fn notification_is_checked_against_its_decoded_parameters() {
    let cfg = config();
    let genuine = gateway_notification(&cfg, "testreservat", "000000018000", "0000");

    // Same key/value set, in reverse key order and in the URL-safe alphabet.
    let raw = STANDARD.decode(&genuine.merchant_parameters).unwrap();
    let map: std::collections::BTreeMap<String, String> = serde_json::from_slice(&raw).unwrap();
    let reversed = map
        .iter()
        .rev()
        .map(|(k, v)| format!("{}:{}", serde_json::to_string(k).unwrap(), serde_json::to_string(v).unwrap()))
        .collect::<Vec<_>>()
        .join(",");
    let reencoded = base64::engine::general_purpose::URL_SAFE.encode(format!("{{{}}}", reversed));
    assert_ne!(reencoded, genuine.merchant_parameters);

    let verdict = CallbackValidator::new(&cfg).validate(&CallbackPayload {
        merchant_parameters: reencoded,
        ..genuine
    });
    assert_eq!(verdict.outcome, PaymentOutcome::Authorized);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Flipping any single bit of a genuine notification's parameters
    /// keeps it from confirming a payment.
    #[test]
    fn single_bit_flip_in_notification_parameters_fails(bit in any::<prop::sample::Index>()) {
        let cfg = config();
        let validator = CallbackValidator::new(&cfg);
        let genuine = gateway_notification(&cfg, "testreservat", "000000018000", "0000");
        prop_assert!(validator.validate(&genuine).confirms_payment());

        let mut bytes = genuine.merchant_parameters.as_bytes().to_vec();
        let bit = bit.index(bytes.len() * 8);
        bytes[bit / 8] ^= 1 << (bit % 8);
        let flipped = String::from_utf8_lossy(&bytes).into_owned();

        if let Some(params) = CanonicalParams::from_base64(&flipped) {
            prop_assert!(!verify(&secret(), OrderPadding::Pkcs7, "testreservat", &params, &genuine.signature));
        }

        let verdict = validator.validate(&CallbackPayload {
            merchant_parameters: flipped,
            ..genuine
        });
        prop_assert_ne!(verdict.outcome, PaymentOutcome::Authorized);
        prop_assert!(!verdict.confirms_payment());
    }

    /// Flipping any single bit of the decoded signature breaks verification.
    #[test]
    fn single_bit_flip_in_signature_fails(bit in 0usize..256) {
        let params = scenario_params("000000018000");
        let mut digest = STANDARD.decode(SCENARIO_SIGNATURE).unwrap();
        digest[bit / 8] ^= 1 << (bit % 8);
        let flipped = STANDARD.encode(&digest);

        prop_assert!(!verify(&secret(), OrderPadding::Pkcs7, "testreservat", &params, &flipped));
    }

    /// Canonicalization depends only on the key/value set.
    #[test]
    fn canonicalization_is_order_independent(
        entries in prop::collection::btree_map("[A-Za-z_]{1,12}", "[ -~]{0,16}", 1..8)
    ) {
        let forward: CanonicalParams = entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        let backward: CanonicalParams = entries.iter().rev().map(|(k, v)| (k.clone(), v.clone())).collect();
        prop_assert_eq!(forward.canonical_base64(), backward.canonical_base64());

        let reparsed = CanonicalParams::from_base64(&forward.canonical_base64()).unwrap();
        prop_assert_eq!(reparsed.canonical_base64(), forward.canonical_base64());
    }
}
