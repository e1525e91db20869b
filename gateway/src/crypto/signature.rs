//! # Signature Engine
//!
//! HMAC-SHA-256 over the base64 merchant parameters, keyed by the order key
//! from [`super::cipher::derive_key`].
//!
//! ```text
//! derived  = 3DES-CBC(secret, order_id)
//! signature = base64(HMAC-SHA-256(derived, base64(canonical_json)))
//! ```
//!
//! Verification recomputes the whole chain and compares raw digest bytes in
//! constant time. It answers `true` or `false` and nothing else: malformed
//! input, a bad order id and a wrong digest all collapse into `false`, so a
//! caller has exactly one branch to get right.

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;
use subtle::ConstantTimeEq;

use super::cipher::{derive_key, DerivedKey, OrderPadding};
use super::key::SharedSecret;
use crate::config::SIGNATURE_LENGTH;
use crate::error::{GatewayError, Result};
use crate::transaction::params::CanonicalParams;

type HmacSha256 = Hmac<Sha256>;

/// Base64 alphabet a claimed signature is written in.
///
/// Outbound signatures are always standard base64. The gateway writes its
/// notification signatures in the URL-safe alphabet, so inbound decoding is
/// configurable. Decoding is strict for whichever alphabet is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SignatureEncoding {
    #[default]
    Standard,
    UrlSafe,
}

impl SignatureEncoding {
    fn decode(self, encoded: &str) -> Option<Vec<u8>> {
        let decoded = match self {
            Self::Standard => STANDARD.decode(encoded),
            Self::UrlSafe => URL_SAFE.decode(encoded),
        };
        decoded.ok()
    }
}

impl fmt::Display for SignatureEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::UrlSafe => write!(f, "url-safe"),
        }
    }
}

impl FromStr for SignatureEncoding {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" | "std" => Ok(Self::Standard),
            "url-safe" | "urlsafe" | "url_safe" => Ok(Self::UrlSafe),
            other => Err(format!("unknown signature encoding: {}", other)),
        }
    }
}

/// Raw HMAC-SHA-256 digest of `canonical_base64` under `derived_key`.
pub fn digest(derived_key: &DerivedKey, canonical_base64: &str) -> Result<[u8; SIGNATURE_LENGTH]> {
    let mut mac = HmacSha256::new_from_slice(derived_key.as_bytes())
        .map_err(|_| GatewayError::crypto("HMAC rejected derived key"))?;
    mac.update(canonical_base64.as_bytes());
    Ok(mac.finalize().into_bytes().into())
}

/// Signs the base64 canonical parameters. Returns standard base64.
///
/// # Example
///
/// ```
/// use tpv_gateway::crypto::cipher::{derive_key, OrderPadding};
/// use tpv_gateway::crypto::key::SharedSecret;
/// use tpv_gateway::crypto::signature::sign;
///
/// let secret = SharedSecret::from_bytes(vec![7u8; 24]).unwrap();
/// let key = derive_key(&secret, "000012345678", OrderPadding::Pkcs7).unwrap();
/// let signature = sign(&key, "eyJEU19NRVJDSEFOVF9BTU9VTlQiOiIxIn0=").unwrap();
/// assert_eq!(signature.len(), 44);
/// ```
pub fn sign(derived_key: &DerivedKey, canonical_base64: &str) -> Result<String> {
    Ok(STANDARD.encode(digest(derived_key, canonical_base64)?))
}

/// Derives the order key and signs `params` in one step.
pub fn sign_params(
    secret: &SharedSecret,
    padding: OrderPadding,
    order_id: &str,
    params: &CanonicalParams,
) -> Result<String> {
    let derived = derive_key(secret, order_id, padding)?;
    sign(&derived, &params.canonical_base64())
}

/// Verifies a standard-base64 signature over `params`.
///
/// Returns `true` iff the recomputed signature matches exactly.
pub fn verify(
    secret: &SharedSecret,
    padding: OrderPadding,
    order_id: &str,
    params: &CanonicalParams,
    claimed_signature: &str,
) -> bool {
    verify_encoded(
        secret,
        padding,
        order_id,
        params,
        claimed_signature,
        SignatureEncoding::Standard,
    )
}

/// Like [`verify`], decoding the claimed signature with `encoding`.
pub fn verify_encoded(
    secret: &SharedSecret,
    padding: OrderPadding,
    order_id: &str,
    params: &CanonicalParams,
    claimed_signature: &str,
    encoding: SignatureEncoding,
) -> bool {
    let Some(claimed) = encoding.decode(claimed_signature) else {
        return false;
    };
    let Ok(derived) = derive_key(secret, order_id, padding) else {
        return false;
    };
    let Ok(expected) = digest(&derived, &params.canonical_base64()) else {
        return false;
    };

    expected.as_slice().ct_eq(claimed.as_slice()).into()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
