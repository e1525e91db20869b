//! # Order Cipher
//!
//! Derives the per-transaction HMAC key by encrypting the order id under the
//! merchant secret with triple-DES in CBC mode.
//!
//! The IV is fixed at eight zero bytes. It is not secret and it is never
//! randomized: the gateway recomputes the same key on its side, so the
//! derivation has to be a pure function of `(secret, order_id)`.
//!
//! ## Key sizes
//!
//! - 24-byte secret: three-key EDE3.
//! - 16-byte secret: two-key EDE2 (K1 K2 K1).
//!
//! ## Padding
//!
//! [`OrderPadding::Pkcs7`] appends PKCS#7 padding and therefore always adds
//! at least one byte (a full block for aligned input). [`OrderPadding::Zero`]
//! zero-fills to the block boundary and adds nothing to aligned input. Which
//! one a deployment uses is part of [`crate::config::GatewayConfig`], so the
//! signing and verifying paths can never disagree.

use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockEncryptMut, KeyIvInit};
use des::{TdesEde2, TdesEde3};
use std::fmt;
use std::str::FromStr;

use super::key::SharedSecret;
use crate::config::{
    CIPHER_BLOCK_LENGTH, CIPHER_IV, MAX_ORDER_ID_LENGTH, SECRET_LENGTH_THREE_KEY,
    SECRET_LENGTH_TWO_KEY,
};
use crate::error::{GatewayError, Result};

type TdesEde3CbcEnc = cbc::Encryptor<TdesEde3>;
type TdesEde2CbcEnc = cbc::Encryptor<TdesEde2>;

/// Block padding applied to the order id before encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OrderPadding {
    /// PKCS#7: `n` bytes of value `n`, always at least one.
    #[default]
    Pkcs7,
    /// Zero-fill to the next block boundary; aligned input is left as is.
    Zero,
}

impl fmt::Display for OrderPadding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pkcs7 => write!(f, "pkcs7"),
            Self::Zero => write!(f, "zero"),
        }
    }
}

impl FromStr for OrderPadding {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pkcs7" | "pkcs" => Ok(Self::Pkcs7),
            "zero" | "zeros" => Ok(Self::Zero),
            other => Err(format!("unknown order padding: {}", other)),
        }
    }
}

/// Per-transaction HMAC key: the encrypted order id, final block included.
///
/// Lives only for the duration of a sign or verify call.
#[derive(Clone, PartialEq, Eq)]
pub struct DerivedKey(Vec<u8>);

impl DerivedKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn for_tests(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DerivedKey({} bytes, redacted)", self.0.len())
    }
}

/// Checks the gateway's bounds on an order id: 1..=12 ASCII bytes.
pub fn validate_order_id(order_id: &str) -> Result<()> {
    if order_id.is_empty() {
        return Err(GatewayError::crypto("order id must not be empty"));
    }
    if !order_id.is_ascii() {
        return Err(GatewayError::crypto("order id must be ASCII"));
    }
    if order_id.len() > MAX_ORDER_ID_LENGTH {
        return Err(GatewayError::crypto(format!(
            "order id exceeds {} characters (got {})",
            MAX_ORDER_ID_LENGTH,
            order_id.len()
        )));
    }
    Ok(())
}

/// Encrypts `order_id` under `secret`, producing the transaction key.
///
/// # Errors
///
/// [`GatewayError::Crypto`] if the order id is empty, longer than
/// [`MAX_ORDER_ID_LENGTH`], or not ASCII.
pub fn derive_key(
    secret: &SharedSecret,
    order_id: &str,
    padding: OrderPadding,
) -> Result<DerivedKey> {
    validate_order_id(order_id)?;

    let plaintext = pad(order_id.as_bytes(), padding);
    let ciphertext = match secret.len() {
        SECRET_LENGTH_THREE_KEY => encrypt_blocks::<TdesEde3CbcEnc>(secret.as_bytes(), &plaintext)?,
        SECRET_LENGTH_TWO_KEY => encrypt_blocks::<TdesEde2CbcEnc>(secret.as_bytes(), &plaintext)?,
        other => {
            return Err(GatewayError::crypto(format!(
                "unsupported secret length {}",
                other
            )))
        }
    };

    Ok(DerivedKey(ciphertext))
}

/// Applies the block padding up front so the cipher itself only ever sees
/// whole blocks.
fn pad(data: &[u8], padding: OrderPadding) -> Vec<u8> {
    let remainder = data.len() % CIPHER_BLOCK_LENGTH;
    let fill = match padding {
        OrderPadding::Pkcs7 => CIPHER_BLOCK_LENGTH - remainder,
        OrderPadding::Zero if remainder == 0 => 0,
        OrderPadding::Zero => CIPHER_BLOCK_LENGTH - remainder,
    };
    let fill_byte = match padding {
        OrderPadding::Pkcs7 => fill as u8,
        OrderPadding::Zero => 0x00,
    };

    let mut out = Vec::with_capacity(data.len() + fill);
    out.extend_from_slice(data);
    out.resize(data.len() + fill, fill_byte);
    out
}

fn encrypt_blocks<E>(key: &[u8], padded: &[u8]) -> Result<Vec<u8>>
where
    E: KeyIvInit + BlockEncryptMut,
{
    let encryptor = E::new_from_slices(key, &CIPHER_IV)
        .map_err(|_| GatewayError::crypto("cipher rejected key or IV length"))?;
    Ok(encryptor.encrypt_padded_vec_mut::<NoPadding>(padded))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
