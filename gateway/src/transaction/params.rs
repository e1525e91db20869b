//! # Parameter Canonicalization
//!
//! The gateway signs the *base64 text* of a JSON object, not the object
//! itself. Two sides agree on a signature only if they agree on that text
//! byte for byte, so the serialization is pinned here:
//!
//! 1. All keys and values are strings.
//! 2. Keys are ordered lexicographically by byte value.
//! 3. JSON is compact (no whitespace).
//! 4. The JSON bytes are encoded as standard, padded base64.
//!
//! [`MerchantParameters`] is the typed form the builder produces;
//! [`CanonicalParams`] is the string map both the signer and the callback
//! validator hash.

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::types::{Currency, OrderId, TransactionType};

// ---------------------------------------------------------------------------
// Field Names
// ---------------------------------------------------------------------------

pub const FIELD_AMOUNT: &str = "DS_MERCHANT_AMOUNT";
pub const FIELD_ORDER: &str = "DS_MERCHANT_ORDER";
pub const FIELD_MERCHANT_CODE: &str = "DS_MERCHANT_MERCHANTCODE";
pub const FIELD_CURRENCY: &str = "DS_MERCHANT_CURRENCY";
pub const FIELD_TRANSACTION_TYPE: &str = "DS_MERCHANT_TRANSACTIONTYPE";
pub const FIELD_TERMINAL: &str = "DS_MERCHANT_TERMINAL";
pub const FIELD_MERCHANT_URL: &str = "DS_MERCHANT_MERCHANTURL";
pub const FIELD_URL_OK: &str = "DS_MERCHANT_URLOK";
pub const FIELD_URL_KO: &str = "DS_MERCHANT_URLKO";

/// Order id echoed back in notifications.
pub const FIELD_NOTIFY_ORDER: &str = "Ds_Order";
/// Response code in notifications.
pub const FIELD_NOTIFY_RESPONSE: &str = "Ds_Response";
/// Minor-unit amount in notifications.
pub const FIELD_NOTIFY_AMOUNT: &str = "Ds_Amount";

// ---------------------------------------------------------------------------
// MerchantParameters
// ---------------------------------------------------------------------------

/// Typed merchant parameters for one outbound transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantParameters {
    /// Minor units, zero-padded to the fixed width.
    pub amount: String,
    pub order_id: OrderId,
    pub merchant_code: String,
    pub currency: Currency,
    pub transaction_type: TransactionType,
    pub terminal: String,
    pub notify_url: Option<String>,
    pub url_ok: Option<String>,
    pub url_ko: Option<String>,
}

impl MerchantParameters {
    /// Flattens into the string map that gets signed. Absent URLs are
    /// omitted rather than sent empty.
    pub fn to_canonical(&self) -> CanonicalParams {
        let mut params = CanonicalParams::new();
        params.insert(FIELD_AMOUNT, self.amount.as_str());
        params.insert(FIELD_ORDER, self.order_id.as_str());
        params.insert(FIELD_MERCHANT_CODE, self.merchant_code.as_str());
        params.insert(FIELD_CURRENCY, self.currency.numeric_code());
        params.insert(FIELD_TRANSACTION_TYPE, self.transaction_type.code());
        params.insert(FIELD_TERMINAL, self.terminal.as_str());

        if let Some(url) = &self.notify_url {
            params.insert(FIELD_MERCHANT_URL, url.as_str());
        }
        if let Some(url) = &self.url_ok {
            params.insert(FIELD_URL_OK, url.as_str());
        }
        if let Some(url) = &self.url_ko {
            params.insert(FIELD_URL_KO, url.as_str());
        }
        params
    }
}

// ---------------------------------------------------------------------------
// CanonicalParams
// ---------------------------------------------------------------------------

/// All-string parameter map with a fixed serialization.
///
/// Backed by a `BTreeMap`, so iteration order (and therefore the JSON text)
/// depends only on the key/value set, never on insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalParams {
    entries: BTreeMap<String, String>,
}

impl CanonicalParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Looks a key up ignoring ASCII case. Notifications are not consistent
    /// about `Ds_Order` versus `DS_ORDER`.
    pub fn get_ignore_case(&self, key: &str) -> Option<&str> {
        self.get(key).or_else(|| {
            self.entries
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v.as_str())
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Compact JSON bytes in sorted key order.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        // A string-to-string map always serializes.
        serde_json::to_vec(&self.entries).unwrap_or_default()
    }

    /// Standard, padded base64 of [`Self::canonical_bytes`]. This is the
    /// exact text that gets signed and sent as `Ds_MerchantParameters`.
    pub fn canonical_base64(&self) -> String {
        STANDARD.encode(self.canonical_bytes())
    }

    /// Parses an inbound `Ds_MerchantParameters` value.
    ///
    /// Accepts the standard or URL-safe base64 alphabet. Returns `None`
    /// unless the payload decodes to a JSON object whose values are all
    /// strings.
    pub fn from_base64(encoded: &str) -> Option<Self> {
        let encoded = encoded.trim();
        let raw = STANDARD
            .decode(encoded)
            .or_else(|_| URL_SAFE.decode(encoded))
            .ok()?;
        let entries: BTreeMap<String, String> = serde_json::from_slice(&raw).ok()?;
        Some(Self { entries })
    }
}

impl<K, V> FromIterator<(K, V)> for CanonicalParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
