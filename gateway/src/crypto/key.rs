//! Merchant shared secret.
//!
//! The gateway hands every merchant a base64-encoded triple-DES key out of
//! band. [`SharedSecret`] is the decoded form. The exact size is enforced:
//! a key that decodes to anything other than 16 or 24 bytes is a broken
//! deployment, and we would rather refuse to start than silently pad or
//! truncate it.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt;

use crate::config::{SECRET_LENGTH_THREE_KEY, SECRET_LENGTH_TWO_KEY};
use crate::error::{GatewayError, Result};

/// Decoded merchant secret. Immutable once constructed.
///
/// `Debug` is redacted and there is no `Display`, so the key cannot end up
/// in a log line by accident.
#[derive(Clone, PartialEq, Eq)]
pub struct SharedSecret {
    bytes: Vec<u8>,
}

impl SharedSecret {
    /// Decodes a base64 secret from configuration.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Configuration`] if the string is not valid base64 or
    /// decodes to a length other than 16 or 24 bytes. The error names only
    /// the observed length.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|_| GatewayError::configuration("shared secret is not valid base64"))?;
        Self::from_bytes(bytes)
    }

    /// Wraps raw key bytes, enforcing the accepted sizes.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        match bytes.len() {
            SECRET_LENGTH_TWO_KEY | SECRET_LENGTH_THREE_KEY => Ok(Self { bytes }),
            other => Err(GatewayError::configuration(format!(
                "shared secret must decode to {} or {} bytes, got {}",
                SECRET_LENGTH_TWO_KEY, SECRET_LENGTH_THREE_KEY, other
            ))),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedSecret({} bytes, redacted)", self.bytes.len())
    }
}
