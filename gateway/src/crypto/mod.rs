//! # Cryptographic Primitives for the Gateway
//!
//! Three small pieces, leaf first:
//!
//! - **key** — the merchant's shared secret, decoded and size-checked.
//! - **cipher** — triple-DES-CBC derivation of the per-order HMAC key.
//! - **signature** — HMAC-SHA-256 signing and constant-time verification.
//!
//! Nothing here is novel. Every primitive comes from the RustCrypto crates;
//! this module only fixes the parameters the gateway mandates (zero IV, key
//! sizes, padding, base64 alphabets) and keeps them in one place.

pub mod cipher;
pub mod key;
pub mod signature;

pub use cipher::{derive_key, DerivedKey, OrderPadding};
pub use key::SharedSecret;
pub use signature::{sign, sign_params, verify, verify_encoded, SignatureEncoding};
