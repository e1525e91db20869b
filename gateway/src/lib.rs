// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # TPV Gateway — Signature Core
//!
//! Everything a booking system needs to take card payments through a
//! Redsys-style virtual POS: build a payment request, sign it so the gateway
//! will accept it, and verify the gateway's asynchronous notification before
//! believing a single word of it.
//!
//! The scheme is old and a little odd (triple-DES to derive an HMAC key, of
//! all things), but it is what the acquirer speaks, and the merchant secret
//! is only ever as safe as the code that handles it.
//!
//! ## Architecture
//!
//! - **crypto** — Key material, order-key derivation, HMAC-SHA-256 signing.
//! - **transaction** — Typed request construction, canonicalization, signing.
//! - **callback** — Inbound notification validation and classification.
//! - **config** — Protocol constants and the per-merchant [`GatewayConfig`].
//! - **error** — [`GatewayError`] for the outbound path.
//!
//! ## Design Philosophy
//!
//! 1. No I/O, no globals. The config is passed in; the caller owns transport.
//! 2. The secret never reaches a log line or an error message.
//! 3. A notification that fails verification is a value, not a panic and not
//!    an error someone forgot to handle.
//! 4. If it touches money, it has tests. Plural.

pub mod callback;
pub mod config;
pub mod crypto;
pub mod error;
pub mod transaction;

pub use callback::{CallbackPayload, CallbackState, CallbackValidator, CallbackVerdict, PaymentOutcome};
pub use config::GatewayConfig;
pub use error::{GatewayError, Result};
pub use transaction::{PaymentRequest, SignedPayload, TransactionBuilder};
