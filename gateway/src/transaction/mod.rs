//! # Transaction Module
//!
//! Construction and signing of outbound payment requests.
//!
//! ## Architecture
//!
//! ```text
//! types.rs   — Core enums and value types (TransactionType, Currency, OrderId, amounts)
//! params.rs  — Typed MerchantParameters and the canonical string map that gets signed
//! builder.rs — Fluent TransactionBuilder producing validated PaymentRequests
//! signing.rs — SignedPayload envelope and request signing
//! ```
//!
//! ## Lifecycle
//!
//! 1. **Build** — [`TransactionBuilder`] validates the reservation id and
//!    amount and fills in merchant data from the config.
//! 2. **Sign** — [`sign_request`] derives the order key and signs the
//!    canonical parameters.
//! 3. **Post** — The caller renders [`SignedPayload::form_fields`] as a form
//!    targeting [`PaymentRequest::gateway_url`].
//! 4. **Notify** — The gateway's reply comes back through
//!    [`crate::callback::CallbackValidator`].
//!
//! Amounts are `Decimal` in major units on the way in and fixed-width
//! minor-unit strings on the wire. No floating point touches money.

pub mod builder;
pub mod params;
pub mod signing;
pub mod types;

pub use builder::{PaymentRequest, TransactionBuilder};
pub use params::{CanonicalParams, MerchantParameters};
pub use signing::{sign_request, SignedPayload};
pub use types::{Currency, OrderId, TransactionType};
