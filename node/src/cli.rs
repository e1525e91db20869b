//! # CLI Interface
//!
//! Defines the command-line argument structure for `tpv-node` using
//! `clap` derive. Supports four subcommands: `run`, `sign`, `verify`,
//! and `version`.
//!
//! Merchant settings are read from flags or, more usually, from `TPV_*`
//! environment variables, once at startup.

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use std::fmt;

use tpv_gateway::config::{GatewayConfig, LIVE_GATEWAY_URL, TEST_GATEWAY_URL};
use tpv_gateway::crypto::{OrderPadding, SignatureEncoding};
use tpv_gateway::transaction::{Currency, TransactionType};
use tpv_gateway::GatewayError;

/// Payment service for Redsys-style card gateways.
///
/// Signs outbound payment requests for bookings and validates the gateway's
/// asynchronous payment notifications before any reservation is confirmed.
#[derive(Parser, Debug)]
#[command(
    name = "tpv-node",
    about = "Virtual POS payment service",
    version,
    propagate_version = true
)]
pub struct TpvNodeCli {
    /// Log output format: `pretty` or `json`.
    #[arg(long, global = true, env = "TPV_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP payment service.
    Run(RunArgs),
    /// Build and sign a payment request offline, printing it as JSON.
    Sign(SignArgs),
    /// Validate a gateway notification offline, printing the verdict as JSON.
    Verify(VerifyArgs),
    /// Print version information and exit.
    Version,
}

/// Merchant configuration shared by every subcommand that signs or verifies.
#[derive(Args, Clone)]
pub struct GatewayArgs {
    /// Merchant code (FUC) assigned by the acquirer.
    #[arg(long, env = "TPV_MERCHANT_CODE")]
    pub merchant_code: String,

    /// Terminal number.
    #[arg(long, env = "TPV_TERMINAL", default_value = "1")]
    pub terminal: String,

    /// Base64-encoded triple-DES merchant secret.
    #[arg(long, env = "TPV_SECRET_KEY", hide_env_values = true)]
    pub secret_key: String,

    /// Gateway redirect-payment endpoint. Defaults to the test environment.
    #[arg(long, env = "TPV_GATEWAY_URL")]
    pub gateway_url: Option<String>,

    /// Use the production endpoint instead of the test one.
    #[arg(long, env = "TPV_LIVE", conflicts_with = "gateway_url")]
    pub live: bool,

    /// Default currency (ISO alpha or numeric code).
    #[arg(long, env = "TPV_CURRENCY", default_value = "EUR")]
    pub currency: Currency,

    /// Server-to-server notification URL sent with each request.
    #[arg(long, env = "TPV_NOTIFY_URL")]
    pub notify_url: Option<String>,

    /// Browser redirect after a successful payment.
    #[arg(long, env = "TPV_URL_OK", requires = "url_ko")]
    pub url_ok: Option<String>,

    /// Browser redirect after a failed payment.
    #[arg(long, env = "TPV_URL_KO", requires = "url_ok")]
    pub url_ko: Option<String>,

    /// Order-id padding before key derivation: `pkcs7` or `zero`.
    #[arg(long, env = "TPV_ORDER_PADDING", default_value = "pkcs7")]
    pub order_padding: OrderPadding,

    /// Base64 alphabet of inbound notification signatures: `standard` or `url-safe`.
    #[arg(long, env = "TPV_SIGNATURE_ENCODING", default_value = "standard")]
    pub signature_encoding: SignatureEncoding,
}

impl GatewayArgs {
    /// Explicit URL first, then the environment selected by `--live`.
    pub fn resolved_gateway_url(&self) -> &str {
        match (&self.gateway_url, self.live) {
            (Some(url), _) => url.as_str(),
            (None, true) => LIVE_GATEWAY_URL,
            (None, false) => TEST_GATEWAY_URL,
        }
    }

    /// Validates the arguments into a [`GatewayConfig`].
    pub fn to_config(&self) -> Result<GatewayConfig, GatewayError> {
        let mut config = GatewayConfig::new(
            &self.merchant_code,
            &self.terminal,
            &self.secret_key,
            self.resolved_gateway_url(),
        )?
        .with_currency(self.currency)
        .with_order_padding(self.order_padding)
        .with_signature_encoding(self.signature_encoding);

        if let Some(url) = &self.notify_url {
            config = config.with_notify_url(url.as_str());
        }
        if let (Some(ok), Some(ko)) = (&self.url_ok, &self.url_ko) {
            config = config.with_redirect_urls(ok.as_str(), ko.as_str());
        }
        Ok(config)
    }
}

impl fmt::Debug for GatewayArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayArgs")
            .field("merchant_code", &self.merchant_code)
            .field("terminal", &self.terminal)
            .field("secret_key", &"<redacted>")
            .field("gateway_url", &self.gateway_url)
            .field("live", &self.live)
            .field("currency", &self.currency)
            .field("notify_url", &self.notify_url)
            .field("order_padding", &self.order_padding)
            .field("signature_encoding", &self.signature_encoding)
            .finish()
    }
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub gateway: GatewayArgs,

    /// Address the HTTP API binds to.
    #[arg(long, env = "TPV_BIND_ADDR", default_value = "0.0.0.0")]
    pub bind_addr: String,

    /// Port for the payment API.
    #[arg(long, env = "TPV_HTTP_PORT", default_value_t = 8080)]
    pub http_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "TPV_METRICS_PORT", default_value_t = 9090)]
    pub metrics_port: u16,
}

/// Arguments for the `sign` subcommand.
#[derive(Parser, Debug)]
pub struct SignArgs {
    #[command(flatten)]
    pub gateway: GatewayArgs,

    /// Booking reservation id the order id is derived from.
    #[arg(long)]
    pub reservation_id: String,

    /// Amount in major units, e.g. `180.00`.
    #[arg(long)]
    pub amount: Decimal,

    /// Currency override for this request.
    #[arg(long = "request-currency")]
    pub request_currency: Option<Currency>,

    /// Transaction type name or gateway code.
    #[arg(long, default_value = "payment")]
    pub transaction_type: TransactionType,
}

/// Arguments for the `verify` subcommand.
#[derive(Parser, Debug)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub gateway: GatewayArgs,

    /// `Ds_MerchantParameters` exactly as received.
    #[arg(long)]
    pub merchant_parameters: String,

    /// `Ds_Signature` exactly as received.
    #[arg(long)]
    pub signature: String,

    /// `Ds_SignatureVersion`, if the gateway sent one.
    #[arg(long)]
    pub signature_version: Option<String>,
}
