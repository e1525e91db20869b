//! # Structured Logging
//!
//! Initializes the `tracing` subscriber with a configurable format (JSON or
//! pretty-printed) and environment-based filtering via `RUST_LOG`.
//!
//! Rejected payment notifications are logged by the gateway crate under the
//! `tpv::security` target. That target stays enabled at `warn` whatever
//! `RUST_LOG` says, so a narrow filter such as `RUST_LOG=tpv_node=debug`
//! cannot hide forged notifications. It can still be raised:
//!
//! ```text
//! RUST_LOG=info,tpv::security=debug
//! ```
//!
//! All log output is written to stderr so that stdout stays clean for the
//! JSON the `sign` and `verify` subcommands print.

use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tpv_gateway::callback::SECURITY_LOG_TARGET;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, colored output. Suitable for local development.
    Pretty,
    /// Machine-parseable JSON lines. Suitable for production log aggregation.
    Json,
}

impl LogFormat {
    /// Parse a format string. Accepts "json" or "pretty" (case-insensitive).
    /// Returns `Pretty` for any unrecognized value.
    pub fn from_str_lossy(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// Call this exactly once, early in `main()`.
///
/// * `default_level` - Filter used when `RUST_LOG` is not set, e.g.
///   `"info"` or `"tpv_node=debug,tpv_gateway=info"`.
/// * `format` - Output format (JSON or pretty-printed).
pub fn init_logging(default_level: &str, format: LogFormat) {
    let env_filter = with_security_directive(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
    );

    match format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr).with_target(true))
                .init();
        }
    }

    tracing::debug!("logging initialized (format={:?})", format);
}

/// Adds `tpv::security=warn` unless the filter already names that target.
pub fn with_security_directive(filter: EnvFilter) -> EnvFilter {
    let rendered = filter.to_string();
    if rendered.split(',').any(|d| d.trim().starts_with(SECURITY_LOG_TARGET)) {
        return filter;
    }
    match format!("{}=warn", SECURITY_LOG_TARGET).parse::<Directive>() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}
