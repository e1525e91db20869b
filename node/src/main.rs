// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # TPV Payment Node
//!
//! Entry point for the `tpv-node` binary. Parses CLI arguments, initializes
//! logging and metrics, and serves the payment API.
//!
//! The binary supports four subcommands:
//!
//! - `run`     — start the HTTP payment service
//! - `sign`    — sign a payment request offline and print it
//! - `verify`  — validate a gateway notification offline and print the verdict
//! - `version` — print build version information

mod api;
mod cli;
mod logging;
mod metrics;
mod store;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;

use tpv_gateway::callback::{CallbackPayload, CallbackValidator};
use tpv_gateway::transaction::TransactionBuilder;

use cli::{Commands, TpvNodeCli};
use logging::LogFormat;
use metrics::PaymentMetrics;
use store::InMemoryReservationStore;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = TpvNodeCli::parse();
    let format = LogFormat::from_str_lossy(&cli.log_format);

    match cli.command {
        Commands::Run(args) => run_node(args, format).await,
        Commands::Sign(args) => sign_offline(args, format),
        Commands::Verify(args) => verify_offline(args, format),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the payment API and the metrics endpoint.
async fn run_node(args: cli::RunArgs, format: LogFormat) -> Result<()> {
    logging::init_logging("tpv_node=info,tpv_gateway=info,tower_http=debug", format);

    let config = args
        .gateway
        .to_config()
        .context("invalid gateway configuration")?;

    tracing::info!(
        merchant_code = %config.merchant_code(),
        terminal = %config.terminal(),
        gateway_url = %config.gateway_url(),
        currency = %config.currency(),
        order_padding = %config.order_padding(),
        http_port = args.http_port,
        metrics_port = args.metrics_port,
        "starting tpv-node"
    );

    // --- Metrics ---
    let payment_metrics =
        Arc::new(PaymentMetrics::new().context("failed to create metrics registry")?);

    // --- Application state ---
    let app_state = api::AppState {
        config: Arc::new(config),
        store: Arc::new(InMemoryReservationStore::new()),
        metrics: Arc::clone(&payment_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("{}:{}", args.bind_addr, args.http_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("payment API listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&payment_metrics));
    let metrics_addr = format!("{}:{}", args.bind_addr, args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    tracing::info!("tpv-node stopped");
    Ok(())
}

/// Builds and signs one request, printing the form fields as JSON.
fn sign_offline(args: cli::SignArgs, format: LogFormat) -> Result<()> {
    logging::init_logging("tpv_node=warn,tpv_gateway=warn", format);

    let config = args
        .gateway
        .to_config()
        .context("invalid gateway configuration")?;

    let request = TransactionBuilder::new(&config)
        .reservation_id(&args.reservation_id)
        .amount(args.amount)
        .currency(args.request_currency.unwrap_or_else(|| config.currency()))
        .transaction_type(args.transaction_type)
        .build()
        .context("invalid payment request")?;
    let payload = tpv_gateway::transaction::sign_request(&config, &request)
        .context("failed to sign payment request")?;

    let output = serde_json::json!({
        "order_id": request.order_id().as_str(),
        "amount": request.amount(),
        "gateway_url": request.gateway_url(),
        "form": payload,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Validates one notification, printing the verdict as JSON. Exits non-zero
/// unless the notification is valid.
fn verify_offline(args: cli::VerifyArgs, format: LogFormat) -> Result<()> {
    logging::init_logging("tpv_node=warn,tpv_gateway=warn", format);

    let config = args
        .gateway
        .to_config()
        .context("invalid gateway configuration")?;

    let payload = CallbackPayload {
        signature_version: args.signature_version,
        merchant_parameters: args.merchant_parameters,
        signature: args.signature,
    };
    let verdict = CallbackValidator::new(&config).validate(&payload);

    println!("{}", serde_json::to_string_pretty(&verdict)?);
    if !verdict.is_valid() {
        anyhow::bail!("notification rejected: {}", verdict.outcome);
    }
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("tpv-node  {}", env!("CARGO_PKG_VERSION"));
    println!("signature {}", tpv_gateway::config::SIGNATURE_VERSION);
    println!("rustc     {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported. If a handler cannot be
/// installed, that branch never resolves.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
