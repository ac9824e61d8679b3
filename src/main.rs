// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use postwallet_server::{
    api::router,
    config::{AppConfig, LogFormat, DEFAULT_LOG_FILTER},
    payments::PaymentBridge,
    providers::stripe::StripeClient,
    state::AppState,
    storage::Database,
    token_sweeper::RevokedTokenSweeper,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    init_tracing(config.log_format);

    std::fs::create_dir_all(&config.data_dir).expect("Failed to create data directory");
    let db_path = config.database_path();
    let db = Arc::new(Database::open(&db_path).expect("Failed to open database"));
    info!(path = %db_path.display(), "Database opened");

    let stripe = config.stripe.clone();
    let currency = config.payment_currency.clone();
    let mut state = AppState::new(db.clone(), config);

    match stripe {
        Some(stripe) => {
            let client = StripeClient::new(&stripe).expect("Failed to build Stripe client");
            state = state.with_payments(PaymentBridge::new(
                Arc::new(client),
                db.clone(),
                currency,
                stripe.webhook_secret,
            ));
            info!("Stripe payments enabled");
        }
        None => warn!("STRIPE_SECRET_KEY not set; wallet funding is disabled"),
    }

    let bind_addr = state.config.bind_addr();
    let shutdown = CancellationToken::new();

    let sweeper = tokio::spawn(RevokedTokenSweeper::new(db).run(shutdown.clone()));

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received");
        signal_token.cancel();
    });

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind listener");
    info!(%bind_addr, "Postwallet server listening (docs at /docs)");

    let server_token = shutdown.clone();
    let served = axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { server_token.cancelled().await })
        .await;
    if let Err(e) = served {
        error!(error = %e, "HTTP server failed");
    }

    shutdown.cancel();
    if let Err(e) = sweeper.await {
        warn!(error = %e, "Token sweeper task ended abnormally");
    }
    info!("Server stopped");
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Pretty => subscriber.init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
