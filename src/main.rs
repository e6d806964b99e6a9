// =============================================================================
// CoinPulse Market Screener — Main Entry Point
// =============================================================================
//
// Polls one configured exchange variant for 24-hour ticker statistics, ranks
// pairs by volume or price movement, and serves the ranked tables as JSON.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod cache;
mod config;
mod exchange;
mod ranking;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::config::ScreenerConfig;
use crate::exchange::client::{Credentials, MarketClient};
use crate::exchange::variant::ExchangeVariant;

const CONFIG_PATH: &str = "screener_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("CoinPulse Market Screener — starting up");

    let mut config = ScreenerConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        ScreenerConfig::default()
    });

    // Env overrides win over the file.
    if let Ok(v) = std::env::var("COINPULSE_VARIANT") {
        match ExchangeVariant::parse(&v) {
            Some(variant) => config.variant = variant,
            None => warn!(value = %v, "Unknown COINPULSE_VARIANT ignored"),
        }
    }
    if let Ok(addr) = std::env::var("COINPULSE_BIND_ADDR") {
        config.bind_addr = addr;
    }

    // Write the effective config back so a fresh deployment gets a file to
    // edit (best-effort).
    if let Err(e) = config.save(CONFIG_PATH) {
        warn!(error = %e, "Failed to persist effective config");
    }

    info!(
        variant = %config.variant,
        bind_addr = %config.bind_addr,
        cache_ttl_secs = config.cache_ttl_secs,
        "configuration resolved"
    );

    // ── 2. Build the market data client ──────────────────────────────────
    let profile = config.variant_profile();
    let credentials = Credentials::from_env();
    if profile.signed_requests && credentials.is_none() {
        warn!(
            variant = %config.variant,
            "variant requires signed requests but no credentials are set; every fetch will fail with an auth error"
        );
    }
    let client = MarketClient::new(profile, credentials);

    // ── 3. Shared state & API server ─────────────────────────────────────
    let state = Arc::new(AppState::new(config, client));

    let bind_addr = state.config.read().bind_addr.clone();
    let app = api::rest::router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server to {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server failed")?;

    info!("CoinPulse shut down complete");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    warn!("Shutdown signal received — stopping gracefully");
}
