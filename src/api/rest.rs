// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`. The three ranking outcomes are kept
// distinct on the wire: a failure is an HTTP error with a typed body, an
// empty-but-successful table carries `no_data: true`, and a populated table
// is a plain success. The presentation layer must never have to guess which
// one it got.
//
// CORS is configured permissively for development; tighten `allowed_origins`
// in production.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::app_state::AppState;
use crate::cache::CacheKey;
use crate::exchange::client::FetchError;
use crate::ranking::{RankedTable, Screener};
use crate::types::{Period, ViewKind};

/// Recommended request bounds for `limit`.
const MIN_LIMIT: usize = 5;
const MAX_LIMIT: usize = 50;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    use tower_http::cors::{Any, CorsLayer};

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/config", get(config_snapshot))
        .route("/api/v1/rankings/top-volume", get(top_volume))
        .route("/api/v1/rankings/movers", get(movers))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health & config
// =============================================================================

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "variant": state.client.profile().variant.to_string(),
        "uptime_secs": state.uptime_secs(),
        "server_time": chrono::Utc::now().timestamp_millis(),
    }))
}

async fn config_snapshot(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.config.read().clone())
}

// =============================================================================
// Rankings
// =============================================================================

#[derive(Deserialize)]
struct TopVolumeQuery {
    #[serde(default)]
    period: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
}

async fn top_volume(
    State(state): State<Arc<AppState>>,
    Query(q): Query<TopVolumeQuery>,
) -> Response {
    let period = match q.period.as_deref() {
        None => Period::Day,
        Some(s) => match Period::parse(s) {
            Some(p) => p,
            None => return bad_request(format!("invalid period '{s}' (use '24h' or '7d')")),
        },
    };

    let (limit, interval, window) = {
        let cfg = state.config.read();
        (
            clamp_limit(q.limit.unwrap_or(cfg.default_limit)),
            cfg.candle_interval.clone(),
            cfg.weekly_window,
        )
    };

    let key = CacheKey::new(ViewKind::TopVolume, period, limit, 0.0);
    if let Some(table) = state.cache.get(&key) {
        return table_response(table, true);
    }

    debug!(%period, limit, "computing top-volume ranking");
    let screener = Screener::new(&state.client).with_weekly_window(interval, window);
    match screener.top_volume(period, limit).await {
        Ok(table) => {
            state.cache.put(key, table.clone());
            table_response(table, false)
        }
        Err(e) => fetch_error_response(e),
    }
}

#[derive(Deserialize)]
struct MoversQuery {
    #[serde(default)]
    min_volume: Option<f64>,
    #[serde(default)]
    limit: Option<usize>,
}

async fn movers(State(state): State<Arc<AppState>>, Query(q): Query<MoversQuery>) -> Response {
    let (limit, min_volume) = {
        let cfg = state.config.read();
        (
            clamp_limit(q.limit.unwrap_or(cfg.default_limit)),
            q.min_volume.unwrap_or(cfg.min_quote_volume),
        )
    };

    if !min_volume.is_finite() || min_volume < 0.0 {
        return bad_request(format!("invalid min_volume '{min_volume}' (must be >= 0)"));
    }

    let key = CacheKey::new(ViewKind::HighVolumeMovers, Period::Day, limit, min_volume);
    if let Some(table) = state.cache.get(&key) {
        return table_response(table, true);
    }

    debug!(min_volume, limit, "computing movers ranking");
    let screener = Screener::new(&state.client);
    match screener.high_volume_movers(min_volume, limit).await {
        Ok(table) => {
            state.cache.put(key, table.clone());
            table_response(table, false)
        }
        Err(e) => fetch_error_response(e),
    }
}

// =============================================================================
// Response shaping
// =============================================================================

/// Clamp a requested row count into the recommended `[5, 50]` band.
fn clamp_limit(n: usize) -> usize {
    n.clamp(MIN_LIMIT, MAX_LIMIT)
}

/// Success body: the serialized table plus `no_data` and `cached` markers.
fn table_response(table: RankedTable, cached: bool) -> Response {
    let no_data = table.is_empty();
    let mut body = serde_json::to_value(&table).unwrap_or_default();
    if let Some(obj) = body.as_object_mut() {
        obj.insert("no_data".to_string(), no_data.into());
        obj.insert("cached".to_string(), cached.into());
    }
    Json(body).into_response()
}

/// Failure body: typed kind + human-readable detail, never an empty table.
fn fetch_error_response(e: FetchError) -> Response {
    let status = match &e {
        FetchError::Auth(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::BAD_GATEWAY,
    };
    warn!(kind = e.kind(), error = %e, "ranking request failed");
    (
        status,
        Json(json!({ "error": { "kind": e.kind(), "detail": e.to_string() } })),
    )
        .into_response()
}

fn bad_request(detail: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": { "kind": "bad_request", "detail": detail } })),
    )
        .into_response()
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_clamped_to_recommended_band() {
        assert_eq!(clamp_limit(0), 5);
        assert_eq!(clamp_limit(5), 5);
        assert_eq!(clamp_limit(20), 20);
        assert_eq!(clamp_limit(50), 50);
        assert_eq!(clamp_limit(500), 50);
    }
}
