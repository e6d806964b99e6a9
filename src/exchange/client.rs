// =============================================================================
// Exchange REST API Client — public market data, HMAC-SHA256 signed variants
// =============================================================================
//
// SECURITY: The secret key is never logged or serialized. Signed variants send
// X-MBX-APIKEY as a header and a recvWindow of 5 000 ms to tolerate minor
// clock drift between the screener and the exchange servers.
//
// Every operation returns a typed `FetchError` instead of raising past this
// boundary; callers decide how to degrade.
// =============================================================================

use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderValue};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, warn};

use crate::exchange::variant::VariantProfile;
use crate::types::Candle;

type HmacSha256 = Hmac<Sha256>;

/// Default recv-window sent with every signed request (milliseconds).
const RECV_WINDOW: u64 = 5000;

/// Per-call timeout. A request that takes longer is a `Network` failure, not
/// retried.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Typed failure taxonomy for exchange fetches.
///
/// "No data" is deliberately absent: an empty-but-successful snapshot is a
/// valid result, not a failure, and is represented by an empty table
/// downstream.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection failure or timeout before a response was read.
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The exchange answered with a non-success status.
    #[error("exchange API returned {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The response arrived but did not have the expected shape.
    #[error("unexpected payload shape: {0}")]
    Parse(String),

    /// A signed variant is configured but credentials are missing.
    #[error("missing or rejected credentials: {0}")]
    Auth(String),
}

impl FetchError {
    /// Stable machine-readable kind, used in API error bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network_error",
            Self::Api { .. } => "api_error",
            Self::Parse(_) => "parse_error",
            Self::Auth(_) => "auth_error",
        }
    }
}

/// Exchange API credentials for signed variants.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub secret: String,
}

impl Credentials {
    /// Read credentials from `BINANCE_API_KEY` / `BINANCE_API_SECRET`.
    /// Returns `None` when either is unset or empty.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("BINANCE_API_KEY").ok()?;
        let secret = std::env::var("BINANCE_API_SECRET").ok()?;
        if api_key.is_empty() || secret.is_empty() {
            return None;
        }
        Some(Self { api_key, secret })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// REST client for one configured exchange variant.
///
/// Stateless between calls: every operation performs one request and returns
/// freshly allocated data.
#[derive(Clone)]
pub struct MarketClient {
    profile: VariantProfile,
    credentials: Option<Credentials>,
    http: reqwest::Client,
}

impl MarketClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create a client for `profile`. `credentials` may be `None` for
    /// unsigned variants; a signed variant without credentials fails fast on
    /// every operation with [`FetchError::Auth`].
    pub fn new(profile: VariantProfile, credentials: Option<Credentials>) -> Self {
        let mut default_headers = HeaderMap::new();
        if let Some(creds) = &credentials {
            // The API key header is required for all signed endpoints.
            if let Ok(val) = HeaderValue::from_str(&creds.api_key) {
                default_headers.insert("X-MBX-APIKEY", val);
            }
        }

        let http = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("failed to build reqwest client");

        debug!(variant = %profile.variant, base_url = %profile.base_url, "MarketClient initialised");

        Self {
            profile,
            credentials,
            http,
        }
    }

    pub fn profile(&self) -> &VariantProfile {
        &self.profile
    }

    // -------------------------------------------------------------------------
    // Signing helpers
    // -------------------------------------------------------------------------

    /// HMAC-SHA256 hex signature of `query` under `secret`.
    pub fn sign_with(secret: &str, query: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key size");
        mac.update(query.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Current UNIX timestamp in milliseconds.
    fn timestamp_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before UNIX epoch")
            .as_millis() as u64
    }

    /// Deterministic query string: parameters sorted by key, percent-free
    /// (symbols, intervals, and integers never need escaping).
    fn canonical_query(params: &[(&str, String)]) -> String {
        let mut sorted: Vec<&(&str, String)> = params.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        sorted
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Build the final query string for a request: canonical parameters, plus
    /// timestamp, recvWindow, and signature when the variant is signed.
    ///
    /// Fails fast with [`FetchError::Auth`] before any network call when a
    /// signed variant has no credentials.
    fn request_query(&self, params: &[(&str, String)]) -> Result<String, FetchError> {
        let canonical = Self::canonical_query(params);

        if !self.profile.signed_requests {
            return Ok(canonical);
        }

        let creds = self.credentials.as_ref().ok_or_else(|| {
            FetchError::Auth(format!(
                "variant '{}' requires signed requests but no API credentials are configured",
                self.profile.variant
            ))
        })?;

        let ts = Self::timestamp_ms();
        let base = if canonical.is_empty() {
            format!("recvWindow={RECV_WINDOW}&timestamp={ts}")
        } else {
            format!("{canonical}&recvWindow={RECV_WINDOW}&timestamp={ts}")
        };
        let sig = Self::sign_with(&creds.secret, &base);
        Ok(format!("{base}&signature={sig}"))
    }

    // -------------------------------------------------------------------------
    // Transport
    // -------------------------------------------------------------------------

    /// GET `path` (relative to the variant base URL) and decode the body as
    /// JSON, mapping every failure mode to the typed taxonomy.
    async fn get_json(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<serde_json::Value, FetchError> {
        let qs = self.request_query(params)?;
        let url = if qs.is_empty() {
            format!("{}{}", self.profile.base_url, path)
        } else {
            format!("{}{}?{}", self.profile.base_url, path, qs)
        };

        debug!(path, "request attempt");

        let resp = self.http.get(&url).send().await.map_err(FetchError::Network)?;

        let status = resp.status();
        debug!(path, status = %status, "response received");

        let body = resp.text().await.map_err(FetchError::Network)?;

        if !status.is_success() {
            return Err(FetchError::Api { status, body });
        }

        serde_json::from_str(&body)
            .map_err(|e| FetchError::Parse(format!("invalid JSON from {path}: {e}")))
    }

    // -------------------------------------------------------------------------
    // Public market data
    // -------------------------------------------------------------------------

    /// GET `/ticker/24hr` — full 24-hour statistics for all listed symbols,
    /// returned as the raw decoded rows. Normalisation is the pipeline's job.
    pub async fn fetch_ticker_snapshot(&self) -> Result<Vec<serde_json::Value>, FetchError> {
        let body = self.get_json("/ticker/24hr", &[]).await?;

        let rows = body
            .as_array()
            .cloned()
            .ok_or_else(|| FetchError::Parse("ticker snapshot is not an array".to_string()))?;

        debug!(count = rows.len(), "ticker snapshot fetched");
        Ok(rows)
    }

    /// GET `/klines` — the `limit` most recent candles of width `interval`
    /// for `symbol`, oldest first.
    ///
    /// Array indices per candle:
    ///   [0] openTime, [1] open, [2] high, [3] low, [4] close, [5] volume,
    ///   [6] closeTime, ...
    pub async fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<Candle>, FetchError> {
        if symbol.is_empty() || limit == 0 {
            return Err(FetchError::Parse(
                "klines request requires a non-empty symbol and limit >= 1".to_string(),
            ));
        }

        let params = [
            ("symbol", symbol.to_string()),
            ("interval", interval.to_string()),
            ("limit", limit.to_string()),
        ];
        let body = self.get_json("/klines", &params).await?;

        let candles = parse_klines(&body)?;
        debug!(symbol, interval, count = candles.len(), "klines fetched");
        Ok(candles)
    }

    /// GET `/exchangeInfo` — tradable-symbol metadata. Not needed for
    /// ranking, but part of the client's capability surface.
    pub async fn fetch_exchange_info(&self) -> Result<serde_json::Value, FetchError> {
        let body = self.get_json("/exchangeInfo", &[]).await?;
        debug!("exchange info fetched");
        Ok(body)
    }
}

impl std::fmt::Debug for MarketClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketClient")
            .field("variant", &self.profile.variant)
            .field("base_url", &self.profile.base_url)
            .field("credentials", &self.credentials.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Payload parsing
// -----------------------------------------------------------------------------

/// Parse the exchange's array-of-arrays kline format. Entries too short to
/// carry a close and volume are skipped with a warning rather than failing
/// the whole series.
fn parse_klines(body: &serde_json::Value) -> Result<Vec<Candle>, FetchError> {
    let raw = body
        .as_array()
        .ok_or_else(|| FetchError::Parse("klines response is not an array".to_string()))?;

    let mut candles = Vec::with_capacity(raw.len());

    for entry in raw {
        let arr = entry
            .as_array()
            .ok_or_else(|| FetchError::Parse("kline entry is not an array".to_string()))?;

        if arr.len() < 7 {
            warn!(elements = arr.len(), "skipping malformed kline entry");
            continue;
        }

        let open_time = arr[0].as_i64().unwrap_or(0);
        let open = parse_str_f64(&arr[1])?;
        let high = parse_str_f64(&arr[2])?;
        let low = parse_str_f64(&arr[3])?;
        let close = parse_str_f64(&arr[4])?;
        let volume = parse_str_f64(&arr[5])?;
        let close_time = arr[6].as_i64().unwrap_or(0);

        candles.push(Candle::new(open_time, open, high, low, close, volume, close_time));
    }

    Ok(candles)
}

/// The exchange sends numeric values as JSON strings in most payloads; accept
/// both string and number forms.
fn parse_str_f64(val: &serde_json::Value) -> Result<f64, FetchError> {
    if let Some(s) = val.as_str() {
        s.parse::<f64>()
            .map_err(|_| FetchError::Parse(format!("failed to parse '{s}' as f64")))
    } else if let Some(n) = val.as_f64() {
        Ok(n)
    } else {
        Err(FetchError::Parse(format!("expected string or number, got: {val}")))
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::variant::ExchangeVariant;
    use serde_json::json;

    #[test]
    fn signature_is_deterministic_hex() {
        let a = MarketClient::sign_with("secret", "symbol=BTCUSDT&timestamp=1");
        let b = MarketClient::sign_with("secret", "symbol=BTCUSDT&timestamp=1");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn signature_depends_on_secret_and_query() {
        let base = MarketClient::sign_with("secret", "symbol=BTCUSDT");
        assert_ne!(base, MarketClient::sign_with("other", "symbol=BTCUSDT"));
        assert_ne!(base, MarketClient::sign_with("secret", "symbol=ETHUSDT"));
    }

    #[test]
    fn canonical_query_sorts_parameters() {
        let qs = MarketClient::canonical_query(&[
            ("symbol", "BTCUSDT".to_string()),
            ("limit", "7".to_string()),
            ("interval", "1d".to_string()),
        ]);
        assert_eq!(qs, "interval=1d&limit=7&symbol=BTCUSDT");
    }

    #[test]
    fn signed_query_requires_credentials() {
        let client = MarketClient::new(ExchangeVariant::SpotUs.profile(), None);
        let err = client.request_query(&[]).unwrap_err();
        assert_eq!(err.kind(), "auth_error");
    }

    #[test]
    fn signed_query_appends_signature() {
        let creds = Credentials {
            api_key: "key".to_string(),
            secret: "secret".to_string(),
        };
        let client = MarketClient::new(ExchangeVariant::SpotUs.profile(), Some(creds));
        let qs = client
            .request_query(&[("symbol", "BTCUSDT".to_string())])
            .unwrap();
        assert!(qs.starts_with("symbol=BTCUSDT&recvWindow=5000&timestamp="));
        assert!(qs.contains("&signature="));
    }

    #[test]
    fn unsigned_variant_passes_query_through() {
        let client = MarketClient::new(ExchangeVariant::Futures.profile(), None);
        let qs = client
            .request_query(&[("symbol", "BTCUSDT".to_string())])
            .unwrap();
        assert_eq!(qs, "symbol=BTCUSDT");
    }

    #[tokio::test]
    async fn signed_operations_fail_fast_without_credentials() {
        let client = MarketClient::new(ExchangeVariant::SpotUs.profile(), None);

        let err = client.fetch_ticker_snapshot().await.unwrap_err();
        assert_eq!(err.kind(), "auth_error");

        let err = client.fetch_candles("BTCUSDT", "1d", 7).await.unwrap_err();
        assert_eq!(err.kind(), "auth_error");

        let err = client.fetch_exchange_info().await.unwrap_err();
        assert_eq!(err.kind(), "auth_error");
    }

    #[tokio::test]
    async fn candle_request_validates_arguments() {
        let client = MarketClient::new(ExchangeVariant::Futures.profile(), None);

        let err = client.fetch_candles("", "1d", 7).await.unwrap_err();
        assert_eq!(err.kind(), "parse_error");

        let err = client.fetch_candles("BTCUSDT", "1d", 0).await.unwrap_err();
        assert_eq!(err.kind(), "parse_error");
    }

    #[test]
    fn parse_klines_reads_close_and_volume_indices() {
        let body = json!([
            [1700000000000i64, "100.0", "110.0", "90.0", "105.0", "1234.5", 1700086399999i64, "x", 10, "y", "z"],
            [1700086400000i64, "105.0", "120.0", "100.0", "115.0", "2000.0", 1700172799999i64, "x", 10, "y", "z"]
        ]);
        let candles = parse_klines(&body).unwrap();
        assert_eq!(candles.len(), 2);
        assert!((candles[0].close - 105.0).abs() < f64::EPSILON);
        assert!((candles[0].volume - 1234.5).abs() < f64::EPSILON);
        assert!((candles[1].close - 115.0).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_klines_skips_short_entries() {
        let body = json!([
            [1700000000000i64, "100.0"],
            [1700086400000i64, "105.0", "120.0", "100.0", "115.0", "2000.0", 1700172799999i64]
        ]);
        let candles = parse_klines(&body).unwrap();
        assert_eq!(candles.len(), 1);
        assert!((candles[0].close - 115.0).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_klines_rejects_non_array() {
        let err = parse_klines(&json!({"code": -1121})).unwrap_err();
        assert_eq!(err.kind(), "parse_error");
    }

    #[test]
    fn parse_str_f64_accepts_both_forms() {
        assert!((parse_str_f64(&json!("1.5")).unwrap() - 1.5).abs() < f64::EPSILON);
        assert!((parse_str_f64(&json!(2.5)).unwrap() - 2.5).abs() < f64::EPSILON);
        assert!(parse_str_f64(&json!("not-a-number")).is_err());
        assert!(parse_str_f64(&json!(null)).is_err());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let creds = Credentials {
            api_key: "real-key".to_string(),
            secret: "real-secret".to_string(),
        };
        let client = MarketClient::new(ExchangeVariant::SpotUs.profile(), Some(creds));
        let debug = format!("{client:?}");
        assert!(!debug.contains("real-key"));
        assert!(!debug.contains("real-secret"));
    }
}
