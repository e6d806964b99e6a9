// =============================================================================
// Screener Configuration — JSON file with env overrides and atomic save
// =============================================================================
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash. All fields carry `#[serde(default)]` so that adding new fields never
// breaks loading an older config file.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::exchange::variant::{ExchangeVariant, VariantProfile};

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_limit() -> usize {
    20
}

fn default_min_quote_volume() -> f64 {
    100_000_000.0
}

fn default_candle_interval() -> String {
    "1d".to_string()
}

fn default_weekly_window() -> u32 {
    7
}

fn default_cache_ttl_secs() -> u64 {
    60
}

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

// =============================================================================
// ScreenerConfig
// =============================================================================

/// Top-level configuration for the screener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenerConfig {
    /// Which exchange API surface to poll.
    #[serde(default)]
    pub variant: ExchangeVariant,

    /// Optional base-URL override (e.g. a mirror or a test server). Applied
    /// on top of the variant's default profile.
    #[serde(default)]
    pub base_url_override: Option<String>,

    /// Default number of rows per view when a request does not say.
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Default minimum 24h quote volume for the movers view.
    #[serde(default = "default_min_quote_volume")]
    pub min_quote_volume: f64,

    /// Candle width used for the weekly rollup.
    #[serde(default = "default_candle_interval")]
    pub candle_interval: String,

    /// Number of candles in the weekly rollup window.
    #[serde(default = "default_weekly_window")]
    pub weekly_window: u32,

    /// How long a completed ranking stays memoized.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Address the API server binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            variant: ExchangeVariant::default(),
            base_url_override: None,
            default_limit: default_limit(),
            min_quote_volume: default_min_quote_volume(),
            candle_interval: default_candle_interval(),
            weekly_window: default_weekly_window(),
            cache_ttl_secs: default_cache_ttl_secs(),
            bind_addr: default_bind_addr(),
        }
    }
}

impl ScreenerConfig {
    /// Resolve the variant profile, applying the base-URL override if set.
    pub fn variant_profile(&self) -> VariantProfile {
        let mut profile = self.variant.profile();
        if let Some(url) = &self.base_url_override {
            profile.base_url = url.trim_end_matches('/').to_string();
        }
        profile
    }

    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config from {}", path.display()))?;

        info!(
            path = %path.display(),
            variant = %config.variant,
            "config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content =
            serde_json::to_string_pretty(self).context("failed to serialise config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "config saved (atomic)");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = ScreenerConfig::default();
        assert_eq!(cfg.variant, ExchangeVariant::Futures);
        assert_eq!(cfg.default_limit, 20);
        assert!((cfg.min_quote_volume - 1e8).abs() < f64::EPSILON);
        assert_eq!(cfg.candle_interval, "1d");
        assert_eq!(cfg.weekly_window, 7);
        assert_eq!(cfg.cache_ttl_secs, 60);
        assert_eq!(cfg.bind_addr, "0.0.0.0:3001");
        assert!(cfg.base_url_override.is_none());
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: ScreenerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.variant, ExchangeVariant::Futures);
        assert_eq!(cfg.default_limit, 20);
        assert_eq!(cfg.weekly_window, 7);
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "variant": "spot-us", "default_limit": 10 }"#;
        let cfg: ScreenerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.variant, ExchangeVariant::SpotUs);
        assert_eq!(cfg.default_limit, 10);
        assert_eq!(cfg.cache_ttl_secs, 60);
    }

    #[test]
    fn roundtrip_serialisation() {
        let cfg = ScreenerConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let cfg2: ScreenerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg.variant, cfg2.variant);
        assert_eq!(cfg.default_limit, cfg2.default_limit);
        assert_eq!(cfg.bind_addr, cfg2.bind_addr);
    }

    #[test]
    fn base_url_override_replaces_profile_url() {
        let cfg = ScreenerConfig {
            base_url_override: Some("http://localhost:9999/api/".to_string()),
            ..ScreenerConfig::default()
        };
        let profile = cfg.variant_profile();
        assert_eq!(profile.base_url, "http://localhost:9999/api");

        let plain = ScreenerConfig::default().variant_profile();
        assert!(plain.base_url.starts_with("https://"));
    }
}
