// =============================================================================
// Exchange Variants — one client, three configured API surfaces
// =============================================================================
//
// The spot-US, spot-global, and futures integrations differ only in base URL,
// accepted quote-suffix conventions, payload field names, and whether requests
// must be signed.  All of that is captured in a `VariantProfile` so the client
// and the normaliser stay variant-agnostic.
// =============================================================================

use serde::{Deserialize, Serialize};

/// Which exchange API surface the screener talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExchangeVariant {
    SpotUs,
    SpotGlobal,
    Futures,
}

impl Default for ExchangeVariant {
    fn default() -> Self {
        Self::Futures
    }
}

impl std::fmt::Display for ExchangeVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SpotUs => write!(f, "spot-us"),
            Self::SpotGlobal => write!(f, "spot-global"),
            Self::Futures => write!(f, "futures"),
        }
    }
}

impl ExchangeVariant {
    /// Parse the kebab-case form used in env vars and config files.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "spot-us" => Some(Self::SpotUs),
            "spot-global" => Some(Self::SpotGlobal),
            "futures" => Some(Self::Futures),
            _ => None,
        }
    }

    /// Build the full profile for this variant.
    pub fn profile(self) -> VariantProfile {
        match self {
            Self::SpotUs => VariantProfile {
                variant: self,
                base_url: "https://api.binance.us/api/v3".to_string(),
                quote_suffixes: vec!["USDT".to_string(), "BUSD".to_string()],
                perpetual_pairs: false,
                base_volume_fields: &["volume"],
                signed_requests: true,
            },
            Self::SpotGlobal => VariantProfile {
                variant: self,
                base_url: "https://api.binance.com/api/v3".to_string(),
                quote_suffixes: vec!["USDT".to_string(), "BUSD".to_string()],
                perpetual_pairs: false,
                base_volume_fields: &["volume"],
                signed_requests: false,
            },
            Self::Futures => VariantProfile {
                variant: self,
                base_url: "https://fapi.binance.com/fapi/v1".to_string(),
                quote_suffixes: vec!["USDT".to_string(), "BUSD".to_string()],
                perpetual_pairs: true,
                // Futures payloads report base-asset turnover as `baseVolume`.
                base_volume_fields: &["volume", "baseVolume"],
                signed_requests: false,
            },
        }
    }
}

/// Everything variant-specific the client and normaliser need.
#[derive(Debug, Clone)]
pub struct VariantProfile {
    pub variant: ExchangeVariant,
    /// Base URL including the API version prefix (no trailing slash).
    pub base_url: String,
    /// Quote-currency suffixes a symbol must carry to be retained.
    pub quote_suffixes: Vec<String>,
    /// Accept `<SUFFIX>_`-delimited contract names (e.g. `BTCUSDT_250926`).
    pub perpetual_pairs: bool,
    /// Field names that may carry base-asset volume, in priority order.
    pub base_volume_fields: &'static [&'static str],
    /// Whether every request must carry an HMAC signature.
    pub signed_requests: bool,
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_kebab_case() {
        assert_eq!(ExchangeVariant::parse("spot-us"), Some(ExchangeVariant::SpotUs));
        assert_eq!(
            ExchangeVariant::parse("Spot-Global"),
            Some(ExchangeVariant::SpotGlobal)
        );
        assert_eq!(ExchangeVariant::parse("futures"), Some(ExchangeVariant::Futures));
        assert_eq!(ExchangeVariant::parse("margin"), None);
    }

    #[test]
    fn display_roundtrips_through_parse() {
        for v in [
            ExchangeVariant::SpotUs,
            ExchangeVariant::SpotGlobal,
            ExchangeVariant::Futures,
        ] {
            assert_eq!(ExchangeVariant::parse(&v.to_string()), Some(v));
        }
    }

    #[test]
    fn only_spot_us_requires_signing() {
        assert!(ExchangeVariant::SpotUs.profile().signed_requests);
        assert!(!ExchangeVariant::SpotGlobal.profile().signed_requests);
        assert!(!ExchangeVariant::Futures.profile().signed_requests);
    }

    #[test]
    fn futures_profile_accepts_perpetuals_and_base_volume_alias() {
        let profile = ExchangeVariant::Futures.profile();
        assert!(profile.perpetual_pairs);
        assert!(profile.base_volume_fields.contains(&"baseVolume"));
        assert!(profile.base_url.starts_with("https://fapi.binance.com"));
    }

    #[test]
    fn spot_profiles_reject_perpetuals() {
        assert!(!ExchangeVariant::SpotUs.profile().perpetual_pairs);
        assert!(!ExchangeVariant::SpotGlobal.profile().perpetual_pairs);
    }
}
