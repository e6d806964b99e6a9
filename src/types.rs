// =============================================================================
// Shared types used across the CoinPulse screener
// =============================================================================

use serde::{Deserialize, Serialize};

/// Which ranked view a request is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    TopVolume,
    HighVolumeMovers,
}

impl Default for ViewKind {
    fn default() -> Self {
        Self::TopVolume
    }
}

impl std::fmt::Display for ViewKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TopVolume => write!(f, "top_volume"),
            Self::HighVolumeMovers => write!(f, "high_volume_movers"),
        }
    }
}

/// Ranking window. Only meaningful for the top-volume view; the movers view
/// always ranks over the 24-hour statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "24h")]
    Day,
    #[serde(rename = "7d")]
    Week,
}

impl Default for Period {
    fn default() -> Self {
        Self::Day
    }
}

impl Period {
    /// Parse the wire form used in query strings ("24h" / "7d").
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "24h" => Some(Self::Day),
            "7d" => Some(Self::Week),
            _ => None,
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Day => write!(f, "24h"),
            Self::Week => write!(f, "7d"),
        }
    }
}

/// A single OHLCV candle parsed from the exchange's kline endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub close_time: i64,
}

impl Candle {
    pub fn new(
        open_time: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        close_time: i64,
    ) -> Self {
        Self {
            open_time,
            open,
            high,
            low,
            close,
            volume,
            close_time,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_parses_wire_forms() {
        assert_eq!(Period::parse("24h"), Some(Period::Day));
        assert_eq!(Period::parse("7d"), Some(Period::Week));
        assert_eq!(Period::parse(" 7D "), Some(Period::Week));
        assert_eq!(Period::parse("1m"), None);
        assert_eq!(Period::parse(""), None);
    }

    #[test]
    fn period_display_roundtrips_through_parse() {
        for p in [Period::Day, Period::Week] {
            assert_eq!(Period::parse(&p.to_string()), Some(p));
        }
    }

    #[test]
    fn view_kind_serialises_snake_case() {
        let json = serde_json::to_string(&ViewKind::HighVolumeMovers).unwrap();
        assert_eq!(json, "\"high_volume_movers\"");
    }
}
