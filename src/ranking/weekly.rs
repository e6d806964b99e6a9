// =============================================================================
// Weekly Aggregates — 7-day rollups from daily candle series
// =============================================================================

use crate::types::Candle;

/// Per-symbol 7-day rollup derived from a daily candle series.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyAggregate {
    pub symbol: String,
    /// Sum of per-candle volumes over the window.
    pub volume_7d: f64,
    /// Percent change from the oldest candle's close to the newest. Defined
    /// as 0 when the oldest close is not positive (divide-by-zero guard).
    pub price_change_7d: f64,
}

/// Roll a candle series (oldest first) into a [`WeeklyAggregate`].
/// Returns `None` for an empty series so the caller can drop the symbol.
pub fn aggregate_weekly(symbol: &str, candles: &[Candle]) -> Option<WeeklyAggregate> {
    let first = candles.first()?;
    let last = candles.last()?;

    let volume_7d: f64 = candles.iter().map(|c| c.volume).sum();
    let price_change_7d = if first.close > 0.0 {
        (last.close - first.close) / first.close * 100.0
    } else {
        0.0
    };

    Some(WeeklyAggregate {
        symbol: symbol.to_string(),
        volume_7d,
        price_change_7d,
    })
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn daily(close: f64, volume: f64) -> Candle {
        Candle::new(0, close, close, close, close, volume, 0)
    }

    #[test]
    fn sums_volume_and_computes_percent_change() {
        let candles = vec![daily(100.0, 10.0), daily(105.0, 20.0), daily(110.0, 30.0)];
        let agg = aggregate_weekly("BTCUSDT", &candles).unwrap();
        assert_eq!(agg.symbol, "BTCUSDT");
        assert!((agg.volume_7d - 60.0).abs() < f64::EPSILON);
        assert!((agg.price_change_7d - 10.0).abs() < 1e-9);
    }

    #[test]
    fn negative_change_is_signed() {
        let candles = vec![daily(200.0, 1.0), daily(150.0, 1.0)];
        let agg = aggregate_weekly("ETHUSDT", &candles).unwrap();
        assert!((agg.price_change_7d - (-25.0)).abs() < 1e-9);
    }

    #[test]
    fn zero_first_close_yields_zero_change() {
        let candles = vec![daily(0.0, 5.0), daily(10.0, 5.0)];
        let agg = aggregate_weekly("NEWUSDT", &candles).unwrap();
        assert_eq!(agg.price_change_7d, 0.0);
        assert!((agg.volume_7d - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn single_candle_series_has_zero_change() {
        let agg = aggregate_weekly("BTCUSDT", &[daily(100.0, 7.0)]).unwrap();
        assert_eq!(agg.price_change_7d, 0.0);
        assert!((agg.volume_7d - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_series_is_dropped() {
        assert_eq!(aggregate_weekly("BTCUSDT", &[]), None);
    }
}
