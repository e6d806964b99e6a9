// =============================================================================
// Ranked Views — top volume (24h / 7d) and high-volume movers
// =============================================================================
//
// The weekly top-volume ranking is two-stage: the 24h snapshot pre-selects
// `limit` candidates so that at most `limit` candle round trips are made. A
// pair with low 24h volume but an anomalous 7-day spike can therefore be
// missed; that approximation is inherited behaviour, not a bug.
// =============================================================================

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::exchange::client::{FetchError, MarketClient};
use crate::ranking::normalize::{normalize_snapshot, TickerRow};
use crate::ranking::weekly::{aggregate_weekly, WeeklyAggregate};
use crate::ranking::{AdjustmentNote, RankedRow, RankedTable};
use crate::types::{Period, ViewKind};

/// When even the adjusted threshold filters everything out, fall back to this
/// many pairs ranked by volume.
const FALLBACK_TOP_N: usize = 20;

/// One-shot ranking pipeline over a [`MarketClient`]. Holds no state across
/// requests; construct, call one view, discard.
pub struct Screener<'a> {
    client: &'a MarketClient,
    candle_interval: String,
    weekly_window: u32,
}

impl<'a> Screener<'a> {
    pub fn new(client: &'a MarketClient) -> Self {
        Self {
            client,
            candle_interval: "1d".to_string(),
            weekly_window: 7,
        }
    }

    /// Override the candle interval and window used for the weekly view.
    pub fn with_weekly_window(mut self, interval: impl Into<String>, window: u32) -> Self {
        self.candle_interval = interval.into();
        self.weekly_window = window;
        self
    }

    /// Top pairs by trading volume over `period`, at most `limit` rows.
    pub async fn top_volume(&self, period: Period, limit: usize) -> Result<RankedTable, FetchError> {
        let raw = self.client.fetch_ticker_snapshot().await?;
        let rows = normalize_snapshot(&raw, self.client.profile());

        match period {
            Period::Day => {
                let ranked = rank_top_volume_24h(&rows, limit);
                Ok(RankedTable::new(ViewKind::TopVolume, Period::Day, ranked, None))
            }
            Period::Week => {
                // Stage one: cheap 24h pre-filter bounds the candle fetches.
                let candidates = rank_top_volume_24h(&rows, limit);

                // Stage two: one candle series per candidate, sequential. A
                // failed or empty series drops that symbol only.
                let mut aggregates = Vec::with_capacity(candidates.len());
                for cand in &candidates {
                    match self
                        .client
                        .fetch_candles(&cand.symbol, &self.candle_interval, self.weekly_window)
                        .await
                    {
                        Ok(candles) => {
                            if let Some(agg) = aggregate_weekly(&cand.symbol, &candles) {
                                aggregates.push(agg);
                            } else {
                                debug!(symbol = %cand.symbol, "empty candle series; dropping from weekly ranking");
                            }
                        }
                        Err(e) => {
                            warn!(symbol = %cand.symbol, error = %e, "candle fetch failed; dropping from weekly ranking");
                        }
                    }
                }

                let ranked = join_weekly(&candidates, &aggregates, limit);
                Ok(RankedTable::new(ViewKind::TopVolume, Period::Week, ranked, None))
            }
        }
    }

    /// Pairs with the largest positive 24h price change among those clearing
    /// a minimum quote-volume threshold, at most `limit` rows.
    pub async fn high_volume_movers(
        &self,
        min_volume: f64,
        limit: usize,
    ) -> Result<RankedTable, FetchError> {
        let raw = self.client.fetch_ticker_snapshot().await?;
        let rows = normalize_snapshot(&raw, self.client.profile());

        let (ranked, note) = rank_movers(&rows, min_volume, limit);
        Ok(RankedTable::new(
            ViewKind::HighVolumeMovers,
            Period::Day,
            ranked,
            Some(note),
        ))
    }
}

// -----------------------------------------------------------------------------
// Pure ranking stages
// -----------------------------------------------------------------------------

/// Rank by 24h quote volume, descending, stable ties, top `limit`.
pub(crate) fn rank_top_volume_24h(rows: &[TickerRow], limit: usize) -> Vec<RankedRow> {
    let mut ranked: Vec<RankedRow> = rows.iter().filter_map(project_volume_row).collect();
    ranked.sort_by(|a, b| b.volume_quote.total_cmp(&a.volume_quote));
    ranked.truncate(limit);
    ranked
}

/// Apply the movers threshold policy and rank by signed 24h price change.
pub(crate) fn rank_movers(
    rows: &[TickerRow],
    requested: f64,
    limit: usize,
) -> (Vec<RankedRow>, AdjustmentNote) {
    // Threshold statistics run over every normalised row with a usable
    // quote volume, not just the projectable ones.
    let mut volumes: Vec<f64> = rows.iter().filter_map(|r| r.quote_volume).collect();
    volumes.sort_by(f64::total_cmp);
    let max_available = volumes.last().copied().unwrap_or(0.0);

    let (applied, mut was_adjusted) = if max_available < requested {
        let p75 = percentile(&volumes, 0.75);
        warn!(
            requested,
            max_available,
            applied = p75,
            "requested minimum volume exceeds every available pair; applying 75th percentile"
        );
        (p75, true)
    } else {
        (requested, false)
    };

    let candidates: Vec<RankedRow> = rows.iter().filter_map(project_mover_row).collect();
    let mut filtered: Vec<RankedRow> = candidates
        .iter()
        .filter(|r| r.volume_quote >= applied)
        .cloned()
        .collect();

    if filtered.is_empty() && !candidates.is_empty() {
        warn!(
            top_n = FALLBACK_TOP_N,
            "no pairs above the applied threshold; falling back to top pairs by volume"
        );
        filtered = candidates.clone();
        filtered.sort_by(|a, b| b.volume_quote.total_cmp(&a.volume_quote));
        filtered.truncate(FALLBACK_TOP_N);
        was_adjusted = true;
    }

    // Largest positive movers first: signed change, not absolute value.
    filtered.sort_by(|a, b| b.change_pct.total_cmp(&a.change_pct));
    filtered.truncate(limit);

    let note = AdjustmentNote {
        requested_threshold: requested,
        applied_threshold: applied,
        was_adjusted,
    };
    (filtered, note)
}

/// Inner-join weekly aggregates onto the candidate rows by symbol, re-rank by
/// 7-day volume descending, top `limit`. Candidates without an aggregate are
/// silently dropped.
pub(crate) fn join_weekly(
    candidates: &[RankedRow],
    aggregates: &[WeeklyAggregate],
    limit: usize,
) -> Vec<RankedRow> {
    let by_symbol: HashMap<&str, &WeeklyAggregate> =
        aggregates.iter().map(|a| (a.symbol.as_str(), a)).collect();

    let mut joined: Vec<RankedRow> = candidates
        .iter()
        .filter_map(|cand| {
            let agg = by_symbol.get(cand.symbol.as_str())?;
            Some(RankedRow {
                symbol: cand.symbol.clone(),
                coin: cand.coin.clone(),
                price: cand.price,
                change_pct: agg.price_change_7d,
                volume_quote: agg.volume_7d,
                volume_base: None,
            })
        })
        .collect();

    joined.sort_by(|a, b| b.volume_quote.total_cmp(&a.volume_quote));
    joined.truncate(limit);
    joined
}

/// Project a normalised row into the 24h top-volume shape. Rows missing any
/// projected field are excluded, per the missing-is-not-zero rule.
fn project_volume_row(row: &TickerRow) -> Option<RankedRow> {
    Some(RankedRow {
        symbol: row.symbol.clone(),
        coin: row.base_asset.clone(),
        price: row.last_price?,
        change_pct: row.price_change_pct?,
        volume_quote: row.quote_volume?,
        volume_base: Some(row.base_volume?),
    })
}

/// Project a normalised row into the movers shape (no base-volume column).
fn project_mover_row(row: &TickerRow) -> Option<RankedRow> {
    Some(RankedRow {
        symbol: row.symbol.clone(),
        coin: row.base_asset.clone(),
        price: row.last_price?,
        change_pct: row.price_change_pct?,
        volume_quote: row.quote_volume?,
        volume_base: None,
    })
}

/// Linear-interpolated percentile over an ascending-sorted slice, `q` in
/// [0, 1]. Returns 0 for an empty slice.
pub(crate) fn percentile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let pos = q * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            let frac = pos - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}
