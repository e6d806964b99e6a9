// =============================================================================
// Ranking Pipeline — normalise, aggregate, rank, project
// =============================================================================
//
// Per request the pipeline moves Fetching -> Normalising -> Ranking and ends
// Done (a RankedTable, possibly empty) or Failed (a typed FetchError from the
// client). Nothing here outlives a single request.
// =============================================================================

pub mod normalize;
pub mod views;
pub mod weekly;

use serde::Serialize;

use crate::types::{Period, ViewKind};

pub use normalize::TickerRow;
pub use views::Screener;
pub use weekly::WeeklyAggregate;

/// Metadata recording whether the movers view had to substitute a
/// data-driven volume threshold for an infeasible requested one.
///
/// Always attached to a movers table; `was_adjusted` is false when the
/// requested threshold was applied unchanged.
#[derive(Debug, Clone, Serialize)]
pub struct AdjustmentNote {
    pub requested_threshold: f64,
    pub applied_threshold: f64,
    pub was_adjusted: bool,
}

/// One row of a ranked result table.
///
/// `change_pct` is the 24-hour change for 24h views and the 7-day change for
/// the weekly view; `volume_quote` is the quote-currency volume the view
/// ranked by (7-day turnover in the weekly view). `volume_base` is only
/// present in the 24h top-volume view.
#[derive(Debug, Clone, Serialize)]
pub struct RankedRow {
    pub symbol: String,
    pub coin: String,
    pub price: f64,
    pub change_pct: f64,
    pub volume_quote: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_base: Option<f64>,
}

/// A complete ranked result: rows sorted by the view's ranking key
/// (descending, stable ties), truncated to the requested limit.
///
/// An empty `rows` with a present table is the "no data" outcome, distinct
/// from a failed request which never produces a table at all.
#[derive(Debug, Clone, Serialize)]
pub struct RankedTable {
    pub view: ViewKind,
    pub period: Period,
    pub rows: Vec<RankedRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjustment: Option<AdjustmentNote>,
    /// Milliseconds since epoch when this table was computed.
    pub generated_at: i64,
}

impl RankedTable {
    pub fn new(
        view: ViewKind,
        period: Period,
        rows: Vec<RankedRow>,
        adjustment: Option<AdjustmentNote>,
    ) -> Self {
        Self {
            view,
            period,
            rows,
            adjustment,
            generated_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
