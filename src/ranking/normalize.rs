// =============================================================================
// Snapshot Normalisation — raw ticker rows to a canonical tabular shape
// =============================================================================
//
// Rules, applied in order:
//   1. Coerce numeric fields; a field that fails coercion is missing, not
//      zero. Rows missing a view's ranking field are excluded downstream.
//   2. Retain only symbols matching the variant's quote-currency convention.
//   3. Derive the base asset by stripping the matched quote suffix (and any
//      perpetual-contract tail).
//   4. Derive quote volume from base volume x last price when absent.
// =============================================================================

use serde_json::Value;
use tracing::debug;

use crate::exchange::variant::VariantProfile;

/// One trading pair from a 24-hour snapshot, numerics coerced, symbol
/// convention already applied. Never mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct TickerRow {
    pub symbol: String,
    pub base_asset: String,
    pub last_price: Option<f64>,
    pub price_change_pct: Option<f64>,
    pub quote_volume: Option<f64>,
    pub base_volume: Option<f64>,
}

/// Normalise a raw ticker snapshot into [`TickerRow`]s for `profile`'s
/// symbol and field-name conventions. Rows without a usable symbol are
/// dropped here; rows with missing numerics survive and are filtered by the
/// views that need those fields.
pub fn normalize_snapshot(raw: &[Value], profile: &VariantProfile) -> Vec<TickerRow> {
    let mut rows = Vec::with_capacity(raw.len());

    for obj in raw {
        let Some(symbol) = obj.get("symbol").and_then(Value::as_str) else {
            continue;
        };
        let Some(base_asset) = strip_quote_suffix(symbol, profile) else {
            continue;
        };
        if base_asset.is_empty() {
            continue;
        }

        let last_price = coerce_field(obj, &["lastPrice"]);
        let price_change_pct = coerce_field(obj, &["priceChangePercent"]);
        let base_volume = coerce_field(obj, profile.base_volume_fields);
        let quote_volume = coerce_field(obj, &["quoteVolume"]).or(match (base_volume, last_price) {
            (Some(vol), Some(price)) => Some(vol * price),
            _ => None,
        });

        rows.push(TickerRow {
            symbol: symbol.to_string(),
            base_asset,
            last_price,
            price_change_pct,
            quote_volume,
            base_volume,
        });
    }

    debug!(raw = raw.len(), retained = rows.len(), "snapshot normalised");
    rows
}

/// Strip the quote-currency suffix from `symbol`, returning the base asset,
/// or `None` when the symbol does not match the variant's convention.
///
/// Plain suffixes are stripped repeatedly so the result never ends in a
/// quote suffix; perpetual contract names (`BTCUSDT_250926`) are cut at the
/// `<SUFFIX>_` marker.
fn strip_quote_suffix(symbol: &str, profile: &VariantProfile) -> Option<String> {
    let mut base = symbol;
    let mut matched = false;

    loop {
        let mut stripped = false;
        for suffix in &profile.quote_suffixes {
            if let Some(rest) = base.strip_suffix(suffix.as_str()) {
                base = rest;
                matched = true;
                stripped = true;
            }
        }
        if !stripped {
            break;
        }
    }
    if matched {
        return Some(base.to_string());
    }

    if profile.perpetual_pairs {
        for suffix in &profile.quote_suffixes {
            let marker = format!("{suffix}_");
            if let Some(pos) = symbol.find(&marker) {
                return Some(symbol[..pos].to_string());
            }
        }
    }

    None
}

/// Coerce the first present field among `names` to `f64`. A present but
/// unparseable (or non-finite) value is missing, never zero.
fn coerce_field(obj: &Value, names: &[&str]) -> Option<f64> {
    for name in names {
        let Some(val) = obj.get(*name) else { continue };
        return match val {
            Value::String(s) => s.parse::<f64>().ok().filter(|f| f.is_finite()),
            Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
            _ => None,
        };
    }
    None
}
