//! Price bars to percentage returns.

use tracing::{debug, warn};

use crate::{PriceBar, ReturnPoint, ReturnSeries, Symbol, VolatilityError};

/// Build a date-ascending percentage-return series from `bars`.
///
/// Bars are sorted and de-duplicated by date (the later entry wins), then
/// bounded to the `max_observations` most recent; `0` means unbounded. Each
/// adjacent pair yields `(close[t] - close[t-1]) / close[t-1] * 100`, dated by
/// the later bar. Pairs with a zero prior close are dropped rather than
/// propagated.
pub fn build_returns(
    symbol: &Symbol,
    bars: &[PriceBar],
    max_observations: usize,
) -> Result<ReturnSeries, VolatilityError> {
    let mut ordered = bars.to_vec();
    ordered.sort_by_key(|bar| bar.date);

    let mut unique: Vec<PriceBar> = Vec::with_capacity(ordered.len());
    for bar in ordered {
        match unique.last_mut() {
            Some(last) if last.date == bar.date => *last = bar,
            _ => unique.push(bar),
        }
    }

    let window = if max_observations == 0 {
        unique.as_slice()
    } else {
        let start = unique.len().saturating_sub(max_observations);
        &unique[start..]
    };
    debug!(
        symbol = symbol.as_str(),
        available = unique.len(),
        window = window.len(),
        "building return series"
    );

    let mut points = Vec::with_capacity(window.len().saturating_sub(1));
    for pair in window.windows(2) {
        let (previous, current) = (pair[0], pair[1]);
        if previous.close == 0.0 {
            warn!(
                symbol = symbol.as_str(),
                date = %current.date,
                "skipping return after a zero close"
            );
            continue;
        }

        let return_pct = (current.close - previous.close) / previous.close * 100.0;
        if !return_pct.is_finite() {
            continue;
        }
        points.push(ReturnPoint {
            date: current.date,
            return_pct,
        });
    }

    if points.is_empty() {
        return Err(VolatilityError::InsufficientData {
            required: 1,
            available: 0,
        });
    }

    Ok(ReturnSeries {
        symbol: symbol.clone(),
        points,
    })
}
