//! Shared fixtures for the behaviour suites: an offline market-data provider
//! and a deterministic price history.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};

use time::{Date, Duration};
pub use volcast_core::{MarketDataProvider, OutputSize, PriceBar, SourceError, Symbol};

/// Ticker the fixture provider refuses, the way the real provider refuses
/// unknown symbols.
pub const UNKNOWN_TICKER: &str = "BOGUS";

/// Provider that serves a fixed history and counts calls.
pub struct FixtureProvider {
    bars: Vec<PriceBar>,
    calls: AtomicUsize,
}

impl FixtureProvider {
    pub fn new(bars: Vec<PriceBar>) -> Self {
        Self {
            bars,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MarketDataProvider for FixtureProvider {
    fn name(&self) -> &'static str {
        "fixture"
    }

    fn fetch_daily_history<'a>(
        &'a self,
        symbol: &'a Symbol,
        _size: OutputSize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PriceBar>, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if symbol.as_str() == UNKNOWN_TICKER {
                return Err(SourceError::invalid_request(format!(
                    "invalid API call, check your ticker: {UNKNOWN_TICKER}"
                )));
            }
            Ok(self.bars.clone())
        })
    }
}

/// Random-walk closes on consecutive calendar days ending at `last`.
pub fn price_history(count: usize, last: Date) -> Vec<PriceBar> {
    let mut state: u64 = 0xD1B5_4A32_D192_ED03;
    let mut close = 150.0_f64;
    let first = last - Duration::days(count as i64 - 1);
    (0..count)
        .map(|index| {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            let uniform = ((state >> 11) as f64 + 0.5) / (1u64 << 53) as f64;
            close *= 1.0 + (uniform - 0.5) * 0.05;
            PriceBar::new(
                first + Duration::days(index as i64),
                close,
                close * 1.01,
                close * 0.99,
                close,
                2_500_000.0,
            )
            .expect("bar")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn history_ends_on_the_requested_day() {
        let bars = price_history(30, date!(2024 - 03 - 08));
        assert_eq!(bars.len(), 30);
        assert_eq!(bars.last().map(|bar| bar.date), Some(date!(2024 - 03 - 08)));
        assert_eq!(price_history(30, date!(2024 - 03 - 08)), bars);
    }
}
