use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Symbol, ValidationError};

/// Daily OHLCV bar. Identity is `(ticker, date)`; the ticker lives on the
/// containing table, not on the bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    #[serde(with = "super::date::iso_date")]
    pub date: Date,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    pub fn new(
        date: Date,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, ValidationError> {
        validate_price("open", open)?;
        validate_price("high", high)?;
        validate_price("low", low)?;
        validate_price("close", close)?;
        validate_price("volume", volume)?;

        if high < low {
            return Err(ValidationError::InvalidBarRange);
        }

        Ok(Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        })
    }
}

fn validate_price(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}

/// One percentage return, dated by the later bar of the pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnPoint {
    #[serde(with = "super::date::iso_date")]
    pub date: Date,
    pub return_pct: f64,
}

/// Date-ascending percentage returns for one ticker. Every value is finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    pub symbol: Symbol,
    pub points: Vec<ReturnPoint>,
}

impl ReturnSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|point| point.return_pct).collect()
    }

    pub fn last_date(&self) -> Option<Date> {
        self.points.last().map(|point| point.date)
    }
}

/// Model order: `p` ARCH lags on squared innovations, `q` GARCH lags on the
/// conditional variance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GarchOrder {
    pub p: usize,
    pub q: usize,
}

impl GarchOrder {
    pub const fn new(p: usize, q: usize) -> Self {
        Self { p, q }
    }

    /// Smallest series length that leaves at least one degree of freedom after
    /// the mean, intercept and lag coefficients.
    pub const fn min_observations(self) -> usize {
        self.p + self.q + 2
    }
}

impl Default for GarchOrder {
    fn default() -> Self {
        Self::new(1, 1)
    }
}
