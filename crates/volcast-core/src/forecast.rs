//! Calendar alignment of raw variance forecasts.

use serde::ser::{Error as SerError, SerializeMap};
use serde::{Serialize, Serializer};
use time::Date;

use crate::calendar::business_days_after;
use crate::domain::format_date;
use crate::VolatilityError;

/// Volatility for one future business day, in return-percentage units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastPoint {
    pub date: Date,
    pub volatility: f64,
}

/// Date-ascending volatility forecast.
///
/// Serializes as a JSON object keyed by `YYYY-MM-DD`, in date order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Forecast {
    points: Vec<ForecastPoint>,
}

impl Forecast {
    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> Vec<Date> {
        self.points.iter().map(|point| point.date).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|point| point.volatility).collect()
    }

    pub fn get(&self, date: Date) -> Option<f64> {
        self.points
            .iter()
            .find(|point| point.date == date)
            .map(|point| point.volatility)
    }
}

impl Serialize for Forecast {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.points.len()))?;
        for point in &self.points {
            let key = format_date(point.date).map_err(S::Error::custom)?;
            map.serialize_entry(&key, &point.volatility)?;
        }
        map.end()
    }
}

/// Variances in `[-NEGATIVE_VARIANCE_TOLERANCE, 0)` are rounding noise and
/// clamp to zero. Anything lower is an engine failure.
const NEGATIVE_VARIANCE_TOLERANCE: f64 = 1e-12;

/// Map raw variances onto the business days following `anchor`.
///
/// Each value becomes a standard deviation (`sqrt`).
pub fn format_forecast(raw_variances: &[f64], anchor: Date) -> Result<Forecast, VolatilityError> {
    if let Some(index) = raw_variances.iter().position(|value| !value.is_finite()) {
        return Err(VolatilityError::ModelFit(format!(
            "variance forecast step {} is not finite",
            index + 1
        )));
    }
    if let Some((index, value)) = raw_variances
        .iter()
        .enumerate()
        .find(|(_, value)| **value < -NEGATIVE_VARIANCE_TOLERANCE)
    {
        return Err(VolatilityError::ModelFit(format!(
            "variance forecast step {} is negative: {value}",
            index + 1
        )));
    }

    let days = business_days_after(anchor, raw_variances.len());
    if days.len() != raw_variances.len() {
        return Err(VolatilityError::InvalidArgument(String::from(
            "forecast horizon runs past the supported calendar",
        )));
    }

    let points = days
        .into_iter()
        .zip(raw_variances)
        .map(|(date, variance)| ForecastPoint {
            date,
            volatility: variance.max(0.0).sqrt(),
        })
        .collect();

    Ok(Forecast { points })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn takes_square_root_once() {
        let forecast = format_forecast(&[4.0, 9.0], date!(2024 - 03 - 06)).expect("formats");
        assert_eq!(forecast.values(), vec![2.0, 3.0]);
        assert_eq!(
            forecast.dates(),
            vec![date!(2024 - 03 - 07), date!(2024 - 03 - 08)]
        );
    }

    #[test]
    fn serializes_as_ordered_date_map() {
        let forecast =
            format_forecast(&[1.0, 1.0, 0.25], date!(2024 - 03 - 07)).expect("formats");
        let json = serde_json::to_string(&forecast).expect("serializes");
        assert_eq!(
            json,
            r#"{"2024-03-08":1.0,"2024-03-11":1.0,"2024-03-12":0.5}"#
        );
    }

    #[test]
    fn clamps_negative_rounding_noise() {
        let forecast =
            format_forecast(&[-1e-18, -1e-12, 0.0], date!(2024 - 03 - 07)).expect("formats");
        assert_eq!(forecast.values(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn rejects_materially_negative_variance() {
        let err = format_forecast(&[1.0, 0.5, -0.01], date!(2024 - 03 - 07)).expect_err("fails");
        assert_eq!(err.kind(), crate::VolatilityErrorKind::ModelFit);
        assert!(err.to_string().contains("step 3"), "{err}");

        let err = format_forecast(&[-1e-9], date!(2024 - 03 - 07)).expect_err("fails");
        assert_eq!(err.kind(), crate::VolatilityErrorKind::ModelFit);
    }

    #[test]
    fn rejects_non_finite_variance() {
        let err = format_forecast(&[1.0, f64::NAN], date!(2024 - 03 - 07)).expect_err("fails");
        assert_eq!(err.kind(), crate::VolatilityErrorKind::ModelFit);
    }

    #[test]
    fn empty_input_gives_empty_forecast() {
        let forecast = format_forecast(&[], date!(2024 - 03 - 07)).expect("formats");
        assert!(forecast.is_empty());
    }
}
