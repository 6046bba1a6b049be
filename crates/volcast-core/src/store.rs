//! Tabular price-store contract and its DuckDB implementation.

use volcast_warehouse::{PriceRecord, Warehouse, WriteMode, WriteReport};

use crate::domain::{format_date, parse_date};
use crate::{PriceBar, Symbol, VolatilityError};

/// Price tables keyed by ticker.
///
/// Implementations must make a `Replace` write atomic with respect to
/// concurrent reads of the same ticker. Calls are synchronous; the lifecycle
/// runs them on the blocking pool under its storage timeout.
pub trait PriceTableStore: Send + Sync {
    fn write(
        &self,
        symbol: &Symbol,
        rows: &[PriceBar],
        mode: WriteMode,
    ) -> Result<WriteReport, VolatilityError>;

    /// The `limit` most recent rows (all rows for `None`), date-ascending.
    fn read_recent(
        &self,
        symbol: &Symbol,
        limit: Option<usize>,
    ) -> Result<Vec<PriceBar>, VolatilityError>;
}

impl PriceTableStore for Warehouse {
    fn write(
        &self,
        symbol: &Symbol,
        rows: &[PriceBar],
        mode: WriteMode,
    ) -> Result<WriteReport, VolatilityError> {
        let records = rows
            .iter()
            .map(|bar| {
                let date = format_date(bar.date)
                    .map_err(|error| VolatilityError::Persistence(error.to_string()))?;
                Ok(PriceRecord {
                    date,
                    open: bar.open,
                    high: bar.high,
                    low: bar.low,
                    close: bar.close,
                    volume: bar.volume,
                })
            })
            .collect::<Result<Vec<_>, VolatilityError>>()?;
        Ok(self.write_prices(symbol.as_str(), &records, mode)?)
    }

    fn read_recent(
        &self,
        symbol: &Symbol,
        limit: Option<usize>,
    ) -> Result<Vec<PriceBar>, VolatilityError> {
        self.read_recent_prices(symbol.as_str(), limit)?
            .into_iter()
            .map(|record| {
                let date = parse_date(&record.date).map_err(|error| {
                    VolatilityError::Persistence(format!("stored row is corrupt: {error}"))
                })?;
                PriceBar::new(
                    date,
                    record.open,
                    record.high,
                    record.low,
                    record.close,
                    record.volume,
                )
                .map_err(|error| {
                    VolatilityError::Persistence(format!("stored row {date} is corrupt: {error}"))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use time::macros::date;
    use volcast_warehouse::WarehouseConfig;

    #[test]
    fn bars_survive_a_round_trip_through_duckdb() {
        let temp = tempdir().expect("tempdir");
        let warehouse =
            Warehouse::open(WarehouseConfig::new(temp.path().join("prices.duckdb"))).expect("open");
        let symbol = Symbol::parse("AAPL").expect("symbol");
        let bars = vec![
            PriceBar::new(date!(2024 - 01 - 02), 187.15, 188.44, 183.89, 185.64, 82_488_700.0)
                .expect("bar"),
            PriceBar::new(date!(2024 - 01 - 03), 184.22, 185.88, 183.43, 184.25, 58_414_500.0)
                .expect("bar"),
        ];

        let report = warehouse
            .write(&symbol, &bars, WriteMode::Replace)
            .expect("write");
        assert_eq!(report.inserted, 2);
        assert_eq!(warehouse.read_recent(&symbol, None).expect("read"), bars);
    }

    #[test]
    fn fail_mode_conflict_is_a_persistence_error() {
        let temp = tempdir().expect("tempdir");
        let warehouse =
            Warehouse::open(WarehouseConfig::new(temp.path().join("prices.duckdb"))).expect("open");
        let symbol = Symbol::parse("MSFT").expect("symbol");
        let bar = PriceBar::new(date!(2024 - 01 - 02), 1.0, 1.0, 1.0, 1.0, 1.0).expect("bar");

        warehouse
            .write(&symbol, &[bar], WriteMode::Fail)
            .expect("first write");
        let error = warehouse
            .write(&symbol, &[bar], WriteMode::Fail)
            .expect_err("must fail");
        assert_eq!(error.kind(), crate::VolatilityErrorKind::Persistence);
    }
}
