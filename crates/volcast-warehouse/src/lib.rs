//! # Volcast Warehouse
//!
//! DuckDB-backed storage for daily price history.
//!
//! ## Overview
//!
//! Each ticker owns a logical table inside `price_history` (rows keyed by
//! `(symbol, date)`). Writes follow `fail` / `replace` / `append` semantics and
//! run inside a single transaction, so a concurrent reader of the same ticker
//! observes either the previous rows or the new ones, never a mix.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use volcast_warehouse::{PriceRecord, Warehouse, WarehouseConfig, WriteMode};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warehouse = Warehouse::open(WarehouseConfig::new("prices.duckdb"))?;
//!
//!     let rows = vec![PriceRecord {
//!         date: "2024-01-02".to_string(),
//!         open: 187.15,
//!         high: 188.44,
//!         low: 183.89,
//!         close: 185.64,
//!         volume: 82_488_700.0,
//!     }];
//!     warehouse.write_prices("AAPL", &rows, WriteMode::Replace)?;
//!
//!     let recent = warehouse.read_recent_prices("AAPL", Some(250))?;
//!     println!("{} rows", recent.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `price_history` | Daily OHLCV bars per symbol |
//! | `ingest_log` | One audit row per write |
//! | `schema_migrations` | Applied migration versions |

pub mod duckdb;
pub mod migrations;

use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::{Connection, ToSql};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

pub use duckdb::{DuckDbConnectionManager, PooledConnection};

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error (file system operations).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A `fail`-mode write found existing rows for the symbol.
    #[error("table '{symbol}' already exists")]
    TableExists { symbol: String },

    /// Request was rejected before touching the database.
    #[error("query rejected: {0}")]
    QueryRejected(String),
}

/// Configuration for the warehouse database.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
    /// Maximum number of idle connections in the pool.
    pub max_pool_size: usize,
}

impl WarehouseConfig {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            max_pool_size: 4,
        }
    }
}

/// Behaviour of a write when the symbol already has rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Refuse to write if any row exists for the symbol.
    Fail,
    /// Drop every existing row for the symbol, then insert.
    Replace,
    /// Insert alongside existing rows; duplicate dates are rejected.
    Append,
}

impl WriteMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fail => "fail",
            Self::Replace => "replace",
            Self::Append => "append",
        }
    }
}

impl Display for WriteMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A daily OHLCV row as stored in the warehouse.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRecord {
    /// Trading date as `YYYY-MM-DD`.
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Outcome of a successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WriteReport {
    pub inserted: usize,
}

/// The main warehouse interface for price-history storage.
#[derive(Clone)]
pub struct Warehouse {
    manager: DuckDbConnectionManager,
}

impl Warehouse {
    /// Open a warehouse with the specified configuration, creating parent
    /// directories and applying migrations.
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let manager = DuckDbConnectionManager::open(config.db_path, config.max_pool_size)?;
        let warehouse = Self { manager };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    /// Initialize database schema.
    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire()?;
        migrations::apply_migrations(&connection)?;
        Ok(())
    }

    /// Get the path to the database file.
    pub fn db_path(&self) -> &Path {
        self.manager.db_path()
    }

    /// Write price rows for `symbol` according to `mode`.
    ///
    /// The whole write (including the `replace` delete) is one transaction.
    ///
    /// # Security
    /// All row values are bound as parameters, never interpolated.
    pub fn write_prices(
        &self,
        symbol: &str,
        rows: &[PriceRecord],
        mode: WriteMode,
    ) -> Result<WriteReport, WarehouseError> {
        let symbol = normalize_symbol(symbol)?;
        let connection = self.manager.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<WriteReport, WarehouseError> {
            match mode {
                WriteMode::Fail => {
                    if count_rows(&connection, symbol)? > 0 {
                        return Err(WarehouseError::TableExists {
                            symbol: symbol.to_string(),
                        });
                    }
                }
                WriteMode::Replace => {
                    connection.execute("DELETE FROM price_history WHERE symbol = ?", [symbol])?;
                }
                WriteMode::Append => {}
            }

            let mut statement = connection.prepare(
                "INSERT INTO price_history \
                 (symbol, date, open, high, low, close, volume, updated_at) \
                 VALUES (?, CAST(? AS DATE), ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)",
            )?;
            let mut inserted = 0_usize;
            for row in rows {
                let params: [&dyn ToSql; 7] = [
                    &symbol,
                    &row.date,
                    &row.open,
                    &row.high,
                    &row.low,
                    &row.close,
                    &row.volume,
                ];
                inserted += statement.execute(params.as_slice())?;
            }

            let rows_written = inserted as i64;
            let params: [&dyn ToSql; 3] = [&symbol, &mode.as_str(), &rows_written];
            connection.execute(
                "INSERT INTO ingest_log (symbol, mode, rows_written, timestamp) \
                 VALUES (?, ?, ?, CURRENT_TIMESTAMP)",
                params.as_slice(),
            )?;

            Ok(WriteReport { inserted })
        })();

        let report = finalize_transaction(&connection, result)?;
        debug!(symbol, mode = mode.as_str(), inserted = report.inserted, "price rows written");
        Ok(report)
    }

    /// Read the `limit` most recent rows for `symbol`, returned oldest first.
    ///
    /// `None` reads the full history. An unknown symbol yields an empty vector.
    pub fn read_recent_prices(
        &self,
        symbol: &str,
        limit: Option<usize>,
    ) -> Result<Vec<PriceRecord>, WarehouseError> {
        let symbol = normalize_symbol(symbol)?;
        if limit == Some(0) {
            return Ok(Vec::new());
        }

        // The limit is a usize, so formatting it into the statement is safe.
        let sql = match limit {
            Some(limit) => format!(
                "SELECT CAST(date AS VARCHAR), open, high, low, close, volume \
                 FROM price_history WHERE symbol = ? ORDER BY date DESC LIMIT {limit}"
            ),
            None => String::from(
                "SELECT CAST(date AS VARCHAR), open, high, low, close, volume \
                 FROM price_history WHERE symbol = ? ORDER BY date DESC",
            ),
        };

        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare(sql.as_str())?;
        let mut rows = statement
            .query_map([symbol], |row| {
                Ok(PriceRecord {
                    date: row.get(0)?,
                    open: row.get(1)?,
                    high: row.get(2)?,
                    low: row.get(3)?,
                    close: row.get(4)?,
                    volume: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.reverse();
        Ok(rows)
    }

    /// Number of stored rows for `symbol`.
    pub fn price_count(&self, symbol: &str) -> Result<usize, WarehouseError> {
        let symbol = normalize_symbol(symbol)?;
        let connection = self.manager.acquire()?;
        count_rows(&connection, symbol)
    }
}

fn count_rows(connection: &Connection, symbol: &str) -> Result<usize, WarehouseError> {
    let count: i64 = connection.query_row(
        "SELECT COUNT(*) FROM price_history WHERE symbol = ?",
        [symbol],
        |row| row.get(0),
    )?;
    Ok(usize::try_from(count).unwrap_or_default())
}

fn normalize_symbol(symbol: &str) -> Result<&str, WarehouseError> {
    let trimmed = symbol.trim();
    if trimmed.is_empty() {
        return Err(WarehouseError::QueryRejected(String::from(
            "symbol must not be empty",
        )));
    }
    Ok(trimmed)
}

/// Finalize a transaction, committing on success or rolling back on failure.
fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(date: &str, close: f64) -> PriceRecord {
        PriceRecord {
            date: date.to_string(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1_000.0,
        }
    }

    fn open_temp() -> (tempfile::TempDir, Warehouse) {
        let temp = tempdir().expect("tempdir");
        let warehouse = Warehouse::open(WarehouseConfig {
            db_path: temp.path().join("data").join("prices.duckdb"),
            max_pool_size: 2,
        })
        .expect("warehouse open");
        (temp, warehouse)
    }

    #[test]
    fn initializes_price_table() {
        let (_temp, warehouse) = open_temp();
        assert_eq!(warehouse.price_count("AAPL").expect("count"), 0);
        assert!(warehouse
            .read_recent_prices("AAPL", None)
            .expect("read")
            .is_empty());
    }

    #[test]
    fn replace_discards_previous_rows() {
        let (_temp, warehouse) = open_temp();
        warehouse
            .write_prices(
                "AAPL",
                &[record("2024-01-02", 10.0), record("2024-01-03", 11.0)],
                WriteMode::Replace,
            )
            .expect("first write");

        let report = warehouse
            .write_prices("AAPL", &[record("2024-02-01", 20.0)], WriteMode::Replace)
            .expect("second write");
        assert_eq!(report.inserted, 1);

        let rows = warehouse.read_recent_prices("AAPL", None).expect("read");
        assert_eq!(rows, vec![record("2024-02-01", 20.0)]);
    }

    #[test]
    fn fail_mode_rejects_existing_symbol() {
        let (_temp, warehouse) = open_temp();
        warehouse
            .write_prices("MSFT", &[record("2024-01-02", 10.0)], WriteMode::Fail)
            .expect("first write");

        let error = warehouse
            .write_prices("MSFT", &[record("2024-01-03", 11.0)], WriteMode::Fail)
            .expect_err("must fail");
        assert!(matches!(error, WarehouseError::TableExists { .. }));
        assert_eq!(warehouse.price_count("MSFT").expect("count"), 1);
    }

    #[test]
    fn symbol_values_are_parameterized() {
        let (_temp, warehouse) = open_temp();
        let dangerous_symbol = r#"AAPL'; DROP TABLE price_history; --"#;
        warehouse
            .write_prices(dangerous_symbol, &[record("2024-01-02", 10.0)], WriteMode::Append)
            .expect("ingest should succeed with parameterized queries");

        let rows = warehouse
            .read_recent_prices(dangerous_symbol, None)
            .expect("read");
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn recent_read_returns_newest_rows_oldest_first() {
        let (_temp, warehouse) = open_temp();
        let rows = vec![
            record("2024-01-02", 1.0),
            record("2024-01-03", 2.0),
            record("2024-01-04", 3.0),
            record("2024-01-05", 4.0),
        ];
        warehouse
            .write_prices("IBM", &rows, WriteMode::Replace)
            .expect("write");

        let recent = warehouse.read_recent_prices("IBM", Some(2)).expect("read");
        let dates: Vec<&str> = recent.iter().map(|row| row.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-04", "2024-01-05"]);
    }
}
