//! # Domain Models
//!
//! Validated value types shared by the lifecycle, the adapters and the
//! service boundary.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Symbol`] | Validated, upper-cased ticker |
//! | [`PriceBar`] | Daily OHLCV bar |
//! | [`ReturnSeries`] | Date-ascending percentage returns |
//! | [`GarchOrder`] | `(p, q)` model order |
//! | [`UtcDateTime`] | UTC timestamp with a sortable compact form |
//!
//! Construction validates invariants, so an invalid bar or ticker never
//! reaches the fitting engine:
//!
//! ```rust
//! use volcast_core::{PriceBar, ValidationError};
//! use time::macros::date;
//!
//! let invalid = PriceBar::new(date!(2024 - 01 - 02), 10.0, 9.0, 11.0, 10.0, 0.0);
//! assert!(matches!(invalid, Err(ValidationError::InvalidBarRange)));
//! ```

mod date;
mod models;
mod symbol;
mod timestamp;

pub use date::{format_date, iso_date, parse_date};
pub use models::{GarchOrder, PriceBar, ReturnPoint, ReturnSeries};
pub use symbol::Symbol;
pub(crate) use symbol::ARTIFACT_ID_SEPARATOR;
pub use timestamp::UtcDateTime;
