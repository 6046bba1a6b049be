//! Market-data provider adapters.

mod alphavantage;

pub use alphavantage::AlphaVantageAdapter;
