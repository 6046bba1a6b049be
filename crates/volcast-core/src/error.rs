use std::fmt::{Display, Formatter};

use thiserror::Error;

use crate::data_source::SourceError;
use crate::Symbol;

/// Validation and contract errors raised while constructing domain values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter: '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },
    #[error("symbol cannot contain '_' at index {index}: it separates artifact id parts")]
    SymbolReservedSeparator { index: usize },

    #[error("date must be YYYY-MM-DD: '{value}'")]
    InvalidDate { value: String },
    #[error("timestamp must be UTC: '{value}'")]
    TimestampNotUtc { value: String },
    #[error("artifact id must look like TICKER_YYYYMMDDTHHMMSS.nnnnnnnnnZ: '{value}'")]
    InvalidArtifactId { value: String },
    #[error("value cannot be formatted: {value}")]
    Unformattable { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },
    #[error("bar high must be >= low")]
    InvalidBarRange,
}

/// Error classification used by callers that branch on failure type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolatilityErrorKind {
    DataAcquisition,
    InsufficientData,
    ModelFit,
    ModelNotFound,
    Persistence,
    InvalidState,
    InvalidArgument,
}

/// Errors raised by the model lifecycle.
///
/// Each component raises the most specific variant it can determine; the
/// orchestrator propagates them unchanged.
#[derive(Debug, Error)]
pub enum VolatilityError {
    /// The market-data provider was unreachable, throttled, timed out, or did
    /// not recognise the ticker.
    #[error("data acquisition failed for '{symbol}': {message}")]
    DataAcquisition { symbol: String, message: String },

    /// Not enough bars or returns to build a series or fit the model.
    #[error("insufficient data: need at least {required} observations, found {available}")]
    InsufficientData { required: usize, available: usize },

    /// The fitting engine rejected the parameters or did not converge.
    #[error("model fit failed: {0}")]
    ModelFit(String),

    /// No persisted artifact exists for the ticker.
    #[error("no model with {symbol} name")]
    ModelNotFound { symbol: String },

    /// Price store or artifact store failure (including timeouts).
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// Operation called from a lifecycle state that does not permit it.
    #[error("'{operation}' is not allowed while the model is {state}")]
    InvalidState {
        operation: &'static str,
        state: ModelStateKind,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl VolatilityError {
    pub fn data_acquisition(symbol: &Symbol, message: impl Into<String>) -> Self {
        Self::DataAcquisition {
            symbol: symbol.to_string(),
            message: message.into(),
        }
    }

    pub fn from_source(symbol: &Symbol, error: SourceError) -> Self {
        Self::data_acquisition(symbol, error.to_string())
    }

    pub const fn kind(&self) -> VolatilityErrorKind {
        match self {
            Self::DataAcquisition { .. } => VolatilityErrorKind::DataAcquisition,
            Self::InsufficientData { .. } => VolatilityErrorKind::InsufficientData,
            Self::ModelFit(_) => VolatilityErrorKind::ModelFit,
            Self::ModelNotFound { .. } => VolatilityErrorKind::ModelNotFound,
            Self::Persistence(_) => VolatilityErrorKind::Persistence,
            Self::InvalidState { .. } => VolatilityErrorKind::InvalidState,
            Self::InvalidArgument(_) => VolatilityErrorKind::InvalidArgument,
        }
    }

    pub const fn code(&self) -> &'static str {
        match self.kind() {
            VolatilityErrorKind::DataAcquisition => "data.acquisition",
            VolatilityErrorKind::InsufficientData => "data.insufficient",
            VolatilityErrorKind::ModelFit => "model.fit",
            VolatilityErrorKind::ModelNotFound => "model.not_found",
            VolatilityErrorKind::Persistence => "storage.persistence",
            VolatilityErrorKind::InvalidState => "model.invalid_state",
            VolatilityErrorKind::InvalidArgument => "request.invalid_argument",
        }
    }
}

impl From<volcast_warehouse::WarehouseError> for VolatilityError {
    fn from(error: volcast_warehouse::WarehouseError) -> Self {
        Self::Persistence(error.to_string())
    }
}

/// Coarse lifecycle state, used in diagnostics and `InvalidState` errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelStateKind {
    Uninitialized,
    DataReady,
    Fitted,
    Loaded,
}

impl ModelStateKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::DataReady => "data-ready",
            Self::Fitted => "fitted",
            Self::Loaded => "loaded",
        }
    }
}

impl Display for ModelStateKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_the_ticker() {
        let error = VolatilityError::ModelNotFound {
            symbol: String::from("TSLA"),
        };
        assert_eq!(error.kind(), VolatilityErrorKind::ModelNotFound);
        assert_eq!(error.code(), "model.not_found");
        assert_eq!(error.to_string(), "no model with TSLA name");
    }

    #[test]
    fn warehouse_errors_map_to_persistence() {
        let error: VolatilityError =
            volcast_warehouse::WarehouseError::QueryRejected(String::from("boom")).into();
        assert_eq!(error.kind(), VolatilityErrorKind::Persistence);
    }
}
