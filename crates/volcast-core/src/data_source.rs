//! Market-data provider contract.
//!
//! The lifecycle only asks a provider for one thing: the daily OHLCV history
//! of a ticker, oldest bar first.
//!
//! ```rust,ignore
//! use volcast_core::{AlphaVantageAdapter, MarketDataProvider, OutputSize, Symbol};
//!
//! async fn latest_close(adapter: &AlphaVantageAdapter) -> Result<f64, SourceError> {
//!     let bars = adapter
//!         .fetch_daily_history(&Symbol::parse("AAPL")?, OutputSize::Compact)
//!         .await?;
//!     Ok(bars.last().map(|bar| bar.close).unwrap_or_default())
//! }
//! ```

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::{PriceBar, Symbol};

/// How much history to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputSize {
    /// Roughly the latest 100 sessions.
    Compact,
    /// Every session the provider has.
    Full,
}

impl OutputSize {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Full => "full",
        }
    }
}

impl Display for OutputSize {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    InvalidRequest,
    MissingCredentials,
    Internal,
}

/// Structured provider error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn missing_credentials(provider: &str) -> Self {
        Self {
            kind: SourceErrorKind::MissingCredentials,
            message: format!("no API key configured for '{provider}'"),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::MissingCredentials => "source.missing_credentials",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Market-data provider contract.
///
/// Implementations must be `Send + Sync`; one provider is shared by every
/// request the server handles.
pub trait MarketDataProvider: Send + Sync {
    /// Stable provider name used in logs.
    fn name(&self) -> &'static str;

    /// Daily OHLCV bars for `symbol`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if:
    /// - the ticker is not recognised (`InvalidRequest`)
    /// - the provider throttled the call (`RateLimited`)
    /// - the provider is unreachable or returned a non-success status
    /// - the payload could not be parsed (`Internal`)
    fn fetch_daily_history<'a>(
        &'a self,
        symbol: &'a Symbol,
        size: OutputSize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PriceBar>, SourceError>> + Send + 'a>>;
}
