//! # Volcast Core
//!
//! Volatility model lifecycle for daily equity prices: acquire history, build
//! percentage returns, fit GARCH(p, q), persist the fitted model, and serve
//! business-day volatility forecasts.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Market-data provider adapters (Alpha Vantage) |
//! | [`artifacts`] | Timestamped model artifact store |
//! | [`calendar`] | Business-day arithmetic |
//! | [`circuit_breaker`] | Circuit breaker for resilient upstream calls |
//! | [`config`] | Environment-driven configuration |
//! | [`data_source`] | Provider trait and source errors |
//! | [`domain`] | Symbols, bars, returns, timestamps |
//! | [`error`] | Lifecycle and validation errors |
//! | [`forecast`] | Calendar alignment of variance forecasts |
//! | [`garch`] | Maximum-likelihood GARCH engine |
//! | [`http_client`] | HTTP client abstraction |
//! | [`model`] | The [`VolatilityModel`] state machine |
//! | [`provider_policy`] | Quota, backoff and circuit settings per provider |
//! | [`returns`] | Price bars to return series |
//! | [`service`] | Request/response boundary |
//! | [`store`] | Tabular price store contract |
//! | [`throttling`] | Request budget (governor) |
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │ VolatilityService│  success/message envelopes
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │ VolatilityModel  │────▶│ MarketDataProvider│──▶ HTTP client
//! │ (state machine)  │     └──────────────────┘
//! │                  │────▶ PriceTableStore (DuckDB)
//! │                  │────▶ GarchEngine
//! │                  │────▶ ArtifactStore (files)
//! └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use volcast_core::{
//!     AlphaVantageAdapter, Collaborators, FitRequest, FsArtifactStore,
//!     MaximumLikelihoodEngine, PredictRequest, VolatilityService, VolcastConfig,
//! };
//! use volcast_warehouse::Warehouse;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = VolcastConfig::from_env()?;
//!     let collaborators = Collaborators {
//!         provider: Arc::new(AlphaVantageAdapter::from_config(&config)),
//!         prices: Arc::new(Warehouse::open(config.warehouse_config())?),
//!         artifacts: Arc::new(FsArtifactStore::new(&config.model_dir)),
//!         engine: Arc::new(MaximumLikelihoodEngine::default()),
//!     };
//!     let service = VolatilityService::new(&config, collaborators);
//!
//!     let mut request = FitRequest::new("AAPL");
//!     request.use_fresh_data = true;
//!     println!("{}", service.fit(request).await.message);
//!
//!     let forecast = service.predict(PredictRequest::new("AAPL", 5)).await;
//!     println!("{}", serde_json::to_string(&forecast.forecast)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Lifecycle operations return [`VolatilityError`]; branch on its kind:
//!
//! ```rust
//! use volcast_core::{VolatilityError, VolatilityErrorKind};
//!
//! fn describe(error: &VolatilityError) -> &'static str {
//!     match error.kind() {
//!         VolatilityErrorKind::ModelNotFound => "train a model first",
//!         VolatilityErrorKind::InsufficientData => "widen the window",
//!         _ => error.code(),
//!     }
//! }
//! ```
//!
//! API keys are read from the environment only and never logged.

pub mod adapters;
pub mod artifacts;
pub mod calendar;
pub mod circuit_breaker;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod forecast;
pub mod garch;
pub mod http_client;
pub mod model;
pub mod provider_policy;
pub mod returns;
pub mod service;
pub mod store;
pub mod throttling;

// Adapter implementations
pub use adapters::AlphaVantageAdapter;

// Artifacts
pub use artifacts::{ArtifactId, ArtifactStore, FsArtifactStore, ModelArtifact};

pub use calendar::{business_days_after, is_business_day};

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};

pub use config::{ConfigError, VolcastConfig};

// Provider contract
pub use data_source::{MarketDataProvider, OutputSize, SourceError, SourceErrorKind};

// Domain models
pub use domain::{GarchOrder, PriceBar, ReturnPoint, ReturnSeries, Symbol, UtcDateTime};

pub use error::{ModelStateKind, ValidationError, VolatilityError, VolatilityErrorKind};

pub use forecast::{format_forecast, Forecast, ForecastPoint};

// Fitting engine
pub use garch::{EngineOptions, FitSummary, FittedModel, GarchEngine, MaximumLikelihoodEngine};

pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};

// Lifecycle
pub use model::{Collaborators, LifecycleSettings, VolatilityModel, MAX_FORECAST_HORIZON};

pub use provider_policy::{BackoffPolicy, ProviderPolicy};

pub use returns::build_returns;

// Service boundary
pub use service::{
    ArtifactListing, FitRequest, FitResponse, PredictRequest, PredictResponse, VolatilityService,
};

pub use store::PriceTableStore;

pub use throttling::RequestBudget;

// Warehouse (re-exported from volcast-warehouse)
pub use volcast_warehouse::{Warehouse, WarehouseConfig, WarehouseError, WriteMode, WriteReport};
