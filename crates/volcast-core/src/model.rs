//! # Model lifecycle
//!
//! [`VolatilityModel`] drives one ticker through either a training flow or a
//! prediction flow, never both:
//!
//! ```text
//! Uninitialized ──prepare_data──▶ DataReady ──fit──▶ Fitted ──persist──▶ (artifact)
//!       │                                              │
//!       └──────────load_latest──────▶ Loaded           └──forecast_volatility
//!                                       └──forecast_volatility
//! ```
//!
//! Collaborator errors propagate typed; nothing is retried here. Provider and
//! storage calls run under the configured timeouts, storage on the blocking
//! pool.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};
use volcast_warehouse::WriteMode;

use crate::artifacts::{ArtifactId, ArtifactStore};
use crate::data_source::{MarketDataProvider, OutputSize};
use crate::forecast::{format_forecast, Forecast};
use crate::garch::{FitSummary, FittedModel, GarchEngine};
use crate::returns::build_returns;
use crate::store::PriceTableStore;
use crate::{
    GarchOrder, ModelStateKind, ReturnSeries, Symbol, VolatilityError, VolcastConfig,
};

/// Longest accepted forecast horizon, in business days.
pub const MAX_FORECAST_HORIZON: usize = 2_520;

/// External collaborators shared by every lifecycle instance.
#[derive(Clone)]
pub struct Collaborators {
    pub provider: Arc<dyn MarketDataProvider>,
    pub prices: Arc<dyn PriceTableStore>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub engine: Arc<dyn GarchEngine>,
}

/// Timeouts and thresholds taken from [`VolcastConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleSettings {
    pub provider_timeout: Duration,
    pub storage_timeout: Duration,
    pub min_observations: usize,
}

impl From<&VolcastConfig> for LifecycleSettings {
    fn from(config: &VolcastConfig) -> Self {
        Self {
            provider_timeout: config.provider_timeout,
            storage_timeout: config.storage_timeout,
            min_observations: config.min_observations,
        }
    }
}

enum ModelState {
    Uninitialized,
    DataReady {
        series: ReturnSeries,
    },
    Fitted {
        symbol: Symbol,
        model: FittedModel,
    },
    Loaded {
        artifact_id: ArtifactId,
        symbol: Symbol,
        model: FittedModel,
    },
}

impl ModelState {
    const fn kind(&self) -> ModelStateKind {
        match self {
            Self::Uninitialized => ModelStateKind::Uninitialized,
            Self::DataReady { .. } => ModelStateKind::DataReady,
            Self::Fitted { .. } => ModelStateKind::Fitted,
            Self::Loaded { .. } => ModelStateKind::Loaded,
        }
    }
}

/// Lifecycle manager for one ticker's volatility model.
pub struct VolatilityModel {
    settings: LifecycleSettings,
    collaborators: Collaborators,
    state: ModelState,
}

impl VolatilityModel {
    pub fn new(settings: LifecycleSettings, collaborators: Collaborators) -> Self {
        Self {
            settings,
            collaborators,
            state: ModelState::Uninitialized,
        }
    }

    pub fn state(&self) -> ModelStateKind {
        self.state.kind()
    }

    /// Ticker the instance is working on, once known.
    pub fn symbol(&self) -> Option<&Symbol> {
        match &self.state {
            ModelState::Uninitialized => None,
            ModelState::DataReady { series } => Some(&series.symbol),
            ModelState::Fitted { symbol, .. } | ModelState::Loaded { symbol, .. } => Some(symbol),
        }
    }

    /// Return series awaiting a fit.
    pub fn series(&self) -> Option<&ReturnSeries> {
        match &self.state {
            ModelState::DataReady { series } => Some(series),
            _ => None,
        }
    }

    pub fn fit_summary(&self) -> Option<FitSummary> {
        self.model().map(FittedModel::summary)
    }

    /// Artifact the instance was loaded from, in the `Loaded` state.
    pub fn artifact_id(&self) -> Option<&ArtifactId> {
        match &self.state {
            ModelState::Loaded { artifact_id, .. } => Some(artifact_id),
            _ => None,
        }
    }

    fn model(&self) -> Option<&FittedModel> {
        match &self.state {
            ModelState::Fitted { model, .. } | ModelState::Loaded { model, .. } => Some(model),
            _ => None,
        }
    }

    fn invalid_state(&self, operation: &'static str) -> VolatilityError {
        VolatilityError::InvalidState {
            operation,
            state: self.state.kind(),
        }
    }

    /// Build the return series for `symbol` from its stored price table.
    ///
    /// With `use_fresh_data` the full provider history first replaces the
    /// stored table. `window_size` bounds the read to the most recent rows;
    /// `0` reads the whole table. A shorter history than `window_size` is
    /// accepted; only the fit threshold rejects a series for length.
    pub async fn prepare_data(
        &mut self,
        symbol: &Symbol,
        use_fresh_data: bool,
        window_size: usize,
    ) -> Result<(), VolatilityError> {
        if matches!(self.state, ModelState::Loaded { .. }) {
            return Err(self.invalid_state("prepare_data"));
        }

        if use_fresh_data {
            self.refresh_prices(symbol).await?;
        }

        let limit = (window_size > 0).then_some(window_size);
        let prices = Arc::clone(&self.collaborators.prices);
        let read_symbol = symbol.clone();
        let bars = self
            .run_storage("price table read", move || {
                prices.read_recent(&read_symbol, limit)
            })
            .await?;
        debug!(
            symbol = symbol.as_str(),
            window_size,
            rows = bars.len(),
            "price window loaded"
        );

        if bars.len() < 2 {
            return Err(VolatilityError::InsufficientData {
                required: 2,
                available: bars.len(),
            });
        }

        let series = build_returns(symbol, &bars, window_size)?;
        self.state = ModelState::DataReady { series };
        Ok(())
    }

    async fn refresh_prices(&self, symbol: &Symbol) -> Result<(), VolatilityError> {
        let provider = &self.collaborators.provider;
        let fetch = provider.fetch_daily_history(symbol, OutputSize::Full);
        let bars = match tokio::time::timeout(self.settings.provider_timeout, fetch).await {
            Ok(Ok(bars)) => bars,
            Ok(Err(error)) => return Err(VolatilityError::from_source(symbol, error)),
            Err(_) => {
                return Err(VolatilityError::data_acquisition(
                    symbol,
                    format!(
                        "{} did not respond within {} ms",
                        provider.name(),
                        self.settings.provider_timeout.as_millis()
                    ),
                ))
            }
        };

        if bars.is_empty() {
            return Err(VolatilityError::data_acquisition(
                symbol,
                format!("{} returned no daily bars", provider.name()),
            ));
        }

        let prices = Arc::clone(&self.collaborators.prices);
        let write_symbol = symbol.clone();
        let report = self
            .run_storage("price table replace", move || {
                prices.write(&write_symbol, &bars, WriteMode::Replace)
            })
            .await?;
        info!(
            symbol = symbol.as_str(),
            provider = provider.name(),
            rows = report.inserted,
            "price table refreshed"
        );
        Ok(())
    }

    /// Fit GARCH(`p`, `q`) to the prepared series.
    ///
    /// The series is consumed by the attempt: on any failure the instance is
    /// back in `Uninitialized` and `prepare_data` must run again.
    pub async fn fit(&mut self, p: usize, q: usize) -> Result<(), VolatilityError> {
        let series = match std::mem::replace(&mut self.state, ModelState::Uninitialized) {
            ModelState::DataReady { series } => series,
            other => {
                self.state = other;
                return Err(self.invalid_state("fit"));
            }
        };

        let order = GarchOrder::new(p, q);
        let required = self.settings.min_observations.max(order.min_observations());
        if series.len() < required {
            return Err(VolatilityError::InsufficientData {
                required,
                available: series.len(),
            });
        }

        let engine = Arc::clone(&self.collaborators.engine);
        let symbol = series.symbol.clone();
        let model = tokio::task::spawn_blocking(move || engine.fit(&series, order))
            .await
            .map_err(|error| VolatilityError::ModelFit(format!("fitting task failed: {error}")))??;

        info!(
            symbol = symbol.as_str(),
            p,
            q,
            nobs = model.nobs(),
            aic = model.aic(),
            bic = model.bic(),
            "model fitted"
        );
        self.state = ModelState::Fitted { symbol, model };
        Ok(())
    }

    /// Persist the fitted model as a new artifact.
    pub async fn persist(&self) -> Result<ArtifactId, VolatilityError> {
        let ModelState::Fitted { symbol, model } = &self.state else {
            return Err(self.invalid_state("persist"));
        };

        let bytes = model.to_bytes()?;
        let artifacts = Arc::clone(&self.collaborators.artifacts);
        let save_symbol = symbol.clone();
        let id = self
            .run_storage("artifact save", move || artifacts.save(&save_symbol, &bytes))
            .await?;
        info!(symbol = symbol.as_str(), artifact_id = %id, "model persisted");
        Ok(id)
    }

    /// Load the most recent artifact for `symbol`.
    pub async fn load_latest(&mut self, symbol: &Symbol) -> Result<(), VolatilityError> {
        if matches!(
            self.state,
            ModelState::DataReady { .. } | ModelState::Fitted { .. }
        ) {
            return Err(self.invalid_state("load_latest"));
        }

        let artifacts = Arc::clone(&self.collaborators.artifacts);
        let lookup_symbol = symbol.clone();
        let artifact = self
            .run_storage("artifact lookup", move || artifacts.latest(&lookup_symbol))
            .await?
            .ok_or_else(|| VolatilityError::ModelNotFound {
                symbol: symbol.to_string(),
            })?;

        let model = FittedModel::from_bytes(&artifact.serialized_model)?;
        info!(
            symbol = symbol.as_str(),
            artifact_id = %artifact.id,
            anchor = %model.anchor(),
            "model loaded"
        );
        self.state = ModelState::Loaded {
            artifact_id: artifact.id,
            symbol: artifact.ticker,
            model,
        };
        Ok(())
    }

    /// Volatility for the next `horizon` business days after the model's
    /// last observation.
    pub fn forecast_volatility(&self, horizon: usize) -> Result<Forecast, VolatilityError> {
        if horizon == 0 || horizon > MAX_FORECAST_HORIZON {
            return Err(VolatilityError::InvalidArgument(format!(
                "horizon must be between 1 and {MAX_FORECAST_HORIZON} business days, got {horizon}"
            )));
        }
        let model = self
            .model()
            .ok_or_else(|| self.invalid_state("forecast_volatility"))?;

        let variances = self
            .collaborators
            .engine
            .forecast_variance(model, horizon)?;
        if variances.len() != horizon {
            return Err(VolatilityError::ModelFit(format!(
                "engine returned {} forecast steps for a horizon of {horizon}",
                variances.len()
            )));
        }

        let forecast = format_forecast(&variances, model.anchor())?;
        debug!(horizon, anchor = %model.anchor(), "forecast produced");
        Ok(forecast)
    }

    async fn run_storage<T, F>(&self, operation: &'static str, task: F) -> Result<T, VolatilityError>
    where
        F: FnOnce() -> Result<T, VolatilityError> + Send + 'static,
        T: Send + 'static,
    {
        let timeout = self.settings.storage_timeout;
        match tokio::time::timeout(timeout, tokio::task::spawn_blocking(task)).await {
            Ok(Ok(result)) => result,
            Ok(Err(error)) => Err(VolatilityError::Persistence(format!(
                "{operation} failed: {error}"
            ))),
            Err(_) => Err(VolatilityError::Persistence(format!(
                "{operation} did not complete within {} ms",
                timeout.as_millis()
            ))),
        }
    }
}
