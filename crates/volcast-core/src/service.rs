//! Request/response boundary over [`VolatilityModel`].
//!
//! Every lifecycle failure is collapsed into `success: false` plus the error
//! text; callers never see a `VolatilityError` from here.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::artifacts::ArtifactId;
use crate::forecast::Forecast;
use crate::model::{Collaborators, LifecycleSettings, VolatilityModel};
use crate::{Symbol, VolatilityError, VolcastConfig};

pub const DEFAULT_WINDOW_SIZE: usize = 2_000;
pub const DEFAULT_HORIZON_DAYS: usize = 5;

const FORECAST_MESSAGE: &str = "Forecast generated";

fn default_window_size() -> usize {
    DEFAULT_WINDOW_SIZE
}

fn default_lag() -> usize {
    1
}

fn default_horizon_days() -> usize {
    DEFAULT_HORIZON_DAYS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FitRequest {
    pub ticker: String,
    #[serde(default, alias = "use_new_data")]
    pub use_fresh_data: bool,
    #[serde(default = "default_window_size", alias = "n_observations")]
    pub window_size: usize,
    #[serde(default = "default_lag")]
    pub p: usize,
    #[serde(default = "default_lag")]
    pub q: usize,
}

impl FitRequest {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            use_fresh_data: false,
            window_size: DEFAULT_WINDOW_SIZE,
            p: 1,
            q: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitResponse {
    #[serde(flatten)]
    pub request: FitRequest,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictRequest {
    pub ticker: String,
    #[serde(default = "default_horizon_days", alias = "n_days")]
    pub horizon_days: usize,
}

impl PredictRequest {
    pub fn new(ticker: impl Into<String>, horizon_days: usize) -> Self {
        Self {
            ticker: ticker.into(),
            horizon_days,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictResponse {
    #[serde(flatten)]
    pub request: PredictRequest,
    pub success: bool,
    pub message: String,
    pub forecast: Forecast,
}

/// Listing of the stored artifacts for one ticker, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactListing {
    pub ticker: String,
    pub success: bool,
    pub message: String,
    pub artifacts: Vec<String>,
}

/// Thin adapter that drives one [`VolatilityModel`] per request.
#[derive(Clone)]
pub struct VolatilityService {
    settings: LifecycleSettings,
    collaborators: Collaborators,
}

impl VolatilityService {
    pub fn new(config: &VolcastConfig, collaborators: Collaborators) -> Self {
        Self {
            settings: LifecycleSettings::from(config),
            collaborators,
        }
    }

    fn lifecycle(&self) -> VolatilityModel {
        VolatilityModel::new(self.settings, self.collaborators.clone())
    }

    /// Prepare, fit and persist. The message names the saved artifact.
    pub async fn fit(&self, request: FitRequest) -> FitResponse {
        match self.run_fit(&request).await {
            Ok(id) => FitResponse {
                message: format!("Model saved as '{id}'"),
                artifact_id: Some(id.to_string()),
                success: true,
                request,
            },
            Err(error) => {
                warn!(ticker = request.ticker.as_str(), code = error.code(), %error, "fit failed");
                FitResponse {
                    message: error.to_string(),
                    artifact_id: None,
                    success: false,
                    request,
                }
            }
        }
    }

    async fn run_fit(&self, request: &FitRequest) -> Result<ArtifactId, VolatilityError> {
        let symbol = parse_ticker(&request.ticker)?;
        let mut model = self.lifecycle();
        model
            .prepare_data(&symbol, request.use_fresh_data, request.window_size)
            .await?;
        model.fit(request.p, request.q).await?;
        model.persist().await
    }

    /// Load the latest artifact and forecast `horizon_days` ahead.
    pub async fn predict(&self, request: PredictRequest) -> PredictResponse {
        match self.run_predict(&request).await {
            Ok(forecast) => {
                info!(
                    ticker = request.ticker.as_str(),
                    horizon_days = request.horizon_days,
                    "forecast served"
                );
                PredictResponse {
                    message: String::from(FORECAST_MESSAGE),
                    success: true,
                    forecast,
                    request,
                }
            }
            Err(error) => {
                warn!(ticker = request.ticker.as_str(), code = error.code(), %error, "predict failed");
                PredictResponse {
                    message: error.to_string(),
                    success: false,
                    forecast: Forecast::default(),
                    request,
                }
            }
        }
    }

    async fn run_predict(&self, request: &PredictRequest) -> Result<Forecast, VolatilityError> {
        let symbol = parse_ticker(&request.ticker)?;
        let mut model = self.lifecycle();
        model.load_latest(&symbol).await?;
        model.forecast_volatility(request.horizon_days)
    }

    pub async fn list_artifacts(&self, ticker: &str) -> ArtifactListing {
        let listed = match parse_ticker(ticker) {
            Ok(symbol) => {
                let artifacts = std::sync::Arc::clone(&self.collaborators.artifacts);
                tokio::task::spawn_blocking(move || artifacts.list_artifacts(&symbol))
                    .await
                    .map_err(|error| {
                        VolatilityError::Persistence(format!("artifact listing failed: {error}"))
                    })
                    .and_then(|result| result)
            }
            Err(error) => Err(error),
        };

        match listed {
            Ok(ids) => ArtifactListing {
                ticker: ticker.to_string(),
                success: true,
                message: format!("{} artifact(s)", ids.len()),
                artifacts: ids.iter().map(ToString::to_string).collect(),
            },
            Err(error) => ArtifactListing {
                ticker: ticker.to_string(),
                success: false,
                message: error.to_string(),
                artifacts: Vec::new(),
            },
        }
    }
}

fn parse_ticker(ticker: &str) -> Result<Symbol, VolatilityError> {
    Symbol::parse(ticker)
        .map_err(|error| VolatilityError::InvalidArgument(format!("invalid ticker: {error}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_request_accepts_legacy_field_names() {
        let request: FitRequest = serde_json::from_str(
            r#"{"ticker":"AAPL","use_new_data":true,"n_observations":500,"p":2,"q":1}"#,
        )
        .expect("request");
        assert!(request.use_fresh_data);
        assert_eq!(request.window_size, 500);
        assert_eq!((request.p, request.q), (2, 1));
    }

    #[test]
    fn fit_request_defaults() {
        let request: FitRequest = serde_json::from_str(r#"{"ticker":"AAPL"}"#).expect("request");
        assert_eq!(request, FitRequest::new("AAPL"));
    }

    #[test]
    fn predict_request_accepts_n_days() {
        let request: PredictRequest =
            serde_json::from_str(r#"{"ticker":"MSFT","n_days":3}"#).expect("request");
        assert_eq!(request, PredictRequest::new("MSFT", 3));
    }

    #[test]
    fn failed_predict_serializes_empty_forecast_object() {
        let response = PredictResponse {
            request: PredictRequest::new("MSFT", 3),
            success: false,
            message: String::from("no model with MSFT name"),
            forecast: Forecast::default(),
        };
        let value = serde_json::to_value(&response).expect("json");
        assert_eq!(value["forecast"], serde_json::json!({}));
        assert_eq!(value["horizon_days"], 3);
        assert_eq!(value["success"], false);
    }
}
