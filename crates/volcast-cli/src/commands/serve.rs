//! HTTP boundary. Every response is `200 OK` with a JSON body; failures are
//! reported through `success: false`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::info;
use volcast_core::{FitRequest, PredictRequest, VolatilityService};

use crate::cli::ServeArgs;
use crate::error::CliError;

use super::CommandOutcome;

const WELCOME_MESSAGE: &str = "Welcome to the GARCH model API";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    service: VolatilityService,
    fit_locks: TickerLocks,
}

/// One async mutex per ticker so concurrent fits of the same ticker run one
/// at a time. Different tickers proceed in parallel.
#[derive(Clone, Default)]
struct TickerLocks {
    locks: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl TickerLocks {
    fn for_ticker(&self, ticker: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(
            locks
                .entry(ticker.trim().to_ascii_uppercase())
                .or_default(),
        )
    }
}

pub async fn run(args: &ServeArgs, service: VolatilityService) -> Result<CommandOutcome, CliError> {
    let app = router(service);

    info!("Registering routes:");
    info!("  GET  /");
    info!("  POST /fit");
    info!("  GET  /predict?ticker=AAPL&horizon_days=5");
    info!("  POST /predict");

    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    info!(addr = %args.bind, "Server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(CommandOutcome::silent())
}

pub fn router(service: VolatilityService) -> Router {
    let state = AppState {
        service,
        fit_locks: TickerLocks::default(),
    };

    Router::new()
        .route("/", get(welcome_handler))
        .route("/fit", post(fit_handler))
        .route("/predict", get(predict_query_handler).post(predict_json_handler))
        .with_state(state)
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

async fn welcome_handler() -> Json<Value> {
    Json(json!({ "message": WELCOME_MESSAGE }))
}

async fn fit_handler(
    State(state): State<AppState>,
    payload: Result<Json<FitRequest>, JsonRejection>,
) -> Json<Value> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return rejected(rejection.body_text()),
    };

    let lock = state.fit_locks.for_ticker(&request.ticker);
    let _guard = lock.lock().await;
    to_body(&state.service.fit(request).await)
}

async fn predict_query_handler(
    State(state): State<AppState>,
    query: Result<Query<PredictRequest>, QueryRejection>,
) -> Json<Value> {
    match query {
        Ok(Query(request)) => to_body(&state.service.predict(request).await),
        Err(rejection) => rejected(rejection.body_text()),
    }
}

async fn predict_json_handler(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Json<Value> {
    match payload {
        Ok(Json(request)) => to_body(&state.service.predict(request).await),
        Err(rejection) => rejected(rejection.body_text()),
    }
}

fn rejected(message: String) -> Json<Value> {
    Json(json!({ "success": false, "message": message }))
}

fn to_body<T: serde::Serialize>(response: &T) -> Json<Value> {
    match serde_json::to_value(response) {
        Ok(value) => Json(value),
        Err(error) => rejected(format!("response serialization failed: {error}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticker_locks_are_shared_per_ticker() {
        let locks = TickerLocks::default();
        let first = locks.for_ticker("aapl");
        let second = locks.for_ticker(" AAPL ");
        let other = locks.for_ticker("MSFT");

        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &other));
    }

    #[tokio::test]
    async fn welcome_message_matches_api_contract() {
        let Json(body) = welcome_handler().await;
        assert_eq!(body["message"], WELCOME_MESSAGE);
    }
}
