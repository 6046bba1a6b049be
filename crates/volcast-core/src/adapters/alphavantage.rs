use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, warn};

use crate::circuit_breaker::CircuitBreaker;
use crate::data_source::{MarketDataProvider, OutputSize, SourceError};
use crate::domain::parse_date;
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::provider_policy::ProviderPolicy;
use crate::throttling::RequestBudget;
use crate::{PriceBar, Symbol, VolcastConfig};

const BASE_URL: &str = "https://www.alphavantage.co/query";
const DAILY_SERIES_KEY: &str = "Time Series (Daily)";

/// Alpha Vantage `TIME_SERIES_DAILY` adapter.
#[derive(Clone)]
pub struct AlphaVantageAdapter {
    http_client: Arc<dyn HttpClient>,
    api_key: Option<String>,
    circuit_breaker: Arc<CircuitBreaker>,
    budget: RequestBudget,
    request_timeout: Duration,
}

impl AlphaVantageAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, api_key: Option<String>) -> Self {
        Self::with_policy(http_client, api_key, &ProviderPolicy::alphavantage_default())
    }

    pub fn with_policy(
        http_client: Arc<dyn HttpClient>,
        api_key: Option<String>,
        policy: &ProviderPolicy,
    ) -> Self {
        Self {
            http_client,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            circuit_breaker: Arc::new(CircuitBreaker::new(policy.circuit)),
            budget: RequestBudget::from_policy(policy),
            request_timeout: policy.request_timeout,
        }
    }

    /// Production adapter: reqwest transport, key and timeout from `config`.
    pub fn from_config(config: &VolcastConfig) -> Self {
        let policy =
            ProviderPolicy::alphavantage_default().with_request_timeout(config.provider_timeout);
        Self::with_policy(
            Arc::new(ReqwestHttpClient::new()),
            config.alphavantage_api_key.clone(),
            &policy,
        )
    }

    fn daily_url(&self, symbol: &Symbol, size: OutputSize, api_key: &str) -> String {
        format!(
            "{BASE_URL}?function=TIME_SERIES_DAILY&symbol={}&outputsize={}&apikey={}",
            urlencoding::encode(symbol.as_str()),
            size.as_str(),
            urlencoding::encode(api_key)
        )
    }

    async fn fetch_daily(
        &self,
        symbol: &Symbol,
        size: OutputSize,
    ) -> Result<Vec<PriceBar>, SourceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SourceError::missing_credentials("alphavantage"))?;

        if !self.circuit_breaker.allow_request() {
            return Err(SourceError::unavailable(
                "alphavantage circuit breaker is open; skipping upstream call",
            ));
        }

        if let Err(delay) = self.budget.acquire() {
            warn!(
                symbol = symbol.as_str(),
                retry_in_s = delay.as_secs_f64(),
                "alphavantage request budget exhausted"
            );
            return Err(SourceError::rate_limited(format!(
                "alphavantage free-tier limit exceeded; retry in {:.2}s",
                delay.as_secs_f64()
            )));
        }

        let timeout_ms = u64::try_from(self.request_timeout.as_millis()).unwrap_or(u64::MAX);
        let request = HttpRequest::get(self.daily_url(symbol, size, api_key))
            .with_header("accept", "application/json")
            .with_timeout_ms(timeout_ms);
        debug!(url = %request.redacted_url(), "requesting daily history");

        let response = self.http_client.execute(request).await.map_err(|error| {
            self.circuit_breaker.record_failure();
            if error.retryable() {
                SourceError::unavailable(format!(
                    "alphavantage transport error: {}",
                    error.message()
                ))
            } else {
                SourceError::internal(format!("alphavantage transport error: {}", error.message()))
            }
        })?;

        if !response.is_success() {
            self.circuit_breaker.record_failure();
            return Err(SourceError::unavailable(format!(
                "alphavantage returned status {}",
                response.status
            )));
        }
        self.circuit_breaker.record_success();

        let bars = parse_daily_payload(&response.body)?;
        debug!(
            symbol = symbol.as_str(),
            size = size.as_str(),
            bars = bars.len(),
            "daily history received"
        );
        Ok(bars)
    }
}

impl MarketDataProvider for AlphaVantageAdapter {
    fn name(&self) -> &'static str {
        "alphavantage"
    }

    fn fetch_daily_history<'a>(
        &'a self,
        symbol: &'a Symbol,
        size: OutputSize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PriceBar>, SourceError>> + Send + 'a>> {
        Box::pin(self.fetch_daily(symbol, size))
    }
}

#[derive(Debug, Deserialize)]
struct DailyBar {
    #[serde(rename = "1. open", deserialize_with = "number_or_string")]
    open: f64,
    #[serde(rename = "2. high", deserialize_with = "number_or_string")]
    high: f64,
    #[serde(rename = "3. low", deserialize_with = "number_or_string")]
    low: f64,
    #[serde(rename = "4. close", deserialize_with = "number_or_string")]
    close: f64,
    #[serde(rename = "5. volume", deserialize_with = "number_or_string")]
    volume: f64,
}

/// Alpha Vantage quotes every number as a string.
fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(number) => number
            .as_f64()
            .ok_or_else(|| D::Error::custom("number out of range")),
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| D::Error::custom(format!("'{text}' is not a number"))),
        other => Err(D::Error::custom(format!("expected a number, got {other}"))),
    }
}

/// Decode a `TIME_SERIES_DAILY` body into bars, oldest first.
fn parse_daily_payload(body: &str) -> Result<Vec<PriceBar>, SourceError> {
    let payload: BTreeMap<String, Value> = serde_json::from_str(body).map_err(|error| {
        SourceError::internal(format!("failed to parse alphavantage response: {error}"))
    })?;

    let Some(series) = payload.get(DAILY_SERIES_KEY) else {
        if let Some(note) = payload
            .get("Note")
            .or_else(|| payload.get("Information"))
            .and_then(Value::as_str)
        {
            return Err(SourceError::rate_limited(format!(
                "alphavantage declined the request: {note}"
            )));
        }
        let detail = payload
            .get("Error Message")
            .and_then(Value::as_str)
            .unwrap_or("no daily series in response");
        return Err(SourceError::invalid_request(format!(
            "invalid API call, check your ticker: {detail}"
        )));
    };

    let raw: BTreeMap<String, DailyBar> = serde_json::from_value(series.clone())
        .map_err(|error| SourceError::internal(format!("malformed daily series: {error}")))?;

    let mut bars = raw
        .into_iter()
        .map(|(date, bar)| {
            let date = parse_date(&date)
                .map_err(|error| SourceError::internal(format!("malformed daily series: {error}")))?;
            PriceBar::new(date, bar.open, bar.high, bar.low, bar.close, bar.volume)
                .map_err(|error| SourceError::internal(format!("malformed bar {date}: {error}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    bars.sort_by_key(|bar| bar.date);
    Ok(bars)
}
