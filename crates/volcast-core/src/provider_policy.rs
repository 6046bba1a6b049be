use std::time::Duration;

use crate::circuit_breaker::CircuitBreakerConfig;

/// Request budget and failure handling for one market-data provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderPolicy {
    pub provider: &'static str,
    pub quota_window: Duration,
    pub quota_limit: u32,
    pub retry_backoff: BackoffPolicy,
    pub circuit: CircuitBreakerConfig,
    /// Per-request transport timeout.
    pub request_timeout: Duration,
}

/// Suggested delay schedule reported to callers when the quota is spent.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub max_retries: u32,
}

impl ProviderPolicy {
    /// Alpha Vantage free tier: five calls per minute.
    pub fn alphavantage_default() -> Self {
        Self {
            provider: "alphavantage",
            quota_window: Duration::from_secs(60),
            quota_limit: 5,
            retry_backoff: BackoffPolicy {
                initial_delay: Duration::from_secs(12),
                max_delay: Duration::from_secs(60),
                multiplier: 2.0,
                max_retries: 3,
            },
            circuit: CircuitBreakerConfig::default(),
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
