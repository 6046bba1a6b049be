use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Circuit state for upstream provider calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,
    /// How long an open circuit rejects calls before allowing one probe.
    pub open_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            open_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
struct Circuit {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

/// Thread-safe breaker shared by every call an adapter makes.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    circuit: Mutex<Circuit>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            circuit: Mutex::new(Circuit {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
            }),
        }
    }

    // A panic while holding the lock cannot leave the counters inconsistent.
    fn lock(&self) -> MutexGuard<'_, Circuit> {
        self.circuit
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Whether a call may proceed. An open circuit past its timeout moves to
    /// half-open and admits a single probe.
    pub fn allow_request(&self) -> bool {
        let mut circuit = self.lock();
        if circuit.state != CircuitState::Open {
            return true;
        }

        let probe_due = circuit
            .opened_at
            .is_some_and(|opened_at| opened_at.elapsed() >= self.config.open_timeout);
        if probe_due {
            circuit.state = CircuitState::HalfOpen;
            circuit.opened_at = None;
        }
        probe_due
    }

    pub fn record_success(&self) {
        let mut circuit = self.lock();
        circuit.state = CircuitState::Closed;
        circuit.consecutive_failures = 0;
        circuit.opened_at = None;
    }

    pub fn record_failure(&self) {
        let mut circuit = self.lock();
        circuit.consecutive_failures = circuit.consecutive_failures.saturating_add(1);

        let trip = circuit.state == CircuitState::HalfOpen
            || circuit.consecutive_failures >= self.config.failure_threshold;
        if trip {
            circuit.state = CircuitState::Open;
            circuit.opened_at = Some(Instant::now());
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }
}
