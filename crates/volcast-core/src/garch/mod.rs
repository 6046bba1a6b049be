//! # GARCH(p, q) fitting engine
//!
//! Constant-mean GARCH with Gaussian innovations:
//!
//! ```text
//! r_t  = μ + ε_t
//! σ²_t = ω + Σ_{i=1..p} α_i ε²_{t-i} + Σ_{j=1..q} β_j σ²_{t-j}
//! ```
//!
//! Parameters are estimated by maximum likelihood with a Nelder–Mead search
//! over an unconstrained reparametrisation: `ω = exp(x)` and the α/β
//! coefficients are softmax shares with a slack term, so every candidate
//! satisfies `ω > 0`, `α, β ≥ 0`, `Σα + Σβ < 1`. Pre-sample terms are
//! backcast to the sample variance of the residuals.
//!
//! Forecasts use the analytic recursion with `E[ε²_{T+k}] = σ²_{T+k}` for
//! future steps.

mod optimizer;

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use time::Date;
use tracing::debug;

pub use optimizer::{nelder_mead, NelderMeadOptions, OptimisationResult};

use crate::domain::iso_date;
use crate::{GarchOrder, ReturnSeries, VolatilityError};

/// Largest supported ARCH or GARCH lag.
pub const MAX_LAG: usize = 10;

const FORMAT_VERSION: u32 = 1;
const SHARE_LOGIT_BOUND: f64 = 50.0;
const MIN_VARIANCE: f64 = 1e-12;

/// Statistical fitting collaborator.
///
/// The lifecycle only depends on this seam, so alternative estimators (or
/// deterministic fakes in tests) can be substituted.
pub trait GarchEngine: Send + Sync {
    /// Estimate a GARCH(p, q) model from `series`.
    fn fit(&self, series: &ReturnSeries, order: GarchOrder)
        -> Result<FittedModel, VolatilityError>;

    /// Variance forecasts for steps `1..=horizon` after the model's anchor.
    fn forecast_variance(
        &self,
        model: &FittedModel,
        horizon: usize,
    ) -> Result<Vec<f64>, VolatilityError> {
        Ok(model.forecast_variance(horizon))
    }
}

/// Fitted model handle.
///
/// Carries the estimated parameters, diagnostics and the tail state needed to
/// forecast without the original return series. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    format_version: u32,
    order: GarchOrder,
    mu: f64,
    omega: f64,
    alpha: Vec<f64>,
    beta: Vec<f64>,
    log_likelihood: f64,
    nobs: usize,
    iterations: usize,
    #[serde(with = "iso_date")]
    anchor: Date,
    /// Last `p` squared residuals, oldest first.
    tail_squared_residuals: Vec<f64>,
    /// Last `q` conditional variances, oldest first.
    tail_variances: Vec<f64>,
}

/// Parameters and diagnostics of a fitted model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitSummary {
    pub p: usize,
    pub q: usize,
    pub mu: f64,
    pub omega: f64,
    pub alpha: Vec<f64>,
    pub beta: Vec<f64>,
    pub log_likelihood: f64,
    pub aic: f64,
    pub bic: f64,
    pub nobs: usize,
    pub iterations: usize,
    pub persistence: f64,
    pub unconditional_variance: Option<f64>,
    #[serde(with = "iso_date")]
    pub anchor: Date,
}

impl FittedModel {
    pub const fn order(&self) -> GarchOrder {
        self.order
    }

    pub const fn anchor(&self) -> Date {
        self.anchor
    }

    pub const fn mu(&self) -> f64 {
        self.mu
    }

    pub const fn omega(&self) -> f64 {
        self.omega
    }

    pub fn alpha(&self) -> &[f64] {
        &self.alpha
    }

    pub fn beta(&self) -> &[f64] {
        &self.beta
    }

    pub const fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    pub const fn nobs(&self) -> usize {
        self.nobs
    }

    pub fn parameter_count(&self) -> usize {
        2 + self.alpha.len() + self.beta.len()
    }

    pub fn aic(&self) -> f64 {
        2.0 * self.parameter_count() as f64 - 2.0 * self.log_likelihood
    }

    pub fn bic(&self) -> f64 {
        self.parameter_count() as f64 * (self.nobs as f64).ln() - 2.0 * self.log_likelihood
    }

    pub fn persistence(&self) -> f64 {
        self.alpha.iter().sum::<f64>() + self.beta.iter().sum::<f64>()
    }

    /// `ω / (1 - Σα - Σβ)`, when the process is covariance-stationary.
    pub fn unconditional_variance(&self) -> Option<f64> {
        let persistence = self.persistence();
        (persistence < 1.0).then(|| self.omega / (1.0 - persistence))
    }

    pub fn summary(&self) -> FitSummary {
        FitSummary {
            p: self.order.p,
            q: self.order.q,
            mu: self.mu,
            omega: self.omega,
            alpha: self.alpha.clone(),
            beta: self.beta.clone(),
            log_likelihood: self.log_likelihood,
            aic: self.aic(),
            bic: self.bic(),
            nobs: self.nobs,
            iterations: self.iterations,
            persistence: self.persistence(),
            unconditional_variance: self.unconditional_variance(),
            anchor: self.anchor,
        }
    }

    /// Analytic multi-step variance forecast for steps `1..=horizon`.
    pub fn forecast_variance(&self, horizon: usize) -> Vec<f64> {
        let mut squared_residuals = self.tail_squared_residuals.clone();
        let mut variances = self.tail_variances.clone();
        let mut forecasts = Vec::with_capacity(horizon);

        for _ in 0..horizon {
            let arch: f64 = self
                .alpha
                .iter()
                .zip(squared_residuals.iter().rev())
                .map(|(alpha, residual)| alpha * residual)
                .sum();
            let garch: f64 = self
                .beta
                .iter()
                .zip(variances.iter().rev())
                .map(|(beta, variance)| beta * variance)
                .sum();
            let next = self.omega + arch + garch;

            forecasts.push(next);
            squared_residuals.push(next);
            variances.push(next);
        }

        forecasts
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, VolatilityError> {
        serde_json::to_vec(self)
            .map_err(|error| VolatilityError::Persistence(format!("model encode failed: {error}")))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VolatilityError> {
        let model: Self = serde_json::from_slice(bytes).map_err(|error| {
            VolatilityError::Persistence(format!("model decode failed: {error}"))
        })?;

        if model.format_version != FORMAT_VERSION
            || model.alpha.len() != model.order.p
            || model.beta.len() != model.order.q
            || model.tail_squared_residuals.len() != model.order.p
            || model.tail_variances.len() != model.order.q
        {
            return Err(VolatilityError::Persistence(String::from(
                "model decode failed: inconsistent artifact contents",
            )));
        }

        Ok(model)
    }
}

/// Tunables for [`MaximumLikelihoodEngine`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineOptions {
    pub optimiser: NelderMeadOptions,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            optimiser: NelderMeadOptions::default(),
        }
    }
}

/// Gaussian maximum-likelihood estimator.
#[derive(Debug, Clone, Default)]
pub struct MaximumLikelihoodEngine {
    options: EngineOptions,
}

impl MaximumLikelihoodEngine {
    pub fn new(options: EngineOptions) -> Self {
        Self { options }
    }
}

impl GarchEngine for MaximumLikelihoodEngine {
    fn fit(
        &self,
        series: &ReturnSeries,
        order: GarchOrder,
    ) -> Result<FittedModel, VolatilityError> {
        validate_order(order)?;

        let anchor = series.last_date().ok_or(VolatilityError::InsufficientData {
            required: order.min_observations(),
            available: 0,
        })?;
        let returns = series.values();
        if returns.len() < order.min_observations() {
            return Err(VolatilityError::InsufficientData {
                required: order.min_observations(),
                available: returns.len(),
            });
        }
        if returns.iter().any(|value| !value.is_finite()) {
            return Err(VolatilityError::ModelFit(String::from(
                "return series contains non-finite values",
            )));
        }

        let mean = returns.iter().sum::<f64>() / returns.len() as f64;
        let variance = returns
            .iter()
            .map(|value| (value - mean).powi(2))
            .sum::<f64>()
            / returns.len() as f64;
        if !(variance > MIN_VARIANCE) {
            return Err(VolatilityError::ModelFit(String::from(
                "return series has zero variance",
            )));
        }

        let (start, steps) = initial_point(order, mean, variance);
        let objective = |x: &[f64]| {
            let params = Params::decode(x, order);
            -log_likelihood(&returns, &params, order).0
        };

        let first = nelder_mead(&objective, &start, &steps, &self.options.optimiser);
        // Restart from the best vertex with a fresh simplex to escape a collapsed one.
        let restart_steps: Vec<f64> = steps.iter().map(|step| step * 0.25).collect();
        let second = nelder_mead(&objective, &first.x, &restart_steps, &self.options.optimiser);
        let iterations = first.iterations + second.iterations;
        let best = if second.value <= first.value {
            second
        } else {
            first
        };
        debug!(
            p = order.p,
            q = order.q,
            iterations,
            nll = best.value,
            "optimiser finished"
        );

        if !best.value.is_finite() {
            return Err(VolatilityError::ModelFit(String::from(
                "log-likelihood is not finite at any candidate",
            )));
        }
        if !best.converged {
            return Err(VolatilityError::ModelFit(format!(
                "optimiser did not converge within {} iterations",
                self.options.optimiser.max_iterations
            )));
        }

        let params = Params::decode(&best.x, order);
        let (log_likelihood, residuals, variances) = log_likelihood(&returns, &params, order);
        if !log_likelihood.is_finite() {
            return Err(VolatilityError::ModelFit(String::from(
                "log-likelihood is not finite at the optimum",
            )));
        }

        let tail_squared_residuals = tail(&residuals, order.p)
            .iter()
            .map(|residual| residual * residual)
            .collect();
        let tail_variances = tail(&variances, order.q).to_vec();

        Ok(FittedModel {
            format_version: FORMAT_VERSION,
            order,
            mu: params.mu,
            omega: params.omega,
            alpha: params.alpha,
            beta: params.beta,
            log_likelihood,
            nobs: returns.len(),
            iterations,
            anchor,
            tail_squared_residuals,
            tail_variances,
        })
    }
}

fn validate_order(order: GarchOrder) -> Result<(), VolatilityError> {
    if order.p == 0 && order.q > 0 {
        return Err(VolatilityError::ModelFit(String::from(
            "GARCH lags require at least one ARCH lag (p >= 1 when q > 0)",
        )));
    }
    if order.p > MAX_LAG || order.q > MAX_LAG {
        return Err(VolatilityError::ModelFit(format!(
            "model order ({}, {}) exceeds the supported maximum of {MAX_LAG}",
            order.p, order.q
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
struct Params {
    mu: f64,
    omega: f64,
    alpha: Vec<f64>,
    beta: Vec<f64>,
}

impl Params {
    /// `x = [μ, ln ω, z_1..z_{p+q}]`; each coefficient is
    /// `exp(z_k) / (1 + Σ exp(z))`.
    fn decode(x: &[f64], order: GarchOrder) -> Self {
        let weights: Vec<f64> = x[2..]
            .iter()
            .map(|z| z.clamp(-SHARE_LOGIT_BOUND, SHARE_LOGIT_BOUND).exp())
            .collect();
        let denominator = 1.0 + weights.iter().sum::<f64>();
        let shares: Vec<f64> = weights.iter().map(|w| w / denominator).collect();

        Self {
            mu: x[0],
            omega: x[1].clamp(-700.0, 700.0).exp(),
            alpha: shares[..order.p].to_vec(),
            beta: shares[order.p..].to_vec(),
        }
    }
}

fn initial_point(order: GarchOrder, mean: f64, variance: f64) -> (Vec<f64>, Vec<f64>) {
    let (alpha_total, beta_total) = match (order.p, order.q) {
        (0, _) => (0.0, 0.0),
        (_, 0) => (0.2, 0.0),
        _ => (0.05, 0.9),
    };
    let shares: Vec<f64> = (0..order.p)
        .map(|_| alpha_total / order.p as f64)
        .chain((0..order.q).map(|_| beta_total / order.q as f64))
        .collect();
    let slack = 1.0 - alpha_total - beta_total;
    let omega = variance * slack.max(0.05);

    let mut start = vec![mean, omega.ln()];
    start.extend(shares.iter().map(|share| (share / slack).ln()));

    let mut steps = vec![0.1 * variance.sqrt(), 0.5];
    steps.extend(std::iter::repeat(0.5).take(shares.len()));
    (start, steps)
}

/// Gaussian log-likelihood plus the filtered residuals and conditional
/// variances. A non-finite likelihood is returned as `-inf`.
fn log_likelihood(returns: &[f64], params: &Params, order: GarchOrder) -> (f64, Vec<f64>, Vec<f64>) {
    let residuals: Vec<f64> = returns.iter().map(|value| value - params.mu).collect();
    let backcast = (residuals.iter().map(|e| e * e).sum::<f64>() / residuals.len() as f64)
        .max(MIN_VARIANCE);

    let mut variances = Vec::with_capacity(residuals.len());
    let mut total = 0.0;
    for t in 0..residuals.len() {
        let arch: f64 = (1..=order.p)
            .map(|lag| {
                let squared = if t >= lag {
                    residuals[t - lag] * residuals[t - lag]
                } else {
                    backcast
                };
                params.alpha[lag - 1] * squared
            })
            .sum();
        let garch: f64 = (1..=order.q)
            .map(|lag| {
                let previous = if t >= lag { variances[t - lag] } else { backcast };
                params.beta[lag - 1] * previous
            })
            .sum();

        let variance = (params.omega + arch + garch).max(MIN_VARIANCE);

        variances.push(variance);
        total += (2.0 * PI).ln() + variance.ln() + residuals[t] * residuals[t] / variance;
    }

    let value = -0.5 * total;
    let value = if value.is_finite() {
        value
    } else {
        f64::NEG_INFINITY
    };
    (value, residuals, variances)
}

fn tail(values: &[f64], count: usize) -> &[f64] {
    &values[values.len().saturating_sub(count)..]
}
