//! CLI argument definitions for volcast.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `fit` | Prepare data, fit GARCH(p, q) and save the model |
//! | `predict` | Forecast volatility from the latest saved model |
//! | `artifacts` | List saved models for a ticker |
//! | `serve` | Run the HTTP API |
//!
//! # Examples
//!
//! ```bash
//! # Download full history and fit GARCH(1, 1) on the last 2000 returns
//! volcast fit AAPL --fresh
//!
//! # Five business days of volatility
//! volcast predict AAPL --horizon 5 --pretty
//!
//! # HTTP API on port 8000
//! volcast serve --bind 0.0.0.0:8000
//! ```

use std::net::SocketAddr;

use clap::{Args, Parser, Subcommand};
use volcast_core::service::{DEFAULT_HORIZON_DAYS, DEFAULT_WINDOW_SIZE};

/// GARCH volatility forecasting for daily equity prices.
#[derive(Debug, Parser)]
#[command(
    name = "volcast",
    author,
    version,
    about = "GARCH volatility forecasting for daily equity prices",
    long_about = "volcast fits GARCH(p, q) models to daily percentage returns, keeps every \
fitted model as a timestamped artifact, and serves business-day volatility forecasts.\n\
\n\
Configuration is read from VOLCAST_* environment variables; logs go to stderr \
(RUST_LOG controls the level) and results are printed to stdout as JSON."
)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit a model for a ticker and save it.
    ///
    /// # Examples
    ///
    ///   volcast fit AAPL
    ///   volcast fit AAPL --fresh --window 1000 -p 2 -q 1
    Fit(FitArgs),

    /// Forecast volatility from the latest saved model.
    ///
    /// # Examples
    ///
    ///   volcast predict AAPL
    ///   volcast predict AAPL --horizon 10
    Predict(PredictArgs),

    /// List saved models for a ticker, oldest first.
    Artifacts(ArtifactsArgs),

    /// Serve the fit/predict API over HTTP.
    Serve(ServeArgs),
}

#[derive(Debug, Args)]
pub struct FitArgs {
    /// Ticker symbol (e.g. AAPL).
    pub ticker: String,

    /// Download the full provider history before fitting.
    #[arg(long, default_value_t = false)]
    pub fresh: bool,

    /// Most recent price rows to fit on (0 = all stored rows).
    #[arg(long, default_value_t = DEFAULT_WINDOW_SIZE)]
    pub window: usize,

    /// ARCH lags.
    #[arg(short = 'p', default_value_t = 1)]
    pub p: usize,

    /// GARCH lags.
    #[arg(short = 'q', default_value_t = 1)]
    pub q: usize,
}

#[derive(Debug, Args)]
pub struct PredictArgs {
    pub ticker: String,

    /// Business days to forecast.
    #[arg(long, default_value_t = DEFAULT_HORIZON_DAYS)]
    pub horizon: usize,
}

#[derive(Debug, Args)]
pub struct ArtifactsArgs {
    pub ticker: String,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:8000")]
    pub bind: SocketAddr,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn fit_flags_parse() {
        let cli = Cli::try_parse_from([
            "volcast", "fit", "AAPL", "--fresh", "--window", "500", "-p", "2", "-q", "1",
        ])
        .expect("parse");
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert!(args.fresh);
        assert_eq!(args.window, 500);
        assert_eq!((args.p, args.q), (2, 1));
    }

    #[test]
    fn predict_defaults_horizon() {
        let cli = Cli::try_parse_from(["volcast", "--pretty", "predict", "MSFT"]).expect("parse");
        assert!(cli.pretty);
        let Command::Predict(args) = cli.command else {
            panic!("expected predict");
        };
        assert_eq!(args.horizon, DEFAULT_HORIZON_DAYS);
    }
}
