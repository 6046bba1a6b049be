mod artifacts;
mod fit;
mod predict;
mod serve;

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;
use volcast_core::{
    AlphaVantageAdapter, Collaborators, FsArtifactStore, MaximumLikelihoodEngine,
    VolatilityService, VolcastConfig,
};
use volcast_warehouse::Warehouse;

use crate::cli::{Cli, Command};
use crate::error::CliError;

/// What a command printed and whether the service reported success.
pub struct CommandOutcome {
    pub data: Option<Value>,
    pub success: bool,
}

impl CommandOutcome {
    pub fn reported(data: Value, success: bool) -> Self {
        Self {
            data: Some(data),
            success,
        }
    }

    pub fn silent() -> Self {
        Self {
            data: None,
            success: true,
        }
    }
}

pub async fn run(cli: &Cli) -> Result<CommandOutcome, CliError> {
    let config = VolcastConfig::from_env()?;
    debug!(?config, "configuration loaded");
    let service = build_service(&config)?;

    match &cli.command {
        Command::Fit(args) => fit::run(args, &service).await,
        Command::Predict(args) => predict::run(args, &service).await,
        Command::Artifacts(args) => artifacts::run(args, &service).await,
        Command::Serve(args) => serve::run(args, service).await,
    }
}

fn build_service(config: &VolcastConfig) -> Result<VolatilityService, CliError> {
    let warehouse = Warehouse::open(config.warehouse_config())?;
    let collaborators = Collaborators {
        provider: Arc::new(AlphaVantageAdapter::from_config(config)),
        prices: Arc::new(warehouse),
        artifacts: Arc::new(FsArtifactStore::new(&config.model_dir)),
        engine: Arc::new(MaximumLikelihoodEngine::default()),
    };
    Ok(VolatilityService::new(config, collaborators))
}
