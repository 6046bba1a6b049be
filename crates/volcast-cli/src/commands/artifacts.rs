use volcast_core::VolatilityService;

use crate::cli::ArtifactsArgs;
use crate::error::CliError;

use super::CommandOutcome;

pub async fn run(
    args: &ArtifactsArgs,
    service: &VolatilityService,
) -> Result<CommandOutcome, CliError> {
    let listing = service.list_artifacts(&args.ticker).await;
    let success = listing.success;
    Ok(CommandOutcome::reported(
        serde_json::to_value(listing)?,
        success,
    ))
}
