use volcast_core::{PredictRequest, VolatilityService};

use crate::cli::PredictArgs;
use crate::error::CliError;

use super::CommandOutcome;

pub async fn run(
    args: &PredictArgs,
    service: &VolatilityService,
) -> Result<CommandOutcome, CliError> {
    let response = service
        .predict(PredictRequest::new(args.ticker.clone(), args.horizon))
        .await;
    let success = response.success;
    Ok(CommandOutcome::reported(
        serde_json::to_value(response)?,
        success,
    ))
}
