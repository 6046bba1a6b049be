use volcast_core::{FitRequest, VolatilityService};

use crate::cli::FitArgs;
use crate::error::CliError;

use super::CommandOutcome;

pub async fn run(args: &FitArgs, service: &VolatilityService) -> Result<CommandOutcome, CliError> {
    let request = FitRequest {
        ticker: args.ticker.clone(),
        use_fresh_data: args.fresh,
        window_size: args.window,
        p: args.p,
        q: args.q,
    };

    let response = service.fit(request).await;
    let success = response.success;
    Ok(CommandOutcome::reported(
        serde_json::to_value(response)?,
        success,
    ))
}
