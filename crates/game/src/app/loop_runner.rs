use std::process::ExitCode;

use engine::{load_assets, run_app};
use tracing::{error, warn};

use super::bootstrap::AppWiring;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let assets = match load_assets(&app.level, &app.asset_root) {
        Ok(assets) => assets,
        Err(err) => {
            error!(error = %err, "startup_failed");
            return ExitCode::FAILURE;
        }
    };
    if !assets.layer_failures.is_empty() {
        warn!(blank_layers = assets.layer_failures.len(), "running_with_blank_layers");
    }

    if let Err(err) = run_app(app.config, &app.level, assets) {
        error!(error = %err, "startup_failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
