use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use homelog::cli::{self, Cli};
use homelog::config::Settings;
use homelog::logging;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            // Logging is configured from this file, so report it directly.
            eprintln!("homelog: {e}");
            return ExitCode::FAILURE;
        }
    };
    logging::init(&settings.logging);

    match cli::run(cli, settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
