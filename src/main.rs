use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use heirloom::app::{self, EXIT_CONFIG, EXIT_FAILURE, RunError, RunOutcome};
use heirloom::config::{Cli, Config};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "heirloom=debug"
    } else {
        "heirloom=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match Config::from_cli(cli) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received; stopping after the current request");
                cancel.cancel();
            }
        }
    });

    let repo = config.repo.clone();
    match app::run(config, cancel)
        .await
        .with_context(|| format!("heirloom run against {repo} failed"))
    {
        Ok(RunOutcome::Scanned(_)) => ExitCode::SUCCESS,
        Ok(RunOutcome::Inspected(traversal)) => {
            print!("{}", app::render_inspection(&traversal));
            ExitCode::SUCCESS
        }
        Err(e) => {
            let code = e
                .downcast_ref::<RunError>()
                .map_or(EXIT_FAILURE, RunError::exit_code);
            error!("{e:#}");
            ExitCode::from(code)
        }
    }
}
