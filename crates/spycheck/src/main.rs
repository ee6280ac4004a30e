//! Application entry point.
//!
//! Loads settings, initializes logging, builds the platform process
//! monitor, and runs the supervisor until ctrl-c (or the game exiting
//! with auto-close enabled). Startup failures -- unreadable settings,
//! database migration, missing console log directory -- are fatal and
//! exit non-zero.

mod cli;
mod monitor;

use std::process::ExitCode;
use std::sync::Arc;

use spycheck_core::{CoreError, Settings, Supervisor};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::cli::CliArgs;
use crate::monitor::SysinfoMonitor;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    // Settings load first so the debug toggle can shape the default
    // filter; explicit flags and RUST_LOG still win.
    let mut settings = match Settings::load_or_create(&args.config_path) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("failed to load settings from {}: {err}", args.config_path.display());
            return ExitCode::FAILURE;
        }
    };
    if args.reprocess_log {
        settings.reprocess_log = true;
    }

    let default_filter = args.log_level.clone().unwrap_or_else(|| {
        if settings.debug_log {
            "debug".to_owned()
        } else {
            "info".to_owned()
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(true)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config_path.display(),
        tf2_dir = %settings.tf2_dir.display(),
        "spycheck starting"
    );

    match run(settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "fatal startup error");
            ExitCode::FAILURE
        }
    }
}

async fn run(settings: Settings) -> Result<(), CoreError> {
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received");
                cancel.cancel();
            }
        });
    }

    let supervisor =
        Supervisor::start(settings, Arc::new(SysinfoMonitor::new()), cancel.clone()).await?;
    supervisor.wait().await;
    Ok(())
}
