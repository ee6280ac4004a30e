//! Game process liveness watching.
//!
//! Actual process discovery is platform territory, so the engine only
//! sees the [`GameProcessMonitor`] trait; the binary provides the real
//! implementation. The watcher samples on a fixed cadence and, when the
//! game transitions from running to stopped, optionally shuts the whole
//! companion down -- but only if the game was observed running at least
//! once, so starting the companion before the game does not immediately
//! quit it.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Sampling cadence.
const PROCESS_INTERVAL: Duration = Duration::from_secs(10);

/// Answers whether the game process is currently alive.
pub trait GameProcessMonitor: Send + Sync {
    /// One liveness sample.
    ///
    /// # Errors
    ///
    /// Returns a human-readable description when sampling itself failed
    /// (as opposed to the game not running).
    fn is_game_running(&self) -> Result<bool, String>;
}

/// A monitor that always reports "not running"; used in tests and when
/// platform integration is unavailable.
pub struct NullProcessMonitor;

impl GameProcessMonitor for NullProcessMonitor {
    fn is_game_running(&self) -> Result<bool, String> {
        Ok(false)
    }
}

/// Watch the game process until cancellation.
///
/// When `auto_close_on_exit` is set and the game stops after having been
/// seen running, the shared token is cancelled, which shuts down every
/// other task.
pub async fn watch(
    monitor: Arc<dyn GameProcessMonitor>,
    auto_close_on_exit: bool,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(PROCESS_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut was_running = false;
    let mut seen_running = false;

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        let running = match monitor.is_game_running() {
            Ok(running) => running,
            Err(err) => {
                error!(error = %err, "failed to sample game process state");
                continue;
            }
        };
        if running != was_running {
            info!(running, "game process state changed");
            was_running = running;
        }
        if running {
            seen_running = true;
        } else if seen_running && auto_close_on_exit {
            info!("game exited, shutting down");
            cancel.cancel();
            break;
        }
    }
    debug!("process watcher exited");
}
