//! Avatar acquisition worker.
//!
//! Profile updates enqueue `(player, avatar hash)` jobs. The worker
//! consults the on-disk cache first, downloads on a miss, and runs the
//! avatar rule matcher over the bytes. A hit is fed back into the
//! dispatch loop as an [`GameStateUpdate::AvatarMatched`] so the mutation
//! happens under the loop's ownership like every other state change.

use std::sync::Arc;

use spycheck_rules::RuleEngine;
use spycheck_steam::{AvatarCache, SteamError, SteamWebClient};
use spycheck_types::SteamId;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::events::GameStateUpdate;

/// One avatar to resolve.
#[derive(Debug, Clone)]
pub struct AvatarJob {
    pub steam_id: SteamId,
    pub hash: String,
}

/// Drain avatar jobs until cancellation.
pub async fn run(
    cache: Arc<AvatarCache>,
    web: Arc<SteamWebClient>,
    rules: Arc<RuleEngine>,
    mut jobs: mpsc::Receiver<AvatarJob>,
    updates: mpsc::Sender<GameStateUpdate>,
    cancel: CancellationToken,
) {
    loop {
        let job = tokio::select! {
            () = cancel.cancelled() => break,
            job = jobs.recv() => {
                let Some(job) = job else { break };
                job
            }
        };

        let bytes = match cache.get(&job.hash).await {
            Ok(bytes) => bytes,
            Err(SteamError::Expired) => {
                match web.fetch_avatar(&job.hash).await {
                    Ok(bytes) => {
                        if let Err(err) = cache.set(&job.hash, &bytes).await {
                            error!(hash = %job.hash, error = %err, "failed to cache avatar");
                        }
                        bytes
                    }
                    Err(err) => {
                        error!(hash = %job.hash, error = %err, "avatar download failed");
                        continue;
                    }
                }
            }
            Err(err) => {
                error!(hash = %job.hash, error = %err, "avatar cache read failed");
                continue;
            }
        };

        if let Some(result) = rules.match_avatar(&bytes) {
            debug!(steam_id = %job.steam_id, origin = %result.origin, "avatar matched");
            let update = GameStateUpdate::AvatarMatched {
                steam_id: job.steam_id,
                results: vec![result],
            };
            if updates.send(update).await.is_err() {
                break;
            }
        }
    }
    debug!("avatar worker exited");
}
