//! The operator surface: what external collaborators (HTTP handlers, a
//! tray UI) get to hold.
//!
//! Reads are lock-shared snapshots of the live state; writes are typed
//! updates submitted to the dispatch loop's channel, so external callers
//! can never mutate the roster directly.

use std::sync::Arc;

use spycheck_db::PlayerStore;
use spycheck_types::{ChatDest, Player, Server, SteamId};
use tokio::sync::mpsc;

use crate::error::CoreError;
use crate::events::{GameStateUpdate, KickReason};
use crate::state::GameState;

/// Cloneable handle over the running engine.
#[derive(Clone)]
pub struct StateHandle {
    state: Arc<GameState>,
    store: Arc<PlayerStore>,
    updates: mpsc::Sender<GameStateUpdate>,
}

impl StateHandle {
    pub(crate) fn new(
        state: Arc<GameState>,
        store: Arc<PlayerStore>,
        updates: mpsc::Sender<GameStateUpdate>,
    ) -> Self {
        Self {
            state,
            store,
            updates,
        }
    }

    // Snapshots.

    /// Copy of every resident player.
    pub async fn players(&self) -> Vec<Player> {
        self.state.players().await
    }

    /// Copy of one player, if resident.
    pub async fn get_player(&self, steam_id: SteamId) -> Option<Player> {
        self.state.get_player(steam_id).await
    }

    /// Copy of one player, falling back to (and creating) its durable
    /// record when the id is not in the live roster.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Db`] when the store lookup fails.
    pub async fn get_player_or_create(&self, steam_id: SteamId) -> Result<Player, CoreError> {
        if let Some(player) = self.state.get_player(steam_id).await {
            return Ok(player);
        }
        let mut player = Player::new(steam_id, String::new());
        self.store.load_or_create(steam_id, &mut player).await?;
        Ok(player)
    }

    /// Case-insensitive name / id search.
    pub async fn search(&self, query: &str) -> Vec<Player> {
        self.state.search(query).await
    }

    /// Copy of the server record.
    pub async fn server(&self) -> Server {
        self.state.server().await
    }

    // Operator actions. Each validates what it can locally and then
    // submits the typed update; the dispatch loop applies it.

    /// Add a player to the local list with the given attribute tags.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInput`] when `attributes` is empty, or
    /// [`CoreError::EngineStopped`] when the engine is gone.
    pub async fn mark(&self, steam_id: SteamId, attributes: Vec<String>) -> Result<(), CoreError> {
        if attributes.is_empty() {
            return Err(CoreError::InvalidInput(
                "mark requires at least one attribute".to_owned(),
            ));
        }
        self.submit(GameStateUpdate::Mark {
            steam_id,
            attributes,
        })
        .await
    }

    /// Remove a player from the local list.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EngineStopped`] when the engine is gone.
    pub async fn unmark(&self, steam_id: SteamId) -> Result<(), CoreError> {
        self.submit(GameStateUpdate::Unmark { steam_id }).await
    }

    /// Set or clear the whitelist flag.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EngineStopped`] when the engine is gone.
    pub async fn whitelist(&self, steam_id: SteamId, enabled: bool) -> Result<(), CoreError> {
        self.submit(GameStateUpdate::Whitelist { steam_id, enabled })
            .await
    }

    /// Replace the operator note on a player.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EngineStopped`] when the engine is gone.
    pub async fn note(&self, steam_id: SteamId, note: String) -> Result<(), CoreError> {
        self.submit(GameStateUpdate::Note { steam_id, note }).await
    }

    /// Send a chat message through the game.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EngineStopped`] when the engine is gone.
    pub async fn send_chat(&self, dest: ChatDest, message: String) -> Result<(), CoreError> {
        self.submit(GameStateUpdate::SendChat { dest, message })
            .await
    }

    /// Start an in-game kick vote against a user slot.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EngineStopped`] when the engine is gone.
    pub async fn call_vote(&self, user_id: i64, reason: KickReason) -> Result<(), CoreError> {
        self.submit(GameStateUpdate::CallVote { user_id, reason })
            .await
    }

    /// Submit a raw game-state update. This is the ingestion channel the
    /// external API surface forwards into.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EngineStopped`] when the engine is gone.
    pub async fn submit(&self, update: GameStateUpdate) -> Result<(), CoreError> {
        self.updates
            .send(update)
            .await
            .map_err(|_| CoreError::EngineStopped)
    }
}
