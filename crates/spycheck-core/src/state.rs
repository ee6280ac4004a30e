//! Shared live state: the roster and the server record.
//!
//! The dispatch loop is the single writer; snapshot accessors take the
//! shared side of the lock and clone. Writer-side critical sections are
//! pure in-memory work (store and admin-channel I/O happens outside the
//! guard), so readers never observe a half-applied mutation and never
//! wait on the network behind the lock.

use std::collections::HashMap;

use spycheck_types::{Player, Server, SteamId};
use tokio::sync::RwLock;

/// The resident players, kept in join order.
///
/// Display names are not unique at the protocol level, so name lookups
/// must be deterministic: the earliest-joined resident carrying the name
/// wins, in the order players were first observed.
#[derive(Default)]
pub(crate) struct Roster {
    players: HashMap<SteamId, Player>,
    /// Ids in the order they joined the roster.
    order: Vec<SteamId>,
}

impl Roster {
    pub(crate) fn contains(&self, steam_id: SteamId) -> bool {
        self.players.contains_key(&steam_id)
    }

    pub(crate) fn get(&self, steam_id: SteamId) -> Option<&Player> {
        self.players.get(&steam_id)
    }

    pub(crate) fn get_mut(&mut self, steam_id: SteamId) -> Option<&mut Player> {
        self.players.get_mut(&steam_id)
    }

    /// Add or replace a player. A new id goes to the back of the join
    /// order; replacing keeps the original position.
    pub(crate) fn insert(&mut self, player: Player) {
        if !self.players.contains_key(&player.steam_id) {
            self.order.push(player.steam_id);
        }
        self.players.insert(player.steam_id, player);
    }

    pub(crate) fn remove(&mut self, steam_id: SteamId) -> Option<Player> {
        let removed = self.players.remove(&steam_id);
        if removed.is_some() {
            self.order.retain(|id| *id != steam_id);
        }
        removed
    }

    /// The earliest-joined resident with this display name.
    pub(crate) fn find_by_name(&self, name: &str) -> Option<&Player> {
        self.iter().find(|p| p.name == name)
    }

    /// Resident ids in join order.
    pub(crate) fn ids(&self) -> Vec<SteamId> {
        self.order.clone()
    }

    /// Residents in join order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Player> {
        self.order.iter().filter_map(|id| self.players.get(id))
    }

    /// Mutable access to every resident; iteration order is unspecified,
    /// for bulk updates only.
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.values_mut()
    }

    pub(crate) fn len(&self) -> usize {
        self.players.len()
    }
}

/// The live roster and server record.
#[derive(Default)]
pub struct GameState {
    pub(crate) players: RwLock<Roster>,
    pub(crate) server: RwLock<Server>,
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every resident player, in join order.
    pub async fn players(&self) -> Vec<Player> {
        self.players.read().await.iter().cloned().collect()
    }

    /// Snapshot of a single player.
    pub async fn get_player(&self, steam_id: SteamId) -> Option<Player> {
        self.players.read().await.get(steam_id).cloned()
    }

    /// Case-insensitive search over display names and the decimal id.
    pub async fn search(&self, query: &str) -> Vec<Player> {
        let needle = query.to_lowercase();
        self.players
            .read()
            .await
            .iter()
            .filter(|p| {
                p.name.to_lowercase().contains(&needle)
                    || p.name_previous.to_lowercase().contains(&needle)
                    || p.steam_id.to_string().contains(&needle)
            })
            .cloned()
            .collect()
    }

    /// Snapshot of the server record.
    pub async fn server(&self) -> Server {
        self.server.read().await.clone()
    }

    /// Number of resident players.
    pub async fn player_count(&self) -> usize {
        self.players.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn search_matches_name_and_id() {
        let state = GameState::new();
        {
            let mut players = state.players.write().await;
            let id = SteamId::from_u64(76_561_198_198_658_783);
            players.insert(Player::new(id, "SomePlayer"));
        }
        assert_eq!(state.search("someplayer").await.len(), 1);
        assert_eq!(state.search("658783").await.len(), 1);
        assert!(state.search("missing").await.is_empty());
        assert_eq!(state.player_count().await, 1);
    }

    #[test]
    fn name_lookup_prefers_earliest_joined() {
        let mut roster = Roster::default();
        let first = SteamId::from_account_id(1);
        let second = SteamId::from_account_id(2);
        roster.insert(Player::new(second, "other"));
        // Rename-through-replace keeps the join position of `second`.
        roster.insert(Player::new(second, "twin"));
        roster.insert(Player::new(first, "twin"));

        let found = roster.find_by_name("twin").unwrap();
        assert_eq!(found.steam_id, second);

        // Removing the earlier entry promotes the later one.
        roster.remove(second);
        assert_eq!(roster.find_by_name("twin").unwrap().steam_id, first);
        assert_eq!(roster.ids(), vec![first]);
    }
}
