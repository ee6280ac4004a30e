//! Live records: the per-player roster entry, the server summary, and chat
//! messages.
//!
//! [`Player`] is mutated exclusively by the state engine's dispatch loop;
//! everything else holds read-only snapshots. The `dirty` flag marks a
//! record as changed since its last successful store flush and is never
//! serialized.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{MatcherKind, ProfileVisibility, Team};
use crate::ids::SteamId;

/// A rule match attached to a player.
///
/// `origin` is the title of the list whose matcher fired. Matches from the
/// `local` list may be removed by an operator; all other origins are
/// permanent for the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Title of the list the matcher was registered from.
    pub origin: String,
    /// Which matcher family fired.
    pub matcher_type: MatcherKind,
    /// Attribute tags carried by the matching entry (e.g. `cheater`).
    pub attributes: Vec<String>,
}

/// Origin title of the operator-maintained local lists.
pub const LOCAL_LIST_TITLE: &str = "local";

/// A single roster entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    // Identity
    pub steam_id: SteamId,
    pub name: String,
    /// Display name seen before the current one, from the name history.
    pub name_previous: String,

    // Session
    /// In-game user slot, reassigned by the server across rejoins.
    pub user_id: i64,
    pub team: Team,
    /// Latency in milliseconds from the last status line.
    pub ping: u32,
    /// Connection duration in seconds from the last status line.
    pub connected_secs: u64,

    // Session counters, zeroed on map change.
    pub kills: u32,
    pub deaths: u32,
    /// Kills the local player has made against this player.
    pub kills_on: u32,
    /// Deaths of the local player caused by this player.
    pub deaths_by: u32,

    // Reputation snapshot
    pub community_banned: bool,
    pub number_of_vac_bans: u32,
    pub number_of_game_bans: u32,
    pub economy_banned: bool,
    pub last_vac_ban_on: Option<DateTime<Utc>>,

    // Profile
    pub visibility: ProfileVisibility,
    /// 40-character hex digest of the full-size avatar.
    pub avatar_hash: String,
    pub real_name: String,
    pub account_created_on: Option<DateTime<Utc>>,
    pub profile_updated_on: DateTime<Utc>,

    // Rule state
    pub matches: Vec<MatchResult>,
    pub whitelisted: bool,
    pub kick_attempt_count: u32,
    pub announced_general_last: Option<DateTime<Utc>>,
    pub announced_party_last: Option<DateTime<Utc>>,
    pub notes: String,

    // Housekeeping
    pub created_on: DateTime<Utc>,
    /// Last observation time; drives disconnect/expiry decisions.
    pub updated_on: DateTime<Utc>,
    #[serde(skip)]
    pub dirty: bool,
}

impl Player {
    /// A fresh roster entry for a newly observed id.
    pub fn new(steam_id: SteamId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            steam_id,
            name: name.into(),
            name_previous: String::new(),
            user_id: 0,
            team: Team::Unassigned,
            ping: 0,
            connected_secs: 0,
            kills: 0,
            deaths: 0,
            kills_on: 0,
            deaths_by: 0,
            community_banned: false,
            number_of_vac_bans: 0,
            number_of_game_bans: 0,
            economy_banned: false,
            last_vac_ban_on: None,
            visibility: ProfileVisibility::Private,
            avatar_hash: String::new(),
            real_name: String::new(),
            account_created_on: None,
            // Epoch start so the first status observation queues a web update.
            profile_updated_on: DateTime::<Utc>::MIN_UTC,
            matches: Vec::new(),
            whitelisted: false,
            kick_attempt_count: 0,
            announced_general_last: None,
            announced_party_last: None,
            notes: String::new(),
            created_on: now,
            updated_on: now,
            dirty: true,
        }
    }

    /// Record a mutation: bumps `updated_on` and marks the record dirty.
    pub fn touch(&mut self) {
        self.updated_on = Utc::now();
        self.dirty = true;
    }

    /// Whether the player has not been observed for longer than the
    /// disconnect threshold. Expired players are flushed and removed from
    /// the live roster by the expire tick.
    pub fn is_expired(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        now - self.updated_on > threshold
    }

    /// Zero the per-map session counters.
    pub fn reset_session_stats(&mut self) {
        self.kills = 0;
        self.deaths = 0;
    }

    /// Remove matches whose origin is the operator-maintained local list.
    pub fn strip_local_matches(&mut self) {
        self.matches.retain(|m| m.origin != LOCAL_LIST_TITLE);
    }

    /// Attach match results, skipping any already present.
    pub fn attach_matches(&mut self, results: &[MatchResult]) {
        for result in results {
            if !self.matches.contains(result) {
                self.matches.push(result.clone());
            }
        }
    }
}

/// Summary of the server the local player is connected to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Server {
    pub current_map: String,
    pub hostname: String,
    pub tags: Vec<String>,
    pub address: String,
    pub port: u16,
    pub last_update: Option<DateTime<Utc>>,
}

impl Server {
    /// Forget everything; used when the connection has gone quiet for
    /// longer than the disconnect threshold.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A chat message observed in the console log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserMessage {
    pub steam_id: SteamId,
    pub user_id: i64,
    pub name: String,
    pub team: Team,
    pub message: String,
    pub created_on: DateTime<Utc>,
    /// The speaker was dead at the time.
    pub dead: bool,
    /// Sent to the speaker's team only.
    pub team_only: bool,
}
