//! The typed update vocabulary of the state engine.
//!
//! Every mutation of the roster or the server record travels through
//! [`GameStateUpdate`], whether it originated from a parsed console line,
//! an operator action, or a completed web fetch. The engine's dispatch
//! loop is the only consumer, which is what serializes mutations.

use chrono::{DateTime, Utc};
use spycheck_console::LogEvent;
use spycheck_steam::{PlayerBanState, PlayerSummary};
use spycheck_types::{ChatDest, MatchResult, SteamId, Team};
use tracing::debug;

/// Reason attached to a kick vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KickReason {
    Idle,
    Scamming,
    Cheating,
    Other,
}

impl KickReason {
    /// The reason string the `callvote` command expects.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Scamming => "scamming",
            Self::Cheating => "cheating",
            Self::Other => "other",
        }
    }
}

/// One unit of work for the dispatch loop.
#[derive(Debug, Clone)]
pub enum GameStateUpdate {
    // Derived from console log events.
    Status {
        steam_id: SteamId,
        user_id: i64,
        name: String,
        connected_secs: u64,
        ping: u32,
    },
    Chat {
        name: String,
        message: String,
        created_on: DateTime<Utc>,
        dead: bool,
        team_only: bool,
    },
    Kill {
        attacker: String,
        victim: String,
    },
    Lobby {
        steam_id: SteamId,
        team: Team,
    },
    Hostname(String),
    Map(String),
    Tags(Vec<String>),
    Address {
        address: String,
        port: u16,
    },
    /// The session the log described has ended; reset per-map state.
    MapChange,

    // Results of web metadata fetches.
    Profile(PlayerSummary),
    Bans(PlayerBanState),
    /// An avatar image matched a rule after download.
    AvatarMatched {
        steam_id: SteamId,
        results: Vec<MatchResult>,
    },

    // Operator actions.
    Mark {
        steam_id: SteamId,
        attributes: Vec<String>,
    },
    Unmark {
        steam_id: SteamId,
    },
    Whitelist {
        steam_id: SteamId,
        enabled: bool,
    },
    Note {
        steam_id: SteamId,
        note: String,
    },
    SendChat {
        dest: ChatDest,
        message: String,
    },
    CallVote {
        user_id: i64,
        reason: KickReason,
    },
}

impl GameStateUpdate {
    /// Translate a parsed console event into an update, or `None` for
    /// events that carry no state change (a bare connect notice).
    pub fn from_log_event(event: LogEvent) -> Option<Self> {
        match event {
            LogEvent::Status {
                steam_id,
                user_id,
                name,
                connected_secs,
                ping,
                ..
            } => Some(Self::Status {
                steam_id,
                user_id,
                name,
                connected_secs,
                ping,
            }),
            LogEvent::Chat {
                timestamp,
                name,
                message,
                dead,
                team_only,
            } => Some(Self::Chat {
                name,
                message,
                created_on: timestamp,
                dead,
                team_only,
            }),
            LogEvent::Kill {
                attacker, victim, ..
            } => Some(Self::Kill { attacker, victim }),
            LogEvent::Lobby { steam_id, team, .. } => Some(Self::Lobby { steam_id, team }),
            LogEvent::Hostname { hostname, .. } => Some(Self::Hostname(hostname)),
            LogEvent::Map { map, .. } => Some(Self::Map(map)),
            LogEvent::Tags { tags, .. } => Some(Self::Tags(tags)),
            LogEvent::Address { address, port, .. } => Some(Self::Address { address, port }),
            LogEvent::LobbyChanged { .. } => Some(Self::MapChange),
            LogEvent::Connect { name, .. } => {
                debug!(name, "player connecting");
                None
            }
        }
    }
}
