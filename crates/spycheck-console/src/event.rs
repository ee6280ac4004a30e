//! Typed events produced by the console log parser.

use chrono::{DateTime, Utc};
use spycheck_types::{SteamId, Team};

/// One parsed console line.
///
/// Each variant carries the fields its matcher extracted; the timestamp is
/// the `MM/DD/YYYY - HH:MM:SS` prefix of the line, interpreted as UTC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    /// A chat message, possibly from a dead player or team-only.
    Chat {
        timestamp: DateTime<Utc>,
        name: String,
        message: String,
        dead: bool,
        team_only: bool,
    },
    /// `<attacker> killed <victim> with <weapon>.`
    Kill {
        timestamp: DateTime<Utc>,
        attacker: String,
        victim: String,
        weapon: String,
        crit: bool,
    },
    /// `<name> connected`
    Connect {
        timestamp: DateTime<Utc>,
        name: String,
    },
    /// One row of `status` output.
    Status {
        timestamp: DateTime<Utc>,
        user_id: i64,
        name: String,
        steam_id: SteamId,
        /// Connection duration in whole seconds.
        connected_secs: u64,
        ping: u32,
    },
    /// `hostname: <text>`
    Hostname {
        timestamp: DateTime<Utc>,
        hostname: String,
    },
    /// `map     : <mapname> at: ...`
    Map {
        timestamp: DateTime<Utc>,
        map: String,
    },
    /// `tags    : <comma-separated>`
    Tags {
        timestamp: DateTime<Utc>,
        tags: Vec<String>,
    },
    /// `udp/ip  : <ip>:<port>`
    Address {
        timestamp: DateTime<Utc>,
        address: String,
        port: u16,
    },
    /// One member row of `tf_lobby_debug` output.
    Lobby {
        timestamp: DateTime<Utc>,
        steam_id: SteamId,
        team: Team,
    },
    /// The differing-lobby sentinel: the session the log describes has
    /// ended (map change or server move).
    LobbyChanged { timestamp: DateTime<Utc> },
}

impl LogEvent {
    /// The timestamp shared by every variant.
    pub const fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Chat { timestamp, .. }
            | Self::Kill { timestamp, .. }
            | Self::Connect { timestamp, .. }
            | Self::Status { timestamp, .. }
            | Self::Hostname { timestamp, .. }
            | Self::Map { timestamp, .. }
            | Self::Tags { timestamp, .. }
            | Self::Address { timestamp, .. }
            | Self::Lobby { timestamp, .. }
            | Self::LobbyChanged { timestamp } => *timestamp,
        }
    }
}
