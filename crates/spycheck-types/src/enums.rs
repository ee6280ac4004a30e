//! Closed vocabularies shared across the workspace.

use serde::{Deserialize, Serialize};

/// Team assignment of a player, as far as the console output reveals it.
///
/// `tf_lobby_debug` reports `TF_GC_TEAM_DEFENDERS` / `TF_GC_TEAM_INVADERS`,
/// mapped here to `Red` / `Blue`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    #[default]
    Unassigned,
    Spectator,
    Red,
    Blue,
}

impl Team {
    /// The opposing playing team. Spectators and unassigned players have
    /// no opponent.
    pub const fn opponent(self) -> Self {
        match self {
            Self::Red => Self::Blue,
            Self::Blue => Self::Red,
            Self::Spectator | Self::Unassigned => self,
        }
    }
}

/// Community profile visibility as reported by the summaries API.
///
/// The wire value is a bare integer; anything unknown collapses to
/// `Private`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileVisibility {
    #[default]
    Private,
    FriendsOnly,
    Public,
}

impl From<i64> for ProfileVisibility {
    fn from(value: i64) -> Self {
        match value {
            2 => Self::FriendsOnly,
            3 => Self::Public,
            _ => Self::Private,
        }
    }
}

/// Which matcher family produced a rule match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatcherKind {
    Steam,
    Name,
    Message,
    Avatar,
}

impl std::fmt::Display for MatcherKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Steam => "steam",
            Self::Name => "name",
            Self::Message => "message",
            Self::Avatar => "avatar",
        };
        f.write_str(label)
    }
}

/// Destination channel for an outbound chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatDest {
    All,
    Team,
    Party,
}

impl ChatDest {
    /// The console command that reaches this destination.
    pub const fn command(self) -> &'static str {
        match self {
            Self::All => "say",
            Self::Team => "say_team",
            Self::Party => "say_party",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opponent_is_symmetric() {
        assert_eq!(Team::Red.opponent(), Team::Blue);
        assert_eq!(Team::Blue.opponent(), Team::Red);
        assert_eq!(Team::Spectator.opponent(), Team::Spectator);
    }

    #[test]
    fn visibility_from_wire_value() {
        assert_eq!(ProfileVisibility::from(3), ProfileVisibility::Public);
        assert_eq!(ProfileVisibility::from(2), ProfileVisibility::FriendsOnly);
        assert_eq!(ProfileVisibility::from(1), ProfileVisibility::Private);
        assert_eq!(ProfileVisibility::from(99), ProfileVisibility::Private);
    }

    #[test]
    fn chat_dest_commands() {
        assert_eq!(ChatDest::All.command(), "say");
        assert_eq!(ChatDest::Team.command(), "say_team");
        assert_eq!(ChatDest::Party.command(), "say_party");
    }
}
