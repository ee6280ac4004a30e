//! Serde models for the playerlist/rules v3 JSON shape.
//!
//! The on-disk format is shared with other community tools, so tolerance
//! matters on input: `steamid` may be a string or a raw number (normalized
//! by [`SteamId`]'s deserializer), optional blocks may be absent, and
//! unknown fields are ignored. Output always emits `steamid` as a string
//! and indents with four spaces.

use serde::{Deserialize, Serialize};
use spycheck_types::SteamId;

/// Published JSON schema for player lists.
pub const PLAYER_LIST_SCHEMA_URL: &str =
    "https://raw.githubusercontent.com/PazerOP/tf2_bot_detector/master/schemas/v3/playerlist.schema.json";

/// Published JSON schema for rule lists.
pub const RULES_SCHEMA_URL: &str =
    "https://raw.githubusercontent.com/PazerOP/tf2_bot_detector/master/schemas/v3/rules.schema.json";

/// Title and author of the operator-maintained local lists.
pub const LOCAL_LIST_AUTHOR: &str = "local";

/// Shared `file_info` header carried by both list kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub update_url: String,
}

/// When and under what name a listed player was last observed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerLastSeen {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub player_name: String,
    /// Unix seconds.
    #[serde(default)]
    pub time: i64,
}

/// One entry of a player list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerDefinition {
    pub attributes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<PlayerLastSeen>,
    pub steamid: SteamId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub proof: Vec<String>,
}

/// A playerlist v3 document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerListSchema {
    #[serde(rename = "$schema")]
    pub schema: String,
    pub file_info: FileInfo,
    pub players: Vec<PlayerDefinition>,
}

impl PlayerListSchema {
    /// The seed document for the operator-maintained local player list.
    pub fn local() -> Self {
        Self {
            schema: PLAYER_LIST_SCHEMA_URL.to_owned(),
            file_info: FileInfo {
                authors: vec![LOCAL_LIST_AUTHOR.to_owned()],
                description: "local player list".to_owned(),
                title: spycheck_types::LOCAL_LIST_TITLE.to_owned(),
                update_url: String::new(),
            },
            players: Vec::new(),
        }
    }
}

/// Text comparison modes supported by rule triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMatchMode {
    Contains,
    Regex,
    Equal,
    StartsWith,
    EndsWith,
    /// Split the target on whitespace and compare individual tokens.
    Word,
}

/// A username or chat-message text trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMatchTrigger {
    #[serde(default)]
    pub case_sensitive: bool,
    pub mode: TextMatchMode,
    pub patterns: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<String>,
}

/// An avatar content trigger; the hash is the SHA-1 hex digest of the
/// full-size avatar image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarMatchTrigger {
    pub avatar_hash: String,
}

/// The trigger block of a rule definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTriggers {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub avatar_match: Vec<AvatarMatchTrigger>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_text_match: Option<TextMatchTrigger>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chatmsg_text_match: Option<TextMatchTrigger>,
}

/// One entry of a rules list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDefinition {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub triggers: RuleTriggers,
}

/// A rules v3 document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSchema {
    #[serde(rename = "$schema")]
    pub schema: String,
    pub file_info: FileInfo,
    pub rules: Vec<RuleDefinition>,
}

impl RuleSchema {
    /// The seed document for the operator-maintained local rules list.
    pub fn local() -> Self {
        Self {
            schema: RULES_SCHEMA_URL.to_owned(),
            file_info: FileInfo {
                authors: vec![LOCAL_LIST_AUTHOR.to_owned()],
                description: "local rules".to_owned(),
                title: spycheck_types::LOCAL_LIST_TITLE.to_owned(),
                update_url: String::new(),
            },
            rules: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_list_tolerates_numeric_steamid() {
        let raw = r#"{
            "$schema": "x",
            "file_info": {"authors": ["a"], "description": "", "title": "t", "update_url": ""},
            "players": [
                {"attributes": ["cheater"], "steamid": 76561198198658783},
                {"attributes": ["bot"], "steamid": "76561197961279983"}
            ]
        }"#;
        let list: PlayerListSchema = serde_json::from_str(raw).unwrap();
        assert_eq!(list.players.len(), 2);
        assert_eq!(list.players[0].steamid.as_u64(), 76_561_198_198_658_783);
        assert_eq!(list.players[1].steamid.as_u64(), 76_561_197_961_279_983);
    }

    #[test]
    fn steamid_serializes_as_string() {
        let mut list = PlayerListSchema::local();
        list.players.push(PlayerDefinition {
            attributes: vec!["cheater".to_owned()],
            last_seen: None,
            steamid: SteamId::from_u64(76_561_198_198_658_783),
            proof: Vec::new(),
        });
        let out = serde_json::to_string(&list).unwrap();
        assert!(out.contains("\"steamid\":\"76561198198658783\""));
    }

    #[test]
    fn rule_schema_roundtrip() {
        let raw = r#"{
            "$schema": "x",
            "file_info": {"authors": [], "description": "", "title": "rules", "update_url": ""},
            "rules": [{
                "description": "spam",
                "triggers": {
                    "chatmsg_text_match": {"mode": "starts_with", "patterns": ["hackerman"]}
                }
            }]
        }"#;
        let schema: RuleSchema = serde_json::from_str(raw).unwrap();
        let trigger = schema.rules[0].triggers.chatmsg_text_match.as_ref().unwrap();
        assert_eq!(trigger.mode, TextMatchMode::StartsWith);
        assert!(!trigger.case_sensitive);
    }
}
