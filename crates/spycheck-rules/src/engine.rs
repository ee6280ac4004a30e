//! The rule engine: list registry plus matcher evaluation.

use std::io::Write;
use std::sync::RwLock;

use chrono::Utc;
use serde::Serialize;
use sha1::{Digest, Sha1};
use spycheck_types::{MatchResult, SteamId, LOCAL_LIST_TITLE};
use tracing::warn;

use crate::error::RulesError;
use crate::matcher::{AvatarMatcher, SteamIdMatcher, TextMatcher, TextTarget};
use crate::schema::{
    PlayerDefinition, PlayerLastSeen, PlayerListSchema, RuleSchema, TextMatchMode,
    TextMatchTrigger,
};

/// Parameters for appending a player to the local list.
#[derive(Debug, Clone)]
pub struct MarkOpts {
    pub steam_id: SteamId,
    pub attributes: Vec<String>,
    pub proof: Vec<String>,
    /// Display name recorded in `last_seen`.
    pub name: String,
}

#[derive(Default)]
struct EngineInner {
    matchers_steam: Vec<SteamIdMatcher>,
    matchers_text: Vec<TextMatcher>,
    matchers_avatar: Vec<AvatarMatcher>,
    player_lists: Vec<PlayerListSchema>,
    rules_lists: Vec<RuleSchema>,
    known_tags: Vec<String>,
}

impl EngineInner {
    fn add_known_tags(&mut self, attributes: &[String]) {
        for tag in attributes {
            let known = self
                .known_tags
                .iter()
                .any(|existing| existing.eq_ignore_ascii_case(tag));
            if !known {
                self.known_tags.push(tag.clone());
            }
        }
    }
}

/// Holds every imported list and answers match queries against them.
///
/// Queries take a shared lock and may run concurrently; imports and the
/// mark/unmark operations take the exclusive lock. All lock acquisition is
/// synchronous -- matching is pure CPU work with no await points.
pub struct RuleEngine {
    inner: RwLock<EngineInner>,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleEngine {
    /// An engine seeded with empty local player and rules lists at
    /// registry position zero.
    pub fn new() -> Self {
        let inner = EngineInner {
            player_lists: vec![PlayerListSchema::local()],
            rules_lists: vec![RuleSchema::local()],
            ..EngineInner::default()
        };
        Self {
            inner: RwLock::new(inner),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, EngineInner> {
        self.inner.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, EngineInner> {
        self.inner.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// An engine whose local lists are seeded from previously exported
    /// documents (the operator's saved marks and rules). Their matchers
    /// are registered under the `local` origin.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError::InvalidRegex`] when a saved rule carries a
    /// pattern that no longer compiles.
    pub fn with_local_lists(
        mut players: PlayerListSchema,
        mut rules_list: RuleSchema,
    ) -> Result<Self, RulesError> {
        players.file_info.title = LOCAL_LIST_TITLE.to_owned();
        rules_list.file_info.title = LOCAL_LIST_TITLE.to_owned();

        let mut text = Vec::new();
        let mut avatar = Vec::new();
        for rule in &rules_list.rules {
            if let Some(trigger) = &rule.triggers.username_text_match {
                text.push(compile_text_matcher(
                    LOCAL_LIST_TITLE,
                    TextTarget::Name,
                    trigger,
                )?);
            }
            if let Some(trigger) = &rule.triggers.chatmsg_text_match {
                text.push(compile_text_matcher(
                    LOCAL_LIST_TITLE,
                    TextTarget::Message,
                    trigger,
                )?);
            }
            let hashes: Vec<String> = rule
                .triggers
                .avatar_match
                .iter()
                .filter(|t| t.avatar_hash.len() == 40)
                .map(|t| t.avatar_hash.clone())
                .collect();
            if !hashes.is_empty() {
                avatar.push(AvatarMatcher {
                    origin: LOCAL_LIST_TITLE.to_owned(),
                    hashes,
                    attributes: Vec::new(),
                });
            }
        }

        let mut steam = Vec::new();
        let mut attrs: Vec<String> = Vec::new();
        players.players.retain(|player| {
            if player.steamid.is_valid() {
                true
            } else {
                warn!(steam_id = %player.steamid, "dropping invalid id from saved local list");
                false
            }
        });
        for player in &players.players {
            steam.push(SteamIdMatcher {
                origin: LOCAL_LIST_TITLE.to_owned(),
                steam_id: player.steamid,
                attributes: player.attributes.clone(),
            });
            attrs.extend(player.attributes.iter().cloned());
        }

        let engine = Self::new();
        {
            let mut inner = engine.write();
            inner.matchers_steam = steam;
            inner.matchers_text = text;
            inner.matchers_avatar = avatar;
            inner.add_known_tags(&attrs);
            inner.player_lists[0] = players;
            inner.rules_lists[0] = rules_list;
        }
        Ok(engine)
    }

    /// Register name, message, and avatar matchers from a rules list.
    ///
    /// Re-importing a list with a title seen before (a periodic refresh)
    /// replaces the previous registration. The `local` title is reserved
    /// for the operator's own list and cannot be imported over.
    ///
    /// Returns the number of rules imported. Regex patterns are compiled
    /// here; a pattern that fails to compile rejects the entire list.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError::InvalidRegex`] on the first bad pattern.
    pub fn import_rules(&self, list: RuleSchema) -> Result<usize, RulesError> {
        let origin = list.file_info.title.clone();
        if origin == LOCAL_LIST_TITLE {
            warn!("refusing to import a rules list titled 'local'");
            return Ok(0);
        }
        let mut text = Vec::new();
        let mut avatar = Vec::new();
        for rule in &list.rules {
            if let Some(trigger) = &rule.triggers.username_text_match {
                text.push(compile_text_matcher(&origin, TextTarget::Name, trigger)?);
            }
            if let Some(trigger) = &rule.triggers.chatmsg_text_match {
                text.push(compile_text_matcher(&origin, TextTarget::Message, trigger)?);
            }
            if !rule.triggers.avatar_match.is_empty() {
                let hashes: Vec<String> = rule
                    .triggers
                    .avatar_match
                    .iter()
                    .filter(|t| t.avatar_hash.len() == 40)
                    .map(|t| t.avatar_hash.clone())
                    .collect();
                if !hashes.is_empty() {
                    avatar.push(AvatarMatcher {
                        origin: origin.clone(),
                        hashes,
                        attributes: Vec::new(),
                    });
                }
            }
        }
        let count = list.rules.len();
        let mut inner = self.write();
        inner.matchers_text.retain(|m| m.origin() != origin);
        inner.matchers_avatar.retain(|m| m.origin != origin);
        inner.rules_lists.retain(|l| l.file_info.title != origin);
        inner.matchers_text.extend(text);
        inner.matchers_avatar.extend(avatar);
        inner.rules_lists.push(list);
        Ok(count)
    }

    /// Register steam-id matchers from a player list and fold its
    /// attribute tags into the known-tag union.
    ///
    /// Re-importing a list with a title seen before replaces the
    /// previous registration; the `local` title is reserved. Entries
    /// whose id is out of range are skipped with a warning. Returns the
    /// number of players imported.
    pub fn import_players(&self, list: PlayerListSchema) -> usize {
        let origin = list.file_info.title.clone();
        if origin == LOCAL_LIST_TITLE {
            warn!("refusing to import a player list titled 'local'");
            return 0;
        }
        let mut matchers = Vec::new();
        let mut attrs: Vec<String> = Vec::new();
        for player in &list.players {
            if !player.steamid.is_valid() {
                warn!(steam_id = %player.steamid, list = %origin, "skipping invalid steam id");
                continue;
            }
            matchers.push(SteamIdMatcher {
                origin: origin.clone(),
                steam_id: player.steamid,
                attributes: player.attributes.clone(),
            });
            attrs.extend(player.attributes.iter().cloned());
        }
        let count = matchers.len();
        let mut inner = self.write();
        inner.matchers_steam.retain(|m| m.origin != origin);
        inner
            .player_lists
            .retain(|l| l.file_info.title != origin);
        inner.matchers_steam.extend(matchers);
        inner.add_known_tags(&attrs);
        inner.player_lists.push(list);
        count
    }

    /// All steam-id matches for `steam_id`, in registration order.
    pub fn match_steam(&self, steam_id: SteamId) -> Option<Vec<MatchResult>> {
        let inner = self.read();
        let results: Vec<MatchResult> = inner
            .matchers_steam
            .iter()
            .filter_map(|m| m.matches(steam_id))
            .collect();
        (!results.is_empty()).then_some(results)
    }

    /// All name-matcher matches for a display name.
    pub fn match_name(&self, name: &str) -> Option<Vec<MatchResult>> {
        self.match_text(TextTarget::Name, name)
    }

    /// All message-matcher matches for a chat message.
    pub fn match_message(&self, message: &str) -> Option<Vec<MatchResult>> {
        self.match_text(TextTarget::Message, message)
    }

    fn match_text(&self, target: TextTarget, value: &str) -> Option<Vec<MatchResult>> {
        let inner = self.read();
        let results: Vec<MatchResult> = inner
            .matchers_text
            .iter()
            .filter(|m| m.target() == target)
            .filter_map(|m| m.matches(value))
            .collect();
        (!results.is_empty()).then_some(results)
    }

    /// Match avatar image content by SHA-1 hex digest. First matching
    /// origin wins.
    pub fn match_avatar(&self, avatar: &[u8]) -> Option<MatchResult> {
        if avatar.is_empty() {
            return None;
        }
        let digest = format!("{:x}", Sha1::digest(avatar));
        let inner = self.read();
        inner
            .matchers_avatar
            .iter()
            .find_map(|m| m.matches(&digest))
    }

    /// Append a player to the local list and register its matcher.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError::InvalidInput`] when no attributes were given,
    /// or [`RulesError::Duplicate`] when the id is already on the local
    /// list.
    pub fn mark(&self, opts: MarkOpts) -> Result<(), RulesError> {
        if opts.attributes.is_empty() {
            return Err(RulesError::InvalidInput(
                "at least one attribute is required to mark a player".to_owned(),
            ));
        }
        let mut inner = self.write();
        let local = inner
            .player_lists
            .first_mut()
            .ok_or_else(|| RulesError::UnknownList(LOCAL_LIST_TITLE.to_owned()))?;
        if local.players.iter().any(|p| p.steamid == opts.steam_id) {
            return Err(RulesError::Duplicate(opts.steam_id));
        }
        local.players.push(PlayerDefinition {
            attributes: opts.attributes.clone(),
            last_seen: Some(PlayerLastSeen {
                player_name: opts.name,
                time: Utc::now().timestamp(),
            }),
            steamid: opts.steam_id,
            proof: opts.proof,
        });
        inner.matchers_steam.push(SteamIdMatcher {
            origin: LOCAL_LIST_TITLE.to_owned(),
            steam_id: opts.steam_id,
            attributes: opts.attributes.clone(),
        });
        inner.add_known_tags(&opts.attributes);
        Ok(())
    }

    /// Remove a player from the local list and drop its matcher. Matches
    /// registered from other lists are untouched. Returns whether an
    /// entry was removed.
    pub fn unmark(&self, steam_id: SteamId) -> bool {
        let mut inner = self.write();
        let Some(local) = inner.player_lists.first_mut() else {
            return false;
        };
        let before = local.players.len();
        local.players.retain(|p| p.steamid != steam_id);
        let removed = local.players.len() != before;
        if removed {
            inner
                .matchers_steam
                .retain(|m| !(m.origin == LOCAL_LIST_TITLE && m.steam_id == steam_id));
        }
        removed
    }

    /// Serialize the player list with the given title as 4-space-indented
    /// JSON.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError::UnknownList`] when no player list carries the
    /// title, or [`RulesError::Serialize`] on encoding failure.
    pub fn export_players<W: Write>(&self, title: &str, writer: &mut W) -> Result<(), RulesError> {
        let inner = self.read();
        let list = inner
            .player_lists
            .iter()
            .find(|l| l.file_info.title == title)
            .ok_or_else(|| RulesError::UnknownList(title.to_owned()))?;
        write_pretty(list, writer)
    }

    /// Serialize the rules list with the given title as 4-space-indented
    /// JSON.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError::UnknownList`] when no rules list carries the
    /// title, or [`RulesError::Serialize`] on encoding failure.
    pub fn export_rules<W: Write>(&self, title: &str, writer: &mut W) -> Result<(), RulesError> {
        let inner = self.read();
        let list = inner
            .rules_lists
            .iter()
            .find(|l| l.file_info.title == title)
            .ok_or_else(|| RulesError::UnknownList(title.to_owned()))?;
        write_pretty(list, writer)
    }

    /// The stable union of attribute tags across all imported player
    /// lists, in first-seen order.
    pub fn unique_tags(&self) -> Vec<String> {
        self.read().known_tags.clone()
    }

    /// The most recently seen listed ids carrying any of the given tags,
    /// newest first, capped at `limit`. Feeds the voice-ban export.
    pub fn newest_entries(&self, limit: usize, tags: &[String]) -> Vec<SteamId> {
        let inner = self.read();
        let mut entries: Vec<(i64, SteamId)> = Vec::new();
        for list in &inner.player_lists {
            for player in &list.players {
                let tagged = player.attributes.iter().any(|attr| {
                    tags.iter().any(|tag| tag.eq_ignore_ascii_case(attr))
                });
                if !tagged {
                    continue;
                }
                let seen = player.last_seen.as_ref().map_or(0, |s| s.time);
                entries.push((seen, player.steamid));
            }
        }
        entries.sort_by(|a, b| b.0.cmp(&a.0));
        let mut seen = std::collections::HashSet::new();
        entries
            .into_iter()
            .filter(|(_, id)| seen.insert(*id))
            .take(limit)
            .map(|(_, id)| id)
            .collect()
    }
}

fn compile_text_matcher(
    origin: &str,
    target: TextTarget,
    trigger: &TextMatchTrigger,
) -> Result<TextMatcher, RulesError> {
    if trigger.mode == TextMatchMode::Regex {
        let mut compiled = Vec::with_capacity(trigger.patterns.len());
        for pattern in &trigger.patterns {
            let re = regex::Regex::new(pattern).map_err(|source| RulesError::InvalidRegex {
                pattern: pattern.clone(),
                source: Box::new(source),
            })?;
            compiled.push(re);
        }
        Ok(TextMatcher::Regex {
            origin: origin.to_owned(),
            target,
            patterns: compiled,
            attributes: trigger.attributes.clone(),
        })
    } else {
        Ok(TextMatcher::General {
            origin: origin.to_owned(),
            target,
            mode: trigger.mode,
            case_sensitive: trigger.case_sensitive,
            patterns: trigger.patterns.clone(),
            attributes: trigger.attributes.clone(),
        })
    }
}

fn write_pretty<T: Serialize, W: Write>(value: &T, writer: &mut W) -> Result<(), RulesError> {
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(writer, formatter);
    value.serialize(&mut serializer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AvatarMatchTrigger, RuleDefinition, RuleTriggers};
    use spycheck_types::MatcherKind;

    fn player_list(title: &str, players: Vec<PlayerDefinition>) -> PlayerListSchema {
        let mut list = PlayerListSchema::local();
        list.file_info.title = title.to_owned();
        list.players = players;
        list
    }

    fn definition(id: u64, attrs: &[&str], seen: i64) -> PlayerDefinition {
        PlayerDefinition {
            attributes: attrs.iter().map(|a| (*a).to_owned()).collect(),
            last_seen: Some(PlayerLastSeen {
                player_name: String::new(),
                time: seen,
            }),
            steamid: SteamId::from_u64(id),
            proof: Vec::new(),
        }
    }

    const PID_A: u64 = 76_561_198_198_658_783;
    const PID_B: u64 = 76_561_197_961_279_983;

    #[test]
    fn import_players_registers_matchers() {
        let engine = RuleEngine::new();
        let imported = engine.import_players(player_list(
            "community",
            vec![
                definition(PID_A, &["cheater"], 10),
                definition(PID_B, &["bot", "cheater"], 20),
            ],
        ));
        assert_eq!(imported, 2);
        let matches = engine.match_steam(SteamId::from_u64(PID_A)).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].origin, "community");
        assert_eq!(matches[0].matcher_type, MatcherKind::Steam);
        assert!(engine.match_steam(SteamId::from_u64(1)).is_none());
    }

    #[test]
    fn import_players_skips_invalid_ids() {
        let engine = RuleEngine::new();
        let imported = engine.import_players(player_list(
            "community",
            vec![definition(42, &["cheater"], 0), definition(PID_A, &["cheater"], 0)],
        ));
        assert_eq!(imported, 1);
    }

    #[test]
    fn all_matching_origins_are_returned() {
        let engine = RuleEngine::new();
        engine.import_players(player_list("one", vec![definition(PID_A, &["cheater"], 0)]));
        engine.import_players(player_list("two", vec![definition(PID_A, &["bot"], 0)]));
        let matches = engine.match_steam(SteamId::from_u64(PID_A)).unwrap();
        let origins: Vec<&str> = matches.iter().map(|m| m.origin.as_str()).collect();
        assert_eq!(origins, vec!["one", "two"]);
    }

    #[test]
    fn reimport_replaces_previous_registration() {
        let engine = RuleEngine::new();
        engine.import_players(player_list("community", vec![definition(PID_A, &["cheater"], 0)]));
        engine.import_players(player_list("community", vec![definition(PID_B, &["bot"], 0)]));
        // The old entry is gone, the new one matches exactly once.
        assert!(engine.match_steam(SteamId::from_u64(PID_A)).is_none());
        assert_eq!(engine.match_steam(SteamId::from_u64(PID_B)).unwrap().len(), 1);
    }

    #[test]
    fn local_title_cannot_be_imported_over() {
        let engine = RuleEngine::new();
        let mut list = PlayerListSchema::local();
        list.players.push(definition(PID_A, &["cheater"], 0));
        assert_eq!(engine.import_players(list), 0);
        assert!(engine.match_steam(SteamId::from_u64(PID_A)).is_none());
    }

    #[test]
    fn mark_rejects_duplicates_and_empty_attrs() {
        let engine = RuleEngine::new();
        let id = SteamId::from_u64(PID_A);
        assert!(matches!(
            engine.mark(MarkOpts {
                steam_id: id,
                attributes: vec![],
                proof: vec![],
                name: String::new(),
            }),
            Err(RulesError::InvalidInput(_))
        ));
        engine
            .mark(MarkOpts {
                steam_id: id,
                attributes: vec!["cheater".to_owned()],
                proof: vec![],
                name: "player_a".to_owned(),
            })
            .unwrap();
        assert!(matches!(
            engine.mark(MarkOpts {
                steam_id: id,
                attributes: vec!["bot".to_owned()],
                proof: vec![],
                name: String::new(),
            }),
            Err(RulesError::Duplicate(_))
        ));
        assert!(engine.match_steam(id).is_some());
    }

    #[test]
    fn unmark_only_touches_local_list() {
        let engine = RuleEngine::new();
        let id = SteamId::from_u64(PID_A);
        engine.import_players(player_list("community", vec![definition(PID_A, &["bot"], 0)]));
        engine
            .mark(MarkOpts {
                steam_id: id,
                attributes: vec!["cheater".to_owned()],
                proof: vec![],
                name: String::new(),
            })
            .unwrap();
        assert_eq!(engine.match_steam(id).unwrap().len(), 2);
        assert!(engine.unmark(id));
        let remaining = engine.match_steam(id).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].origin, "community");
        assert!(!engine.unmark(id));
    }

    #[test]
    fn rules_import_wires_name_and_message_matchers() {
        let engine = RuleEngine::new();
        let mut list = RuleSchema::local();
        list.file_info.title = "rules".to_owned();
        list.rules.push(RuleDefinition {
            description: "spam".to_owned(),
            triggers: RuleTriggers {
                chatmsg_text_match: Some(TextMatchTrigger {
                    case_sensitive: false,
                    mode: TextMatchMode::StartsWith,
                    patterns: vec!["hackerman".to_owned()],
                    attributes: vec!["cheater".to_owned()],
                }),
                username_text_match: Some(TextMatchTrigger {
                    case_sensitive: false,
                    mode: TextMatchMode::Contains,
                    patterns: vec!["discord.gg".to_owned()],
                    attributes: vec![],
                }),
                ..RuleTriggers::default()
            },
        });
        engine.import_rules(list).unwrap();
        assert!(engine.match_message("HACKERMAN was here").is_some());
        assert!(engine.match_message("fair player").is_none());
        assert!(engine.match_name("join discord.gg/xyz").is_some());
        // Name matchers do not answer message queries.
        assert!(engine.match_message("join discord.gg/xyz").is_none());
    }

    #[test]
    fn invalid_regex_rejects_import() {
        let engine = RuleEngine::new();
        let mut list = RuleSchema::local();
        list.file_info.title = "broken".to_owned();
        list.rules.push(RuleDefinition {
            description: String::new(),
            triggers: RuleTriggers {
                chatmsg_text_match: Some(TextMatchTrigger {
                    case_sensitive: false,
                    mode: TextMatchMode::Regex,
                    patterns: vec!["(unclosed".to_owned()],
                    attributes: vec![],
                }),
                ..RuleTriggers::default()
            },
        });
        assert!(matches!(
            engine.import_rules(list),
            Err(RulesError::InvalidRegex { .. })
        ));
    }

    #[test]
    fn avatar_match_hashes_content() {
        let engine = RuleEngine::new();
        let mut list = RuleSchema::local();
        list.file_info.title = "avatars".to_owned();
        list.rules.push(RuleDefinition {
            description: String::new(),
            triggers: RuleTriggers {
                avatar_match: vec![AvatarMatchTrigger {
                    // SHA-1 of b"abc".
                    avatar_hash: "a9993e364706816aba3e25717850c26c9cd0d89d".to_owned(),
                }],
                ..RuleTriggers::default()
            },
        });
        engine.import_rules(list).unwrap();
        let result = engine.match_avatar(b"abc").unwrap();
        assert_eq!(result.origin, "avatars");
        assert!(engine.match_avatar(b"other").is_none());
        assert!(engine.match_avatar(b"").is_none());
    }

    #[test]
    fn export_then_import_preserves_matches() {
        let engine = RuleEngine::new();
        engine
            .mark(MarkOpts {
                steam_id: SteamId::from_u64(PID_A),
                attributes: vec!["cheater".to_owned()],
                proof: vec![],
                name: "player_a".to_owned(),
            })
            .unwrap();
        let mut buf = Vec::new();
        engine.export_players(LOCAL_LIST_TITLE, &mut buf).unwrap();
        // Four-space indentation, string steamid.
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.contains("    \"file_info\""));
        assert!(text.contains("\"76561198198658783\""));

        let parsed: PlayerListSchema = serde_json::from_slice(&buf).unwrap();
        let fresh = RuleEngine::new();
        fresh.import_players(parsed);
        let matches = fresh.match_steam(SteamId::from_u64(PID_A)).unwrap();
        assert_eq!(matches[0].attributes, vec!["cheater".to_owned()]);
    }

    #[test]
    fn seeded_local_list_restores_marks() {
        let engine = RuleEngine::new();
        engine
            .mark(MarkOpts {
                steam_id: SteamId::from_u64(PID_A),
                attributes: vec!["cheater".to_owned()],
                proof: vec![],
                name: "player_a".to_owned(),
            })
            .unwrap();
        let mut buf = Vec::new();
        engine.export_players(LOCAL_LIST_TITLE, &mut buf).unwrap();
        let saved: PlayerListSchema = serde_json::from_slice(&buf).unwrap();

        let reborn = RuleEngine::with_local_lists(saved, RuleSchema::local()).unwrap();
        let matches = reborn.match_steam(SteamId::from_u64(PID_A)).unwrap();
        assert_eq!(matches[0].origin, LOCAL_LIST_TITLE);
        // The restored entry still counts as marked.
        assert!(matches!(
            reborn.mark(MarkOpts {
                steam_id: SteamId::from_u64(PID_A),
                attributes: vec!["bot".to_owned()],
                proof: vec![],
                name: String::new(),
            }),
            Err(RulesError::Duplicate(_))
        ));
    }

    #[test]
    fn export_unknown_list_fails() {
        let engine = RuleEngine::new();
        let mut buf = Vec::new();
        assert!(matches!(
            engine.export_players("nope", &mut buf),
            Err(RulesError::UnknownList(_))
        ));
    }

    #[test]
    fn unique_tags_dedupe_case_insensitively() {
        let engine = RuleEngine::new();
        engine.import_players(player_list(
            "one",
            vec![definition(PID_A, &["cheater", "Bot"], 0)],
        ));
        engine.import_players(player_list("two", vec![definition(PID_B, &["bot"], 0)]));
        assert_eq!(engine.unique_tags(), vec!["cheater".to_owned(), "Bot".to_owned()]);
    }

    #[test]
    fn newest_entries_orders_and_caps() {
        let engine = RuleEngine::new();
        engine.import_players(player_list(
            "community",
            vec![
                definition(PID_A, &["cheater"], 100),
                definition(PID_B, &["cheater"], 300),
                definition(76_561_197_960_265_730, &["suspicious"], 500),
            ],
        ));
        let tags = vec!["cheater".to_owned()];
        let newest = engine.newest_entries(10, &tags);
        assert_eq!(
            newest,
            vec![SteamId::from_u64(PID_B), SteamId::from_u64(PID_A)]
        );
        assert_eq!(engine.newest_entries(1, &tags).len(), 1);
    }
}
