//! Matcher variants compiled from imported lists.
//!
//! There are only four matcher shapes, so they are a tagged sum rather
//! than trait objects: a steam-id equality check, a plain text comparison
//! in one of several modes, a compiled-regex text comparison, and an
//! avatar digest lookup. Text matchers are tagged with the query they
//! serve (player names or chat messages).

use regex::Regex;
use spycheck_types::{MatchResult, MatcherKind};

use crate::schema::TextMatchMode;

/// Which text query a text matcher participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextTarget {
    Name,
    Message,
}

impl TextTarget {
    const fn kind(self) -> MatcherKind {
        match self {
            Self::Name => MatcherKind::Name,
            Self::Message => MatcherKind::Message,
        }
    }
}

/// A text matcher compiled from a rule trigger.
#[derive(Debug)]
pub enum TextMatcher {
    /// Plain string comparison in one of the [`TextMatchMode`]s.
    General {
        origin: String,
        target: TextTarget,
        mode: TextMatchMode,
        case_sensitive: bool,
        patterns: Vec<String>,
        attributes: Vec<String>,
    },
    /// Pre-compiled regular expressions.
    Regex {
        origin: String,
        target: TextTarget,
        patterns: Vec<Regex>,
        attributes: Vec<String>,
    },
}

impl TextMatcher {
    /// The query this matcher serves.
    pub fn target(&self) -> TextTarget {
        match self {
            Self::General { target, .. } | Self::Regex { target, .. } => *target,
        }
    }

    /// Title of the list this matcher came from.
    pub fn origin(&self) -> &str {
        match self {
            Self::General { origin, .. } | Self::Regex { origin, .. } => origin,
        }
    }

    /// Test `value`, producing a match result on success.
    pub fn matches(&self, value: &str) -> Option<MatchResult> {
        match self {
            Self::General {
                origin,
                target,
                mode,
                case_sensitive,
                patterns,
                attributes,
            } => general_text_match(value, *mode, *case_sensitive, patterns).then(|| MatchResult {
                origin: origin.clone(),
                matcher_type: target.kind(),
                attributes: attributes.clone(),
            }),
            Self::Regex {
                origin,
                target,
                patterns,
                attributes,
            } => patterns
                .iter()
                .any(|re| re.is_match(value))
                .then(|| MatchResult {
                    origin: origin.clone(),
                    matcher_type: target.kind(),
                    attributes: attributes.clone(),
                }),
        }
    }
}

fn general_text_match(
    value: &str,
    mode: TextMatchMode,
    case_sensitive: bool,
    patterns: &[String],
) -> bool {
    let folded_value;
    let value = if case_sensitive {
        value
    } else {
        folded_value = value.to_lowercase();
        &folded_value
    };
    let test = |pattern: &String| {
        let folded_pattern;
        let pattern = if case_sensitive {
            pattern.as_str()
        } else {
            folded_pattern = pattern.to_lowercase();
            &folded_pattern
        };
        match mode {
            TextMatchMode::Contains => value.contains(pattern),
            TextMatchMode::Equal => value == pattern,
            TextMatchMode::StartsWith => value.starts_with(pattern),
            TextMatchMode::EndsWith => value.ends_with(pattern),
            TextMatchMode::Word => value.split_whitespace().any(|word| word == pattern),
            // Regex patterns are compiled at import; they never reach here.
            TextMatchMode::Regex => false,
        }
    };
    patterns.iter().any(test)
}

/// Matches a single steam id, registered from a player-list entry.
#[derive(Debug)]
pub struct SteamIdMatcher {
    pub origin: String,
    pub steam_id: spycheck_types::SteamId,
    pub attributes: Vec<String>,
}

impl SteamIdMatcher {
    /// Test an id, producing a match result on equality.
    pub fn matches(&self, steam_id: spycheck_types::SteamId) -> Option<MatchResult> {
        (steam_id == self.steam_id).then(|| MatchResult {
            origin: self.origin.clone(),
            matcher_type: MatcherKind::Steam,
            attributes: self.attributes.clone(),
        })
    }
}

/// Matches avatar content by 40-character SHA-1 hex digest.
#[derive(Debug)]
pub struct AvatarMatcher {
    pub origin: String,
    pub hashes: Vec<String>,
    pub attributes: Vec<String>,
}

impl AvatarMatcher {
    /// Test a hex digest against the registered hashes.
    pub fn matches(&self, hex_digest: &str) -> Option<MatchResult> {
        self.hashes
            .iter()
            .any(|h| h == hex_digest)
            .then(|| MatchResult {
                origin: self.origin.clone(),
                matcher_type: MatcherKind::Avatar,
                attributes: self.attributes.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn general(mode: TextMatchMode, case_sensitive: bool, patterns: &[&str]) -> TextMatcher {
        TextMatcher::General {
            origin: "test".to_owned(),
            target: TextTarget::Name,
            mode,
            case_sensitive,
            patterns: patterns.iter().map(|s| (*s).to_owned()).collect(),
            attributes: Vec::new(),
        }
    }

    #[test]
    fn contains_case_insensitive() {
        let m = general(TextMatchMode::Contains, false, &["BOT"]);
        assert!(m.matches("a bot among us").is_some());
        assert!(m.matches("nothing here").is_none());
    }

    #[test]
    fn equal_respects_case_flag() {
        let sensitive = general(TextMatchMode::Equal, true, &["Bot"]);
        assert!(sensitive.matches("bot").is_none());
        assert!(sensitive.matches("Bot").is_some());
        let insensitive = general(TextMatchMode::Equal, false, &["Bot"]);
        assert!(insensitive.matches("bOT").is_some());
    }

    #[test]
    fn starts_and_ends_with() {
        assert!(general(TextMatchMode::StartsWith, false, &["hacker"])
            .matches("hackerman99")
            .is_some());
        assert!(general(TextMatchMode::EndsWith, false, &[".exe"])
            .matches("player.EXE")
            .is_some());
    }

    #[test]
    fn word_splits_on_whitespace() {
        let m = general(TextMatchMode::Word, false, &["trade"]);
        assert!(m.matches("free trade site").is_some());
        assert!(m.matches("traders unite").is_none());
    }

    #[test]
    fn regex_matcher() {
        let m = TextMatcher::Regex {
            origin: "test".to_owned(),
            target: TextTarget::Message,
            patterns: vec![Regex::new(r"(?i)^buy .* keys$").unwrap()],
            attributes: vec!["spam".to_owned()],
        };
        let result = m.matches("BUY cheap KEYS").unwrap();
        assert_eq!(result.matcher_type, MatcherKind::Message);
        assert_eq!(result.attributes, vec!["spam".to_owned()]);
    }

    #[test]
    fn avatar_digest_lookup() {
        let m = AvatarMatcher {
            origin: "test".to_owned(),
            hashes: vec!["a9993e364706816aba3e25717850c26c9cd0d89d".to_owned()],
            attributes: Vec::new(),
        };
        assert!(m.matches("a9993e364706816aba3e25717850c26c9cd0d89d").is_some());
        assert!(m.matches("da39a3ee5e6b4b0d3255bfef95601890afd80709").is_none());
    }
}
