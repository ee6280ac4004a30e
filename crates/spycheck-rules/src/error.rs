//! Error types for list import, matching, and export.

use spycheck_types::SteamId;

/// Errors produced by the rule engine.
#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    /// A rule carried a regex pattern that does not compile. The whole
    /// import fails; partially registered matchers are discarded.
    #[error("invalid regex pattern {pattern:?}: {source}")]
    InvalidRegex {
        /// The offending pattern text.
        pattern: String,
        /// The underlying compile error.
        source: Box<regex::Error>,
    },

    /// The id is already present in the local player list.
    #[error("steam id {0} is already marked in the local list")]
    Duplicate(SteamId),

    /// No imported list carries the requested title.
    #[error("unknown list: {0}")]
    UnknownList(String),

    /// Operator input was rejected before any state changed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// JSON serialization of an export failed.
    #[error("list serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}
