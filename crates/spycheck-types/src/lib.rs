//! Shared data types for the spycheck TF2 companion.
//!
//! This crate is the dependency leaf of the workspace: every other crate
//! builds on the identifiers, enums, and records defined here. It contains
//! no I/O and no async code.
//!
//! # Modules
//!
//! - [`ids`] -- the [`SteamId`] 64-bit player identifier and its textual forms
//! - [`enums`] -- small closed vocabularies ([`Team`], [`ProfileVisibility`], ...)
//! - [`structs`] -- the live records ([`Player`], [`Server`], [`UserMessage`],
//!   [`MatchResult`])

pub mod enums;
pub mod ids;
pub mod structs;

pub use enums::{ChatDest, MatcherKind, ProfileVisibility, Team};
pub use ids::{SteamId, SteamIdError};
pub use structs::{MatchResult, Player, Server, UserMessage, LOCAL_LIST_TITLE};
