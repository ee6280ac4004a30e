//! Steam-facing data acquisition: the web metadata API and the on-disk
//! avatar cache.
//!
//! [`SteamWebClient`] wraps the two batch endpoints the engine polls
//! (player summaries and ban states) plus the avatar image download.
//! [`AvatarCache`] is a content-addressed filesystem cache keyed by the
//! 40-character avatar hash; a miss or a stale entry is the *normal*
//! [`SteamError::Expired`] condition that triggers a refetch.

pub mod cache;
pub mod error;
pub mod web;

pub use cache::AvatarCache;
pub use error::SteamError;
pub use web::{PlayerBanState, PlayerSummary, SteamWebClient};
