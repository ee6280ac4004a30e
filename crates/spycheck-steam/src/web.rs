//! Batched calls against the Steam web API.
//!
//! Two endpoints are polled: `GetPlayerSummaries` (visibility, avatar
//! hash, account age, real name) and `GetPlayerBans` (VAC/game/community/
//! economy bans). Both take up to 100 ids per request; the engine's update
//! tick is the rate limiter, so there is no backoff here -- a failed batch
//! is simply retried on the next tick. Response entries whose id fails to
//! parse are skipped with a warning rather than failing the batch.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use spycheck_types::{ProfileVisibility, SteamId};
use tracing::warn;

use crate::error::SteamError;

/// Hard ceiling on ids per batch request, imposed by the API.
pub const MAX_BATCH: usize = 100;

/// Host serving full-size avatar images.
const AVATAR_HOST: &str = "https://avatars.akamai.steamstatic.com";

/// Base URL of the ISteamUser interface.
const API_HOST: &str = "https://api.steampowered.com";

/// Profile fields extracted from a summaries response entry.
#[derive(Debug, Clone)]
pub struct PlayerSummary {
    pub steam_id: SteamId,
    pub visibility: ProfileVisibility,
    pub avatar_hash: String,
    pub real_name: String,
    pub account_created_on: Option<DateTime<Utc>>,
}

/// Ban fields extracted from a bans response entry.
#[derive(Debug, Clone)]
pub struct PlayerBanState {
    pub steam_id: SteamId,
    pub community_banned: bool,
    pub number_of_vac_bans: u32,
    pub number_of_game_bans: u32,
    pub economy_banned: bool,
    /// Days since the most recent ban; zero when never banned.
    pub days_since_last_ban: u32,
}

// Wire shapes. Steam is inconsistent about casing between the two
// endpoints, hence the per-endpoint rename rules.

#[derive(Debug, Deserialize)]
struct SummariesEnvelope {
    response: SummariesBody,
}

#[derive(Debug, Deserialize)]
struct SummariesBody {
    players: Vec<WireSummary>,
}

#[derive(Debug, Deserialize)]
struct WireSummary {
    steamid: String,
    #[serde(default)]
    communityvisibilitystate: i64,
    #[serde(default)]
    avatarhash: String,
    #[serde(default)]
    realname: String,
    #[serde(default)]
    timecreated: i64,
}

#[derive(Debug, Deserialize)]
struct BansEnvelope {
    players: Vec<WireBan>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireBan {
    #[serde(rename = "SteamId")]
    steam_id: String,
    #[serde(default)]
    community_banned: bool,
    #[serde(default, rename = "NumberOfVACBans")]
    number_of_vac_bans: u32,
    #[serde(default)]
    number_of_game_bans: u32,
    #[serde(default)]
    days_since_last_ban: u32,
    #[serde(default)]
    economy_ban: String,
}

/// Client for the two batch endpoints plus avatar downloads.
pub struct SteamWebClient {
    client: reqwest::Client,
    api_key: String,
}

impl SteamWebClient {
    /// Build a client with the given API key and per-call timeout.
    ///
    /// # Errors
    ///
    /// Returns [`SteamError::Http`] if the underlying client cannot be
    /// constructed.
    pub fn new(api_key: impl Into<String>, timeout: std::time::Duration) -> Result<Self, SteamError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
        })
    }

    /// Fetch profile summaries for up to [`MAX_BATCH`] ids.
    ///
    /// # Errors
    ///
    /// Returns [`SteamError::Http`] / [`SteamError::Status`] on transport
    /// failure; individual unparseable entries are skipped, not errors.
    pub async fn player_summaries(
        &self,
        ids: &[SteamId],
    ) -> Result<Vec<PlayerSummary>, SteamError> {
        let url = format!("{API_HOST}/ISteamUser/GetPlayerSummaries/v0002/");
        let response = self
            .client
            .get(url)
            .query(&[("key", self.api_key.as_str()), ("steamids", &join_ids(ids))])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(SteamError::Status(response.status()));
        }
        let envelope: SummariesEnvelope = response.json().await?;
        Ok(convert_summaries(envelope))
    }

    /// Fetch ban states for up to [`MAX_BATCH`] ids.
    ///
    /// # Errors
    ///
    /// Returns [`SteamError::Http`] / [`SteamError::Status`] on transport
    /// failure; individual unparseable entries are skipped, not errors.
    pub async fn player_bans(&self, ids: &[SteamId]) -> Result<Vec<PlayerBanState>, SteamError> {
        let url = format!("{API_HOST}/ISteamUser/GetPlayerBans/v1/");
        let response = self
            .client
            .get(url)
            .query(&[("key", self.api_key.as_str()), ("steamids", &join_ids(ids))])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(SteamError::Status(response.status()));
        }
        let envelope: BansEnvelope = response.json().await?;
        Ok(convert_bans(envelope))
    }

    /// Download the full-size avatar image for a hash.
    ///
    /// # Errors
    ///
    /// Returns [`SteamError::Http`] / [`SteamError::Status`] on failure.
    pub async fn fetch_avatar(&self, hash: &str) -> Result<Vec<u8>, SteamError> {
        let url = avatar_url(hash);
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(SteamError::Status(response.status()));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// URL of the full-size avatar image for a hash.
pub fn avatar_url(hash: &str) -> String {
    format!("{AVATAR_HOST}/{hash}_full.jpg")
}

fn join_ids(ids: &[SteamId]) -> String {
    if ids.len() > MAX_BATCH {
        warn!(count = ids.len(), "steam batch exceeds cap, truncating");
    }
    ids.iter()
        .take(MAX_BATCH)
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn convert_summaries(envelope: SummariesEnvelope) -> Vec<PlayerSummary> {
    envelope
        .response
        .players
        .into_iter()
        .filter_map(|wire| {
            let steam_id = match SteamId::parse(&wire.steamid) {
                Ok(id) => id,
                Err(err) => {
                    warn!(raw = %wire.steamid, error = %err, "skipping summary with bad steam id");
                    return None;
                }
            };
            let account_created_on = (wire.timecreated > 0)
                .then(|| Utc.timestamp_opt(wire.timecreated, 0).single())
                .flatten();
            Some(PlayerSummary {
                steam_id,
                visibility: ProfileVisibility::from(wire.communityvisibilitystate),
                avatar_hash: wire.avatarhash,
                real_name: wire.realname,
                account_created_on,
            })
        })
        .collect()
}

fn convert_bans(envelope: BansEnvelope) -> Vec<PlayerBanState> {
    envelope
        .players
        .into_iter()
        .filter_map(|wire| {
            let steam_id = match SteamId::parse(&wire.steam_id) {
                Ok(id) => id,
                Err(err) => {
                    warn!(raw = %wire.steam_id, error = %err, "skipping ban entry with bad steam id");
                    return None;
                }
            };
            Some(PlayerBanState {
                steam_id,
                community_banned: wire.community_banned,
                number_of_vac_bans: wire.number_of_vac_bans,
                number_of_game_bans: wire.number_of_game_bans,
                economy_banned: wire.economy_ban != "none" && !wire.economy_ban.is_empty(),
                days_since_last_ban: wire.days_since_last_ban,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summaries_parse_and_skip_bad_ids() {
        let raw = r#"{
            "response": {
                "players": [
                    {
                        "steamid": "76561198198658783",
                        "communityvisibilitystate": 3,
                        "avatarhash": "fef49e7fa7e1997310d705b2a6158ff8dc1cdfeb",
                        "realname": "Someone",
                        "timecreated": 1262304000
                    },
                    {"steamid": "not-an-id"}
                ]
            }
        }"#;
        let envelope: SummariesEnvelope = serde_json::from_str(raw).unwrap();
        let summaries = convert_summaries(envelope);
        assert_eq!(summaries.len(), 1);
        let summary = &summaries[0];
        assert_eq!(summary.steam_id.as_u64(), 76_561_198_198_658_783);
        assert_eq!(summary.visibility, ProfileVisibility::Public);
        assert_eq!(summary.avatar_hash, "fef49e7fa7e1997310d705b2a6158ff8dc1cdfeb");
        assert_eq!(
            summary.account_created_on.unwrap(),
            Utc.timestamp_opt(1_262_304_000, 0).single().unwrap()
        );
    }

    #[test]
    fn bans_parse_economy_flag() {
        let raw = r#"{
            "players": [
                {
                    "SteamId": "76561198198658783",
                    "CommunityBanned": true,
                    "VACBanned": true,
                    "NumberOfVACBans": 2,
                    "DaysSinceLastBan": 30,
                    "NumberOfGameBans": 1,
                    "EconomyBan": "banned"
                },
                {
                    "SteamId": "76561197961279983",
                    "EconomyBan": "none"
                }
            ]
        }"#;
        let envelope: BansEnvelope = serde_json::from_str(raw).unwrap();
        let bans = convert_bans(envelope);
        assert_eq!(bans.len(), 2);
        assert!(bans[0].community_banned);
        assert!(bans[0].economy_banned);
        assert_eq!(bans[0].number_of_vac_bans, 2);
        assert_eq!(bans[0].days_since_last_ban, 30);
        assert!(!bans[1].economy_banned);
        assert_eq!(bans[1].number_of_vac_bans, 0);
    }

    #[test]
    fn id_join_caps_at_batch_limit() {
        let ids: Vec<SteamId> = (0..150).map(SteamId::from_account_id).collect();
        let joined = join_ids(&ids);
        assert_eq!(joined.split(',').count(), MAX_BATCH);
    }

    #[test]
    fn avatar_url_shape() {
        assert_eq!(
            avatar_url("fef49e7fa7e1997310d705b2a6158ff8dc1cdfeb"),
            "https://avatars.akamai.steamstatic.com/fef49e7fa7e1997310d705b2a6158ff8dc1cdfeb_full.jpg"
        );
    }
}
