//! The 64-bit Steam player identifier and its textual representations.
//!
//! Console output and third-party list files refer to the same account in
//! three different spellings:
//!
//! - 64-bit decimal (`76561198198658783`) -- the canonical form, used by the
//!   web API and the persistent store;
//! - SteamID3 (`[U:1:238393055]`) -- what `status` and `tf_lobby_debug`
//!   print;
//! - SteamID2 (`STEAM_0:1:119196527`) -- the legacy form the game's
//!   voice-ban file stores.
//!
//! [`SteamId`] normalizes all of them onto the 64-bit value. List files in
//! the wild carry the `steamid` field as either a JSON string or a raw
//! number, so deserialization accepts both while serialization always
//! emits a string.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

/// The 64-bit id of the zeroth individual account (`STEAM_0:0:0`).
///
/// Every individual account id is this base plus the 32-bit account number.
const ACCOUNT_ID_BASE: u64 = 76_561_197_960_265_728;

/// Errors produced when parsing a Steam id from text.
#[derive(Debug, thiserror::Error)]
pub enum SteamIdError {
    /// The input is not a recognized SteamID3 or 64-bit decimal form.
    #[error("unparseable steam id: {0:?}")]
    Malformed(String),

    /// The input parsed but does not denote an individual account.
    #[error("steam id out of range: {0}")]
    OutOfRange(u64),
}

/// A 64-bit Steam account identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SteamId(u64);

impl SteamId {
    /// Wrap a raw 64-bit id. No validation is performed; use
    /// [`is_valid`](Self::is_valid) to check range.
    pub const fn from_u64(id: u64) -> Self {
        Self(id)
    }

    /// Build an id from the 32-bit account number (the `Z` in `[U:1:Z]`).
    pub const fn from_account_id(account_id: u32) -> Self {
        Self(ACCOUNT_ID_BASE + account_id as u64)
    }

    /// The raw 64-bit value.
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// The 32-bit account number, or 0 for ids below the individual base.
    pub const fn account_id(self) -> u32 {
        if self.0 > ACCOUNT_ID_BASE {
            (self.0 - ACCOUNT_ID_BASE) as u32
        } else {
            0
        }
    }

    /// Whether this id denotes an individual account.
    pub const fn is_valid(self) -> bool {
        self.0 > ACCOUNT_ID_BASE
    }

    /// Parse a SteamID3 fragment as printed by the game console, with or
    /// without the surrounding brackets (`[U:1:238393055]` / `U:1:238393055`).
    ///
    /// # Errors
    ///
    /// Returns [`SteamIdError::Malformed`] when the shape or the account
    /// number does not parse.
    pub fn parse_sid3(input: &str) -> Result<Self, SteamIdError> {
        let inner = input
            .trim()
            .trim_start_matches('[')
            .trim_end_matches(']');
        let mut parts = inner.split(':');
        let (kind, universe, account) = (parts.next(), parts.next(), parts.next());
        if parts.next().is_some() {
            return Err(SteamIdError::Malformed(input.to_owned()));
        }
        match (kind, universe, account) {
            (Some("U"), Some("1"), Some(account)) => {
                let account_id: u32 = account
                    .parse()
                    .map_err(|_| SteamIdError::Malformed(input.to_owned()))?;
                Ok(Self::from_account_id(account_id))
            }
            _ => Err(SteamIdError::Malformed(input.to_owned())),
        }
    }

    /// Parse either a 64-bit decimal string or a SteamID3 fragment.
    ///
    /// # Errors
    ///
    /// Returns [`SteamIdError::Malformed`] when neither form parses, or
    /// [`SteamIdError::OutOfRange`] when the value is below the individual
    /// account base.
    pub fn parse(input: &str) -> Result<Self, SteamIdError> {
        let trimmed = input.trim();
        let id = if let Ok(raw) = trimmed.parse::<u64>() {
            Self(raw)
        } else {
            Self::parse_sid3(trimmed)?
        };
        if !id.is_valid() {
            return Err(SteamIdError::OutOfRange(id.0));
        }
        Ok(id)
    }

    /// The legacy SteamID2 spelling (`STEAM_0:X:Y`), used by the game's
    /// voice-ban file.
    pub fn steam2(self) -> String {
        let account_id = self.account_id();
        format!("STEAM_0:{}:{}", account_id % 2, account_id / 2)
    }
}

impl std::fmt::Display for SteamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SteamId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<SteamId> for u64 {
    fn from(id: SteamId) -> Self {
        id.0
    }
}

impl std::str::FromStr for SteamId {
    type Err = SteamIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// List files must keep `steamid` a string on output, but inputs in the wild
// carry both string and integer forms.
impl Serialize for SteamId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for SteamId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SteamIdVisitor;

        impl Visitor<'_> for SteamIdVisitor {
            type Value = SteamId;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a steam id as a string or integer")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<SteamId, E> {
                Ok(SteamId::from_u64(value))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<SteamId, E> {
                u64::try_from(value)
                    .map(SteamId::from_u64)
                    .map_err(|_| E::custom(format!("negative steam id: {value}")))
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> Result<SteamId, E> {
                // Large ids arrive as f64 from lenient JSON decoders.
                Ok(SteamId::from_u64(value as u64))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<SteamId, E> {
                // Range validation happens at use sites; deserialization
                // only normalizes the spelling, mirroring visit_u64.
                if let Ok(raw) = value.trim().parse::<u64>() {
                    return Ok(SteamId::from_u64(raw));
                }
                SteamId::parse_sid3(value).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(SteamIdVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sid3_roundtrip() {
        let id = SteamId::parse_sid3("[U:1:238393055]").unwrap();
        assert_eq!(id.as_u64(), 76_561_198_198_658_783);
        assert_eq!(id.account_id(), 238_393_055);
        assert!(id.is_valid());
    }

    #[test]
    fn sid3_without_brackets() {
        let id = SteamId::parse_sid3("U:1:238393055").unwrap();
        assert_eq!(id.as_u64(), 76_561_198_198_658_783);
    }

    #[test]
    fn sid3_rejects_garbage() {
        assert!(SteamId::parse_sid3("[G:1:123]").is_err());
        assert!(SteamId::parse_sid3("[U:1:notanumber]").is_err());
        assert!(SteamId::parse_sid3("[U:1:1:2]").is_err());
    }

    #[test]
    fn parse_decimal() {
        let id = SteamId::parse("76561198198658783").unwrap();
        assert_eq!(id.account_id(), 238_393_055);
    }

    #[test]
    fn parse_rejects_out_of_range() {
        assert!(matches!(
            SteamId::parse("12345"),
            Err(SteamIdError::OutOfRange(_))
        ));
    }

    #[test]
    fn steam2_parity() {
        let odd = SteamId::from_account_id(238_393_055);
        assert_eq!(odd.steam2(), "STEAM_0:1:119196527");
        let even = SteamId::from_account_id(4);
        assert_eq!(even.steam2(), "STEAM_0:0:2");
    }

    #[test]
    fn serde_roundtrips_the_zero_placeholder() {
        // An unconfigured id serializes as "0" and must come back.
        let zero = SteamId::default();
        let encoded = serde_json::to_string(&zero).unwrap();
        let decoded: SteamId = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, zero);
        assert!(!decoded.is_valid());
    }

    #[test]
    fn serde_accepts_string_and_number() {
        let from_str: SteamId = serde_json::from_str("\"76561198198658783\"").unwrap();
        let from_num: SteamId = serde_json::from_str("76561198198658783").unwrap();
        assert_eq!(from_str, from_num);
        // Output is always a string.
        assert_eq!(
            serde_json::to_string(&from_str).unwrap(),
            "\"76561198198658783\""
        );
    }
}
