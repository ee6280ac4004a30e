//! Writer for the game's `voice_ban.dt` file.
//!
//! The format is the game's own: a little-endian version word followed by
//! fixed-width entries, each holding a legacy `STEAM_0:X:Y` id string
//! null-padded to 32 bytes. The game mutes every listed player's voice
//! chat. The export takes the newest kickable ids, capped at the game's
//! list size.

use std::io::Write;
use std::path::Path;

use spycheck_rules::RuleEngine;
use spycheck_types::SteamId;
use tracing::info;

/// Format version the game expects.
const BAN_MGR_VERSION: u32 = 1;

/// Fixed width of one id entry.
const ENTRY_LEN: usize = 32;

/// Most entries the game honors.
pub const MAX_VOICE_BANS: usize = 200;

/// Serialize ids into the voice-ban wire format.
///
/// # Errors
///
/// Returns any underlying write error.
pub fn write_voice_bans<W: Write>(writer: &mut W, ids: &[SteamId]) -> std::io::Result<()> {
    writer.write_all(&BAN_MGR_VERSION.to_le_bytes())?;
    for id in ids.iter().take(MAX_VOICE_BANS) {
        let mut entry = [0u8; ENTRY_LEN];
        let steam2 = id.steam2();
        let bytes = steam2.as_bytes();
        let len = bytes.len().min(ENTRY_LEN - 1);
        entry[..len].copy_from_slice(&bytes[..len]);
        writer.write_all(&entry)?;
    }
    Ok(())
}

/// Export the newest kickable ids to `<tf2_dir>/voice_ban.dt`.
///
/// Writes nothing when no listed player carries a kickable tag.
///
/// # Errors
///
/// Returns any filesystem error.
pub fn export(path: &Path, rules: &RuleEngine, kick_tags: &[String]) -> std::io::Result<()> {
    let ids = rules.newest_entries(MAX_VOICE_BANS, kick_tags);
    if ids.is_empty() {
        return Ok(());
    }
    let mut file = std::fs::File::create(path)?;
    write_voice_bans(&mut file, &ids)?;
    info!(count = ids.len(), path = %path.display(), "voice ban list exported");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_and_fixed_width_entries() {
        let ids = vec![
            SteamId::from_account_id(238_393_055),
            SteamId::from_account_id(4),
        ];
        let mut buf = Vec::new();
        write_voice_bans(&mut buf, &ids).unwrap();
        assert_eq!(buf.len(), 4 + 2 * ENTRY_LEN);
        assert_eq!(&buf[0..4], &1u32.to_le_bytes());
        // First entry holds the steam2 spelling, null-padded.
        let first = &buf[4..4 + ENTRY_LEN];
        assert!(first.starts_with(b"STEAM_0:1:119196527"));
        assert!(first.ends_with(&[0]));
    }

    #[test]
    fn entry_count_is_capped() {
        let ids: Vec<SteamId> = (0..MAX_VOICE_BANS as u32 + 50)
            .map(SteamId::from_account_id)
            .collect();
        let mut buf = Vec::new();
        write_voice_bans(&mut buf, &ids).unwrap();
        assert_eq!(buf.len(), 4 + MAX_VOICE_BANS * ENTRY_LEN);
    }
}
