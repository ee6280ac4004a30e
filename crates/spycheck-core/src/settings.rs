//! Operator settings: a YAML file with defaults for every knob.
//!
//! The canonical file is `settings.yaml` inside the config root (the
//! directory holding the local lists, the database, and the avatar
//! cache). A missing file is created with defaults on first run. The API
//! key can also arrive through `SPYCHECK_STEAM_API_KEY`, which overrides
//! the file so the secret never has to live on disk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use spycheck_types::SteamId;
use tracing::info;

/// Environment override for the Steam web API key.
pub const API_KEY_ENV: &str = "SPYCHECK_STEAM_API_KEY";

/// Errors that can occur when loading settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Failed to read or write the settings file.
    #[error("failed to access settings file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the YAML content.
    #[error("failed to parse settings YAML: {0}")]
    Yaml(#[from] serde_yml::Error),
}

/// How the admin-channel credentials are chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RconMode {
    /// Use the configured port and password verbatim.
    Static,
    /// Generate a fresh port and password for every session.
    #[default]
    Random,
}

/// Admin channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RconSettings {
    #[serde(default)]
    pub mode: RconMode,
    #[serde(default = "default_rcon_host")]
    pub host: String,
    #[serde(default = "default_rcon_port")]
    pub port: u16,
    #[serde(default = "default_rcon_password")]
    pub password: String,
}

impl Default for RconSettings {
    fn default() -> Self {
        Self {
            mode: RconMode::default(),
            host: default_rcon_host(),
            port: default_rcon_port(),
            password: default_rcon_password(),
        }
    }
}

/// Concrete credentials for one session.
#[derive(Debug, Clone)]
pub struct RconCredentials {
    pub host: String,
    pub port: u16,
    pub password: String,
}

impl RconSettings {
    /// Resolve credentials for this session. In [`RconMode::Random`] a
    /// fresh high port and password are generated each call.
    pub fn session_credentials(&self) -> RconCredentials {
        match self.mode {
            RconMode::Static => RconCredentials {
                host: self.host.clone(),
                port: self.port,
                password: self.password.clone(),
            },
            RconMode::Random => {
                let mut rng = rand::thread_rng();
                let password: String = (&mut rng)
                    .sample_iter(Alphanumeric)
                    .take(20)
                    .map(char::from)
                    .collect();
                RconCredentials {
                    host: self.host.clone(),
                    port: rng.gen_range(40000..=65535),
                    password,
                }
            }
        }
    }
}

/// Which list kind a configured URL points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Players,
    Rules,
}

/// One third-party list subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListConfig {
    pub url: String,
    pub kind: ListKind,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Complete operator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Steam web API key; empty disables summaries/bans polling.
    #[serde(default)]
    pub steam_api_key: String,

    /// The local player's 64-bit id, used for team resolution and the
    /// kills-on / deaths-by counters.
    #[serde(default)]
    pub steam_id: SteamId,

    /// Game installation directory (holds `console.log` and
    /// `voice_ban.dt`).
    #[serde(default)]
    pub tf2_dir: PathBuf,

    /// Steam installation directory.
    #[serde(default)]
    pub steam_dir: PathBuf,

    #[serde(default)]
    pub rcon: RconSettings,

    // Feature toggles.
    #[serde(default)]
    pub kicker_enabled: bool,
    #[serde(default = "default_kick_tags")]
    pub kick_tags: Vec<String>,
    #[serde(default)]
    pub chat_warnings_enabled: bool,
    #[serde(default = "default_true")]
    pub party_warnings_enabled: bool,
    #[serde(default)]
    pub voice_bans_enabled: bool,
    #[serde(default)]
    pub auto_launch_game: bool,
    #[serde(default)]
    pub auto_close_on_exit: bool,
    #[serde(default)]
    pub debug_log: bool,

    /// Seconds without observation after which a player is expired.
    #[serde(default = "default_disconnect_timeout")]
    pub player_disconnect_timeout_secs: u64,

    /// Minimum seconds between two announcements of the same kind for a
    /// single player.
    #[serde(default = "default_announce_timeout")]
    pub announce_timeout_secs: u64,

    /// Hours a fetched profile stays fresh before a web update is queued.
    #[serde(default = "default_profile_cache_hours")]
    pub profile_cache_hours: u64,

    /// Per-batch timeout for web metadata calls, in seconds.
    #[serde(default = "default_web_timeout")]
    pub web_request_timeout_secs: u64,

    /// Reprocess the whole console log on startup instead of seeking to
    /// the end.
    #[serde(default)]
    pub reprocess_log: bool,

    /// Third-party list subscriptions refreshed at startup.
    #[serde(default = "default_lists")]
    pub lists: Vec<ListConfig>,

    /// Directory holding the database, local lists, and caches. Defaults
    /// to the directory the settings file lives in.
    #[serde(skip)]
    pub config_root: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            steam_api_key: String::new(),
            steam_id: SteamId::default(),
            tf2_dir: PathBuf::new(),
            steam_dir: PathBuf::new(),
            rcon: RconSettings::default(),
            kicker_enabled: false,
            kick_tags: default_kick_tags(),
            chat_warnings_enabled: false,
            party_warnings_enabled: true,
            voice_bans_enabled: false,
            auto_launch_game: false,
            auto_close_on_exit: false,
            debug_log: false,
            player_disconnect_timeout_secs: default_disconnect_timeout(),
            announce_timeout_secs: default_announce_timeout(),
            profile_cache_hours: default_profile_cache_hours(),
            web_request_timeout_secs: default_web_timeout(),
            reprocess_log: false,
            lists: default_lists(),
            config_root: PathBuf::new(),
        }
    }
}

impl Settings {
    /// Load settings from `path`, creating the file with defaults when it
    /// does not exist. Environment overrides are applied afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Io`] when the file (or its directory)
    /// cannot be accessed, or [`SettingsError::Yaml`] when the content is
    /// malformed.
    pub fn load_or_create(path: &Path) -> Result<Self, SettingsError> {
        let mut settings: Self = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            serde_yml::from_str(&contents)?
        } else {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let defaults = Self::default();
            std::fs::write(path, serde_yml::to_string(&defaults)?)?;
            info!(path = %path.display(), "wrote default settings");
            defaults
        };
        settings.config_root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        settings.apply_env_overrides();
        Ok(settings)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.is_empty() {
                self.steam_api_key = key;
            }
        }
    }

    // Derived paths.

    pub fn db_path(&self) -> PathBuf {
        self.config_root.join("spycheck.sqlite")
    }

    pub fn local_player_list_path(&self) -> PathBuf {
        self.config_root.join("playerlist.local.json")
    }

    pub fn local_rules_list_path(&self) -> PathBuf {
        self.config_root.join("rules.local.json")
    }

    pub fn console_log_path(&self) -> PathBuf {
        self.tf2_dir.join("console.log")
    }

    pub fn voice_ban_path(&self) -> PathBuf {
        self.tf2_dir.join("voice_ban.dt")
    }

    // Derived durations.

    pub fn disconnect_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.player_disconnect_timeout_secs as i64)
    }

    pub fn announce_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.announce_timeout_secs as i64)
    }

    pub fn profile_cache_timeout(&self) -> chrono::Duration {
        chrono::Duration::hours(self.profile_cache_hours as i64)
    }

    pub fn web_request_timeout(&self) -> Duration {
        Duration::from_secs(self.web_request_timeout_secs)
    }

    /// The profile cache timeout as a std duration, shared with the
    /// avatar cache TTL.
    pub fn cache_max_age(&self) -> Duration {
        Duration::from_secs(self.profile_cache_hours * 3600)
    }
}

fn default_true() -> bool {
    true
}

fn default_rcon_host() -> String {
    "127.0.0.1".to_owned()
}

fn default_rcon_port() -> u16 {
    21793
}

fn default_rcon_password() -> String {
    "spycheck".to_owned()
}

fn default_kick_tags() -> Vec<String> {
    vec!["cheater".to_owned(), "bot".to_owned()]
}

fn default_disconnect_timeout() -> u64 {
    25
}

fn default_announce_timeout() -> u64 {
    300
}

fn default_profile_cache_hours() -> u64 {
    6
}

fn default_web_timeout() -> u64 {
    5
}

fn default_lists() -> Vec<ListConfig> {
    vec![ListConfig {
        url: "https://raw.githubusercontent.com/PazerOP/tf2_bot_detector/master/staging/cfg/playerlist.official.json".to_owned(),
        kind: ListKind::Players,
        enabled: false,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        let settings = Settings::load_or_create(&path).unwrap();
        assert!(path.exists());
        assert_eq!(settings.config_root, dir.path());
        assert!(settings.party_warnings_enabled);
        assert_eq!(settings.player_disconnect_timeout_secs, 25);

        // Second load parses the file that was just written.
        let reloaded = Settings::load_or_create(&path).unwrap();
        assert_eq!(reloaded.kick_tags, settings.kick_tags);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        std::fs::write(
            &path,
            "steam_id: \"76561198198658783\"\nkicker_enabled: true\n",
        )
        .unwrap();
        let settings = Settings::load_or_create(&path).unwrap();
        assert!(settings.kicker_enabled);
        assert_eq!(settings.steam_id.as_u64(), 76_561_198_198_658_783);
        assert_eq!(settings.announce_timeout_secs, 300);
        assert_eq!(settings.db_path(), dir.path().join("spycheck.sqlite"));
    }

    #[test]
    fn random_rcon_credentials_vary_per_session() {
        let rcon = RconSettings::default();
        let a = rcon.session_credentials();
        let b = rcon.session_credentials();
        assert_eq!(a.host, "127.0.0.1");
        assert!(a.port >= 40000);
        assert_eq!(a.password.len(), 20);
        // Two draws colliding on both fields is vanishingly unlikely.
        assert!(a.port != b.port || a.password != b.password);
    }

    #[test]
    fn static_rcon_credentials_pass_through() {
        let rcon = RconSettings {
            mode: RconMode::Static,
            host: "127.0.0.1".to_owned(),
            port: 27015,
            password: "fixed".to_owned(),
        };
        let creds = rcon.session_credentials();
        assert_eq!(creds.port, 27015);
        assert_eq!(creds.password, "fixed");
    }
}
