//! Component construction and task lifecycle.
//!
//! The supervisor builds every component from settings, spawns the
//! engine and its satellite tasks, and tears everything down on
//! cancellation. Failures
//! during construction (settings, database, log reader) are fatal and
//! bubble up to the binary; once running, tasks own their errors.

use std::sync::Arc;
use std::time::Duration;

use spycheck_console::{LogParser, LogTail};
use spycheck_db::PlayerStore;
use spycheck_rcon::RconClient;
use spycheck_rules::{PlayerListSchema, RuleEngine, RuleSchema};
use spycheck_steam::{AvatarCache, SteamWebClient};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::avatar;
use crate::engine::{status_updater, Engine};
use crate::error::CoreError;
use crate::handle::StateHandle;
use crate::lists;
use crate::process::{watch, GameProcessMonitor};
use crate::settings::Settings;
use crate::state::GameState;
use crate::voice_ban;

/// Raw console lines in flight between the tail/poller and the parser.
const LINE_CHANNEL_CAPACITY: usize = 512;

/// Parsed events and state updates in flight.
const GAME_STATE_CAPACITY: usize = 50;

/// Queued avatar jobs.
const AVATAR_QUEUE_CAPACITY: usize = 32;

/// How long tasks get to exit after cancellation.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Cadence of third-party list re-downloads.
const LIST_REFRESH_INTERVAL: Duration = Duration::from_secs(3600);

/// A running instance of the companion core.
pub struct Supervisor {
    handle: StateHandle,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
    store: Arc<PlayerStore>,
    rcon: Arc<RconClient>,
    store_cancel: CancellationToken,
    cancel: CancellationToken,
}

impl Supervisor {
    /// Construct every component and spawn the task set.
    ///
    /// # Errors
    ///
    /// Returns the first construction failure: settings-derived paths,
    /// database open/migration, web client build, or log reader creation.
    /// These are fatal; the caller should exit non-zero.
    pub async fn start(
        settings: Settings,
        monitor: Arc<dyn GameProcessMonitor>,
        cancel: CancellationToken,
    ) -> Result<Self, CoreError> {
        let settings = Arc::new(settings);

        let rules = Arc::new(load_rule_engine(&settings));

        // The store gets its own token: the engine still flushes dirty
        // players after the shared token fires, so store operations must
        // survive into the grace window.
        let store_cancel = CancellationToken::new();
        let store = Arc::new(PlayerStore::connect(&settings.db_path(), store_cancel.clone()).await?);
        store.init().await?;

        let cache = Arc::new(AvatarCache::new(
            settings.config_root.clone(),
            settings.cache_max_age(),
        ));
        let credentials = settings.rcon.session_credentials();
        let rcon = Arc::new(RconClient::new(
            credentials.host,
            credentials.port,
            credentials.password,
        ));
        let web = Arc::new(SteamWebClient::new(
            settings.steam_api_key.clone(),
            settings.web_request_timeout(),
        )?);

        let (lines_tx, lines_rx) = mpsc::channel::<String>(LINE_CHANNEL_CAPACITY);
        let (events_tx, events_rx) = mpsc::channel(GAME_STATE_CAPACITY);
        let (updates_tx, updates_rx) = mpsc::channel(GAME_STATE_CAPACITY);
        let (avatar_tx, avatar_rx) = mpsc::channel(AVATAR_QUEUE_CAPACITY);

        let tail = LogTail::create(settings.console_log_path(), settings.reprocess_log)?;

        let state = Arc::new(GameState::new());
        let handle = StateHandle::new(
            Arc::clone(&state),
            Arc::clone(&store),
            updates_tx.clone(),
        );

        let engine = Engine::new(
            Arc::clone(&state),
            Arc::clone(&store),
            Arc::clone(&rules),
            Arc::clone(&rcon),
            Arc::clone(&web),
            Arc::clone(&settings),
            events_rx,
            updates_rx,
            updates_tx.clone(),
            avatar_tx,
        );

        let mut tasks: Vec<(&'static str, JoinHandle<()>)> = Vec::new();
        tasks.push(("log-tail", tokio::spawn(tail.run(lines_tx.clone(), cancel.clone()))));
        tasks.push((
            "log-parser",
            tokio::spawn(spycheck_console::parser::run(
                LogParser::new(),
                lines_rx,
                events_tx,
                cancel.clone(),
            )),
        ));
        tasks.push(("engine", tokio::spawn(engine.run(cancel.clone()))));
        tasks.push((
            "status-updater",
            tokio::spawn(status_updater(
                Arc::clone(&rcon),
                lines_tx,
                cancel.clone(),
            )),
        ));
        tasks.push((
            "avatar-worker",
            tokio::spawn(avatar::run(
                cache,
                Arc::clone(&web),
                Arc::clone(&rules),
                avatar_rx,
                updates_tx,
                cancel.clone(),
            )),
        ));
        tasks.push((
            "process-watcher",
            tokio::spawn(watch(
                monitor,
                settings.auto_close_on_exit,
                cancel.clone(),
            )),
        ));

        // List refresh runs at startup and then periodically; the
        // voice-ban file is rewritten after each refresh so it reflects
        // freshly imported entries.
        {
            let settings = Arc::clone(&settings);
            let rules = Arc::clone(&rules);
            let cancel = cancel.clone();
            tasks.push((
                "list-refresh",
                tokio::spawn(async move {
                    let client = match reqwest::Client::builder()
                        .timeout(Duration::from_secs(15))
                        .build()
                    {
                        Ok(client) => client,
                        Err(err) => {
                            warn!(error = %err, "could not build list download client");
                            return;
                        }
                    };
                    loop {
                        lists::refresh(&client, &rules, &settings.lists).await;
                        if settings.voice_bans_enabled {
                            if let Err(err) = voice_ban::export(
                                &settings.voice_ban_path(),
                                &rules,
                                &settings.kick_tags,
                            ) {
                                warn!(error = %err, "voice ban export failed");
                            }
                        }
                        tokio::select! {
                            () = cancel.cancelled() => break,
                            () = tokio::time::sleep(LIST_REFRESH_INTERVAL) => {}
                        }
                    }
                }),
            ));
        }

        info!(
            kicker = settings.kicker_enabled,
            party_warnings = settings.party_warnings_enabled,
            chat_warnings = settings.chat_warnings_enabled,
            voice_bans = settings.voice_bans_enabled,
            auto_close = settings.auto_close_on_exit,
            "supervisor started"
        );

        Ok(Self {
            handle,
            tasks,
            store,
            rcon,
            store_cancel,
            cancel,
        })
    }

    /// The operator surface for this instance.
    pub fn handle(&self) -> StateHandle {
        self.handle.clone()
    }

    /// Block until cancellation, then retire every task within the grace
    /// interval and release the store and admin channel.
    pub async fn wait(self) {
        self.cancel.cancelled().await;
        info!("shutting down");

        for (name, task) in self.tasks {
            if tokio::time::timeout(SHUTDOWN_GRACE, task).await.is_err() {
                warn!(task = name, "task did not exit within the grace interval");
            }
        }

        self.store_cancel.cancel();
        self.store.close().await;
        self.rcon.close().await;
        info!("goodbye");
    }
}

/// Build the rule engine, seeding the local lists from disk when saved
/// copies exist. Parse failures fall back to empty local lists.
fn load_rule_engine(settings: &Settings) -> RuleEngine {
    let players = read_json::<PlayerListSchema>(&settings.local_player_list_path());
    let rules_list = read_json::<RuleSchema>(&settings.local_rules_list_path());
    if players.is_none() && rules_list.is_none() {
        return RuleEngine::new();
    }
    let players = players.unwrap_or_else(PlayerListSchema::local);
    let rules_list = rules_list.unwrap_or_else(RuleSchema::local);
    match RuleEngine::with_local_lists(players, rules_list) {
        Ok(engine) => engine,
        Err(err) => {
            warn!(error = %err, "saved local lists rejected, starting empty");
            RuleEngine::new()
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &std::path::Path) -> Option<T> {
    if !path.exists() {
        return None;
    }
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to read saved list");
            return None;
        }
    };
    match serde_json::from_str(&contents) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to parse saved list");
            None
        }
    }
}
