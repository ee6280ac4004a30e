//! The state engine: single dispatch loop owning every mutation.
//!
//! The loop fans in parsed console events, operator commands, and web
//! fetch results, and drives three internal timers (check, update,
//! expire). The status poller runs as its own task because it performs
//! admin-channel I/O; its output re-enters the loop through the parser,
//! so live-tailed and poll-retrieved lines share one code path.
//!
//! Failure policy inside the loop: recoverable errors (store, admin
//! channel, web) are logged and the loop moves on; the engine only exits
//! on cancellation, after flushing dirty players.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use spycheck_console::LogEvent;
use spycheck_db::PlayerStore;
use spycheck_rcon::RconClient;
use spycheck_rules::{MarkOpts, RuleEngine};
use spycheck_steam::{PlayerBanState, PlayerSummary, SteamWebClient};
use spycheck_types::{
    ChatDest, MatchResult, Player, SteamId, Team, UserMessage, LOCAL_LIST_TITLE,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::avatar::AvatarJob;
use crate::events::{GameStateUpdate, KickReason};
use crate::settings::Settings;
use crate::state::GameState;

/// Cadence of the status poller task.
pub const STATUS_INTERVAL: Duration = Duration::from_secs(2);

/// Cadence of rule evaluation and dirty flushing.
const CHECK_INTERVAL: Duration = Duration::from_secs(3);

/// Cadence of web metadata batch dispatch.
const UPDATE_INTERVAL: Duration = Duration::from_secs(5);

/// Cadence of expiry sweeps.
const EXPIRE_INTERVAL: Duration = Duration::from_secs(10);

/// Ceiling on ids per outbound web batch.
const WEB_BATCH_LIMIT: usize = 100;

/// One player's pending trigger actions, decided under the roster lock
/// and executed after it is released.
#[derive(Debug, Clone)]
struct TriggerPlan {
    steam_id: SteamId,
    /// When the decision was made; the party timestamp is backdated to
    /// this instant once every warning went out.
    decided_at: DateTime<Utc>,
    announced: bool,
    party_messages: Vec<String>,
    vote_user_id: Option<i64>,
}

/// What the match-trigger routine ended up doing. Logged, and inspected
/// directly by tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct TriggerOutcome {
    announced: bool,
    party_warnings: usize,
    vote_attempted: bool,
}

/// The dispatch-loop owner of the roster and server record.
pub struct Engine {
    state: Arc<GameState>,
    store: Arc<PlayerStore>,
    rules: Arc<RuleEngine>,
    rcon: Arc<RconClient>,
    web: Arc<SteamWebClient>,
    settings: Arc<Settings>,
    events_rx: mpsc::Receiver<LogEvent>,
    updates_rx: mpsc::Receiver<GameStateUpdate>,
    /// Loop-back sender used by spawned web fetches.
    updates_tx: mpsc::Sender<GameStateUpdate>,
    avatar_tx: mpsc::Sender<AvatarJob>,
    /// Ids awaiting a web metadata refresh, oldest first.
    pending_updates: Vec<SteamId>,
}

impl Engine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        state: Arc<GameState>,
        store: Arc<PlayerStore>,
        rules: Arc<RuleEngine>,
        rcon: Arc<RconClient>,
        web: Arc<SteamWebClient>,
        settings: Arc<Settings>,
        events_rx: mpsc::Receiver<LogEvent>,
        updates_rx: mpsc::Receiver<GameStateUpdate>,
        updates_tx: mpsc::Sender<GameStateUpdate>,
        avatar_tx: mpsc::Sender<AvatarJob>,
    ) -> Self {
        Self {
            state,
            store,
            rules,
            rcon,
            web,
            settings,
            events_rx,
            updates_rx,
            updates_tx,
            avatar_tx,
            pending_updates: Vec::new(),
        }
    }

    /// Run the dispatch loop until cancellation, then flush dirty players.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut check = tokio::time::interval(CHECK_INTERVAL);
        let mut update = tokio::time::interval(UPDATE_INTERVAL);
        let mut expire = tokio::time::interval(EXPIRE_INTERVAL);
        check.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        update.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        expire.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!("state engine started");
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                event = self.events_rx.recv() => {
                    let Some(event) = event else { break };
                    if let Some(update) = GameStateUpdate::from_log_event(event) {
                        self.apply_update(update).await;
                    }
                }
                Some(update) = self.updates_rx.recv() => {
                    self.apply_update(update).await;
                }
                _ = check.tick() => self.on_check_tick().await,
                _ = update.tick() => self.on_update_tick().await,
                _ = expire.tick() => self.on_expire_tick().await,
            }
        }

        self.flush_dirty_players().await;
        info!("state engine stopped");
    }

    async fn apply_update(&mut self, update: GameStateUpdate) {
        match update {
            GameStateUpdate::Status {
                steam_id,
                user_id,
                name,
                connected_secs,
                ping,
            } => {
                self.handle_status(steam_id, user_id, name, connected_secs, ping)
                    .await;
            }
            GameStateUpdate::Chat {
                name,
                message,
                created_on,
                dead,
                team_only,
            } => {
                self.handle_chat(name, message, created_on, dead, team_only)
                    .await;
            }
            GameStateUpdate::Kill { attacker, victim } => {
                self.handle_kill(&attacker, &victim).await;
            }
            GameStateUpdate::Lobby { steam_id, team } => {
                let mut players = self.state.players.write().await;
                if let Some(player) = players.get_mut(steam_id) {
                    player.team = team;
                    player.touch();
                }
            }
            GameStateUpdate::Hostname(hostname) => {
                let mut server = self.state.server.write().await;
                server.hostname = hostname;
                server.last_update = Some(Utc::now());
            }
            GameStateUpdate::Map(map) => {
                let mut server = self.state.server.write().await;
                server.current_map = map;
                server.last_update = Some(Utc::now());
            }
            GameStateUpdate::Tags(tags) => {
                let mut server = self.state.server.write().await;
                server.tags = tags;
                server.last_update = Some(Utc::now());
            }
            GameStateUpdate::Address { address, port } => {
                let mut server = self.state.server.write().await;
                server.address = address;
                server.port = port;
                server.last_update = Some(Utc::now());
            }
            GameStateUpdate::MapChange => self.handle_map_change().await,
            GameStateUpdate::Profile(summary) => self.handle_profile(summary).await,
            GameStateUpdate::Bans(bans) => self.handle_bans(bans).await,
            GameStateUpdate::AvatarMatched { steam_id, results } => {
                self.handle_avatar_matched(steam_id, results).await;
            }
            GameStateUpdate::Mark {
                steam_id,
                attributes,
            } => self.handle_mark(steam_id, attributes).await,
            GameStateUpdate::Unmark { steam_id } => self.handle_unmark(steam_id).await,
            GameStateUpdate::Whitelist { steam_id, enabled } => {
                let mut players = self.state.players.write().await;
                if let Some(player) = players.get_mut(steam_id) {
                    player.whitelisted = enabled;
                    player.touch();
                    info!(steam_id = %steam_id, enabled, "player whitelist updated");
                } else {
                    warn!(steam_id = %steam_id, "whitelist request for unknown player");
                }
            }
            GameStateUpdate::Note { steam_id, note } => {
                let mut players = self.state.players.write().await;
                if let Some(player) = players.get_mut(steam_id) {
                    player.notes = note;
                    player.touch();
                }
            }
            GameStateUpdate::SendChat { dest, message } => {
                let cmd = format!("{} {message}", dest.command());
                if let Err(err) = self.rcon.exec(&cmd).await {
                    error!(error = %err, "failed to send chat message");
                }
            }
            GameStateUpdate::CallVote { user_id, reason } => {
                if let Err(err) = self.call_vote(user_id, reason).await {
                    error!(error = %err, "failed to call vote");
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Console-derived events
    // -----------------------------------------------------------------------

    async fn handle_status(
        &mut self,
        steam_id: SteamId,
        user_id: i64,
        name: String,
        connected_secs: u64,
        ping: u32,
    ) {
        // Store I/O runs before the writer lock is taken so readers are
        // never parked behind the database. The dispatch loop is the only
        // writer, so the read-then-write is not racy.
        let current_name = {
            let players = self.state.players.read().await;
            players.get(steam_id).map(|p| p.name.clone())
        };

        let mut loaded: Option<Player> = None;
        match &current_name {
            None => {
                let mut player = Player::new(steam_id, name.clone());
                if let Err(err) = self.store.load_or_create(steam_id, &mut player).await {
                    error!(steam_id = %steam_id, error = %err, "load-or-create failed");
                }
                if !name.is_empty() && name != player.name_previous {
                    if let Err(err) = self.store.save_name(steam_id, &name).await {
                        error!(steam_id = %steam_id, error = %err, "failed to save name");
                    }
                }
                debug!(steam_id = %steam_id, name, "new player observed");
                loaded = Some(player);
            }
            Some(current) => {
                if !name.is_empty() && *current != name {
                    if let Err(err) = self.store.save_name(steam_id, &name).await {
                        error!(steam_id = %steam_id, error = %err, "failed to save name");
                    }
                }
            }
        }

        let mut players = self.state.players.write().await;
        if let Some(player) = loaded {
            players.insert(player);
        }
        let Some(player) = players.get_mut(steam_id) else {
            return;
        };
        if !name.is_empty() && player.name != name {
            player.name_previous = std::mem::replace(&mut player.name, name.clone());
        }
        player.user_id = user_id;
        player.ping = ping;
        player.connected_secs = connected_secs;
        player.touch();

        if Utc::now() - player.profile_updated_on > self.settings.profile_cache_timeout() {
            queue_pending(&mut self.pending_updates, steam_id);
        }
    }

    async fn handle_chat(
        &mut self,
        name: String,
        message: String,
        created_on: chrono::DateTime<chrono::Utc>,
        dead: bool,
        team_only: bool,
    ) {
        // Display names are not unique at the protocol level; the
        // earliest-joined resident with this name wins.
        let resolved = {
            let players = self.state.players.read().await;
            players
                .find_by_name(&name)
                .map(|p| (p.steam_id, p.user_id, p.team))
        };
        let Some((steam_id, user_id, team)) = resolved else {
            debug!(name, "chat from unknown player dropped");
            return;
        };

        let user_message = UserMessage {
            steam_id,
            user_id,
            name,
            team,
            message: message.clone(),
            created_on,
            dead,
            team_only,
        };
        if let Err(err) = self.store.save_message(&user_message).await {
            error!(steam_id = %steam_id, error = %err, "failed to save message");
        }

        if let Some(results) = self.rules.match_message(&message) {
            let local_team = self.local_team().await;
            let plan = {
                let mut players = self.state.players.write().await;
                players.get_mut(steam_id).map(|player| {
                    player.attach_matches(&results);
                    self.plan_trigger(player, &results, local_team)
                })
            };
            if let Some(plan) = plan {
                let outcome = self.execute_trigger(plan).await;
                debug!(steam_id = %steam_id, ?outcome, "message match triggered");
            }
        }
    }

    async fn handle_kill(&mut self, attacker_name: &str, victim_name: &str) {
        let local_id = self.settings.steam_id;
        // Earliest-joined match wins for both names, as with chat.
        let (attacker_id, victim_id) = {
            let players = self.state.players.read().await;
            (
                players.find_by_name(attacker_name).map(|p| p.steam_id),
                players.find_by_name(victim_name).map(|p| p.steam_id),
            )
        };
        let (Some(attacker_id), Some(victim_id)) = (attacker_id, victim_id) else {
            debug!(attacker_name, victim_name, "kill with unresolved names dropped");
            return;
        };

        let mut players = self.state.players.write().await;
        if let Some(attacker) = players.get_mut(attacker_id) {
            attacker.kills += 1;
            if victim_id == local_id {
                attacker.deaths_by += 1;
            }
            attacker.touch();
        }
        if let Some(victim) = players.get_mut(victim_id) {
            victim.deaths += 1;
            if attacker_id == local_id {
                victim.kills_on += 1;
            }
            victim.touch();
        }
    }

    async fn handle_map_change(&mut self) {
        {
            let mut players = self.state.players.write().await;
            for player in players.iter_mut() {
                player.reset_session_stats();
                player.touch();
            }
        }
        let mut server = self.state.server.write().await;
        server.current_map.clear();
        server.hostname.clear();
        debug!("map change: session counters reset");
    }

    // -----------------------------------------------------------------------
    // Web metadata results
    // -----------------------------------------------------------------------

    async fn handle_profile(&mut self, summary: PlayerSummary) {
        let mut players = self.state.players.write().await;
        let Some(player) = players.get_mut(summary.steam_id) else {
            return;
        };
        player.visibility = summary.visibility;
        player.avatar_hash = summary.avatar_hash.clone();
        player.real_name = summary.real_name;
        player.account_created_on = summary.account_created_on;
        player.profile_updated_on = Utc::now();
        player.touch();

        if !summary.avatar_hash.is_empty() {
            let job = AvatarJob {
                steam_id: summary.steam_id,
                hash: summary.avatar_hash,
            };
            if self.avatar_tx.try_send(job).is_err() {
                warn!(steam_id = %summary.steam_id, "avatar queue full, skipping");
            }
        }
    }

    async fn handle_bans(&mut self, bans: PlayerBanState) {
        let mut players = self.state.players.write().await;
        let Some(player) = players.get_mut(bans.steam_id) else {
            return;
        };
        player.community_banned = bans.community_banned;
        player.number_of_vac_bans = bans.number_of_vac_bans;
        player.number_of_game_bans = bans.number_of_game_bans;
        player.economy_banned = bans.economy_banned;
        player.last_vac_ban_on = (bans.days_since_last_ban > 0)
            .then(|| Utc::now() - chrono::Duration::days(i64::from(bans.days_since_last_ban)));
        player.touch();
    }

    async fn handle_avatar_matched(&mut self, steam_id: SteamId, results: Vec<MatchResult>) {
        let local_team = self.local_team().await;
        let plan = {
            let mut players = self.state.players.write().await;
            players.get_mut(steam_id).map(|player| {
                player.attach_matches(&results);
                self.plan_trigger(player, &results, local_team)
            })
        };
        if let Some(plan) = plan {
            let outcome = self.execute_trigger(plan).await;
            debug!(steam_id = %steam_id, ?outcome, "avatar match triggered");
        }
    }

    // -----------------------------------------------------------------------
    // Operator actions
    // -----------------------------------------------------------------------

    async fn handle_mark(&mut self, steam_id: SteamId, attributes: Vec<String>) {
        let resident = self.state.players.read().await.contains(steam_id);
        if !resident {
            // Marking an id that was never seen this session: bring its
            // durable record into the roster so the mark has a subject.
            let mut player = Player::new(steam_id, String::new());
            if let Err(err) = self.store.load_or_create(steam_id, &mut player).await {
                error!(steam_id = %steam_id, error = %err, "load-or-create for mark failed");
            }
            self.state.players.write().await.insert(player);
        }

        let name = {
            let players = self.state.players.read().await;
            players
                .get(steam_id)
                .map(|p| {
                    if p.name.is_empty() {
                        p.name_previous.clone()
                    } else {
                        p.name.clone()
                    }
                })
                .unwrap_or_default()
        };

        if let Err(err) = self.rules.mark(MarkOpts {
            steam_id,
            attributes,
            proof: Vec::new(),
            name,
        }) {
            error!(steam_id = %steam_id, error = %err, "mark rejected");
            return;
        }
        info!(steam_id = %steam_id, "player marked");
        self.write_local_player_list().await;
    }

    async fn handle_unmark(&mut self, steam_id: SteamId) {
        if !self.rules.unmark(steam_id) {
            warn!(steam_id = %steam_id, "unmark: id not on the local list");
            return;
        }
        {
            let mut players = self.state.players.write().await;
            if let Some(player) = players.get_mut(steam_id) {
                player.strip_local_matches();
                player.touch();
            }
        }
        info!(steam_id = %steam_id, "player unmarked");
        self.write_local_player_list().await;
    }

    async fn write_local_player_list(&self) {
        let mut buf = Vec::new();
        if let Err(err) = self.rules.export_players(LOCAL_LIST_TITLE, &mut buf) {
            error!(error = %err, "failed to serialize local player list");
            return;
        }
        let path = self.settings.local_player_list_path();
        if let Err(err) = tokio::fs::write(&path, buf).await {
            error!(error = %err, path = %path.display(), "failed to write local player list");
        }
    }

    // -----------------------------------------------------------------------
    // Timers
    // -----------------------------------------------------------------------

    /// Rule evaluation plus dirty flush.
    ///
    /// The writer lock is taken per player and only around in-memory
    /// mutation; matcher queries, store flushes, and the trigger's
    /// admin-channel calls all run with the roster unlocked.
    async fn on_check_tick(&mut self) {
        let local_team = self.local_team().await;
        let now = Utc::now();
        let threshold = self.settings.disconnect_timeout();

        // Bind the id list before looping: a guard temporary in the loop
        // header would stay held across the body.
        let ids = {
            let players = self.state.players.read().await;
            players.ids()
        };
        for steam_id in ids {
            let name = {
                let players = self.state.players.read().await;
                let Some(player) = players.get(steam_id) else {
                    continue;
                };
                if player.is_expired(now, threshold) {
                    continue;
                }
                player.name.clone()
            };

            let mut results: Vec<MatchResult> = Vec::new();
            if let Some(matches) = self.rules.match_steam(steam_id) {
                results.extend(matches);
            }
            if !name.is_empty() {
                if let Some(matches) = self.rules.match_name(&name) {
                    results.extend(matches);
                }
            }

            let (plan, snapshot) = {
                let mut players = self.state.players.write().await;
                let Some(player) = players.get_mut(steam_id) else {
                    continue;
                };
                let plan = (!results.is_empty()).then(|| {
                    player.attach_matches(&results);
                    self.plan_trigger(player, &results, local_team)
                });
                let snapshot = player.dirty.then(|| player.clone());
                (plan, snapshot)
            };

            // Flush a copy so the roster stays readable during the
            // write; the live dirty flag clears only on success.
            if let Some(mut snapshot) = snapshot {
                match self.store.save_player(&mut snapshot).await {
                    Ok(()) => {
                        let mut players = self.state.players.write().await;
                        if let Some(player) = players.get_mut(steam_id) {
                            player.dirty = false;
                        }
                    }
                    Err(err) => {
                        error!(steam_id = %steam_id, error = %err, "failed to flush player");
                    }
                }
            }

            if let Some(plan) = plan {
                let outcome = self.execute_trigger(plan).await;
                debug!(steam_id = %steam_id, ?outcome, "check tick match");
            }
        }
    }

    /// Dispatch the pending web-update batch.
    async fn on_update_tick(&mut self) {
        if self.pending_updates.is_empty() {
            return;
        }
        if self.settings.steam_api_key.is_empty() {
            debug!(
                dropped = self.pending_updates.len(),
                "no api key configured, dropping pending web updates"
            );
            self.pending_updates.clear();
            return;
        }

        let batch = drain_newest(&mut self.pending_updates, WEB_BATCH_LIMIT);
        info!(count = batch.len(), "fetching web metadata");

        let web = Arc::clone(&self.web);
        let updates = self.updates_tx.clone();
        tokio::spawn(async move {
            match web.player_summaries(&batch).await {
                Ok(summaries) => {
                    for summary in summaries {
                        if updates.send(GameStateUpdate::Profile(summary)).await.is_err() {
                            return;
                        }
                    }
                }
                Err(err) => error!(error = %err, "player summaries fetch failed"),
            }
            match web.player_bans(&batch).await {
                Ok(bans) => {
                    for ban in bans {
                        if updates.send(GameStateUpdate::Bans(ban)).await.is_err() {
                            return;
                        }
                    }
                }
                Err(err) => error!(error = %err, "player bans fetch failed"),
            }
        });
    }

    /// Remove expired players (flushing each) and reset a quiet server.
    async fn on_expire_tick(&mut self) {
        let now = Utc::now();
        let threshold = self.settings.disconnect_timeout();

        // Detach expired players under a short guard; their final flush
        // happens with the roster unlocked.
        let expired: Vec<Player> = {
            let mut players = self.state.players.write().await;
            let ids: Vec<SteamId> = players
                .iter()
                .filter(|p| p.is_expired(now, threshold))
                .map(|p| p.steam_id)
                .collect();
            ids.into_iter().filter_map(|id| players.remove(id)).collect()
        };
        if !expired.is_empty() {
            debug!(count = expired.len(), "flushing expired players");
        }
        for mut player in expired {
            if let Err(err) = self.store.save_player(&mut player).await {
                error!(steam_id = %player.steam_id, error = %err, "failed to save expired player");
            }
        }

        let mut server = self.state.server.write().await;
        let quiet = server
            .last_update
            .is_none_or(|last| now - last > threshold);
        if quiet {
            server.reset();
        }
    }

    async fn flush_dirty_players(&mut self) {
        let dirty: Vec<Player> = {
            let players = self.state.players.read().await;
            players.iter().filter(|p| p.dirty).cloned().collect()
        };
        for mut player in dirty {
            let steam_id = player.steam_id;
            match self.store.save_player(&mut player).await {
                Ok(()) => {
                    let mut players = self.state.players.write().await;
                    if let Some(player) = players.get_mut(steam_id) {
                        player.dirty = false;
                    }
                }
                Err(err) => {
                    error!(steam_id = %steam_id, error = %err, "shutdown flush failed");
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Match trigger
    // -----------------------------------------------------------------------

    /// Decide what a non-empty match set means for one player: announce,
    /// warn the party, and kick-vote, subject to timeouts, the whitelist
    /// flag, and team sidedness. The kick-attempt counter always
    /// advances.
    ///
    /// This is the lock-side half: it only mutates the player record and
    /// returns the admin-channel work as a [`TriggerPlan`], which
    /// [`execute_trigger`](Self::execute_trigger) performs after the
    /// roster guard is released.
    fn plan_trigger(
        &self,
        player: &mut Player,
        results: &[MatchResult],
        local_team: Option<Team>,
    ) -> TriggerPlan {
        let now = Utc::now();
        let announce_timeout = self.settings.announce_timeout();
        // Party chat and kick votes only apply to players on the local
        // player's own team.
        let same_team = local_team.is_some_and(|team| team == player.team);
        let mut plan = TriggerPlan {
            steam_id: player.steam_id,
            decided_at: now,
            announced: false,
            party_messages: Vec::new(),
            vote_user_id: None,
        };

        let general_elapsed = player
            .announced_general_last
            .is_none_or(|last| now - last >= announce_timeout);
        if general_elapsed {
            let label = if player.whitelisted {
                "matched whitelisted player"
            } else {
                "matched player"
            };
            for result in results {
                info!(
                    steam_id = %player.steam_id,
                    name = %player.name,
                    origin = %result.origin,
                    matcher = %result.matcher_type,
                    "{label}"
                );
            }
            player.announced_general_last = Some(now);
            plan.announced = true;
        }

        if !player.whitelisted {
            let party_elapsed = player
                .announced_party_last
                .is_none_or(|last| now - last >= announce_timeout);
            if self.settings.party_warnings_enabled && same_team && party_elapsed {
                plan.party_messages = results
                    .iter()
                    .map(|result| {
                        format!(
                            "({}) [{}] [{}] {}",
                            player.user_id,
                            result.origin,
                            result.attributes.join(","),
                            player.name
                        )
                    })
                    .collect();
            }

            if self.settings.kicker_enabled && same_team {
                let kickable = results.iter().any(|result| {
                    result.attributes.iter().any(|attr| {
                        self.settings
                            .kick_tags
                            .iter()
                            .any(|tag| tag.eq_ignore_ascii_case(attr))
                    })
                });
                if kickable {
                    plan.vote_user_id = Some(player.user_id);
                } else {
                    info!(steam_id = %player.steam_id, "skipping kick, no kickable tag");
                }
            }
        }

        player.kick_attempt_count += 1;
        player.touch();
        plan
    }

    /// Perform a plan's admin-channel work. The party timestamp advances
    /// only once every planned warning went out, so a failed send is
    /// retried on the next trigger.
    async fn execute_trigger(&self, plan: TriggerPlan) -> TriggerOutcome {
        let mut outcome = TriggerOutcome {
            announced: plan.announced,
            party_warnings: 0,
            vote_attempted: false,
        };

        if !plan.party_messages.is_empty() {
            let mut all_sent = true;
            for message in &plan.party_messages {
                outcome.party_warnings += 1;
                let cmd = format!("{} {message}", ChatDest::Party.command());
                if let Err(err) = self.rcon.exec(&cmd).await {
                    error!(error = %err, "failed to send party warning");
                    all_sent = false;
                    break;
                }
            }
            if all_sent {
                let mut players = self.state.players.write().await;
                if let Some(player) = players.get_mut(plan.steam_id) {
                    player.announced_party_last = Some(plan.decided_at);
                    player.touch();
                }
            }
        }

        if let Some(user_id) = plan.vote_user_id {
            outcome.vote_attempted = true;
            if let Err(err) = self.call_vote(user_id, KickReason::Cheating).await {
                error!(error = %err, "failed to call kick vote");
            }
        }

        outcome
    }

    async fn call_vote(&self, user_id: i64, reason: KickReason) -> Result<(), spycheck_rcon::RconError> {
        let cmd = format!("callvote kick \"{user_id} {}\"", reason.as_str());
        self.rcon.exec(&cmd).await.map(|_| ())
    }

    async fn local_team(&self) -> Option<Team> {
        self.state
            .players
            .read()
            .await
            .get(self.settings.steam_id)
            .map(|p| p.team)
    }
}

/// Move an id to the back of the pending queue (newest position),
/// keeping at most one occurrence.
fn queue_pending(pending: &mut Vec<SteamId>, steam_id: SteamId) {
    pending.retain(|existing| *existing != steam_id);
    pending.push(steam_id);
}

/// Take up to `limit` of the newest entries, leaving the remainder for
/// the next tick.
fn drain_newest(pending: &mut Vec<SteamId>, limit: usize) -> Vec<SteamId> {
    if pending.len() > limit {
        pending.split_off(pending.len() - limit)
    } else {
        std::mem::take(pending)
    }
}

/// Periodically issue `status` and `tf_lobby_debug` over the admin
/// channel, feeding response lines back into the parser so poll output
/// and live log lines share the matcher set.
pub async fn status_updater(
    rcon: Arc<RconClient>,
    lines: mpsc::Sender<String>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(STATUS_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        for cmd in ["status", "tf_lobby_debug"] {
            match rcon.exec(cmd).await {
                Ok(output) => {
                    for line in output.lines() {
                        if lines.send(line.to_owned()).await.is_err() {
                            return;
                        }
                    }
                }
                Err(err) => {
                    debug!(error = %err, cmd, "status poll failed");
                    break;
                }
            }
        }
    }
    debug!("status updater exited");
}
