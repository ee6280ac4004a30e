//! The player store: connection pool, migrations, and row operations.

use std::path::Path;
use std::str::FromStr;

use chrono::Utc;
use spycheck_types::{Player, ProfileVisibility, SteamId, Team, UserMessage};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::DbError;

/// Connection ceiling; SQLite has a single writer, so a small pool is
/// all reads ever need.
const MAX_CONNECTIONS: u32 = 4;

/// Durable store for player identity, name history, and messages.
///
/// Every operation races the shutdown token and fails with
/// [`DbError::Cancelled`] -- without partial effect -- when shutdown wins.
pub struct PlayerStore {
    pool: SqlitePool,
    cancel: CancellationToken,
}

impl PlayerStore {
    /// Open (or create) the database file at `path`.
    ///
    /// WAL journaling and foreign keys are enabled per connection.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] when the file cannot be opened.
    pub async fn connect(path: &Path, cancel: CancellationToken) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await?;
        info!(path = %path.display(), "player store opened");
        Ok(Self { pool, cancel })
    }

    /// An in-memory store for tests. Uses a single connection so every
    /// query sees the same database.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] when the connection cannot be made.
    pub async fn connect_in_memory(cancel: CancellationToken) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(sqlx::Error::from)?
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Ok(Self { pool, cancel })
    }

    /// Apply forward migrations. Re-running against an up-to-date schema
    /// is a no-op; any real failure is fatal to startup.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Migration`] when a migration fails to apply.
    pub async fn init(&self) -> Result<(), DbError> {
        self.guard(async {
            sqlx::migrate!("./migrations").run(&self.pool).await?;
            Ok(())
        })
        .await
    }

    /// Populate `player` from its stored row, inserting a fresh row first
    /// when the id has never been seen.
    ///
    /// On load, `name_previous` is filled from the most recent name
    /// history entry.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Cancelled`] on shutdown or [`DbError::Sqlite`]
    /// on query failure.
    pub async fn load_or_create(
        &self,
        steam_id: SteamId,
        player: &mut Player,
    ) -> Result<(), DbError> {
        self.guard(async {
            let pid = to_pid(steam_id);
            let row = sqlx::query(
                "SELECT visibility, avatar_hash, real_name, account_created_on, \
                        profile_updated_on, community_banned, number_of_vac_bans, \
                        number_of_game_bans, economy_ban, last_vac_ban_on, notes, \
                        created_on, updated_on \
                 FROM player WHERE pid = ?",
            )
            .bind(pid)
            .fetch_optional(&self.pool)
            .await?;

            match row {
                Some(row) => {
                    player.steam_id = steam_id;
                    player.visibility = ProfileVisibility::from(row.try_get::<i64, _>("visibility")?);
                    player.avatar_hash = row.try_get("avatar_hash")?;
                    player.real_name = row.try_get("real_name")?;
                    player.account_created_on = row.try_get("account_created_on")?;
                    player.profile_updated_on = row.try_get("profile_updated_on")?;
                    player.community_banned = row.try_get::<i64, _>("community_banned")? != 0;
                    player.number_of_vac_bans = row.try_get::<i64, _>("number_of_vac_bans")? as u32;
                    player.number_of_game_bans =
                        row.try_get::<i64, _>("number_of_game_bans")? as u32;
                    player.economy_banned = row.try_get::<i64, _>("economy_ban")? != 0;
                    player.last_vac_ban_on = row.try_get("last_vac_ban_on")?;
                    player.notes = row.try_get("notes")?;
                    player.created_on = row.try_get("created_on")?;

                    let last_name = sqlx::query(
                        "SELECT name FROM player_names WHERE pid = ? ORDER BY id DESC LIMIT 1",
                    )
                    .bind(pid)
                    .fetch_optional(&self.pool)
                    .await?;
                    if let Some(name_row) = last_name {
                        player.name_previous = name_row.try_get("name")?;
                    }
                    debug!(steam_id = %steam_id, "loaded player");
                }
                None => {
                    player.steam_id = steam_id;
                    insert_player(&self.pool, player).await?;
                    debug!(steam_id = %steam_id, "created player");
                }
            }
            Ok(())
        })
        .await
    }

    /// Upsert the player row and clear the dirty flag on success.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Cancelled`] on shutdown or [`DbError::Sqlite`]
    /// on query failure; the dirty flag stays set so the next flush
    /// retries.
    pub async fn save_player(&self, player: &mut Player) -> Result<(), DbError> {
        self.guard(async {
            sqlx::query(
                "INSERT INTO player (pid, visibility, avatar_hash, real_name, \
                        account_created_on, profile_updated_on, community_banned, \
                        number_of_vac_bans, number_of_game_bans, economy_ban, \
                        last_vac_ban_on, notes, created_on, updated_on) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
                 ON CONFLICT (pid) DO UPDATE SET \
                        visibility = excluded.visibility, \
                        avatar_hash = excluded.avatar_hash, \
                        real_name = excluded.real_name, \
                        account_created_on = excluded.account_created_on, \
                        profile_updated_on = excluded.profile_updated_on, \
                        community_banned = excluded.community_banned, \
                        number_of_vac_bans = excluded.number_of_vac_bans, \
                        number_of_game_bans = excluded.number_of_game_bans, \
                        economy_ban = excluded.economy_ban, \
                        last_vac_ban_on = excluded.last_vac_ban_on, \
                        notes = excluded.notes, \
                        updated_on = excluded.updated_on",
            )
            .bind(to_pid(player.steam_id))
            .bind(visibility_to_db(player.visibility))
            .bind(&player.avatar_hash)
            .bind(&player.real_name)
            .bind(player.account_created_on)
            .bind(player.profile_updated_on)
            .bind(i64::from(player.community_banned))
            .bind(i64::from(player.number_of_vac_bans))
            .bind(i64::from(player.number_of_game_bans))
            .bind(i64::from(player.economy_banned))
            .bind(player.last_vac_ban_on)
            .bind(&player.notes)
            .bind(player.created_on)
            .bind(player.updated_on)
            .execute(&self.pool)
            .await?;
            player.dirty = false;
            Ok(())
        })
        .await
    }

    /// Record a display name in the history. Saving a name the player
    /// already carried is a no-op: the history holds at most one row per
    /// distinct `(pid, name)`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Cancelled`] on shutdown or [`DbError::Sqlite`]
    /// on query failure.
    pub async fn save_name(&self, steam_id: SteamId, name: &str) -> Result<(), DbError> {
        self.guard(async {
            sqlx::query(
                "INSERT OR IGNORE INTO player_names (pid, name, created_on) VALUES (?, ?, ?)",
            )
            .bind(to_pid(steam_id))
            .bind(name)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
            Ok(())
        })
        .await
    }

    /// Append a chat message.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Cancelled`] on shutdown or [`DbError::Sqlite`]
    /// on query failure.
    pub async fn save_message(&self, message: &UserMessage) -> Result<(), DbError> {
        self.guard(async {
            sqlx::query(
                "INSERT INTO messages (pid, user_id, team, message, dead, team_only, created_on) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(to_pid(message.steam_id))
            .bind(message.user_id)
            .bind(team_to_db(message.team))
            .bind(&message.message)
            .bind(i64::from(message.dead))
            .bind(i64::from(message.team_only))
            .bind(message.created_on)
            .execute(&self.pool)
            .await?;
            Ok(())
        })
        .await
    }

    /// All recorded display names for a player, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Cancelled`] on shutdown or [`DbError::Sqlite`]
    /// on query failure.
    pub async fn fetch_names(&self, steam_id: SteamId) -> Result<Vec<String>, DbError> {
        self.guard(async {
            let rows = sqlx::query("SELECT name FROM player_names WHERE pid = ? ORDER BY id DESC")
                .bind(to_pid(steam_id))
                .fetch_all(&self.pool)
                .await?;
            rows.into_iter()
                .map(|row| row.try_get("name").map_err(DbError::from))
                .collect()
        })
        .await
    }

    /// All recorded chat messages for a player, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Cancelled`] on shutdown or [`DbError::Sqlite`]
    /// on query failure.
    pub async fn fetch_messages(&self, steam_id: SteamId) -> Result<Vec<UserMessage>, DbError> {
        self.guard(async {
            let rows = sqlx::query(
                "SELECT user_id, team, message, dead, team_only, created_on \
                 FROM messages WHERE pid = ? ORDER BY id DESC",
            )
            .bind(to_pid(steam_id))
            .fetch_all(&self.pool)
            .await?;
            rows.into_iter()
                .map(|row| {
                    Ok(UserMessage {
                        steam_id,
                        user_id: row.try_get("user_id")?,
                        name: String::new(),
                        team: team_from_db(row.try_get::<i64, _>("team")?),
                        message: row.try_get("message")?,
                        dead: row.try_get::<i64, _>("dead")? != 0,
                        team_only: row.try_get::<i64, _>("team_only")? != 0,
                        created_on: row.try_get("created_on")?,
                    })
                })
                .collect()
        })
        .await
    }

    /// Flush and release the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        debug!("player store closed");
    }

    async fn guard<T, F>(&self, op: F) -> Result<T, DbError>
    where
        F: std::future::Future<Output = Result<T, DbError>>,
    {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(DbError::Cancelled),
            result = op => result,
        }
    }
}

async fn insert_player(pool: &SqlitePool, player: &Player) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO player (pid, visibility, avatar_hash, real_name, account_created_on, \
                profile_updated_on, community_banned, number_of_vac_bans, number_of_game_bans, \
                economy_ban, last_vac_ban_on, notes, created_on, updated_on) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(to_pid(player.steam_id))
    .bind(visibility_to_db(player.visibility))
    .bind(&player.avatar_hash)
    .bind(&player.real_name)
    .bind(player.account_created_on)
    .bind(player.profile_updated_on)
    .bind(i64::from(player.community_banned))
    .bind(i64::from(player.number_of_vac_bans))
    .bind(i64::from(player.number_of_game_bans))
    .bind(i64::from(player.economy_banned))
    .bind(player.last_vac_ban_on)
    .bind(&player.notes)
    .bind(player.created_on)
    .bind(player.updated_on)
    .execute(pool)
    .await?;
    Ok(())
}

fn to_pid(steam_id: SteamId) -> i64 {
    steam_id.as_u64() as i64
}

const fn visibility_to_db(visibility: ProfileVisibility) -> i64 {
    match visibility {
        ProfileVisibility::Private => 1,
        ProfileVisibility::FriendsOnly => 2,
        ProfileVisibility::Public => 3,
    }
}

const fn team_to_db(team: Team) -> i64 {
    match team {
        Team::Unassigned => 0,
        Team::Spectator => 1,
        Team::Red => 2,
        Team::Blue => 3,
    }
}

const fn team_from_db(value: i64) -> Team {
    match value {
        1 => Team::Spectator,
        2 => Team::Red,
        3 => Team::Blue,
        _ => Team::Unassigned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PID: u64 = 76_561_197_961_279_983;

    async fn open_store() -> PlayerStore {
        let store = PlayerStore::connect_in_memory(CancellationToken::new())
            .await
            .unwrap();
        store.init().await.unwrap();
        store
    }

    #[tokio::test]
    async fn init_is_idempotent() {
        let store = open_store().await;
        store.init().await.unwrap();
    }

    #[tokio::test]
    async fn load_or_create_then_reload() {
        let store = open_store().await;
        let id = SteamId::from_u64(PID);

        let mut player = Player::new(id, "first_name");
        player.visibility = ProfileVisibility::Public;
        player.notes = "seen before".to_owned();
        store.load_or_create(id, &mut player).await.unwrap();
        store.save_player(&mut player).await.unwrap();
        store.save_name(id, "first_name").await.unwrap();
        store.save_name(id, "second_name").await.unwrap();

        let mut reloaded = Player::new(id, "");
        store.load_or_create(id, &mut reloaded).await.unwrap();
        assert_eq!(reloaded.visibility, ProfileVisibility::Public);
        assert_eq!(reloaded.notes, "seen before");
        assert_eq!(reloaded.name_previous, "second_name");
    }

    #[tokio::test]
    async fn save_name_excludes_duplicates() {
        let store = open_store().await;
        let id = SteamId::from_u64(PID);
        let mut player = Player::new(id, "someone");
        store.load_or_create(id, &mut player).await.unwrap();

        store.save_name(id, "alpha").await.unwrap();
        store.save_name(id, "alpha").await.unwrap();
        store.save_name(id, "beta").await.unwrap();

        let names = store.fetch_names(id).await.unwrap();
        assert_eq!(names, vec!["beta".to_owned(), "alpha".to_owned()]);
    }

    #[tokio::test]
    async fn messages_append_and_fetch_newest_first() {
        let store = open_store().await;
        let id = SteamId::from_u64(PID);
        let mut player = Player::new(id, "someone");
        store.load_or_create(id, &mut player).await.unwrap();

        for (index, text) in ["hello", "world"].iter().enumerate() {
            store
                .save_message(&UserMessage {
                    steam_id: id,
                    user_id: index as i64,
                    name: "someone".to_owned(),
                    team: Team::Red,
                    message: (*text).to_owned(),
                    created_on: Utc::now(),
                    dead: false,
                    team_only: index == 1,
                })
                .await
                .unwrap();
        }

        let messages = store.fetch_messages(id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].message, "world");
        assert!(messages[0].team_only);
        assert_eq!(messages[0].team, Team::Red);
        assert_eq!(messages[1].message, "hello");
    }

    #[tokio::test]
    async fn save_player_clears_dirty() {
        let store = open_store().await;
        let id = SteamId::from_u64(PID);
        let mut player = Player::new(id, "someone");
        store.load_or_create(id, &mut player).await.unwrap();
        player.touch();
        assert!(player.dirty);
        store.save_player(&mut player).await.unwrap();
        assert!(!player.dirty);
    }

    #[tokio::test]
    async fn cancelled_token_rejects_operations() {
        let cancel = CancellationToken::new();
        let store = PlayerStore::connect_in_memory(cancel.clone()).await.unwrap();
        store.init().await.unwrap();
        cancel.cancel();
        let mut player = Player::new(SteamId::from_u64(PID), "someone");
        assert!(matches!(
            store
                .load_or_create(SteamId::from_u64(PID), &mut player)
                .await,
            Err(DbError::Cancelled)
        ));
    }
}
