//! Error types for the core engine and supervisor.

/// Errors surfaced by the supervisor and the operator surface.
///
/// Startup construction failures (settings, store, log reader) are fatal;
/// everything else is logged inside the dispatch loop and retried on the
/// next tick.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Settings file could not be read or parsed.
    #[error(transparent)]
    Settings(#[from] crate::settings::SettingsError),

    /// Player store failure.
    #[error(transparent)]
    Db(#[from] spycheck_db::DbError),

    /// Console log reader could not be created.
    #[error(transparent)]
    Console(#[from] spycheck_console::ConsoleError),

    /// Rule engine failure.
    #[error(transparent)]
    Rules(#[from] spycheck_rules::RulesError),

    /// Steam web client construction failure.
    #[error(transparent)]
    Steam(#[from] spycheck_steam::SteamError),

    /// Operator input rejected before reaching the engine.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The engine has shut down and no longer accepts updates.
    #[error("state engine is not running")]
    EngineStopped,

    /// Filesystem failure outside the store and cache.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
