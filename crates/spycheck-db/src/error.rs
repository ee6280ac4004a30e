//! Error types for the data layer.

/// Errors that can occur in the player store.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Shutdown was requested while the operation was in flight. No
    /// partial changes were made.
    #[error("operation cancelled by shutdown")]
    Cancelled,

    /// A SQLite operation failed.
    #[error("database error: {0}")]
    Sqlite(#[from] sqlx::Error),

    /// Applying forward migrations failed.
    #[error("database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}
