//! Error types for Steam data acquisition.

/// Errors raised by the web client and the avatar cache.
#[derive(Debug, thiserror::Error)]
pub enum SteamError {
    /// A cache entry is absent or older than the configured TTL. This is
    /// a normal condition; callers refetch and [`set`](crate::AvatarCache::set)
    /// the fresh payload.
    #[error("cached value expired")]
    Expired,

    /// The HTTP layer failed (connect, timeout, body decode).
    #[error("steam web request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("steam web request returned status {0}")]
    Status(reqwest::StatusCode),

    /// Filesystem failure underneath the avatar cache.
    #[error("avatar cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}
