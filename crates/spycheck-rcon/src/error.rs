//! Error types for the admin channel.

/// Errors raised by RCON command execution.
#[derive(Debug, thiserror::Error)]
pub enum RconError {
    /// No connection and the single redial attempt failed. Recoverable:
    /// the next call will dial again.
    #[error("rcon is not ready: {0}")]
    NotReady(String),

    /// The server rejected the configured password.
    #[error("rcon authentication rejected")]
    AuthRejected,

    /// An I/O failure on an established connection.
    #[error("rcon I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer sent a frame that violates the protocol.
    #[error("rcon protocol violation: {0}")]
    Protocol(String),

    /// The peer stopped answering within the exchange deadline.
    #[error("rcon exchange timed out")]
    Timeout,
}
