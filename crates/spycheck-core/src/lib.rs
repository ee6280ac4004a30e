//! The spycheck core: game-state engine and process supervisor.
//!
//! This crate wires the acquisition components (console tail, admin
//! channel, web metadata, avatar cache) into a single dispatch loop that
//! owns the live roster, evaluates rule matches, announces and kick-votes
//! on hits, and persists player history. External surfaces (an HTTP API,
//! a tray UI) interact exclusively through [`StateHandle`].
//!
//! # Architecture
//!
//! ```text
//! console.log --tail--> parser --events--> +--------------+
//! rcon status poll -----^                  |   engine     | --> store (SQLite)
//! operator commands --updates------------> | (dispatch    | --> rcon (say/callvote)
//! web fetch results --updates------------> |    loop)     | <-- rules engine
//! avatar worker ------updates------------> +--------------+
//! ```
//!
//! The supervisor builds everything from [`Settings`], spawns the tasks,
//! and propagates one cancellation token for shutdown.

pub mod avatar;
pub mod engine;
pub mod error;
pub mod events;
pub mod handle;
pub mod lists;
pub mod process;
pub mod settings;
pub mod state;
pub mod supervisor;
pub mod voice_ban;

pub use error::CoreError;
pub use events::{GameStateUpdate, KickReason};
pub use handle::StateHandle;
pub use process::{GameProcessMonitor, NullProcessMonitor};
pub use settings::{ListConfig, ListKind, RconMode, Settings, SettingsError};
pub use state::GameState;
pub use supervisor::Supervisor;
