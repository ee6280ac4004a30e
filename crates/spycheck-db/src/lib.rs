//! Durable player records over SQLite.
//!
//! The store holds everything that must survive a restart: player
//! identity and reputation snapshots, the append-only name history, and
//! chat messages. Schema evolution is forward-only migrations embedded at
//! compile time; re-running them is a no-op.
//!
//! Uses [`sqlx`] with runtime query construction (not compile-time
//! checked) so building the workspace never needs a live database. All
//! queries are parameterized.

pub mod error;
pub mod store;

pub use error::DbError;
pub use store::PlayerStore;
