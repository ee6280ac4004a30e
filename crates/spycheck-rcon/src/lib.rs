//! Source-engine remote console (RCON) client.
//!
//! The game exposes a TCP port speaking a little-endian length-prefixed
//! request/response protocol with a password handshake. [`RconClient`]
//! keeps at most one connection, serializes commands through an internal
//! mutex, and redials lazily: a call that finds no live connection (or
//! loses it mid-exchange) dials at most once with a five-second timeout
//! before giving up with [`RconError::NotReady`].

pub mod client;
pub mod error;
pub mod packet;

pub use client::RconClient;
pub use error::RconError;
