//! Console log acquisition: file tailing and line parsing.
//!
//! [`LogTail`] follows the game's `console.log` as it grows, surviving
//! truncation and rotation, and emits raw lines over a channel.
//! [`LogParser`] turns those lines into typed [`LogEvent`]s through an
//! ordered set of regular-expression matchers. Lines the game writes that
//! carry no useful signal simply fail every matcher and are dropped.

pub mod error;
pub mod event;
pub mod parser;
pub mod tail;

pub use error::ConsoleError;
pub use event::LogEvent;
pub use parser::LogParser;
pub use tail::LogTail;
