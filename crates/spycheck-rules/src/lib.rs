//! Player-list and rule-list matching engine.
//!
//! Lists arrive in the community playerlist/rules v3 JSON shape. Importing
//! a list registers its entries as matchers; queries consult every matcher
//! in registration order and return all matching origins. The engine also
//! owns the operator-maintained `local` lists, which are the only lists
//! that [`RuleEngine::mark`] and [`RuleEngine::unmark`] may edit.
//!
//! Queries are concurrent; imports and mark/unmark take an exclusive lock.

pub mod engine;
pub mod error;
pub mod matcher;
pub mod schema;

pub use engine::{MarkOpts, RuleEngine};
pub use error::RulesError;
pub use schema::{
    PlayerDefinition, PlayerLastSeen, PlayerListSchema, RuleDefinition, RuleSchema, TextMatchMode,
};
