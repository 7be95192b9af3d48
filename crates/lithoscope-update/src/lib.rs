//! Merging freshly harvested records into previously stored ones.
//!
//! One strategy per logical field path, driven by an ordered table. The
//! engine applies every strategy regardless of conflicts; conflicts are
//! advisory unless the caller opts into strict mode.

pub mod config;
pub mod engine;
pub mod field;
pub mod fields;

pub use config::default_strategy_table;
pub use engine::{UpdateConflict, UpdateContext, UpdateEngine, UpdateError, UpdateResult};
pub use field::FieldUpdate;
