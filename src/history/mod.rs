//! Battle history
//!
//! An append-only log of battle events on top of the initial partition.
//! Current ownership and every replay frame are projections of the log.

pub mod engine;
pub mod event;
pub mod snapshot;

pub use engine::{HistoryEngine, Standing};
pub use event::{Battle, BattleEvent, BattleOutcome};
pub use snapshot::OwnershipSnapshot;
