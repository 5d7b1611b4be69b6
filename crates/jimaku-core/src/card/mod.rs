//! Card module - scheduling state types
//!
//! The canonical shapes the scheduler consumes and produces:
//! - `Card` with its lifecycle `State` and review `Rating`
//! - `ReviewLog`, the immutable per-review audit record
//! - `ReviewStats`, the read-side aggregation over the record store
//!
//! The scheduler depends on these shapes, never the other way around.

mod log;
mod model;

pub use log::ReviewLog;
pub use model::{Card, Rating, State, DEFAULT_DIFFICULTY};

use serde::{Deserialize, Serialize};

/// Read-side counts over the card store.
///
/// A pure aggregation of query results: computing it twice over an
/// unchanged store yields identical numbers. It may trail an in-flight
/// review by one snapshot, which callers tolerate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    /// All cards in the store
    pub total_cards: i64,
    /// Cards never reviewed
    pub new_cards: i64,
    /// Cards in Learning or Relearning steps
    pub learning_cards: i64,
    /// Cards graduated to long-term Review
    pub review_cards: i64,
    /// Cards with `due` at or before the snapshot time
    pub due_cards: i64,
    /// Distinct cards reviewed during the snapshot's UTC day
    pub reviewed_today: i64,
}
