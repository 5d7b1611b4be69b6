//! Review log - immutable audit record of a single review
//!
//! One log per review event, appended by the scheduler and never mutated.
//! Fields snapshot the card *before* the update so the full review history
//! can reconstruct every scheduling decision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::model::{Card, Rating, State};

/// Audit record of one review event.
///
/// Owned by exactly one card (many logs to one card). The scheduler
/// creates it; deletion only happens transitively when the owning card is
/// deleted by the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewLog {
    /// The rating given
    pub rating: Rating,
    /// Card state before the update
    pub state: State,
    /// Due date before the update
    pub due: DateTime<Utc>,
    /// Stability before the update
    pub stability: f64,
    /// Difficulty before the update
    pub difficulty: f64,
    /// Days elapsed since the previous review, computed at this review
    pub elapsed_days: f64,
    /// The elapsed-days value stored on the card before this review -
    /// the interval-before-the-interval, kept for model continuity
    pub last_elapsed_days: f64,
    /// Interval that was scheduled at the previous review
    pub scheduled_days: f64,
    /// Learning-step index before the update
    pub learning_steps: usize,
    /// When this review happened
    pub review_time: DateTime<Utc>,
}

impl ReviewLog {
    /// Snapshot the pre-review card into a log entry.
    ///
    /// `elapsed_days` is the freshly computed value for this review; the
    /// card still carries the previous one, which lands in
    /// `last_elapsed_days`.
    pub fn snapshot(card: &Card, rating: Rating, elapsed_days: f64, now: DateTime<Utc>) -> Self {
        Self {
            rating,
            state: card.state,
            due: card.due,
            stability: card.stability,
            difficulty: card.difficulty,
            elapsed_days,
            last_elapsed_days: card.elapsed_days,
            scheduled_days: card.scheduled_days,
            learning_steps: card.learning_steps,
            review_time: now,
        }
    }
}
