//! # Jimaku Core
//!
//! Spaced-repetition scheduling engine for a subtitle-driven language
//! learning app. Implements the FSRS memory model:
//!
//! - **FSRS scheduling**: 19-parameter model of stability and difficulty
//! - **Exponential forgetting curve**: R = e^(-t / (9 * S))
//! - **Short-term learning steps**: Anki-style sub-day Learning/Relearning
//! - **Deterministic interval fuzz**: banded, seeded perturbation
//! - **SQLite record store**: cards plus an append-only review log
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use jimaku_core::{Rating, Storage};
//!
//! // Create storage (uses default platform-specific location)
//! let storage = Storage::new(None)?;
//!
//! // Create a card and review it
//! let card = storage.create_card(Some("n5-vocab"))?;
//! let (updated, log) = storage.review_card(&card.id, Rating::Good, chrono::Utc::now())?;
//!
//! // What's due now?
//! let queue = storage.due_cards(chrono::Utc::now(), 50)?;
//! ```
//!
//! The scheduler is also usable standalone, without storage:
//!
//! ```rust,ignore
//! use jimaku_core::{Card, FSRSScheduler, Rating};
//!
//! let scheduler = FSRSScheduler::default();
//! let card = Card::new(chrono::Utc::now());
//! let outcome = scheduler.next(&card, chrono::Utc::now(), Rating::Good);
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod card;
pub mod fsrs;
pub mod storage;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Card types
pub use card::{Card, Rating, ReviewLog, ReviewStats, State, DEFAULT_DIFFICULTY};

// FSRS algorithm
pub use fsrs::{
    initial_difficulty,
    initial_stability,
    next_interval,
    // Core functions for advanced usage
    retrievability,
    FSRSParameters,
    FSRSScheduler,
    HardIntervalPolicy,
    PreviewResults,
    ReviewOutput,
    SchedulerError,
};

// Storage layer
pub use storage::{CardRecord, Result, ReviewLogRecord, Storage, StorageError};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// FSRS parameter-set generation (5 = 19 weights)
pub const FSRS_VERSION: u8 = 5;

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        Card, CardRecord, FSRSParameters, FSRSScheduler, PreviewResults, Rating, Result,
        ReviewLog, ReviewOutput, ReviewStats, State, Storage, StorageError,
    };
}
