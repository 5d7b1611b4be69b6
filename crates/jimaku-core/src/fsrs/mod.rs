//! FSRS (Free Spaced Repetition Scheduler) Module
//!
//! A 19-parameter memory model plus the state machine that drives card
//! scheduling. Far more efficient than SM-2 at hitting a target retention.
//!
//! Reference: https://github.com/open-spaced-repetition/fsrs4anki
//!
//! ## Core Formulas:
//! - Retrievability: R = e^(-t / (9 * S))
//! - Interval: t = 9 * S * ln(1 / retention)
//!
//! `algorithm` holds the pure formulas; `scheduler` holds the configured
//! engine and the card lifecycle transitions.

mod algorithm;
mod scheduler;

pub use algorithm::{
    fuzz_interval,
    initial_difficulty,
    initial_stability,
    next_difficulty,
    next_forget_stability,
    next_interval,
    next_recall_stability,
    // Core functions
    retrievability,
    short_term_stability,
    DEFAULT_MAXIMUM_INTERVAL,
    DEFAULT_RETENTION,
    // Constants
    FSRS_WEIGHTS,
    MAX_DIFFICULTY,
    MAX_STABILITY,
    MIN_DIFFICULTY,
    MIN_STABILITY,
};

pub use scheduler::{
    FSRSParameters, FSRSScheduler, HardIntervalPolicy, PreviewResults, ReviewOutput,
    SchedulerError,
};
