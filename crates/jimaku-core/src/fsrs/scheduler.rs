//! FSRS scheduler - state machine and configuration
//!
//! `FSRSScheduler` is a pure function of (parameters, card, now, rating):
//! no I/O, no shared mutable state, safe to call concurrently for distinct
//! cards. Callers persist the returned card and log; serializing
//! read-modify-write per card is the record store's job.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::card::{Card, Rating, ReviewLog, State};

use super::algorithm::{
    fuzz_interval, initial_difficulty, initial_stability, next_difficulty, next_forget_stability,
    next_interval, next_recall_stability, retrievability, short_term_stability, DEFAULT_MAXIMUM_INTERVAL,
    DEFAULT_RETENTION, FSRS_WEIGHTS, MIN_STABILITY,
};

const SECONDS_PER_DAY: f64 = 86_400.0;

// ============================================================================
// ERRORS
// ============================================================================

/// Scheduler error type.
///
/// All variants are local, synchronous and non-retryable: the caller must
/// fix the input. There is no transient class because the scheduler does
/// no I/O. Valid (card, rating) combinations never fail.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    /// Internally inconsistent parameter set, detected at construction
    #[error("Invalid scheduler configuration: {0}")]
    Configuration(String),
    /// Rating string outside the five accepted literals
    #[error("Invalid rating: {0}")]
    InvalidRating(String),
    /// Card state string outside the four accepted literals
    #[error("Invalid card state: {0}")]
    InvalidCardState(String),
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Policy for a Hard rating inside a learning step.
///
/// Whether Hard repeats the current step verbatim or blends toward the
/// next one is version-dependent in the FSRS family, so it stays
/// configurable rather than assumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HardIntervalPolicy {
    /// Repeat the current step's interval unchanged
    RepeatStep,
    /// Average the current and next step (1.5x a lone first step)
    #[default]
    Blend,
}

/// Scheduler configuration.
///
/// An explicit value handed to each `FSRSScheduler` - never a module-level
/// singleton, so per-user retention targets can coexist in one process.
#[derive(Debug, Clone)]
pub struct FSRSParameters {
    /// The 19 model weights
    pub weights: [f64; 19],
    /// Target retrievability at the scheduled interval, in (0, 1)
    pub request_retention: f64,
    /// Interval cap in days
    pub maximum_interval: i64,
    /// Perturb whole-day intervals so co-created cards decorrelate
    pub enable_fuzz: bool,
    /// Route first reviews through the short-term learning steps
    pub enable_short_term: bool,
    /// Step durations for Learning-state cards
    pub learning_steps: Vec<Duration>,
    /// Step durations for Relearning-state cards
    pub relearning_steps: Vec<Duration>,
    /// Whether Easy on a New card graduates straight to Review
    pub graduate_on_first_easy: bool,
    /// How Hard behaves within a learning step
    pub hard_interval_policy: HardIntervalPolicy,
}

impl Default for FSRSParameters {
    fn default() -> Self {
        Self {
            weights: FSRS_WEIGHTS,
            request_retention: DEFAULT_RETENTION,
            maximum_interval: DEFAULT_MAXIMUM_INTERVAL,
            enable_fuzz: false,
            enable_short_term: true,
            learning_steps: vec![Duration::minutes(1), Duration::minutes(10)],
            relearning_steps: vec![Duration::minutes(10)],
            graduate_on_first_easy: true,
            hard_interval_policy: HardIntervalPolicy::default(),
        }
    }
}

impl FSRSParameters {
    fn validate(&self) -> Result<(), SchedulerError> {
        if !(0.0 < self.request_retention && self.request_retention < 1.0) {
            return Err(SchedulerError::Configuration(format!(
                "request_retention must be in (0, 1), got {}",
                self.request_retention
            )));
        }
        if self.maximum_interval < 1 {
            return Err(SchedulerError::Configuration(format!(
                "maximum_interval must be at least 1 day, got {}",
                self.maximum_interval
            )));
        }
        if self.weights.iter().any(|w| !w.is_finite()) {
            return Err(SchedulerError::Configuration(
                "weights must all be finite".to_string(),
            ));
        }
        if self
            .learning_steps
            .iter()
            .chain(self.relearning_steps.iter())
            .any(|step| *step <= Duration::zero())
        {
            return Err(SchedulerError::Configuration(
                "learning steps must be positive durations".to_string(),
            ));
        }
        // A New card would have no defined transition: short-term is on,
        // there is no step to enter, and Easy cannot graduate either.
        if self.enable_short_term
            && self.learning_steps.is_empty()
            && !self.graduate_on_first_easy
        {
            return Err(SchedulerError::Configuration(
                "short-term learning enabled with no learning steps and no Easy graduation"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// OUTPUTS
// ============================================================================

/// What one review produces: the updated card and its audit log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutput {
    /// The card after the update
    pub card: Card,
    /// The immutable log of this review
    pub log: ReviewLog,
}

/// Outcome of each scheduling rating, for "what would each button do" UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResults {
    pub again: ReviewOutput,
    pub hard: ReviewOutput,
    pub good: ReviewOutput,
    pub easy: ReviewOutput,
}

// ============================================================================
// SCHEDULER
// ============================================================================

/// The spaced-repetition scheduling engine.
///
/// Holds a validated parameter set and computes, for a card, a rating and
/// a review timestamp, the next card state plus a review log.
#[derive(Debug, Clone)]
pub struct FSRSScheduler {
    params: FSRSParameters,
}

impl Default for FSRSScheduler {
    fn default() -> Self {
        // Default parameters are valid by construction
        Self {
            params: FSRSParameters::default(),
        }
    }
}

impl FSRSScheduler {
    /// Build a scheduler, rejecting inconsistent configurations
    pub fn new(params: FSRSParameters) -> Result<Self, SchedulerError> {
        params.validate()?;
        Ok(Self { params })
    }

    /// The active configuration
    pub fn params(&self) -> &FSRSParameters {
        &self.params
    }

    /// Real-valued days between the last review and `now`, floored at 0.
    /// 0 when the card was never reviewed.
    pub fn elapsed_days(&self, last_review: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
        match last_review {
            Some(last) => {
                let seconds = now.signed_duration_since(last).num_milliseconds() as f64 / 1000.0;
                (seconds / SECONDS_PER_DAY).max(0.0)
            }
            None => 0.0,
        }
    }

    /// Schedule the next review.
    ///
    /// Pure and total over valid inputs: every numeric result is clamped
    /// into range rather than propagated as NaN/infinity. `Manual` records
    /// a log and leaves the card untouched.
    pub fn next(&self, card: &Card, now: DateTime<Utc>, rating: Rating) -> ReviewOutput {
        let elapsed = self.elapsed_days(card.last_review, now);
        let log = ReviewLog::snapshot(card, rating, elapsed, now);

        // Manual short-circuits before the numeric model
        let Some(grade) = rating.grade() else {
            return ReviewOutput {
                card: card.clone(),
                log,
            };
        };

        let mut next = card.clone();
        next.elapsed_days = elapsed;
        next.last_review = Some(now);
        next.reps = card.reps.saturating_add(1);

        match card.state {
            State::New => self.review_new(&mut next, now, rating, grade),
            State::Learning | State::Relearning => {
                self.review_step(&mut next, card.state, now, rating, grade)
            }
            State::Review => self.review_long_term(&mut next, now, rating, grade, elapsed),
        }

        tracing::debug!(
            rating = %rating,
            from = %card.state,
            to = %next.state,
            scheduled_days = next.scheduled_days,
            "scheduled review"
        );

        ReviewOutput { card: next, log }
    }

    /// Outcome for each of the four scheduling ratings
    pub fn preview(&self, card: &Card, now: DateTime<Utc>) -> PreviewResults {
        PreviewResults {
            again: self.next(card, now, Rating::Again),
            hard: self.next(card, now, Rating::Hard),
            good: self.next(card, now, Rating::Good),
            easy: self.next(card, now, Rating::Easy),
        }
    }

    // ------------------------------------------------------------------
    // Per-state transitions
    // ------------------------------------------------------------------

    fn review_new(&self, next: &mut Card, now: DateTime<Utc>, rating: Rating, grade: u8) {
        let w = &self.params.weights;
        next.stability = initial_stability(w, grade);
        next.difficulty = initial_difficulty(w, grade);

        let short_term = self.params.enable_short_term && !self.params.learning_steps.is_empty();

        if !short_term || (rating == Rating::Easy && self.params.graduate_on_first_easy) {
            self.graduate(next, now);
            return;
        }

        // All non-graduating first ratings land on the first step
        next.state = State::Learning;
        next.learning_steps = 0;
        let step = match rating {
            Rating::Hard => self.hard_step_duration(&self.params.learning_steps, 0),
            _ => self.params.learning_steps[0],
        };
        self.enter_step(next, now, step);
    }

    fn review_step(
        &self,
        next: &mut Card,
        state: State,
        now: DateTime<Utc>,
        rating: Rating,
        grade: u8,
    ) {
        let w = &self.params.weights;
        next.difficulty = next_difficulty(w, next.difficulty, grade);
        next.stability = short_term_stability(w, next.stability.max(MIN_STABILITY), grade);

        let steps: &[Duration] = match state {
            State::Relearning => &self.params.relearning_steps,
            _ => &self.params.learning_steps,
        };
        if steps.is_empty() {
            self.graduate(next, now);
            return;
        }
        // Configuration may have shrunk since the card entered the steps
        let index = next.learning_steps.min(steps.len() - 1);

        match rating {
            Rating::Again => {
                // Back to the first step; a lapse was already counted at
                // the Review -> Relearning demotion, not here
                next.learning_steps = 0;
                self.enter_step(next, now, steps[0]);
            }
            Rating::Hard => {
                next.learning_steps = index;
                let step = self.hard_step_duration(steps, index);
                self.enter_step(next, now, step);
            }
            Rating::Good => {
                if index + 1 >= steps.len() {
                    self.graduate(next, now);
                } else {
                    next.learning_steps = index + 1;
                    self.enter_step(next, now, steps[index + 1]);
                }
            }
            Rating::Easy | Rating::Manual => {
                // Manual cannot reach here; Easy always graduates
                self.graduate(next, now);
            }
        }
    }

    fn review_long_term(
        &self,
        next: &mut Card,
        now: DateTime<Utc>,
        rating: Rating,
        grade: u8,
        elapsed: f64,
    ) {
        let w = &self.params.weights;
        // Both stability formulas take the pre-review memory state; the
        // difficulty update must not leak into them
        let prior_stability = next.stability;
        let prior_difficulty = next.difficulty;
        let r = retrievability(elapsed, prior_stability);
        next.difficulty = next_difficulty(w, prior_difficulty, grade);

        if rating == Rating::Again {
            // The lapse: Review -> Relearning demotion
            next.lapses = next.lapses.saturating_add(1);
            next.stability = next_forget_stability(w, prior_difficulty, prior_stability, r);
            next.state = State::Relearning;
            next.learning_steps = 0;

            let steps = &self.params.relearning_steps;
            if self.params.enable_short_term && !steps.is_empty() {
                self.enter_step(next, now, steps[0]);
            } else {
                self.schedule_in_days(next, now);
            }
        } else {
            next.stability =
                next_recall_stability(w, prior_difficulty, prior_stability, r, grade);
            self.schedule_in_days(next, now);
        }
    }

    // ------------------------------------------------------------------
    // Interval helpers
    // ------------------------------------------------------------------

    /// Leave the short-term phase for long-term Review
    fn graduate(&self, next: &mut Card, now: DateTime<Utc>) {
        next.state = State::Review;
        next.learning_steps = 0;
        self.schedule_in_days(next, now);
    }

    /// Whole-day scheduling from the card's (already updated) stability
    fn schedule_in_days(&self, next: &mut Card, now: DateTime<Utc>) {
        let mut interval = next_interval(
            next.stability,
            self.params.request_retention,
            self.params.maximum_interval,
        );
        if self.params.enable_fuzz {
            interval = fuzz_interval(
                interval,
                self.params.maximum_interval,
                fuzz_seed(next, now),
            );
        }
        next.scheduled_days = interval as f64;
        next.due = now + Duration::days(interval);
    }

    /// Sub-day scheduling for a learning/relearning step
    fn enter_step(&self, next: &mut Card, now: DateTime<Utc>, step: Duration) {
        next.scheduled_days = step.num_seconds() as f64 / SECONDS_PER_DAY;
        next.due = now + step;
    }

    fn hard_step_duration(&self, steps: &[Duration], index: usize) -> Duration {
        let index = index.min(steps.len() - 1);
        match self.params.hard_interval_policy {
            HardIntervalPolicy::RepeatStep => steps[index],
            HardIntervalPolicy::Blend => {
                if index + 1 < steps.len() {
                    (steps[index] + steps[index + 1]) / 2
                } else if index == 0 {
                    steps[0] * 3 / 2
                } else {
                    steps[index]
                }
            }
        }
    }
}

/// Seed for the interval fuzz: a stable mix of the review timestamp and
/// the card's post-review counters, so repeated identical calls reproduce
/// bit-identical output while distinct cards spread apart.
fn fuzz_seed(card: &Card, now: DateTime<Utc>) -> u64 {
    (now.timestamp_millis() as u64)
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (card.reps as u64).rotate_left(17)
        ^ card.stability.to_bits()
}

// ============================================================================
// TESTS
// ============================================================================
