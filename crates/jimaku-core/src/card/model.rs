//! Card - The fundamental unit of scheduling state
//!
//! One `Card` per flashcard, owned 1:1 by the flashcard entity. Holds the
//! FSRS memory state (stability, difficulty), interval counters, the
//! lifecycle state, and the next due date. Carries no content: front/back
//! text, subtitle snippets and drawings live with the flashcard itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Difficulty assigned to a card that has never been reviewed.
///
/// Midpoint of the valid [1, 10] range. The first review overwrites it
/// with the rating-derived initial difficulty.
pub const DEFAULT_DIFFICULTY: f64 = 5.0;

// ============================================================================
// LIFECYCLE STATE
// ============================================================================

/// Lifecycle phase of a card.
///
/// Serialized as the literal strings `New`, `Learning`, `Review`,
/// `Relearning` - the same four strings the record store persists, so the
/// enum converts at the store boundary without index arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum State {
    /// Never reviewed
    #[default]
    New,
    /// In the short-term learning steps
    Learning,
    /// Graduated to long-term review
    Review,
    /// Lapsed out of Review, back in short-term steps
    Relearning,
}

impl State {
    /// The literal string stored by the record store
    pub fn as_str(&self) -> &'static str {
        match self {
            State::New => "New",
            State::Learning => "Learning",
            State::Review => "Review",
            State::Relearning => "Relearning",
        }
    }

    /// True while the card sits in a short-term learning step
    pub fn is_short_term(&self) -> bool {
        matches!(self, State::Learning | State::Relearning)
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for State {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "New" => Ok(State::New),
            "Learning" => Ok(State::Learning),
            "Review" => Ok(State::Review),
            "Relearning" => Ok(State::Relearning),
            _ => Err(format!("Unknown card state: {}", s)),
        }
    }
}

// ============================================================================
// RATING
// ============================================================================

/// Answer rating for a review.
///
/// `Manual` is a bookkeeping rating for reviews logged outside the
/// scheduler (e.g. imported history). It never reaches the numeric model:
/// the scheduler records a log and leaves the card untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rating {
    /// Logged without scheduling
    Manual,
    /// Forgot the card
    Again,
    /// Recalled with serious difficulty
    Hard,
    /// Recalled after some hesitation
    Good,
    /// Recalled effortlessly
    Easy,
}

impl Rating {
    /// The literal string stored by the record store
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Manual => "Manual",
            Rating::Again => "Again",
            Rating::Hard => "Hard",
            Rating::Good => "Good",
            Rating::Easy => "Easy",
        }
    }

    /// Numeric grade used by the memory model (Again=1 .. Easy=4).
    ///
    /// `None` for `Manual` - the explicit guard that keeps manually logged
    /// reviews out of the stability/difficulty formulas.
    pub fn grade(&self) -> Option<u8> {
        match self {
            Rating::Manual => None,
            Rating::Again => Some(1),
            Rating::Hard => Some(2),
            Rating::Good => Some(3),
            Rating::Easy => Some(4),
        }
    }

    /// The four ratings that drive scheduling, in grade order
    pub fn scheduling_ratings() -> [Rating; 4] {
        [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy]
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Rating {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Manual" => Ok(Rating::Manual),
            "Again" => Ok(Rating::Again),
            "Hard" => Ok(Rating::Hard),
            "Good" => Ok(Rating::Good),
            "Easy" => Ok(Rating::Easy),
            _ => Err(format!("Unknown rating: {}", s)),
        }
    }
}

// ============================================================================
// CARD
// ============================================================================

/// Scheduling state of a single flashcard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// When the card should next be shown
    pub due: DateTime<Utc>,
    /// Days until recall probability decays to the retention target
    pub stability: f64,
    /// Inherent difficulty (1.0 = easy, 10.0 = hard)
    pub difficulty: f64,
    /// Days since the last review (0 if never reviewed)
    pub elapsed_days: f64,
    /// The interval scheduled at the last review, in days
    pub scheduled_days: f64,
    /// Total scheduled-review count
    pub reps: u32,
    /// Times a Review-state card was rated Again
    pub lapses: u32,
    /// Lifecycle phase
    pub state: State,
    /// Timestamp of the last review, None until first reviewed
    pub last_review: Option<DateTime<Utc>>,
    /// Index into the configured learning/relearning step sequence.
    /// Meaningful only while `state` is Learning or Relearning.
    pub learning_steps: usize,
}

impl Card {
    /// Create an empty card: state New, immediately due, never reviewed
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            due: now,
            stability: 0.0,
            difficulty: DEFAULT_DIFFICULTY,
            elapsed_days: 0.0,
            scheduled_days: 0.0,
            reps: 0,
            lapses: 0,
            state: State::New,
            last_review: None,
            learning_steps: 0,
        }
    }

    /// Check whether the card is due at the given wall-clock time
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due <= now
    }
}

// ============================================================================
// TESTS
// ============================================================================
