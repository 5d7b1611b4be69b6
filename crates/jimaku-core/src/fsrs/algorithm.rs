//! FSRS formula layer
//!
//! Pure functions over the 19-weight memory model. Everything here is a
//! deterministic function of its arguments; the state machine lives in
//! `scheduler`.
//!
//! Numeric edge cases never escape: every result is clamped into its valid
//! range, so the model stays total over zero elapsed days, huge elapsed
//! days and near-zero stability alike.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Default model weights, 19 values.
///
/// w[0..4]  initial stability per first rating (Again, Hard, Good, Easy)
/// w[4..6]  initial difficulty curve
/// w[6..8]  difficulty delta and mean reversion
/// w[8..11] long-term stability growth
/// w[11..15] post-lapse stability
/// w[15]    hard penalty, w[16] easy bonus
/// w[17..19] short-term (same-day) stability
pub const FSRS_WEIGHTS: [f64; 19] = [
    0.40255, 1.18385, 3.173, 15.69105, 7.1949, 0.5345, 1.4604, 0.0046, 1.54575, 0.1192, 1.01925,
    1.9395, 0.11, 0.29605, 2.2698, 0.2315, 2.9898, 0.51655, 0.6621,
];

/// Floor for stability after any review
pub const MIN_STABILITY: f64 = 0.01;
/// Ceiling for stability (matches the default maximum interval)
pub const MAX_STABILITY: f64 = 36500.0;
/// Lower difficulty bound
pub const MIN_DIFFICULTY: f64 = 1.0;
/// Upper difficulty bound
pub const MAX_DIFFICULTY: f64 = 10.0;
/// Default retention target at the scheduled interval
pub const DEFAULT_RETENTION: f64 = 0.9;
/// Default interval cap in days (~100 years)
pub const DEFAULT_MAXIMUM_INTERVAL: i64 = 36500;

/// Probability of recall after `elapsed_days` at the given stability.
///
/// R = exp(-t / (9 * S)). The 9 is a model constant; test vectors depend
/// on this exact curve.
pub fn retrievability(elapsed_days: f64, stability: f64) -> f64 {
    if stability <= 0.0 {
        return 0.0;
    }
    if elapsed_days <= 0.0 {
        return 1.0;
    }
    (-elapsed_days / (9.0 * stability)).exp()
}

/// Interval in whole days at which retrievability decays to the retention
/// target: the forgetting curve solved for t at R = `request_retention`.
///
/// Clamped to [1, `maximum_interval`].
pub fn next_interval(stability: f64, request_retention: f64, maximum_interval: i64) -> i64 {
    let retention = request_retention.clamp(1e-4, 1.0 - 1e-4);
    let interval = 9.0 * stability * (1.0 / retention).ln();
    (interval.round() as i64).clamp(1, maximum_interval.max(1))
}

/// Initial stability after the first review: S0(G) = w[G-1]
pub fn initial_stability(w: &[f64; 19], grade: u8) -> f64 {
    let index = (grade.clamp(1, 4) - 1) as usize;
    w[index].clamp(MIN_STABILITY, MAX_STABILITY)
}

/// Initial difficulty after the first review:
/// D0(G) = w[4] - e^(w[5] * (G - 1)) + 1, clamped to [1, 10]
pub fn initial_difficulty(w: &[f64; 19], grade: u8) -> f64 {
    let g = grade.clamp(1, 4) as f64;
    clamp_difficulty(w[4] - (w[5] * (g - 1.0)).exp() + 1.0)
}

/// Difficulty update for a subsequent review.
///
/// A linear delta scaled toward the bounds, then mean reversion toward the
/// easy-card initial difficulty with weight w[7].
pub fn next_difficulty(w: &[f64; 19], difficulty: f64, grade: u8) -> f64 {
    let g = grade.clamp(1, 4) as f64;
    let delta = -w[6] * (g - 3.0);
    let shifted = difficulty + delta * ((10.0 - difficulty) / 9.0);
    clamp_difficulty(w[7] * initial_difficulty(w, 4) + (1.0 - w[7]) * shifted)
}

/// Stability growth after a successful Review-state recall.
///
/// One continuous formula parameterized by grade: Hard applies the w[15]
/// penalty, Easy the w[16] bonus, Good neither.
pub fn next_recall_stability(
    w: &[f64; 19],
    difficulty: f64,
    stability: f64,
    retrievability: f64,
    grade: u8,
) -> f64 {
    let s = stability.max(MIN_STABILITY);
    let hard_penalty = if grade == 2 { w[15] } else { 1.0 };
    let easy_bonus = if grade == 4 { w[16] } else { 1.0 };

    let growth = w[8].exp()
        * (11.0 - difficulty)
        * s.powf(-w[9])
        * ((w[10] * (1.0 - retrievability)).exp() - 1.0)
        * hard_penalty
        * easy_bonus;

    (s * (1.0 + growth)).clamp(MIN_STABILITY, MAX_STABILITY)
}

/// Post-lapse stability after a Review-state card is rated Again.
///
/// Never exceeds the prior stability.
pub fn next_forget_stability(
    w: &[f64; 19],
    difficulty: f64,
    stability: f64,
    retrievability: f64,
) -> f64 {
    let s = stability.max(MIN_STABILITY);
    let new_s = w[11]
        * difficulty.max(MIN_DIFFICULTY).powf(-w[12])
        * ((s + 1.0).powf(w[13]) - 1.0)
        * (w[14] * (1.0 - retrievability)).exp();

    new_s.clamp(MIN_STABILITY, s)
}

/// Stability update while the card sits in a learning/relearning step.
///
/// S' = S * e^(w[17] * (G - 3 + w[18])) - deliberately distinct from the
/// long-term growth formula.
pub fn short_term_stability(w: &[f64; 19], stability: f64, grade: u8) -> f64 {
    let g = grade.clamp(1, 4) as f64;
    let s = stability.max(MIN_STABILITY);
    (s * (w[17] * (g - 3.0 + w[18])).exp()).clamp(MIN_STABILITY, MAX_STABILITY)
}

/// Deterministic banded fuzz over a whole-day interval.
///
/// Bands widen with interval length: +/-15% of the portion in [2.5, 7)
/// days, +/-10% in [7, 20), +/-5% beyond 20. Intervals under 2.5 days pass
/// through untouched. The result never leaves [2, `maximum_interval`].
///
/// The same seed always reproduces the same perturbation, so a fixed
/// (card, timestamp) input schedules identically while distinct cards
/// decorrelate.
pub fn fuzz_interval(interval: i64, maximum_interval: i64, seed: u64) -> i64 {
    let ivl = interval as f64;
    if ivl < 2.5 {
        return interval.min(maximum_interval.max(1));
    }

    let delta = 0.15 * (ivl.min(7.0) - 2.5).max(0.0)
        + 0.10 * (ivl.min(20.0) - 7.0).max(0.0)
        + 0.05 * (ivl - 20.0).max(0.0);

    let min_ivl = ((ivl - delta).round() as i64).max(2);
    let max_ivl = ((ivl + delta).round() as i64).min(maximum_interval.max(2));
    if min_ivl >= max_ivl {
        return min_ivl.min(maximum_interval.max(1));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    rng.gen_range(min_ivl..=max_ivl)
}

fn clamp_difficulty(difficulty: f64) -> f64 {
    if difficulty.is_nan() {
        return MAX_DIFFICULTY;
    }
    difficulty.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
}

// ============================================================================
// TESTS
// ============================================================================
