//! Adaptive decay adjustment driven by quiz results.
//!
//! Two stages run in sequence. Stage A picks the first matching accuracy /
//! confidence rule and moves both half-life and multiplier. Stage B always
//! runs and nudges only the multiplier based on response time. The half-life
//! cap/floor belongs to stage A; the multiplier is clamped once at the end.

use crate::model::{Confidence, DecayParams, MAX_HALF_LIFE_DAYS, MIN_HALF_LIFE_DAYS};

/// Quiz signals feeding an adjustment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuizSignal {
    pub accuracy: u8,
    /// Average seconds per question.
    pub response_time: f64,
    pub confidence: Confidence,
}

/// Stage A branch that fired, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceTier {
    Excellent,
    Good,
    Poor,
    Neutral,
}

impl PerformanceTier {
    #[must_use]
    pub fn classify(accuracy: u8, confidence: Confidence) -> Self {
        if accuracy >= 80 && confidence == Confidence::High {
            PerformanceTier::Excellent
        } else if accuracy >= 60 && confidence != Confidence::Low {
            PerformanceTier::Good
        } else if accuracy < 50 || confidence == Confidence::Low {
            PerformanceTier::Poor
        } else {
            PerformanceTier::Neutral
        }
    }
}

/// Recompute decay parameters from a quiz result.
#[must_use]
pub fn adjust(current: DecayParams, signal: QuizSignal) -> DecayParams {
    let mut half_life = current.half_life();
    let mut multiplier = current.multiplier();

    match PerformanceTier::classify(signal.accuracy, signal.confidence) {
        PerformanceTier::Excellent => {
            half_life = (half_life * 1.3).min(MAX_HALF_LIFE_DAYS);
            multiplier *= 0.8;
        }
        PerformanceTier::Good => {
            half_life = (half_life * 1.1).min(MAX_HALF_LIFE_DAYS);
            multiplier *= 0.9;
        }
        PerformanceTier::Poor => {
            half_life = (half_life * 0.8).max(MIN_HALF_LIFE_DAYS);
            multiplier *= 1.2;
        }
        PerformanceTier::Neutral => {}
    }

    if signal.response_time < 8.0 {
        multiplier *= 0.95;
    } else if signal.response_time > 18.0 {
        multiplier *= 1.1;
    }

    DecayParams::new(half_life, multiplier)
}
