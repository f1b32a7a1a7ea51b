//! Quick recall quizzes: fixed question templates and submission scoring.
//!
//! The questions are self-assessment prompts. Each template's `correct_index`
//! encodes the typical/optimal response (e.g. "Today" for last practice) and
//! is scored literally.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::{Answers, Confidence, Performance, Question, QuestionId, TestResult};

/// Questions per generated quiz.
pub const QUESTIONS_PER_TEST: usize = 5;

/// Below this average seconds per question, confidence is high.
pub const HIGH_CONFIDENCE_MAX_SECS: f64 = 10.0;
/// Above this average seconds per question, confidence is low.
pub const LOW_CONFIDENCE_MIN_SECS: f64 = 20.0;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ScoringError {
    #[error("total time must be a non-negative number of seconds, got {0}")]
    InvalidTotalTime(f64),

    #[error("answer references unknown question {0}")]
    UnknownQuestion(QuestionId),

    #[error("test has no questions")]
    NoQuestions,
}

//
// ─── TEMPLATES ─────────────────────────────────────────────────────────────────
//

struct Template {
    /// `{skill}` is replaced by the skill name.
    text: &'static str,
    options: [&'static str; 4],
    correct_index: u32,
}

const TEMPLATES: [Template; QUESTIONS_PER_TEST] = [
    Template {
        text: "How would you describe your current proficiency in {skill}?",
        options: ["Expert", "Intermediate", "Beginner", "Just learning"],
        correct_index: 1,
    },
    Template {
        text: "When did you last practice {skill}?",
        options: ["Today", "This week", "This month", "Longer ago"],
        correct_index: 0,
    },
    Template {
        text: "Can you recall a key concept from {skill}?",
        options: [
            "Yes, multiple concepts",
            "Yes, one concept",
            "Maybe with hints",
            "Not really",
        ],
        correct_index: 0,
    },
    Template {
        text: "How confident are you in applying {skill}?",
        options: [
            "Very confident",
            "Somewhat confident",
            "Not very confident",
            "Not confident",
        ],
        correct_index: 0,
    },
    Template {
        text: "What is the best way to maintain your skills in {skill}?",
        options: [
            "Regular practice and testing",
            "Occasional review",
            "Hope for the best",
            "Never practice",
        ],
        correct_index: 0,
    },
];

/// Build the five recall questions for a skill. Ids are `q1..=q5`.
#[must_use]
pub fn generate_questions(skill_name: &str) -> Vec<Question> {
    TEMPLATES
        .iter()
        .zip(1_u64..)
        .map(|(template, n)| Question {
            id: QuestionId::new(n),
            text: template.text.replace("{skill}", skill_name),
            options: template.options.iter().map(|o| (*o).to_owned()).collect(),
            correct_index: template.correct_index,
        })
        .collect()
}

//
// ─── CLASSIFICATION ────────────────────────────────────────────────────────────
//

#[must_use]
pub fn classify_confidence(average_time_per_question: f64) -> Confidence {
    if average_time_per_question < HIGH_CONFIDENCE_MAX_SECS {
        Confidence::High
    } else if average_time_per_question > LOW_CONFIDENCE_MIN_SECS {
        Confidence::Low
    } else {
        Confidence::Medium
    }
}

/// First matching rule wins.
#[must_use]
pub fn performance_label(accuracy: u8, average_time_per_question: f64) -> Performance {
    if accuracy >= 80 && average_time_per_question < 10.0 {
        Performance::Excellent
    } else if accuracy >= 60 && average_time_per_question < 15.0 {
        Performance::Good
    } else if accuracy >= 40 {
        Performance::Fair
    } else {
        Performance::NeedsPractice
    }
}

//
// ─── SCORING ───────────────────────────────────────────────────────────────────
//

/// Summary handed back to the submitter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResults {
    pub score: u32,
    pub total_questions: u32,
    pub accuracy: u8,
    pub confidence: Confidence,
    pub total_time: f64,
    pub average_time_per_question: f64,
    pub performance: Performance,
}

/// Scored submission: the persisted result plus the summary.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredSubmission {
    pub result: TestResult,
    pub summary: TestResults,
}

/// Score `answers` against `questions`.
///
/// Missing answers never count as correct. An option index outside the
/// question's options is simply wrong.
///
/// # Errors
///
/// - `InvalidTotalTime` if `total_time` is negative or not finite
/// - `UnknownQuestion` if an answer targets a question not in the test
/// - `NoQuestions` if the test is empty
pub fn score_submission(
    questions: &[Question],
    answers: Answers,
    total_time: f64,
    completed_at: DateTime<Utc>,
) -> Result<ScoredSubmission, ScoringError> {
    if !total_time.is_finite() || total_time < 0.0 {
        return Err(ScoringError::InvalidTotalTime(total_time));
    }
    if questions.is_empty() {
        return Err(ScoringError::NoQuestions);
    }
    if let Some(unknown) = answers
        .keys()
        .find(|id| !questions.iter().any(|q| q.id == **id))
    {
        return Err(ScoringError::UnknownQuestion(*unknown));
    }

    let correct = questions
        .iter()
        .filter(|q| answers.get(&q.id).is_some_and(|choice| q.is_correct(*choice)))
        .count();

    // A quiz holds a handful of questions; these conversions cannot overflow.
    #[allow(clippy::cast_possible_truncation)]
    let (score, total_questions) = (correct as u32, questions.len() as u32);

    let ratio = f64::from(score) / f64::from(total_questions);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let accuracy = (ratio * 100.0).round() as u8;

    let average_time_per_question = total_time / f64::from(total_questions);
    let confidence = classify_confidence(average_time_per_question);
    let performance = performance_label(accuracy, average_time_per_question);

    Ok(ScoredSubmission {
        result: TestResult {
            answers,
            score,
            accuracy,
            total_time,
            average_time_per_question,
            confidence,
            completed_at,
        },
        summary: TestResults {
            score,
            total_questions,
            accuracy,
            confidence,
            total_time,
            average_time_per_question,
            performance,
        },
    })
}
