use retention_core::model::{
    Answers, Confidence, Question, QuestionId, QuickTest, Skill, SkillId, TestId, TestResult,
    UserId,
};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn skill_id_from_i64(v: i64) -> Result<SkillId, StorageError> {
    Ok(SkillId::new(i64_to_u64("skill_id", v)?))
}

pub(crate) fn test_id_from_i64(v: i64) -> Result<TestId, StorageError> {
    Ok(TestId::new(i64_to_u64("test_id", v)?))
}

fn user_id_from_str(s: &str) -> Result<UserId, StorageError> {
    s.parse::<UserId>().map_err(ser)
}

// Answers are stored as a JSON array so question ids stay numeric.
#[derive(Serialize, Deserialize)]
struct AnswerEntry {
    question: u64,
    choice: u32,
}

pub(crate) fn answers_to_json(answers: &Answers) -> Result<String, StorageError> {
    let entries: Vec<AnswerEntry> = answers
        .iter()
        .map(|(q, choice)| AnswerEntry {
            question: q.value(),
            choice: *choice,
        })
        .collect();
    serde_json::to_string(&entries).map_err(ser)
}

fn answers_from_json(raw: &str) -> Result<Answers, StorageError> {
    let entries: Vec<AnswerEntry> = serde_json::from_str(raw).map_err(ser)?;
    Ok(entries
        .into_iter()
        .map(|e| (QuestionId::new(e.question), e.choice))
        .collect())
}

pub(crate) fn questions_to_json(questions: &[Question]) -> Result<String, StorageError> {
    serde_json::to_string(questions).map_err(ser)
}

pub(crate) const SKILL_COLUMNS: &str = "id, owner_id, name, category, initial_proficiency, \
     last_practiced_at, half_life, adaptive_decay_multiplier, created_at, updated_at";

pub(crate) const TEST_COLUMNS: &str = "id, skill_id, owner_id, skill_name, questions, created_at, \
     answers, score, accuracy, total_time, average_time_per_question, confidence, completed_at";

pub(crate) fn map_skill_row(row: &SqliteRow) -> Result<Skill, StorageError> {
    let owner: String = row.try_get("owner_id").map_err(ser)?;
    let proficiency: i64 = row.try_get("initial_proficiency").map_err(ser)?;
    let proficiency = i32::try_from(proficiency)
        .map_err(|_| StorageError::Serialization(format!("invalid proficiency: {proficiency}")))?;

    Skill::from_persisted(
        skill_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        user_id_from_str(&owner)?,
        row.try_get("name").map_err(ser)?,
        row.try_get("category").map_err(ser)?,
        proficiency,
        row.try_get("last_practiced_at").map_err(ser)?,
        row.try_get("half_life").map_err(ser)?,
        row.try_get("adaptive_decay_multiplier").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
        row.try_get("updated_at").map_err(ser)?,
    )
    .map_err(ser)
}

fn map_result(row: &SqliteRow) -> Result<Option<TestResult>, StorageError> {
    let completed_at: Option<chrono::DateTime<chrono::Utc>> =
        row.try_get("completed_at").map_err(ser)?;
    let Some(completed_at) = completed_at else {
        return Ok(None);
    };

    let missing = |field: &str| StorageError::Serialization(format!("completed test missing {field}"));

    let answers: Option<String> = row.try_get("answers").map_err(ser)?;
    let score: Option<i64> = row.try_get("score").map_err(ser)?;
    let accuracy: Option<i64> = row.try_get("accuracy").map_err(ser)?;
    let total_time: Option<f64> = row.try_get("total_time").map_err(ser)?;
    let average: Option<f64> = row.try_get("average_time_per_question").map_err(ser)?;
    let confidence: Option<String> = row.try_get("confidence").map_err(ser)?;

    let score = score.ok_or_else(|| missing("score"))?;
    let accuracy = accuracy.ok_or_else(|| missing("accuracy"))?;

    Ok(Some(TestResult {
        answers: answers_from_json(&answers.ok_or_else(|| missing("answers"))?)?,
        score: u32::try_from(score)
            .map_err(|_| StorageError::Serialization(format!("invalid score: {score}")))?,
        accuracy: u8::try_from(accuracy)
            .map_err(|_| StorageError::Serialization(format!("invalid accuracy: {accuracy}")))?,
        total_time: total_time.ok_or_else(|| missing("total_time"))?,
        average_time_per_question: average.ok_or_else(|| missing("average_time_per_question"))?,
        confidence: Confidence::parse(&confidence.ok_or_else(|| missing("confidence"))?)
            .map_err(ser)?,
        completed_at,
    }))
}

pub(crate) fn map_test_row(row: &SqliteRow) -> Result<QuickTest, StorageError> {
    let owner: String = row.try_get("owner_id").map_err(ser)?;
    let questions: String = row.try_get("questions").map_err(ser)?;
    let questions: Vec<Question> = serde_json::from_str(&questions).map_err(ser)?;

    Ok(QuickTest::from_persisted(
        test_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        skill_id_from_i64(row.try_get::<i64, _>("skill_id").map_err(ser)?)?,
        user_id_from_str(&owner)?,
        row.try_get("skill_name").map_err(ser)?,
        questions,
        row.try_get("created_at").map_err(ser)?,
        map_result(row)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_json_round_trips_numeric_ids() {
        let mut answers = Answers::new();
        answers.insert(QuestionId::new(1), 0);
        answers.insert(QuestionId::new(5), 3);

        let json = answers_to_json(&answers).unwrap();
        assert_eq!(json, r#"[{"question":1,"choice":0},{"question":5,"choice":3}]"#);
        assert_eq!(answers_from_json(&json).unwrap(), answers);
    }

    #[test]
    fn malformed_answers_are_serialization_errors() {
        let err = answers_from_json("{not json").unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }
}
