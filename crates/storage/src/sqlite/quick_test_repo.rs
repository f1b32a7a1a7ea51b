use retention_core::model::{
    NewQuickTest, QuickTest, Skill, SkillId, SkillUpdate, TestId, TestResult, UserId,
};
use sqlx::SqliteConnection;

use super::SqliteRepository;
use super::mapping::{
    TEST_COLUMNS, answers_to_json, conn, id_to_i64, map_test_row, questions_to_json,
    test_id_from_i64,
};
use super::skill_repo::{fetch_skill, store_skill_state};
use crate::repository::{QuickTestRepository, StorageError, SubmissionPersistence};

async fn fetch_test(
    executor: &mut SqliteConnection,
    id: TestId,
) -> Result<Option<QuickTest>, StorageError> {
    let sql = format!("SELECT {TEST_COLUMNS} FROM quick_tests WHERE id = ?1");
    let row = sqlx::query(&sql)
        .bind(id_to_i64("test_id", id.value())?)
        .fetch_optional(&mut *executor)
        .await
        .map_err(conn)?;
    row.as_ref().map(map_test_row).transpose()
}

#[async_trait::async_trait]
impl QuickTestRepository for SqliteRepository {
    async fn insert_new_test(&self, test: NewQuickTest) -> Result<QuickTest, StorageError> {
        let result = sqlx::query(
            r"
            INSERT INTO quick_tests (skill_id, owner_id, skill_name, questions, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(id_to_i64("skill_id", test.skill_id.value())?)
        .bind(test.owner_id.to_string())
        .bind(test.skill_name.clone())
        .bind(questions_to_json(&test.questions)?)
        .bind(test.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            // The skill vanished between generation and insert.
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => StorageError::NotFound,
            other => conn(other),
        })?;

        let id = test_id_from_i64(result.last_insert_rowid())?;
        Ok(test.assign_id(id))
    }

    async fn get_test(&self, id: TestId) -> Result<Option<QuickTest>, StorageError> {
        let mut db = self.pool.acquire().await.map_err(conn)?;
        fetch_test(&mut *db, id).await
    }

    async fn tests_for_skill(&self, skill_id: SkillId) -> Result<Vec<QuickTest>, StorageError> {
        let sql =
            format!("SELECT {TEST_COLUMNS} FROM quick_tests WHERE skill_id = ?1 ORDER BY id ASC");
        let rows = sqlx::query(&sql)
            .bind(id_to_i64("skill_id", skill_id.value())?)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;
        rows.iter().map(map_test_row).collect()
    }

    async fn tests_for_user(&self, owner: UserId) -> Result<Vec<QuickTest>, StorageError> {
        let sql =
            format!("SELECT {TEST_COLUMNS} FROM quick_tests WHERE owner_id = ?1 ORDER BY id ASC");
        let rows = sqlx::query(&sql)
            .bind(owner.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;
        rows.iter().map(map_test_row).collect()
    }
}

#[async_trait::async_trait]
impl SubmissionPersistence for SqliteRepository {
    async fn apply_submission(
        &self,
        test_id: TestId,
        result: &TestResult,
        skill_id: SkillId,
        update: &SkillUpdate,
    ) -> Result<(QuickTest, Skill), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let completed = sqlx::query(
            r"
            UPDATE quick_tests
            SET answers = ?1,
                score = ?2,
                accuracy = ?3,
                total_time = ?4,
                average_time_per_question = ?5,
                confidence = ?6,
                completed_at = ?7
            WHERE id = ?8 AND completed_at IS NULL
            ",
        )
        .bind(answers_to_json(&result.answers)?)
        .bind(i64::from(result.score))
        .bind(i64::from(result.accuracy))
        .bind(result.total_time)
        .bind(result.average_time_per_question)
        .bind(result.confidence.as_str())
        .bind(result.completed_at)
        .bind(id_to_i64("test_id", test_id.value())?)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        if completed.rows_affected() == 0 {
            // Dropping `tx` rolls back; tell the caller which precondition failed.
            return match fetch_test(&mut *tx, test_id).await? {
                Some(_) => Err(StorageError::Conflict),
                None => Err(StorageError::NotFound),
            };
        }

        let mut skill = fetch_skill(&mut *tx, skill_id)
            .await?
            .ok_or(StorageError::NotFound)?;
        skill.apply(update);
        store_skill_state(&mut *tx, &skill).await?;

        let test = fetch_test(&mut *tx, test_id)
            .await?
            .ok_or(StorageError::NotFound)?;

        tx.commit().await.map_err(conn)?;
        tracing::debug!(test_id = %test_id, skill_id = %skill_id, "submission committed");
        Ok((test, skill))
    }
}
