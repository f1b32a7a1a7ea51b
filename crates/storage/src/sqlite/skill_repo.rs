use retention_core::model::{DecayParams, Skill, SkillId, SkillUpdate, UserId, ValidatedSkill};
use sqlx::SqliteConnection;

use super::SqliteRepository;
use super::mapping::{SKILL_COLUMNS, conn, id_to_i64, map_skill_row, skill_id_from_i64};
use crate::repository::{SkillRepository, StorageError};

pub(super) async fn fetch_skill(
    executor: &mut SqliteConnection,
    id: SkillId,
) -> Result<Option<Skill>, StorageError> {
    let sql = format!("SELECT {SKILL_COLUMNS} FROM skills WHERE id = ?1");
    let row = sqlx::query(&sql)
        .bind(id_to_i64("skill_id", id.value())?)
        .fetch_optional(&mut *executor)
        .await
        .map_err(conn)?;
    row.as_ref().map(map_skill_row).transpose()
}

/// Write the mutable columns of `skill` back to its row.
pub(super) async fn store_skill_state(
    executor: &mut SqliteConnection,
    skill: &Skill,
) -> Result<(), StorageError> {
    let result = sqlx::query(
        r"
        UPDATE skills
        SET last_practiced_at = ?1,
            half_life = ?2,
            adaptive_decay_multiplier = ?3,
            updated_at = ?4
        WHERE id = ?5
        ",
    )
    .bind(skill.last_practiced_at())
    .bind(skill.half_life())
    .bind(skill.adaptive_decay_multiplier())
    .bind(skill.updated_at())
    .bind(id_to_i64("skill_id", skill.id().value())?)
    .execute(&mut *executor)
    .await
    .map_err(conn)?;

    if result.rows_affected() == 0 {
        return Err(StorageError::NotFound);
    }
    Ok(())
}

#[async_trait::async_trait]
impl SkillRepository for SqliteRepository {
    async fn insert_new_skill(&self, skill: ValidatedSkill) -> Result<Skill, StorageError> {
        // New skills start at the default decay and count as practiced on creation.
        let defaults = DecayParams::default();
        let result = sqlx::query(
            r"
            INSERT INTO skills (
                owner_id, name, category, initial_proficiency, last_practiced_at,
                half_life, adaptive_decay_multiplier, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
        )
        .bind(skill.owner_id.to_string())
        .bind(&skill.name)
        .bind(&skill.category)
        .bind(i64::from(skill.initial_proficiency))
        .bind(skill.created_at)
        .bind(defaults.half_life())
        .bind(defaults.multiplier())
        .bind(skill.created_at)
        .bind(skill.created_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        let id = skill_id_from_i64(result.last_insert_rowid())?;
        Ok(skill.assign_id(id))
    }

    async fn get_skill(&self, id: SkillId) -> Result<Option<Skill>, StorageError> {
        let mut db = self.pool.acquire().await.map_err(conn)?;
        fetch_skill(&mut *db, id).await
    }

    async fn skills_for_user(&self, owner: UserId) -> Result<Vec<Skill>, StorageError> {
        let sql = format!("SELECT {SKILL_COLUMNS} FROM skills WHERE owner_id = ?1 ORDER BY id ASC");
        let rows = sqlx::query(&sql)
            .bind(owner.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;
        rows.iter().map(map_skill_row).collect()
    }

    async fn update_skill(
        &self,
        id: SkillId,
        update: &SkillUpdate,
    ) -> Result<Skill, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let mut skill = fetch_skill(&mut *tx, id)
            .await?
            .ok_or(StorageError::NotFound)?;
        skill.apply(update);
        store_skill_state(&mut *tx, &skill).await?;

        tx.commit().await.map_err(conn)?;
        Ok(skill)
    }

    async fn delete_skill(&self, id: SkillId) -> Result<bool, StorageError> {
        // quick_tests rows go with it through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM skills WHERE id = ?1")
            .bind(id_to_i64("skill_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(result.rows_affected() > 0)
    }
}
