use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the versioned schema migrations.
///
/// Version 1 creates skills, quick tests, and their lookup indexes.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS skills (
                    id INTEGER PRIMARY KEY,
                    owner_id TEXT NOT NULL,
                    name TEXT NOT NULL,
                    category TEXT NOT NULL,
                    initial_proficiency INTEGER NOT NULL
                        CHECK (initial_proficiency BETWEEN 0 AND 100),
                    last_practiced_at TEXT NOT NULL,
                    half_life REAL NOT NULL CHECK (half_life BETWEEN 3 AND 30),
                    adaptive_decay_multiplier REAL NOT NULL
                        CHECK (adaptive_decay_multiplier BETWEEN 0.5 AND 2.0),
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS quick_tests (
                    id INTEGER PRIMARY KEY,
                    skill_id INTEGER NOT NULL,
                    owner_id TEXT NOT NULL,
                    skill_name TEXT NOT NULL,
                    questions TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    answers TEXT,
                    score INTEGER CHECK (score >= 0),
                    accuracy INTEGER CHECK (accuracy BETWEEN 0 AND 100),
                    total_time REAL CHECK (total_time >= 0),
                    average_time_per_question REAL,
                    confidence TEXT CHECK (confidence IN ('low', 'medium', 'high')),
                    completed_at TEXT,
                    FOREIGN KEY (skill_id) REFERENCES skills(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_skills_owner
                    ON skills(owner_id, id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_quick_tests_skill
                    ON quick_tests(skill_id, id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_quick_tests_owner
                    ON quick_tests(owner_id, id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(version = 1, "applied schema migration");
    }

    Ok(())
}
