//! Shared error types for the services crate.

use thiserror::Error;

use retention_core::model::{SkillError, SkillId, TestId};
use retention_core::quiz::ScoringError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `SkillService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SkillServiceError {
    #[error("skill {0} not found")]
    SkillNotFound(SkillId),
    #[error("skill belongs to another user")]
    Unauthorized,
    #[error(transparent)]
    Validation(#[from] SkillError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `QuickTestService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuickTestServiceError {
    #[error("skill {0} not found")]
    SkillNotFound(SkillId),
    #[error("test {0} not found")]
    TestNotFound(TestId),
    #[error("test or skill belongs to another user")]
    Unauthorized,
    #[error("test {0} has already been completed")]
    AlreadyCompleted(TestId),
    #[error(transparent)]
    Validation(#[from] ScoringError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `KnowledgeService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KnowledgeServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
