use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::config::ServiceConfig;
use crate::error::AppServicesError;
use crate::knowledge_service::KnowledgeService;
use crate::quick_test_service::QuickTestService;
use crate::skill_locks::SkillLocks;
use crate::skill_service::SkillService;

/// Assembles the engine's services over one storage backend.
///
/// All services share a single `SkillLocks` registry so skill writes from
/// any of them serialize per skill.
#[derive(Clone)]
pub struct AppServices {
    skills: Arc<SkillService>,
    quick_tests: Arc<QuickTestService>,
    knowledge: Arc<KnowledgeService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the connection or migrations fail.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        tracing::info!(db_url, "sqlite storage ready");
        Ok(Self::from_storage(&storage, clock))
    }

    /// Build services from a loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the configured database cannot be opened.
    pub async fn from_config(config: &ServiceConfig, clock: Clock) -> Result<Self, AppServicesError> {
        Self::new_sqlite(&config.db_url, clock).await
    }

    /// Build services over a fresh in-memory store.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let locks = SkillLocks::new();
        let skills = Arc::new(SkillService::new(
            clock,
            Arc::clone(&storage.skills),
            locks.clone(),
        ));
        let quick_tests = Arc::new(QuickTestService::new(
            clock,
            Arc::clone(&storage.skills),
            Arc::clone(&storage.tests),
            Arc::clone(&storage.submissions),
            locks,
        ));
        let knowledge = Arc::new(KnowledgeService::new(
            clock,
            Arc::clone(&storage.skills),
            Arc::clone(&storage.tests),
        ));

        Self {
            skills,
            quick_tests,
            knowledge,
        }
    }

    #[must_use]
    pub fn skills(&self) -> Arc<SkillService> {
        Arc::clone(&self.skills)
    }

    #[must_use]
    pub fn quick_tests(&self) -> Arc<QuickTestService> {
        Arc::clone(&self.quick_tests)
    }

    #[must_use]
    pub fn knowledge(&self) -> Arc<KnowledgeService> {
        Arc::clone(&self.knowledge)
    }
}
