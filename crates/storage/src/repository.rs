use async_trait::async_trait;
use retention_core::model::{
    NewQuickTest, QuickTest, Skill, SkillId, SkillUpdate, TestId, TestResult, UserId,
    ValidatedSkill,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for skills.
#[async_trait]
pub trait SkillRepository: Send + Sync {
    /// Persist a validated skill and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the skill cannot be stored.
    async fn insert_new_skill(&self, skill: ValidatedSkill) -> Result<Skill, StorageError>;

    /// Fetch a skill by ID. Returns `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_skill(&self, id: SkillId) -> Result<Option<Skill>, StorageError>;

    /// All skills owned by `owner`, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn skills_for_user(&self, owner: UserId) -> Result<Vec<Skill>, StorageError>;

    /// Apply an update command to a stored skill.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the skill is missing.
    async fn update_skill(&self, id: SkillId, update: &SkillUpdate)
    -> Result<Skill, StorageError>;

    /// Delete a skill and every test taken for it. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn delete_skill(&self, id: SkillId) -> Result<bool, StorageError>;
}

/// Repository contract for quick tests.
#[async_trait]
pub trait QuickTestRepository: Send + Sync {
    /// Persist a freshly generated (unscored) test.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the test cannot be stored.
    async fn insert_new_test(&self, test: NewQuickTest) -> Result<QuickTest, StorageError>;

    /// Fetch a test by ID. Returns `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_test(&self, id: TestId) -> Result<Option<QuickTest>, StorageError>;

    /// Tests taken for a skill, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn tests_for_skill(&self, skill_id: SkillId) -> Result<Vec<QuickTest>, StorageError>;

    /// Tests taken by a user across all skills, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn tests_for_user(&self, owner: UserId) -> Result<Vec<QuickTest>, StorageError>;
}

/// Atomic write of a scored test together with its skill update.
#[async_trait]
pub trait SubmissionPersistence: Send + Sync {
    /// Attach `result` to the test and apply `update` to the skill, all or nothing.
    ///
    /// # Errors
    ///
    /// - `StorageError::NotFound` if the test or skill is missing
    /// - `StorageError::Conflict` if the test was already completed
    async fn apply_submission(
        &self,
        test_id: TestId,
        result: &TestResult,
        skill_id: SkillId,
        update: &SkillUpdate,
    ) -> Result<(QuickTest, Skill), StorageError>;
}

#[derive(Default)]
struct Tables {
    skills: BTreeMap<SkillId, Skill>,
    tests: BTreeMap<TestId, QuickTest>,
    last_skill_id: u64,
    last_test_id: u64,
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Ids are assigned sequentially, so `BTreeMap` order is insertion order.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StorageError> {
        self.tables
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl SkillRepository for InMemoryRepository {
    async fn insert_new_skill(&self, skill: ValidatedSkill) -> Result<Skill, StorageError> {
        let mut guard = self.lock()?;
        guard.last_skill_id += 1;
        let skill = skill.assign_id(SkillId::new(guard.last_skill_id));
        guard.skills.insert(skill.id(), skill.clone());
        Ok(skill)
    }

    async fn get_skill(&self, id: SkillId) -> Result<Option<Skill>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.skills.get(&id).cloned())
    }

    async fn skills_for_user(&self, owner: UserId) -> Result<Vec<Skill>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .skills
            .values()
            .filter(|s| s.is_owned_by(owner))
            .cloned()
            .collect())
    }

    async fn update_skill(
        &self,
        id: SkillId,
        update: &SkillUpdate,
    ) -> Result<Skill, StorageError> {
        let mut guard = self.lock()?;
        let skill = guard.skills.get_mut(&id).ok_or(StorageError::NotFound)?;
        skill.apply(update);
        Ok(skill.clone())
    }

    async fn delete_skill(&self, id: SkillId) -> Result<bool, StorageError> {
        let mut guard = self.lock()?;
        let existed = guard.skills.remove(&id).is_some();
        guard.tests.retain(|_, t| t.skill_id() != id);
        Ok(existed)
    }
}

#[async_trait]
impl QuickTestRepository for InMemoryRepository {
    async fn insert_new_test(&self, test: NewQuickTest) -> Result<QuickTest, StorageError> {
        let mut guard = self.lock()?;
        guard.last_test_id += 1;
        let test = test.assign_id(TestId::new(guard.last_test_id));
        guard.tests.insert(test.id(), test.clone());
        Ok(test)
    }

    async fn get_test(&self, id: TestId) -> Result<Option<QuickTest>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.tests.get(&id).cloned())
    }

    async fn tests_for_skill(&self, skill_id: SkillId) -> Result<Vec<QuickTest>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .tests
            .values()
            .filter(|t| t.skill_id() == skill_id)
            .cloned()
            .collect())
    }

    async fn tests_for_user(&self, owner: UserId) -> Result<Vec<QuickTest>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .tests
            .values()
            .filter(|t| t.is_owned_by(owner))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SubmissionPersistence for InMemoryRepository {
    async fn apply_submission(
        &self,
        test_id: TestId,
        result: &TestResult,
        skill_id: SkillId,
        update: &SkillUpdate,
    ) -> Result<(QuickTest, Skill), StorageError> {
        let mut guard = self.lock()?;

        // Validate both rows before touching either one.
        let mut test = guard.tests.get(&test_id).cloned().ok_or(StorageError::NotFound)?;
        let mut skill = guard.skills.get(&skill_id).cloned().ok_or(StorageError::NotFound)?;
        test.complete(result.clone())
            .map_err(|_| StorageError::Conflict)?;
        skill.apply(update);

        guard.tests.insert(test_id, test.clone());
        guard.skills.insert(skill_id, skill.clone());
        Ok((test, skill))
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub skills: Arc<dyn SkillRepository>,
    pub tests: Arc<dyn QuickTestRepository>,
    pub submissions: Arc<dyn SubmissionPersistence>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let skills: Arc<dyn SkillRepository> = Arc::new(repo.clone());
        let tests: Arc<dyn QuickTestRepository> = Arc::new(repo.clone());
        let submissions: Arc<dyn SubmissionPersistence> = Arc::new(repo);
        Self {
            skills,
            tests,
            submissions,
        }
    }
}
