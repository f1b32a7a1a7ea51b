use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use retention_core::model::{Skill, SkillDraft, SkillId, SkillUpdate, UserId};
use retention_core::strength::SkillStrength;
use storage::repository::{SkillRepository, StorageError};

use crate::Clock;
use crate::error::SkillServiceError;
use crate::skill_locks::SkillLocks;

/// A skill decorated with its strength at read time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillWithStrength {
    #[serde(flatten)]
    pub skill: Skill,
    #[serde(flatten)]
    pub strength: SkillStrength,
}

impl SkillWithStrength {
    #[must_use]
    pub fn at(skill: Skill, now: DateTime<Utc>) -> Self {
        let strength = SkillStrength::of(&skill, now);
        Self { skill, strength }
    }
}

/// Skill lifecycle: create, read, mark practiced, delete.
#[derive(Clone)]
pub struct SkillService {
    clock: Clock,
    skills: Arc<dyn SkillRepository>,
    locks: SkillLocks,
}

impl SkillService {
    #[must_use]
    pub fn new(clock: Clock, skills: Arc<dyn SkillRepository>, locks: SkillLocks) -> Self {
        Self {
            clock,
            skills,
            locks,
        }
    }

    /// Validate and persist a new skill for `owner`.
    ///
    /// # Errors
    ///
    /// Returns `SkillServiceError::Validation` for a blank name or out-of-range proficiency.
    /// Returns `SkillServiceError::Storage` if persistence fails.
    pub async fn create_skill(
        &self,
        owner: UserId,
        draft: SkillDraft,
    ) -> Result<SkillWithStrength, SkillServiceError> {
        let now = self.clock.now();
        let validated = draft.validate(owner, now)?;
        let skill = self.skills.insert_new_skill(validated).await?;
        tracing::info!(skill_id = %skill.id(), owner = %owner, "skill created");
        Ok(SkillWithStrength::at(skill, now))
    }

    /// All of `owner`'s skills with their current strength.
    ///
    /// # Errors
    ///
    /// Returns `SkillServiceError::Storage` if repository access fails.
    pub async fn list_skills(
        &self,
        owner: UserId,
    ) -> Result<Vec<SkillWithStrength>, SkillServiceError> {
        let now = self.clock.now();
        let skills = self.skills.skills_for_user(owner).await?;
        Ok(skills
            .into_iter()
            .map(|skill| SkillWithStrength::at(skill, now))
            .collect())
    }

    /// Fetch one skill owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `SkillNotFound` or `Unauthorized` when the skill is missing or foreign.
    pub async fn get_skill(
        &self,
        id: SkillId,
        owner: UserId,
    ) -> Result<SkillWithStrength, SkillServiceError> {
        let skill = self.owned_skill(id, owner).await?;
        Ok(SkillWithStrength::at(skill, self.clock.now()))
    }

    /// Record that `owner` practiced the skill now.
    ///
    /// # Errors
    ///
    /// Returns `SkillNotFound` or `Unauthorized` when the skill is missing or foreign.
    /// Returns `SkillServiceError::Storage` if persistence fails.
    pub async fn mark_practiced(
        &self,
        id: SkillId,
        owner: UserId,
    ) -> Result<SkillWithStrength, SkillServiceError> {
        let _guard = self.locks.acquire(id).await;
        self.owned_skill(id, owner).await?;

        let now = self.clock.now();
        let skill = self
            .skills
            .update_skill(id, &SkillUpdate::practiced(now))
            .await
            .map_err(|e| match e {
                StorageError::NotFound => SkillServiceError::SkillNotFound(id),
                other => other.into(),
            })?;
        tracing::debug!(skill_id = %id, "skill marked practiced");
        Ok(SkillWithStrength::at(skill, now))
    }

    /// Delete a skill and its test history.
    ///
    /// # Errors
    ///
    /// Returns `SkillNotFound` or `Unauthorized` when the skill is missing or foreign.
    /// Returns `SkillServiceError::Storage` if repository access fails.
    pub async fn delete_skill(&self, id: SkillId, owner: UserId) -> Result<(), SkillServiceError> {
        let _guard = self.locks.acquire(id).await;
        self.owned_skill(id, owner).await?;

        if !self.skills.delete_skill(id).await? {
            return Err(SkillServiceError::SkillNotFound(id));
        }
        tracing::info!(skill_id = %id, "skill deleted");
        Ok(())
    }

    async fn owned_skill(&self, id: SkillId, owner: UserId) -> Result<Skill, SkillServiceError> {
        let skill = self
            .skills
            .get_skill(id)
            .await?
            .ok_or(SkillServiceError::SkillNotFound(id))?;
        if !skill.is_owned_by(owner) {
            return Err(SkillServiceError::Unauthorized);
        }
        Ok(skill)
    }
}
