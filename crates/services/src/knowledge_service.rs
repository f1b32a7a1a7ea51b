use std::sync::Arc;

use retention_core::model::UserId;
use retention_core::overview::{KnowledgeOverview, build_overview};
use storage::repository::{QuickTestRepository, SkillRepository};

use crate::Clock;
use crate::error::KnowledgeServiceError;

/// Read-only dashboard over a user's skills and quiz history.
#[derive(Clone)]
pub struct KnowledgeService {
    clock: Clock,
    skills: Arc<dyn SkillRepository>,
    tests: Arc<dyn QuickTestRepository>,
}

impl KnowledgeService {
    #[must_use]
    pub fn new(
        clock: Clock,
        skills: Arc<dyn SkillRepository>,
        tests: Arc<dyn QuickTestRepository>,
    ) -> Self {
        Self {
            clock,
            skills,
            tests,
        }
    }

    /// Retention diagnosis for every skill `user` owns, plus aggregate stats.
    ///
    /// # Errors
    ///
    /// Returns `KnowledgeServiceError::Storage` if repository access fails.
    pub async fn get_knowledge_overview(
        &self,
        user: UserId,
    ) -> Result<KnowledgeOverview, KnowledgeServiceError> {
        let skills = self.skills.skills_for_user(user).await?;
        let tests = self.tests.tests_for_user(user).await?;
        let overview = build_overview(skills, tests, self.clock.now());

        tracing::debug!(
            owner = %user,
            skills = overview.stats.total_skills,
            tests = overview.stats.total_tests,
            "knowledge overview built"
        );
        Ok(overview)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;
    use retention_core::model::{
        Answers, DecayParams, NewQuickTest, SkillDraft, SkillUpdate,
    };
    use retention_core::overview::RetentionStatus;
    use retention_core::quiz::{generate_questions, score_submission};
    use retention_core::time::fixed_now;
    use storage::repository::{InMemoryRepository, SubmissionPersistence};

    #[tokio::test]
    async fn overview_only_covers_the_callers_records() {
        let repo = InMemoryRepository::new();
        let owner = UserId::random();
        let now = fixed_now() + Duration::days(20);

        let mine = repo
            .insert_new_skill(
                SkillDraft::named("Japanese")
                    .with_proficiency(90)
                    .validate(owner, fixed_now())
                    .unwrap(),
            )
            .await
            .unwrap();
        repo.update_skill(
            mine.id(),
            &SkillUpdate::quiz_completed(DecayParams::new(7.0, 0.7), fixed_now()),
        )
        .await
        .unwrap();
        repo.insert_new_skill(
            SkillDraft::named("Not mine")
                .validate(UserId::random(), fixed_now())
                .unwrap(),
        )
        .await
        .unwrap();

        let test = repo
            .insert_new_test(NewQuickTest {
                skill_id: mine.id(),
                owner_id: owner,
                skill_name: mine.name().to_owned(),
                questions: generate_questions(mine.name()),
                created_at: fixed_now(),
            })
            .await
            .unwrap();
        let scored =
            score_submission(test.questions(), Answers::new(), 40.0, fixed_now()).unwrap();
        repo.apply_submission(
            test.id(),
            &scored.result,
            mine.id(),
            &SkillUpdate::practiced(fixed_now()),
        )
        .await
        .unwrap();

        let service = KnowledgeService::new(
            Clock::fixed(now),
            Arc::new(repo.clone()),
            Arc::new(repo),
        );
        let overview = service.get_knowledge_overview(owner).await.unwrap();

        assert_eq!(overview.stats.total_skills, 1);
        assert_eq!(overview.stats.total_tests, 1);
        assert_eq!(overview.recent_activity.len(), 1);

        let insight = &overview.skills[0];
        assert_eq!(insight.diagnosis.status, RetentionStatus::Fading);
        assert_eq!(insight.total_tests, 1);
        assert_eq!(insight.avg_test_accuracy, 0.0);

        let json = serde_json::to_value(insight).unwrap();
        assert_eq!(json["retentionStatus"], "Fading");
        assert_eq!(json["statusColor"], "#f59e0b");
    }
}
