use std::sync::Arc;

use serde::Serialize;

use retention_core::decay::{self, QuizSignal};
use retention_core::model::{
    Answers, NewQuickTest, QuickTest, QuickTestView, Skill, SkillId, SkillUpdate, TestId, UserId,
};
use retention_core::overview::completed_newest_first;
use retention_core::quiz::{TestResults, generate_questions, score_submission};
use storage::repository::{
    QuickTestRepository, SkillRepository, StorageError, SubmissionPersistence,
};

use crate::Clock;
use crate::error::QuickTestServiceError;
use crate::skill_locks::SkillLocks;
use crate::skill_service::SkillWithStrength;

/// Outcome of a scored submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub test: QuickTest,
    pub skill: SkillWithStrength,
    pub results: TestResults,
}

/// Generates quizzes, scores submissions, and retunes skill decay.
#[derive(Clone)]
pub struct QuickTestService {
    clock: Clock,
    skills: Arc<dyn SkillRepository>,
    tests: Arc<dyn QuickTestRepository>,
    submissions: Arc<dyn SubmissionPersistence>,
    locks: SkillLocks,
}

impl QuickTestService {
    #[must_use]
    pub fn new(
        clock: Clock,
        skills: Arc<dyn SkillRepository>,
        tests: Arc<dyn QuickTestRepository>,
        submissions: Arc<dyn SubmissionPersistence>,
        locks: SkillLocks,
    ) -> Self {
        Self {
            clock,
            skills,
            tests,
            submissions,
            locks,
        }
    }

    /// Generate and store a five-question quiz for one of `user`'s skills.
    ///
    /// The returned view omits the correct option of every question.
    ///
    /// # Errors
    ///
    /// Returns `SkillNotFound` or `Unauthorized` when the skill is missing or foreign.
    /// Returns `QuickTestServiceError::Storage` if persistence fails.
    pub async fn generate_test(
        &self,
        skill_id: SkillId,
        user: UserId,
    ) -> Result<QuickTestView, QuickTestServiceError> {
        let skill = self.owned_skill(skill_id, user).await?;

        let draft = NewQuickTest {
            skill_id,
            owner_id: user,
            skill_name: skill.name().to_owned(),
            questions: generate_questions(skill.name()),
            created_at: self.clock.now(),
        };
        let test = self.tests.insert_new_test(draft).await.map_err(|e| match e {
            StorageError::NotFound => QuickTestServiceError::SkillNotFound(skill_id),
            other => other.into(),
        })?;

        tracing::info!(test_id = %test.id(), skill_id = %skill_id, "quick test generated");
        Ok(test.asker_view())
    }

    /// Score a submission, persist it, and adjust the skill's decay parameters.
    ///
    /// The test result and the skill update land atomically; a rejected
    /// submission leaves both records untouched.
    ///
    /// # Errors
    ///
    /// - `TestNotFound` if the test does not exist
    /// - `Unauthorized` if `user` does not own the test
    /// - `AlreadyCompleted` if the test was already submitted
    /// - `Validation` for a bad `total_time` or answers to unknown questions
    /// - `SkillNotFound` if the skill disappeared after generation
    pub async fn submit_test(
        &self,
        test_id: TestId,
        user: UserId,
        answers: Answers,
        total_time: f64,
    ) -> Result<Submission, QuickTestServiceError> {
        let test = self
            .tests
            .get_test(test_id)
            .await?
            .ok_or(QuickTestServiceError::TestNotFound(test_id))?;
        if !test.is_owned_by(user) {
            return Err(QuickTestServiceError::Unauthorized);
        }
        if test.is_completed() {
            return Err(QuickTestServiceError::AlreadyCompleted(test_id));
        }

        let skill_id = test.skill_id();
        let _guard = self.locks.acquire(skill_id).await;

        // Read the clock only once the lock is held, so a queued submission
        // cannot move last_practiced_at backwards.
        let now = self.clock.now();
        let scored = score_submission(test.questions(), answers, total_time, now)?;

        let skill = self
            .skills
            .get_skill(skill_id)
            .await?
            .ok_or(QuickTestServiceError::SkillNotFound(skill_id))?;
        let decay = decay::adjust(
            skill.decay(),
            QuizSignal {
                accuracy: scored.result.accuracy,
                response_time: scored.result.average_time_per_question,
                confidence: scored.result.confidence,
            },
        );
        let update = SkillUpdate::quiz_completed(decay, now);

        let (test, skill) = self
            .submissions
            .apply_submission(test_id, &scored.result, skill_id, &update)
            .await
            .map_err(|e| match e {
                StorageError::Conflict => QuickTestServiceError::AlreadyCompleted(test_id),
                StorageError::NotFound => QuickTestServiceError::TestNotFound(test_id),
                other => other.into(),
            })?;

        tracing::info!(
            test_id = %test_id,
            skill_id = %skill_id,
            accuracy = scored.summary.accuracy,
            confidence = scored.summary.confidence.as_str(),
            half_life = skill.half_life(),
            multiplier = skill.adaptive_decay_multiplier(),
            "quick test submitted"
        );

        Ok(Submission {
            test,
            skill: SkillWithStrength::at(skill, now),
            results: scored.summary,
        })
    }

    /// Completed tests for one of `user`'s skills, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `SkillNotFound` or `Unauthorized` when the skill is missing or foreign.
    pub async fn get_test_history(
        &self,
        skill_id: SkillId,
        user: UserId,
    ) -> Result<Vec<QuickTest>, QuickTestServiceError> {
        self.owned_skill(skill_id, user).await?;
        let tests = self.tests.tests_for_skill(skill_id).await?;
        Ok(completed_newest_first(tests))
    }

    async fn owned_skill(
        &self,
        skill_id: SkillId,
        user: UserId,
    ) -> Result<Skill, QuickTestServiceError> {
        let skill = self
            .skills
            .get_skill(skill_id)
            .await?
            .ok_or(QuickTestServiceError::SkillNotFound(skill_id))?;
        if !skill.is_owned_by(user) {
            return Err(QuickTestServiceError::Unauthorized);
        }
        Ok(skill)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;
    use retention_core::model::{Confidence, Performance, QuestionId, SkillDraft};
    use retention_core::quiz::ScoringError;
    use retention_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    struct Fixture {
        repo: InMemoryRepository,
        owner: UserId,
        skill_id: SkillId,
    }

    async fn fixture() -> Fixture {
        let repo = InMemoryRepository::new();
        let owner = UserId::random();
        let draft = SkillDraft::named("Rust")
            .with_proficiency(80)
            .validate(owner, fixed_now())
            .unwrap();
        let skill_id = repo.insert_new_skill(draft).await.unwrap().id();
        Fixture {
            repo,
            owner,
            skill_id,
        }
    }

    fn service(repo: &InMemoryRepository, clock: Clock) -> QuickTestService {
        QuickTestService::new(
            clock,
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            SkillLocks::new(),
        )
    }

    fn correct_answers(count: usize) -> Answers {
        // Template answers: q1 -> 1, every other question -> 0.
        [(1, 1), (2, 0), (3, 0), (4, 0), (5, 0)]
            .into_iter()
            .take(count)
            .map(|(q, choice)| (QuestionId::new(q), choice))
            .collect()
    }

    #[tokio::test]
    async fn generated_view_hides_answers_and_is_stored_open() {
        let f = fixture().await;
        let service = service(&f.repo, Clock::fixed(fixed_now()));

        let view = service.generate_test(f.skill_id, f.owner).await.unwrap();
        assert_eq!(view.questions.len(), 5);
        assert_eq!(view.skill_name, "Rust");
        assert!(view.questions[1].text.contains("Rust"));

        let json = serde_json::to_value(&view).unwrap();
        assert!(json["questions"][0].get("correctIndex").is_none());

        let stored = f.repo.get_test(view.id).await.unwrap().unwrap();
        assert!(!stored.is_completed());
        assert_eq!(stored.questions()[0].correct_index, 1);
    }

    #[tokio::test]
    async fn perfect_fast_submission_slows_decay() {
        let f = fixture().await;
        let at = fixed_now() + Duration::days(3);
        let service = service(&f.repo, Clock::fixed(at));
        let view = service.generate_test(f.skill_id, f.owner).await.unwrap();

        let submission = service
            .submit_test(view.id, f.owner, correct_answers(5), 25.0)
            .await
            .unwrap();

        assert_eq!(submission.results.accuracy, 100);
        assert_eq!(submission.results.average_time_per_question, 5.0);
        assert_eq!(submission.results.confidence, Confidence::High);
        assert_eq!(submission.results.performance, Performance::Excellent);

        let skill = &submission.skill.skill;
        assert!((skill.half_life() - 9.1).abs() < 1e-9);
        assert!((skill.adaptive_decay_multiplier() - 0.76).abs() < 1e-9);
        assert_eq!(skill.last_practiced_at(), at);
        assert_eq!(submission.skill.strength.current_strength, 80);
        assert_eq!(submission.test.completed_at(), Some(at));
    }

    #[tokio::test]
    async fn poor_slow_submission_speeds_decay() {
        let f = fixture().await;
        let service = service(&f.repo, Clock::fixed(fixed_now()));
        let view = service.generate_test(f.skill_id, f.owner).await.unwrap();

        let submission = service
            .submit_test(view.id, f.owner, correct_answers(1), 125.0)
            .await
            .unwrap();

        assert_eq!(submission.results.accuracy, 20);
        assert_eq!(submission.results.confidence, Confidence::Low);
        assert_eq!(submission.results.performance, Performance::NeedsPractice);
        assert!((submission.skill.skill.half_life() - 5.6).abs() < 1e-9);
        assert!((submission.skill.skill.adaptive_decay_multiplier() - 1.32).abs() < 1e-9);
    }

    #[tokio::test]
    async fn second_submission_is_rejected_and_first_result_kept() {
        let f = fixture().await;
        let service = service(&f.repo, Clock::fixed(fixed_now()));
        let view = service.generate_test(f.skill_id, f.owner).await.unwrap();

        let first = service
            .submit_test(view.id, f.owner, correct_answers(5), 25.0)
            .await
            .unwrap();
        let err = service
            .submit_test(view.id, f.owner, Answers::new(), 200.0)
            .await
            .unwrap_err();
        assert!(matches!(err, QuickTestServiceError::AlreadyCompleted(id) if id == view.id));

        let stored = f.repo.get_test(view.id).await.unwrap().unwrap();
        assert_eq!(stored.result(), first.test.result());
        let skill = f.repo.get_skill(f.skill_id).await.unwrap().unwrap();
        assert_eq!(skill, first.skill.skill);
    }

    #[tokio::test]
    async fn ownership_and_missing_records() {
        let f = fixture().await;
        let service = service(&f.repo, Clock::fixed(fixed_now()));
        let stranger = UserId::random();

        let err = service.generate_test(f.skill_id, stranger).await.unwrap_err();
        assert!(matches!(err, QuickTestServiceError::Unauthorized));
        let err = service
            .generate_test(SkillId::new(77), f.owner)
            .await
            .unwrap_err();
        assert!(matches!(err, QuickTestServiceError::SkillNotFound(_)));

        let view = service.generate_test(f.skill_id, f.owner).await.unwrap();
        let err = service
            .submit_test(view.id, stranger, correct_answers(5), 25.0)
            .await
            .unwrap_err();
        assert!(matches!(err, QuickTestServiceError::Unauthorized));
        let err = service
            .submit_test(TestId::new(900), f.owner, correct_answers(5), 25.0)
            .await
            .unwrap_err();
        assert!(matches!(err, QuickTestServiceError::TestNotFound(_)));

        let err = service.get_test_history(f.skill_id, stranger).await.unwrap_err();
        assert!(matches!(err, QuickTestServiceError::Unauthorized));
    }

    #[tokio::test]
    async fn invalid_submissions_leave_the_test_open() {
        let f = fixture().await;
        let service = service(&f.repo, Clock::fixed(fixed_now()));
        let view = service.generate_test(f.skill_id, f.owner).await.unwrap();

        let err = service
            .submit_test(view.id, f.owner, correct_answers(5), -1.0)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            QuickTestServiceError::Validation(ScoringError::InvalidTotalTime(_))
        ));

        let mut answers = correct_answers(5);
        answers.insert(QuestionId::new(9), 0);
        let err = service
            .submit_test(view.id, f.owner, answers, 30.0)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            QuickTestServiceError::Validation(ScoringError::UnknownQuestion(_))
        ));

        let stored = f.repo.get_test(view.id).await.unwrap().unwrap();
        assert!(!stored.is_completed());
        let skill = f.repo.get_skill(f.skill_id).await.unwrap().unwrap();
        assert_eq!(skill.adaptive_decay_multiplier(), 1.0);
    }

    #[tokio::test]
    async fn queued_submission_is_stamped_after_the_lock_is_released() {
        let f = fixture().await;
        let locks = SkillLocks::new();
        let service = QuickTestService::new(
            Clock::Default,
            Arc::new(f.repo.clone()),
            Arc::new(f.repo.clone()),
            Arc::new(f.repo.clone()),
            locks.clone(),
        );
        let view = service.generate_test(f.skill_id, f.owner).await.unwrap();

        let guard = locks.acquire(f.skill_id).await;
        let queued = tokio::spawn({
            let service = service.clone();
            let owner = f.owner;
            async move {
                service
                    .submit_test(view.id, owner, correct_answers(5), 25.0)
                    .await
            }
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!queued.is_finished());

        let released_at = chrono::Utc::now();
        drop(guard);
        let submission = queued.await.unwrap().unwrap();

        let practiced = submission.skill.skill.last_practiced_at();
        assert!(practiced >= released_at);
        assert_eq!(submission.test.completed_at(), Some(practiced));
    }

    #[tokio::test]
    async fn history_lists_completed_tests_newest_first() {
        let f = fixture().await;
        let mut clock = Clock::fixed(fixed_now());

        let first = service(&f.repo, clock)
            .generate_test(f.skill_id, f.owner)
            .await
            .unwrap();
        let open = service(&f.repo, clock)
            .generate_test(f.skill_id, f.owner)
            .await
            .unwrap();
        let second = service(&f.repo, clock)
            .generate_test(f.skill_id, f.owner)
            .await
            .unwrap();

        service(&f.repo, clock)
            .submit_test(first.id, f.owner, correct_answers(5), 25.0)
            .await
            .unwrap();
        clock.advance(Duration::hours(1));
        service(&f.repo, clock)
            .submit_test(second.id, f.owner, correct_answers(3), 60.0)
            .await
            .unwrap();

        let history = service(&f.repo, clock)
            .get_test_history(f.skill_id, f.owner)
            .await
            .unwrap();
        let ids: Vec<TestId> = history.iter().map(QuickTest::id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert!(!ids.contains(&open.id));
    }
}
