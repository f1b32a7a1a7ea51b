//! Knowledge overview: per-skill retention diagnosis and aggregate stats.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{QuickTest, Skill, SkillId};
use crate::strength::SkillStrength;

/// Completed tests kept per skill in the overview.
pub const RECENT_TESTS_PER_SKILL: usize = 5;
/// Completed tests kept in the cross-skill activity feed.
pub const RECENT_ACTIVITY_LIMIT: usize = 10;

pub const NEEDS_ATTENTION_BELOW: u8 = 60;
pub const STRONG_FROM: u8 = 70;

const GREEN: &str = "#10b981";
const RED: &str = "#ef4444";
const AMBER: &str = "#f59e0b";

//
// ─── RETENTION STATUS ──────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RetentionStatus {
    Strong,
    Stable,
    Fading,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetentionDiagnosis {
    #[serde(rename = "retentionStatus")]
    pub status: RetentionStatus,
    #[serde(rename = "decayExplanation")]
    pub explanation: &'static str,
    #[serde(rename = "statusColor")]
    pub color: &'static str,
}

impl RetentionDiagnosis {
    const fn new(status: RetentionStatus, explanation: &'static str, color: &'static str) -> Self {
        Self {
            status,
            explanation,
            color,
        }
    }
}

/// Classify retention from the decay multiplier, then let inactivity override it.
///
/// More than two half-lives idle forces `Fading`. More than one half-life idle
/// downgrades `Strong` to `Stable` and leaves other statuses alone.
#[must_use]
pub fn diagnose(multiplier: f64, days_since_practice: f64, half_life: f64) -> RetentionDiagnosis {
    let base = if multiplier < 0.8 {
        RetentionDiagnosis::new(
            RetentionStatus::Strong,
            "Broad retention. Decay slowed by excellent test performance.",
            GREEN,
        )
    } else if multiplier > 1.2 {
        RetentionDiagnosis::new(
            RetentionStatus::Critical,
            "Retention struggling. Decay accelerated by recent low scores.",
            RED,
        )
    } else {
        RetentionDiagnosis::new(
            RetentionStatus::Stable,
            "Regular practice is maintaining this skill.",
            GREEN,
        )
    };

    if days_since_practice > half_life * 2.0 {
        RetentionDiagnosis::new(
            RetentionStatus::Fading,
            "Fading due to inactivity. Has not been practiced recently.",
            AMBER,
        )
    } else if days_since_practice > half_life && base.status == RetentionStatus::Strong {
        RetentionDiagnosis::new(
            RetentionStatus::Stable,
            "Good retention, but starting to fade due to recent inactivity.",
            GREEN,
        )
    } else {
        base
    }
}

//
// ─── OVERVIEW ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillInsight {
    pub skill: Skill,
    #[serde(flatten)]
    pub strength: SkillStrength,
    pub recent_tests: Vec<QuickTest>,
    pub avg_test_accuracy: f64,
    /// Size of `recent_tests`, so at most five.
    pub total_tests: usize,
    #[serde(flatten)]
    pub diagnosis: RetentionDiagnosis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewStats {
    pub total_skills: usize,
    pub total_tests: usize,
    pub average_strength: u8,
    pub skills_needing_attention: usize,
    pub skills_strong: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeOverview {
    pub skills: Vec<SkillInsight>,
    pub stats: OverviewStats,
    pub recent_activity: Vec<QuickTest>,
}

/// Completed tests, most recent first; equal timestamps keep input order.
#[must_use]
pub fn completed_newest_first(tests: Vec<QuickTest>) -> Vec<QuickTest> {
    let mut completed: Vec<QuickTest> = tests.into_iter().filter(QuickTest::is_completed).collect();
    completed.sort_by(|a, b| b.completed_at().cmp(&a.completed_at()));
    completed
}

/// Build the overview for one user's `skills` and all of that user's `tests`.
///
/// `tests` must be in insertion order; it breaks completion-time ties.
#[must_use]
pub fn build_overview(
    skills: Vec<Skill>,
    tests: Vec<QuickTest>,
    now: DateTime<Utc>,
) -> KnowledgeOverview {
    let completed = completed_newest_first(tests);

    let mut by_skill: HashMap<SkillId, Vec<&QuickTest>> = HashMap::new();
    for test in &completed {
        by_skill.entry(test.skill_id()).or_default().push(test);
    }

    let insights: Vec<SkillInsight> = skills
        .into_iter()
        .map(|skill| {
            let strength = SkillStrength::of(&skill, now);
            let all = by_skill.get(&skill.id()).map_or(&[][..], Vec::as_slice);
            let recent_tests: Vec<QuickTest> = all
                .iter()
                .take(RECENT_TESTS_PER_SKILL)
                .map(|t| (*t).clone())
                .collect();
            let avg_test_accuracy = mean_accuracy(&recent_tests);
            let total_tests = recent_tests.len();
            let diagnosis = diagnose(
                skill.adaptive_decay_multiplier(),
                strength.days_since_last_practice,
                skill.half_life(),
            );

            SkillInsight {
                skill,
                strength,
                recent_tests,
                avg_test_accuracy,
                total_tests,
                diagnosis,
            }
        })
        .collect();

    let stats = OverviewStats {
        total_skills: insights.len(),
        total_tests: completed.len(),
        average_strength: average_strength(&insights),
        skills_needing_attention: insights
            .iter()
            .filter(|i| i.strength.current_strength < NEEDS_ATTENTION_BELOW)
            .count(),
        skills_strong: insights
            .iter()
            .filter(|i| i.strength.current_strength >= STRONG_FROM)
            .count(),
    };

    let recent_activity = completed.into_iter().take(RECENT_ACTIVITY_LIMIT).collect();

    KnowledgeOverview {
        skills: insights,
        stats,
        recent_activity,
    }
}

fn mean_accuracy(tests: &[QuickTest]) -> f64 {
    let accuracies: Vec<f64> = tests
        .iter()
        .filter_map(QuickTest::result)
        .map(|r| f64::from(r.accuracy))
        .collect();
    if accuracies.is_empty() {
        return 0.0;
    }

    #[allow(clippy::cast_precision_loss)]
    let n = accuracies.len() as f64;
    accuracies.iter().sum::<f64>() / n
}

fn average_strength(insights: &[SkillInsight]) -> u8 {
    if insights.is_empty() {
        return 0;
    }
    let total: f64 = insights
        .iter()
        .map(|i| f64::from(i.strength.current_strength))
        .sum();

    // Mean of values in [10, 100].
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let mean = (total / insights.len() as f64).round() as u8;
    mean
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Answers, Confidence, NewQuickTest, QuickTest, Skill, SkillId, TestId, TestResult, UserId,
    };
    use crate::time::fixed_now;
    use chrono::Duration;

    fn skill(id: u64, owner: UserId, proficiency: i32, days_ago: i64, half_life: f64, multiplier: f64) -> Skill {
        let now = fixed_now();
        Skill::from_persisted(
            SkillId::new(id),
            owner,
            format!("Skill {id}"),
            "General".into(),
            proficiency,
            now - Duration::days(days_ago),
            half_life,
            multiplier,
            now - Duration::days(100),
            now,
        )
        .unwrap()
    }

    fn test(id: u64, skill_id: u64, owner: UserId, accuracy: Option<(u8, i64)>) -> QuickTest {
        let mut t = NewQuickTest {
            skill_id: SkillId::new(skill_id),
            owner_id: owner,
            skill_name: format!("Skill {skill_id}"),
            questions: Vec::new(),
            created_at: fixed_now() - Duration::days(60),
        }
        .assign_id(TestId::new(id));
        if let Some((accuracy, minutes_ago)) = accuracy {
            t.complete(TestResult {
                answers: Answers::new(),
                score: 0,
                accuracy,
                total_time: 30.0,
                average_time_per_question: 6.0,
                confidence: Confidence::High,
                completed_at: fixed_now() - Duration::minutes(minutes_ago),
            })
            .unwrap();
        }
        t
    }

    #[test]
    fn base_classification_from_multiplier() {
        assert_eq!(diagnose(0.7, 0.0, 7.0).status, RetentionStatus::Strong);
        assert_eq!(diagnose(1.0, 0.0, 7.0).status, RetentionStatus::Stable);
        assert_eq!(diagnose(0.8, 0.0, 7.0).status, RetentionStatus::Stable);
        assert_eq!(diagnose(1.2, 0.0, 7.0).status, RetentionStatus::Stable);
        let critical = diagnose(1.3, 0.0, 7.0);
        assert_eq!(critical.status, RetentionStatus::Critical);
        assert_eq!(critical.color, RED);
    }

    #[test]
    fn long_inactivity_forces_fading() {
        let d = diagnose(0.7, 20.0, 7.0);
        assert_eq!(d.status, RetentionStatus::Fading);
        assert_eq!(d.color, AMBER);
        assert_eq!(diagnose(1.5, 15.0, 7.0).status, RetentionStatus::Fading);
    }

    #[test]
    fn moderate_inactivity_only_downgrades_strong() {
        let d = diagnose(0.7, 8.0, 7.0);
        assert_eq!(d.status, RetentionStatus::Stable);
        assert!(d.explanation.contains("starting to fade"));

        assert_eq!(diagnose(1.5, 8.0, 7.0).status, RetentionStatus::Critical);
        assert_eq!(
            diagnose(1.0, 8.0, 7.0).explanation,
            "Regular practice is maintaining this skill."
        );
    }

    #[test]
    fn empty_overview_has_zero_stats() {
        let overview = build_overview(Vec::new(), Vec::new(), fixed_now());
        assert!(overview.skills.is_empty());
        assert_eq!(overview.stats.average_strength, 0);
        assert_eq!(overview.stats.total_tests, 0);
        assert!(overview.recent_activity.is_empty());
    }

    #[test]
    fn keeps_five_newest_tests_per_skill() {
        let owner = UserId::random();
        let skills = vec![skill(1, owner, 80, 0, 7.0, 1.0)];
        let mut tests = Vec::new();
        for i in 0..7_u64 {
            // test 7 is the newest
            let minutes_ago = 100 - i64::try_from(i).unwrap() * 10;
            tests.push(test(i + 1, 1, owner, Some((u8::try_from(i * 10).unwrap(), minutes_ago))));
        }
        tests.push(test(8, 1, owner, None));

        let overview = build_overview(skills, tests, fixed_now());
        let insight = &overview.skills[0];
        let ids: Vec<u64> = insight.recent_tests.iter().map(|t| t.id().value()).collect();
        assert_eq!(ids, vec![7, 6, 5, 4, 3]);
        assert_eq!(insight.total_tests, 5);
        // mean of 60, 50, 40, 30, 20
        assert!((insight.avg_test_accuracy - 40.0).abs() < 1e-9);
        assert_eq!(overview.stats.total_tests, 7);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let owner = UserId::random();
        let tests = vec![
            test(1, 1, owner, Some((10, 5))),
            test(2, 1, owner, Some((20, 5))),
            test(3, 1, owner, Some((30, 1))),
        ];
        let ordered: Vec<u64> = completed_newest_first(tests)
            .iter()
            .map(|t| t.id().value())
            .collect();
        assert_eq!(ordered, vec![3, 1, 2]);
    }

    #[test]
    fn stats_and_activity_across_skills() {
        let owner = UserId::random();
        let skills = vec![
            skill(1, owner, 80, 0, 7.0, 1.0),  // 80
            skill(2, owner, 80, 7, 7.0, 1.0),  // 40
            skill(3, owner, 90, 0, 7.0, 0.7),  // 90
        ];
        let mut tests = Vec::new();
        for i in 0..12_u64 {
            let minutes_ago = 200 - i64::try_from(i).unwrap();
            tests.push(test(i + 1, (i % 3) + 1, owner, Some((50, minutes_ago))));
        }

        let overview = build_overview(skills, tests, fixed_now());
        assert_eq!(overview.stats.total_skills, 3);
        assert_eq!(overview.stats.total_tests, 12);
        assert_eq!(overview.stats.average_strength, 70);
        assert_eq!(overview.stats.skills_needing_attention, 1);
        assert_eq!(overview.stats.skills_strong, 2);

        assert_eq!(overview.recent_activity.len(), RECENT_ACTIVITY_LIMIT);
        assert_eq!(overview.recent_activity[0].id(), TestId::new(12));
        assert_eq!(overview.skills[2].diagnosis.status, RetentionStatus::Strong);
    }

    #[test]
    fn strong_skill_idle_for_twenty_days_is_fading() {
        let owner = UserId::random();
        let overview = build_overview(vec![skill(1, owner, 80, 20, 7.0, 0.7)], Vec::new(), fixed_now());
        let insight = &overview.skills[0];
        assert_eq!(insight.diagnosis.status, RetentionStatus::Fading);
        assert_eq!(insight.avg_test_accuracy, 0.0);
        assert_eq!(insight.total_tests, 0);
    }
}
