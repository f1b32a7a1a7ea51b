mod ids;
mod skill;

pub use ids::{ParseIdError, QuestionId, SkillId, TestId, UserId};

pub use quick_test::{
    Answers, Confidence, NewQuickTest, Performance, Question, QuestionPrompt, QuickTest,
    QuickTestError, QuickTestView, TestResult,
};
pub use skill::{
    DEFAULT_CATEGORY, DEFAULT_DECAY_MULTIPLIER, DEFAULT_HALF_LIFE_DAYS, DEFAULT_PROFICIENCY,
    DecayParams, MAX_DECAY_MULTIPLIER, MAX_HALF_LIFE_DAYS, MIN_DECAY_MULTIPLIER,
    MIN_HALF_LIFE_DAYS, Skill, SkillDraft, SkillError, SkillUpdate, ValidatedSkill,
};
