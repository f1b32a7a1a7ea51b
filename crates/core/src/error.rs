use thiserror::Error;

use crate::model::{QuickTestError, SkillError};
use crate::quiz::ScoringError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Skill(#[from] SkillError),
    #[error(transparent)]
    QuickTest(#[from] QuickTestError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
}
