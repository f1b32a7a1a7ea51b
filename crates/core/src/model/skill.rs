use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::ids::{SkillId, UserId};

pub const DEFAULT_HALF_LIFE_DAYS: f64 = 7.0;
pub const MIN_HALF_LIFE_DAYS: f64 = 3.0;
pub const MAX_HALF_LIFE_DAYS: f64 = 30.0;

pub const DEFAULT_DECAY_MULTIPLIER: f64 = 1.0;
pub const MIN_DECAY_MULTIPLIER: f64 = 0.5;
pub const MAX_DECAY_MULTIPLIER: f64 = 2.0;

pub const DEFAULT_PROFICIENCY: u8 = 50;
pub const DEFAULT_CATEGORY: &str = "General";

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SkillError {
    #[error("skill name cannot be empty")]
    EmptyName,

    #[error("initial proficiency must be between 0 and 100, got {0}")]
    InvalidProficiency(i32),
}

//
// ─── DECAY PARAMETERS ──────────────────────────────────────────────────────────
//

/// Half-life and adaptive multiplier driving a skill's decay curve.
///
/// Every constructor clamps: half-life to `[3, 30]` days, multiplier to
/// `[0.5, 2.0]`. Non-finite inputs fall back to the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecayParams {
    half_life: f64,
    #[serde(rename = "adaptiveDecayMultiplier")]
    multiplier: f64,
}

impl DecayParams {
    #[must_use]
    pub fn new(half_life: f64, multiplier: f64) -> Self {
        let half_life = if half_life.is_finite() {
            half_life.clamp(MIN_HALF_LIFE_DAYS, MAX_HALF_LIFE_DAYS)
        } else {
            DEFAULT_HALF_LIFE_DAYS
        };
        let multiplier = if multiplier.is_finite() {
            multiplier.clamp(MIN_DECAY_MULTIPLIER, MAX_DECAY_MULTIPLIER)
        } else {
            DEFAULT_DECAY_MULTIPLIER
        };
        Self {
            half_life,
            multiplier,
        }
    }

    /// Days until strength halves under multiplier 1.0.
    #[must_use]
    pub fn half_life(&self) -> f64 {
        self.half_life
    }

    #[must_use]
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }
}

impl Default for DecayParams {
    fn default() -> Self {
        Self {
            half_life: DEFAULT_HALF_LIFE_DAYS,
            multiplier: DEFAULT_DECAY_MULTIPLIER,
        }
    }
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// User input for registering a new skill.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SkillDraft {
    pub name: String,
    pub category: Option<String>,
    pub initial_proficiency: Option<i32>,
}

impl SkillDraft {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn with_proficiency(mut self, proficiency: i32) -> Self {
        self.initial_proficiency = Some(proficiency);
        self
    }

    /// Validate the draft for `owner`, stamping `now` as creation and practice time.
    ///
    /// # Errors
    ///
    /// Returns `SkillError::EmptyName` for a blank name and
    /// `SkillError::InvalidProficiency` outside `0..=100`.
    pub fn validate(self, owner_id: UserId, now: DateTime<Utc>) -> Result<ValidatedSkill, SkillError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(SkillError::EmptyName);
        }

        let initial_proficiency = match self.initial_proficiency {
            Some(raw) => u8::try_from(raw)
                .ok()
                .filter(|p| *p <= 100)
                .ok_or(SkillError::InvalidProficiency(raw))?,
            None => DEFAULT_PROFICIENCY,
        };

        let category = self
            .category
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_owned());

        Ok(ValidatedSkill {
            owner_id,
            name: name.to_owned(),
            category,
            initial_proficiency,
            created_at: now,
        })
    }
}

/// A skill that passed validation but has no storage id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSkill {
    pub owner_id: UserId,
    pub name: String,
    pub category: String,
    pub initial_proficiency: u8,
    pub created_at: DateTime<Utc>,
}

impl ValidatedSkill {
    #[must_use]
    pub fn assign_id(self, id: SkillId) -> Skill {
        Skill {
            id,
            owner_id: self.owner_id,
            name: self.name,
            category: self.category,
            initial_proficiency: self.initial_proficiency,
            last_practiced_at: self.created_at,
            decay: DecayParams::default(),
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

//
// ─── UPDATE COMMAND ────────────────────────────────────────────────────────────
//

/// Explicit description of which mutable skill fields change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkillUpdate {
    decay: Option<DecayParams>,
    practiced_at: Option<DateTime<Utc>>,
    at: DateTime<Utc>,
}

impl SkillUpdate {
    /// The user practiced or reviewed the skill at `at`.
    #[must_use]
    pub fn practiced(at: DateTime<Utc>) -> Self {
        Self {
            decay: None,
            practiced_at: Some(at),
            at,
        }
    }

    /// A quiz was submitted at `at`: new decay parameters, and it counts as practice.
    #[must_use]
    pub fn quiz_completed(decay: DecayParams, at: DateTime<Utc>) -> Self {
        Self {
            decay: Some(decay),
            practiced_at: Some(at),
            at,
        }
    }
}

//
// ─── SKILL ─────────────────────────────────────────────────────────────────────
//

/// A tracked competency owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    id: SkillId,
    owner_id: UserId,
    name: String,
    category: String,
    initial_proficiency: u8,
    last_practiced_at: DateTime<Utc>,
    #[serde(flatten)]
    decay: DecayParams,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Skill {
    /// Rehydrate a skill from persisted storage.
    ///
    /// Decay parameters are re-clamped on load.
    ///
    /// # Errors
    ///
    /// Returns `SkillError` if the name is blank or the proficiency is out of range.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: SkillId,
        owner_id: UserId,
        name: String,
        category: String,
        initial_proficiency: i32,
        last_practiced_at: DateTime<Utc>,
        half_life: f64,
        multiplier: f64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, SkillError> {
        if name.trim().is_empty() {
            return Err(SkillError::EmptyName);
        }
        let initial_proficiency = u8::try_from(initial_proficiency)
            .ok()
            .filter(|p| *p <= 100)
            .ok_or(SkillError::InvalidProficiency(initial_proficiency))?;

        Ok(Self {
            id,
            owner_id,
            name,
            category,
            initial_proficiency,
            last_practiced_at,
            decay: DecayParams::new(half_life, multiplier),
            created_at,
            updated_at,
        })
    }

    /// Apply an update command. This is the only mutation path for a skill.
    pub fn apply(&mut self, update: &SkillUpdate) {
        if let Some(decay) = update.decay {
            self.decay = decay;
        }
        if let Some(practiced_at) = update.practiced_at {
            self.last_practiced_at = practiced_at;
        }
        self.updated_at = update.at;
    }

    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.owner_id == user
    }

    #[must_use]
    pub fn id(&self) -> SkillId {
        self.id
    }

    #[must_use]
    pub fn owner_id(&self) -> UserId {
        self.owner_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[must_use]
    pub fn initial_proficiency(&self) -> u8 {
        self.initial_proficiency
    }

    #[must_use]
    pub fn last_practiced_at(&self) -> DateTime<Utc> {
        self.last_practiced_at
    }

    #[must_use]
    pub fn decay(&self) -> DecayParams {
        self.decay
    }

    #[must_use]
    pub fn half_life(&self) -> f64 {
        self.decay.half_life()
    }

    #[must_use]
    pub fn adaptive_decay_multiplier(&self) -> f64 {
        self.decay.multiplier()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
