//! Half-life retention model.
//!
//! `strength = initial_proficiency × 0.5^((days / half_life) × multiplier)`,
//! rounded and floored at [`MIN_STRENGTH`].

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::Skill;
use crate::time::elapsed_days;

/// Strength never reported below this percentage.
pub const MIN_STRENGTH: u8 = 10;

/// Derived, never-persisted view of a skill at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillStrength {
    pub current_strength: u8,
    pub days_since_last_practice: f64,
}

impl SkillStrength {
    #[must_use]
    pub fn of(skill: &Skill, now: DateTime<Utc>) -> Self {
        Self {
            current_strength: current_strength(skill, now),
            days_since_last_practice: days_since_last_practice(skill, now),
        }
    }
}

/// Days since the skill was last practiced; `0.0` if `last_practiced_at` is in the future.
#[must_use]
pub fn days_since_last_practice(skill: &Skill, now: DateTime<Utc>) -> f64 {
    elapsed_days(skill.last_practiced_at(), now)
}

/// Current retention percentage in `[10, 100]`.
#[must_use]
pub fn current_strength(skill: &Skill, now: DateTime<Utc>) -> u8 {
    let days = days_since_last_practice(skill, now);
    let decay = skill.decay();
    let exponent = (days / decay.half_life()) * decay.multiplier();
    let strength = f64::from(skill.initial_proficiency()) * 0.5_f64.powf(exponent);

    // strength is within [0, 100] so the cast cannot truncate.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let rounded = strength.round() as u8;
    rounded.max(MIN_STRENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SkillId, UserId};
    use crate::time::fixed_now;
    use chrono::Duration;
    use proptest::prelude::*;

    fn skill(proficiency: i32, last: DateTime<Utc>, half_life: f64, multiplier: f64) -> Skill {
        Skill::from_persisted(
            SkillId::new(1),
            UserId::random(),
            "Rust".into(),
            "Programming".into(),
            proficiency,
            last,
            half_life,
            multiplier,
            last,
            last,
        )
        .unwrap()
    }

    #[test]
    fn one_half_life_halves_strength() {
        let now = fixed_now();
        let s = skill(80, now - Duration::days(7), 7.0, 1.0);
        assert_eq!(current_strength(&s, now), 40);
    }

    #[test]
    fn multiplier_scales_exponent() {
        let now = fixed_now();
        // exponent = (7/7) * 2.0 = 2 -> 80 * 0.25
        let s = skill(80, now - Duration::days(7), 7.0, 2.0);
        assert_eq!(current_strength(&s, now), 20);
    }

    #[test]
    fn strength_is_floored() {
        let now = fixed_now();
        let s = skill(100, now - Duration::days(3650), 3.0, 2.0);
        assert_eq!(current_strength(&s, now), MIN_STRENGTH);

        // Floor applies even when nothing has decayed.
        let s = skill(4, now, 7.0, 1.0);
        assert_eq!(current_strength(&s, now), MIN_STRENGTH);
    }

    #[test]
    fn future_practice_does_not_boost() {
        let now = fixed_now();
        let s = skill(70, now + Duration::days(5), 7.0, 1.0);
        assert_eq!(days_since_last_practice(&s, now), 0.0);
        assert_eq!(current_strength(&s, now), 70);
    }

    #[test]
    fn snapshot_combines_both_values() {
        let now = fixed_now();
        let s = skill(80, now - Duration::days(14), 7.0, 1.0);
        let snap = SkillStrength::of(&s, now);
        assert_eq!(snap.current_strength, 20);
        assert!((snap.days_since_last_practice - 14.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn fresh_skill_keeps_initial_proficiency(
            proficiency in 10i32..=100,
            half_life in 3.0f64..=30.0,
            multiplier in 0.5f64..=2.0,
        ) {
            let now = fixed_now();
            let s = skill(proficiency, now, half_life, multiplier);
            prop_assert_eq!(i32::from(current_strength(&s, now)), proficiency);
        }

        #[test]
        fn strength_stays_in_bounds(
            proficiency in 0i32..=100,
            days in 0i64..100_000,
            half_life in 3.0f64..=30.0,
            multiplier in 0.5f64..=2.0,
        ) {
            let now = fixed_now();
            let s = skill(proficiency, now - Duration::days(days), half_life, multiplier);
            let strength = current_strength(&s, now);
            prop_assert!((MIN_STRENGTH..=100).contains(&strength));
        }
    }
}
