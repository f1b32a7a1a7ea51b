use std::collections::HashMap;
use std::sync::Arc;

use retention_core::model::SkillId;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry size past which idle entries are pruned.
const PRUNE_THRESHOLD: usize = 1_000;

/// Per-skill write locks.
///
/// Every read-modify-write of a skill record holds that skill's guard from the
/// read until the write lands, so concurrent updates to one skill serialize
/// while different skills proceed in parallel.
#[derive(Clone, Default)]
pub struct SkillLocks {
    locks: Arc<Mutex<HashMap<SkillId, Arc<Mutex<()>>>>>,
}

impl SkillLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `skill_id`.
    pub async fn acquire(&self, skill_id: SkillId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;

            // strong_count == 1 means only the map holds the entry.
            if locks.len() > PRUNE_THRESHOLD {
                locks.retain(|_, v| Arc::strong_count(v) > 1);
            }

            Arc::clone(
                locks
                    .entry(skill_id)
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}
