//! Per-collective write serialization.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use collectives_core::CollectiveId;

use crate::error::{CollectivesError, Result};

/// One async mutex per collective.
///
/// Share management and page writes of a collective run while holding its
/// guard, so a read-check-write sequence cannot interleave with another
/// writer of the same collective. Writers of different collectives do not
/// contend.
#[derive(Default)]
pub struct CollectiveLocks {
    locks: Mutex<HashMap<CollectiveId, Arc<AsyncMutex<()>>>>,
}

impl CollectiveLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive write access to a collective.
    pub async fn lock(&self, collective_id: CollectiveId) -> Result<OwnedMutexGuard<()>> {
        let mutex = {
            let mut locks = self
                .locks
                .lock()
                .map_err(|e| CollectivesError::Poisoned(e.to_string()))?;
            Arc::clone(locks.entry(collective_id).or_default())
        };
        Ok(mutex.lock_owned().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_collective_is_exclusive() {
        let locks = Arc::new(CollectiveLocks::new());
        let guard = locks.lock(CollectiveId(1)).await.unwrap();

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move { locks.lock(CollectiveId(1)).await.map(|_| ()) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        // Another collective is not blocked
        locks.lock(CollectiveId(2)).await.unwrap();

        drop(guard);
        contender.await.unwrap().unwrap();
    }
}
