//! Per-user write locks.
//!
//! Every mutation that can change a user's derived balance holds that user's
//! lock for the whole read-check-write transaction, so two concurrent
//! `share_fund` calls can never both pass the balance check against the same
//! stale balance. Locks are per user: unrelated users never contend.

use std::{
    collections::{BTreeSet, HashMap},
    sync::{Arc, Mutex as StdMutex},
};

use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub(crate) struct UserLocks {
    inner: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

/// Guards for a set of users, released together on drop.
#[derive(Debug)]
pub(crate) struct UserLockGuard {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl UserLocks {
    /// Locks every user in `user_ids`.
    ///
    /// Ids are deduplicated and acquired in sorted order, which rules out
    /// lock-order deadlocks between multi-user operations.
    pub(crate) async fn lock<'a, I>(&self, user_ids: I) -> UserLockGuard
    where
        I: IntoIterator<Item = &'a str>,
    {
        let ordered: BTreeSet<&str> = user_ids.into_iter().collect();
        let mut guards = Vec::with_capacity(ordered.len());
        for user_id in ordered {
            let lock = self.lock_for(user_id);
            tracing::debug!(user_id, "waiting for user lock");
            guards.push(lock.lock_owned().await);
        }
        UserLockGuard { _guards: guards }
    }

    fn lock_for(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut map = match self.inner.lock() {
            Ok(map) => map,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Drop entries nobody holds or waits on so the map tracks live users only.
        map.retain(|_, lock| Arc::strong_count(lock) > 1);
        map.entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
