use crate::domain::account::AccountId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Process-wide registry mapping each account identity to its exclusive lock.
///
/// Locks are created lazily, one per identity, and never removed for the
/// lifetime of the process. Every mutation of an account must go through the
/// lock obtained here, so two in-memory copies of the same account can never
/// be locked independently.
#[derive(Default)]
pub struct LockRegistry {
    locks: StdMutex<HashMap<AccountId, Arc<Mutex<()>>>>,
}

/// Guard for a single account lock. Released on drop on every exit path.
pub struct AccountGuard {
    _guard: OwnedMutexGuard<()>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, id: AccountId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().expect("lock registry poisoned");
        locks.entry(id).or_default().clone()
    }

    /// Acquires the exclusive lock for one account.
    pub async fn acquire(&self, id: AccountId) -> AccountGuard {
        let lock = self.lock_for(id);
        AccountGuard {
            _guard: lock.lock_owned().await,
        }
    }

    /// Acquires the locks for two distinct accounts in ascending id order,
    /// regardless of argument order. The fixed total order prevents two
    /// concurrent transfers over the same pair from deadlocking.
    pub async fn acquire_pair(&self, a: AccountId, b: AccountId) -> (AccountGuard, AccountGuard) {
        debug_assert_ne!(a, b);
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        let first = self.acquire(first).await;
        let second = self.acquire(second).await;
        (first, second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_id_resolves_to_same_lock() {
        let registry = LockRegistry::new();
        let a = registry.lock_for(1);
        let b = registry.lock_for(1);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &registry.lock_for(2)));
    }

    #[tokio::test]
    async fn test_acquire_blocks_second_holder() {
        let registry = Arc::new(LockRegistry::new());
        let guard = registry.acquire(1).await;

        let registry2 = registry.clone();
        let pending = tokio::spawn(async move {
            let _guard = registry2.acquire(1).await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!pending.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), pending)
            .await
            .expect("lock was not released")
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_opposite_order_pairs_do_not_deadlock() {
        let registry = Arc::new(LockRegistry::new());
        let mut tasks = Vec::new();
        for i in 0..100 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                let (a, b) = if i % 2 == 0 { (1, 2) } else { (2, 1) };
                let _guards = registry.acquire_pair(a, b).await;
            }));
        }
        let all = async {
            for task in tasks {
                task.await.unwrap();
            }
        };
        tokio::time::timeout(Duration::from_secs(10), all)
            .await
            .expect("deadlock: pair acquisition did not finish");
    }
}
