//! Per-account critical sections.
//!
//! Every ledger mutation holds the locks of all the accounts it touches for
//! the whole database transaction. Locks are always taken in ascending account
//! id order, so two operations moving money between the same pair of accounts
//! in opposite directions cannot deadlock.
//!
//! The table keeps a slot only while someone holds or waits on it; idle slots
//! are dropped on the next acquisition.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Debug, Default)]
pub(crate) struct AccountLocks {
    slots: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

/// Held locks; released on drop.
#[derive(Debug)]
pub(crate) struct AccountGuard {
    accounts: Vec<Uuid>,
    _held: Vec<OwnedMutexGuard<()>>,
}

impl AccountGuard {
    /// Whether every account in `ids` is locked by this guard.
    pub(crate) fn covers(&self, ids: &[Uuid]) -> bool {
        ids.iter().all(|id| self.accounts.binary_search(id).is_ok())
    }
}

impl AccountLocks {
    pub(crate) async fn acquire(&self, ids: impl IntoIterator<Item = Uuid>) -> AccountGuard {
        let mut accounts: Vec<Uuid> = ids.into_iter().collect();
        accounts.sort_unstable();
        accounts.dedup();

        self.prune();

        let mut held = Vec::with_capacity(accounts.len());
        for id in &accounts {
            let slot = {
                let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
                Arc::clone(slots.entry(*id).or_default())
            };
            held.push(slot.lock_owned().await);
        }

        AccountGuard {
            accounts,
            _held: held,
        }
    }

    /// Drops slots nobody holds or waits on. A slot referenced only by the
    /// table cannot be cloned concurrently, since cloning needs this mutex.
    fn prune(&self) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.retain(|_, slot| Arc::strong_count(slot) > 1);
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
