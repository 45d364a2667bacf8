use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::domain::UserId;

/// Hands out one mutex per user so each wallet has a single writer.
#[derive(Default)]
pub(crate) struct AccountLocks {
    slots: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl AccountLocks {
    pub(crate) fn slot(&self, user_id: &UserId) -> Arc<Mutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(user_id.clone()).or_default().clone()
    }

    /// Slots for several wallets in ascending user-id order, deduplicated.
    /// Locking them in this order keeps multi-wallet operations deadlock free.
    pub(crate) fn ordered_slots(&self, user_ids: &[&UserId]) -> Vec<Arc<Mutex<()>>> {
        let mut ids: Vec<&UserId> = user_ids.to_vec();
        ids.sort();
        ids.dedup();
        ids.into_iter().map(|id| self.slot(id)).collect()
    }

    // The guarded value is `()`, so a poisoned lock carries no broken state.
    pub(crate) fn hold(slot: &Mutex<()>) -> MutexGuard<'_, ()> {
        slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
