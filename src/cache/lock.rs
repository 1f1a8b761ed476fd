use std::sync::{Mutex, MutexGuard};

use tracing::warn;

/// Lock the query map, recovering the guard if a previous holder panicked.
pub(crate) fn mutex_lock<'a, T>(lock: &'a Mutex<T>, op: &'static str) -> MutexGuard<'a, T> {
    lock.lock().unwrap_or_else(|poisoned| {
        warn!(
            op,
            lock_kind = "mutex.lock",
            result = "poisoned_recovered",
            "Recovered from poisoned query cache lock"
        );
        poisoned.into_inner()
    })
}
