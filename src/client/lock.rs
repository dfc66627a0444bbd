use std::ops::{Deref, DerefMut};
use tokio::sync::{Mutex, MutexGuard};
use tracing::trace;

/// Async exclusive lock around the connection's transport
///
/// Waiters queue in arrival order and park their task instead of a thread.
/// There is no timeout and no re-entrance: entering again while holding a
/// guard on the same task never completes
///
pub(crate) struct ExclusiveLock<T> {
    inner: Mutex<T>,
}

pub(crate) struct LockGuard<'a, T> {
    guard: MutexGuard<'a, T>,
}

impl<T> ExclusiveLock<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    pub(crate) async fn enter(&self) -> LockGuard<'_, T> {
        let guard = match self.inner.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                trace!("Exclusive lock is held, waiting");
                self.inner.lock().await
            }
        };
        LockGuard { guard }
    }
}

impl<T> Deref for LockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for LockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}
