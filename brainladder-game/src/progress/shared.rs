use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::backend::ProgressBackend;
use super::records::{AttemptOutcome, AttemptReceipt, LevelProgressRecord};
use super::ProgressStore;
use crate::catalog::LevelId;
use crate::error::StateError;

/// Cloneable handle that serializes every store call behind one lock.
#[derive(Debug)]
pub struct SharedProgressStore<B: ProgressBackend> {
    inner: Arc<Mutex<ProgressStore<B>>>,
}

impl<B: ProgressBackend> Clone for SharedProgressStore<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: ProgressBackend> SharedProgressStore<B> {
    #[must_use]
    pub fn new(store: ProgressStore<B>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    // A panic in another holder leaves the store consistent at the row
    // level, so keep serving it.
    fn lock(&self) -> MutexGuard<'_, ProgressStore<B>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with exclusive access to the store.
    pub fn with<R>(&self, f: impl FnOnce(&mut ProgressStore<B>) -> R) -> R {
        f(&mut self.lock())
    }

    /// # Errors
    ///
    /// See [`ProgressStore::record_attempt`].
    pub fn record_attempt(
        &self,
        level_id: LevelId,
        outcome: AttemptOutcome,
    ) -> Result<AttemptReceipt, StateError> {
        self.lock().record_attempt(level_id, outcome)
    }

    #[must_use]
    pub fn get_record(&self, level_id: LevelId) -> LevelProgressRecord {
        self.lock().get_record(level_id)
    }

    /// Recover the store once every other handle is gone.
    ///
    /// # Errors
    ///
    /// Returns `self` back if other handles are still alive.
    pub fn try_into_inner(self) -> Result<ProgressStore<B>, Self> {
        Arc::try_unwrap(self.inner)
            .map(|mutex| mutex.into_inner().unwrap_or_else(PoisonError::into_inner))
            .map_err(|inner| Self { inner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::MemoryBackend;
    use std::thread;

    #[test]
    fn concurrent_attempts_are_all_counted() {
        let shared = SharedProgressStore::new(ProgressStore::open(MemoryBackend::new()));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = shared.clone();
                thread::spawn(move || {
                    for _ in 0..25 {
                        let outcome = if i % 2 == 0 {
                            AttemptOutcome::success(300, 3)
                        } else {
                            AttemptOutcome::failure(0)
                        };
                        store.record_attempt(1, outcome).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let record = shared.get_record(1);
        assert_eq!(record.attempts, 200);
        assert_eq!(record.stars, 3);
        assert!(shared.get_record(2).is_unlocked);
        assert_eq!(shared.with(|store| store.get_record(2).attempts), 0);

        let store = shared.try_into_inner().unwrap();
        assert_eq!(store.pending_writes(), 0);
    }
}
