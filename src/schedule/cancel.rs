use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type TestBreak = dyn Fn() -> bool + Send + Sync;

struct CancelInner {
    flag: AtomicBool,
    test_break: Mutex<Option<Arc<TestBreak>>>,
}

/// Cooperative cancellation shared by the coordinator, workers and shading stage.
///
/// Once set the flag stays set until [`CancelToken::reset`]; an attached external
/// predicate latches the flag the first time it reports a break. The predicate is
/// shared state too: attaching one is seen by every clone.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .field("test_break", &self.predicate().is_some())
            .finish()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CancelInner {
                flag: AtomicBool::new(false),
                test_break: Mutex::new(None),
            }),
        }
    }

    /// Token that also polls `test_break`.
    pub fn with_test_break(test_break: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        let token = Self::new();
        token.set_test_break(test_break);
        token
    }

    /// Poll `test_break` from now on, replacing any earlier predicate.
    pub fn set_test_break(&self, test_break: impl Fn() -> bool + Send + Sync + 'static) {
        let predicate: Arc<TestBreak> = Arc::new(test_break);
        *self.slot() = Some(predicate);
    }

    pub fn clear_test_break(&self) {
        *self.slot() = None;
    }

    // The slot only ever holds a whole predicate; a poisoned lock is still consistent.
    fn slot(&self) -> MutexGuard<'_, Option<Arc<TestBreak>>> {
        self.inner
            .test_break
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn predicate(&self) -> Option<Arc<TestBreak>> {
        self.slot().clone()
    }

    pub fn cancel(&self) {
        self.inner.flag.store(true, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.inner.flag.store(false, Ordering::Relaxed);
    }

    /// Flag state only; does not consult the predicate.
    pub fn is_cancelled(&self) -> bool {
        self.inner.flag.load(Ordering::Relaxed)
    }

    /// Check for cancellation, consulting the external predicate.
    pub fn poll(&self) -> bool {
        if self.is_cancelled() {
            return true;
        }
        if let Some(tb) = self.predicate()
            && tb()
        {
            self.cancel();
            return true;
        }
        false
    }
}

#[cfg(test)]
#[path = "../../tests/unit/schedule/cancel.rs"]
mod tests;
