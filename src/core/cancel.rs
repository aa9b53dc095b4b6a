use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation signal for a batch run.
///
/// Clones share one flag. Raising it is sticky: units of work that have not
/// started will not start, and in-flight conversions abort at their next
/// checkpoint (before decode, before encode, before the final write). It
/// never interrupts a write in progress, so completed outputs stay intact.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the signal. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
