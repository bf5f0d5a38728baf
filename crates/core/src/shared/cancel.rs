use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::error::TranscriptionError;

/// Cooperative cancellation flag shared by a job's owner and its workers.
///
/// Clones observe the same flag. Long-running steps poll it between units
/// of work; engine calls see it through their abort signal.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), TranscriptionError> {
        if self.is_cancelled() {
            Err(TranscriptionError::Cancelled)
        } else {
            Ok(())
        }
    }
}
