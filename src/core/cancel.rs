use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use crate::core::error::{Error, Result};

/// Cooperative cancellation flag shared between a caller and a running request.
///
/// Long passes (filter, fallback scan, index build) poll it at chunk
/// boundaries, so a request stops within one chunk after `cancel()`.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::cancelled())
        } else {
            Ok(())
        }
    }
}
