//! Cooperative cancellation.
//!
//! The pipeline runs on a single worker thread. Whoever started it keeps a
//! clone of the [`CancelToken`] and may call [`CancelToken::cancel`] from any
//! thread; the worker polls [`CancelToken::is_cancelled`] between directory
//! entries and between files, and stops with an aborted outcome.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
