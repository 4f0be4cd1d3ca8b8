//! Cooperative cancellation consulted at every stream read boundary.
//!
//! ```rust
//! use cwire::CancelToken;
//!
//! let token = CancelToken::new();
//! let handle = token.clone();
//! assert!(!token.is_cancelled());
//!
//! handle.cancel();
//! assert!(token.is_cancelled());
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Cloneable cancellation handle shared between a request issuer and the
/// read loop consuming its stream.
///
/// Cancellation is sticky: once set it never clears, so a token is only
/// good for a single attempt.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    flag: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.flag.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.flag.load(Ordering::Acquire)
    }

    /// Resolves once `cancel` has been called, no matter the ordering of the
    /// call relative to this wait.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }

            notified.await;
        }
    }
}
