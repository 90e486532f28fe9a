//! Explicit cancellation context.
//!
//! A `CancelContext` is handed to a merge at construction and checked at every
//! suspend point. There is no ambient or global cancellation state: whoever
//! holds a clone can cancel, and every clone observes it.

use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct CancelContext {
    inner: Arc<Inner>,
}

struct Inner {
    tx: watch::Sender<bool>,
    children: Mutex<Vec<Weak<Inner>>>,
}

impl Inner {
    fn new(cancelled: bool) -> Self {
        let (tx, _rx) = watch::channel(cancelled);
        Self {
            tx,
            children: Mutex::new(Vec::new()),
        }
    }

    fn cancel(&self) {
        // Flag first, then fan out: `child()` checks the flag under the same lock.
        self.tx.send_replace(true);
        let children = {
            let mut guard = self.children.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *guard)
        };
        for child in children.iter().filter_map(Weak::upgrade) {
            child.cancel();
        }
    }

    fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl CancelContext {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner::new(false)),
        }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// Resolves once `cancel()` has been called on this context or an ancestor.
    pub async fn cancelled(&self) {
        let mut rx = self.inner.tx.subscribe();
        // The sender lives in `self.inner`, so the channel cannot close here.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// A context cancelled together with `self`, but which can also be
    /// cancelled on its own without affecting `self`.
    pub fn child(&self) -> CancelContext {
        let mut children = self
            .inner
            .children
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let child = Arc::new(Inner::new(self.is_cancelled()));
        children.retain(|w| w.strong_count() > 0);
        children.push(Arc::downgrade(&child));
        CancelContext { inner: child }
    }

    /// Cancel this context once `after` has elapsed. Requires a tokio runtime.
    pub fn cancel_after(&self, after: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if let Some(inner) = weak.upgrade() {
                inner.cancel();
            }
        })
    }
}

impl Default for CancelContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelContext")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
