//! Cooperative cancellation shared between the reader, its waiters, and the
//! engine's request queue.

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type Waker = Box<dyn Fn() + Send + Sync>;

struct Inner {
    cancelled: AtomicBool,
    wakers: Mutex<Vec<Waker>>,
    // Dropped on cancel so every `channel()` receiver disconnects.
    signal: Mutex<Option<Sender<()>>>,
    signal_rx: Receiver<()>,
}

/// A cloneable cancellation flag.
///
/// Blocking code registers a waker with [`CancelToken::on_cancel`] so it can
/// be released from its wait, or selects on [`CancelToken::channel`].
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::bounded(0);
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                wakers: Mutex::new(Vec::new()),
                signal: Mutex::new(Some(tx)),
                signal_rx: rx,
            }),
        }
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Cancel and run every registered waker. Later calls are no-ops.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.signal.lock().take();
        let wakers = std::mem::take(&mut *self.inner.wakers.lock());
        for wake in &wakers {
            wake();
        }
    }

    /// Run `wake` when the token is cancelled, or now if it already is.
    pub fn on_cancel<F>(&self, wake: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut wakers = self.inner.wakers.lock();
        if self.is_cancelled() {
            drop(wakers);
            wake();
        } else {
            wakers.push(Box::new(wake));
        }
    }

    /// A receiver that disconnects once the token is cancelled.
    ///
    /// Nothing is ever sent on it; use it as a `select!` arm.
    pub fn channel(&self) -> Receiver<()> {
        self.inner.signal_rx.clone()
    }
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
            .finish()
    }
}
