//! Counting gate capping concurrent requests in bounded-synchronous mode.

use crate::cancel::CancelToken;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

#[derive(Debug)]
struct Inner {
    available: Mutex<usize>,
    freed: Condvar,
}

/// A counting semaphore whose waits end early on cancellation.
#[derive(Debug, Clone)]
pub struct PermitGate {
    inner: Arc<Inner>,
    capacity: usize,
}

impl PermitGate {
    pub fn new(capacity: usize, cancel: &CancelToken) -> Self {
        let inner = Arc::new(Inner {
            available: Mutex::new(capacity),
            freed: Condvar::new(),
        });
        let weak = Arc::downgrade(&inner);
        cancel.on_cancel(move || {
            if let Some(inner) = weak.upgrade() {
                let _available = inner.available.lock();
                inner.freed.notify_all();
            }
        });
        Self { inner, capacity }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits not currently held.
    pub fn available(&self) -> usize {
        *self.inner.available.lock()
    }

    /// Block until a permit is free. Returns `None` if `cancel` fires first.
    pub fn acquire(&self, cancel: &CancelToken) -> Option<Permit<'_>> {
        let mut available = self.inner.available.lock();
        while *available == 0 && !cancel.is_cancelled() {
            self.inner.freed.wait(&mut available);
        }
        if cancel.is_cancelled() {
            return None;
        }
        *available -= 1;
        Some(Permit { gate: self })
    }
}

/// A held permit, returned to the gate on drop.
#[derive(Debug)]
pub struct Permit<'a> {
    gate: &'a PermitGate,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        let mut available = self.gate.inner.available.lock();
        *available += 1;
        self.gate.inner.freed.notify_one();
    }
}
