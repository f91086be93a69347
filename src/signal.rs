//! Data-less wake-up primitives shared by the pump loops.
//!
//! - [`Doorbell`]: coalescing single-permit notification. Any number of
//!   rings while nobody is waiting collapse into one wake-up.
//! - [`Latch`]: set-once flag. Every current and future waiter observes it.

// ============================================================================
// Imports
// ============================================================================

use std::pin::pin;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

// ============================================================================
// Doorbell
// ============================================================================

/// Single-permit wake-up signal.
///
/// Carries no data; it tells the write loop "the outbound queue may be
/// non-empty, drain it". Backed by [`Notify::notify_one`], which stores at
/// most one permit.
#[derive(Debug, Default)]
pub struct Doorbell {
    notify: Notify,
}

impl Doorbell {
    /// Creates a doorbell with no pending permit.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a permit, or wakes the waiter if there is one.
    #[inline]
    pub fn ring(&self) {
        self.notify.notify_one();
    }

    /// Waits for a permit and consumes it.
    pub async fn wait(&self) {
        self.notify.notified().await;
    }
}

// ============================================================================
// Latch
// ============================================================================

/// Set-once flag with async waiters.
///
/// Setting is idempotent and may happen from any task.
#[derive(Debug, Default)]
pub struct Latch {
    set: AtomicBool,
    notify: Notify,
}

impl Latch {
    /// Creates an unset latch.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the latch and wakes all waiters.
    ///
    /// Returns `true` only for the call that actually flipped it.
    pub fn set(&self) -> bool {
        let first = !self.set.swap(true, Ordering::AcqRel);
        if first {
            self.notify.notify_waiters();
        }
        first
    }

    /// Returns `true` once [`set`](Self::set) has been called.
    #[inline]
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.set.load(Ordering::Acquire)
    }

    /// Completes once the latch is set; immediately if it already is.
    pub async fn wait(&self) {
        loop {
            let mut notified = pin!(self.notify.notified());
            notified.as_mut().enable();
            if self.is_set() {
                return;
            }
            notified.await;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
