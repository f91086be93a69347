//! Bounded frame queue.
//!
//! A fixed-capacity FIFO shared between one side of a pump and the outside
//! world. The inbound queue is filled by the read loop and drained by the
//! application; the outbound queue is filled by the application and drained
//! by the write loop.
//!
//! # Overflow
//!
//! What happens when [`BoundedQueue::put`] hits a full queue is decided by
//! the queue's [`OverflowPolicy`]:
//!
//! | Policy | Full queue |
//! |--------|------------|
//! | `Block` | Wait for space (backpressure) |
//! | `DropOldest` | Evict the head, insert, return [`Offer::Displaced`] |
//! | `DropNewest` | Keep the queue as is, return [`Offer::Dropped`] |
//! | `Reject` | Return [`Error::QueueFull`] |
//!
//! No policy ever reorders the items that remain in the queue.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::pin::pin;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

use crate::error::{Error, Result};

// ============================================================================
// OverflowPolicy
// ============================================================================

/// Behaviour of [`BoundedQueue::put`] on a full queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Wait until a consumer makes room.
    #[default]
    Block,
    /// Evict the oldest item to make room for the new one.
    DropOldest,
    /// Discard the new item.
    DropNewest,
    /// Fail with [`Error::QueueFull`].
    Reject,
}

// ============================================================================
// Offer
// ============================================================================

/// Successful outcome of a put.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Offer<T> {
    /// Item was appended without side effects.
    Accepted,
    /// Item was appended after evicting the returned head item.
    Displaced(T),
    /// Queue was full; the returned item was not inserted.
    Dropped(T),
}

impl<T> Offer<T> {
    /// Returns `true` if the offered item is now in the queue.
    #[inline]
    #[must_use]
    pub fn is_enqueued(&self) -> bool {
        !matches!(self, Self::Dropped(_))
    }

    /// Returns `true` if some item was lost to make this outcome.
    #[inline]
    #[must_use]
    pub fn lost_item(&self) -> bool {
        !matches!(self, Self::Accepted)
    }
}

// ============================================================================
// BoundedQueue
// ============================================================================

struct State<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Fixed-capacity, concurrency-safe FIFO.
///
/// All methods take `&self`; wrap in an `Arc` to share between tasks.
/// The lock is never held across an await point.
pub struct BoundedQueue<T> {
    state: Mutex<State<T>>,
    capacity: usize,
    policy: OverflowPolicy,
    not_empty: Notify,
    not_full: Notify,
}

impl<T> BoundedQueue<T> {
    /// Creates an empty queue.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `capacity` is zero.
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::config("queue capacity must be at least 1"));
        }

        Ok(Self {
            state: Mutex::new(State {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            capacity,
            policy,
            not_empty: Notify::new(),
            not_full: Notify::new(),
        })
    }

    /// Fixed capacity set at construction.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Overflow policy set at construction.
    #[inline]
    #[must_use]
    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Number of queued items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Inserts at the tail, waiting for space under [`OverflowPolicy::Block`].
    ///
    /// # Errors
    ///
    /// - [`Error::QueueClosed`] if the queue is (or becomes) closed
    /// - [`Error::QueueFull`] if full under [`OverflowPolicy::Reject`]
    pub async fn put(&self, item: T) -> Result<Offer<T>> {
        if self.policy != OverflowPolicy::Block {
            return self.try_put(item);
        }

        loop {
            let mut notified = pin!(self.not_full.notified());
            notified.as_mut().enable();

            {
                let mut state = self.state.lock();
                if state.closed {
                    return Err(Error::QueueClosed);
                }
                if state.items.len() < self.capacity {
                    state.items.push_back(item);
                    drop(state);
                    self.not_empty.notify_waiters();
                    return Ok(Offer::Accepted);
                }
            }

            notified.await;
        }
    }

    /// Inserts at the tail without waiting.
    ///
    /// Identical to [`put`](Self::put) except that a full queue under
    /// [`OverflowPolicy::Block`] fails like [`OverflowPolicy::Reject`].
    ///
    /// # Errors
    ///
    /// - [`Error::QueueClosed`] if the queue is closed
    /// - [`Error::QueueFull`] if full under `Block` or `Reject`
    pub fn try_put(&self, item: T) -> Result<Offer<T>> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(Error::QueueClosed);
        }

        let offer = if state.items.len() < self.capacity {
            state.items.push_back(item);
            Offer::Accepted
        } else {
            match self.policy {
                OverflowPolicy::Block | OverflowPolicy::Reject => {
                    return Err(Error::queue_full(self.capacity));
                }
                OverflowPolicy::DropNewest => return Ok(Offer::Dropped(item)),
                OverflowPolicy::DropOldest => {
                    let evicted = state.items.pop_front();
                    state.items.push_back(item);
                    match evicted {
                        Some(old) => Offer::Displaced(old),
                        None => Offer::Accepted,
                    }
                }
            }
        };
        drop(state);

        self.not_empty.notify_waiters();
        Ok(offer)
    }

    /// Removes and returns the head; `None` means the queue is empty.
    pub fn get(&self) -> Option<T> {
        let item = self.state.lock().items.pop_front();
        if item.is_some() {
            self.not_full.notify_waiters();
        }
        item
    }

    /// Waits for the next item.
    ///
    /// Returns `None` once the queue is closed and fully drained.
    pub async fn recv(&self) -> Option<T> {
        loop {
            let mut notified = pin!(self.not_empty.notified());
            notified.as_mut().enable();

            {
                let mut state = self.state.lock();
                if let Some(item) = state.items.pop_front() {
                    drop(state);
                    self.not_full.notify_waiters();
                    return Some(item);
                }
                if state.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Closes the queue.
    ///
    /// Further puts fail with [`Error::QueueClosed`]; queued items stay
    /// available to [`get`](Self::get) and [`recv`](Self::recv). Blocked
    /// producers and consumers are woken. Closing twice is a no-op.
    pub fn close(&self) {
        {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
        }
        self.not_full.notify_waiters();
        self.not_empty.notify_waiters();
    }
}

impl<T> std::fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("BoundedQueue")
            .field("len", &state.items.len())
            .field("capacity", &self.capacity)
            .field("policy", &self.policy)
            .field("closed", &state.closed)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
