//! Per-session counters.

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;

// ============================================================================
// PumpStats
// ============================================================================

/// Counters updated by the pump loops and the handle.
#[derive(Debug)]
pub(crate) struct PumpStats {
    connected_at: Instant,
    frames_received: AtomicU64,
    frames_sent: AtomicU64,
    batches_written: AtomicU64,
    pings_sent: AtomicU64,
    inbound_drops: AtomicU64,
    outbound_drops: AtomicU64,
}

impl PumpStats {
    pub(crate) fn new() -> Self {
        Self {
            connected_at: Instant::now(),
            frames_received: AtomicU64::new(0),
            frames_sent: AtomicU64::new(0),
            batches_written: AtomicU64::new(0),
            pings_sent: AtomicU64::new(0),
            inbound_drops: AtomicU64::new(0),
            outbound_drops: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_batch(&self, frames: usize) {
        self.batches_written.fetch_add(1, Ordering::Relaxed);
        self.frames_sent.fetch_add(frames as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_ping(&self) {
        self.pings_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_inbound_drop(&self) -> u64 {
        self.inbound_drops.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn record_outbound_drop(&self) -> u64 {
        self.outbound_drops.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            age: self.connected_at.elapsed(),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            batches_written: self.batches_written.load(Ordering::Relaxed),
            pings_sent: self.pings_sent.load(Ordering::Relaxed),
            inbound_drops: self.inbound_drops.load(Ordering::Relaxed),
            outbound_drops: self.outbound_drops.load(Ordering::Relaxed),
        }
    }
}

// ============================================================================
// StatsSnapshot
// ============================================================================

/// Point-in-time copy of a session's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Time since the pump was spawned.
    pub age: Duration,
    /// Data frames accepted into the inbound queue.
    pub frames_received: u64,
    /// Outbound payloads written to the transport.
    pub frames_sent: u64,
    /// Doorbell drains that wrote at least one payload.
    pub batches_written: u64,
    /// Liveness pings written.
    pub pings_sent: u64,
    /// Inbound frames lost to the overflow policy.
    pub inbound_drops: u64,
    /// Outbound payloads lost to the overflow policy.
    pub outbound_drops: u64,
}

// ============================================================================
// Tests
// ============================================================================
