//! Per-session pump configuration.
//!
//! All limits and timers of a pump are fixed when it is spawned.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use session_pump::PumpConfig;
//!
//! let config = PumpConfig::builder()
//!     .peer_timeout(Duration::from_secs(30))
//!     .outbound_capacity(1024)
//!     .build()?;
//!
//! assert_eq!(config.ping_period(), Duration::from_secs(27));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::queue::OverflowPolicy;

use super::builder::PumpConfigBuilder;

// ============================================================================
// Constants
// ============================================================================

/// Default ceiling for a single inbound frame, in bytes.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 512;

/// Default capacity of both queues.
pub const DEFAULT_QUEUE_CAPACITY: usize = 512;

/// Default deadline for one transport write.
pub const DEFAULT_WRITE_WAIT: Duration = Duration::from_secs(10);

/// Default time the peer may stay silent before the session is dropped.
pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_secs(60);

/// Ping period as a fraction of the peer timeout (numerator / denominator).
const PING_PERIOD_RATIO: (u32, u32) = (9, 10);

// ============================================================================
// OutboundFraming
// ============================================================================

/// How one doorbell drain is put on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboundFraming {
    /// Concatenate every drained payload into one binary message.
    #[default]
    Coalesced,
    /// One binary message per payload, flushed once at the end of the drain.
    Individual,
}

// ============================================================================
// PumpConfig
// ============================================================================

/// Limits and timers for one connection pump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PumpConfig {
    /// Largest inbound frame accepted, in bytes.
    pub(crate) max_frame_size: usize,

    /// Capacity of the inbound queue.
    pub(crate) inbound_capacity: usize,

    /// Capacity of the outbound queue.
    pub(crate) outbound_capacity: usize,

    /// Overflow behaviour of the inbound queue.
    pub(crate) inbound_policy: OverflowPolicy,

    /// Overflow behaviour of the outbound queue.
    pub(crate) outbound_policy: OverflowPolicy,

    /// Deadline for each transport write.
    #[serde(with = "duration_ms", rename = "write_wait_ms")]
    pub(crate) write_wait: Duration,

    /// Maximum silence from the peer; also drives the ping period.
    #[serde(with = "duration_ms", rename = "peer_timeout_ms")]
    pub(crate) peer_timeout: Duration,

    /// Wire layout of outbound drains.
    pub(crate) framing: OutboundFraming,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            inbound_capacity: DEFAULT_QUEUE_CAPACITY,
            outbound_capacity: DEFAULT_QUEUE_CAPACITY,
            inbound_policy: OverflowPolicy::Block,
            outbound_policy: OverflowPolicy::Block,
            write_wait: DEFAULT_WRITE_WAIT,
            peer_timeout: DEFAULT_PEER_TIMEOUT,
            framing: OutboundFraming::Coalesced,
        }
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl PumpConfig {
    /// Creates a builder starting from the defaults.
    #[inline]
    #[must_use]
    pub fn builder() -> PumpConfigBuilder {
        PumpConfigBuilder::new()
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl PumpConfig {
    /// Largest inbound frame accepted, in bytes.
    #[inline]
    #[must_use]
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Capacity of the inbound queue.
    #[inline]
    #[must_use]
    pub fn inbound_capacity(&self) -> usize {
        self.inbound_capacity
    }

    /// Capacity of the outbound queue.
    #[inline]
    #[must_use]
    pub fn outbound_capacity(&self) -> usize {
        self.outbound_capacity
    }

    /// Overflow behaviour of the inbound queue.
    #[inline]
    #[must_use]
    pub fn inbound_policy(&self) -> OverflowPolicy {
        self.inbound_policy
    }

    /// Overflow behaviour of the outbound queue.
    #[inline]
    #[must_use]
    pub fn outbound_policy(&self) -> OverflowPolicy {
        self.outbound_policy
    }

    /// Deadline for each transport write.
    #[inline]
    #[must_use]
    pub fn write_wait(&self) -> Duration {
        self.write_wait
    }

    /// Maximum silence tolerated from the peer.
    #[inline]
    #[must_use]
    pub fn peer_timeout(&self) -> Duration {
        self.peer_timeout
    }

    /// Interval between pings: nine tenths of the peer timeout.
    #[inline]
    #[must_use]
    pub fn ping_period(&self) -> Duration {
        let (num, den) = PING_PERIOD_RATIO;
        self.peer_timeout * num / den
    }

    /// Wire layout of outbound drains.
    #[inline]
    #[must_use]
    pub fn framing(&self) -> OutboundFraming {
        self.framing
    }
}

// ============================================================================
// Validation
// ============================================================================

impl PumpConfig {
    /// Checks every limit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.max_frame_size == 0 {
            return Err(Error::config("max_frame_size must be at least 1 byte"));
        }
        if self.inbound_capacity == 0 {
            return Err(Error::config("inbound_capacity must be at least 1"));
        }
        if self.outbound_capacity == 0 {
            return Err(Error::config("outbound_capacity must be at least 1"));
        }
        if self.write_wait.is_zero() {
            return Err(Error::config("write_wait must be non-zero"));
        }
        if self.ping_period().is_zero() {
            return Err(Error::config(format!(
                "peer_timeout of {:?} yields a zero ping period",
                self.peer_timeout
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Serde Helpers
// ============================================================================

/// Serializes a [`Duration`] as whole milliseconds.
pub(crate) mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    /// Whole milliseconds, saturating at `u64::MAX`.
    pub(crate) fn saturating_millis(value: Duration) -> u64 {
        u64::try_from(value.as_millis()).unwrap_or(u64::MAX)
    }

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(saturating_millis(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

// ============================================================================
// Tests
// ============================================================================
