//! Builder pattern for pump configuration.
//!
//! Provides a fluent API for configuring and validating [`PumpConfig`].
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use session_pump::{OverflowPolicy, PumpConfig};
//!
//! # fn example() -> session_pump::Result<()> {
//! let config = PumpConfig::builder()
//!     .max_frame_size(64 * 1024)
//!     .inbound_policy(OverflowPolicy::DropOldest)
//!     .write_wait(Duration::from_secs(5))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::Result;
use crate::queue::OverflowPolicy;

use super::options::{OutboundFraming, PumpConfig};

// ============================================================================
// PumpConfigBuilder
// ============================================================================

/// Builder for a [`PumpConfig`].
///
/// Use [`PumpConfig::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct PumpConfigBuilder {
    config: PumpConfig,
}

// ============================================================================
// PumpConfigBuilder Implementation
// ============================================================================

impl PumpConfigBuilder {
    /// Creates a builder holding the default configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the largest inbound frame accepted, in bytes.
    #[inline]
    #[must_use]
    pub fn max_frame_size(mut self, bytes: usize) -> Self {
        self.config.max_frame_size = bytes;
        self
    }

    /// Sets the same capacity on both queues.
    #[inline]
    #[must_use]
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.inbound_capacity = capacity;
        self.config.outbound_capacity = capacity;
        self
    }

    /// Sets the inbound queue capacity.
    #[inline]
    #[must_use]
    pub fn inbound_capacity(mut self, capacity: usize) -> Self {
        self.config.inbound_capacity = capacity;
        self
    }

    /// Sets the outbound queue capacity.
    #[inline]
    #[must_use]
    pub fn outbound_capacity(mut self, capacity: usize) -> Self {
        self.config.outbound_capacity = capacity;
        self
    }

    /// Sets the overflow policy of the inbound queue.
    #[inline]
    #[must_use]
    pub fn inbound_policy(mut self, policy: OverflowPolicy) -> Self {
        self.config.inbound_policy = policy;
        self
    }

    /// Sets the overflow policy of the outbound queue.
    #[inline]
    #[must_use]
    pub fn outbound_policy(mut self, policy: OverflowPolicy) -> Self {
        self.config.outbound_policy = policy;
        self
    }

    /// Sets the deadline applied to every transport write.
    #[inline]
    #[must_use]
    pub fn write_wait(mut self, wait: Duration) -> Self {
        self.config.write_wait = wait;
        self
    }

    /// Sets the peer timeout.
    ///
    /// The ping period follows as nine tenths of this value.
    #[inline]
    #[must_use]
    pub fn peer_timeout(mut self, timeout: Duration) -> Self {
        self.config.peer_timeout = timeout;
        self
    }

    /// Sets how outbound drains are framed.
    #[inline]
    #[must_use]
    pub fn framing(mut self, framing: OutboundFraming) -> Self {
        self.config.framing = framing;
        self
    }

    /// Validates and returns the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if any limit is zero.
    pub fn build(self) -> Result<PumpConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ============================================================================
// Tests
// ============================================================================
