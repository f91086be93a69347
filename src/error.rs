//! Error types for the session pump.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use session_pump::{Error, Result};
//!
//! async fn example(handle: &PumpHandle) -> Result<()> {
//!     handle.send("hello").await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionClosed`] |
//! | Queue | [`Error::QueueFull`], [`Error::QueueClosed`], [`Error::InboundOverflow`] |
//! | Framing | [`Error::FrameTooLarge`] |
//! | Liveness | [`Error::WriteTimeout`], [`Error::PeerTimeout`] |
//! | External | [`Error::Io`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when pump or server configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Connection could not be established.
    ///
    /// Returned when the WebSocket upgrade fails.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// The session is closed or shutting down.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Queue Errors
    // ========================================================================
    /// Queue is at capacity and its policy rejects new items.
    #[error("Queue full (capacity {capacity})")]
    QueueFull {
        /// Fixed capacity of the queue.
        capacity: usize,
    },

    /// Queue was closed; no further items are accepted.
    #[error("Queue closed")]
    QueueClosed,

    /// Inbound queue overflowed under the `Reject` policy.
    ///
    /// Terminates the read loop of the affected session.
    #[error("Inbound queue overflow (capacity {capacity})")]
    InboundOverflow {
        /// Fixed capacity of the inbound queue.
        capacity: usize,
    },

    // ========================================================================
    // Framing Errors
    // ========================================================================
    /// Peer sent a frame larger than the configured ceiling.
    #[error("Frame too large: {size} bytes (max {max})")]
    FrameTooLarge {
        /// Size of the offending frame.
        size: usize,
        /// Configured maximum frame size.
        max: usize,
    },

    // ========================================================================
    // Liveness Errors
    // ========================================================================
    /// A transport write did not complete within the write deadline.
    #[error("Write timed out after {timeout_ms}ms")]
    WriteTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Peer sent nothing (not even a pong) within the peer timeout.
    #[error("Peer silent for {timeout_ms}ms")]
    PeerTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a queue full error.
    #[inline]
    pub fn queue_full(capacity: usize) -> Self {
        Self::QueueFull { capacity }
    }

    /// Creates an inbound overflow error.
    #[inline]
    pub fn inbound_overflow(capacity: usize) -> Self {
        Self::InboundOverflow { capacity }
    }

    /// Creates a frame too large error.
    #[inline]
    pub fn frame_too_large(size: usize, max: usize) -> Self {
        Self::FrameTooLarge { size, max }
    }

    /// Creates a write timeout error.
    #[inline]
    pub fn write_timeout(timeout_ms: u64) -> Self {
        Self::WriteTimeout { timeout_ms }
    }

    /// Creates a peer timeout error.
    #[inline]
    pub fn peer_timeout(timeout_ms: u64) -> Self {
        Self::PeerTimeout { timeout_ms }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::WriteTimeout { .. } | Self::PeerTimeout { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionClosed
                | Self::WriteTimeout { .. }
                | Self::PeerTimeout { .. }
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Only a full queue may succeed on retry; a session that failed is
    /// never resumed.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::QueueFull { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::connection("upgrade rejected");
        assert_eq!(err.to_string(), "Connection failed: upgrade rejected");
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("queue capacity must be at least 1");
        assert_eq!(
            err.to_string(),
            "Configuration error: queue capacity must be at least 1"
        );
    }

    #[test]
    fn test_frame_too_large_display() {
        let err = Error::frame_too_large(1024, 512);
        assert_eq!(err.to_string(), "Frame too large: 1024 bytes (max 512)");
    }

    #[test]
    fn test_is_timeout() {
        assert!(Error::write_timeout(10_000).is_timeout());
        assert!(Error::peer_timeout(60_000).is_timeout());
        assert!(!Error::QueueClosed.is_timeout());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connection("test").is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(Error::peer_timeout(1).is_connection_error());
        assert!(!Error::config("test").is_connection_error());
        assert!(!Error::queue_full(2).is_connection_error());
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::queue_full(2).is_recoverable());
        assert!(!Error::QueueClosed.is_recoverable());
        assert!(!Error::write_timeout(1).is_recoverable());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::ConnectionReset, "reset by peer");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_ws_error() {
        let err: Error = WsError::ConnectionClosed.into();
        assert!(matches!(err, Error::WebSocket(_)));
        assert!(err.is_connection_error());
    }
}
