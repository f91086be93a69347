//! Session Pump - duplex WebSocket session pump.
//!
//! This library binds one upgraded WebSocket connection to a pair of tasks
//! that decouple inbound reception from outbound transmission, apply
//! backpressure through bounded queues, and keep the session alive with
//! pings and a read deadline.
//!
//! # Architecture
//!
//! ```text
//!            ┌──────────── Pump (one per session) ────────────┐
//!            │                                                │
//!  peer ───► │ read loop ──► inbound queue ──► PumpHandle::recv
//!            │                                                │
//!  peer ◄─── │ write loop ◄── outbound queue ◄── PumpHandle::send
//!            │     ▲                                   │      │
//!            │     └──────────── doorbell ◄────────────┘      │
//!            └────────────────────────────────────────────────┘
//! ```
//!
//! Key design principles:
//!
//! - The write task owns the transport sink; nothing else writes to it
//! - The doorbell carries no data and coalesces repeated rings
//! - Either loop ending closes the session for both
//! - Every write is bounded by a deadline; silence from the peer is bounded
//!   by the read deadline
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use session_pump::{Result, Server, ServerConfig, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let server = Server::bind(
//!         ServerConfig::default(),
//!         Arc::new(|session: Session| {
//!             let handle = session.into_handle();
//!             tokio::spawn(async move {
//!                 while let Some(frame) = handle.recv().await {
//!                     let _ = handle.send(frame.into_payload()).await;
//!                 }
//!             });
//!         }),
//!     )
//!     .await?;
//!
//!     println!("listening on {}", server.ws_url());
//!     tokio::signal::ctrl_c().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | [`PumpConfig`], [`PumpConfigBuilder`], [`ServerConfig`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | [`ConnectionId`] |
//! | [`pump`] | [`Pump`], [`PumpHandle`], frames and exit reasons |
//! | [`queue`] | [`BoundedQueue`] and [`OverflowPolicy`] |
//! | [`signal`] | [`Doorbell`] and [`Latch`] |
//! | [`transport`] | [`Server`] and [`accept_session`] |

// ============================================================================
// Modules
// ============================================================================

/// Pump and server configuration.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Session identifiers.
pub mod identifiers;

/// Per-connection read and write loops.
pub mod pump;

/// Bounded FIFO with overflow policies.
pub mod queue;

/// Doorbell and latch wake-up primitives.
pub mod signal;

/// WebSocket listener and upgrade.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Configuration
pub use config::{OutboundFraming, PumpConfig, PumpConfigBuilder, ServerConfig};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::ConnectionId;

// Pump types
pub use pump::{Frame, FrameKind, Pump, PumpExit, PumpHandle, ReadExit, StatsSnapshot, WriteExit};

// Queue types
pub use queue::{BoundedQueue, Offer, OverflowPolicy};

// Signals
pub use signal::{Doorbell, Latch};

// Transport
pub use transport::{Server, Session, SessionHandler, accept_session};
