//! Pump and server configuration.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `options` | [`PumpConfig`] limits and timers |
//! | `builder` | Fluent [`PumpConfigBuilder`] |
//! | `server` | [`ServerConfig`] for the listener |

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder for pump configuration.
pub mod builder;

/// Per-session limits and timers.
pub mod options;

/// Listener settings.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::PumpConfigBuilder;
pub use options::{OutboundFraming, PumpConfig};
pub use server::ServerConfig;
