//! WebSocket listener and session upgrade.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `server` | [`Server`] accept loop, [`accept_session`] upgrade |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket listener and per-connection upgrade.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use server::{Server, Session, SessionHandler, accept_session};
