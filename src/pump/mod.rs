//! Per-connection pump.
//!
//! A [`Pump`] owns one upgraded transport and runs two tasks over it:
//!
//! | Task | Reads from | Writes to |
//! |------|-----------|-----------|
//! | read loop | transport stream | inbound queue |
//! | write loop | outbound queue, doorbell, ticker | transport sink |
//!
//! The application talks to the session only through a [`PumpHandle`].

// ============================================================================
// Submodules
// ============================================================================

mod core;
mod frame;
mod read;
mod stats;
mod write;

#[cfg(test)]
mod mock;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::{Pump, PumpExit, PumpHandle};
pub use frame::{Frame, FrameKind};
pub use read::ReadExit;
pub use stats::StatsSnapshot;
pub use write::WriteExit;
