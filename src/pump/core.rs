//! Pump construction and the application-facing handle.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use bytes::Bytes;
use futures_util::{Sink, Stream, StreamExt};
use tokio::task::{JoinError, JoinHandle};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, warn};

use crate::config::PumpConfig;
use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;
use crate::queue::{BoundedQueue, Offer};
use crate::signal::{Doorbell, Latch};

use super::frame::Frame;
use super::read::{self, ReadExit};
use super::stats::{PumpStats, StatsSnapshot};
use super::write::{self, WriteExit};

// ============================================================================
// Shared
// ============================================================================

/// State shared by the two loops and every handle.
///
/// The transport itself is not in here: its sink belongs to the write task
/// and its stream to the read task.
pub(crate) struct Shared {
    pub(crate) id: ConnectionId,
    pub(crate) config: PumpConfig,
    pub(crate) inbound: BoundedQueue<Frame>,
    pub(crate) outbound: BoundedQueue<Bytes>,
    pub(crate) doorbell: Doorbell,
    /// Set by the application to request a graceful close.
    pub(crate) shutdown: Latch,
    /// Set by whichever loop ends first.
    pub(crate) closed: Latch,
    pub(crate) stats: PumpStats,
}

impl Shared {
    fn new(id: ConnectionId, config: PumpConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            id,
            inbound: BoundedQueue::new(config.inbound_capacity(), config.inbound_policy())?,
            outbound: BoundedQueue::new(config.outbound_capacity(), config.outbound_policy())?,
            doorbell: Doorbell::new(),
            shutdown: Latch::new(),
            closed: Latch::new(),
            stats: PumpStats::new(),
            config,
        })
    }
}

// ============================================================================
// PumpExit
// ============================================================================

/// How both loops of a finished pump ended.
#[derive(Debug)]
pub struct PumpExit {
    /// Exit reason of the read loop.
    pub read: ReadExit,
    /// Exit reason of the write loop.
    pub write: WriteExit,
}

// ============================================================================
// Pump
// ============================================================================

/// A running session: one transport, one read task, one write task.
///
/// Dropping a `Pump` does not stop the session; use
/// [`PumpHandle::close`] to request shutdown and [`Pump::join`] to wait.
pub struct Pump {
    handle: PumpHandle,
    read_task: JoinHandle<ReadExit>,
    write_task: JoinHandle<WriteExit>,
}

impl Pump {
    /// Binds a pump to an upgraded transport and starts both loops.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `config` is invalid.
    pub fn spawn<T>(transport: T, config: PumpConfig) -> Result<Self>
    where
        T: Stream<Item = std::result::Result<Message, WsError>>
            + Sink<Message, Error = WsError>
            + Send
            + 'static,
    {
        Self::spawn_with_id(ConnectionId::new(), transport, config)
    }

    /// Same as [`spawn`](Self::spawn) with a caller-chosen identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `config` is invalid.
    pub fn spawn_with_id<T>(id: ConnectionId, transport: T, config: PumpConfig) -> Result<Self>
    where
        T: Stream<Item = std::result::Result<Message, WsError>>
            + Sink<Message, Error = WsError>
            + Send
            + 'static,
    {
        let shared = Arc::new(Shared::new(id, config)?);
        let (sink, stream) = transport.split();

        let write_task = tokio::spawn(write::run(sink, Arc::clone(&shared)));
        let read_task = tokio::spawn(read::run(stream, Arc::clone(&shared)));

        debug!(conn_id = %id, "pump started");

        Ok(Self {
            handle: PumpHandle { shared },
            read_task,
            write_task,
        })
    }

    /// Session identifier.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.handle.id()
    }

    /// Returns a cloneable handle to this session.
    #[inline]
    #[must_use]
    pub fn handle(&self) -> PumpHandle {
        self.handle.clone()
    }

    /// Waits until both loops have finished.
    pub async fn join(self) -> PumpExit {
        let id = self.handle.id();
        let (read, write) = tokio::join!(self.read_task, self.write_task);

        PumpExit {
            read: read.unwrap_or_else(|e| ReadExit::Failed(task_failure(id, "read", e))),
            write: write.unwrap_or_else(|e| WriteExit::Failed(task_failure(id, "write", e))),
        }
    }
}

fn task_failure(id: ConnectionId, side: &str, error: JoinError) -> Error {
    warn!(conn_id = %id, side, error = %error, "pump task did not finish cleanly");
    // A dead task can no longer release its sibling.
    Error::connection(format!("{side} task aborted: {error}"))
}

// ============================================================================
// PumpHandle
// ============================================================================

/// Application-side access to a session.
///
/// Producers call [`send`](Self::send); consumers call
/// [`recv`](Self::recv). Cloning is cheap; all clones refer to the same
/// session.
#[derive(Clone)]
pub struct PumpHandle {
    shared: Arc<Shared>,
}

impl PumpHandle {
    /// Session identifier.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.shared.id
    }

    /// Configuration the pump was spawned with.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PumpConfig {
        &self.shared.config
    }

    /// Queues a payload for transmission and rings the doorbell.
    ///
    /// Waits for space when the outbound policy is `Block`.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] after [`close`](Self::close) or once
    ///   the session has ended
    /// - [`Error::QueueFull`] if full under the `Reject` policy
    pub async fn send(&self, payload: impl Into<Bytes>) -> Result<Offer<Bytes>> {
        self.ensure_open()?;
        let offer = self.shared.outbound.put(payload.into()).await;
        self.after_put(offer)
    }

    /// Queues a payload without waiting for space.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send), and [`Error::QueueFull`] when full
    /// under the `Block` policy.
    pub fn try_send(&self, payload: impl Into<Bytes>) -> Result<Offer<Bytes>> {
        self.ensure_open()?;
        let offer = self.shared.outbound.try_put(payload.into());
        self.after_put(offer)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.shared.shutdown.is_set() || self.shared.closed.is_set() {
            return Err(Error::ConnectionClosed);
        }
        Ok(())
    }

    fn after_put(&self, offer: Result<Offer<Bytes>>) -> Result<Offer<Bytes>> {
        let offer = offer.map_err(|e| match e {
            Error::QueueClosed => Error::ConnectionClosed,
            other => other,
        })?;

        if offer.lost_item() {
            let drops = self.shared.stats.record_outbound_drop();
            warn!(conn_id = %self.shared.id, drops, "outbound queue full, payload dropped");
        }
        if offer.is_enqueued() {
            self.shared.doorbell.ring();
        }

        Ok(offer)
    }

    /// Waits for the next inbound frame.
    ///
    /// Returns `None` once the session has ended and every queued frame
    /// has been consumed.
    pub async fn recv(&self) -> Option<Frame> {
        self.shared.inbound.recv().await
    }

    /// Takes the next inbound frame if one is queued.
    #[must_use]
    pub fn try_recv(&self) -> Option<Frame> {
        self.shared.inbound.get()
    }

    /// Requests a graceful close.
    ///
    /// The write loop sends one close frame and stops; queued outbound
    /// payloads that were not yet drained are discarded. Idempotent.
    pub fn close(&self) {
        if self.shared.shutdown.set() {
            debug!(conn_id = %self.shared.id, "shutdown requested");
        }
    }

    /// Returns `true` once either loop has ended.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.closed.is_set()
    }

    /// Completes once either loop has ended.
    pub async fn closed(&self) {
        self.shared.closed.wait().await;
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }
}

impl std::fmt::Debug for PumpHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PumpHandle")
            .field("id", &self.shared.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
