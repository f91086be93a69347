//! Read loop: transport → inbound queue.
//!
//! Receives frames until the peer goes away, the peer stays silent for
//! longer than the peer timeout, or the write loop ends the session. Every
//! received frame (data or control) pushes the read deadline forward.

// ============================================================================
// Imports
// ============================================================================

use std::io::ErrorKind;
use std::pin::pin;
use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use tokio::time::{Instant, sleep};
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, trace, warn};

use crate::config::options::duration_ms::saturating_millis;
use crate::error::Error;
use crate::queue::Offer;

use super::core::Shared;
use super::frame::Frame;

// ============================================================================
// ReadExit
// ============================================================================

/// Why the read loop stopped.
#[derive(Debug)]
pub enum ReadExit {
    /// Peer sent a close frame.
    PeerClosed(Option<CloseFrame>),
    /// Transport stream ended without a close frame.
    StreamEnded,
    /// The write loop ended the session first.
    LocalClose,
    /// Receive error, oversized frame, inbound overflow, or peer timeout.
    Failed(Error),
}

impl ReadExit {
    /// Returns `true` for closures that are part of normal operation.
    ///
    /// Normal and going-away close codes, a missing close code, local
    /// close, and abrupt disconnects (reset, EOF) all count as expected.
    #[must_use]
    pub fn is_graceful(&self) -> bool {
        match self {
            Self::PeerClosed(None) | Self::StreamEnded | Self::LocalClose => true,
            Self::PeerClosed(Some(frame)) => {
                matches!(frame.code, CloseCode::Normal | CloseCode::Away)
            }
            Self::Failed(Error::WebSocket(e)) => is_expected_disconnect(e),
            Self::Failed(_) => false,
        }
    }
}

/// Transport errors that only mean "the peer is gone".
fn is_expected_disconnect(error: &WsError) -> bool {
    match error {
        WsError::ConnectionClosed | WsError::AlreadyClosed => true,
        WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => true,
        WsError::Io(io) => matches!(
            io.kind(),
            ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted
                | ErrorKind::BrokenPipe
                | ErrorKind::UnexpectedEof
        ),
        _ => false,
    }
}

// ============================================================================
// Read Loop
// ============================================================================

/// Runs the read loop until the session ends.
///
/// Always marks the session closed and closes the inbound queue on exit.
pub(crate) async fn run<S>(mut stream: S, shared: Arc<Shared>) -> ReadExit
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    let exit = read_frames(&mut stream, &shared).await;

    shared.closed.set();
    shared.inbound.close();
    log_exit(&shared, &exit);

    exit
}

async fn read_frames<S>(stream: &mut S, shared: &Shared) -> ReadExit
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    let peer_timeout = shared.config.peer_timeout();
    let max_frame_size = shared.config.max_frame_size();
    let mut deadline = pin!(sleep(peer_timeout));

    loop {
        let message = tokio::select! {
            biased;

            () = shared.closed.wait() => return ReadExit::LocalClose,

            // Frames already buffered by the transport win over an elapsed
            // deadline.
            next = stream.next() => match next {
                Some(Ok(message)) => message,
                Some(Err(e)) => return ReadExit::Failed(Error::WebSocket(e)),
                None => return ReadExit::StreamEnded,
            },

            () = deadline.as_mut() => {
                return ReadExit::Failed(Error::peer_timeout(saturating_millis(peer_timeout)));
            }
        };

        deadline.as_mut().reset(Instant::now() + peer_timeout);

        let message = match message {
            Message::Close(frame) => return ReadExit::PeerClosed(frame),
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {
                trace!(conn_id = %shared.id, "control frame received");
                continue;
            }
            data => data,
        };

        if message.len() > max_frame_size {
            return ReadExit::Failed(Error::frame_too_large(message.len(), max_frame_size));
        }

        let Some(frame) = Frame::from_message(message) else {
            continue;
        };

        if let Err(exit) = enqueue(shared, frame).await {
            return exit;
        }

        // Time parked on inbound backpressure is not peer silence.
        deadline.as_mut().reset(Instant::now() + peer_timeout);
    }
}

/// Pushes one frame into the inbound queue according to its policy.
async fn enqueue(shared: &Shared, frame: Frame) -> Result<(), ReadExit> {
    let len = frame.len();

    let offer = tokio::select! {
        biased;
        () = shared.closed.wait() => return Err(ReadExit::LocalClose),
        offer = shared.inbound.put(frame) => offer,
    };

    match offer {
        Ok(Offer::Accepted) => {
            shared.stats.record_received();
            trace!(conn_id = %shared.id, len, "frame queued");
            Ok(())
        }
        Ok(Offer::Displaced(_)) => {
            shared.stats.record_received();
            let drops = shared.stats.record_inbound_drop();
            warn!(conn_id = %shared.id, drops, "inbound queue full, oldest frame dropped");
            Ok(())
        }
        Ok(Offer::Dropped(_)) => {
            let drops = shared.stats.record_inbound_drop();
            warn!(conn_id = %shared.id, drops, "inbound queue full, frame dropped");
            Ok(())
        }
        Err(Error::QueueFull { capacity }) => {
            Err(ReadExit::Failed(Error::inbound_overflow(capacity)))
        }
        Err(Error::QueueClosed) => Err(ReadExit::LocalClose),
        Err(e) => Err(ReadExit::Failed(e)),
    }
}

fn log_exit(shared: &Shared, exit: &ReadExit) {
    let conn_id = &shared.id;

    match exit {
        ReadExit::PeerClosed(Some(frame)) if !exit.is_graceful() => {
            warn!(
                %conn_id,
                code = u16::from(frame.code),
                reason = frame.reason.as_str(),
                "peer closed with unexpected code"
            );
        }
        ReadExit::PeerClosed(_) => debug!(%conn_id, "peer closed the session"),
        ReadExit::StreamEnded => debug!(%conn_id, "transport stream ended"),
        ReadExit::LocalClose => debug!(%conn_id, "read loop stopped by local close"),
        ReadExit::Failed(e) if exit.is_graceful() => {
            debug!(%conn_id, error = %e, "peer disconnected");
        }
        ReadExit::Failed(e) => warn!(%conn_id, error = %e, "read loop failed"),
    }
}

// ============================================================================
// Tests
// ============================================================================
