//! Write loop: outbound queue → transport.
//!
//! The write loop is the only code that ever touches the transport sink.
//! It multiplexes four event sources, checked in this order whenever more
//! than one is ready:
//!
//! 1. shutdown latch: send one close frame, stop
//! 2. closed latch (read loop ended): close the sink, stop
//! 3. doorbell: drain the whole outbound queue in one write
//! 4. liveness ticker: send one ping
//!
//! A drain runs to completion inside its arm, so a ping can never land in
//! the middle of a drain.

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::{Sink, SinkExt};
use tokio::time::{Instant, MissedTickBehavior, interval_at, timeout};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, trace, warn};

use crate::config::OutboundFraming;
use crate::config::options::duration_ms::saturating_millis;
use crate::error::{Error, Result};

use super::core::Shared;

// ============================================================================
// WriteExit
// ============================================================================

/// Why the write loop stopped.
#[derive(Debug)]
pub enum WriteExit {
    /// Shutdown was requested; a close frame was attempted.
    Shutdown,
    /// The read loop ended the session first.
    PeerGone,
    /// A write failed or exceeded the write deadline.
    Failed(Error),
}

// ============================================================================
// Write Loop
// ============================================================================

/// Runs the write loop until the session ends.
///
/// Always marks the session closed and closes the outbound queue on exit.
pub(crate) async fn run<K>(mut sink: K, shared: Arc<Shared>) -> WriteExit
where
    K: Sink<Message, Error = WsError> + Unpin,
{
    let exit = write_frames(&mut sink, &shared).await;

    shared.closed.set();
    shared.outbound.close();

    match &exit {
        WriteExit::Shutdown => debug!(conn_id = %shared.id, "session shut down"),
        WriteExit::PeerGone => debug!(conn_id = %shared.id, "write loop stopped by read side"),
        WriteExit::Failed(e) => warn!(conn_id = %shared.id, error = %e, "write loop failed"),
    }

    exit
}

async fn write_frames<K>(sink: &mut K, shared: &Shared) -> WriteExit
where
    K: Sink<Message, Error = WsError> + Unpin,
{
    let write_wait = shared.config.write_wait();
    let period = shared.config.ping_period();

    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            () = shared.shutdown.wait() => {
                if let Err(e) = with_deadline(write_wait, sink.send(Message::Close(None))).await {
                    debug!(conn_id = %shared.id, error = %e, "close frame not delivered");
                }
                return WriteExit::Shutdown;
            }

            () = shared.closed.wait() => {
                match timeout(write_wait, sink.close()).await {
                    Ok(Ok(())) => trace!(conn_id = %shared.id, "sink closed"),
                    Ok(Err(e)) => debug!(conn_id = %shared.id, error = %e, "sink close failed"),
                    Err(_) => debug!(conn_id = %shared.id, "sink close timed out"),
                }
                return WriteExit::PeerGone;
            }

            () = shared.doorbell.wait() => {
                if let Err(e) = drain(sink, shared).await {
                    return WriteExit::Failed(e);
                }
            }

            _ = ticker.tick() => {
                if let Err(e) = with_deadline(write_wait, sink.send(Message::Ping(Bytes::new()))).await {
                    return WriteExit::Failed(e);
                }
                shared.stats.record_ping();
                trace!(conn_id = %shared.id, "ping sent");
            }
        }
    }
}

/// Empties the outbound queue onto the transport under one write deadline.
///
/// Returns the number of payloads written; zero writes nothing.
async fn drain<K>(sink: &mut K, shared: &Shared) -> Result<usize>
where
    K: Sink<Message, Error = WsError> + Unpin,
{
    let mut payloads = Vec::new();
    while let Some(payload) = shared.outbound.get() {
        payloads.push(payload);
    }
    if payloads.is_empty() {
        return Ok(0);
    }

    let count = payloads.len();
    let write_wait = shared.config.write_wait();

    match shared.config.framing() {
        OutboundFraming::Coalesced => {
            let message = Message::Binary(coalesce(payloads));
            with_deadline(write_wait, sink.send(message)).await?;
        }
        OutboundFraming::Individual => {
            with_deadline(write_wait, async {
                for payload in payloads {
                    sink.feed(Message::Binary(payload)).await?;
                }
                sink.flush().await
            })
            .await?;
        }
    }

    shared.stats.record_batch(count);
    trace!(conn_id = %shared.id, count, "outbound queue drained");

    Ok(count)
}

/// Concatenates payloads in order into one buffer.
fn coalesce(payloads: Vec<Bytes>) -> Bytes {
    if payloads.len() == 1 {
        return payloads.into_iter().next().unwrap_or_default();
    }

    let total = payloads.iter().map(Bytes::len).sum();
    let mut buf = BytesMut::with_capacity(total);
    for payload in &payloads {
        buf.extend_from_slice(payload);
    }
    buf.freeze()
}

/// Bounds one transport operation by the write deadline.
async fn with_deadline<F>(wait: Duration, op: F) -> Result<()>
where
    F: Future<Output = std::result::Result<(), WsError>>,
{
    match timeout(wait, op).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(Error::WebSocket(e)),
        Err(_) => Err(Error::write_timeout(saturating_millis(wait))),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::sync::mpsc::error::TryRecvError;

    use crate::config::PumpConfig;
    use crate::pump::core::Pump;
    use crate::pump::mock::MockTransport;
    use crate::pump::read::ReadExit;

    fn binary(data: &'static [u8]) -> Message {
        Message::Binary(Bytes::from_static(data))
    }

    #[test]
    fn test_coalesce_preserves_order() {
        let out = coalesce(vec![
            Bytes::from_static(b"ab"),
            Bytes::from_static(b""),
            Bytes::from_static(b"cd"),
        ]);
        assert_eq!(out, Bytes::from_static(b"abcd"));
        assert_eq!(coalesce(vec![Bytes::from_static(b"x")]), Bytes::from_static(b"x"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_doorbell_drains_queue_into_one_frame() {
        let (transport, mut peer) = MockTransport::pair();
        let pump = Pump::spawn(transport, PumpConfig::default()).unwrap();
        let handle = pump.handle();

        let _ = handle.send(&b"X"[..]).await.unwrap();
        let _ = handle.send(&b"Y"[..]).await.unwrap();

        assert_eq!(peer.next_written().await, Some(binary(b"XY")));
        assert!(matches!(peer.try_next_written(), Err(TryRecvError::Empty)));

        let stats = handle.stats();
        assert_eq!(stats.frames_sent, 2);
        assert_eq!(stats.batches_written, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_individual_framing_writes_each_payload() {
        let (transport, mut peer) = MockTransport::pair();
        let config = PumpConfig::builder()
            .framing(OutboundFraming::Individual)
            .build()
            .unwrap();
        let pump = Pump::spawn(transport, config).unwrap();
        let handle = pump.handle();

        let _ = handle.send(&b"X"[..]).await.unwrap();
        let _ = handle.send(&b"Y"[..]).await.unwrap();

        assert_eq!(peer.next_written().await, Some(binary(b"X")));
        assert_eq!(peer.next_written().await, Some(binary(b"Y")));
        assert_eq!(handle.stats().batches_written, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_ping_inside_a_drain() {
        let (transport, mut peer) = MockTransport::pair();
        let config = PumpConfig::default();
        let period = config.ping_period();
        let pump = Pump::spawn(transport, config).unwrap();
        let handle = pump.handle();

        // Let both loops park on their first suspension point.
        tokio::task::yield_now().await;

        let _ = handle.send(&b"X"[..]).await.unwrap();
        let _ = handle.send(&b"Y"[..]).await.unwrap();
        tokio::time::advance(period + Duration::from_millis(1)).await;

        assert_eq!(peer.next_written().await, Some(binary(b"XY")));
        assert!(matches!(peer.next_written().await, Some(Message::Ping(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_with_empty_queue_sends_one_ping() {
        let (transport, mut peer) = MockTransport::pair();
        let config = PumpConfig::default();
        let period = config.ping_period();
        let pump = Pump::spawn(transport, config).unwrap();
        let handle = pump.handle();

        tokio::task::yield_now().await;
        tokio::time::advance(period + Duration::from_millis(1)).await;

        assert!(matches!(peer.next_written().await, Some(Message::Ping(_))));
        assert!(matches!(peer.try_next_written(), Err(TryRecvError::Empty)));
        assert_eq!(handle.stats().pings_sent, 1);
        assert_eq!(handle.stats().frames_sent, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_sends_single_close_and_no_data() {
        let (transport, mut peer) = MockTransport::pair();
        let pump = Pump::spawn(transport, PumpConfig::default()).unwrap();
        let handle = pump.handle();

        // Queue data, then request shutdown before the write loop runs.
        let _ = handle.send(&b"late"[..]).await.unwrap();
        handle.close();
        assert!(matches!(handle.send(&b"later"[..]).await, Err(Error::ConnectionClosed)));

        let exit = pump.join().await;
        assert!(matches!(exit.write, WriteExit::Shutdown));
        assert!(matches!(exit.read, ReadExit::LocalClose));

        assert_eq!(peer.next_written().await, Some(Message::Close(None)));
        assert!(matches!(
            peer.try_next_written(),
            Err(TryRecvError::Empty | TryRecvError::Disconnected)
        ));
        assert_eq!(handle.stats().frames_sent, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_after_delivery() {
        let (transport, mut peer) = MockTransport::pair();
        let pump = Pump::spawn(transport, PumpConfig::default()).unwrap();
        let handle = pump.handle();

        let _ = handle.send(&b"hello"[..]).await.unwrap();
        assert_eq!(peer.next_written().await, Some(binary(b"hello")));

        handle.close();
        let exit = pump.join().await;

        assert!(matches!(exit.write, WriteExit::Shutdown));
        assert_eq!(peer.next_written().await, Some(Message::Close(None)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_write_times_out_and_closes_session() {
        let (transport, peer) = MockTransport::pair();
        let config = PumpConfig::builder()
            .write_wait(Duration::from_secs(3))
            .build()
            .unwrap();
        let pump = Pump::spawn(transport, config).unwrap();
        let handle = pump.handle();
        let start = Instant::now();

        peer.stall_writes();
        let _ = handle.send(&b"stuck"[..]).await.unwrap();

        let exit = pump.join().await;
        let elapsed = start.elapsed();

        assert!(matches!(
            exit.write,
            WriteExit::Failed(Error::WriteTimeout { timeout_ms: 3000 })
        ));
        assert!(matches!(exit.read, ReadExit::LocalClose));
        assert!(elapsed >= Duration::from_secs(3));
        assert!(elapsed < Duration::from_secs(4));
        assert!(handle.is_closed());
        assert!(matches!(handle.send(&b"more"[..]).await, Err(Error::ConnectionClosed)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_error_ends_session() {
        let (transport, peer) = MockTransport::pair();
        let pump = Pump::spawn(transport, PumpConfig::default()).unwrap();
        let handle = pump.handle();

        peer.fail_writes();
        let _ = handle.send(&b"doomed"[..]).await.unwrap();

        let exit = pump.join().await;
        assert!(matches!(exit.write, WriteExit::Failed(Error::WebSocket(_))));
        assert!(matches!(exit.read, ReadExit::LocalClose));
    }
}
