//! In-memory transport for driving the pump loops in tests.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use futures_util::{Sink, Stream};
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, error::TryRecvError};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

type Incoming = Result<Message, WsError>;

#[derive(Debug, Default)]
struct Flags {
    stall: AtomicBool,
    fail: AtomicBool,
    closed: AtomicBool,
}

/// Transport side handed to the pump.
pub(crate) struct MockTransport {
    incoming: UnboundedReceiver<Incoming>,
    outgoing: UnboundedSender<Message>,
    flags: Arc<Flags>,
}

/// Test side: plays the remote peer.
pub(crate) struct MockPeer {
    incoming: Mutex<Option<UnboundedSender<Incoming>>>,
    written: UnboundedReceiver<Message>,
    flags: Arc<Flags>,
}

impl MockTransport {
    pub(crate) fn pair() -> (Self, MockPeer) {
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let flags = Arc::new(Flags::default());

        let transport = Self {
            incoming: in_rx,
            outgoing: out_tx,
            flags: Arc::clone(&flags),
        };
        let peer = MockPeer {
            incoming: Mutex::new(Some(in_tx)),
            written: out_rx,
            flags,
        };
        (transport, peer)
    }
}

impl Stream for MockTransport {
    type Item = Incoming;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.incoming.poll_recv(cx)
    }
}

impl Sink<Message> for MockTransport {
    type Error = WsError;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), WsError>> {
        if self.flags.fail.load(Ordering::SeqCst) {
            return Poll::Ready(Err(WsError::ConnectionClosed));
        }
        if self.flags.stall.load(Ordering::SeqCst) {
            return Poll::Pending;
        }
        Poll::Ready(Ok(()))
    }

    fn start_send(self: Pin<&mut Self>, item: Message) -> Result<(), WsError> {
        if self.flags.closed.load(Ordering::SeqCst) {
            return Err(WsError::AlreadyClosed);
        }
        self.outgoing.send(item).map_err(|_| WsError::ConnectionClosed)
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), WsError>> {
        if self.flags.stall.load(Ordering::SeqCst) {
            return Poll::Pending;
        }
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), WsError>> {
        self.flags.closed.store(true, Ordering::SeqCst);
        Poll::Ready(Ok(()))
    }
}

impl MockPeer {
    /// Makes `message` arrive at the pump's read loop.
    pub(crate) fn deliver(&self, message: Message) {
        self.push(Ok(message));
    }

    /// Makes the next read fail with `error`.
    pub(crate) fn fail(&self, error: WsError) {
        self.push(Err(error));
    }

    fn push(&self, item: Incoming) {
        if let Some(tx) = self.incoming.lock().as_ref() {
            let _ = tx.send(item);
        }
    }

    /// Ends the inbound stream without a close frame.
    pub(crate) fn hang_up(&self) {
        self.incoming.lock().take();
    }

    /// Next message the pump wrote, or `None` once the transport is gone.
    pub(crate) async fn next_written(&mut self) -> Option<Message> {
        self.written.recv().await
    }

    pub(crate) fn try_next_written(&mut self) -> Result<Message, TryRecvError> {
        self.written.try_recv()
    }

    /// Every later write hangs forever.
    pub(crate) fn stall_writes(&self) {
        self.flags.stall.store(true, Ordering::SeqCst);
    }

    /// Every later write fails.
    pub(crate) fn fail_writes(&self) {
        self.flags.fail.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once the pump closed the sink.
    pub(crate) fn sink_closed(&self) -> bool {
        self.flags.closed.load(Ordering::SeqCst)
    }
}
