//! WebSocket listener and per-connection upgrade.
//!
//! # Connection Flow
//!
//! 1. [`Server::bind`] binds the configured address and starts the accept loop
//! 2. Each TCP connection is upgraded on its own task by [`accept_session`];
//!    requests for any path other than the configured one get HTTP 404
//! 3. The upgraded transport is handed to [`Pump::spawn`]
//! 4. The session is registered and passed to the [`SessionHandler`]
//! 5. When both pump loops end, the session is removed from the registry
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │                 Server                   │
//! │  accept loop ──► upgrade task ──► Pump   │
//! │                                   │      │
//! │  registry: ConnectionId → PumpHandle     │
//! └──────────────────────────────────────────┘
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::accept_hdr_async_with_config;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tracing::{debug, error, info, warn};

use crate::config::options::duration_ms::saturating_millis;
use crate::config::{PumpConfig, ServerConfig};
use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;
use crate::pump::{Pump, PumpHandle};
use crate::signal::Latch;

// ============================================================================
// Constants
// ============================================================================

/// Upper bound on the HTTP upgrade exchange.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Types
// ============================================================================

/// Callback invoked once for every established session.
///
/// Runs on the upgrade task; spawn if the work is long-lived.
pub type SessionHandler = Arc<dyn Fn(Session) + Send + Sync>;

/// A freshly established session.
#[derive(Debug, Clone)]
pub struct Session {
    handle: PumpHandle,
    peer_addr: SocketAddr,
}

impl Session {
    /// Handle to the session's pump.
    #[inline]
    #[must_use]
    pub fn handle(&self) -> &PumpHandle {
        &self.handle
    }

    /// Consumes the session, returning its handle.
    #[inline]
    #[must_use]
    pub fn into_handle(self) -> PumpHandle {
        self.handle
    }

    /// Remote address of the TCP connection.
    #[inline]
    #[must_use]
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Session identifier.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.handle.id()
    }
}

// ============================================================================
// Upgrade
// ============================================================================

/// Upgrades one TCP connection and starts a pump on it.
///
/// # Errors
///
/// - [`Error::Config`] if `config` is invalid
/// - [`Error::Connection`] if the upgrade fails, times out or targets the
///   wrong path
pub async fn accept_session(stream: TcpStream, config: &ServerConfig) -> Result<Pump> {
    config.validate()?;

    let expected_path = config.path.as_str();
    let callback = |request: &Request, response: Response| {
        if request.uri().path() == expected_path {
            Ok(response)
        } else {
            Err(not_found(request.uri().path()))
        }
    };

    let ws_config = websocket_config(&config.pump);
    let upgrade = accept_hdr_async_with_config(stream, callback, Some(ws_config));

    let ws_stream = timeout(HANDSHAKE_TIMEOUT, upgrade)
        .await
        .map_err(|_| Error::connection("WebSocket upgrade timed out"))?
        .map_err(|e| Error::connection(format!("WebSocket upgrade failed: {e}")))?;

    Pump::spawn(ws_stream, config.pump.clone())
}

fn websocket_config(pump: &PumpConfig) -> WebSocketConfig {
    WebSocketConfig::default()
        .max_message_size(Some(pump.max_frame_size()))
        .max_frame_size(Some(pump.max_frame_size()))
}

fn not_found(path: &str) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(format!("no WebSocket endpoint at {path}")));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

// ============================================================================
// Server
// ============================================================================

/// Accepts WebSocket sessions and keeps track of the live ones.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use session_pump::{Server, ServerConfig, Session};
///
/// # async fn run() -> session_pump::Result<()> {
/// let server = Server::bind(
///     ServerConfig::default(),
///     Arc::new(|session: Session| {
///         let handle = session.into_handle();
///         tokio::spawn(async move {
///             while let Some(frame) = handle.recv().await {
///                 let _ = handle.send(frame.into_payload()).await;
///             }
///         });
///     }),
/// )
/// .await?;
///
/// println!("listening on {}", server.ws_url());
/// server.shutdown(Duration::from_secs(5)).await;
/// # Ok(())
/// # }
/// ```
pub struct Server {
    config: ServerConfig,
    local_addr: SocketAddr,
    handler: SessionHandler,
    sessions: RwLock<FxHashMap<ConnectionId, PumpHandle>>,
    stopping: Latch,
}

// ============================================================================
// Server - Constructor
// ============================================================================

impl Server {
    /// Binds the listener and starts the accept loop.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `config` is invalid
    /// - [`Error::Io`] if binding fails
    pub async fn bind(config: ServerConfig, handler: SessionHandler) -> Result<Arc<Self>> {
        config.validate()?;

        let listener = TcpListener::bind(config.bind).await?;
        let local_addr = listener.local_addr()?;

        let server = Arc::new(Self {
            config,
            local_addr,
            handler,
            sessions: RwLock::new(FxHashMap::default()),
            stopping: Latch::new(),
        });

        tokio::spawn(Arc::clone(&server).accept_loop(listener));

        info!(addr = %local_addr, path = %server.config.path, "server started");

        Ok(server)
    }
}

// ============================================================================
// Server - Public API
// ============================================================================

impl Server {
    /// Address the listener is bound to.
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// URL clients connect to.
    ///
    /// Format: `ws://{addr}{path}`
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}{}", self.local_addr, self.config.path)
    }

    /// Number of live sessions.
    #[inline]
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Handle to a live session.
    #[must_use]
    pub fn session(&self, id: ConnectionId) -> Option<PumpHandle> {
        self.sessions.read().get(&id).cloned()
    }

    /// Stops accepting and asks every live session to close.
    ///
    /// Waits up to `grace` for the sessions to end. Returns `true` if all
    /// of them did.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        if self.stopping.set() {
            info!("server shutting down");
        }

        let handles: Vec<PumpHandle> = self.sessions.read().values().cloned().collect();
        for handle in &handles {
            handle.close();
        }

        let all_closed = join_all(handles.iter().map(|handle| handle.closed()));
        let finished = timeout(grace, all_closed).await.is_ok();

        if finished {
            info!(sessions = handles.len(), "server shutdown complete");
        } else {
            warn!(grace_ms = saturating_millis(grace), "sessions still open after grace period");
        }

        finished
    }
}

// ============================================================================
// Server - Accept Loop
// ============================================================================

impl Server {
    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        debug!("accept loop started");

        loop {
            tokio::select! {
                biased;

                () = self.stopping.wait() => break,

                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        tokio::spawn(Arc::clone(&self).serve(stream, addr));
                    }
                    Err(e) => error!(error = %e, "accept failed"),
                },
            }
        }

        debug!("accept loop terminated");
    }

    /// Upgrades one connection and supervises its pump until it ends.
    async fn serve(self: Arc<Self>, stream: TcpStream, addr: SocketAddr) {
        debug!(%addr, "new TCP connection");

        let pump = match accept_session(stream, &self.config).await {
            Ok(pump) => pump,
            Err(e) => {
                warn!(%addr, error = %e, "upgrade rejected");
                return;
            }
        };

        let id = pump.id();
        let handle = pump.handle();
        self.sessions.write().insert(id, handle.clone());

        // Shutdown may have snapshotted the registry before this insert.
        if self.stopping.is_set() {
            handle.close();
        }

        info!(conn_id = %id, %addr, "session established");
        (self.handler)(Session {
            handle,
            peer_addr: addr,
        });

        let exit = pump.join().await;
        self.sessions.write().remove(&id);

        if exit.read.is_graceful() {
            debug!(conn_id = %id, read = ?exit.read, write = ?exit.write, "session ended");
        } else {
            warn!(conn_id = %id, read = ?exit.read, write = ?exit.write, "session ended abnormally");
        }
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("local_addr", &self.local_addr)
            .field("path", &self.config.path)
            .field("sessions", &self.session_count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::{IpAddr, Ipv4Addr};

    use bytes::Bytes;
    use futures_util::{SinkExt, StreamExt};
    use tokio::sync::mpsc;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::{Error as WsError, Message};

    fn local_config() -> ServerConfig {
        ServerConfig::new(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0))
    }

    /// Server whose handler forwards every session to a channel.
    async fn forwarding_server(
        config: ServerConfig,
    ) -> (Arc<Server>, mpsc::UnboundedReceiver<Session>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handler: SessionHandler = Arc::new(move |session| {
            let _ = tx.send(session);
        });
        let server = Server::bind(config, handler).await.expect("bind should succeed");
        (server, rx)
    }

    #[tokio::test]
    async fn test_bind_reports_address_and_url() {
        let (server, _sessions) = forwarding_server(local_config()).await;

        assert_eq!(server.local_addr().ip(), IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert!(server.local_addr().port() > 0);
        assert_eq!(
            server.ws_url(),
            format!("ws://127.0.0.1:{}/ws", server.local_addr().port())
        );
        assert_eq!(server.session_count(), 0);
        assert!(server.shutdown(Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn test_bind_rejects_invalid_config() {
        let config = local_config().with_path("ws");
        let handler: SessionHandler = Arc::new(|_: Session| {});
        assert!(matches!(
            Server::bind(config, handler).await,
            Err(Error::Config { .. })
        ));
    }

    #[tokio::test]
    async fn test_session_round_trip() {
        let (server, mut sessions) = forwarding_server(local_config()).await;

        let (mut client, _) = connect_async(server.ws_url()).await.expect("connect");
        let session = sessions.recv().await.expect("session");
        assert_eq!(server.session_count(), 1);
        assert!(server.session(session.id()).is_some());

        client.send(Message::text("hello")).await.unwrap();
        let frame = session.handle().recv().await.expect("frame");
        assert_eq!(frame.as_text(), Some("hello"));

        let _ = session.handle().send(Bytes::from_static(b"world")).await.unwrap();
        let reply = client.next().await.expect("reply").unwrap();
        assert_eq!(reply, Message::Binary(Bytes::from_static(b"world")));

        client.close(None).await.unwrap();
        session.handle().closed().await;
        assert!(server.shutdown(Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn test_wrong_path_gets_404() {
        let (server, _sessions) = forwarding_server(local_config()).await;
        let url = format!("ws://{}/elsewhere", server.local_addr());

        match connect_async(url).await {
            Err(WsError::Http(response)) => assert_eq!(response.status(), StatusCode::NOT_FOUND),
            other => panic!("expected 404, got {other:?}"),
        }
        assert_eq!(server.session_count(), 0);
    }

    #[tokio::test]
    async fn test_oversized_frame_ends_session() {
        let pump = PumpConfig::builder().max_frame_size(8).build().unwrap();
        let (server, mut sessions) = forwarding_server(local_config().with_pump(pump)).await;

        let (mut client, _) = connect_async(server.ws_url()).await.expect("connect");
        let session = sessions.recv().await.expect("session");

        client.send(Message::binary(vec![0u8; 64])).await.unwrap();
        session.handle().closed().await;
        assert_eq!(session.handle().recv().await, None);
    }

    #[tokio::test]
    async fn test_shutdown_closes_live_sessions() {
        let (server, mut sessions) = forwarding_server(local_config()).await;

        let (mut client, _) = connect_async(server.ws_url()).await.expect("connect");
        let session = sessions.recv().await.expect("session");

        assert!(server.shutdown(Duration::from_secs(5)).await);
        assert!(session.handle().is_closed());

        match client.next().await {
            Some(Ok(Message::Close(_))) => {}
            other => panic!("expected close frame, got {other:?}"),
        }

        // No new sessions after shutdown.
        assert!(connect_async(server.ws_url()).await.is_err());
    }
}
