//! Echo server.
//!
//! Demonstrates:
//! - Binding a `Server` from a JSON or default configuration
//! - Consuming inbound frames through a `PumpHandle`
//! - Sending replies through the outbound queue
//! - Graceful shutdown on Ctrl+C with a 5 second grace period
//!
//! Usage:
//!   cargo run --example echo_server
//!   cargo run --example echo_server -- --debug
//!   cargo run --example echo_server -- --config server.json

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use session_pump::{Error, Result, Server, ServerConfig, Session};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

// ============================================================================
// Args
// ============================================================================

#[derive(Debug, Clone, Default)]
struct Args {
    debug: bool,
    config: Option<String>,
}

impl Args {
    fn parse() -> Self {
        let mut args = Self::default();
        let mut iter = std::env::args().skip(1);
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--debug" => args.debug = true,
                "--config" => args.config = iter.next(),
                _ => {}
            }
        }
        args
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)?;
            ServerConfig::from_json(&json)?
        }
        None => ServerConfig::default(),
    };

    let server = Server::bind(config, Arc::new(echo)).await?;
    println!("Listening on {}", server.ws_url());
    println!("Press Ctrl+C to exit...");

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| Error::connection(format!("signal handler failed: {e}")))?;

    println!("\nShutting down...");
    if !server.shutdown(SHUTDOWN_GRACE).await {
        println!("Some sessions did not close within {SHUTDOWN_GRACE:?}");
    }

    Ok(())
}

// ============================================================================
// Session Handler
// ============================================================================

fn echo(session: Session) {
    info!(conn_id = %session.id(), peer = %session.peer_addr(), "client connected");
    let handle = session.into_handle();

    tokio::spawn(async move {
        while let Some(frame) = handle.recv().await {
            debug!(conn_id = %handle.id(), len = frame.len(), "echoing frame");
            if handle.send(frame.into_payload()).await.is_err() {
                break;
            }
        }

        let stats = handle.stats();
        info!(
            conn_id = %handle.id(),
            received = stats.frames_received,
            sent = stats.frames_sent,
            age_ms = u64::try_from(stats.age.as_millis()).unwrap_or(u64::MAX),
            "client disconnected"
        );
    });
}

// ============================================================================
// Logging
// ============================================================================

fn init_logging(debug: bool) {
    let filter = if debug {
        "session_pump=debug,echo_server=debug"
    } else {
        "session_pump=info,echo_server=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}
