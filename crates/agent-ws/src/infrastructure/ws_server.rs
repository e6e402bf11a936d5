//! WebSocket server: accept loop and per-session task management.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Accepting incoming TCP connections from controllers.
//! 3. Upgrading each connection to a WebSocket session.
//! 4. Running each [`Session`] in its own Tokio task.
//! 5. Gracefully shutting down when the `running` flag is cleared.
//!
//! # Isolation between sessions
//!
//! Sessions share nothing but the `Arc<CommandDispatcher>`, which is
//! stateless.  Automation calls run on Tokio's blocking pool, so a slow or
//! hung `xdotool` stalls only the session that issued it.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use agent_core::dispatch::CommandDispatcher;
use anyhow::Context;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::{accept_async_with_config, tungstenite::protocol::WebSocketConfig};
use tracing::{error, info, warn};

use crate::domain::AgentConfig;
use crate::infrastructure::session::Session;

/// How often the accept loop re-checks the shutdown flag.
const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds `config.bind_addr` and serves controllers until `running` is set
/// to `false`.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot be bound (e.g., the port is
/// already in use or the process lacks permission to bind).
pub async fn run_server(
    config: AgentConfig,
    dispatcher: Arc<CommandDispatcher>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind WebSocket listener on {}", config.bind_addr))?;

    serve(listener, &config, dispatcher, running).await
}

/// Runs the accept loop on an already-bound listener.
///
/// Each accepted connection is handed off to a dedicated Tokio task so that
/// one slow controller never blocks others.
///
/// # Errors
///
/// Returns an error only if the listener's local address cannot be read.
/// Individual accept failures are logged and the loop continues.
pub async fn serve(
    listener: TcpListener,
    config: &AgentConfig,
    dispatcher: Arc<CommandDispatcher>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let local_addr = listener
        .local_addr()
        .context("failed to read listener address")?;
    info!(
        "agent listening on ws://{local_addr} (unknown commands: {})",
        dispatcher.unknown_policy()
    );

    let ws_config = websocket_config(config);

    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        // Short timeout so the shutdown flag is polled even when idle.
        match timeout(SHUTDOWN_POLL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                info!("new controller connection from {peer_addr}");
                let dispatcher = Arc::clone(&dispatcher);
                tokio::spawn(async move {
                    handle_connection(stream, peer_addr, ws_config, dispatcher).await;
                });
            }
            Ok(Err(e)) => {
                // Transient (e.g. too many open file descriptors).
                error!("accept error: {e}");
            }
            Err(_) => {}
        }
    }

    Ok(())
}

// ── Per-connection handler ────────────────────────────────────────────────────

/// Entry point of each per-connection task.  Logs the outcome.
async fn handle_connection(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    ws_config: WebSocketConfig,
    dispatcher: Arc<CommandDispatcher>,
) {
    match run_connection(raw_stream, peer_addr, ws_config, dispatcher).await {
        Ok(processed) => info!("connection {peer_addr} closed after {processed} message(s)"),
        Err(e) => warn!("connection {peer_addr} closed with error: {e:#}"),
    }
}

/// Completes the WebSocket handshake and runs the session to completion.
///
/// # Errors
///
/// Returns an error if the handshake fails or the transport fails mid-session.
async fn run_connection(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    ws_config: WebSocketConfig,
    dispatcher: Arc<CommandDispatcher>,
) -> anyhow::Result<u64> {
    let ws_stream = accept_async_with_config(raw_stream, Some(ws_config))
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;

    Session::new(ws_stream, peer_addr).run(dispatcher).await
}

/// Transport limits derived from the agent configuration.
fn websocket_config(config: &AgentConfig) -> WebSocketConfig {
    let mut ws_config = WebSocketConfig::default();
    ws_config.max_message_size = Some(config.max_message_size);
    ws_config.max_frame_size = Some(config.max_message_size);
    ws_config
}

// ── Tests ─────────────────────────────────────────────────────────────────────
