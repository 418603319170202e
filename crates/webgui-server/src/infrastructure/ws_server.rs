//! WebSocket server: accept loop and per-connection session tasks.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Upgrading each accepted connection to a WebSocket session.
//! 3. Registering the session with the [`ConnectionRegistry`] with the
//!    `initial.state` message already queued, before reading any frame.
//! 4. Running two halves per session:
//!    - **Reader**: each text frame goes through the [`Dispatcher`] and the
//!      reply is queued on the session's own outbound channel.
//!    - **Writer**: drains the outbound channel (replies and broadcasts) into
//!      the socket.
//! 5. Stopping the accept loop when the `running` flag is cleared.
//!
//! Requests on one connection are processed to completion in arrival order;
//! there is no cancellation of an in-flight request.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tracing::{debug, error, info, warn};

use crate::application::Dispatcher;
use crate::infrastructure::connections::ConnectionRegistry;

/// How long the accept loop waits before re-checking the `running` flag.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

/// How long a closing session waits for its writer to flush.
const WRITER_DRAIN: Duration = Duration::from_secs(1);

/// What every session task needs.
pub struct ServerContext {
    pub dispatcher: Arc<Dispatcher>,
    pub connections: Arc<ConnectionRegistry>,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds `bind_addr` and runs [`serve_listener`] until `running` is cleared.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound (port in use, missing
/// permission).
pub async fn run_server(bind_addr: SocketAddr, ctx: Arc<ServerContext>, running: Arc<AtomicBool>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind WebSocket listener on {bind_addr}"))?;
    info!("WebGUI WebSocket server listening on ws://{bind_addr}");
    serve_listener(listener, ctx, running).await
}

/// Accepts connections on an already-bound listener until `running` is
/// cleared.  Each connection gets its own task.
///
/// # Errors
///
/// Currently infallible once the listener exists; accept errors are logged
/// and the loop continues.
pub async fn serve_listener(
    listener: TcpListener,
    ctx: Arc<ServerContext>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        match timeout(ACCEPT_POLL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                debug!("new connection from {peer_addr}");
                let ctx = Arc::clone(&ctx);
                tokio::spawn(async move {
                    handle_session(stream, peer_addr, ctx).await;
                });
            }
            Ok(Err(e)) => {
                error!("accept error: {e}");
            }
            Err(_) => {
                // No connection within the poll window; re-check `running`.
            }
        }
    }
    Ok(())
}

// ── Per-session handler ───────────────────────────────────────────────────────

async fn handle_session(stream: TcpStream, peer_addr: SocketAddr, ctx: Arc<ServerContext>) {
    match run_session(stream, peer_addr, ctx).await {
        Ok(()) => info!("session {peer_addr} closed"),
        Err(e) => warn!("session {peer_addr} closed with error: {e:#}"),
    }
}

async fn run_session(stream: TcpStream, peer_addr: SocketAddr, ctx: Arc<ServerContext>) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream)
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;
    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    // Queue the baseline first; broadcasts can only land behind it.
    let (id, mut outbound) = ctx
        .dispatcher
        .with_initial_state(|initial| initial.to_text().map(|text| ctx.connections.register_with_initial(text)))
        .with_context(|| format!("session {peer_addr}: failed to serialize initial state"))?;
    info!("session {peer_addr} established as connection {id}");

    let mut writer = tokio::spawn(async move {
        while let Some(text) = outbound.recv().await {
            if let Err(e) = ws_tx.send(WsMessage::Text(text)).await {
                debug!("connection {id}: send failed: {e}");
                return;
            }
        }
        let _ = ws_tx.send(WsMessage::Close(None)).await;
        let _ = ws_tx.close().await;
    });

    let reader_ctx = Arc::clone(&ctx);
    let reader = async move {
        while let Some(frame) = ws_rx.next().await {
            match frame {
                Ok(WsMessage::Text(text)) => {
                    let reply = reader_ctx.dispatcher.handle_text(&text);
                    let reply = match reply.to_text() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("connection {id}: failed to serialize reply: {e}");
                            continue;
                        }
                    };
                    if let Err(e) = reader_ctx.connections.send_to(id, reply) {
                        debug!("connection {id}: {e}");
                        break;
                    }
                }
                Ok(WsMessage::Binary(_)) => warn!("connection {id}: unexpected binary frame (ignored)"),
                Ok(WsMessage::Close(_)) => {
                    debug!("connection {id}: close frame received");
                    break;
                }
                Ok(_) => {}
                Err(WsError::ConnectionClosed | WsError::Protocol(_)) => {
                    debug!("connection {id}: closed by peer");
                    break;
                }
                Err(e) => {
                    warn!("connection {id}: WebSocket error: {e}");
                    break;
                }
            }
        }
    };

    tokio::select! {
        _ = reader => debug!("connection {id}: reader ended"),
        _ = &mut writer => debug!("connection {id}: writer ended"),
    }

    ctx.connections.remove(id);
    if !writer.is_finished() && timeout(WRITER_DRAIN, &mut writer).await.is_err() {
        writer.abort();
    }
    Ok(())
}
