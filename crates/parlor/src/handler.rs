//! Per-connection lobby handling: the blocking-read loop that feeds the
//! reassembler and runs the dispatcher inline.
//!
//! Handlers are never re-entered concurrently for the same connection —
//! dispatch runs to completion inside this read task — while distinct
//! connections dispatch concurrently on their own tasks.

use std::sync::Arc;

use parlor_transport::{ConnectionId, StreamBuffer};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

use crate::actions::{self, CloseMode};
use crate::dispatch;
use crate::state::ServerState;

/// Serves one lobby connection from accept to close.
pub async fn run_connection(
    state: Arc<ServerState>,
    stream: TcpStream,
    conn: ConnectionId,
) {
    let (mut read_half, write_half) = stream.into_split();
    let mut close_rx = state.connections.register(conn, write_half);

    // The server opens the conversation with its login query.
    dispatch::send_login_query(&state, conn);

    let mut buffer = StreamBuffer::new();
    let mut chunk = [0u8; 1024];
    loop {
        tokio::select! {
            _ = &mut close_rx => {
                tracing::debug!(%conn, "connection force-closed");
                break;
            }
            read = read_half.read(&mut chunk) => match read {
                Ok(0) => {
                    tracing::debug!(%conn, "connection closed by peer");
                    break;
                }
                Ok(n) => {
                    if let Err(err) = buffer.append(&chunk[..n]) {
                        // Fatal desynchronization; the stream can never
                        // recover.
                        tracing::warn!(%conn, %err, "receive buffer overflow");
                        break;
                    }
                    if let Some(run) = buffer.extract_lobby() {
                        match parlor_protocol::decode_run(&run) {
                            Ok(packets) => {
                                for packet in packets {
                                    dispatch::dispatch(&state, conn, packet)
                                        .await;
                                }
                            }
                            Err(err) => {
                                tracing::warn!(%conn, %err, "undecodable frame run");
                                break;
                            }
                        }
                    }
                }
                Err(err) => {
                    tracing::debug!(%conn, %err, "read error");
                    break;
                }
            }
        }
    }

    // Shared state is cleaned up before the socket registration goes
    // away, so no broadcast can address a dangling entry.
    actions::remove_client(&state, conn, CloseMode::SocketGone).await;
    state.connections.close(conn);
    state.connections.deregister(conn);
    tracing::info!(%conn, "lobby connection closed");
}
