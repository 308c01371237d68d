//! The outbound delivery pipeline.
//!
//! Handlers never write to a socket. They enqueue addressed frames onto
//! one bounded server-wide queue; a router task hands each frame to the
//! per-connection writer it belongs to. Fan-out cost (which touches
//! shared state) is thereby decoupled from blocking socket writes, and a
//! slow client can only back up its own writer.
//!
//! The central queue is lossy by design: when it is full the frame is
//! dropped and logged, which the heartbeat-tolerant protocol absorbs.

use std::collections::HashMap;
use std::sync::Mutex;

use parlor_protocol::Packet;
use parlor_transport::ConnectionId;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{mpsc, oneshot};

/// Capacity of the server-wide outbound queue.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 100;

/// An addressed outbound frame.
#[derive(Debug)]
pub struct Outbound {
    pub conn: ConnectionId,
    pub bytes: Vec<u8>,
}

/// Commands understood by a per-connection writer task.
enum WriterCmd {
    Data(Vec<u8>),
    Close,
}

/// Sending side of the central queue. Cheap to clone.
#[derive(Clone)]
pub struct OutboundQueue {
    tx: mpsc::Sender<Outbound>,
}

impl OutboundQueue {
    /// Creates the queue, returning the receiving end for the router.
    pub fn new() -> (Self, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        (Self { tx }, rx)
    }

    /// Enqueues an encoded packet for `conn`. Drops and logs when the
    /// queue is saturated.
    pub fn enqueue(&self, conn: ConnectionId, packet: &Packet) {
        tracing::debug!(
            %conn,
            command = %parlor_protocol::commands::name(packet.command),
            kind = %packet.kind,
            sequence_id = packet.sequence_id,
            "out"
        );
        self.enqueue_raw(conn, parlor_protocol::encode(packet));
    }

    /// Enqueues raw bytes (relay traffic is forwarded verbatim).
    pub fn enqueue_raw(&self, conn: ConnectionId, bytes: Vec<u8>) {
        if self.tx.try_send(Outbound { conn, bytes }).is_err() {
            tracing::warn!(%conn, "outbound queue full, dropping frame");
        }
    }
}

// ---------------------------------------------------------------------------
// Connection registry
// ---------------------------------------------------------------------------

struct ConnectionHandle {
    writer_tx: mpsc::UnboundedSender<WriterCmd>,
    close_tx: Option<oneshot::Sender<()>>,
}

/// Live connections: per-connection writer channels and close signals.
#[derive(Default)]
pub struct Connections {
    inner: Mutex<HashMap<ConnectionId, ConnectionHandle>>,
}

impl Connections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection, spawning its writer task. Returns the
    /// receiver the read loop selects on to learn about forced closes.
    pub fn register(
        &self,
        conn: ConnectionId,
        write_half: OwnedWriteHalf,
    ) -> oneshot::Receiver<()> {
        let (writer_tx, writer_rx) = mpsc::unbounded_channel();
        let (close_tx, close_rx) = oneshot::channel();
        tokio::spawn(write_loop(conn, write_half, writer_rx));
        self.inner.lock().unwrap().insert(
            conn,
            ConnectionHandle {
                writer_tx,
                close_tx: Some(close_tx),
            },
        );
        close_rx
    }

    /// Hands a frame to `conn`'s writer. Unknown connections (already
    /// closed) drop the frame silently.
    pub fn forward(&self, conn: ConnectionId, bytes: Vec<u8>) {
        let inner = self.inner.lock().unwrap();
        if let Some(handle) = inner.get(&conn) {
            let _ = handle.writer_tx.send(WriterCmd::Data(bytes));
        }
    }

    /// Forces `conn` closed: stops its writer after the pending frames
    /// drain and wakes its read loop.
    pub fn close(&self, conn: ConnectionId) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(handle) = inner.get_mut(&conn) {
            let _ = handle.writer_tx.send(WriterCmd::Close);
            if let Some(tx) = handle.close_tx.take() {
                let _ = tx.send(());
            }
        }
    }

    /// Drops the registration once the read loop has exited.
    pub fn deregister(&self, conn: ConnectionId) {
        self.inner.lock().unwrap().remove(&conn);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }
}

/// Routes frames from the central queue to per-connection writers.
///
/// Runs until the queue's senders are all gone.
pub async fn route_outbound(
    mut rx: mpsc::Receiver<Outbound>,
    connections: std::sync::Arc<Connections>,
) {
    while let Some(frame) = rx.recv().await {
        connections.forward(frame.conn, frame.bytes);
    }
}

/// One connection's writer: drains its queue in FIFO order.
///
/// `write_all` resumes partial writes before the next frame is taken, so
/// per-connection send order is preserved byte-exactly.
async fn write_loop(
    conn: ConnectionId,
    mut write_half: OwnedWriteHalf,
    mut rx: mpsc::UnboundedReceiver<WriterCmd>,
) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WriterCmd::Data(bytes) => {
                if let Err(err) = write_half.write_all(&bytes).await {
                    tracing::debug!(%conn, %err, "write failed, stopping writer");
                    break;
                }
            }
            WriterCmd::Close => {
                let _ = write_half.shutdown().await;
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_protocol::{Direction, Kind};

    fn packet() -> Packet {
        Packet::new(
            0x6202,
            Kind::Broadcast,
            Direction::FromServer,
            1,
            vec![0x00, 0x02],
        )
    }

    #[tokio::test]
    async fn test_enqueue_delivers_encoded_packet() {
        let (queue, mut rx) = OutboundQueue::new();
        let conn = ConnectionId::new(4);
        queue.enqueue(conn, &packet());

        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.conn, conn);
        assert_eq!(frame.bytes, parlor_protocol::encode(&packet()));
    }

    #[tokio::test]
    async fn test_enqueue_when_full_drops_instead_of_blocking() {
        let (queue, _rx) = OutboundQueue::new();
        let conn = ConnectionId::new(1);
        // Nothing drains _rx, so everything past the capacity is dropped.
        for _ in 0..(OUTBOUND_QUEUE_CAPACITY + 10) {
            queue.enqueue_raw(conn, vec![0u8; 4]);
        }
        // Reaching this line at all proves the enqueue never blocked.
    }

    #[tokio::test]
    async fn test_writer_preserves_fifo_order() {
        use tokio::io::AsyncReadExt;

        let listener =
            tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = tokio::net::TcpStream::connect(addr).await.unwrap();
        let (server_side, _) = listener.accept().await.unwrap();

        let connections = Connections::new();
        let conn = ConnectionId::new(1);
        let (_read, write) = server_side.into_split();
        let _close_rx = connections.register(conn, write);

        for i in 0u8..10 {
            connections.forward(conn, vec![i; 3]);
        }
        connections.close(conn);

        let mut received = Vec::new();
        let (mut client_read, _client_write) = client.into_split();
        client_read.read_to_end(&mut received).await.unwrap();

        let expected: Vec<u8> =
            (0u8..10).flat_map(|i| [i, i, i]).collect();
        assert_eq!(received, expected);
    }

    #[tokio::test]
    async fn test_close_wakes_read_loop_signal() {
        let listener =
            tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _client = tokio::net::TcpStream::connect(addr).await.unwrap();
        let (server_side, _) = listener.accept().await.unwrap();

        let connections = Connections::new();
        let conn = ConnectionId::new(9);
        let (_read, write) = server_side.into_split();
        let close_rx = connections.register(conn, write);

        connections.close(conn);
        close_rx.await.expect("close signal should fire");
    }

    #[tokio::test]
    async fn test_forward_to_unknown_connection_is_silent() {
        let connections = Connections::new();
        connections.forward(ConnectionId::new(404), vec![1, 2, 3]);
        assert!(connections.is_empty());
    }
}
