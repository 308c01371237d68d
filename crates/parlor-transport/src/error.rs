/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding the listener failed.
    #[error("bind failed: {0}")]
    BindFailed(#[source] std::io::Error),

    /// Accepting a connection failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// Appending to the receive buffer would exceed its capacity.
    /// Fatal for the connection: the stream can never resynchronize.
    #[error("receive buffer overflow: {filled} + {incoming} exceeds {capacity}")]
    Overflow {
        filled: usize,
        incoming: usize,
        capacity: usize,
    },

    /// The stream produced a frame the framing rules cannot advance past.
    #[error("stream desynchronized: {0}")]
    Desynchronized(&'static str),
}
