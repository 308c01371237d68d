//! Error types for the session layer.

/// Errors that can occur during session resolution or store access.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The payload did not carry the two 5-digit session fields.
    #[error("session payload too short: got {got} bytes, need {need}")]
    ShortSessionField { got: usize, need: usize },

    /// The persistent store reported a failure. Handlers log this and
    /// degrade to a safe default instead of failing the connection.
    #[error("store failure: {0}")]
    Store(String),
}
