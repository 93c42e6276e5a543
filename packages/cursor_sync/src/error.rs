use thiserror::Error;

/// Errors from encoding or decoding wire frames.
///
/// Decode failures are contained in the connection's receive path: the frame
/// is logged and dropped, the connection stays up and the store untouched.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The frame was not valid JSON, or a known kind carried an invalid body.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The frame was a JSON value without a string `type` discriminant.
    #[error("message has no type field: {0}")]
    MissingType(String),
}

/// Errors surfaced to callers of the client handle.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The connection actor's task has exited; the handle is stale.
    #[error("connection actor is gone")]
    ActorGone,
}
