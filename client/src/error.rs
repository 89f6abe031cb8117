//! Error taxonomy for the lobby client.

/// Failure modes surfaced by the HTTP and WebSocket layers.
///
/// Action dispatch never propagates these to consumers; they are reduced to
/// a readable error string on the sync state instead.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Base URL is not an `http://` or `https://` endpoint.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    /// Underlying HTTP request failed (connect, timeout, body).
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Server answered with a non-success status.
    #[error("server returned error for {operation}: {message}")]
    Api {
        /// Operation that was attempted, e.g. `"join lobby"`.
        operation: &'static str,
        /// Server-provided detail, or the raw body when unstructured.
        message: String,
    },
    /// A response that must carry a lobby snapshot did not.
    #[error("response for {0} carried no lobby snapshot")]
    MissingSnapshot(&'static str),
}
