use thiserror::Error;

/// Top-level error type for the `poslink-api` crate.
///
/// Covers the request path (transport, HTTP status classes, retry
/// exhaustion), token persistence, and the event channel handshake.
/// The event channel itself never returns these to callers: a channel that
/// gives up is observable only through its state and the bus.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// No response was received (connection refused, DNS failure, timeout).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS configuration or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── HTTP status classes ─────────────────────────────────────────
    /// The backend answered with a 5xx status.
    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// The backend rejected the request with a 4xx status. Never retried.
    #[error("Request rejected (HTTP {status}): {message}")]
    ClientRequest { status: u16, message: String },

    /// Every attempt failed with a transient error.
    #[error("Request failed after {attempts} attempts: {message}")]
    MaxRetriesExceeded { attempts: u32, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// The request body could not be encoded as JSON.
    #[error("Failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Session token ───────────────────────────────────────────────
    /// Reading, writing or clearing the persisted token failed.
    #[error("Token storage error: {0}")]
    TokenStore(String),

    // ── Event channel ───────────────────────────────────────────────
    /// WebSocket connection or handshake failed.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// The server sent a frame that is not valid Engine.IO / Socket.IO.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    ///
    /// Transport failures (including per-attempt timeouts) and 5xx
    /// responses qualify; 4xx responses never do.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Server { .. } | Self::WebSocketConnect(_)
        )
    }

    /// The HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } | Self::ClientRequest { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Returns `true` if the backend rejected our credentials.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::ClientRequest { status: 401, .. })
    }

    /// The human-readable part of the error.
    ///
    /// For HTTP status errors this is the server-provided message rather
    /// than the full formatted error.
    pub fn message(&self) -> String {
        match self {
            Self::Server { message, .. }
            | Self::ClientRequest { message, .. }
            | Self::MaxRetriesExceeded { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
