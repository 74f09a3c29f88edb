//! Error handling for the inspection panel core

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP client error (connect failure, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("Backend returned {status} for {endpoint}")]
    Status {
        endpoint: String,
        status: reqwest::StatusCode,
    },

    /// WebSocket transport error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Event stream closed by the backend
    #[error("Event stream closed: {0}")]
    StreamClosed(String),

    /// Malformed payload
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Backend refused a control action
    #[error("Command rejected: {0}")]
    CommandRejected(String),

    /// Config error
    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Network failure, non-success status or stream loss
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::Status { .. } | Error::WebSocket(_) | Error::StreamClosed(_)
        )
    }

    /// Short machine-readable code, used in structured logs
    pub fn code(&self) -> &'static str {
        match self {
            Error::Http(_) => "HTTP_ERROR",
            Error::Status { .. } => "STATUS_ERROR",
            Error::WebSocket(_) => "WEBSOCKET_ERROR",
            Error::StreamClosed(_) => "STREAM_CLOSED",
            Error::Decode(_) => "DECODE_ERROR",
            Error::CommandRejected(_) => "COMMAND_REJECTED",
            Error::Config(_) => "CONFIG_ERROR",
        }
    }
}
