//! Feed errors. None of these escape the feed operations; they are logged and
//! the affected state is left as it was.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{path} returned {status}")]
    Status {
        path: &'static str,
        status: reqwest::StatusCode,
    },

    #[error("websocket: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("empty frame")]
    EmptyFrame,

    #[error("invalid server url: {0}")]
    InvalidUrl(String),
}

pub type FeedResult<T> = Result<T, FeedError>;
