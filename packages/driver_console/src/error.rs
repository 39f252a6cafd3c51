use reqwest::StatusCode;

/// Errors surfaced by a [`Transport`](crate::transport::Transport) operation.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("server is unavailable")]
    Unavailable,

    #[error("server responded with {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("malformed response: {0}")]
    Decode(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TransportError {
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_connect() {
            Self::Unavailable
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Other(err.into())
        }
    }
}

impl From<crate::sse::EventTooLarge> for TransportError {
    fn from(err: crate::sse::EventTooLarge) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
