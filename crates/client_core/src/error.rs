use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid server url '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("response was not a chat snapshot: {source}")]
    Decode {
        body: String,
        source: serde_json::Error,
    },
}

impl ClientError {
    /// Raw response text, when the server produced any.
    pub fn response_text(&self) -> &str {
        match self {
            ClientError::Status { body, .. } | ClientError::Decode { body, .. } => body,
            ClientError::InvalidUrl { .. } | ClientError::Transport(_) => "",
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Transport(err) => err.status().map(|s| s.as_u16()),
            ClientError::InvalidUrl { .. } | ClientError::Decode { .. } => None,
        }
    }
}
