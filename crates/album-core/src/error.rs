use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum AlbumError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned {status}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },
    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid server url: {url}")]
    InvalidServerUrl { url: String },
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("json parse error on {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl AlbumError {
    /// Message suitable for a user notice: the server's own wording when it
    /// sent one, the full error otherwise.
    pub fn user_message(&self) -> String {
        match self {
            AlbumError::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, AlbumError::Transport { .. })
    }
}
