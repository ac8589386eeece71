//! Error types for fetching, rendering and notifying.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReceiptError {
    #[error("GET {path} returned HTTP {status}")]
    Status { path: String, status: u16 },

    #[error("GET {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("GET {path} returned malformed JSON: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Template '{0}' is missing")]
    TemplateMissing(String),

    #[error("Container element '#{0}' not found in page")]
    ContainerMissing(String),

    #[error("Render superseded by a newer request")]
    Superseded,

    #[error("Analytics sink failed: {0}")]
    Analytics(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReceiptError {
    /// Whether this is a network-level failure (bad status, transport or timeout).
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Status { .. } | Self::Transport { .. })
    }

    /// Whether repeating the same request could succeed.
    ///
    /// Transport failures and 5xx responses are retryable; 4xx and parse
    /// errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status >= 500,
            Self::Transport { .. } => true,
            _ => false,
        }
    }
}
