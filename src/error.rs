use std::path::PathBuf;

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Send failed ({status}): {body}")]
    Send {
        status: u16,
        body: String,
        /// Seconds from the `Retry-After` header, set on throttled requests.
        retry_after: Option<u64>,
    },

    #[error("Could not read attachment {}: {source}", .path.display())]
    AttachmentRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Graph API error ({status}): {body}")]
    Graph { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl MailError {
    /// HTTP status carried by the error, if the provider answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            MailError::Send { status, .. } | MailError::Graph { status, .. } => Some(*status),
            MailError::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_throttled(&self) -> bool {
        self.status() == Some(429)
    }
}

pub type Result<T> = std::result::Result<T, MailError>;
