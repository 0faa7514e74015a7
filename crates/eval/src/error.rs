use std::path::PathBuf;

/// Failure of one call to the classifier service.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    /// The request body is malformed (e.g. an empty message). Never retried.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("rate limited (HTTP 429)")]
    RateLimited,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<ClientError>,
    },
}

impl ClientError {
    /// Transport failures and 5xx statuses are worth another fixed-delay attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Transport(_) => true,
            ClientError::Status(code) => (500..=599).contains(code),
            _ => false,
        }
    }
}

/// Fatal conditions: the run aborts before any sampling happens.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("failed to read corpus {}: {source}", .path.display())]
    CorpusRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse corpus {}: {source}", .path.display())]
    CorpusParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("corpus {} contains no records", .path.display())]
    EmptyCorpus { path: PathBuf },
}
