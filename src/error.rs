use thiserror::Error;

pub type Result<T> = std::result::Result<T, SubcountError>;

#[derive(Debug, Error)]
pub enum SubcountError {
    #[error("invalid community name: {0:?}")]
    InvalidCommunity(String),

    /// Network-level failure during one HTTP attempt.
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// Response received with a non-success status.
    #[error("{url} returned status {status} ({reason})")]
    HttpStatus {
        url: String,
        status: u16,
        reason: &'static str,
    },

    /// Response received but not in the expected shape. Never retried.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Last transport/status error after every attempt was spent.
    #[error("gave up after {attempts} attempt(s): {source}")]
    Retrieval {
        attempts: u32,
        #[source]
        source: Box<SubcountError>,
    },

    #[error("sink error: {0}")]
    Sink(String),

    #[error("http client error: {0}")]
    Client(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SubcountError {
    pub fn transport(url: &str, err: impl std::fmt::Display) -> Self {
        SubcountError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    pub fn sink(message: impl Into<String>) -> Self {
        SubcountError::Sink(message.into())
    }

    /// Transport and status failures may clear up on their own; everything else is permanent.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SubcountError::Transport { .. } | SubcountError::HttpStatus { .. }
        )
    }
}

/* Conversions so `?` works smoothly */
impl From<serde_json::Error> for SubcountError {
    fn from(e: serde_json::Error) -> Self {
        SubcountError::MalformedResponse(e.to_string())
    }
}

impl From<reqwest::Error> for SubcountError {
    fn from(e: reqwest::Error) -> Self {
        let url = e.url().map(|u| u.to_string()).unwrap_or_default();
        SubcountError::Transport {
            url,
            message: e.to_string(),
        }
    }
}
