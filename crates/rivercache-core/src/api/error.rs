use serde::Deserialize;
use thiserror::Error;

/// Failure of a single resource fetch.
///
/// Cloneable so the same failure can sit in a cache entry and be handed to
/// every subscriber of that key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// No response was received (DNS, connect, timeout).
    #[error("Network error: {cause}")]
    Network { cause: String },

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {info}")]
    Http { status: u16, info: String },

    /// The body could not be decoded into the expected shape.
    #[error("Invalid response: {cause}")]
    Parse { cause: String },
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error body shape returned by the dashboard API.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

impl FetchError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Build an HTTP failure, preferring the `{error}` message from the body.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let info = match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => parsed.error,
            Err(_) if body.trim().is_empty() => status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string(),
            Err(_) => Self::truncate_body(body),
        };
        FetchError::Http {
            status: status.as_u16(),
            info,
        }
    }

    pub fn network(cause: impl Into<String>) -> Self {
        FetchError::Network {
            cause: cause.into(),
        }
    }

    pub fn parse(cause: impl Into<String>) -> Self {
        FetchError::Parse {
            cause: cause.into(),
        }
    }

    /// HTTP status, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Transient failures worth another attempt: no response, rate limiting,
    /// or a server-side error. Client errors and bad bodies are not retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network { .. } => true,
            FetchError::Http { status, .. } => *status == 429 || (500..=599).contains(status),
            FetchError::Parse { .. } => false,
        }
    }

    /// Short message for the status bar.
    pub fn summary(&self) -> String {
        match self {
            FetchError::Network { .. } => "offline".to_string(),
            FetchError::Http { status, .. } => format!("HTTP {}", status),
            FetchError::Parse { .. } => "bad response".to_string(),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            FetchError::parse(e.to_string())
        } else if e.is_timeout() {
            FetchError::network(format!("request timed out: {}", e))
        } else {
            FetchError::network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::parse(e.to_string())
    }
}
