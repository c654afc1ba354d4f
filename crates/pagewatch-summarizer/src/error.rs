use std::time::Duration;

use thiserror::Error;

/// Errors returned by the summarizer client.
///
/// Only [`SummarizerError::Overloaded`] is surfaced to callers of the public
/// summarize methods; everything else degrades to "no summary".
#[derive(Debug, Error)]
pub enum SummarizerError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP 429. `retry_after` is the server-suggested delay, when one was given.
    #[error("rate limited by summarizer (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("summarizer is overloaded (HTTP {status})")]
    Overloaded { status: u16 },

    #[error("unexpected HTTP status {status} from summarizer: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("summarizer returned no usable content")]
    EmptyResponse,

    #[error("summarizer did not answer within {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("invalid summarizer base URL \"{url}\": {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}
