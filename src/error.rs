//! Error kinds surfaced by the aggregation layer.
//!
//! Fan-out search never returns these: every adapter absorbs its own
//! failures into an empty list. Single-target calls (detail, play URL,
//! subscription ingestion) surface them to the caller unchanged.

use thiserror::Error;

/// Aggregation layer errors
#[derive(Error, Debug)]
pub enum Error {
    /// Network failure, timeout, or a non-success HTTP status.
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered, but not with the shape we expected.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The registry has no adapter for this backend type.
    #[error("unsupported source type: {0}")]
    UnsupportedSourceType(String),

    /// The requested episode index is past the end of the episode list.
    #[error("episode index {index} out of range (0..{len})")]
    EpisodeIndexOutOfRange { index: usize, len: usize },

    /// Every stage of the subscription decoding cascade failed.
    #[error("unparseable subscription: {0}")]
    UnparseableSubscription(String),

    /// A netdrive call needs a session credential and none is configured.
    #[error("no session credential configured for source '{0}'")]
    CredentialMissing(String),

    /// Invalid subscription request: unknown id, bad or duplicate URL.
    #[error("subscription error: {0}")]
    Subscription(String),

    /// Local settings file could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Transport(format!("request timed out: {e}"))
        } else if e.is_decode() {
            Error::MalformedPayload(e.to_string())
        } else {
            Error::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::MalformedPayload(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
