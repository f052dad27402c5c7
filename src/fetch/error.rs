//! Fetch failure taxonomy
//!
//! Every way a proxied fetch can end without an envelope, each mapped to
//! exactly one HTTP status.

use hyper::StatusCode;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The `url` query parameter is absent or empty
    #[error("Missing url parameter")]
    InvalidInput,

    /// The remote server answered with a non-2xx status
    #[error("Remote server returned {0}")]
    RemoteHttp(u16),

    /// DNS, connect, TLS or timeout failure
    #[error("Could not reach URL: {0}")]
    Network(String),

    /// Target host refused by the private address guard
    #[error("Refusing to fetch private address: {0}")]
    Blocked(String),

    #[error("{0}")]
    Unexpected(String),
}

impl FetchError {
    /// HTTP status returned to the client for this failure
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput => StatusCode::BAD_REQUEST,
            Self::RemoteHttp(code) => {
                StatusCode::from_u16(*code).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::Network(_) => StatusCode::BAD_GATEWAY,
            Self::Blocked(_) => StatusCode::FORBIDDEN,
            Self::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Classify an outbound client error
    ///
    /// Request-construction and redirect failures are our problem (500);
    /// everything else happened on the wire (502).
    pub fn from_client(err: &reqwest::Error) -> Self {
        if err.is_builder() || err.is_redirect() {
            return Self::Unexpected(error_chain(err));
        }
        if err.is_timeout() {
            return Self::Network("timed out".to_string());
        }
        Self::Network(error_chain(err))
    }
}

/// Flatten an error and its sources into one line
///
/// reqwest's top-level message is generic ("error sending request"); the
/// useful reason (DNS, refused, certificate) lives further down the chain.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
