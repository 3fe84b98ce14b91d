//! Failure kinds for the quote request chain.
//!
//! Every variant is terminal for the request or invocation that raised it.
//! The service maps all of them to the same generic 500 response and only
//! logs the cause; the client reports them and exits.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("failed to build request: {0}")]
    RequestConstruction(String),

    #[error("transport error calling {url}: {source}")]
    UpstreamTransport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error: {status} from {url}")]
    UpstreamStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("deadline of {}ms exceeded", .budget.as_millis())]
    DeadlineExceeded { budget: Duration },

    #[error("request cancelled")]
    Cancelled,

    #[error("failed to decode JSON response: {0}")]
    UpstreamDecode(#[from] serde_json::Error),

    #[error("field \"{field}\" missing or not a non-empty string")]
    FieldMissing { field: &'static str },

    #[error("failed to persist quote: {0}")]
    Persistence(#[from] StoreError),

    #[error("failed to write {}: {source}", .path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl QuoteError {
    /// Short label for the request stage that failed, used as a log field.
    pub fn stage(&self) -> &'static str {
        match self {
            QuoteError::RequestConstruction(_) => "request",
            QuoteError::UpstreamTransport { .. }
            | QuoteError::UpstreamStatus { .. }
            | QuoteError::DeadlineExceeded { .. }
            | QuoteError::Cancelled => "upstream",
            QuoteError::UpstreamDecode(_) | QuoteError::FieldMissing { .. } => "validation",
            QuoteError::Persistence(_) => "persistence",
            QuoteError::LocalIo { .. } => "output",
        }
    }

    /// True for failures caused by running out of time, including a
    /// transport-level timeout reported by the HTTP client.
    pub fn is_timeout(&self) -> bool {
        match self {
            QuoteError::DeadlineExceeded { .. } => true,
            QuoteError::UpstreamTransport { source, .. } => source.is_timeout(),
            _ => false,
        }
    }
}
