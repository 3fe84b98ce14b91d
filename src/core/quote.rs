use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value;

use crate::core::deadline::Deadline;
use crate::core::error::QuoteError;

/// A quote value as returned by the upstream provider, before persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub value: String,
}

/// A quote row as written by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedQuote {
    pub id: i64,
    pub value: String,
    pub observed_at: NaiveDateTime,
}

/// Body served by `GET /cotacao`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteResponse {
    pub valor: String,
}

impl From<&PersistedQuote> for QuoteResponse {
    fn from(quote: &PersistedQuote) -> Self {
        QuoteResponse {
            valor: quote.value.clone(),
        }
    }
}

#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Fetches the current bid. Must not outlive `deadline`.
    async fn fetch_quote(&self, deadline: &Deadline) -> Result<Quote, QuoteError>;
}

/// Reads `value` as a non-empty string, or reports `field` as missing.
pub fn required_str<'a>(
    value: Option<&'a Value>,
    field: &'static str,
) -> Result<&'a str, QuoteError> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or(QuoteError::FieldMissing { field })
}
