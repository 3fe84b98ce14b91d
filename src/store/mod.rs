pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::PersistedQuote;

pub use sqlite::SqliteQuoteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error("refusing to persist an empty quote value")]
    EmptyValue,
    #[error("store connection lock poisoned")]
    Poisoned,
    #[error("store task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Append-only storage of quote values.
///
/// Implementations must be safe to share across concurrent requests; row
/// ordering between concurrent inserts is not guaranteed.
#[async_trait]
pub trait QuoteStore: Send + Sync {
    /// Appends `value` as a new row. Id and timestamp are assigned by the store.
    async fn insert(&self, value: &str) -> Result<PersistedQuote, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;

    /// Most recently inserted row, if any.
    async fn latest(&self) -> Result<Option<PersistedQuote>, StoreError>;
}
