use async_trait::async_trait;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

use super::{QuoteStore, StoreError};
use crate::core::PersistedQuote;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS cotacoes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    valor TEXT,
    data TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)";

/// SQLite-backed quote store.
///
/// Owns a single connection guarded by a mutex; statements run on the
/// blocking thread pool so request tasks never block the runtime.
pub struct SqliteQuoteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteQuoteStore {
    /// Opens (or creates) the database at `path` and ensures the schema exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
        let conn = Connection::open_with_flags(path.as_ref(), flags)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let store = Self::from_connection(conn)?;
        info!(path = %path.as_ref().display(), "Opened quote store");
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Creates the `cotacoes` table if absent. Safe to call repeatedly.
    pub fn ensure_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        conn.execute_batch(CREATE_TABLE)?;
        debug!("Schema ready");
        Ok(())
    }

    /// Releases the connection. If the store is still shared the connection is
    /// closed when the last handle drops instead.
    pub fn close(self) -> Result<(), StoreError> {
        let Some(mutex) = Arc::into_inner(self.conn) else {
            debug!("Store still shared, connection closes with last handle");
            return Ok(());
        };
        let conn = mutex.into_inner().map_err(|_| StoreError::Poisoned)?;
        conn.close().map_err(|(_, e)| StoreError::Db(e))?;
        info!("Closed quote store");
        Ok(())
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&guard)
        })
        .await?
    }
}

fn row_to_quote(row: &rusqlite::Row<'_>) -> rusqlite::Result<PersistedQuote> {
    Ok(PersistedQuote {
        id: row.get(0)?,
        value: row.get(1)?,
        observed_at: row.get(2)?,
    })
}

#[async_trait]
impl QuoteStore for SqliteQuoteStore {
    async fn insert(&self, value: &str) -> Result<PersistedQuote, StoreError> {
        if value.is_empty() {
            return Err(StoreError::EmptyValue);
        }
        let value = value.to_string();
        self.with_conn(move |conn| {
            let quote = conn.query_row(
                "INSERT INTO cotacoes (valor) VALUES (?1) RETURNING id, valor, data",
                params![value],
                row_to_quote,
            )?;
            debug!(id = quote.id, valor = %quote.value, "Inserted quote");
            Ok(quote)
        })
        .await
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM cotacoes", [], |row| row.get(0))?;
            Ok(n as u64)
        })
        .await
    }

    async fn latest(&self) -> Result<Option<PersistedQuote>, StoreError> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT id, valor, data FROM cotacoes ORDER BY id DESC LIMIT 1",
                    [],
                    row_to_quote,
                )
                .optional()?)
        })
        .await
    }
}
