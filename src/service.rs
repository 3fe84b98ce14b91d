//! The quote request chain: upstream fetch under a derived sub-deadline,
//! validation, then persistence.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::core::{Deadline, PersistedQuote, QuoteError, QuoteSource};
use crate::store::QuoteStore;

pub struct QuoteService {
    source: Arc<dyn QuoteSource>,
    store: Arc<dyn QuoteStore>,
    upstream_budget: Duration,
}

impl QuoteService {
    pub fn new(
        source: Arc<dyn QuoteSource>,
        store: Arc<dyn QuoteStore>,
        upstream_budget: Duration,
    ) -> Self {
        QuoteService {
            source,
            store,
            upstream_budget,
        }
    }

    /// Fetches a fresh quote and appends it to the store.
    ///
    /// The upstream call gets `min(upstream_budget, deadline.remaining())` and
    /// is cancelled with `deadline`. Nothing is written unless the upstream
    /// call succeeds and yields a non-empty bid. The insert itself is not
    /// time-boxed and still runs if `deadline` has passed by then.
    #[instrument(name = "GetQuote", skip(self, deadline))]
    pub async fn get_quote(&self, deadline: &Deadline) -> Result<PersistedQuote, QuoteError> {
        let upstream = deadline.child(self.upstream_budget);
        debug!(
            budget_ms = upstream.budget().as_millis() as u64,
            "Calling upstream"
        );

        let quote = self.source.fetch_quote(&upstream).await?;
        debug!(valor = %quote.value, "Validated upstream quote");

        let persisted = self.store.insert(&quote.value).await?;
        info!(
            id = persisted.id,
            valor = %persisted.value,
            remaining_ms = deadline.remaining().as_millis() as u64,
            "Persisted quote"
        );
        Ok(persisted)
    }
}
