//! HTTP surface of the quote service.
//!
//! # Endpoints
//!
//! - `GET /cotacao` - fetches, persists and returns the current quote as
//!   `{"valor": "<bid>"}`, or `500 Erro interno` on any failure

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::core::config::ServerConfig;
use crate::core::{Deadline, QuoteError, QuoteResponse};
use crate::providers::AwesomeApiProvider;
use crate::service::QuoteService;
use crate::store::{QuoteStore, SqliteQuoteStore};

/// Plain-text body for every failed request; causes are only logged.
pub const INTERNAL_ERROR_BODY: &str = "Erro interno";

/// Shared state for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    service: Arc<QuoteService>,
    request_timeout: Duration,
}

impl AppState {
    pub fn new(service: Arc<QuoteService>, request_timeout: Duration) -> Self {
        Self {
            service,
            request_timeout,
        }
    }
}

/// Create the router with the quote endpoint.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/cotacao", get(get_cotacao))
        .with_state(state)
}

/// Wraps a request-chain failure so it renders as the generic 500.
#[derive(Debug)]
pub struct ApiError(QuoteError);

impl From<QuoteError> for ApiError {
    fn from(err: QuoteError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        if err.is_timeout() {
            warn!(error = %err, stage = err.stage(), "Quote request timed out");
        } else {
            error!(error = %err, stage = err.stage(), "Quote request failed");
        }
        (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY).into_response()
    }
}

async fn get_cotacao(State(state): State<AppState>) -> Result<Json<QuoteResponse>, ApiError> {
    let deadline = Deadline::after(state.request_timeout);
    // hyper drops this future when the caller goes away
    let _cancel = deadline.cancel_on_drop();

    let quote = state.service.get_quote(&deadline).await?;
    if deadline.is_expired() {
        warn!(id = quote.id, "Responding after inbound deadline");
    }
    Ok(Json(QuoteResponse::from(&quote)))
}

/// A bound quote server owning its store for the lifetime of `run`.
pub struct QuoteServer {
    listener: TcpListener,
    store: Arc<SqliteQuoteStore>,
    router: Router,
}

impl QuoteServer {
    /// Opens the store, creates the schema and binds the listener.
    pub async fn bind(config: &ServerConfig) -> Result<Self> {
        let store = Arc::new(
            SqliteQuoteStore::open(&config.database_path).with_context(|| {
                format!(
                    "Failed to open database: {}",
                    config.database_path.display()
                )
            })?,
        );
        let source = AwesomeApiProvider::new(&config.upstream.base_url, &config.upstream.pair)
            .context("Failed to build upstream client")?;
        info!(url = source.url(), "Using upstream quote source");

        let service = QuoteService::new(
            Arc::new(source),
            Arc::clone(&store) as Arc<dyn QuoteStore>,
            config.upstream.timeout(),
        );
        let router = create_router(AppState::new(
            Arc::new(service),
            config.request_timeout(),
        ));

        let listener = TcpListener::bind(config.listen_addr.as_str())
            .await
            .with_context(|| format!("Failed to bind {}", config.listen_addr))?;

        Ok(Self {
            listener,
            store,
            router,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves until `shutdown` is cancelled, then closes the store.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let addr = self.local_addr()?;
        info!(%addr, "Quote server listening");

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
            .context("Quote server failed")?;
        info!("Quote server stopped");

        match Arc::into_inner(self.store) {
            Some(store) => store.close().context("Failed to close quote store")?,
            None => warn!("Quote store still referenced at shutdown"),
        }
        Ok(())
    }
}
