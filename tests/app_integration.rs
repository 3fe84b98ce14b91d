use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::{Duration, Instant};

use cotacao::core::config::{ServerConfig, UpstreamConfig};
use cotacao::server::QuoteServer;
use cotacao::store::{QuoteStore, SqliteQuoteStore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

// Adds automatic logging to test
mod test_utils {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_upstream_mock(template: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/json/last/USD-BRL"))
            .respond_with(template)
            .mount(&mock_server)
            .await;

        mock_server
    }
}

struct RunningServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl RunningServer {
    async fn start(upstream_uri: String, database_path: &Path) -> Self {
        let config = ServerConfig {
            listen_addr: "127.0.0.1:0".to_string(),
            database_path: database_path.to_path_buf(),
            request_timeout_ms: 300,
            upstream: UpstreamConfig {
                base_url: upstream_uri,
                pair: "USD-BRL".to_string(),
                timeout_ms: 200,
            },
        };
        let server = QuoteServer::bind(&config)
            .await
            .expect("Failed to bind quote server");
        let addr = server.local_addr().expect("Server has no local address");

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(server.run(shutdown.clone()));
        Self {
            addr,
            shutdown,
            handle,
        }
    }

    fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    async fn stop(self) {
        self.shutdown.cancel();
        self.handle
            .await
            .expect("Server task panicked")
            .expect("Server failed");
    }
}

/// Row count and latest value, read after the server released the database.
async fn stored_rows(database_path: &Path) -> (u64, Option<String>) {
    let store = SqliteQuoteStore::open(database_path).expect("Failed to reopen store");
    let count = store.count().await.expect("Failed to count rows");
    let latest = store.latest().await.expect("Failed to read latest row");
    store.close().expect("Failed to close store");
    (count, latest.map(|q| q.value))
}

#[test_log::test(tokio::test)]
async fn test_full_flow_with_fast_upstream() {
    let upstream = test_utils::create_upstream_mock(
        wiremock::ResponseTemplate::new(200)
            .set_body_string(r#"{"bid": "5.23", "ask": "5.24", "code": "USD"}"#)
            .set_delay(Duration::from_millis(50)),
    )
    .await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("cotacoes.db");
    let output_path = dir.path().join("cotacao.txt");

    let server = RunningServer::start(upstream.uri(), &db_path).await;

    // Direct call to the service
    let response = reqwest::get(format!("{}/cotacao", server.url()))
        .await
        .expect("Request to quote server failed");
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(
        response.headers()[reqwest::header::CONTENT_TYPE],
        "application/json"
    );
    assert_eq!(response.text().await.unwrap(), r#"{"valor":"5.23"}"#);

    // Client run through the application entry point
    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    let config_content = format!(
        r#"
        client:
          server_url: "{}"
          timeout_ms: 300
          output_path: "{}"
    "#,
        server.url(),
        output_path.display()
    );
    fs::write(config_file.path(), &config_content).expect("Failed to write config file");

    let result = cotacao::run_command(
        cotacao::AppCommand::Client,
        Some(config_file.path().to_str().unwrap()),
    )
    .await;
    assert!(result.is_ok(), "Client run failed with: {:?}", result.err());
    assert_eq!(fs::read_to_string(&output_path).unwrap(), "Dólar: 5.23\n");

    server.stop().await;

    // One row for the direct call, one for the client run
    assert_eq!(stored_rows(&db_path).await, (2, Some("5.23".to_string())));
}

#[test_log::test(tokio::test)]
async fn test_slow_upstream_fails_within_inbound_budget() {
    let upstream = test_utils::create_upstream_mock(
        wiremock::ResponseTemplate::new(200)
            .set_body_string(r#"{"bid": "5.23"}"#)
            .set_delay(Duration::from_millis(250)),
    )
    .await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("cotacoes.db");
    let output_path = dir.path().join("cotacao.txt");

    let server = RunningServer::start(upstream.uri(), &db_path).await;

    let started = Instant::now();
    let response = reqwest::get(format!("{}/cotacao", server.url()))
        .await
        .expect("Request to quote server failed");
    let elapsed = started.elapsed();
    info!(?elapsed, "Quote server answered");

    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    assert!(elapsed < Duration::from_millis(300));
    assert_eq!(response.text().await.unwrap(), "Erro interno");

    let client_config = cotacao::core::config::ClientConfig {
        server_url: server.url(),
        timeout_ms: 300,
        output_path: output_path.clone(),
    };
    let result = cotacao::client::fetch_and_save(&client_config).await;
    assert!(result.is_err());
    assert!(!output_path.exists());

    server.stop().await;
    assert_eq!(stored_rows(&db_path).await, (0, None));
}

#[test_log::test(tokio::test)]
async fn test_missing_bid_returns_500_and_stores_nothing() {
    let upstream = test_utils::create_upstream_mock(
        wiremock::ResponseTemplate::new(200).set_body_string(r#"{"ask": "5.23"}"#),
    )
    .await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("cotacoes.db");

    let server = RunningServer::start(upstream.uri(), &db_path).await;

    let response = reqwest::get(format!("{}/cotacao", server.url()))
        .await
        .expect("Request to quote server failed");
    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);

    server.stop().await;
    assert_eq!(stored_rows(&db_path).await, (0, None));
}

#[test_log::test(tokio::test)]
async fn test_restart_keeps_existing_rows() {
    let upstream = test_utils::create_upstream_mock(
        wiremock::ResponseTemplate::new(200).set_body_string(r#"{"USDBRL": {"bid": "5.10"}}"#),
    )
    .await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("cotacoes.db");

    for _ in 0..2 {
        let server = RunningServer::start(upstream.uri(), &db_path).await;
        let response = reqwest::get(format!("{}/cotacao", server.url()))
            .await
            .expect("Request to quote server failed");
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        server.stop().await;
    }

    assert_eq!(stored_rows(&db_path).await, (2, Some("5.10".to_string())));
}
