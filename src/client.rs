//! One-shot quote fetcher: asks the quote service for the current value and
//! writes it to a local file.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, info, instrument};

use crate::core::config::ClientConfig;
use crate::core::quote::required_str;
use crate::core::{Deadline, QuoteError};

/// Body returned by `GET /cotacao`. Only a JSON object is accepted; a wrong
/// `valor` type is reported as a missing field rather than a decode failure.
#[derive(Deserialize, Debug)]
struct ServiceQuote {
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl ServiceQuote {
    fn valor(&self) -> Result<&str, QuoteError> {
        required_str(self.fields.get("valor"), "valor")
    }
}

/// Formats the single line written to the output file.
pub fn format_line(value: &str) -> String {
    format!("Dólar: {value}\n")
}

/// Requests the quote within the configured budget and overwrites the output
/// file with it. No file is touched unless every step succeeds.
#[instrument(skip(config), fields(server = %config.server_url))]
pub async fn fetch_and_save(config: &ClientConfig) -> Result<String, QuoteError> {
    let deadline = Deadline::after(config.timeout());
    let value = fetch_quote(&config.server_url, &deadline).await?;
    save_quote(&config.output_path, &value).await?;
    info!(valor = %value, path = %config.output_path.display(), "Saved quote");
    Ok(value)
}

/// Calls `GET <server_url>/cotacao` under `deadline` and returns `valor`.
pub async fn fetch_quote(server_url: &str, deadline: &Deadline) -> Result<String, QuoteError> {
    let url = format!("{}/cotacao", server_url.trim_end_matches('/'));
    let client = reqwest::Client::builder()
        .user_agent("cotacao/1.0")
        .timeout(deadline.remaining())
        .build()
        .map_err(|e| QuoteError::RequestConstruction(e.to_string()))?;
    debug!("Requesting quote from {}", url);

    let body = deadline
        .run(async {
            let response = client.get(&url).send().await.map_err(|source| {
                QuoteError::UpstreamTransport {
                    url: url.clone(),
                    source,
                }
            })?;

            if !response.status().is_success() {
                return Err(QuoteError::UpstreamStatus {
                    url: url.clone(),
                    status: response.status(),
                });
            }

            response
                .bytes()
                .await
                .map_err(|source| QuoteError::UpstreamTransport {
                    url: url.clone(),
                    source,
                })
        })
        .await??;

    let data: ServiceQuote = serde_json::from_slice(&body)?;
    Ok(data.valor()?.to_string())
}

/// Creates or truncates `path` with the formatted quote line.
pub async fn save_quote(path: &Path, value: &str) -> Result<(), QuoteError> {
    tokio::fs::write(path, format_line(value))
        .await
        .map_err(|source| QuoteError::LocalIo {
            path: path.to_path_buf(),
            source,
        })
}
