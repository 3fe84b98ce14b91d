use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::core::quote::required_str;
use crate::core::{Deadline, Quote, QuoteError, QuoteSource};

/// Upstream payload. The bid is read from the top level first, then from the
/// provider's envelope keyed by the pair code (`{"USDBRL": {"bid": ...}}`).
#[derive(Deserialize, Debug)]
struct UpstreamQuote {
    bid: Option<Value>,
    #[serde(flatten)]
    pairs: HashMap<String, Value>,
}

impl UpstreamQuote {
    fn bid(&self, pair_key: &str) -> Result<&str, QuoteError> {
        if self.bid.is_some() {
            return required_str(self.bid.as_ref(), "bid");
        }
        required_str(
            self.pairs.get(pair_key).and_then(|pair| pair.get("bid")),
            "bid",
        )
    }
}

// AwesomeApiProvider implementation for QuoteSource
pub struct AwesomeApiProvider {
    client: reqwest::Client,
    url: String,
    pair_key: String,
}

impl AwesomeApiProvider {
    pub fn new(base_url: &str, pair: &str) -> Result<Self, QuoteError> {
        let client = reqwest::Client::builder()
            .user_agent("cotacao/1.0")
            .build()
            .map_err(|e| QuoteError::RequestConstruction(e.to_string()))?;
        Ok(AwesomeApiProvider {
            client,
            url: format!("{}/json/last/{}", base_url.trim_end_matches('/'), pair),
            pair_key: pair.replace('-', ""),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl QuoteSource for AwesomeApiProvider {
    #[instrument(
        name = "UpstreamQuoteFetch",
        skip(self, deadline),
        fields(url = %self.url, budget_ms = deadline.budget().as_millis() as u64)
    )]
    async fn fetch_quote(&self, deadline: &Deadline) -> Result<Quote, QuoteError> {
        let request = self
            .client
            .get(&self.url)
            .timeout(deadline.remaining())
            .build()
            .map_err(|e| QuoteError::RequestConstruction(e.to_string()))?;

        let body = deadline
            .run(async {
                let response = self.client.execute(request).await.map_err(|source| {
                    QuoteError::UpstreamTransport {
                        url: self.url.clone(),
                        source,
                    }
                })?;
                debug!(status = %response.status(), "Received upstream response");

                if !response.status().is_success() {
                    return Err(QuoteError::UpstreamStatus {
                        url: self.url.clone(),
                        status: response.status(),
                    });
                }

                response
                    .bytes()
                    .await
                    .map_err(|source| QuoteError::UpstreamTransport {
                        url: self.url.clone(),
                        source,
                    })
            })
            .await??;

        let data: UpstreamQuote = serde_json::from_slice(&body)?;
        let bid = data.bid(&self.pair_key)?;

        Ok(Quote {
            value: bid.to_string(),
        })
    }
}
