use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::app::Result;
use crate::fetcher::{FeedSource, FetchFailure};

pub struct HttpFeedSource {
    client: Client,
}

impl HttpFeedSource {
    /// Build a client with the configured per-request timeout. The timeout
    /// bounds every endpoint attempt; there is no unbounded wait.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .user_agent(concat!("estuary/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn get(&self, url: &str) -> std::result::Result<Vec<u8>, FetchFailure> {
        let response = self.client.get(url).send().await.map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::HttpStatus(status.as_u16()));
        }

        let body = response.bytes().await.map_err(classify)?;
        Ok(body.to_vec())
    }
}

fn classify(e: reqwest::Error) -> FetchFailure {
    if e.is_timeout() {
        FetchFailure::Timeout
    } else {
        FetchFailure::Connect(e.to_string())
    }
}
