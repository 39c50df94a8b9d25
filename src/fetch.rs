use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;

use crate::config::FetchConfig;

/// Supplies raw page markup for a source URL. The engine treats any fetch
/// error uniformly and never inspects its type.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, source: &str) -> Result<String>;
}

pub struct HttpFetcher {
    client: Client,
    settle_delay: Duration,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Self {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            settle_delay: Duration::from_secs(config.settle_delay_secs),
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, source: &str) -> Result<String> {
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }
        let response = self
            .client
            .get(source)
            .send()
            .await
            .with_context(|| format!("failed GET request: {source}"))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("failed reading response body: {source}"))?;
        if !status.is_success() {
            let preview: String = body.chars().take(180).collect();
            return Err(anyhow!("GET {source} returned {status}: {preview}"));
        }
        Ok(body)
    }
}
