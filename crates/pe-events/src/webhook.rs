//! Webhook publisher: posts the event envelope JSON to configured
//! URLs with bounded retry. Optional — hosts wire it up only when webhook
//! sinks are configured.

use crate::bus::EventHandler;
use crate::event::EventEnvelope;
use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub urls: Vec<String>,
    pub max_attempts: u32,
    pub retry_backoff: Duration,
    pub request_timeout: Duration,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            max_attempts: 3,
            retry_backoff: Duration::from_millis(200),
            request_timeout: Duration::from_secs(5),
        }
    }
}

pub struct WebhookPublisher {
    client: reqwest::Client,
    config: WebhookConfig,
}

impl WebhookPublisher {
    pub fn new(config: WebhookConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("reqwest client configuration is static and always valid");
        Self { client, config }
    }

    async fn post_with_retry(&self, url: &str, body: &str) -> anyhow::Result<()> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self
                .client
                .post(url)
                .header("content-type", "application/json")
                .body(body.to_string())
                .send()
                .await
                .and_then(reqwest::Response::error_for_status);

            match result {
                Ok(_) => return Ok(()),
                Err(e) if attempt >= self.config.max_attempts => {
                    return Err(anyhow::anyhow!("webhook post to {url} failed after {attempt} attempts: {e}"));
                }
                Err(e) => {
                    tracing::warn!(url, attempt, error = %e, "webhook post failed, retrying");
                    tokio::time::sleep(self.config.retry_backoff * attempt).await;
                }
            }
        }
    }
}

#[async_trait]
impl EventHandler for WebhookPublisher {
    async fn handle(&self, event: EventEnvelope) -> anyhow::Result<()> {
        if self.config.urls.is_empty() {
            return Ok(());
        }
        let body = serde_json::to_string(&event)?;
        for url in &self.config.urls {
            if let Err(e) = self.post_with_retry(url, &body).await {
                tracing::error!(error = %e, "webhook delivery exhausted retries");
            }
        }
        Ok(())
    }
}
