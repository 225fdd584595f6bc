use std::time::Duration;

use anyhow::{Context, Result};
use log::warn;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tokio::time::sleep;

use crate::config::settings::ApiSettings;
use crate::errors::ApiError;
use crate::rate_limiter::Backoff;

/// HTTP client that retries transient failures with exponential backoff
pub struct RetryingClient {
    client: Client,
    backoff: Backoff,
    max_retries: u32,
}

impl RetryingClient {
    pub fn new(settings: &ApiSettings) -> Result<Self> {
        let client = Self::build_client(&settings.user_agent, settings.timeout_secs)?;
        let backoff = Backoff::new(
            Duration::from_secs(settings.backoff_factor_secs),
            Duration::from_secs(settings.max_backoff_secs),
        );

        Ok(Self {
            client,
            backoff,
            max_retries: settings.max_retries,
        })
    }

    /// GETs `url` and decodes the body as JSON.
    ///
    /// Transport errors, 429 and 5xx are retried up to `max_retries` times;
    /// any other non-success status fails immediately.
    pub async fn get_json(&self, url: &str) -> Result<Value, ApiError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.send_get_request(url).await {
                Ok(response) if response.status().is_success() => {
                    return Self::read_json(url, response).await;
                }
                Ok(response) => {
                    let status = response.status();
                    if !is_retryable(status) || attempt > self.max_retries {
                        return Err(ApiError::Status {
                            url: url.to_string(),
                            status,
                            attempts: attempt,
                        });
                    }
                    warn!("{url} returned {status}, retrying ({attempt}/{})", self.max_retries);
                }
                Err(source) => {
                    if attempt > self.max_retries {
                        return Err(ApiError::Transport {
                            url: url.to_string(),
                            attempts: attempt,
                            source,
                        });
                    }
                    warn!("Request to {url} failed: {source}, retrying ({attempt}/{})", self.max_retries);
                }
            }
            sleep(self.backoff.delay_for(attempt)).await;
        }
    }

    fn build_client(user_agent: &str, timeout_secs: u64) -> Result<Client> {
        Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build HTTP client")
    }

    async fn send_get_request(&self, url: &str) -> reqwest::Result<reqwest::Response> {
        self.client.get(url).send().await
    }

    async fn read_json(url: &str, response: reqwest::Response) -> Result<Value, ApiError> {
        response.json::<Value>().await.map_err(|e| ApiError::Body {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}
