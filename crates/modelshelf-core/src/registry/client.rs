//! HTTP registry client.

use super::retry::{retry_async, RetryPolicy};
use super::types::{HashLookup, ModelDetails, ModelVersion};
use super::ModelRegistry;
use crate::config::{RegistryConfig, RegistryDefaults};
use crate::error::{OrganizerError, Result};
use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Civitai-compatible registry client.
///
/// Transient statuses are retried according to the [`RetryPolicy`]; the
/// caller only ever sees a definitive answer or a fatal error.
pub struct RegistryClient {
    client: Client,
    base_url: String,
    api_token: Option<String>,
    retry: RetryPolicy,
}

impl RegistryClient {
    /// Create a client from registry settings.
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(RegistryDefaults::USER_AGENT)
            .build()
            .map_err(|e| OrganizerError::Network {
                message: format!("Failed to create HTTP client: {}", e),
                source: Some(e),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone().filter(|t| !t.is_empty()),
            retry: RetryPolicy::fixed(config.backoff()).with_max_attempts(config.max_attempts),
        })
    }

    /// Replace the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if an HTTP status code is a transient server-side failure.
    pub fn is_transient_status(status: StatusCode) -> bool {
        matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
    }

    async fn send_once(&self, url: &str) -> Result<Response> {
        let mut request = self.client.get(url);
        if let Some(token) = &self.api_token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = request.send().await.map_err(|e| OrganizerError::Network {
            message: format!("GET {} failed: {}", url, e),
            source: Some(e),
        })?;

        let status = response.status();
        if Self::is_transient_status(status) {
            return Err(OrganizerError::TransientStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }

    /// GET with fixed-interval retry on transient statuses.
    async fn get(&self, url: &str) -> Result<Response> {
        let (result, stats) =
            retry_async(&self.retry, || self.send_once(url), OrganizerError::is_retryable).await;
        if stats.attempts > 1 {
            debug!("GET {} took {} attempts", url, stats.attempts);
        }
        result
    }

    async fn parse<T: DeserializeOwned>(response: Response, url: &str) -> Result<T> {
        response.json::<T>().await.map_err(|e| OrganizerError::Registry {
            message: format!("Failed to parse response from {}: {}", url, e),
            status_code: None,
        })
    }

    fn unexpected(status: StatusCode, url: &str) -> OrganizerError {
        OrganizerError::Registry {
            message: format!("Registry returned {} for {}", status, url),
            status_code: Some(status.as_u16()),
        }
    }
}

#[async_trait]
impl ModelRegistry for RegistryClient {
    async fn lookup_by_hash(&self, hash: &str) -> Result<HashLookup> {
        let url = format!("{}/model-versions/by-hash/{}", self.base_url, hash);
        let response = self.get(&url).await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                debug!("Registry does not know hash {}", hash);
                Ok(HashLookup::NotFound)
            }
            status if status.is_success() => {
                let version: ModelVersion = Self::parse(response, &url).await?;
                Ok(HashLookup::Found(version))
            }
            status => Err(Self::unexpected(status, &url)),
        }
    }

    async fn lookup_by_id(&self, model_id: i64) -> Result<ModelDetails> {
        let url = format!("{}/models/{}", self.base_url, model_id);
        let response = self.get(&url).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::unexpected(status, &url));
        }
        Self::parse(response, &url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_status_codes() {
        assert!(RegistryClient::is_transient_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(RegistryClient::is_transient_status(StatusCode::BAD_GATEWAY));
        assert!(RegistryClient::is_transient_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(RegistryClient::is_transient_status(StatusCode::GATEWAY_TIMEOUT));
        assert!(RegistryClient::is_transient_status(StatusCode::TOO_MANY_REQUESTS));

        assert!(!RegistryClient::is_transient_status(StatusCode::OK));
        assert!(!RegistryClient::is_transient_status(StatusCode::NOT_FOUND));
        assert!(!RegistryClient::is_transient_status(StatusCode::FORBIDDEN));
    }

    #[test]
    fn test_client_from_config() {
        let config = RegistryConfig {
            base_url: "https://registry.example/api/v1/".into(),
            api_token: Some(String::new()),
            max_attempts: Some(2),
            ..RegistryConfig::default()
        };

        let client = RegistryClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "https://registry.example/api/v1");
        assert_eq!(client.api_token, None);
        assert_eq!(client.retry.max_attempts, Some(2));
        assert_eq!(client.retry.interval, config.backoff());
    }
}
