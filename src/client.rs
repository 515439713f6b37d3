//! Transport to the remote completion API
//!
//! The completion loop talks to the model only through [`CompletionApi`], a
//! narrow request/response interface. [`OpenAiClient`] implements it over
//! HTTP for OpenAI and compatible servers (LM Studio, Ollama, vLLM, ...).
//! Tests and alternative transports provide their own implementation.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use toolchat::{Chat, ClientConfig, OpenAiClient};
//!
//! # async fn example() -> toolchat::Result<()> {
//! let config = ClientConfig::new("not-needed").with_base_url("http://localhost:1234/v1");
//! let client = OpenAiClient::new(config)?;
//!
//! let mut chat = Chat::new(Arc::new(client)).model("qwen2.5-32b-instruct");
//! println!("{}", chat.exchange("What's the capital of France?").await?);
//! # Ok(())
//! # }
//! ```

use crate::config::ClientConfig;
use crate::types::{
    ChatCompletionRequest, ChatCompletionResponse, EmbeddingRequest, EmbeddingResponse,
};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Request/response interface to a chat completion service.
///
/// Implementations own transport concerns: authentication, timeouts, rate
/// limiting and any retry policy. Each call is one request and one response.
#[async_trait]
pub trait CompletionApi: Send + Sync {
    /// `POST /chat/completions`
    async fn create_chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse>;

    /// `POST /embeddings`
    async fn create_embeddings(&self, request: &EmbeddingRequest) -> Result<EmbeddingResponse>;
}

/// [`CompletionApi`] over HTTP with reqwest.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    config: ClientConfig,

    /// Reused across requests for connection pooling.
    http_client: reqwest::Client,
}

impl OpenAiClient {
    /// Creates a client with the timeout from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Creates a client from `OPENAI_API_KEY` and friends.
    ///
    /// See [`ClientConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.config.base_url, path);
        let mut request = self
            .http_client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(body);
        if let Some(org) = &self.config.organization {
            request = request.header("OpenAI-Organization", org);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::timeout()
            } else {
                Error::Http(e)
            }
        })?;

        // Catch authentication, rate limits, invalid models, etc.
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|e| {
                log::warn!("Failed to read error response body: {}", e);
                "Unknown error (failed to read response body)".to_string()
            });
            return Err(Error::api(format!("API error {}: {}", status, body)));
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl CompletionApi for OpenAiClient {
    async fn create_chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse> {
        self.post("chat/completions", request).await
    }

    async fn create_embeddings(&self, request: &EmbeddingRequest) -> Result<EmbeddingResponse> {
        self.post("embeddings", request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_client_creation() {
        let config = ClientConfig::new("sk-test")
            .with_base_url("http://localhost:1234/v1")
            .with_timeout(Duration::from_secs(5));

        let client = OpenAiClient::new(config).unwrap();
        assert_eq!(client.config().base_url, "http://localhost:1234/v1");
        assert_eq!(client.config().timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_client_is_object_safe_api() {
        let client = OpenAiClient::new(ClientConfig::new("sk-test")).unwrap();
        let _api: std::sync::Arc<dyn CompletionApi> = std::sync::Arc::new(client);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_http_error() {
        // Port 9 (discard) on localhost is assumed closed.
        let config = ClientConfig::new("sk-test")
            .with_base_url("http://127.0.0.1:9/v1")
            .with_timeout(Duration::from_secs(2));
        let client = OpenAiClient::new(config).unwrap();

        let request = EmbeddingRequest {
            model: "text-embedding-ada-002".to_string(),
            input: vec!["hello".to_string()],
        };
        let err = client.create_embeddings(&request).await.unwrap_err();
        assert!(matches!(err, Error::Http(_) | Error::Timeout));
    }
}
