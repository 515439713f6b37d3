//! Configuration for connecting to an OpenAI-compatible API

use crate::{Error, Result};
use std::env;
use std::time::Duration;

/// Chat model used when a [`Chat`](crate::Chat) does not name one
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4-turbo-preview";

/// Model used by [`embed`](crate::embed)
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

/// Base URL of the OpenAI API
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable overriding the base URL
pub const BASE_URL_ENV: &str = "OPENAI_BASE_URL";

/// Environment variable holding the optional organization id
pub const ORGANIZATION_ENV: &str = "OPENAI_ORG_ID";

/// Connection settings for [`OpenAiClient`](crate::OpenAiClient)
#[derive(Clone)]
pub struct ClientConfig {
    /// Bearer token sent with every request
    pub api_key: String,

    /// Endpoint prefix, e.g. `https://api.openai.com/v1`
    pub base_url: String,

    /// Sent as `OpenAI-Organization` when set
    pub organization: Option<String>,

    /// Per-request timeout of the HTTP client
    pub timeout: Duration,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .field("organization", &self.organization)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ClientConfig {
    /// Create a config for the given key with default endpoint and timeout
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            organization: None,
            timeout: Duration::from_secs(60),
        }
    }

    /// Read the configuration from the environment
    ///
    /// - `OPENAI_API_KEY`: required
    /// - `OPENAI_BASE_URL`: defaults to [`DEFAULT_BASE_URL`]
    /// - `OPENAI_ORG_ID`: optional
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use toolchat::ClientConfig;
    ///
    /// let config = ClientConfig::from_env()?;
    /// println!("talking to {}", config.base_url);
    /// # Ok::<(), toolchat::Error>(())
    /// ```
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup(API_KEY_ENV)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                Error::config(format!("{} environment variable not set", API_KEY_ENV))
            })?;

        let mut config = Self::new(api_key);
        if let Some(url) = lookup(BASE_URL_ENV).filter(|url| !url.is_empty()) {
            config = config.with_base_url(url);
        }
        config.organization = lookup(ORGANIZATION_ENV).filter(|org| !org.is_empty());
        Ok(config)
    }

    /// Use another endpoint; a trailing `/` is dropped
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
