//! Error types for toolchat

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration (missing credentials, malformed tool definitions)
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// API error from the model server
    #[error("API error: {0}")]
    Api(String),

    /// A tool function returned an error
    #[error("Tool execution error: {0}")]
    Tool(String),

    /// The response was omitted by the server's content filter
    #[error("response omitted due to content filter")]
    ContentFilter,

    /// The server reported that generation did not finish
    #[error("response generation not finished")]
    NotFinished,

    /// The response had a shape the completion loop cannot handle
    #[error("unexpected response from API: {0}")]
    UnexpectedResponse(String),

    /// The model kept requesting tools past the configured round limit
    #[error("tool call round limit of {0} reached")]
    ToolRoundLimit(u32),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Timeout error
    #[error("Request timeout")]
    Timeout,

    /// Other errors
    #[error("Error: {0}")]
    Other(String),
}

impl Error {
    /// Create a new config error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a new API error
    pub fn api(msg: impl Into<String>) -> Self {
        Error::Api(msg.into())
    }

    /// Create a new tool error
    pub fn tool(msg: impl Into<String>) -> Self {
        Error::Tool(msg.into())
    }

    /// Create a new unexpected response error
    pub fn unexpected_response(msg: impl Into<String>) -> Self {
        Error::UnexpectedResponse(msg.into())
    }

    /// Create a new invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Create a new other error
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Create a timeout error
    pub fn timeout() -> Self {
        Error::Timeout
    }
}
