//! # toolchat
//!
//! A small Rust library for multi-turn conversations with an OpenAI-style chat
//! completion API, where the model may call ordinary Rust functions as tools.
//!
//! ## Overview
//!
//! Works with the OpenAI API and compatible servers such as:
//! - LM Studio
//! - Ollama
//! - llama.cpp
//! - vLLM
//!
//! ## Key Features
//!
//! - **Dialogue Building**: Instructions, user and assistant turns, few-shot examples
//! - **Tool Calling**: Typed Rust functions with explicitly described parameter schemas
//! - **Completion Loop**: Automatic dispatch of tool calls until the model answers
//! - **Atomic Exchanges**: A failed exchange leaves the dialogue as it was
//! - **Embeddings**: Vector embeddings with a dot-product similarity
//! - **Retry Logic**: Opt-in exponential backoff with jitter around the transport
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use serde::Deserialize;
//! use toolchat::{tool, Chat, Describe, Schema};
//!
//! #[derive(Deserialize)]
//! struct Weather {
//!     city: String,
//! }
//!
//! impl Describe for Weather {
//!     fn describe() -> Schema {
//!         Schema::object().field("city", String::describe().with_description("city name"))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let weather = tool("get_weather", "Current weather in a city")
//!         .build(|args: Weather| Ok::<_, toolchat::Error>(format!("sunny in {}", args.city)))?;
//!
//!     let mut chat = Chat::from_env()?.with_tool(weather)?;
//!     chat.instruction("You are a helpful assistant");
//!
//!     println!("{}", chat.exchange("Should I take an umbrella in Paris?").await?);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **chat**: The `Chat` session and the completion loop
//! - **dialogue**: Ordered message history with truncation
//! - **tools**: Tool definition and type-erased handlers
//! - **schema**: JSON Schema builder and the `Describe` trait
//! - **client**: The `CompletionApi` transport trait and its HTTP implementation
//! - **embed**: Text embeddings
//! - **config**: Connection settings and model defaults
//! - **types**: Messages and wire types of the API
//! - **error**: Error type and `Result` alias
//! - **retry**: Exponential backoff retry logic with jitter

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================
// These modules are private unless explicitly re-exported below.

/// The `Chat` session: dialogue, registered tools and the completion loop.
mod chat;

/// `CompletionApi` trait and the reqwest-based `OpenAiClient`.
mod client;

/// API key, endpoint, organization and timeout, read from the environment or set explicitly.
mod config;

/// Ordered list of messages making up a conversation.
mod dialogue;

/// Embedding requests and similarity.
mod embed;

/// Error types and the `Result<T>` alias used across all public APIs.
mod error;

/// Explicit JSON Schema construction for tool parameters.
mod schema;

/// Tool definition and execution.
mod tools;

/// Messages, tool calls and request/response bodies of the API.
mod types;

// ============================================================================
// PUBLIC EXPORTS
// ============================================================================

/// Retry utilities with exponential backoff and jitter, including a
/// `CompletionApi` decorator.
pub mod retry;

// --- Chat Sessions ---

pub use chat::Chat;
pub use dialogue::Dialogue;

// --- Transport and Configuration ---

pub use client::{CompletionApi, OpenAiClient};
pub use config::{
    API_KEY_ENV, BASE_URL_ENV, ClientConfig, DEFAULT_BASE_URL, DEFAULT_CHAT_MODEL,
    DEFAULT_EMBEDDING_MODEL, ORGANIZATION_ENV,
};

// --- Embeddings ---

pub use embed::{Embedding, embed};

// --- Error Handling ---

pub use error::{Error, Result};

// --- Tool System ---

pub use schema::{Describe, Schema, SchemaType};
pub use tools::{MAX_TOOL_NAME_LEN, Tool, ToolBuilder, ToolHandler, tool};

// --- Core Types ---

pub use types::{
    ChatChoice, ChatCompletionRequest, ChatCompletionResponse, ChatTweaks, EmbeddingData,
    EmbeddingRequest, EmbeddingResponse, FinishReason, FunctionCall, Message, MessageRole,
    OpenAIFunctionDefinition, OpenAITool, ResponseMessage, ToolCall, Usage,
};

// ============================================================================
// CONVENIENCE PRELUDE
// ============================================================================

/// The most commonly used types and functions.
///
/// Import with `use toolchat::prelude::*;`.
pub mod prelude {
    pub use crate::{
        Chat, ChatTweaks, CompletionApi, Describe, Dialogue, Error, Message, OpenAiClient,
        Result, Schema, Tool, embed, tool,
    };
}
