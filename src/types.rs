//! Core types for toolchat: dialogue messages and the OpenAI wire format

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

/// Message role in the conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    // Some compatible servers leave the type out
    #[serde(rename = "type", default = "function_call_type")]
    pub call_type: String,
    pub function: FunctionCall,
}

fn function_call_type() -> String {
    "function".to_string()
}

impl ToolCall {
    /// Create a call of type `function`
    pub fn function(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            call_type: function_call_type(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// Function name and JSON-encoded arguments of a tool call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

/// A message in the dialogue.
///
/// This is also the wire representation: assistant messages returned by the
/// API are stored as received so that tool-call ids survive the round trip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: MessageRole,

    // Assistant messages that only carry tool calls come back with
    // `"content": null`; the API still wants the field present on the way out.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,

    // OpenAI rejects `"tool_calls": []`
    #[serde(default, skip_serializing_if = "has_no_calls")]
    pub tool_calls: Option<Vec<ToolCall>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

fn has_no_calls(calls: &Option<Vec<ToolCall>>) -> bool {
    calls.as_ref().is_none_or(Vec::is_empty)
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(MessageRole::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(MessageRole::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, text)
    }

    /// A tool's reply to the call with id `tool_call_id`
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: content.into(),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// Tool calls carried by this message, empty if there are none
    pub fn tool_calls(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or(&[])
    }
}

/// Sampling parameters passed through to the API.
///
/// `None` leaves the choice to the server. It is generally recommended to alter
/// either `temperature` or `top_p`, not both.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChatTweaks {
    /// Sampling temperature between 0 and 2. Higher values like 0.8 make the
    /// output more random, lower values like 0.2 more focused and deterministic.
    pub temperature: Option<f32>,

    /// Nucleus sampling: only tokens within the top `top_p` probability mass
    /// are considered, so 0.1 means the top 10%.
    pub top_p: Option<f32>,
}

impl ChatTweaks {
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }
}

/// OpenAI tool definition
#[derive(Debug, Clone, Serialize)]
pub struct OpenAITool {
    #[serde(rename = "type")]
    pub tool_type: &'static str,
    pub function: OpenAIFunctionDefinition,
}

/// OpenAI function definition; `parameters` is the tool's cached schema text
#[derive(Debug, Clone, Serialize)]
pub struct OpenAIFunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Box<RawValue>,
}

/// OpenAI chat completion request
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<OpenAITool>,
}

/// Why the model stopped generating
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    FunctionCall,
    /// Some servers send the string `"null"` instead of a JSON null
    Null,
    #[serde(other)]
    Unknown,
}

/// OpenAI chat completion response
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

/// One completion choice
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub index: u32,
    pub message: ResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
}

/// Message as returned by the API, including the deprecated `function_call`
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    pub role: MessageRole,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default)]
    pub function_call: Option<FunctionCall>,
}

impl ResponseMessage {
    /// Converts into a dialogue message, dropping the legacy `function_call`
    pub fn into_message(self) -> Message {
        Message {
            role: self.role,
            content: self.content.unwrap_or_default(),
            tool_calls: self.tool_calls.filter(|calls| !calls.is_empty()),
            tool_call_id: None,
        }
    }
}

/// Token usage reported by the API
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// OpenAI embeddings request
#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingRequest {
    pub model: String,
    pub input: Vec<String>,
}

/// OpenAI embeddings response
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingResponse {
    pub data: Vec<EmbeddingData>,
    #[serde(default)]
    pub usage: Usage,
}

/// One embedding vector in the response
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingData {
    #[serde(default)]
    pub index: u32,
    pub embedding: Vec<f32>,
}
