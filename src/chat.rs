//! # Chat Sessions and the Completion Loop
//!
//! A [`Chat`] owns a [`Dialogue`], the tools the model may call, and a handle
//! to the remote API. [`Chat::exchange`] is the usual entry point: it adds the
//! user's message, runs the completion loop and returns the model's answer.
//!
//! ## Completion Loop
//!
//! ```text
//!            ┌──────────────────────────────┐
//!            ▼                              │
//!   Sending ──► Interpreting ──► ToolDispatch
//!                   │
//!                   ├──► Done    (stop, length with content)
//!                   └──► Failed  (content filter, not finished,
//!                                 no choices, legacy function call,
//!                                 unknown finish reason, API error)
//! ```
//!
//! Every request carries the whole dialogue and all tool definitions. When the
//! model answers with tool calls, its message is appended, then one `tool`
//! message per call in the order requested. A call that cannot be served still
//! gets a reply holding the error text, so the model can react to it. Only
//! terminal states end the loop.
//!
//! ## Atomic Exchanges
//!
//! [`Chat::exchange`] records the dialogue length before it starts. If
//! anything fails, the dialogue is truncated back to that length, dropping the
//! user message and any intermediate tool traffic. On success the full
//! transcript is kept.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use toolchat::Chat;
//!
//! # async fn example() -> toolchat::Result<()> {
//! let mut chat = Chat::from_env()?;
//! chat.instruction("Talk like a pirate. A cool pirate.");
//!
//! let answer = chat.exchange("Tell me how to cook scrambled eggs.").await?;
//! println!("{}", answer);
//! # Ok(())
//! # }
//! ```

use crate::client::{CompletionApi, OpenAiClient};
use crate::config::DEFAULT_CHAT_MODEL;
use crate::dialogue::Dialogue;
use crate::tools::Tool;
use crate::types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatTweaks, FinishReason, Message, ToolCall,
};
use crate::{Error, Result};
use std::sync::Arc;

/// A conversation with the model.
///
/// One exchange runs at a time; every operation that changes the dialogue
/// takes `&mut self`.
pub struct Chat {
    /// Messages exchanged so far. Updated by [`Chat::exchange`] and
    /// [`Chat::talk`], and by the append helpers for priming.
    dialogue: Dialogue,

    /// Model identifier sent with each request.
    model: String,

    /// Sampling parameters; unset values are left to the server.
    tweaks: ChatTweaks,

    /// Tools the model may call, unique by name.
    tools: Vec<Tool>,

    /// Cap on tool-call round trips per [`Chat::talk`]; `None` is unbounded.
    max_tool_rounds: Option<u32>,

    api: Arc<dyn CompletionApi>,
}

impl std::fmt::Debug for Chat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chat")
            .field("dialogue", &format!("{} messages", self.dialogue.len()))
            .field("model", &self.model)
            .field("tweaks", &self.tweaks)
            .field(
                "tools",
                &self.tools.iter().map(Tool::name).collect::<Vec<_>>(),
            )
            .field("max_tool_rounds", &self.max_tool_rounds)
            .finish()
    }
}

/// What the loop does after interpreting a response.
enum Step {
    /// Final answer; the message has not been appended yet.
    Done(Message),
    /// The model wants tools run; the message carries at least one call.
    Dispatch(Message),
}

impl Chat {
    /// Creates an empty chat using [`DEFAULT_CHAT_MODEL`].
    pub fn new(api: Arc<dyn CompletionApi>) -> Self {
        Self {
            dialogue: Dialogue::new(),
            model: DEFAULT_CHAT_MODEL.to_string(),
            tweaks: ChatTweaks::default(),
            tools: Vec::new(),
            max_tool_rounds: None,
            api,
        }
    }

    /// Creates an empty chat backed by an [`OpenAiClient`] configured from the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `OPENAI_API_KEY` is not set.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(Arc::new(OpenAiClient::from_env()?)))
    }

    /// Sets the model identifier.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn tweaks(mut self, tweaks: ChatTweaks) -> Self {
        self.tweaks = tweaks;
        self
    }

    /// Caps the number of tool-call round trips in one [`Chat::talk`].
    ///
    /// Exceeding the cap fails with [`Error::ToolRoundLimit`]. The default,
    /// `None`, lets the model call tools for as long as it keeps asking.
    pub fn max_tool_rounds(mut self, limit: Option<u32>) -> Self {
        self.max_tool_rounds = limit;
        self
    }

    /// Registers a tool, builder style. See [`Chat::register_tool`].
    pub fn with_tool(mut self, tool: Tool) -> Result<Self> {
        self.register_tool(tool)?;
        Ok(self)
    }

    /// Makes `tool` available to the model.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a tool with the same name is registered.
    pub fn register_tool(&mut self, tool: Tool) -> Result<()> {
        if self.get_tool(tool.name()).is_some() {
            return Err(Error::config(format!(
                "a tool named '{}' is already registered",
                tool.name()
            )));
        }
        self.tools.push(tool);
        Ok(())
    }

    pub fn get_tool(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    pub fn chat_tweaks(&self) -> ChatTweaks {
        self.tweaks
    }

    pub fn api(&self) -> &Arc<dyn CompletionApi> {
        &self.api
    }

    pub fn dialogue(&self) -> &Dialogue {
        &self.dialogue
    }

    /// Direct access to the dialogue, e.g. to truncate it or restore one.
    pub fn dialogue_mut(&mut self) -> &mut Dialogue {
        &mut self.dialogue
    }

    /// Adds a system instruction, such as the role the model should play.
    pub fn instruction(&mut self, text: impl Into<String>) {
        self.dialogue.instruction(text);
    }

    pub fn user_said(&mut self, text: impl Into<String>) {
        self.dialogue.user_said(text);
    }

    pub fn assistant_said(&mut self, text: impl Into<String>) {
        self.dialogue.assistant_said(text);
    }

    /// Adds a user message and a model response, to guide how it answers.
    pub fn example_exchange(&mut self, input: impl Into<String>, response: impl Into<String>) {
        self.dialogue.example_exchange(input, response);
    }

    /// Adds `content` as a user message and returns the model's answer.
    ///
    /// Tool calls requested along the way are served automatically. On
    /// success the dialogue holds the user message, any tool traffic and the
    /// answer. On failure it is exactly as it was before the call.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] if `content` is empty
    /// - any error from [`Chat::talk`]
    pub async fn exchange(&mut self, content: impl Into<String>) -> Result<String> {
        let content = content.into();
        if content.is_empty() {
            return Err(Error::invalid_input("empty content"));
        }

        let checkpoint = self.dialogue.len();
        self.dialogue.user_said(content);

        match self.talk().await {
            Ok(response) => Ok(response),
            Err(e) => {
                log::debug!(
                    "Exchange failed, rolling back {} message(s): {}",
                    self.dialogue.len() - checkpoint,
                    e
                );
                self.dialogue.truncate(checkpoint);
                Err(e)
            }
        }
    }

    /// Asks the model to respond to the dialogue as it stands.
    ///
    /// Runs the completion loop until the model gives a final answer, which is
    /// appended to the dialogue and returned. Unlike [`Chat::exchange`], a
    /// failure leaves any tool traffic from earlier rounds in the dialogue.
    ///
    /// # Errors
    ///
    /// - transport errors from the [`CompletionApi`]
    /// - [`Error::ContentFilter`], [`Error::NotFinished`]
    /// - [`Error::UnexpectedResponse`] for no choices, the deprecated
    ///   `function_call` form, tool calls without calls, or an unknown finish
    ///   reason
    /// - [`Error::ToolRoundLimit`] if a cap is set and exceeded
    pub async fn talk(&mut self) -> Result<String> {
        let tools = self
            .tools
            .iter()
            .map(Tool::to_openai_format)
            .collect::<Result<Vec<_>>>()?;
        let mut rounds = 0u32;

        loop {
            let request = ChatCompletionRequest {
                model: self.model.clone(),
                messages: self.dialogue.messages().to_vec(),
                temperature: self.tweaks.temperature,
                top_p: self.tweaks.top_p,
                tools: tools.clone(),
            };
            log::debug!(
                "Requesting completion from {} ({} messages, {} tools)",
                request.model,
                request.messages.len(),
                request.tools.len()
            );

            let response = self.api.create_chat_completion(&request).await?;

            match interpret(response)? {
                Step::Done(message) => {
                    let text = message.content.clone();
                    self.dialogue.push(message);
                    return Ok(text);
                }
                Step::Dispatch(message) => {
                    if let Some(limit) = self.max_tool_rounds {
                        if rounds >= limit {
                            return Err(Error::ToolRoundLimit(limit));
                        }
                    }
                    rounds += 1;
                    self.dispatch(message);
                }
            }
        }
    }

    /// Appends the tool-call message and one reply per call.
    fn dispatch(&mut self, message: Message) {
        let calls = message.tool_calls().to_vec();
        self.dialogue.push(message);

        for call in calls {
            log::debug!("Calling tool {} ({})", call.function.name, call.id);
            let content = match self.run_tool_call(&call) {
                Ok(output) => output,
                Err(reason) => format!("error: {}", reason),
            };
            self.dialogue.push(Message::tool(call.id, content));
        }
    }

    /// Runs one call; the error is the text reported back to the model.
    fn run_tool_call(&self, call: &ToolCall) -> std::result::Result<String, String> {
        if call.call_type != "function" {
            log::warn!("Model requested unknown tool call type {}", call.call_type);
            return Err(format!("unknown tool call type {}", call.call_type));
        }

        let tool = self.get_tool(&call.function.name).ok_or_else(|| {
            log::warn!("Model requested unregistered tool {}", call.function.name);
            format!("no tool found with name {}", call.function.name)
        })?;

        tool.execute(&call.function.arguments).map_err(|e| match e {
            Error::Tool(msg) => msg,
            other => other.to_string(),
        })
    }
}

/// Maps the first choice's finish reason to the loop's next step.
fn interpret(response: ChatCompletionResponse) -> Result<Step> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::unexpected_response("API returned no choices"))?;
    let message = choice.message.into_message();

    match choice.finish_reason {
        Some(FinishReason::ToolCalls) => {
            if message.tool_calls().is_empty() {
                return Err(Error::unexpected_response("no calls provided"));
            }
            Ok(Step::Dispatch(message))
        }
        Some(FinishReason::FunctionCall) => Err(Error::unexpected_response(
            "deprecated function call returned by API",
        )),
        Some(FinishReason::ContentFilter) => Err(Error::ContentFilter),
        None | Some(FinishReason::Null) => Err(Error::NotFinished),
        Some(FinishReason::Length) if message.content.is_empty() => Err(Error::NotFinished),
        Some(FinishReason::Stop) | Some(FinishReason::Length) => Ok(Step::Done(message)),
        Some(FinishReason::Unknown) => Err(Error::unexpected_response(
            "unrecognized finish reason",
        )),
    }
}
