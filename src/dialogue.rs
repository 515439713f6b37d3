//! The message log exchanged with the model
//!
//! A [`Dialogue`] only grows, one message at a time, except for
//! [`Dialogue::truncate`], which restores an earlier length. Exchanges use it
//! to undo every message they appended when they fail part-way, so callers
//! never see a half-finished tool exchange.
//!
//! ```rust
//! use toolchat::{Dialogue, MessageRole};
//!
//! let mut dialogue = Dialogue::new();
//! dialogue.instruction("Talk like a pirate.");
//! dialogue.example_exchange("Hello", "Ahoy, matey!");
//!
//! let checkpoint = dialogue.len();
//! dialogue.user_said("Where be the treasure?");
//! dialogue.truncate(checkpoint);
//!
//! assert_eq!(dialogue.len(), 3);
//! assert_eq!(dialogue.last().map(|m| m.role), Some(MessageRole::Assistant));
//! ```

use crate::types::Message;
use serde::Serialize;

/// Ordered, chronological list of messages.
///
/// A message carrying tool calls is always directly followed by the tool
/// replies to those calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Dialogue {
    messages: Vec<Message>,
}

impl Dialogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a system message, typically telling the model what role to play.
    pub fn instruction(&mut self, text: impl Into<String>) {
        self.push(Message::system(text));
    }

    /// Adds a message from the user.
    pub fn user_said(&mut self, text: impl Into<String>) {
        self.push(Message::user(text));
    }

    /// Adds a message as if said by the model.
    pub fn assistant_said(&mut self, text: impl Into<String>) {
        self.push(Message::assistant(text));
    }

    /// Adds a user message and the model's answer to it, to show the model
    /// how it is expected to respond.
    pub fn example_exchange(&mut self, input: impl Into<String>, response: impl Into<String>) {
        self.user_said(input);
        self.assistant_said(response);
    }

    /// Appends an arbitrary message.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Rolls back to a previously observed length.
    ///
    /// Has no effect if `len` is not shorter than the dialogue.
    pub fn truncate(&mut self, len: usize) {
        self.messages.truncate(len);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}

impl From<Vec<Message>> for Dialogue {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

impl<'a> IntoIterator for &'a Dialogue {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}
