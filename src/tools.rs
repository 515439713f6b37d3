//! # Tool System for toolchat
//!
//! Tools are ordinary Rust functions the model may ask to call. Each tool is a
//! record of metadata the model sees (name, description, parameter schema) and
//! a handler the completion loop invokes with the model's raw JSON arguments.
//!
//! ## Tool Lifecycle
//!
//! ```text
//! 1. Definition:   Wrap a typed function `Fn(A) -> Result<R, E>` with a name and description
//! 2. Registration: The argument schema is rendered once and cached on the tool
//! 3. Invocation:   The model requests the tool by name with JSON arguments
//! 4. Execution:    The handler decodes A, calls the function, encodes R
//! 5. Response:     The JSON text (or the error text) goes back to the model
//! ```
//!
//! ## Handler Pattern
//!
//! Functions with different argument and result types are erased into one
//! shape, `Fn(&str) -> Result<String>`. The closure built in [`Tool::new`]
//! captures the decode, invoke and encode steps for its concrete types, so the
//! completion loop only ever calls a single interface.
//!
//! ## Examples
//!
//! ```rust
//! use serde::Deserialize;
//! use toolchat::{tool, Describe, Schema};
//!
//! #[derive(Deserialize)]
//! struct RollDie {
//!     max_value: u32,
//! }
//!
//! impl Describe for RollDie {
//!     fn describe() -> Schema {
//!         Schema::object().field(
//!             "max_value",
//!             u32::describe().with_description("number of sides on the die"),
//!         )
//!     }
//! }
//!
//! # fn main() -> toolchat::Result<()> {
//! let roll = tool("roll_die", "Returns a random number between 1 and max_value")
//!     .build(|args: RollDie| {
//!         if args.max_value == 0 {
//!             return Err("a die needs at least one side");
//!         }
//!         Ok(args.max_value)
//!     })?;
//!
//! assert_eq!(roll.execute(r#"{"max_value": 1}"#)?, "1");
//! assert!(roll.execute(r#"{"max_value": 0}"#).is_err());
//! # Ok(())
//! # }
//! ```

use crate::schema::{Describe, Schema};
use crate::types::{OpenAIFunctionDefinition, OpenAITool};
use crate::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::value::RawValue;
use std::sync::Arc;

/// Uniform handler shape shared by every tool: JSON text in, JSON text out.
pub type ToolHandler = Arc<dyn Fn(&str) -> Result<String> + Send + Sync>;

/// Longest tool name accepted by OpenAI-style function calling.
pub const MAX_TOOL_NAME_LEN: usize = 64;

/// A function the model can call.
///
/// Cloning is cheap: the handler is reference counted and the remaining fields
/// are small strings. All fields are fixed at construction.
#[derive(Clone)]
pub struct Tool {
    name: String,

    description: String,

    /// Typed schema the parameters were rendered from.
    schema: Schema,

    /// Canonical JSON text of `schema`, rendered once at construction.
    parameters: String,

    handler: ToolHandler,
}

impl Tool {
    /// Wraps a typed function as a tool.
    ///
    /// The argument type `A` provides the parameter schema through
    /// [`Describe`] and is decoded from the model's JSON with serde. The
    /// function's `Ok` value is encoded back to JSON; its `Err` value is turned
    /// into [`Error::Tool`] carrying the error's message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the name is empty, longer than
    /// [`MAX_TOOL_NAME_LEN`], or contains characters other than ASCII letters,
    /// digits, `_` and `-`, or if the argument schema fails
    /// [`Schema::validate`]. These are integration mistakes; nothing about the
    /// model's later input can trigger them.
    pub fn new<A, R, E, F>(
        name: impl Into<String>,
        description: impl Into<String>,
        function: F,
    ) -> Result<Self>
    where
        A: DeserializeOwned + Describe,
        R: Serialize,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
        F: Fn(A) -> std::result::Result<R, E> + Send + Sync + 'static,
    {
        Self::with_schema(name, description, A::describe(), function)
    }

    fn with_schema<A, R, E, F>(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: Schema,
        function: F,
    ) -> Result<Self>
    where
        A: DeserializeOwned,
        R: Serialize,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
        F: Fn(A) -> std::result::Result<R, E> + Send + Sync + 'static,
    {
        let name = name.into();
        validate_name(&name)?;
        schema
            .validate()
            .map_err(|e| Error::config(format!("tool '{}': {}", name, e)))?;
        let parameters = schema.to_json()?;

        let handler: ToolHandler = Arc::new(move |input: &str| {
            let args: A = serde_json::from_str(input)?;
            let output = function(args).map_err(|e| {
                let e: Box<dyn std::error::Error + Send + Sync> = e.into();
                Error::tool(e.to_string())
            })?;
            Ok(serde_json::to_string(&output)?)
        });

        Ok(Self {
            name,
            description: description.into(),
            schema,
            parameters,
            handler,
        })
    }

    /// Runs the tool on the model's JSON arguments.
    ///
    /// Returns [`Error::Json`] if `input` does not decode into the argument
    /// type or the result cannot be encoded, and [`Error::Tool`] if the
    /// function itself fails. Never panics on malformed input.
    pub fn execute(&self, input: &str) -> Result<String> {
        (self.handler)(input)
    }

    /// Builds the definition sent in the `tools` array of a request.
    pub fn to_openai_format(&self) -> Result<OpenAITool> {
        Ok(OpenAITool {
            tool_type: "function",
            function: OpenAIFunctionDefinition {
                name: self.name.clone(),
                description: self.description.clone(),
                parameters: RawValue::from_string(self.parameters.clone())?,
            },
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// The cached JSON text of the parameter schema.
    pub fn parameters(&self) -> &str {
        &self.parameters
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .finish()
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_TOOL_NAME_LEN {
        return Err(Error::config(format!(
            "tool name '{}' must be 1 to {} characters long",
            name, MAX_TOOL_NAME_LEN
        )));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(Error::config(format!(
            "tool name '{}' contains invalid character {:?}",
            name, c
        )));
    }
    Ok(())
}

/// Builder for [`Tool`], mainly useful to override the argument schema.
pub struct ToolBuilder {
    name: String,

    description: String,

    schema: Option<Schema>,
}

impl ToolBuilder {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schema: None,
        }
    }

    /// Uses `schema` instead of the argument type's [`Describe`] impl.
    ///
    /// Handy when one argument type backs several tools that need different
    /// descriptions. The schema must still match what the type deserializes.
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Finishes the tool with its function. See [`Tool::new`] for errors.
    pub fn build<A, R, E, F>(self, function: F) -> Result<Tool>
    where
        A: DeserializeOwned + Describe,
        R: Serialize,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
        F: Fn(A) -> std::result::Result<R, E> + Send + Sync + 'static,
    {
        let schema = self.schema.unwrap_or_else(A::describe);
        Tool::with_schema(self.name, self.description, schema, function)
    }
}

/// Starts building a tool.
///
/// ```rust
/// use toolchat::tool;
///
/// # fn main() -> toolchat::Result<()> {
/// let shout = tool("shout", "Upper-cases the given text")
///     .build(|text: String| Ok::<_, std::convert::Infallible>(text.to_uppercase()))?;
///
/// assert_eq!(shout.parameters(), "{\n  \"type\": \"string\"\n}");
/// assert_eq!(shout.execute("\"ahoy\"")?, "\"AHOY\"");
/// # Ok(())
/// # }
/// ```
pub fn tool(name: impl Into<String>, description: impl Into<String>) -> ToolBuilder {
    ToolBuilder::new(name, description)
}
