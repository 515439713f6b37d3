//! # Parameter Schemas for Tools
//!
//! A [`Schema`] describes the JSON shape a tool expects as its argument, in the
//! subset of JSON Schema understood by OpenAI-style function calling:
//!
//! - `object` with ordered `properties`, a `required` list
//! - `array` with a nested `items` schema
//! - the primitives `string`, `integer`, `number`, `boolean`
//! - optional `description` and `enum` annotations on any node
//!
//! Schemas are declared explicitly rather than discovered at runtime. Types used
//! as tool arguments implement [`Describe`]; the primitive and container impls
//! are provided here, struct-like types build theirs with [`Schema::object`].
//!
//! ```rust
//! use serde::Deserialize;
//! use toolchat::{Describe, Schema};
//!
//! #[derive(Deserialize)]
//! struct Fruit {
//!     #[serde(rename = "text")]
//!     name: String,
//!     #[serde(default)]
//!     consumption: Vec<i64>,
//! }
//!
//! impl Describe for Fruit {
//!     fn describe() -> Schema {
//!         Schema::object()
//!             .field(
//!                 "text",
//!                 String::describe()
//!                     .with_description("your favourite fruit")
//!                     .with_enum(["apple", "banana", "orange"]),
//!             )
//!             .optional_field(
//!                 "consumption",
//!                 Vec::<i64>::describe().with_description("number of fruits eaten each day"),
//!             )
//!     }
//! }
//!
//! let schema = Fruit::describe();
//! assert_eq!(schema.required(), ["text"]);
//! ```
//!
//! Serialization is deterministic: properties keep declaration order and every
//! node emits its keys as `type`, `properties`, `items`, `description`,
//! `required`, `enum`. Tools serialize their schema once, at registration.

use crate::{Error, Result};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::HashSet;

/// The JSON type of a schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    Object,
    Array,
    String,
    Integer,
    Number,
    Boolean,
}

impl SchemaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaType::Object => "object",
            SchemaType::Array => "array",
            SchemaType::String => "string",
            SchemaType::Integer => "integer",
            SchemaType::Number => "number",
            SchemaType::Boolean => "boolean",
        }
    }
}

/// Object properties in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
struct Properties(Vec<(String, Schema)>);

impl Properties {
    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Properties {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, schema) in &self.0 {
            map.serialize_entry(name, schema)?;
        }
        map.end()
    }
}

/// Structural description of a tool argument.
///
/// Built with the constructors ([`Schema::object`], [`Schema::array`],
/// [`Schema::string`], ...) and annotated with [`Schema::with_description`] and
/// [`Schema::with_enum`]. A schema is never mutated once a tool holds it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    #[serde(rename = "type")]
    schema_type: SchemaType,

    #[serde(skip_serializing_if = "Properties::is_empty")]
    properties: Properties,

    #[serde(skip_serializing_if = "Option::is_none")]
    items: Option<Box<Schema>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    required: Vec<String>,

    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty")]
    enum_values: Vec<String>,
}

impl Schema {
    fn of(schema_type: SchemaType) -> Self {
        Self {
            schema_type,
            properties: Properties::default(),
            items: None,
            description: None,
            required: Vec::new(),
            enum_values: Vec::new(),
        }
    }

    /// An object with no properties yet. Serializes as `{"type":"object"}`.
    pub fn object() -> Self {
        Self::of(SchemaType::Object)
    }

    /// An array whose elements follow `items`.
    pub fn array(items: Schema) -> Self {
        let mut schema = Self::of(SchemaType::Array);
        schema.items = Some(Box::new(items));
        schema
    }

    pub fn string() -> Self {
        Self::of(SchemaType::String)
    }

    pub fn integer() -> Self {
        Self::of(SchemaType::Integer)
    }

    pub fn number() -> Self {
        Self::of(SchemaType::Number)
    }

    pub fn boolean() -> Self {
        Self::of(SchemaType::Boolean)
    }

    /// Adds a required property.
    ///
    /// `name` is the key as it appears in JSON, so it should match the field's
    /// serde name (including any `rename`).
    pub fn field(mut self, name: impl Into<String>, schema: Schema) -> Self {
        let name = name.into();
        self.required.push(name.clone());
        self.properties.0.push((name, schema));
        self
    }

    /// Adds a property the model may leave out. It is never listed in
    /// `required`; pair it with `#[serde(default)]` on the Rust side.
    pub fn optional_field(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.properties.0.push((name.into(), schema));
        self
    }

    /// Attaches a human-readable description for the model.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Restricts a string to the given values, in the given order.
    pub fn with_enum<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn schema_type(&self) -> SchemaType {
        self.schema_type
    }

    /// Looks up a property by its JSON name.
    pub fn property(&self, name: &str) -> Option<&Schema> {
        self.properties
            .0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s)
    }

    /// Property names in declaration order.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.0.iter().map(|(n, _)| n.as_str())
    }

    pub fn items(&self) -> Option<&Schema> {
        self.items.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }

    pub fn enum_values(&self) -> &[String] {
        &self.enum_values
    }

    /// Checks that the schema can be expressed on the wire.
    ///
    /// Rejects properties on anything but objects, empty or duplicate property
    /// names, and `enum` on non-strings. Nested schemas are checked
    /// recursively; the error names the path to the offending node.
    pub fn validate(&self) -> Result<()> {
        self.validate_at("$")
    }

    fn validate_at(&self, path: &str) -> Result<()> {
        if self.schema_type != SchemaType::Object && !self.properties.is_empty() {
            return Err(Error::config(format!(
                "schema at {} is {} but declares properties",
                path,
                self.schema_type.as_str()
            )));
        }

        if !self.enum_values.is_empty() && self.schema_type != SchemaType::String {
            return Err(Error::config(format!(
                "schema at {} is {}, enum is only supported on strings",
                path,
                self.schema_type.as_str()
            )));
        }

        let mut seen = HashSet::new();
        for (name, property) in &self.properties.0 {
            if name.is_empty() {
                return Err(Error::config(format!(
                    "schema at {} has a property with an empty name",
                    path
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(Error::config(format!(
                    "schema at {} declares property '{}' twice",
                    path, name
                )));
            }
            property.validate_at(&format!("{}.{}", path, name))?;
        }

        if let Some(items) = &self.items {
            items.validate_at(&format!("{}[]", path))?;
        }

        Ok(())
    }

    /// Renders the canonical JSON text sent to the model.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Types that can describe their own JSON shape.
///
/// Implement this for every type used as a tool argument. The returned schema
/// must agree with the type's `Deserialize` impl: same property names, and
/// `optional_field` exactly for fields that tolerate being absent.
pub trait Describe {
    fn describe() -> Schema;
}

impl Describe for String {
    fn describe() -> Schema {
        Schema::string()
    }
}

impl Describe for bool {
    fn describe() -> Schema {
        Schema::boolean()
    }
}

macro_rules! describe_as {
    ($constructor:ident: $($ty:ty),+) => {
        $(
            impl Describe for $ty {
                fn describe() -> Schema {
                    Schema::$constructor()
                }
            }
        )+
    };
}

describe_as!(integer: i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
describe_as!(number: f32, f64);

impl<T: Describe> Describe for Vec<T> {
    fn describe() -> Schema {
        Schema::array(T::describe())
    }
}

// Whether a field may be absent is decided by the enclosing object.
impl<T: Describe> Describe for Option<T> {
    fn describe() -> Schema {
        T::describe()
    }
}

impl<T: Describe> Describe for Box<T> {
    fn describe() -> Schema {
        T::describe()
    }
}
