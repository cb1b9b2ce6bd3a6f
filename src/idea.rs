//! Parsing of the model's reply into a [`Palette`] or an [`AppIdea`].
//!
//! The reply is expected to be a JSON object but the schema is not enforced:
//! every field has a default and values of the wrong type are stringified.

use serde::Serialize;
use serde_json::{Map, Value};

/// A JSON object as returned by the model.
pub type Object = Map<String, Value>;

/// The reply could not be used. The message is always the same so it can be
/// shown to users as is.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Not valid JSON.
    #[error("Failed to parse the JSON response. Please try again.")]
    Json(#[from] serde_json::Error),
    /// Valid JSON but not an object.
    #[error("Failed to parse the JSON response. Please try again.")]
    NotAnObject {
        /// JSON type found instead, such as `array`.
        found: &'static str,
    },
}

/// Strictly parse `text` as a JSON object. Surrounding whitespace is allowed,
/// anything else around the object is not.
pub fn parse(text: &str) -> Result<Object, ParseError> {
    match serde_json::from_str::<Value>(text)? {
        Value::Object(object) => Ok(object),
        other => Err(ParseError::NotAnObject {
            found: kind(&other),
        }),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Get `key` as text, or `default` if it is absent or `null`. Strings are
/// used as is, other values as their JSON text.
fn text(object: &Object, key: &str, default: &str) -> String {
    match object.get(key) {
        None | Some(Value::Null) => default.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Get `key` as a list of text. A lone string is one item. Other shapes are
/// treated as absent.
fn list(object: &Object, key: &str) -> Vec<String> {
    match object.get(key) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        Some(_other) => {
            #[cfg(feature = "log")]
            log::warn!(
                "`{}` is a {}, not a list. Using no {}.",
                key,
                kind(_other),
                key
            );
            Vec::new()
        }
    }
}

/// Reply to a [`Palette`] prompt.
///
/// [`Palette`]: crate::prompt::Variant::Palette
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Palette {
    /// Primary color. Used for both theme colors.
    pub primary_color: String,
}

impl Palette {
    /// Default when `Primary_Color` is missing.
    pub const DEFAULT_COLOR: &'static str = "#FFFFFF";

    /// Extract the known fields.
    pub fn from_object(object: &Object) -> Self {
        Self {
            primary_color: text(object, "Primary_Color", Self::DEFAULT_COLOR),
        }
    }
}

/// Reply to an [`Idea`] prompt.
///
/// [`Idea`]: crate::prompt::Variant::Idea
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppIdea {
    /// App name, usually ending in `.ai`.
    pub name: String,
    /// One line pitch.
    pub tagline: String,
    /// Short description.
    pub description: String,
    /// Dark mode page background.
    pub background_color: String,
    /// Emoji shown after the name.
    pub emoji: String,
    /// Problem the app solves.
    pub problem: String,
    /// How the app solves it.
    pub solution: String,
    /// Feature list, in the order given.
    pub features: Vec<String>,
    /// How the app makes money.
    pub business_model: String,
    /// Existing alternatives.
    pub competition: String,
    /// Why the app beats them.
    pub competitive_advantage: String,
}

impl AppIdea {
    /// Default when `Name` is missing.
    pub const DEFAULT_NAME: &'static str = "App Name";
    /// Default when `Tagline` is missing.
    pub const DEFAULT_TAGLINE: &'static str = "App Tagline";
    /// Default when `Description` is missing.
    pub const DEFAULT_DESCRIPTION: &'static str = "App Description";
    /// Default when `Emoji` is missing.
    pub const DEFAULT_EMOJI: &'static str = "🎈";
    /// Default when `Background_Color` is missing.
    pub const DEFAULT_BACKGROUND: &'static str = "#FFFFFF";

    /// Extract the known fields, filling in defaults.
    pub fn from_object(object: &Object) -> Self {
        Self::from_object_with(object, Self::DEFAULT_BACKGROUND)
    }

    /// Like [`from_object`] but with `background` as the default for
    /// `Background_Color`.
    ///
    /// [`from_object`]: Self::from_object
    pub fn from_object_with(object: &Object, background: &str) -> Self {
        Self {
            name: text(object, "Name", Self::DEFAULT_NAME),
            tagline: text(object, "Tagline", Self::DEFAULT_TAGLINE),
            description: text(object, "Description", Self::DEFAULT_DESCRIPTION),
            background_color: text(
                object,
                "Background_Color",
                background,
            ),
            emoji: text(object, "Emoji", Self::DEFAULT_EMOJI),
            problem: text(object, "Problem", ""),
            solution: text(object, "Solution", ""),
            features: list(object, "Features"),
            business_model: text(object, "Business_Model", ""),
            competition: text(object, "Competition", ""),
            competitive_advantage: text(object, "Competitive_Advantage", ""),
        }
    }
}
