//! Output encodings.
//!
//! The output tree is rendered either as JSON text or handed back as the
//! native [`serde_json::Value`]. Format names are resolved once into
//! [`OutputFormat`]; unknown names fail with
//! [`OutputError::UnsupportedFormat`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{OutputError, OutputResult};

/// Supported output encodings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Compact JSON text
    #[default]
    Json,
    /// Indented JSON text
    JsonPretty,
    /// The in-memory value itself
    Plain,
}

impl OutputFormat {
    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::JsonPretty => "json-pretty",
            OutputFormat::Plain => "plain",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = OutputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(OutputFormat::Json),
            "json-pretty" => Ok(OutputFormat::JsonPretty),
            "plain" => Ok(OutputFormat::Plain),
            other => Err(OutputError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A rendered output
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Json(String),
    Plain(Value),
}

impl Output {
    /// The JSON text, if this is a text encoding.
    pub fn as_json(&self) -> Option<&str> {
        match self {
            Output::Json(text) => Some(text),
            Output::Plain(_) => None,
        }
    }

    /// The native value, if this is the plain encoding.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Output::Plain(value) => Some(value),
            Output::Json(_) => None,
        }
    }

    /// Convert into a value, decoding JSON text if needed.
    pub fn into_value(self) -> OutputResult<Value> {
        match self {
            Output::Json(text) => Ok(serde_json::from_str(&text)?),
            Output::Plain(value) => Ok(value),
        }
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Json(text) => f.write_str(text),
            Output::Plain(value) => write!(f, "{}", value),
        }
    }
}

/// Render `value` with `format`.
pub fn render(value: Value, format: OutputFormat) -> OutputResult<Output> {
    match format {
        OutputFormat::Json => Ok(Output::Json(serde_json::to_string(&value)?)),
        OutputFormat::JsonPretty => Ok(Output::Json(serde_json::to_string_pretty(&value)?)),
        OutputFormat::Plain => Ok(Output::Plain(value)),
    }
}
