//! Error types for the product import pipeline.
//!
//! This module defines one error type per pipeline layer:
//!
//! - [`CsvError`] - Reading and parsing the source file
//! - [`TransformError`] - Grouping, rule sorting and structural mapping
//! - [`OutputError`] - Rendering the output tree
//! - [`ConfigError`] - Loading pipeline config documents
//! - [`PipelineError`] - Top-level wrapper returned by the CLI and config runner
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use std::path::PathBuf;

use thiserror::Error;

// =============================================================================
// CSV Parsing Errors
// =============================================================================

/// Errors while reading or parsing the source file.
#[derive(Debug, Error)]
pub enum CsvError {
    /// The source file could not be opened or read.
    #[error("Source not found '{}': {source}", .path.display())]
    SourceNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to decode the raw bytes.
    #[error("Failed to decode input as {0}")]
    Encoding(String),

    /// Malformed delimited text.
    #[error("Invalid CSV at line {line}: {message}")]
    Parse { line: u64, message: String },

    /// A data row does not have as many fields as the header.
    #[error("Line {line}: expected {expected} fields, found {found}")]
    RowLength {
        line: u64,
        expected: usize,
        found: usize,
    },

    /// The same column name appears twice in the header.
    #[error("Duplicate header column: {0}")]
    DuplicateHeader(String),

    /// No header row could be read.
    #[error("CSV file is empty")]
    EmptyFile,
}

// =============================================================================
// Transformation Errors
// =============================================================================

/// Errors raised by the group, sort and map stages.
#[derive(Debug, Error, PartialEq)]
pub enum TransformError {
    /// A stage was asked to key on a field the records do not have.
    #[error("Missing field: {0}")]
    MissingField(String),

    /// The mapping structure references a field the records do not have.
    #[error("Unknown field in structure: {0}")]
    UnknownField(String),

    /// A discriminator value has no registered rule.
    #[error("No sorting rule registered for '{rule}'")]
    UnknownRule { rule: String },

    /// A comparison value is missing from its rule's order list.
    #[error("Value '{value}' of field '{field}' is not ranked by rule '{rule}'")]
    UnrankedValue {
        rule: String,
        field: String,
        value: String,
    },

    /// Records of one group disagree on a scalar field under the uniform policy.
    #[error("Group '{group}' has conflicting values for field '{field}'")]
    ConflictingValues { field: String, group: String },

    /// Sorting or mapping was requested before grouping.
    #[error("Records must be grouped first")]
    NotGrouped,

    /// The groups were already replaced by the output tree.
    #[error("Data was already mapped to a structure")]
    AlreadyMapped,
}

// =============================================================================
// Output Errors
// =============================================================================

/// Errors while rendering the output tree.
#[derive(Debug, Error)]
pub enum OutputError {
    /// The requested encoding name is not supported.
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    /// `first`/`last` on an empty output.
    #[error("Output is empty")]
    Empty,

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors while loading a pipeline config document.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not valid JSON or has the wrong shape.
    #[error("Config JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The document is well-formed but inconsistent.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline errors.
///
/// Wraps all lower-level errors so callers can still branch on the cause.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// CSV parsing error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Transformation error.
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    /// Output error.
    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    /// Config error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for transformation operations.
pub type TransformResult<T> = Result<T, TransformError>;

/// Result type for output operations.
pub type OutputResult<T> = Result<T, OutputError>;

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
