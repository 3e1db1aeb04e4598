//! # Product Importer - group, rule-sort and reshape flat CSV catalogues
//!
//! Turns a flat product CSV (one row per SKU) into nested JSON (one object
//! per product, with its SKUs ordered by size rules).
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌──────────────┐   ┌──────────┐   ┌────────┐
//! │ CSV File │──▶│  Parser  │──▶│ Grouper  │──▶│ Rule Sorter  │──▶│  Mapper  │──▶│ Output │
//! │ (ISO/UTF8│   │(auto-enc)│   │(by field)│   │(rule/record) │   │(structure│   │ (JSON) │
//! └──────────┘   └──────────┘   └──────────┘   └──────────────┘   └──────────┘   └────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use product_importer::{Importer, OutputFormat, Structure};
//!
//! let mut importer = Importer::from_path("products.csv")?;
//! importer
//!     .group_by("PLU")?
//!     .add_rule("CLOTHING_SHORT", "size", ["XS", "S", "M", "L", "XL"])
//!     .sort_by_rule("sizeSort")?
//!     .map_to_structure(&Structure::new().field("PLU").nested("sizes", ["SKU", "size"]))?;
//! println!("{}", importer.get(OutputFormat::Json)?);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per layer
//! - [`models`] - Records, groups and the output structure description
//! - [`parser`] - CSV parsing with auto-detection
//! - [`transform`] - Grouping, rule sorting, mapping and the fluent pipeline
//! - [`output`] - Output encodings
//! - [`config`] - Stored pipeline configs
//! - [`logs`] - Pipeline log stream

// Core modules
pub mod error;
pub mod logs;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Output
pub mod output;

// Config
pub mod config;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, CsvError, OutputError, PipelineError, PipelineResult, TransformError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Group, MapEntry, Record, Structure};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, parse_bytes, parse_file, parse_str,
    ParseOptions, ParseResult, RowLengthPolicy,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::{
    group_by, map_to_structure, sort_by_rule, Importer, Rule, RuleRegistry, ScalarPolicy,
    UnrankedPlacement,
};

// =============================================================================
// Re-exports - Output & Config
// =============================================================================

pub use config::{example_config, PipelineConfig};
pub use output::{render, Output, OutputFormat};
