//! Pipeline config documents.
//!
//! A config describes one complete import run so it can be stored next to
//! the catalogue it belongs to and replayed from the CLI.
//!
//! ```json
//! {
//!   "group_by": "PLU",
//!   "rules": { "SHOE_EU": { "field": "size", "order": [20, 21, 22] } },
//!   "sort_by": "sizeSort",
//!   "structure": ["PLU", "name", { "sizes": ["SKU", "size"] }]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ConfigError, ConfigResult, PipelineResult};
use crate::logs::log_info;
use crate::models::Structure;
use crate::output::OutputFormat;
use crate::parser::{ParseOptions, RowLengthPolicy};
use crate::transform::{Importer, RuleRegistry, ScalarPolicy, UnrankedPlacement};

/// A complete pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Version of the config format
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub description: String,

    /// Field to group records by
    #[serde(default)]
    pub group_by: Option<String>,

    /// Ordering rules, keyed by the discriminator value that selects them
    #[serde(default)]
    pub rules: RuleRegistry,

    /// Discriminator field naming the rule for each record
    #[serde(default)]
    pub sort_by: Option<String>,

    /// Output shape; the grouped records are emitted as-is when absent
    #[serde(default)]
    pub structure: Option<Structure>,

    #[serde(default)]
    pub scalar_policy: ScalarPolicy,

    #[serde(default)]
    pub unranked: UnrankedPlacement,

    /// Field delimiter; `null` auto-detects it
    #[serde(default = "default_delimiter")]
    pub delimiter: Option<char>,

    #[serde(default)]
    pub row_length: RowLengthPolicy,

    /// Output encoding used when the caller does not pick one
    #[serde(default)]
    pub format: OutputFormat,
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_delimiter() -> Option<char> {
    Some(',')
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineConfig {
    /// A config that only parses.
    pub fn new() -> Self {
        Self {
            version: default_version(),
            description: String::new(),
            group_by: None,
            rules: RuleRegistry::new(),
            sort_by: None,
            structure: None,
            scalar_policy: ScalarPolicy::default(),
            unranked: UnrankedPlacement::default(),
            delimiter: default_delimiter(),
            row_length: RowLengthPolicy::default(),
            format: OutputFormat::default(),
        }
    }

    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check that the stages requested can run in order.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.group_by.is_none() {
            if self.sort_by.is_some() {
                return Err(ConfigError::InvalidConfig(
                    "sort_by requires group_by".to_string(),
                ));
            }
            if self.structure.is_some() {
                return Err(ConfigError::InvalidConfig(
                    "structure requires group_by".to_string(),
                ));
            }
        }
        if self.sort_by.is_some() && self.rules.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "sort_by is set but no rules are defined".to_string(),
            ));
        }
        Ok(())
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions::default()
            .with_delimiter(self.delimiter)
            .with_row_length(self.row_length)
    }

    /// Every CSV column the config reads
    pub fn source_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        columns.extend(self.group_by.iter().cloned());
        columns.extend(self.sort_by.iter().cloned());
        columns.extend(self.rules.iter().map(|(_, rule)| rule.field().to_string()));
        if let Some(structure) = &self.structure {
            for entry in structure.iter() {
                columns.extend(entry.source_fields().into_iter().map(str::to_string));
            }
        }

        columns.sort();
        columns.dedup();
        columns
    }

    /// Columns the config reads that `headers` lacks
    pub fn validate_headers(&self, headers: &[String]) -> Result<(), Vec<String>> {
        let missing: Vec<String> = self
            .source_columns()
            .into_iter()
            .filter(|col| !headers.iter().any(|h| h == col))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(missing)
        }
    }

    /// Run every configured stage on `importer`.
    pub fn apply(&self, importer: &mut Importer) -> PipelineResult<()> {
        self.validate()?;

        importer
            .with_scalar_policy(self.scalar_policy)
            .with_unranked_placement(self.unranked)
            .extend_rules(self.rules.clone());

        if let Some(field) = &self.group_by {
            importer.group_by(field)?;
        }
        if let Some(discriminator) = &self.sort_by {
            importer.sort_by_rule(discriminator)?;
        }
        if let Some(structure) = &self.structure {
            importer.map_to_structure(structure)?;
        }
        Ok(())
    }

    /// Parse `path` and run the configured stages.
    pub fn run<P: AsRef<Path>>(&self, path: P) -> PipelineResult<Importer> {
        if !self.description.is_empty() {
            log_info(format!("Config: {}", self.description));
        }
        let mut importer = Importer::from_path_with(path, &self.parse_options())?;
        self.apply(&mut importer)?;
        Ok(importer)
    }
}

/// Half sizes from 1 to 20: "1", "1.5", "2", ...
fn half_sizes() -> impl Iterator<Item = String> {
    (2..=40).map(|halves: u32| {
        if halves % 2 == 0 {
            (halves / 2).to_string()
        } else {
            format!("{}.5", halves / 2)
        }
    })
}

/// Example config for a shoe and clothing catalogue
pub fn example_config() -> PipelineConfig {
    let mut rules = RuleRegistry::new();
    rules.add_rule("SHOE_EU", "size", (20..=50).map(|n: u32| n.to_string()));
    rules.add_rule(
        "SHOE_UK",
        "size",
        half_sizes()
            .map(|s| format!("{} (Child)", s))
            .chain(half_sizes()),
    );
    rules.add_rule(
        "CLOTHING_SHORT",
        "size",
        ["XS", "S", "M", "L", "XL", "XXL", "XXXL", "XXXXL"],
    );

    PipelineConfig {
        description: "Products grouped by PLU with sizes in catalogue order".to_string(),
        group_by: Some("PLU".to_string()),
        rules,
        sort_by: Some("sizeSort".to_string()),
        structure: Some(
            Structure::new()
                .field("PLU")
                .field("name")
                .field("SKU")
                .nested("sizes", ["SKU", "size"]),
        ),
        ..PipelineConfig::new()
    }
}
