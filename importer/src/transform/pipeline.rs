//! Fluent import pipeline.
//!
//! [`Importer`] owns the parsed records, its own rule registry and the
//! current working set. Each stage replaces the working set:
//!
//! ```text
//! records ──group_by──▶ groups ──sort_by_rule──▶ groups ──map_to_structure──▶ tree
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use product_importer::{Importer, OutputFormat, Structure};
//!
//! let structure = Structure::new()
//!     .field("PLU")
//!     .field("name")
//!     .nested("sizes", ["SKU", "size"]);
//!
//! let json = Importer::from_path("products.csv")?
//!     .group_by("PLU")?
//!     .add_rule("SHOE_EU", "size", (20..=50).map(|n| n.to_string()))
//!     .sort_by_rule("sizeSort")?
//!     .map_to_structure(&structure)?
//!     .get(OutputFormat::Json)?;
//! ```

use serde_json::Value;
use std::path::Path;

use crate::error::{CsvResult, OutputError, OutputResult, TransformError, TransformResult};
use crate::logs::{log_info, log_success};
use crate::models::{Group, Record, Structure};
use crate::output::{render, Output, OutputFormat};
use crate::parser::{parse_file, parse_str, ParseOptions, ParseResult};

use super::grouper;
use super::mapper::{self, ScalarPolicy};
use super::rules::{self, RuleRegistry, UnrankedPlacement};

/// The working set at the current pipeline stage.
#[derive(Debug, Clone, PartialEq)]
enum Stage {
    /// Parsed records, not grouped yet
    Flat(Vec<Record>),
    Grouped(Vec<Group>),
    /// Output tree, one object per group
    Mapped(Vec<Value>),
}

/// CSV import pipeline.
#[derive(Debug, Clone)]
pub struct Importer {
    headers: Vec<String>,
    records: Vec<Record>,
    stage: Stage,
    rules: RuleRegistry,
    scalar_policy: ScalarPolicy,
    unranked: UnrankedPlacement,
}

impl Importer {
    /// Parse a CSV file with default options.
    pub fn from_path<P: AsRef<Path>>(path: P) -> CsvResult<Self> {
        Self::from_path_with(path, &ParseOptions::default())
    }

    pub fn from_path_with<P: AsRef<Path>>(path: P, options: &ParseOptions) -> CsvResult<Self> {
        log_info(format!("Reading {}", path.as_ref().display()));
        Ok(Self::from_parsed(parse_file(path, options)?))
    }

    /// Parse CSV text held in memory.
    pub fn from_csv_str(content: &str, options: &ParseOptions) -> CsvResult<Self> {
        Ok(Self::from_parsed(parse_str(content, options)?))
    }

    pub fn from_parsed(parsed: ParseResult) -> Self {
        log_success(format!(
            "Read {} rows, {} columns",
            parsed.records.len(),
            parsed.headers.len()
        ));
        Self::from_records(parsed.headers, parsed.records)
    }

    /// Build from records that were parsed elsewhere.
    pub fn from_records(headers: Vec<String>, records: Vec<Record>) -> Self {
        Self {
            headers,
            stage: Stage::Flat(records.clone()),
            records,
            rules: RuleRegistry::new(),
            scalar_policy: ScalarPolicy::default(),
            unranked: UnrankedPlacement::default(),
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// The records as parsed, independent of the current stage.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn rules(&self) -> &RuleRegistry {
        &self.rules
    }

    /// The current groups, if grouped and not yet mapped.
    pub fn groups(&self) -> Option<&[Group]> {
        match &self.stage {
            Stage::Grouped(groups) => Some(groups),
            _ => None,
        }
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self.stage, Stage::Mapped(_))
    }

    pub fn with_scalar_policy(&mut self, policy: ScalarPolicy) -> &mut Self {
        self.scalar_policy = policy;
        self
    }

    pub fn with_unranked_placement(&mut self, placement: UnrankedPlacement) -> &mut Self {
        self.unranked = placement;
        self
    }

    /// Group the parsed records by `field`.
    ///
    /// Grouping always starts from the parsed records, so calling it again
    /// regroups by another field and discards any sort.
    pub fn group_by(&mut self, field: &str) -> TransformResult<&mut Self> {
        if self.is_mapped() {
            return Err(TransformError::AlreadyMapped);
        }
        if !self.has_column(field) {
            return Err(TransformError::MissingField(field.to_string()));
        }

        let groups = grouper::group_by(self.records.clone(), field)?;
        log_success(format!(
            "Grouped {} records into {} groups by '{}'",
            self.records.len(),
            groups.len(),
            field
        ));
        self.stage = Stage::Grouped(groups);
        Ok(self)
    }

    /// Register or replace the ordering rule `name`.
    pub fn add_rule<I, S>(&mut self, name: &str, field: &str, order: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules.add_rule(name, field, order);
        self
    }

    /// Add every rule of `rules`, replacing rules with the same name.
    pub fn extend_rules(&mut self, rules: RuleRegistry) -> &mut Self {
        self.rules.merge(rules);
        self
    }

    fn has_column(&self, field: &str) -> bool {
        self.headers.iter().any(|h| h == field)
    }

    /// Sort each group with the rule named by each record's `discriminator` value.
    pub fn sort_by_rule(&mut self, discriminator: &str) -> TransformResult<&mut Self> {
        if matches!(self.stage, Stage::Grouped(_)) && !self.has_column(discriminator) {
            return Err(TransformError::MissingField(discriminator.to_string()));
        }
        let groups = match &mut self.stage {
            Stage::Grouped(groups) => groups,
            Stage::Flat(_) => return Err(TransformError::NotGrouped),
            Stage::Mapped(_) => return Err(TransformError::AlreadyMapped),
        };

        rules::sort_by_rule(groups, &self.rules, discriminator, self.unranked)?;
        log_success(format!(
            "Sorted {} groups by rule field '{}' ({} rules)",
            groups.len(),
            discriminator,
            self.rules.len()
        ));
        Ok(self)
    }

    /// Replace the groups with the output tree described by `structure`.
    pub fn map_to_structure(&mut self, structure: &Structure) -> TransformResult<&mut Self> {
        let groups = match &self.stage {
            Stage::Grouped(groups) => groups,
            Stage::Flat(_) => return Err(TransformError::NotGrouped),
            Stage::Mapped(_) => return Err(TransformError::AlreadyMapped),
        };
        if let Some(field) = structure
            .iter()
            .flat_map(|entry| entry.source_fields())
            .find(|field| !self.has_column(field))
        {
            return Err(TransformError::UnknownField(field.to_string()));
        }

        let tree = mapper::map_to_structure(groups, structure, self.scalar_policy)?;
        log_success(format!("Mapped {} groups to structure", tree.len()));
        self.stage = Stage::Mapped(tree);
        Ok(self)
    }

    /// Number of top-level elements in the current working set.
    pub fn len(&self) -> usize {
        match &self.stage {
            Stage::Flat(records) => records.len(),
            Stage::Grouped(groups) => groups.len(),
            Stage::Mapped(tree) => tree.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The current working set as one JSON array.
    ///
    /// Unmapped groups are emitted as arrays of record objects.
    pub fn to_value(&self) -> Value {
        match &self.stage {
            Stage::Flat(records) => Value::Array(records.iter().map(Record::to_json).collect()),
            Stage::Grouped(groups) => Value::Array(groups.iter().map(group_value).collect()),
            Stage::Mapped(tree) => Value::Array(tree.clone()),
        }
    }

    fn element(&self, index: usize) -> Option<Value> {
        match &self.stage {
            Stage::Flat(records) => records.get(index).map(Record::to_json),
            Stage::Grouped(groups) => groups.get(index).map(group_value),
            Stage::Mapped(tree) => tree.get(index).cloned(),
        }
    }

    fn remove(&mut self, index: usize) -> Value {
        match &mut self.stage {
            Stage::Flat(records) => records.remove(index).to_json(),
            Stage::Grouped(groups) => group_value(&groups.remove(index)),
            Stage::Mapped(tree) => tree.remove(index),
        }
    }

    /// Render the whole working set.
    pub fn get(&self, format: OutputFormat) -> OutputResult<Output> {
        render(self.to_value(), format)
    }

    /// Render the first element without removing it.
    pub fn first(&self, format: OutputFormat) -> OutputResult<Output> {
        render(self.element(0).ok_or(OutputError::Empty)?, format)
    }

    /// Render the last element without removing it.
    pub fn last(&self, format: OutputFormat) -> OutputResult<Output> {
        let index = self.len().checked_sub(1).ok_or(OutputError::Empty)?;
        render(self.element(index).ok_or(OutputError::Empty)?, format)
    }

    /// Remove the first element and render it.
    pub fn pop_first(&mut self, format: OutputFormat) -> OutputResult<Output> {
        if self.is_empty() {
            return Err(OutputError::Empty);
        }
        let value = self.remove(0);
        render(value, format)
    }

    /// Remove the last element and render it.
    pub fn pop_last(&mut self, format: OutputFormat) -> OutputResult<Output> {
        let index = self.len().checked_sub(1).ok_or(OutputError::Empty)?;
        let value = self.remove(index);
        render(value, format)
    }

    /// [`Importer::get`] with a format given by name, e.g. `"json"` or `"plain"`.
    pub fn get_as(&self, format: &str) -> OutputResult<Output> {
        self.get(format.parse()?)
    }
}

fn group_value(group: &Group) -> Value {
    Value::Array(group.records.iter().map(Record::to_json).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PRODUCTS: &str = "\
PLU,name,SKU,size,sizeSort
1,Shoe,S1,22,SHOE_EU
2,Shirt,T1,L,CLOTHING_SHORT
1,Shoe,S2,20,SHOE_EU
2,Shirt,T2,XS,CLOTHING_SHORT
1,Shoe,S3,21,SHOE_EU
";

    fn importer() -> Importer {
        Importer::from_csv_str(PRODUCTS, &ParseOptions::default()).unwrap()
    }

    fn structure() -> Structure {
        Structure::new()
            .field("PLU")
            .field("name")
            .nested("sizes", ["SKU", "size"])
    }

    #[test]
    fn test_full_pipeline() {
        let mut importer = importer();
        importer
            .group_by("PLU")
            .unwrap()
            .add_rule("SHOE_EU", "size", ["20", "21", "22"])
            .add_rule("CLOTHING_SHORT", "size", ["XS", "S", "M", "L"])
            .sort_by_rule("sizeSort")
            .unwrap()
            .map_to_structure(&structure())
            .unwrap();

        let out = importer.get(OutputFormat::Plain).unwrap().into_value().unwrap();
        assert_eq!(
            out,
            json!([
                {
                    "PLU": "1",
                    "name": "Shoe",
                    "sizes": [
                        {"SKU": "S2", "size": "20"},
                        {"SKU": "S3", "size": "21"},
                        {"SKU": "S1", "size": "22"}
                    ]
                },
                {
                    "PLU": "2",
                    "name": "Shirt",
                    "sizes": [
                        {"SKU": "T2", "size": "XS"},
                        {"SKU": "T1", "size": "L"}
                    ]
                }
            ])
        );
    }

    #[test]
    fn test_shoe_scenario_last_sku() {
        let mut importer =
            Importer::from_csv_str("PLU,name,SKU,size\n1,Shoe,S1,20\n1,Shoe,S2,21", &ParseOptions::default())
                .unwrap();
        let structure = Structure::new()
            .field("PLU")
            .field("name")
            .field("SKU")
            .nested("sizes", ["SKU", "size"]);
        importer.group_by("PLU").unwrap().map_to_structure(&structure).unwrap();

        let json = importer.get(OutputFormat::Json).unwrap();
        assert_eq!(
            json.as_json().unwrap(),
            r#"[{"PLU":"1","name":"Shoe","SKU":"S2","sizes":[{"SKU":"S1","size":"20"},{"SKU":"S2","size":"21"}]}]"#
        );
    }

    #[test]
    fn test_unknown_rule_keeps_order() {
        let mut importer = importer();
        importer
            .group_by("PLU")
            .unwrap()
            .add_rule("SHOE_EU", "size", ["20", "21", "22"]);
        let before = importer.to_value();

        let err = importer.sort_by_rule("sizeSort").unwrap_err();
        assert_eq!(
            err,
            TransformError::UnknownRule {
                rule: "CLOTHING_SHORT".into()
            }
        );
        assert_eq!(importer.to_value(), before);
    }

    #[test]
    fn test_group_by_missing_field() {
        let err = importer().group_by("EAN").unwrap_err();
        assert_eq!(err, TransformError::MissingField("EAN".into()));
    }

    #[test]
    fn test_stage_order_enforced() {
        let mut importer = importer();
        assert_eq!(importer.sort_by_rule("sizeSort").unwrap_err(), TransformError::NotGrouped);
        assert_eq!(
            importer.map_to_structure(&structure()).unwrap_err(),
            TransformError::NotGrouped
        );

        importer.group_by("PLU").unwrap().map_to_structure(&structure()).unwrap();
        assert_eq!(importer.group_by("PLU").unwrap_err(), TransformError::AlreadyMapped);
        assert_eq!(
            importer.map_to_structure(&structure()).unwrap_err(),
            TransformError::AlreadyMapped
        );
    }

    #[test]
    fn test_first_and_last_are_non_destructive() {
        let mut importer = importer();
        importer.group_by("PLU").unwrap().map_to_structure(&structure()).unwrap();

        let first = importer.first(OutputFormat::Plain).unwrap().into_value().unwrap();
        let last = importer.last(OutputFormat::Plain).unwrap().into_value().unwrap();
        assert_eq!(first["PLU"], "1");
        assert_eq!(last["PLU"], "2");
        assert_eq!(importer.len(), 2);

        let first_again = importer.first(OutputFormat::Plain).unwrap().into_value().unwrap();
        assert_eq!(first_again, first);
    }

    #[test]
    fn test_pop_drains() {
        let mut importer = importer();
        importer.group_by("PLU").unwrap().map_to_structure(&structure()).unwrap();

        let popped = importer.pop_first(OutputFormat::Plain).unwrap().into_value().unwrap();
        assert_eq!(popped["PLU"], "1");
        assert_eq!(importer.len(), 1);

        let popped = importer.pop_last(OutputFormat::Plain).unwrap().into_value().unwrap();
        assert_eq!(popped["PLU"], "2");
        assert!(importer.is_empty());

        assert!(matches!(importer.first(OutputFormat::Json), Err(OutputError::Empty)));
        assert!(matches!(importer.pop_last(OutputFormat::Json), Err(OutputError::Empty)));
    }

    #[test]
    fn test_unsupported_format_name() {
        let err = importer().get_as("xml").unwrap_err();
        assert!(matches!(err, OutputError::UnsupportedFormat(ref name) if name == "xml"));
    }

    #[test]
    fn test_unmapped_output() {
        let mut importer = importer();
        assert_eq!(importer.to_value().as_array().unwrap().len(), 5);

        importer.group_by("PLU").unwrap();
        let value = importer.get(OutputFormat::Plain).unwrap().into_value().unwrap();
        assert_eq!(value[0].as_array().unwrap().len(), 3);
        assert_eq!(value[0][0]["SKU"], "S1");
        assert_eq!(value[1][1]["SKU"], "T2");
    }

    #[test]
    fn test_regroup_starts_from_parsed_records() {
        let mut importer = importer();
        importer.group_by("PLU").unwrap();
        importer.group_by("sizeSort").unwrap();

        let groups = importer.groups().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, "SHOE_EU");
        assert_eq!(groups[0].len(), 3);
    }

    #[test]
    fn test_scalar_policy_first() {
        let mut importer = importer();
        importer
            .with_scalar_policy(ScalarPolicy::First)
            .group_by("PLU")
            .unwrap()
            .map_to_structure(&Structure::new().field("SKU"))
            .unwrap();

        let value = importer.to_value();
        assert_eq!(value, json!([{"SKU": "S1"}, {"SKU": "T1"}]));
    }

    #[test]
    fn test_header_only_input_checks_fields() {
        let mut importer =
            Importer::from_csv_str("PLU,name,sizeSort\n", &ParseOptions::default()).unwrap();
        importer.group_by("PLU").unwrap();
        assert!(importer.groups().unwrap().is_empty());

        assert_eq!(
            importer.sort_by_rule("category").unwrap_err(),
            TransformError::MissingField("category".into())
        );
        assert_eq!(
            importer
                .map_to_structure(&Structure::new().field("PLU").nested("sizes", ["SKU"]))
                .unwrap_err(),
            TransformError::UnknownField("SKU".into())
        );

        importer.sort_by_rule("sizeSort").unwrap();
        importer.map_to_structure(&Structure::new().field("PLU")).unwrap();
        assert_eq!(importer.to_value(), json!([]));
    }

    #[test]
    fn test_from_path_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let err = Importer::from_path(dir.path().join("products.csv")).unwrap_err();
        assert!(matches!(err, crate::error::CsvError::SourceNotFound { ref path, .. }
            if path.ends_with("products.csv")));
    }

    #[test]
    fn test_from_records_with_short_rows() {
        let headers: Vec<String> = ["PLU", "SKU", "size"].iter().map(|s| s.to_string()).collect();
        let shared: std::sync::Arc<[String]> = headers.clone().into();
        let records = vec![
            Record::new(shared.clone(), vec!["1".into(), "S1".into()]),
            Record::new(shared, vec!["1".into(), "S2".into(), "21".into()]),
        ];

        let mut importer = Importer::from_records(headers, records);
        importer
            .group_by("PLU")
            .unwrap()
            .map_to_structure(&Structure::new().nested("sizes", ["SKU", "size"]))
            .unwrap();
        assert_eq!(
            importer.to_value(),
            json!([{"sizes": [{"SKU": "S1", "size": ""}, {"SKU": "S2", "size": "21"}]}])
        );
    }

    #[test]
    fn test_json_matches_plain() {
        let mut importer = importer();
        importer.group_by("PLU").unwrap().map_to_structure(&structure()).unwrap();

        let text = importer.get(OutputFormat::Json).unwrap().into_value().unwrap();
        let plain = importer.get(OutputFormat::Plain).unwrap().into_value().unwrap();
        assert_eq!(text, plain);
    }
}
