//! Transformation module.
//!
//! - Grouper: flat records to ordered groups
//! - Rules: named ordering rules and the per-record rule sorter
//! - Mapper: groups to the caller's output structure
//! - Pipeline: the fluent [`Importer`] tying the stages together

pub mod grouper;
pub mod mapper;
pub mod pipeline;
pub mod rules;

pub use grouper::group_by;
pub use mapper::{map_to_structure, ScalarPolicy};
pub use pipeline::Importer;
pub use rules::{sort_by_rule, Rule, RuleRegistry, UnrankedPlacement};
