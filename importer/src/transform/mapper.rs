//! Project grouped records into a caller-defined output shape.
//!
//! ```text
//! Group PLU=1                         Structure: [PLU, name, {sizes: [SKU, size]}]
//! ┌──────────────────────────┐       ┌────────────────────────────────────┐
//! │ PLU:1 name:Shoe SKU:S1 20│       │ PLU: 1, name: Shoe                 │
//! │ PLU:1 name:Shoe SKU:S2 21│  →    │ sizes: [{S1, 20}, {S2, 21}]        │
//! └──────────────────────────┘       └────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{TransformError, TransformResult};
use crate::models::{Group, MapEntry, Record, Structure};

/// Which record of a group supplies a plain (scalar) field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarPolicy {
    /// The first record of the group.
    First,
    /// The last record of the group, after any sorting.
    #[default]
    Last,
    /// Every record must hold the same value.
    Uniform,
}

/// Map every group to one JSON object, in group order.
pub fn map_to_structure(
    groups: &[Group],
    structure: &Structure,
    policy: ScalarPolicy,
) -> TransformResult<Vec<Value>> {
    groups
        .iter()
        .map(|group| map_group(group, structure, policy))
        .collect()
}

fn map_group(group: &Group, structure: &Structure, policy: ScalarPolicy) -> TransformResult<Value> {
    let mut obj = Map::new();

    for entry in structure.iter() {
        match entry {
            MapEntry::Field(field) => {
                // an empty group has no record to take a scalar from
                if let Some(value) = scalar(group, field, policy)? {
                    obj.insert(field.clone(), Value::String(value.to_string()));
                }
            }
            MapEntry::Nested { key, fields } => {
                let items = group
                    .records
                    .iter()
                    .map(|record| project(record, fields))
                    .collect::<TransformResult<Vec<Value>>>()?;
                obj.insert(key.clone(), Value::Array(items));
            }
        }
    }

    Ok(Value::Object(obj))
}

fn field_value<'a>(record: &'a Record, field: &str) -> TransformResult<&'a str> {
    record
        .get(field)
        .ok_or_else(|| TransformError::UnknownField(field.to_string()))
}

fn scalar<'a>(group: &'a Group, field: &str, policy: ScalarPolicy) -> TransformResult<Option<&'a str>> {
    let values = group
        .records
        .iter()
        .map(|record| field_value(record, field))
        .collect::<TransformResult<Vec<&str>>>()?;

    match policy {
        ScalarPolicy::First => Ok(values.first().copied()),
        ScalarPolicy::Last => Ok(values.last().copied()),
        ScalarPolicy::Uniform => {
            let first = values.first().copied();
            if values.iter().any(|v| Some(*v) != first) {
                return Err(TransformError::ConflictingValues {
                    field: field.to_string(),
                    group: group.key.clone(),
                });
            }
            Ok(first)
        }
    }
}

/// Keep only `fields` of one record, in the listed order.
fn project(record: &Record, fields: &[String]) -> TransformResult<Value> {
    let mut obj = Map::new();
    for field in fields {
        let value = field_value(record, field)?;
        obj.insert(field.clone(), Value::String(value.to_string()));
    }
    Ok(Value::Object(obj))
}
