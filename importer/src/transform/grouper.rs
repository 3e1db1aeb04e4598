//! Group flat records by the value of one field.
//!
//! ```text
//! Flat records                  →  Groups (first-seen key order)
//! ┌──────────────────────┐        ┌─────────────────────────┐
//! │ PLU: 1, SKU: S1      │        │ 1: [S1, S2]             │
//! │ PLU: 2, SKU: S9      │   →    ├─────────────────────────┤
//! │ PLU: 1, SKU: S2      │        │ 2: [S9]                 │
//! └──────────────────────┘        └─────────────────────────┘
//! ```

use std::collections::HashMap;

use crate::error::{TransformError, TransformResult};
use crate::models::{Group, Record};

/// Partition `records` into groups keyed by `record[field]`.
///
/// Groups come out in the order their key is first seen, and records keep
/// their input order inside each group.
pub fn group_by(records: Vec<Record>, field: &str) -> TransformResult<Vec<Group>> {
    let mut groups: Vec<Group> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        let key = record
            .get(field)
            .ok_or_else(|| TransformError::MissingField(field.to_string()))?;

        let slot = match index.get(key) {
            Some(&slot) => slot,
            None => {
                index.insert(key.to_string(), groups.len());
                groups.push(Group::new(key));
                groups.len() - 1
            }
        };
        groups[slot].records.push(record);
    }

    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(plu: &str, sku: &str) -> Record {
        Record::from_pairs([("PLU", plu), ("SKU", sku)])
    }

    #[test]
    fn test_first_seen_order() {
        let records = vec![rec("2", "a"), rec("1", "b"), rec("2", "c"), rec("3", "d")];
        let groups = group_by(records, "PLU").unwrap();

        let keys: Vec<&str> = groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["2", "1", "3"]);
    }

    #[test]
    fn test_every_record_in_one_group() {
        let records = vec![rec("1", "a"), rec("2", "b"), rec("1", "c"), rec("1", "d")];
        let input = records.clone();
        let groups = group_by(records, "PLU").unwrap();

        let total: usize = groups.iter().map(Group::len).sum();
        assert_eq!(total, input.len());

        for record in &input {
            let hits = groups
                .iter()
                .flat_map(|g| g.records.iter())
                .filter(|r| *r == record)
                .count();
            assert_eq!(hits, 1);
        }
    }

    #[test]
    fn test_within_group_order() {
        let records = vec![rec("1", "a"), rec("2", "b"), rec("1", "c")];
        let groups = group_by(records, "PLU").unwrap();

        let skus: Vec<&str> = groups[0]
            .records
            .iter()
            .filter_map(|r| r.get("SKU"))
            .collect();
        assert_eq!(skus, vec!["a", "c"]);
    }

    #[test]
    fn test_missing_field() {
        let err = group_by(vec![rec("1", "a")], "EAN").unwrap_err();
        assert_eq!(err, TransformError::MissingField("EAN".into()));
    }

    #[test]
    fn test_empty_input() {
        assert!(group_by(Vec::new(), "PLU").unwrap().is_empty());
    }
}
