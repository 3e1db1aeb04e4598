//! Named ordering rules and the rule-based sorter.
//!
//! A rule ranks the values of one field by a canonical order, e.g. clothing
//! sizes `XS < S < M < L`. The rule applied to a record is chosen by the
//! record itself: the value of a discriminator field names the rule. One
//! group may therefore mix records ranked by different rules.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::error::{TransformError, TransformResult};
use crate::models::{Group, Record};

/// Where records whose value is missing from their rule's order list go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnrankedPlacement {
    /// Before every ranked record, as if at position -1.
    #[default]
    First,
    /// After every ranked record.
    Last,
    /// Fail with [`TransformError::UnrankedValue`].
    Reject,
}

/// A comparison field and the canonical order of its values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RuleSpec")]
pub struct Rule {
    field: String,
    order: Vec<String>,
    #[serde(skip)]
    ranks: HashMap<String, usize>,
}

#[derive(Deserialize)]
struct RuleSpec {
    field: String,
    #[serde(deserialize_with = "scalar_strings")]
    order: Vec<String>,
}

impl From<RuleSpec> for Rule {
    fn from(spec: RuleSpec) -> Self {
        Rule::new(spec.field, spec.order)
    }
}

/// Accept numbers as well as strings in order lists (`[20, 21]` ranks "20", "21").
fn scalar_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<Value>::deserialize(deserializer)?;
    values
        .into_iter()
        .map(|v| match v {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(serde::de::Error::custom(format!(
                "order values must be strings or numbers, got {}",
                other
            ))),
        })
        .collect()
}

impl Rule {
    pub fn new<I, S>(field: impl Into<String>, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let order: Vec<String> = order.into_iter().map(Into::into).collect();
        let mut ranks = HashMap::with_capacity(order.len());
        for (i, value) in order.iter().enumerate() {
            // duplicates keep their first position
            ranks.entry(value.clone()).or_insert(i);
        }
        Self {
            field: field.into(),
            order,
            ranks,
        }
    }

    /// The field whose value is ranked.
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Index of `value` in the order list.
    pub fn position(&self, value: &str) -> Option<usize> {
        self.ranks.get(value).copied()
    }
}

/// Rules keyed by name. Owned by one pipeline instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleRegistry {
    rules: BTreeMap<String, Rule>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule, replacing any rule already stored under `name`.
    pub fn add_rule<I, S>(&mut self, name: impl Into<String>, field: impl Into<String>, order: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(name, Rule::new(field, order));
    }

    pub fn insert(&mut self, name: impl Into<String>, rule: Rule) {
        self.rules.insert(name.into(), rule);
    }

    /// Move every rule of `other` into this registry.
    pub fn merge(&mut self, other: RuleRegistry) {
        self.rules.extend(other.rules);
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rule)> {
        self.rules.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Sort key: bucket first, then rank inside the bucket.
type SortKey = (u8, usize);

fn sort_key(
    record: &Record,
    registry: &RuleRegistry,
    discriminator: &str,
    placement: UnrankedPlacement,
) -> TransformResult<SortKey> {
    let rule_name = record
        .get(discriminator)
        .ok_or_else(|| TransformError::MissingField(discriminator.to_string()))?;
    let rule = registry
        .get(rule_name)
        .ok_or_else(|| TransformError::UnknownRule {
            rule: rule_name.to_string(),
        })?;
    let value = record
        .get(rule.field())
        .ok_or_else(|| TransformError::MissingField(rule.field().to_string()))?;

    match (rule.position(value), placement) {
        (Some(rank), UnrankedPlacement::Last) => Ok((0, rank)),
        (Some(rank), _) => Ok((1, rank)),
        (None, UnrankedPlacement::First) => Ok((0, 0)),
        (None, UnrankedPlacement::Last) => Ok((1, 0)),
        (None, UnrankedPlacement::Reject) => Err(TransformError::UnrankedValue {
            rule: rule_name.to_string(),
            field: rule.field().to_string(),
            value: value.to_string(),
        }),
    }
}

/// Stable-sort the records of every group by their rule-derived position.
///
/// Keys for all records are resolved before anything moves, so on error the
/// groups are left exactly as they were.
pub fn sort_by_rule(
    groups: &mut [Group],
    registry: &RuleRegistry,
    discriminator: &str,
    placement: UnrankedPlacement,
) -> TransformResult<()> {
    let keys = groups
        .iter()
        .map(|group| {
            group
                .records
                .iter()
                .map(|record| sort_key(record, registry, discriminator, placement))
                .collect::<TransformResult<Vec<SortKey>>>()
        })
        .collect::<TransformResult<Vec<_>>>()?;

    for (group, group_keys) in groups.iter_mut().zip(keys) {
        let mut keyed: Vec<(SortKey, _)> = group_keys
            .into_iter()
            .zip(std::mem::take(&mut group.records))
            .collect();
        keyed.sort_by_key(|(key, _)| *key);
        group.records = keyed.into_iter().map(|(_, record)| record).collect();
    }

    Ok(())
}
