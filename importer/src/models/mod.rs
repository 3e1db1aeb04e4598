//! Domain models for the import pipeline.
//!
//! - [`Record`] - One parsed CSV row, addressed by header name
//! - [`Group`] - Records sharing one grouping key value
//! - [`MapEntry`] / [`Structure`] - Declarative description of the output shape

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

// =============================================================================
// Record
// =============================================================================

/// One input row.
///
/// Values are stored positionally; the header is shared between all records
/// of one input, so field lookup never copies names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    headers: Arc<[String]>,
    values: Vec<String>,
}

impl Record {
    /// Build a record from a shared header and one value per header column.
    ///
    /// Missing trailing values are filled with `""` and extra values dropped.
    pub fn new(headers: Arc<[String]>, mut values: Vec<String>) -> Self {
        values.resize(headers.len(), String::new());
        Self { headers, values }
    }

    /// Build a standalone record from `(field, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let (headers, values): (Vec<String>, Vec<String>) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self::new(headers.into(), values)
    }

    /// Value of `field`, or `None` if the header has no such column.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.headers
            .iter()
            .position(|h| h == field)
            .and_then(|i| self.values.get(i))
            .map(String::as_str)
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.headers.iter().any(|h| h == field)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Iterate `(field, value)` pairs in header order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }

    /// Convert to a JSON object, keys in header order.
    pub fn to_json(&self) -> Value {
        let obj: Map<String, Value> = self
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect();
        Value::Object(obj)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (k, v) in self.iter() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

// =============================================================================
// Group
// =============================================================================

/// Records sharing one value of the grouping field, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    /// The grouping field value.
    pub key: String,
    pub records: Vec<Record>,
}

impl Group {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// =============================================================================
// Output Structure
// =============================================================================

/// One entry of a [`Structure`].
///
/// In JSON, a plain field is a string and a nested entry is a single-key
/// object: `"PLU"` or `{"sizes": ["SKU", "size"]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEntry", into = "RawEntry")]
pub enum MapEntry {
    /// Copy one field as a scalar at the group's top level.
    Field(String),
    /// Emit one sub-object per record under `key`, holding only `fields`.
    Nested { key: String, fields: Vec<String> },
}

impl MapEntry {
    pub fn field(name: impl Into<String>) -> Self {
        MapEntry::Field(name.into())
    }

    pub fn nested<I, S>(key: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MapEntry::Nested {
            key: key.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Every source field this entry reads.
    pub fn source_fields(&self) -> Vec<&str> {
        match self {
            MapEntry::Field(name) => vec![name.as_str()],
            MapEntry::Nested { fields, .. } => fields.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Field(String),
    Nested(BTreeMap<String, Vec<String>>),
}

impl TryFrom<RawEntry> for MapEntry {
    type Error = String;

    fn try_from(raw: RawEntry) -> Result<Self, Self::Error> {
        match raw {
            RawEntry::Field(name) => Ok(MapEntry::Field(name)),
            RawEntry::Nested(map) => {
                if map.len() != 1 {
                    return Err(format!(
                        "nested structure entry must have exactly one key, found {}",
                        map.len()
                    ));
                }
                let (key, fields) = map.into_iter().next().ok_or("empty nested entry")?;
                Ok(MapEntry::Nested { key, fields })
            }
        }
    }
}

impl From<MapEntry> for RawEntry {
    fn from(entry: MapEntry) -> Self {
        match entry {
            MapEntry::Field(name) => RawEntry::Field(name),
            MapEntry::Nested { key, fields } => RawEntry::Nested(BTreeMap::from([(key, fields)])),
        }
    }
}

/// The desired output shape, entries in output key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Structure {
    pub entries: Vec<MapEntry>,
}

impl Structure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a plain field entry.
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.entries.push(MapEntry::field(name));
        self
    }

    /// Append a nested array entry.
    pub fn nested<I, S>(mut self, key: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries.push(MapEntry::nested(key, fields));
        self
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MapEntry> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<MapEntry>> for Structure {
    fn from(entries: Vec<MapEntry>) -> Self {
        Self { entries }
    }
}

impl FromIterator<MapEntry> for Structure {
    fn from_iter<T: IntoIterator<Item = MapEntry>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
