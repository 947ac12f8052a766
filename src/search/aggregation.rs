//! Term aggregation requests and results
//!
//! A term aggregation buckets matched items by the value of one field and
//! reports how many items share each value. Results keep the bucket order
//! the producing engine supplied; this module never re-sorts them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::slice;

/// Default number of buckets returned by a term aggregation
pub const DEFAULT_TERM_LIMIT: usize = 10;

/// Field a term aggregation groups by
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationField {
    ContentType,
    Section,
    Language,
    /// Value of a content field, by field identifier
    Field(String),
}

/// Term aggregation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermAggregation {
    /// Name the result is reported under
    pub name: String,

    /// Field to bucket by
    pub field: AggregationField,

    /// Maximum number of buckets
    #[serde(default = "default_term_limit")]
    pub limit: usize,

    /// Buckets with fewer documents are dropped
    #[serde(default = "default_min_count")]
    pub min_count: u64,
}

fn default_term_limit() -> usize {
    DEFAULT_TERM_LIMIT
}

fn default_min_count() -> u64 {
    1
}

impl TermAggregation {
    pub fn new(name: impl Into<String>, field: AggregationField) -> Self {
        Self {
            name: name.into(),
            field,
            limit: DEFAULT_TERM_LIMIT,
            min_count: 1,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_min_count(mut self, min_count: u64) -> Self {
        self.min_count = min_count;
        self
    }
}

/// Bucket key of a term aggregation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AggregationKey {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
}

impl AggregationKey {
    /// Canonical string form used for loose comparison
    ///
    /// Numbers render in their shortest decimal form, numeric strings are
    /// reparsed into that same form and booleans become `1`/`0`.
    pub fn canonical(&self) -> String {
        match self {
            AggregationKey::Bool(true) => "1".to_string(),
            AggregationKey::Bool(false) => "0".to_string(),
            AggregationKey::Int(value) => value.to_string(),
            AggregationKey::UInt(value) => value.to_string(),
            AggregationKey::Float(value) => canonical_float(*value),
            AggregationKey::Str(value) => canonical_numeric(value).unwrap_or_else(|| value.clone()),
        }
    }

    /// Value equality across representations: `"5"`, `5` and `5.0` are equal
    ///
    /// A boolean compares against the truthiness of the other key, so `true`
    /// equals `"yes"` and `1` while `false` equals `0`, `""` and `"false"`.
    pub fn loosely_equals(&self, other: &AggregationKey) -> bool {
        match (self, other) {
            (AggregationKey::Bool(a), AggregationKey::Bool(b)) => a == b,
            (AggregationKey::Bool(value), key) | (key, AggregationKey::Bool(value)) => {
                key.is_truthy() == *value
            }
            _ => self.canonical() == other.canonical(),
        }
    }

    /// Boolean reading of a key: zero, the empty string, `"0"` and `"false"` are false
    pub fn is_truthy(&self) -> bool {
        match self {
            AggregationKey::Bool(value) => *value,
            AggregationKey::Int(value) => *value != 0,
            AggregationKey::UInt(value) => *value != 0,
            AggregationKey::Float(value) => *value != 0.0,
            AggregationKey::Str(value) => {
                let value = value.trim();
                !(value.is_empty() || value == "0" || value.eq_ignore_ascii_case("false"))
            }
        }
    }
}

fn canonical_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        (value as i64).to_string()
    } else {
        value.to_string()
    }
}

fn canonical_numeric(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return Some(int.to_string());
    }
    if let Ok(uint) = trimmed.parse::<u64>() {
        return Some(uint.to_string());
    }
    match trimmed.parse::<f64>() {
        Ok(float) if float.is_finite() => Some(canonical_float(float)),
        _ => None,
    }
}

impl PartialEq for AggregationKey {
    fn eq(&self, other: &Self) -> bool {
        self.loosely_equals(other)
    }
}

impl fmt::Display for AggregationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationKey::Bool(value) => write!(f, "{}", value),
            AggregationKey::Int(value) => write!(f, "{}", value),
            AggregationKey::UInt(value) => write!(f, "{}", value),
            AggregationKey::Float(value) => write!(f, "{}", value),
            AggregationKey::Str(value) => f.write_str(value),
        }
    }
}

impl From<&str> for AggregationKey {
    fn from(value: &str) -> Self {
        AggregationKey::Str(value.to_string())
    }
}

impl From<String> for AggregationKey {
    fn from(value: String) -> Self {
        AggregationKey::Str(value)
    }
}

impl From<i32> for AggregationKey {
    fn from(value: i32) -> Self {
        AggregationKey::Int(value as i64)
    }
}

impl From<i64> for AggregationKey {
    fn from(value: i64) -> Self {
        AggregationKey::Int(value)
    }
}

impl From<u32> for AggregationKey {
    fn from(value: u32) -> Self {
        AggregationKey::UInt(value as u64)
    }
}

impl From<u64> for AggregationKey {
    fn from(value: u64) -> Self {
        AggregationKey::UInt(value)
    }
}

impl From<f64> for AggregationKey {
    fn from(value: f64) -> Self {
        AggregationKey::Float(value)
    }
}

impl From<bool> for AggregationKey {
    fn from(value: bool) -> Self {
        AggregationKey::Bool(value)
    }
}

/// One bucket of a term aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermAggregationResultEntry {
    pub key: AggregationKey,
    pub count: u64,
}

impl TermAggregationResultEntry {
    pub fn new(key: impl Into<AggregationKey>, count: u64) -> Self {
        Self {
            key: key.into(),
            count,
        }
    }
}

/// Buckets of one term aggregation, in the order the engine produced them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TermAggregationResult {
    pub name: String,
    entries: Vec<TermAggregationResultEntry>,
}

impl TermAggregationResult {
    pub fn new(name: impl Into<String>, entries: Vec<TermAggregationResultEntry>) -> Self {
        Self {
            name: name.into(),
            entries,
        }
    }

    /// All buckets in population order
    pub fn entries(&self) -> &[TermAggregationResultEntry] {
        &self.entries
    }

    /// First bucket whose key loosely equals `key`
    ///
    /// Linear scan; bucket counts are bounded by the aggregation limit.
    pub fn entry(&self, key: impl Into<AggregationKey>) -> Option<&TermAggregationResultEntry> {
        let wanted = key.into();
        self.entries.iter().find(|entry| entry.key.loosely_equals(&wanted))
    }

    pub fn has_entry(&self, key: impl Into<AggregationKey>) -> bool {
        self.entry(key).is_some()
    }

    /// Number of buckets
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lazily yields `(key, count)` pairs; every call starts from the first bucket
    pub fn iter(&self) -> TermAggregationIter<'_> {
        TermAggregationIter {
            inner: self.entries.iter(),
        }
    }
}

/// Iterator over `(key, count)` pairs of a [`TermAggregationResult`]
pub struct TermAggregationIter<'a> {
    inner: slice::Iter<'a, TermAggregationResultEntry>,
}

impl<'a> Iterator for TermAggregationIter<'a> {
    type Item = (&'a AggregationKey, u64);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|entry| (&entry.key, entry.count))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for TermAggregationIter<'_> {}

impl<'a> IntoIterator for &'a TermAggregationResult {
    type Item = (&'a AggregationKey, u64);
    type IntoIter = TermAggregationIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Aggregation results of one search, in request order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregationResultCollection {
    results: Vec<TermAggregationResult>,
}

impl AggregationResultCollection {
    pub fn new(results: Vec<TermAggregationResult>) -> Self {
        Self { results }
    }

    pub fn get(&self, name: &str) -> Option<&TermAggregationResult> {
        self.results.iter().find(|result| result.name == name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, TermAggregationResult> {
        self.results.iter()
    }
}

impl FromIterator<TermAggregationResult> for AggregationResultCollection {
    fn from_iter<I: IntoIterator<Item = TermAggregationResult>>(iter: I) -> Self {
        Self {
            results: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a AggregationResultCollection {
    type Item = &'a TermAggregationResult;
    type IntoIter = slice::Iter<'a, TermAggregationResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}
