//! Query criterion tree

use crate::models::FieldValue;
use crate::search::error::{Result, SearchError};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static FIELD_IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z][a-z0-9_]{0,63}$").expect("field identifier pattern is valid")
});

/// Whether `identifier` is usable as a field identifier
pub fn is_valid_identifier(identifier: &str) -> bool {
    FIELD_IDENTIFIER.is_match(identifier)
}

/// Comparison applied by a field criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldOperator {
    /// Exactly one value
    Eq,
    /// Any of one or more values
    In,
}

/// Inclusive date range; an open bound is unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn after(from: DateTime<Utc>) -> Self {
        Self { from: Some(from), to: None }
    }

    pub fn before(to: DateTime<Utc>) -> Self {
        Self { from: None, to: Some(to) }
    }
}

/// A node of the criterion tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Criterion {
    MatchAll,
    MatchNone,
    ContentId(Vec<u64>),
    RemoteId(Vec<String>),
    ContentTypeIdentifier(Vec<String>),
    SectionId(Vec<u64>),
    /// Items translated into any of `codes`; with `match_always_available`
    /// always-available items match too
    LanguageCode {
        codes: Vec<String>,
        #[serde(default)]
        match_always_available: bool,
    },
    LocationId(Vec<u64>),
    ParentLocationId(Vec<u64>),
    /// Items placed at or below any of the given locations
    Subtree(Vec<u64>),
    /// `true` matches visible placements, `false` hidden ones
    Visibility(bool),
    DatePublished(DateRange),
    DateModified(DateRange),
    Field {
        identifier: String,
        operator: FieldOperator,
        values: Vec<FieldValue>,
    },
    FullText(String),
    LogicalAnd(Vec<Criterion>),
    LogicalOr(Vec<Criterion>),
    LogicalNot(Box<Criterion>),
}

impl Default for Criterion {
    fn default() -> Self {
        Criterion::MatchAll
    }
}

impl Criterion {
    pub fn and(criteria: Vec<Criterion>) -> Self {
        Criterion::LogicalAnd(criteria)
    }

    pub fn or(criteria: Vec<Criterion>) -> Self {
        Criterion::LogicalOr(criteria)
    }

    pub fn not(criterion: Criterion) -> Self {
        Criterion::LogicalNot(Box::new(criterion))
    }

    pub fn content_type(identifier: impl Into<String>) -> Self {
        Criterion::ContentTypeIdentifier(vec![identifier.into()])
    }

    pub fn full_text(text: impl Into<String>) -> Self {
        Criterion::FullText(text.into())
    }

    pub fn field_eq(identifier: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Criterion::Field {
            identifier: identifier.into(),
            operator: FieldOperator::Eq,
            values: vec![value.into()],
        }
    }

    pub fn field_in<V: Into<FieldValue>>(identifier: impl Into<String>, values: Vec<V>) -> Self {
        Criterion::Field {
            identifier: identifier.into(),
            operator: FieldOperator::In,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// AND `self` with `other`, flattening nested conjunctions
    pub fn and_with(self, other: Criterion) -> Self {
        match (self, other) {
            (Criterion::MatchAll, other) => other,
            (this, Criterion::MatchAll) => this,
            (Criterion::LogicalAnd(mut left), Criterion::LogicalAnd(right)) => {
                left.extend(right);
                Criterion::LogicalAnd(left)
            }
            (Criterion::LogicalAnd(mut left), other) => {
                left.push(other);
                Criterion::LogicalAnd(left)
            }
            (this, other) => Criterion::LogicalAnd(vec![this, other]),
        }
    }

    /// Whether the tree contains a full-text node
    pub fn has_full_text(&self) -> bool {
        match self {
            Criterion::FullText(_) => true,
            Criterion::LogicalAnd(children) | Criterion::LogicalOr(children) => {
                children.iter().any(Criterion::has_full_text)
            }
            Criterion::LogicalNot(inner) => inner.has_full_text(),
            _ => false,
        }
    }

    /// Reject structurally invalid trees
    pub fn validate(&self) -> Result<()> {
        match self {
            Criterion::MatchAll | Criterion::MatchNone | Criterion::Visibility(_) => Ok(()),
            Criterion::ContentId(ids) => non_empty("ContentId", ids),
            Criterion::RemoteId(ids) => non_empty_strings("RemoteId", ids),
            Criterion::ContentTypeIdentifier(ids) => non_empty_strings("ContentTypeIdentifier", ids),
            Criterion::SectionId(ids) => non_empty("SectionId", ids),
            Criterion::LanguageCode { codes, .. } => non_empty_strings("LanguageCode", codes),
            Criterion::LocationId(ids) => non_empty("LocationId", ids),
            Criterion::ParentLocationId(ids) => non_empty("ParentLocationId", ids),
            Criterion::Subtree(ids) => non_empty("Subtree", ids),
            Criterion::DatePublished(range) => validate_range("DatePublished", range),
            Criterion::DateModified(range) => validate_range("DateModified", range),
            Criterion::Field {
                identifier,
                operator,
                values,
            } => {
                if !is_valid_identifier(identifier) {
                    return Err(SearchError::InvalidQuery(format!(
                        "'{}' is not a valid field identifier",
                        identifier
                    )));
                }
                match operator {
                    FieldOperator::Eq if values.len() != 1 => Err(SearchError::InvalidQuery(format!(
                        "Field '{}' with operator eq takes exactly one value, got {}",
                        identifier,
                        values.len()
                    ))),
                    FieldOperator::In => non_empty("Field", values),
                    _ => Ok(()),
                }
            }
            Criterion::FullText(text) => {
                if text.trim().is_empty() {
                    Err(SearchError::InvalidQuery("FullText criterion has empty text".to_string()))
                } else {
                    Ok(())
                }
            }
            Criterion::LogicalAnd(children) | Criterion::LogicalOr(children) => {
                if children.is_empty() {
                    return Err(SearchError::InvalidQuery(
                        "logical operator requires at least one criterion".to_string(),
                    ));
                }
                children.iter().try_for_each(Criterion::validate)
            }
            Criterion::LogicalNot(inner) => inner.validate(),
        }
    }
}

fn non_empty<T>(name: &str, values: &[T]) -> Result<()> {
    if values.is_empty() {
        Err(SearchError::InvalidQuery(format!("{} criterion requires at least one value", name)))
    } else {
        Ok(())
    }
}

fn non_empty_strings(name: &str, values: &[String]) -> Result<()> {
    non_empty(name, values)?;
    if values.iter().any(|value| value.trim().is_empty()) {
        return Err(SearchError::InvalidQuery(format!("{} criterion contains an empty value", name)));
    }
    Ok(())
}

fn validate_range(name: &str, range: &DateRange) -> Result<()> {
    match (range.from, range.to) {
        (None, None) => Err(SearchError::InvalidQuery(format!("{} criterion has no bounds", name))),
        (Some(from), Some(to)) if from > to => Err(SearchError::InvalidQuery(format!(
            "{} criterion lower bound is after upper bound",
            name
        ))),
        _ => Ok(()),
    }
}
