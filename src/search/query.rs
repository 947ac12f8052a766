//! Search query building

use crate::search::aggregation::{AggregationField, TermAggregation};
use crate::search::criterion::{is_valid_identifier, Criterion};
use crate::search::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;
use strum::{Display, EnumString};

/// Default page size of a query
pub const DEFAULT_LIMIT: usize = 25;

/// Sort order for search results
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[strum(serialize = "asc", serialize = "ascending")]
    Ascending,
    #[strum(serialize = "desc", serialize = "descending")]
    Descending,
}

/// Attribute to sort by
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    ContentId,
    ContentName,
    DatePublished,
    DateModified,
    SectionId,
    LocationPriority,
    LocationDepth,
    LocationPath,
}

impl SortField {
    /// Only meaningful when searching locations
    pub fn is_location_only(self) -> bool {
        matches!(
            self,
            SortField::LocationPriority | SortField::LocationDepth | SortField::LocationPath
        )
    }
}

/// One sort criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SortClause {
    pub field: SortField,
    pub order: SortOrder,
}

impl SortClause {
    pub fn asc(field: SortField) -> Self {
        Self {
            field,
            order: SortOrder::Ascending,
        }
    }

    pub fn desc(field: SortField) -> Self {
        Self {
            field,
            order: SortOrder::Descending,
        }
    }
}

impl FromStr for SortClause {
    type Err = SearchError;

    /// Parses `field` or `field:order`, e.g. `date_published:desc`
    fn from_str(s: &str) -> Result<Self> {
        let (field, order) = match s.split_once(':') {
            Some((field, order)) => (field, Some(order)),
            None => (s, None),
        };
        let field = SortField::from_str(field.trim())
            .map_err(|_| SearchError::InvalidQuery(format!("unknown sort field '{}'", field)))?;
        let order = match order {
            Some(order) => SortOrder::from_str(order.trim())
                .map_err(|_| SearchError::InvalidQuery(format!("unknown sort order '{}'", order)))?,
            None => SortOrder::Ascending,
        };
        Ok(Self { field, order })
    }
}

/// Content search query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Non-scoring restriction
    #[serde(default)]
    pub filter: Criterion,

    /// Scoring criterion; `None` means every filtered item scores equally
    #[serde(default)]
    pub query: Option<Criterion>,

    /// Sorting; empty means relevance order
    #[serde(default)]
    pub sort_clauses: Vec<SortClause>,

    #[serde(default)]
    pub offset: usize,

    #[serde(default = "default_limit")]
    pub limit: usize,

    #[serde(default)]
    pub aggregations: Vec<TermAggregation>,

    /// Compute the total hit count
    #[serde(default = "default_perform_count")]
    pub perform_count: bool,
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

fn default_perform_count() -> bool {
    true
}

impl Default for Query {
    fn default() -> Self {
        Self {
            filter: Criterion::MatchAll,
            query: None,
            sort_clauses: Vec::new(),
            offset: 0,
            limit: DEFAULT_LIMIT,
            aggregations: Vec::new(),
            perform_count: true,
        }
    }
}

impl Query {
    /// Create a query restricted by `filter`
    pub fn new(filter: Criterion) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }

    /// Create a full-text scoring query
    pub fn full_text(text: impl Into<String>) -> Self {
        Self {
            query: Some(Criterion::full_text(text)),
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, filter: Criterion) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_query(mut self, query: Criterion) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_sort(mut self, clause: SortClause) -> Self {
        self.sort_clauses.push(clause);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_aggregation(mut self, aggregation: TermAggregation) -> Self {
        self.aggregations.push(aggregation);
        self
    }

    pub fn with_count(mut self, perform_count: bool) -> Self {
        self.perform_count = perform_count;
        self
    }

    /// Validate as a content query
    pub fn validate(&self) -> Result<()> {
        if let Some(clause) = self.sort_clauses.iter().find(|c| c.field.is_location_only()) {
            return Err(SearchError::InvalidQuery(format!(
                "sort clause '{}' is only valid in location queries",
                clause.field
            )));
        }
        self.validate_common()
    }

    fn validate_common(&self) -> Result<()> {
        self.filter.validate()?;
        if let Some(ref query) = self.query {
            query.validate()?;
        }

        let mut names = HashSet::new();
        for aggregation in &self.aggregations {
            if aggregation.name.trim().is_empty() {
                return Err(SearchError::InvalidQuery("aggregation name is empty".to_string()));
            }
            if !names.insert(aggregation.name.as_str()) {
                return Err(SearchError::InvalidQuery(format!(
                    "aggregation '{}' is requested more than once",
                    aggregation.name
                )));
            }
            if aggregation.limit == 0 {
                return Err(SearchError::InvalidQuery(format!(
                    "aggregation '{}' has a zero limit",
                    aggregation.name
                )));
            }
            if let AggregationField::Field(ref identifier) = aggregation.field {
                if !is_valid_identifier(identifier) {
                    return Err(SearchError::InvalidQuery(format!(
                        "aggregation '{}' targets invalid field '{}'",
                        aggregation.name, identifier
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Location search query; accepts location sort clauses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationQuery(pub Query);

impl LocationQuery {
    pub fn new(filter: Criterion) -> Self {
        LocationQuery(Query::new(filter))
    }

    pub fn query(&self) -> &Query {
        &self.0
    }

    pub fn validate(&self) -> Result<()> {
        self.0.validate_common()
    }
}

impl From<Query> for LocationQuery {
    fn from(query: Query) -> Self {
        LocationQuery(query)
    }
}
