//! Search result envelope

use crate::search::aggregation::AggregationResultCollection;
use serde::{Deserialize, Serialize};

/// A single search result hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit<T> {
    /// The matched content, content info or location
    pub value: T,

    /// Relevance score, when the backend scores
    pub score: Option<f32>,

    /// Language code of the translation that matched
    pub matched_translation: String,
}

/// Search response with hits and metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult<T> {
    /// Page of hits
    pub hits: Vec<SearchHit<T>>,

    /// Total number of matches before pagination; `None` when not counted
    pub total_count: Option<u64>,

    /// Highest score among all matches
    pub max_score: Option<f32>,

    /// Search execution time in milliseconds
    pub time_ms: u64,

    /// Aggregation results, in request order
    #[serde(default)]
    pub aggregations: AggregationResultCollection,
}

impl<T> SearchResult<T> {
    /// An empty result
    pub fn empty() -> Self {
        Self {
            hits: Vec::new(),
            total_count: Some(0),
            max_score: None,
            time_ms: 0,
            aggregations: AggregationResultCollection::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Hit values, dropping scores
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.hits.iter().map(|hit| &hit.value)
    }

    /// Convert hit values, keeping all metadata
    pub fn map<U, F>(self, mut f: F) -> SearchResult<U>
    where
        F: FnMut(T) -> U,
    {
        SearchResult {
            hits: self
                .hits
                .into_iter()
                .map(|hit| SearchHit {
                    value: f(hit.value),
                    score: hit.score,
                    matched_translation: hit.matched_translation,
                })
                .collect(),
            total_count: self.total_count,
            max_score: self.max_score,
            time_ms: self.time_ms,
            aggregations: self.aggregations,
        }
    }
}

/// Completion suggestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Suggested text
    pub text: String,

    /// Number of matched items containing the text
    pub count: usize,

    /// Best relevance score among those items
    pub score: f32,
}
