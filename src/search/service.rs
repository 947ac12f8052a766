//! Search service contract
//!
//! Every search backend implements [`SearchService`]. Optional features are
//! advertised at runtime through [`SearchService::supports`], so callers can
//! adapt to whichever backend is active.

use crate::models::{Content, ContentInfo, Location};
use crate::search::capability::Capabilities;
use crate::search::criterion::Criterion;
use crate::search::error::{Result, SearchError};
use crate::search::language::LanguageFilter;
use crate::search::query::{LocationQuery, Query};
use crate::search::result::{SearchResult, Suggestion};
use async_trait::async_trait;

/// Suggestion count used when a caller does not pick one
pub const DEFAULT_SUGGESTION_LIMIT: usize = 10;

/// Operations a search backend must provide
#[async_trait]
pub trait SearchService: Send + Sync {
    /// Find content items matching `query`
    ///
    /// With `filter_on_user_permissions` only items the current actor may
    /// read are returned. Fails with `InvalidQuery` before reaching the
    /// engine when the query is malformed.
    async fn find_content(
        &self,
        query: &Query,
        language_filter: &LanguageFilter,
        filter_on_user_permissions: bool,
    ) -> Result<SearchResult<Content>>;

    /// Same as [`find_content`](Self::find_content) but returns content
    /// metadata without translations or fields
    async fn find_content_info(
        &self,
        query: &Query,
        language_filter: &LanguageFilter,
        filter_on_user_permissions: bool,
    ) -> Result<SearchResult<ContentInfo>>;

    /// Find the one content item matching `filter`
    ///
    /// Fails with `NotFound` when nothing matches (also when permission
    /// filtering removed the only match) and with `AmbiguousResult` when more
    /// than one item matches.
    async fn find_single(
        &self,
        filter: &Criterion,
        language_filter: &LanguageFilter,
        filter_on_user_permissions: bool,
    ) -> Result<Content>;

    /// Up to `limit` completions for `prefix`, optionally restricted to the
    /// given field identifiers and an extra filter
    async fn suggest(
        &self,
        prefix: &str,
        field_paths: &[String],
        limit: usize,
        filter: Option<&Criterion>,
    ) -> Result<Vec<Suggestion>>;

    /// Find locations matching `query`
    async fn find_locations(
        &self,
        query: &LocationQuery,
        language_filter: &LanguageFilter,
        filter_on_user_permissions: bool,
    ) -> Result<SearchResult<Location>>;

    /// Whether the active backend implements `capability`
    ///
    /// Backends without a capability query answer `false` for everything.
    fn supports(&self, capability: Capabilities) -> bool {
        let _ = capability;
        false
    }
}

/// Reduce a result to its only hit
///
/// Uses `total_count` when present, so a backend may fetch a single page of
/// two hits and still detect ambiguity among more matches.
pub fn expect_single<T>(result: SearchResult<T>, description: &str) -> Result<T> {
    let total = result.total_count.unwrap_or(result.hits.len() as u64);
    match total {
        0 => Err(SearchError::NotFound(description.to_string())),
        1 => result
            .hits
            .into_iter()
            .next()
            .map(|hit| hit.value)
            .ok_or_else(|| SearchError::NotFound(description.to_string())),
        count => Err(SearchError::AmbiguousResult { count }),
    }
}
