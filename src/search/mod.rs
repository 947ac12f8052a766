//! Content search powered by Tantivy
//!
//! This module defines the search contract every backend implements and a
//! Tantivy backend for it:
//!
//! - **Contract**: [`SearchService`] with content, content info, single-item,
//!   location and suggestion lookups, plus a runtime [`Capabilities`] query
//! - **Criteria**: composable [`Criterion`] trees for filtering and scoring
//! - **Languages**: prioritized translation selection with always-available
//!   fallback
//! - **Aggregations**: term aggregations with loosely-keyed result lookup
//! - **Permissions**: read restrictions injected as criteria
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │           SearchService contract                │
//! ├─────────────────────────────────────────────────┤
//! │  - find_content()     - find_content_info()     │
//! │  - find_single()      - find_locations()        │
//! │  - suggest()          - supports()              │
//! └─────────────────────────────────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────────────┐
//! │           TantivySearchEngine                   │
//! ├─────────────────────────────────────────────────┤
//! │  - QueryBuilder (criteria → Tantivy queries)    │
//! │  - Sorting, paging, aggregations                │
//! └─────────────────────────────────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────────────┐
//! │           Index Manager                         │
//! ├─────────────────────────────────────────────────┤
//! │  - One document per record and translation      │
//! │  - Writer/Reader, commits                       │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use content_search::models::{Content, ContentInfo, Translation};
//! use content_search::search::{
//!     LanguageFilter, Query, SearchConfig, SearchService, TantivySearchEngine,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = TantivySearchEngine::new(SearchConfig::default()).await?;
//!
//!     let content = Content::new(ContentInfo::new(1, "welcome", "article", "eng-GB"))
//!         .with_translation(Translation::new("eng-GB", "Welcome to the site"));
//!     engine.index_content(&content).await?;
//!
//!     let languages = LanguageFilter::for_languages(["eng-GB"]);
//!     let results = engine
//!         .find_content(&Query::full_text("welcome"), &languages, true)
//!         .await?;
//!     println!("Found {:?} items", results.total_count);
//!
//!     Ok(())
//! }
//! ```

mod aggregation;
mod capability;
mod config;
mod criterion;
mod document;
mod engine;
mod error;
mod index;
mod language;
mod permission;
mod query;
mod query_builder;
mod result;
mod service;

pub use aggregation::{
    AggregationField, AggregationKey, AggregationResultCollection, TermAggregation,
    TermAggregationIter, TermAggregationResult, TermAggregationResultEntry, DEFAULT_TERM_LIMIT,
};
pub use capability::Capabilities;
pub use config::{SearchConfig, SearchConfigBuilder};
pub use criterion::{is_valid_identifier, Criterion, DateRange, FieldOperator};
pub use document::{build_content_schema, ContentDocument, LocationRecord, SearchDocument};
pub use engine::{TantivySearchEngine, NAME_FIELD_PATH};
pub use error::{Result, SearchError};
pub use index::{IndexManager, IndexStats};
pub use language::LanguageFilter;
pub use permission::{AllowAll, PermissionResolver, SectionPermissions};
pub use query::{LocationQuery, Query, SortClause, SortField, SortOrder, DEFAULT_LIMIT};
pub use query_builder::QueryBuilder;
pub use result::{SearchHit, SearchResult, Suggestion};
pub use service::{expect_single, SearchService, DEFAULT_SUGGESTION_LIMIT};
