//! Tantivy-backed search service

use crate::models::{Content, ContentInfo, Location};
use crate::search::aggregation::{
    AggregationField, AggregationKey, AggregationResultCollection, TermAggregation,
    TermAggregationResult, TermAggregationResultEntry,
};
use crate::search::capability::Capabilities;
use crate::search::config::SearchConfig;
use crate::search::criterion::{is_valid_identifier, Criterion};
use crate::search::document::{
    LocationRecord, CONTENT_RECORD, CONTENT_TYPE_FACET, FIELD_FACET, LANGUAGE_FACET,
    LOCATION_RECORD, SECTION_FACET,
};
use crate::search::error::{Result, SearchError};
use crate::search::index::{IndexManager, IndexStats};
use crate::search::language::LanguageFilter;
use crate::search::permission::{AllowAll, PermissionResolver};
use crate::search::query::{LocationQuery, Query, SortClause, SortField, SortOrder};
use crate::search::query_builder::QueryBuilder;
use crate::search::result::{SearchHit, SearchResult, Suggestion};
use crate::search::service::{expect_single, SearchService};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tantivy::collector::{Count, FacetCollector, TopDocs};
use tantivy::query::Query as TantivyQuery;
use tantivy::schema::{Facet, Value};
use tantivy::tokenizer::{TextAnalyzer, TokenStream};
use tantivy::{DocAddress, Searcher, TantivyDocument};

/// Field path selecting translation names in `suggest`
pub const NAME_FIELD_PATH: &str = "name";

/// Record decoded from a stored payload
trait IndexedRecord: DeserializeOwned + Send {
    fn info(&self) -> &ContentInfo;

    fn location(&self) -> Option<&Location>;
}

impl IndexedRecord for Content {
    fn info(&self) -> &ContentInfo {
        &self.info
    }

    fn location(&self) -> Option<&Location> {
        None
    }
}

impl IndexedRecord for LocationRecord {
    fn info(&self) -> &ContentInfo {
        &self.content_info
    }

    fn location(&self) -> Option<&Location> {
        Some(&self.location)
    }
}

/// A matched document before pagination
struct Matched<R> {
    score: f32,
    language_code: String,
    name: String,
    record: R,
}

/// Value compared by one sort clause
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SortValue {
    Int(i64),
    UInt(u64),
    Text(String),
}

impl<R: IndexedRecord> Matched<R> {
    fn sort_value(&self, field: SortField) -> SortValue {
        let info = self.record.info();
        let location = self.record.location();
        match field {
            SortField::ContentId => SortValue::UInt(info.id),
            SortField::ContentName => SortValue::Text(self.name.to_lowercase()),
            SortField::DatePublished => SortValue::Int(info.published.timestamp()),
            SortField::DateModified => SortValue::Int(info.modified.timestamp()),
            SortField::SectionId => SortValue::UInt(info.section_id),
            SortField::LocationPriority => {
                SortValue::Int(location.map(|l| i64::from(l.priority)).unwrap_or(0))
            }
            SortField::LocationDepth => SortValue::UInt(location.map(Location::depth).unwrap_or(0)),
            SortField::LocationPath => {
                SortValue::Text(location.map(Location::path_string).unwrap_or_default())
            }
        }
    }

    fn compare(&self, other: &Self, clauses: &[SortClause]) -> Ordering {
        for clause in clauses {
            let ordering = self.sort_value(clause.field).cmp(&other.sort_value(clause.field));
            let ordering = match clause.order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

/// Search service over a Tantivy index
pub struct TantivySearchEngine {
    /// Index manager
    index_manager: Arc<IndexManager>,

    /// Configuration
    config: SearchConfig,

    /// Read permissions of the current actor
    permissions: Arc<dyn PermissionResolver>,
}

impl TantivySearchEngine {
    /// Create a new engine granting read access to everything
    pub async fn new(config: SearchConfig) -> Result<Self> {
        let index_manager = Arc::new(IndexManager::new(config.clone()).await?);

        Ok(Self {
            index_manager,
            config,
            permissions: Arc::new(AllowAll),
        })
    }

    /// Replace the permission resolver
    pub fn with_permissions(mut self, permissions: Arc<dyn PermissionResolver>) -> Self {
        self.permissions = permissions;
        self
    }

    /// Capabilities this engine offers under its configuration
    pub fn capabilities(&self) -> Capabilities {
        self.config.capabilities()
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Index a single content item
    pub async fn index_content(&self, content: &Content) -> Result<()> {
        self.index_manager.index_content(content).await
    }

    /// Index multiple content items
    pub async fn index_contents(&self, contents: &[Content]) -> Result<usize> {
        self.index_manager.index_contents(contents).await
    }

    /// Delete a content item from the index
    pub async fn delete_content(&self, content_id: u64) -> Result<()> {
        self.index_manager.delete_content(content_id).await
    }

    /// Delete several content items and commit once
    pub async fn delete_contents(&self, content_ids: &[u64]) -> Result<usize> {
        self.index_manager.delete_contents(content_ids).await
    }

    /// Get index statistics
    pub async fn get_stats(&self) -> Result<IndexStats> {
        self.index_manager.get_stats().await
    }

    /// Commit pending changes
    pub async fn commit(&self) -> Result<()> {
        self.index_manager.commit().await
    }

    /// Clear the entire index
    pub async fn clear_index(&self) -> Result<()> {
        self.index_manager.clear_index().await
    }

    /// Rebuild the entire index from content items
    pub async fn rebuild_index(&self, contents: &[Content]) -> Result<()> {
        self.clear_index().await?;
        self.index_contents(contents).await?;
        self.index_manager.optimize().await?;
        Ok(())
    }

    fn effective_filter(&self, filter: &Criterion, filter_on_user_permissions: bool) -> Criterion {
        let filter = filter.clone();
        if !filter_on_user_permissions {
            return filter;
        }
        match self.permissions.permission_criterion() {
            Some(permission) => filter.and_with(permission),
            None => filter,
        }
    }

    /// Run a validated query against one record type
    async fn execute<R: IndexedRecord>(
        &self,
        record_type: &str,
        query: &Query,
        language_filter: &LanguageFilter,
        filter_on_user_permissions: bool,
    ) -> Result<SearchResult<R>> {
        let start_time = Instant::now();

        language_filter.validate()?;
        if !query.aggregations.is_empty() && !self.config.enable_facets {
            return Err(SearchError::InvalidQuery(
                "term aggregations are disabled for this engine".to_string(),
            ));
        }

        let filter = self.effective_filter(&query.filter, filter_on_user_permissions);
        let fields = self.index_manager.fields();
        let query_builder = QueryBuilder::new(self.index_manager.index(), fields);
        let tantivy_query =
            query_builder.build(record_type, language_filter, &filter, query.query.as_ref())?;

        let searcher = self.index_manager.reader().searcher();

        let total = searcher
            .search(&*tantivy_query, &Count)
            .map_err(|e| SearchError::SearchFailed(format!("Count failed: {}", e)))?;

        let limit = query.limit.min(self.config.max_results);
        let scored = query.query.is_some();

        let mut matched = Vec::new();
        if limit > 0 && query.offset < total {
            if query.sort_clauses.is_empty() {
                let collector = TopDocs::with_limit(limit).and_offset(query.offset);
                let top_docs = searcher
                    .search(&*tantivy_query, &collector)
                    .map_err(|e| SearchError::SearchFailed(format!("Search execution failed: {}", e)))?;
                for (score, address) in top_docs {
                    matched.push(self.load::<R>(&searcher, score, address)?);
                }
            } else {
                let top_docs = searcher
                    .search(&*tantivy_query, &TopDocs::with_limit(total))
                    .map_err(|e| SearchError::SearchFailed(format!("Search execution failed: {}", e)))?;
                let mut all = Vec::with_capacity(top_docs.len());
                for (score, address) in top_docs {
                    all.push(self.load::<R>(&searcher, score, address)?);
                }
                all.sort_by(|a, b| a.compare(b, &query.sort_clauses));
                matched = all.into_iter().skip(query.offset).take(limit).collect();
            }
        }

        let max_score = if scored && total > 0 {
            searcher
                .search(&*tantivy_query, &TopDocs::with_limit(1))
                .map_err(|e| SearchError::SearchFailed(format!("Search execution failed: {}", e)))?
                .first()
                .map(|(score, _)| *score)
        } else {
            None
        };

        let aggregations = self.compute_aggregations(&searcher, &*tantivy_query, &query.aggregations)?;

        let hits = matched
            .into_iter()
            .map(|m| SearchHit {
                value: m.record,
                score: scored.then_some(m.score),
                matched_translation: m.language_code,
            })
            .collect::<Vec<_>>();

        let time_ms = start_time.elapsed().as_millis() as u64;
        tracing::debug!(record_type, total, returned = hits.len(), time_ms, "Search executed");

        Ok(SearchResult {
            hits,
            total_count: query.perform_count.then_some(total as u64),
            max_score,
            time_ms,
            aggregations,
        })
    }

    fn load<R: IndexedRecord>(
        &self,
        searcher: &Searcher,
        score: f32,
        address: DocAddress,
    ) -> Result<Matched<R>> {
        let fields = self.index_manager.fields();
        let doc: TantivyDocument = searcher
            .doc(address)
            .map_err(|e| SearchError::SearchFailed(format!("Failed to retrieve doc: {}", e)))?;

        let text = |field: tantivy::schema::Field| {
            doc.get_first(field)
                .and_then(|value| value.as_str())
                .map(str::to_string)
        };

        let payload = text(fields.payload)
            .ok_or_else(|| SearchError::Serialization("document has no payload".to_string()))?;

        Ok(Matched {
            score,
            language_code: text(fields.language_code).unwrap_or_default(),
            name: text(fields.name).unwrap_or_default(),
            record: serde_json::from_str(&payload)?,
        })
    }

    /// Compute term aggregations over the facet field
    fn compute_aggregations(
        &self,
        searcher: &Searcher,
        query: &dyn TantivyQuery,
        aggregations: &[TermAggregation],
    ) -> Result<AggregationResultCollection> {
        let mut results = Vec::with_capacity(aggregations.len());

        for aggregation in aggregations {
            let root = match aggregation.field {
                AggregationField::ContentType => Facet::from_path([CONTENT_TYPE_FACET]),
                AggregationField::Section => Facet::from_path([SECTION_FACET]),
                AggregationField::Language => Facet::from_path([LANGUAGE_FACET]),
                AggregationField::Field(ref identifier) => {
                    Facet::from_path([FIELD_FACET, identifier.as_str()])
                }
            };

            let mut facet_collector = FacetCollector::for_field("facets");
            facet_collector.add_facet(root.clone());

            let facet_counts = searcher
                .search(query, &facet_collector)
                .map_err(|e| SearchError::SearchFailed(format!("Facet aggregation failed: {}", e)))?;

            let mut buckets: Vec<(String, u64)> = facet_counts
                .get(root)
                .filter(|(_, count)| *count >= aggregation.min_count)
                .filter_map(|(facet, count)| {
                    facet
                        .to_path()
                        .last()
                        .map(|segment| (segment.to_string(), count))
                })
                .collect();

            // Count descending, then key ascending
            buckets.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            buckets.truncate(aggregation.limit);

            let entries = buckets
                .into_iter()
                .map(|(key, count)| {
                    let key = match aggregation.field {
                        AggregationField::Section => key
                            .parse::<u64>()
                            .map(AggregationKey::UInt)
                            .unwrap_or(AggregationKey::Str(key)),
                        _ => AggregationKey::Str(key),
                    };
                    TermAggregationResultEntry { key, count }
                })
                .collect();

            results.push(TermAggregationResult::new(aggregation.name.clone(), entries));
        }

        Ok(AggregationResultCollection::new(results))
    }
}


/// Terms of `text` as the full-text field indexes them
fn analyzed_terms(analyzer: &mut TextAnalyzer, text: &str) -> Vec<String> {
    let mut stream = analyzer.token_stream(text);
    let mut terms = Vec::new();
    while stream.advance() {
        terms.push(stream.token().text.clone());
    }
    terms
}

struct SuggestionBucket {
    text: String,
    items: HashSet<u64>,
    score: f32,
}

#[async_trait]
impl SearchService for TantivySearchEngine {
    async fn find_content(
        &self,
        query: &Query,
        language_filter: &LanguageFilter,
        filter_on_user_permissions: bool,
    ) -> Result<SearchResult<Content>> {
        query.validate()?;
        self.execute(CONTENT_RECORD, query, language_filter, filter_on_user_permissions)
            .await
    }

    async fn find_content_info(
        &self,
        query: &Query,
        language_filter: &LanguageFilter,
        filter_on_user_permissions: bool,
    ) -> Result<SearchResult<ContentInfo>> {
        let result = self
            .find_content(query, language_filter, filter_on_user_permissions)
            .await?;
        Ok(result.map(|content| content.info))
    }

    async fn find_single(
        &self,
        filter: &Criterion,
        language_filter: &LanguageFilter,
        filter_on_user_permissions: bool,
    ) -> Result<Content> {
        let query = Query::new(filter.clone()).with_limit(2);
        let result = self
            .find_content(&query, language_filter, filter_on_user_permissions)
            .await?;
        expect_single(result, &format!("content matching {:?}", filter))
    }

    async fn suggest(
        &self,
        prefix: &str,
        field_paths: &[String],
        limit: usize,
        filter: Option<&Criterion>,
    ) -> Result<Vec<Suggestion>> {
        if !self.config.enable_suggestions || limit == 0 {
            return Ok(Vec::new());
        }

        let fields = self.index_manager.fields();
        let mut analyzer = self.index_manager.index().tokenizer_for_field(fields.full_text)?;
        let prefix_words = analyzed_terms(&mut analyzer, prefix);
        let Some((last, leading)) = prefix_words.split_last() else {
            return Err(SearchError::InvalidQuery("suggestion prefix is empty".to_string()));
        };

        if let Some(path) = field_paths
            .iter()
            .find(|path| path.as_str() != NAME_FIELD_PATH && !is_valid_identifier(path))
        {
            return Err(SearchError::InvalidQuery(format!(
                "'{}' is not a valid field path",
                path
            )));
        }

        let filter = match filter {
            Some(filter) => {
                filter.validate()?;
                filter.clone()
            }
            None => Criterion::MatchAll,
        };
        let filter = self.effective_filter(&filter, true);

        let query_builder = QueryBuilder::new(self.index_manager.index(), fields);
        let tantivy_query = query_builder.suggestion(&prefix_words, &filter)?;

        let searcher = self.index_manager.reader().searcher();
        let top_docs = searcher
            .search(
                &*tantivy_query,
                &TopDocs::with_limit(self.config.suggestion_scan_limit),
            )
            .map_err(|e| SearchError::SearchFailed(format!("Suggestion search failed: {}", e)))?;

        let includes = |path: &str| field_paths.is_empty() || field_paths.iter().any(|p| p == path);
        let phrase = leading.join(" ");
        let mut buckets: HashMap<String, SuggestionBucket> = HashMap::new();

        for (score, address) in top_docs {
            let matched = self.load::<Content>(&searcher, score, address)?;
            let Some(translation) = matched.record.translation(&matched.language_code) else {
                tracing::warn!(
                    content_id = matched.record.id(),
                    language = %matched.language_code,
                    "Indexed translation missing from stored payload"
                );
                continue;
            };

            let mut texts = Vec::new();
            if includes(NAME_FIELD_PATH) {
                texts.push(translation.name.clone());
            }
            for field in &translation.fields {
                if includes(field.identifier.as_str()) {
                    if let Some(text) = field.value.full_text() {
                        texts.push(text);
                    }
                }
            }

            let candidates: Vec<String> = texts
                .iter()
                .flat_map(|text| analyzed_terms(&mut analyzer, text))
                .collect();
            for word in candidates {
                if !word.starts_with(last.as_str()) {
                    continue;
                }
                let text = if phrase.is_empty() {
                    word.clone()
                } else {
                    format!("{} {}", phrase, word)
                };
                let bucket = buckets.entry(word).or_insert_with(|| SuggestionBucket {
                    text,
                    items: HashSet::new(),
                    score,
                });
                bucket.items.insert(matched.record.id());
                bucket.score = bucket.score.max(score);
            }
        }

        let mut suggestions: Vec<Suggestion> = buckets
            .into_values()
            .map(|bucket| Suggestion {
                text: bucket.text,
                count: bucket.items.len(),
                score: bucket.score,
            })
            .collect();

        suggestions.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| b.score.total_cmp(&a.score))
                .then_with(|| a.text.cmp(&b.text))
        });
        suggestions.truncate(limit);

        tracing::debug!(prefix, returned = suggestions.len(), "Suggestions computed");
        Ok(suggestions)
    }

    async fn find_locations(
        &self,
        query: &LocationQuery,
        language_filter: &LanguageFilter,
        filter_on_user_permissions: bool,
    ) -> Result<SearchResult<Location>> {
        query.validate()?;
        let result: SearchResult<LocationRecord> = self
            .execute(
                LOCATION_RECORD,
                query.query(),
                language_filter,
                filter_on_user_permissions,
            )
            .await?;
        Ok(result.map(|record| record.location))
    }

    fn supports(&self, capability: Capabilities) -> bool {
        !capability.is_empty() && self.capabilities().contains(capability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Translation;
    use crate::search::config::SearchConfigBuilder;
    use crate::search::permission::SectionPermissions;

    async fn create_test_engine() -> TantivySearchEngine {
        TantivySearchEngine::new(SearchConfig::default()).await.unwrap()
    }

    fn article(id: u64, name: &str) -> Content {
        Content::new(ContentInfo::new(id, format!("remote-{}", id), "article", "eng-GB"))
            .with_translation(Translation::new("eng-GB", name))
            .with_location(Location::root(id + 100, id))
    }

    #[tokio::test]
    async fn test_engine_creation() {
        let engine = create_test_engine().await;
        let stats = engine.get_stats().await.unwrap();
        assert_eq!(stats.total_documents, 0);
    }

    #[tokio::test]
    async fn test_full_text_scoring() {
        let engine = create_test_engine().await;
        engine
            .index_contents(&[
                article(1, "Database connection pooling"),
                article(2, "Memory leak in worker"),
            ])
            .await
            .unwrap();

        let result = engine
            .find_content(&Query::full_text("database"), &LanguageFilter::default(), true)
            .await
            .unwrap();
        assert_eq!(result.total_count, Some(1));
        assert_eq!(result.hits[0].value.id(), 1);
        assert!(result.hits[0].score.is_some());
        assert!(result.max_score.is_some());
    }

    #[tokio::test]
    async fn test_filter_only_query_has_no_scores() {
        let engine = create_test_engine().await;
        engine.index_content(&article(1, "First")).await.unwrap();

        let result = engine
            .find_content(&Query::default(), &LanguageFilter::default(), true)
            .await
            .unwrap();
        assert_eq!(result.len(), 1);
        assert!(result.hits[0].score.is_none());
        assert!(result.max_score.is_none());
    }

    #[tokio::test]
    async fn test_sorted_pagination() {
        let engine = create_test_engine().await;
        engine
            .index_contents(&[article(1, "Charlie"), article(2, "alpha"), article(3, "Bravo")])
            .await
            .unwrap();

        let query = Query::default()
            .with_sort(SortClause::asc(SortField::ContentName))
            .with_offset(1)
            .with_limit(1);
        let result = engine
            .find_content(&query, &LanguageFilter::default(), true)
            .await
            .unwrap();
        assert_eq!(result.total_count, Some(3));
        assert_eq!(result.hits.len(), 1);
        assert_eq!(result.hits[0].value.id(), 3);
    }

    #[tokio::test]
    async fn test_zero_limit_returns_count_only() {
        let engine = create_test_engine().await;
        engine.index_content(&article(1, "First")).await.unwrap();

        let result = engine
            .find_content(&Query::default().with_limit(0), &LanguageFilter::default(), true)
            .await
            .unwrap();
        assert!(result.is_empty());
        assert_eq!(result.total_count, Some(1));
    }

    #[tokio::test]
    async fn test_permissions_hide_other_sections() {
        let mut restricted = article(2, "Secret plans");
        restricted.info.section_id = 7;

        let engine = create_test_engine()
            .await
            .with_permissions(Arc::new(SectionPermissions::new([1])));
        engine
            .index_contents(&[article(1, "Public plans"), restricted])
            .await
            .unwrap();

        let filtered = engine
            .find_content(&Query::full_text("plans"), &LanguageFilter::default(), true)
            .await
            .unwrap();
        assert_eq!(filtered.total_count, Some(1));

        let unfiltered = engine
            .find_content(&Query::full_text("plans"), &LanguageFilter::default(), false)
            .await
            .unwrap();
        assert_eq!(unfiltered.total_count, Some(2));

        assert!(matches!(
            engine
                .find_single(&Criterion::ContentId(vec![2]), &LanguageFilter::default(), true)
                .await,
            Err(SearchError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_aggregations_disabled() {
        let engine = TantivySearchEngine::new(SearchConfigBuilder::new().enable_facets(false).build())
            .await
            .unwrap();
        assert!(!engine.supports(Capabilities::AGGREGATIONS));
        assert!(!engine.supports(Capabilities::empty()));

        let query = Query::default()
            .with_aggregation(TermAggregation::new("types", AggregationField::ContentType));
        assert!(matches!(
            engine.find_content(&query, &LanguageFilter::default(), true).await,
            Err(SearchError::InvalidQuery(_))
        ));
    }

    #[tokio::test]
    async fn test_suggest_prefix() {
        let engine = create_test_engine().await;
        engine
            .index_contents(&[
                article(1, "Database replication"),
                article(2, "Database backups"),
                article(3, "Data retention"),
            ])
            .await
            .unwrap();

        let suggestions = engine.suggest("datab", &[], 5, None).await.unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].text, "database");
        assert_eq!(suggestions[0].count, 2);

        let suggestions = engine.suggest("dat", &[], 5, None).await.unwrap();
        assert_eq!(suggestions[0].text, "database");
        assert_eq!(suggestions[1].text, "data");

        assert!(engine.suggest("dat", &[], 0, None).await.unwrap().is_empty());
        assert!(matches!(
            engine.suggest("  ", &[], 5, None).await,
            Err(SearchError::InvalidQuery(_))
        ));
    }

    #[tokio::test]
    async fn test_suggest_skips_terms_the_index_drops() {
        let engine = create_test_engine().await;
        let long_word = "pneumonoultramicroscopicsilicovolcanoconiosisxx";
        engine
            .index_content(&article(1, &format!("{} pneumonia", long_word)))
            .await
            .unwrap();

        let suggestions = engine.suggest("pneumo", &[], 5, None).await.unwrap();
        let texts: Vec<&str> = suggestions.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["pneumonia"]);

        for suggestion in &suggestions {
            let query = Query::default().with_query(Criterion::full_text(suggestion.text.clone()));
            let result = engine
                .find_content(&query, &LanguageFilter::default(), false)
                .await
                .unwrap();
            assert_eq!(result.total_count, Some(1));
        }
    }
}
