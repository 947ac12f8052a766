//! Comprehensive tests for the search module

use chrono::{TimeZone, Utc};
use content_search::models::{Content, ContentInfo, Location, Translation};
use content_search::search::*;
use std::sync::Arc;
use tempfile::TempDir;

/// Helper to create a test engine backed by a temporary directory
async fn create_test_engine() -> (TantivySearchEngine, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let config = SearchConfigBuilder::new()
        .index_path(temp_dir.path().to_path_buf())
        .realtime_indexing(true)
        .build();

    (TantivySearchEngine::new(config).await.unwrap(), temp_dir)
}

/// Helper to create a test content item with one root location
fn create_test_content(id: u64, content_type: &str, language: &str, name: &str) -> Content {
    Content::new(ContentInfo::new(id, format!("remote-{}", id), content_type, language))
        .with_translation(Translation::new(language, name))
        .with_location(Location::root(id + 1000, id))
}

fn main_languages() -> LanguageFilter {
    LanguageFilter::default()
}

fn ids<T>(result: &SearchResult<T>, id: impl Fn(&T) -> u64) -> Vec<u64> {
    result.values().map(id).collect()
}

#[tokio::test]
async fn test_engine_creation_on_disk() {
    let (engine, temp_dir) = create_test_engine().await;
    let stats = engine.get_stats().await.unwrap();

    assert_eq!(stats.total_documents, 0);
    assert!(temp_dir.path().join("meta.json").exists());
}

#[tokio::test]
async fn test_index_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let config = SearchConfigBuilder::new()
        .index_path(temp_dir.path().to_path_buf())
        .build();

    {
        let engine = TantivySearchEngine::new(config.clone()).await.unwrap();
        engine
            .index_content(&create_test_content(1, "article", "eng-GB", "Persistent article"))
            .await
            .unwrap();
    }

    let engine = TantivySearchEngine::new(config).await.unwrap();
    let result = engine
        .find_content(&Query::full_text("persistent"), &main_languages(), true)
        .await
        .unwrap();
    assert_eq!(result.total_count, Some(1));
}

#[tokio::test]
async fn test_full_text_and_filter() {
    let (engine, _dir) = create_test_engine().await;
    engine
        .index_contents(&[
            create_test_content(1, "article", "eng-GB", "Database connection timeout"),
            create_test_content(2, "blog_post", "eng-GB", "Database migrations explained"),
            create_test_content(3, "article", "eng-GB", "Memory leak in worker"),
        ])
        .await
        .unwrap();

    let query = Query::full_text("database").with_filter(Criterion::content_type("article"));
    let result = engine.find_content(&query, &main_languages(), true).await.unwrap();

    assert_eq!(result.total_count, Some(1));
    assert_eq!(result.hits[0].value.id(), 1);
    assert_eq!(result.hits[0].matched_translation, "eng-GB");

    let not_articles = Query::new(Criterion::not(Criterion::content_type("article")));
    let result = engine
        .find_content(&not_articles, &main_languages(), true)
        .await
        .unwrap();
    assert_eq!(ids(&result, |c| c.id()), vec![2]);
}

#[tokio::test]
async fn test_language_priority_and_fallback() {
    let (engine, _dir) = create_test_engine().await;

    let bilingual = Content::new(ContentInfo::new(1, "bilingual", "article", "eng-GB"))
        .with_translation(Translation::new("eng-GB", "Ownership in Rust"))
        .with_translation(Translation::new("ger-DE", "Eigentum in Rust"));

    let german = Content::new(ContentInfo::new(2, "german", "article", "ger-DE"))
        .with_translation(Translation::new("ger-DE", "Nur auf Deutsch"));

    let mut french_info = ContentInfo::new(3, "french", "article", "fre-FR");
    french_info.always_available = false;
    let french =
        Content::new(french_info).with_translation(Translation::new("fre-FR", "Seulement en français"));

    engine.index_contents(&[bilingual, german, french]).await.unwrap();

    // Highest-priority available translation wins, one hit per item
    let filter = LanguageFilter::for_languages(["eng-GB", "ger-DE"]);
    let query = Query::default().with_sort(SortClause::asc(SortField::ContentId));
    let result = engine.find_content(&query, &filter, true).await.unwrap();
    assert_eq!(result.total_count, Some(2));
    assert_eq!(result.hits[0].matched_translation, "eng-GB");
    assert_eq!(result.hits[1].matched_translation, "ger-DE");

    // The German translation of item 1 is shadowed by its English one
    let result = engine
        .find_content(&Query::full_text("eigentum"), &filter, true)
        .await
        .unwrap();
    assert_eq!(result.total_count, Some(0));

    // Always-available items fall back to their main translation
    let polish = LanguageFilter::for_languages(["pol-PL"]);
    let result = engine.find_content(&query, &polish, true).await.unwrap();
    assert_eq!(ids(&result, |c| c.id()), vec![1, 2]);

    let strict = LanguageFilter::for_languages(["pol-PL"]).with_always_available(false);
    let result = engine.find_content(&query, &strict, true).await.unwrap();
    assert_eq!(result.total_count, Some(0));

    // Duplicate languages are rejected
    let duplicated = LanguageFilter::for_languages(["eng-GB", "eng-GB"]);
    assert!(matches!(
        engine.find_content(&query, &duplicated, true).await,
        Err(SearchError::InvalidQuery(_))
    ));
}

#[tokio::test]
async fn test_find_single() {
    let (engine, _dir) = create_test_engine().await;
    engine
        .index_contents(&[
            create_test_content(1, "article", "eng-GB", "First"),
            create_test_content(2, "article", "eng-GB", "Second"),
            create_test_content(3, "folder", "eng-GB", "Folder"),
        ])
        .await
        .unwrap();

    let found = engine
        .find_single(&Criterion::RemoteId(vec!["remote-2".into()]), &main_languages(), true)
        .await
        .unwrap();
    assert_eq!(found.id(), 2);

    assert!(matches!(
        engine
            .find_single(&Criterion::RemoteId(vec!["missing".into()]), &main_languages(), true)
            .await,
        Err(SearchError::NotFound(_))
    ));

    assert!(matches!(
        engine
            .find_single(&Criterion::content_type("article"), &main_languages(), true)
            .await,
        Err(SearchError::AmbiguousResult { count: 2 })
    ));
}

#[tokio::test]
async fn test_find_content_info() {
    let (engine, _dir) = create_test_engine().await;
    engine
        .index_content(&create_test_content(7, "article", "eng-GB", "Metadata only"))
        .await
        .unwrap();

    let result = engine
        .find_content_info(&Query::default(), &main_languages(), true)
        .await
        .unwrap();
    assert_eq!(result.hits[0].value.remote_id, "remote-7");
    assert_eq!(result.hits[0].value.main_location_id, Some(1007));
}

#[tokio::test]
async fn test_custom_field_criteria_and_aggregations() {
    let (engine, _dir) = create_test_engine().await;

    let rated = |id: u64, rating: i64, section_id: u64| {
        let mut info = ContentInfo::new(id, format!("remote-{}", id), "review", "eng-GB");
        info.section_id = section_id;
        Content::new(info).with_translation(
            Translation::new("eng-GB", format!("Review {}", id))
                .with_field("rating", rating)
                .with_field("tags", vec!["rust".to_string(), "search".to_string()]),
        )
    };

    engine
        .index_contents(&[
            rated(1, 5, 1),
            rated(2, 5, 1),
            rated(3, 3, 2),
            create_test_content(4, "article", "eng-GB", "Unrated"),
        ])
        .await
        .unwrap();

    // "5" and 5 select the same items
    let by_text = Query::new(Criterion::field_eq("rating", "5"));
    let by_number = Query::new(Criterion::field_eq("rating", 5i64));
    let text_result = engine.find_content(&by_text, &main_languages(), true).await.unwrap();
    let number_result = engine.find_content(&by_number, &main_languages(), true).await.unwrap();
    assert_eq!(text_result.total_count, Some(2));
    assert_eq!(number_result.total_count, Some(2));

    let query = Query::default()
        .with_aggregation(TermAggregation::new("types", AggregationField::ContentType))
        .with_aggregation(TermAggregation::new("ratings", AggregationField::Field("rating".into())))
        .with_aggregation(TermAggregation::new("sections", AggregationField::Section).with_limit(1));
    let result = engine.find_content(&query, &main_languages(), true).await.unwrap();

    let types = result.aggregations.get("types").unwrap();
    assert_eq!(types.count(), 2);
    assert_eq!(types.entries()[0].key, AggregationKey::from("review"));
    assert_eq!(types.entry("review").unwrap().count, 3);
    assert_eq!(types.entry("article").unwrap().count, 1);

    let ratings = result.aggregations.get("ratings").unwrap();
    assert_eq!(ratings.entry(5).unwrap().count, 2);
    assert_eq!(ratings.entry("5").unwrap().count, 2);
    assert_eq!(ratings.entry(5.0).unwrap().count, 2);
    assert!(ratings.has_entry(3));
    assert!(!ratings.has_entry(4));

    // Section 1 holds items 1, 2 and 4
    let sections = result.aggregations.get("sections").unwrap();
    assert_eq!(sections.count(), 1);
    assert_eq!(sections.entry(1u64).unwrap().count, 3);
    assert!(sections.has_entry("1"));

    // Iteration yields buckets in engine order and restarts
    let first: Vec<_> = ratings.iter().map(|(key, count)| (key.to_string(), count)).collect();
    let second: Vec<_> = ratings.iter().map(|(key, count)| (key.to_string(), count)).collect();
    assert_eq!(first, second);
    assert_eq!(first[0], ("5".to_string(), 2));
}

#[tokio::test]
async fn test_aggregation_min_count() {
    let (engine, _dir) = create_test_engine().await;
    engine
        .index_contents(&[
            create_test_content(1, "article", "eng-GB", "One"),
            create_test_content(2, "article", "eng-GB", "Two"),
            create_test_content(3, "folder", "eng-GB", "Three"),
        ])
        .await
        .unwrap();

    let query = Query::default().with_aggregation(
        TermAggregation::new("types", AggregationField::ContentType).with_min_count(2),
    );
    let result = engine.find_content(&query, &main_languages(), true).await.unwrap();
    let types = result.aggregations.get("types").unwrap();
    assert_eq!(types.count(), 1);
    assert!(types.has_entry("article"));
    assert!(!types.has_entry("folder"));
}

#[tokio::test]
async fn test_permission_filtering() {
    let (engine, _dir) = create_test_engine().await;
    let engine = engine.with_permissions(Arc::new(SectionPermissions::new([1])));

    let mut private = create_test_content(2, "article", "eng-GB", "Private roadmap");
    private.info.section_id = 3;
    engine
        .index_contents(&[
            create_test_content(1, "article", "eng-GB", "Public roadmap"),
            private,
        ])
        .await
        .unwrap();

    let query = Query::full_text("roadmap");
    let filtered = engine.find_content(&query, &main_languages(), true).await.unwrap();
    assert_eq!(ids(&filtered, |c| c.id()), vec![1]);

    let unfiltered = engine.find_content(&query, &main_languages(), false).await.unwrap();
    assert_eq!(unfiltered.total_count, Some(2));

    let locations = engine
        .find_locations(&LocationQuery::new(Criterion::MatchAll), &main_languages(), true)
        .await
        .unwrap();
    assert_eq!(ids(&locations, |l| l.content_id), vec![1]);
}

#[tokio::test]
async fn test_location_queries() {
    let (engine, _dir) = create_test_engine().await;

    let root = Location::root(2, 1);
    let folder = Location::child_of(&root, 10, 10);
    let first = Location::child_of(&folder, 11, 11).with_priority(5);
    let second = Location::child_of(&folder, 12, 12).with_priority(9);
    let hidden = Location::child_of(&folder, 13, 13).hidden(true);

    let item = |id: u64, name: &str, location: &Location| {
        Content::new(ContentInfo::new(id, format!("remote-{}", id), "article", "eng-GB"))
            .with_translation(Translation::new("eng-GB", name))
            .with_location(location.clone())
    };

    engine
        .index_contents(&[
            item(1, "Home", &root),
            item(10, "Folder", &folder),
            item(11, "First", &first),
            item(12, "Second", &second),
            item(13, "Hidden", &hidden),
        ])
        .await
        .unwrap();

    // Subtree includes the folder itself
    let subtree = LocationQuery::new(Criterion::Subtree(vec![10]));
    let result = engine
        .find_locations(&subtree, &main_languages(), true)
        .await
        .unwrap();
    assert_eq!(result.total_count, Some(4));

    let children = LocationQuery::from(
        Query::new(Criterion::and(vec![
            Criterion::ParentLocationId(vec![10]),
            Criterion::Visibility(true),
        ]))
        .with_sort(SortClause::desc(SortField::LocationPriority)),
    );
    let result = engine
        .find_locations(&children, &main_languages(), true)
        .await
        .unwrap();
    assert_eq!(ids(&result, |l| l.id), vec![12, 11]);
    assert_eq!(result.hits[0].value.path, vec![2, 10, 12]);

    let by_depth = LocationQuery::from(
        Query::default()
            .with_sort(SortClause::asc(SortField::LocationDepth))
            .with_sort(SortClause::asc(SortField::LocationPath))
            .with_limit(2),
    );
    let result = engine
        .find_locations(&by_depth, &main_languages(), true)
        .await
        .unwrap();
    assert_eq!(ids(&result, |l| l.id), vec![2, 10]);

    // Location sorts are rejected for content queries
    let query = Query::default().with_sort(SortClause::asc(SortField::LocationPriority));
    assert!(matches!(
        engine.find_content(&query, &main_languages(), true).await,
        Err(SearchError::InvalidQuery(_))
    ));
}

#[tokio::test]
async fn test_date_range_and_sorting() {
    let (engine, _dir) = create_test_engine().await;

    let dated = |id: u64, year: i32| {
        let mut content = create_test_content(id, "article", "eng-GB", &format!("Report {}", year));
        content.info.published = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap();
        content
    };
    engine
        .index_contents(&[dated(1, 2019), dated(2, 2021), dated(3, 2023)])
        .await
        .unwrap();

    let since_2020 = Criterion::DatePublished(DateRange::after(
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
    ));
    let query = Query::new(since_2020).with_sort(SortClause::desc(SortField::DatePublished));
    let result = engine.find_content(&query, &main_languages(), true).await.unwrap();
    assert_eq!(ids(&result, |c| c.id()), vec![3, 2]);
}

#[tokio::test]
async fn test_pagination() {
    let (engine, _dir) = create_test_engine().await;
    let contents: Vec<Content> = (1..=12)
        .map(|id| create_test_content(id, "article", "eng-GB", &format!("Entry {}", id)))
        .collect();
    engine.index_contents(&contents).await.unwrap();

    let page = Query::default()
        .with_sort(SortClause::asc(SortField::ContentId))
        .with_offset(10)
        .with_limit(5);
    let result = engine.find_content(&page, &main_languages(), true).await.unwrap();
    assert_eq!(result.total_count, Some(12));
    assert_eq!(ids(&result, |c| c.id()), vec![11, 12]);

    let uncounted = Query::default().with_count(false).with_limit(3);
    let result = engine
        .find_content(&uncounted, &main_languages(), true)
        .await
        .unwrap();
    assert_eq!(result.total_count, None);
    assert_eq!(result.len(), 3);
}

#[tokio::test]
async fn test_invalid_queries_are_rejected() {
    let (engine, _dir) = create_test_engine().await;

    let empty_and = Query::new(Criterion::and(vec![]));
    assert!(matches!(
        engine.find_content(&empty_and, &main_languages(), true).await,
        Err(SearchError::InvalidQuery(_))
    ));

    let bad_field = Query::new(Criterion::field_eq("Not A Field", "x"));
    assert!(matches!(
        engine.find_content(&bad_field, &main_languages(), true).await,
        Err(SearchError::InvalidQuery(_))
    ));
}

#[tokio::test]
async fn test_suggestions() {
    let (engine, _dir) = create_test_engine().await;
    engine
        .index_contents(&[
            Content::new(ContentInfo::new(1, "r1", "article", "eng-GB")).with_translation(
                Translation::new("eng-GB", "Search engines").with_field("body", "Searching indexes"),
            ),
            create_test_content(2, "article", "eng-GB", "Search relevance"),
            create_test_content(3, "article", "eng-GB", "Seasonal offers"),
        ])
        .await
        .unwrap();

    let suggestions = engine.suggest("sea", &[], 10, None).await.unwrap();
    assert_eq!(suggestions[0].text, "search");
    assert_eq!(suggestions[0].count, 2);
    let texts: Vec<&str> = suggestions.iter().map(|s| s.text.as_str()).collect();
    assert!(texts.contains(&"searching"));
    assert!(texts.contains(&"seasonal"));

    // Restricted to names only
    let names_only = engine
        .suggest("sea", &[NAME_FIELD_PATH.to_string()], 10, None)
        .await
        .unwrap();
    assert!(names_only.iter().all(|s| s.text != "searching"));

    // Multi-word prefixes complete the last word
    let phrase = engine.suggest("search rel", &[], 10, None).await.unwrap();
    assert_eq!(phrase.len(), 1);
    assert_eq!(phrase[0].text, "search relevance");

    let filtered = engine
        .suggest("sea", &[], 10, Some(&Criterion::ContentId(vec![3])))
        .await
        .unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].text, "seasonal");

    assert!(matches!(
        engine.suggest("sea", &["Bad Path".to_string()], 10, None).await,
        Err(SearchError::InvalidQuery(_))
    ));
}

#[tokio::test]
async fn test_capabilities_follow_configuration() {
    let (engine, _dir) = create_test_engine().await;
    assert!(engine.supports(Capabilities::SCORING));
    assert!(engine.supports(Capabilities::AGGREGATIONS | Capabilities::FACETS));
    assert!(!engine.supports(Capabilities::HIGHLIGHT));
    assert!(!engine.supports(Capabilities::SPELLCHECK));

    let lean = TantivySearchEngine::new(
        SearchConfigBuilder::new()
            .in_memory()
            .enable_suggestions(false)
            .enable_facets(false)
            .build(),
    )
    .await
    .unwrap();
    assert!(!lean.supports(Capabilities::SUGGEST));
    assert!(!lean.supports(Capabilities::FACETS));
    assert!(lean.supports(Capabilities::CUSTOM_FIELDS));

    lean.index_content(&create_test_content(1, "article", "eng-GB", "Suggestions off"))
        .await
        .unwrap();
    assert!(lean.suggest("sugg", &[], 5, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_and_rebuild() {
    let (engine, _dir) = create_test_engine().await;
    engine
        .index_contents(&[
            create_test_content(1, "article", "eng-GB", "Keep"),
            create_test_content(2, "article", "eng-GB", "Remove"),
        ])
        .await
        .unwrap();

    engine.delete_content(2).await.unwrap();
    let stats = engine.get_stats().await.unwrap();
    assert_eq!(stats.content_items, 1);

    engine
        .rebuild_index(&[create_test_content(5, "article", "eng-GB", "Fresh")])
        .await
        .unwrap();
    let result = engine
        .find_content(&Query::default(), &main_languages(), true)
        .await
        .unwrap();
    assert_eq!(ids(&result, |c| c.id()), vec![5]);
}
