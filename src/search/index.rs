//! Search index management

use crate::models::Content;
use crate::search::config::SearchConfig;
use crate::search::document::{
    build_content_schema, ContentDocument, IndexFields, SearchDocument, CONTENT_RECORD,
};
use crate::search::error::{Result, SearchError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tantivy::collector::Count;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{IndexRecordOption, Schema};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tokio::sync::RwLock;

/// Index statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    /// Total number of index documents (records times translations)
    pub total_documents: u64,

    /// Number of distinct content items
    pub content_items: u64,

    /// Index size in bytes; zero for in-memory indexes
    pub index_size_bytes: u64,

    /// Number of segments
    pub num_segments: usize,

    /// Last commit timestamp
    pub last_commit: Option<DateTime<Utc>>,
}

/// Documents of one content item, ready for the writer
struct PreparedContent {
    content_id: u64,
    documents: Vec<TantivyDocument>,
}

/// Manages the Tantivy search index
pub struct IndexManager {
    /// The Tantivy index
    index: Index,

    /// The schema
    schema: Schema,

    /// Resolved field handles
    fields: IndexFields,

    /// Index writer (wrapped in RwLock for thread-safety)
    writer: Arc<RwLock<IndexWriter>>,

    /// Index reader, reloaded after every commit
    reader: IndexReader,

    /// Time of the last successful commit
    last_commit: RwLock<Option<DateTime<Utc>>>,

    /// Configuration
    config: SearchConfig,
}

impl IndexManager {
    /// Create a new IndexManager
    pub async fn new(config: SearchConfig) -> Result<Self> {
        config.validate().map_err(SearchError::InvalidConfiguration)?;

        let schema = build_content_schema();

        let index = match config.index_path {
            Some(ref path) => {
                std::fs::create_dir_all(path).map_err(|e| {
                    SearchError::IndexInitFailed(format!("Failed to create index directory: {}", e))
                })?;

                if Self::index_exists(path) {
                    tracing::info!(path = %path.display(), "Opening existing search index");
                    Index::open_in_dir(path).map_err(|e| {
                        SearchError::IndexInitFailed(format!("Failed to open existing index: {}", e))
                    })?
                } else {
                    tracing::info!(path = %path.display(), "Creating search index");
                    Index::create_in_dir(path, schema.clone()).map_err(|e| {
                        SearchError::IndexInitFailed(format!("Failed to create new index: {}", e))
                    })?
                }
            }
            None => {
                tracing::info!("Creating in-memory search index");
                Index::create_in_ram(schema.clone())
            }
        };

        // An index created by another layout is rejected here
        let schema = index.schema();
        let fields = IndexFields::from_schema(&schema)?;

        let writer = index
            .writer(config.writer_heap_size)
            .map_err(|e| SearchError::IndexInitFailed(format!("Failed to create writer: {}", e)))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| SearchError::IndexInitFailed(format!("Failed to create reader: {}", e)))?;

        Ok(Self {
            index,
            schema,
            fields,
            writer: Arc::new(RwLock::new(writer)),
            reader,
            last_commit: RwLock::new(None),
            config,
        })
    }

    /// Check if an index exists at the given path
    fn index_exists(path: &Path) -> bool {
        path.join("meta.json").exists()
    }

    /// Get the schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Get the index
    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Get the reader
    pub fn reader(&self) -> &IndexReader {
        &self.reader
    }

    /// Get the resolved field handles
    pub fn fields(&self) -> &IndexFields {
        &self.fields
    }

    fn content_term(&self, content_id: u64) -> Term {
        Term::from_field_u64(self.fields.content_id, content_id)
    }

    /// Validate `content` and convert it into its index documents
    fn prepare(&self, content: &Content) -> Result<PreparedContent> {
        content.check().map_err(|e| {
            SearchError::IndexingFailed(format!("Content {} is invalid: {}", content.id(), e))
        })?;

        let documents = ContentDocument::all_for(content)
            .iter()
            .map(|document| document.to_tantivy_doc(&self.fields))
            .collect::<Result<Vec<_>>>()?;

        Ok(PreparedContent {
            content_id: content.id(),
            documents,
        })
    }

    /// Queue prepared items, discarding every uncommitted change on failure
    fn apply(&self, writer: &mut IndexWriter, prepared: Vec<PreparedContent>) -> Result<usize> {
        let mut added = 0;
        for item in prepared {
            // Replace every document of this item
            writer.delete_term(self.content_term(item.content_id));
            for document in item.documents {
                if let Err(e) = writer.add_document(document) {
                    if let Err(rollback_error) = writer.rollback() {
                        tracing::error!(error = %rollback_error, "Failed to roll back index writer");
                    }
                    return Err(SearchError::IndexingFailed(format!(
                        "Failed to add documents of content {}: {}",
                        item.content_id, e
                    )));
                }
                added += 1;
            }
        }
        Ok(added)
    }

    /// Index a single content item with all its translations and locations
    pub async fn index_content(&self, content: &Content) -> Result<()> {
        let prepared = self.prepare(content)?;
        let mut writer = self.writer.write().await;
        let documents = self.apply(&mut writer, vec![prepared])?;
        tracing::debug!(content_id = content.id(), documents, "Indexed content");

        // Commit if real-time indexing is enabled
        if self.config.realtime_indexing {
            self.commit_locked(&mut writer).await?;
        }

        Ok(())
    }

    /// Index multiple content items and commit once
    ///
    /// The batch is all or nothing: one invalid item rejects it before any
    /// document reaches the writer.
    pub async fn index_contents(&self, contents: &[Content]) -> Result<usize> {
        let prepared = contents
            .iter()
            .map(|content| self.prepare(content))
            .collect::<Result<Vec<_>>>()?;
        let indexed = prepared.len();

        let mut writer = self.writer.write().await;
        self.apply(&mut writer, prepared)?;
        self.commit_locked(&mut writer).await?;
        tracing::info!(indexed, "Indexed content batch");

        Ok(indexed)
    }

    /// Delete a content item and all its location documents
    pub async fn delete_content(&self, content_id: u64) -> Result<()> {
        let mut writer = self.writer.write().await;
        writer.delete_term(self.content_term(content_id));

        if self.config.realtime_indexing {
            self.commit_locked(&mut writer).await?;
        }

        Ok(())
    }

    /// Delete multiple content items
    pub async fn delete_contents(&self, content_ids: &[u64]) -> Result<usize> {
        let mut writer = self.writer.write().await;

        for content_id in content_ids {
            writer.delete_term(self.content_term(*content_id));
        }

        self.commit_locked(&mut writer).await?;
        Ok(content_ids.len())
    }

    async fn commit_locked(&self, writer: &mut IndexWriter) -> Result<()> {
        writer
            .commit()
            .map_err(|e| SearchError::IndexingFailed(format!("Failed to commit: {}", e)))?;
        self.reader
            .reload()
            .map_err(|e| SearchError::IndexingFailed(format!("Failed to reload reader: {}", e)))?;
        *self.last_commit.write().await = Some(Utc::now());
        Ok(())
    }

    /// Commit pending changes
    pub async fn commit(&self) -> Result<()> {
        let mut writer = self.writer.write().await;
        self.commit_locked(&mut writer).await
    }

    /// Clear the entire index
    pub async fn clear_index(&self) -> Result<()> {
        let mut writer = self.writer.write().await;
        writer
            .delete_all_documents()
            .map_err(|e| SearchError::IndexingFailed(format!("Failed to clear index: {}", e)))?;
        self.commit_locked(&mut writer).await?;
        tracing::info!("Cleared search index");
        Ok(())
    }

    /// Get index statistics
    pub async fn get_stats(&self) -> Result<IndexStats> {
        let searcher = self.reader.searcher();

        let total_documents = searcher
            .search(&tantivy::query::AllQuery, &Count)
            .map_err(|e| SearchError::SearchFailed(format!("Failed to count documents: {}", e)))?
            as u64;

        // One main-translation content document exists per item
        let main_content_docs: Vec<(Occur, Box<dyn Query>)> = vec![
            (
                Occur::Must,
                Box::new(TermQuery::new(
                    Term::from_field_text(self.fields.record_type, CONTENT_RECORD),
                    IndexRecordOption::Basic,
                )),
            ),
            (
                Occur::Must,
                Box::new(TermQuery::new(
                    Term::from_field_bool(self.fields.is_main_translation, true),
                    IndexRecordOption::Basic,
                )),
            ),
        ];
        let content_items = searcher
            .search(&BooleanQuery::new(main_content_docs), &Count)
            .map_err(|e| SearchError::SearchFailed(format!("Failed to count content: {}", e)))?
            as u64;

        let num_segments = searcher.segment_readers().len();

        // Calculate approximate index size
        let index_size_bytes = self
            .config
            .index_path
            .as_ref()
            .and_then(|path| std::fs::read_dir(path).ok())
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter_map(|e| e.metadata().ok())
                    .map(|m| m.len())
                    .sum()
            })
            .unwrap_or(0);

        Ok(IndexStats {
            total_documents,
            content_items,
            index_size_bytes,
            num_segments,
            last_commit: *self.last_commit.read().await,
        })
    }

    /// Commit so the merge policy can merge segments
    pub async fn optimize(&self) -> Result<()> {
        // wait_merging_threads() consumes the writer, so it cannot be used behind the lock
        self.commit().await
    }
}
