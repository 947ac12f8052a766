//! Search configuration

use crate::search::capability::Capabilities;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Search engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Path to the search index directory; the index lives in memory when unset
    #[serde(default)]
    pub index_path: Option<PathBuf>,

    /// Index writer heap size in bytes (default: 50MB)
    #[serde(default = "default_writer_heap_size")]
    pub writer_heap_size: usize,

    /// Commit after every indexing call
    #[serde(default = "default_true")]
    pub realtime_indexing: bool,

    /// Upper bound for the page size of a single query
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Enable completion suggestions
    #[serde(default = "default_true")]
    pub enable_suggestions: bool,

    /// Enable facets and term aggregations
    #[serde(default = "default_true")]
    pub enable_facets: bool,

    /// Maximum number of matched items scanned when building suggestions
    #[serde(default = "default_suggestion_scan_limit")]
    pub suggestion_scan_limit: usize,
}

fn default_writer_heap_size() -> usize {
    50_000_000
}

fn default_true() -> bool {
    true
}

fn default_max_results() -> usize {
    1000
}

fn default_suggestion_scan_limit() -> usize {
    200
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            index_path: None,
            writer_heap_size: default_writer_heap_size(),
            realtime_indexing: true,
            max_results: default_max_results(),
            enable_suggestions: true,
            enable_facets: true,
            suggestion_scan_limit: default_suggestion_scan_limit(),
        }
    }
}

impl SearchConfig {
    /// Capabilities an engine running with this configuration offers
    pub fn capabilities(&self) -> Capabilities {
        let mut capabilities =
            Capabilities::SCORING | Capabilities::CUSTOM_FIELDS | Capabilities::ADVANCED_FULLTEXT;
        capabilities.set(Capabilities::FACETS | Capabilities::AGGREGATIONS, self.enable_facets);
        capabilities.set(Capabilities::SUGGEST, self.enable_suggestions);
        capabilities
    }

    pub fn validate(&self) -> Result<(), String> {
        // tantivy refuses writer budgets below 15MB
        if self.writer_heap_size < 15_000_000 {
            return Err(format!(
                "writer_heap_size must be at least 15000000 bytes, got {}",
                self.writer_heap_size
            ));
        }
        if self.max_results == 0 {
            return Err("max_results must be greater than zero".to_string());
        }
        if self.suggestion_scan_limit == 0 {
            return Err("suggestion_scan_limit must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Builder for SearchConfig
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SearchConfig::default(),
        }
    }

    pub fn index_path(mut self, path: PathBuf) -> Self {
        self.config.index_path = Some(path);
        self
    }

    pub fn in_memory(mut self) -> Self {
        self.config.index_path = None;
        self
    }

    pub fn writer_heap_size(mut self, size: usize) -> Self {
        self.config.writer_heap_size = size;
        self
    }

    pub fn realtime_indexing(mut self, enabled: bool) -> Self {
        self.config.realtime_indexing = enabled;
        self
    }

    pub fn max_results(mut self, max: usize) -> Self {
        self.config.max_results = max;
        self
    }

    pub fn enable_suggestions(mut self, enabled: bool) -> Self {
        self.config.enable_suggestions = enabled;
        self
    }

    pub fn enable_facets(mut self, enabled: bool) -> Self {
        self.config.enable_facets = enabled;
        self
    }

    pub fn suggestion_scan_limit(mut self, limit: usize) -> Self {
        self.config.suggestion_scan_limit = limit;
        self
    }

    pub fn build(self) -> SearchConfig {
        self.config
    }
}

impl Default for SearchConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
