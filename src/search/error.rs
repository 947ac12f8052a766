//! Error types for search operations

use crate::error::AppError;

/// Result type for search operations
pub type Result<T> = std::result::Result<T, SearchError>;

/// Errors that can occur during search operations
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Query or filter is structurally invalid; raised before the engine is called
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A single-item lookup matched nothing
    #[error("Not found: {0}")]
    NotFound(String),

    /// A single-item lookup matched more than one item
    #[error("Ambiguous result: filter matched {count} items, expected exactly one")]
    AmbiguousResult { count: u64 },

    /// Index initialization failed
    #[error("Index initialization failed: {0}")]
    IndexInitFailed(String),

    /// Document indexing failed
    #[error("Document indexing failed: {0}")]
    IndexingFailed(String),

    /// Search execution failed
    #[error("Search execution failed: {0}")]
    SearchFailed(String),

    /// Stored payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Tantivy error
    #[error("Tantivy error: {0}")]
    TantivyError(String),
}

impl From<tantivy::TantivyError> for SearchError {
    fn from(err: tantivy::TantivyError) -> Self {
        SearchError::TantivyError(err.to_string())
    }
}

impl From<tantivy::query::QueryParserError> for SearchError {
    fn from(err: tantivy::query::QueryParserError) -> Self {
        SearchError::InvalidQuery(err.to_string())
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::Serialization(err.to_string())
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::InvalidQuery(msg) => AppError::Validation(msg),
            SearchError::NotFound(msg) => AppError::NotFound(msg),
            SearchError::AmbiguousResult { .. } => AppError::Validation(err.to_string()),
            SearchError::InvalidConfiguration(msg) => AppError::Configuration(msg),
            SearchError::IoError(err) => AppError::Io(err),
            SearchError::Serialization(msg) => AppError::Serialization(msg),
            _ => AppError::Internal(err.to_string()),
        }
    }
}
