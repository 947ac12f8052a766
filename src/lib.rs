//! Content search: a search contract for multi-language content repositories
//! and a Tantivy backend implementing it

pub mod config;
pub mod error;
pub mod models;
pub mod search;

pub use error::{AppError, Result};
