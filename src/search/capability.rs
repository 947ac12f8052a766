//! Optional search backend capabilities
//!
//! Bit values are part of the wire/config contract and must never change.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

bitflags! {
    /// A set of optional capabilities a search backend may implement
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Capabilities: u32 {
        /// Relevance scoring of hits
        const SCORING = 1;
        /// Facet counts on search results
        const FACETS = 2;
        /// Criteria targeting custom index fields
        const CUSTOM_FIELDS = 4;
        /// Spell checking of query text
        const SPELLCHECK = 8;
        /// Highlighting of matched terms
        const HIGHLIGHT = 16;
        /// Completion suggestions
        const SUGGEST = 32;
        /// Boolean/phrase syntax in full-text criteria
        const ADVANCED_FULLTEXT = 64;
        /// Term aggregations
        const AGGREGATIONS = 128;
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }
        let names: Vec<String> = self
            .iter_names()
            .map(|(name, _)| name.to_ascii_lowercase())
            .collect();
        write!(f, "{}", names.join("|"))
    }
}
