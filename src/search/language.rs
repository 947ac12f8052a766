//! Language filter for multi-language content

use crate::search::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Selects which translations are eligible to match and be returned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageFilter {
    /// Language codes in priority order; empty means "main translation"
    #[serde(default)]
    pub languages: Vec<String>,

    /// Match items lacking every requested translation through their main
    /// translation, when they are flagged always-available
    #[serde(default = "default_use_always_available", rename = "useAlwaysAvailable", alias = "use_always_available")]
    pub use_always_available: bool,
}

fn default_use_always_available() -> bool {
    true
}

impl Default for LanguageFilter {
    fn default() -> Self {
        Self {
            languages: Vec::new(),
            use_always_available: true,
        }
    }
}

impl LanguageFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter for the given languages, highest priority first
    pub fn for_languages<I, S>(languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            languages: languages.into_iter().map(Into::into).collect(),
            use_always_available: true,
        }
    }

    pub fn with_always_available(mut self, enabled: bool) -> Self {
        self.use_always_available = enabled;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for language in &self.languages {
            if language.trim().is_empty() {
                return Err(SearchError::InvalidQuery(
                    "language filter contains an empty language code".to_string(),
                ));
            }
            if !seen.insert(language.as_str()) {
                return Err(SearchError::InvalidQuery(format!(
                    "language filter lists '{}' more than once",
                    language
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let filter = LanguageFilter::default();
        assert!(filter.use_always_available);
        assert!(filter.languages.is_empty());

        let parsed: LanguageFilter = serde_json::from_str(r#"{"languages":["eng-GB"]}"#).unwrap();
        assert!(parsed.use_always_available);
    }

    #[test]
    fn test_validation() {
        assert!(LanguageFilter::for_languages(["eng-GB", "eng-GB"]).validate().is_err());
        assert!(LanguageFilter::for_languages([" "]).validate().is_err());
        assert!(LanguageFilter::for_languages(["eng-GB"]).validate().is_ok());
    }
}
