use crate::models::Location;
use crate::search::AggregationKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

/// Lightweight content metadata, returned by `find_content_info`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ContentInfo {
    /// Repository-wide content id
    pub id: u64,

    /// Stable external identifier
    #[validate(length(min = 1, max = 255))]
    pub remote_id: String,

    /// Content type identifier (e.g. `article`)
    #[validate(length(min = 1, max = 100))]
    pub content_type: String,

    pub section_id: u64,

    pub owner_id: u64,

    /// Language of the main translation
    #[validate(length(min = 1, max = 20))]
    pub main_language_code: String,

    /// Whether the main translation is shown when no requested language exists
    #[serde(default = "default_always_available")]
    pub always_available: bool,

    pub published: DateTime<Utc>,

    pub modified: DateTime<Utc>,

    pub main_location_id: Option<u64>,
}

fn default_always_available() -> bool {
    true
}

impl ContentInfo {
    pub fn new(
        id: u64,
        remote_id: impl Into<String>,
        content_type: impl Into<String>,
        main_language_code: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            remote_id: remote_id.into(),
            content_type: content_type.into(),
            section_id: 1,
            owner_id: 14,
            main_language_code: main_language_code.into(),
            always_available: true,
            published: now,
            modified: now,
            main_location_id: None,
        }
    }
}

/// Value of a content field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Keywords(Vec<String>),
}

impl FieldValue {
    /// Normalized exact-match terms for this value
    ///
    /// Text is trimmed and lowercased; numbers use the canonical form shared
    /// with aggregation keys, so `"5"` and `5` produce the same term.
    pub fn terms(&self) -> Vec<String> {
        match self {
            FieldValue::Bool(value) => vec![AggregationKey::Bool(*value).canonical()],
            FieldValue::Integer(value) => vec![value.to_string()],
            FieldValue::Float(value) => vec![AggregationKey::Float(*value).canonical()],
            FieldValue::Text(value) => vec![normalize_term(value)],
            FieldValue::Keywords(values) => values.iter().map(|v| normalize_term(v)).collect(),
        }
    }

    /// Raw values as they should appear in aggregation buckets
    pub fn facet_values(&self) -> Vec<String> {
        match self {
            FieldValue::Bool(value) => vec![value.to_string()],
            FieldValue::Integer(value) => vec![value.to_string()],
            FieldValue::Float(value) => vec![value.to_string()],
            FieldValue::Text(value) => vec![value.trim().to_string()],
            FieldValue::Keywords(values) => values.iter().map(|v| v.trim().to_string()).collect(),
        }
    }

    /// Text fed into the full-text index, if any
    pub fn full_text(&self) -> Option<String> {
        match self {
            FieldValue::Text(value) => Some(value.clone()),
            FieldValue::Keywords(values) => Some(values.join(" ")),
            _ => None,
        }
    }
}

fn normalize_term(value: &str) -> String {
    let trimmed = value.trim();
    AggregationKey::Str(trimmed.to_string())
        .canonical()
        .to_lowercase()
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(values: Vec<String>) -> Self {
        FieldValue::Keywords(values)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

/// A named field of one translation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub identifier: String,
    pub value: FieldValue,
}

impl Field {
    pub fn new(identifier: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            identifier: identifier.into(),
            value: value.into(),
        }
    }
}

/// One language version of a content item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Translation {
    #[validate(length(min = 1, max = 20))]
    pub language_code: String,

    #[validate(length(min = 1, max = 255))]
    pub name: String,

    #[serde(default)]
    pub fields: Vec<Field>,
}

impl Translation {
    pub fn new(language_code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            language_code: language_code.into(),
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, identifier: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.push(Field::new(identifier, value));
        self
    }

    pub fn field(&self, identifier: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|field| field.identifier == identifier)
            .map(|field| &field.value)
    }
}

/// A fully loaded content item with all translations and placements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Content {
    #[validate(nested)]
    pub info: ContentInfo,

    #[validate(length(min = 1))]
    pub translations: Vec<Translation>,

    #[serde(default)]
    pub locations: Vec<Location>,
}

impl Content {
    pub fn new(info: ContentInfo) -> Self {
        Self {
            info,
            translations: Vec::new(),
            locations: Vec::new(),
        }
    }

    pub fn with_translation(mut self, translation: Translation) -> Self {
        self.translations.push(translation);
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        if self.info.main_location_id.is_none() {
            self.info.main_location_id = Some(location.id);
        }
        self.locations.push(location);
        self
    }

    pub fn id(&self) -> u64 {
        self.info.id
    }

    pub fn translation(&self, language_code: &str) -> Option<&Translation> {
        self.translations
            .iter()
            .find(|translation| translation.language_code == language_code)
    }

    pub fn main_translation(&self) -> Option<&Translation> {
        self.translation(&self.info.main_language_code)
    }

    pub fn language_codes(&self) -> Vec<&str> {
        self.translations
            .iter()
            .map(|translation| translation.language_code.as_str())
            .collect()
    }

    /// Field-level validation plus repository invariants
    pub fn check(&self) -> Result<(), ValidationErrors> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };

        for translation in &self.translations {
            if let Err(translation_errors) = translation.validate() {
                for (field, _) in translation_errors.field_errors() {
                    let mut error = ValidationError::new("invalid_translation");
                    error.add_param("field".into(), &field.to_string());
                    error.add_param("language".into(), &translation.language_code);
                    errors.add("translations", error);
                }
            }
        }

        if self.main_translation().is_none() {
            let mut error = ValidationError::new("main_translation_missing");
            error.add_param("language".into(), &self.info.main_language_code);
            errors.add("translations", error);
        }

        if self.locations.iter().any(|location| location.content_id != self.info.id) {
            errors.add("locations", ValidationError::new("foreign_location"));
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
