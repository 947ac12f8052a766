//! Index document structures and schema

use crate::models::{Content, ContentInfo, Location, Translation};
use crate::search::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use tantivy::schema::*;
use tantivy::TantivyDocument;

/// Record type stored for content documents
pub const CONTENT_RECORD: &str = "content";

/// Record type stored for location documents
pub const LOCATION_RECORD: &str = "location";

/// Facet roots used by term aggregations
pub const CONTENT_TYPE_FACET: &str = "content_type";
pub const SECTION_FACET: &str = "section";
pub const LANGUAGE_FACET: &str = "language";
pub const FIELD_FACET: &str = "field";

/// Trait for records that can be indexed
pub trait SearchDocument {
    /// Convert to Tantivy document
    fn to_tantivy_doc(&self, fields: &IndexFields) -> Result<TantivyDocument>;

    /// Get document ID
    fn document_id(&self) -> String;
}

/// Field handles of the content schema
#[derive(Debug, Clone, Copy)]
pub struct IndexFields {
    pub doc_id: Field,
    pub record_type: Field,
    pub content_id: Field,
    pub remote_id: Field,
    pub content_type: Field,
    pub section_id: Field,
    pub language_code: Field,
    pub available_languages: Field,
    pub is_main_translation: Field,
    pub always_available: Field,
    pub location_id: Field,
    pub parent_location_id: Field,
    pub path_ids: Field,
    pub visible: Field,
    pub published: Field,
    pub modified: Field,
    pub name: Field,
    pub full_text: Field,
    pub field_terms: Field,
    pub facets: Field,
    pub payload: Field,
}

impl IndexFields {
    /// Resolve every field of `schema`, failing on a schema built for another layout
    pub fn from_schema(schema: &Schema) -> Result<Self> {
        let field = |name: &str| {
            schema
                .get_field(name)
                .map_err(|_| SearchError::IndexInitFailed(format!("Schema lacks field '{}'", name)))
        };

        Ok(Self {
            doc_id: field("doc_id")?,
            record_type: field("record_type")?,
            content_id: field("content_id")?,
            remote_id: field("remote_id")?,
            content_type: field("content_type")?,
            section_id: field("section_id")?,
            language_code: field("language_code")?,
            available_languages: field("available_languages")?,
            is_main_translation: field("is_main_translation")?,
            always_available: field("always_available")?,
            location_id: field("location_id")?,
            parent_location_id: field("parent_location_id")?,
            path_ids: field("path_ids")?,
            visible: field("visible")?,
            published: field("published")?,
            modified: field("modified")?,
            name: field("name")?,
            full_text: field("full_text")?,
            field_terms: field("field_terms")?,
            facets: field("facets")?,
            payload: field("payload")?,
        })
    }
}

/// Build the search schema for content and locations
pub fn build_content_schema() -> Schema {
    let mut schema_builder = Schema::builder();

    // Unique per record and translation
    schema_builder.add_text_field("doc_id", STRING | STORED);

    // "content" or "location"
    schema_builder.add_text_field("record_type", STRING | STORED);

    schema_builder.add_u64_field("content_id", INDEXED | STORED | FAST);
    schema_builder.add_text_field("remote_id", STRING);
    schema_builder.add_text_field("content_type", STRING | STORED);
    schema_builder.add_u64_field("section_id", INDEXED | FAST);

    // Translation this document represents, and every translation of the item
    schema_builder.add_text_field("language_code", STRING | STORED);
    schema_builder.add_text_field("available_languages", STRING);
    schema_builder.add_bool_field("is_main_translation", INDEXED);
    schema_builder.add_bool_field("always_available", INDEXED);

    // Multi-valued on content documents, single-valued on location documents
    schema_builder.add_u64_field("location_id", INDEXED | STORED);
    schema_builder.add_u64_field("parent_location_id", INDEXED);
    schema_builder.add_u64_field("path_ids", INDEXED);
    schema_builder.add_bool_field("visible", INDEXED);

    schema_builder.add_date_field("published", INDEXED | STORED | FAST);
    schema_builder.add_date_field("modified", INDEXED | STORED | FAST);

    // Translation name, full-text indexed and stored for sorting
    schema_builder.add_text_field("name", TEXT | STORED);

    // Name plus every textual field value
    schema_builder.add_text_field("full_text", TEXT);

    // Exact-match terms, "identifier:normalized value"
    schema_builder.add_text_field("field_terms", STRING);

    // Aggregation buckets: /content_type/x, /section/n, /language/x, /field/id/value
    schema_builder.add_facet_field("facets", FacetOptions::default());

    // Serialized record returned in hits
    schema_builder.add_text_field("payload", STORED);

    schema_builder.build()
}

/// Payload stored with location documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationRecord {
    pub location: Location,
    pub content_info: ContentInfo,
}

/// Kind of record an index document stands for
#[derive(Debug, Clone)]
pub enum RecordKind {
    Content,
    Location(Location),
}

/// One index document: a record in one of its translations
#[derive(Debug, Clone)]
pub struct ContentDocument<'a> {
    pub content: &'a Content,
    pub translation: &'a Translation,
    pub kind: RecordKind,
}

impl<'a> ContentDocument<'a> {
    /// Every document for `content`: one per translation, plus one per
    /// translation for each of its locations
    pub fn all_for(content: &'a Content) -> Vec<ContentDocument<'a>> {
        let mut documents = Vec::new();
        for translation in &content.translations {
            documents.push(ContentDocument {
                content,
                translation,
                kind: RecordKind::Content,
            });
            for location in &content.locations {
                documents.push(ContentDocument {
                    content,
                    translation,
                    kind: RecordKind::Location(location.clone()),
                });
            }
        }
        documents
    }

    fn record_type(&self) -> &'static str {
        match self.kind {
            RecordKind::Content => CONTENT_RECORD,
            RecordKind::Location(_) => LOCATION_RECORD,
        }
    }

    fn locations(&self) -> Vec<&Location> {
        match self.kind {
            RecordKind::Content => self.content.locations.iter().collect(),
            RecordKind::Location(ref location) => vec![location],
        }
    }

    fn payload(&self) -> Result<String> {
        let json = match self.kind {
            RecordKind::Content => serde_json::to_string(self.content)?,
            RecordKind::Location(ref location) => serde_json::to_string(&LocationRecord {
                location: location.clone(),
                content_info: self.content.info.clone(),
            })?,
        };
        Ok(json)
    }
}

impl SearchDocument for ContentDocument<'_> {
    fn to_tantivy_doc(&self, fields: &IndexFields) -> Result<TantivyDocument> {
        let info = &self.content.info;
        let mut doc = TantivyDocument::new();

        doc.add_text(fields.doc_id, self.document_id());
        doc.add_text(fields.record_type, self.record_type());
        doc.add_u64(fields.content_id, info.id);
        doc.add_text(fields.remote_id, &info.remote_id);
        doc.add_text(fields.content_type, &info.content_type);
        doc.add_u64(fields.section_id, info.section_id);

        // Language
        doc.add_text(fields.language_code, &self.translation.language_code);
        for language in self.content.language_codes() {
            doc.add_text(fields.available_languages, language);
        }
        doc.add_bool(
            fields.is_main_translation,
            self.translation.language_code == info.main_language_code,
        );
        doc.add_bool(fields.always_available, info.always_available);

        // Placement
        for location in self.locations() {
            doc.add_u64(fields.location_id, location.id);
            if let Some(parent_id) = location.parent_id {
                doc.add_u64(fields.parent_location_id, parent_id);
            }
            for id in &location.path {
                doc.add_u64(fields.path_ids, *id);
            }
            doc.add_bool(fields.visible, !location.hidden);
        }

        doc.add_date(fields.published, tantivy::DateTime::from_timestamp_secs(info.published.timestamp()));
        doc.add_date(fields.modified, tantivy::DateTime::from_timestamp_secs(info.modified.timestamp()));

        // Text
        doc.add_text(fields.name, &self.translation.name);
        doc.add_text(fields.full_text, &self.translation.name);
        for field in &self.translation.fields {
            if let Some(text) = field.value.full_text() {
                doc.add_text(fields.full_text, text);
            }
            for term in field.value.terms() {
                doc.add_text(fields.field_terms, format!("{}:{}", field.identifier, term));
            }
        }

        // Aggregation facets
        doc.add_facet(fields.facets, Facet::from_path([CONTENT_TYPE_FACET, info.content_type.as_str()]));
        doc.add_facet(fields.facets, Facet::from_path([SECTION_FACET.to_string(), info.section_id.to_string()]));
        doc.add_facet(
            fields.facets,
            Facet::from_path([LANGUAGE_FACET, self.translation.language_code.as_str()]),
        );
        for field in &self.translation.fields {
            for value in field.value.facet_values() {
                if !value.is_empty() {
                    doc.add_facet(
                        fields.facets,
                        Facet::from_path([FIELD_FACET, field.identifier.as_str(), value.as_str()]),
                    );
                }
            }
        }

        doc.add_text(fields.payload, self.payload()?);

        Ok(doc)
    }

    fn document_id(&self) -> String {
        match self.kind {
            RecordKind::Content => format!("c:{}:{}", self.content.info.id, self.translation.language_code),
            RecordKind::Location(ref location) => {
                format!("l:{}:{}", location.id, self.translation.language_code)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article() -> Content {
        let root = Location::root(2, 1);
        Content::new(ContentInfo::new(57, "remote-57", "article", "eng-GB"))
            .with_translation(
                Translation::new("eng-GB", "Rust ownership")
                    .with_field("body", "Borrowing rules")
                    .with_field("rating", 5i64),
            )
            .with_translation(Translation::new("ger-DE", "Rust Eigentum"))
            .with_location(Location::child_of(&root, 42, 57))
    }

    #[test]
    fn test_schema_building() {
        let schema = build_content_schema();
        assert!(IndexFields::from_schema(&schema).is_ok());
        assert!(schema.get_field("payload").is_ok());
    }

    #[test]
    fn test_documents_per_translation_and_location() {
        let content = article();
        let documents = ContentDocument::all_for(&content);
        assert_eq!(documents.len(), 4);

        let ids: Vec<String> = documents.iter().map(|d| d.document_id()).collect();
        assert!(ids.contains(&"c:57:eng-GB".to_string()));
        assert!(ids.contains(&"l:42:ger-DE".to_string()));
    }

    #[test]
    fn test_tantivy_doc_carries_payload() {
        let schema = build_content_schema();
        let fields = IndexFields::from_schema(&schema).unwrap();
        let content = article();
        let document = &ContentDocument::all_for(&content)[0];

        let doc = document.to_tantivy_doc(&fields).unwrap();
        let payload = doc
            .get_first(fields.payload)
            .and_then(|v| v.as_str())
            .unwrap()
            .to_string();
        let decoded: Content = serde_json::from_str(&payload).unwrap();
        assert_eq!(decoded, content);
        assert_eq!(doc.get_all(fields.path_ids).count(), 2);
    }
}
