//! Translation of criteria into Tantivy queries

use crate::search::criterion::{Criterion, DateRange};
use crate::search::document::{IndexFields, CONTENT_RECORD};
use crate::search::error::Result;
use crate::search::language::LanguageFilter;
use std::ops::Bound;
use tantivy::query::{
    AllQuery, BooleanQuery, ConstScoreQuery, EmptyQuery, Occur, Query, QueryParser, RegexQuery,
    TermQuery,
};
use tantivy::schema::{Field, IndexRecordOption};
use tantivy::{Index, Term};

/// Query builder for constructing Tantivy queries from criterion trees
pub struct QueryBuilder<'a> {
    index: &'a Index,
    fields: &'a IndexFields,
}

impl<'a> QueryBuilder<'a> {
    /// Create a new query builder
    pub fn new(index: &'a Index, fields: &'a IndexFields) -> Self {
        Self { index, fields }
    }

    /// Combine record type, language filter, filter criterion and scoring
    /// criterion into one query
    ///
    /// The filter does not contribute to scores; only `scoring` does.
    pub fn build(
        &self,
        record_type: &str,
        language_filter: &LanguageFilter,
        filter: &Criterion,
        scoring: Option<&Criterion>,
    ) -> Result<Box<dyn Query>> {
        let mut subqueries: Vec<(Occur, Box<dyn Query>)> = vec![
            (Occur::Must, self.text_term(self.fields.record_type, record_type)),
            (Occur::Must, self.language_filter(language_filter)),
        ];

        if *filter != Criterion::MatchAll {
            subqueries.push((
                Occur::Must,
                Box::new(ConstScoreQuery::new(self.translate(filter)?, 0.0)),
            ));
        }

        if let Some(scoring) = scoring {
            subqueries.push((Occur::Must, self.translate(scoring)?));
        }

        Ok(Box::new(BooleanQuery::new(subqueries)))
    }

    /// Content documents in any translation whose full text contains every
    /// leading word and a word starting with the last one
    pub fn suggestion(&self, words: &[String], filter: &Criterion) -> Result<Box<dyn Query>> {
        let Some((last, leading)) = words.split_last() else {
            return Ok(Box::new(EmptyQuery));
        };

        let mut subqueries: Vec<(Occur, Box<dyn Query>)> =
            vec![(Occur::Must, self.text_term(self.fields.record_type, CONTENT_RECORD))];
        for word in leading {
            subqueries.push((Occur::Must, self.text_term(self.fields.full_text, word)));
        }
        let pattern = format!("{}.*", regex::escape(last));
        subqueries.push((
            Occur::Must,
            Box::new(RegexQuery::from_pattern(&pattern, self.fields.full_text)?),
        ));

        if *filter != Criterion::MatchAll {
            subqueries.push((
                Occur::Must,
                Box::new(ConstScoreQuery::new(self.translate(filter)?, 0.0)),
            ));
        }

        Ok(Box::new(BooleanQuery::new(subqueries)))
    }

    /// Translate one criterion tree
    pub fn translate(&self, criterion: &Criterion) -> Result<Box<dyn Query>> {
        let query: Box<dyn Query> = match criterion {
            Criterion::MatchAll => Box::new(AllQuery),
            Criterion::MatchNone => Box::new(EmptyQuery),
            Criterion::ContentId(ids) => self.any_u64(self.fields.content_id, ids),
            Criterion::RemoteId(ids) => self.any_text(self.fields.remote_id, ids),
            Criterion::ContentTypeIdentifier(ids) => self.any_text(self.fields.content_type, ids),
            Criterion::SectionId(ids) => self.any_u64(self.fields.section_id, ids),
            Criterion::LanguageCode {
                codes,
                match_always_available,
            } => {
                let translated = self.any_text(self.fields.available_languages, codes);
                if *match_always_available {
                    Box::new(BooleanQuery::new(vec![
                        (Occur::Should, translated),
                        (Occur::Should, self.bool_term(self.fields.always_available, true)),
                    ]))
                } else {
                    translated
                }
            }
            Criterion::LocationId(ids) => self.any_u64(self.fields.location_id, ids),
            Criterion::ParentLocationId(ids) => self.any_u64(self.fields.parent_location_id, ids),
            Criterion::Subtree(ids) => self.any_u64(self.fields.path_ids, ids),
            Criterion::Visibility(visible) => self.bool_term(self.fields.visible, *visible),
            Criterion::DatePublished(range) => Self::date_range("published", range),
            Criterion::DateModified(range) => Self::date_range("modified", range),
            Criterion::Field {
                identifier, values, ..
            } => {
                let terms: Vec<String> = values
                    .iter()
                    .flat_map(|value| value.terms())
                    .map(|term| format!("{}:{}", identifier, term))
                    .collect();
                self.any_text(self.fields.field_terms, &terms)
            }
            Criterion::FullText(text) => {
                let mut parser =
                    QueryParser::for_index(self.index, vec![self.fields.name, self.fields.full_text]);
                parser.set_conjunction_by_default();
                parser.parse_query(text)?
            }
            Criterion::LogicalAnd(children) => {
                let subqueries = children
                    .iter()
                    .map(|child| -> Result<(Occur, Box<dyn Query>)> {
                        Ok((Occur::Must, self.translate(child)?))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Box::new(BooleanQuery::new(subqueries))
            }
            Criterion::LogicalOr(children) => {
                let subqueries = children
                    .iter()
                    .map(|child| -> Result<(Occur, Box<dyn Query>)> {
                        Ok((Occur::Should, self.translate(child)?))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Box::new(BooleanQuery::new(subqueries))
            }
            Criterion::LogicalNot(inner) => Box::new(BooleanQuery::new(vec![
                (Occur::Must, Box::new(AllQuery) as Box<dyn Query>),
                (Occur::MustNot, self.translate(inner)?),
            ])),
        };
        Ok(query)
    }

    /// Restrict documents to the translations a language filter selects
    ///
    /// For languages `[l0, l1, ..]` a document in `li` matches only when the
    /// item has no translation in `l0..li`, so each item matches once. The
    /// always-available fallback matches main translations of items lacking
    /// every requested language.
    pub fn language_filter(&self, filter: &LanguageFilter) -> Box<dyn Query> {
        if filter.languages.is_empty() {
            return self.bool_term(self.fields.is_main_translation, true);
        }

        let mut alternatives: Vec<(Occur, Box<dyn Query>)> = Vec::new();

        for (position, language) in filter.languages.iter().enumerate() {
            let mut clause: Vec<(Occur, Box<dyn Query>)> =
                vec![(Occur::Must, self.text_term(self.fields.language_code, language))];
            for preferred in &filter.languages[..position] {
                clause.push((
                    Occur::MustNot,
                    self.text_term(self.fields.available_languages, preferred),
                ));
            }
            alternatives.push((Occur::Should, Box::new(BooleanQuery::new(clause))));
        }

        if filter.use_always_available {
            let mut clause: Vec<(Occur, Box<dyn Query>)> = vec![
                (Occur::Must, self.bool_term(self.fields.always_available, true)),
                (Occur::Must, self.bool_term(self.fields.is_main_translation, true)),
            ];
            for language in &filter.languages {
                clause.push((
                    Occur::MustNot,
                    self.text_term(self.fields.available_languages, language),
                ));
            }
            alternatives.push((Occur::Should, Box::new(BooleanQuery::new(clause))));
        }

        Box::new(BooleanQuery::new(alternatives))
    }

    fn text_term(&self, field: Field, value: &str) -> Box<dyn Query> {
        Box::new(TermQuery::new(
            Term::from_field_text(field, value),
            IndexRecordOption::Basic,
        ))
    }

    fn bool_term(&self, field: Field, value: bool) -> Box<dyn Query> {
        Box::new(TermQuery::new(
            Term::from_field_bool(field, value),
            IndexRecordOption::Basic,
        ))
    }

    fn any_text(&self, field: Field, values: &[String]) -> Box<dyn Query> {
        self.any_of(values.iter().map(|value| self.text_term(field, value)).collect())
    }

    fn any_u64(&self, field: Field, values: &[u64]) -> Box<dyn Query> {
        self.any_of(
            values
                .iter()
                .map(|value| {
                    Box::new(TermQuery::new(
                        Term::from_field_u64(field, *value),
                        IndexRecordOption::Basic,
                    )) as Box<dyn Query>
                })
                .collect(),
        )
    }

    fn any_of(&self, mut queries: Vec<Box<dyn Query>>) -> Box<dyn Query> {
        match queries.len() {
            0 => Box::new(EmptyQuery),
            1 => queries.remove(0),
            _ => Box::new(BooleanQuery::new(
                queries.into_iter().map(|query| (Occur::Should, query)).collect(),
            )),
        }
    }

    fn date_range(field_name: &str, range: &DateRange) -> Box<dyn Query> {
        let bound = |value: Option<chrono::DateTime<chrono::Utc>>| match value {
            Some(value) => Bound::Included(tantivy::DateTime::from_timestamp_secs(value.timestamp())),
            None => Bound::Unbounded,
        };
        Box::new(tantivy::query::RangeQuery::new_date_bounds(
            field_name.to_string(),
            bound(range.from),
            bound(range.to),
        ))
    }
}
