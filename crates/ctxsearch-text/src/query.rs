//! Keyword and tag queries over the text index.
//!
//! The keyword query approximates a `best_fields` multi-match with automatic
//! fuzziness: every query token becomes "exact term OR fuzzy term" per field,
//! the title clause is boosted 2x, and the best field wins per document.

use std::collections::HashSet;

use tantivy::collector::TopDocs;
use tantivy::query::{
    BooleanQuery, BoostQuery, ConstScoreQuery, DisjunctionMaxQuery, FuzzyTermQuery, Occur, Query,
    TermQuery, TermSetQuery,
};
use tantivy::schema::{Field, IndexRecordOption, Value};
use tantivy::{TantivyDocument, Term};

use crate::index::TextIndex;

pub const TITLE_BOOST: f32 = 2.0;

/// One ranked hit from the text side.
#[derive(Debug, Clone, PartialEq)]
pub struct TextHit {
    pub id: String,
    pub score: f32,
}

/// Restrictions applied to a keyword query without affecting its score.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordFilter<'a> {
    pub category: Option<&'a str>,
    /// Only these ids are eligible.
    pub ids: Option<&'a [String]>,
}

/// Edit distance allowed for a term, the way `fuzziness: AUTO` picks it.
pub fn auto_fuzziness(term: &str) -> u8 {
    match term.chars().count() {
        0..=2 => 0,
        3..=5 => 1,
        _ => 2,
    }
}

fn term_query(field: Field, token: &str) -> Box<dyn Query> {
    let term = Term::from_field_text(field, token);
    let exact = TermQuery::new(term.clone(), IndexRecordOption::WithFreqs);
    match auto_fuzziness(token) {
        0 => Box::new(exact),
        distance => Box::new(BooleanQuery::new(vec![
            (Occur::Should, Box::new(exact) as Box<dyn Query>),
            (Occur::Should, Box::new(FuzzyTermQuery::new(term, distance, true)) as Box<dyn Query>),
        ])),
    }
}

fn field_query(field: Field, tokens: &[String]) -> Box<dyn Query> {
    Box::new(BooleanQuery::new(
        tokens.iter().map(|t| (Occur::Should, term_query(field, t))).collect(),
    ))
}

fn filter_clause(q: Box<dyn Query>) -> (Occur, Box<dyn Query>) {
    (Occur::Must, Box::new(ConstScoreQuery::new(q, 0.0)))
}

impl TextIndex {
    /// Analyze `text` with the tokenizer of `field`; duplicates removed,
    /// first occurrence order kept.
    pub fn analyze(&self, field: Field, text: &str) -> anyhow::Result<Vec<String>> {
        let mut analyzer = self.index.tokenizer_for_field(field)?;
        let mut stream = analyzer.token_stream(text);
        let mut seen = HashSet::new();
        let mut tokens = Vec::new();
        while stream.advance() {
            let t = stream.token().text.clone();
            if seen.insert(t.clone()) {
                tokens.push(t);
            }
        }
        Ok(tokens)
    }

    /// Fuzzy multi-field keyword search over `title` (boosted) and `content`.
    pub fn keyword_search(
        &self,
        text: &str,
        filter: KeywordFilter<'_>,
        limit: usize,
    ) -> anyhow::Result<Vec<TextHit>> {
        let f = self.fields;
        let tokens = self.analyze(f.content, text)?;
        if tokens.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let title: Box<dyn Query> = Box::new(BoostQuery::new(field_query(f.title, &tokens), TITLE_BOOST));
        let content = field_query(f.content, &tokens);
        let best_field: Box<dyn Query> = Box::new(DisjunctionMaxQuery::new(vec![title, content]));

        let mut clauses = vec![(Occur::Must, best_field)];
        if let Some(category) = filter.category {
            let term = Term::from_field_text(f.category, category);
            clauses.push(filter_clause(Box::new(TermQuery::new(term, IndexRecordOption::Basic))));
        }
        if let Some(ids) = filter.ids {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            let terms = ids.iter().map(|id| Term::from_field_text(f.id, id));
            clauses.push(filter_clause(Box::new(TermSetQuery::new(terms))));
        }
        self.run(&BooleanQuery::new(clauses), limit)
    }

    /// Documents carrying at least one of `tags`, each with the same score.
    pub fn tag_search(&self, tags: &[String], limit: usize) -> anyhow::Result<Vec<TextHit>> {
        if tags.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let terms = tags.iter().map(|t| Term::from_field_text(self.fields.tags, t));
        let q = ConstScoreQuery::new(Box::new(TermSetQuery::new(terms)), 1.0);
        self.run(&q, limit)
    }

    fn run(&self, query: &dyn Query, limit: usize) -> anyhow::Result<Vec<TextHit>> {
        let searcher = self.reader.searcher();
        let top = searcher.search(query, &TopDocs::with_limit(limit))?;
        let mut hits = Vec::with_capacity(top.len());
        for (score, addr) in top {
            let doc: TantivyDocument = searcher.doc(addr)?;
            let id = doc.get_first(self.fields.id).and_then(|v| v.as_str()).unwrap_or("").to_string();
            hits.push(TextHit { id, score });
        }
        tracing::debug!(hits = hits.len(), "text query");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::auto_fuzziness;

    #[test]
    fn fuzziness_follows_term_length() {
        assert_eq!(auto_fuzziness("ab"), 0);
        assert_eq!(auto_fuzziness("cat"), 1);
        assert_eq!(auto_fuzziness("kitty"), 1);
        assert_eq!(auto_fuzziness("kitten"), 2);
    }
}
