//! Semantic, hybrid and tag retrieval, and shaping of hits into
//! `SearchResult`s.

use ctxsearch_core::types::{HybridQuery, SearchResult, SemanticQuery, TagQuery};
use ctxsearch_core::{Error, Result};
use ctxsearch_text::{KeywordFilter, TextHit};
use ctxsearch_vector::VectorHit;

use crate::context::{store_error, OpenIndex, SearchEngine};
use crate::fusion::fuse;
use crate::validate;

impl SearchEngine {
    fn embed_query(&self, text: &str) -> Result<Option<Vec<f32>>> {
        let v = self.embedder.embed(text).map_err(|e| {
            tracing::error!(error = %e, "query embedding failed");
            Error::from(e)
        })?;
        if v.len() != self.embedder.dim() {
            return Err(Error::DimensionMismatch { expected: self.embedder.dim(), actual: v.len() });
        }
        // a zero vector has no direction, so nothing is near it
        if v.iter().all(|x| *x == 0.0) {
            tracing::warn!("query embedded to a zero vector, skipping KNN");
            return Ok(None);
        }
        Ok(Some(v))
    }

    async fn knn(&self, idx: &OpenIndex, text: &str, k: usize, category: Option<&str>) -> Result<Vec<VectorHit>> {
        match self.embed_query(text)? {
            Some(v) => idx
                .vectors
                .knn(&v, k, category)
                .await
                .map_err(|e| store_error("knn search", Error::Query, e)),
            None => Ok(Vec::new()),
        }
    }

    /// Nearest neighbours of the query on `content_vector`, best first.
    pub async fn semantic_search(&self, query: SemanticQuery) -> Result<Vec<SearchResult>> {
        validate::query_text(&query.text)?;
        let size = validate::size(query.size, &self.settings.search)?;
        let category = validate::category(query.category.as_deref())?;
        let idx = self.current().await?;

        let hits = self.knn(&idx, &query.text, size, category).await?;
        let scored: Vec<(String, f32)> = hits.into_iter().map(|h| (h.id, h.score)).collect();
        let results = shape(&idx, scored, Some(&query.text))?;
        tracing::info!(results = results.len(), "semantic search");
        Ok(results)
    }

    /// KNN and fuzzy keyword match combined with OR semantics; see
    /// [`crate::fusion`] for the scoring.
    pub async fn hybrid_search(&self, query: HybridQuery) -> Result<Vec<SearchResult>> {
        validate::query_text(&query.text)?;
        let size = validate::size(query.size, &self.settings.search)?;
        let category = validate::category(query.category.as_deref())?;
        let weights = validate::weights(query.weights)?;
        let idx = self.current().await?;

        let knn = self.knn(&idx, &query.text, size, category).await?;
        let mut keyword = keyword_hits(&idx, &query.text, KeywordFilter { category, ids: None }, size)?;
        // lexical scores for KNN hits outside the keyword top-size
        let missing: Vec<String> = knn
            .iter()
            .filter(|h| !keyword.iter().any(|k| k.id == h.id))
            .map(|h| h.id.clone())
            .collect();
        if !missing.is_empty() {
            let filter = KeywordFilter { category, ids: Some(&missing) };
            keyword.extend(keyword_hits(&idx, &query.text, filter, missing.len())?);
        }

        let fused = fuse(&knn, &keyword, weights, size);
        let results = shape(&idx, fused, Some(&query.text))?;
        tracing::info!(
            results = results.len(),
            knn = knn.len(),
            keyword = keyword.len(),
            "hybrid search"
        );
        Ok(results)
    }

    /// Documents carrying any of the given tags. Every hit has the same score.
    pub async fn search_by_tags(&self, query: TagQuery) -> Result<Vec<SearchResult>> {
        validate::tags(&query.tags)?;
        let size = validate::size(query.size, &self.settings.search)?;
        let idx = self.current().await?;

        let hits = idx
            .text
            .tag_search(&query.tags, size)
            .map_err(|e| store_error("tag search", Error::Query, e))?;
        let results = shape(&idx, hits.into_iter().map(|h| (h.id, h.score)).collect(), None)?;
        tracing::info!(results = results.len(), "tag search");
        Ok(results)
    }
}

fn keyword_hits(idx: &OpenIndex, text: &str, filter: KeywordFilter<'_>, limit: usize) -> Result<Vec<TextHit>> {
    idx.text
        .keyword_search(text, filter, limit)
        .map_err(|e| store_error("keyword search", Error::Query, e))
}

/// Attach stored fields (and highlights, when there is query text) to
/// ranked ids. Order is kept.
fn shape(idx: &OpenIndex, ranked: Vec<(String, f32)>, highlight: Option<&str>) -> Result<Vec<SearchResult>> {
    let ids: Vec<String> = ranked.iter().map(|(id, _)| id.clone()).collect();
    let mut stored = idx.text.fetch(&ids).map_err(|e| store_error("fetch documents", Error::Query, e))?;
    let mut out = Vec::with_capacity(ranked.len());
    for (id, score) in ranked {
        let Some(doc) = stored.remove(&id) else {
            tracing::warn!(%id, "hit has no stored document, skipping");
            continue;
        };
        let highlights = match highlight {
            Some(q) => idx.text.highlight(&doc, q).map_err(|e| store_error("highlight", Error::Query, e))?,
            None => Default::default(),
        };
        out.push(SearchResult {
            id: doc.id,
            score,
            title: doc.title,
            content: doc.content,
            category: doc.category,
            tags: doc.tags,
            highlights,
        });
    }
    Ok(out)
}
