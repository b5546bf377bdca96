//! Document writes and id lookups.

use std::collections::HashMap;

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};

use ctxsearch_core::types::{BulkFailure, BulkReport, Document, NewDocument, StoredDocument};
use ctxsearch_core::{EmbeddingError, Error, Result};

use crate::context::{store_error, OpenIndex, SearchEngine};
use crate::validate;

impl SearchEngine {
    /// Validate, embed title and content, and attach defaults.
    fn build_document(&self, doc: NewDocument) -> Result<Document> {
        let doc = validate::document(doc)?;
        let embed = |text: &str| {
            self.embedder.embed(text).map_err(|e| {
                tracing::error!(id = %doc.id, error = %e, "embedding failed");
                Error::from(e)
            })
        };
        let title_vector = embed(&doc.title)?;
        let content_vector = embed(&doc.content)?;
        let dim = self.embedder.dim();
        for (field, v) in [("title", &title_vector), ("content", &content_vector)] {
            if v.len() != dim {
                return Err(Error::DimensionMismatch { expected: dim, actual: v.len() });
            }
            // no direction, so cosine distance to it is undefined
            if !self.settings.embedding.zero_vector_fallback && v.iter().all(|x| *x == 0.0) {
                tracing::error!(id = %doc.id, field, "embedded to a zero vector");
                return Err(Error::Embedding(EmbeddingError::Inference(format!(
                    "{field} of document '{}' embedded to a zero vector",
                    doc.id
                ))));
            }
        }
        Ok(Document::assemble(doc, title_vector, content_vector, Utc::now()))
    }

    async fn write(&self, idx: &OpenIndex, docs: &[Document]) -> Result<()> {
        idx.vectors
            .upsert(docs)
            .await
            .map_err(|e| store_error("upsert vectors", Error::Query, e))?;
        idx.text.upsert(docs).map_err(|e| store_error("upsert text", Error::Query, e))
    }

    /// Embed and upsert one document. An existing document with the same id
    /// is replaced.
    pub async fn index_document(&self, doc: NewDocument) -> Result<()> {
        let idx = self.current().await?;
        let doc = self.build_document(doc)?;
        self.write(&idx, std::slice::from_ref(&doc)).await?;
        tracing::info!(id = %doc.id, "indexed document");
        Ok(())
    }

    /// Embed every document and write the valid ones in one batch.
    ///
    /// Documents that fail validation or embedding are reported in
    /// `BulkReport::failed` and skipped. When an id appears more than once,
    /// the last occurrence is written. A failure of the batch write itself is
    /// returned as an error.
    pub async fn bulk_index_documents(&self, docs: Vec<NewDocument>) -> Result<BulkReport> {
        let idx = self.current().await?;
        let mut report = BulkReport::default();
        if docs.is_empty() {
            return Ok(report);
        }

        let pb = ProgressBar::new(docs.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} docs ({percent}%) {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }

        let mut batch: Vec<Document> = Vec::with_capacity(docs.len());
        let mut position: HashMap<String, usize> = HashMap::new();
        for doc in docs {
            let id = doc.id.clone();
            pb.set_message(id.clone());
            match self.build_document(doc) {
                Ok(d) => match position.get(&d.id) {
                    Some(&i) => batch[i] = d,
                    None => {
                        position.insert(d.id.clone(), batch.len());
                        batch.push(d);
                    }
                },
                Err(e) => report.failed.push(BulkFailure { id, reason: e.to_string() }),
            }
            pb.inc(1);
        }

        if !batch.is_empty() {
            self.write(&idx, &batch).await?;
        }
        pb.finish_and_clear();
        report.indexed = batch.into_iter().map(|d| d.id).collect();
        tracing::info!(indexed = report.indexed.len(), failed = report.failed.len(), "bulk indexed documents");

        match idx.vectors.maybe_build_ann(self.settings.index.ann_min_rows).await {
            Ok(true) => tracing::info!("ANN index built"),
            Ok(false) => {}
            Err(e) => tracing::warn!(error = %format!("{e:#}"), "ANN index build failed, searches stay exact"),
        }
        Ok(report)
    }

    /// Stored fields of one document, or `NotFound`.
    pub async fn get_document(&self, id: &str) -> Result<StoredDocument> {
        let idx = self.current().await?;
        idx.text
            .get(id)
            .map_err(|e| store_error("get document", Error::Query, e))?
            .ok_or_else(|| Error::NotFound(format!("document '{id}'")))
    }

    /// Remove a document from both stores, or `NotFound`.
    pub async fn delete_document(&self, id: &str) -> Result<()> {
        let idx = self.current().await?;
        let existed = idx.text.delete(id).map_err(|e| store_error("delete text", Error::Query, e))?;
        idx.vectors
            .delete(id)
            .await
            .map_err(|e| store_error("delete vectors", Error::Query, e))?;
        if !existed {
            return Err(Error::NotFound(format!("document '{id}'")));
        }
        tracing::info!(id, "deleted document");
        Ok(())
    }
}
