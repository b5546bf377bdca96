use std::path::Path;

use ctxsearch_core::types::{Health, Statistics};
use ctxsearch_core::Result;

use crate::context::SearchEngine;

/// Bytes of all files under `dir`.
fn dir_size(dir: &Path) -> u64 {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

impl SearchEngine {
    /// Document count, on-disk size and embedding configuration of the open
    /// index. Computed fresh on every call.
    pub async fn get_statistics(&self) -> Result<Statistics> {
        let idx = self.current().await?;
        let stats = Statistics {
            document_count: idx.text.num_docs(),
            index_size_bytes: dir_size(&idx.dir),
            index_name: idx.manifest.name.clone(),
            embedding_model_id: self.embedder.model_id().to_string(),
            vector_dimension: idx.manifest.dimension,
        };
        tracing::debug!(?stats, "statistics");
        Ok(stats)
    }

    pub async fn health(&self) -> Health {
        let open = self.index.read().await.clone();
        Health {
            index_name: self.index_name().to_string(),
            index_open: open.is_some(),
            document_count: open.map(|idx| idx.text.num_docs()),
        }
    }
}
