//! ctxsearch-embed
//!
//! Text embedders behind the `ctxsearch_core::traits::Embedder` trait: a
//! candle XLM-RoBERTa sentence model and a deterministic hash embedder for
//! tests. `load_embedder` picks one from settings.

use std::sync::Arc;

use ctxsearch_core::config::{EmbeddingBackend, EmbeddingSettings};
use ctxsearch_core::traits::Embedder;
use ctxsearch_core::EmbeddingError;

pub mod device;
pub mod hash;
pub mod model;
pub mod pool;
pub mod tokenize;

pub use hash::HashEmbedder;
pub use model::{resolve_model_dir, XlmRobertaEmbedder};
pub use pool::masked_mean_l2;

/// Build the embedder described by `settings`. Loads weights for the model
/// backend; the returned instance is shared for the life of the process.
pub fn load_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>, EmbeddingError> {
    let inner: Arc<dyn Embedder> = match settings.backend {
        EmbeddingBackend::Hash => {
            tracing::info!(dim = settings.hash_dim, "using hash embedder");
            Arc::new(HashEmbedder::new(settings.hash_dim))
        }
        EmbeddingBackend::XlmRoberta => {
            let dir = resolve_model_dir(settings.model_dir.as_deref(), &settings.model_id)?;
            Arc::new(XlmRobertaEmbedder::load(&settings.model_id, &dir, settings.max_len)?)
        }
    };
    if settings.zero_vector_fallback {
        tracing::warn!("zero-vector fallback enabled: embedding failures will degrade ranking silently");
        return Ok(Arc::new(ZeroVectorFallback { inner }));
    }
    Ok(inner)
}

/// Replaces inference failures with a zero vector of the right length.
pub struct ZeroVectorFallback {
    inner: Arc<dyn Embedder>,
}

impl ZeroVectorFallback {
    pub fn new(inner: Arc<dyn Embedder>) -> Self { Self { inner } }
}

impl Embedder for ZeroVectorFallback {
    fn model_id(&self) -> &str { self.inner.model_id() }
    fn dim(&self) -> usize { self.inner.dim() }
    fn max_len(&self) -> usize { self.inner.max_len() }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        match self.inner.embed(text) {
            Ok(v) => Ok(v),
            Err(e) => {
                tracing::error!(error = %e, "embedding failed, substituting zero vector");
                Ok(vec![0.0; self.inner.dim()])
            }
        }
    }
}
