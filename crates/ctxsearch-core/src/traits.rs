use crate::error::EmbeddingError;

/// A loaded text-embedding model.
///
/// Implementations are read-only after construction and are shared across
/// concurrent index and query calls.
pub trait Embedder: Send + Sync {
    /// Identifier of the loaded model (e.g. `BAAI/bge-m3`).
    fn model_id(&self) -> &str;
    /// Output dimension D. Fixed for the lifetime of the instance.
    fn dim(&self) -> usize;
    /// Maximum token length fed to the model.
    fn max_len(&self) -> usize;
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}
