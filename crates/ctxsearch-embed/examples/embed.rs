use ctxsearch_core::config::{EmbeddingBackend, EmbeddingSettings};
use ctxsearch_embed::load_embedder;

fn main() -> anyhow::Result<()> {
    let settings = EmbeddingSettings { backend: EmbeddingBackend::XlmRoberta, ..Default::default() };
    let embedder = load_embedder(&settings)?;
    let texts = vec!["hello world".to_string(), "rust embeddings".to_string()];
    let embs = embedder.embed_batch(&texts)?;
    println!("model={} B={} dim={}", embedder.model_id(), embs.len(), embedder.dim());
    Ok(())
}
