use std::sync::Arc;

use ctxsearch_core::config::{EmbeddingBackend, EmbeddingSettings};
use ctxsearch_core::traits::Embedder;
use ctxsearch_core::EmbeddingError;
use ctxsearch_embed::{load_embedder, ZeroVectorFallback};

fn hash_settings(dim: usize) -> EmbeddingSettings {
    EmbeddingSettings { backend: EmbeddingBackend::Hash, hash_dim: dim, ..Default::default() }
}

#[test]
fn hash_embedder_shapes_and_determinism() {
    let embedder = load_embedder(&hash_settings(1024)).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), 1024);
    assert_eq!(embedder.dim(), 1024);

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn missing_model_dir_is_a_load_error() {
    let settings = EmbeddingSettings {
        backend: EmbeddingBackend::XlmRoberta,
        model_id: "nobody/no-such-model-anywhere".to_string(),
        model_dir: Some("/definitely/not/here".to_string()),
        ..Default::default()
    };
    std::env::remove_var("APP_MODEL_DIR");
    std::env::remove_var("MODEL_DIR");
    match load_embedder(&settings) {
        Err(EmbeddingError::ModelLoad(msg)) => assert!(msg.contains("no-such-model-anywhere")),
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("model should not load"),
    }
}

struct Broken;

impl Embedder for Broken {
    fn model_id(&self) -> &str { "broken" }
    fn dim(&self) -> usize { 3 }
    fn max_len(&self) -> usize { 8 }
    fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::Inference("boom".to_string()))
    }
}

#[test]
fn failures_surface_unless_fallback_is_requested() {
    assert!(Broken.embed("x").is_err());

    let degraded = ZeroVectorFallback::new(Arc::new(Broken));
    assert_eq!(degraded.embed("x").expect("fallback"), vec![0.0, 0.0, 0.0]);
    assert_eq!(degraded.model_id(), "broken");
}
