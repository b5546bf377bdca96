use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;

use ctxsearch_core::traits::Embedder;
use ctxsearch_core::EmbeddingError;

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_on_device;

/// Sentence embedder over an XLM-RoBERTa backbone (BGE-M3 and friends),
/// masked mean pooling + L2 normalization.
pub struct XlmRobertaEmbedder {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    model_id: String,
    dim: usize,
    max_len: usize,
}

impl XlmRobertaEmbedder {
    pub fn load(model_id: &str, model_dir: &Path, max_len: usize) -> Result<Self, EmbeddingError> {
        let load_err = |what: &str, e: &dyn std::fmt::Display| {
            EmbeddingError::ModelLoad(format!("{what} ({}): {e}", model_dir.display()))
        };
        let device = select_device();
        tracing::info!(model_id, dir = %model_dir.display(), "loading embedding model");

        let tokenizer = Tokenizer::from_file(model_dir.join("tokenizer.json"))
            .map_err(|e| load_err("tokenizer.json", &e))?;

        let raw_config = std::fs::read_to_string(model_dir.join("config.json"))
            .map_err(|e| load_err("config.json", &e))?;
        let config: XLMRobertaConfig =
            serde_json::from_str(&raw_config).map_err(|e| load_err("config.json", &e))?;
        let dim = serde_json::from_str::<serde_json::Value>(&raw_config)
            .ok()
            .and_then(|v| v.get("hidden_size").and_then(serde_json::Value::as_u64))
            .ok_or_else(|| load_err("config.json", &"missing hidden_size"))? as usize;

        let vb = load_weights(model_dir, &device).map_err(|e| load_err("weights", &e))?;
        let model = XLMRobertaModel::new(&config, vb).map_err(|e| load_err("model", &e))?;
        tracing::info!(model_id, dim, "embedding model loaded");

        Ok(Self { model, tokenizer, device, model_id: model_id.to_string(), dim, max_len })
    }

    fn forward(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let infer = |e: candle_core::Error| EmbeddingError::Inference(e.to_string());
        let (input_ids, attention_mask) =
            tokenize_on_device(&self.tokenizer, text, self.max_len, &self.device)?;
        let token_type_ids = Tensor::zeros((1, self.max_len), DType::U32, &self.device).map_err(infer)?;
        let hidden = self
            .model
            .forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)
            .map_err(infer)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask).map_err(infer)?;
        pooled
            .to_device(&Device::Cpu)
            .and_then(|t| t.squeeze(0))
            .and_then(|t| t.to_vec1::<f32>())
            .map_err(infer)
    }
}

impl Embedder for XlmRobertaEmbedder {
    fn model_id(&self) -> &str { &self.model_id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let start = Instant::now();
        let v = self.forward(text)?;
        if v.len() != self.dim {
            return Err(EmbeddingError::Inference(format!(
                "model produced {} values, expected {}",
                v.len(),
                self.dim
            )));
        }
        let elapsed = start.elapsed();
        if elapsed.as_millis() > 100 {
            tracing::warn!(?elapsed, chars = text.len(), "slow embedding");
        }
        Ok(v)
    }
}

/// Prefer `model.safetensors`; fall back to a pickled `pytorch_model.bin`.
fn load_weights(model_dir: &Path, device: &Device) -> candle_core::Result<VarBuilder<'static>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        // SAFETY: the weights file is not modified while mapped.
        return unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], DType::F32, device) };
    }
    let weights = candle_core::pickle::read_all(model_dir.join("pytorch_model.bin"))?;
    let weights_map: std::collections::HashMap<String, Tensor> = weights.into_iter().collect();
    Ok(VarBuilder::from_tensors(weights_map, DType::F32, device))
}

/// Locate the model directory: explicit setting, then `APP_MODEL_DIR`,
/// `MODEL_DIR`, then `./models/<last segment of model_id>`.
pub fn resolve_model_dir(configured: Option<&str>, model_id: &str) -> Result<PathBuf, EmbeddingError> {
    let candidates = configured
        .map(PathBuf::from)
        .into_iter()
        .chain(std::env::var("APP_MODEL_DIR").ok().map(PathBuf::from))
        .chain(std::env::var("MODEL_DIR").ok().map(PathBuf::from))
        .chain(model_id.rsplit('/').next().map(|name| Path::new("models").join(name.to_lowercase())));
    let mut checked = Vec::new();
    for p in candidates {
        if p.exists() {
            tracing::debug!(dir = %p.display(), "using model dir");
            return Ok(p);
        }
        checked.push(p.display().to_string());
    }
    Err(EmbeddingError::ModelLoad(format!(
        "could not locate model directory for {model_id}; checked {}",
        checked.join(", ")
    )))
}
