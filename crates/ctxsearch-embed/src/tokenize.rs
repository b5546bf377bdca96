use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

use ctxsearch_core::EmbeddingError;

/// `<pad>` in the XLM-RoBERTa vocabulary.
pub const PAD_TOKEN_ID: u32 = 1;

/// Encode `text`, truncate or pad to exactly `max_len` tokens, and return
/// `(input_ids, attention_mask)`, both shaped `[1, max_len]`.
pub fn tokenize_on_device(
    tokenizer: &Tokenizer,
    text: &str,
    max_len: usize,
    device: &Device,
) -> Result<(Tensor, Tensor), EmbeddingError> {
    let enc = tokenizer
        .encode(text, true)
        .map_err(|e| EmbeddingError::Tokenization(e.to_string()))?;
    let mut ids = enc.get_ids().to_vec();
    let mut mask = enc.get_attention_mask().to_vec();
    ids.truncate(max_len);
    mask.truncate(max_len);
    if ids.len() < max_len {
        let pad = max_len - ids.len();
        ids.extend(std::iter::repeat(PAD_TOKEN_ID).take(pad));
        mask.extend(std::iter::repeat(0).take(pad));
    }
    let to_tensor = |v: Vec<u32>| -> Result<Tensor, EmbeddingError> {
        Tensor::from_iter(v, device)
            .and_then(|t| t.reshape((1, max_len)))
            .map_err(|e| EmbeddingError::Tokenization(e.to_string()))
    };
    Ok((to_tensor(ids)?, to_tensor(mask)?))
}
