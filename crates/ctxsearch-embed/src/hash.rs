use std::hash::Hasher;

use twox_hash::XxHash64;

use ctxsearch_core::traits::Embedder;
use ctxsearch_core::EmbeddingError;

/// Deterministic bag-of-words embedder for tests and development.
///
/// Each lowercased alphanumeric token is hashed into one of `dim` buckets
/// with a hash-derived sign, and the result is L2-normalized. Texts that
/// share words get a positive cosine similarity; nothing else is semantic.
pub struct HashEmbedder {
    dim: usize,
    model_id: String,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim, model_id: format!("hash-bow-d{dim}") }
    }
}

pub(crate) fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

impl Embedder for HashEmbedder {
    fn model_id(&self) -> &str { &self.model_id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { usize::MAX }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut v = vec![0f32; self.dim];
        for token in tokens(text) {
            let mut hasher = XxHash64::with_seed(0);
            hasher.write(token.as_bytes());
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            let sign = if h >> 63 == 1 { -1.0 } else { 1.0 };
            v[idx] += sign;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v { *x /= norm; }
        }
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_strip_punctuation_and_case() {
        let t: Vec<String> = tokens("Cats are great pets. Dogs!").collect();
        assert_eq!(t, vec!["cats", "are", "great", "pets", "dogs"]);
    }

    #[test]
    fn shared_words_mean_positive_similarity() {
        let e = HashEmbedder::new(384);
        let a = e.embed("great pets").unwrap();
        let b = e.embed("pets are great").unwrap();
        let dot: f32 = a.iter().zip(&b).map(|(x, y)| x * y).sum();
        assert!(dot > 0.5, "dot={dot}");
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let e = HashEmbedder::new(8);
        assert!(e.embed("  ...  ").unwrap().iter().all(|x| *x == 0.0));
    }
}
