//! Seed documents loaded into a freshly reset index.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::NewDocument;

const SAMPLE_CORPUS: &str = include_str!("../data/sample_corpus.json");

/// The corpus bundled with the crate.
pub fn sample_corpus() -> Result<Vec<NewDocument>> {
    parse_corpus(SAMPLE_CORPUS, "bundled sample corpus")
}

/// Read a JSON array of documents from disk.
pub fn load_corpus(path: &Path) -> Result<Vec<NewDocument>> {
    let raw = fs::read_to_string(path)?;
    parse_corpus(&raw, &path.display().to_string())
}

fn parse_corpus(raw: &str, origin: &str) -> Result<Vec<NewDocument>> {
    let docs: Vec<NewDocument> = serde_json::from_str(raw)
        .map_err(|e| Error::InvalidConfig(format!("{origin} is not a valid document list: {e}")))?;
    tracing::debug!(count = docs.len(), origin, "loaded corpus");
    Ok(docs)
}
