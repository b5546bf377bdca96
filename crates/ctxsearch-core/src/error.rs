use thiserror::Error;

/// Failure inside an embedding model.
#[derive(Debug, Clone, Error)]
pub enum EmbeddingError {
    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    #[error("Tokenization failed: {0}")]
    Tokenization(String),

    #[error("Inference failed: {0}")]
    Inference(String),
}

/// The single error type returned by every public engine operation.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Store unavailable: {0}")]
    Connectivity(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
