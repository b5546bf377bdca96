//! ctxsearch-vector
//!
//! LanceDB side of a search index: one table per index with `title_vector`
//! and `content_vector`, id-keyed upsert, cosine KNN with an exact category
//! pre-filter, and an optional ANN index for large tables.
pub mod index_build;
pub mod schema;
pub mod store;

pub use store::{distance_score, VectorHit, VectorStore, EF_SEARCH};
