//! ctxsearch-engine
//!
//! The application context. A `SearchEngine` is built once per process from
//! settings and an embedder, and exposes index lifecycle, indexing,
//! retrieval and statistics as async operations returning
//! `ctxsearch_core::Result`.

pub mod context;
pub mod fusion;
pub mod indexer;
pub mod manifest;
pub mod retrieval;
pub mod stats;
pub mod validate;

pub use context::SearchEngine;
pub use manifest::IndexManifest;
