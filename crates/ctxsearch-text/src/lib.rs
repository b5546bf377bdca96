//! ctxsearch-text
//!
//! Tantivy side of a search index: stored document fields, fuzzy keyword
//! retrieval over `title`/`content`, exact tag retrieval and excerpt
//! highlighting. Vectors live in `ctxsearch-vector`.

pub mod highlight;
pub mod index;
pub mod query;
pub mod schema;

pub use highlight::{HighlightOptions, CONTENT_HIGHLIGHT, TITLE_HIGHLIGHT};
pub use index::TextIndex;
pub use query::{KeywordFilter, TextHit};
