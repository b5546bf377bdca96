//! Domain types shared by the text, vector and engine crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type DocumentId = String;

/// Field name -> highlighted excerpts, matches wrapped in `<em>..</em>`.
pub type Highlights = BTreeMap<String, Vec<String>>;

/// A document as submitted by a caller. Vectors are always derived by the
/// engine and never accepted from outside.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewDocument {
    pub id: DocumentId,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewDocument {
    pub fn new(id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            category: None,
            tags: Vec::new(),
            created_at: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// The persisted record.
///
/// - `category` is the empty string when the caller gave none
/// - `tags` is deduplicated, first occurrence wins
/// - both vectors have exactly the dimension of the embedder that built them
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    pub content: String,
    pub title_vector: Vec<f32>,
    pub content_vector: Vec<f32>,
    pub category: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Apply defaults to a submitted document and attach its vectors.
    pub fn assemble(
        doc: NewDocument,
        title_vector: Vec<f32>,
        content_vector: Vec<f32>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut tags: Vec<String> = Vec::with_capacity(doc.tags.len());
        for tag in doc.tags {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        Self {
            id: doc.id,
            title: doc.title,
            content: doc.content,
            title_vector,
            content_vector,
            category: doc.category.unwrap_or_default(),
            tags,
            created_at: doc.created_at.unwrap_or(now),
        }
    }
}

/// Everything stored for a document except its vectors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredDocument {
    pub id: DocumentId,
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Per-signal multipliers for hybrid search.
///
/// The fused score of a document is
/// `semantic * knn_score + keyword * lexical_score`, where a signal that did
/// not match contributes zero. The two inputs live on unrelated scales and
/// are not normalized, so the weights are a ranking knob rather than a
/// probability split. They do not need to sum to one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FusionWeights {
    pub semantic: f32,
    pub keyword: f32,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self { semantic: 0.7, keyword: 0.3 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SemanticQuery {
    pub text: String,
    pub size: usize,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HybridQuery {
    pub text: String,
    pub size: usize,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub weights: FusionWeights,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TagQuery {
    pub tags: Vec<String>,
    pub size: usize,
}

/// One ranked hit. `score` is on the scale of the mode that produced it;
/// higher is always better.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub id: DocumentId,
    pub score: f32,
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub highlights: Highlights,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Statistics {
    pub document_count: u64,
    pub index_size_bytes: u64,
    pub index_name: String,
    pub embedding_model_id: String,
    pub vector_dimension: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BulkFailure {
    pub id: DocumentId,
    pub reason: String,
}

/// Outcome of a bulk upsert, item by item.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BulkReport {
    pub indexed: Vec<DocumentId>,
    pub failed: Vec<BulkFailure>,
}

impl BulkReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Health {
    pub index_name: String,
    pub index_open: bool,
    pub document_count: Option<u64>,
}
