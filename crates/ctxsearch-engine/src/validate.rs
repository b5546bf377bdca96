//! Request limits checked before anything reaches a store.

use ctxsearch_core::config::SearchSettings;
use ctxsearch_core::types::{FusionWeights, NewDocument};
use ctxsearch_core::{Error, Result};

pub const MAX_QUERY_CHARS: usize = 500;
pub const MAX_ID_CHARS: usize = 100;
pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_CONTENT_CHARS: usize = 10_000;
pub const MAX_CATEGORY_CHARS: usize = 50;

fn invalid(msg: String) -> Error {
    tracing::warn!(%msg, "rejected request");
    Error::InvalidRequest(msg)
}

fn check_len(field: &str, value: &str, min: usize, max: usize) -> Result<()> {
    let n = value.chars().count();
    if n < min || n > max {
        return Err(invalid(format!("{field} must be {min}..={max} characters, got {n}")));
    }
    Ok(())
}

pub fn query_text(text: &str) -> Result<()> {
    check_len("query", text, 1, MAX_QUERY_CHARS)?;
    if text.trim().is_empty() {
        return Err(invalid("query must not be blank".to_string()));
    }
    Ok(())
}

/// Requested result count, capped at `search.max_size`.
pub fn size(requested: usize, search: &SearchSettings) -> Result<usize> {
    if requested == 0 {
        return Err(invalid("size must be at least 1".to_string()));
    }
    if requested > search.max_size {
        tracing::debug!(requested, max = search.max_size, "clamping result size");
    }
    Ok(requested.min(search.max_size))
}

/// An empty category means "no filter".
pub fn category(category: Option<&str>) -> Result<Option<&str>> {
    match category {
        None | Some("") => Ok(None),
        Some(c) => {
            check_len("category", c, 1, MAX_CATEGORY_CHARS)?;
            Ok(Some(c))
        }
    }
}

pub fn weights(w: FusionWeights) -> Result<FusionWeights> {
    for (name, v) in [("semantic_weight", w.semantic), ("keyword_weight", w.keyword)] {
        if !(0.0..=1.0).contains(&v) {
            return Err(invalid(format!("{name} must be in [0, 1], got {v}")));
        }
    }
    Ok(w)
}

pub fn tags(tags: &[String]) -> Result<()> {
    if tags.is_empty() {
        return Err(invalid("at least one tag is required".to_string()));
    }
    if tags.iter().any(|t| t.is_empty()) {
        return Err(invalid("tags must not be empty strings".to_string()));
    }
    Ok(())
}

/// Check field limits; an empty category is dropped.
pub fn document(mut doc: NewDocument) -> Result<NewDocument> {
    check_len("id", &doc.id, 1, MAX_ID_CHARS)?;
    check_len("title", &doc.title, 1, MAX_TITLE_CHARS)?;
    check_len("content", &doc.content, 1, MAX_CONTENT_CHARS)?;
    doc.category = category(doc.category.as_deref())?.map(str::to_string);
    Ok(doc)
}
