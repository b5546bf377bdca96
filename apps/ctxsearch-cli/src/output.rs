//! Terminal and JSON rendering of engine responses.

use serde::Serialize;

use ctxsearch_core::types::{SearchResult, Statistics};

/// Maximum characters of content shown per hit in human output.
const SNIPPET_MAX_LEN: usize = 160;

/// Results of one query plus how long it took.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub mode: &'static str,
    pub total: usize,
    pub query_time_ms: f64,
    pub results: Vec<SearchResult>,
}

impl SearchResponse {
    pub fn new(query: String, mode: &'static str, results: Vec<SearchResult>, elapsed: std::time::Duration) -> Self {
        Self { query, mode, total: results.len(), query_time_ms: elapsed.as_secs_f64() * 1000.0, results }
    }
}

pub fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

pub fn format_human(resp: &SearchResponse) -> String {
    let mut out = format!(
        "{} search for \"{}\": {} result(s) in {:.1} ms\n",
        resp.mode, resp.query, resp.total, resp.query_time_ms
    );
    for (rank, r) in resp.results.iter().enumerate() {
        out.push_str(&format!("\n{:>2}. [{}] {}  (score {:.4})\n", rank + 1, r.id, r.title, r.score));
        if let Some(category) = &r.category {
            out.push_str(&format!("    category: {category}\n"));
        }
        if !r.tags.is_empty() {
            out.push_str(&format!("    tags: {}\n", r.tags.join(", ")));
        }
        match r.highlights.get("content").and_then(|f| f.first()) {
            Some(fragment) => out.push_str(&format!("    ...{fragment}...\n")),
            None => out.push_str(&format!("    {}\n", truncate_text(&r.content, SNIPPET_MAX_LEN))),
        }
    }
    out
}

pub fn format_stats(s: &Statistics) -> String {
    format!(
        "index: {}\ndocuments: {}\nsize: {} bytes\nmodel: {}\ndimension: {}",
        s.index_name, s.document_count, s.index_size_bytes, s.embedding_model_id, s.vector_dimension
    )
}

fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}
