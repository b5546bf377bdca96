use std::path::Path;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use ctxsearch_core::config::{EmbeddingBackend, Settings};
use ctxsearch_core::corpus::sample_corpus;
use ctxsearch_core::types::{FusionWeights, HybridQuery, NewDocument, SearchResult, SemanticQuery, TagQuery};
use ctxsearch_core::Error;
use ctxsearch_engine::SearchEngine;

fn settings(dir: &Path) -> Settings {
    let mut s = Settings::default();
    s.index.data_dir = dir.to_string_lossy().into_owned();
    s.embedding.backend = EmbeddingBackend::Hash;
    s
}

async fn engine(dir: &Path) -> SearchEngine {
    SearchEngine::from_settings(settings(dir)).await.expect("engine")
}

async fn seeded(dir: &Path) -> SearchEngine {
    let e = engine(dir).await;
    e.create_index().await.expect("create");
    let report = e.bulk_index_documents(sample_corpus().expect("corpus")).await.expect("bulk");
    assert!(report.is_complete(), "{:?}", report.failed);
    e
}

fn ids(results: &[SearchResult]) -> Vec<&str> {
    results.iter().map(|r| r.id.as_str()).collect()
}

fn semantic(text: &str, size: usize) -> SemanticQuery {
    SemanticQuery { text: text.into(), size, category: None }
}

fn hybrid(text: &str, size: usize, weights: FusionWeights) -> HybridQuery {
    HybridQuery { text: text.into(), size, category: None, weights }
}

fn tags(ts: &[&str], size: usize) -> TagQuery {
    TagQuery { tags: ts.iter().map(|t| t.to_string()).collect(), size }
}

#[tokio::test(flavor = "multi_thread")]
async fn end_to_end_reference_queries() {
    let tmp = TempDir::new().unwrap();
    let e = seeded(tmp.path()).await;

    let results = e.semantic_search(semantic("feline pets", 5)).await.unwrap();
    let pos = |id: &str| ids(&results).iter().position(|r| *r == id);
    assert_eq!(pos("1"), Some(0), "{:?}", ids(&results));
    assert!(pos("2").map_or(true, |p| p > 0));
    assert!(results[0].highlights["content"][0].contains("<em>pets</em>"));

    let finance = e.search_by_tags(tags(&["finance"], 10)).await.unwrap();
    let mut got: Vec<&str> = ids(&finance);
    got.sort_unstable();
    assert_eq!(got, vec!["10", "2", "6"]);
    assert!(finance.windows(2).all(|w| w[0].score == w[1].score));
    assert!(finance.iter().all(|r| r.highlights.is_empty()));
}

#[tokio::test(flavor = "multi_thread")]
async fn create_index_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let e = engine(tmp.path()).await;
    e.create_index().await.unwrap();
    e.index_document(NewDocument::new("a", "Title", "Body text")).await.unwrap();
    e.create_index().await.unwrap();
    assert_eq!(e.get_statistics().await.unwrap().document_count, 1);

    // a second process sees the same index
    drop(e);
    let again = engine(tmp.path()).await;
    again.create_index().await.unwrap();
    assert_eq!(again.get_statistics().await.unwrap().document_count, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn documents_round_trip_by_id_and_upsert_replaces() {
    let tmp = TempDir::new().unwrap();
    let e = engine(tmp.path()).await;
    e.create_index().await.unwrap();
    let ts = Utc.with_ymd_and_hms(2023, 3, 4, 5, 6, 7).unwrap();
    let doc = NewDocument::new("42", "Kittens", "Small cats play a lot.")
        .with_category("pets")
        .with_tags(["animal", "kitten", "animal"])
        .with_created_at(ts);
    e.index_document(doc).await.unwrap();

    let got = e.get_document("42").await.unwrap();
    assert_eq!(got.title, "Kittens");
    assert_eq!(got.content, "Small cats play a lot.");
    assert_eq!(got.category.as_deref(), Some("pets"));
    assert_eq!(got.tags, vec!["animal".to_string(), "kitten".to_string()]);
    assert_eq!(got.created_at, ts);

    e.index_document(NewDocument::new("42", "Puppies", "Young dogs.")).await.unwrap();
    let got = e.get_document("42").await.unwrap();
    assert_eq!(got.title, "Puppies");
    assert_eq!(got.category, None);
    assert!(got.tags.is_empty());
    assert_eq!(e.get_statistics().await.unwrap().document_count, 1);

    e.delete_document("42").await.unwrap();
    assert!(matches!(e.get_document("42").await, Err(Error::NotFound(_))));
    assert!(matches!(e.delete_document("42").await, Err(Error::NotFound(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn tags_match_any() {
    let tmp = TempDir::new().unwrap();
    let e = engine(tmp.path()).await;
    e.create_index().await.unwrap();
    e.index_document(NewDocument::new("A", "first", "one").with_tags(["a", "b"])).await.unwrap();
    e.index_document(NewDocument::new("B", "second", "two").with_tags(["c"])).await.unwrap();

    assert_eq!(ids(&e.search_by_tags(tags(&["a"], 10)).await.unwrap()), vec!["A"]);
    let mut both: Vec<String> = e
        .search_by_tags(tags(&["a", "c"], 10))
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    both.sort();
    assert_eq!(both, vec!["A", "B"]);
    assert!(e.search_by_tags(tags(&["zzz"], 10)).await.unwrap().is_empty());
    assert!(matches!(e.search_by_tags(tags(&[], 10)).await, Err(Error::InvalidRequest(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn category_filter_is_exact() {
    let tmp = TempDir::new().unwrap();
    let e = seeded(tmp.path()).await;
    let q = SemanticQuery { text: "cats dogs kitten puppy pets".into(), size: 10, category: Some("finance".into()) };
    let results = e.semantic_search(q).await.unwrap();
    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.category.as_deref() == Some("finance")), "{:?}", ids(&results));

    let q = HybridQuery {
        text: "cats".into(),
        size: 10,
        category: Some("finance".into()),
        weights: FusionWeights::default(),
    };
    let results = e.hybrid_search(q).await.unwrap();
    assert!(results.iter().all(|r| r.category.as_deref() == Some("finance")));

    let q = SemanticQuery { text: "cats".into(), size: 10, category: Some("Finance".into()) };
    assert!(e.semantic_search(q).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn results_never_exceed_requested_or_configured_size() {
    let tmp = TempDir::new().unwrap();
    let mut s = settings(tmp.path());
    s.search.max_size = 4;
    s.search.default_size = 2;
    let e = SearchEngine::from_settings(s).await.unwrap();
    e.create_index().await.unwrap();
    e.bulk_index_documents(sample_corpus().unwrap()).await.unwrap();

    for size in [1, 3, 1000] {
        let bound = size.min(4);
        assert!(e.semantic_search(semantic("pets and dogs learn", size)).await.unwrap().len() <= bound);
        let h = e.hybrid_search(hybrid("pets and dogs learn", size, FusionWeights::default())).await.unwrap();
        assert!(h.len() <= bound);
        assert!(e.search_by_tags(tags(&["finance", "animal"], size)).await.unwrap().len() <= bound);
    }
    assert_eq!(e.semantic_search(semantic("pets and dogs learn", 1000)).await.unwrap().len(), 4);
    assert!(matches!(e.semantic_search(semantic("cats", 0)).await, Err(Error::InvalidRequest(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn semantic_only_weights_match_semantic_order() {
    let tmp = TempDir::new().unwrap();
    let e = seeded(tmp.path()).await;
    let text = "cats dogs kitten puppy pets";
    let sem = e.semantic_search(semantic(text, 3)).await.unwrap();
    let hyb = e
        .hybrid_search(hybrid(text, 3, FusionWeights { semantic: 1.0, keyword: 0.0 }))
        .await
        .unwrap();
    assert_eq!(ids(&sem), vec!["1", "8", "3"]);
    assert_eq!(ids(&hyb), ids(&sem));
}

#[tokio::test(flavor = "multi_thread")]
async fn hybrid_rewards_keyword_matches_with_typos() {
    let tmp = TempDir::new().unwrap();
    let e = seeded(tmp.path()).await;
    let results = e.hybrid_search(hybrid("stock markts", 5, FusionWeights::default())).await.unwrap();
    assert_eq!(results.first().map(|r| r.id.as_str()), Some("2"), "{:?}", ids(&results));
    assert!(results[0].highlights.contains_key("title"));

    let keyword_only = e
        .hybrid_search(hybrid("stock markts", 5, FusionWeights { semantic: 0.0, keyword: 1.0 }))
        .await
        .unwrap();
    assert_eq!(keyword_only.first().map(|r| r.id.as_str()), Some("2"));
    assert!(matches!(
        e.hybrid_search(hybrid("x", 5, FusionWeights { semantic: 2.0, keyword: 0.0 })).await,
        Err(Error::InvalidRequest(_))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_index_is_a_typed_error() {
    let tmp = TempDir::new().unwrap();
    let e = engine(tmp.path()).await;
    assert!(matches!(e.semantic_search(semantic("cats", 5)).await, Err(Error::Connectivity(_))));
    assert!(matches!(
        e.index_document(NewDocument::new("1", "t", "c")).await,
        Err(Error::Connectivity(_))
    ));
    assert!(!e.health().await.index_open);

    e.delete_index().await.unwrap();
    e.create_index().await.unwrap();
    assert!(e.health().await.index_open);
    e.delete_index().await.unwrap();
    assert!(matches!(e.get_statistics().await, Err(Error::Connectivity(_))));
    assert!(!e.index_dir().exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn bulk_reports_per_item_failures() {
    let tmp = TempDir::new().unwrap();
    let e = engine(tmp.path()).await;
    e.create_index().await.unwrap();
    let report = e
        .bulk_index_documents(vec![
            NewDocument::new("ok", "Fine", "valid"),
            NewDocument::new("bad", "", "missing title"),
            NewDocument::new("dup", "First", "v1"),
            NewDocument::new("dup", "Second", "v2"),
        ])
        .await
        .unwrap();
    assert_eq!(report.indexed, vec!["ok".to_string(), "dup".to_string()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].id, "bad");
    assert!(!report.is_complete());
    assert_eq!(e.get_document("dup").await.unwrap().title, "Second");
    assert_eq!(e.get_statistics().await.unwrap().document_count, 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn statistics_describe_the_index() {
    let tmp = TempDir::new().unwrap();
    let e = seeded(tmp.path()).await;
    let stats = e.get_statistics().await.unwrap();
    assert_eq!(stats.document_count, 10);
    assert!(stats.index_size_bytes > 0);
    assert_eq!(stats.index_name, "contextual_documents");
    assert_eq!(stats.embedding_model_id, "hash-bow-d384");
    assert_eq!(stats.vector_dimension, 384);
    assert_eq!(e.health().await.document_count, Some(10));
}

#[tokio::test(flavor = "multi_thread")]
async fn reopening_with_another_dimension_fails() {
    let tmp = TempDir::new().unwrap();
    engine(tmp.path()).await.create_index().await.unwrap();
    let mut s = settings(tmp.path());
    s.embedding.hash_dim = 16;
    assert!(matches!(
        SearchEngine::from_settings(s).await,
        Err(Error::DimensionMismatch { expected: 384, actual: 16 })
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn reset_recovers_from_another_dimension() {
    let tmp = TempDir::new().unwrap();
    seeded(tmp.path()).await;
    let mut s = settings(tmp.path());
    s.embedding.hash_dim = 16;

    let e = SearchEngine::load(s).expect("load");
    let report = e.reset(sample_corpus().unwrap()).await.unwrap();
    assert!(report.is_complete(), "{:?}", report.failed);
    let stats = e.get_statistics().await.unwrap();
    assert_eq!(stats.vector_dimension, 16);
    assert_eq!(stats.document_count, 10);
    assert_eq!(stats.embedding_model_id, "hash-bow-d16");
}

#[tokio::test(flavor = "multi_thread")]
async fn reset_replaces_an_unreadable_manifest() {
    let tmp = TempDir::new().unwrap();
    let s = settings(tmp.path());
    let dir = s.index.index_dir();
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("index.json"), "{").unwrap();

    let e = SearchEngine::load(s).expect("load");
    e.reset(vec![NewDocument::new("a", "Title", "Body text")]).await.unwrap();
    assert_eq!(e.get_document("a").await.unwrap().title, "Title");
}

#[tokio::test(flavor = "multi_thread")]
async fn punctuation_only_content_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let e = seeded(tmp.path()).await;
    let err = e.index_document(NewDocument::new("p", "Marks", "... !!! ---")).await.unwrap_err();
    assert!(matches!(err, Error::Embedding(_)), "{err:?}");
    assert!(matches!(e.get_document("p").await, Err(Error::NotFound(_))));

    let report = e
        .bulk_index_documents(vec![NewDocument::new("p", "Marks", "... !!! ---"), NewDocument::new("q", "Ok", "plain words")])
        .await
        .unwrap();
    assert_eq!(report.indexed, vec!["q".to_string()]);
    assert_eq!(report.failed[0].id, "p");
}

#[tokio::test(flavor = "multi_thread")]
async fn zero_vectors_under_fallback_keep_results_ordered() {
    let tmp = TempDir::new().unwrap();
    let mut s = settings(tmp.path());
    s.embedding.zero_vector_fallback = true;
    let e = SearchEngine::from_settings(s).await.unwrap();
    e.create_index().await.unwrap();
    e.bulk_index_documents(sample_corpus().unwrap()).await.unwrap();
    e.index_document(NewDocument::new("p", "!!!", "... !!! ---")).await.unwrap();

    let sem = e.semantic_search(semantic("cats dogs kitten puppy pets", 11)).await.unwrap();
    assert_eq!(sem[0].id, "1");
    assert!(sem.iter().all(|r| r.score.is_finite()));
    assert!(sem.windows(2).all(|w| w[0].score >= w[1].score), "{:?}", ids(&sem));

    let hyb = e.hybrid_search(hybrid("cats dogs kitten puppy pets", 11, FusionWeights::default())).await.unwrap();
    assert!(hyb.iter().all(|r| r.score.is_finite()));
    assert!(hyb.windows(2).all(|w| w[0].score >= w[1].score), "{:?}", ids(&hyb));
}
