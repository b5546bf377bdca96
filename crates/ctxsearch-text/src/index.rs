use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use tantivy::collector::TopDocs;
use tantivy::query::{TermQuery, TermSetQuery};
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};

use ctxsearch_core::types::{Document, StoredDocument};

use crate::schema::{build_schema, Fields};

const WRITER_HEAP_BYTES: usize = 50_000_000;

/// Full-text side of an index: stored fields, BM25 postings and exact-match
/// label fields. Writes are serialized through one writer; reads go through
/// a reader that is reloaded after every commit, so a write is visible to the
/// next query.
pub struct TextIndex {
    pub(crate) index: Index,
    pub(crate) reader: IndexReader,
    writer: Mutex<IndexWriter>,
    pub(crate) fields: Fields,
}

impl TextIndex {
    /// Create a fresh index in `dir`. Fails if one already exists there.
    pub fn create(dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(dir)?;
        let index = Index::create_in_dir(dir, build_schema())
            .with_context(|| format!("creating text index in {}", dir.display()))?;
        Self::from_index(index)
    }

    pub fn open(dir: &Path) -> anyhow::Result<Self> {
        let index = Index::open_in_dir(dir)
            .with_context(|| format!("opening text index in {}", dir.display()))?;
        Self::from_index(index)
    }

    fn from_index(index: Index) -> anyhow::Result<Self> {
        let fields = Fields::resolve(&index)?;
        let reader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into()?;
        let writer = index.writer(WRITER_HEAP_BYTES)?;
        Ok(Self { index, reader, writer: Mutex::new(writer), fields })
    }

    /// Replace-or-insert every document by id, then commit once.
    pub fn upsert(&self, docs: &[Document]) -> anyhow::Result<()> {
        let mut writer = self.writer.lock().map_err(|_| anyhow!("text index writer lock poisoned"))?;
        for d in docs {
            writer.delete_term(Term::from_field_text(self.fields.id, &d.id));
            writer.add_document(self.to_tantivy(d))?;
        }
        writer.commit()?;
        drop(writer);
        self.reader.reload()?;
        Ok(())
    }

    /// Remove a document. Returns whether it was present.
    pub fn delete(&self, id: &str) -> anyhow::Result<bool> {
        if self.get(id)?.is_none() {
            return Ok(false);
        }
        let mut writer = self.writer.lock().map_err(|_| anyhow!("text index writer lock poisoned"))?;
        writer.delete_term(Term::from_field_text(self.fields.id, id));
        writer.commit()?;
        drop(writer);
        self.reader.reload()?;
        Ok(true)
    }

    pub fn get(&self, id: &str) -> anyhow::Result<Option<StoredDocument>> {
        let searcher = self.reader.searcher();
        let q = TermQuery::new(Term::from_field_text(self.fields.id, id), IndexRecordOption::Basic);
        let top = searcher.search(&q, &TopDocs::with_limit(1))?;
        match top.into_iter().next() {
            Some((_, addr)) => {
                let doc: TantivyDocument = searcher.doc(addr)?;
                Ok(Some(self.to_stored(&doc)?))
            }
            None => Ok(None),
        }
    }

    /// Stored fields for a set of ids. Ids that are not indexed are absent
    /// from the map.
    pub fn fetch(&self, ids: &[String]) -> anyhow::Result<HashMap<String, StoredDocument>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let searcher = self.reader.searcher();
        let terms = ids.iter().map(|id| Term::from_field_text(self.fields.id, id));
        let q = TermSetQuery::new(terms);
        let top = searcher.search(&q, &TopDocs::with_limit(ids.len()))?;
        let mut out = HashMap::with_capacity(top.len());
        for (_, addr) in top {
            let doc: TantivyDocument = searcher.doc(addr)?;
            let stored = self.to_stored(&doc)?;
            out.insert(stored.id.clone(), stored);
        }
        Ok(out)
    }

    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    fn to_tantivy(&self, d: &Document) -> TantivyDocument {
        let f = &self.fields;
        let mut doc = TantivyDocument::default();
        doc.add_text(f.id, &d.id);
        doc.add_text(f.title, &d.title);
        doc.add_text(f.content, &d.content);
        if !d.category.is_empty() {
            doc.add_text(f.category, &d.category);
        }
        for tag in &d.tags {
            doc.add_text(f.tags, tag);
        }
        doc.add_date(f.created_at, tantivy::DateTime::from_timestamp_micros(d.created_at.timestamp_micros()));
        doc
    }

    pub(crate) fn to_stored(&self, doc: &TantivyDocument) -> anyhow::Result<StoredDocument> {
        let f = &self.fields;
        let text = |field| doc.get_first(field).and_then(|v| v.as_str()).map(str::to_string);
        let id = text(f.id).ok_or_else(|| anyhow!("stored document without id"))?;
        let created_at = doc
            .get_first(f.created_at)
            .and_then(|v| v.as_datetime())
            .and_then(|dt| DateTime::<Utc>::from_timestamp_micros(dt.into_timestamp_micros()))
            .ok_or_else(|| anyhow!("document {id} has no created_at"))?;
        Ok(StoredDocument {
            title: text(f.title).unwrap_or_default(),
            content: text(f.content).unwrap_or_default(),
            category: text(f.category),
            tags: doc.get_all(f.tags).filter_map(|v| v.as_str().map(str::to_string)).collect(),
            created_at,
            id,
        })
    }
}
