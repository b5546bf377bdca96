//! `SearchEngine`: shared state plus index lifecycle (create / drop / open).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use ctxsearch_core::config::Settings;
use ctxsearch_core::traits::Embedder;
use ctxsearch_core::types::{BulkReport, NewDocument};
use ctxsearch_core::{Error, Result};
use ctxsearch_embed::load_embedder;
use ctxsearch_text::TextIndex;
use ctxsearch_vector::VectorStore;

use crate::manifest::IndexManifest;

const TEXT_DIR: &str = "text";
const VECTOR_DIR: &str = "vectors";

/// Both halves of an open index.
pub(crate) struct OpenIndex {
    pub(crate) manifest: IndexManifest,
    pub(crate) dir: PathBuf,
    pub(crate) text: TextIndex,
    pub(crate) vectors: VectorStore,
}

pub struct SearchEngine {
    pub(crate) settings: Settings,
    pub(crate) embedder: Arc<dyn Embedder>,
    pub(crate) index: RwLock<Option<Arc<OpenIndex>>>,
}

/// Log an adapter failure and turn it into a typed error.
pub(crate) fn store_error(op: &str, kind: fn(String) -> Error, e: anyhow::Error) -> Error {
    tracing::error!(op, error = %format!("{e:#}"), "store operation failed");
    kind(format!("{op}: {e:#}"))
}

impl SearchEngine {
    /// Wrap an already-loaded embedder. No index is opened yet.
    pub fn new(settings: Settings, embedder: Arc<dyn Embedder>) -> Self {
        Self { settings, embedder, index: RwLock::new(None) }
    }

    /// Load the configured embedder and open the index if it already exists
    /// on disk.
    pub async fn from_settings(settings: Settings) -> Result<Self> {
        let engine = Self::load(settings)?;
        engine.open_existing().await?;
        Ok(engine)
    }

    /// Load the configured embedder without touching the index directory.
    /// For callers about to [`reset`](Self::reset), where the on-disk index
    /// may have been built with another model or be unreadable.
    pub fn load(settings: Settings) -> Result<Self> {
        settings.validate()?;
        let embedder = load_embedder(&settings.embedding)?;
        Ok(Self::new(settings, embedder))
    }

    /// Drop whatever is on disk, create a fresh index and bulk-load `docs`.
    pub async fn reset(&self, docs: Vec<NewDocument>) -> Result<BulkReport> {
        self.delete_index().await?;
        self.create_index().await?;
        let report = self.bulk_index_documents(docs).await?;
        for f in &report.failed {
            tracing::warn!(id = %f.id, reason = %f.reason, "document not indexed during reset");
        }
        tracing::info!(index = self.index_name(), documents = report.indexed.len(), "index reset");
        Ok(report)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn index_name(&self) -> &str {
        &self.settings.index.name
    }

    pub fn index_dir(&self) -> PathBuf {
        self.settings.index.index_dir()
    }

    /// Open the on-disk index, if any. Returns whether an index is now open.
    pub async fn open_existing(&self) -> Result<bool> {
        let mut guard = self.index.write().await;
        if guard.is_some() {
            return Ok(true);
        }
        let dir = self.index_dir();
        if !IndexManifest::exists(&dir) {
            return Ok(false);
        }
        *guard = Some(Arc::new(self.open_at(&dir).await?));
        Ok(true)
    }

    /// Create the index unless it already exists. Calling it again is a
    /// logged no-op.
    pub async fn create_index(&self) -> Result<()> {
        let mut guard = self.index.write().await;
        let dir = self.index_dir();
        if guard.is_some() {
            tracing::info!(index = self.index_name(), "index already exists");
            return Ok(());
        }
        if IndexManifest::exists(&dir) {
            tracing::info!(index = self.index_name(), "index already exists, opening");
            *guard = Some(Arc::new(self.open_at(&dir).await?));
            return Ok(());
        }

        if dir.exists() {
            tracing::warn!(dir = %dir.display(), "removing incomplete index directory");
            std::fs::remove_dir_all(&dir)?;
        }
        let manifest = IndexManifest {
            name: self.settings.index.name.clone(),
            dimension: self.embedder.dim(),
            model_id: self.embedder.model_id().to_string(),
            shards: self.settings.index.shards,
            replicas: self.settings.index.replicas,
            ef_search: self.settings.index.ef_search,
            created_at: Utc::now(),
        };
        std::fs::create_dir_all(&dir)?;
        let text = TextIndex::create(&dir.join(TEXT_DIR))
            .map_err(|e| store_error("create text index", Error::Schema, e))?;
        let vectors = VectorStore::create(&dir.join(VECTOR_DIR), manifest.dimension)
            .await
            .map_err(|e| store_error("create vector table", Error::Schema, e))?
            .with_ef(manifest.ef_search);
        // written last: a directory without a manifest is not an index
        manifest.save(&dir)?;
        tracing::info!(
            index = %manifest.name,
            dimension = manifest.dimension,
            model = %manifest.model_id,
            "created index"
        );
        *guard = Some(Arc::new(OpenIndex { manifest, dir, text, vectors }));
        Ok(())
    }

    /// Drop the index and every document in it. Absent index is a logged
    /// no-op.
    pub async fn delete_index(&self) -> Result<()> {
        let mut guard = self.index.write().await;
        let dir = self.index_dir();
        let was_open = guard.take().is_some();
        if !dir.exists() {
            tracing::info!(index = self.index_name(), "index does not exist, nothing to delete");
            return Ok(());
        }
        std::fs::remove_dir_all(&dir)?;
        tracing::info!(index = self.index_name(), was_open, "deleted index");
        Ok(())
    }

    /// The open index, or `Connectivity` if there is none.
    pub(crate) async fn current(&self) -> Result<Arc<OpenIndex>> {
        match self.index.read().await.as_ref() {
            Some(idx) => Ok(Arc::clone(idx)),
            None => {
                let msg = format!("index '{}' is not open", self.index_name());
                tracing::error!("{msg}");
                Err(Error::Connectivity(msg))
            }
        }
    }

    async fn open_at(&self, dir: &Path) -> Result<OpenIndex> {
        let manifest = IndexManifest::load(dir)?;
        let dim = self.embedder.dim();
        if manifest.dimension != dim {
            tracing::error!(index = %manifest.name, stored = manifest.dimension, dim, "dimension mismatch");
            return Err(Error::DimensionMismatch { expected: manifest.dimension, actual: dim });
        }
        if manifest.model_id != self.embedder.model_id() {
            tracing::warn!(
                stored = %manifest.model_id,
                loaded = self.embedder.model_id(),
                "index was built with a different model"
            );
        }
        let text = TextIndex::open(&dir.join(TEXT_DIR))
            .map_err(|e| store_error("open text index", Error::Connectivity, e))?;
        let vectors = VectorStore::open(&dir.join(VECTOR_DIR))
            .await
            .map_err(|e| store_error("open vector table", Error::Connectivity, e))?
            .with_ef(manifest.ef_search);
        if vectors.dim() != manifest.dimension {
            return Err(Error::DimensionMismatch { expected: manifest.dimension, actual: vectors.dim() });
        }
        tracing::info!(index = %manifest.name, docs = text.num_docs(), "opened index");
        Ok(OpenIndex { manifest, dir: dir.to_path_buf(), text, vectors })
    }
}
