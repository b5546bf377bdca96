use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ctxsearch_core::{Error, Result};

pub const MANIFEST_FILE: &str = "index.json";

/// Persisted description of an index, written once at creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexManifest {
    pub name: String,
    pub dimension: usize,
    pub model_id: String,
    pub shards: u32,
    pub replicas: u32,
    pub ef_search: u32,
    pub created_at: DateTime<Utc>,
}

impl IndexManifest {
    pub fn path(index_dir: &Path) -> PathBuf {
        index_dir.join(MANIFEST_FILE)
    }

    pub fn exists(index_dir: &Path) -> bool {
        Self::path(index_dir).is_file()
    }

    pub fn load(index_dir: &Path) -> Result<Self> {
        let path = Self::path(index_dir);
        let raw = std::fs::read_to_string(&path)?;
        serde_json::from_str(&raw).map_err(|e| Error::Schema(format!("{}: {e}", path.display())))
    }

    pub fn save(&self, index_dir: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self).map_err(|e| Error::Schema(e.to_string()))?;
        std::fs::write(Self::path(index_dir), raw)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let m = IndexManifest {
            name: "docs".into(),
            dimension: 8,
            model_id: "hash-bow-d8".into(),
            shards: 1,
            replicas: 0,
            ef_search: 100,
            created_at: Utc::now(),
        };
        assert!(!IndexManifest::exists(dir.path()));
        m.save(dir.path()).expect("save");
        assert_eq!(IndexManifest::load(dir.path()).expect("load"), m);
    }

    #[test]
    fn corrupt_manifest_is_a_schema_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(IndexManifest::path(dir.path()), "{").expect("write");
        assert!(matches!(IndexManifest::load(dir.path()), Err(Error::Schema(_))));
    }
}
