//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` +
//! `config.<env>.toml` + `APP_*` env vars (`__` separates sections, so
//! `APP_SEARCH__MAX_SIZE=50` sets `search.max_size`). Provides helpers to
//! expand `~` and `${VAR}` and to resolve relative paths against a base.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate_for_env(&env_name)?;
        Ok(config)
    }

    /// Wrap an already-built figment. Defaults are merged underneath it.
    pub fn from_figment(figment: Figment) -> Self {
        Self { figment: Figment::from(Serialized::defaults(Settings::default())).merge(figment) }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn settings(&self) -> Result<Settings, Error> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate_for_env(&self, env: &str) -> anyhow::Result<()> {
        if let "prod" | "production" = env {
            let backend: String = self.get("embedding.backend")?;
            if backend == "hash" {
                anyhow::bail!("the hash embedder is for development and tests only");
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub index: IndexSettings,
    pub embedding: EmbeddingSettings,
    pub search: SearchSettings,
    pub startup: StartupSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndexSettings {
    /// Parent directory; each index lives in `<data_dir>/<name>`.
    pub data_dir: String,
    pub name: String,
    /// Row count at which a bulk load also builds an ANN index.
    pub ann_min_rows: usize,
    /// Single-node store: always 1.
    pub shards: u32,
    /// Single-node store: always 0.
    pub replicas: u32,
    pub ef_search: u32,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            data_dir: "./data/indexes".to_string(),
            name: "contextual_documents".to_string(),
            ann_min_rows: 5000,
            shards: 1,
            replicas: 0,
            ef_search: 100,
        }
    }
}

impl IndexSettings {
    pub fn index_dir(&self) -> PathBuf {
        expand_path(&self.data_dir).join(&self.name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EmbeddingBackend {
    XlmRoberta,
    Hash,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub backend: EmbeddingBackend,
    pub model_id: String,
    /// Directory holding `tokenizer.json`, `config.json` and the weights.
    pub model_dir: Option<String>,
    pub max_len: usize,
    /// Output dimension of the hash backend.
    pub hash_dim: usize,
    /// Substitute a zero vector (and log) instead of failing on inference errors.
    pub zero_vector_fallback: bool,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::XlmRoberta,
            model_id: "BAAI/bge-m3".to_string(),
            model_dir: None,
            max_len: 256,
            hash_dim: 384,
            zero_vector_fallback: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchSettings {
    pub default_size: usize,
    pub max_size: usize,
    pub semantic_weight: f32,
    pub keyword_weight: f32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self { default_size: 10, max_size: 100, semantic_weight: 0.7, keyword_weight: 0.3 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StartupSettings {
    pub reset_on_start: bool,
    /// JSON array of documents; the bundled sample corpus is used when unset.
    pub sample_corpus: Option<String>,
}

impl Default for StartupSettings {
    fn default() -> Self {
        Self { reset_on_start: true, sample_corpus: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), Error> {
        let invalid = |msg: String| Err(Error::InvalidConfig(msg));
        if self.index.name.is_empty() || self.index.name.contains(['/', '\\']) {
            return invalid(format!("index.name '{}' is not a valid directory name", self.index.name));
        }
        if self.index.shards != 1 || self.index.replicas != 0 {
            return invalid(format!(
                "index.shards/replicas must be 1/0 for a local store, got {}/{}",
                self.index.shards, self.index.replicas
            ));
        }
        if self.index.ef_search == 0 {
            return invalid("index.ef_search must be at least 1".to_string());
        }
        if self.search.max_size == 0 {
            return invalid("search.max_size must be at least 1".to_string());
        }
        if self.search.default_size == 0 || self.search.default_size > self.search.max_size {
            return invalid(format!(
                "search.default_size must be in 1..={}, got {}",
                self.search.max_size, self.search.default_size
            ));
        }
        for (key, w) in [
            ("search.semantic_weight", self.search.semantic_weight),
            ("search.keyword_weight", self.search.keyword_weight),
        ] {
            if !(0.0..=1.0).contains(&w) {
                return invalid(format!("{key} must be in [0, 1], got {w}"));
            }
        }
        if self.embedding.max_len == 0 {
            return invalid("embedding.max_len must be at least 1".to_string());
        }
        if self.embedding.backend == EmbeddingBackend::Hash && self.embedding.hash_dim == 0 {
            return invalid("embedding.hash_dim must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let s = Config::from_figment(Figment::new()).settings().expect("settings");
        assert_eq!(s.search.max_size, 100);
        assert_eq!(s.index.name, "contextual_documents");
        assert_eq!(s.embedding.backend, EmbeddingBackend::XlmRoberta);
    }

    #[test]
    fn toml_overrides_nested_keys() {
        let fig = Figment::new().merge(Toml::string(
            "[search]\nmax_size = 5\ndefault_size = 3\n[embedding]\nbackend = \"hash\"\nhash_dim = 16\n",
        ));
        let s = Config::from_figment(fig).settings().expect("settings");
        assert_eq!(s.search.max_size, 5);
        assert_eq!(s.embedding.backend, EmbeddingBackend::Hash);
        assert_eq!(s.embedding.hash_dim, 16);
        assert_eq!(s.search.keyword_weight, 0.3);
    }

    #[test]
    fn rejects_default_size_above_max() {
        let fig = Figment::new().merge(Toml::string("[search]\nmax_size = 5\ndefault_size = 10\n"));
        assert!(matches!(Config::from_figment(fig).settings(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn rejects_weight_above_one() {
        let fig = Figment::new().merge(Toml::string("[search]\nsemantic_weight = 1.5\n"));
        assert!(matches!(Config::from_figment(fig).settings(), Err(Error::InvalidConfig(_))));
        let fig = Figment::new().merge(Toml::string("[search]\nsemantic_weight = 1.0\nkeyword_weight = 0.0\n"));
        assert!(Config::from_figment(fig).settings().is_ok());
    }

    #[test]
    fn resolve_keeps_absolute_paths() {
        let base = Path::new("/base");
        assert_eq!(resolve_with_base(base, "/abs/x"), PathBuf::from("/abs/x"));
        assert_eq!(resolve_with_base(base, "rel"), PathBuf::from("/base/rel"));
    }
}
