use crate::embedding::{ProviderMode, DEFAULT_EMBEDDING_DIMS, DEFAULT_EMBEDDING_MODEL_ID};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub snapshot_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_model_id")]
    pub model_id: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default)]
    pub mode: ProviderMode,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
    #[serde(default = "default_max_top_k")]
    pub max_top_k: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_id: default_model_id(),
            dims: default_dims(),
            mode: ProviderMode::default(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            max_top_k: default_max_top_k(),
        }
    }
}

fn default_model_id() -> String {
    DEFAULT_EMBEDDING_MODEL_ID.to_string()
}

const fn default_dims() -> usize {
    DEFAULT_EMBEDDING_DIMS
}

const fn default_top_k() -> usize {
    5
}

const fn default_max_top_k() -> usize {
    100
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Layer `{dir}/default`, `{dir}/{RUN_MODE}` and `WAYFINDER__*` env vars.
    pub fn load_from(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let dir = dir.as_ref();
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .add_source(File::from(dir.join("default")))
            .add_source(File::from(dir.join(&run_mode)).required(false))
            .add_source(Environment::with_prefix("WAYFINDER").separator("__"));

        builder.build()?.try_deserialize()
    }
}
