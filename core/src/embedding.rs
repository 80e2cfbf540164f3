use crate::config::EmbeddingConfig;
use crate::error::{ErrorCode, WayfinderError};
use rand::Rng;
use rkyv::Archive;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

pub const DEFAULT_EMBEDDING_DIMS: usize = 384;
pub const DEFAULT_EMBEDDING_MODEL_ID: &str = "all-MiniLM-L6-v2";

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// How the vectors of a deployment were produced. Stored with every snapshot
/// so stub vectors are never served next to production ones.
#[derive(
    Archive,
    rkyv::Deserialize,
    rkyv::Serialize,
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
)]
#[archive(check_bytes)]
#[serde(rename_all = "snake_case")]
pub enum ProviderMode {
    #[default]
    Deterministic,
    RandomStub,
}

impl std::fmt::Display for ProviderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderMode::Deterministic => write!(f, "deterministic"),
            ProviderMode::RandomStub => write!(f, "random_stub"),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum VectorCodecError {
    #[error("vector byte length {actual} does not match {dims} dims ({expected} bytes)")]
    LengthMismatch {
        dims: usize,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EmbedError {
    #[error("embedding provider unavailable: {0}")]
    Unavailable(String),
    #[error("embedding provider returned {actual} dims, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("embedding provider returned a non-finite value at position {index}")]
    NonFinite { index: usize },
}

impl WayfinderError for EmbedError {
    fn error_code(&self) -> ErrorCode {
        match self {
            EmbedError::Unavailable(_) => ErrorCode::Unavailable,
            EmbedError::DimensionMismatch { .. } | EmbedError::NonFinite { .. } => {
                ErrorCode::Internal
            }
        }
    }
}

/// Fixed-width little-endian f32 encoding used for persisted vectors.
pub fn encode_vector(vector: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

pub fn decode_vector(bytes: &[u8], dims: usize) -> Result<Vec<f32>, VectorCodecError> {
    let expected = dims * 4;
    if bytes.len() != expected {
        return Err(VectorCodecError::LengthMismatch {
            dims,
            expected,
            actual: bytes.len(),
        });
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Text embedded for a location or product.
pub fn embedding_text(name: &str, description: &str) -> String {
    format!("{}: {}", name, description)
}

/// Hash-derived vector. Each 32-dim block comes from its own digest so long
/// vectors do not repeat.
pub fn deterministic_embedding(text: &str, model_id: &str, dims: usize) -> Vec<f32> {
    let dims = dims.max(1);

    let mut out = Vec::with_capacity(dims);
    let mut block: u32 = 0;
    while out.len() < dims {
        let mut hasher = Sha256::new();
        hasher.update(model_id.as_bytes());
        hasher.update(block.to_le_bytes());
        hasher.update(text.as_bytes());
        let digest = hasher.finalize();

        for byte in digest.iter().take(dims - out.len()) {
            out.push((*byte as f32 / 127.5) - 1.0);
        }
        block += 1;
    }

    out
}

/// The external embedding provider contract.
pub trait Embedder: Send + Sync {
    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>, EmbedError>>;

    fn model_id(&self) -> &str;

    fn dims(&self) -> usize;

    fn mode(&self) -> ProviderMode;
}

pub struct DeterministicEmbedder {
    model_id: String,
    dims: usize,
}

impl DeterministicEmbedder {
    pub fn new(model_id: impl Into<String>, dims: usize) -> Self {
        Self {
            model_id: model_id.into(),
            dims: dims.max(1),
        }
    }
}

impl Default for DeterministicEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDING_MODEL_ID, DEFAULT_EMBEDDING_DIMS)
    }
}

impl Embedder for DeterministicEmbedder {
    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>, EmbedError>> {
        let text = text.to_string();
        let model_id = self.model_id.clone();
        let dims = self.dims;

        Box::pin(async move { Ok(deterministic_embedding(&text, &model_id, dims)) })
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dims(&self) -> usize {
        self.dims
    }

    fn mode(&self) -> ProviderMode {
        ProviderMode::Deterministic
    }
}

/// Dev/test stand-in returning uniform random vectors in [0, 1).
/// Rankings are meaningless and not reproducible.
pub struct RandomStubEmbedder {
    model_id: String,
    dims: usize,
}

impl RandomStubEmbedder {
    pub fn new(model_id: impl Into<String>, dims: usize) -> Self {
        let model_id = model_id.into();
        tracing::warn!(
            model_id = %model_id,
            "random stub embedder in use; search rankings are not reproducible"
        );
        Self {
            model_id,
            dims: dims.max(1),
        }
    }
}

impl Embedder for RandomStubEmbedder {
    fn embed<'a>(&'a self, _text: &'a str) -> BoxFuture<'a, Result<Vec<f32>, EmbedError>> {
        let mut rng = rand::rng();
        let vector: Vec<f32> = (0..self.dims).map(|_| rng.random::<f32>()).collect();

        Box::pin(async move { Ok(vector) })
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dims(&self) -> usize {
        self.dims
    }

    fn mode(&self) -> ProviderMode {
        ProviderMode::RandomStub
    }
}

pub fn embedder_from_config(config: &EmbeddingConfig) -> Arc<dyn Embedder> {
    match config.mode {
        ProviderMode::Deterministic => {
            Arc::new(DeterministicEmbedder::new(&config.model_id, config.dims))
        }
        ProviderMode::RandomStub => Arc::new(RandomStubEmbedder::new(&config.model_id, config.dims)),
    }
}

/// Embed and check the provider honoured its declared dimension and returned
/// only finite values.
pub async fn embed_checked(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>, EmbedError> {
    let vector = embedder.embed(text).await?;
    if vector.len() != embedder.dims() {
        return Err(EmbedError::DimensionMismatch {
            expected: embedder.dims(),
            actual: vector.len(),
        });
    }
    if let Some(index) = vector.iter().position(|x| !x.is_finite()) {
        return Err(EmbedError::NonFinite { index });
    }
    Ok(vector)
}
