use crate::embedding::{decode_vector, encode_vector, VectorCodecError};
use rkyv::Archive;
use serde::{Deserialize, Serialize};

/// A navigable area of the venue ("line").
#[derive(
    Archive, rkyv::Deserialize, rkyv::Serialize, Serialize, Deserialize, Debug, PartialEq, Clone,
)]
#[archive(check_bytes)]
pub struct Location {
    pub id: u64,
    pub name: String,
    pub description: String,
}

#[derive(
    Archive, rkyv::Deserialize, rkyv::Serialize, Serialize, Deserialize, Debug, PartialEq, Clone,
)]
#[archive(check_bytes)]
pub struct Product {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub price: f64,
    /// Owning location; exactly one per product.
    pub location_id: u64,
}

/// Persisted directed edge. The reverse edge is synthesized at load time.
#[derive(
    Archive, rkyv::Deserialize, rkyv::Serialize, Serialize, Deserialize, Debug, PartialEq, Clone,
)]
#[archive(check_bytes)]
pub struct Connection {
    pub source_id: u64,
    pub target_id: u64,
    pub distance: f32,
    pub direction: String,
}

#[derive(
    Archive,
    rkyv::Deserialize,
    rkyv::Serialize,
    Serialize,
    Deserialize,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Clone,
    Copy,
)]
#[archive(check_bytes)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    #[serde(alias = "line")]
    Location,
    Product,
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityType::Location => write!(f, "location"),
            EntityType::Product => write!(f, "product"),
        }
    }
}

/// One stored embedding. `vector_bytes` holds little-endian f32 values.
#[derive(
    Archive, rkyv::Deserialize, rkyv::Serialize, Serialize, Deserialize, Debug, PartialEq, Clone,
)]
#[archive(check_bytes)]
pub struct EmbeddingRecord {
    pub entity_type: EntityType,
    pub entity_id: u64,
    pub vector_bytes: Vec<u8>,
}

impl Location {
    pub fn new(id: u64, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
        }
    }
}

impl Product {
    pub fn new(
        id: u64,
        name: impl Into<String>,
        description: impl Into<String>,
        price: f64,
        location_id: u64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
            price,
            location_id,
        }
    }
}

impl Connection {
    pub fn new(source_id: u64, target_id: u64, distance: f32, direction: impl Into<String>) -> Self {
        Self {
            source_id,
            target_id,
            distance,
            direction: direction.into(),
        }
    }
}

impl EmbeddingRecord {
    pub fn from_vector(entity_type: EntityType, entity_id: u64, vector: &[f32]) -> Self {
        Self {
            entity_type,
            entity_id,
            vector_bytes: encode_vector(vector),
        }
    }

    pub fn vector(&self, dims: usize) -> Result<Vec<f32>, VectorCodecError> {
        decode_vector(&self.vector_bytes, dims)
    }
}
