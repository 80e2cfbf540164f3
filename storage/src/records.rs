use crc32fast::Hasher;
use rkyv::ser::{serializers::AllocSerializer, Serializer};
use rkyv::{AlignedVec, Archive, Deserialize, Serialize};
use thiserror::Error;
use wayfinder_core::embedding::ProviderMode;
use wayfinder_core::model::{Connection, EmbeddingRecord, Location, Product};

pub const SNAPSHOT_MAGIC: &[u8; 8] = b"WFSNAP01";
const HEADER_LEN: usize = 16;

#[derive(Error, Debug, PartialEq)]
pub enum RecordsError {
    #[error("not a snapshot file (bad magic)")]
    BadMagic,
    #[error("snapshot truncated: header says {expected} payload bytes, found {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("data integrity error (CRC mismatch)")]
    CrcMismatch,
    #[error("serialization error")]
    Serialization,
    #[error("corrupt snapshot payload")]
    CorruptPayload,
}

/// Provenance of the embeddings inside a snapshot.
#[derive(Archive, Deserialize, Serialize, Debug, Clone, PartialEq)]
#[archive(check_bytes)]
pub struct SnapshotManifest {
    pub model_id: String,
    pub mode: ProviderMode,
    pub dims: u32,
}

/// The four persisted record sets plus the manifest, as written by the
/// offline indexer.
#[derive(Archive, Deserialize, Serialize, Debug, Clone, PartialEq)]
#[archive(check_bytes)]
pub struct StoreRecords {
    pub manifest: SnapshotManifest,
    pub locations: Vec<Location>,
    pub products: Vec<Product>,
    pub connections: Vec<Connection>,
    pub embeddings: Vec<EmbeddingRecord>,
}

impl StoreRecords {
    /// Frame: `[magic: 8][CRC: 4][Len: 4][rkyv payload: Len]`.
    pub fn encode(&self) -> Result<Vec<u8>, RecordsError> {
        let mut serializer = AllocSerializer::<4096>::default();
        serializer
            .serialize_value(self)
            .map_err(|_| RecordsError::Serialization)?;
        let payload = serializer.into_serializer().into_inner();

        let mut hasher = Hasher::new();
        hasher.update(&payload);
        let crc = hasher.finalize();

        let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
        out.extend_from_slice(SNAPSHOT_MAGIC);
        out.extend_from_slice(&crc.to_be_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(&payload);
        Ok(out)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, RecordsError> {
        if bytes.len() < HEADER_LEN || &bytes[..8] != SNAPSHOT_MAGIC {
            return Err(RecordsError::BadMagic);
        }
        let crc = u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        let len = u32::from_be_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]) as usize;

        let payload = &bytes[HEADER_LEN..];
        if payload.len() != len {
            return Err(RecordsError::Truncated {
                expected: len,
                actual: payload.len(),
            });
        }

        let mut hasher = Hasher::new();
        hasher.update(payload);
        if hasher.finalize() != crc {
            return Err(RecordsError::CrcMismatch);
        }

        // rkyv validation needs an aligned buffer.
        let mut aligned = AlignedVec::with_capacity(len);
        aligned.extend_from_slice(payload);

        let archived = rkyv::check_archived_root::<StoreRecords>(&aligned[..])
            .map_err(|_| RecordsError::CorruptPayload)?;
        archived
            .deserialize(&mut rkyv::Infallible)
            .map_err(|_| RecordsError::CorruptPayload)
    }
}
