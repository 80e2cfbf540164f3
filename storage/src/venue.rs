use crate::catalog::{CatalogError, CatalogStore};
use crate::index::ann::AnnError;
use crate::index::graph::GraphError;
use crate::index::{LinearAnnIndex, VenueGraph};
use crate::records::{SnapshotManifest, StoreRecords};
use thiserror::Error;
use wayfinder_core::embedding::{ProviderMode, VectorCodecError};
use wayfinder_core::error::{ErrorCode, WayfinderError};
use wayfinder_core::model::EntityType;

#[derive(Error, Debug, PartialEq)]
pub enum BuildError {
    #[error("catalog: {0}")]
    Catalog(#[from] CatalogError),
    #[error("graph: {0}")]
    Graph(#[from] GraphError),
    #[error("embedding index: {0}")]
    Index(#[from] AnnError),
    #[error("embedding for {entity_type} {entity_id}: {source}")]
    Vector {
        entity_type: EntityType,
        entity_id: u64,
        #[source]
        source: VectorCodecError,
    },
    #[error("embedding for {entity_type} {entity_id} contains a non-finite value")]
    NonFiniteVector {
        entity_type: EntityType,
        entity_id: u64,
    },
    #[error("embedding references unknown {entity_type} {entity_id}")]
    DanglingEmbedding {
        entity_type: EntityType,
        entity_id: u64,
    },
    #[error("snapshot embeddings were produced by {found_mode}/{found_model}, runtime provider is {expected_mode}/{expected_model}")]
    ProviderMismatch {
        expected_mode: ProviderMode,
        expected_model: String,
        found_mode: ProviderMode,
        found_model: String,
    },
    #[error("snapshot embeddings have {found} dims, runtime provider has {expected}")]
    DimensionMismatch { expected: usize, found: usize },
}

impl WayfinderError for BuildError {
    fn error_code(&self) -> ErrorCode {
        ErrorCode::FailedPrecondition
    }
}

/// Catalog, graph and embedding index served together between rebuilds.
/// Immutable once built; replaced as a whole.
#[derive(Debug, Clone)]
pub struct VenueSnapshot {
    version: u64,
    manifest: SnapshotManifest,
    catalog: CatalogStore,
    graph: VenueGraph,
    vectors: LinearAnnIndex,
}

impl VenueSnapshot {
    /// Validate and index persisted records. Every foreign key is checked
    /// here so request paths never meet a dangling id.
    pub fn build(version: u64, records: StoreRecords) -> Result<Self, BuildError> {
        let StoreRecords {
            manifest,
            locations,
            products,
            connections,
            embeddings,
        } = records;

        let catalog = CatalogStore::new(locations, products)?;

        let names = catalog
            .locations()
            .iter()
            .map(|l| (l.id, l.name.clone()))
            .collect();
        let graph = VenueGraph::load(&connections, names)?;

        let dims = manifest.dims as usize;
        let mut vectors = LinearAnnIndex::new(dims);
        for record in embeddings {
            let known = match record.entity_type {
                EntityType::Location => catalog.location(record.entity_id).is_some(),
                EntityType::Product => catalog.product(record.entity_id).is_some(),
            };
            if !known {
                return Err(BuildError::DanglingEmbedding {
                    entity_type: record.entity_type,
                    entity_id: record.entity_id,
                });
            }
            let vector = record.vector(dims).map_err(|source| BuildError::Vector {
                entity_type: record.entity_type,
                entity_id: record.entity_id,
                source,
            })?;
            if vector.iter().any(|x| !x.is_finite()) {
                return Err(BuildError::NonFiniteVector {
                    entity_type: record.entity_type,
                    entity_id: record.entity_id,
                });
            }
            vectors.insert(record.entity_type, record.entity_id, vector)?;
        }

        tracing::debug!(
            version,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            vectors = vectors.len(),
            "venue snapshot built"
        );

        Ok(Self {
            version,
            manifest,
            catalog,
            graph,
            vectors,
        })
    }

    /// Refuse to serve vectors from a different provider than the one that
    /// will encode queries.
    pub fn ensure_provider(
        &self,
        mode: ProviderMode,
        model_id: &str,
        dims: usize,
    ) -> Result<(), BuildError> {
        if self.manifest.mode != mode || self.manifest.model_id != model_id {
            return Err(BuildError::ProviderMismatch {
                expected_mode: mode,
                expected_model: model_id.to_string(),
                found_mode: self.manifest.mode,
                found_model: self.manifest.model_id.clone(),
            });
        }
        if self.vectors.dims() != dims {
            return Err(BuildError::DimensionMismatch {
                expected: dims,
                found: self.vectors.dims(),
            });
        }
        Ok(())
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn manifest(&self) -> &SnapshotManifest {
        &self.manifest
    }

    pub fn catalog(&self) -> &CatalogStore {
        &self.catalog
    }

    pub fn graph(&self) -> &VenueGraph {
        &self.graph
    }

    pub fn vectors(&self) -> &LinearAnnIndex {
        &self.vectors
    }
}
