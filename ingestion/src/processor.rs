use crate::definition::CatalogDefinition;
use anyhow::Context;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use storage::catalog::{CatalogError, CatalogStore};
use storage::index::graph::GraphError;
use storage::index::VenueGraph;
use storage::records::{SnapshotManifest, StoreRecords};
use storage::snapshot::SnapshotManager;
use thiserror::Error;
use wayfinder_core::embedding::{embed_checked, embedding_text, EmbedError, Embedder};
use wayfinder_core::model::{EmbeddingRecord, EntityType};

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("connection error: {0}")]
    Graph(#[from] GraphError),
    #[error("embedding {entity_type} {entity_id} failed: {source}")]
    Embed {
        entity_type: EntityType,
        entity_id: u64,
        #[source]
        source: EmbedError,
    },
}

/// Offline step: catalog definition in, embedded store records out.
pub struct Indexer {
    embedder: Arc<dyn Embedder>,
}

impl Indexer {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }

    /// Validate the definition, then embed every location and product as
    /// `"{name}: {description}"`.
    pub async fn build(&self, definition: &CatalogDefinition) -> Result<StoreRecords, IndexError> {
        let locations = definition.locations();
        let products = definition.products();
        let connections = definition.connections();

        // Same checks the runtime applies on load, before paying for embeddings.
        let catalog = CatalogStore::new(locations.clone(), products.clone())?;
        let names: HashMap<u64, String> = catalog
            .locations()
            .iter()
            .map(|l| (l.id, l.name.clone()))
            .collect();
        VenueGraph::load(&connections, names)?;

        let mut embeddings = Vec::with_capacity(locations.len() + products.len());
        for location in &locations {
            let vector = self
                .embed(EntityType::Location, location.id, &location.name, &location.description)
                .await?;
            embeddings.push(EmbeddingRecord::from_vector(EntityType::Location, location.id, &vector));
        }
        for product in &products {
            let vector = self
                .embed(EntityType::Product, product.id, &product.name, &product.description)
                .await?;
            embeddings.push(EmbeddingRecord::from_vector(EntityType::Product, product.id, &vector));
        }

        tracing::info!(
            model_id = self.embedder.model_id(),
            mode = %self.embedder.mode(),
            locations = locations.len(),
            products = products.len(),
            connections = connections.len(),
            "catalog indexed"
        );

        Ok(StoreRecords {
            manifest: SnapshotManifest {
                model_id: self.embedder.model_id().to_string(),
                mode: self.embedder.mode(),
                dims: self.embedder.dims() as u32,
            },
            locations,
            products,
            connections,
            embeddings,
        })
    }

    async fn embed(
        &self,
        entity_type: EntityType,
        entity_id: u64,
        name: &str,
        description: &str,
    ) -> Result<Vec<f32>, IndexError> {
        let text = embedding_text(name, description);
        embed_checked(self.embedder.as_ref(), &text)
            .await
            .map_err(|source| IndexError::Embed {
                entity_type,
                entity_id,
                source,
            })
    }

    /// Read a JSON definition, index it and publish it as the next snapshot.
    pub async fn index_file(
        &self,
        definition_path: impl AsRef<Path>,
        snapshots: &SnapshotManager,
    ) -> anyhow::Result<(u64, PathBuf)> {
        let definition_path = definition_path.as_ref();
        let raw = tokio::fs::read_to_string(definition_path)
            .await
            .with_context(|| format!("reading catalog definition {}", definition_path.display()))?;
        let definition = CatalogDefinition::parse_json(&raw)
            .with_context(|| format!("parsing catalog definition {}", definition_path.display()))?;

        let records = self.build(&definition).await?;
        let published = snapshots.publish(&records).await?;
        Ok(published)
    }
}
