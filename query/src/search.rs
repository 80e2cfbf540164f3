use serde::{Deserialize, Serialize};
use storage::index::ann::AnnError;
use storage::VenueSnapshot;
use thiserror::Error;
use wayfinder_core::embedding::{embed_checked, EmbedError, Embedder};
use wayfinder_core::error::{ErrorCode, WayfinderError};
use wayfinder_core::model::EntityType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub name: String,
    pub description: String,
    pub entity_type: EntityType,
    pub entity_id: u64,
    pub score: f32,
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("embedding provider error: {0}")]
    Provider(#[from] EmbedError),
    #[error("index error: {0}")]
    Index(#[from] AnnError),
}

impl WayfinderError for SearchError {
    fn error_code(&self) -> ErrorCode {
        match self {
            SearchError::InvalidQuery(_) => ErrorCode::InvalidArgument,
            SearchError::Provider(err) => err.error_code(),
            SearchError::Index(AnnError::QueryDimensionMismatch { .. }) => {
                ErrorCode::InvalidArgument
            }
            SearchError::Index(_) => ErrorCode::Internal,
        }
    }
}

/// Free-text retrieval over one snapshot's embeddings.
pub struct SemanticSearch<'a> {
    snapshot: &'a VenueSnapshot,
    embedder: &'a dyn Embedder,
}

impl<'a> SemanticSearch<'a> {
    pub fn new(snapshot: &'a VenueSnapshot, embedder: &'a dyn Embedder) -> Self {
        Self { snapshot, embedder }
    }

    /// Encode the query, rank every stored vector by cosine similarity and
    /// resolve the best `top_k` against the catalog.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::InvalidQuery(
                "query must not be empty".to_string(),
            ));
        }
        if top_k == 0 {
            return Err(SearchError::InvalidQuery(
                "top_k must be at least 1".to_string(),
            ));
        }

        let query_vector = embed_checked(self.embedder, query).await?;
        let ranked = self.snapshot.vectors().search(&query_vector, top_k)?;

        let catalog = self.snapshot.catalog();
        Ok(ranked
            .into_iter()
            .filter_map(|scored| {
                let (name, description) = catalog.describe(scored.entity_type, scored.entity_id)?;
                Some(SearchHit {
                    name: name.to_string(),
                    description: description.to_string(),
                    entity_type: scored.entity_type,
                    entity_id: scored.entity_id,
                    score: scored.score,
                })
            })
            .collect())
    }
}
