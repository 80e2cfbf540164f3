use std::collections::HashSet;
use thiserror::Error;
use wayfinder_core::model::EntityType;

#[derive(Error, Debug, PartialEq)]
pub enum AnnError {
    #[error("vector for {entity_type} {entity_id} has {actual} dims, index expects {expected}")]
    DimensionMismatch {
        entity_type: EntityType,
        entity_id: u64,
        expected: usize,
        actual: usize,
    },
    #[error("query vector has {actual} dims, index expects {expected}")]
    QueryDimensionMismatch { expected: usize, actual: usize },
    #[error("duplicate embedding for {entity_type} {entity_id}")]
    Duplicate {
        entity_type: EntityType,
        entity_id: u64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexedVector {
    pub entity_type: EntityType,
    pub entity_id: u64,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredEntity {
    pub entity_type: EntityType,
    pub entity_id: u64,
    pub score: f32,
}

/// Brute-force cosine index. Entries keep insertion order, which is also the
/// tie order of `search`.
#[derive(Debug, Clone)]
pub struct LinearAnnIndex {
    dims: usize,
    entries: Vec<IndexedVector>,
    keys: HashSet<(EntityType, u64)>,
}

impl LinearAnnIndex {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            entries: Vec::new(),
            keys: HashSet::new(),
        }
    }

    pub fn insert(
        &mut self,
        entity_type: EntityType,
        entity_id: u64,
        vector: Vec<f32>,
    ) -> Result<(), AnnError> {
        if vector.len() != self.dims {
            return Err(AnnError::DimensionMismatch {
                entity_type,
                entity_id,
                expected: self.dims,
                actual: vector.len(),
            });
        }
        if !self.keys.insert((entity_type, entity_id)) {
            return Err(AnnError::Duplicate {
                entity_type,
                entity_id,
            });
        }
        self.entries.push(IndexedVector {
            entity_type,
            entity_id,
            vector,
        });
        Ok(())
    }

    /// Top-k by cosine similarity, descending; equal scores keep storage order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredEntity>, AnnError> {
        if query.len() != self.dims {
            return Err(AnnError::QueryDimensionMismatch {
                expected: self.dims,
                actual: query.len(),
            });
        }

        let query_norm = norm(query);
        let mut scores: Vec<ScoredEntity> = self
            .entries
            .iter()
            .map(|entry| ScoredEntity {
                entity_type: entry.entity_type,
                entity_id: entry.entity_id,
                score: cosine_with_norm(query, query_norm, &entry.vector),
            })
            .collect();

        // `sort_by` is stable, so ties stay in insertion order.
        scores.sort_by(|a, b| b.score.total_cmp(&a.score));
        scores.truncate(k);
        Ok(scores)
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn cosine_with_norm(query: &[f32], query_norm: f32, v: &[f32]) -> f32 {
    let v_norm = norm(v);
    if query_norm == 0.0 || v_norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = query.iter().zip(v.iter()).map(|(x, y)| x * y).sum();
    dot / (query_norm * v_norm)
}

/// `dot(a, b) / (|a| |b|)`, or 0 when either norm is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    cosine_with_norm(a, norm(a), b)
}
