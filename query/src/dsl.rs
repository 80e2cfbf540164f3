use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NavigateRequest {
    /// Starting location id.
    pub start: u64,
    /// Free-text product query.
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryValidationError {
    #[error("query must not be empty")]
    EmptyQuery,
    #[error("top_k must be between 1 and {0}")]
    InvalidTopK(usize),
}

impl NavigateRequest {
    pub fn parse_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn validate(&self) -> Result<(), QueryValidationError> {
        if self.query.trim().is_empty() {
            return Err(QueryValidationError::EmptyQuery);
        }
        Ok(())
    }
}

impl SearchRequest {
    pub fn parse_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn validate(&self, max_top_k: usize) -> Result<(), QueryValidationError> {
        if self.query.trim().is_empty() {
            return Err(QueryValidationError::EmptyQuery);
        }
        if let Some(top_k) = self.top_k {
            if top_k == 0 || top_k > max_top_k {
                return Err(QueryValidationError::InvalidTopK(max_top_k));
            }
        }
        Ok(())
    }

    pub fn effective_top_k(&self, default_top_k: usize) -> usize {
        self.top_k.unwrap_or(default_top_k)
    }
}
