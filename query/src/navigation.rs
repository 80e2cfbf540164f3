use crate::locator::{LocateError, ProductLocator};
use crate::pathfinder::{shortest_path, RouteError};
use serde::{Deserialize, Serialize};
use storage::VenueSnapshot;
use thiserror::Error;
use wayfinder_core::error::{ErrorCode, WayfinderError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationResult {
    pub product_name: String,
    pub target_location_id: u64,
    pub target_location_name: String,
    /// Human-readable, e.g. `"50m"`.
    pub total_distance: String,
    pub path: Vec<u64>,
    pub steps: Vec<String>,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum NavigationError {
    #[error("invalid query: {0}")]
    InvalidInput(String),
    #[error("product '{0}' not found")]
    ProductNotFound(String),
    #[error("location {0} is not on the map")]
    LocationNotFound(u64),
    #[error("no path from location {from} to location {to}")]
    NoPath { from: u64, to: u64 },
}

impl WayfinderError for NavigationError {
    fn error_code(&self) -> ErrorCode {
        match self {
            NavigationError::InvalidInput(_) => ErrorCode::InvalidArgument,
            NavigationError::ProductNotFound(_) => ErrorCode::NotFound,
            NavigationError::LocationNotFound(_) => ErrorCode::NotFound,
            NavigationError::NoPath { .. } => ErrorCode::NoPath,
        }
    }
}

impl From<LocateError> for NavigationError {
    fn from(value: LocateError) -> Self {
        match value {
            LocateError::EmptyQuery => {
                Self::InvalidInput("product query must not be empty".to_string())
            }
            LocateError::NotFound(query) => Self::ProductNotFound(query),
        }
    }
}

impl From<RouteError> for NavigationError {
    fn from(value: RouteError) -> Self {
        match value {
            RouteError::LocationNotFound(id) => Self::LocationNotFound(id),
            RouteError::NoPath { from, to } => Self::NoPath { from, to },
        }
    }
}

/// Product query + start location → directions.
pub struct Navigator<'a> {
    snapshot: &'a VenueSnapshot,
}

impl<'a> Navigator<'a> {
    pub fn new(snapshot: &'a VenueSnapshot) -> Self {
        Self { snapshot }
    }

    /// Resolve the product first; the path finder only runs when it exists.
    pub fn navigate(&self, start: u64, product_query: &str) -> Result<NavigationResult, NavigationError> {
        let found = ProductLocator::new(self.snapshot.catalog()).locate(product_query)?;

        let graph = self.snapshot.graph();
        let route = shortest_path(graph, start, found.location_id)?;

        Ok(NavigationResult {
            product_name: found.product_name,
            target_location_id: found.location_id,
            target_location_name: graph.name_of(found.location_id).into_owned(),
            total_distance: format!("{}m", route.distance),
            path: route.path,
            steps: route.steps,
        })
    }
}
