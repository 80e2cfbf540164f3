pub mod dsl;
pub mod locator;
pub mod navigation;
pub mod pathfinder;
pub mod search;
pub mod service;

pub use dsl::{NavigateRequest, SearchRequest};
pub use locator::{LocateError, ProductLocator, ProductMatch};
pub use navigation::{NavigationError, NavigationResult, Navigator};
pub use pathfinder::{shortest_path, Route, RouteError};
pub use search::{SearchError, SearchHit, SemanticSearch};
pub use service::{ServiceError, WayfindingService};
