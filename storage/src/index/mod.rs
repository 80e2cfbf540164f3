pub mod ann;
pub mod graph;

pub use ann::{cosine_similarity, LinearAnnIndex, ScoredEntity};
pub use graph::{GraphEdge, VenueGraph};
