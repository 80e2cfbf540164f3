pub mod definition;
pub mod processor;

pub use definition::CatalogDefinition;
pub use processor::{IndexError, Indexer};
