pub mod catalog;
pub mod index;
pub mod records;
pub mod snapshot;
pub mod venue;

pub use catalog::CatalogStore;
pub use records::{SnapshotManifest, StoreRecords};
pub use snapshot::SnapshotManager;
pub use venue::VenueSnapshot;
