use ingestion::{CatalogDefinition, Indexer};
use query::{NavigationError, SearchError, ServiceError, WayfindingService};
use std::path::Path;
use std::sync::Arc;
use storage::snapshot::{SnapshotError, SnapshotManager};
use storage::venue::BuildError;
use storage::VenueSnapshot;
use tempfile::tempdir;
use wayfinder_core::config::{AppConfig, EmbeddingConfig, SearchConfig, StoreConfig};
use wayfinder_core::embedding::{
    BoxFuture, DeterministicEmbedder, EmbedError, Embedder, ProviderMode, RandomStubEmbedder,
};
use wayfinder_core::error::{ErrorCode, WayfinderError};

fn market_json(produce_name: &str) -> String {
    format!(
        r#"{{
            "lines": [
                {{"id": 0, "name": "Entrance", "description": "Main doors"}},
                {{"id": 1, "name": "{}", "description": "Fruit and vegetables"}}
            ],
            "products": [
                {{"id": 1, "name": "Organic Bananas", "description": "Fair trade", "price": 1.99, "line_id": 1}}
            ],
            "connections": [
                {{"source": 0, "target": 1, "distance": 50, "direction": "East"}}
            ]
        }}"#,
        produce_name
    )
}

fn embedder() -> Arc<dyn Embedder> {
    Arc::new(DeterministicEmbedder::new("test-model", 16))
}

/// Declares the same provider the snapshots are built with but never answers.
struct Unreachable;

impl Embedder for Unreachable {
    fn embed<'a>(&'a self, _text: &'a str) -> BoxFuture<'a, Result<Vec<f32>, EmbedError>> {
        Box::pin(async { Err(EmbedError::Unavailable("connection refused".to_string())) })
    }

    fn model_id(&self) -> &str {
        "test-model"
    }

    fn dims(&self) -> usize {
        16
    }

    fn mode(&self) -> ProviderMode {
        ProviderMode::Deterministic
    }
}

fn config(dir: &Path) -> AppConfig {
    AppConfig {
        store: StoreConfig {
            snapshot_dir: dir.to_string_lossy().into_owned(),
        },
        embedding: EmbeddingConfig {
            model_id: "test-model".to_string(),
            dims: 16,
            ..EmbeddingConfig::default()
        },
        search: SearchConfig {
            default_top_k: 2,
            max_top_k: 4,
        },
    }
}

async fn publish(dir: &Path, embedder: Arc<dyn Embedder>, produce_name: &str) -> u64 {
    let definition = CatalogDefinition::parse_json(&market_json(produce_name)).unwrap();
    let records = Indexer::new(embedder).build(&definition).await.unwrap();
    SnapshotManager::new(dir).publish(&records).await.unwrap().0
}

#[tokio::test]
async fn open_fails_fast_without_a_snapshot() {
    let dir = tempdir().unwrap();

    let err = WayfindingService::open(&config(dir.path()), embedder())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, ServiceError::Snapshot(SnapshotError::Missing(_))));
    assert_eq!(err.error_code(), ErrorCode::FailedPrecondition);
}

#[tokio::test]
async fn open_refuses_stub_vectors_under_a_production_provider() {
    let dir = tempdir().unwrap();
    publish(dir.path(), Arc::new(RandomStubEmbedder::new("test-model", 16)), "Produce").await;

    let err = WayfindingService::open(&config(dir.path()), embedder())
        .await
        .err()
        .unwrap();
    assert!(matches!(
        err,
        ServiceError::Build(BuildError::ProviderMismatch { .. })
    ));
}

#[tokio::test]
async fn open_fails_fast_when_provider_is_unreachable() {
    let dir = tempdir().unwrap();
    publish(dir.path(), embedder(), "Produce").await;

    let err = WayfindingService::open(&config(dir.path()), Arc::new(Unreachable))
        .await
        .err()
        .unwrap();
    assert!(matches!(
        err,
        ServiceError::Provider(EmbedError::Unavailable(_))
    ));
    assert_eq!(err.error_code(), ErrorCode::Unavailable);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn from_config_builds_the_configured_provider() {
    let dir = tempdir().unwrap();
    publish(dir.path(), embedder(), "Produce").await;

    let service = WayfindingService::from_config(&config(dir.path()))
        .await
        .unwrap();
    let nav = service.navigate(0, "bananas").await.unwrap();
    assert_eq!(nav.target_location_name, "Produce");

    let mut stub = config(dir.path());
    stub.embedding.mode = ProviderMode::RandomStub;
    let err = WayfindingService::from_config(&stub).await.err().unwrap();
    assert!(matches!(
        err,
        ServiceError::Build(BuildError::ProviderMismatch { .. })
    ));
}

#[tokio::test]
async fn open_serves_navigate_locate_and_search() {
    let dir = tempdir().unwrap();
    publish(dir.path(), embedder(), "Produce").await;
    let service = WayfindingService::open(&config(dir.path()), embedder())
        .await
        .unwrap();

    let nav = service.navigate(0, "organic bananas").await.unwrap();
    assert_eq!(nav.target_location_name, "Produce");
    assert_eq!(nav.total_distance, "50m");
    assert_eq!(nav.steps, vec!["Go East for 50m to Produce"]);

    let found = service.locate("banana").await.unwrap();
    assert_eq!(found.location_id, 1);

    let lines = service.matching_locations("where are the bananas").await.unwrap();
    assert!(lines.is_empty());
    let lines = service.matching_locations("banana").await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].name, "Produce");

    let hits = service.search("Entrance: Main doors", None).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].name, "Entrance");

    let err = service.search("fruit", Some(5)).await.unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::InvalidArgument);

    let metrics = service.metrics();
    assert_eq!(metrics.navigations, 1);
    assert_eq!(metrics.locates, 3);
    assert_eq!(metrics.searches, 2);
    assert_eq!(metrics.failures.get("INVALID_ARGUMENT"), Some(&1));
}

#[tokio::test]
async fn json_requests_map_to_typed_errors() {
    let dir = tempdir().unwrap();
    publish(dir.path(), embedder(), "Produce").await;
    let service = WayfindingService::open(&config(dir.path()), embedder())
        .await
        .unwrap();

    let nav = service
        .navigate_json(r#"{"start": 0, "query": "Bananas"}"#)
        .await
        .unwrap();
    assert_eq!(nav.product_name, "Organic Bananas");

    let err = service.navigate_json(r#"{"start": "zero"}"#).await.unwrap_err();
    assert!(matches!(err, NavigationError::InvalidInput(_)));

    let err = service
        .navigate_json(r#"{"start": 0, "query": "kiwi"}"#)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::NotFound);

    let hits = service
        .search_json(r#"{"query": "fruit", "top_k": 3}"#)
        .await
        .unwrap();
    assert_eq!(hits.len(), 3);

    let err = service
        .search_json(r#"{"query": "fruit", "top_k": 0}"#)
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::InvalidQuery(_)));
}

#[tokio::test]
async fn malformed_json_requests_are_counted_as_failures() {
    let dir = tempdir().unwrap();
    publish(dir.path(), embedder(), "Produce").await;
    let service = WayfindingService::open(&config(dir.path()), embedder())
        .await
        .unwrap();

    assert!(service.navigate_json("{not json").await.is_err());
    assert!(service
        .navigate_json(r#"{"start": 0, "query": "  "}"#)
        .await
        .is_err());
    assert!(service.search_json(r#"{"top_k": 2}"#).await.is_err());

    let metrics = service.metrics();
    assert_eq!(metrics.navigations, 2);
    assert_eq!(metrics.searches, 1);
    assert_eq!(metrics.total_queries, 3);
    assert_eq!(metrics.failures.get("INVALID_ARGUMENT"), Some(&3));
}

#[tokio::test]
async fn reload_swaps_atomically_and_keeps_in_flight_readers_on_old_snapshot() {
    let dir = tempdir().unwrap();
    publish(dir.path(), embedder(), "Produce").await;
    let service = WayfindingService::open(&config(dir.path()), embedder())
        .await
        .unwrap();

    let before = service.current().await;
    assert_eq!(before.version(), 1);

    publish(dir.path(), embedder(), "Fresh Produce").await;
    assert_eq!(service.reload().await.unwrap(), 2);

    // A reader that grabbed the old Arc still sees a consistent old world.
    assert_eq!(before.graph().name_of(1), "Produce");

    let nav = service.navigate(0, "bananas").await.unwrap();
    assert_eq!(nav.target_location_name, "Fresh Produce");
    assert_eq!(nav.steps, vec!["Go East for 50m to Fresh Produce"]);
    assert_eq!(service.metrics().snapshot_swaps, 1);

    // Nothing newer on disk: the live snapshot stays and no swap happens.
    assert_eq!(service.reload().await.unwrap(), 2);
    assert_eq!(service.metrics().snapshot_swaps, 1);
}

#[tokio::test]
async fn failed_reload_keeps_the_live_snapshot() {
    let dir = tempdir().unwrap();
    publish(dir.path(), embedder(), "Produce").await;
    let service = WayfindingService::open(&config(dir.path()), embedder())
        .await
        .unwrap();

    tokio::fs::write(dir.path().join("snapshot_00000000000000000002.rkyv"), b"garbage")
        .await
        .unwrap();

    let err = service.reload().await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Snapshot(SnapshotError::Corrupt { .. })
    ));
    assert_eq!(service.current().await.version(), 1);
    assert!(service.navigate(0, "bananas").await.is_ok());
}

#[tokio::test]
async fn fixture_services_cannot_reload_but_can_swap() {
    let definition = CatalogDefinition::parse_json(&market_json("Produce")).unwrap();
    let records = Indexer::new(embedder()).build(&definition).await.unwrap();
    let snapshot = VenueSnapshot::build(7, records.clone()).unwrap();

    let service =
        WayfindingService::from_snapshot(snapshot, embedder(), SearchConfig::default()).unwrap();
    assert!(matches!(
        service.reload().await,
        Err(ServiceError::NoSnapshotSource)
    ));

    let replacement = VenueSnapshot::build(8, records).unwrap();
    assert_eq!(service.swap(replacement).await.unwrap(), 7);
    assert_eq!(service.current().await.version(), 8);
}

#[tokio::test]
async fn swap_never_moves_back_to_an_older_version() {
    let definition = CatalogDefinition::parse_json(&market_json("Produce")).unwrap();
    let records = Indexer::new(embedder()).build(&definition).await.unwrap();
    let service = WayfindingService::from_snapshot(
        VenueSnapshot::build(3, records.clone()).unwrap(),
        embedder(),
        SearchConfig::default(),
    )
    .unwrap();

    for stale in [2, 3] {
        let err = service
            .swap(VenueSnapshot::build(stale, records.clone()).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::StaleSnapshot { live: 3, offered } if offered == stale
        ));
        assert_eq!(err.error_code(), ErrorCode::FailedPrecondition);
    }
    assert_eq!(service.current().await.version(), 3);
    assert_eq!(service.metrics().snapshot_swaps, 0);
}
