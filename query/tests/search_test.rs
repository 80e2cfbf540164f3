use ingestion::{CatalogDefinition, Indexer};
use query::{SearchError, SemanticSearch};
use std::sync::Arc;
use storage::VenueSnapshot;
use wayfinder_core::embedding::{
    deterministic_embedding, BoxFuture, DeterministicEmbedder, EmbedError, Embedder, ProviderMode,
};
use wayfinder_core::error::{ErrorCode, WayfinderError};
use wayfinder_core::model::EntityType;

const MARKET_JSON: &str = r#"{
    "lines": [
        {"id": 0, "name": "Entrance", "description": "Main doors"},
        {"id": 1, "name": "Produce", "description": "Fresh fruit and vegetables"},
        {"id": 2, "name": "Bakery", "description": "Bread and pastries"}
    ],
    "products": [
        {"id": 10, "name": "Organic Bananas", "description": "Fair trade bananas", "price": 1.99, "line_id": 1},
        {"id": 11, "name": "Sourdough Loaf", "description": "Baked daily", "price": 4.5, "line_id": 2},
        {"id": 12, "name": "Croissant", "description": "Butter pastry", "price": 1.2, "line_id": 2}
    ],
    "connections": [
        {"source": 0, "target": 1, "distance": 50, "direction": "East"},
        {"source": 1, "target": 2, "distance": 20, "direction": "North"}
    ]
}"#;

async fn snapshot(embedder: &DeterministicEmbedder) -> VenueSnapshot {
    let definition = CatalogDefinition::parse_json(MARKET_JSON).unwrap();
    let indexer = Indexer::new(Arc::new(DeterministicEmbedder::new(
        embedder.model_id(),
        embedder.dims(),
    )));
    VenueSnapshot::build(1, indexer.build(&definition).await.unwrap()).unwrap()
}

struct Unreachable;

impl Embedder for Unreachable {
    fn embed<'a>(&'a self, _text: &'a str) -> BoxFuture<'a, Result<Vec<f32>, EmbedError>> {
        Box::pin(async { Err(EmbedError::Unavailable("timed out".to_string())) })
    }

    fn model_id(&self) -> &str {
        "test-model"
    }

    fn dims(&self) -> usize {
        32
    }

    fn mode(&self) -> ProviderMode {
        ProviderMode::Deterministic
    }
}

#[tokio::test]
async fn exact_text_ranks_its_entity_first_with_unit_score() {
    let embedder = DeterministicEmbedder::new("test-model", 32);
    let snapshot = snapshot(&embedder).await;

    let hits = SemanticSearch::new(&snapshot, &embedder)
        .search("Organic Bananas: Fair trade bananas", 3)
        .await
        .unwrap();

    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].name, "Organic Bananas");
    assert_eq!(hits[0].description, "Fair trade bananas");
    assert_eq!(hits[0].entity_type, EntityType::Product);
    assert!((hits[0].score - 1.0).abs() < 1e-5);
}

#[tokio::test]
async fn results_are_bounded_and_sorted() {
    let embedder = DeterministicEmbedder::new("test-model", 32);
    let snapshot = snapshot(&embedder).await;
    let search = SemanticSearch::new(&snapshot, &embedder);

    for top_k in [1, 2, 6, 50] {
        let hits = search.search("something sweet from the oven", top_k).await.unwrap();
        assert_eq!(hits.len(), top_k.min(6));
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(hits.iter().all(|h| (-1.0 - 1e-6..=1.0 + 1e-6).contains(&h.score)));
    }
}

#[tokio::test]
async fn scores_match_direct_cosine() {
    let embedder = DeterministicEmbedder::new("test-model", 32);
    let snapshot = snapshot(&embedder).await;

    let hits = SemanticSearch::new(&snapshot, &embedder)
        .search("bread", 6)
        .await
        .unwrap();
    let query = deterministic_embedding("bread", "test-model", 32);
    for hit in hits {
        let text = format!("{}: {}", hit.name, hit.description);
        let stored = deterministic_embedding(&text, "test-model", 32);
        let expected = storage::index::cosine_similarity(&query, &stored);
        assert!((hit.score - expected).abs() < 1e-6, "{}", hit.name);
    }
}

#[tokio::test]
async fn invalid_requests_are_rejected_before_encoding() {
    let embedder = DeterministicEmbedder::new("test-model", 32);
    let snapshot = snapshot(&embedder).await;
    let search = SemanticSearch::new(&snapshot, &embedder);

    let err = search.search("   ", 5).await.unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::InvalidArgument);

    let err = search.search("fruit", 0).await.unwrap_err();
    assert!(matches!(err, SearchError::InvalidQuery(_)));
}

#[tokio::test]
async fn provider_outage_is_retryable() {
    let embedder = DeterministicEmbedder::new("test-model", 32);
    let snapshot = snapshot(&embedder).await;

    let err = SemanticSearch::new(&snapshot, &Unreachable)
        .search("fruit", 5)
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::Provider(EmbedError::Unavailable(_))));
    assert_eq!(err.error_code(), ErrorCode::Unavailable);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn query_dimension_mismatch_is_invalid_argument() {
    let embedder = DeterministicEmbedder::new("test-model", 32);
    let snapshot = snapshot(&embedder).await;
    let narrow = DeterministicEmbedder::new("test-model", 8);

    let err = SemanticSearch::new(&snapshot, &narrow)
        .search("fruit", 5)
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::Index(_)));
    assert_eq!(err.error_code(), ErrorCode::InvalidArgument);
}
