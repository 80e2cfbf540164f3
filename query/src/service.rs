use crate::dsl::{NavigateRequest, SearchRequest};
use crate::locator::{LocateError, ProductLocator, ProductMatch};
use crate::navigation::{NavigationError, NavigationResult, Navigator};
use crate::search::{SearchError, SearchHit, SemanticSearch};
use std::sync::Arc;
use std::time::Instant;
use storage::snapshot::{SnapshotError, SnapshotManager};
use storage::venue::BuildError;
use storage::VenueSnapshot;
use thiserror::Error;
use tokio::sync::RwLock;
use wayfinder_core::config::{AppConfig, SearchConfig};
use wayfinder_core::embedding::{embed_checked, embedder_from_config, EmbedError, Embedder};
use wayfinder_core::error::{ErrorCode, WayfinderError};
use wayfinder_core::metrics::{MetricsCollector, MetricsSnapshot, QueryKind};
use wayfinder_core::model::Location;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("snapshot rejected: {0}")]
    Build(#[from] BuildError),
    #[error("embedding provider failed readiness check: {0}")]
    Provider(#[from] EmbedError),
    #[error("snapshot version {offered} is not newer than live version {live}")]
    StaleSnapshot { live: u64, offered: u64 },
    #[error("service was not opened from a snapshot directory")]
    NoSnapshotSource,
}

const READINESS_TEXT: &str = "wayfinder readiness check";

impl WayfinderError for ServiceError {
    fn error_code(&self) -> ErrorCode {
        match self {
            ServiceError::Snapshot(err) => err.error_code(),
            ServiceError::Build(err) => err.error_code(),
            ServiceError::Provider(err) => err.error_code(),
            ServiceError::StaleSnapshot { .. } | ServiceError::NoSnapshotSource => {
                ErrorCode::FailedPrecondition
            }
        }
    }
}

/// Entry point for request handlers. Holds the live snapshot behind an
/// `Arc`; readers clone the `Arc` and never block a swap for longer than
/// the pointer copy.
pub struct WayfindingService {
    snapshot: RwLock<Arc<VenueSnapshot>>,
    snapshots: Option<SnapshotManager>,
    embedder: Arc<dyn Embedder>,
    search_config: SearchConfig,
    metrics: MetricsCollector,
}

impl WayfindingService {
    /// Build the provider named by `config.embedding` and open with it.
    pub async fn from_config(config: &AppConfig) -> Result<Self, ServiceError> {
        Self::open(config, embedder_from_config(&config.embedding)).await
    }

    /// Load the latest persisted snapshot. Fails when none exists, when it
    /// was embedded by a different provider than `embedder`, or when the
    /// provider cannot embed a query.
    pub async fn open(config: &AppConfig, embedder: Arc<dyn Embedder>) -> Result<Self, ServiceError> {
        let manager = SnapshotManager::new(&config.store.snapshot_dir);
        let snapshot = load_snapshot(&manager, embedder.as_ref()).await?;

        if let Err(err) = embed_checked(embedder.as_ref(), READINESS_TEXT).await {
            tracing::error!(
                model_id = embedder.model_id(),
                error = %err,
                "embedding provider not ready"
            );
            return Err(err.into());
        }

        tracing::info!(
            version = snapshot.version(),
            dir = %manager.dir().display(),
            mode = %embedder.mode(),
            "wayfinding service ready"
        );

        Ok(Self {
            snapshot: RwLock::new(Arc::new(snapshot)),
            snapshots: Some(manager),
            embedder,
            search_config: config.search.clone(),
            metrics: MetricsCollector::default(),
        })
    }

    /// Serve a snapshot built elsewhere (fixtures, embedded deployments).
    pub fn from_snapshot(
        snapshot: VenueSnapshot,
        embedder: Arc<dyn Embedder>,
        search_config: SearchConfig,
    ) -> Result<Self, ServiceError> {
        snapshot.ensure_provider(embedder.mode(), embedder.model_id(), embedder.dims())?;
        Ok(Self {
            snapshot: RwLock::new(Arc::new(snapshot)),
            snapshots: None,
            embedder,
            search_config,
            metrics: MetricsCollector::default(),
        })
    }

    pub async fn current(&self) -> Arc<VenueSnapshot> {
        self.snapshot.read().await.clone()
    }

    /// Install a fully built snapshot. Returns the replaced version. Versions
    /// only move forward; an older or equal version is refused.
    pub async fn swap(&self, snapshot: VenueSnapshot) -> Result<u64, ServiceError> {
        snapshot.ensure_provider(
            self.embedder.mode(),
            self.embedder.model_id(),
            self.embedder.dims(),
        )?;
        let next_version = snapshot.version();
        let next = Arc::new(snapshot);

        let previous = {
            let mut live = self.snapshot.write().await;
            if next_version <= live.version() {
                tracing::warn!(
                    live = live.version(),
                    offered = next_version,
                    "refusing to swap in a stale snapshot"
                );
                return Err(ServiceError::StaleSnapshot {
                    live: live.version(),
                    offered: next_version,
                });
            }
            std::mem::replace(&mut *live, next)
        };

        self.metrics.record_snapshot_swap();
        tracing::info!(
            from = previous.version(),
            to = next_version,
            "snapshot swapped"
        );
        Ok(previous.version())
    }

    /// Rebuild from the newest file on disk and swap it in. Returns the live
    /// version afterwards. On failure the live snapshot stays in place; a
    /// snapshot no newer than the live one is left alone.
    pub async fn reload(&self) -> Result<u64, ServiceError> {
        let manager = self
            .snapshots
            .as_ref()
            .ok_or(ServiceError::NoSnapshotSource)?;
        let snapshot = match load_snapshot(manager, self.embedder.as_ref()).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(error = %err, "snapshot reload failed; keeping live snapshot");
                return Err(err);
            }
        };
        let version = snapshot.version();
        let live = self.current().await.version();
        if version <= live {
            tracing::debug!(live, found = version, "no newer snapshot to load");
            return Ok(live);
        }

        // A concurrent reload may have installed a newer version meanwhile.
        match self.swap(snapshot).await {
            Ok(_) => Ok(version),
            Err(ServiceError::StaleSnapshot { live, .. }) => Ok(live),
            Err(err) => Err(err),
        }
    }

    pub async fn navigate(
        &self,
        start: u64,
        product_query: &str,
    ) -> Result<NavigationResult, NavigationError> {
        let started = Instant::now();
        let snapshot = self.current().await;
        let result = Navigator::new(&snapshot).navigate(start, product_query);

        match &result {
            Ok(found) => tracing::debug!(
                start,
                target = found.target_location_id,
                distance = %found.total_distance,
                "navigation resolved"
            ),
            Err(err) => tracing::info!(start, query = product_query, error = %err, "navigation failed"),
        }
        self.record(QueryKind::Navigate, started, result.as_ref().err());
        result
    }

    pub async fn navigate_json(&self, raw: &str) -> Result<NavigationResult, NavigationError> {
        let started = Instant::now();
        let parsed = NavigateRequest::parse_json(raw)
            .map_err(|err| NavigationError::InvalidInput(err.to_string()))
            .and_then(|request| {
                request
                    .validate()
                    .map_err(|err| NavigationError::InvalidInput(err.to_string()))?;
                Ok(request)
            });

        match parsed {
            Ok(request) => self.navigate(request.start, &request.query).await,
            Err(err) => {
                tracing::info!(error = %err, "navigation request rejected");
                self.record(QueryKind::Navigate, started, Some(&err));
                Err(err)
            }
        }
    }

    pub async fn locate(&self, product_query: &str) -> Result<ProductMatch, LocateError> {
        let started = Instant::now();
        let snapshot = self.current().await;
        let result = ProductLocator::new(snapshot.catalog()).locate(product_query);
        self.record(QueryKind::Locate, started, result.as_ref().err());
        result
    }

    /// Locations whose name or products overlap the free-text question.
    pub async fn matching_locations(&self, query: &str) -> Result<Vec<Location>, LocateError> {
        let started = Instant::now();
        let snapshot = self.current().await;
        let result = ProductLocator::new(snapshot.catalog())
            .matching_locations(query)
            .map(|found| found.into_iter().cloned().collect());
        self.record(QueryKind::Locate, started, result.as_ref().err());
        result
    }

    /// `top_k` defaults to the configured value and may not exceed the
    /// configured maximum.
    pub async fn search(
        &self,
        query: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let request = SearchRequest {
            query: query.to_string(),
            top_k,
        };
        self.execute_search(Instant::now(), &request).await
    }

    pub async fn search_json(&self, raw: &str) -> Result<Vec<SearchHit>, SearchError> {
        let started = Instant::now();
        match SearchRequest::parse_json(raw) {
            Ok(request) => self.execute_search(started, &request).await,
            Err(err) => {
                let err = SearchError::InvalidQuery(err.to_string());
                tracing::info!(error = %err, "search request rejected");
                self.record(QueryKind::Search, started, Some(&err));
                Err(err)
            }
        }
    }

    async fn execute_search(
        &self,
        started: Instant,
        request: &SearchRequest,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let result = self.run_search(request).await;

        if let Err(err) = &result {
            if err.is_retryable() {
                tracing::warn!(error = %err, "search failed; provider unavailable");
            } else {
                tracing::info!(error = %err, "search rejected");
            }
        }
        self.record(QueryKind::Search, started, result.as_ref().err());
        result
    }

    async fn run_search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, SearchError> {
        request
            .validate(self.search_config.max_top_k)
            .map_err(|err| SearchError::InvalidQuery(err.to_string()))?;
        let top_k = request.effective_top_k(self.search_config.default_top_k);

        // Clone the Arc so a concurrent swap never waits on the provider call.
        let snapshot = self.current().await;
        SemanticSearch::new(&snapshot, self.embedder.as_ref())
            .search(&request.query, top_k)
            .await
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn record<E: WayfinderError>(&self, kind: QueryKind, started: Instant, err: Option<&E>) {
        let latency_us = started.elapsed().as_micros() as u64;
        self.metrics
            .record_query(kind, latency_us, err.map(|e| e.error_code()));
    }
}

async fn load_snapshot(
    manager: &SnapshotManager,
    embedder: &dyn Embedder,
) -> Result<VenueSnapshot, ServiceError> {
    let (version, records) = manager.load_latest().await?;
    let snapshot = VenueSnapshot::build(version, records)?;
    snapshot.ensure_provider(embedder.mode(), embedder.model_id(), embedder.dims())?;
    Ok(snapshot)
}
