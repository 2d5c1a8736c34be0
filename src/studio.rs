//! Session service
//!
//! [`Studio`] is built once per session and owns one instance of every
//! component. Callers hold a reference to it instead of reaching for global
//! state: read-only snapshots come from `recommendations`, `benchmarks` and
//! `model_catalog`, and every change goes through one of the imperative
//! triggers.

use crate::benchmark::{BenchmarkOrchestrator, BenchmarkResult, BenchmarkRun};
use crate::catalog::{CatalogItem, FavoritesError, FavoritesStore, ModelCatalog, UseCase};
use crate::config::RouterConfig;
use crate::error::RouterError;
use crate::hardware::{HardwareProbe, HardwareProfile, HardwareProfiler, SystemProbe};
use crate::progress::{NoOpHandler, ProgressHandler};
use crate::providers::{
    default_adapters, EnvCredentials, GenerateResponse, ProviderAdapter, ProviderSnapshot,
};
use crate::recommend::{recommend, Priority, RecommendationSet};
use crate::registry::{DiscoveryTask, ProviderRegistry};
use crate::router::{ActiveModel, FallbackRouter, GenerateOptions};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Preferences {
    use_case: UseCase,
    priority: Priority,
}

pub struct Studio {
    config: RouterConfig,
    hardware: Arc<HardwareProfiler>,
    registry: Arc<ProviderRegistry>,
    catalog: Arc<RwLock<ModelCatalog>>,
    router: FallbackRouter,
    orchestrator: BenchmarkOrchestrator,
    preferences: RwLock<Preferences>,
    recommendations: watch::Sender<Option<RecommendationSet>>,
    benchmarks: watch::Sender<Vec<BenchmarkResult>>,
}

impl Studio {
    pub fn new(
        config: RouterConfig,
        adapters: Vec<Arc<dyn ProviderAdapter>>,
        probe: Arc<dyn HardwareProbe>,
        favorites: FavoritesStore,
    ) -> Self {
        let registry = Arc::new(ProviderRegistry::new(adapters, &config));
        let catalog = Arc::new(RwLock::new(ModelCatalog::with_defaults(favorites)));
        let router = FallbackRouter::new(
            registry.clone(),
            catalog.clone(),
            config.precedence.clone(),
        );
        let orchestrator = BenchmarkOrchestrator::new(registry.clone(), &config);
        let (recommendations, _) = watch::channel(None);
        let (benchmarks, _) = watch::channel(Vec::new());

        Self {
            hardware: Arc::new(HardwareProfiler::new(probe)),
            registry,
            catalog,
            router,
            orchestrator,
            preferences: RwLock::new(Preferences {
                use_case: UseCase::General,
                priority: Priority::Balanced,
            }),
            recommendations,
            benchmarks,
            config,
        }
    }

    /// Live adapters, environment credentials and the system hardware probe
    pub fn from_config(config: RouterConfig) -> Self {
        let adapters = default_adapters(&config, Arc::new(EnvCredentials));
        let favorites = match config.favorites_path() {
            Some(path) => FavoritesStore::load(path),
            None => FavoritesStore::in_memory(),
        };
        Self::new(config, adapters, Arc::new(SystemProbe), favorites)
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    pub fn router(&self) -> &FallbackRouter {
        &self.router
    }

    /// Detects hardware and providers, then picks a default model
    pub async fn start(&self) -> ProviderSnapshot {
        let (_, snapshot) = tokio::join!(self.detect_hardware(), self.registry.discover());
        if self.router.active().is_none() {
            self.router.select_default().await;
        }
        snapshot
    }

    pub async fn detect_hardware(&self) -> HardwareProfile {
        let profiler = self.hardware.clone();
        match tokio::task::spawn_blocking(move || profiler.detect()).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(error = %e, "Hardware detection task failed, retrying inline");
                self.hardware.detect()
            }
        }
    }

    pub fn hardware(&self) -> Option<HardwareProfile> {
        self.hardware.snapshot()
    }

    /// Runs discovery, re-resolves the active model and replaces any
    /// recommendations scored against the previous snapshot.
    pub async fn discover_providers(&self) -> ProviderSnapshot {
        let snapshot = self.registry.discover().await;
        self.router.reconcile().await;

        let stale = self
            .recommendations
            .borrow()
            .as_ref()
            .map(|set| set.is_stale(snapshot.generation))
            .unwrap_or(false);
        if stale {
            debug!(generation = snapshot.generation, "Recomputing stale recommendations");
            self.refresh_recommendations().await;
        }
        snapshot
    }

    pub fn providers(&self) -> ProviderSnapshot {
        self.registry.snapshot()
    }

    pub async fn model_catalog(&self) -> Vec<CatalogItem> {
        let snapshot = self.registry.snapshot();
        self.catalog.read().await.items(&snapshot)
    }

    /// Latest recommendations, `None` if never computed or scored against an
    /// older provider snapshot
    pub fn recommendations(&self) -> Option<RecommendationSet> {
        let generation = self.registry.generation();
        self.recommendations
            .borrow()
            .clone()
            .filter(|set| !set.is_stale(generation))
    }

    pub fn subscribe_recommendations(&self) -> watch::Receiver<Option<RecommendationSet>> {
        self.recommendations.subscribe()
    }

    pub async fn set_preferences(&self, use_case: UseCase, priority: Priority) -> RecommendationSet {
        *self.preferences.write().await = Preferences { use_case, priority };
        self.refresh_recommendations().await
    }

    /// Scores the catalog against the latest snapshots and replaces the
    /// published set wholesale
    pub async fn refresh_recommendations(&self) -> RecommendationSet {
        let prefs = *self.preferences.read().await;
        let snapshot = self.registry.snapshot();
        let entries = self.catalog.read().await.entries(&snapshot);
        let hardware = self.hardware.snapshot();

        let set = recommend(
            prefs.use_case,
            prefs.priority,
            hardware.as_ref(),
            &entries,
            &snapshot,
            self.config.hardware_policy,
        );
        info!(
            use_case = %prefs.use_case,
            priority = %prefs.priority,
            candidates = set.items.len(),
            generation = set.generation,
            "Recommendations refreshed"
        );
        self.recommendations.send_replace(Some(set.clone()));
        set
    }

    pub fn benchmarks(&self) -> Vec<BenchmarkResult> {
        self.benchmarks.borrow().clone()
    }

    pub async fn run_benchmarks(&self, model_ids: &[String]) -> BenchmarkRun {
        self.run_benchmarks_with(model_ids, &CancellationToken::new(), &NoOpHandler)
            .await
    }

    pub async fn run_benchmarks_with(
        &self,
        model_ids: &[String],
        cancel: &CancellationToken,
        progress: &dyn ProgressHandler,
    ) -> BenchmarkRun {
        let snapshot = self.registry.snapshot();
        let entries = self.catalog.read().await.entries(&snapshot);
        let run = self
            .orchestrator
            .run_with(model_ids, &entries, cancel, progress)
            .await;
        self.benchmarks.send_replace(run.results.clone());
        run
    }

    pub async fn generate(
        &self,
        prompt: &str,
        options: GenerateOptions,
    ) -> Result<GenerateResponse, RouterError> {
        self.router.generate(prompt, options).await
    }

    pub async fn switch_to_model(&self, model_id: &str) -> Result<ActiveModel, RouterError> {
        self.router.switch_to_model(model_id).await
    }

    /// Pulls a catalog model through its local provider, then rediscovers so
    /// the catalog sees it as installed
    pub async fn pull_model(&self, model_id: &str) -> Result<(), RouterError> {
        let snapshot = self.registry.snapshot();
        let entry = self
            .catalog
            .read()
            .await
            .find(model_id, &snapshot)
            .ok_or_else(|| RouterError::UnknownModel {
                model: model_id.to_string(),
            })?;

        self.registry.pull_model(&entry).await?;
        self.discover_providers().await;
        Ok(())
    }

    pub async fn cancel_pull(&self, model_id: &str) -> bool {
        self.registry.cancel_pull(model_id).await
    }

    pub async fn toggle_favorite(&self, model_id: &str) -> Result<bool, FavoritesError> {
        self.catalog.write().await.toggle_favorite(model_id)
    }

    /// Keeps provider state fresh in the background until the task is stopped
    pub fn start_periodic_discovery(&self, interval: Duration) -> DiscoveryTask {
        self.registry.spawn_periodic_discovery(interval)
    }
}

impl std::fmt::Debug for Studio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Studio")
            .field("registry", &self.registry)
            .field("router", &self.router)
            .finish()
    }
}
