//! Provider discovery, generation dispatch and model pulls
//!
//! [`ProviderRegistry::discover`] probes every adapter concurrently, each under
//! its own timeout, and publishes one [`ProviderSnapshot`] through a `watch`
//! channel. Every call takes a ticket when it starts; a finished probe round is
//! published only if no later-started round has already published, so a slow
//! stale round can never overwrite a fresher one.
//!
//! Pulls run as spawned tasks keyed by model id and never hold up discovery or
//! generation.

use crate::catalog::ModelCatalogEntry;
use crate::config::RouterConfig;
use crate::error::RouterError;
use crate::providers::{
    AdapterError, GenerateRequest, GenerateResponse, Provider, ProviderAdapter, ProviderKind,
    ProviderSnapshot,
};
use chrono::Utc;
use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};
use tokio::task::{AbortHandle, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

type PullOutcome = Option<Result<(), RouterError>>;

struct PullSlot {
    id: u64,
    provider: ProviderKind,
    abort: AbortHandle,
    outcome: watch::Receiver<PullOutcome>,
}

/// Registry of the fixed provider set and their live state
pub struct ProviderRegistry {
    adapters: Vec<Arc<dyn ProviderAdapter>>,
    probe_timeout: Duration,
    generation_timeout: Duration,
    pull_timeout: Duration,
    snapshot: watch::Sender<ProviderSnapshot>,
    next_ticket: AtomicU64,
    published_ticket: AtomicU64,
    next_pull_id: AtomicU64,
    pulls: Arc<Mutex<HashMap<String, PullSlot>>>,
}

impl ProviderRegistry {
    pub fn new(adapters: Vec<Arc<dyn ProviderAdapter>>, config: &RouterConfig) -> Self {
        let (snapshot, _) = watch::channel(ProviderSnapshot::default());
        Self {
            adapters,
            probe_timeout: config.probe_timeout(),
            generation_timeout: config.generation_timeout(),
            pull_timeout: config.pull_timeout(),
            snapshot,
            next_ticket: AtomicU64::new(0),
            published_ticket: AtomicU64::new(0),
            next_pull_id: AtomicU64::new(0),
            pulls: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn kinds(&self) -> Vec<ProviderKind> {
        self.adapters.iter().map(|a| a.kind()).collect()
    }

    pub fn adapter(&self, kind: ProviderKind) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.iter().find(|a| a.kind() == kind).cloned()
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> ProviderSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn generation(&self) -> u64 {
        self.snapshot.borrow().generation
    }

    pub fn subscribe(&self) -> watch::Receiver<ProviderSnapshot> {
        self.snapshot.subscribe()
    }

    /// Probes every provider and publishes the aggregate.
    ///
    /// Returns the snapshot current once this round has finished; if a later
    /// round already published, that fresher snapshot is returned instead.
    pub async fn discover(&self) -> ProviderSnapshot {
        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(ticket, "Starting provider discovery");

        let probes = self
            .adapters
            .iter()
            .map(|adapter| probe(adapter.clone(), self.probe_timeout));
        let providers = join_all(probes).await;

        let published = self.snapshot.send_if_modified(|current| {
            if ticket <= self.published_ticket.load(Ordering::SeqCst) {
                return false;
            }
            self.published_ticket.store(ticket, Ordering::SeqCst);
            *current = ProviderSnapshot {
                generation: current.generation + 1,
                probed_at: Some(Utc::now()),
                providers,
            };
            true
        });

        let snapshot = self.snapshot();
        if published {
            info!(
                generation = snapshot.generation,
                reachable = snapshot.reachable_count(),
                total = snapshot.providers.len(),
                "Provider discovery complete"
            );
        } else {
            debug!(ticket, "Discovery round superseded by a newer one");
        }
        snapshot
    }

    /// Runs one generation call against a specific provider, bounded by the
    /// generation timeout.
    pub async fn generate_with(
        &self,
        kind: ProviderKind,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, RouterError> {
        let adapter = self
            .adapter(kind)
            .ok_or_else(|| RouterError::ProviderUnavailable {
                model: request.model.clone(),
                provider: Some(kind),
            })?;

        debug!(provider = %kind, model = %request.model, "Dispatching generation");
        match tokio::time::timeout(self.generation_timeout, adapter.generate(request)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(RouterError::from_adapter(kind, &request.model, e)),
            Err(_) => Err(RouterError::from_adapter(
                kind,
                &request.model,
                AdapterError::Timeout {
                    millis: self.generation_timeout.as_millis() as u64,
                },
            )),
        }
    }

    /// Starts pulling `pull_name` on `provider` in the background, tracked as
    /// `model_id`. Rejected with `PullInProgress` while an earlier pull of the
    /// same id is in flight.
    pub async fn start_pull(
        &self,
        model_id: &str,
        provider: ProviderKind,
        pull_name: &str,
    ) -> Result<(), RouterError> {
        self.spawn_pull(model_id, provider, pull_name)
            .await
            .map(|_| ())
    }

    async fn spawn_pull(
        &self,
        model_id: &str,
        provider: ProviderKind,
        pull_name: &str,
    ) -> Result<watch::Receiver<PullOutcome>, RouterError> {
        let adapter = self
            .adapter(provider)
            .ok_or_else(|| RouterError::ModelPullFailed {
                model: model_id.to_string(),
                provider,
                reason: "provider is not registered".to_string(),
            })?;

        let mut pulls = self.pulls.lock().await;
        if pulls.contains_key(model_id) {
            return Err(RouterError::PullInProgress {
                model: model_id.to_string(),
            });
        }

        let id = self.next_pull_id.fetch_add(1, Ordering::SeqCst);
        let (outcome_tx, outcome_rx) = watch::channel(None);
        let registry_pulls = self.pulls.clone();
        let model = model_id.to_string();
        let name = pull_name.to_string();
        let timeout = self.pull_timeout;

        info!(model = %model, provider = %provider, "Starting model pull");
        let handle = tokio::spawn(async move {
            let start = Instant::now();
            let result = match tokio::time::timeout(timeout, adapter.pull(&name)).await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(RouterError::ModelPullFailed {
                    model: model.clone(),
                    provider,
                    reason: e.to_string(),
                }),
                Err(_) => Err(RouterError::ModelPullFailed {
                    model: model.clone(),
                    provider,
                    reason: format!("timed out after {}s", timeout.as_secs()),
                }),
            };

            match &result {
                Ok(()) => info!(
                    model = %model,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Model pull complete"
                ),
                Err(e) => warn!(model = %model, error = %e, "Model pull failed"),
            }

            let mut pulls = registry_pulls.lock().await;
            if pulls.get(&model).map(|s| s.id) == Some(id) {
                pulls.remove(&model);
            }
            drop(pulls);
            outcome_tx.send_replace(Some(result));
        });

        pulls.insert(
            model_id.to_string(),
            PullSlot {
                id,
                provider,
                abort: handle.abort_handle(),
                outcome: outcome_rx.clone(),
            },
        );
        Ok(outcome_rx)
    }

    /// Pulls a catalog entry through its owning provider and waits for it
    pub async fn pull_model(&self, entry: &ModelCatalogEntry) -> Result<(), RouterError> {
        let outcome = self
            .spawn_pull(&entry.id, entry.provider, entry.pull_name())
            .await?;
        wait_outcome(&entry.id, outcome).await
    }

    /// Waits for an in-flight pull. Returns `Ok` immediately if none is running.
    pub async fn wait_pull(&self, model_id: &str) -> Result<(), RouterError> {
        let outcome = {
            let pulls = self.pulls.lock().await;
            match pulls.get(model_id) {
                Some(slot) => slot.outcome.clone(),
                None => return Ok(()),
            }
        };
        wait_outcome(model_id, outcome).await
    }

    /// Aborts an in-flight pull. Returns false if none was running.
    pub async fn cancel_pull(&self, model_id: &str) -> bool {
        let slot = self.pulls.lock().await.remove(model_id);
        match slot {
            Some(slot) => {
                slot.abort.abort();
                info!(model = %model_id, provider = %slot.provider, "Model pull cancelled");
                true
            }
            None => false,
        }
    }

    pub async fn is_pulling(&self, model_id: &str) -> bool {
        self.pulls.lock().await.contains_key(model_id)
    }

    pub async fn active_pulls(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.pulls.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Re-runs discovery every `interval` until the returned task is stopped
    pub fn spawn_periodic_discovery(self: &Arc<Self>, interval: Duration) -> DiscoveryTask {
        let token = CancellationToken::new();
        let child = token.clone();
        let registry = Arc::clone(self);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = ticker.tick() => {
                        registry.discover().await;
                    }
                }
            }
            debug!("Periodic discovery stopped");
        });

        DiscoveryTask { token, handle }
    }
}

async fn wait_outcome(
    model_id: &str,
    mut outcome: watch::Receiver<PullOutcome>,
) -> Result<(), RouterError> {
    match outcome.wait_for(|o| o.is_some()).await {
        Ok(value) => value.clone().unwrap_or(Ok(())),
        // Sender dropped without an outcome: the task was aborted
        Err(_) => {
            debug!(model = %model_id, "Pull ended without an outcome");
            Err(RouterError::Cancelled)
        }
    }
}

async fn probe(adapter: Arc<dyn ProviderAdapter>, timeout: Duration) -> Provider {
    let kind = adapter.kind();
    let start = Instant::now();
    match tokio::time::timeout(timeout, adapter.list_models()).await {
        Ok(Ok(models)) => {
            debug!(provider = %kind, models = models.len(), "Provider online");
            Provider::online(kind, models, start.elapsed())
        }
        Ok(Err(e)) => {
            if matches!(e, AdapterError::NotConfigured { .. }) {
                debug!(provider = %kind, "Provider not configured");
            } else {
                debug!(provider = %kind, error = %e, "Provider offline");
            }
            Provider::offline(kind, &e)
        }
        Err(_) => {
            debug!(provider = %kind, "Provider probe timed out");
            Provider::offline(
                kind,
                &AdapterError::Timeout {
                    millis: timeout.as_millis() as u64,
                },
            )
        }
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.kinds())
            .field("generation", &self.generation())
            .finish()
    }
}

/// Stop handle for [`ProviderRegistry::spawn_periodic_discovery`].
///
/// Dropping the handle also stops the loop.
pub struct DiscoveryTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl DiscoveryTask {
    /// Signals the loop and waits for it to exit
    pub async fn stop(mut self) {
        self.token.cancel();
        let _ = (&mut self.handle).await;
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for DiscoveryTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockAdapter;

    fn config() -> RouterConfig {
        RouterConfig {
            probe_timeout_ms: 100,
            generation_timeout_secs: 5,
            pull_timeout_secs: 5,
            ..RouterConfig::default()
        }
    }

    fn registry(adapters: Vec<Arc<MockAdapter>>) -> ProviderRegistry {
        let adapters = adapters
            .into_iter()
            .map(|a| a as Arc<dyn ProviderAdapter>)
            .collect();
        ProviderRegistry::new(adapters, &config())
    }

    #[tokio::test]
    async fn test_discover_marks_reachability() {
        let ollama = Arc::new(MockAdapter::with_models(ProviderKind::Ollama, &["llama3"]));
        let lms = Arc::new(MockAdapter::offline(ProviderKind::LmStudio));
        let reg = registry(vec![ollama, lms]);

        assert_eq!(reg.generation(), 0);
        let snapshot = reg.discover().await;

        assert_eq!(snapshot.generation, 1);
        assert!(snapshot.is_reachable(ProviderKind::Ollama));
        assert!(!snapshot.is_reachable(ProviderKind::LmStudio));
        assert_eq!(snapshot.providers_serving("llama3"), vec![ProviderKind::Ollama]);
    }

    #[tokio::test]
    async fn test_slow_probe_times_out_and_is_retried_next_cycle() {
        let slow = Arc::new(MockAdapter::with_models(ProviderKind::Ollama, &["m"]));
        slow.set_probe_delay(Duration::from_millis(500));
        let reg = registry(vec![slow.clone()]);

        let first = reg.discover().await;
        let provider = first.provider(ProviderKind::Ollama).unwrap();
        assert!(!provider.reachable);
        assert!(provider.error.as_deref().unwrap_or("").contains("timed out"));

        slow.set_probe_delay(Duration::ZERO);
        let second = reg.discover().await;
        assert!(second.is_reachable(ProviderKind::Ollama));
        assert_eq!(slow.probe_count(), 2);
    }

    #[tokio::test]
    async fn test_stale_round_never_overwrites_newer_one() {
        let adapter = Arc::new(MockAdapter::with_models(ProviderKind::Ollama, &["old"]));
        adapter.set_probe_delay(Duration::from_millis(60));
        let reg = Arc::new(registry(vec![adapter.clone()]));

        let stale = {
            let reg = reg.clone();
            tokio::spawn(async move { reg.discover().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        adapter.set_probe_delay(Duration::ZERO);
        adapter.set_models(vec!["new".to_string()]);
        let fresh = reg.discover().await;
        assert!(fresh.is_served("new"));

        let after_stale = stale.await.unwrap();
        assert!(after_stale.is_served("new"));
        assert!(!reg.snapshot().is_served("old"));
        assert_eq!(reg.generation(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_pull_rejected_while_in_flight() {
        let ollama = Arc::new(MockAdapter::with_models(ProviderKind::Ollama, &[]));
        ollama.set_pull_delay(Duration::from_millis(100));
        let reg = registry(vec![ollama.clone()]);

        reg.start_pull("phi3", ProviderKind::Ollama, "phi3").await.unwrap();
        let err = reg
            .start_pull("phi3", ProviderKind::Ollama, "phi3")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RouterError::PullInProgress {
                model: "phi3".to_string()
            }
        );

        // Discovery is not blocked by the running pull
        let snapshot = reg.discover().await;
        assert!(snapshot.is_reachable(ProviderKind::Ollama));

        reg.wait_pull("phi3").await.unwrap();
        assert!(!reg.is_pulling("phi3").await);
        assert!(reg.discover().await.is_served("phi3"));
    }

    #[tokio::test]
    async fn test_cancel_pull() {
        let ollama = Arc::new(MockAdapter::with_models(ProviderKind::Ollama, &[]));
        ollama.set_pull_delay(Duration::from_secs(10));
        let reg = registry(vec![ollama]);

        reg.start_pull("big", ProviderKind::Ollama, "big").await.unwrap();
        assert_eq!(reg.active_pulls().await, vec!["big".to_string()]);
        assert!(reg.cancel_pull("big").await);
        assert!(!reg.cancel_pull("big").await);
        assert!(!reg.is_pulling("big").await);
    }

    #[tokio::test]
    async fn test_failed_pull_reports_model_and_provider() {
        let ollama = Arc::new(MockAdapter::with_models(ProviderKind::Ollama, &[]));
        ollama.set_pull_result(Err(AdapterError::Api {
            status: 500,
            message: "disk full".to_string(),
        }));
        ollama.set_pull_delay(Duration::from_millis(50));
        let reg = registry(vec![ollama]);

        reg.start_pull("phi3", ProviderKind::Ollama, "phi3").await.unwrap();
        let err = reg.wait_pull("phi3").await.unwrap_err();
        assert!(matches!(
            err,
            RouterError::ModelPullFailed {
                ref model,
                provider: ProviderKind::Ollama,
                ..
            } if model == "phi3"
        ));
        assert!(!reg.is_pulling("phi3").await);

        let entry = ModelCatalogEntry::discovered(ProviderKind::Ollama, "phi3");
        let err = reg.pull_model(&entry).await.unwrap_err();
        assert!(matches!(err, RouterError::ModelPullFailed { .. }));
    }

    #[tokio::test]
    async fn test_generate_with_maps_offline_to_unreachable() {
        let groq = Arc::new(MockAdapter::offline(ProviderKind::Groq));
        let reg = registry(vec![groq]);

        let err = reg
            .generate_with(ProviderKind::Groq, &GenerateRequest::new("llama-3.1-8b", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::ProviderUnreachable { .. }));

        let err = reg
            .generate_with(ProviderKind::OpenAI, &GenerateRequest::new("gpt-4o", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::ProviderUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_periodic_discovery_stops() {
        let ollama = Arc::new(MockAdapter::with_models(ProviderKind::Ollama, &["m"]));
        let reg = Arc::new(registry(vec![ollama.clone()]));

        let task = reg.spawn_periodic_discovery(Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(70)).await;
        assert!(task.is_running());
        task.stop().await;

        let probes = ollama.probe_count();
        assert!(probes >= 2);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(ollama.probe_count(), probes);
    }
}
