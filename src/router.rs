//! Active model selection and fallback routing
//!
//! The router owns the single active model. Every generation call goes through
//! [`FallbackRouter::generate`], which tries the active model first and then
//! walks the precedence chain one provider at a time until a call succeeds.
//!
//! ```text
//! Idle ──select──▶ Active ──call fails──▶ Degraded ──next succeeds──▶ Active(next)
//!                                            │
//!                                            └──chain exhausted──▶ Failed
//! ```

use crate::catalog::{ModelCatalog, ModelCatalogEntry};
use crate::error::{FailedAttempt, RouterError};
use crate::providers::{GenerateRequest, GenerateResponse, ProviderKind, ProviderSnapshot};
use crate::registry::ProviderRegistry;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::{debug, error, info, warn};

/// Fallback order when none is configured: local runtimes first, then cloud
pub const DEFAULT_PRECEDENCE: [ProviderKind; 6] = [
    ProviderKind::Ollama,
    ProviderKind::LmStudio,
    ProviderKind::Anthropic,
    ProviderKind::OpenAI,
    ProviderKind::Gemini,
    ProviderKind::Groq,
];

/// Model and provider currently serving generation calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveModel {
    pub model_id: String,
    pub provider: ProviderKind,
}

impl std::fmt::Display for ActiveModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} via {}", self.model_id, self.provider)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouterStatus {
    Idle,
    Active,
    /// The active provider failed and the chain is being walked
    Degraded,
    /// The last call exhausted the chain or hit a non-retryable error
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouterState {
    pub status: RouterStatus,
    pub active: Option<ActiveModel>,
}

impl Default for RouterState {
    fn default() -> Self {
        Self {
            status: RouterStatus::Idle,
            active: None,
        }
    }
}

/// Per-call options for [`FallbackRouter::generate`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateOptions {
    /// Model to try first instead of the active one
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl GenerateOptions {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

pub struct FallbackRouter {
    registry: Arc<ProviderRegistry>,
    catalog: Arc<RwLock<ModelCatalog>>,
    precedence: Vec<ProviderKind>,
    state: watch::Sender<RouterState>,
}

impl FallbackRouter {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        catalog: Arc<RwLock<ModelCatalog>>,
        precedence: Vec<ProviderKind>,
    ) -> Self {
        let (state, _) = watch::channel(RouterState::default());
        Self {
            registry,
            catalog,
            precedence,
            state,
        }
    }

    pub fn precedence(&self) -> &[ProviderKind] {
        &self.precedence
    }

    pub fn state(&self) -> RouterState {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> RouterStatus {
        self.state.borrow().status
    }

    pub fn active(&self) -> Option<ActiveModel> {
        self.state.borrow().active.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RouterState> {
        self.state.subscribe()
    }

    /// Makes `model_id` active, bypassing precedence.
    ///
    /// Fails with `ProviderUnavailable` when no reachable provider serves the
    /// model; the previous selection is left untouched.
    pub async fn switch_to_model(&self, model_id: &str) -> Result<ActiveModel, RouterError> {
        let snapshot = self.registry.snapshot();
        let entries = self.catalog.read().await.entries(&snapshot);
        let providers = serving(model_id, &entries, &snapshot)?;

        let Some(provider) = self.preferred(&providers) else {
            let owner = entries
                .iter()
                .find(|e| e.id == model_id)
                .map(|e| e.provider);
            warn!(model = %model_id, "Cannot switch: no reachable provider serves the model");
            return Err(RouterError::ProviderUnavailable {
                model: model_id.to_string(),
                provider: owner,
            });
        };

        let active = ActiveModel {
            model_id: model_id.to_string(),
            provider,
        };
        info!(active = %active, "Switched active model");
        self.set_active(active.clone());
        Ok(active)
    }

    /// Picks the first listed model of the first reachable provider in
    /// precedence order and makes it active. Goes idle if nothing is served.
    pub async fn select_default(&self) -> Option<ActiveModel> {
        let snapshot = self.registry.snapshot();
        let entries = self.catalog.read().await.entries(&snapshot);
        let selected = self.first_candidate(&entries, &snapshot);

        match &selected {
            Some(active) => {
                info!(active = %active, "Auto-selected model");
                self.set_active(active.clone());
            }
            None => {
                debug!("No reachable provider serves any model");
                self.state.send_replace(RouterState::default());
            }
        }
        selected
    }

    /// Re-resolves the active model if its provider dropped out of the latest
    /// snapshot. Call after every discovery.
    pub async fn reconcile(&self) -> Option<ActiveModel> {
        let active = self.active()?;
        let snapshot = self.registry.snapshot();
        let entries = self.catalog.read().await.entries(&snapshot);
        if still_served(&active, &entries, &snapshot) {
            return Some(active);
        }
        warn!(active = %active, "Active provider no longer reachable, re-resolving");
        self.select_default().await
    }

    /// Serves one generation call, falling back along the precedence chain.
    ///
    /// On success the provider that answered becomes active. If every
    /// candidate fails, returns `AllProvidersExhausted` and keeps the prior
    /// active model. A non-retryable error ends the chain early; either way
    /// the status ends `Failed`.
    pub async fn generate(
        &self,
        prompt: &str,
        options: GenerateOptions,
    ) -> Result<GenerateResponse, RouterError> {
        let snapshot = self.registry.snapshot();
        let entries = self.catalog.read().await.entries(&snapshot);

        let primary = match &options.model {
            Some(model) => {
                serving(model, &entries, &snapshot)?;
                self.resolve(model, &entries, &snapshot)
            }
            None => self.current_or_reselect(&entries, &snapshot),
        };

        let chain = self.candidate_chain(primary, &entries, &snapshot);
        debug!(candidates = chain.len(), "Built fallback chain");

        let mut attempts = Vec::new();
        for (index, candidate) in chain.into_iter().enumerate() {
            let mut request = GenerateRequest::new(candidate.model_id.clone(), prompt);
            request.temperature = options.temperature;
            request.max_tokens = options.max_tokens;

            match self.registry.generate_with(candidate.provider, &request).await {
                Ok(response) => {
                    if index > 0 {
                        info!(active = %candidate, "Fallback candidate succeeded");
                    }
                    self.set_active(candidate);
                    return Ok(response);
                }
                Err(e) if !e.is_retryable() => {
                    warn!(candidate = %candidate, error = %e, "Non-retryable failure");
                    self.state.send_modify(|s| s.status = RouterStatus::Failed);
                    return Err(e);
                }
                Err(e) => {
                    warn!(candidate = %candidate, error = %e, "Generation attempt failed");
                    if index == 0 {
                        self.state.send_modify(|s| s.status = RouterStatus::Degraded);
                    }
                    attempts.push(FailedAttempt {
                        provider: candidate.provider,
                        model: candidate.model_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        error!(attempts = attempts.len(), "All providers exhausted");
        self.state.send_modify(|s| s.status = RouterStatus::Failed);
        Err(RouterError::AllProvidersExhausted { attempts })
    }

    fn set_active(&self, active: ActiveModel) {
        self.state.send_replace(RouterState {
            status: RouterStatus::Active,
            active: Some(active),
        });
    }

    /// Active model if still reachable, otherwise a fresh auto-selection
    fn current_or_reselect(
        &self,
        entries: &[ModelCatalogEntry],
        snapshot: &ProviderSnapshot,
    ) -> Option<ActiveModel> {
        match self.active() {
            Some(active) if still_served(&active, entries, snapshot) => Some(active),
            Some(active) => {
                warn!(active = %active, "Active provider offline, re-resolving before call");
                self.first_candidate(entries, snapshot)
            }
            None => self.first_candidate(entries, snapshot),
        }
    }

    fn resolve(
        &self,
        model_id: &str,
        entries: &[ModelCatalogEntry],
        snapshot: &ProviderSnapshot,
    ) -> Option<ActiveModel> {
        let providers = serving(model_id, entries, snapshot).ok()?;
        self.preferred(&providers).map(|provider| ActiveModel {
            model_id: model_id.to_string(),
            provider,
        })
    }

    /// Owning provider first if it is in the chain, else precedence order
    fn preferred(&self, providers: &[ProviderKind]) -> Option<ProviderKind> {
        providers
            .first()
            .copied()
            .filter(|k| self.precedence.contains(k))
            .or_else(|| {
                self.precedence
                    .iter()
                    .copied()
                    .find(|k| providers.contains(k))
            })
    }

    fn first_candidate(
        &self,
        entries: &[ModelCatalogEntry],
        snapshot: &ProviderSnapshot,
    ) -> Option<ActiveModel> {
        self.precedence
            .iter()
            .copied()
            .find_map(|kind| model_for_provider(kind, None, entries, snapshot))
    }

    /// Primary first, then one candidate per other reachable provider in
    /// precedence order. A provider appears at most once.
    fn candidate_chain(
        &self,
        primary: Option<ActiveModel>,
        entries: &[ModelCatalogEntry],
        snapshot: &ProviderSnapshot,
    ) -> Vec<ActiveModel> {
        let preferred_model = primary.as_ref().map(|p| p.model_id.clone());
        let mut chain: Vec<ActiveModel> = primary.into_iter().collect();

        for kind in self.precedence.iter().copied() {
            if chain.iter().any(|c| c.provider == kind) {
                continue;
            }
            if let Some(candidate) =
                model_for_provider(kind, preferred_model.as_deref(), entries, snapshot)
            {
                chain.push(candidate);
            }
        }
        chain
    }
}

impl std::fmt::Debug for FallbackRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackRouter")
            .field("precedence", &self.precedence)
            .field("state", &*self.state.borrow())
            .finish()
    }
}

/// Reachable providers serving `model_id`. Unknown ids are rejected.
fn serving(
    model_id: &str,
    entries: &[ModelCatalogEntry],
    snapshot: &ProviderSnapshot,
) -> Result<Vec<ProviderKind>, RouterError> {
    if let Some(entry) = entries.iter().find(|e| e.id == model_id) {
        return Ok(entry.serving_providers(snapshot));
    }
    let listed = snapshot
        .providers
        .iter()
        .any(|p| p.models.iter().any(|m| crate::providers::model_matches(m, model_id)));
    if listed {
        Ok(snapshot.providers_serving(model_id))
    } else {
        Err(RouterError::UnknownModel {
            model: model_id.to_string(),
        })
    }
}

/// `preferred` if `kind` lists it, else the first catalog entry it lists,
/// else the first model it lists. Vendor reachability alone never qualifies.
fn model_for_provider(
    kind: ProviderKind,
    preferred: Option<&str>,
    entries: &[ModelCatalogEntry],
    snapshot: &ProviderSnapshot,
) -> Option<ActiveModel> {
    let provider = snapshot.provider(kind).filter(|p| p.reachable)?;
    let make = |model_id: &str| ActiveModel {
        model_id: model_id.to_string(),
        provider: kind,
    };

    let lists = |entry: &ModelCatalogEntry| {
        provider
            .models
            .iter()
            .any(|listed| entry.matches_listing(listed))
    };

    if let Some(model) = preferred {
        let listed = match entries.iter().find(|e| e.id == model) {
            Some(entry) => lists(entry),
            None => provider.serves(model),
        };
        if listed {
            return Some(make(model));
        }
    }

    entries
        .iter()
        .find(|e| lists(*e))
        .map(|e| make(&e.id))
        .or_else(|| provider.models.first().map(|m| make(m)))
}

fn still_served(
    active: &ActiveModel,
    entries: &[ModelCatalogEntry],
    snapshot: &ProviderSnapshot,
) -> bool {
    serving(&active.model_id, entries, snapshot)
        .map(|kinds| kinds.contains(&active.provider))
        .unwrap_or(false)
}
