//! Shared fixtures for integration tests

use modelrouter::providers::{MockAdapter, ProviderAdapter};
use modelrouter::{
    ModelCatalogEntry, ProgressEvent, ProgressHandler, ProviderKind, ProviderRegistry,
    RouterConfig,
};
use std::sync::{Arc, Mutex};

/// Scripted adapter already wrapped for sharing with the registry
#[allow(dead_code)]
pub fn mock(kind: ProviderKind, models: &[&str]) -> Arc<MockAdapter> {
    Arc::new(MockAdapter::with_models(kind, models))
}

/// Registry over the given adapters with default configuration
#[allow(dead_code)]
pub fn registry(adapters: &[Arc<MockAdapter>]) -> Arc<ProviderRegistry> {
    let adapters: Vec<Arc<dyn ProviderAdapter>> = adapters
        .iter()
        .map(|a| a.clone() as Arc<dyn ProviderAdapter>)
        .collect();
    Arc::new(ProviderRegistry::new(adapters, &RouterConfig::default()))
}

/// Local catalog entry owned by Ollama
#[allow(dead_code)]
pub fn local_entry(id: &str, size_gb: f64, min_ram_gb: f64, tags: &[&str]) -> ModelCatalogEntry {
    ModelCatalogEntry::new(
        id,
        id,
        ProviderKind::Ollama,
        size_gb,
        "Q4_K_M",
        8192,
        min_ram_gb,
        None,
        tags.iter().map(|t| t.to_string()).collect(),
    )
}

/// Records every progress event it sees
#[derive(Default)]
#[allow(dead_code)]
pub struct RecordingHandler {
    events: Mutex<Vec<ProgressEvent>>,
}

#[allow(dead_code)]
impl RecordingHandler {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressHandler for RecordingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
