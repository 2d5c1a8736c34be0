//! Model catalog
//!
//! Static seed entries merged with whatever the latest provider snapshot
//! reports. The catalog never touches the network: every read takes the
//! snapshot to merge against, so its view always matches the most recent
//! discovery.

mod favorites;
mod seed;

pub use favorites::{FavoritesError, FavoritesStore};
pub use seed::{seed_entries, SeedEntry, SEED};

use crate::providers::{model_matches, ProviderKind, ProviderSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Context window assumed for models discovered without catalog metadata
const DISCOVERED_CONTEXT_WINDOW: u32 = 8_192;

/// What the user wants a model for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UseCase {
    Coding,
    Chat,
    Reasoning,
    Writing,
    General,
}

impl UseCase {
    pub const ALL: [UseCase; 5] = [
        UseCase::Coding,
        UseCase::Chat,
        UseCase::Reasoning,
        UseCase::Writing,
        UseCase::General,
    ];

    /// Maps a catalog tag to the use case it signals
    pub fn from_tag(tag: &str) -> Option<UseCase> {
        match tag.to_lowercase().as_str() {
            "code" | "coding" => Some(UseCase::Coding),
            "chat" | "assistant" => Some(UseCase::Chat),
            "reasoning" | "math" => Some(UseCase::Reasoning),
            "writing" | "creative" => Some(UseCase::Writing),
            "general" => Some(UseCase::General),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UseCase::Coding => "coding",
            UseCase::Chat => "chat",
            UseCase::Reasoning => "reasoning",
            UseCase::Writing => "writing",
            UseCase::General => "general",
        }
    }
}

impl fmt::Display for UseCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UseCase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UseCase::from_tag(s.trim()).ok_or_else(|| {
            format!(
                "Invalid use case: {}. Valid options: coding, chat, reasoning, writing, general",
                s
            )
        })
    }
}

/// Static metadata for one candidate model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCatalogEntry {
    pub id: String,
    pub display_name: String,
    pub provider: ProviderKind,
    /// Download size; 0 for cloud-hosted or unknown
    pub size_gb: f64,
    pub quantization: String,
    pub context_window: u32,
    pub min_ram_gb: f64,
    pub min_vram_gb: Option<f64>,
    pub tags: Vec<String>,
    pub use_cases: Vec<UseCase>,
    pub strengths: Vec<String>,
    pub limitations: Vec<String>,
    pub pull_command: Option<String>,
    pub download_url: Option<String>,
    /// Added from a live listing rather than the seed
    #[serde(default)]
    pub discovered: bool,
}

impl ModelCatalogEntry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        provider: ProviderKind,
        size_gb: f64,
        quantization: impl Into<String>,
        context_window: u32,
        min_ram_gb: f64,
        min_vram_gb: Option<f64>,
        tags: Vec<String>,
    ) -> Self {
        let mut use_cases: Vec<UseCase> = Vec::new();
        for uc in tags.iter().filter_map(|t| UseCase::from_tag(t)) {
            if !use_cases.contains(&uc) {
                use_cases.push(uc);
            }
        }
        Self {
            id: id.into(),
            display_name: display_name.into(),
            provider,
            size_gb,
            quantization: quantization.into(),
            context_window,
            min_ram_gb,
            min_vram_gb,
            tags,
            use_cases,
            strengths: Vec::new(),
            limitations: Vec::new(),
            pull_command: None,
            download_url: None,
            discovered: false,
        }
    }

    pub fn with_notes(mut self, strengths: Vec<String>, limitations: Vec<String>) -> Self {
        self.strengths = strengths;
        self.limitations = limitations;
        self
    }

    pub fn with_pull(mut self, command: Option<String>, url: Option<String>) -> Self {
        self.pull_command = command;
        self.download_url = url;
        self
    }

    /// Entry for a model a local provider reported that the seed lacks
    pub fn discovered(provider: ProviderKind, id: &str) -> Self {
        let lower = id.to_lowercase();
        let mut tags = vec!["local".to_string()];
        if lower.contains("code") || lower.contains("coder") {
            tags.push("code".to_string());
        } else {
            tags.push("general".to_string());
            tags.push("chat".to_string());
        }
        if lower.contains("r1") || lower.contains("reason") {
            tags.push("reasoning".to_string());
        }

        let mut entry = Self::new(
            id,
            format!("{} ({})", id, provider),
            provider,
            0.0,
            guess_quantization(&lower),
            DISCOVERED_CONTEXT_WINDOW,
            0.0,
            None,
            tags,
        );
        entry.discovered = true;
        entry
    }

    pub fn is_cloud(&self) -> bool {
        !self.provider.is_local()
    }

    pub fn is_quantized(&self) -> bool {
        let q = self.quantization.to_lowercase();
        q.starts_with('q')
    }

    pub fn is_full_precision(&self) -> bool {
        matches!(
            self.quantization.to_lowercase().as_str(),
            "f16" | "fp16" | "bf16" | "f32" | "fp32"
        )
    }

    pub fn matches_use_case(&self, use_case: UseCase) -> bool {
        self.use_cases.contains(&use_case)
    }

    /// Name handed to the provider's pull endpoint
    pub fn pull_name(&self) -> &str {
        self.pull_command
            .as_deref()
            .and_then(|cmd| cmd.split_whitespace().last())
            .unwrap_or(&self.id)
    }

    /// True if a provider listing entry refers to this model
    pub fn matches_listing(&self, listed: &str) -> bool {
        model_matches(listed, &self.id) || model_matches(listed, self.pull_name())
    }

    /// Some reachable provider explicitly lists this model
    pub fn is_listed(&self, snapshot: &ProviderSnapshot) -> bool {
        snapshot
            .providers
            .iter()
            .any(|p| p.reachable && p.models.iter().any(|m| self.matches_listing(m)))
    }

    /// Reachable providers serving this model, owning provider first.
    ///
    /// Cloud vendors often list dated aliases instead of the catalog id, so a
    /// cloud entry counts as served whenever its owning vendor is reachable.
    /// Routing only picks models a provider actually lists; see [`Self::is_listed`].
    pub fn serving_providers(&self, snapshot: &ProviderSnapshot) -> Vec<ProviderKind> {
        let mut kinds: Vec<ProviderKind> = snapshot
            .providers
            .iter()
            .filter(|p| p.reachable && p.models.iter().any(|m| self.matches_listing(m)))
            .map(|p| p.kind)
            .collect();
        if let Some(pos) = kinds.iter().position(|k| *k == self.provider) {
            let owner = kinds.remove(pos);
            kinds.insert(0, owner);
        } else if self.is_cloud() && snapshot.is_reachable(self.provider) {
            kinds.insert(0, self.provider);
        }
        kinds
    }
}

fn guess_quantization(id: &str) -> String {
    for label in ["q2", "q3", "q4", "q5", "q6", "q8", "fp16", "f16", "bf16", "fp32"] {
        if let Some(pos) = id.find(label) {
            let rest: String = id[pos..]
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                .collect();
            return rest.to_uppercase();
        }
    }
    "unknown".to_string()
}

/// Catalog entry plus the per-session derived state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogItem {
    pub entry: ModelCatalogEntry,
    pub installed: bool,
    pub favorite: bool,
    pub served_by: Vec<ProviderKind>,
}

pub struct ModelCatalog {
    seed: Vec<ModelCatalogEntry>,
    favorites: FavoritesStore,
}

impl ModelCatalog {
    pub fn new(seed: Vec<ModelCatalogEntry>, favorites: FavoritesStore) -> Self {
        Self { seed, favorites }
    }

    /// Built-in seed with the given favorites store
    pub fn with_defaults(favorites: FavoritesStore) -> Self {
        Self::new(seed_entries(), favorites)
    }

    /// Seed entries in display order, then models local providers reported
    /// that the seed does not know about (provider order, then name order).
    pub fn entries(&self, snapshot: &ProviderSnapshot) -> Vec<ModelCatalogEntry> {
        let mut entries = self.seed.clone();
        let mut known: HashSet<String> = entries.iter().map(|e| e.id.to_lowercase()).collect();

        for provider in snapshot
            .providers
            .iter()
            .filter(|p| p.reachable && p.kind.is_local())
        {
            let mut names: Vec<&String> = provider.models.iter().collect();
            names.sort();
            for name in names {
                let covered = known.contains(&name.to_lowercase())
                    || entries.iter().any(|e| e.matches_listing(name));
                if covered {
                    continue;
                }
                debug!(provider = %provider.kind, model = %name, "Adding discovered model to catalog");
                known.insert(name.to_lowercase());
                entries.push(ModelCatalogEntry::discovered(provider.kind, name));
            }
        }
        entries
    }

    pub fn find(&self, id: &str, snapshot: &ProviderSnapshot) -> Option<ModelCatalogEntry> {
        let entries = self.entries(snapshot);
        entries
            .iter()
            .find(|e| e.id == id)
            .or_else(|| entries.iter().find(|e| e.matches_listing(id)))
            .cloned()
    }

    /// True if any reachable provider currently lists the model
    pub fn is_installed(&self, id: &str, snapshot: &ProviderSnapshot) -> bool {
        match self.find(id, snapshot) {
            Some(entry) => entry.is_listed(snapshot),
            None => snapshot.is_served(id),
        }
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.favorites.contains(id)
    }

    /// Returns the new favorite state
    pub fn toggle_favorite(&mut self, id: &str) -> Result<bool, FavoritesError> {
        self.favorites.toggle(id)
    }

    pub fn favorites(&self) -> &FavoritesStore {
        &self.favorites
    }

    /// Entries with installed/favorite state derived from `snapshot`
    pub fn items(&self, snapshot: &ProviderSnapshot) -> Vec<CatalogItem> {
        self.entries(snapshot)
            .into_iter()
            .map(|entry| {
                let served_by = entry.serving_providers(snapshot);
                CatalogItem {
                    installed: entry.is_listed(snapshot),
                    favorite: self.favorites.contains(&entry.id),
                    served_by,
                    entry,
                }
            })
            .collect()
    }
}

impl fmt::Debug for ModelCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelCatalog")
            .field("seed_entries", &self.seed.len())
            .field("favorites", &self.favorites.ids().count())
            .finish()
    }
}
