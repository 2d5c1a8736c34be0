//! Provider adapters
//!
//! Every LLM-serving backend the router knows about is one variant of the
//! closed [`ProviderKind`] enum. Each variant has its own adapter that turns the
//! provider's wire format into the common [`GenerateResponse`] / model-list
//! shape at the boundary, so nothing above this module ever sees a
//! provider-specific JSON payload.

mod cloud;
mod credentials;
mod error;
mod lm_studio;
mod mock;
mod ollama;

pub use cloud::CloudAdapter;
pub use credentials::{CredentialSource, EnvCredentials, StaticCredentials};
pub use error::AdapterError;
pub use lm_studio::LmStudioAdapter;
pub use mock::{MockAdapter, MockReply};
pub use ollama::OllamaAdapter;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RouterConfig;

/// The fixed set of providers the router can talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Local Ollama runtime
    Ollama,
    /// Local LM Studio runtime (OpenAI-compatible API)
    #[serde(rename = "lmstudio")]
    LmStudio,
    Anthropic,
    #[serde(rename = "openai")]
    OpenAI,
    Gemini,
    Groq,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 6] = [
        ProviderKind::Ollama,
        ProviderKind::LmStudio,
        ProviderKind::Anthropic,
        ProviderKind::OpenAI,
        ProviderKind::Gemini,
        ProviderKind::Groq,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Ollama => "ollama",
            ProviderKind::LmStudio => "lmstudio",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::OpenAI => "openai",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Groq => "groq",
        }
    }

    /// Local runtimes run on this machine and can pull models
    pub fn is_local(&self) -> bool {
        matches!(self, ProviderKind::Ollama | ProviderKind::LmStudio)
    }

    /// Environment variable holding the API key, `None` for local runtimes
    pub fn key_env_var(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Ollama | ProviderKind::LmStudio => None,
            ProviderKind::Anthropic => Some("ANTHROPIC_API_KEY"),
            ProviderKind::OpenAI => Some("OPENAI_API_KEY"),
            ProviderKind::Gemini => Some("GEMINI_API_KEY"),
            ProviderKind::Groq => Some("GROQ_API_KEY"),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(ProviderKind::Ollama),
            "lmstudio" | "lm-studio" | "lm_studio" => Ok(ProviderKind::LmStudio),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "openai" => Ok(ProviderKind::OpenAI),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            "groq" => Ok(ProviderKind::Groq),
            other => Err(format!(
                "Invalid provider: {}. Valid options: ollama, lmstudio, anthropic, openai, gemini, groq",
                other
            )),
        }
    }
}

/// A single generation call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            temperature: None,
            max_tokens: None,
        }
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

/// Provider-independent generation result
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateResponse {
    pub text: String,
    pub model: String,
    pub provider: ProviderKind,
    /// Wall-clock time from dispatch to full response
    pub latency: Duration,
    /// Tokens generated, when the provider reports it
    pub completion_tokens: Option<u32>,
}

impl GenerateResponse {
    /// Generated tokens per second. Falls back to a chars/4 estimate when the
    /// provider does not report token counts.
    pub fn tokens_per_second(&self) -> f64 {
        let secs = self.latency.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        let tokens = self
            .completion_tokens
            .map(f64::from)
            .unwrap_or_else(|| (self.text.chars().count() as f64 / 4.0).ceil());
        tokens / secs
    }
}

/// Upper bounds for every network operation an adapter performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterTimeouts {
    pub probe: Duration,
    pub generate: Duration,
    pub pull: Duration,
}

impl Default for AdapterTimeouts {
    fn default() -> Self {
        Self {
            probe: Duration::from_secs(3),
            generate: Duration::from_secs(120),
            pull: Duration::from_secs(1800),
        }
    }
}

/// Uniform interface over one provider backend
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Reachability probe: lists the models the provider currently serves
    async fn list_models(&self) -> Result<Vec<String>, AdapterError>;

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, AdapterError>;

    /// Asks the provider to fetch a model. Only local runtimes support this.
    async fn pull(&self, model: &str) -> Result<(), AdapterError> {
        Err(AdapterError::Unsupported {
            operation: format!("pull '{}' on {}", model, self.kind()),
        })
    }
}

/// Live state of one provider as seen by the most recent probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub kind: ProviderKind,
    pub reachable: bool,
    pub models: Vec<String>,
    /// Round-trip latency of the last probe
    pub latency_ms: Option<u64>,
    /// Cloud provider lacking a credential
    pub not_configured: bool,
    pub error: Option<String>,
}

impl Provider {
    pub fn online(kind: ProviderKind, models: Vec<String>, latency: Duration) -> Self {
        Self {
            kind,
            reachable: true,
            models,
            latency_ms: Some(latency.as_millis() as u64),
            not_configured: false,
            error: None,
        }
    }

    pub fn offline(kind: ProviderKind, error: &AdapterError) -> Self {
        Self {
            kind,
            reachable: false,
            models: Vec::new(),
            latency_ms: None,
            not_configured: matches!(error, AdapterError::NotConfigured { .. }),
            error: Some(error.to_string()),
        }
    }

    /// True if this provider is reachable and lists `model`
    pub fn serves(&self, model: &str) -> bool {
        self.reachable && self.models.iter().any(|m| model_matches(m, model))
    }
}

/// Aggregate result of one discovery cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderSnapshot {
    /// Monotonic counter; 0 means no discovery has completed yet
    pub generation: u64,
    pub probed_at: Option<DateTime<Utc>>,
    pub providers: Vec<Provider>,
}

impl ProviderSnapshot {
    pub fn provider(&self, kind: ProviderKind) -> Option<&Provider> {
        self.providers.iter().find(|p| p.kind == kind)
    }

    pub fn is_reachable(&self, kind: ProviderKind) -> bool {
        self.provider(kind).map(|p| p.reachable).unwrap_or(false)
    }

    /// Reachable providers currently serving `model`, in snapshot order
    pub fn providers_serving(&self, model: &str) -> Vec<ProviderKind> {
        self.providers
            .iter()
            .filter(|p| p.serves(model))
            .map(|p| p.kind)
            .collect()
    }

    pub fn is_served(&self, model: &str) -> bool {
        self.providers.iter().any(|p| p.serves(model))
    }

    pub fn reachable_count(&self) -> usize {
        self.providers.iter().filter(|p| p.reachable).count()
    }
}

/// Compares a provider-listed model name with a requested one.
///
/// Ollama reports untagged models as `name:latest`, so `llama3` and
/// `llama3:latest` are the same model.
pub fn model_matches(listed: &str, wanted: &str) -> bool {
    let listed = listed.trim().to_lowercase();
    let wanted = wanted.trim().to_lowercase();
    if listed == wanted {
        return true;
    }
    let strip = |s: &str| s.strip_suffix(":latest").map(str::to_string);
    strip(&listed).map_or(false, |l| l == wanted) || strip(&wanted).map_or(false, |w| w == listed)
}

/// Builds the adapter for every provider in [`ProviderKind::ALL`].
pub fn default_adapters(
    config: &RouterConfig,
    credentials: Arc<dyn CredentialSource>,
) -> Vec<Arc<dyn ProviderAdapter>> {
    let timeouts = config.adapter_timeouts();
    ProviderKind::ALL
        .iter()
        .map(|kind| -> Arc<dyn ProviderAdapter> {
            match kind {
                ProviderKind::Ollama => {
                    Arc::new(OllamaAdapter::new(config.ollama_host.clone(), timeouts))
                }
                ProviderKind::LmStudio => {
                    Arc::new(LmStudioAdapter::new(config.lmstudio_host.clone(), timeouts))
                }
                cloud => Arc::new(CloudAdapter::new(*cloud, credentials.clone(), timeouts)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_round_trip() {
        for kind in ProviderKind::ALL {
            assert_eq!(kind.as_str().parse::<ProviderKind>().unwrap(), kind);
        }
        assert_eq!(
            "Claude".parse::<ProviderKind>().unwrap(),
            ProviderKind::Anthropic
        );
        assert!("bogus".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_provider_kind_serde_names() {
        let json = serde_json::to_string(&ProviderKind::LmStudio).unwrap();
        assert_eq!(json, "\"lmstudio\"");
        let json = serde_json::to_string(&ProviderKind::OpenAI).unwrap();
        assert_eq!(json, "\"openai\"");
    }

    #[test]
    fn test_local_providers_need_no_key() {
        assert!(ProviderKind::Ollama.key_env_var().is_none());
        assert!(ProviderKind::LmStudio.key_env_var().is_none());
        assert_eq!(ProviderKind::Groq.key_env_var(), Some("GROQ_API_KEY"));
    }

    #[test]
    fn test_model_matches_latest_tag() {
        assert!(model_matches("llama3:latest", "llama3"));
        assert!(model_matches("llama3", "llama3:latest"));
        assert!(model_matches("Qwen2.5-Coder:7B", "qwen2.5-coder:7b"));
        assert!(!model_matches("llama3:70b", "llama3"));
    }

    #[test]
    fn test_snapshot_providers_serving_skips_unreachable() {
        let snapshot = ProviderSnapshot {
            generation: 1,
            probed_at: None,
            providers: vec![
                Provider::online(
                    ProviderKind::Ollama,
                    vec!["x".to_string()],
                    Duration::from_millis(5),
                ),
                Provider {
                    kind: ProviderKind::LmStudio,
                    reachable: false,
                    models: vec!["x".to_string()],
                    latency_ms: None,
                    not_configured: false,
                    error: None,
                },
            ],
        };
        assert_eq!(snapshot.providers_serving("x"), vec![ProviderKind::Ollama]);
        assert!(snapshot.is_served("x"));
        assert!(!snapshot.is_served("y"));
        assert_eq!(snapshot.reachable_count(), 1);
    }

    #[test]
    fn test_tokens_per_second_estimate() {
        let response = GenerateResponse {
            text: "a".repeat(400),
            model: "m".to_string(),
            provider: ProviderKind::Ollama,
            latency: Duration::from_secs(2),
            completion_tokens: None,
        };
        assert!((response.tokens_per_second() - 50.0).abs() < f64::EPSILON);

        let reported = GenerateResponse {
            completion_tokens: Some(10),
            ..response
        };
        assert!((reported.tokens_per_second() - 5.0).abs() < f64::EPSILON);
    }
}
