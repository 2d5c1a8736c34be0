//! Cloud provider adapter
//!
//! One adapter type covers every hosted vendor. Model listing is a plain
//! `GET {base}/models` with the vendor's auth header; the two response shapes
//! (`{"data":[{"id":..}]}` and Gemini's `{"models":[{"name":"models/.."}]}`) are
//! normalised here. Generation goes through the `genai` crate, with the key
//! and endpoint pinned by a [`ServiceTargetResolver`] so the vendor is never
//! inferred from the model name.

use super::{
    AdapterError, AdapterTimeouts, CredentialSource, GenerateRequest, GenerateResponse,
    ProviderAdapter, ProviderKind,
};
use async_trait::async_trait;
use genai::adapter::AdapterKind;
use genai::chat::{ChatMessage as GenAIChatMessage, ChatOptions, ChatRequest as GenAIChatRequest};
use genai::resolver::{AuthData, Endpoint, ServiceTargetResolver};
use genai::{Client, ModelIden, ServiceTarget};
use reqwest::RequestBuilder;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Adapter for a hosted vendor API
pub struct CloudAdapter {
    kind: ProviderKind,
    base_url: String,
    credentials: Arc<dyn CredentialSource>,
    http_client: reqwest::Client,
    timeouts: AdapterTimeouts,
}

impl CloudAdapter {
    /// Local kinds are accepted but every call on them reports `Unsupported`.
    pub fn new(
        kind: ProviderKind,
        credentials: Arc<dyn CredentialSource>,
        timeouts: AdapterTimeouts,
    ) -> Self {
        Self {
            kind,
            base_url: default_base_url(kind).to_string(),
            credentials,
            http_client: reqwest::Client::new(),
            timeouts,
        }
    }

    /// Overrides the vendor base URL (proxies, tests). A trailing slash is added
    /// if missing.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        self.base_url = base_url;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_key(&self) -> Result<String, AdapterError> {
        self.credentials
            .api_key(self.kind)
            .ok_or_else(|| AdapterError::NotConfigured {
                env_var: self.kind.key_env_var().unwrap_or("<none>").to_string(),
            })
    }

    fn adapter_kind(&self) -> Result<AdapterKind, AdapterError> {
        match self.kind {
            ProviderKind::Anthropic => Ok(AdapterKind::Anthropic),
            ProviderKind::OpenAI => Ok(AdapterKind::OpenAI),
            ProviderKind::Gemini => Ok(AdapterKind::Gemini),
            ProviderKind::Groq => Ok(AdapterKind::Groq),
            local => Err(AdapterError::Unsupported {
                operation: format!("cloud access to local provider {}", local),
            }),
        }
    }

    fn authorize(&self, builder: RequestBuilder, key: &str) -> RequestBuilder {
        match self.kind {
            ProviderKind::Anthropic => builder
                .header("x-api-key", key)
                .header("anthropic-version", ANTHROPIC_VERSION),
            ProviderKind::Gemini => builder.header("x-goog-api-key", key),
            _ => builder.bearer_auth(key),
        }
    }
}

fn default_base_url(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::Anthropic => "https://api.anthropic.com/v1/",
        ProviderKind::OpenAI => "https://api.openai.com/v1/",
        ProviderKind::Gemini => "https://generativelanguage.googleapis.com/v1beta/",
        ProviderKind::Groq => "https://api.groq.com/openai/v1/",
        ProviderKind::Ollama => "http://localhost:11434/",
        ProviderKind::LmStudio => "http://localhost:1234/v1/",
    }
}

#[async_trait]
impl ProviderAdapter for CloudAdapter {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn list_models(&self) -> Result<Vec<String>, AdapterError> {
        self.adapter_kind()?;
        let key = self.api_key()?;
        let url = format!("{}models", self.base_url);
        debug!("Probing {} at {}", self.kind, url);

        let timeout_ms = self.timeouts.probe.as_millis() as u64;
        let response = self
            .authorize(self.http_client.get(&url), &key)
            .timeout(self.timeouts.probe)
            .send()
            .await
            .map_err(|e| AdapterError::from_reqwest(e, timeout_ms))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let listing: ModelListing =
            response
                .json()
                .await
                .map_err(|e| AdapterError::InvalidResponse {
                    message: format!("JSON parse error: {}", e),
                })?;

        Ok(listing.into_ids())
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, AdapterError> {
        let adapter_kind = self.adapter_kind()?;
        let key = self.api_key()?;

        let endpoint_url = self.base_url.clone();
        let model_name = request.model.clone();
        let resolver = ServiceTargetResolver::from_resolver_fn(
            move |_service_target: ServiceTarget| -> Result<ServiceTarget, genai::resolver::Error> {
                Ok(ServiceTarget {
                    endpoint: Endpoint::from_owned(endpoint_url.clone()),
                    auth: AuthData::from_single(key.clone()),
                    model: ModelIden::new(adapter_kind, &model_name),
                })
            },
        );

        let client = Client::builder()
            .with_service_target_resolver(resolver)
            .build();

        let chat_request =
            GenAIChatRequest::new(vec![GenAIChatMessage::user(request.prompt.clone())]);

        let mut options = ChatOptions::default();
        if let Some(temp) = request.temperature {
            options = options.with_temperature(temp as f64);
        }
        if let Some(max_tokens) = request.max_tokens {
            options = options.with_max_tokens(max_tokens);
        }

        let start = Instant::now();
        let response = match tokio::time::timeout(
            self.timeouts.generate,
            client.exec_chat(&request.model, chat_request, Some(&options)),
        )
        .await
        {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => {
                error!("{} API error: {}", self.kind, e);
                return Err(AdapterError::Backend {
                    message: format!("{} request failed: {}", self.kind, e),
                });
            }
            Err(_) => {
                return Err(AdapterError::Timeout {
                    millis: self.timeouts.generate.as_millis() as u64,
                });
            }
        };

        let text = response.first_text().unwrap_or_default().to_string();

        Ok(GenerateResponse {
            text,
            model: request.model.clone(),
            provider: self.kind,
            latency: start.elapsed(),
            completion_tokens: None,
        })
    }
}

impl fmt::Debug for CloudAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudAdapter")
            .field("kind", &self.kind)
            .field("base_url", &self.base_url)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

/// Either listing shape a vendor may return
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ModelListing {
    Data { data: Vec<IdEntry> },
    Models { models: Vec<NameEntry> },
}

#[derive(Debug, Deserialize)]
struct IdEntry {
    id: String,
}

#[derive(Debug, Deserialize)]
struct NameEntry {
    name: String,
}

impl ModelListing {
    fn into_ids(self) -> Vec<String> {
        match self {
            ModelListing::Data { data } => data.into_iter().map(|e| e.id).collect(),
            ModelListing::Models { models } => models
                .into_iter()
                .map(|e| {
                    e.name
                        .strip_prefix("models/")
                        .map(str::to_string)
                        .unwrap_or(e.name)
                })
                .collect(),
        }
    }
}
