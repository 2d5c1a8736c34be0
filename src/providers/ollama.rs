//! Ollama HTTP adapter
//!
//! Talks to a local Ollama server:
//!
//! - `GET  /api/tags`     lists installed models (used as the reachability probe)
//! - `POST /api/generate` non-streaming generation
//! - `POST /api/pull`     downloads a model, blocking until it completes
//!
//! # Example
//!
//! ```no_run
//! use modelrouter::providers::{AdapterTimeouts, GenerateRequest, OllamaAdapter, ProviderAdapter};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let adapter = OllamaAdapter::new("http://localhost:11434".to_string(), AdapterTimeouts::default());
//! let models = adapter.list_models().await?;
//! if let Some(model) = models.first() {
//!     let reply = adapter.generate(&GenerateRequest::new(model, "Hello")).await?;
//!     println!("{}", reply.text);
//! }
//! # Ok(())
//! # }
//! ```

use super::{
    AdapterError, AdapterTimeouts, GenerateRequest, GenerateResponse, ProviderAdapter, ProviderKind,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Adapter for a local Ollama runtime
pub struct OllamaAdapter {
    endpoint: String,
    http_client: Client,
    timeouts: AdapterTimeouts,
}

impl OllamaAdapter {
    pub fn new(endpoint: String, timeouts: AdapterTimeouts) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            http_client: Client::new(),
            timeouts,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn error_from_status(response: reqwest::Response, model: &str) -> AdapterError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.as_u16() == 404 && body.contains("model") {
            return AdapterError::ModelNotFound {
                model: model.to_string(),
            };
        }

        AdapterError::Api {
            status: status.as_u16(),
            message: body,
        }
    }
}

#[async_trait]
impl ProviderAdapter for OllamaAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ollama
    }

    async fn list_models(&self) -> Result<Vec<String>, AdapterError> {
        let url = format!("{}/api/tags", self.endpoint);
        debug!("Probing Ollama at {}", url);

        let timeout_ms = self.timeouts.probe.as_millis() as u64;
        let response = self
            .http_client
            .get(&url)
            .timeout(self.timeouts.probe)
            .send()
            .await
            .map_err(|e| AdapterError::from_reqwest(e, timeout_ms))?;

        if !response.status().is_success() {
            return Err(Self::error_from_status(response, "").await);
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::InvalidResponse {
                message: format!("JSON parse error: {}", e),
            })?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, AdapterError> {
        let url = format!("{}/api/generate", self.endpoint);

        let body = OllamaGenerateRequest {
            model: request.model.clone(),
            prompt: request.prompt.clone(),
            stream: false,
            options: OllamaOptions::from_request(request),
        };

        debug!(
            "Sending request to Ollama: model={}, prompt_length={}",
            request.model,
            request.prompt.len()
        );

        let start = Instant::now();
        let timeout_ms = self.timeouts.generate.as_millis() as u64;

        let response = self
            .http_client
            .post(&url)
            .timeout(self.timeouts.generate)
            .json(&body)
            .send()
            .await
            .map_err(|e| AdapterError::from_reqwest(e, timeout_ms))?;

        if !response.status().is_success() {
            return Err(Self::error_from_status(response, &request.model).await);
        }

        let parsed: OllamaGenerateResponse =
            response
                .json()
                .await
                .map_err(|e| AdapterError::InvalidResponse {
                    message: format!("JSON parse error: {}", e),
                })?;

        let latency = start.elapsed();

        if !parsed.done {
            warn!("Ollama response indicates incomplete generation");
        }

        debug!(
            "Ollama stats: eval_tokens={}, eval_duration={:?}",
            parsed.eval_count.unwrap_or(0),
            parsed.eval_duration
        );

        Ok(GenerateResponse {
            text: parsed.response,
            model: request.model.clone(),
            provider: ProviderKind::Ollama,
            latency,
            completion_tokens: parsed.eval_count,
        })
    }

    async fn pull(&self, model: &str) -> Result<(), AdapterError> {
        let url = format!("{}/api/pull", self.endpoint);
        info!("Pulling {} via Ollama", model);

        let timeout_ms = self.timeouts.pull.as_millis() as u64;
        let response = self
            .http_client
            .post(&url)
            .timeout(self.timeouts.pull)
            .json(&PullRequest {
                name: model.to_string(),
                stream: false,
            })
            .send()
            .await
            .map_err(|e| AdapterError::from_reqwest(e, timeout_ms))?;

        if !response.status().is_success() {
            return Err(Self::error_from_status(response, model).await);
        }

        let status: PullStatus = response
            .json()
            .await
            .map_err(|e| AdapterError::InvalidResponse {
                message: format!("JSON parse error: {}", e),
            })?;

        match status.error {
            Some(message) => Err(AdapterError::Api {
                status: 200,
                message,
            }),
            None if status.status == "success" => Ok(()),
            None => Err(AdapterError::InvalidResponse {
                message: format!("unexpected pull status '{}'", status.status),
            }),
        }
    }
}

impl fmt::Debug for OllamaAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OllamaAdapter")
            .field("endpoint", &self.endpoint)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}

#[derive(Debug, Serialize)]
struct OllamaGenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

impl OllamaOptions {
    fn from_request(request: &GenerateRequest) -> Option<Self> {
        if request.temperature.is_none() && request.max_tokens.is_none() {
            return None;
        }
        Some(Self {
            temperature: request.temperature,
            num_predict: request.max_tokens,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    eval_count: Option<u32>,
    /// Nanoseconds
    #[serde(default)]
    eval_duration: Option<u64>,
}

#[derive(Debug, Serialize)]
struct PullRequest {
    name: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct PullStatus {
    #[serde(default)]
    status: String,
    #[serde(default)]
    error: Option<String>,
}
