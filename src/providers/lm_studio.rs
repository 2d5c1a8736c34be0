//! LM Studio HTTP adapter
//!
//! LM Studio exposes an OpenAI-compatible server. Models are listed through
//! `GET /v1/models` and generation goes through `POST /v1/chat/completions`.
//! LM Studio has no HTTP pull endpoint, so [`ProviderAdapter::pull`] keeps its
//! default "unsupported" behaviour.

use super::{
    AdapterError, AdapterTimeouts, GenerateRequest, GenerateResponse, ProviderAdapter, ProviderKind,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::debug;

/// Adapter for a local LM Studio server
pub struct LmStudioAdapter {
    endpoint: String,
    http_client: Client,
    timeouts: AdapterTimeouts,
}

impl LmStudioAdapter {
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
}

#[async_trait]
impl ProviderAdapter for LmStudioAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::LmStudio
    }

    async fn list_models(&self) -> Result<Vec<String>, AdapterError> {
        let url = format!("{}/v1/models", self.endpoint);
        debug!("Probing LM Studio at {}", url);

        let timeout_ms = self.timeouts.probe.as_millis() as u64;
        let response = self
            .http_client
            .get(&url)
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

        let models: ModelsResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::InvalidResponse {
                message: format!("JSON parse error: {}", e),
            })?;

        Ok(models.data.into_iter().map(|m| m.id).collect())
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, AdapterError> {
        let url = format!("{}/v1/chat/completions", self.endpoint);

        let body = ChatCompletionRequest {
            model: request.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
        };

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

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 404 {
                return Err(AdapterError::ModelNotFound {
                    model: request.model.clone(),
                });
            }
            return Err(AdapterError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: ChatCompletionResponse =
            response
                .json()
                .await
                .map_err(|e| AdapterError::InvalidResponse {
                    message: format!("JSON parse error: {}", e),
                })?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AdapterError::InvalidResponse {
                message: "response contained no choices".to_string(),
            })?;

        Ok(GenerateResponse {
            text,
            model: request.model.clone(),
            provider: ProviderKind::LmStudio,
            latency: start.elapsed(),
            completion_tokens: parsed.usage.and_then(|u| u.completion_tokens),
        })
    }
}

impl fmt::Debug for LmStudioAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LmStudioAdapter")
            .field("endpoint", &self.endpoint)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    completion_tokens: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_creation() {
        let adapter =
            LmStudioAdapter::new("http://localhost:1234".to_string(), AdapterTimeouts::default());
        assert_eq!(adapter.endpoint(), "http://localhost:1234");
        assert_eq!(adapter.kind(), ProviderKind::LmStudio);
    }

    #[test]
    fn test_request_serialization_skips_unset_options() {
        let body = ChatCompletionRequest {
            model: "qwen".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "hi".to_string(),
            }],
            temperature: None,
            max_tokens: Some(16),
            stream: false,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("temperature"));
        assert!(json.contains("\"max_tokens\":16"));
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "fn main() {}"}}],
            "usage": {"prompt_tokens": 5, "completion_tokens": 7, "total_tokens": 12}
        }"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.choices[0].message.content, "fn main() {}");
        assert_eq!(parsed.usage.unwrap().completion_tokens, Some(7));
    }

    #[tokio::test]
    async fn test_pull_is_unsupported() {
        let adapter =
            LmStudioAdapter::new("http://localhost:1234".to_string(), AdapterTimeouts::default());
        let err = adapter.pull("anything").await.unwrap_err();
        assert!(matches!(err, AdapterError::Unsupported { .. }));
    }
}
