use super::{AdapterError, GenerateRequest, GenerateResponse, ProviderAdapter, ProviderKind};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Scripted adapter for tests and offline demos
pub struct MockAdapter {
    kind: ProviderKind,
    state: Mutex<MockState>,
}

#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Error(AdapterError),
}

impl MockReply {
    pub fn text(content: impl Into<String>) -> Self {
        MockReply::Text(content.into())
    }

    pub fn error(error: AdapterError) -> Self {
        MockReply::Error(error)
    }
}

struct MockState {
    online: bool,
    models: Vec<String>,
    probe_delay: Duration,
    generate_delay: Duration,
    pull_delay: Duration,
    replies: VecDeque<MockReply>,
    default_reply: MockReply,
    pull_result: Result<(), AdapterError>,
    probe_calls: usize,
    generate_calls: Vec<GenerateRequest>,
    pull_calls: Vec<String>,
}

impl MockAdapter {
    pub fn new(kind: ProviderKind, models: Vec<String>) -> Self {
        Self {
            kind,
            state: Mutex::new(MockState {
                online: true,
                models,
                probe_delay: Duration::ZERO,
                generate_delay: Duration::ZERO,
                pull_delay: Duration::ZERO,
                replies: VecDeque::new(),
                default_reply: MockReply::text(format!("mock response from {}", kind)),
                pull_result: Ok(()),
                probe_calls: 0,
                generate_calls: Vec::new(),
                pull_calls: Vec::new(),
            }),
        }
    }

    pub fn with_models(kind: ProviderKind, models: &[&str]) -> Self {
        Self::new(kind, models.iter().map(|m| m.to_string()).collect())
    }

    pub fn offline(kind: ProviderKind) -> Self {
        let adapter = Self::new(kind, Vec::new());
        adapter.set_online(false);
        adapter
    }

    pub fn set_online(&self, online: bool) {
        self.state.lock().unwrap().online = online;
    }

    pub fn set_models(&self, models: Vec<String>) {
        self.state.lock().unwrap().models = models;
    }

    pub fn set_probe_delay(&self, delay: Duration) {
        self.state.lock().unwrap().probe_delay = delay;
    }

    pub fn set_generate_delay(&self, delay: Duration) {
        self.state.lock().unwrap().generate_delay = delay;
    }

    pub fn set_pull_delay(&self, delay: Duration) {
        self.state.lock().unwrap().pull_delay = delay;
    }

    pub fn set_pull_result(&self, result: Result<(), AdapterError>) {
        self.state.lock().unwrap().pull_result = result;
    }

    /// Reply used once the queued replies are exhausted
    pub fn set_default_reply(&self, reply: MockReply) {
        self.state.lock().unwrap().default_reply = reply;
    }

    pub fn push_reply(&self, reply: MockReply) {
        self.state.lock().unwrap().replies.push_back(reply);
    }

    pub fn probe_count(&self) -> usize {
        self.state.lock().unwrap().probe_calls
    }

    pub fn generate_calls(&self) -> Vec<GenerateRequest> {
        self.state.lock().unwrap().generate_calls.clone()
    }

    pub fn pull_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().pull_calls.clone()
    }
}

fn offline_error(kind: ProviderKind) -> AdapterError {
    AdapterError::Unreachable {
        message: format!("{} is offline", kind),
    }
}

#[async_trait]
impl ProviderAdapter for MockAdapter {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn list_models(&self) -> Result<Vec<String>, AdapterError> {
        let (delay, online, models) = {
            let mut state = self.state.lock().unwrap();
            state.probe_calls += 1;
            (state.probe_delay, state.online, state.models.clone())
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if online {
            Ok(models)
        } else {
            Err(offline_error(self.kind))
        }
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, AdapterError> {
        let (delay, online, reply) = {
            let mut state = self.state.lock().unwrap();
            state.generate_calls.push(request.clone());
            let reply = state
                .replies
                .pop_front()
                .unwrap_or_else(|| state.default_reply.clone());
            (state.generate_delay, state.online, reply)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if !online {
            return Err(offline_error(self.kind));
        }
        match reply {
            MockReply::Text(text) => Ok(GenerateResponse {
                completion_tokens: Some(text.split_whitespace().count() as u32),
                text,
                model: request.model.clone(),
                provider: self.kind,
                latency: delay.max(Duration::from_millis(1)),
            }),
            MockReply::Error(error) => Err(error),
        }
    }

    async fn pull(&self, model: &str) -> Result<(), AdapterError> {
        let (delay, result) = {
            let mut state = self.state.lock().unwrap();
            state.pull_calls.push(model.to_string());
            (state.pull_delay, state.pull_result.clone())
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if result.is_ok() {
            let mut state = self.state.lock().unwrap();
            if !state.models.iter().any(|m| m == model) {
                state.models.push(model.to_string());
            }
        }
        result
    }
}

impl std::fmt::Debug for MockAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockAdapter")
            .field("kind", &self.kind)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_lists_models_when_online() {
        let adapter = MockAdapter::with_models(ProviderKind::Ollama, &["a", "b"]);
        assert_eq!(adapter.list_models().await.unwrap(), vec!["a", "b"]);
        assert_eq!(adapter.probe_count(), 1);

        adapter.set_online(false);
        assert!(adapter.list_models().await.unwrap_err().is_offline());
    }

    #[tokio::test]
    async fn test_mock_replies_in_order_then_default() {
        let adapter = MockAdapter::with_models(ProviderKind::Groq, &["m"]);
        adapter.push_reply(MockReply::text("first"));
        adapter.push_reply(MockReply::error(AdapterError::Timeout { millis: 5 }));

        let request = GenerateRequest::new("m", "p");
        assert_eq!(adapter.generate(&request).await.unwrap().text, "first");
        assert!(adapter.generate(&request).await.is_err());
        assert_eq!(
            adapter.generate(&request).await.unwrap().text,
            "mock response from groq"
        );
        assert_eq!(adapter.generate_calls().len(), 3);
    }

    #[tokio::test]
    async fn test_successful_pull_installs_model() {
        let adapter = MockAdapter::with_models(ProviderKind::Ollama, &[]);
        adapter.pull("phi3").await.unwrap();
        assert_eq!(adapter.list_models().await.unwrap(), vec!["phi3"]);
        assert_eq!(adapter.pull_calls(), vec!["phi3"]);
    }
}
