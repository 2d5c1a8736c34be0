//! Router error taxonomy
//!
//! Every failure carries its kind plus the offending provider and/or model so
//! callers can decide whether to retry, switch models or tell the user to fix
//! their configuration.

use crate::providers::{AdapterError, ProviderKind};
use serde::Serialize;
use thiserror::Error;

/// One failed attempt inside a fallback chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedAttempt {
    pub provider: ProviderKind,
    pub model: String,
    pub error: String,
}

impl std::fmt::Display for FailedAttempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}: {}", self.provider, self.model, self.error)
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RouterError {
    /// Probe or call failed because the provider is offline or timed out
    #[error("Provider {provider} unreachable: {source}")]
    ProviderUnreachable {
        provider: ProviderKind,
        #[source]
        source: AdapterError,
    },

    /// Cloud provider has no credential; configure it rather than retry
    #[error("Provider {provider} is not configured (set {env_var})")]
    ProviderNotConfigured {
        provider: ProviderKind,
        env_var: String,
    },

    /// Explicit switch to a model whose provider is not reachable right now
    #[error("Provider for model '{model}' is unavailable")]
    ProviderUnavailable {
        model: String,
        provider: Option<ProviderKind>,
    },

    #[error("Pull of '{model}' via {provider} failed: {reason}")]
    ModelPullFailed {
        model: String,
        provider: ProviderKind,
        reason: String,
    },

    #[error("A pull of '{model}' is already in progress")]
    PullInProgress { model: String },

    #[error("Benchmark of '{model}' failed: {reason}")]
    BenchmarkFailed { model: String, reason: String },

    /// Every candidate of the precedence chain failed for one call
    #[error("All providers exhausted after {} attempt(s)", attempts.len())]
    AllProvidersExhausted { attempts: Vec<FailedAttempt> },

    /// Provider answered but rejected the call (non-2xx, malformed body)
    #[error("Provider {provider} failed for '{model}': {source}")]
    ProviderFailed {
        provider: ProviderKind,
        model: String,
        #[source]
        source: AdapterError,
    },

    #[error("Unknown model '{model}'")]
    UnknownModel { model: String },

    #[error("Operation cancelled")]
    Cancelled,
}

impl RouterError {
    /// Lifts an adapter failure into the router taxonomy
    pub fn from_adapter(provider: ProviderKind, model: &str, error: AdapterError) -> Self {
        match error {
            AdapterError::NotConfigured { env_var } => {
                RouterError::ProviderNotConfigured { provider, env_var }
            }
            e if e.is_offline() => RouterError::ProviderUnreachable {
                provider,
                source: e,
            },
            e => RouterError::ProviderFailed {
                provider,
                model: model.to_string(),
                source: e,
            },
        }
    }

    /// Transient failures that the fallback chain or a later call may recover
    /// from. Configuration and validation errors are never retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RouterError::ProviderUnreachable { .. }
                | RouterError::ProviderFailed { .. }
                | RouterError::BenchmarkFailed { .. }
                | RouterError::AllProvidersExhausted { .. }
        )
    }

    pub fn provider(&self) -> Option<ProviderKind> {
        match self {
            RouterError::ProviderUnreachable { provider, .. }
            | RouterError::ProviderNotConfigured { provider, .. }
            | RouterError::ModelPullFailed { provider, .. }
            | RouterError::ProviderFailed { provider, .. } => Some(*provider),
            RouterError::ProviderUnavailable { provider, .. } => *provider,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_configured_is_distinct_from_unreachable() {
        let err = RouterError::from_adapter(
            ProviderKind::OpenAI,
            "gpt-4o",
            AdapterError::NotConfigured {
                env_var: "OPENAI_API_KEY".to_string(),
            },
        );
        assert!(matches!(err, RouterError::ProviderNotConfigured { .. }));
        assert!(!err.is_retryable());
        assert_eq!(err.provider(), Some(ProviderKind::OpenAI));

        let err = RouterError::from_adapter(
            ProviderKind::Ollama,
            "llama3",
            AdapterError::Timeout { millis: 100 },
        );
        assert!(matches!(err, RouterError::ProviderUnreachable { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_exhausted_message_counts_attempts() {
        let err = RouterError::AllProvidersExhausted {
            attempts: vec![
                FailedAttempt {
                    provider: ProviderKind::Ollama,
                    model: "a".to_string(),
                    error: "refused".to_string(),
                },
                FailedAttempt {
                    provider: ProviderKind::Groq,
                    model: "b".to_string(),
                    error: "500".to_string(),
                },
            ],
        };
        assert_eq!(err.to_string(), "All providers exhausted after 2 attempt(s)");
    }

    #[test]
    fn test_unknown_model_not_retryable() {
        let err = RouterError::UnknownModel {
            model: "nope".to_string(),
        };
        assert!(!err.is_retryable());
        assert_eq!(err.provider(), None);
    }
}
