//! Credential lookup for cloud providers
//!
//! The router never stores keys. It asks a [`CredentialSource`] for a usable
//! key at call time and treats `None` as "not configured".

use super::ProviderKind;
use std::collections::HashMap;

/// External key-management collaborator
pub trait CredentialSource: Send + Sync {
    fn api_key(&self, kind: ProviderKind) -> Option<String>;
}

/// Reads keys from the provider's conventional environment variable
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn api_key(&self, kind: ProviderKind) -> Option<String> {
        let var = kind.key_env_var()?;
        let key = std::env::var(var).ok().or_else(|| {
            // Gemini also accepts GOOGLE_API_KEY
            if kind == ProviderKind::Gemini {
                std::env::var("GOOGLE_API_KEY").ok()
            } else {
                None
            }
        })?;
        let key = key.trim().to_string();
        (!key.is_empty()).then_some(key)
    }
}

/// Fixed in-memory keys, handed over by an embedding application
#[derive(Debug, Default, Clone)]
pub struct StaticCredentials {
    keys: HashMap<ProviderKind, String>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, kind: ProviderKind, key: impl Into<String>) -> Self {
        self.keys.insert(kind, key.into());
        self
    }
}

impl CredentialSource for StaticCredentials {
    fn api_key(&self, kind: ProviderKind) -> Option<String> {
        self.keys.get(&kind).cloned()
    }
}
