//! Adapter-level errors
//!
//! These describe what went wrong while talking to a single provider. The
//! registry and router lift them into [`crate::error::RouterError`] once the
//! offending provider and model are known.

use thiserror::Error;

/// Errors that can occur while talking to one provider adapter
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdapterError {
    /// Connection refused, DNS failure or similar: the provider is offline
    #[error("Connection failed: {message}")]
    Unreachable { message: String },

    /// Request did not complete within its upper bound
    #[error("Request timed out after {millis} ms")]
    Timeout { millis: u64 },

    /// Provider answered with a non-2xx status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Response body did not match the provider's expected shape
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    /// Cloud provider has no credential available
    #[error("No credential configured (expected {env_var})")]
    NotConfigured { env_var: String },

    /// Provider does not implement the requested operation
    #[error("Operation not supported: {operation}")]
    Unsupported { operation: String },

    /// Requested model is not served by the provider
    #[error("Model '{model}' not found")]
    ModelNotFound { model: String },

    /// Failure reported by the SDK client used for cloud generation
    #[error("Provider call failed: {message}")]
    Backend { message: String },
}

impl AdapterError {
    /// Maps a reqwest transport error, treating timeouts and refused
    /// connections the same way: the provider is offline.
    pub fn from_reqwest(err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            AdapterError::Timeout { millis: timeout_ms }
        } else if err.is_connect() {
            AdapterError::Unreachable {
                message: err.to_string(),
            }
        } else if err.is_decode() {
            AdapterError::InvalidResponse {
                message: err.to_string(),
            }
        } else {
            AdapterError::Unreachable {
                message: err.to_string(),
            }
        }
    }

    /// True when the failure means "provider offline" rather than a
    /// configuration or request problem.
    pub fn is_offline(&self) -> bool {
        matches!(
            self,
            AdapterError::Unreachable { .. } | AdapterError::Timeout { .. }
        )
    }
}
