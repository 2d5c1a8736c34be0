//! Configuration management for modelrouter
//!
//! Settings are loaded from environment variables with sensible defaults.
//!
//! # Environment Variables
//!
//! - `OLLAMA_HOST`: Ollama endpoint - default: "http://localhost:11434"
//! - `LMSTUDIO_HOST`: LM Studio endpoint - default: "http://localhost:1234"
//! - `MODELROUTER_PROBE_TIMEOUT_MS`: discovery probe bound - default: "3000"
//! - `MODELROUTER_GENERATION_TIMEOUT`: seconds per generation attempt - default: "120"
//! - `MODELROUTER_PULL_TIMEOUT`: seconds per model pull - default: "1800"
//! - `MODELROUTER_BENCHMARK_TIMEOUT`: seconds per benchmarked model - default: "60"
//! - `MODELROUTER_BENCHMARK_BATCH`: models benchmarked concurrently (1-4) - default: "1"
//! - `MODELROUTER_PRECEDENCE`: comma-separated fallback order - default: ollama,lmstudio,anthropic,openai,gemini,groq
//! - `MODELROUTER_HARDWARE_POLICY`: exclude|penalize - default: "exclude"
//! - `MODELROUTER_STATE_DIR`: where favorites are stored - default: platform data dir + "modelrouter"
//! - `MODELROUTER_LOG_LEVEL`: logging level - default: "info"
//!
//! Cloud credentials are read by the credential source, not by this module:
//! `ANTHROPIC_API_KEY`, `OPENAI_API_KEY`, `GEMINI_API_KEY` (or `GOOGLE_API_KEY`),
//! `GROQ_API_KEY`.

use crate::providers::{AdapterTimeouts, ProviderKind};
use crate::recommend::HardwarePolicy;
use crate::router::DEFAULT_PRECEDENCE;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
const DEFAULT_LMSTUDIO_HOST: &str = "http://localhost:1234";
const DEFAULT_PROBE_TIMEOUT_MS: u64 = 3_000;
const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 120;
const DEFAULT_PULL_TIMEOUT_SECS: u64 = 1_800;
const DEFAULT_BENCHMARK_TIMEOUT_SECS: u64 = 60;
const DEFAULT_BENCHMARK_BATCH: usize = 1;
const MAX_BENCHMARK_BATCH: usize = 4;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouterConfig {
    pub ollama_host: String,
    pub lmstudio_host: String,
    pub probe_timeout_ms: u64,
    pub generation_timeout_secs: u64,
    pub pull_timeout_secs: u64,
    pub benchmark_timeout_secs: u64,
    pub benchmark_batch_size: usize,
    /// Fallback order, highest priority first
    pub precedence: Vec<ProviderKind>,
    /// Raw `MODELROUTER_PRECEDENCE` value, re-checked by `validate`
    pub precedence_override: Option<String>,
    pub hardware_policy: HardwarePolicy,
    /// Directory for persisted favorites; `None` keeps them in memory only
    pub state_dir: Option<PathBuf>,
    pub log_level: String,
}

impl Default for RouterConfig {
    /// Loads `MODELROUTER_*` environment variables, falling back to defaults
    /// for anything missing or unparsable.
    fn default() -> Self {
        let ollama_host =
            env::var("OLLAMA_HOST").unwrap_or_else(|_| DEFAULT_OLLAMA_HOST.to_string());
        let lmstudio_host =
            env::var("LMSTUDIO_HOST").unwrap_or_else(|_| DEFAULT_LMSTUDIO_HOST.to_string());

        let probe_timeout_ms = env_parse("MODELROUTER_PROBE_TIMEOUT_MS", DEFAULT_PROBE_TIMEOUT_MS);
        let generation_timeout_secs = env_parse(
            "MODELROUTER_GENERATION_TIMEOUT",
            DEFAULT_GENERATION_TIMEOUT_SECS,
        );
        let pull_timeout_secs = env_parse("MODELROUTER_PULL_TIMEOUT", DEFAULT_PULL_TIMEOUT_SECS);
        let benchmark_timeout_secs =
            env_parse("MODELROUTER_BENCHMARK_TIMEOUT", DEFAULT_BENCHMARK_TIMEOUT_SECS);
        let benchmark_batch_size = env_parse("MODELROUTER_BENCHMARK_BATCH", DEFAULT_BENCHMARK_BATCH);

        let precedence_override = env::var("MODELROUTER_PRECEDENCE").ok();
        let precedence = precedence_override
            .as_deref()
            .and_then(|v| parse_precedence(v).ok())
            .unwrap_or_else(|| DEFAULT_PRECEDENCE.to_vec());

        let hardware_policy = env::var("MODELROUTER_HARDWARE_POLICY")
            .ok()
            .and_then(|v| v.parse::<HardwarePolicy>().ok())
            .unwrap_or_default();

        let state_dir = env::var("MODELROUTER_STATE_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::data_dir().map(|d| d.join("modelrouter")));

        let log_level = env::var("MODELROUTER_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            ollama_host,
            lmstudio_host,
            probe_timeout_ms,
            generation_timeout_secs,
            pull_timeout_secs,
            benchmark_timeout_secs,
            benchmark_batch_size,
            precedence,
            precedence_override,
            hardware_policy,
            state_dir,
            log_level,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Parses a comma-separated provider list, rejecting unknown names and
/// duplicates.
pub fn parse_precedence(value: &str) -> Result<Vec<ProviderKind>, ConfigError> {
    let mut order = Vec::new();
    for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let kind = part
            .parse::<ProviderKind>()
            .map_err(|error| ConfigError::ParseError {
                field: "MODELROUTER_PRECEDENCE".to_string(),
                error,
            })?;
        if order.contains(&kind) {
            return Err(ConfigError::ParseError {
                field: "MODELROUTER_PRECEDENCE".to_string(),
                error: format!("duplicate provider '{}'", kind),
            });
        }
        order.push(kind);
    }
    if order.is_empty() {
        return Err(ConfigError::ParseError {
            field: "MODELROUTER_PRECEDENCE".to_string(),
            error: "empty provider list".to_string(),
        });
    }
    Ok(order)
}

impl RouterConfig {
    /// Checks that timeouts, batch size and log level are in range and that
    /// any precedence override names each known provider at most once
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.probe_timeout_ms < 50 || self.probe_timeout_ms > 60_000 {
            return Err(ConfigError::ValidationFailed(
                "Probe timeout must be between 50 ms and 60 s".to_string(),
            ));
        }
        if self.generation_timeout_secs == 0 || self.generation_timeout_secs > 600 {
            return Err(ConfigError::ValidationFailed(
                "Generation timeout must be between 1 second and 10 minutes".to_string(),
            ));
        }
        if self.pull_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Pull timeout must be at least 1 second".to_string(),
            ));
        }
        if self.benchmark_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Benchmark timeout must be at least 1 second".to_string(),
            ));
        }
        if self.benchmark_batch_size == 0 || self.benchmark_batch_size > MAX_BENCHMARK_BATCH {
            return Err(ConfigError::ValidationFailed(format!(
                "Benchmark batch size must be between 1 and {}",
                MAX_BENCHMARK_BATCH
            )));
        }
        if let Some(raw) = &self.precedence_override {
            parse_precedence(raw)?;
        }
        if self.precedence.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Precedence chain cannot be empty".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn adapter_timeouts(&self) -> AdapterTimeouts {
        AdapterTimeouts {
            probe: Duration::from_millis(self.probe_timeout_ms),
            generate: Duration::from_secs(self.generation_timeout_secs),
            pull: Duration::from_secs(self.pull_timeout_secs),
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    pub fn pull_timeout(&self) -> Duration {
        Duration::from_secs(self.pull_timeout_secs)
    }

    pub fn benchmark_timeout(&self) -> Duration {
        Duration::from_secs(self.benchmark_timeout_secs)
    }

    /// Path of the favorites file, if persistence is enabled
    pub fn favorites_path(&self) -> Option<PathBuf> {
        self.state_dir.as_ref().map(|d| d.join("favorites.json"))
    }

    pub fn to_display_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();

        map.insert("ollama_host".to_string(), self.ollama_host.clone());
        map.insert("lmstudio_host".to_string(), self.lmstudio_host.clone());
        map.insert(
            "probe_timeout_ms".to_string(),
            self.probe_timeout_ms.to_string(),
        );
        map.insert(
            "generation_timeout_secs".to_string(),
            self.generation_timeout_secs.to_string(),
        );
        map.insert(
            "pull_timeout_secs".to_string(),
            self.pull_timeout_secs.to_string(),
        );
        map.insert(
            "benchmark_timeout_secs".to_string(),
            self.benchmark_timeout_secs.to_string(),
        );
        map.insert(
            "benchmark_batch_size".to_string(),
            self.benchmark_batch_size.to_string(),
        );
        map.insert("precedence".to_string(), self.precedence_string());
        map.insert(
            "hardware_policy".to_string(),
            self.hardware_policy.to_string(),
        );
        if let Some(ref dir) = self.state_dir {
            map.insert("state_dir".to_string(), dir.display().to_string());
        }
        map.insert("log_level".to_string(), self.log_level.clone());

        map
    }

    fn precedence_string(&self) -> String {
        self.precedence
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for RouterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Modelrouter Configuration:")?;
        writeln!(f, "  Ollama Host: {}", self.ollama_host)?;
        writeln!(f, "  LM Studio Host: {}", self.lmstudio_host)?;
        writeln!(f, "  Probe Timeout: {}ms", self.probe_timeout_ms)?;
        writeln!(f, "  Generation Timeout: {}s", self.generation_timeout_secs)?;
        writeln!(f, "  Pull Timeout: {}s", self.pull_timeout_secs)?;
        writeln!(f, "  Benchmark Timeout: {}s", self.benchmark_timeout_secs)?;
        writeln!(f, "  Benchmark Batch: {}", self.benchmark_batch_size)?;
        writeln!(f, "  Precedence: {}", self.precedence_string())?;
        writeln!(f, "  Hardware Policy: {}", self.hardware_policy)?;
        if let Some(ref dir) = self.state_dir {
            writeln!(f, "  State Dir: {}", dir.display())?;
        }
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}
