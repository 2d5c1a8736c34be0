//! Output formatting for multiple formats
//!
//! JSON and YAML render the library types directly through serde. The human
//! format is a compact text layout per command.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Write as _;

use crate::benchmark::BenchmarkRun;
use crate::catalog::CatalogItem;
use crate::config::RouterConfig;
use crate::hardware::HardwareProfile;
use crate::providers::{GenerateResponse, ProviderKind, ProviderSnapshot};
use crate::recommend::RecommendationSet;

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format
    Yaml,
    /// Human-readable formatted text
    Human,
}

/// Serializable view of one routed generation
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutput {
    pub model: String,
    pub provider: ProviderKind,
    pub latency_ms: u64,
    pub tokens_per_second: f64,
    pub text: String,
}

impl From<&GenerateResponse> for GenerationOutput {
    fn from(response: &GenerateResponse) -> Self {
        Self {
            model: response.model.clone(),
            provider: response.provider,
            latency_ms: response.latency.as_millis() as u64,
            tokens_per_second: response.tokens_per_second(),
            text: response.text.clone(),
        }
    }
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_hardware(&self, profile: &HardwareProfile) -> Result<String> {
        self.structured(profile, "hardware profile", || profile.to_string())
    }

    pub fn format_providers(&self, snapshot: &ProviderSnapshot) -> Result<String> {
        self.structured(snapshot, "provider snapshot", || {
            let mut out = String::new();
            for provider in &snapshot.providers {
                let status = if provider.reachable {
                    match provider.latency_ms {
                        Some(ms) => format!("✓ reachable ({} ms)", ms),
                        None => "✓ reachable".to_string(),
                    }
                } else if provider.not_configured {
                    "✗ not configured".to_string()
                } else {
                    "✗ unreachable".to_string()
                };
                let _ = writeln!(out, "{:<10} {}", provider.kind.to_string(), status);
                if provider.reachable && !provider.models.is_empty() {
                    let _ = writeln!(
                        out,
                        "           {} model(s): {}",
                        provider.models.len(),
                        provider.models.join(", ")
                    );
                } else if let Some(error) = &provider.error {
                    let _ = writeln!(out, "           {}", error);
                }
            }
            let _ = write!(
                out,
                "\n{} of {} providers reachable",
                snapshot.reachable_count(),
                snapshot.providers.len()
            );
            out
        })
    }

    pub fn format_catalog(&self, items: &[CatalogItem]) -> Result<String> {
        self.structured(&items, "catalog", || {
            let mut out = String::new();
            let _ = writeln!(
                out,
                "  {:<30} {:<10} {:>7} {:<8} {:<10}",
                "MODEL", "PROVIDER", "SIZE", "QUANT", "STATUS"
            );
            for item in items {
                let marker = if item.favorite { "*" } else { " " };
                let status = if item.installed {
                    "installed"
                } else if !item.served_by.is_empty() {
                    "available"
                } else {
                    "-"
                };
                let size = if item.entry.is_cloud() {
                    "cloud".to_string()
                } else {
                    format!("{:.1} GB", item.entry.size_gb)
                };
                let _ = writeln!(
                    out,
                    "{} {:<30} {:<10} {:>7} {:<8} {:<10}",
                    marker,
                    item.entry.id,
                    item.entry.provider.to_string(),
                    size,
                    item.entry.quantization,
                    status
                );
            }
            out.trim_end().to_string()
        })
    }

    pub fn format_recommendations(&self, set: &RecommendationSet, limit: usize) -> Result<String> {
        let mut shown = set.clone();
        shown.items.truncate(limit);
        self.structured(&shown, "recommendations", || {
            let mut out = String::new();
            let _ = writeln!(
                out,
                "Recommendations for {} ({} priority)\n",
                set.use_case, set.priority
            );
            if shown.items.is_empty() {
                out.push_str("No model fits the detected hardware.");
                return out;
            }
            for (rank, rec) in shown.items.iter().enumerate() {
                let provider = rec
                    .availability
                    .provider
                    .map_or("offline".to_string(), |p| p.to_string());
                let _ = writeln!(
                    out,
                    "{:>2}. {:<30} {:>6.1}  [{}]",
                    rank + 1,
                    rec.model_id,
                    rec.score,
                    provider
                );
                for reason in &rec.rationale {
                    let _ = writeln!(out, "      - {}", reason);
                }
            }
            out.trim_end().to_string()
        })
    }

    pub fn format_benchmarks(&self, run: &BenchmarkRun) -> Result<String> {
        self.structured(run, "benchmark run", || {
            let mut out = String::new();
            let _ = writeln!(
                out,
                "{:<30} {:<10} {:>10} {:>8} {:>8}",
                "MODEL", "PROVIDER", "LATENCY", "TOK/S", "QUALITY"
            );
            for result in &run.results {
                let provider = result.provider.map_or("-".to_string(), |p| p.to_string());
                if result.success {
                    let _ = writeln!(
                        out,
                        "{:<30} {:<10} {:>8}ms {:>8.1} {:>7.0}%",
                        result.model_id,
                        provider,
                        result.latency_ms,
                        result.tokens_per_second.unwrap_or(0.0),
                        result.quality * 100.0
                    );
                } else {
                    let _ = writeln!(
                        out,
                        "{:<30} {:<10} failed: {}",
                        result.model_id,
                        provider,
                        result.error.as_deref().unwrap_or("unknown error")
                    );
                }
            }
            if run.cancelled {
                out.push_str("\nRun cancelled before all models finished");
            }
            out.trim_end().to_string()
        })
    }

    pub fn format_generation(&self, response: &GenerateResponse) -> Result<String> {
        let output = GenerationOutput::from(response);
        self.structured(&output, "generation", || {
            format!(
                "{}\n\n[{} via {}, {} ms]",
                output.text.trim_end(),
                output.model,
                output.provider,
                output.latency_ms
            )
        })
    }

    pub fn format_config(&self, config: &RouterConfig) -> Result<String> {
        let map: HashMap<String, String> = config.to_display_map();
        self.structured(&map, "config", || config.to_string())
    }

    fn structured<T: Serialize + ?Sized>(
        &self,
        value: &T,
        what: &str,
        human: impl FnOnce() -> String,
    ) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(value)
                .with_context(|| format!("Failed to serialize {} to JSON", what)),
            OutputFormat::Yaml => serde_yaml::to_string(value)
                .with_context(|| format!("Failed to serialize {} to YAML", what)),
            OutputFormat::Human => Ok(human()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::Provider;
    use std::time::Duration;

    fn snapshot() -> ProviderSnapshot {
        ProviderSnapshot {
            generation: 1,
            probed_at: None,
            providers: vec![
                Provider::online(
                    ProviderKind::Ollama,
                    vec!["llama3.1:8b".to_string()],
                    Duration::from_millis(12),
                ),
                Provider::offline(
                    ProviderKind::OpenAI,
                    &crate::providers::AdapterError::NotConfigured {
                        env_var: "OPENAI_API_KEY".to_string(),
                    },
                ),
            ],
        }
    }

    #[test]
    fn test_providers_human() {
        let out = OutputFormatter::new(OutputFormat::Human)
            .format_providers(&snapshot())
            .unwrap();
        assert!(out.contains("reachable (12 ms)"));
        assert!(out.contains("not configured"));
        assert!(out.contains("1 of 2 providers reachable"));
    }

    #[test]
    fn test_providers_json_round_trips() {
        let out = OutputFormatter::new(OutputFormat::Json)
            .format_providers(&snapshot())
            .unwrap();
        let parsed: ProviderSnapshot = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, snapshot());
    }

    #[test]
    fn test_generation_yaml() {
        let response = GenerateResponse {
            text: "hello".to_string(),
            model: "phi3:mini".to_string(),
            provider: ProviderKind::Ollama,
            latency: Duration::from_millis(250),
            completion_tokens: Some(5),
        };
        let out = OutputFormatter::new(OutputFormat::Yaml)
            .format_generation(&response)
            .unwrap();
        assert!(out.contains("model: phi3:mini"));
        assert!(out.contains("latency_ms: 250"));
    }
}
