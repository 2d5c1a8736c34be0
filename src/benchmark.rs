//! Comparative benchmark runs
//!
//! Each requested model gets the same fixed evaluation prompt through the
//! registry's generation path. Models are processed in request order, one at a
//! time or in small batches, and a failing model is recorded and skipped over
//! rather than aborting the run.

use crate::catalog::ModelCatalogEntry;
use crate::config::RouterConfig;
use crate::error::RouterError;
use crate::progress::{NoOpHandler, ProgressEvent, ProgressHandler};
use crate::providers::{GenerateRequest, GenerateResponse, ProviderKind, ProviderSnapshot};
use crate::registry::ProviderRegistry;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

pub const MAX_BATCH_SIZE: usize = 4;

pub const EVALUATION_PROMPT: &str = "Write a Rust function named `add` that takes two i32 \
values and returns their sum as an i32. Reply with the code only.";

/// Tokens the evaluation answer is expected to contain
const EXPECTED_KEYWORDS: &[&str] = &["fn", "add", "i32", "->", "+"];

const EVALUATION_MAX_TOKENS: u32 = 256;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkResult {
    pub run_id: Uuid,
    pub model_id: String,
    pub provider: Option<ProviderKind>,
    /// Dispatch to full response; zero when the model never ran
    pub latency_ms: u64,
    pub tokens_per_second: Option<f64>,
    /// Share of expected keywords found in the answer, 0 on failure
    pub quality: f64,
    pub success: bool,
    pub error: Option<String>,
    pub response_chars: usize,
    pub timestamp: DateTime<Utc>,
}

impl BenchmarkResult {
    fn failed(run_id: Uuid, model_id: &str, provider: Option<ProviderKind>, error: RouterError) -> Self {
        let error = match error {
            e @ RouterError::BenchmarkFailed { .. } => e,
            other => RouterError::BenchmarkFailed {
                model: model_id.to_string(),
                reason: other.to_string(),
            },
        };
        Self {
            run_id,
            model_id: model_id.to_string(),
            provider,
            latency_ms: 0,
            tokens_per_second: None,
            quality: 0.0,
            success: false,
            error: Some(error.to_string()),
            response_chars: 0,
            timestamp: Utc::now(),
        }
    }

    fn succeeded(run_id: Uuid, model_id: &str, response: &GenerateResponse) -> Self {
        Self {
            run_id,
            model_id: model_id.to_string(),
            provider: Some(response.provider),
            latency_ms: response.latency.as_millis() as u64,
            tokens_per_second: Some(response.tokens_per_second()),
            quality: score_quality(&response.text),
            success: true,
            error: None,
            response_chars: response.text.chars().count(),
            timestamp: Utc::now(),
        }
    }
}

/// Results of one run, in request order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkRun {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub results: Vec<BenchmarkResult>,
    /// Stopped before every model ran
    pub cancelled: bool,
}

pub fn score_quality(text: &str) -> f64 {
    let found = EXPECTED_KEYWORDS
        .iter()
        .filter(|kw| text.contains(*kw))
        .count();
    found as f64 / EXPECTED_KEYWORDS.len() as f64
}

pub struct BenchmarkOrchestrator {
    registry: Arc<ProviderRegistry>,
    batch_size: usize,
    step_timeout: Duration,
}

impl BenchmarkOrchestrator {
    pub fn new(registry: Arc<ProviderRegistry>, config: &RouterConfig) -> Self {
        Self {
            registry,
            batch_size: config.benchmark_batch_size.clamp(1, MAX_BATCH_SIZE),
            step_timeout: config.benchmark_timeout(),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Benchmarks `model_ids` with no progress reporting or cancellation
    pub async fn run(
        &self,
        model_ids: &[String],
        catalog: &[ModelCatalogEntry],
    ) -> Vec<BenchmarkResult> {
        self.run_with(model_ids, catalog, &CancellationToken::new(), &NoOpHandler)
            .await
            .results
    }

    /// Benchmarks `model_ids` in order.
    ///
    /// Cancellation is checked before each batch starts; models already in
    /// flight finish normally.
    pub async fn run_with(
        &self,
        model_ids: &[String],
        catalog: &[ModelCatalogEntry],
        cancel: &CancellationToken,
        progress: &dyn ProgressHandler,
    ) -> BenchmarkRun {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();
        let total = model_ids.len();
        let mut results = Vec::with_capacity(total);
        let mut cancelled = false;

        progress.on_progress(&ProgressEvent::RunStarted {
            run_id: run_id.to_string(),
            total,
        });

        for (batch_index, batch) in model_ids.chunks(self.batch_size).enumerate() {
            if cancel.is_cancelled() {
                cancelled = true;
                progress.on_progress(&ProgressEvent::RunCancelled {
                    completed: results.len(),
                    remaining: total - results.len(),
                });
                break;
            }

            let first = batch_index * self.batch_size;
            let done_before = results.len();
            for (offset, model) in batch.iter().enumerate() {
                progress.on_progress(&ProgressEvent::ModelStarted {
                    model: model.clone(),
                    index: first + offset,
                    total,
                    fraction: fraction(done_before, total),
                });
            }

            // A fresh snapshot per batch so providers that drop mid-run are seen
            let snapshot = self.registry.snapshot();
            let steps = batch
                .iter()
                .map(|model| self.run_one(run_id, model, catalog, &snapshot));
            let batch_results = join_all(steps).await;

            for (offset, result) in batch_results.into_iter().enumerate() {
                progress.on_progress(&ProgressEvent::ModelCompleted {
                    model: result.model_id.clone(),
                    index: first + offset,
                    total,
                    success: result.success,
                    latency: Duration::from_millis(result.latency_ms),
                    fraction: fraction(results.len() + 1, total),
                });
                results.push(result);
            }
        }

        if !cancelled {
            progress.on_progress(&ProgressEvent::RunCompleted {
                total,
                succeeded: results.iter().filter(|r| r.success).count(),
                elapsed: start.elapsed(),
            });
        }

        BenchmarkRun {
            run_id,
            started_at,
            results,
            cancelled,
        }
    }

    async fn run_one(
        &self,
        run_id: Uuid,
        model_id: &str,
        catalog: &[ModelCatalogEntry],
        snapshot: &ProviderSnapshot,
    ) -> BenchmarkResult {
        let provider = resolve_provider(model_id, catalog, snapshot);
        let Some(provider) = provider else {
            return BenchmarkResult::failed(
                run_id,
                model_id,
                None,
                RouterError::BenchmarkFailed {
                    model: model_id.to_string(),
                    reason: "no reachable provider serves this model".to_string(),
                },
            );
        };

        debug!(model = %model_id, provider = %provider, "Running benchmark step");
        let request = GenerateRequest::new(model_id, EVALUATION_PROMPT)
            .with_temperature(0.0)
            .with_max_tokens(EVALUATION_MAX_TOKENS);

        match tokio::time::timeout(
            self.step_timeout,
            self.registry.generate_with(provider, &request),
        )
        .await
        {
            Ok(Ok(response)) => BenchmarkResult::succeeded(run_id, model_id, &response),
            Ok(Err(e)) => BenchmarkResult::failed(run_id, model_id, Some(provider), e),
            Err(_) => BenchmarkResult::failed(
                run_id,
                model_id,
                Some(provider),
                RouterError::BenchmarkFailed {
                    model: model_id.to_string(),
                    reason: format!("timed out after {}s", self.step_timeout.as_secs()),
                },
            ),
        }
    }
}

impl std::fmt::Debug for BenchmarkOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BenchmarkOrchestrator")
            .field("batch_size", &self.batch_size)
            .field("step_timeout", &self.step_timeout)
            .finish()
    }
}

fn fraction(done: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        done as f64 / total as f64
    }
}

/// Preferred reachable provider for a model id
pub fn resolve_provider(
    model_id: &str,
    catalog: &[ModelCatalogEntry],
    snapshot: &ProviderSnapshot,
) -> Option<ProviderKind> {
    match catalog.iter().find(|e| e.id == model_id) {
        Some(entry) => entry.serving_providers(snapshot).first().copied(),
        None => snapshot.providers_serving(model_id).first().copied(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_score() {
        let answer = "fn add(a: i32, b: i32) -> i32 { a + b }";
        assert!((score_quality(answer) - 1.0).abs() < f64::EPSILON);
        assert_eq!(score_quality("I cannot help with that."), 0.0);
        assert!((score_quality("fn add") - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_fraction_bounds() {
        assert_eq!(fraction(0, 0), 1.0);
        assert_eq!(fraction(0, 4), 0.0);
        assert_eq!(fraction(4, 4), 1.0);
    }

    #[test]
    fn test_failed_result_carries_benchmark_error() {
        let result = BenchmarkResult::failed(
            Uuid::nil(),
            "m",
            Some(ProviderKind::Ollama),
            RouterError::ProviderUnreachable {
                provider: ProviderKind::Ollama,
                source: crate::providers::AdapterError::Timeout { millis: 10 },
            },
        );
        assert!(!result.success);
        assert_eq!(result.quality, 0.0);
        assert!(result.error.unwrap().starts_with("Benchmark of 'm' failed"));
    }
}
