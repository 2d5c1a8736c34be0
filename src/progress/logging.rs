//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::RunStarted { run_id, total } => {
                info!(run_id = %run_id, models = total, "Starting benchmark run");
            }
            ProgressEvent::ModelStarted {
                model,
                index,
                total,
                ..
            } => {
                debug!(
                    model = %model,
                    progress = format!("{}/{}", index + 1, total),
                    "Benchmarking model"
                );
            }
            ProgressEvent::ModelCompleted {
                model,
                index,
                total,
                success,
                latency,
                ..
            } => {
                if *success {
                    info!(
                        model = %model,
                        progress = format!("{}/{}", index + 1, total),
                        latency_ms = latency.as_millis() as u64,
                        "Benchmark step complete"
                    );
                } else {
                    warn!(
                        model = %model,
                        progress = format!("{}/{}", index + 1, total),
                        "Benchmark step failed"
                    );
                }
            }
            ProgressEvent::RunCancelled {
                completed,
                remaining,
            } => {
                warn!(completed, remaining, "Benchmark run cancelled");
            }
            ProgressEvent::RunCompleted {
                total,
                succeeded,
                elapsed,
            } => {
                info!(
                    total,
                    succeeded,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Benchmark run complete"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_logging_handler_handles_every_event() {
        let handler = LoggingHandler;
        let events = vec![
            ProgressEvent::RunStarted {
                run_id: "abc".to_string(),
                total: 2,
            },
            ProgressEvent::ModelStarted {
                model: "a".to_string(),
                index: 0,
                total: 2,
                fraction: 0.0,
            },
            ProgressEvent::ModelCompleted {
                model: "a".to_string(),
                index: 0,
                total: 2,
                success: true,
                latency: Duration::from_millis(10),
                fraction: 0.5,
            },
            ProgressEvent::ModelCompleted {
                model: "b".to_string(),
                index: 1,
                total: 2,
                success: false,
                latency: Duration::from_millis(10),
                fraction: 1.0,
            },
            ProgressEvent::RunCancelled {
                completed: 1,
                remaining: 1,
            },
            ProgressEvent::RunCompleted {
                total: 2,
                succeeded: 1,
                elapsed: Duration::from_secs(1),
            },
        ];

        for event in events {
            handler.on_progress(&event);
        }
    }
}
