//! Benchmark runs over scripted providers

mod support;

use modelrouter::providers::{AdapterError, MockReply, ProviderAdapter};
use modelrouter::{
    BenchmarkOrchestrator, ProgressEvent, ProviderKind, ProviderRegistry, RouterConfig,
};
use std::sync::Arc;
use support::{mock, RecordingHandler};
use tokio_util::sync::CancellationToken;

fn ids(models: &[&str]) -> Vec<String> {
    models.iter().map(|m| m.to_string()).collect()
}

/// `a` and `c` answer from Ollama, `b` always fails on LM Studio
async fn setup(batch_size: usize) -> BenchmarkOrchestrator {
    let ollama = mock(ProviderKind::Ollama, &["a", "c"]);
    ollama.set_default_reply(MockReply::text("fn add(a: i32, b: i32) -> i32 { a + b }"));
    let lmstudio = mock(ProviderKind::LmStudio, &["b"]);
    lmstudio.set_default_reply(MockReply::error(AdapterError::Api {
        status: 500,
        message: "model crashed".to_string(),
    }));

    let config = RouterConfig {
        benchmark_batch_size: batch_size,
        ..RouterConfig::default()
    };
    let adapters: Vec<Arc<dyn ProviderAdapter>> = vec![ollama, lmstudio];
    let registry = Arc::new(ProviderRegistry::new(adapters, &config));
    registry.discover().await;
    BenchmarkOrchestrator::new(registry, &config)
}

#[tokio::test]
async fn test_failure_is_isolated_and_order_preserved() {
    for batch_size in [1, 2, 3] {
        let orchestrator = setup(batch_size).await;
        let results = orchestrator.run(&ids(&["a", "b", "c"]), &[]).await;

        let order: Vec<&str> = results.iter().map(|r| r.model_id.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"], "batch size {}", batch_size);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert!(results[2].success);

        assert_eq!(results[1].provider, Some(ProviderKind::LmStudio));
        assert!(results[1].error.as_ref().unwrap().contains("model crashed"));
        assert_eq!(results[1].quality, 0.0);
        assert!((results[0].quality - 1.0).abs() < 1e-9);
        assert!(results.iter().all(|r| r.run_id == results[0].run_id));
    }
}

#[tokio::test]
async fn test_unserved_model_fails_without_dispatch() {
    let orchestrator = setup(1).await;
    let results = orchestrator.run(&ids(&["a", "ghost"]), &[]).await;
    assert_eq!(results.len(), 2);
    assert!(results[0].success);
    assert!(!results[1].success);
    assert_eq!(results[1].provider, None);
}

#[tokio::test]
async fn test_progress_fraction_is_monotonic() {
    let orchestrator = setup(2).await;
    let handler = RecordingHandler::default();
    let run = orchestrator
        .run_with(
            &ids(&["a", "b", "c"]),
            &[],
            &CancellationToken::new(),
            &handler,
        )
        .await;
    assert!(!run.cancelled);

    let events = handler.events();
    assert!(matches!(events.first(), Some(ProgressEvent::RunStarted { total: 3, .. })));
    assert!(matches!(
        events.last(),
        Some(ProgressEvent::RunCompleted {
            total: 3,
            succeeded: 2,
            ..
        })
    ));

    let fractions: Vec<f64> = events.iter().filter_map(|e| e.fraction()).collect();
    assert!(fractions.windows(2).all(|w| w[0] <= w[1]), "{:?}", fractions);
    assert!(fractions.iter().all(|f| (0.0..=1.0).contains(f)));
    assert_eq!(fractions.last().copied(), Some(1.0));
}

#[tokio::test]
async fn test_cancelled_before_start_runs_nothing() {
    let orchestrator = setup(1).await;
    let cancel = CancellationToken::new();
    cancel.cancel();
    let handler = RecordingHandler::default();

    let run = orchestrator
        .run_with(&ids(&["a", "b", "c"]), &[], &cancel, &handler)
        .await;
    assert!(run.cancelled);
    assert!(run.results.is_empty());
    assert!(handler.events().iter().any(|e| matches!(
        e,
        ProgressEvent::RunCancelled {
            completed: 0,
            remaining: 3
        }
    )));
}

#[tokio::test]
async fn test_cancel_between_steps_keeps_finished_results() {
    let orchestrator = setup(1).await;
    let cancel = CancellationToken::new();

    struct CancelAfterFirst(CancellationToken);
    impl modelrouter::ProgressHandler for CancelAfterFirst {
        fn on_progress(&self, event: &ProgressEvent) {
            if let ProgressEvent::ModelCompleted { index: 0, .. } = event {
                self.0.cancel();
            }
        }
    }

    let run = orchestrator
        .run_with(
            &ids(&["a", "b", "c"]),
            &[],
            &cancel,
            &CancelAfterFirst(cancel.clone()),
        )
        .await;
    assert!(run.cancelled);
    assert_eq!(run.results.len(), 1);
    assert_eq!(run.results[0].model_id, "a");
}

#[tokio::test]
async fn test_batch_size_is_clamped() {
    assert_eq!(setup(0).await.batch_size(), 1);
    assert_eq!(setup(16).await.batch_size(), 4);
}
