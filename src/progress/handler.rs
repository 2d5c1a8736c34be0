//! Progress handler trait and events

use std::time::Duration;

/// Events emitted during a benchmark run.
///
/// `fraction` is in `[0, 1]` and never decreases within one run.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    RunStarted { run_id: String, total: usize },

    /// A model was dispatched
    ModelStarted {
        model: String,
        index: usize,
        total: usize,
        fraction: f64,
    },

    ModelCompleted {
        model: String,
        index: usize,
        total: usize,
        success: bool,
        latency: Duration,
        fraction: f64,
    },

    /// Cancellation took effect before `remaining` models started
    RunCancelled { completed: usize, remaining: usize },

    RunCompleted {
        total: usize,
        succeeded: usize,
        elapsed: Duration,
    },
}

impl ProgressEvent {
    /// Fraction complete carried by the event, if any
    pub fn fraction(&self) -> Option<f64> {
        match self {
            ProgressEvent::RunStarted { .. } => Some(0.0),
            ProgressEvent::ModelStarted { fraction, .. }
            | ProgressEvent::ModelCompleted { fraction, .. } => Some(*fraction),
            ProgressEvent::RunCompleted { .. } => Some(1.0),
            ProgressEvent::RunCancelled { .. } => None,
        }
    }
}

/// Trait for handling progress events during a run
pub trait ProgressHandler: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingHandler {
        count: Arc<AtomicUsize>,
    }

    impl ProgressHandler for CountingHandler {
        fn on_progress(&self, _event: &ProgressEvent) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_progress_events() {
        let count = Arc::new(AtomicUsize::new(0));
        let handler = CountingHandler {
            count: count.clone(),
        };

        handler.on_progress(&ProgressEvent::RunStarted {
            run_id: "r".to_string(),
            total: 1,
        });
        handler.on_progress(&ProgressEvent::ModelStarted {
            model: "m".to_string(),
            index: 0,
            total: 1,
            fraction: 0.0,
        });
        handler.on_progress(&ProgressEvent::RunCompleted {
            total: 1,
            succeeded: 1,
            elapsed: Duration::from_secs(1),
        });

        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_event_fraction() {
        let event = ProgressEvent::ModelCompleted {
            model: "m".to_string(),
            index: 1,
            total: 4,
            success: false,
            latency: Duration::from_millis(5),
            fraction: 0.5,
        };
        assert_eq!(event.fraction(), Some(0.5));
        assert_eq!(
            ProgressEvent::RunCancelled {
                completed: 1,
                remaining: 2
            }
            .fraction(),
            None
        );
    }
}
