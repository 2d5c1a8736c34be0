//! Terminal progress bar for interactive benchmark runs

use super::{ProgressEvent, ProgressHandler};
use indicatif::{ProgressBar, ProgressStyle};

/// Renders a run as a bar on stderr
pub struct BarHandler {
    bar: ProgressBar,
}

impl BarHandler {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        let template = "{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}";
        if let Ok(style) = ProgressStyle::default_bar().template(template) {
            bar.set_style(style.progress_chars("=> "));
        }
        Self { bar }
    }

    /// For non-interactive output, e.g. tests or `--quiet`
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl Default for BarHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressHandler for BarHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::RunStarted { total, .. } => {
                self.bar.set_length(*total as u64);
                self.bar.set_position(0);
            }
            ProgressEvent::ModelStarted { model, .. } => {
                self.bar.set_message(model.clone());
            }
            ProgressEvent::ModelCompleted { model, success, .. } => {
                if !success {
                    self.bar.println(format!("✗ {} failed", model));
                }
                self.bar.inc(1);
            }
            ProgressEvent::RunCancelled { completed, .. } => {
                self.bar
                    .abandon_with_message(format!("cancelled after {} model(s)", completed));
            }
            ProgressEvent::RunCompleted { succeeded, total, .. } => {
                self.bar.finish_and_clear();
                self.bar
                    .println(format!("{}/{} models benchmarked successfully", succeeded, total));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_bar_advances_per_completed_model() {
        let handler = BarHandler::hidden();
        handler.on_progress(&ProgressEvent::RunStarted {
            run_id: "r".to_string(),
            total: 2,
        });
        for index in 0..2 {
            handler.on_progress(&ProgressEvent::ModelCompleted {
                model: format!("m{}", index),
                index,
                total: 2,
                success: index == 0,
                latency: Duration::from_millis(5),
                fraction: (index + 1) as f64 / 2.0,
            });
        }
        assert_eq!(handler.position(), 2);
    }
}
