//! Sequential task runner.

use std::sync::Arc;
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::events::{AssetEvent, Notifier};
use crate::task::{Task, TaskOutput};

/// What a series does when a task fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop at the first failure and return it (full builds)
    Abort,
    /// Log and broadcast the failure, then keep going (dev mode)
    Report,
}

/// Summary of a series run.
#[derive(Debug, Default)]
pub struct SeriesReport {
    /// Tasks that finished successfully, in order
    pub completed: Vec<Task>,

    /// Tasks that failed, with their error message
    pub failed: Vec<(Task, String)>,

    /// Number of files written across all tasks
    pub files_written: usize,

    /// Total time in milliseconds
    pub duration_ms: u64,
}

/// Runs tasks against a shared configuration and reports results on a
/// [`Notifier`].
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    notifier: Notifier,
}

impl Pipeline {
    /// Create a pipeline with its own notifier.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config: Arc::new(config),
            notifier: Notifier::new(),
        }
    }

    /// The configuration every task receives.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Channel carrying an event for every task run.
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Run one task and broadcast its outcome.
    pub fn run(&self, task: Task) -> Result<TaskOutput, PipelineError> {
        tracing::debug!("Starting {}", task);
        let start = Instant::now();

        match task.run(&self.config) {
            Ok(output) => {
                tracing::info!(
                    "Finished {} in {}ms ({} files)",
                    task,
                    start.elapsed().as_millis(),
                    output.written.len()
                );

                if !output.written.is_empty() {
                    self.notifier.send(AssetEvent::Updated {
                        task,
                        paths: output.written.clone(),
                    });
                }

                Ok(output)
            }
            Err(e) => {
                self.notifier.send(AssetEvent::Failed {
                    task,
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Run `tasks` one after another.
    ///
    /// Each task has finished all of its writes before the next one starts.
    pub fn series(&self, tasks: &[Task], policy: FailurePolicy) -> Result<SeriesReport, PipelineError> {
        let start = Instant::now();
        let mut report = SeriesReport::default();

        for &task in tasks {
            match self.run(task) {
                Ok(output) => {
                    report.files_written += output.written.len();
                    report.completed.push(task);
                }
                Err(e) if policy == FailurePolicy::Report => {
                    tracing::error!("{} failed: {}", task, e);
                    report.failed.push((task, e.to_string()));
                }
                Err(e) => return Err(e),
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        Ok(report)
    }
}
