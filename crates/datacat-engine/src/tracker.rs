//! Completion tracking for the concurrently running stages of one task.
//!
//! Every started stage holds a [`CompletionGuard`]. Dropping the guard
//! decrements the outstanding count, so completion is signalled on every exit
//! path including a panic. [`CompletionTracker::wait`] resolves once the
//! count is back to zero.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use datacat_types::{StageError, StageLabel};
use tokio::sync::watch;

/// Records a stage consumed and produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageSummary {
    pub records_in: u64,
    pub records_out: u64,
}

#[derive(Debug)]
pub enum StageOutcome {
    Succeeded,
    Failed(StageError),
    /// The stage ended without reporting a result (it panicked or was dropped).
    Aborted,
}

/// What one stage reported when it finished.
#[derive(Debug)]
pub struct StageReport {
    pub label: StageLabel,
    pub summary: StageSummary,
    pub duration_secs: f64,
    pub outcome: StageOutcome,
}

struct Inner {
    task: String,
    outstanding: watch::Sender<usize>,
    reports: Mutex<Vec<StageReport>>,
}

/// Shared counter of stages that have started but not yet finished.
#[derive(Clone)]
pub struct CompletionTracker {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for CompletionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionTracker")
            .field("task", &self.inner.task)
            .field("outstanding", &self.outstanding())
            .finish_non_exhaustive()
    }
}

impl CompletionTracker {
    /// Create a tracker for one run of `task`. Trackers are not reused.
    pub fn new(task: impl Into<String>) -> Self {
        let (outstanding, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                task: task.into(),
                outstanding,
                reports: Mutex::new(Vec::new()),
            }),
        }
    }

    #[must_use]
    pub fn task(&self) -> &str {
        &self.inner.task
    }

    /// Count one more running stage. Must happen before the stage runs.
    #[must_use = "dropping the guard immediately marks the stage as finished"]
    pub fn register(&self, label: StageLabel) -> CompletionGuard {
        self.inner.outstanding.send_modify(|n| *n += 1);
        CompletionGuard {
            tracker: self.clone(),
            label,
            started: Instant::now(),
            result: None,
        }
    }

    #[must_use]
    pub fn outstanding(&self) -> usize {
        *self.inner.outstanding.borrow()
    }

    /// Wait until every registered stage has finished.
    pub async fn wait(&self) {
        let mut rx = self.inner.outstanding.subscribe();
        // The sender lives in `self`, so this cannot observe a closed channel.
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Take the reports of every stage finished so far, in completion order.
    #[must_use]
    pub fn take_reports(&self) -> Vec<StageReport> {
        let mut reports = self
            .inner
            .reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *reports)
    }

    /// Register `label` and run `stage` on its own tokio task.
    ///
    /// The future yields the stage's record counts and result; the guard
    /// turns them into a [`StageReport`] once it completes.
    pub(crate) fn spawn<F>(&self, label: StageLabel, stage: F)
    where
        F: Future<Output = (StageSummary, Result<(), StageError>)> + Send + 'static,
    {
        let guard = self.register(label);
        tracing::debug!(task = self.task(), stage = %guard.label(), "Stage started");
        tokio::spawn(async move {
            let (summary, result) = stage.await;
            guard.finish(summary, result);
        });
    }

    fn done(&self, report: StageReport) {
        self.inner
            .reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(report);
        self.inner.outstanding.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// Scoped registration of one running stage.
pub struct CompletionGuard {
    tracker: CompletionTracker,
    label: StageLabel,
    started: Instant,
    result: Option<(StageSummary, StageOutcome)>,
}

impl CompletionGuard {
    #[must_use]
    pub fn label(&self) -> &StageLabel {
        &self.label
    }

    /// Record the stage result and signal completion.
    pub fn finish(mut self, summary: StageSummary, result: Result<(), StageError>) {
        let outcome = match result {
            Ok(()) => StageOutcome::Succeeded,
            Err(err) => StageOutcome::Failed(err),
        };
        self.result = Some((summary, outcome));
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        let duration_secs = self.started.elapsed().as_secs_f64();
        let (summary, outcome) = self
            .result
            .take()
            .unwrap_or((StageSummary::default(), StageOutcome::Aborted));
        let task = self.tracker.task();

        match &outcome {
            StageOutcome::Succeeded => tracing::info!(
                task,
                stage = %self.label,
                records_in = summary.records_in,
                records_out = summary.records_out,
                duration_secs,
                "Stage finished"
            ),
            StageOutcome::Failed(err) if err.is_secondary() => tracing::warn!(
                task,
                stage = %self.label,
                records_out = summary.records_out,
                "Stage stopped: {}",
                err
            ),
            StageOutcome::Failed(err) => tracing::error!(
                task,
                stage = %self.label,
                records_in = summary.records_in,
                records_out = summary.records_out,
                "Stage failed: {}",
                err
            ),
            StageOutcome::Aborted => {
                tracing::error!(task, stage = %self.label, "Stage aborted without a result");
            }
        }

        self.tracker.done(StageReport {
            label: self.label.clone(),
            summary,
            duration_secs,
            outcome,
        });
    }
}
