//! Task orchestrator: resolves a task, builds its stages, wires them together
//! and waits for all of them to finish.

use std::fmt;
use std::time::Instant;

use datacat_types::StageLabel;

use crate::config::resolve::{ConfigResolver, ResolvedTask};
use crate::errors::{ConfigError, PipelineError};
use crate::registry::StageRegistry;
use crate::result::{CheckResult, StageResult, TaskResult};
use crate::stage::{BuiltSink, BuiltSource, BuiltTransform, StageContext};
use crate::tracker::{CompletionTracker, StageOutcome, StageReport};

/// Lifecycle of one task run. Runs are never retried; each call to
/// [`run_task`] walks this sequence once with a fresh tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Resolving,
    Starting,
    Streaming,
    Draining,
    Finished,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Resolving => "resolving",
            Self::Starting => "starting",
            Self::Streaming => "streaming",
            Self::Draining => "draining",
            Self::Finished => "finished",
        };
        f.write_str(s)
    }
}

/// Every stage of a task, constructed but not yet started.
struct TaskStages {
    source: BuiltSource,
    transforms: Vec<BuiltTransform>,
    sinks: Vec<BuiltSink>,
}

impl TaskStages {
    fn labels(&self) -> Vec<StageLabel> {
        std::iter::once(self.source.label())
            .chain(self.transforms.iter().map(BuiltTransform::label))
            .chain(self.sinks.iter().map(BuiltSink::label))
            .cloned()
            .collect()
    }
}

fn enter(task: &str, state: TaskState) {
    tracing::debug!(task, state = %state, "Task state changed");
}

/// Construct every stage of `resolved`, in pipeline order.
///
/// Nothing is started here, so a bad type tag or argument anywhere in the
/// task fails before any record moves.
fn build_stages(
    registry: &StageRegistry,
    resolved: &ResolvedTask,
) -> Result<TaskStages, ConfigError> {
    let context = |label: &StageLabel| StageContext {
        task: resolved.name.clone(),
        label: label.clone(),
        base_dir: resolved.base_dir.clone(),
    };

    let source = registry.build_source(&context(&resolved.source.label), &resolved.source)?;
    let transforms = resolved
        .transforms
        .iter()
        .map(|spec| registry.build_transform(&context(&spec.label), spec))
        .collect::<Result<Vec<_>, _>>()?;
    let sinks = resolved
        .sinks
        .iter()
        .map(|spec| registry.build_sink(&context(&spec.label), spec))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TaskStages {
        source,
        transforms,
        sinks,
    })
}

/// Start every stage, threading each output into the next stage's input.
/// Multiple sinks compete for records from the final stream.
fn start_stages(stages: TaskStages, tracker: &CompletionTracker, capacity: usize) {
    let mut stream = stages.source.start(tracker, capacity);
    for transform in stages.transforms {
        stream = transform.start(tracker, stream, capacity);
    }

    let mut sinks = stages.sinks;
    if sinks.len() == 1 {
        if let Some(sink) = sinks.pop() {
            sink.start(tracker, stream);
        }
        return;
    }

    let inputs = stream.share(sinks.len());
    for (sink, input) in sinks.into_iter().zip(inputs) {
        sink.start(tracker, input);
    }
}

/// Pick the error to report for a finished task.
///
/// The first root-cause failure in completion order wins. A stage that
/// ended without a result (a panic) counts as a root cause. Stages that
/// only stopped because their consumer went away are reported when nothing
/// else failed.
fn select_failure(task: &str, reports: Vec<StageReport>) -> Option<PipelineError> {
    let mut secondary = None;
    for report in reports {
        match report.outcome {
            StageOutcome::Succeeded => {}
            StageOutcome::Failed(err) if err.is_secondary() => {
                if secondary.is_none() {
                    secondary = Some((report.label, err));
                }
            }
            StageOutcome::Failed(err) => {
                return Some(PipelineError::Stage {
                    task: task.to_string(),
                    stage: report.label,
                    source: err,
                });
            }
            StageOutcome::Aborted => {
                return Some(PipelineError::Infrastructure(anyhow::anyhow!(
                    "{} of task '{}' panicked",
                    report.label,
                    task
                )));
            }
        }
    }
    secondary.map(|(stage, source)| PipelineError::Stage {
        task: task.to_string(),
        stage,
        source,
    })
}

/// Run the task named `task` to completion.
///
/// # Errors
///
/// Returns [`PipelineError::Config`] if the task cannot be resolved or any
/// stage cannot be constructed; in that case no stage was started. Returns
/// [`PipelineError::Stage`] or [`PipelineError::Infrastructure`] if a stage
/// failed while running. Every started stage has finished by the time this
/// returns, whatever the outcome.
pub async fn run_task(
    resolver: &dyn ConfigResolver,
    registry: &StageRegistry,
    task: &str,
) -> Result<TaskResult, PipelineError> {
    let start = Instant::now();
    tracing::info!(task, "Starting task run");

    enter(task, TaskState::Resolving);
    let resolved = resolver.resolve(task)?;

    enter(task, TaskState::Starting);
    let stages = build_stages(registry, &resolved)?;
    let order = stages.labels();
    let tracker = CompletionTracker::new(task);
    tracing::info!(
        task,
        transforms = resolved.transforms.len(),
        sinks = resolved.sinks.len(),
        channel_capacity = resolved.channel_capacity,
        "Starting stages"
    );
    start_stages(stages, &tracker, resolved.channel_capacity);

    enter(task, TaskState::Streaming);
    enter(task, TaskState::Draining);
    tracker.wait().await;

    enter(task, TaskState::Finished);
    let duration_secs = start.elapsed().as_secs_f64();
    let reports = tracker.take_reports();

    let mut stage_results: Vec<StageResult> = reports.iter().map(StageResult::from).collect();
    stage_results.sort_by_key(|s| {
        order
            .iter()
            .position(|label| *label == s.label)
            .unwrap_or(usize::MAX)
    });

    if let Some(err) = select_failure(task, reports) {
        tracing::error!(task, duration_secs, "Task failed: {}", err);
        return Err(err);
    }

    let result = TaskResult::from_stages(task, stage_results, duration_secs);
    tracing::info!(
        task,
        records_read = result.records_read,
        records_written = result.records_written,
        duration_secs,
        "Task run completed"
    );
    Ok(result)
}

/// Resolve `task` and construct every stage without starting any.
///
/// # Errors
///
/// Returns [`PipelineError::Config`] describing the first problem found.
pub fn check_task(
    resolver: &dyn ConfigResolver,
    registry: &StageRegistry,
    task: &str,
) -> Result<CheckResult, PipelineError> {
    tracing::info!(task, "Checking task configuration");
    let resolved = resolver.resolve(task)?;
    let stages = build_stages(registry, &resolved)?;
    Ok(CheckResult {
        task: task.to_string(),
        stages: stages.labels(),
    })
}
