//! Task execution result types.

use datacat_types::{StageLabel, StageRole};

use crate::tracker::{StageReport, StageSummary};

/// Counts and timing of one finished stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageResult {
    pub label: StageLabel,
    pub summary: StageSummary,
    pub duration_secs: f64,
}

impl From<&StageReport> for StageResult {
    fn from(report: &StageReport) -> Self {
        Self {
            label: report.label.clone(),
            summary: report.summary,
            duration_secs: report.duration_secs,
        }
    }
}

/// Result of a successful task run.
#[derive(Debug, Clone)]
pub struct TaskResult {
    pub task: String,
    /// Records emitted by the source.
    pub records_read: u64,
    /// Records consumed across every sink instance.
    pub records_written: u64,
    /// Per-stage results in pipeline order: source, transforms, sinks.
    pub stages: Vec<StageResult>,
    pub duration_secs: f64,
}

impl TaskResult {
    /// Aggregate totals over `stages`, which must already be in pipeline order.
    pub(crate) fn from_stages(task: &str, stages: Vec<StageResult>, duration_secs: f64) -> Self {
        let records_read = stages
            .iter()
            .filter(|s| s.label.role == StageRole::Source)
            .map(|s| s.summary.records_out)
            .sum();
        let records_written = stages
            .iter()
            .filter(|s| s.label.role == StageRole::Sink)
            .map(|s| s.summary.records_in)
            .sum();
        Self {
            task: task.to_string(),
            records_read,
            records_written,
            stages,
            duration_secs,
        }
    }

    /// Results of the sink instances only.
    pub fn sinks(&self) -> impl Iterator<Item = &StageResult> {
        self.stages.iter().filter(|s| s.label.role == StageRole::Sink)
    }
}

/// Result of a task check: every stage was resolved and constructed.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub task: String,
    /// Labels of the constructed stages in pipeline order.
    pub stages: Vec<StageLabel>,
}
