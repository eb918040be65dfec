//! Pipeline execution engine for datacat tasks.
//!
//! A task moves [`Record`](datacat_types::Record)s from one source, through
//! zero or more ordered transforms, into one or more sinks. Every stage runs
//! as its own tokio task; stages hand records to each other over bounded
//! [`stream`]s and report completion through a shared
//! [`CompletionTracker`](tracker::CompletionTracker).

pub mod config;
pub mod errors;
pub mod orchestrator;
pub mod registry;
pub mod result;
pub mod stage;
pub mod stream;
pub mod tracker;

pub use config::resolve::{ConfigResolver, ResolvedTask, StageSpec};
pub use errors::{ConfigError, PipelineError};
pub use orchestrator::{check_task, run_task, TaskState};
pub use registry::{parse_arguments, StageRegistry};
pub use result::{CheckResult, StageResult, TaskResult};
pub use stage::{mapped, RecordMapper, Sink, Source, StageContext, Transform};
pub use stream::{RecordSender, RecordStream};
pub use tracker::{CompletionTracker, StageSummary};
