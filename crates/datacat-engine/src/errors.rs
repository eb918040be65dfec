//! Configuration and task-level error types.

use datacat_types::{StageError, StageLabel, StageRole};

/// Problems detected while resolving a task or constructing its stages.
///
/// These are always fatal and are raised before any stage starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing configuration for task '{0}'")]
    TaskNotFound(String),

    #[error("task '{0}' has no sink instances")]
    NoSinks(String),

    #[error("unknown {role} type '{type_tag}' for {stage}")]
    UnknownStageType {
        role: StageRole,
        type_tag: String,
        stage: String,
    },

    #[error("invalid arguments for {stage}: {message}")]
    InvalidArguments { stage: String, message: String },
}

impl ConfigError {
    pub fn invalid_arguments(stage: &StageLabel, message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            stage: stage.to_string(),
            message: message.into(),
        }
    }
}

/// Why a task did not complete.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The task could not be resolved or one of its stages could not be built.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A running stage failed; the whole task is considered failed.
    #[error("task '{task}' failed in {stage}: {source}")]
    Stage {
        task: String,
        stage: StageLabel,
        source: StageError,
    },

    /// Host-side failure such as a panicked stage task.
    #[error("infrastructure error: {0}")]
    Infrastructure(#[from] anyhow::Error),
}

impl PipelineError {
    /// Returns the stage whose runtime error aborted the task, if any.
    #[must_use]
    pub fn failed_stage(&self) -> Option<&StageLabel> {
        match self {
            Self::Stage { stage, .. } => Some(stage),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
