//! Task resolution: turn a task name into the ordered stage specifications
//! the orchestrator builds.

use std::path::PathBuf;

use datacat_types::StageLabel;

use crate::config::types::{EngineConfig, StageArguments};
use crate::errors::ConfigError;

/// Configuration of one stage instance, ready to hand to the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct StageSpec {
    pub label: StageLabel,
    pub type_tag: String,
    pub arguments: StageArguments,
}

/// Everything needed to run one task.
#[derive(Debug, Clone)]
pub struct ResolvedTask {
    pub name: String,
    pub source: StageSpec,
    /// Sorted ascending by `order`, ties broken by adapter name.
    pub transforms: Vec<StageSpec>,
    /// One entry per sink instance.
    pub sinks: Vec<StageSpec>,
    pub channel_capacity: usize,
    pub base_dir: Option<PathBuf>,
}

/// Looks up the configuration of a named task.
pub trait ConfigResolver: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ConfigError::TaskNotFound`] when no task has this name and
    /// [`ConfigError::NoSinks`] when its targets expand to no sink instance.
    fn resolve(&self, task: &str) -> Result<ResolvedTask, ConfigError>;

    /// Names of every configured task.
    fn task_names(&self) -> Vec<String>;
}

impl ConfigResolver for EngineConfig {
    fn resolve(&self, task: &str) -> Result<ResolvedTask, ConfigError> {
        let config = self
            .tasks
            .get(task)
            .ok_or_else(|| ConfigError::TaskNotFound(task.to_string()))?;

        let source = StageSpec {
            label: StageLabel::source(),
            type_tag: config.source.type_tag.clone(),
            arguments: config.source.arguments.clone(),
        };

        // BTreeMap iteration is name-ordered and the sort is stable, so equal
        // orders keep name order.
        let mut adapters: Vec<_> = config.adapters.iter().collect();
        adapters.sort_by_key(|(_, adapter)| adapter.order);
        let transforms = adapters
            .into_iter()
            .map(|(name, adapter)| StageSpec {
                label: StageLabel::transform(name.clone()),
                type_tag: adapter.type_tag.clone(),
                arguments: adapter.arguments.clone(),
            })
            .collect();

        let sinks: Vec<_> = config
            .targets
            .iter()
            .enumerate()
            .flat_map(|(index, target)| {
                (0..target.instances).map(move |instance| StageSpec {
                    label: StageLabel::sink(format!("target[{index}]"), instance),
                    type_tag: target.type_tag.clone(),
                    arguments: target.arguments.clone(),
                })
            })
            .collect();
        if sinks.is_empty() {
            return Err(ConfigError::NoSinks(task.to_string()));
        }

        Ok(ResolvedTask {
            name: task.to_string(),
            source,
            transforms,
            sinks,
            channel_capacity: self.resources.channel_capacity.max(1),
            base_dir: self.base_dir.clone(),
        })
    }

    fn task_names(&self) -> Vec<String> {
        self.tasks.keys().cloned().collect()
    }
}
