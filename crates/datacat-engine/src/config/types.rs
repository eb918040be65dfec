//! Serde model of the datacat configuration document.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Open, type-specific argument mapping of one stage.
pub type StageArguments = serde_json::Map<String, serde_json::Value>;

/// The whole configuration: resources plus every named task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub resources: ResourceConfig,
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskConfig>,
    /// Directory relative stage paths are resolved against.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

fn default_version() -> String {
    "1.0".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Number of records a stream buffers between two stages.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    1
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// One source, the named adapters applied to its records, and the targets
/// that receive them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    pub source: SourceConfig,
    #[serde(default)]
    pub adapters: BTreeMap<String, AdapterConfig>,
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default)]
    pub arguments: StageArguments,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    #[serde(rename = "type")]
    pub type_tag: String,
    /// Position in the chain; ties are broken by adapter name.
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub arguments: StageArguments,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(rename = "type")]
    pub type_tag: String,
    /// How many sink instances compete for records of the final stream.
    #[serde(default = "default_instances")]
    pub instances: usize,
    #[serde(default)]
    pub arguments: StageArguments,
}

fn default_instances() -> usize {
    1
}
