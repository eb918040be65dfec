//! Stage roles and labels.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The three capability roles a stage can play in a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageRole {
    Source,
    Transform,
    Sink,
}

impl fmt::Display for StageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Source => "source",
            Self::Transform => "transform",
            Self::Sink => "sink",
        };
        f.write_str(s)
    }
}

/// Identifies one stage instance within a task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StageLabel {
    pub role: StageRole,
    /// Configured name: `source`, the adapter key, or `target[<index>]`.
    pub name: String,
    /// Instance number; only sinks run more than one instance per configuration.
    pub instance: usize,
}

impl StageLabel {
    pub fn source() -> Self {
        Self {
            role: StageRole::Source,
            name: "source".to_string(),
            instance: 0,
        }
    }

    pub fn transform(name: impl Into<String>) -> Self {
        Self {
            role: StageRole::Transform,
            name: name.into(),
            instance: 0,
        }
    }

    pub fn sink(name: impl Into<String>, instance: usize) -> Self {
        Self {
            role: StageRole::Sink,
            name: name.into(),
            instance,
        }
    }
}

impl fmt::Display for StageLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.role {
            StageRole::Sink => write!(f, "{} '{}' #{}", self.role, self.name, self.instance),
            _ => write!(f, "{} '{}'", self.role, self.name),
        }
    }
}
