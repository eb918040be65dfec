//! Semantic validation for a parsed configuration.

use std::collections::BTreeMap;

use anyhow::{bail, Result};

use crate::config::types::{EngineConfig, TaskConfig};

fn validate_task(name: &str, task: &TaskConfig, errors: &mut Vec<String>) {
    if name.trim().is_empty() {
        errors.push("Task name must not be empty".to_string());
    }

    if task.source.type_tag.trim().is_empty() {
        errors.push(format!("Task '{name}': source type must not be empty"));
    }

    for (adapter_name, adapter) in &task.adapters {
        if adapter_name.trim().is_empty() {
            errors.push(format!("Task '{name}': adapter name must not be empty"));
        }
        if adapter.type_tag.trim().is_empty() {
            errors.push(format!(
                "Task '{name}': adapter '{adapter_name}' type must not be empty"
            ));
        }
    }

    if task.targets.is_empty() {
        errors.push(format!("Task '{name}' must define at least one target"));
    }

    for (i, target) in task.targets.iter().enumerate() {
        if target.type_tag.trim().is_empty() {
            errors.push(format!("Task '{name}': targets[{i}] type must not be empty"));
        }
        if target.instances == 0 {
            errors.push(format!(
                "Task '{name}': targets[{i}] instances must be at least 1"
            ));
        }
    }
}

/// Log adapters sharing an `order` value. Their relative position falls
/// back to name order, which is deterministic but rarely intended.
fn warn_duplicate_orders(name: &str, task: &TaskConfig) {
    let mut by_order: BTreeMap<i64, Vec<&str>> = BTreeMap::new();
    for (adapter_name, adapter) in &task.adapters {
        by_order
            .entry(adapter.order)
            .or_default()
            .push(adapter_name.as_str());
    }
    for (order, adapters) in by_order {
        if adapters.len() > 1 {
            tracing::warn!(
                task = name,
                order,
                adapters = %adapters.join(", "),
                "Adapters share the same order; running them in name order"
            );
        }
    }
}

/// Validate a parsed configuration.
/// Returns `Ok(())` if valid, Err with all validation errors if not.
///
/// # Errors
///
/// Returns an error listing all validation failures found in the configuration.
pub fn validate_config(config: &EngineConfig) -> Result<()> {
    let mut errors = Vec::new();

    if config.version != "1.0" {
        errors.push(format!(
            "Unsupported configuration version '{}', expected '1.0'",
            config.version
        ));
    }

    if config.resources.channel_capacity == 0 {
        errors.push("channel_capacity must be at least 1".to_string());
    }

    for (name, task) in &config.tasks {
        validate_task(name, task, &mut errors);
        warn_duplicate_orders(name, task);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        bail!(
            "Configuration validation failed:\n  - {}",
            errors.join("\n  - ")
        );
    }
}
