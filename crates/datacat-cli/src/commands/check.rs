use std::path::Path;

use anyhow::Result;
use datacat_connectors::builtin_registry;
use datacat_engine::orchestrator;

/// Execute the `check` command: resolve a task and build its stages without
/// running them.
pub fn execute(config_path: &Path, task: &str) -> Result<()> {
    let config = super::load_config(config_path)?;
    println!("Configuration:     OK");

    let result = orchestrator::check_task(&config, &builtin_registry(), task)?;
    for label in &result.stages {
        println!("{:18} OK", format!("{}:", label));
    }

    println!("\nAll checks passed for task '{}'.", result.task);
    Ok(())
}
