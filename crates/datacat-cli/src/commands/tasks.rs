use std::path::Path;

use anyhow::Result;
use datacat_engine::config::resolve::{ConfigResolver, StageSpec};

/// Execute the `tasks` command: list each task as its stage chain.
pub fn execute(config_path: &Path) -> Result<()> {
    let config = super::load_config(config_path)?;
    let names = config.task_names();
    if names.is_empty() {
        println!("No tasks configured in {}.", config_path.display());
        return Ok(());
    }

    for name in names {
        let task = config.resolve(&name)?;
        let sinks = task
            .sinks
            .iter()
            .map(|s| format!("{}#{}", s.type_tag, s.label.instance))
            .collect::<Vec<_>>()
            .join(", ");
        let chain = std::iter::once(&task.source)
            .chain(&task.transforms)
            .map(describe)
            .collect::<Vec<_>>()
            .join(" -> ");
        println!("{name}");
        println!("  {chain} -> [{sinks}]");
    }
    Ok(())
}

fn describe(spec: &StageSpec) -> String {
    if spec.label.name == spec.type_tag {
        spec.type_tag.clone()
    } else {
        format!("{} ({})", spec.label.name, spec.type_tag)
    }
}
