use std::path::Path;

use anyhow::Result;
use datacat_connectors::builtin_registry;
use datacat_engine::orchestrator;

/// Execute the `run` command: load the configuration and run one task.
pub async fn execute(config_path: &Path, task: &str) -> Result<()> {
    let config = super::load_config(config_path)?;
    let registry = builtin_registry();

    let result = orchestrator::run_task(&config, &registry, task).await?;

    // Records go to stdout for `stdout-target`; the summary goes to stderr.
    eprintln!("Task '{}' completed successfully.", result.task);
    eprintln!("  Records read:    {}", result.records_read);
    eprintln!("  Records written: {}", result.records_written);
    eprintln!("  Duration:        {:.2}s", result.duration_secs);
    if result.duration_secs > 0.0 {
        #[allow(clippy::cast_precision_loss)]
        let rate = result.records_read as f64 / result.duration_secs;
        eprintln!("  Throughput:      {rate:.0} records/sec");
    }
    for stage in &result.stages {
        eprintln!(
            "  {:32} in {:>8}  out {:>8}  {:.3}s",
            stage.label.to_string(),
            stage.summary.records_in,
            stage.summary.records_out,
            stage.duration_secs,
        );
    }

    Ok(())
}
