pub mod check;
pub mod run;
pub mod stages;
pub mod tasks;

use std::path::Path;

use anyhow::{Context, Result};
use datacat_engine::config::parser;
use datacat_engine::config::types::EngineConfig;
use datacat_engine::config::validator;

/// Load `.env` files, then parse and validate the configuration at `path`.
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    parser::load_env_files();
    let config = parser::parse_config(path)
        .with_context(|| format!("Failed to load configuration: {}", path.display()))?;
    validator::validate_config(&config)?;
    tracing::debug!(
        config = %path.display(),
        tasks = config.tasks.len(),
        "Configuration validated"
    );
    Ok(config)
}
