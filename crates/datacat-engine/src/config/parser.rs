//! Configuration YAML parsing with `.env` loading and environment variable
//! substitution.

use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::config::types::EngineConfig;

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env var regex"));

/// Environment variable selecting which `.env.<env>` files are loaded.
pub const ENV_SELECTOR_VAR: &str = "DATACAT_ENV";

/// Load `.env` files from the working directory, most specific first.
///
/// Variables already present in the process environment are never
/// overwritten, so earlier files win over later ones.
pub fn load_env_files() {
    let env = std::env::var(ENV_SELECTOR_VAR).unwrap_or_else(|_| "development".to_string());

    let mut candidates = vec![format!(".env.{env}.local")];
    if env != "test" {
        candidates.push(".env.local".to_string());
    }
    candidates.push(format!(".env.{env}"));
    candidates.push(".env".to_string());

    for candidate in candidates {
        if let Ok(path) = dotenvy::from_filename(&candidate) {
            tracing::debug!(file = %path.display(), "Loaded environment file");
        }
    }
}

/// Substitute `${VAR_NAME}` patterns with environment variable values.
///
/// # Errors
///
/// Returns an error if any referenced environment variable is not set.
pub fn substitute_env_vars(input: &str) -> Result<String> {
    let mut result = input.to_string();
    let mut errors = Vec::new();

    for cap in ENV_VAR_RE.captures_iter(input) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(val) => {
                result = result.replace(&cap[0], &val);
            }
            Err(_) => {
                if !errors.iter().any(|e| e == var_name) {
                    errors.push(var_name.to_string());
                }
            }
        }
    }

    if !errors.is_empty() {
        anyhow::bail!("Missing environment variable(s): {}", errors.join(", "));
    }

    Ok(result)
}

/// Parse a configuration YAML string (after env var substitution).
///
/// # Errors
///
/// Returns an error if env var substitution fails or the YAML is invalid.
pub fn parse_config_str(yaml_str: &str) -> Result<EngineConfig> {
    let substituted = substitute_env_vars(yaml_str)?;
    let config: EngineConfig =
        serde_yaml::from_str(&substituted).context("Failed to parse configuration YAML")?;
    Ok(config)
}

/// Parse a configuration file, remembering its directory as the base for
/// relative paths in stage arguments.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the YAML is invalid.
pub fn parse_config(path: &Path) -> Result<EngineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
    let mut config = parse_config_str(&content)
        .with_context(|| format!("Invalid configuration file: {}", path.display()))?;
    config.base_dir = path
        .parent()
        .map(|dir| if dir.as_os_str().is_empty() { Path::new(".") } else { dir })
        .map(Path::to_path_buf);
    Ok(config)
}
