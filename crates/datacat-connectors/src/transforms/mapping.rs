//! `constant-mapping-adapter`: replaces field values through a lookup table
//! read from a YAML file.
//!
//! The file holds named tables under a top-level `mappings` key:
//!
//! ```yaml
//! mappings:
//!   gender:
//!     M: male
//!     F: female
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use datacat_engine::config::types::StageArguments;
use datacat_engine::{
    mapped, parse_arguments, ConfigError, RecordMapper, StageContext, Transform,
};
use datacat_types::{Record, StageError, Value};
use serde::Deserialize;

use crate::value::value_text;

pub const TYPE_TAG: &str = "constant-mapping-adapter";

#[derive(Debug, Clone, Deserialize)]
pub struct ConstantMappingConfig {
    pub fields: Vec<String>,
    /// Mapping file, relative to the configuration file's directory.
    pub filename: PathBuf,
    pub mapname: String,
    /// Replacement for values missing from the table. Unmapped values are
    /// kept when this is unset.
    #[serde(default)]
    pub otherwise: Option<String>,
}

#[derive(Debug)]
pub struct ConstantMapping {
    fields: Vec<String>,
    table: HashMap<String, String>,
    otherwise: Option<String>,
}

pub fn build(ctx: &StageContext, args: &StageArguments) -> Result<Box<dyn Transform>, ConfigError> {
    let config: ConstantMappingConfig = parse_arguments(ctx, args)?;
    let path = ctx.resolve_path(&config.filename);
    let table = load_table(&path, &config.mapname)
        .map_err(|message| ConfigError::invalid_arguments(&ctx.label, message))?;
    tracing::debug!(
        task = %ctx.task,
        stage = %ctx.label,
        file = %path.display(),
        map = %config.mapname,
        entries = table.len(),
        "Loaded constant mapping"
    );
    Ok(mapped(ConstantMapping {
        fields: config.fields,
        table,
        otherwise: config.otherwise,
    }))
}

/// Read table `mapname` from the mapping file at `path`. Keys and values are
/// scalars and are compared as text.
fn load_table(path: &Path, mapname: &str) -> Result<HashMap<String, String>, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read mapping file '{}': {e}", path.display()))?;
    let document: serde_yaml::Value = serde_yaml::from_str(&content)
        .map_err(|e| format!("cannot parse mapping file '{}': {e}", path.display()))?;

    let mappings = document
        .get("mappings")
        .ok_or_else(|| format!("mapping file '{}' has no `mappings` section", path.display()))?;
    let table = mappings
        .get(mapname)
        .and_then(serde_yaml::Value::as_mapping)
        .ok_or_else(|| {
            format!(
                "mapping file '{}' has no table named '{mapname}'",
                path.display()
            )
        })?;

    table
        .iter()
        .map(|(key, value)| match (scalar_text(key), scalar_text(value)) {
            (Some(key), Some(value)) => Ok((key, value)),
            _ => Err(format!(
                "table '{mapname}' in '{}' must map scalars to scalars",
                path.display()
            )),
        })
        .collect()
}

fn scalar_text(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Null => Some(String::new()),
        _ => None,
    }
}

impl RecordMapper for ConstantMapping {
    fn map(&mut self, mut record: Record) -> Result<Option<Record>, StageError> {
        for field in &self.fields {
            let Some(value) = record.get_non_null(field) else {
                continue;
            };
            let replacement = match self.table.get(value_text(value).as_ref()) {
                Some(mapped) => mapped.clone(),
                None => match &self.otherwise {
                    Some(otherwise) => otherwise.clone(),
                    None => continue,
                },
            };
            record.insert(field.clone(), Value::String(replacement));
        }
        Ok(Some(record))
    }
}
