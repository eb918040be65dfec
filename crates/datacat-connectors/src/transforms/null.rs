//! `null-handling-adapter`.

use datacat_engine::config::types::StageArguments;
use datacat_engine::{
    mapped, parse_arguments, ConfigError, RecordMapper, StageContext, Transform,
};
use datacat_types::{Record, StageError};
use serde::Deserialize;

pub const TYPE_TAG: &str = "null-handling-adapter";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NullHandling {
    /// Drop every field whose value is null.
    Remove,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NullHandlingConfig {
    pub handling: NullHandling,
}

#[derive(Debug)]
pub struct NullHandlingAdapter {
    handling: NullHandling,
}

pub fn build(ctx: &StageContext, args: &StageArguments) -> Result<Box<dyn Transform>, ConfigError> {
    let config: NullHandlingConfig = parse_arguments(ctx, args)?;
    Ok(mapped(NullHandlingAdapter {
        handling: config.handling,
    }))
}

impl RecordMapper for NullHandlingAdapter {
    fn map(&mut self, mut record: Record) -> Result<Option<Record>, StageError> {
        match self.handling {
            NullHandling::Remove => record.retain(|_, value| !value.is_null()),
        }
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn remove_drops_null_fields() {
        let mut adapter = NullHandlingAdapter {
            handling: NullHandling::Remove,
        };
        let record: Record =
            serde_json::from_value(json!({"id": 1, "email": null, "name": ""})).unwrap();

        let out = adapter.map(record).unwrap().unwrap();

        assert_eq!(out.len(), 2);
        assert!(!out.contains("email"));
        assert_eq!(out["name"], json!(""));
    }
}
