//! `case-conversion-adapter`: upper, lower or title case for listed fields.

use datacat_engine::config::types::StageArguments;
use datacat_engine::{
    mapped, parse_arguments, ConfigError, RecordMapper, StageContext, Transform,
};
use datacat_types::{Record, StageError};
use serde::Deserialize;

use crate::value::value_text;

pub const TYPE_TAG: &str = "case-conversion-adapter";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseHandling {
    Upper,
    Lower,
    /// Lowercase everything, then uppercase the first character.
    Title,
}

impl CaseHandling {
    #[must_use]
    pub fn apply(self, text: &str) -> String {
        match self {
            Self::Upper => text.to_uppercase(),
            Self::Lower => text.to_lowercase(),
            Self::Title => {
                let lower = text.to_lowercase();
                let mut chars = lower.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaseConversionConfig {
    pub fields: Vec<String>,
    pub handling: CaseHandling,
}

/// Converts the listed fields. Non-string scalars are stringified first;
/// absent and null fields are left alone.
#[derive(Debug)]
pub struct CaseConversion {
    fields: Vec<String>,
    handling: CaseHandling,
}

pub fn build(ctx: &StageContext, args: &StageArguments) -> Result<Box<dyn Transform>, ConfigError> {
    let config: CaseConversionConfig = parse_arguments(ctx, args)?;
    Ok(mapped(CaseConversion {
        fields: config.fields,
        handling: config.handling,
    }))
}

impl RecordMapper for CaseConversion {
    fn map(&mut self, mut record: Record) -> Result<Option<Record>, StageError> {
        for field in &self.fields {
            let Some(value) = record.get_non_null(field) else {
                continue;
            };
            let converted = self.handling.apply(&value_text(value));
            record.insert(field.clone(), converted);
        }
        Ok(Some(record))
    }
}
