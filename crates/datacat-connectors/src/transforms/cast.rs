//! `cast-to-datatype-adapter`: converts listed fields to one scalar type.

use std::fmt::Write as _;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use datacat_engine::config::types::StageArguments;
use datacat_engine::{
    mapped, parse_arguments, ConfigError, RecordMapper, StageContext, Transform,
};
use datacat_types::{Record, StageError, Value};
use serde::Deserialize;

use crate::value::value_text;

pub const TYPE_TAG: &str = "cast-to-datatype-adapter";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Datatype {
    Boolean,
    Int64,
    Float64,
    /// Reparse with `inlayout` and reformat with `outlayout`.
    Datetime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CastConfig {
    pub fields: Vec<String>,
    pub datatype: Datatype,
    /// `strftime` pattern used to parse datetime input.
    #[serde(default)]
    pub inlayout: Option<String>,
    /// `strftime` pattern used to format datetime output.
    #[serde(default)]
    pub outlayout: Option<String>,
}

#[derive(Debug, Clone)]
enum Cast {
    Boolean,
    Int64,
    Float64,
    Datetime { inlayout: String, outlayout: String },
}

#[derive(Debug)]
pub struct CastToDatatype {
    fields: Vec<String>,
    cast: Cast,
}

pub fn build(ctx: &StageContext, args: &StageArguments) -> Result<Box<dyn Transform>, ConfigError> {
    let config: CastConfig = parse_arguments(ctx, args)?;
    Ok(mapped(CastToDatatype::new(ctx, config)?))
}

impl CastToDatatype {
    /// Validate `config`, including datetime layouts.
    ///
    /// # Errors
    ///
    /// Fails when a datetime cast lacks a layout or a layout is not a valid
    /// `strftime` pattern.
    pub fn new(ctx: &StageContext, config: CastConfig) -> Result<Self, ConfigError> {
        let cast = match config.datatype {
            Datatype::Boolean => Cast::Boolean,
            Datatype::Int64 => Cast::Int64,
            Datatype::Float64 => Cast::Float64,
            Datatype::Datetime => {
                let layout = |name: &str, value: Option<String>| -> Result<String, ConfigError> {
                    let layout = value.ok_or_else(|| {
                        ConfigError::invalid_arguments(
                            &ctx.label,
                            format!("datetime casts require `{name}`"),
                        )
                    })?;
                    if StrftimeItems::new(&layout).any(|item| matches!(item, Item::Error)) {
                        return Err(ConfigError::invalid_arguments(
                            &ctx.label,
                            format!("invalid `{name}` pattern '{layout}'"),
                        ));
                    }
                    Ok(layout)
                };
                Cast::Datetime {
                    inlayout: layout("inlayout", config.inlayout)?,
                    outlayout: layout("outlayout", config.outlayout)?,
                }
            }
        };
        Ok(Self {
            fields: config.fields,
            cast,
        })
    }
}

impl Cast {
    fn apply(&self, field: &str, value: &Value) -> Result<Value, StageError> {
        let fail = |reason: &str| {
            StageError::data(format!(
                "cannot convert value {value} of field '{field}': {reason}"
            ))
        };
        match self {
            Self::Boolean => match value {
                Value::Bool(b) => Ok(Value::Bool(*b)),
                other => parse_bool(&value_text(other))
                    .map(Value::Bool)
                    .ok_or_else(|| fail("not a boolean")),
            },
            Self::Int64 => {
                if let Some(n) = value.as_i64() {
                    return Ok(Value::from(n));
                }
                if let Some(n) = value.as_f64().and_then(whole_to_i64) {
                    return Ok(Value::from(n));
                }
                value_text(value)
                    .trim()
                    .parse::<i64>()
                    .map(Value::from)
                    .map_err(|e| fail(&e.to_string()))
            }
            Self::Float64 => {
                let parsed = match value.as_f64() {
                    Some(f) => f,
                    None => value_text(value)
                        .trim()
                        .parse::<f64>()
                        .map_err(|e| fail(&e.to_string()))?,
                };
                serde_json::Number::from_f64(parsed)
                    .map(Value::Number)
                    .ok_or_else(|| fail("not a finite number"))
            }
            Self::Datetime {
                inlayout,
                outlayout,
            } => reformat_datetime(&value_text(value), inlayout, outlayout)
                .map(Value::String)
                .ok_or_else(|| fail(&format!("does not match '{inlayout}'"))),
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn whole_to_i64(f: f64) -> Option<i64> {
    (f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64).then(|| f as i64)
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_lowercase().as_str() {
        "true" | "t" | "1" => Some(true),
        "false" | "f" | "0" => Some(false),
        _ => None,
    }
}

/// Parse `text` with `inlayout` (offset-aware, then naive datetime, then bare
/// date at midnight) and format it with `outlayout`.
fn reformat_datetime(text: &str, inlayout: &str, outlayout: &str) -> Option<String> {
    let mut out = String::new();
    let written = if let Ok(dt) = DateTime::parse_from_str(text, inlayout) {
        write!(out, "{}", dt.format(outlayout))
    } else {
        let naive = NaiveDateTime::parse_from_str(text, inlayout).ok().or_else(|| {
            NaiveDate::parse_from_str(text, inlayout)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;
        // Formatting fails if `outlayout` needs an offset the input lacks.
        write!(out, "{}", naive.format(outlayout))
    };
    written.ok().map(|()| out)
}

impl RecordMapper for CastToDatatype {
    fn map(&mut self, mut record: Record) -> Result<Option<Record>, StageError> {
        for field in &self.fields {
            let Some(value) = record.get_non_null(field) else {
                continue;
            };
            let cast = self.cast.apply(field, value)?;
            record.insert(field.clone(), cast);
        }
        Ok(Some(record))
    }
}
