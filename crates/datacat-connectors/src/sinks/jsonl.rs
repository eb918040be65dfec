//! `jsonl-file-target`: writes one JSON object per line.

use std::path::PathBuf;

use async_trait::async_trait;
use datacat_engine::config::types::StageArguments;
use datacat_engine::{parse_arguments, ConfigError, RecordStream, Sink, StageContext};
use datacat_types::StageError;
use serde::Deserialize;
use tokio::io::{AsyncWriteExt, BufWriter};

pub const TYPE_TAG: &str = "jsonl-file-target";

/// Placeholder in `filename` replaced with the sink instance number.
pub const INSTANCE_PLACEHOLDER: &str = "{id}";

#[derive(Debug, Clone, Deserialize)]
pub struct JsonlTargetConfig {
    pub filename: String,
}

#[derive(Debug)]
pub struct JsonlFileTarget {
    task: String,
    path: PathBuf,
}

pub fn build(ctx: &StageContext, args: &StageArguments) -> Result<Box<dyn Sink>, ConfigError> {
    let config: JsonlTargetConfig = parse_arguments(ctx, args)?;
    // Instances writing one path would truncate each other's output.
    if ctx.label.instance > 0 && !config.filename.contains(INSTANCE_PLACEHOLDER) {
        return Err(ConfigError::invalid_arguments(
            &ctx.label,
            format!(
                "filename '{}' must contain {INSTANCE_PLACEHOLDER} for several instances",
                config.filename
            ),
        ));
    }
    let filename = config
        .filename
        .replace(INSTANCE_PLACEHOLDER, &ctx.label.instance.to_string());
    Ok(Box::new(JsonlFileTarget {
        task: ctx.task.clone(),
        path: ctx.resolve_path(filename),
    }))
}

#[async_trait]
impl Sink for JsonlFileTarget {
    async fn run(self: Box<Self>, input: &mut RecordStream) -> Result<(), StageError> {
        let file = tokio::fs::File::create(&self.path).await.map_err(|e| {
            StageError::Other(anyhow::anyhow!(
                "cannot create output file '{}': {e}",
                self.path.display()
            ))
        })?;
        tracing::info!(task = %self.task, file = %self.path.display(), "Writing JSONL output");

        let mut writer = BufWriter::new(file);
        while let Some(record) = input.recv().await {
            let mut line = serde_json::to_vec(&record)?;
            line.push(b'\n');
            writer.write_all(&line).await?;
        }
        writer.flush().await?;

        tracing::info!(
            task = %self.task,
            file = %self.path.display(),
            records = input.received(),
            "Finished writing JSONL output"
        );
        Ok(())
    }
}
