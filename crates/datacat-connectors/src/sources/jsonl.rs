//! `jsonl-file-source`: one JSON object per line.

use std::path::PathBuf;

use async_trait::async_trait;
use datacat_engine::config::types::StageArguments;
use datacat_engine::{parse_arguments, ConfigError, RecordSender, Source, StageContext};
use datacat_types::{Record, StageError};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};

pub const TYPE_TAG: &str = "jsonl-file-source";

#[derive(Debug, Clone, Deserialize)]
pub struct JsonlSourceConfig {
    pub filename: PathBuf,
}

#[derive(Debug)]
pub struct JsonlFileSource {
    task: String,
    path: PathBuf,
}

pub fn build(ctx: &StageContext, args: &StageArguments) -> Result<Box<dyn Source>, ConfigError> {
    let config: JsonlSourceConfig = parse_arguments(ctx, args)?;
    Ok(Box::new(JsonlFileSource {
        task: ctx.task.clone(),
        path: ctx.resolve_path(&config.filename),
    }))
}

#[async_trait]
impl Source for JsonlFileSource {
    async fn run(self: Box<Self>, output: &mut RecordSender) -> Result<(), StageError> {
        let file = tokio::fs::File::open(&self.path).await.map_err(|e| {
            StageError::Other(anyhow::anyhow!(
                "cannot open input file '{}': {e}",
                self.path.display()
            ))
        })?;
        tracing::info!(task = %self.task, file = %self.path.display(), "Reading JSONL input");

        let mut lines = BufReader::new(file).lines();
        let mut line_no = 0u64;
        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            let record: Record = serde_json::from_str(&line).map_err(|e| {
                StageError::data(format!(
                    "{}:{line_no}: malformed JSON record: {e}",
                    self.path.display()
                ))
            })?;
            output.send(record).await?;
        }

        tracing::info!(
            task = %self.task,
            file = %self.path.display(),
            records = output.sent(),
            "Finished reading JSONL input"
        );
        Ok(())
    }
}
