//! `stdout-target`: prints each record as one JSON line.

use std::sync::LazyLock;

use async_trait::async_trait;
use datacat_engine::config::types::StageArguments;
use datacat_engine::{ConfigError, RecordStream, Sink, StageContext};
use datacat_types::StageError;
use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};
use tokio::sync::Mutex;

pub const TYPE_TAG: &str = "stdout-target";

/// Shared by every instance so competing sinks never interleave within a line.
static STDOUT: LazyLock<Mutex<Stdout>> = LazyLock::new(|| Mutex::new(tokio::io::stdout()));

#[derive(Debug, Default)]
pub struct StdoutTarget;

pub fn build(_ctx: &StageContext, _args: &StageArguments) -> Result<Box<dyn Sink>, ConfigError> {
    Ok(Box::new(StdoutTarget))
}

#[async_trait]
impl Sink for StdoutTarget {
    async fn run(self: Box<Self>, input: &mut RecordStream) -> Result<(), StageError> {
        write_lines(input, &STDOUT).await
    }
}

async fn write_lines<W>(input: &mut RecordStream, out: &Mutex<W>) -> Result<(), StageError>
where
    W: AsyncWrite + Unpin + Send,
{
    while let Some(record) = input.recv().await {
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');
        let mut out = out.lock().await;
        out.write_all(&line).await?;
        out.flush().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use datacat_engine::stream;
    use datacat_types::Record;
    use serde_json::json;

    #[tokio::test]
    async fn writes_one_json_line_per_record() {
        let (mut tx, mut rx) = stream::channel(4);
        for id in 1..=2 {
            let record: Record = [("id", json!(id)), ("name", json!("a"))]
                .into_iter()
                .collect();
            tx.send(record).await.unwrap();
        }
        drop(tx);

        let out = Mutex::new(Vec::new());
        write_lines(&mut rx, &out).await.unwrap();

        let written = String::from_utf8(out.into_inner()).unwrap();
        assert_eq!(
            written,
            "{\"id\":1,\"name\":\"a\"}\n{\"id\":2,\"name\":\"a\"}\n"
        );
    }
}
