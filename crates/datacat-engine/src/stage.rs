//! Stage contracts and the wiring that starts a constructed stage.
//!
//! Concrete stages implement [`Source`], [`Transform`] or [`Sink`]. The
//! engine owns the streams: a stage only reads from and writes to the handles
//! it is given, and the engine closes the output once `run` returns, whether
//! it returned `Ok` or `Err`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use datacat_types::{Record, StageError, StageLabel};

use crate::stream::{self, RecordSender, RecordStream};
use crate::tracker::{CompletionTracker, StageSummary};

/// Produces records from an external data source.
#[async_trait]
pub trait Source: Send + 'static {
    /// Send every record to `output`. Resources opened here must be released
    /// before returning.
    async fn run(self: Box<Self>, output: &mut RecordSender) -> Result<(), StageError>;
}

/// Consumes one stream and produces another.
///
/// Implementations are expected to preserve input order and emit at most one
/// record per input record.
#[async_trait]
pub trait Transform: Send + 'static {
    async fn run(
        self: Box<Self>,
        input: &mut RecordStream,
        output: &mut RecordSender,
    ) -> Result<(), StageError>;
}

/// Drains a stream into an external data sink.
///
/// Several instances of a sink may compete for one stream. An error from any
/// of them ends the stream for all of them.
#[async_trait]
pub trait Sink: Send + 'static {
    async fn run(self: Box<Self>, input: &mut RecordStream) -> Result<(), StageError>;
}

/// A synchronous one-record-at-a-time transformation.
///
/// Returning `Ok(None)` filters the record out.
pub trait RecordMapper: Send + 'static {
    /// # Errors
    ///
    /// Any error aborts the stage and the task.
    fn map(&mut self, record: Record) -> Result<Option<Record>, StageError>;
}

/// Adapts a [`RecordMapper`] into an order-preserving [`Transform`].
pub struct Mapped<M>(pub M);

#[async_trait]
impl<M: RecordMapper> Transform for Mapped<M> {
    async fn run(
        mut self: Box<Self>,
        input: &mut RecordStream,
        output: &mut RecordSender,
    ) -> Result<(), StageError> {
        while let Some(record) = input.recv().await {
            if let Some(mapped) = self.0.map(record)? {
                output.send(mapped).await?;
            }
        }
        Ok(())
    }
}

/// Box a [`RecordMapper`] as a transform stage.
pub fn mapped<M: RecordMapper>(mapper: M) -> Box<dyn Transform> {
    Box::new(Mapped(mapper))
}

/// What a stage constructor gets to know about where it runs.
#[derive(Debug, Clone)]
pub struct StageContext {
    pub task: String,
    pub label: StageLabel,
    /// Directory of the configuration file, if it came from one.
    pub base_dir: Option<PathBuf>,
}

impl StageContext {
    /// Resolve a path argument against the configuration directory.
    /// Absolute paths are returned unchanged.
    #[must_use]
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

/// A constructed source, ready to start exactly once.
pub struct BuiltSource {
    label: StageLabel,
    stage: Box<dyn Source>,
}

impl BuiltSource {
    #[must_use]
    pub fn new(label: StageLabel, stage: Box<dyn Source>) -> Self {
        Self { label, stage }
    }

    #[must_use]
    pub fn label(&self) -> &StageLabel {
        &self.label
    }

    /// Register with `tracker`, spawn the source, and return its output.
    pub fn start(self, tracker: &CompletionTracker, capacity: usize) -> RecordStream {
        let (mut output, stream) = stream::channel(capacity);
        let stage = self.stage;
        tracker.spawn(self.label, async move {
            let result = stage.run(&mut output).await;
            let summary = StageSummary {
                records_in: 0,
                records_out: output.sent(),
            };
            drop(output);
            (summary, result)
        });
        stream
    }
}

/// A constructed transform, ready to start exactly once.
pub struct BuiltTransform {
    label: StageLabel,
    stage: Box<dyn Transform>,
}

impl BuiltTransform {
    #[must_use]
    pub fn new(label: StageLabel, stage: Box<dyn Transform>) -> Self {
        Self { label, stage }
    }

    #[must_use]
    pub fn label(&self) -> &StageLabel {
        &self.label
    }

    /// Register with `tracker`, spawn the transform over `input`, and return
    /// its output. The output closes when the transform finishes.
    pub fn start(
        self,
        tracker: &CompletionTracker,
        mut input: RecordStream,
        capacity: usize,
    ) -> RecordStream {
        let (mut output, stream) = stream::channel(capacity);
        let stage = self.stage;
        tracker.spawn(self.label, async move {
            let result = stage.run(&mut input, &mut output).await;
            let summary = StageSummary {
                records_in: input.received(),
                records_out: output.sent(),
            };
            // Closing the input first lets a blocked upstream producer observe
            // a failure here instead of waiting on a full stream.
            drop(input);
            drop(output);
            (summary, result)
        });
        stream
    }
}

/// A constructed sink, ready to start exactly once.
pub struct BuiltSink {
    label: StageLabel,
    stage: Box<dyn Sink>,
}

impl BuiltSink {
    #[must_use]
    pub fn new(label: StageLabel, stage: Box<dyn Sink>) -> Self {
        Self { label, stage }
    }

    #[must_use]
    pub fn label(&self) -> &StageLabel {
        &self.label
    }

    /// Register with `tracker` and spawn the sink over `input`.
    pub fn start(self, tracker: &CompletionTracker, mut input: RecordStream) {
        let stage = self.stage;
        tracker.spawn(self.label, async move {
            let result = stage.run(&mut input).await;
            let summary = StageSummary {
                records_in: input.received(),
                records_out: 0,
            };
            // Competing sinks share one stream; a failed sink ends it for
            // the others and for the producer.
            if result.is_err() {
                input.close();
            }
            drop(input);
            (summary, result)
        });
    }
}
