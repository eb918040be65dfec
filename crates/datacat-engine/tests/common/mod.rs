//! In-memory stages shared by the engine integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use datacat_engine::config::parser::parse_config_str;
use datacat_engine::config::types::EngineConfig;
use datacat_engine::{
    mapped, parse_arguments, RecordMapper, RecordSender, RecordStream, Sink, Source,
    StageRegistry, Transform,
};
use datacat_types::{Record, StageError};
use serde::Deserialize;
use serde_json::Value;

/// A record received by a collecting sink, tagged with the sink instance.
#[derive(Debug, Clone)]
pub struct Collected {
    pub instance: usize,
    pub record: Record,
}

/// Registry of in-memory test stages plus the state they expose.
pub struct Harness {
    pub registry: StageRegistry,
    pub collected: Arc<Mutex<Vec<Collected>>>,
    pub source_started: Arc<AtomicBool>,
    pub sources_built: Arc<AtomicUsize>,
}

#[derive(Deserialize)]
struct MemorySourceArgs {
    records: Vec<Record>,
}

struct MemorySource {
    records: Vec<Record>,
    started: Arc<AtomicBool>,
}

#[async_trait]
impl Source for MemorySource {
    async fn run(self: Box<Self>, output: &mut RecordSender) -> Result<(), StageError> {
        self.started.store(true, Ordering::SeqCst);
        for record in self.records {
            output.send(record).await?;
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct CountingSourceArgs {
    count: u64,
}

struct CountingSource {
    count: u64,
    started: Arc<AtomicBool>,
}

#[async_trait]
impl Source for CountingSource {
    async fn run(self: Box<Self>, output: &mut RecordSender) -> Result<(), StageError> {
        self.started.store(true, Ordering::SeqCst);
        for id in 0..self.count {
            output
                .send([("id", Value::from(id))].into_iter().collect())
                .await?;
        }
        Ok(())
    }
}

/// Sends `count` records, then fails.
struct FailingSource {
    count: u64,
    started: Arc<AtomicBool>,
}

#[async_trait]
impl Source for FailingSource {
    async fn run(self: Box<Self>, output: &mut RecordSender) -> Result<(), StageError> {
        self.started.store(true, Ordering::SeqCst);
        for id in 0..self.count {
            output
                .send([("id", Value::from(id))].into_iter().collect())
                .await?;
        }
        Err(StageError::data("source connection lost"))
    }
}

#[derive(Deserialize)]
struct FieldArgs {
    field: String,
}

struct Uppercase {
    field: String,
}

impl RecordMapper for Uppercase {
    fn map(&mut self, mut record: Record) -> Result<Option<Record>, StageError> {
        let upper = record
            .get(&self.field)
            .and_then(Value::as_str)
            .map(str::to_uppercase);
        if let Some(upper) = upper {
            record.insert(self.field.clone(), upper);
        }
        Ok(Some(record))
    }
}

#[derive(Deserialize)]
struct FailAtArgs {
    id: u64,
}

/// Fails on the record whose `id` matches.
struct FailAt {
    id: u64,
}

impl RecordMapper for FailAt {
    fn map(&mut self, record: Record) -> Result<Option<Record>, StageError> {
        if record.get("id").and_then(Value::as_u64) == Some(self.id) {
            return Err(StageError::data(format!("cannot process record {}", self.id)));
        }
        Ok(Some(record))
    }
}

struct KeepEven;

impl RecordMapper for KeepEven {
    fn map(&mut self, record: Record) -> Result<Option<Record>, StageError> {
        let even = record.get("id").and_then(Value::as_u64).is_some_and(|id| id % 2 == 0);
        Ok(even.then_some(record))
    }
}

struct Panicking;

#[async_trait]
impl Transform for Panicking {
    async fn run(
        self: Box<Self>,
        input: &mut RecordStream,
        _output: &mut RecordSender,
    ) -> Result<(), StageError> {
        if input.recv().await.is_some() {
            panic!("transform blew up");
        }
        Ok(())
    }
}

struct CollectSink {
    instance: usize,
    collected: Arc<Mutex<Vec<Collected>>>,
}

#[async_trait]
impl Sink for CollectSink {
    async fn run(self: Box<Self>, input: &mut RecordStream) -> Result<(), StageError> {
        while let Some(record) = input.recv().await {
            self.collected.lock().unwrap().push(Collected {
                instance: self.instance,
                record,
            });
            // Give competing sink instances a chance to take the next record.
            tokio::task::yield_now().await;
        }
        Ok(())
    }
}

/// Fails as soon as it receives a record.
struct FailSink;

#[async_trait]
impl Sink for FailSink {
    async fn run(self: Box<Self>, input: &mut RecordStream) -> Result<(), StageError> {
        match input.recv().await {
            Some(_) => Err(StageError::data("sink rejected record")),
            None => Ok(()),
        }
    }
}

impl Harness {
    pub fn new() -> Self {
        let collected = Arc::new(Mutex::new(Vec::new()));
        let source_started = Arc::new(AtomicBool::new(false));
        let sources_built = Arc::new(AtomicUsize::new(0));
        let mut registry = StageRegistry::new();

        let started = Arc::clone(&source_started);
        let built = Arc::clone(&sources_built);
        registry.register_source("memory-source", move |ctx, args| {
            let args: MemorySourceArgs = parse_arguments(ctx, args)?;
            built.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(MemorySource {
                records: args.records,
                started: Arc::clone(&started),
            }) as Box<dyn Source>)
        });

        let started = Arc::clone(&source_started);
        registry.register_source("counting-source", move |ctx, args| {
            let args: CountingSourceArgs = parse_arguments(ctx, args)?;
            Ok(Box::new(CountingSource {
                count: args.count,
                started: Arc::clone(&started),
            }) as Box<dyn Source>)
        });

        let started = Arc::clone(&source_started);
        registry.register_source("failing-source", move |ctx, args| {
            let args: CountingSourceArgs = parse_arguments(ctx, args)?;
            Ok(Box::new(FailingSource {
                count: args.count,
                started: Arc::clone(&started),
            }) as Box<dyn Source>)
        });

        registry
            .register_transform("uppercase", |ctx, args| {
                let args: FieldArgs = parse_arguments(ctx, args)?;
                Ok(mapped(Uppercase { field: args.field }))
            })
            .register_transform("fail-at", |ctx, args| {
                let args: FailAtArgs = parse_arguments(ctx, args)?;
                Ok(mapped(FailAt { id: args.id }))
            })
            .register_transform("keep-even", |_, _| Ok(mapped(KeepEven)))
            .register_transform("panic", |_, _| Ok(Box::new(Panicking) as Box<dyn Transform>));

        let sink_collected = Arc::clone(&collected);
        registry
            .register_sink("collect-sink", move |ctx, _| {
                Ok(Box::new(CollectSink {
                    instance: ctx.label.instance,
                    collected: Arc::clone(&sink_collected),
                }) as Box<dyn Sink>)
            })
            .register_sink("fail-sink", |_, _| Ok(Box::new(FailSink) as Box<dyn Sink>));

        Self {
            registry,
            collected,
            source_started,
            sources_built,
        }
    }

    /// Records collected so far, in arrival order.
    pub fn collected(&self) -> Vec<Collected> {
        self.collected.lock().unwrap().clone()
    }

    pub fn collected_ids(&self) -> Vec<u64> {
        self.collected()
            .iter()
            .filter_map(|c| c.record.get("id").and_then(Value::as_u64))
            .collect()
    }
}

pub fn config(yaml: &str) -> EngineConfig {
    parse_config_str(yaml).expect("test configuration must parse")
}

/// A task named `counting` emitting `count` records through the adapters
/// given as `(name, type, order)` into `sinks` competing sink instances.
pub fn counting_config(
    count: u64,
    adapters: &[(&str, &str, i64)],
    sinks: usize,
) -> EngineConfig {
    let adapters: String = adapters
        .iter()
        .map(|(name, type_tag, order)| {
            format!("      {name}:\n        type: {type_tag}\n        order: {order}\n")
        })
        .collect();
    let adapters = if adapters.is_empty() {
        "    adapters: {}\n".to_string()
    } else {
        format!("    adapters:\n{adapters}")
    };
    config(&format!(
        r"
resources:
  channel_capacity: 1
tasks:
  counting:
    source:
      type: counting-source
      arguments:
        count: {count}
{adapters}    targets:
      - type: collect-sink
        instances: {sinks}
"
    ))
}
