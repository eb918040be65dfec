//! End-to-end pipeline behaviour with in-memory stages.

mod common;

use std::collections::BTreeSet;
use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{config, counting_config, Harness};
use datacat_engine::{check_task, run_task, ConfigError, PipelineError};
use datacat_types::{StageError, StageLabel, StageRole};
use serde_json::json;

const USERS: &str = r#"
tasks:
  users:
    source:
      type: memory-source
      arguments:
        records:
          - { id: 1, name: "a" }
          - { id: 2, name: "b" }
          - { id: 3, name: "b" }
    adapters:
      upper_name:
        type: uppercase
        arguments:
          field: name
    targets:
      - type: collect-sink
"#;

/// Guard against a regression that would hang the run instead of failing.
async fn run_with_timeout(
    harness: &Harness,
    cfg: &datacat_engine::config::types::EngineConfig,
    task: &str,
) -> Result<datacat_engine::TaskResult, PipelineError> {
    tokio::time::timeout(
        Duration::from_secs(10),
        run_task(cfg, &harness.registry, task),
    )
    .await
    .expect("task run must not hang")
}

#[tokio::test]
async fn uppercase_scenario_delivers_in_order() {
    let harness = Harness::new();
    let cfg = config(USERS);

    let result = run_with_timeout(&harness, &cfg, "users").await.unwrap();

    let records: Vec<_> = harness.collected().into_iter().map(|c| c.record).collect();
    let expected: Vec<_> = [(1, "A"), (2, "B"), (3, "B")]
        .into_iter()
        .map(|(id, name)| {
            [("id", json!(id)), ("name", json!(name))]
                .into_iter()
                .collect::<datacat_types::Record>()
        })
        .collect();
    assert_eq!(records, expected);
    assert_eq!(result.records_read, 3);
    assert_eq!(result.records_written, 3);
    assert_eq!(result.stages.len(), 3);
    assert_eq!(result.stages[0].label, StageLabel::source());
    assert_eq!(result.stages[1].label, StageLabel::transform("upper_name"));
    assert_eq!(result.stages[2].label, StageLabel::sink("target[0]", 0));
    assert_eq!(result.stages[1].summary.records_in, 3);
    assert_eq!(result.stages[1].summary.records_out, 3);
}

#[tokio::test]
async fn ordering_is_preserved_through_a_transform_chain() {
    let harness = Harness::new();
    let cfg = counting_config(200, &[("evens", "keep-even", 0)], 1);

    let result = run_with_timeout(&harness, &cfg, "counting").await.unwrap();

    let expected: Vec<u64> = (0..200).filter(|id| id % 2 == 0).collect();
    assert_eq!(harness.collected_ids(), expected);
    assert_eq!(result.records_read, 200);
    assert_eq!(result.records_written, 100);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_competing_sinks_split_without_loss_or_duplication() {
    let harness = Harness::new();
    let cfg = config(
        r#"
tasks:
  users:
    source:
      type: memory-source
      arguments:
        records:
          - { id: 1, name: "a" }
          - { id: 2, name: "b" }
          - { id: 3, name: "b" }
    targets:
      - type: collect-sink
        instances: 2
"#,
    );

    let result = run_with_timeout(&harness, &cfg, "users").await.unwrap();

    let mut ids = harness.collected_ids();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(result.records_written, 3);
    assert_eq!(result.sinks().count(), 2);
    let instances: BTreeSet<_> = result.sinks().map(|s| s.label.instance).collect();
    assert_eq!(instances, BTreeSet::from([0, 1]));
}

#[tokio::test]
async fn transform_failure_terminates_the_task() {
    let harness = Harness::new();
    let cfg = config(
        r"
tasks:
  counting:
    source:
      type: counting-source
      arguments:
        count: 1000
    adapters:
      breaker:
        type: fail-at
        arguments:
          id: 5
    targets:
      - type: collect-sink
",
    );

    let err = run_with_timeout(&harness, &cfg, "counting")
        .await
        .unwrap_err();

    match &err {
        PipelineError::Stage { task, stage, source } => {
            assert_eq!(task, "counting");
            assert_eq!(stage, &StageLabel::transform("breaker"));
            assert!(matches!(source, StageError::Data { .. }));
        }
        other => panic!("expected stage error, got {other:?}"),
    }
    let msg = err.to_string();
    assert!(msg.contains("task 'counting'"), "got: {msg}");
    assert!(msg.contains("transform 'breaker'"), "got: {msg}");

    // Only records ahead of the failing one can have reached the sink.
    let seen = harness.collected_ids();
    assert!(seen.iter().all(|id| *id < 5), "sink saw {seen:?}");
}

#[tokio::test]
async fn source_failure_terminates_the_task_after_delivering_sent_records() {
    let harness = Harness::new();
    let cfg = config(
        r"
tasks:
  counting:
    source:
      type: failing-source
      arguments:
        count: 3
    adapters:
      evens:
        type: keep-even
    targets:
      - type: collect-sink
",
    );

    let err = run_with_timeout(&harness, &cfg, "counting")
        .await
        .unwrap_err();

    assert_eq!(err.failed_stage(), Some(&StageLabel::source()));
    assert!(err.to_string().contains("source connection lost"), "got: {err}");
    assert_eq!(harness.collected_ids(), vec![0, 2]);
}

#[tokio::test]
async fn sink_failure_terminates_the_task() {
    let harness = Harness::new();
    let cfg = config(
        r"
tasks:
  counting:
    source:
      type: counting-source
      arguments:
        count: 10000
    adapters:
      evens:
        type: keep-even
    targets:
      - type: fail-sink
",
    );

    let err = run_with_timeout(&harness, &cfg, "counting")
        .await
        .unwrap_err();

    match &err {
        PipelineError::Stage { task, stage, source } => {
            assert_eq!(task, "counting");
            assert_eq!(stage, &StageLabel::sink("target[0]", 0));
            assert!(matches!(source, StageError::Data { .. }));
        }
        other => panic!("expected stage error, got {other:?}"),
    }
}

#[tokio::test]
async fn failing_sink_stops_its_competing_peers() {
    let harness = Harness::new();
    let cfg = config(
        r"
tasks:
  counting:
    source:
      type: counting-source
      arguments:
        count: 10000
    targets:
      - type: fail-sink
      - type: collect-sink
",
    );

    let err = run_with_timeout(&harness, &cfg, "counting")
        .await
        .unwrap_err();

    assert_eq!(err.failed_stage(), Some(&StageLabel::sink("target[0]", 0)));
    let collected = harness.collected().len();
    assert!(collected < 100, "peer sink kept draining: {collected} records");
}

#[tokio::test]
async fn panicking_stage_still_completes_the_task() {
    let harness = Harness::new();
    let cfg = counting_config(10, &[("boom", "panic", 0)], 1);

    let err = run_with_timeout(&harness, &cfg, "counting")
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Infrastructure(_)), "got {err:?}");
    assert!(err.to_string().contains("transform 'boom'"));
}

#[tokio::test]
async fn unknown_transform_type_fails_before_the_source_starts() {
    let harness = Harness::new();
    let cfg = counting_config(
        10,
        &[("evens", "keep-even", 0), ("mystery", "no-such-adapter", 1)],
        1,
    );

    let err = run_with_timeout(&harness, &cfg, "counting")
        .await
        .unwrap_err();

    assert!(err.is_config_error());
    assert!(matches!(
        err,
        PipelineError::Config(ConfigError::UnknownStageType {
            role: StageRole::Transform,
            ..
        })
    ));
    assert!(!harness.source_started.load(Ordering::SeqCst));
    assert!(harness.collected().is_empty());
}

#[tokio::test]
async fn unknown_sink_type_fails_before_the_source_starts() {
    let harness = Harness::new();
    let cfg = config(
        r"
tasks:
  counting:
    source:
      type: counting-source
      arguments:
        count: 3
    targets:
      - type: collect-sink
      - type: carrier-pigeon
",
    );

    let err = run_with_timeout(&harness, &cfg, "counting")
        .await
        .unwrap_err();

    assert!(err.to_string().contains("unknown sink type 'carrier-pigeon'"));
    assert!(!harness.source_started.load(Ordering::SeqCst));
}

#[tokio::test]
async fn task_without_sinks_fails_before_the_source_starts() {
    let harness = Harness::new();
    let cfg = config(
        r"
tasks:
  nowhere:
    source:
      type: counting-source
      arguments:
        count: 5
  zeroed:
    source:
      type: counting-source
      arguments:
        count: 0
    targets:
      - type: collect-sink
        instances: 0
",
    );

    for task in ["nowhere", "zeroed"] {
        let err = run_with_timeout(&harness, &cfg, task).await.unwrap_err();
        assert!(
            matches!(err, PipelineError::Config(ConfigError::NoSinks(ref name)) if name == task),
            "got {err:?}"
        );
    }
    assert!(!harness.source_started.load(Ordering::SeqCst));
}

#[tokio::test]
async fn missing_task_is_a_config_error() {
    let harness = Harness::new();
    let cfg = config(USERS);

    let err = run_with_timeout(&harness, &cfg, "orders")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Config(ConfigError::TaskNotFound(ref name)) if name == "orders"
    ));
}

#[tokio::test]
async fn invalid_arguments_are_reported_with_the_stage() {
    let harness = Harness::new();
    let cfg = config(
        r"
tasks:
  users:
    source:
      type: memory-source
    targets:
      - type: collect-sink
",
    );

    let err = run_with_timeout(&harness, &cfg, "users")
        .await
        .unwrap_err();

    let msg = err.to_string();
    assert!(msg.contains("invalid arguments for source 'source'"), "got: {msg}");
    assert!(msg.contains("records"), "got: {msg}");
}

#[tokio::test]
async fn repeated_runs_construct_independent_stages() {
    let harness = Harness::new();
    let cfg = config(USERS);

    run_with_timeout(&harness, &cfg, "users").await.unwrap();
    run_with_timeout(&harness, &cfg, "users").await.unwrap();

    assert_eq!(harness.sources_built.load(Ordering::SeqCst), 2);
    let names: Vec<_> = harness
        .collected()
        .into_iter()
        .map(|c| c.record["name"].clone())
        .collect();
    assert_eq!(
        names,
        vec![json!("A"), json!("B"), json!("B"), json!("A"), json!("B"), json!("B")]
    );
}

#[test]
fn check_builds_every_stage_without_running() {
    let harness = Harness::new();
    let cfg = config(USERS);

    let checked = check_task(&cfg, &harness.registry, "users").unwrap();

    assert_eq!(checked.task, "users");
    assert_eq!(
        checked.stages,
        vec![
            StageLabel::source(),
            StageLabel::transform("upper_name"),
            StageLabel::sink("target[0]", 0),
        ]
    );
    assert_eq!(harness.sources_built.load(Ordering::SeqCst), 1);
    assert!(!harness.source_started.load(Ordering::SeqCst));
}
