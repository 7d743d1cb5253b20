//! Activation integration tests for jobwire.
//!
//! Tests registry construction, execution set resolution, startup handoff,
//! runtime reconfiguration and serialization of concurrent callers.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use jobwire::{
    resolve_execution_set, ActivationController, ActivationControllerBuilder, ActivationError,
    ActiveSet, ControllerState, CoordinationOp, ExecutionConfig, JobRegistry, JobTypeConfig,
    JobwireConfig, ReconfigureOutcome, ShardingStrategy,
};
use jobwire_testkit::{
    CoordinationCall, RecordingCoordinationClient, RecordingScheduler, StaticJobProvider, TestJob,
};
use tokio::time::{sleep, timeout};

struct Harness {
    controller: Arc<ActivationController>,
    scheduler: RecordingScheduler,
    coordination: RecordingCoordinationClient,
}

impl Harness {
    /// Reconfigure to `target` with `execute_all` off.
    async fn apply(&self, target: &[&str]) -> Result<ReconfigureOutcome, ActivationError> {
        let target = target.iter().copied();
        self.controller.reconfigure(target, false).await
    }
}

fn harness(provider: StaticJobProvider, execution: ExecutionConfig) -> Harness {
    let scheduler = RecordingScheduler::new();
    let coordination = RecordingCoordinationClient::new();
    let controller = ActivationControllerBuilder::new(execution)
        .with_provider(&provider)
        .with_scheduler(Arc::new(scheduler.clone()))
        .with_coordination(Arc::new(coordination.clone()))
        .build()
        .expect("all dependencies provided");

    Harness {
        controller: Arc::new(controller),
        scheduler,
        coordination,
    }
}

/// Simple jobs for every name, with `execute_list` as the node's list.
fn simple_harness(names: &[&str], execute_list: &str) -> Harness {
    let provider = StaticJobProvider::simple(names);
    harness(provider, ExecutionConfig::new(execute_list, false))
}

fn names(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|item| item.to_string()).collect()
}

#[test]
fn test_registry_keeps_first_of_duplicate_names() {
    let provider = StaticJobProvider::new()
        .with(TestJob::simple("a").with_cron("0 0 1 * * ?"))
        .with(TestJob::simple("b"))
        .with(TestJob::script("a").with_cron("0 0 2 * * ?"))
        .with(TestJob::undeclared());

    let registry = JobRegistry::from_provider(&provider);

    assert_eq!(registry.len(), 2);
    assert_eq!(registry.get("a").unwrap().descriptor().cron, "0 0 1 * * ?");
}

#[test]
fn test_execution_set_resolution() {
    let registry = JobRegistry::from_provider(&StaticJobProvider::simple(&["a", "b", "c"]));

    let all = resolve_execution_set(&registry, &names(&["a", "ghost"]), true);
    assert_eq!(all.into_inner(), registry.key_set());

    let filtered = resolve_execution_set(&registry, &names(&["a", "ghost", "c"]), false);
    assert_eq!(filtered.into_inner(), names(&["a", "c"]));
}

#[tokio::test]
async fn test_startup_hands_off_resolved_jobs() {
    let provider = StaticJobProvider::new()
        .with(TestJob::simple("a").with_implementation("billing::Sweep"))
        .with(TestJob::dataflow("b", true))
        .with(TestJob::script("c"));
    let h = harness(provider, ExecutionConfig::new("a,b", false));

    let report = h.controller.initialize().await;

    assert!(report.is_complete());
    assert_eq!(report.active, ActiveSet::from_iter(["a", "b"]));
    assert_eq!(h.scheduler.started_names(), vec!["a", "b"]);
    h.coordination.assert_call_count_eq(0);

    let starts = h.scheduler.starts();
    assert_eq!(starts[0].implementation, "billing::Sweep");
    assert!(matches!(
        starts[0].config.type_config,
        JobTypeConfig::Simple { ref job_class, .. } if job_class == "billing::Sweep"
    ));

    let dataflow = &starts[1];
    assert_eq!(dataflow.implementation, "jobwire_testkit::TestJob");
    assert_eq!(
        dataflow.config.sharding_strategy,
        ShardingStrategy::AverageAllocation
    );
    assert!(matches!(
        dataflow.config.type_config,
        JobTypeConfig::Dataflow {
            streaming_process: true,
            ..
        }
    ));
}

#[tokio::test]
async fn test_startup_skips_unsupported_and_failing_jobs() {
    let provider = StaticJobProvider::new()
        .with(TestJob::simple("a"))
        .with(TestJob::unsupported("b"))
        .with(TestJob::simple("c"));
    let h = harness(provider, ExecutionConfig::all());
    h.scheduler.fail_for("c");

    let report = h.controller.initialize().await;

    assert_eq!(report.active, ActiveSet::from_iter(["a"]));
    assert_eq!(report.failures.len(), 2);
    let unsupported = &report.failures[0];
    assert!(matches!(
        unsupported,
        ActivationError::UnsupportedJobVariant { .. }
    ));
    assert_eq!(unsupported.job(), Some("b"));
    let refused = &report.failures[1];
    assert!(matches!(refused, ActivationError::SchedulerInit { .. }));
    assert_eq!(refused.job(), Some("c"));
    assert_eq!(h.scheduler.started_names(), vec!["a"]);
}

#[tokio::test]
async fn test_reconfigure_moves_node_to_new_set() {
    let h = simple_harness(&["A", "B", "C"], "A,B");
    h.controller.initialize().await;

    let outcome = h.apply(&["B", "C"]).await.unwrap();

    assert_eq!(outcome.active, ActiveSet::from_iter(["B", "C"]));
    assert_eq!(
        h.controller.active_set().await,
        ActiveSet::from_iter(["B", "C"])
    );
    assert_eq!(h.coordination.enabled(), vec!["B", "C"]);
    assert_eq!(h.coordination.disabled(), vec!["A"]);
    assert_eq!(h.scheduler.start_count("C"), 1);
    assert_eq!(h.scheduler.start_count("A"), 1);
    assert_eq!(outcome.started, vec!["C"]);
    assert!(h.controller.started_set().await.contains("A"));
}

#[tokio::test]
async fn test_reconfigure_with_unknown_name_is_rejected_without_side_effects() {
    let h = simple_harness(&["A", "B"], "A");
    h.controller.initialize().await;
    let before = h.controller.active_set().await;

    let err = h.controller.reconfigure(["A", "Z"], true).await;

    match err {
        Err(ActivationError::UnknownJobName { names }) => assert_eq!(names, vec!["Z"]),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(h.controller.active_set().await, before);
    assert!(!h.controller.execute_all().await);
    h.coordination.assert_call_count_eq(0);
    assert_eq!(h.scheduler.started_names(), vec!["A"]);
}

#[tokio::test]
async fn test_added_and_removed_jobs_signalled_once() {
    let h = simple_harness(&["a", "b", "c", "d"], "a,b");
    h.controller.initialize().await;

    h.apply(&["b", "c", "d"]).await.unwrap();

    let enabled = h.coordination.enabled();
    let disabled = h.coordination.disabled();
    for added in ["c", "d"] {
        assert_eq!(enabled.iter().filter(|name| *name == added).count(), 1);
    }
    assert_eq!(disabled, vec!["a"]);
    assert!(enabled.iter().all(|name| !disabled.contains(name)));
}

#[tokio::test]
async fn test_repeated_reconfigure_does_not_restart_jobs() {
    let h = simple_harness(&["a", "b"], "");
    h.controller.initialize().await;

    let first = h.apply(&["a", "b"]).await.unwrap();
    let second = h.apply(&["a", "b"]).await.unwrap();

    assert_eq!(first.started, vec!["a", "b"]);
    assert!(second.started.is_empty());
    assert!(second.disabled.is_empty());
    assert_eq!(h.scheduler.start_count("a"), 1);
    assert_eq!(h.scheduler.start_count("b"), 1);
    assert_eq!(first.active, second.active);
    assert_ne!(first.id, second.id);
}

#[tokio::test]
async fn test_disabled_job_keeps_scheduler_and_is_reenabled() {
    let h = simple_harness(&["a", "b"], "a,b");
    h.controller.initialize().await;

    h.apply(&["b"]).await.unwrap();
    let outcome = h.apply(&["a", "b"]).await.unwrap();

    assert!(outcome.started.is_empty());
    assert_eq!(h.scheduler.start_count("a"), 1);
    assert_eq!(
        h.coordination.calls(),
        vec![
            CoordinationCall::Enable("b".to_string()),
            CoordinationCall::Disable("a".to_string()),
            CoordinationCall::Enable("a".to_string()),
            CoordinationCall::Enable("b".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_empty_target_disables_every_active_job() {
    let h = simple_harness(&["a", "b", "c"], "a,b");
    h.controller.initialize().await;

    let outcome = h.apply(&[]).await.unwrap();

    assert!(outcome.active.is_empty());
    assert!(outcome.enabled.is_empty());
    assert!(outcome.started.is_empty());
    assert_eq!(outcome.disabled, vec!["a", "b"]);
    assert!(h.controller.active_set().await.is_empty());
    assert_eq!(h.coordination.disabled(), vec!["a", "b"]);
    assert!(h.coordination.enabled().is_empty());
    assert_eq!(h.controller.started_set().await, names(&["a", "b"]));
}

#[tokio::test]
async fn test_reconfigure_before_initialize_activates_resolved_jobs_first() {
    let h = simple_harness(&["a", "b", "c"], "a,b");
    assert!(h.controller.active_set().await.is_empty());

    let outcome = h.apply(&["c"]).await.unwrap();

    assert_eq!(outcome.active, ActiveSet::from_iter(["c"]));
    assert_eq!(outcome.disabled, vec!["a", "b"]);
    assert_eq!(h.scheduler.started_names(), vec!["a", "b", "c"]);
    assert_eq!(
        h.coordination.calls(),
        vec![
            CoordinationCall::Enable("c".to_string()),
            CoordinationCall::Disable("a".to_string()),
            CoordinationCall::Disable("b".to_string()),
        ]
    );

    let report = h.controller.initialize().await;

    assert!(report.started.is_empty());
    assert_eq!(report.active, ActiveSet::from_iter(["c"]));
    assert_eq!(h.scheduler.started_names(), vec!["a", "b", "c"]);
    h.coordination.assert_call_count_eq(3);
}

#[tokio::test]
async fn test_state_machine_phases_during_reconfigure() {
    let h = simple_harness(&["a", "b"], "a");
    h.controller.initialize().await;
    assert_eq!(h.controller.state(), ControllerState::Idle);
    h.coordination.set_delay(Duration::from_millis(100));

    let running = tokio::spawn({
        let controller = Arc::clone(&h.controller);
        async move { controller.reconfigure(["b"], false).await }
    });
    sleep(Duration::from_millis(30)).await;

    assert_eq!(h.controller.state(), ControllerState::Applying);

    let outcome = running.await.expect("task panicked");
    assert_eq!(outcome.unwrap().active, ActiveSet::from_iter(["b"]));
    assert_eq!(h.controller.state(), ControllerState::Idle);

    let rejected = h.apply(&["missing"]).await.unwrap_err();
    assert!(matches!(rejected, ActivationError::UnknownJobName { .. }));
    assert_eq!(h.controller.state(), ControllerState::Idle);

    h.coordination.fail_for("a");
    let failed = h.apply(&["a"]).await.unwrap_err();
    assert!(matches!(
        failed,
        ActivationError::CoordinationUnavailable { .. }
    ));
    assert_eq!(h.controller.state(), ControllerState::Idle);
}

#[tokio::test]
async fn test_coordination_outage_is_reported_and_retry_converges() {
    let h = simple_harness(&["a", "b"], "a");
    h.controller.initialize().await;
    h.coordination.fail_for("b");

    let err = h.apply(&["b"]).await.unwrap_err();

    assert!(matches!(
        err,
        ActivationError::CoordinationUnavailable {
            operation: CoordinationOp::Enable,
            ..
        }
    ));
    assert!(err.is_retryable());
    assert_eq!(h.controller.active_set().await, ActiveSet::from_iter(["a"]));
    assert_eq!(h.controller.state(), ControllerState::Idle);

    h.coordination.recover("b");
    let outcome = h.apply(&["b"]).await.unwrap();

    assert_eq!(outcome.active, ActiveSet::from_iter(["b"]));
    assert_eq!(outcome.disabled, vec!["a"]);
    assert_eq!(h.scheduler.start_count("b"), 1);
}

#[tokio::test]
async fn test_scheduler_failure_does_not_block_other_jobs() {
    let h = simple_harness(&["a", "b", "c"], "a");
    h.controller.initialize().await;
    h.scheduler.fail_for("b");

    let err = h.apply(&["b", "c"]).await.unwrap_err();

    assert!(matches!(err, ActivationError::SchedulerInit { .. }));
    assert_eq!(err.job(), Some("b"));
    assert_eq!(h.controller.active_set().await, ActiveSet::from_iter(["c"]));
    assert_eq!(h.coordination.enabled(), vec!["c"]);
    assert_eq!(h.coordination.disabled(), vec!["a"]);

    h.scheduler.recover("b");
    let outcome = h.apply(&["b", "c"]).await.unwrap();
    assert_eq!(outcome.started, vec!["b"]);
    assert_eq!(outcome.active, ActiveSet::from_iter(["b", "c"]));
}

#[tokio::test]
async fn test_several_handoff_failures_are_aggregated() {
    let provider = StaticJobProvider::new()
        .with(TestJob::simple("a"))
        .with(TestJob::unsupported("b"))
        .with(TestJob::simple("c"));
    let h = harness(provider, ExecutionConfig::default());
    h.scheduler.fail_for("c");

    let err = h.apply(&["a", "b", "c"]).await.unwrap_err();

    match err {
        ActivationError::PartiallyApplied { failures } => assert_eq!(failures.len(), 2),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(h.controller.active_set().await, ActiveSet::from_iter(["a"]));
}

#[tokio::test]
async fn test_concurrent_reconfigurations_do_not_interleave() {
    let h = simple_harness(&["a", "b"], "");
    h.controller.initialize().await;
    h.coordination.set_delay(Duration::from_millis(20));

    let first = tokio::spawn({
        let controller = Arc::clone(&h.controller);
        async move { controller.reconfigure(["a"], false).await }
    });
    let second = tokio::spawn({
        let controller = Arc::clone(&h.controller);
        async move { controller.reconfigure(["b"], false).await }
    });

    let both = futures::future::join_all([first, second]);
    let results = timeout(Duration::from_secs(5), both)
        .await
        .expect("reconfigurations did not finish within 5 seconds");
    for result in results {
        let outcome = result.expect("task panicked");
        assert!(outcome.is_ok(), "reconfiguration failed: {outcome:?}");
    }

    let enable = |name: &str| CoordinationCall::Enable(name.to_string());
    let disable = |name: &str| CoordinationCall::Disable(name.to_string());
    let calls = h.coordination.calls();
    assert!(
        calls == vec![enable("a"), enable("b"), disable("a")]
            || calls == vec![enable("b"), enable("a"), disable("b")],
        "interleaved coordination calls: {calls:?}"
    );
    assert_eq!(h.controller.active_set().await.len(), 1);
}

#[tokio::test]
async fn test_configuration_document_drives_startup() {
    let config = JobwireConfig::from_toml_str(
        r#"
        [execution]
        execute_list = "reports, billing"

        [coordination]
        server_lists = "zk1:2181"
        namespace = "payments"
        "#,
    )
    .unwrap();
    let provider = StaticJobProvider::simple(&["billing", "reports", "audit"]);
    let h = harness(provider, config.execution);

    let report = h.controller.initialize().await;

    assert_eq!(report.active, ActiveSet::from_iter(["billing", "reports"]));
    let audit = h.controller.job_config("audit").unwrap();
    assert_eq!(audit.job_name(), "audit");
}
