use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn, Instrument};

use crate::coordination::{CoordinationClient, CoordinationOp};
use crate::error::ActivationError;
use crate::execution::ActiveSet;
use crate::handoff::{SchedulerBackend, SchedulerHandoff};
use crate::job_config::LiteJobConfig;
use crate::registry::JobRegistry;
use crate::telemetry;

use super::state::{ActivationReport, ControllerState, ReconfigurationId, ReconfigureOutcome};

#[derive(Debug)]
struct ActivationState {
    /// Scheduled on this node. Empty until the startup pass commits.
    active: ActiveSet,
    /// Resolved execution set waiting for the startup pass.
    pending: ActiveSet,
    /// Jobs with a scheduler instance in this process. Never shrinks.
    started: BTreeSet<String>,
    execute_all: bool,
    initialized: bool,
}

/// Resets the phase to `Idle` however the operation ends.
struct PhaseGuard<'a> {
    phase: &'a AtomicU8,
}

impl<'a> PhaseGuard<'a> {
    fn enter(phase: &'a AtomicU8, state: ControllerState) -> Self {
        phase.store(state as u8, Ordering::SeqCst);
        Self { phase }
    }

    fn advance(&self, state: ControllerState) {
        self.phase.store(state as u8, Ordering::SeqCst);
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        self.advance(ControllerState::Idle);
    }
}

/// Owns the node's active job set and is the only place it changes.
///
/// Startup activation and every reconfiguration run under one async lock,
/// so concurrent callers never interleave their handoff and coordination
/// calls. The registry is immutable and read without locking.
pub struct ActivationController {
    registry: Arc<JobRegistry>,
    handoff: SchedulerHandoff,
    coordination: Arc<dyn CoordinationClient>,
    inner: Mutex<ActivationState>,
    phase: AtomicU8,
}

impl fmt::Debug for ActivationController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("ActivationController");
        debug.field("registered_jobs", &self.registry.len());
        debug.field("state", &self.state());

        match self.inner.try_lock() {
            Ok(inner) => {
                debug.field("active", &inner.active);
                debug.field("pending", &inner.pending);
                debug.field("started", &inner.started);
                debug.field("execute_all", &inner.execute_all);
            }
            Err(_) => {
                debug.field("active", &"<locked>");
            }
        }

        debug.finish()
    }
}

impl ActivationController {
    /// Create a controller for an already resolved execution set.
    ///
    /// The resolved jobs stay pending, and the active set empty, until the
    /// startup pass hands them to the scheduler.
    pub fn new(
        registry: JobRegistry,
        resolved: ActiveSet,
        execute_all: bool,
        backend: Arc<dyn SchedulerBackend>,
        coordination: Arc<dyn CoordinationClient>,
    ) -> Self {
        let registry = Arc::new(registry);
        let handoff = SchedulerHandoff::new(
            Arc::clone(&registry),
            backend,
            Arc::clone(&coordination),
        );

        Self {
            registry,
            handoff,
            coordination,
            inner: Mutex::new(ActivationState {
                active: ActiveSet::new(),
                pending: resolved,
                started: BTreeSet::new(),
                execute_all,
                initialized: false,
            }),
            phase: AtomicU8::new(ControllerState::Idle as u8),
        }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Current phase of the reconfiguration state machine.
    pub fn state(&self) -> ControllerState {
        ControllerState::from_u8(self.phase.load(Ordering::SeqCst))
    }

    pub async fn active_set(&self) -> ActiveSet {
        self.inner.lock().await.active.clone()
    }

    pub async fn started_set(&self) -> BTreeSet<String> {
        self.inner.lock().await.started.clone()
    }

    pub async fn execute_all(&self) -> bool {
        self.inner.lock().await.execute_all
    }

    /// Preview the configuration a registered job is handed off with.
    pub fn job_config(&self, name: &str) -> Result<LiteJobConfig, ActivationError> {
        self.handoff.job_config(name)
    }

    /// Start a scheduler for every job in the resolved execution set.
    ///
    /// A job that cannot be started is reported in the returned failures and
    /// left out of the active set; the others proceed. Only the first startup
    /// pass hands anything off, later calls report the current active set.
    pub async fn initialize(&self) -> ActivationReport {
        let mut inner = self.inner.lock().await;
        if inner.initialized {
            return ActivationReport {
                active: inner.active.clone(),
                started: Vec::new(),
                failures: Vec::new(),
            };
        }

        self.activate_pending(&mut inner).await
    }

    async fn activate_pending(&self, inner: &mut ActivationState) -> ActivationReport {
        let resolved = std::mem::take(&mut inner.pending);
        let mut active = BTreeSet::new();
        let mut started = Vec::new();
        let mut failures = Vec::new();

        for name in resolved.into_inner() {
            if !inner.started.contains(&name) {
                if let Err(err) = self.handoff.hand_off(&name).await {
                    failures.push(err);
                    continue;
                }
                inner.started.insert(name.clone());
                started.push(name.clone());
            }
            active.insert(name);
        }

        inner.active = ActiveSet::from(active);
        inner.initialized = true;
        telemetry::set_active_jobs(inner.active.len());

        if failures.is_empty() {
            info!(jobs = %inner.active, "node execution set activated");
        } else {
            warn!(
                jobs = %inner.active,
                failed = failures.len(),
                "node execution set activated with failures"
            );
        }

        ActivationReport {
            active: inner.active.clone(),
            started,
            failures,
        }
    }

    /// Replace the node's active set with `target`.
    ///
    /// Unknown names reject the whole request before any side effect. Newly
    /// requested jobs that were never started are handed to the scheduler,
    /// every requested job is enabled, and jobs dropped from the previous set
    /// are disabled but keep their scheduler instance. Called before
    /// [`initialize`](Self::initialize), the startup pass runs first so the
    /// previous set is the one actually scheduled.
    ///
    /// # Errors
    ///
    /// - [`ActivationError::UnknownJobName`] - nothing changed.
    /// - [`ActivationError::CoordinationUnavailable`] - the call stopped at
    ///   the failing job; the active set was not committed. Retrying the
    ///   same request is safe.
    /// - [`ActivationError::SchedulerInit`] or
    ///   [`ActivationError::UnsupportedJobVariant`] - that job was not
    ///   activated; everything else was applied and committed.
    /// - [`ActivationError::PartiallyApplied`] - as above, for several jobs.
    pub async fn reconfigure<I, S>(
        &self,
        target: I,
        execute_all: bool,
    ) -> Result<ReconfigureOutcome, ActivationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let target: BTreeSet<String> = target.into_iter().map(Into::into).collect();
        let id = ReconfigurationId::new();
        let span = telemetry::reconfigure_span(id, target.len(), execute_all);

        self.reconfigure_locked(id, target, execute_all)
            .instrument(span)
            .await
    }

    async fn reconfigure_locked(
        &self,
        id: ReconfigurationId,
        target: BTreeSet<String>,
        execute_all: bool,
    ) -> Result<ReconfigureOutcome, ActivationError> {
        let mut inner = self.inner.lock().await;
        let phase = PhaseGuard::enter(&self.phase, ControllerState::Validating);

        let unknown: Vec<String> = target
            .iter()
            .filter(|name| !self.registry.contains(name))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            warn!(unknown = ?unknown, "rejecting reconfiguration with unregistered jobs");
            telemetry::record_reconfiguration("rejected");
            return Err(ActivationError::UnknownJobName { names: unknown });
        }

        phase.advance(ControllerState::Applying);

        if !inner.initialized {
            debug!("reconfiguring before startup; activating resolved jobs first");
            self.activate_pending(&mut inner).await;
        }

        let mut enabled = Vec::new();
        let mut disabled = Vec::new();
        let mut started = Vec::new();
        let mut failures = Vec::new();

        for name in &target {
            if !inner.started.contains(name) {
                if let Err(err) = self.handoff.hand_off(name).await {
                    failures.push(err);
                    continue;
                }
                inner.started.insert(name.clone());
                started.push(name.clone());
            }

            if let Err(err) = self.signal(CoordinationOp::Enable, name).await {
                telemetry::record_reconfiguration("failed");
                return Err(err);
            }
            enabled.push(name.clone());
        }

        let removed: Vec<String> = inner
            .active
            .iter()
            .filter(|name| !target.contains(*name))
            .map(str::to_string)
            .collect();
        for name in removed {
            if let Err(err) = self.signal(CoordinationOp::Disable, &name).await {
                telemetry::record_reconfiguration("failed");
                return Err(err);
            }
            disabled.push(name);
        }

        let failed: BTreeSet<&str> = failures.iter().filter_map(ActivationError::job).collect();
        inner.active = target
            .iter()
            .filter(|name| !failed.contains(name.as_str()))
            .cloned()
            .collect();
        inner.execute_all = execute_all;
        telemetry::set_active_jobs(inner.active.len());

        info!(
            jobs = %inner.active,
            execute_all = execute_all,
            enabled = enabled.len(),
            disabled = disabled.len(),
            started = started.len(),
            "node execution set reconfigured"
        );

        let outcome = ReconfigureOutcome {
            id,
            active: inner.active.clone(),
            execute_all,
            enabled,
            disabled,
            started,
            applied_at: Utc::now(),
        };

        match failures.len() {
            0 => {
                telemetry::record_reconfiguration("applied");
                Ok(outcome)
            }
            1 => {
                telemetry::record_reconfiguration("partial");
                Err(failures.remove(0))
            }
            _ => {
                telemetry::record_reconfiguration("partial");
                Err(ActivationError::PartiallyApplied { failures })
            }
        }
    }

    async fn signal(&self, operation: CoordinationOp, name: &str) -> Result<(), ActivationError> {
        let result = match operation {
            CoordinationOp::Enable => self.coordination.enable(name).await,
            CoordinationOp::Disable => self.coordination.disable(name).await,
        };

        match result {
            Ok(()) => {
                debug!(job = %name, operation = %operation, "coordination call succeeded");
                telemetry::record_coordination_call(name, operation.as_str(), "ok");
                Ok(())
            }
            Err(source) => {
                warn!(
                    job = %name,
                    operation = %operation,
                    error = %source,
                    "coordination call failed"
                );
                telemetry::record_coordination_call(name, operation.as_str(), "error");
                Err(ActivationError::CoordinationUnavailable {
                    job: name.to_string(),
                    operation,
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobDescriptor, JobVariant, ManagedJob};
    use anyhow::bail;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    struct Job(&'static str);

    impl ManagedJob for Job {
        fn descriptor(&self) -> Option<JobDescriptor> {
            Some(JobDescriptor::new(self.0, "0 * * * * ?", 1))
        }

        fn variant(&self) -> Option<JobVariant> {
            Some(JobVariant::Simple)
        }
    }

    #[derive(Default)]
    struct Calls {
        log: StdMutex<Vec<String>>,
        fail_on: StdMutex<Option<String>>,
    }

    impl Calls {
        fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }

        fn push(&self, entry: String) -> anyhow::Result<()> {
            if self.fail_on.lock().unwrap().as_deref() == Some(entry.as_str()) {
                bail!("session expired");
            }
            self.log.lock().unwrap().push(entry);
            Ok(())
        }
    }

    #[async_trait]
    impl CoordinationClient for Calls {
        async fn enable(&self, job_name: &str) -> anyhow::Result<()> {
            self.push(format!("enable:{job_name}"))
        }

        async fn disable(&self, job_name: &str) -> anyhow::Result<()> {
            self.push(format!("disable:{job_name}"))
        }
    }

    #[async_trait]
    impl SchedulerBackend for Calls {
        async fn start(
            &self,
            _job: Arc<dyn ManagedJob>,
            _coordination: Arc<dyn CoordinationClient>,
            config: LiteJobConfig,
        ) -> anyhow::Result<()> {
            self.push(format!("start:{}", config.job_name()))
        }
    }

    fn controller(names: &[&'static str], resolved: &[&str]) -> (ActivationController, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        let registry = JobRegistry::from_jobs(
            names
                .iter()
                .map(|name| Arc::new(Job(name)) as Arc<dyn ManagedJob>)
                .collect::<Vec<_>>(),
        );
        let controller = ActivationController::new(
            registry,
            resolved.iter().copied().collect(),
            false,
            calls.clone(),
            calls.clone(),
        );
        (controller, calls)
    }

    #[tokio::test]
    async fn test_initialize_starts_resolved_jobs_once() {
        let (controller, calls) = controller(&["a", "b", "c"], &["a", "b"]);

        let report = controller.initialize().await;
        assert!(report.is_complete());
        assert_eq!(report.started, vec!["a", "b"]);
        assert_eq!(calls.log(), vec!["start:a", "start:b"]);

        let again = controller.initialize().await;
        assert!(again.started.is_empty());
        assert_eq!(again.active, ActiveSet::from_iter(["a", "b"]));
        assert_eq!(calls.log().len(), 2);
    }

    #[tokio::test]
    async fn test_initialize_drops_jobs_that_fail_to_start() {
        let (controller, calls) = controller(&["a", "b"], &["a", "b"]);
        *calls.fail_on.lock().unwrap() = Some("start:a".to_string());

        let report = controller.initialize().await;
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].job(), Some("a"));
        assert_eq!(report.active, ActiveSet::from_iter(["b"]));
        assert!(!controller.started_set().await.contains("a"));
    }

    #[tokio::test]
    async fn test_reconfigure_swaps_jobs() {
        let (controller, calls) = controller(&["a", "b", "c"], &["a", "b"]);
        controller.initialize().await;

        let outcome = controller.reconfigure(["b", "c"], false).await.unwrap();

        assert_eq!(outcome.active, ActiveSet::from_iter(["b", "c"]));
        assert_eq!(outcome.started, vec!["c"]);
        assert_eq!(outcome.enabled, vec!["b", "c"]);
        assert_eq!(outcome.disabled, vec!["a"]);
        assert_eq!(
            calls.log().join(" "),
            "start:a start:b enable:b start:c enable:c disable:a"
        );
        assert_eq!(controller.state(), ControllerState::Idle);
    }

    #[tokio::test]
    async fn test_reconfigure_before_initialize_runs_startup_first() {
        let (controller, calls) = controller(&["a", "b", "c"], &["a", "b"]);
        assert!(controller.active_set().await.is_empty());

        let outcome = controller.reconfigure(["c"], false).await.unwrap();

        assert_eq!(outcome.active, ActiveSet::from_iter(["c"]));
        assert_eq!(outcome.started, vec!["c"]);
        assert_eq!(outcome.disabled, vec!["a", "b"]);
        assert_eq!(
            calls.log().join(" "),
            "start:a start:b start:c enable:c disable:a disable:b"
        );

        let report = controller.initialize().await;
        assert!(report.started.is_empty());
        assert_eq!(report.active, ActiveSet::from_iter(["c"]));
        assert_eq!(calls.log().len(), 6);
    }

    #[tokio::test]
    async fn test_rejected_reconfigure_before_initialize_keeps_resolved_jobs() {
        let (controller, calls) = controller(&["a", "b"], &["a"]);

        controller.reconfigure(["z"], false).await.unwrap_err();
        assert!(calls.log().is_empty());

        let report = controller.initialize().await;
        assert_eq!(report.started, vec!["a"]);
        assert_eq!(controller.active_set().await, ActiveSet::from_iter(["a"]));
    }

    #[tokio::test]
    async fn test_unknown_name_changes_nothing() {
        let (controller, calls) = controller(&["a", "b"], &["a"]);
        controller.initialize().await;

        let err = controller.reconfigure(["a", "z"], true).await.unwrap_err();

        match err {
            ActivationError::UnknownJobName { names } => assert_eq!(names, vec!["z"]),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(controller.active_set().await, ActiveSet::from_iter(["a"]));
        assert!(!controller.execute_all().await);
        assert_eq!(calls.log(), vec!["start:a"]);
        assert_eq!(controller.state(), ControllerState::Idle);
    }

    #[tokio::test]
    async fn test_coordination_failure_leaves_active_set_uncommitted() {
        let (controller, calls) = controller(&["a", "b"], &["a"]);
        controller.initialize().await;
        *calls.fail_on.lock().unwrap() = Some("disable:a".to_string());

        let err = controller.reconfigure(["b"], false).await.unwrap_err();

        assert!(matches!(
            err,
            ActivationError::CoordinationUnavailable {
                operation: CoordinationOp::Disable,
                ..
            }
        ));
        assert_eq!(controller.active_set().await, ActiveSet::from_iter(["a"]));
        assert!(controller.started_set().await.contains("b"));

        *calls.fail_on.lock().unwrap() = None;
        let outcome = controller.reconfigure(["b"], false).await.unwrap();
        assert!(outcome.started.is_empty());
        assert_eq!(outcome.disabled, vec!["a"]);
    }

    #[tokio::test]
    async fn test_execute_all_flag_committed() {
        let (controller, _calls) = controller(&["a"], &[]);
        controller.initialize().await;

        let outcome = controller.reconfigure(["a"], true).await.unwrap();
        assert!(outcome.execute_all);
        assert!(controller.execute_all().await);
    }

    #[test]
    fn test_debug_reports_registry_size() {
        let (controller, _calls) = controller(&["a", "b"], &[]);
        let rendered = format!("{controller:?}");
        assert!(rendered.contains("registered_jobs: 2"));
    }
}
