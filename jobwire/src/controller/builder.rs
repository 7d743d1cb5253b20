use std::fmt;
use std::sync::Arc;

use crate::config::ExecutionConfig;
use crate::coordination::CoordinationClient;
use crate::execution::resolve_execution_set;
use crate::handoff::SchedulerBackend;
use crate::job::{JobProvider, ManagedJob};
use crate::registry::JobRegistry;

use super::activation::ActivationController;

/// Builder for constructing an [`ActivationController`] with explicit dependencies.
///
/// `build` registers the supplied jobs and resolves the node's execution set;
/// call [`ActivationController::initialize`] afterwards to start them.
///
/// # Example
///
/// ```ignore
/// use jobwire::*;
///
/// let controller = ActivationControllerBuilder::new(config.execution)
///     .with_provider(&provider)
///     .with_scheduler(backend)
///     .with_coordination(coordination)
///     .build()?;
/// let report = controller.initialize().await;
/// ```
pub struct ActivationControllerBuilder {
    execution: ExecutionConfig,
    jobs: Option<Vec<Arc<dyn ManagedJob>>>,
    scheduler: Option<Arc<dyn SchedulerBackend>>,
    coordination: Option<Arc<dyn CoordinationClient>>,
}

impl fmt::Debug for ActivationControllerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivationControllerBuilder")
            .field("execution", &self.execution)
            .field("job_count", &self.jobs.as_ref().map(Vec::len))
            .field("scheduler_set", &self.scheduler.is_some())
            .field("coordination_set", &self.coordination.is_some())
            .finish()
    }
}

impl ActivationControllerBuilder {
    /// Create a new builder with the node's execution configuration.
    pub fn new(execution: ExecutionConfig) -> Self {
        Self {
            execution,
            jobs: None,
            scheduler: None,
            coordination: None,
        }
    }

    /// Take the job objects from a provider, in its discovery order.
    pub fn with_provider(mut self, provider: &dyn JobProvider) -> Self {
        self.jobs = Some(provider.jobs());
        self
    }

    /// Set the job objects directly.
    pub fn with_jobs(mut self, jobs: Vec<Arc<dyn ManagedJob>>) -> Self {
        self.jobs = Some(jobs);
        self
    }

    /// Set the scheduler backend.
    pub fn with_scheduler(mut self, scheduler: Arc<dyn SchedulerBackend>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Set the coordination client.
    pub fn with_coordination(mut self, coordination: Arc<dyn CoordinationClient>) -> Self {
        self.coordination = Some(coordination);
        self
    }

    /// Build the registry, resolve the execution set and create the controller.
    ///
    /// # Errors
    ///
    /// Returns an error if any required dependency is missing.
    pub fn build(self) -> anyhow::Result<ActivationController> {
        let jobs = self
            .jobs
            .ok_or_else(|| anyhow::anyhow!("job provider missing"))?;
        let scheduler = self
            .scheduler
            .ok_or_else(|| anyhow::anyhow!("scheduler dependency missing"))?;
        let coordination = self
            .coordination
            .ok_or_else(|| anyhow::anyhow!("coordination dependency missing"))?;

        tracing::info!(
            execute_list = %self.execution.execute_list,
            execute_all = self.execution.execute_all,
            "building activation controller"
        );

        let registry = JobRegistry::from_jobs(jobs);
        let resolved = resolve_execution_set(
            &registry,
            &self.execution.candidates(),
            self.execution.execute_all,
        );

        Ok(ActivationController::new(
            registry,
            resolved,
            self.execution.execute_all,
            scheduler,
            coordination,
        ))
    }
}
