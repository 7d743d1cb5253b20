use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use crate::coordination::CoordinationClient;
use crate::error::ActivationError;
use crate::job::ManagedJob;
use crate::job_config::{build_job_config, LiteJobConfig};
use crate::registry::JobRegistry;
use crate::telemetry;

/// The external distributed scheduling engine.
///
/// `start` creates and initialises one scheduler instance bound to the job,
/// the coordination client and its configuration. Registration and the
/// initial sharding claim begin there; nothing after that is observed.
#[async_trait]
pub trait SchedulerBackend: Send + Sync {
    async fn start(
        &self,
        job: Arc<dyn ManagedJob>,
        coordination: Arc<dyn CoordinationClient>,
        config: LiteJobConfig,
    ) -> anyhow::Result<()>;
}

/// Builds a job's configuration and hands it to the scheduler backend.
#[derive(Clone)]
pub struct SchedulerHandoff {
    registry: Arc<JobRegistry>,
    backend: Arc<dyn SchedulerBackend>,
    coordination: Arc<dyn CoordinationClient>,
}

impl fmt::Debug for SchedulerHandoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerHandoff")
            .field("registered_jobs", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl SchedulerHandoff {
    pub fn new(
        registry: Arc<JobRegistry>,
        backend: Arc<dyn SchedulerBackend>,
        coordination: Arc<dyn CoordinationClient>,
    ) -> Self {
        Self {
            registry,
            backend,
            coordination,
        }
    }

    /// Build the configuration a registered job would be started with.
    pub fn job_config(&self, name: &str) -> Result<LiteJobConfig, ActivationError> {
        let entry = self
            .registry
            .get(name)
            .ok_or_else(|| ActivationError::UnknownJobName {
                names: vec![name.to_string()],
            })?;
        build_job_config(entry)
    }

    /// Start one scheduler instance for `name`.
    ///
    /// Jobs whose configuration cannot be built are not started; the caller
    /// decides whether that is fatal.
    pub async fn hand_off(&self, name: &str) -> Result<(), ActivationError> {
        telemetry::instrument_handoff(name, self.hand_off_inner(name)).await
    }

    async fn hand_off_inner(&self, name: &str) -> Result<(), ActivationError> {
        let entry = self
            .registry
            .get(name)
            .ok_or_else(|| ActivationError::UnknownJobName {
                names: vec![name.to_string()],
            })?;

        let config = match build_job_config(entry) {
            Ok(config) => config,
            Err(err) => {
                warn!(job = %name, error = %err, "skipping job with unsupported variant");
                telemetry::record_handoff(name, "unsupported");
                return Err(err);
            }
        };

        let cron = config.core().cron.clone();
        let sharding_total_count = config.core().sharding_total_count;

        if let Err(source) = self
            .backend
            .start(entry.job(), Arc::clone(&self.coordination), config)
            .await
        {
            warn!(job = %name, error = %source, "job scheduler failed to initialize");
            telemetry::record_handoff(name, "failed");
            return Err(ActivationError::SchedulerInit {
                job: name.to_string(),
                source,
            });
        }

        info!(
            job = %name,
            cron = %cron,
            sharding_total_count = sharding_total_count,
            "job scheduler initialized"
        );
        telemetry::record_handoff(name, "started");
        Ok(())
    }
}
