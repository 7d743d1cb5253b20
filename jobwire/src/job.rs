use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Declarative scheduling metadata attached to a job implementation.
///
/// A descriptor is immutable once extracted. The `name` is the key the job is
/// registered under; every other field is passed through to the external
/// scheduler.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    /// Unique job name.
    pub name: String,
    /// Trigger schedule, opaque to this crate.
    pub cron: String,
    /// Number of logical shards the scheduler splits the job into.
    pub sharding_total_count: NonZeroU32,
    pub description: String,
    pub job_parameter: String,
    /// Per-shard parameters, e.g. `0=a,1=b`.
    pub sharding_item_parameters: String,
    pub failover: bool,
    pub misfire: bool,
    pub disabled: bool,
    /// Overwrite configuration already stored in the coordination service.
    pub overwrite: bool,
    /// Only meaningful for [`JobVariant::Dataflow`].
    pub streaming_process: bool,
}

impl JobDescriptor {
    /// Create a descriptor with the scheduler's defaults for the optional fields.
    ///
    /// A shard count of zero is raised to one.
    pub fn new(
        name: impl Into<String>,
        cron: impl Into<String>,
        sharding_total_count: u32,
    ) -> Self {
        Self {
            name: name.into(),
            cron: cron.into(),
            sharding_total_count: NonZeroU32::new(sharding_total_count).unwrap_or(NonZeroU32::MIN),
            description: String::new(),
            job_parameter: String::new(),
            sharding_item_parameters: String::new(),
            failover: false,
            misfire: true,
            disabled: false,
            overwrite: false,
            streaming_process: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_job_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.job_parameter = parameter.into();
        self
    }

    pub fn with_sharding_item_parameters(mut self, parameters: impl Into<String>) -> Self {
        self.sharding_item_parameters = parameters.into();
        self
    }

    pub fn with_failover(mut self, failover: bool) -> Self {
        self.failover = failover;
        self
    }

    pub fn with_misfire(mut self, misfire: bool) -> Self {
        self.misfire = misfire;
        self
    }

    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_streaming_process(mut self, streaming: bool) -> Self {
        self.streaming_process = streaming;
        self
    }
}

/// The execution capability a job implementation provides.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum JobVariant {
    /// One synchronous unit of work per shard.
    Simple,
    /// Fetch/process loop, optionally streaming.
    Dataflow,
    /// External process invocation.
    Script,
}

impl JobVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobVariant::Simple => "simple",
            JobVariant::Dataflow => "dataflow",
            JobVariant::Script => "script",
        }
    }
}

impl Display for JobVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A job object discovered in the host process.
///
/// Implementors expose their declarative metadata and the capability they
/// implement. Objects returning `None` from [`ManagedJob::descriptor`] are not
/// managed by this crate; objects returning `None` from
/// [`ManagedJob::variant`] are registered but can never be scheduled.
pub trait ManagedJob: Send + Sync + 'static {
    /// Extract the job's descriptor, if it carries one.
    fn descriptor(&self) -> Option<JobDescriptor>;

    /// The capability variant this object implements.
    fn variant(&self) -> Option<JobVariant>;

    /// Implementation identity handed to the scheduler.
    fn implementation(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Supplies every job-capable object known to the host.
///
/// Discovery order matters: when two objects declare the same name the one
/// listed first is registered.
pub trait JobProvider: Send + Sync {
    fn jobs(&self) -> Vec<Arc<dyn ManagedJob>>;
}

impl JobProvider for Vec<Arc<dyn ManagedJob>> {
    fn jobs(&self) -> Vec<Arc<dyn ManagedJob>> {
        self.clone()
    }
}

/// A registered job: its descriptor paired with the object implementing it.
#[derive(Clone)]
pub struct JobEntry {
    descriptor: JobDescriptor,
    job: Arc<dyn ManagedJob>,
}

impl JobEntry {
    pub fn new(descriptor: JobDescriptor, job: Arc<dyn ManagedJob>) -> Self {
        Self { descriptor, job }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn descriptor(&self) -> &JobDescriptor {
        &self.descriptor
    }

    pub fn job(&self) -> Arc<dyn ManagedJob> {
        Arc::clone(&self.job)
    }

    pub fn variant(&self) -> Option<JobVariant> {
        self.job.variant()
    }

    pub fn implementation(&self) -> &'static str {
        self.job.implementation()
    }
}

impl fmt::Debug for JobEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobEntry")
            .field("descriptor", &self.descriptor)
            .field("variant", &self.job.variant())
            .field("implementation", &self.job.implementation())
            .finish()
    }
}
