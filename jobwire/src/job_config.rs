//! Conversion of job descriptors into scheduler-ready configuration.
//!
//! The configuration is layered the way the external scheduler expects it:
//!
//! - [`JobCoreConfig`] - schedule, sharding and pass-through parameters
//! - [`JobTypeConfig`] - the core configuration plus variant-specific fields
//! - [`LiteJobConfig`] - the type configuration plus registration flags and
//!   the sharding strategy

use serde::{Deserialize, Serialize};

use crate::error::ActivationError;
use crate::job::{JobDescriptor, JobEntry, JobVariant};

/// Schedule, sharding and parameter settings shared by every job variant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCoreConfig {
    pub job_name: String,
    pub cron: String,
    pub sharding_total_count: u32,
    pub description: String,
    pub failover: bool,
    pub misfire: bool,
    pub job_parameter: String,
    pub sharding_item_parameters: String,
}

impl From<&JobDescriptor> for JobCoreConfig {
    fn from(descriptor: &JobDescriptor) -> Self {
        Self {
            job_name: descriptor.name.clone(),
            cron: descriptor.cron.clone(),
            sharding_total_count: descriptor.sharding_total_count.get(),
            description: descriptor.description.clone(),
            failover: descriptor.failover,
            misfire: descriptor.misfire,
            job_parameter: descriptor.job_parameter.clone(),
            sharding_item_parameters: descriptor.sharding_item_parameters.clone(),
        }
    }
}

/// Variant-specific configuration wrapping the core configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "job_type", rename_all = "snake_case")]
pub enum JobTypeConfig {
    Simple {
        core: JobCoreConfig,
        job_class: String,
    },
    Dataflow {
        core: JobCoreConfig,
        job_class: String,
        streaming_process: bool,
    },
    Script {
        core: JobCoreConfig,
    },
}

impl JobTypeConfig {
    pub fn core(&self) -> &JobCoreConfig {
        match self {
            JobTypeConfig::Simple { core, .. }
            | JobTypeConfig::Dataflow { core, .. }
            | JobTypeConfig::Script { core } => core,
        }
    }

    pub fn variant(&self) -> JobVariant {
        match self {
            JobTypeConfig::Simple { .. } => JobVariant::Simple,
            JobTypeConfig::Dataflow { .. } => JobVariant::Dataflow,
            JobTypeConfig::Script { .. } => JobVariant::Script,
        }
    }
}

/// How the scheduler spreads shards across worker nodes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShardingStrategy {
    /// Even allocation; remainders go to the lowest-ordered workers.
    #[default]
    AverageAllocation,
}

/// Top-level configuration handed to the scheduler backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiteJobConfig {
    pub type_config: JobTypeConfig,
    pub disabled: bool,
    pub overwrite: bool,
    pub sharding_strategy: ShardingStrategy,
}

impl LiteJobConfig {
    pub fn job_name(&self) -> &str {
        &self.type_config.core().job_name
    }

    pub fn core(&self) -> &JobCoreConfig {
        self.type_config.core()
    }

    /// Serialize for storage in the coordination service.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Wrap the core configuration in the shape required by `variant`.
pub fn build_type_config(
    descriptor: &JobDescriptor,
    variant: Option<JobVariant>,
    implementation: &'static str,
) -> Result<JobTypeConfig, ActivationError> {
    let core = JobCoreConfig::from(descriptor);
    match variant {
        Some(JobVariant::Simple) => Ok(JobTypeConfig::Simple {
            core,
            job_class: implementation.to_string(),
        }),
        Some(JobVariant::Dataflow) => Ok(JobTypeConfig::Dataflow {
            core,
            job_class: implementation.to_string(),
            streaming_process: descriptor.streaming_process,
        }),
        Some(JobVariant::Script) => Ok(JobTypeConfig::Script { core }),
        None => Err(ActivationError::UnsupportedJobVariant {
            job: descriptor.name.clone(),
            implementation,
        }),
    }
}

/// Build the full scheduler configuration for a registered job.
pub fn build_job_config(entry: &JobEntry) -> Result<LiteJobConfig, ActivationError> {
    let descriptor = entry.descriptor();
    let type_config = build_type_config(descriptor, entry.variant(), entry.implementation())?;

    Ok(LiteJobConfig {
        type_config,
        disabled: descriptor.disabled,
        overwrite: descriptor.overwrite,
        sharding_strategy: ShardingStrategy::AverageAllocation,
    })
}
