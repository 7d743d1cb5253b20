//! jobwire - job registration and per-node activation for distributed schedulers.
//!
//! Discovers declaratively configured jobs in the running process, decides
//! which of them this node executes, converts each job's metadata into the
//! configuration an external distributed scheduler expects, and lets operators
//! reassign the node's active jobs at runtime without a restart.
//!
//! # Core Concepts
//!
//! - **Job**: a [`ManagedJob`] object exposing a [`JobDescriptor`] and the
//!   [`JobVariant`] it implements (simple, dataflow or script).
//!
//! - **Registry**: the [`JobRegistry`] maps job names to their entries. It is
//!   built once at startup and never changes afterwards.
//!
//! - **Execution set**: [`resolve_execution_set`] picks the node's jobs from
//!   the configured list or the execute-all override.
//!
//! - **Handoff**: [`SchedulerHandoff`] builds a [`LiteJobConfig`] and starts
//!   one scheduler instance per job through a [`SchedulerBackend`].
//!
//! - **Controller**: the [`ActivationController`] owns the active set and is
//!   the single entry point for runtime reconfiguration, signalling the
//!   [`CoordinationClient`] to enable and disable jobs.
//!
//! # Feature Flags
//!
//! - `metrics` - Prometheus metrics support
//!
//! # Example
//!
//! ```ignore
//! use jobwire::*;
//!
//! let config = JobwireConfig::from_path("jobwire.toml")?;
//! let controller = ActivationControllerBuilder::new(config.execution)
//!     .with_provider(&provider)
//!     .with_scheduler(backend)
//!     .with_coordination(coordination)
//!     .build()?;
//!
//! controller.initialize().await;
//! controller.reconfigure(["billing", "reports"], false).await?;
//! ```

/// Node execution and coordination-service configuration.
///
/// The `config` module defines [`ExecutionConfig`], [`CoordinationConfig`] and
/// the [`JobwireConfig`] document loaded from TOML.
pub mod config;

/// Activation controller, builder and reconfiguration state machine.
///
/// - [`ActivationController`] - owns the active set and started set
/// - [`ActivationControllerBuilder`] - wires registry, resolver and collaborators
/// - [`ControllerState`] - `Idle`, `Validating`, `Applying`
/// - [`ActivationReport`] and [`ReconfigureOutcome`] - results of startup and
///   reconfiguration
pub mod controller;

/// Coordination-service enable/disable signalling.
pub mod coordination;

/// Error types for activation and configuration.
pub mod error;

/// The node's active set and the execution set resolver.
pub mod execution;

/// Scheduler backend trait and the handoff that starts jobs on it.
pub mod handoff;

/// Job descriptors, variants and the job object traits.
///
/// - [`ManagedJob`] - a discovered job object
/// - [`JobProvider`] - supplies job objects in discovery order
/// - [`JobDescriptor`] - declarative scheduling metadata
/// - [`JobVariant`] - simple, dataflow or script
/// - [`JobEntry`] - a registered descriptor and object pair
pub mod job;

/// Descriptor to scheduler configuration conversion.
pub mod job_config;

#[cfg(feature = "metrics")]
/// Prometheus metrics for handoffs, coordination calls and reconfigurations.
pub mod metrics;

/// Name-keyed job registry.
pub mod registry;

/// Tracing spans and metric recording helpers.
pub mod telemetry;

pub use config::*;
pub use controller::*;
pub use coordination::*;
pub use error::*;
pub use execution::*;
pub use handoff::*;
pub use job::*;
pub use job_config::*;
pub use registry::*;
