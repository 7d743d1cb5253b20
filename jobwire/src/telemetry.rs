//! Tracing and telemetry instrumentation for jobwire.
//!
//! Span helpers for scheduler handoff and reconfiguration, plus record
//! functions that always emit a tracing event and additionally update
//! Prometheus metrics when the `metrics` feature is enabled.
//!
//! # Example
//!
//! ```ignore
//! use jobwire::telemetry::{instrument_handoff, record_handoff};
//!
//! instrument_handoff("billing", async {
//!     // ... start the scheduler
//! })
//! .await;
//! record_handoff("billing", "started");
//! ```

use std::future::Future;
use tracing::{info_span, Instrument, Span};

use crate::controller::ReconfigurationId;

/// Create a tracing span for handing a job to the scheduler backend.
#[must_use]
pub fn handoff_span(job: impl AsRef<str>) -> Span {
    info_span!("jobwire.handoff", job = %job.as_ref())
}

/// Create a tracing span covering one reconfiguration call.
///
/// # Arguments
/// * `id` - The reconfiguration identifier
/// * `target_len` - Number of jobs in the requested set
/// * `execute_all` - The requested execute-all flag
#[must_use]
pub fn reconfigure_span(id: ReconfigurationId, target_len: usize, execute_all: bool) -> Span {
    info_span!(
        "jobwire.reconfigure",
        reconfiguration_id = %id,
        target_len = target_len,
        execute_all = execute_all,
    )
}

/// Instrument a handoff future with a [`handoff_span`].
pub fn instrument_handoff<F>(job: impl AsRef<str>, future: F) -> impl Future<Output = F::Output>
where
    F: Future,
{
    future.instrument(handoff_span(job))
}

/// Record the outcome of a scheduler handoff.
///
/// # Arguments
/// * `job` - The job name
/// * `outcome` - `started`, `unsupported` or `failed`
pub fn record_handoff(job: impl AsRef<str>, outcome: impl AsRef<str>) {
    tracing::debug!(job = %job.as_ref(), outcome = %outcome.as_ref(), "handoff recorded");

    #[cfg(feature = "metrics")]
    crate::metrics::record_handoff(job.as_ref(), outcome.as_ref());
}

/// Record a coordination call and whether it succeeded.
pub fn record_coordination_call(
    job: impl AsRef<str>,
    operation: impl AsRef<str>,
    outcome: impl AsRef<str>,
) {
    tracing::debug!(
        job = %job.as_ref(),
        operation = %operation.as_ref(),
        outcome = %outcome.as_ref(),
        "coordination call"
    );

    #[cfg(feature = "metrics")]
    crate::metrics::record_coordination_call(operation.as_ref(), outcome.as_ref());
}

/// Record how a reconfiguration call ended.
///
/// # Arguments
/// * `outcome` - `applied`, `rejected`, `partial` or `failed`
pub fn record_reconfiguration(outcome: impl AsRef<str>) {
    tracing::debug!(outcome = %outcome.as_ref(), "reconfiguration recorded");

    #[cfg(feature = "metrics")]
    crate::metrics::record_reconfiguration(outcome.as_ref());
}

/// Update the active job count.
pub fn set_active_jobs(count: usize) {
    tracing::debug!(count = count, "active job count updated");

    #[cfg(feature = "metrics")]
    crate::metrics::set_active_jobs(count as f64);
}
