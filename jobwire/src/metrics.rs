//! Prometheus metrics instrumentation for jobwire.
//!
//! All metrics are conditionally compiled behind the `metrics` feature flag.
//!
//! # Metrics
//!
//! ## Counters
//! - `jobwire_handoffs_total` - Scheduler handoffs by job and outcome
//! - `jobwire_coordination_calls_total` - Enable/disable calls by outcome
//! - `jobwire_reconfigurations_total` - Reconfiguration calls by outcome
//!
//! ## Gauges
//! - `jobwire_active_jobs` - Size of the node's active set
#![cfg(feature = "metrics")]

use prometheus::{CounterVec, Gauge, Opts, Registry};
use std::sync::LazyLock;

/// Registry holding every jobwire metric.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Counter for scheduler handoffs.
///
/// Labels:
/// - `job`: The job name
/// - `outcome`: `started`, `unsupported` or `failed`
pub static HANDOFFS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        "jobwire_handoffs_total",
        "Total number of scheduler handoffs",
    );
    CounterVec::new(opts, &["job", "outcome"])
        .expect("jobwire_handoffs_total metric creation failed")
});

/// Counter for coordination calls.
///
/// Labels:
/// - `operation`: `enable` or `disable`
/// - `outcome`: `ok` or `error`
pub static COORDINATION_CALLS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        "jobwire_coordination_calls_total",
        "Total number of coordination service calls",
    );
    CounterVec::new(opts, &["operation", "outcome"])
        .expect("jobwire_coordination_calls_total metric creation failed")
});

/// Counter for reconfiguration calls.
///
/// Labels:
/// - `outcome`: `applied`, `rejected`, `partial` or `failed`
pub static RECONFIGURATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        "jobwire_reconfigurations_total",
        "Total number of reconfiguration calls",
    );
    CounterVec::new(opts, &["outcome"])
        .expect("jobwire_reconfigurations_total metric creation failed")
});

/// Gauge for the number of jobs active on this node.
pub static ACTIVE_JOBS: LazyLock<Gauge> = LazyLock::new(|| {
    Gauge::new("jobwire_active_jobs", "Number of jobs active on this node")
        .expect("jobwire_active_jobs metric creation failed")
});

/// Register all metrics with [`REGISTRY`].
///
/// Calling this more than once is harmless.
pub fn init_metrics() -> anyhow::Result<()> {
    let registry = &*REGISTRY;

    for metric in [
        Box::new(HANDOFFS_TOTAL.clone()) as Box<dyn prometheus::core::Collector>,
        Box::new(COORDINATION_CALLS_TOTAL.clone()),
        Box::new(RECONFIGURATIONS_TOTAL.clone()),
        Box::new(ACTIVE_JOBS.clone()),
    ] {
        if let Err(e) = registry.register(metric) {
            if !matches!(e, prometheus::Error::AlreadyReg) {
                return Err(e.into());
            }
        }
    }

    Ok(())
}

pub fn record_handoff(job: &str, outcome: &str) {
    HANDOFFS_TOTAL.with_label_values(&[job, outcome]).inc();
}

pub fn record_coordination_call(operation: &str, outcome: &str) {
    COORDINATION_CALLS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
}

pub fn record_reconfiguration(outcome: &str) {
    RECONFIGURATIONS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn set_active_jobs(count: f64) {
    ACTIVE_JOBS.set(count);
}

/// Gather all registered metrics in Prometheus text format.
pub fn gather_metrics() -> anyhow::Result<String> {
    let encoder = prometheus::TextEncoder::new();
    let metric_families = REGISTRY.gather();
    encoder
        .encode_to_string(&metric_families)
        .map_err(Into::into)
}
