//! Node activation example with logging collaborators.
//!
//! Registers a handful of jobs, activates the node's configured execution set
//! and then moves the node to a different set at runtime. The scheduler and
//! coordination service only log what they are asked to do.
//!
//! Run with `RUST_LOG=debug` to see the per-call coordination events.

use std::sync::Arc;

use async_trait::async_trait;
use jobwire::*;
use tracing_subscriber::EnvFilter;

const CONFIG: &str = r#"
[execution]
execute_list = "invoice-sweep, ledger-export"
execute_all = false

[coordination]
server_lists = "zk1:2181,zk2:2181"
namespace = "billing"
max_retries = 5
"#;

/// A job declared with a fixed descriptor.
struct DeclaredJob {
    descriptor: JobDescriptor,
    variant: JobVariant,
}

impl DeclaredJob {
    fn shared(descriptor: JobDescriptor, variant: JobVariant) -> Arc<dyn ManagedJob> {
        Arc::new(Self {
            descriptor,
            variant,
        })
    }
}

impl ManagedJob for DeclaredJob {
    fn descriptor(&self) -> Option<JobDescriptor> {
        Some(self.descriptor.clone())
    }

    fn variant(&self) -> Option<JobVariant> {
        Some(self.variant)
    }
}

struct LoggingScheduler;

#[async_trait]
impl SchedulerBackend for LoggingScheduler {
    async fn start(
        &self,
        _job: Arc<dyn ManagedJob>,
        _coordination: Arc<dyn CoordinationClient>,
        config: LiteJobConfig,
    ) -> anyhow::Result<()> {
        println!("[SCHEDULER] starting {}", config.to_json()?);
        Ok(())
    }
}

struct LoggingCoordination {
    namespace: String,
}

#[async_trait]
impl CoordinationClient for LoggingCoordination {
    async fn enable(&self, job_name: &str) -> anyhow::Result<()> {
        println!("[COORDINATION] /{}/{}/enabled", self.namespace, job_name);
        Ok(())
    }

    async fn disable(&self, job_name: &str) -> anyhow::Result<()> {
        println!("[COORDINATION] /{}/{}/disabled", self.namespace, job_name);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = JobwireConfig::from_toml_str(CONFIG)?;
    println!(
        "Coordination servers: {:?} (namespace {})",
        config.coordination.servers(),
        config.coordination.namespace
    );

    let jobs = vec![
        DeclaredJob::shared(
            JobDescriptor::new("invoice-sweep", "0 */5 * * * ?", 4)
                .with_description("Close out stale invoices")
                .with_sharding_item_parameters("0=eu,1=us,2=apac,3=latam"),
            JobVariant::Simple,
        ),
        DeclaredJob::shared(
            JobDescriptor::new("ledger-export", "0 0 2 * * ?", 1).with_failover(true),
            JobVariant::Dataflow,
        ),
        DeclaredJob::shared(
            JobDescriptor::new("usage-rollup", "0 0 * * * ?", 2).with_streaming_process(true),
            JobVariant::Dataflow,
        ),
    ];

    let controller = ActivationControllerBuilder::new(config.execution)
        .with_jobs(jobs)
        .with_scheduler(Arc::new(LoggingScheduler))
        .with_coordination(Arc::new(LoggingCoordination {
            namespace: config.coordination.namespace.clone(),
        }))
        .build()?;

    let report = controller.initialize().await;
    println!("Active after startup: {}", report.active);
    for failure in &report.failures {
        println!("  failed: {failure}");
    }

    let target = ["ledger-export", "usage-rollup"];
    let outcome = controller.reconfigure(target, false).await?;
    println!(
        "Reconfiguration {}: active {} (started {:?}, disabled {:?})",
        outcome.id, outcome.active, outcome.started, outcome.disabled
    );

    match controller.reconfigure(["payroll"], false).await {
        Err(err) => println!("Rejected: {err}"),
        Ok(outcome) => println!("Unexpectedly applied: {}", outcome.active),
    }

    println!("Started in this process: {:?}", controller.started_set().await);
    Ok(())
}
