use async_trait::async_trait;
use std::fmt;

/// Enable/disable signalling against the distributed coordination service.
///
/// Both calls must be idempotent. Timeouts and connection failures are
/// reported as errors; the controller maps them to
/// [`ActivationError::CoordinationUnavailable`](crate::ActivationError::CoordinationUnavailable).
#[async_trait]
pub trait CoordinationClient: Send + Sync {
    /// Mark the job as enabled for every server in the cluster.
    async fn enable(&self, job_name: &str) -> anyhow::Result<()>;

    /// Mark the job as disabled for every server in the cluster.
    async fn disable(&self, job_name: &str) -> anyhow::Result<()>;
}

/// The coordination call being made.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum CoordinationOp {
    Enable,
    Disable,
}

impl CoordinationOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoordinationOp::Enable => "enable",
            CoordinationOp::Disable => "disable",
        }
    }
}

impl fmt::Display for CoordinationOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
