use anyhow::bail;
use async_trait::async_trait;
use jobwire::*;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// A coordination call as observed by [`RecordingCoordinationClient`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CoordinationCall {
    Enable(String),
    Disable(String),
}

/// Coordination client that records every successful call.
///
/// Calls for jobs marked with [`fail_for`](Self::fail_for) return an error
/// and are not recorded.
#[derive(Clone, Default)]
pub struct RecordingCoordinationClient {
    calls: Arc<Mutex<Vec<CoordinationCall>>>,
    unavailable: Arc<Mutex<HashSet<String>>>,
    delay: Arc<Mutex<Option<Duration>>>,
}

impl RecordingCoordinationClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<CoordinationCall> {
        self.calls.lock().clone()
    }

    pub fn enabled(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                CoordinationCall::Enable(name) => Some(name.clone()),
                CoordinationCall::Disable(_) => None,
            })
            .collect()
    }

    pub fn disabled(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                CoordinationCall::Disable(name) => Some(name.clone()),
                CoordinationCall::Enable(_) => None,
            })
            .collect()
    }

    pub fn assert_call_count_eq(&self, expected: usize) {
        assert_eq!(
            self.calls.lock().len(),
            expected,
            "Expected {} coordination calls, got {:?}",
            expected,
            self.calls.lock()
        );
    }

    /// Make every call for `job_name` fail until [`recover`](Self::recover).
    pub fn fail_for(&self, job_name: &str) {
        self.unavailable.lock().insert(job_name.to_string());
    }

    pub fn recover(&self, job_name: &str) {
        self.unavailable.lock().remove(job_name);
    }

    /// Sleep before answering each call.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    async fn record(&self, call: CoordinationCall, job_name: &str) -> anyhow::Result<()> {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.unavailable.lock().contains(job_name) {
            bail!("coordination session lost for {job_name}");
        }
        self.calls.lock().push(call);
        Ok(())
    }
}

#[async_trait]
impl CoordinationClient for RecordingCoordinationClient {
    async fn enable(&self, job_name: &str) -> anyhow::Result<()> {
        let call = CoordinationCall::Enable(job_name.to_string());
        self.record(call, job_name).await
    }

    async fn disable(&self, job_name: &str) -> anyhow::Result<()> {
        let call = CoordinationCall::Disable(job_name.to_string());
        self.record(call, job_name).await
    }
}

/// A successful scheduler start.
#[derive(Clone, Debug)]
pub struct StartRecord {
    pub job_name: String,
    pub implementation: &'static str,
    pub config: LiteJobConfig,
}

/// Scheduler backend that records every started job.
#[derive(Clone, Default)]
pub struct RecordingScheduler {
    starts: Arc<Mutex<Vec<StartRecord>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starts(&self) -> Vec<StartRecord> {
        self.starts.lock().clone()
    }

    pub fn started_names(&self) -> Vec<String> {
        self.starts
            .lock()
            .iter()
            .map(|record| record.job_name.clone())
            .collect()
    }

    pub fn start_count(&self, job_name: &str) -> usize {
        self.starts
            .lock()
            .iter()
            .filter(|record| record.job_name == job_name)
            .count()
    }

    /// Make starts for `job_name` fail until [`recover`](Self::recover).
    pub fn fail_for(&self, job_name: &str) {
        self.failing.lock().insert(job_name.to_string());
    }

    pub fn recover(&self, job_name: &str) {
        self.failing.lock().remove(job_name);
    }
}

#[async_trait]
impl SchedulerBackend for RecordingScheduler {
    async fn start(
        &self,
        job: Arc<dyn ManagedJob>,
        _coordination: Arc<dyn CoordinationClient>,
        config: LiteJobConfig,
    ) -> anyhow::Result<()> {
        let job_name = config.job_name().to_string();
        if self.failing.lock().contains(&job_name) {
            bail!("scheduler refused to initialize {job_name}");
        }
        self.starts.lock().push(StartRecord {
            job_name,
            implementation: job.implementation(),
            config,
        });
        Ok(())
    }
}
