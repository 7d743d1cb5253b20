use jobwire::*;
use std::sync::Arc;

fn every_minute(name: &str) -> JobDescriptor {
    JobDescriptor::new(name, "0 * * * * ?", 1)
}

/// Configurable job object for registry and controller tests.
#[derive(Clone, Debug)]
pub struct TestJob {
    descriptor: Option<JobDescriptor>,
    variant: Option<JobVariant>,
    implementation: &'static str,
}

impl TestJob {
    pub fn new(descriptor: JobDescriptor, variant: JobVariant) -> Self {
        Self {
            descriptor: Some(descriptor),
            variant: Some(variant),
            implementation: "jobwire_testkit::TestJob",
        }
    }

    /// A simple job running every minute on one shard.
    pub fn simple(name: &str) -> Self {
        Self::new(every_minute(name), JobVariant::Simple)
    }

    pub fn dataflow(name: &str, streaming_process: bool) -> Self {
        Self::new(
            every_minute(name).with_streaming_process(streaming_process),
            JobVariant::Dataflow,
        )
    }

    pub fn script(name: &str) -> Self {
        Self::new(every_minute(name), JobVariant::Script)
    }

    /// A registered job that implements no recognised variant.
    pub fn unsupported(name: &str) -> Self {
        Self {
            variant: None,
            ..Self::simple(name)
        }
    }

    /// An object without a descriptor; never registered.
    pub fn undeclared() -> Self {
        Self {
            descriptor: None,
            variant: Some(JobVariant::Simple),
            implementation: "jobwire_testkit::TestJob",
        }
    }

    pub fn with_cron(mut self, cron: &str) -> Self {
        if let Some(descriptor) = self.descriptor.as_mut() {
            descriptor.cron = cron.to_string();
        }
        self
    }

    pub fn with_implementation(mut self, implementation: &'static str) -> Self {
        self.implementation = implementation;
        self
    }

    pub fn shared(self) -> Arc<dyn ManagedJob> {
        Arc::new(self)
    }
}

impl ManagedJob for TestJob {
    fn descriptor(&self) -> Option<JobDescriptor> {
        self.descriptor.clone()
    }

    fn variant(&self) -> Option<JobVariant> {
        self.variant
    }

    fn implementation(&self) -> &'static str {
        self.implementation
    }
}

/// Provider returning a fixed list of job objects.
#[derive(Clone, Default)]
pub struct StaticJobProvider {
    jobs: Vec<Arc<dyn ManagedJob>>,
}

impl StaticJobProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider with one simple job per name.
    pub fn simple(names: &[&str]) -> Self {
        let mut provider = Self::new();
        for name in names {
            provider = provider.with(TestJob::simple(name));
        }
        provider
    }

    pub fn with(mut self, job: TestJob) -> Self {
        self.jobs.push(job.shared());
        self
    }
}

impl JobProvider for StaticJobProvider {
    fn jobs(&self) -> Vec<Arc<dyn ManagedJob>> {
        self.jobs.clone()
    }
}
