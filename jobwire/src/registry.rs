use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, info};

use crate::job::{JobEntry, JobProvider, ManagedJob};

/// Name-keyed registry of every job discovered in the process.
///
/// Built once at startup and read-only afterwards. When two objects declare
/// the same name the first one wins and the later one is dropped.
#[derive(Clone, Debug, Default)]
pub struct JobRegistry {
    entries: BTreeMap<String, JobEntry>,
}

impl JobRegistry {
    /// Build the registry from job objects in discovery order.
    ///
    /// Objects without a descriptor are skipped silently.
    pub fn from_jobs<I>(jobs: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn ManagedJob>>,
    {
        info!("building job registry");
        let mut entries = BTreeMap::new();

        for job in jobs {
            let Some(descriptor) = job.descriptor() else {
                debug!(
                    implementation = job.implementation(),
                    "object carries no job descriptor; skipping"
                );
                continue;
            };

            if entries.contains_key(&descriptor.name) {
                debug!(
                    job = %descriptor.name,
                    implementation = job.implementation(),
                    "job name already registered; keeping first registration"
                );
                continue;
            }

            let name = descriptor.name.clone();
            entries.insert(name, JobEntry::new(descriptor, job));
        }

        let registry = Self { entries };
        info!(jobs = ?registry.key_set(), "job registry built");
        registry
    }

    /// Build the registry from everything a provider supplies.
    pub fn from_provider(provider: &dyn JobProvider) -> Self {
        Self::from_jobs(provider.jobs())
    }

    pub fn get(&self, name: &str) -> Option<&JobEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered job names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn key_set(&self) -> BTreeSet<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &JobEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
