use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use tracing::{debug, info};

use crate::registry::JobRegistry;

/// Job names currently scheduled for execution on this node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSet(BTreeSet<String>);

impl ActiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> BTreeSet<String> {
        self.0
    }
}

impl From<BTreeSet<String>> for ActiveSet {
    fn from(names: BTreeSet<String>) -> Self {
        Self(names)
    }
}

impl FromIterator<String> for ActiveSet {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a str> for ActiveSet {
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        Self(iter.into_iter().map(str::to_string).collect())
    }
}

impl fmt::Display for ActiveSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, name) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}")?;
        }
        write!(f, "}}")
    }
}

/// Compute the node's execution set.
///
/// With `execute_all` every registered job is selected and the candidates are
/// ignored. Otherwise candidates missing from the registry are dropped.
pub fn resolve_execution_set(
    registry: &JobRegistry,
    candidates: &BTreeSet<String>,
    execute_all: bool,
) -> ActiveSet {
    if execute_all {
        let all = ActiveSet(registry.key_set());
        info!(jobs = %all, "executing every registered job on this node");
        return all;
    }

    let mut selected = BTreeSet::new();
    for name in candidates {
        if registry.contains(name) {
            selected.insert(name.clone());
        } else {
            debug!(job = %name, "configured job is not registered; dropping");
        }
    }

    let selected = ActiveSet(selected);
    info!(jobs = %selected, "resolved node execution set");
    selected
}
