use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::ActivationError;
use crate::execution::ActiveSet;

/// Phase of the reconfiguration state machine.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ControllerState {
    /// No reconfiguration in progress.
    Idle = 0,
    /// Checking the requested names against the registry.
    Validating = 1,
    /// Issuing handoff and coordination calls.
    Applying = 2,
}

impl ControllerState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => ControllerState::Validating,
            2 => ControllerState::Applying,
            _ => ControllerState::Idle,
        }
    }
}

/// Identifies one reconfiguration call in logs and outcomes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ReconfigurationId(pub Uuid);

impl Default for ReconfigurationId {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconfigurationId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for ReconfigurationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of the startup activation pass.
#[derive(Debug)]
pub struct ActivationReport {
    /// Jobs active on this node after startup.
    pub active: ActiveSet,
    /// Jobs whose scheduler was created by this pass.
    pub started: Vec<String>,
    /// Jobs that were resolved for this node but could not be started.
    pub failures: Vec<ActivationError>,
}

impl ActivationReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// What a successful reconfiguration did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconfigureOutcome {
    pub id: ReconfigurationId,
    /// The committed active set.
    pub active: ActiveSet,
    pub execute_all: bool,
    /// Every job `enable` was called for.
    pub enabled: Vec<String>,
    /// Every job `disable` was called for.
    pub disabled: Vec<String>,
    /// Jobs whose scheduler was created by this call.
    pub started: Vec<String>,
    pub applied_at: DateTime<Utc>,
}
