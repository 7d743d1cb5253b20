/// The activation controller and its reconfiguration entry point.
pub mod activation;
/// Builder wiring the registry, resolver and collaborators together.
pub mod builder;
/// State machine phases, identifiers and reports.
pub mod state;

pub use activation::ActivationController;
pub use builder::ActivationControllerBuilder;
pub use state::{ActivationReport, ControllerState, ReconfigurationId, ReconfigureOutcome};
