//! Install and update runs

pub mod orchestrator;
pub mod phase;

pub use orchestrator::{InstallOrchestrator, InstallationResult, ProgressFn, RunStatus};
pub use phase::{Phase, PhaseOutcome, PhasePolicy, plan};
