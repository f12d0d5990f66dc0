//! Setup wizard
//!
//! Step identifiers and their ordering table, the immutable wizard state, the
//! built-in presets and the navigator that decides where each action leads.

pub mod markdown;
pub mod navigator;
pub mod presets;
pub mod state;
pub mod step;

pub use navigator::{
    StepStatus, back, forward, is_visible, progress, resolve, step_status, visible_steps,
};
pub use presets::{AgentTypeId, BusinessFunctionId};
pub use state::{
    Documents, HEARTBEAT_IDLE, RemoteTarget, SubAgentConfig, TargetEnvironment, ToolsMode,
    WizardMode, WizardState, routing_document,
};
pub use step::{STEP_ORDER, STEP_ORDER_VERSION, StepId};
