//! Canonical configuration
//!
//! Synthesis from wizard state, reconstruction from persisted configuration,
//! and structural reconciliation of the two.

pub mod config;
pub mod persisted;
pub mod sandbox;
pub mod synthesize;
pub mod value;

pub use config::{AgentPayload, CanonicalConfig, ScheduledJob};
pub use persisted::{PersistedAgent, PersistedConfig, inverse_normalize};
pub use sandbox::SandboxMode;
pub use synthesize::synthesize;
pub use value::{ConfigValue, changed_keys, reconcile};
