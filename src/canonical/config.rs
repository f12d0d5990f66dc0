//! Canonical configuration record
//!
//! The single backend-facing shape. Every gated field is either a value or an
//! explicit `None`, and `None` serializes as `null` rather than being skipped,
//! so two records always carry the same key set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A cron-style job run by the agent service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScheduledJob {
    pub name: String,
    pub schedule: String,
    pub command: String,
    /// Agent whose session runs the job
    #[serde(default, alias = "session")]
    pub agent_id: Option<String>,
}

/// One roster entry as sent to the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentPayload {
    pub id: String,
    pub name: String,
    pub model: String,
    pub fallback_models: Option<Vec<String>>,
    pub skills: Option<Vec<String>>,
    pub allowed_tools: Option<Vec<String>>,
    pub vibe: String,
    pub identity_md: String,
    pub soul_md: String,
    pub user_md: Option<String>,
    pub tools_md: Option<String>,
    pub agents_md: Option<String>,
    pub cron_jobs: Option<Vec<ScheduledJob>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalConfig {
    // Provider
    pub provider: String,
    pub api_key: String,
    pub auth_method: String,
    pub model: String,

    // Identity
    pub user_name: String,
    pub agent_name: String,
    pub agent_vibe: String,
    pub agent_type: String,

    // Gateway and runtime
    pub telegram_token: String,
    pub gateway_port: u16,
    pub gateway_bind: String,
    pub gateway_auth_mode: String,
    pub tailscale_mode: String,
    pub node_manager: String,
    pub skills: Vec<String>,
    pub service_keys: BTreeMap<String, String>,

    // Security policy
    pub sandbox_mode: Option<String>,
    pub tools_mode: Option<String>,
    pub allowed_tools: Option<Vec<String>>,
    pub denied_tools: Option<Vec<String>>,

    pub fallback_models: Option<Vec<String>>,

    // Session policy
    pub heartbeat_mode: Option<String>,
    pub idle_timeout_ms: Option<u64>,

    // Workspace documents
    pub identity_md: String,
    pub user_md: Option<String>,
    pub soul_md: Option<String>,
    pub tools_md: Option<String>,
    pub agents_md: Option<String>,
    pub heartbeat_md: Option<String>,
    pub memory_md: Option<String>,
    pub memory_enabled: bool,

    pub agents: Option<Vec<AgentPayload>>,
    pub cron_jobs: Option<Vec<ScheduledJob>>,

    /// Keep an existing paired session instead of resetting it
    pub preserve_state: bool,
}

impl CanonicalConfig {
    /// JSON form used for structural comparison and display
    pub fn to_value(&self) -> serde_json::Value {
        // Derived Serialize on plain data cannot fail
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
