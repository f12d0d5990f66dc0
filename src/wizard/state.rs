//! Wizard state
//!
//! One immutable value holding everything the operator has entered. Changes
//! go through consuming `with_*`/`apply_*` methods that return the next state,
//! so navigator decisions can be tested on plain values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::backend::Prerequisites;
use crate::canonical::{SandboxMode, ScheduledJob};
use crate::wizard::markdown::{self, DEFAULT_EMOJI, IdentityField};
use crate::wizard::presets::{
    AgentTypeId, BusinessFunctionId, MAIN_AGENT_ID, SUB_AGENT_EMOJI,
};
use crate::wizard::step::StepId;

pub const DEFAULT_PROVIDER: &str = "anthropic";
pub const DEFAULT_MODEL: &str = "anthropic/claude-opus-4-6";
pub const DEFAULT_GATEWAY_PORT: u16 = 18789;
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 3_600_000;
pub const MAX_CUSTOM_TEAM: usize = 5;

/// Heartbeat mode under which the idle timeout applies
pub const HEARTBEAT_IDLE: &str = "idle";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WizardMode {
    #[default]
    Basic,
    Advanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetEnvironment {
    #[default]
    Local,
    Remote,
}

/// Tool policy mode; unknown values are kept verbatim
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ToolsMode {
    #[default]
    Allowlist,
    Denylist,
    Other(String),
}

impl ToolsMode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Allowlist => "allowlist",
            Self::Denylist => "denylist",
            Self::Other(mode) => mode,
        }
    }
}

impl From<String> for ToolsMode {
    fn from(value: String) -> Self {
        match value.as_str() {
            "allowlist" => Self::Allowlist,
            "denylist" => Self::Denylist,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for ToolsMode {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<ToolsMode> for String {
    fn from(mode: ToolsMode) -> Self {
        mode.as_str().to_string()
    }
}

/// SSH credentials for a remote install. The password never reaches disk.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct RemoteTarget {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub user: String,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    #[serde(default)]
    pub private_key_path: Option<String>,
}

impl RemoteTarget {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        let mut target = Self::default();
        target.host = host.into();
        target.user = user.into();
        target
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_private_key(mut self, path: impl Into<String>) -> Self {
        self.private_key_path = Some(path.into());
        self
    }

    /// Host and user are both present
    pub fn is_complete(&self) -> bool {
        !self.host.trim().is_empty() && !self.user.trim().is_empty()
    }
}

impl std::fmt::Debug for RemoteTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteTarget")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("private_key_path", &self.private_key_path)
            .finish()
    }
}

/// Main-agent workspace documents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Documents {
    pub identity: String,
    pub user: String,
    pub soul: String,
    pub tools: String,
    pub agents: String,
    pub heartbeat: String,
    pub memory: String,
}

/// One roster entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubAgentConfig {
    pub id: String,
    pub name: String,
    pub model: String,
    pub fallback_models: Vec<String>,
    pub skills: Vec<String>,
    pub vibe: String,
    pub emoji: String,
    pub identity_md: String,
    pub user_md: String,
    pub soul_md: String,
    pub tools_md: String,
    pub agents_md: String,
    pub allowed_tools: Vec<String>,
    pub cron_jobs: Vec<ScheduledJob>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardState {
    // Navigation
    pub step: StepId,
    pub agent_index: usize,
    pub mode: WizardMode,
    pub skip_basic_config: bool,

    // Target
    pub target: TargetEnvironment,
    pub remote: RemoteTarget,
    pub remote_verified: bool,
    pub system: Option<Prerequisites>,

    // Identity
    pub user_name: String,
    pub agent_name: String,
    pub agent_emoji: String,
    pub agent_vibe: String,
    pub agent_type: AgentTypeId,

    // Provider
    pub provider: String,
    pub api_key: String,
    pub auth_method: String,
    pub model: String,
    pub telegram_token: String,

    // Gateway and runtime
    pub gateway_port: u16,
    pub gateway_bind: String,
    pub gateway_auth_mode: String,
    pub tailscale_mode: String,
    pub node_manager: String,
    pub skills: Vec<String>,
    pub service_keys: BTreeMap<String, String>,

    // Security policy
    pub sandbox_mode: SandboxMode,
    pub tools_mode: ToolsMode,
    pub allowed_tools: Vec<String>,
    pub denied_tools: Vec<String>,

    pub enable_fallbacks: bool,
    pub fallback_models: Vec<String>,

    // Session policy
    pub heartbeat_mode: String,
    pub idle_timeout_ms: u64,

    pub documents: Documents,
    pub memory_enabled: bool,

    // Multi-agent
    pub business_functions: Vec<BusinessFunctionId>,
    pub custom_team_size: usize,
    pub multi_agent: bool,
    pub roster: Vec<SubAgentConfig>,
    pub cron_jobs: Vec<ScheduledJob>,

    pub is_paired: bool,
}

impl Default for WizardState {
    fn default() -> Self {
        Self {
            step: StepId::Welcome,
            agent_index: 0,
            mode: WizardMode::Basic,
            skip_basic_config: false,
            target: TargetEnvironment::Local,
            remote: RemoteTarget::default(),
            remote_verified: false,
            system: None,
            user_name: String::new(),
            agent_name: String::new(),
            agent_emoji: DEFAULT_EMOJI.to_string(),
            agent_vibe: String::new(),
            agent_type: AgentTypeId::Custom,
            provider: DEFAULT_PROVIDER.to_string(),
            api_key: String::new(),
            auth_method: "token".to_string(),
            model: DEFAULT_MODEL.to_string(),
            telegram_token: String::new(),
            gateway_port: DEFAULT_GATEWAY_PORT,
            gateway_bind: "loopback".to_string(),
            gateway_auth_mode: "token".to_string(),
            tailscale_mode: "off".to_string(),
            node_manager: "npm".to_string(),
            skills: crate::config::types::default_skills(),
            service_keys: BTreeMap::new(),
            sandbox_mode: SandboxMode::None,
            tools_mode: ToolsMode::Allowlist,
            allowed_tools: vec![
                "filesystem".to_string(),
                "terminal".to_string(),
                "browser".to_string(),
            ],
            denied_tools: Vec::new(),
            enable_fallbacks: false,
            fallback_models: Vec::new(),
            heartbeat_mode: "1h".to_string(),
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
            documents: Documents::default(),
            memory_enabled: false,
            business_functions: Vec::new(),
            custom_team_size: 1,
            multi_agent: false,
            roster: Vec::new(),
            cron_jobs: Vec::new(),
            is_paired: false,
        }
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl WizardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_preset(&self) -> bool {
        self.agent_type.is_preset()
    }

    pub fn is_advanced(&self) -> bool {
        self.mode == WizardMode::Advanced
    }

    pub fn is_remote(&self) -> bool {
        self.target == TargetEnvironment::Remote
    }

    /// Presets and advanced mode both carry the security, session and document fields
    pub fn uses_gated_fields(&self) -> bool {
        self.is_preset() || self.is_advanced()
    }

    /// Whether the per-agent loop has anything to show
    pub fn roster_loop_active(&self) -> bool {
        self.multi_agent && !self.roster.is_empty()
    }

    /// The remote target when installing remotely
    pub fn remote_target(&self) -> Option<&RemoteTarget> {
        self.is_remote().then_some(&self.remote)
    }

    pub fn agent_service_installed(&self) -> bool {
        self.system.is_some_and(|s| s.agent_service_installed)
    }

    pub fn with_step(mut self, step: StepId) -> Self {
        self.step = step;
        self
    }

    pub fn with_mode(mut self, mode: WizardMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_target(mut self, target: TargetEnvironment) -> Self {
        self.target = target;
        self.remote_verified = false;
        self
    }

    pub fn with_remote(mut self, remote: RemoteTarget) -> Self {
        self.remote = remote;
        self.remote_verified = false;
        self
    }

    pub fn with_remote_verified(mut self, verified: bool) -> Self {
        self.remote_verified = verified;
        self
    }

    pub fn with_system(mut self, system: Prerequisites) -> Self {
        self.system = Some(system);
        self
    }

    pub fn with_paired(mut self, paired: bool) -> Self {
        self.is_paired = paired;
        self
    }

    /// Shortcut from the channels step into the full advanced flow
    pub fn advanced_transition(mut self) -> Self {
        self.mode = WizardMode::Advanced;
        self.skip_basic_config = true;
        self
    }

    /// Rename the main agent, keeping preset documents in sync
    pub fn with_agent_name(mut self, name: &str) -> Self {
        self.agent_name = name.to_string();
        if !self.documents.identity.is_empty() {
            self.documents.identity =
                markdown::update_identity_field(&self.documents.identity, IdentityField::Name, name);
        }
        if !self.documents.soul.is_empty() {
            self.documents.soul = markdown::update_soul_mission(&self.documents.soul, name);
        }
        self
    }

    /// Select an agent type; presets overwrite provider, policy and documents
    pub fn apply_agent_type(mut self, agent_type: AgentTypeId) -> Self {
        self.agent_type = agent_type;
        let Some(preset) = agent_type.preset() else {
            return self;
        };

        self.provider = preset.provider.to_string();
        self.model = preset.model.to_string();
        self.fallback_models = owned(preset.fallback_models);
        self.enable_fallbacks = preset.enable_fallbacks;
        self.skills = owned(preset.skills);
        self.sandbox_mode = preset.sandbox_mode;
        self.tools_mode = ToolsMode::from(preset.tools_mode);
        self.allowed_tools = owned(preset.allowed_tools);
        self.heartbeat_mode = preset.heartbeat_mode.to_string();
        self.idle_timeout_ms = preset.idle_timeout_ms;

        let mut identity = preset.identity_md.to_string();
        let mut soul = preset.soul_md.to_string();
        if !self.agent_name.is_empty() {
            identity = markdown::update_identity_field(&identity, IdentityField::Name, &self.agent_name);
            soul = markdown::update_soul_mission(&soul, &self.agent_name);
        }
        if !self.agent_emoji.is_empty() {
            identity =
                markdown::update_identity_field(&identity, IdentityField::Emoji, &self.agent_emoji);
        }
        self.documents.identity = identity;
        self.documents.soul = soul;
        self.documents.tools = preset.tools_md.to_string();
        self.documents.agents = preset.agents_md.to_string();
        self.documents.heartbeat = preset.heartbeat_md.to_string();
        self.documents.memory = preset.memory_md.to_string();
        self.memory_enabled = preset.memory_enabled;
        self
    }

    pub fn toggle_skill(mut self, skill: &str) -> Self {
        if let Some(pos) = self.skills.iter().position(|s| s == skill) {
            self.skills.remove(pos);
        } else {
            self.skills.push(skill.to_string());
        }
        self
    }

    pub fn toggle_business_function(mut self, function: BusinessFunctionId) -> Self {
        if let Some(pos) = self.business_functions.iter().position(|f| *f == function) {
            self.business_functions.remove(pos);
        } else {
            self.business_functions.push(function);
        }
        self
    }

    /// Requested custom team size, clamped to 1..=5
    pub fn with_custom_team_size(mut self, size: usize) -> Self {
        self.custom_team_size = size.clamp(1, MAX_CUSTOM_TEAM);
        self
    }

    /// Expand the selected business functions into roster entries and jobs.
    ///
    /// Entries whose id is already in the roster, and jobs already scheduled,
    /// are not added twice, so leaving and re-entering the step is harmless.
    pub fn expand_business_functions(mut self) -> Self {
        let mut added_agents = false;

        for function in self.business_functions.clone() {
            let Some(preset) = function.preset() else {
                continue;
            };

            for sub in preset.sub_agents {
                if self.roster.iter().any(|agent| agent.id == sub.id) {
                    continue;
                }
                self.roster.push(SubAgentConfig {
                    id: sub.id.to_string(),
                    name: sub.name.to_string(),
                    model: sub.model.to_string(),
                    skills: owned(sub.skills),
                    emoji: SUB_AGENT_EMOJI.to_string(),
                    identity_md: sub.identity_md.to_string(),
                    soul_md: sub.soul_md.to_string(),
                    tools_md: sub.tools_md.to_string(),
                    agents_md: sub.agents_md.to_string(),
                    ..SubAgentConfig::default()
                });
                added_agents = true;
            }

            for job in preset.cron_jobs {
                let job = ScheduledJob {
                    name: job.name.to_string(),
                    schedule: job.schedule.to_string(),
                    command: job.command.to_string(),
                    agent_id: Some(MAIN_AGENT_ID.to_string()),
                };
                if !self.cron_jobs.contains(&job) {
                    self.cron_jobs.push(job);
                }
            }
        }

        if added_agents {
            self.multi_agent = true;
        }

        if self.business_functions.contains(&BusinessFunctionId::CustomTeam) {
            self.multi_agent = true;
            let target = self.custom_team_size.clamp(1, MAX_CUSTOM_TEAM);
            for i in self.roster.len()..target {
                self.roster.push(SubAgentConfig {
                    id: format!("agent-{}", i + 1),
                    name: format!("Agent {}", i + 1),
                    model: self.model.clone(),
                    emoji: self.agent_emoji.clone(),
                    ..SubAgentConfig::default()
                });
            }
        }

        self
    }

    /// Drop a roster entry, keeping the loop cursor on a valid entry
    pub fn remove_agent(mut self, index: usize) -> Self {
        if index < self.roster.len() {
            let removed = self.roster.remove(index);
            self.cron_jobs
                .retain(|job| job.agent_id.as_deref() != Some(removed.id.as_str()));
        }
        if self.agent_index >= self.roster.len() {
            self.agent_index = self.roster.len().saturating_sub(1);
        }
        self
    }

    pub fn with_agent(mut self, index: usize, agent: SubAgentConfig) -> Self {
        if let Some(slot) = self.roster.get_mut(index) {
            *slot = agent;
        }
        self
    }

    /// Rebuild the main agent's routing document from the roster
    pub fn with_routing_document(mut self) -> Self {
        self.documents.agents = routing_document(&self.roster);
        self
    }
}

/// Routing document listing every roster agent and its skills
pub fn routing_document(roster: &[SubAgentConfig]) -> String {
    let lines: Vec<String> = roster
        .iter()
        .map(|agent| {
            let skills = if agent.skills.is_empty() {
                "general".to_string()
            } else {
                agent.skills.join(", ")
            };
            format!("- **{}** ({}): {}", agent.name, agent.id, skills)
        })
        .collect();
    format!(
        "# AGENTS.md - Agent Routing\n\n## Available Sub-Agents\n{}\n",
        lines.join("\n")
    )
}
