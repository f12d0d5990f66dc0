//! Persisted configuration
//!
//! What the agent service reports back for an installed agent. It speaks the
//! operator sandbox vocabulary and uses plain lists where the canonical record
//! uses absent markers, so it must be run through [`inverse_normalize`] before
//! it can be compared with a freshly synthesized record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::canonical::config::{AgentPayload, CanonicalConfig, ScheduledJob};
use crate::canonical::sandbox::SandboxMode;
use crate::canonical::synthesize::{
    agent_payload, emoji_or_default, idle_timeout, non_empty, tool_lists,
};
use crate::utils::{drop_blank, non_blank};
use crate::wizard::markdown::{self, DEFAULT_EMOJI, IdentityField};
use crate::wizard::state::{DEFAULT_GATEWAY_PORT, DEFAULT_IDLE_TIMEOUT_MS, Documents};
use crate::wizard::{AgentTypeId, StepId, SubAgentConfig, ToolsMode, WizardMode, WizardState};

const DEFAULT_HEARTBEAT: &str = "1h";
const DEFAULT_TOOLS_MODE: &str = "allowlist";

fn default_gateway_port() -> u16 {
    DEFAULT_GATEWAY_PORT
}

/// A roster entry as stored by the agent service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedAgent {
    pub id: String,
    pub name: String,
    pub model: String,
    pub fallback_models: Vec<String>,
    pub skills: Vec<String>,
    pub allowed_tools: Vec<String>,
    pub vibe: String,
    pub emoji: String,
    pub identity_md: String,
    pub soul_md: String,
    pub user_md: String,
    pub tools_md: String,
    pub agents_md: String,
    pub cron_jobs: Vec<ScheduledJob>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedConfig {
    pub provider: String,
    pub api_key: String,
    pub auth_method: String,
    pub model: String,

    pub user_name: String,
    pub agent_name: String,
    pub agent_emoji: String,
    pub agent_vibe: String,
    pub agent_type: Option<String>,

    pub telegram_token: String,
    #[serde(default = "default_gateway_port")]
    pub gateway_port: u16,
    pub gateway_bind: String,
    pub gateway_auth_mode: String,
    pub tailscale_mode: String,
    pub node_manager: String,
    pub skills: Vec<String>,
    pub service_keys: BTreeMap<String, String>,

    /// Operator vocabulary: `full`, `partial` or `none`
    pub sandbox_mode: Option<String>,
    pub tools_mode: Option<String>,
    pub allowed_tools: Vec<String>,
    pub denied_tools: Vec<String>,
    pub fallback_models: Vec<String>,
    pub heartbeat_mode: Option<String>,
    pub idle_timeout_ms: Option<u64>,

    pub identity_md: Option<String>,
    pub user_md: Option<String>,
    pub soul_md: Option<String>,
    pub tools_md: Option<String>,
    pub agents_md: Option<String>,
    pub heartbeat_md: Option<String>,
    pub memory_md: Option<String>,
    pub memory_enabled: bool,

    pub enable_multi_agent: bool,
    pub agent_configs: Vec<PersistedAgent>,
    pub cron_jobs: Vec<ScheduledJob>,

    pub is_paired: bool,
}

impl PersistedConfig {
    /// What the agent service would report after applying `config`
    pub fn from_canonical(config: &CanonicalConfig) -> Self {
        Self {
            provider: config.provider.clone(),
            api_key: config.api_key.clone(),
            auth_method: config.auth_method.clone(),
            model: config.model.clone(),
            user_name: config.user_name.clone(),
            agent_name: config.agent_name.clone(),
            agent_emoji: markdown::identity_field(&config.identity_md, IdentityField::Emoji),
            agent_vibe: config.agent_vibe.clone(),
            agent_type: Some(config.agent_type.clone()),
            telegram_token: config.telegram_token.clone(),
            gateway_port: config.gateway_port,
            gateway_bind: config.gateway_bind.clone(),
            gateway_auth_mode: config.gateway_auth_mode.clone(),
            tailscale_mode: config.tailscale_mode.clone(),
            node_manager: config.node_manager.clone(),
            skills: config.skills.clone(),
            service_keys: config.service_keys.clone(),
            sandbox_mode: config
                .sandbox_mode
                .as_deref()
                .map(|policy| SandboxMode::from_policy(policy).as_str().to_string()),
            tools_mode: config.tools_mode.clone(),
            allowed_tools: config.allowed_tools.clone().unwrap_or_default(),
            denied_tools: config.denied_tools.clone().unwrap_or_default(),
            fallback_models: config.fallback_models.clone().unwrap_or_default(),
            heartbeat_mode: config.heartbeat_mode.clone(),
            idle_timeout_ms: config.idle_timeout_ms,
            identity_md: Some(config.identity_md.clone()),
            user_md: config.user_md.clone(),
            soul_md: config.soul_md.clone(),
            tools_md: config.tools_md.clone(),
            agents_md: config.agents_md.clone(),
            heartbeat_md: config.heartbeat_md.clone(),
            memory_md: config.memory_md.clone(),
            memory_enabled: config.memory_enabled,
            enable_multi_agent: config.agents.is_some(),
            agent_configs: config
                .agents
                .iter()
                .flatten()
                .map(PersistedAgent::from_payload)
                .collect(),
            cron_jobs: config.cron_jobs.clone().unwrap_or_default(),
            is_paired: config.preserve_state,
        }
    }

    /// Main-agent emoji: the stored value, else the identity document's, else the default
    fn main_emoji(&self) -> String {
        if let Some(emoji) = non_blank(&self.agent_emoji) {
            return emoji;
        }
        let from_identity = self
            .identity_md
            .as_deref()
            .map(|doc| markdown::identity_field(doc, IdentityField::Emoji))
            .unwrap_or_default();
        non_blank(&from_identity).unwrap_or_else(|| DEFAULT_EMOJI.to_string())
    }

    fn sandbox(&self) -> SandboxMode {
        SandboxMode::parse(self.sandbox_mode.as_deref().unwrap_or_default())
    }

    fn tools(&self) -> ToolsMode {
        ToolsMode::from(self.tools_mode.as_deref().unwrap_or(DEFAULT_TOOLS_MODE))
    }

    fn heartbeat(&self) -> String {
        self.heartbeat_mode
            .clone()
            .unwrap_or_else(|| DEFAULT_HEARTBEAT.to_string())
    }

    fn idle_timeout(&self) -> u64 {
        self.idle_timeout_ms.unwrap_or(DEFAULT_IDLE_TIMEOUT_MS)
    }

    fn agent_type_id(&self) -> AgentTypeId {
        AgentTypeId::parse(self.agent_type.as_deref().unwrap_or_default())
    }
}

impl PersistedAgent {
    fn from_payload(payload: &AgentPayload) -> Self {
        Self {
            id: payload.id.clone(),
            name: payload.name.clone(),
            model: payload.model.clone(),
            fallback_models: payload.fallback_models.clone().unwrap_or_default(),
            skills: payload.skills.clone().unwrap_or_default(),
            allowed_tools: payload.allowed_tools.clone().unwrap_or_default(),
            vibe: payload.vibe.clone(),
            emoji: markdown::identity_field(&payload.identity_md, IdentityField::Emoji),
            identity_md: payload.identity_md.clone(),
            soul_md: payload.soul_md.clone(),
            user_md: payload.user_md.clone().unwrap_or_default(),
            tools_md: payload.tools_md.clone().unwrap_or_default(),
            agents_md: payload.agents_md.clone().unwrap_or_default(),
            cron_jobs: payload.cron_jobs.clone().unwrap_or_default(),
        }
    }

    fn to_sub_agent(&self) -> SubAgentConfig {
        let emoji = non_blank(&self.emoji)
            .or_else(|| non_blank(&markdown::identity_field(&self.identity_md, IdentityField::Emoji)))
            .unwrap_or_else(|| DEFAULT_EMOJI.to_string());
        SubAgentConfig {
            id: self.id.clone(),
            name: self.name.clone(),
            model: self.model.clone(),
            fallback_models: self.fallback_models.clone(),
            skills: self.skills.clone(),
            vibe: self.vibe.clone(),
            emoji,
            identity_md: self.identity_md.clone(),
            user_md: self.user_md.clone(),
            soul_md: self.soul_md.clone(),
            tools_md: self.tools_md.clone(),
            agents_md: self.agents_md.clone(),
            allowed_tools: self.allowed_tools.clone(),
            cron_jobs: self.cron_jobs.clone(),
        }
    }
}

/// Rebuild the canonical record a wizard loaded from `persisted` would synthesize.
///
/// A loaded wizard runs in advanced mode, so every gated field is present.
pub fn inverse_normalize(persisted: &PersistedConfig, preserve_state: bool) -> CanonicalConfig {
    let tools_mode = persisted.tools();
    let (allowed_tools, denied_tools) =
        tool_lists(&tools_mode, &persisted.allowed_tools, &persisted.denied_tools);
    let heartbeat_mode = persisted.heartbeat();
    let emoji = persisted.main_emoji();
    let doc = |value: &Option<String>| value.as_deref().and_then(non_blank);

    CanonicalConfig {
        provider: persisted.provider.clone(),
        api_key: persisted.api_key.clone(),
        auth_method: persisted.auth_method.clone(),
        model: persisted.model.clone(),
        user_name: persisted.user_name.clone(),
        agent_name: persisted.agent_name.clone(),
        agent_vibe: persisted.agent_vibe.clone(),
        agent_type: persisted.agent_type_id().as_str().to_string(),
        telegram_token: persisted.telegram_token.clone(),
        gateway_port: persisted.gateway_port,
        gateway_bind: persisted.gateway_bind.clone(),
        gateway_auth_mode: persisted.gateway_auth_mode.clone(),
        tailscale_mode: persisted.tailscale_mode.clone(),
        node_manager: persisted.node_manager.clone(),
        skills: persisted.skills.clone(),
        service_keys: persisted.service_keys.clone(),
        sandbox_mode: Some(persisted.sandbox().policy().to_string()),
        tools_mode: Some(tools_mode.as_str().to_string()),
        allowed_tools,
        denied_tools,
        fallback_models: non_empty(drop_blank(&persisted.fallback_models)),
        idle_timeout_ms: idle_timeout(true, &heartbeat_mode, persisted.idle_timeout()),
        heartbeat_mode: Some(heartbeat_mode),
        identity_md: doc(&persisted.identity_md).unwrap_or_else(|| {
            markdown::identity_template(&persisted.agent_name, emoji_or_default(&emoji))
        }),
        user_md: doc(&persisted.user_md),
        soul_md: doc(&persisted.soul_md),
        tools_md: doc(&persisted.tools_md),
        agents_md: doc(&persisted.agents_md),
        heartbeat_md: doc(&persisted.heartbeat_md),
        memory_md: doc(&persisted.memory_md),
        memory_enabled: persisted.memory_enabled,
        agents: persisted.enable_multi_agent.then(|| {
            persisted
                .agent_configs
                .iter()
                .map(|agent| agent_payload(&agent.to_sub_agent()))
                .collect()
        }),
        cron_jobs: non_empty(persisted.cron_jobs.clone()),
        preserve_state,
    }
}

impl WizardState {
    /// Load an installed agent's configuration for editing.
    ///
    /// The loaded state is in advanced mode and positioned on the Agent step;
    /// target and credentials are left at their defaults for the caller to carry over.
    pub fn from_persisted(persisted: &PersistedConfig) -> Self {
        let fallbacks = drop_blank(&persisted.fallback_models);
        Self {
            step: StepId::Agent,
            mode: WizardMode::Advanced,
            user_name: persisted.user_name.clone(),
            agent_name: persisted.agent_name.clone(),
            agent_emoji: persisted.main_emoji(),
            agent_vibe: persisted.agent_vibe.clone(),
            agent_type: persisted.agent_type_id(),
            provider: persisted.provider.clone(),
            api_key: persisted.api_key.clone(),
            auth_method: persisted.auth_method.clone(),
            model: persisted.model.clone(),
            telegram_token: persisted.telegram_token.clone(),
            gateway_port: persisted.gateway_port,
            gateway_bind: persisted.gateway_bind.clone(),
            gateway_auth_mode: persisted.gateway_auth_mode.clone(),
            tailscale_mode: persisted.tailscale_mode.clone(),
            node_manager: persisted.node_manager.clone(),
            skills: persisted.skills.clone(),
            service_keys: persisted.service_keys.clone(),
            sandbox_mode: persisted.sandbox(),
            tools_mode: persisted.tools(),
            allowed_tools: persisted.allowed_tools.clone(),
            denied_tools: persisted.denied_tools.clone(),
            enable_fallbacks: !fallbacks.is_empty(),
            fallback_models: persisted.fallback_models.clone(),
            heartbeat_mode: persisted.heartbeat(),
            idle_timeout_ms: persisted.idle_timeout(),
            documents: Documents {
                identity: persisted.identity_md.clone().unwrap_or_default(),
                user: persisted.user_md.clone().unwrap_or_default(),
                soul: persisted.soul_md.clone().unwrap_or_default(),
                tools: persisted.tools_md.clone().unwrap_or_default(),
                agents: persisted.agents_md.clone().unwrap_or_default(),
                heartbeat: persisted.heartbeat_md.clone().unwrap_or_default(),
                memory: persisted.memory_md.clone().unwrap_or_default(),
            },
            memory_enabled: persisted.memory_enabled,
            multi_agent: persisted.enable_multi_agent,
            roster: persisted
                .agent_configs
                .iter()
                .map(PersistedAgent::to_sub_agent)
                .collect(),
            cron_jobs: persisted.cron_jobs.clone(),
            is_paired: persisted.is_paired,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::{reconcile, synthesize};
    use crate::wizard::BusinessFunctionId;

    fn persisted() -> PersistedConfig {
        PersistedConfig {
            provider: "anthropic".to_string(),
            api_key: "sk-live".to_string(),
            auth_method: "token".to_string(),
            model: "anthropic/claude-opus-4-6".to_string(),
            user_name: "Sam".to_string(),
            agent_name: "Nova".to_string(),
            agent_type: Some("custom".to_string()),
            gateway_bind: "loopback".to_string(),
            gateway_auth_mode: "token".to_string(),
            tailscale_mode: "off".to_string(),
            node_manager: "npm".to_string(),
            skills: vec!["github".to_string()],
            sandbox_mode: Some("partial".to_string()),
            tools_mode: Some("denylist".to_string()),
            allowed_tools: vec!["filesystem".to_string()],
            denied_tools: vec!["browser".to_string()],
            fallback_models: vec!["".to_string(), "openai/gpt-5".to_string()],
            heartbeat_mode: Some("idle".to_string()),
            idle_timeout_ms: Some(900_000),
            identity_md: Some(markdown::identity_template("Nova", "🐙")),
            user_md: Some("# USER.md\nSam".to_string()),
            soul_md: Some("   ".to_string()),
            memory_enabled: true,
            is_paired: true,
            ..PersistedConfig::default()
        }
    }

    #[test]
    fn test_loaded_state_reconciles_with_persisted() {
        let loaded = persisted();
        let state = WizardState::from_persisted(&loaded);
        assert!(state.is_advanced());
        assert_eq!(state.agent_emoji, "🐙");
        assert_eq!(state.sandbox_mode, SandboxMode::Partial);

        let fresh = synthesize(&state);
        let stored = inverse_normalize(&loaded, loaded.is_paired);
        assert_eq!(fresh, stored);
        assert!(reconcile(&fresh, &stored));
    }

    #[test]
    fn test_inverse_normalize_vocabulary() {
        let config = inverse_normalize(&persisted(), false);
        assert_eq!(config.sandbox_mode.as_deref(), Some("non-main"));
        assert_eq!(config.allowed_tools, None);
        assert_eq!(config.denied_tools, Some(vec!["browser".to_string()]));
        assert_eq!(config.fallback_models, Some(vec!["openai/gpt-5".to_string()]));
        assert_eq!(config.idle_timeout_ms, Some(900_000));
        assert_eq!(config.soul_md, None);
        assert!(!config.preserve_state);
    }

    #[test]
    fn test_missing_fields_take_wizard_defaults() {
        let sparse = PersistedConfig {
            agent_name: "Nova".to_string(),
            ..PersistedConfig::default()
        };
        let config = inverse_normalize(&sparse, false);
        assert_eq!(config.sandbox_mode.as_deref(), Some("off"));
        assert_eq!(config.tools_mode.as_deref(), Some("allowlist"));
        assert_eq!(config.allowed_tools, Some(Vec::new()));
        assert_eq!(config.heartbeat_mode.as_deref(), Some("1h"));
        assert_eq!(config.agent_type, "custom");
        assert_eq!(config.identity_md, markdown::identity_template("Nova", "🦞"));

        let state = WizardState::from_persisted(&sparse);
        assert_eq!(synthesize(&state), config);
    }

    #[test]
    fn test_applied_config_reads_back_unchanged() {
        let state = WizardState::new()
            .with_mode(WizardMode::Advanced)
            .with_agent_name("Nova")
            .toggle_business_function(BusinessFunctionId::SoftwareDevelopment)
            .expand_business_functions()
            .with_routing_document();
        let applied = synthesize(&state);

        let persisted = PersistedConfig::from_canonical(&applied);
        assert!(persisted.enable_multi_agent);
        assert_eq!(persisted.agent_configs.len(), 2);
        assert_eq!(persisted.sandbox_mode.as_deref(), Some("none"));

        let reloaded = WizardState::from_persisted(&persisted);
        assert!(reconcile(
            &synthesize(&reloaded),
            &inverse_normalize(&persisted, persisted.is_paired)
        ));
        assert_eq!(synthesize(&reloaded), applied);
    }

    #[test]
    fn test_persisted_json_defaults() {
        let persisted: PersistedConfig =
            serde_json::from_str(r#"{"agent_name":"Nova","sandbox_mode":"full"}"#).unwrap();
        assert_eq!(persisted.gateway_port, 18789);
        assert_eq!(persisted.sandbox(), SandboxMode::Full);
        assert!(persisted.agent_configs.is_empty());
    }
}
