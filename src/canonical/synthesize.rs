//! Wizard state to canonical configuration

use crate::canonical::config::{AgentPayload, CanonicalConfig, ScheduledJob};
use crate::utils::{drop_blank, non_blank};
use crate::wizard::markdown::{self, DEFAULT_EMOJI};
use crate::wizard::{HEARTBEAT_IDLE, SubAgentConfig, ToolsMode, WizardState};

/// Map wizard state to the canonical record.
///
/// Pure and deterministic. `preserve_state` comes from `state.is_paired`, so
/// callers refresh that flag from a live pairing check before submitting.
pub fn synthesize(state: &WizardState) -> CanonicalConfig {
    let gated = state.uses_gated_fields();
    let gated_doc = |doc: &str| if gated { non_blank(doc) } else { None };

    let (allowed_tools, denied_tools) = if gated {
        tool_lists(&state.tools_mode, &state.allowed_tools, &state.denied_tools)
    } else {
        (None, None)
    };

    let fallback_models = if gated && state.enable_fallbacks {
        non_empty(drop_blank(&state.fallback_models))
    } else {
        None
    };

    let identity_md = gated_doc(&state.documents.identity)
        .unwrap_or_else(|| markdown::identity_template(&state.agent_name, emoji_or_default(&state.agent_emoji)));

    CanonicalConfig {
        provider: state.provider.clone(),
        api_key: state.api_key.clone(),
        auth_method: state.auth_method.clone(),
        model: state.model.clone(),
        user_name: state.user_name.clone(),
        agent_name: state.agent_name.clone(),
        agent_vibe: state.agent_vibe.clone(),
        agent_type: state.agent_type.as_str().to_string(),
        telegram_token: state.telegram_token.clone(),
        gateway_port: state.gateway_port,
        gateway_bind: state.gateway_bind.clone(),
        gateway_auth_mode: state.gateway_auth_mode.clone(),
        tailscale_mode: state.tailscale_mode.clone(),
        node_manager: state.node_manager.clone(),
        skills: state.skills.clone(),
        service_keys: state.service_keys.clone(),
        sandbox_mode: gated.then(|| state.sandbox_mode.policy().to_string()),
        tools_mode: gated.then(|| state.tools_mode.as_str().to_string()),
        allowed_tools,
        denied_tools,
        fallback_models,
        heartbeat_mode: gated.then(|| state.heartbeat_mode.clone()),
        idle_timeout_ms: idle_timeout(gated, &state.heartbeat_mode, state.idle_timeout_ms),
        identity_md,
        user_md: gated_doc(&state.documents.user),
        soul_md: gated_doc(&state.documents.soul),
        tools_md: gated_doc(&state.documents.tools),
        agents_md: gated_doc(&state.documents.agents),
        heartbeat_md: gated_doc(&state.documents.heartbeat),
        memory_md: gated_doc(&state.documents.memory),
        memory_enabled: gated && state.memory_enabled,
        agents: state
            .multi_agent
            .then(|| state.roster.iter().map(agent_payload).collect()),
        cron_jobs: non_empty(state.cron_jobs.clone()),
        preserve_state: state.is_paired,
    }
}

/// Allow/deny lists for the active tool mode; only the matching list is kept
pub(crate) fn tool_lists(
    mode: &ToolsMode,
    allowed: &[String],
    denied: &[String],
) -> (Option<Vec<String>>, Option<Vec<String>>) {
    match mode {
        ToolsMode::Allowlist => (Some(allowed.to_vec()), None),
        ToolsMode::Denylist => (None, Some(denied.to_vec())),
        ToolsMode::Other(_) => (None, None),
    }
}

pub(crate) fn idle_timeout(gated: bool, heartbeat_mode: &str, idle_timeout_ms: u64) -> Option<u64> {
    (gated && heartbeat_mode == HEARTBEAT_IDLE).then_some(idle_timeout_ms)
}

pub(crate) fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() { None } else { Some(items) }
}

pub(crate) fn emoji_or_default(emoji: &str) -> &str {
    if emoji.trim().is_empty() { DEFAULT_EMOJI } else { emoji }
}

/// Roster entry as sent to the backend
pub(crate) fn agent_payload(agent: &SubAgentConfig) -> AgentPayload {
    let emoji = emoji_or_default(&agent.emoji);
    AgentPayload {
        id: agent.id.clone(),
        name: agent.name.clone(),
        model: agent.model.clone(),
        fallback_models: non_empty(drop_blank(&agent.fallback_models)),
        skills: non_empty(agent.skills.clone()),
        allowed_tools: non_empty(agent.allowed_tools.clone()),
        vibe: agent.vibe.clone(),
        identity_md: non_blank(&agent.identity_md)
            .unwrap_or_else(|| markdown::identity_template(&agent.name, emoji)),
        soul_md: non_blank(&agent.soul_md)
            .unwrap_or_else(|| markdown::soul_template(&agent.name, emoji)),
        user_md: non_blank(&agent.user_md),
        tools_md: non_blank(&agent.tools_md),
        agents_md: non_blank(&agent.agents_md),
        cron_jobs: non_empty(agent.cron_jobs.iter().map(|job| own_job(job, &agent.id)).collect()),
    }
}

/// Jobs configured on a roster entry belong to that entry
fn own_job(job: &ScheduledJob, agent_id: &str) -> ScheduledJob {
    ScheduledJob {
        agent_id: Some(agent_id.to_string()),
        ..job.clone()
    }
}
