//! Step navigation
//!
//! Each step's forward and back destination is decided by a function of the
//! current state rather than looked up in a table. Steps that would render
//! nothing for the current state are resolved to the next real step, so the
//! wizard can never rest on a dead end.

use crate::error::{DeckhandError, Result};
use crate::wizard::state::{WizardMode, WizardState};
use crate::wizard::step::{SKIP_BASIC_EXCLUDED, STEP_ORDER, StepId};

/// Progress indicator status for a visible step
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Completed,
    Active,
    Pending,
}

/// A step is shown unless it is statically hidden, advanced-only in basic
/// mode, or suppressed because basic configuration was skipped
pub fn is_visible(step: StepId, state: &WizardState) -> bool {
    let def = step.definition();
    !def.is_hidden(state.is_preset())
        && (!def.advanced_only || state.mode == WizardMode::Advanced)
        && !(state.skip_basic_config && SKIP_BASIC_EXCLUDED.contains(&step))
}

/// Steps shown in the progress list, in order
pub fn visible_steps(state: &WizardState) -> Vec<StepId> {
    STEP_ORDER
        .iter()
        .copied()
        .filter(|step| is_visible(*step, state))
        .collect()
}

pub fn step_status(step: StepId, current: StepId) -> StepStatus {
    match step.cmp(&current) {
        std::cmp::Ordering::Less => StepStatus::Completed,
        std::cmp::Ordering::Equal => StepStatus::Active,
        std::cmp::Ordering::Greater => StepStatus::Pending,
    }
}

pub fn progress(state: &WizardState) -> Vec<(StepId, StepStatus)> {
    visible_steps(state)
        .into_iter()
        .map(|step| (step, step_status(step, state.step)))
        .collect()
}

/// Where a pass-through step sends the operator, if anywhere
fn redirect(state: &WizardState) -> Option<StepId> {
    match state.step {
        StepId::Agents if !state.roster_loop_active() => Some(StepId::ExtraSettings),
        StepId::PresetConfig if !state.is_preset() => Some(StepId::Brain),
        StepId::Brain if state.is_preset() => Some(StepId::Channels),
        StepId::Models | StepId::Skills | StepId::AllowedTools if state.is_preset() => {
            Some(StepId::Business)
        }
        _ => None,
    }
}

/// Follow pass-through redirects until the state rests on a step that renders
pub fn resolve(mut state: WizardState) -> WizardState {
    // Every redirect moves strictly forward, so this settles within the table length
    for _ in 0..STEP_ORDER.len() {
        match redirect(&state) {
            Some(next) => {
                tracing::debug!("Redirecting pass-through step {:?} to {:?}", state.step, next);
                state = state.with_step(next);
            }
            None => break,
        }
    }
    if state.step == StepId::Agents && state.agent_index >= state.roster.len() {
        state.agent_index = state.roster.len().saturating_sub(1);
    }
    state
}

fn require(condition: bool, message: &str) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(DeckhandError::validation(message))
    }
}

fn filled(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Apply the forward action of the current step.
///
/// Missing operator input on the current step is a validation error and the
/// state does not move.
pub fn forward(state: &WizardState) -> Result<WizardState> {
    let state = state.clone();
    let next = match state.step {
        StepId::Welcome => state.with_step(StepId::Environment),
        StepId::Environment => {
            if state.is_remote() {
                require(
                    state.remote.is_complete(),
                    "Please provide IP address and username",
                )?;
                require(
                    state.remote_verified,
                    "Please test the connection before continuing",
                )?;
            }
            if state.agent_service_installed() {
                state.with_step(StepId::SystemState)
            } else {
                state.with_step(StepId::SystemCheck)
            }
        }
        StepId::SystemCheck => {
            if !state.is_remote() {
                require(state.system.is_some(), "Please run the system check first")?;
                require(
                    state.system.is_some_and(|s| s.runtime_present),
                    "The agent runtime is required. Install it and run the system check again.",
                )?;
            }
            state.with_step(StepId::Security)
        }
        StepId::Security => state.with_step(StepId::Identity),
        StepId::Identity => {
            require(filled(&state.user_name), "Please enter your name")?;
            state.with_step(StepId::Agent)
        }
        StepId::Agent => {
            require(filled(&state.agent_name), "Please enter a name for your agent")?;
            state.with_step(StepId::AgentType)
        }
        StepId::AgentType => {
            if state.is_preset() {
                state.with_step(StepId::PresetConfig)
            } else {
                state.with_step(StepId::Brain)
            }
        }
        StepId::PresetConfig => {
            require(filled(&state.api_key), "Please enter your API key")?;
            state.with_step(StepId::Channels)
        }
        StepId::Brain => state.with_step(StepId::Channels),
        StepId::Channels => {
            if state.is_advanced() || state.skip_basic_config {
                state.advanced_transition().with_step(StepId::Personality)
            } else {
                state.with_step(StepId::Review)
            }
        }
        StepId::Personality => {
            if state.is_preset() {
                state.with_step(StepId::Business)
            } else {
                state.with_step(StepId::Models)
            }
        }
        StepId::Models => state.with_step(StepId::Skills),
        StepId::Skills => {
            if state.is_advanced() {
                state.with_step(StepId::AllowedTools)
            } else {
                state.with_step(StepId::Review)
            }
        }
        StepId::AllowedTools => state.with_step(StepId::Business),
        StepId::Business => {
            let mut expanded = state.expand_business_functions();
            if expanded.roster_loop_active() {
                expanded.agent_index = 0;
                expanded.with_step(StepId::Agents)
            } else {
                expanded.with_step(StepId::ExtraSettings)
            }
        }
        StepId::Agents => {
            if state.roster_loop_active() && state.agent_index + 1 < state.roster.len() {
                let index = state.agent_index + 1;
                let mut next = state;
                next.agent_index = index;
                next
            } else {
                state.with_routing_document().with_step(StepId::ExtraSettings)
            }
        }
        StepId::ExtraSettings => state.with_step(StepId::Review),
        StepId::Review => state.with_step(StepId::Pairing),
        StepId::Pairing => state,
        StepId::SystemState => state.advanced_transition().with_step(StepId::Agent),
    };
    Ok(resolve(next))
}

/// Apply the back action of the current step
pub fn back(state: &WizardState) -> WizardState {
    let state = state.clone();
    let previous = match state.step {
        StepId::Welcome => state,
        StepId::Environment => state.with_step(StepId::Welcome),
        StepId::SystemState => state.with_step(StepId::Environment),
        StepId::SystemCheck => state.with_step(StepId::Environment),
        StepId::Security => state.with_step(StepId::SystemCheck),
        StepId::Identity => state.with_step(StepId::Security),
        StepId::Agent => {
            if state.skip_basic_config {
                state.with_step(StepId::SystemState)
            } else {
                state.with_step(StepId::Identity)
            }
        }
        StepId::AgentType => state.with_step(StepId::Agent),
        StepId::PresetConfig | StepId::Brain => state.with_step(StepId::AgentType),
        StepId::Channels => {
            if state.is_preset() {
                state.with_step(StepId::PresetConfig)
            } else {
                state.with_step(StepId::Brain)
            }
        }
        StepId::Personality => state.with_step(StepId::Channels),
        StepId::Models => state.with_step(StepId::Personality),
        StepId::Skills => state.with_step(StepId::Models),
        StepId::AllowedTools => state.with_step(StepId::Skills),
        StepId::Business => {
            if state.is_preset() {
                state.with_step(StepId::Personality)
            } else {
                state.with_step(StepId::AllowedTools)
            }
        }
        StepId::Agents => {
            if state.roster_loop_active() && state.agent_index > 0 {
                let index = state.agent_index - 1;
                let mut previous = state;
                previous.agent_index = index;
                previous
            } else {
                state.with_step(StepId::Business)
            }
        }
        StepId::ExtraSettings => {
            if state.roster_loop_active() {
                let last = state.roster.len() - 1;
                let mut previous = state.with_step(StepId::Agents);
                previous.agent_index = last;
                previous
            } else {
                state.with_step(StepId::Business)
            }
        }
        StepId::Review => {
            if state.is_advanced() {
                state.with_step(StepId::ExtraSettings)
            } else {
                state.with_step(StepId::Channels)
            }
        }
        StepId::Pairing => state.with_step(StepId::Review),
    };
    resolve(previous)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Prerequisites;
    use crate::error::ErrorCode;
    use crate::wizard::{AgentTypeId, BusinessFunctionId, RemoteTarget, TargetEnvironment};
    use rstest::rstest;

    fn at(step: StepId) -> WizardState {
        let mut state = WizardState::new().with_step(step);
        state.user_name = "Sam".to_string();
        state.agent_name = "Nova".to_string();
        state.api_key = "sk-test".to_string();
        state.with_system(Prerequisites {
            runtime_present: true,
            container_runtime_running: true,
            agent_service_installed: false,
        })
    }

    fn with_roster(step: StepId, size: usize) -> WizardState {
        at(step)
            .with_mode(WizardMode::Advanced)
            .toggle_business_function(BusinessFunctionId::CustomTeam)
            .with_custom_team_size(size)
            .expand_business_functions()
    }

    #[test]
    fn test_basic_visible_steps() {
        let steps = visible_steps(&WizardState::new());
        assert_eq!(
            steps,
            vec![
                StepId::Environment,
                StepId::SystemCheck,
                StepId::Security,
                StepId::Identity,
                StepId::Agent,
                StepId::AgentType,
                StepId::Brain,
                StepId::Channels,
                StepId::Review,
                StepId::Pairing,
            ]
        );
    }

    #[test]
    fn test_advanced_preset_skip_basic_visibility() {
        let state = WizardState::new()
            .apply_agent_type(AgentTypeId::OfficeAssistant)
            .advanced_transition();
        let steps = visible_steps(&state);
        assert!(steps.contains(&StepId::PresetConfig));
        assert!(steps.contains(&StepId::Personality));
        assert!(steps.contains(&StepId::Business));
        assert!(!steps.contains(&StepId::Brain));
        assert!(!steps.contains(&StepId::Channels));
        assert!(!steps.contains(&StepId::Models));
        assert!(!steps.contains(&StepId::Agents));
    }

    #[test]
    fn test_progress_status() {
        let state = WizardState::new().with_step(StepId::Agent);
        let statuses = progress(&state);
        assert_eq!(statuses[0], (StepId::Environment, StepStatus::Completed));
        assert!(statuses.contains(&(StepId::Agent, StepStatus::Active)));
        assert_eq!(statuses.last(), Some(&(StepId::Pairing, StepStatus::Pending)));
    }

    #[rstest]
    #[case(StepId::Welcome, StepId::Environment)]
    #[case(StepId::Environment, StepId::SystemCheck)]
    #[case(StepId::SystemCheck, StepId::Security)]
    #[case(StepId::Security, StepId::Identity)]
    #[case(StepId::Identity, StepId::Agent)]
    #[case(StepId::Agent, StepId::AgentType)]
    #[case(StepId::AgentType, StepId::Brain)]
    #[case(StepId::Brain, StepId::Channels)]
    #[case(StepId::Channels, StepId::Review)]
    #[case(StepId::Review, StepId::Pairing)]
    #[case(StepId::Pairing, StepId::Pairing)]
    fn test_basic_forward(#[case] from: StepId, #[case] to: StepId) {
        assert_eq!(forward(&at(from)).unwrap().step, to);
    }

    #[rstest]
    #[case(StepId::Personality, StepId::Models)]
    #[case(StepId::Models, StepId::Skills)]
    #[case(StepId::Skills, StepId::AllowedTools)]
    #[case(StepId::AllowedTools, StepId::Business)]
    #[case(StepId::Business, StepId::ExtraSettings)]
    #[case(StepId::ExtraSettings, StepId::Review)]
    fn test_advanced_forward(#[case] from: StepId, #[case] to: StepId) {
        let state = at(from).with_mode(WizardMode::Advanced);
        assert_eq!(forward(&state).unwrap().step, to);
    }

    #[rstest]
    #[case(StepId::Identity, "Please enter your name")]
    #[case(StepId::Agent, "Please enter a name for your agent")]
    fn test_missing_input_blocks_forward(#[case] step: StepId, #[case] message: &str) {
        let mut state = at(step);
        state.user_name = " ".to_string();
        state.agent_name.clear();
        let err = forward(&state).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Validation);
        assert_eq!(err.to_string(), message);
    }

    #[test]
    fn test_system_check_requires_runtime_locally() {
        let state = at(StepId::SystemCheck).with_system(Prerequisites::default());
        assert_eq!(forward(&state).unwrap_err().code(), ErrorCode::Validation);

        let remote = state.with_target(TargetEnvironment::Remote);
        assert_eq!(forward(&remote).unwrap().step, StepId::Security);
    }

    #[test]
    fn test_remote_environment_requires_verified_connection() {
        let state = at(StepId::Environment).with_target(TargetEnvironment::Remote);
        let err = forward(&state).unwrap_err();
        assert_eq!(err.to_string(), "Please provide IP address and username");

        let state = state.with_remote(RemoteTarget::new("10.0.0.5", "ubuntu"));
        assert!(forward(&state).is_err());
        let state = state.with_remote_verified(true);
        assert_eq!(forward(&state).unwrap().step, StepId::SystemCheck);
    }

    #[test]
    fn test_installed_service_goes_to_maintenance() {
        let state = at(StepId::Environment).with_system(Prerequisites {
            runtime_present: true,
            container_runtime_running: true,
            agent_service_installed: true,
        });
        let next = forward(&state).unwrap();
        assert_eq!(next.step, StepId::SystemState);

        let reconfigure = forward(&next).unwrap();
        assert_eq!(reconfigure.step, StepId::Agent);
        assert!(reconfigure.is_advanced());
        assert_eq!(back(&reconfigure).step, StepId::SystemState);
    }

    #[test]
    fn test_preset_path() {
        let state = at(StepId::AgentType).apply_agent_type(AgentTypeId::CodingAssistant);
        let state = forward(&state).unwrap();
        assert_eq!(state.step, StepId::PresetConfig);

        let mut no_key = state.clone();
        no_key.api_key.clear();
        assert!(forward(&no_key).is_err());

        let state = forward(&state).unwrap();
        assert_eq!(state.step, StepId::Channels);
        assert_eq!(back(&state).step, StepId::PresetConfig);

        let state = forward(&state.with_mode(WizardMode::Advanced)).unwrap();
        assert_eq!(state.step, StepId::Personality);
        assert!(state.skip_basic_config);

        let state = forward(&state).unwrap();
        assert_eq!(state.step, StepId::Business);
        assert_eq!(back(&state).step, StepId::Personality);
    }

    #[test]
    fn test_channels_advanced_transition() {
        let state = at(StepId::Channels).with_mode(WizardMode::Advanced);
        let next = forward(&state).unwrap();
        assert_eq!(next.step, StepId::Personality);
        assert!(next.skip_basic_config);
        assert!(!visible_steps(&next).contains(&StepId::Channels));
    }

    #[test]
    fn test_agents_loop_forward() {
        let state = with_roster(StepId::Business, 3);
        let state = forward(&state).unwrap();
        assert_eq!((state.step, state.agent_index), (StepId::Agents, 0));

        let state = forward(&state).unwrap();
        assert_eq!((state.step, state.agent_index), (StepId::Agents, 1));
        let state = forward(&state).unwrap();
        assert_eq!((state.step, state.agent_index), (StepId::Agents, 2));

        let state = forward(&state).unwrap();
        assert_eq!(state.step, StepId::ExtraSettings);
        assert_eq!(
            state.documents.agents,
            "# AGENTS.md - Agent Routing\n\n## Available Sub-Agents\n\
             - **Agent 1** (agent-1): general\n\
             - **Agent 2** (agent-2): general\n\
             - **Agent 3** (agent-3): general\n"
        );
    }

    #[test]
    fn test_agents_loop_back() {
        let state = with_roster(StepId::ExtraSettings, 2);
        let state = back(&state);
        assert_eq!((state.step, state.agent_index), (StepId::Agents, 1));
        let state = back(&state);
        assert_eq!((state.step, state.agent_index), (StepId::Agents, 0));
        let state = back(&state);
        assert_eq!(state.step, StepId::Business);
    }

    #[test]
    fn test_emptied_roster_redirects_past_loop() {
        let mut state = with_roster(StepId::Agents, 2);
        state.agent_index = 1;
        let state = resolve(state.remove_agent(1).remove_agent(0));
        assert_eq!(state.step, StepId::ExtraSettings);

        let mut inactive = with_roster(StepId::Agents, 2);
        inactive.multi_agent = false;
        assert_eq!(resolve(inactive).step, StepId::ExtraSettings);
    }

    #[rstest]
    #[case(StepId::Brain, StepId::Channels)]
    #[case(StepId::Models, StepId::Business)]
    #[case(StepId::Skills, StepId::Business)]
    #[case(StepId::AllowedTools, StepId::Business)]
    fn test_preset_pass_through(#[case] from: StepId, #[case] to: StepId) {
        let state = at(from).apply_agent_type(AgentTypeId::TravelPlanner);
        assert_eq!(resolve(state).step, to);
    }

    #[test]
    fn test_preset_config_redirects_for_custom() {
        assert_eq!(resolve(at(StepId::PresetConfig)).step, StepId::Brain);
    }

    #[test]
    fn test_review_back_depends_on_mode() {
        assert_eq!(back(&at(StepId::Review)).step, StepId::Channels);
        let advanced = at(StepId::Review).with_mode(WizardMode::Advanced);
        assert_eq!(back(&advanced).step, StepId::ExtraSettings);
    }

    #[test]
    fn test_basic_skills_forward_to_review() {
        assert_eq!(forward(&at(StepId::Skills)).unwrap().step, StepId::Review);
    }
}
