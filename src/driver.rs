//! Wizard driver
//!
//! Owns the current wizard state and runs the asynchronous actions a step can
//! trigger, threading every result back through the pure navigator. Inline
//! errors (validation, connectivity, timeout) become a notice that expires on
//! its own.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::backend::{Backend, MaintenanceAction, Prerequisites, Targeted, WorkspaceFiles};
use crate::config::Config;
use crate::error::{DeckhandError, Result};
use crate::install::{InstallOrchestrator, InstallationResult, ProgressFn, RunStatus};
use crate::maintenance::{self, MaintenanceReport};
use crate::remote::{RemoteSessionManager, TunnelStart, TunnelState};
use crate::wizard::{self, StepId, WizardState};

/// Auto-expiring inline message
#[derive(Debug, Clone)]
struct Notice {
    message: String,
    raised_at: Instant,
}

pub struct WizardDriver {
    state: WizardState,
    backend: Arc<dyn Backend>,
    session: Arc<RemoteSessionManager>,
    progress: Option<ProgressFn>,
    notice: Option<Notice>,
    notice_ttl: Duration,
    last_run: Option<InstallationResult>,
}

impl WizardDriver {
    pub fn new(backend: Arc<dyn Backend>, config: &Config) -> Self {
        let session = Arc::new(RemoteSessionManager::from_config(
            backend.clone(),
            &config.remote,
        ));
        let mut state = WizardState::new();
        state.skills = config.install.default_skills.clone();
        state.gateway_port = config.remote.gateway_port;

        Self {
            state,
            backend,
            session,
            progress: None,
            notice: None,
            notice_ttl: config.remote.notice_ttl(),
            last_run: None,
        }
    }

    pub fn with_state(mut self, state: WizardState) -> Self {
        self.state = state;
        self
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn session(&self) -> &Arc<RemoteSessionManager> {
        &self.session
    }

    pub fn last_run(&self) -> Option<&InstallationResult> {
        self.last_run.as_ref()
    }

    /// Apply a pure edit to the state
    pub fn update(&mut self, edit: impl FnOnce(WizardState) -> WizardState) {
        let state = std::mem::take(&mut self.state);
        self.state = edit(state);
    }

    /// The current inline notice, unless it has expired
    pub fn notice(&self) -> Option<&str> {
        self.notice
            .as_ref()
            .filter(|n| n.raised_at.elapsed() < self.notice_ttl)
            .map(|n| n.message.as_str())
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    /// Surface inline errors as a notice and pass every error on
    fn report<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result
            && e.code().shows_inline()
        {
            self.notice = Some(Notice {
                message: e.to_string(),
                raised_at: Instant::now(),
            });
        }
        result
    }

    fn targeted(&self) -> Targeted<'_> {
        Targeted::new(self.backend.as_ref(), self.state.remote_target())
    }

    pub fn forward(&mut self) -> Result<StepId> {
        let next = wizard::forward(&self.state);
        let next = self.report(next)?;
        self.state = next;
        self.clear_notice();
        Ok(self.state.step)
    }

    pub fn back(&mut self) -> StepId {
        self.state = wizard::back(&self.state);
        self.clear_notice();
        self.state.step
    }

    /// Check the target's prerequisites and record them in the state
    pub async fn run_system_check(&mut self) -> Result<Prerequisites> {
        let checked = self.targeted().prerequisites().await;
        let prerequisites = self.report(checked.map_err(DeckhandError::from))?;

        if prerequisites.agent_service_installed {
            match self.targeted().agent_service_version().await {
                Ok(version) => tracing::info!("Agent service {} installed", version),
                Err(e) => tracing::warn!("Could not read agent service version: {}", e),
            }
        }
        self.update(|s| s.with_system(prerequisites));
        Ok(prerequisites)
    }

    pub async fn test_connection(&mut self) -> Result<()> {
        let tested = self.session.test_connection(&self.state.remote).await;
        self.report(tested)?;
        self.update(|s| s.with_remote_verified(true));
        Ok(())
    }

    /// Load the installed configuration for editing, keeping target and credentials
    pub async fn reconfigure(&mut self) -> Result<()> {
        let loaded = self.targeted().current_config().await;
        let persisted = self.report(loaded.map_err(DeckhandError::from))?;

        let mut state = WizardState::from_persisted(&persisted).advanced_transition();
        state.target = self.state.target;
        state.remote = self.state.remote.clone();
        state.remote_verified = self.state.remote_verified;
        state.system = self.state.system;
        self.state = state.with_step(StepId::Agent);
        tracing::info!("Loaded installed configuration for {}", self.state.agent_name);
        Ok(())
    }

    /// Run the install or update sequence; a finished run moves to pairing
    pub async fn submit(&mut self) -> &InstallationResult {
        let mut orchestrator = InstallOrchestrator::new(self.backend.clone(), self.session.clone());
        if let Some(progress) = &self.progress {
            orchestrator = orchestrator.with_progress(progress.clone());
        }
        let result = orchestrator.run(&self.state).await;

        if result.is_done() {
            // A successful run without a code found the session already paired
            let paired = self.state.is_paired
                || (result.status == RunStatus::Succeeded && result.pairing_code.is_none());
            self.update(|s| s.with_paired(paired).with_step(StepId::Pairing));
        }
        self.last_run.insert(result)
    }

    pub async fn approve_pairing(&mut self, code: &str) -> Result<()> {
        let approved = maintenance::approve_pairing(self.targeted(), code).await;
        self.report(approved)?;
        self.update(|s| s.with_paired(true));
        Ok(())
    }

    pub async fn run_maintenance(&mut self, action: MaintenanceAction) -> MaintenanceReport {
        let report = maintenance::run_maintenance(self.targeted(), action).await;
        if report.succeeded && action == MaintenanceAction::Uninstall {
            let mut system = self.state.system.unwrap_or_default();
            system.agent_service_installed = false;
            self.update(|s| s.with_system(system).with_paired(false));
        }
        report
    }

    /// Save identity, user and soul documents for the main agent or a roster entry
    pub async fn save_documents(&mut self, agent_id: Option<&str>) -> Result<()> {
        let files = match agent_id {
            None => WorkspaceFiles {
                agent_id: None,
                identity: self.state.documents.identity.clone(),
                user: self.state.documents.user.clone(),
                soul: self.state.documents.soul.clone(),
            },
            Some(id) => {
                let found = self
                    .state
                    .roster
                    .iter()
                    .find(|a| a.id == id)
                    .map(|agent| WorkspaceFiles {
                        agent_id: Some(agent.id.clone()),
                        identity: agent.identity_md.clone(),
                        user: agent.user_md.clone(),
                        soul: agent.soul_md.clone(),
                    });
                let Some(files) = found else {
                    return self.report(Err(DeckhandError::validation(format!(
                        "No agent with id {id}"
                    ))));
                };
                files
            }
        };
        let saved = maintenance::save_documents(self.targeted(), &files).await;
        self.report(saved)
    }

    pub async fn create_custom_skill(&mut self, name: &str, content: &str) -> Result<()> {
        let created = maintenance::create_custom_skill(self.targeted(), name, content).await;
        self.report(created)
    }

    /// Quick action: connect if needed and bring the tunnel up
    pub async fn open_tunnel(&mut self) -> Result<TunnelStart> {
        let opened = self.session.ensure_tunnel(&self.state.remote).await;
        self.report(opened)
    }

    pub async fn toggle_tunnel(&mut self) -> Result<TunnelState> {
        let toggled = self.session.toggle_tunnel(&self.state.remote).await;
        self.report(toggled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RecordingBackend;
    use crate::canonical::{PersistedConfig, synthesize};
    use crate::error::ErrorCode;
    use crate::wizard::{RemoteTarget, TargetEnvironment, WizardMode};

    fn driver(backend: Arc<RecordingBackend>) -> WizardDriver {
        WizardDriver::new(backend, &Config::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_validation_notice_expires() {
        let mut driver = driver(Arc::new(RecordingBackend::new()))
            .with_state(WizardState::new().with_step(StepId::Identity));

        let err = driver.forward().unwrap_err();
        assert_eq!(err.code(), ErrorCode::Validation);
        assert_eq!(driver.notice(), Some("Please enter your name"));
        assert_eq!(driver.state().step, StepId::Identity);

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(driver.notice().is_some());
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(driver.notice(), None);
    }

    #[tokio::test]
    async fn test_local_walkthrough_to_pairing() {
        let backend = Arc::new(RecordingBackend::new());
        let mut driver = driver(backend.clone());

        assert_eq!(driver.forward().unwrap(), StepId::Environment);
        driver.run_system_check().await.unwrap();
        assert_eq!(driver.forward().unwrap(), StepId::SystemCheck);
        assert_eq!(driver.forward().unwrap(), StepId::Security);
        assert_eq!(driver.forward().unwrap(), StepId::Identity);
        driver.update(|mut s| {
            s.user_name = "Sam".to_string();
            s
        });
        assert_eq!(driver.forward().unwrap(), StepId::Agent);
        driver.update(|s| s.with_agent_name("Nova"));
        assert_eq!(driver.forward().unwrap(), StepId::AgentType);
        assert_eq!(driver.forward().unwrap(), StepId::Brain);
        assert_eq!(driver.forward().unwrap(), StepId::Channels);
        assert_eq!(driver.forward().unwrap(), StepId::Review);

        let result = driver.submit().await;
        assert_eq!(result.status, RunStatus::Succeeded);
        let code = result.pairing_code.clone().unwrap();
        assert_eq!(driver.state().step, StepId::Pairing);
        assert!(!driver.state().is_paired);

        let err = driver.approve_pairing("nope").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid pairing code. Please check and try again.");
        assert!(driver.notice().is_some());
        driver.approve_pairing(&code).await.unwrap();
        assert!(driver.state().is_paired);
    }

    #[tokio::test]
    async fn test_remote_connection_test_verifies_target() {
        let backend = Arc::new(RecordingBackend::new().fail_on("test_connection", "Connection refused"));
        let mut driver = driver(backend).with_state(
            WizardState::new()
                .with_step(StepId::Environment)
                .with_target(TargetEnvironment::Remote)
                .with_remote(RemoteTarget::new("10.0.0.5", "ubuntu")),
        );

        let err = driver.test_connection().await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Connectivity);
        assert_eq!(
            driver.notice(),
            Some("Connection refused. Check that SSH is running on the server (port 22).")
        );
        assert!(!driver.state().remote_verified);
    }

    #[tokio::test]
    async fn test_reconfigure_loads_installed_config() {
        let installed = synthesize(&WizardState::new().with_agent_name("Nova"));
        let backend = Arc::new(
            RecordingBackend::new().with_persisted(PersistedConfig::from_canonical(&installed)),
        );
        let mut driver = driver(backend).with_state(
            WizardState::new()
                .with_step(StepId::SystemState)
                .with_system(Prerequisites {
                    runtime_present: true,
                    container_runtime_running: true,
                    agent_service_installed: true,
                }),
        );

        driver.reconfigure().await.unwrap();
        let state = driver.state();
        assert_eq!(state.step, StepId::Agent);
        assert_eq!(state.mode, WizardMode::Advanced);
        assert_eq!(state.agent_name, "Nova");
        assert!(state.agent_service_installed());

        let result = driver.submit().await;
        assert_eq!(result.status, RunStatus::Unchanged);
    }

    #[tokio::test]
    async fn test_unchanged_submit_keeps_unpaired_session() {
        let installed = synthesize(&WizardState::new().with_agent_name("Nova"));
        let backend = Arc::new(
            RecordingBackend::new().with_persisted(PersistedConfig::from_canonical(&installed)),
        );
        let mut driver = driver(backend.clone()).with_state(WizardState::new().with_system(
            Prerequisites {
                runtime_present: true,
                container_runtime_running: true,
                agent_service_installed: true,
            },
        ));

        driver.reconfigure().await.unwrap();
        assert!(!driver.state().is_paired);

        let result = driver.submit().await;
        assert_eq!(result.status, RunStatus::Unchanged);
        assert_eq!(result.pairing_code, None);
        assert_eq!(driver.state().step, StepId::Pairing);
        assert!(!driver.state().is_paired);
        assert_eq!(backend.check_pairing_status().await, Ok(false));
    }

    #[tokio::test]
    async fn test_uninstall_clears_installed_flag() {
        let backend = Arc::new(RecordingBackend::new());
        let mut driver = driver(backend).with_state(WizardState::new().with_system(Prerequisites {
            runtime_present: true,
            container_runtime_running: true,
            agent_service_installed: true,
        }));

        let report = driver.run_maintenance(MaintenanceAction::Uninstall).await;
        assert!(report.succeeded);
        assert!(!driver.state().agent_service_installed());
    }

    #[tokio::test]
    async fn test_save_documents_for_unknown_agent() {
        let backend = Arc::new(RecordingBackend::new());
        let mut driver = driver(backend.clone());
        assert!(driver.save_documents(Some("ghost")).await.is_err());
        driver.save_documents(None).await.unwrap();
        assert_eq!(backend.saved_documents().await.len(), 1);
    }

    #[tokio::test]
    async fn test_tunnel_quick_action_is_idempotent() {
        let backend = Arc::new(RecordingBackend::new());
        let mut driver = driver(backend.clone()).with_state(
            WizardState::new()
                .with_target(TargetEnvironment::Remote)
                .with_remote(RemoteTarget::new("10.0.0.5", "ubuntu")),
        );
        assert_eq!(driver.open_tunnel().await, Ok(TunnelStart::Started));
        assert_eq!(driver.open_tunnel().await, Ok(TunnelStart::AlreadyRunning));
        assert_eq!(driver.toggle_tunnel().await, Ok(TunnelState::Inactive));
        assert!(!backend.tunnel_running().await);
    }
}
