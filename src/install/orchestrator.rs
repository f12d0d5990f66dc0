//! Install run orchestration
//!
//! Runs the phases from [`plan`] strictly in order, one capability call at a
//! time, and applies each phase's failure policy. There is no rollback: a
//! failed run leaves whatever earlier phases applied and is retried from the
//! start.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::backend::{Backend, Prerequisites, Targeted};
use crate::canonical::{CanonicalConfig, inverse_normalize, reconcile, synthesize};
use crate::error::DeckhandError;
use crate::install::phase::{Phase, PhaseOutcome, PhasePolicy, plan};
use crate::remote::{RemoteSessionManager, TunnelStart};
use crate::wizard::{RemoteTarget, WizardState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    /// The installed configuration already matches; nothing was applied
    Unchanged,
    Succeeded,
    Failed,
}

/// Progress of one install run
#[derive(Debug, Clone)]
pub struct InstallationResult {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Label of the phase executing, or last executed
    pub phase: String,
    pub log: Vec<String>,
    pub status: RunStatus,
    pub failure: Option<DeckhandError>,
    pub warnings: Vec<DeckhandError>,
    pub config: Option<CanonicalConfig>,
    pub pairing_code: Option<String>,
    pub dashboard_url: Option<String>,
}

impl InstallationResult {
    fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            phase: String::new(),
            log: Vec::new(),
            status: RunStatus::Running,
            failure: None,
            warnings: Vec::new(),
            config: None,
            pairing_code: None,
            dashboard_url: None,
        }
    }

    /// Accumulated log as shown to the operator
    pub fn log_text(&self) -> String {
        self.log.join("\n")
    }

    pub fn is_error(&self) -> bool {
        self.status == RunStatus::Failed
    }

    pub fn is_done(&self) -> bool {
        matches!(self.status, RunStatus::Unchanged | RunStatus::Succeeded)
    }
}

/// Called with the phase and each new log line
pub type ProgressFn = Arc<dyn Fn(Phase, &str) + Send + Sync>;

/// Values threaded through one run
struct RunContext {
    state: WizardState,
    remote: Option<RemoteTarget>,
    prerequisites: Prerequisites,
    config: Option<CanonicalConfig>,
    result: InstallationResult,
}

pub struct InstallOrchestrator {
    backend: Arc<dyn Backend>,
    session: Arc<RemoteSessionManager>,
    progress: Option<ProgressFn>,
}

fn fatal(phase: Phase, error: impl std::fmt::Display) -> PhaseOutcome {
    PhaseOutcome::Fatal(DeckhandError::fatal(phase.label(), error.to_string()))
}

impl InstallOrchestrator {
    pub fn new(backend: Arc<dyn Backend>, session: Arc<RemoteSessionManager>) -> Self {
        Self {
            backend,
            session,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    fn log(&self, ctx: &mut RunContext, phase: Phase, line: impl Into<String>) {
        let line = line.into();
        if let Some(progress) = &self.progress {
            progress(phase, &line);
        }
        ctx.result.log.push(line);
    }

    /// Run the install or update sequence for `state`
    pub async fn run(&self, state: &WizardState) -> InstallationResult {
        let remote = state.remote_target().cloned();
        let mut ctx = RunContext {
            state: state.clone(),
            remote,
            prerequisites: state.system.unwrap_or_default(),
            config: None,
            result: InstallationResult::new(),
        };
        tracing::info!(
            "Starting install run {} ({})",
            ctx.result.run_id,
            if ctx.remote.is_some() { "remote" } else { "local" }
        );

        for phase in plan(ctx.remote.is_some()) {
            ctx.result.phase = phase.label().to_string();
            tracing::debug!("Phase: {}", phase);

            match self.execute(phase, &mut ctx).await {
                PhaseOutcome::Success => {}
                PhaseOutcome::PartialFailure(warnings) => {
                    tracing::warn!("{} finished with {} failure(s)", phase, warnings.len());
                    ctx.result.warnings.extend(warnings);
                }
                PhaseOutcome::Complete => {
                    self.log(&mut ctx, phase, "Configuration unchanged.");
                    tracing::info!("Install run {}: configuration unchanged", ctx.result.run_id);
                    return self.finish(ctx, RunStatus::Unchanged);
                }
                PhaseOutcome::Fatal(error) => {
                    tracing::error!("Install run {} failed: {}", ctx.result.run_id, error);
                    self.log(&mut ctx, phase, format!("Error: {error}"));
                    ctx.result.failure = Some(error);
                    return self.finish(ctx, RunStatus::Failed);
                }
            }
        }

        tracing::info!("Install run {} succeeded", ctx.result.run_id);
        self.finish(ctx, RunStatus::Succeeded)
    }

    fn finish(&self, ctx: RunContext, status: RunStatus) -> InstallationResult {
        let mut result = ctx.result;
        result.config = ctx.config;
        result.status = status;
        result.finished_at = Some(Utc::now());
        result
    }

    async fn execute(&self, phase: Phase, ctx: &mut RunContext) -> PhaseOutcome {
        let remote = ctx.remote.is_some();
        if phase != Phase::ProvisionSkills {
            self.log(ctx, phase, phase.progress(remote));
        }

        let outcome = match phase {
            Phase::CheckPrerequisites => self.check_prerequisites(ctx).await,
            Phase::VerifyPairing => self.verify_pairing(ctx).await,
            Phase::Reconcile => self.reconcile(ctx).await,
            Phase::InstallService => self.install_service(ctx).await,
            Phase::ApplyConfiguration => self.apply_configuration(ctx).await,
            Phase::ProvisionSkills => self.provision_skills(ctx).await,
            Phase::StartService => self.start_service().await,
            Phase::EstablishTunnel => self.establish_tunnel(ctx).await,
            Phase::VerifyTunnel => self.verify_tunnel(ctx).await,
            Phase::IssuePairingCode => self.issue_pairing_code(ctx).await,
            Phase::ResolveDashboard => self.resolve_dashboard(ctx).await,
        };

        match (phase.policy(), outcome) {
            (PhasePolicy::Advisory, PhaseOutcome::Fatal(error)) => {
                tracing::warn!("{} failed, continuing: {}", phase, error);
                self.log(ctx, phase, format!("Warning: {error}"));
                PhaseOutcome::Success
            }
            (_, outcome) => outcome,
        }
    }

    fn targeted<'a>(&'a self, ctx: &'a RunContext) -> Targeted<'a> {
        Targeted::new(self.backend.as_ref(), ctx.remote.as_ref())
    }

    async fn check_prerequisites(&self, ctx: &mut RunContext) -> PhaseOutcome {
        let prerequisites = match self.targeted(ctx).prerequisites().await {
            Ok(p) => p,
            Err(e) => return fatal(Phase::CheckPrerequisites, e),
        };
        if ctx.remote.is_none() && !prerequisites.runtime_present {
            return fatal(
                Phase::CheckPrerequisites,
                "the agent runtime is not installed",
            );
        }
        ctx.prerequisites = prerequisites;
        PhaseOutcome::Success
    }

    /// Refresh the pairing flag from the backend so a pairing approved since
    /// the wizard started is preserved
    async fn verify_pairing(&self, ctx: &mut RunContext) -> PhaseOutcome {
        if !ctx.prerequisites.agent_service_installed {
            return PhaseOutcome::Success;
        }
        let status = self.targeted(ctx).pairing_status().await;
        match status {
            Ok(paired) => {
                tracing::debug!("Live pairing status: {}", paired);
                ctx.state.is_paired = paired;
                PhaseOutcome::Success
            }
            Err(e) => fatal(Phase::VerifyPairing, e),
        }
    }

    async fn reconcile(&self, ctx: &mut RunContext) -> PhaseOutcome {
        let config = synthesize(&ctx.state);

        if ctx.prerequisites.agent_service_installed {
            let current = self.targeted(ctx).current_config().await;
            match current {
                Ok(persisted) => {
                    let stored = inverse_normalize(&persisted, config.preserve_state);
                    if reconcile(&config, &stored) {
                        ctx.config = Some(config);
                        return PhaseOutcome::Complete;
                    }
                    tracing::info!("Installed configuration differs; updating");
                }
                Err(e) => tracing::debug!("No installed configuration to compare: {}", e),
            }
        }

        ctx.config = Some(config);
        PhaseOutcome::Success
    }

    async fn install_service(&self, ctx: &mut RunContext) -> PhaseOutcome {
        if ctx.prerequisites.agent_service_installed {
            tracing::debug!("Agent service already installed");
            return PhaseOutcome::Success;
        }
        match self.backend.install_agent_service().await {
            Ok(()) => {
                ctx.prerequisites.agent_service_installed = true;
                PhaseOutcome::Success
            }
            Err(e) => fatal(Phase::InstallService, e),
        }
    }

    async fn apply_configuration(&self, ctx: &mut RunContext) -> PhaseOutcome {
        let Some(config) = ctx.config.as_ref() else {
            return fatal(Phase::ApplyConfiguration, "no configuration was synthesized");
        };
        let applied = match &ctx.remote {
            Some(target) => self.backend.setup_remote(target, config).await,
            None => self.backend.configure_agent(config).await,
        };
        match applied {
            Ok(()) => PhaseOutcome::Success,
            Err(e) => fatal(Phase::ApplyConfiguration, e),
        }
    }

    /// Install each skill in order; one failure never stops the rest
    async fn provision_skills(&self, ctx: &mut RunContext) -> PhaseOutcome {
        let skills = ctx
            .config
            .as_ref()
            .map(|config| config.skills.clone())
            .unwrap_or_default();
        let mut failures = Vec::new();

        for skill in skills {
            self.log(ctx, Phase::ProvisionSkills, format!("Installing skill: {skill}..."));
            let installed = self.targeted(ctx).install_skill(&skill).await;
            if let Err(e) = installed {
                tracing::warn!("Failed to install skill {}: {}", skill, e);
                self.log(
                    ctx,
                    Phase::ProvisionSkills,
                    format!("Warning: Failed to install skill {skill}: {e}"),
                );
                failures.push(DeckhandError::PartialProvisioning {
                    skill,
                    message: e.message().to_string(),
                });
            }
        }

        if failures.is_empty() {
            PhaseOutcome::Success
        } else {
            PhaseOutcome::PartialFailure(failures)
        }
    }

    async fn start_service(&self) -> PhaseOutcome {
        match self.backend.start_agent_service().await {
            Ok(()) => PhaseOutcome::Success,
            Err(e) => fatal(Phase::StartService, e),
        }
    }

    async fn establish_tunnel(&self, ctx: &mut RunContext) -> PhaseOutcome {
        let Some(target) = ctx.remote.clone() else {
            return PhaseOutcome::Success;
        };
        match self.session.start_tunnel(&target).await {
            Ok(TunnelStart::Started) => PhaseOutcome::Success,
            Ok(TunnelStart::AlreadyRunning) => {
                self.log(ctx, Phase::EstablishTunnel, "Tunnel already active.");
                PhaseOutcome::Success
            }
            Err(e) => fatal(Phase::EstablishTunnel, e),
        }
    }

    async fn verify_tunnel(&self, ctx: &mut RunContext) -> PhaseOutcome {
        let Some(target) = ctx.remote.as_ref() else {
            return PhaseOutcome::Success;
        };
        match self.session.verify_tunnel(target).await {
            Ok(()) => PhaseOutcome::Success,
            Err(e) => PhaseOutcome::Fatal(e),
        }
    }

    async fn issue_pairing_code(&self, ctx: &mut RunContext) -> PhaseOutcome {
        if ctx.state.is_paired {
            tracing::debug!("Already paired; no pairing code issued");
            return PhaseOutcome::Success;
        }
        let code = self.targeted(ctx).generate_pairing_code().await;
        match code {
            Ok(code) => {
                ctx.result.pairing_code = Some(code);
                PhaseOutcome::Success
            }
            Err(e) => fatal(Phase::IssuePairingCode, e),
        }
    }

    async fn resolve_dashboard(&self, ctx: &mut RunContext) -> PhaseOutcome {
        let url = self.targeted(ctx).dashboard_url().await;
        match url {
            Ok(url) => {
                ctx.result.dashboard_url = Some(url);
                PhaseOutcome::Success
            }
            Err(e) => fatal(Phase::ResolveDashboard, e),
        }
    }
}
