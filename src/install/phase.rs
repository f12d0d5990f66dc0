//! Install phases and their failure policies

use std::fmt;

use crate::error::DeckhandError;

/// One step of an install run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    CheckPrerequisites,
    VerifyPairing,
    Reconcile,
    InstallService,
    ApplyConfiguration,
    ProvisionSkills,
    StartService,
    EstablishTunnel,
    VerifyTunnel,
    IssuePairingCode,
    ResolveDashboard,
}

/// What a failure inside a phase does to the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhasePolicy {
    /// Abort the run
    Fatal,
    /// Record each failure and keep going
    BestEffort,
    /// Warn and keep going; the phase only refines later decisions
    Advisory,
}

/// Result of executing one phase
#[derive(Debug, Clone, PartialEq)]
pub enum PhaseOutcome {
    Success,
    PartialFailure(Vec<DeckhandError>),
    Fatal(DeckhandError),
    /// Nothing left to do; the run ends successfully here
    Complete,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Self::CheckPrerequisites => "Check prerequisites",
            Self::VerifyPairing => "Verify pairing",
            Self::Reconcile => "Reconcile configuration",
            Self::InstallService => "Install agent service",
            Self::ApplyConfiguration => "Apply configuration",
            Self::ProvisionSkills => "Provision skills",
            Self::StartService => "Start agent service",
            Self::EstablishTunnel => "Establish tunnel",
            Self::VerifyTunnel => "Verify tunnel",
            Self::IssuePairingCode => "Issue pairing code",
            Self::ResolveDashboard => "Resolve dashboard",
        }
    }

    pub fn policy(&self) -> PhasePolicy {
        match self {
            Self::VerifyPairing => PhasePolicy::Advisory,
            Self::ProvisionSkills => PhasePolicy::BestEffort,
            _ => PhasePolicy::Fatal,
        }
    }

    /// Operator-facing progress line shown while the phase runs
    pub fn progress(&self, remote: bool) -> &'static str {
        match (self, remote) {
            (Self::CheckPrerequisites, _) => "Checking prerequisites...",
            (Self::VerifyPairing, _) => "Checking pairing status...",
            (Self::Reconcile, _) => "Comparing with the installed configuration...",
            (Self::InstallService, _) => "Installing the agent service (this may take a minute)...",
            (Self::ApplyConfiguration, false) => "Configuring agent...",
            (Self::ApplyConfiguration, true) => "Deploying to remote server...",
            (Self::ProvisionSkills, _) => "Installing skills...",
            (Self::StartService, _) => "Starting agent service...",
            (Self::EstablishTunnel, _) => "Creating SSH tunnel to remote gateway...",
            (Self::VerifyTunnel, _) => "Verifying tunnel connectivity...",
            (Self::IssuePairingCode, _) => "Finalizing setup...",
            (Self::ResolveDashboard, _) => "Resolving dashboard URL...",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Phases for a local or remote run.
///
/// Both shapes are identical up to the point where a local run starts the
/// service and a remote run brings up and verifies the tunnel instead.
pub fn plan(remote: bool) -> Vec<Phase> {
    let mut phases = vec![Phase::CheckPrerequisites, Phase::VerifyPairing, Phase::Reconcile];
    if remote {
        phases.extend([
            Phase::ApplyConfiguration,
            Phase::ProvisionSkills,
            Phase::EstablishTunnel,
            Phase::VerifyTunnel,
        ]);
    } else {
        phases.extend([
            Phase::InstallService,
            Phase::ApplyConfiguration,
            Phase::ProvisionSkills,
            Phase::StartService,
        ]);
    }
    phases.extend([Phase::IssuePairingCode, Phase::ResolveDashboard]);
    phases
}
