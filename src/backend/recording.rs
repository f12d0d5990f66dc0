//! In-process backend that records every capability call
//!
//! Used by `deckhand rehearse` to walk an install run without touching a
//! machine, and by tests as a scripted double. Calls can be made to fail or to
//! never settle by name (`install_skill`) or by name and argument
//! (`install_skill:github`).

use async_trait::async_trait;
use rand::Rng;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

use super::{
    Backend, BackendError, BackendResult, MaintenanceAction, Prerequisites, WorkspaceFiles,
};
use crate::canonical::{CanonicalConfig, PersistedConfig};
use crate::wizard::RemoteTarget;
use crate::wizard::state::DEFAULT_GATEWAY_PORT;

pub const AGENT_SERVICE_VERSION: &str = "2026.2.1";
pub const TUNNEL_ALREADY_RUNNING: &str = "SSH tunnel is already running";
pub const NO_PENDING_PAIRING: &str = "no pending pairing request found";

#[derive(Default)]
struct Recorder {
    calls: Vec<String>,
    failures: HashMap<String, String>,
    hanging: HashSet<String>,
    prerequisites: Prerequisites,
    tunnel_running: bool,
    tunnel_verifies: bool,
    applied: Option<CanonicalConfig>,
    seeded: Option<PersistedConfig>,
    paired: bool,
    pending_pairing: Option<String>,
    documents: Vec<WorkspaceFiles>,
    custom_skills: Vec<String>,
}

/// What a recorded call should do
enum Script {
    Settle(Option<String>),
    Hang,
}

pub struct RecordingBackend {
    inner: Mutex<Recorder>,
    token: String,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn random_code(len: usize) -> String {
    rand::rng()
        .sample_iter(rand::distr::Alphanumeric)
        .take(len)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect()
}

impl RecordingBackend {
    /// A healthy machine: runtime present, agent service not yet installed
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Recorder {
                prerequisites: Prerequisites {
                    runtime_present: true,
                    container_runtime_running: true,
                    agent_service_installed: false,
                },
                tunnel_verifies: true,
                ..Recorder::default()
            }),
            token: random_code(24).to_lowercase(),
        }
    }

    pub fn with_prerequisites(mut self, prerequisites: Prerequisites) -> Self {
        self.inner.get_mut().prerequisites = prerequisites;
        self
    }

    /// Report `persisted` as the installed configuration
    pub fn with_persisted(mut self, persisted: PersistedConfig) -> Self {
        let recorder = self.inner.get_mut();
        recorder.prerequisites.agent_service_installed = true;
        recorder.paired = persisted.is_paired;
        recorder.seeded = Some(persisted);
        self
    }

    pub fn with_paired(mut self, paired: bool) -> Self {
        self.inner.get_mut().paired = paired;
        self
    }

    /// Tunnel verification answers with a definite "no"
    pub fn with_stale_tunnel(mut self) -> Self {
        self.inner.get_mut().tunnel_verifies = false;
        self
    }

    /// Make the named call fail with `message`
    pub fn fail_on(mut self, call: impl Into<String>, message: impl Into<String>) -> Self {
        self.inner
            .get_mut()
            .failures
            .insert(call.into(), message.into());
        self
    }

    /// Make the named call never settle
    pub fn hang_on(mut self, call: impl Into<String>) -> Self {
        self.inner.get_mut().hanging.insert(call.into());
        self
    }

    /// Every call so far, as `name` or `name:argument`
    pub async fn calls(&self) -> Vec<String> {
        self.inner.lock().await.calls.clone()
    }

    pub async fn applied_config(&self) -> Option<CanonicalConfig> {
        self.inner.lock().await.applied.clone()
    }

    pub async fn saved_documents(&self) -> Vec<WorkspaceFiles> {
        self.inner.lock().await.documents.clone()
    }

    pub async fn custom_skills(&self) -> Vec<String> {
        self.inner.lock().await.custom_skills.clone()
    }

    pub async fn tunnel_running(&self) -> bool {
        self.inner.lock().await.tunnel_running
    }

    /// The code a pending pairing request would be approved with
    pub async fn pending_pairing(&self) -> Option<String> {
        self.inner.lock().await.pending_pairing.clone()
    }

    /// Record a call, run `effect` unless it is scripted to fail, and settle
    async fn record<T>(
        &self,
        name: &str,
        argument: Option<&str>,
        effect: impl FnOnce(&mut Recorder) -> BackendResult<T>,
    ) -> BackendResult<T> {
        let label = match argument {
            Some(argument) => format!("{name}:{argument}"),
            None => name.to_string(),
        };

        let script = {
            let mut recorder = self.inner.lock().await;
            recorder.calls.push(label.clone());
            if recorder.hanging.contains(&label) || recorder.hanging.contains(name) {
                Script::Hang
            } else {
                Script::Settle(
                    recorder
                        .failures
                        .get(&label)
                        .or_else(|| recorder.failures.get(name))
                        .cloned(),
                )
            }
        };
        tracing::debug!("Backend call: {}", label);

        match script {
            Script::Hang => std::future::pending().await,
            Script::Settle(Some(message)) => Err(BackendError::new(message)),
            Script::Settle(None) => {
                let mut recorder = self.inner.lock().await;
                effect(&mut *recorder)
            }
        }
    }

    fn current(&self, recorder: &Recorder) -> BackendResult<PersistedConfig> {
        if let Some(applied) = &recorder.applied {
            let mut persisted = PersistedConfig::from_canonical(applied);
            persisted.is_paired = recorder.paired;
            return Ok(persisted);
        }
        match &recorder.seeded {
            Some(seeded) => {
                let mut persisted = seeded.clone();
                persisted.is_paired = recorder.paired;
                Ok(persisted)
            }
            None => Err(BackendError::new("agent service is not configured")),
        }
    }

    fn dashboard(&self, recorder: &Recorder) -> String {
        let port = recorder
            .applied
            .as_ref()
            .map(|config| config.gateway_port)
            .unwrap_or(DEFAULT_GATEWAY_PORT);
        format!(
            "http://127.0.0.1:{}/?token={}",
            port,
            urlencoding::encode(&self.token)
        )
    }
}

fn issue_pairing(recorder: &mut Recorder) -> BackendResult<String> {
    let code = random_code(8);
    recorder.pending_pairing = Some(code.clone());
    Ok(code)
}

fn approve(recorder: &mut Recorder, code: &str) -> BackendResult<()> {
    let matches = recorder
        .pending_pairing
        .as_deref()
        .is_some_and(|pending| pending.eq_ignore_ascii_case(code.trim()));
    if !matches {
        return Err(BackendError::new(NO_PENDING_PAIRING));
    }
    recorder.pending_pairing = None;
    recorder.paired = true;
    Ok(())
}

fn maintenance_report(action: MaintenanceAction) -> BackendResult<String> {
    Ok(format!("{} completed", action.label()))
}

#[async_trait]
impl Backend for RecordingBackend {
    async fn check_prerequisites(&self) -> BackendResult<Prerequisites> {
        self.record("check_prerequisites", None, |r| Ok(r.prerequisites))
            .await
    }

    async fn agent_service_version(&self) -> BackendResult<String> {
        self.record("agent_service_version", None, |_| {
            Ok(AGENT_SERVICE_VERSION.to_string())
        })
        .await
    }

    async fn install_agent_service(&self) -> BackendResult<()> {
        self.record("install_agent_service", None, |r| {
            r.prerequisites.agent_service_installed = true;
            Ok(())
        })
        .await
    }

    async fn configure_agent(&self, config: &CanonicalConfig) -> BackendResult<()> {
        self.record("configure_agent", None, |r| {
            r.applied = Some(config.clone());
            Ok(())
        })
        .await
    }

    async fn install_skill(&self, name: &str) -> BackendResult<()> {
        self.record("install_skill", Some(name), |_| Ok(())).await
    }

    async fn start_agent_service(&self) -> BackendResult<()> {
        self.record("start_agent_service", None, |_| Ok(())).await
    }

    async fn generate_pairing_code(&self) -> BackendResult<String> {
        self.record("generate_pairing_code", None, issue_pairing)
            .await
    }

    async fn dashboard_url(&self, remote: bool) -> BackendResult<String> {
        let argument = if remote { "remote" } else { "local" };
        self.record("dashboard_url", Some(argument), |r| Ok(self.dashboard(r)))
            .await
    }

    async fn approve_pairing(&self, code: &str) -> BackendResult<()> {
        self.record("approve_pairing", Some(code), |r| approve(r, code))
            .await
    }

    async fn check_pairing_status(&self) -> BackendResult<bool> {
        self.record("check_pairing_status", None, |r| Ok(r.paired))
            .await
    }

    async fn save_workspace_documents(&self, files: &WorkspaceFiles) -> BackendResult<()> {
        self.record("save_workspace_documents", files.agent_id.as_deref(), |r| {
            r.documents.push(files.clone());
            Ok(())
        })
        .await
    }

    async fn create_custom_skill(&self, name: &str, _content: &str) -> BackendResult<()> {
        self.record("create_custom_skill", Some(name), |r| {
            r.custom_skills.push(name.to_string());
            Ok(())
        })
        .await
    }

    async fn run_maintenance(&self, action: MaintenanceAction) -> BackendResult<String> {
        self.record("run_maintenance", Some(action.label()), |_| {
            maintenance_report(action)
        })
        .await
    }

    async fn current_config(&self) -> BackendResult<PersistedConfig> {
        self.record("current_config", None, |r| self.current(r)).await
    }

    async fn check_remote_prerequisites(&self, target: &RemoteTarget) -> BackendResult<Prerequisites> {
        self.record("check_remote_prerequisites", Some(&target.host), |r| {
            Ok(r.prerequisites)
        })
        .await
    }

    async fn remote_agent_service_version(&self, target: &RemoteTarget) -> BackendResult<String> {
        self.record("remote_agent_service_version", Some(&target.host), |_| {
            Ok(AGENT_SERVICE_VERSION.to_string())
        })
        .await
    }

    async fn setup_remote(&self, target: &RemoteTarget, config: &CanonicalConfig) -> BackendResult<()> {
        self.record("setup_remote", Some(&target.host), |r| {
            r.prerequisites.agent_service_installed = true;
            r.applied = Some(config.clone());
            Ok(())
        })
        .await
    }

    async fn install_remote_skill(&self, _target: &RemoteTarget, name: &str) -> BackendResult<()> {
        self.record("install_remote_skill", Some(name), |_| Ok(()))
            .await
    }

    async fn generate_remote_pairing_code(&self, target: &RemoteTarget) -> BackendResult<String> {
        self.record("generate_remote_pairing_code", Some(&target.host), issue_pairing)
            .await
    }

    async fn approve_remote_pairing(&self, _target: &RemoteTarget, code: &str) -> BackendResult<()> {
        self.record("approve_remote_pairing", Some(code), |r| approve(r, code))
            .await
    }

    async fn check_remote_pairing_status(&self, target: &RemoteTarget) -> BackendResult<bool> {
        self.record("check_remote_pairing_status", Some(&target.host), |r| {
            Ok(r.paired)
        })
        .await
    }

    async fn save_remote_workspace_documents(
        &self,
        _target: &RemoteTarget,
        files: &WorkspaceFiles,
    ) -> BackendResult<()> {
        self.record(
            "save_remote_workspace_documents",
            files.agent_id.as_deref(),
            |r| {
                r.documents.push(files.clone());
                Ok(())
            },
        )
        .await
    }

    async fn create_remote_custom_skill(
        &self,
        _target: &RemoteTarget,
        name: &str,
        _content: &str,
    ) -> BackendResult<()> {
        self.record("create_remote_custom_skill", Some(name), |r| {
            r.custom_skills.push(name.to_string());
            Ok(())
        })
        .await
    }

    async fn run_remote_maintenance(
        &self,
        _target: &RemoteTarget,
        action: MaintenanceAction,
    ) -> BackendResult<String> {
        self.record("run_remote_maintenance", Some(action.label()), |_| {
            maintenance_report(action)
        })
        .await
    }

    async fn remote_current_config(&self, target: &RemoteTarget) -> BackendResult<PersistedConfig> {
        self.record("remote_current_config", Some(&target.host), |r| {
            self.current(r)
        })
        .await
    }

    async fn test_connection(&self, target: &RemoteTarget) -> BackendResult<()> {
        self.record("test_connection", Some(&target.host), |_| Ok(()))
            .await
    }

    async fn start_tunnel(&self, target: &RemoteTarget) -> BackendResult<()> {
        self.record("start_tunnel", Some(&target.host), |r| {
            if r.tunnel_running {
                return Err(BackendError::new(TUNNEL_ALREADY_RUNNING));
            }
            r.tunnel_running = true;
            Ok(())
        })
        .await
    }

    async fn stop_tunnel(&self) -> BackendResult<()> {
        self.record("stop_tunnel", None, |r| {
            r.tunnel_running = false;
            Ok(())
        })
        .await
    }

    async fn verify_tunnel_connectivity(&self, target: &RemoteTarget) -> BackendResult<bool> {
        self.record("verify_tunnel_connectivity", Some(&target.host), |r| {
            Ok(r.tunnel_running && r.tunnel_verifies)
        })
        .await
    }
}
