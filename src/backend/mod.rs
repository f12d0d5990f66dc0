//! Backend capability boundary
//!
//! Everything that touches a machine (installing packages, running the agent
//! service, SSH plumbing) sits behind [`Backend`]. Local and remote variants
//! share shapes; remote variants take the [`RemoteTarget`] by reference.

pub mod recording;

pub use recording::RecordingBackend;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::canonical::{CanonicalConfig, PersistedConfig};
use crate::wizard::RemoteTarget;

/// Failure reported by a capability call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct BackendError {
    message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// What the system check found on the target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prerequisites {
    pub runtime_present: bool,
    pub container_runtime_running: bool,
    pub agent_service_installed: bool,
}

/// Workspace documents saved outside an install run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceFiles {
    /// Roster agent the documents belong to; `None` for the main agent
    pub agent_id: Option<String>,
    pub identity: String,
    pub user: String,
    pub soul: String,
}

/// Maintenance actions offered when the agent service is already installed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MaintenanceAction {
    Repair,
    SecurityAudit,
    Update,
    Uninstall,
}

impl MaintenanceAction {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Repair => "repair",
            Self::SecurityAudit => "security audit",
            Self::Update => "update",
            Self::Uninstall => "uninstall",
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Backend: Send + Sync {
    // Local machine
    async fn check_prerequisites(&self) -> BackendResult<Prerequisites>;
    async fn agent_service_version(&self) -> BackendResult<String>;
    async fn install_agent_service(&self) -> BackendResult<()>;
    async fn configure_agent(&self, config: &CanonicalConfig) -> BackendResult<()>;
    async fn install_skill(&self, name: &str) -> BackendResult<()>;
    async fn start_agent_service(&self) -> BackendResult<()>;
    async fn generate_pairing_code(&self) -> BackendResult<String>;
    async fn dashboard_url(&self, remote: bool) -> BackendResult<String>;
    async fn approve_pairing(&self, code: &str) -> BackendResult<()>;
    async fn check_pairing_status(&self) -> BackendResult<bool>;
    async fn save_workspace_documents(&self, files: &WorkspaceFiles) -> BackendResult<()>;
    async fn create_custom_skill(&self, name: &str, content: &str) -> BackendResult<()>;
    async fn run_maintenance(&self, action: MaintenanceAction) -> BackendResult<String>;
    async fn current_config(&self) -> BackendResult<PersistedConfig>;

    // Remote host over SSH
    async fn check_remote_prerequisites(&self, target: &RemoteTarget) -> BackendResult<Prerequisites>;
    async fn remote_agent_service_version(&self, target: &RemoteTarget) -> BackendResult<String>;
    async fn setup_remote(&self, target: &RemoteTarget, config: &CanonicalConfig) -> BackendResult<()>;
    async fn install_remote_skill(&self, target: &RemoteTarget, name: &str) -> BackendResult<()>;
    async fn generate_remote_pairing_code(&self, target: &RemoteTarget) -> BackendResult<String>;
    async fn approve_remote_pairing(&self, target: &RemoteTarget, code: &str) -> BackendResult<()>;
    async fn check_remote_pairing_status(&self, target: &RemoteTarget) -> BackendResult<bool>;
    async fn save_remote_workspace_documents(
        &self,
        target: &RemoteTarget,
        files: &WorkspaceFiles,
    ) -> BackendResult<()>;
    async fn create_remote_custom_skill(
        &self,
        target: &RemoteTarget,
        name: &str,
        content: &str,
    ) -> BackendResult<()>;
    async fn run_remote_maintenance(
        &self,
        target: &RemoteTarget,
        action: MaintenanceAction,
    ) -> BackendResult<String>;
    async fn remote_current_config(&self, target: &RemoteTarget) -> BackendResult<PersistedConfig>;

    // Session and tunnel
    async fn test_connection(&self, target: &RemoteTarget) -> BackendResult<()>;
    async fn start_tunnel(&self, target: &RemoteTarget) -> BackendResult<()>;
    async fn stop_tunnel(&self) -> BackendResult<()>;
    async fn verify_tunnel_connectivity(&self, target: &RemoteTarget) -> BackendResult<bool>;
}

/// Dispatches the operations that exist in both variants to the right one
#[derive(Clone, Copy)]
pub struct Targeted<'a> {
    backend: &'a dyn Backend,
    remote: Option<&'a RemoteTarget>,
}

impl<'a> Targeted<'a> {
    pub fn new(backend: &'a dyn Backend, remote: Option<&'a RemoteTarget>) -> Self {
        Self { backend, remote }
    }

    pub fn is_remote(&self) -> bool {
        self.remote.is_some()
    }

    pub fn backend(&self) -> &'a dyn Backend {
        self.backend
    }

    pub async fn prerequisites(&self) -> BackendResult<Prerequisites> {
        match self.remote {
            Some(target) => self.backend.check_remote_prerequisites(target).await,
            None => self.backend.check_prerequisites().await,
        }
    }

    pub async fn agent_service_version(&self) -> BackendResult<String> {
        match self.remote {
            Some(target) => self.backend.remote_agent_service_version(target).await,
            None => self.backend.agent_service_version().await,
        }
    }

    pub async fn install_skill(&self, name: &str) -> BackendResult<()> {
        match self.remote {
            Some(target) => self.backend.install_remote_skill(target, name).await,
            None => self.backend.install_skill(name).await,
        }
    }

    pub async fn generate_pairing_code(&self) -> BackendResult<String> {
        match self.remote {
            Some(target) => self.backend.generate_remote_pairing_code(target).await,
            None => self.backend.generate_pairing_code().await,
        }
    }

    pub async fn dashboard_url(&self) -> BackendResult<String> {
        self.backend.dashboard_url(self.is_remote()).await
    }

    pub async fn approve_pairing(&self, code: &str) -> BackendResult<()> {
        match self.remote {
            Some(target) => self.backend.approve_remote_pairing(target, code).await,
            None => self.backend.approve_pairing(code).await,
        }
    }

    pub async fn pairing_status(&self) -> BackendResult<bool> {
        match self.remote {
            Some(target) => self.backend.check_remote_pairing_status(target).await,
            None => self.backend.check_pairing_status().await,
        }
    }

    pub async fn save_workspace_documents(&self, files: &WorkspaceFiles) -> BackendResult<()> {
        match self.remote {
            Some(target) => {
                self.backend
                    .save_remote_workspace_documents(target, files)
                    .await
            }
            None => self.backend.save_workspace_documents(files).await,
        }
    }

    pub async fn create_custom_skill(&self, name: &str, content: &str) -> BackendResult<()> {
        match self.remote {
            Some(target) => {
                self.backend
                    .create_remote_custom_skill(target, name, content)
                    .await
            }
            None => self.backend.create_custom_skill(name, content).await,
        }
    }

    pub async fn maintenance(&self, action: MaintenanceAction) -> BackendResult<String> {
        match self.remote {
            Some(target) => self.backend.run_remote_maintenance(target, action).await,
            None => self.backend.run_maintenance(action).await,
        }
    }

    pub async fn current_config(&self) -> BackendResult<PersistedConfig> {
        match self.remote {
            Some(target) => self.backend.remote_current_config(target).await,
            None => self.backend.current_config().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_targeted_dispatches_local() {
        let mut mock = MockBackend::new();
        mock.expect_check_pairing_status().times(1).returning(|| Ok(true));
        mock.expect_check_remote_pairing_status().never();

        let targeted = Targeted::new(&mock, None);
        assert!(!targeted.is_remote());
        assert_eq!(targeted.pairing_status().await, Ok(true));
    }

    #[tokio::test]
    async fn test_targeted_dispatches_remote() {
        let mut mock = MockBackend::new();
        mock.expect_install_skill().never();
        mock.expect_install_remote_skill()
            .withf(|target, name| target.host == "10.0.0.5" && name == "github")
            .times(1)
            .returning(|_, _| Ok(()));
        mock.expect_dashboard_url()
            .withf(|remote| *remote)
            .returning(|_| Ok("http://127.0.0.1:18789/?token=abc".to_string()));

        let target = RemoteTarget::new("10.0.0.5", "ubuntu");
        let targeted = Targeted::new(&mock, Some(&target));
        tokio_test::assert_ok!(targeted.install_skill("github").await);
        assert!(targeted.dashboard_url().await.unwrap().contains("token=abc"));
    }

    #[test]
    fn test_backend_error_display() {
        let err = BackendError::new("Permission denied (publickey)");
        assert_eq!(err.to_string(), "Permission denied (publickey)");
        assert_eq!(err.message(), "Permission denied (publickey)");
    }
}
