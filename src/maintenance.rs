//! Post-install operations
//!
//! Maintenance actions against an installed agent service, pairing approval,
//! workspace document saves and custom skills. Each works the same way for a
//! local or remote target through [`Targeted`].

use crate::backend::{BackendError, MaintenanceAction, Targeted, WorkspaceFiles};
use crate::error::{DeckhandError, Result};

/// Backend message for a pairing code nobody asked for
const NO_PENDING_REQUEST: &str = "no pending pairing request found";

/// Outcome of one maintenance action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub action: MaintenanceAction,
    pub succeeded: bool,
    /// One-line status for the operator
    pub status: String,
    pub log: String,
}

fn success_status(action: MaintenanceAction, remote: bool) -> &'static str {
    match (action, remote) {
        (MaintenanceAction::Repair, _) => "Repair completed successfully.",
        (MaintenanceAction::SecurityAudit, _) => "Security Audit completed successfully.",
        (MaintenanceAction::Update, false) => "Agent service updated.",
        (MaintenanceAction::Update, true) => "Remote agent service updated.",
        (MaintenanceAction::Uninstall, _) => "Uninstall completed successfully.",
    }
}

/// Run a maintenance action. A local update reinstalls the agent service.
pub async fn run_maintenance(targeted: Targeted<'_>, action: MaintenanceAction) -> MaintenanceReport {
    let mut log = format!("Starting maintenance: {}...\n", action.label());
    tracing::info!("Running maintenance: {}", action.label());

    let outcome: std::result::Result<String, BackendError> =
        if action == MaintenanceAction::Update && !targeted.is_remote() {
            targeted
                .backend()
                .install_agent_service()
                .await
                .map(|()| String::new())
        } else {
            targeted.maintenance(action).await
        };

    match outcome {
        Ok(output) => {
            log.push_str(&output);
            MaintenanceReport {
                action,
                succeeded: true,
                status: success_status(action, targeted.is_remote()).to_string(),
                log,
            }
        }
        Err(e) => {
            tracing::error!("Maintenance {} failed: {}", action.label(), e);
            log.push_str(&format!("\nError: {e}"));
            MaintenanceReport {
                action,
                succeeded: false,
                status: format!("{} failed.", action.label()),
                log,
            }
        }
    }
}

/// Approve a pairing request by its code
pub async fn approve_pairing(targeted: Targeted<'_>, code: &str) -> Result<()> {
    let code = code.trim();
    if code.is_empty() {
        return Err(DeckhandError::validation("Please enter the pairing code"));
    }
    match targeted.approve_pairing(code).await {
        Ok(()) => {
            tracing::info!("Pairing approved");
            Ok(())
        }
        Err(e) if e.message().to_lowercase().contains(NO_PENDING_REQUEST) => Err(
            DeckhandError::validation("Invalid pairing code. Please check and try again."),
        ),
        Err(e) => Err(e.into()),
    }
}

pub async fn save_documents(targeted: Targeted<'_>, files: &WorkspaceFiles) -> Result<()> {
    targeted.save_workspace_documents(files).await?;
    tracing::info!(
        "Saved workspace documents for {}",
        files.agent_id.as_deref().unwrap_or("main agent")
    );
    Ok(())
}

pub async fn create_custom_skill(targeted: Targeted<'_>, name: &str, content: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DeckhandError::validation("Please enter a skill name"));
    }
    targeted.create_custom_skill(name, content).await?;
    tracing::info!("Created custom skill {}", name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Backend, MockBackend, RecordingBackend};
    use crate::error::ErrorCode;
    use crate::wizard::RemoteTarget;
    use rstest::rstest;

    #[rstest]
    #[case(MaintenanceAction::Repair, "Repair completed successfully.")]
    #[case(MaintenanceAction::SecurityAudit, "Security Audit completed successfully.")]
    #[case(MaintenanceAction::Uninstall, "Uninstall completed successfully.")]
    #[tokio::test]
    async fn test_local_actions(#[case] action: MaintenanceAction, #[case] status: &str) {
        let backend = RecordingBackend::new();
        let report = run_maintenance(Targeted::new(&backend, None), action).await;
        assert!(report.succeeded);
        assert_eq!(report.status, status);
        assert!(report.log.starts_with(&format!("Starting maintenance: {}...\n", action.label())));
    }

    #[tokio::test]
    async fn test_local_update_reinstalls() {
        let backend = RecordingBackend::new();
        let report = run_maintenance(Targeted::new(&backend, None), MaintenanceAction::Update).await;
        assert_eq!(report.status, "Agent service updated.");
        assert_eq!(backend.calls().await, vec!["install_agent_service"]);
    }

    #[tokio::test]
    async fn test_remote_update_uses_remote_capability() {
        let backend = RecordingBackend::new();
        let target = RemoteTarget::new("10.0.0.5", "ubuntu");
        let report =
            run_maintenance(Targeted::new(&backend, Some(&target)), MaintenanceAction::Update).await;
        assert_eq!(report.status, "Remote agent service updated.");
        assert_eq!(backend.calls().await, vec!["run_remote_maintenance:update"]);
    }

    #[tokio::test]
    async fn test_failed_action_reports_error() {
        let mut mock = MockBackend::new();
        mock.expect_run_maintenance()
            .returning(|_| Err(BackendError::new("doctor exited with status 1")));
        let report = run_maintenance(Targeted::new(&mock, None), MaintenanceAction::Repair).await;
        assert!(!report.succeeded);
        assert_eq!(report.status, "repair failed.");
        assert!(report.log.ends_with("\nError: doctor exited with status 1"));
    }

    #[tokio::test]
    async fn test_pairing_validation_and_rewrite() {
        let backend = RecordingBackend::new();
        let targeted = Targeted::new(&backend, None);

        let err = approve_pairing(targeted, "  ").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Validation);
        assert!(backend.calls().await.is_empty());

        let err = approve_pairing(targeted, "WRONG123").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid pairing code. Please check and try again.");

        let code = backend.generate_pairing_code().await.unwrap();
        tokio_test::assert_ok!(approve_pairing(targeted, &code).await);
    }

    #[tokio::test]
    async fn test_custom_skill_requires_name() {
        let backend = RecordingBackend::new();
        let targeted = Targeted::new(&backend, None);
        assert!(create_custom_skill(targeted, "", "# Skill").await.is_err());
        create_custom_skill(targeted, "weather", "# Weather").await.unwrap();
        assert_eq!(backend.custom_skills().await, vec!["weather"]);
    }

    #[tokio::test]
    async fn test_save_documents_for_agent() {
        let backend = RecordingBackend::new();
        let files = WorkspaceFiles {
            agent_id: Some("code-review".to_string()),
            identity: "# IDENTITY.md".to_string(),
            ..WorkspaceFiles::default()
        };
        save_documents(Targeted::new(&backend, None), &files).await.unwrap();
        assert_eq!(backend.saved_documents().await, vec![files]);
        assert_eq!(backend.calls().await, vec!["save_workspace_documents:code-review"]);
    }
}
