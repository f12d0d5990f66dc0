//! Remote session lifecycle
//!
//! `idle -> testing -> {connected | idle with error}`, and once connected the
//! tunnel toggles between inactive and active. The tunnel is one process-wide
//! resource; every start and stop goes through a single lock, so two entry
//! points cannot race each other into the backend.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

use crate::backend::Backend;
use crate::config::RemoteConfig;
use crate::error::{DeckhandError, Result};
use crate::remote::classify::classify;
use crate::wizard::RemoteTarget;

/// Backend message for a tunnel that is already up
const ALREADY_RUNNING: &str = "already running";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelState {
    Inactive,
    Active,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle { last_error: Option<String> },
    Testing,
    Connected { tunnel: TunnelState },
}

impl SessionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    pub fn tunnel_active(&self) -> bool {
        matches!(
            self,
            Self::Connected {
                tunnel: TunnelState::Active
            }
        )
    }
}

/// How a tunnel start settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelStart {
    Started,
    AlreadyRunning,
}

pub struct RemoteSessionManager {
    backend: Arc<dyn Backend>,
    connect_timeout: Duration,
    state: RwLock<SessionState>,
    tunnel: Mutex<()>,
}

impl RemoteSessionManager {
    pub fn new(backend: Arc<dyn Backend>, connect_timeout: Duration) -> Self {
        Self {
            backend,
            connect_timeout,
            state: RwLock::new(SessionState::Idle { last_error: None }),
            tunnel: Mutex::new(()),
        }
    }

    pub fn from_config(backend: Arc<dyn Backend>, config: &RemoteConfig) -> Self {
        Self::new(backend, config.connect_timeout())
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    async fn set_state(&self, state: SessionState) {
        *self.state.write().await = state;
    }

    async fn fail(&self, error: DeckhandError) -> DeckhandError {
        self.set_state(SessionState::Idle {
            last_error: Some(error.to_string()),
        })
        .await;
        error
    }

    /// Check that the target accepts an SSH session.
    ///
    /// The check races the connect timeout; a check that has not settled when
    /// the bound elapses is reported as a timeout whatever it does afterwards.
    pub async fn test_connection(&self, target: &RemoteTarget) -> Result<()> {
        if !target.is_complete() {
            return Err(DeckhandError::validation(
                "Please provide IP address and username",
            ));
        }

        self.set_state(SessionState::Testing).await;
        tracing::info!("Testing SSH connection to {}@{}", target.user, target.host);

        match tokio::time::timeout(self.connect_timeout, self.backend.test_connection(target)).await
        {
            Err(_) => {
                tracing::warn!(
                    "SSH connection test timed out after {:?}",
                    self.connect_timeout
                );
                Err(self.fail(DeckhandError::Timeout(self.connect_timeout)).await)
            }
            Ok(Err(e)) => {
                tracing::warn!("SSH connection test failed: {}", e);
                Err(self
                    .fail(DeckhandError::Connectivity(classify(e.message())))
                    .await)
            }
            Ok(Ok(())) => {
                tracing::info!("SSH connection established");
                self.set_state(SessionState::Connected {
                    tunnel: TunnelState::Inactive,
                })
                .await;
                Ok(())
            }
        }
    }

    /// Start the tunnel; a tunnel that is already running counts as started
    pub async fn start_tunnel(&self, target: &RemoteTarget) -> Result<TunnelStart> {
        let _guard = self.tunnel.lock().await;

        let outcome = match self.backend.start_tunnel(target).await {
            Ok(()) => TunnelStart::Started,
            Err(e) if e.message().contains(ALREADY_RUNNING) => {
                tracing::info!("Tunnel already active.");
                TunnelStart::AlreadyRunning
            }
            Err(e) => {
                tracing::error!("Failed to start SSH tunnel: {}", e);
                return Err(DeckhandError::Connectivity(classify(e.message())));
            }
        };

        self.set_state(SessionState::Connected {
            tunnel: TunnelState::Active,
        })
        .await;
        Ok(outcome)
    }

    pub async fn stop_tunnel(&self) -> Result<()> {
        let _guard = self.tunnel.lock().await;
        self.backend.stop_tunnel().await?;
        self.mark_tunnel_inactive().await;
        tracing::info!("SSH tunnel stopped");
        Ok(())
    }

    async fn mark_tunnel_inactive(&self) {
        let mut state = self.state.write().await;
        if state.is_connected() {
            *state = SessionState::Connected {
                tunnel: TunnelState::Inactive,
            };
        }
    }

    /// Confirm the tunnel actually forwards to the agent service.
    ///
    /// A definite "no" means the remote backend predates tunnel verification.
    pub async fn verify_tunnel(&self, target: &RemoteTarget) -> Result<()> {
        match self.backend.verify_tunnel_connectivity(target).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                tracing::error!("Tunnel verification returned a definite negative");
                self.mark_tunnel_inactive().await;
                Err(DeckhandError::StaleBackend)
            }
            Err(e) => {
                self.mark_tunnel_inactive().await;
                Err(DeckhandError::fatal("Tunnel verification", e.message()))
            }
        }
    }

    /// Quick action: connect if needed, then bring the tunnel up
    pub async fn ensure_tunnel(&self, target: &RemoteTarget) -> Result<TunnelStart> {
        if !self.state().await.is_connected() {
            self.test_connection(target).await?;
        }
        self.start_tunnel(target).await
    }

    /// Toggle action: stop an active tunnel, start an inactive one
    pub async fn toggle_tunnel(&self, target: &RemoteTarget) -> Result<TunnelState> {
        if self.state().await.tunnel_active() {
            self.stop_tunnel().await?;
            Ok(TunnelState::Inactive)
        } else {
            self.ensure_tunnel(target).await?;
            Ok(TunnelState::Active)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, MockBackend, RecordingBackend};
    use crate::remote::IssueKind;

    fn target() -> RemoteTarget {
        RemoteTarget::new("10.0.0.5", "ubuntu")
    }

    fn manager(backend: impl Backend + 'static) -> RemoteSessionManager {
        RemoteSessionManager::new(Arc::new(backend), Duration::from_secs(15))
    }

    #[tokio::test]
    async fn test_incomplete_target_rejected_before_any_call() {
        let mut mock = MockBackend::new();
        mock.expect_test_connection().never();
        let session = manager(mock);

        let err = session
            .test_connection(&RemoteTarget::new("10.0.0.5", ""))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Please provide IP address and username");
        assert_eq!(session.state().await, SessionState::Idle { last_error: None });
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_wins_over_hanging_check() {
        let session = manager(RecordingBackend::new().hang_on("test_connection"));
        let start = tokio::time::Instant::now();

        let err = session.test_connection(&target()).await.unwrap_err();
        assert_eq!(err, DeckhandError::Timeout(Duration::from_secs(15)));
        assert_eq!(start.elapsed(), Duration::from_secs(15));
        assert!(matches!(
            session.state().await,
            SessionState::Idle { last_error: Some(_) }
        ));
    }

    #[tokio::test]
    async fn test_backend_error_is_classified() {
        let mut mock = MockBackend::new();
        mock.expect_test_connection()
            .times(1)
            .returning(|_| Err(BackendError::new("ubuntu@10.0.0.5: Permission denied (publickey).")));
        let session = manager(mock);

        let err = session.test_connection(&target()).await.unwrap_err();
        match err {
            DeckhandError::Connectivity(issue) => assert_eq!(issue.kind, IssueKind::PublicKeyFailed),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_successful_connection() {
        let session = manager(RecordingBackend::new());
        tokio_test::assert_ok!(session.test_connection(&target()).await);
        assert_eq!(
            session.state().await,
            SessionState::Connected {
                tunnel: TunnelState::Inactive
            }
        );
    }

    #[tokio::test]
    async fn test_tunnel_start_is_idempotent() {
        let session = manager(RecordingBackend::new());
        assert_eq!(session.start_tunnel(&target()).await, Ok(TunnelStart::Started));
        assert_eq!(
            session.start_tunnel(&target()).await,
            Ok(TunnelStart::AlreadyRunning)
        );
        assert!(session.state().await.tunnel_active());
    }

    #[tokio::test]
    async fn test_tunnel_start_failure_is_classified() {
        let mut mock = MockBackend::new();
        mock.expect_start_tunnel()
            .returning(|_| Err(BackendError::new("connect: Connection refused")));
        let session = manager(mock);
        let err = session.start_tunnel(&target()).await.unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::Connectivity);
    }

    #[tokio::test]
    async fn test_definite_negative_verification_is_stale_backend() {
        let session = manager(RecordingBackend::new().with_stale_tunnel());
        session.start_tunnel(&target()).await.unwrap();
        assert_eq!(
            session.verify_tunnel(&target()).await,
            Err(DeckhandError::StaleBackend)
        );
        assert!(!session.state().await.tunnel_active());
    }

    #[tokio::test]
    async fn test_verification_error_is_fatal() {
        let mut mock = MockBackend::new();
        mock.expect_verify_tunnel_connectivity()
            .returning(|_| Err(BackendError::new("HTTP Error: Status 502")));
        let session = manager(mock);
        let err = session.verify_tunnel(&target()).await.unwrap_err();
        assert!(err.code().is_fatal());
        assert_eq!(err.to_string(), "Tunnel verification failed: HTTP Error: Status 502");
    }

    #[tokio::test]
    async fn test_toggle_and_quick_action() {
        let backend = Arc::new(RecordingBackend::new());
        let session = RemoteSessionManager::new(backend.clone(), Duration::from_secs(15));

        assert_eq!(session.toggle_tunnel(&target()).await, Ok(TunnelState::Active));
        assert!(backend.tunnel_running().await);
        assert_eq!(session.toggle_tunnel(&target()).await, Ok(TunnelState::Inactive));
        assert!(!backend.tunnel_running().await);

        assert_eq!(
            backend.calls().await,
            vec![
                "test_connection:10.0.0.5",
                "start_tunnel:10.0.0.5",
                "stop_tunnel"
            ]
        );
    }

    #[tokio::test]
    async fn test_concurrent_starts_are_serialized() {
        let backend = Arc::new(RecordingBackend::new());
        let session = Arc::new(RemoteSessionManager::new(
            backend.clone(),
            Duration::from_secs(15),
        ));
        let t = target();

        let (a, b) = tokio::join!(session.start_tunnel(&t), session.start_tunnel(&t));
        let mut outcomes = vec![a.unwrap(), b.unwrap()];
        outcomes.sort_by_key(|o| *o == TunnelStart::AlreadyRunning);
        assert_eq!(outcomes, vec![TunnelStart::Started, TunnelStart::AlreadyRunning]);
    }
}
