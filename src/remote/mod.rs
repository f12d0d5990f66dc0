//! Remote host support: SSH error classification and the session/tunnel lifecycle

pub mod classify;
pub mod session;

pub use classify::{ConnectivityIssue, IssueKind, classify};
pub use session::{RemoteSessionManager, SessionState, TunnelStart, TunnelState};
