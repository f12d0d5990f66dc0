//! SSH error classification
//!
//! Raw connection and tunnel errors are matched against an ordered pattern
//! table and rewritten as short operator-facing sentences. The first matching
//! rule wins, so specific patterns sit before the generic ones they contain.

use std::fmt;

use crate::utils::truncate_str;

/// Longest raw first line shown as-is
const MAX_RAW_LEN: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueKind {
    AgentHasNoKeys,
    AllMethodsFailed,
    PublicKeyFailed,
    PasswordFailed,
    PermissionDenied,
    ConnectionRefused,
    TimedOut,
    NoRoute,
    NetworkUnreachable,
    CannotReach,
    HandshakeFailed,
    KeyFileNotFound,
    InvalidKeyFormat,
    /// No rule matched; the message is the raw first line
    Unrecognized,
}

impl IssueKind {
    /// Authentication problems, as opposed to reachability ones
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            Self::AgentHasNoKeys
                | Self::AllMethodsFailed
                | Self::PublicKeyFailed
                | Self::PasswordFailed
                | Self::PermissionDenied
        )
    }
}

struct Rule {
    kind: IssueKind,
    needles: &'static [&'static str],
    message: &'static str,
}

const RULES: &[Rule] = &[
    Rule {
        kind: IssueKind::AgentHasNoKeys,
        needles: &["no identities found in the ssh agent"],
        message: "SSH agent has no keys loaded. Try using a password or specifying a key file.",
    },
    Rule {
        kind: IssueKind::AllMethodsFailed,
        needles: &["all authentication methods failed", "ssh authentication failed"],
        message: "Authentication failed. Please check your username, password, or SSH key.",
    },
    Rule {
        kind: IssueKind::PublicKeyFailed,
        needles: &["public key auth failed", "publickey"],
        message: "SSH key authentication failed. Check that your key is correct and has proper permissions.",
    },
    Rule {
        kind: IssueKind::PasswordFailed,
        needles: &["password auth failed", "authentication failed"],
        message: "Password authentication failed. Please check your password.",
    },
    Rule {
        kind: IssueKind::PermissionDenied,
        needles: &["permission denied"],
        message: "Permission denied. Check your username and authentication credentials.",
    },
    Rule {
        kind: IssueKind::ConnectionRefused,
        needles: &["connection refused"],
        message: "Connection refused. Check that SSH is running on the server (port 22).",
    },
    Rule {
        kind: IssueKind::TimedOut,
        needles: &["connection timed out", "timeout"],
        message: "Connection timed out. Check the IP address and network connectivity.",
    },
    Rule {
        kind: IssueKind::NoRoute,
        needles: &["no route to host"],
        message: "Cannot reach the server. Check the IP address and network settings.",
    },
    Rule {
        kind: IssueKind::NetworkUnreachable,
        needles: &["network is unreachable"],
        message: "Network unreachable. Check your internet connection.",
    },
    Rule {
        kind: IssueKind::CannotReach,
        needles: &["cannot reach"],
        message: "Cannot connect to the server. Check the IP address and port.",
    },
    Rule {
        kind: IssueKind::HandshakeFailed,
        needles: &["handshake failed"],
        message: "SSH handshake failed. The server may not support SSH protocol.",
    },
    Rule {
        kind: IssueKind::KeyFileNotFound,
        needles: &["no such file", "file not found"],
        message: "SSH key file not found. Check the file path.",
    },
    Rule {
        kind: IssueKind::InvalidKeyFormat,
        needles: &["invalid format", "bad key"],
        message: "Invalid SSH key format. Ensure the key file is a valid private key.",
    },
];

/// A classified connectivity failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectivityIssue {
    pub kind: IssueKind,
    pub message: String,
}

impl fmt::Display for ConnectivityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Rewrite a raw SSH error for the operator
pub fn classify(raw: &str) -> ConnectivityIssue {
    let lower = raw.to_lowercase();
    if let Some(rule) = RULES
        .iter()
        .find(|rule| rule.needles.iter().any(|needle| lower.contains(needle)))
    {
        tracing::debug!("Classified SSH error as {:?}", rule.kind);
        return ConnectivityIssue {
            kind: rule.kind,
            message: rule.message.to_string(),
        };
    }

    ConnectivityIssue {
        kind: IssueKind::Unrecognized,
        message: first_line(raw),
    }
}

/// First line of a raw error, without `Error: ` prefixes, shortened when long
fn first_line(raw: &str) -> String {
    let line = raw.lines().next().unwrap_or_default();
    let line = line.replace("Error: ", "");
    let line = line.trim();
    if line.len() > MAX_RAW_LEN {
        format!("{}...", truncate_str(line, MAX_RAW_LEN).trim_end())
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("sign_and_send_pubkey: no identities found in the SSH agent", IssueKind::AgentHasNoKeys)]
    #[case("All authentication methods failed", IssueKind::AllMethodsFailed)]
    #[case("SSH authentication failed for user", IssueKind::AllMethodsFailed)]
    #[case("Public key auth failed", IssueKind::PublicKeyFailed)]
    #[case("ubuntu@10.0.0.5: Permission denied (publickey).", IssueKind::PublicKeyFailed)]
    #[case("Password auth failed", IssueKind::PasswordFailed)]
    #[case("Authentication failed", IssueKind::PasswordFailed)]
    #[case("Permission denied, please try again.", IssueKind::PermissionDenied)]
    #[case("ssh: connect to host 10.0.0.5 port 22: Connection refused", IssueKind::ConnectionRefused)]
    #[case("ssh: connect to host 10.0.0.5 port 22: Connection timed out", IssueKind::TimedOut)]
    #[case("operation timeout", IssueKind::TimedOut)]
    #[case("connect to host: No route to host", IssueKind::NoRoute)]
    #[case("connect: Network is unreachable", IssueKind::NetworkUnreachable)]
    #[case("Cannot reach 10.0.0.5:22", IssueKind::CannotReach)]
    #[case("kex_exchange_identification: handshake failed", IssueKind::HandshakeFailed)]
    #[case("Warning: Identity file ~/.ssh/id_x: No such file or directory", IssueKind::KeyFileNotFound)]
    #[case("key file not found", IssueKind::KeyFileNotFound)]
    #[case("Load key \"id_rsa\": invalid format", IssueKind::InvalidKeyFormat)]
    #[case("bad key", IssueKind::InvalidKeyFormat)]
    fn test_each_pattern(#[case] raw: &str, #[case] kind: IssueKind) {
        assert_eq!(classify(raw).kind, kind);
    }

    #[test]
    fn test_specific_rule_wins_over_generic() {
        let issue = classify("Permission denied: public key auth failed");
        assert_eq!(issue.kind, IssueKind::PublicKeyFailed);
        assert_eq!(
            issue.to_string(),
            "SSH key authentication failed. Check that your key is correct and has proper permissions."
        );

        // "ssh authentication failed" contains "authentication failed"
        assert_eq!(
            classify("SSH authentication failed").kind,
            IssueKind::AllMethodsFailed
        );
        assert!(classify("All authentication methods failed").kind.is_authentication());
    }

    #[test]
    fn test_unrecognized_shows_first_line() {
        let issue = classify("Error: host key verification mismatch\nsecond line");
        assert_eq!(issue.kind, IssueKind::Unrecognized);
        assert_eq!(issue.message, "host key verification mismatch");
    }

    #[test]
    fn test_long_unrecognized_line_truncated() {
        let raw = "x".repeat(150);
        let message = classify(&raw).message;
        assert_eq!(message, format!("{}...", "x".repeat(100)));
    }

    #[test]
    fn test_empty_message() {
        assert_eq!(classify("").message, "");
    }
}
