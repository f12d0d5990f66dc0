//! Sandbox vocabulary
//!
//! Operators pick `full`, `partial` or `none`; the agent service stores
//! `all`, `non-main` or `off`. Both directions are fixed and total.

use serde::{Deserialize, Serialize};

pub const POLICY_ALL: &str = "all";
pub const POLICY_NON_MAIN: &str = "non-main";
pub const POLICY_OFF: &str = "off";

/// Operator-facing sandbox choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SandboxMode {
    Full,
    Partial,
    #[default]
    None,
}

impl SandboxMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Partial => "partial",
            Self::None => "none",
        }
    }

    /// Unknown operator values are treated as `none`
    pub fn parse(value: &str) -> Self {
        match value {
            "full" => Self::Full,
            "partial" => Self::Partial,
            _ => Self::None,
        }
    }

    /// Backend vocabulary for this mode
    pub fn policy(&self) -> &'static str {
        match self {
            Self::Full => POLICY_ALL,
            Self::Partial => POLICY_NON_MAIN,
            Self::None => POLICY_OFF,
        }
    }

    /// Inverse of [`SandboxMode::policy`]; anything unrecognised reads back as `none`
    pub fn from_policy(policy: &str) -> Self {
        match policy {
            POLICY_ALL => Self::Full,
            POLICY_NON_MAIN => Self::Partial,
            _ => Self::None,
        }
    }
}

/// Translate an operator value straight to backend vocabulary
pub fn normalize(operator_value: &str) -> &'static str {
    SandboxMode::parse(operator_value).policy()
}

/// Translate a backend value straight to operator vocabulary
pub fn inverse_normalize(policy: &str) -> &'static str {
    SandboxMode::from_policy(policy).as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("full", "all")]
    #[case("partial", "non-main")]
    #[case("none", "off")]
    #[case("FULL", "off")]
    #[case("", "off")]
    fn test_normalize(#[case] operator: &str, #[case] policy: &str) {
        assert_eq!(normalize(operator), policy);
    }

    #[rstest]
    #[case("all", "full")]
    #[case("non-main", "partial")]
    #[case("off", "none")]
    #[case("sandboxed", "none")]
    fn test_inverse_normalize(#[case] policy: &str, #[case] operator: &str) {
        assert_eq!(inverse_normalize(policy), operator);
    }

    #[rstest]
    #[case("full")]
    #[case("partial")]
    #[case("none")]
    fn test_operator_round_trip(#[case] x: &str) {
        assert_eq!(inverse_normalize(normalize(x)), x);
    }

    #[rstest]
    #[case("all")]
    #[case("non-main")]
    #[case("off")]
    fn test_policy_round_trip(#[case] y: &str) {
        assert_eq!(normalize(inverse_normalize(y)), y);
    }

    proptest! {
        #[test]
        fn prop_normalize_is_total_and_stable(s in ".*") {
            let policy = normalize(&s);
            prop_assert!([POLICY_ALL, POLICY_NON_MAIN, POLICY_OFF].contains(&policy));
            prop_assert_eq!(normalize(inverse_normalize(policy)), policy);
        }
    }
}
