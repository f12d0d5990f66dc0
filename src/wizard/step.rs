//! Step identifiers and the ordering table
//!
//! Steps are an explicit enumeration. Their logical order comes from
//! [`STEP_ORDER`], never from the enum discriminant, so a new step can be
//! spliced in by editing the table and bumping [`STEP_ORDER_VERSION`].

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Bumped whenever [`STEP_ORDER`] changes shape
pub const STEP_ORDER_VERSION: u32 = 1;

/// Logical order of every step
pub const STEP_ORDER: [StepId; 20] = [
    StepId::SystemState,
    StepId::Welcome,
    StepId::Environment,
    StepId::SystemCheck,
    StepId::Security,
    StepId::Identity,
    StepId::Agent,
    StepId::AgentType,
    StepId::PresetConfig,
    StepId::Brain,
    StepId::Channels,
    StepId::Personality,
    StepId::Models,
    StepId::Skills,
    StepId::AllowedTools,
    StepId::Business,
    StepId::Agents,
    StepId::ExtraSettings,
    StepId::Review,
    StepId::Pairing,
];

/// Steps suppressed once the operator has bypassed entry-level configuration
pub const SKIP_BASIC_EXCLUDED: [StepId; 2] = [StepId::Brain, StepId::Channels];

/// A wizard step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    /// Maintenance menu shown when the agent service is already installed
    SystemState,
    Welcome,
    Environment,
    SystemCheck,
    Security,
    Identity,
    Agent,
    AgentType,
    PresetConfig,
    Brain,
    Channels,
    Personality,
    Models,
    Skills,
    AllowedTools,
    Business,
    /// Per-agent configuration loop over the roster
    Agents,
    ExtraSettings,
    Review,
    Pairing,
}

/// When a step appears in the progress list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Shown,
    Hidden,
    /// Only when the selected agent type is a preset
    PresetOnly,
    /// Only when the selected agent type is custom
    CustomOnly,
}

/// Static description of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepDef {
    pub id: StepId,
    pub title: &'static str,
    pub advanced_only: bool,
    pub visibility: Visibility,
}

impl StepDef {
    pub fn is_hidden(&self, preset: bool) -> bool {
        match self.visibility {
            Visibility::Shown => false,
            Visibility::Hidden => true,
            Visibility::PresetOnly => !preset,
            Visibility::CustomOnly => preset,
        }
    }
}

impl StepId {
    /// Position in [`STEP_ORDER`]
    pub fn rank(&self) -> usize {
        STEP_ORDER
            .iter()
            .position(|step| step == self)
            .unwrap_or(STEP_ORDER.len())
    }

    pub fn title(&self) -> &'static str {
        self.definition().title
    }

    pub fn definition(&self) -> StepDef {
        let (title, advanced_only, visibility) = match self {
            Self::SystemState => ("System State", false, Visibility::Hidden),
            Self::Welcome => ("Welcome", false, Visibility::Hidden),
            Self::Environment => ("Environment", false, Visibility::Shown),
            Self::SystemCheck => ("System Check", false, Visibility::Shown),
            Self::Security => ("Security", false, Visibility::Shown),
            Self::Identity => ("Identity", false, Visibility::Shown),
            Self::Agent => ("Agent", false, Visibility::Shown),
            Self::AgentType => ("Type", false, Visibility::Shown),
            Self::PresetConfig => ("Config", false, Visibility::PresetOnly),
            Self::Brain => ("Brain", false, Visibility::CustomOnly),
            Self::Channels => ("Channels", false, Visibility::Shown),
            Self::Personality => ("Personality", true, Visibility::Shown),
            Self::Models => ("Models", true, Visibility::CustomOnly),
            Self::Skills => ("Skills", true, Visibility::CustomOnly),
            Self::AllowedTools => ("Allowed Tools", true, Visibility::CustomOnly),
            Self::Business => ("Business", true, Visibility::Shown),
            Self::Agents => ("Agents", true, Visibility::Hidden),
            Self::ExtraSettings => ("Extra Settings", true, Visibility::Shown),
            Self::Review => ("Review", false, Visibility::Shown),
            Self::Pairing => ("Pairing", false, Visibility::Shown),
        };
        StepDef {
            id: *self,
            title,
            advanced_only,
            visibility,
        }
    }
}

impl PartialOrd for StepId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StepId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_order_table_is_complete_and_unique() {
        let unique: HashSet<_> = STEP_ORDER.iter().collect();
        assert_eq!(unique.len(), STEP_ORDER.len());
        for (i, step) in STEP_ORDER.iter().enumerate() {
            assert_eq!(step.rank(), i);
        }
    }

    #[test]
    fn test_ordering_follows_table_not_declaration() {
        assert!(StepId::Models < StepId::Skills);
        assert!(StepId::Skills < StepId::AllowedTools);
        assert!(StepId::Personality < StepId::Models);
        assert!(StepId::SystemState < StepId::Welcome);
        assert_eq!(STEP_ORDER.iter().max(), Some(&StepId::Pairing));
    }

    #[test]
    fn test_visibility_rules() {
        assert!(StepId::PresetConfig.definition().is_hidden(false));
        assert!(!StepId::PresetConfig.definition().is_hidden(true));
        assert!(StepId::Brain.definition().is_hidden(true));
        assert!(!StepId::Brain.definition().is_hidden(false));
        assert!(StepId::Agents.definition().is_hidden(false));
        assert!(StepId::Agents.definition().is_hidden(true));
        assert!(StepId::Business.definition().advanced_only);
        assert!(!StepId::Review.definition().advanced_only);
    }

    #[test]
    fn test_step_serde_names() {
        let json = serde_json::to_string(&StepId::AllowedTools).unwrap();
        assert_eq!(json, "\"allowed_tools\"");
        let parsed: StepId = serde_json::from_str("\"extra_settings\"").unwrap();
        assert_eq!(parsed, StepId::ExtraSettings);
    }
}
