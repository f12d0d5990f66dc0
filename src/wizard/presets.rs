//! Built-in agent-type and business-function presets

use serde::{Deserialize, Serialize};

use crate::canonical::SandboxMode;

/// Selected agent type; anything but `Custom` is a preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentTypeId {
    #[default]
    Custom,
    CodingAssistant,
    OfficeAssistant,
    TravelPlanner,
}

impl AgentTypeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Custom => "custom",
            Self::CodingAssistant => "coding-assistant",
            Self::OfficeAssistant => "office-assistant",
            Self::TravelPlanner => "travel-planner",
        }
    }

    /// Unknown names fall back to `Custom`
    pub fn parse(name: &str) -> Self {
        match name {
            "coding-assistant" => Self::CodingAssistant,
            "office-assistant" => Self::OfficeAssistant,
            "travel-planner" => Self::TravelPlanner,
            _ => Self::Custom,
        }
    }

    pub fn is_preset(&self) -> bool {
        *self != Self::Custom
    }

    pub fn preset(&self) -> Option<&'static AgentTypePreset> {
        AGENT_TYPE_PRESETS.iter().find(|p| p.id == *self)
    }
}

pub struct AgentTypePreset {
    pub id: AgentTypeId,
    pub name: &'static str,
    pub emoji: &'static str,
    pub description: &'static str,
    pub provider: &'static str,
    pub model: &'static str,
    pub fallback_models: &'static [&'static str],
    pub skills: &'static [&'static str],
    pub sandbox_mode: SandboxMode,
    pub tools_mode: &'static str,
    pub allowed_tools: &'static [&'static str],
    pub heartbeat_mode: &'static str,
    pub idle_timeout_ms: u64,
    pub enable_fallbacks: bool,
    pub identity_md: &'static str,
    pub soul_md: &'static str,
    pub tools_md: &'static str,
    pub agents_md: &'static str,
    pub heartbeat_md: &'static str,
    pub memory_md: &'static str,
    pub memory_enabled: bool,
}

const PRESET_MODEL: &str = "anthropic/claude-opus-4-6";
const PRESET_TOOLS: &[&str] = &["filesystem", "terminal", "browser", "network"];
const ONE_HOUR_MS: u64 = 3_600_000;

pub const AGENT_TYPE_PRESETS: &[AgentTypePreset] = &[
    AgentTypePreset {
        id: AgentTypeId::CodingAssistant,
        name: "Coding Assistant",
        emoji: "👨‍💻",
        description: "A senior engineer that writes careful code and debugs methodically.",
        provider: "anthropic",
        model: PRESET_MODEL,
        fallback_models: &["google/gemini-3-pro-preview"],
        skills: &["github", "coding-agent", "web-search"],
        sandbox_mode: SandboxMode::None,
        tools_mode: "allowlist",
        allowed_tools: PRESET_TOOLS,
        heartbeat_mode: "30m",
        idle_timeout_ms: ONE_HOUR_MS,
        enable_fallbacks: true,
        identity_md: "# IDENTITY.md - Who Am I?\n- **Name:** DevBot\n- **Emoji:** 👨‍💻\n---\n\n## Strengths\n- Full-stack development and code review\n- Root cause analysis\n- Git and pull request workflow\n",
        soul_md: "# SOUL.md\n## Mission\nServe the user as a senior software engineer.\n\n## Principles\n1. Readable, tested code\n2. Never hardcode secrets\n3. Explain why a bug happened, not only how to patch it\n",
        tools_md: "# TOOLS.md - Tool Usage\n\n## GitHub\n- Use `gh` for issues, pull requests and CI status\n\n## Web Search\n- Check documentation before guessing an API\n",
        agents_md: "# AGENTS.md - Agent Configuration\nSingle coding assistant, no sub-agent routing.\n",
        heartbeat_md: "# HEARTBEAT.md - Periodic Tasks\n\n## Every 30 Minutes\n- [ ] Pending pull request reviews\n- [ ] Failed CI builds\n",
        memory_md: "# MEMORY.md\n- Active projects and their stacks\n- Preferred code style\n",
        memory_enabled: true,
    },
    AgentTypePreset {
        id: AgentTypeId::OfficeAssistant,
        name: "Office Assistant",
        emoji: "🤵",
        description: "An executive assistant for email, calendar, tasks and messages.",
        provider: "anthropic",
        model: PRESET_MODEL,
        fallback_models: &["openai/gpt-5.3-codex"],
        skills: &[
            "himalaya",
            "slack",
            "trello",
            "apple-notes",
            "apple-reminders",
            "web-search",
        ],
        sandbox_mode: SandboxMode::None,
        tools_mode: "allowlist",
        allowed_tools: PRESET_TOOLS,
        heartbeat_mode: "1h",
        idle_timeout_ms: ONE_HOUR_MS,
        enable_fallbacks: true,
        identity_md: "# IDENTITY.md - Who Am I?\n- **Name:** Alfred\n- **Emoji:** 🤵\n---\n\n## Strengths\n- Inbox triage and drafting\n- Task tracking and reminders\n",
        soul_md: "# SOUL.md\n## Mission\nServe the user as a dependable executive assistant.\n\n## Principles\n1. Anticipate needs\n2. Keep messages short and polite\n",
        tools_md: "# TOOLS.md - Tool Usage\n\n## Email\n- Use himalaya for reading and drafting mail\n\n## Tasks\n- Trello for projects, reminders for personal items\n",
        agents_md: "# AGENTS.md - Agent Configuration\nSingle office assistant, no sub-agent routing.\n",
        heartbeat_md: "# HEARTBEAT.md - Periodic Tasks\n\n## Every Hour\n- [ ] Unread priority email\n- [ ] Reminders due today\n",
        memory_md: "# MEMORY.md\n- Key contacts\n- Meeting preferences\n",
        memory_enabled: true,
    },
    AgentTypePreset {
        id: AgentTypeId::TravelPlanner,
        name: "Travel Planner",
        emoji: "🧭",
        description: "A travel agent that plans routes, stays and local discoveries.",
        provider: "anthropic",
        model: PRESET_MODEL,
        fallback_models: &["openai/gpt-5.3-codex"],
        skills: &["goplaces", "local-places", "web-search"],
        sandbox_mode: SandboxMode::None,
        tools_mode: "allowlist",
        allowed_tools: PRESET_TOOLS,
        heartbeat_mode: "never",
        idle_timeout_ms: ONE_HOUR_MS,
        enable_fallbacks: true,
        identity_md: "# IDENTITY.md - Who Am I?\n- **Name:** Atlas\n- **Emoji:** 🧭\n---\n\n## Strengths\n- Itineraries and bookings research\n- Local recommendations\n",
        soul_md: "# SOUL.md\n## Mission\nServe the user as an expert travel guide.\n\n## Principles\n1. Respect the budget\n2. Mention local etiquette\n",
        tools_md: "# TOOLS.md - Tool Usage\n\n## Places\n- Use goplaces and local-places for venues and opening hours\n",
        agents_md: "# AGENTS.md - Agent Configuration\nSingle travel planner, no sub-agent routing.\n",
        heartbeat_md: "# HEARTBEAT.md - Periodic Tasks\nNo periodic tasks.\n",
        memory_md: "# MEMORY.md\n- Visited places\n- Seating and dietary preferences\n",
        memory_enabled: true,
    },
];

/// Business functions that expand into sub-agents and scheduled jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BusinessFunctionId {
    PersonalProductivity,
    SoftwareDevelopment,
    FinancialAnalyst,
    SocialMedia,
    Crm,
    CustomerSupport,
    /// Operator-sized roster of blank agents
    CustomTeam,
}

impl BusinessFunctionId {
    pub fn preset(&self) -> Option<&'static BusinessFunctionPreset> {
        BUSINESS_FUNCTION_PRESETS.iter().find(|p| p.id == *self)
    }
}

pub struct SubAgentPreset {
    pub id: &'static str,
    pub name: &'static str,
    pub model: &'static str,
    pub skills: &'static [&'static str],
    pub identity_md: &'static str,
    pub soul_md: &'static str,
    pub tools_md: &'static str,
    pub agents_md: &'static str,
}

pub struct JobPreset {
    pub name: &'static str,
    pub schedule: &'static str,
    pub command: &'static str,
}

pub struct BusinessFunctionPreset {
    pub id: BusinessFunctionId,
    pub name: &'static str,
    pub emoji: &'static str,
    pub sub_agents: &'static [SubAgentPreset],
    pub cron_jobs: &'static [JobPreset],
}

/// Emoji given to sub-agents created from a business function
pub const SUB_AGENT_EMOJI: &str = "🤖";

/// Agent id that owns jobs contributed by business functions
pub const MAIN_AGENT_ID: &str = "main";

const SUB_MODEL: &str = "anthropic/claude-sonnet-4-20250514";

pub const BUSINESS_FUNCTION_PRESETS: &[BusinessFunctionPreset] = &[
    BusinessFunctionPreset {
        id: BusinessFunctionId::PersonalProductivity,
        name: "Personal Productivity",
        emoji: "📋",
        sub_agents: &[
            SubAgentPreset {
                id: "calendar",
                name: "Calendar Manager",
                model: SUB_MODEL,
                skills: &["apple-reminders"],
                identity_md: "# IDENTITY.md - Calendar Manager\n- **Name:** Calendar Manager\n- **Emoji:** 📅\n---\nI schedule meetings and watch for conflicts.\n",
                soul_md: "# SOUL.md\n## Mission\nServe the user by keeping the calendar accurate.\n",
                tools_md: "# TOOLS.md\nUse Apple Reminders for task scheduling. Handle calendar queries.",
                agents_md: "# AGENTS.md\nSub-agent of the Productivity Orchestrator. Handle calendar-specific tasks.",
            },
            SubAgentPreset {
                id: "email",
                name: "Email Manager",
                model: SUB_MODEL,
                skills: &["himalaya"],
                identity_md: "# IDENTITY.md - Email Manager\n- **Name:** Email Manager\n- **Emoji:** 📧\n---\nI triage the inbox and draft replies.\n",
                soul_md: "# SOUL.md\n## Mission\nServe the user by keeping the inbox under control.\n",
                tools_md: "# TOOLS.md\nUse Himalaya for all email operations. Draft responses matching user's style.",
                agents_md: "# AGENTS.md\nSub-agent of the Productivity Orchestrator. Handle email-specific tasks.",
            },
        ],
        cron_jobs: &[JobPreset {
            name: "Morning briefing",
            schedule: "0 8 * * *",
            command: "Summarize today's calendar and unread emails",
        }],
    },
    BusinessFunctionPreset {
        id: BusinessFunctionId::SoftwareDevelopment,
        name: "Software Development",
        emoji: "💻",
        sub_agents: &[
            SubAgentPreset {
                id: "code-review",
                name: "Code Reviewer",
                model: SUB_MODEL,
                skills: &["github", "coding-agent"],
                identity_md: "# IDENTITY.md - Code Reviewer\n- **Name:** Code Reviewer\n- **Emoji:** 🔍\n---\nI review pull requests for bugs and security issues.\n",
                soul_md: "# SOUL.md\n## Mission\nServe the user by catching defects before merge.\n",
                tools_md: "# TOOLS.md\nUse GitHub CLI for PR operations. Use coding-agent for in-depth analysis.",
                agents_md: "# AGENTS.md\nSub-agent of the Dev Orchestrator. Handle code review tasks.",
            },
            SubAgentPreset {
                id: "testing",
                name: "Testing Agent",
                model: SUB_MODEL,
                skills: &["coding-agent"],
                identity_md: "# IDENTITY.md - Testing Agent\n- **Name:** Testing Agent\n- **Emoji:** 🧪\n---\nI write and run tests.\n",
                soul_md: "# SOUL.md\n## Mission\nServe the user by keeping the test suite green.\n",
                tools_md: "# TOOLS.md\nUse coding-agent for test writing and execution.",
                agents_md: "# AGENTS.md\nSub-agent of the Dev Orchestrator. Handle testing tasks.",
            },
        ],
        cron_jobs: &[JobPreset {
            name: "PR check",
            schedule: "0 */4 * * *",
            command: "Check for pending pull requests and CI status",
        }],
    },
    BusinessFunctionPreset {
        id: BusinessFunctionId::FinancialAnalyst,
        name: "Financial Analyst",
        emoji: "📊",
        sub_agents: &[
            SubAgentPreset {
                id: "data-analysis",
                name: "Data Analyst",
                model: SUB_MODEL,
                skills: &["coding-agent", "web-search"],
                identity_md: "# IDENTITY.md - Data Analyst\n- **Name:** Data Analyst\n- **Emoji:** 📈\n---\nI crunch numbers and chart trends.\n",
                soul_md: "# SOUL.md\n## Mission\nServe the user with accurate figures.\n",
                tools_md: "# TOOLS.md\nUse coding-agent for Python data scripts. Use web-search for market data.",
                agents_md: "# AGENTS.md\nSub-agent of the Finance Orchestrator. Handle data analysis tasks.",
            },
            SubAgentPreset {
                id: "reporting",
                name: "Report Generator",
                model: SUB_MODEL,
                skills: &["coding-agent"],
                identity_md: "# IDENTITY.md - Report Generator\n- **Name:** Report Generator\n- **Emoji:** 📝\n---\nI turn analysis into readable reports.\n",
                soul_md: "# SOUL.md\n## Mission\nServe the user with clear reports.\n",
                tools_md: "# TOOLS.md\nUse coding-agent for report formatting and generation.",
                agents_md: "# AGENTS.md\nSub-agent of the Finance Orchestrator. Handle report generation.",
            },
        ],
        cron_jobs: &[JobPreset {
            name: "Market update",
            schedule: "30 9 * * 1-5",
            command: "Provide morning market summary and key indicators",
        }],
    },
    BusinessFunctionPreset {
        id: BusinessFunctionId::SocialMedia,
        name: "Social Media Manager",
        emoji: "📱",
        sub_agents: &[
            SubAgentPreset {
                id: "research",
                name: "Research Agent",
                model: SUB_MODEL,
                skills: &["web-search"],
                identity_md: "# IDENTITY.md - Research Agent\n- **Name:** Research Agent\n- **Emoji:** 🔎\n---\nI track trends and competitors.\n",
                soul_md: "# SOUL.md\n## Mission\nServe the user with timely research.\n",
                tools_md: "# TOOLS.md\nUse web-search extensively for research tasks.",
                agents_md: "# AGENTS.md\nSub-agent of the Social Media Orchestrator. Handle research tasks.",
            },
            SubAgentPreset {
                id: "content",
                name: "Content Creator",
                model: SUB_MODEL,
                skills: &["web-search"],
                identity_md: "# IDENTITY.md - Content Creator\n- **Name:** Content Creator\n- **Emoji:** ✍️\n---\nI draft posts in the brand voice.\n",
                soul_md: "# SOUL.md\n## Mission\nServe the user with engaging content.\n",
                tools_md: "# TOOLS.md\nUse web-search for inspiration and reference material.",
                agents_md: "# AGENTS.md\nSub-agent of the Social Media Orchestrator. Handle content creation.",
            },
        ],
        cron_jobs: &[JobPreset {
            name: "Engagement check",
            schedule: "0 */2 * * *",
            command: "Check social media engagement metrics and trending topics",
        }],
    },
    BusinessFunctionPreset {
        id: BusinessFunctionId::Crm,
        name: "Customer Relationship Management",
        emoji: "🤝",
        sub_agents: &[
            SubAgentPreset {
                id: "contacts",
                name: "Contact Manager",
                model: SUB_MODEL,
                skills: &["web-search"],
                identity_md: "# IDENTITY.md - Contact Manager\n- **Name:** Contact Manager\n- **Emoji:** 📇\n---\nI keep contact records current.\n",
                soul_md: "# SOUL.md\n## Mission\nServe the user with a clean contact book.\n",
                tools_md: "# TOOLS.md\nUse web-search for contact enrichment and company research.",
                agents_md: "# AGENTS.md\nSub-agent of the CRM Orchestrator. Handle contact management.",
            },
            SubAgentPreset {
                id: "followup",
                name: "Follow-up Agent",
                model: SUB_MODEL,
                skills: &["himalaya", "apple-reminders"],
                identity_md: "# IDENTITY.md - Follow-up Agent\n- **Name:** Follow-up Agent\n- **Emoji:** 🔔\n---\nI make sure nobody waits for an answer.\n",
                soul_md: "# SOUL.md\n## Mission\nServe the user by closing every loop.\n",
                tools_md: "# TOOLS.md\nUse Himalaya for email follow-ups. Use Apple Reminders for scheduling.",
                agents_md: "# AGENTS.md\nSub-agent of the CRM Orchestrator. Handle follow-up automation.",
            },
        ],
        cron_jobs: &[JobPreset {
            name: "Follow-up reminders",
            schedule: "0 9 * * *",
            command: "Review and send daily follow-up reminders",
        }],
    },
    BusinessFunctionPreset {
        id: BusinessFunctionId::CustomerSupport,
        name: "Customer Support",
        emoji: "🎧",
        sub_agents: &[
            SubAgentPreset {
                id: "triage",
                name: "Ticket Triage",
                model: SUB_MODEL,
                skills: &["web-search"],
                identity_md: "# IDENTITY.md - Ticket Triage\n- **Name:** Ticket Triage\n- **Emoji:** 🏷️\n---\nI sort incoming tickets by urgency.\n",
                soul_md: "# SOUL.md\n## Mission\nServe the user by routing tickets fast.\n",
                tools_md: "# TOOLS.md\nUse web-search to look up known issues and solutions.",
                agents_md: "# AGENTS.md\nSub-agent of the Support Orchestrator. Handle ticket triage.",
            },
            SubAgentPreset {
                id: "response",
                name: "Response Drafter",
                model: SUB_MODEL,
                skills: &["himalaya"],
                identity_md: "# IDENTITY.md - Response Drafter\n- **Name:** Response Drafter\n- **Emoji:** 💬\n---\nI draft friendly, accurate replies.\n",
                soul_md: "# SOUL.md\n## Mission\nServe the user with helpful answers.\n",
                tools_md: "# TOOLS.md\nUse Himalaya for sending email responses to customers.",
                agents_md: "# AGENTS.md\nSub-agent of the Support Orchestrator. Handle response drafting.",
            },
        ],
        cron_jobs: &[JobPreset {
            name: "Ticket summary",
            schedule: "0 * * * 1-5",
            command: "Summarize open tickets and response queue status",
        }],
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_type_round_trip_names() {
        for id in [
            AgentTypeId::Custom,
            AgentTypeId::CodingAssistant,
            AgentTypeId::OfficeAssistant,
            AgentTypeId::TravelPlanner,
        ] {
            assert_eq!(AgentTypeId::parse(id.as_str()), id);
        }
        assert_eq!(AgentTypeId::parse("something-else"), AgentTypeId::Custom);
    }

    #[test]
    fn test_every_preset_type_has_a_preset() {
        assert!(AgentTypeId::Custom.preset().is_none());
        assert!(AgentTypeId::CodingAssistant.preset().is_some());
        assert!(AgentTypeId::OfficeAssistant.preset().is_some());
        assert!(AgentTypeId::TravelPlanner.preset().is_some());
    }

    #[test]
    fn test_business_functions_have_agents_and_jobs() {
        assert!(BusinessFunctionId::CustomTeam.preset().is_none());
        for preset in BUSINESS_FUNCTION_PRESETS {
            assert!(!preset.sub_agents.is_empty(), "{} has no sub-agents", preset.name);
            assert!(!preset.cron_jobs.is_empty(), "{} has no jobs", preset.name);
        }
    }

    #[test]
    fn test_business_function_serde_names() {
        let json = serde_json::to_string(&BusinessFunctionId::CustomTeam).unwrap();
        assert_eq!(json, "\"custom-team\"");
    }
}
