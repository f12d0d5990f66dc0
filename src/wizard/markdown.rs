//! Workspace document helpers
//!
//! Agent identity documents carry `- **Key:** value` lines; soul documents
//! carry a `Serve ….` mission line. These helpers rewrite or read them.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Emoji used when an agent has none
pub const DEFAULT_EMOJI: &str = "🦞";

/// Identity fields rewritten when the operator renames an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityField {
    Name,
    Vibe,
    Emoji,
}

impl IdentityField {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Vibe => "Vibe",
            Self::Emoji => "Emoji",
        }
    }

    fn pattern(&self) -> Option<&'static Regex> {
        static NAME: Lazy<Option<Regex>> = Lazy::new(|| field_regex("Name"));
        static VIBE: Lazy<Option<Regex>> = Lazy::new(|| field_regex("Vibe"));
        static EMOJI: Lazy<Option<Regex>> = Lazy::new(|| field_regex("Emoji"));
        match self {
            Self::Name => NAME.as_ref(),
            Self::Vibe => VIBE.as_ref(),
            Self::Emoji => EMOJI.as_ref(),
        }
    }
}

fn field_regex(key: &str) -> Option<Regex> {
    Regex::new(&format!(r"(- \*\*{key}:\*\* )(.*)")).ok()
}

static SOUL_MISSION: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?m)(Serve )(.*?)(\.?)$").ok());

/// Default identity document for an agent that has none
pub fn identity_template(name: &str, emoji: &str) -> String {
    format!("# IDENTITY.md - Who Am I?\n- **Name:** {name}\n- **Emoji:** {emoji}\n---\nManaged by Deckhand.")
}

/// Default soul document for a roster agent that has none
pub fn soul_template(name: &str, emoji: &str) -> String {
    format!("# SOUL.md - {emoji} {name}\n## Mission\nServe {name}.")
}

/// Replace the value of every `- **Key:** …` line
pub fn update_identity_field(content: &str, field: IdentityField, value: &str) -> String {
    let Some(pattern) = field.pattern() else {
        return content.to_string();
    };
    pattern
        .replace_all(content, |caps: &Captures| format!("{}{}", &caps[1], value))
        .into_owned()
}

/// Rewrite every `Serve ….` mission line to `Serve {name}.`
pub fn update_soul_mission(content: &str, name: &str) -> String {
    let Some(pattern) = SOUL_MISSION.as_ref() else {
        return content.to_string();
    };
    pattern
        .replace_all(content, |caps: &Captures| format!("{}{}.", &caps[1], name))
        .into_owned()
}

/// Value of the first `**Key:**` marker, trimmed; empty when missing
pub fn identity_field(content: &str, field: IdentityField) -> String {
    let marker = format!("**{}:**", field.key());
    content
        .lines()
        .find_map(|line| {
            let line = line.trim();
            line.find(&marker)
                .map(|pos| line[pos + marker.len()..].trim().to_string())
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_template_exact() {
        assert_eq!(
            identity_template("Nova", "🦞"),
            "# IDENTITY.md - Who Am I?\n- **Name:** Nova\n- **Emoji:** 🦞\n---\nManaged by Deckhand."
        );
    }

    #[test]
    fn test_update_identity_field() {
        let doc = "# IDENTITY.md\n- **Name:** DevBot\n- **Emoji:** 👨‍💻\n";
        let renamed = update_identity_field(doc, IdentityField::Name, "Ada");
        assert!(renamed.contains("- **Name:** Ada\n"));
        assert!(renamed.contains("- **Emoji:** 👨‍💻"));

        let re_emoji = update_identity_field(&renamed, IdentityField::Emoji, "🐙");
        assert!(re_emoji.contains("- **Emoji:** 🐙"));
    }

    #[test]
    fn test_update_identity_field_literal_dollar() {
        let doc = "- **Name:** Old";
        assert_eq!(
            update_identity_field(doc, IdentityField::Name, "$1 cash"),
            "- **Name:** $1 cash"
        );
    }

    #[test]
    fn test_update_identity_field_empty() {
        assert_eq!(update_identity_field("", IdentityField::Name, "x"), "");
    }

    #[test]
    fn test_update_soul_mission() {
        let doc = "# SOUL.md\n## Mission\nServe the user as a senior software engineer.\n\n## Principles\n";
        let updated = update_soul_mission(doc, "Ada");
        assert_eq!(
            updated,
            "# SOUL.md\n## Mission\nServe Ada.\n\n## Principles\n"
        );
    }

    #[test]
    fn test_update_soul_mission_without_line() {
        let doc = "# SOUL.md\nNo mission here";
        assert_eq!(update_soul_mission(doc, "Ada"), doc);
    }

    #[test]
    fn test_identity_field_extraction() {
        let doc = identity_template("Nova", "🐙");
        assert_eq!(identity_field(&doc, IdentityField::Name), "Nova");
        assert_eq!(identity_field(&doc, IdentityField::Emoji), "🐙");
        assert_eq!(identity_field(&doc, IdentityField::Vibe), "");
    }
}
