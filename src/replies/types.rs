//! Rule and outcome types shared by the store, matcher and manager.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single auto-reply rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Lower-cased trigger word or phrase
    pub trigger: String,

    /// Text sent back verbatim when the trigger matches
    pub response: String,

    /// Creator or last editor; empty means anyone may edit
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub author_id: String,
}

impl Rule {
    pub fn new(trigger: &str, response: &str, author_id: &str) -> Self {
        Self {
            trigger: normalize_trigger(trigger),
            response: response.to_string(),
            author_id: author_id.to_string(),
        }
    }

    /// Whether `author_id` may edit or remove this rule
    pub fn editable_by(&self, author_id: &str) -> bool {
        self.author_id.is_empty() || self.author_id == author_id
    }
}

/// Longest trigger accepted, in characters
pub const MAX_TRIGGER_CHARS: usize = 200;

/// Longest response accepted; Discord rejects longer message content
pub const MAX_RESPONSE_CHARS: usize = 2000;

/// Lower-case a trigger and collapse its whitespace to single spaces
pub fn normalize_trigger(trigger: &str) -> String {
    trigger
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Every guild's rule set, keyed by guild id.
///
/// Each `Vec<Rule>` keeps insertion order, which is also the first-match
/// order used by the matcher.
pub type RuleBook = BTreeMap<String, Vec<Rule>>;

/// Kind of result produced by a rule mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Success,
    ValidationError,
    OwnershipConflict,
    NotFound,
}

/// Who gets to see a command response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// Visible to the whole channel
    Public,
    /// Ephemeral, only the invoking user sees it
    #[default]
    Private,
}

impl Visibility {
    pub fn is_ephemeral(&self) -> bool {
        matches!(self, Visibility::Private)
    }
}

/// Result of `add_or_update` / `remove`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutcome {
    pub kind: OutcomeKind,
    pub message: String,
}

impl RuleOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: OutcomeKind::Success,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: OutcomeKind::ValidationError,
            message: message.into(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            kind: OutcomeKind::NotFound,
            message: "No auto-reply found for that trigger.".to_string(),
        }
    }

    /// Ownership conflicts name the user who tried the edit
    pub fn ownership_conflict(author_id: &str) -> Self {
        Self {
            kind: OutcomeKind::OwnershipConflict,
            message: format!(
                "<@{}> you can't change this auto-reply, it belongs to someone else.",
                author_id
            ),
        }
    }

    pub fn ok(&self) -> bool {
        self.kind == OutcomeKind::Success
    }

    /// Permission denials are public; everything else stays private
    pub fn visibility(&self) -> Visibility {
        match self.kind {
            OutcomeKind::OwnershipConflict => Visibility::Public,
            _ => Visibility::Private,
        }
    }
}

impl fmt::Display for RuleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_normalizes_trigger() {
        let rule = Rule::new("  HeLLo There ", "hi", "U1");
        assert_eq!(rule.trigger, "hello there");
    }

    #[test]
    fn test_normalize_collapses_inner_whitespace() {
        assert_eq!(normalize_trigger("HI   there"), "hi there");
        assert_eq!(normalize_trigger("hi\t\nthere "), "hi there");
        assert_eq!(normalize_trigger("   "), "");
    }

    #[test]
    fn test_unowned_rule_editable_by_anyone() {
        let rule = Rule::new("bye", "cya", "");
        assert!(rule.editable_by("U1"));
        assert!(rule.editable_by("U2"));

        let owned = Rule::new("bye", "cya", "U1");
        assert!(owned.editable_by("U1"));
        assert!(!owned.editable_by("U2"));
    }

    #[test]
    fn test_visibility_by_kind() {
        assert_eq!(RuleOutcome::ownership_conflict("U2").visibility(), Visibility::Public);
        assert_eq!(RuleOutcome::not_found().visibility(), Visibility::Private);
        assert_eq!(RuleOutcome::success("done").visibility(), Visibility::Private);
        assert_eq!(RuleOutcome::validation("bad").visibility(), Visibility::Private);
    }

    #[test]
    fn test_author_id_omitted_when_empty() {
        let json = serde_json::to_string(&Rule::new("hi", "hello", "")).unwrap();
        assert!(!json.contains("author_id"));

        let json = serde_json::to_string(&Rule::new("hi", "hello", "U1")).unwrap();
        assert!(json.contains("\"author_id\":\"U1\""));
    }
}
