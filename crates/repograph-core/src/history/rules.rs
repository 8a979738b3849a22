//! Ordered commit classification rules.

use super::IntentCategory;

/// Version of the built-in rule table. Bump when a rule changes.
pub const HISTORY_RULES_VERSION: &str = "history-v1";

/// Conventional-commit type: `feat:`, `fix(parser):`, `refactor!:`.
pub const CONVENTIONAL_PREFIX_PATTERN: &str = r"^([a-z]+)(?:\([^)]*\))?!?:";

/// What a rule looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    /// Conventional-commit type, exact.
    Prefix(&'static [&'static str]),
    /// Any whole word of the first line.
    Keywords(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryRule {
    pub name: &'static str,
    pub matcher: Matcher,
    pub category: IntentCategory,
}

/// First matching rule wins.
pub const HISTORY_RULES: &[HistoryRule] = &[
    HistoryRule {
        name: "prefix-feature",
        matcher: Matcher::Prefix(&["feat", "feature"]),
        category: IntentCategory::Feature,
    },
    HistoryRule {
        name: "prefix-bugfix",
        matcher: Matcher::Prefix(&["fix", "bugfix", "hotfix"]),
        category: IntentCategory::Bugfix,
    },
    HistoryRule {
        name: "prefix-refactor",
        matcher: Matcher::Prefix(&["refactor", "perf", "style"]),
        category: IntentCategory::Refactor,
    },
    HistoryRule {
        name: "prefix-docs",
        matcher: Matcher::Prefix(&["docs", "doc"]),
        category: IntentCategory::Docs,
    },
    HistoryRule {
        name: "prefix-chore",
        matcher: Matcher::Prefix(&["chore", "build", "ci", "test", "deps"]),
        category: IntentCategory::Chore,
    },
    HistoryRule {
        name: "keyword-bugfix",
        matcher: Matcher::Keywords(&["fix", "bug", "issue", "error", "crash"]),
        category: IntentCategory::Bugfix,
    },
    HistoryRule {
        name: "keyword-feature",
        matcher: Matcher::Keywords(&["add", "feature", "implement", "introduce", "new"]),
        category: IntentCategory::Feature,
    },
    HistoryRule {
        name: "keyword-refactor",
        matcher: Matcher::Keywords(&["refactor", "cleanup", "restructure", "rename", "simplify"]),
        category: IntentCategory::Refactor,
    },
    HistoryRule {
        name: "keyword-docs",
        matcher: Matcher::Keywords(&["doc", "readme", "documentation", "comment"]),
        category: IntentCategory::Docs,
    },
    HistoryRule {
        name: "keyword-chore",
        matcher: Matcher::Keywords(&["bump", "upgrade", "release", "merge", "deps"]),
        category: IntentCategory::Chore,
    },
];

/// Action verbs reported per commit, in priority order.
pub const ACTION_VERBS: &[&str] = &["add", "remove", "update", "fix", "refactor", "implement", "create"];
