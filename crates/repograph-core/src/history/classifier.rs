use regex::Regex;
use serde::{Deserialize, Serialize};

use super::rules::{
    HistoryRule, Matcher, ACTION_VERBS, CONVENTIONAL_PREFIX_PATTERN, HISTORY_RULES,
    HISTORY_RULES_VERSION,
};
use super::{CommitRecord, IntentCategory};

/// A commit with its assigned category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedCommit {
    pub commit: CommitRecord,
    pub category: IntentCategory,
    /// Name of the rule that matched; `None` for `other`.
    pub rule: Option<String>,
    /// Leading action verb, e.g. `add` or `fix`.
    pub action: Option<String>,
}

/// Commits grouped by category, in changelog order.
///
/// Every category is present, possibly empty. Within a bucket commits keep
/// the order they were supplied in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedHistory {
    pub rules_version: String,
    buckets: Vec<(IntentCategory, Vec<ClassifiedCommit>)>,
}

impl ClassifiedHistory {
    fn empty() -> Self {
        Self {
            rules_version: HISTORY_RULES_VERSION.to_string(),
            buckets: IntentCategory::ALL.iter().map(|c| (*c, Vec::new())).collect(),
        }
    }

    fn push(&mut self, commit: ClassifiedCommit) {
        if let Some((_, bucket)) = self.buckets.iter_mut().find(|(c, _)| *c == commit.category) {
            bucket.push(commit);
        }
    }

    pub fn get(&self, category: IntentCategory) -> &[ClassifiedCommit] {
        self.buckets
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, commits)| commits.as_slice())
            .unwrap_or(&[])
    }

    pub fn count(&self, category: IntentCategory) -> usize {
        self.get(category).len()
    }

    pub fn total(&self) -> usize {
        self.buckets.iter().map(|(_, commits)| commits.len()).sum()
    }

    /// Commits placed in any category but `other`.
    pub fn categorized(&self) -> usize {
        self.total() - self.count(IntentCategory::Other)
    }

    pub fn iter(&self) -> impl Iterator<Item = (IntentCategory, &[ClassifiedCommit])> {
        self.buckets.iter().map(|(c, commits)| (*c, commits.as_slice()))
    }
}

/// Applies the ordered rule table to commit messages.
pub struct HistoryClassifier {
    prefix: Option<Regex>,
    limit: Option<usize>,
}

impl HistoryClassifier {
    pub fn new() -> Self {
        Self {
            prefix: Regex::new(CONVENTIONAL_PREFIX_PATTERN).ok(),
            limit: None,
        }
    }

    /// Only classify the first `limit` commits.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn classify(&self, commits: &[CommitRecord]) -> ClassifiedHistory {
        let mut history = ClassifiedHistory::empty();
        let take = self.limit.unwrap_or(commits.len());
        for commit in commits.iter().take(take) {
            history.push(self.classify_commit(commit));
        }
        history
    }

    pub fn classify_commit(&self, commit: &CommitRecord) -> ClassifiedCommit {
        let line = commit.summary().to_lowercase();
        let prefix = self
            .prefix
            .as_ref()
            .and_then(|re| re.captures(&line))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());
        let words = words(&line);

        let rule = HISTORY_RULES.iter().find(|rule| matches(rule, prefix.as_deref(), &words));

        ClassifiedCommit {
            commit: commit.clone(),
            category: rule.map(|r| r.category).unwrap_or(IntentCategory::Other),
            rule: rule.map(|r| r.name.to_string()),
            action: action_verb(&words),
        }
    }
}

impl Default for HistoryClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn matches(rule: &HistoryRule, prefix: Option<&str>, words: &[&str]) -> bool {
    match rule.matcher {
        Matcher::Prefix(types) => prefix.is_some_and(|p| types.contains(&p)),
        Matcher::Keywords(keywords) => words.iter().any(|w| keywords.contains(w)),
    }
}

fn words(line: &str) -> Vec<&str> {
    line.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}

/// First action verb by priority, accepting simple inflections (`adds`, `fixed`).
fn action_verb(words: &[&str]) -> Option<String> {
    ACTION_VERBS
        .iter()
        .find(|verb| {
            words.iter().any(|w| {
                w.strip_prefix(**verb)
                    .is_some_and(|rest| matches!(rest, "" | "s" | "es" | "d" | "ed" | "ing"))
            })
        })
        .map(|verb| verb.to_string())
}
