//! Keyword-driven feature grouping.
//!
//! Features are synthetic: a function belongs to a feature when its name or
//! docstring contains one of the feature's keywords. A class match pulls in
//! every method of the class. Features nobody matched are not emitted.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::callgraph::FunctionKey;
use super::ontology::{ClassEntity, FunctionEntity};

/// Version of the built-in rule table. Bump when keywords change.
pub const FEATURE_RULES_VERSION: &str = "features-v1";

/// One feature label and the keywords that select it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRule {
    pub label: String,
    pub keywords: Vec<String>,
}

impl FeatureRule {
    pub fn new(label: &str, keywords: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    fn matches(&self, haystack: &str) -> bool {
        self.keywords.iter().any(|k| !k.is_empty() && haystack.contains(k.as_str()))
    }
}

/// Versioned, ordered feature rule table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRules {
    pub version: String,
    pub rules: Vec<FeatureRule>,
}

impl Default for FeatureRules {
    fn default() -> Self {
        Self {
            version: FEATURE_RULES_VERSION.to_string(),
            rules: vec![
                FeatureRule::new(
                    "Authentication",
                    &["auth", "login", "logout", "password", "token", "session"],
                ),
                FeatureRule::new("User Management", &["user", "account", "profile"]),
                FeatureRule::new("API", &["api", "request", "response", "endpoint", "route"]),
                FeatureRule::new("Database", &["db", "database", "sql", "query", "migration"]),
                FeatureRule::new("Caching", &["cache"]),
                FeatureRule::new("Graph", &["graph", "neo4j"]),
                FeatureRule::new("Documentation", &["docs", "documentation"]),
                FeatureRule::new("Generation", &["generate", "render", "template"]),
                FeatureRule::new("Analysis", &["analyze", "analysis", "parse", "nlp"]),
                FeatureRule::new("Background Tasks", &["task", "worker", "queue", "schedule"]),
                FeatureRule::new("Testing", &["test"]),
            ],
        }
    }
}

/// A matched feature with its member functions, sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureGroup {
    pub label: String,
    pub keywords: Vec<String>,
    pub members: Vec<FunctionKey>,
}

/// Groups functions into features using a [`FeatureRules`] table.
#[derive(Debug, Clone, Default)]
pub struct FeatureClassifier {
    rules: FeatureRules,
}

impl FeatureClassifier {
    pub fn new(rules: FeatureRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &FeatureRules {
        &self.rules
    }

    /// Classify entities. Groups come back in rule-table order; empty groups
    /// are dropped.
    pub fn classify(&self, classes: &[ClassEntity], functions: &[FunctionEntity]) -> Vec<FeatureGroup> {
        let function_text: Vec<String> = functions
            .iter()
            .map(|f| haystack(&f.name, f.doc_comment.as_deref()))
            .collect();
        let class_text: Vec<String> = classes
            .iter()
            .map(|c| haystack(&c.name, c.doc_comment.as_deref()))
            .collect();

        self.rules
            .rules
            .iter()
            .filter_map(|rule| {
                let mut members = BTreeSet::new();

                for (func, text) in functions.iter().zip(&function_text) {
                    if rule.matches(text) {
                        members.insert(FunctionKey::of(func));
                    }
                }

                for (class, text) in classes.iter().zip(&class_text) {
                    if !rule.matches(text) {
                        continue;
                    }
                    members.extend(
                        functions
                            .iter()
                            .filter(|f| {
                                f.file_path == class.file_path
                                    && f.parent.as_deref() == Some(class.qualified_name.as_str())
                            })
                            .map(FunctionKey::of),
                    );
                }

                if members.is_empty() {
                    None
                } else {
                    Some(FeatureGroup {
                        label: rule.label.clone(),
                        keywords: rule.keywords.clone(),
                        members: members.into_iter().collect(),
                    })
                }
            })
            .collect()
    }
}

fn haystack(name: &str, doc: Option<&str>) -> String {
    let mut text = name.to_lowercase();
    if let Some(doc) = doc {
        text.push(' ');
        text.push_str(&doc.to_lowercase());
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::ontology::ClassKind;

    fn func(path: &str, name: &str, doc: Option<&str>) -> FunctionEntity {
        let mut f = FunctionEntity::new(name, path);
        f.doc_comment = doc.map(str::to_string);
        f
    }

    fn labels(groups: &[FeatureGroup]) -> Vec<&str> {
        groups.iter().map(|g| g.label.as_str()).collect()
    }

    #[test]
    fn test_name_and_docstring_matching() {
        let functions = vec![
            func("auth.py", "check_login", None),
            func("svc.py", "fetch", Some("Reads through the CACHE layer.")),
            func("svc.py", "compute", None),
        ];
        let groups = FeatureClassifier::default().classify(&[], &functions);

        assert_eq!(labels(&groups), vec!["Authentication", "Caching"]);
        assert_eq!(groups[0].members, vec![FunctionKey::new("auth.py", "check_login")]);
        assert_eq!(groups[1].members, vec![FunctionKey::new("svc.py", "fetch")]);
    }

    #[test]
    fn test_function_in_several_features() {
        let functions = vec![func("x.py", "cache_user_token", None)];
        let groups = FeatureClassifier::default().classify(&[], &functions);
        assert_eq!(labels(&groups), vec!["Authentication", "User Management", "Caching"]);
    }

    #[test]
    fn test_class_match_includes_methods() {
        let class = ClassEntity::new("SessionStore", "store.py", ClassKind::Class);
        let functions = vec![
            func("store.py", "put", None).with_parent("SessionStore"),
            func("store.py", "get", None).with_parent("SessionStore"),
            func("other.py", "put", None).with_parent("SessionStore"),
            func("store.py", "helper", None),
        ];
        let groups = FeatureClassifier::default().classify(&[class], &functions);

        assert_eq!(labels(&groups), vec!["Authentication"]);
        assert_eq!(
            groups[0].members,
            vec![
                FunctionKey::new("store.py", "SessionStore.get"),
                FunctionKey::new("store.py", "SessionStore.put"),
            ]
        );
    }

    #[test]
    fn test_no_matches_no_features() {
        let functions = vec![func("m.py", "compute", None)];
        assert!(FeatureClassifier::default().classify(&[], &functions).is_empty());
        assert!(FeatureClassifier::default().classify(&[], &[]).is_empty());
    }

    #[test]
    fn test_custom_rules() {
        let rules = FeatureRules {
            version: "custom-1".to_string(),
            rules: vec![FeatureRule::new("Billing", &["Invoice", "charge"])],
        };
        let functions = vec![func("b.py", "send_invoice", None), func("b.py", "login", None)];
        let groups = FeatureClassifier::new(rules).classify(&[], &functions);
        assert_eq!(labels(&groups), vec!["Billing"]);
        assert_eq!(groups[0].keywords, vec!["invoice", "charge"]);
    }
}
