//! Endpoint detection from route declarations.
//!
//! Detection is syntactic: a versioned table of regex rules (see
//! [`patterns`]) is run over the raw text of each extracted file. Paths are
//! recorded as written, never validated.

pub mod patterns;

use std::collections::BTreeMap;

use regex::Regex;
use tracing::{debug, warn};

use self::patterns::{
    RouteRule, VerbSpec, HANDLER_WINDOW, METHODS_LIST_PATTERN, REQUEST_METHOD_PATTERN, ROUTE_RULES,
};
use super::ontology::{ApiEntity, FunctionEntity, HttpMethod, Language};

pub use self::patterns::API_RULES_VERSION;

struct CompiledRule {
    rule: RouteRule,
    regex: Regex,
}

/// Text of one file plus the functions extracted from it.
#[derive(Debug, Clone, Copy)]
pub struct ApiSource<'a> {
    pub path: &'a str,
    pub language: Language,
    pub content: &'a str,
    pub functions: &'a [FunctionEntity],
}

/// Scans source text for route declarations.
pub struct ApiDetector {
    rules: Vec<CompiledRule>,
    methods_list: Option<Regex>,
    request_method: Option<Regex>,
}

impl ApiDetector {
    /// Detector with every built-in rule.
    pub fn new() -> Self {
        Self::without(&[])
    }

    /// Detector with the named rules turned off.
    pub fn without(disabled: &[String]) -> Self {
        let rules = ROUTE_RULES
            .iter()
            .filter(|rule| !disabled.iter().any(|d| d == rule.name))
            .filter_map(|rule| match Regex::new(rule.pattern) {
                Ok(regex) => Some(CompiledRule { rule: *rule, regex }),
                Err(e) => {
                    warn!(rule = rule.name, error = %e, "skipping invalid route pattern");
                    None
                }
            })
            .collect();

        Self {
            rules,
            methods_list: Regex::new(METHODS_LIST_PATTERN).ok(),
            request_method: Regex::new(REQUEST_METHOD_PATTERN).ok(),
        }
    }

    /// Names of the active rules.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.rule.name).collect()
    }

    /// Detect endpoints in one file.
    pub fn detect_file(&self, source: &ApiSource<'_>) -> Vec<ApiEntity> {
        let mut apis = Vec::new();

        for compiled in self.rules.iter().filter(|r| r.rule.languages.contains(&source.language)) {
            for caps in compiled.regex.captures_iter(source.content) {
                let Some(whole) = caps.get(0) else {
                    continue;
                };
                let line = line_of(source.content, whole.start());
                let endpoint = caps
                    .name("path")
                    .map(|m| m.as_str())
                    .filter(|p| !p.is_empty())
                    .unwrap_or("/")
                    .to_string();

                let methods = match compiled.rule.verb {
                    VerbSpec::Fixed(method) => vec![method],
                    VerbSpec::Captured => caps
                        .name("verb")
                        .and_then(|v| HttpMethod::parse(v.as_str()))
                        .into_iter()
                        .collect(),
                    VerbSpec::MethodsList(default) => self.declared_methods(whole.as_str(), default),
                };

                let handler = handler_for(source.functions, line);
                for method in methods {
                    apis.push(ApiEntity {
                        id: None,
                        endpoint: endpoint.clone(),
                        method,
                        api_type: compiled.rule.api_type,
                        file_path: source.path.to_string(),
                        line,
                        handler: handler.clone(),
                        rule: compiled.rule.name.to_string(),
                    });
                }
            }
        }

        if !apis.is_empty() {
            debug!(path = source.path, count = apis.len(), "detected endpoints");
        }
        apis
    }

    /// Detect endpoints across files.
    ///
    /// Declarations sharing `(file, verb, path)` collapse to the earliest one.
    /// The result is sorted by that key, verbs in [`HttpMethod`] order.
    pub fn detect<'a, I>(&self, sources: I) -> Vec<ApiEntity>
    where
        I: IntoIterator<Item = ApiSource<'a>>,
    {
        let mut unique: BTreeMap<(String, HttpMethod, String), ApiEntity> = BTreeMap::new();
        for source in sources {
            for api in self.detect_file(&source) {
                let key = (api.file_path.clone(), api.method, api.endpoint.clone());
                match unique.get(&key) {
                    Some(existing) if existing.line <= api.line => {}
                    _ => {
                        unique.insert(key, api);
                    }
                }
            }
        }
        unique.into_values().collect()
    }

    /// Verbs named by `methods=[...]` or `RequestMethod.X` in a declaration.
    fn declared_methods(&self, text: &str, default: HttpMethod) -> Vec<HttpMethod> {
        let mut methods = Vec::new();

        if let Some(list) = self
            .methods_list
            .as_ref()
            .and_then(|re| re.captures(text))
            .and_then(|caps| caps.name("list"))
        {
            methods.extend(
                list.as_str()
                    .split(',')
                    .map(|m| m.trim().trim_matches(|c: char| c == '"' || c == '\''))
                    .filter_map(HttpMethod::parse),
            );
        }

        if let Some(re) = &self.request_method {
            methods.extend(
                re.captures_iter(text)
                    .filter_map(|caps| caps.name("verb"))
                    .filter_map(|v| HttpMethod::parse(v.as_str())),
            );
        }

        methods.sort();
        methods.dedup();
        if methods.is_empty() {
            methods.push(default);
        }
        methods
    }
}

impl Default for ApiDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn line_of(content: &str, offset: usize) -> u32 {
    content[..offset].bytes().filter(|b| *b == b'\n').count() as u32 + 1
}

/// First function starting at or shortly below the declaration.
fn handler_for(functions: &[FunctionEntity], line: u32) -> Option<String> {
    functions
        .iter()
        .filter(|f| f.start_line >= line && f.start_line <= line + HANDLER_WINDOW)
        .min_by_key(|f| (f.start_line, f.qualified_name.as_str()))
        .map(|f| f.qualified_name.clone())
}
