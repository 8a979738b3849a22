//! Projects a graph snapshot and classified history into documents.
//!
//! Synthesis only reads: every section is derived from the snapshot handed
//! in, and each document records that snapshot's fingerprint.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde_json::json;

use super::document::{DocType, Document};
use crate::config::DocumentsConfig;
use crate::history::ClassifiedHistory;
use crate::knowledge::{
    ApiEntity, ClassEntity, FeatureEntity, FunctionEntity, GraphNode, Language, ModuleEntity,
    Relation, Snapshot,
};

const SUMMARY_CHARS: usize = 240;
const TOP_IMPORTS: usize = 10;

/// Everything a synthesis run reads.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisInput<'a> {
    pub snapshot: &'a Snapshot,
    pub history: &'a ClassifiedHistory,
    /// Files that produced a module
    pub parsed_files: usize,
    /// Files skipped on parse errors
    pub skipped_files: usize,
    /// Files no parser handles
    pub unsupported_files: usize,
}

/// Builds the four document types.
#[derive(Debug, Clone, Default)]
pub struct DocumentSynthesizer {
    config: DocumentsConfig,
}

impl DocumentSynthesizer {
    pub fn new(config: DocumentsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DocumentsConfig {
        &self.config
    }

    /// Render every document type, in [`DocType::ALL`] order.
    pub fn synthesize(&self, input: &SynthesisInput<'_>, version: u32) -> Vec<Document> {
        DocType::ALL
            .into_iter()
            .map(|doc_type| self.render(doc_type, input, version))
            .collect()
    }

    /// Render one document.
    pub fn render(&self, doc_type: DocType, input: &SynthesisInput<'_>, version: u32) -> Document {
        let view = GraphView::new(input.snapshot);
        let architecture = architecture_confidence(input.parsed_files, input.skipped_files, input.unsupported_files);

        let (content, confidence) = match doc_type {
            DocType::Architecture => (self.architecture(&view), architecture),
            DocType::Changelog => (
                self.changelog(input.history),
                changelog_confidence(input.history.categorized(), input.history.total()),
            ),
            DocType::Onboarding => (self.onboarding(&view), architecture),
            DocType::Comprehensive => (
                self.comprehensive(&view),
                comprehensive_confidence(architecture, view.participating_functions(), view.function_count),
            ),
        };

        let metadata = json!({
            "modules": view.modules.len(),
            "classes": view.class_count,
            "functions": view.function_count,
            "apis": view.apis.len(),
            "features": view.features.len(),
            "calls": view.calls.len(),
            "parsed_files": input.parsed_files,
            "skipped_files": input.skipped_files,
            "unsupported_files": input.unsupported_files,
            "commits": input.history.total(),
            "history_rules": input.history.rules_version,
        });

        Document::new(input.snapshot.repository.clone(), doc_type, content, confidence, version)
            .with_metadata(metadata)
            .with_fingerprint(input.snapshot.fingerprint())
    }

    fn architecture(&self, view: &GraphView<'_>) -> String {
        let mut md = String::new();
        md.push_str(&format!("# {}\n\n", DocType::Architecture.title()));

        md.push_str("## System Overview\n\n");
        md.push_str(&format!(
            "**{}** is a {} project with {} modules, {} classes, {} functions and {} APIs.\n\n",
            view.name,
            language_name(view.language),
            view.modules.len(),
            view.class_count,
            view.function_count,
            view.apis.len()
        ));

        md.push_str("## Modules\n\n");
        if view.modules.is_empty() {
            md.push_str("_No modules extracted._\n\n");
        }
        for module in view.modules.iter().take(self.config.architecture_module_limit) {
            md.push_str(&format!("### {} (`{}`)\n\n", module.entity.name, module.entity.file_path));
            if let Some(summary) = module.entity.doc_comment.as_deref().map(summarize) {
                md.push_str(&summary);
                md.push_str("\n\n");
            }
            if !module.classes.is_empty() {
                md.push_str(&format!(
                    "- Classes: {}\n",
                    code_list(module.classes.iter().map(|c| c.qualified_name.as_str()))
                ));
            }
            if !module.functions.is_empty() {
                md.push_str(&format!(
                    "- Functions: {}\n",
                    code_list(module.functions.iter().map(|f| f.qualified_name.as_str()))
                ));
            }
            md.push('\n');
        }
        if view.modules.len() > self.config.architecture_module_limit {
            md.push_str(&format!(
                "_...and {} more modules._\n\n",
                view.modules.len() - self.config.architecture_module_limit
            ));
        }

        md.push_str("## APIs\n\n");
        push_api_list(&mut md, &view.apis);

        md.push_str("## Diagram\n\n");
        md.push_str("```mermaid\ngraph TD\n");
        md.push_str(&format!("    repo[\"{}\"]\n", mermaid_label(view.name)));
        for (i, module) in view.modules.iter().take(self.config.architecture_module_limit).enumerate() {
            md.push_str(&format!("    repo --> m{}[\"{}\"]\n", i, mermaid_label(&module.entity.file_path)));
        }
        for (i, api) in view.apis.iter().enumerate() {
            md.push_str(&format!(
                "    repo --> a{}[\"{}\"]\n",
                i,
                mermaid_label(&format!("{} {}", api.method, api.endpoint))
            ));
        }
        md.push_str("```\n");
        md
    }

    fn changelog(&self, history: &ClassifiedHistory) -> String {
        let mut md = String::new();
        md.push_str(&format!("# {}\n\n", DocType::Changelog.title()));

        if history.total() == 0 {
            md.push_str("_No commit history available._\n");
            return md;
        }

        for (category, commits) in history.iter() {
            md.push_str(&format!("## {}\n\n", category.title()));
            if commits.is_empty() {
                md.push_str("_None._\n\n");
                continue;
            }
            for classified in commits.iter().take(self.config.changelog_per_section) {
                let commit = &classified.commit;
                md.push_str(&format!(
                    "- [{}] {} ({})\n",
                    commit.timestamp.format("%Y-%m-%d"),
                    commit.summary(),
                    commit.short_id()
                ));
            }
            if commits.len() > self.config.changelog_per_section {
                md.push_str(&format!(
                    "- _...and {} more_\n",
                    commits.len() - self.config.changelog_per_section
                ));
            }
            md.push('\n');
        }
        md
    }

    fn onboarding(&self, view: &GraphView<'_>) -> String {
        let mut md = String::new();
        md.push_str(&format!("# {}\n\n", DocType::Onboarding.title()));

        md.push_str("## Project Structure\n\n");
        md.push_str(&format!("- Language: {}\n", language_name(view.language)));
        md.push_str(&format!("- Modules: {}\n", view.modules.len()));
        md.push_str(&format!("- Classes: {}\n", view.class_count));
        md.push_str(&format!("- Functions: {}\n", view.function_count));
        md.push_str(&format!("- APIs: {}\n\n", view.apis.len()));

        md.push_str("## Entry Points\n\n");
        let entry_modules: Vec<&ModuleView<'_>> = view
            .modules
            .iter()
            .filter(|m| {
                let name = m.entity.name.to_lowercase();
                name.contains("main") || name.contains("app")
            })
            .collect();
        if entry_modules.is_empty() && view.apis.is_empty() {
            md.push_str("_No obvious entry points found._\n\n");
        } else {
            for module in entry_modules {
                md.push_str(&format!("- `{}` (module)\n", module.entity.file_path));
            }
            for api in &view.apis {
                md.push_str(&format!("- `{} {}` (API in `{}`)\n", api.method, api.endpoint, api.file_path));
            }
            md.push('\n');
        }

        md.push_str("## Key Modules\n\n");
        let mut ranked: Vec<&ModuleView<'_>> = view.modules.iter().collect();
        ranked.sort_by(|a, b| {
            b.functions
                .len()
                .cmp(&a.functions.len())
                .then_with(|| a.entity.file_path.cmp(&b.entity.file_path))
        });
        for (i, module) in ranked.iter().take(self.config.onboarding_module_limit).enumerate() {
            md.push_str(&format!(
                "{}. `{}` - {} functions\n",
                i + 1,
                module.entity.file_path,
                module.functions.len()
            ));
        }
        md
    }

    fn comprehensive(&self, view: &GraphView<'_>) -> String {
        let mut md = String::new();
        md.push_str(&format!("# {}\n\n", DocType::Comprehensive.title()));

        md.push_str("## Overview\n\n");
        md.push_str(&format!(
            "{} modules, {} classes, {} functions, {} APIs, {} features, {} call relationships.\n\n",
            view.modules.len(),
            view.class_count,
            view.function_count,
            view.apis.len(),
            view.features.len(),
            view.calls.len()
        ));

        md.push_str("## Modules\n\n");
        for module in &view.modules {
            md.push_str(&format!("### {} (`{}`)\n\n", module.entity.name, module.entity.file_path));
            if let Some(summary) = module.entity.doc_comment.as_deref().map(summarize) {
                md.push_str(&summary);
                md.push_str("\n\n");
            }

            let function_ids: BTreeSet<&str> = module.functions.iter().filter_map(|f| f.id.as_deref()).collect();
            let features: Vec<&str> = view
                .features
                .iter()
                .filter(|f| f.members.iter().any(|m| function_ids.contains(m)))
                .map(|f| f.entity.name.as_str())
                .collect();
            if !features.is_empty() {
                md.push_str(&format!("- Features: {}\n", features.join(", ")));
            }

            let calls: Vec<String> = view
                .calls
                .iter()
                .filter(|(caller, _)| caller.file_path == module.entity.file_path)
                .map(|(caller, callee)| format!("`{}` → `{}`", caller.qualified_name, callee.qualified_name))
                .collect();
            if !calls.is_empty() {
                md.push_str("- Calls:\n");
                for call in calls {
                    md.push_str(&format!("  - {}\n", call));
                }
            }
            md.push('\n');
        }

        md.push_str("## APIs\n\n");
        push_api_list(&mut md, &view.apis);

        md.push_str("## Features\n\n");
        if view.features.is_empty() {
            md.push_str("_No features identified._\n\n");
        } else {
            for feature in &view.features {
                md.push_str(&format!(
                    "- **{}** ({} functions)\n",
                    feature.entity.name,
                    feature.members.len()
                ));
            }
            md.push('\n');
        }

        md.push_str("## Imports\n\n");
        let imports = view.top_imports(TOP_IMPORTS);
        if imports.is_empty() {
            md.push_str("_No imports recorded._\n");
        }
        for (name, count) in imports {
            md.push_str(&format!("- `{}` ({})\n", name, count));
        }
        md
    }
}

/// Share of all listed files that parsed, 0..=100. Unsupported files count
/// as not analyzed. A repository without files is fully analyzed.
pub fn architecture_confidence(parsed: usize, skipped: usize, unsupported: usize) -> u8 {
    let total = parsed + skipped + unsupported;
    if total == 0 {
        return 100;
    }
    percent(parsed, total)
}

/// Share of commits placed in a category other than `other`; 0 for an empty log.
pub fn changelog_confidence(categorized: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    percent(categorized, total)
}

/// Three quarters architecture confidence, one quarter the share of
/// functions that belong to a feature or a call.
pub fn comprehensive_confidence(architecture: u8, participating: usize, functions: usize) -> u8 {
    let linked = if functions == 0 {
        0.0
    } else {
        participating as f64 / functions as f64
    };
    (architecture as f64 * 0.75 + linked * 25.0).round().clamp(0.0, 100.0) as u8
}

fn percent(part: usize, total: usize) -> u8 {
    ((part * 100 + total / 2) / total).min(100) as u8
}

fn language_name(language: Option<Language>) -> &'static str {
    language.map(|l| l.display_name()).unwrap_or("unknown")
}

/// First paragraph of a docstring, whitespace collapsed and capped.
fn summarize(doc: &str) -> String {
    let paragraph = doc.trim().split("\n\n").next().unwrap_or("");
    let text = paragraph.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.chars().count() <= SUMMARY_CHARS {
        return text;
    }
    let mut cut: String = text.chars().take(SUMMARY_CHARS).collect();
    cut.push_str("...");
    cut
}

fn code_list<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.map(|n| format!("`{}`", n)).collect::<Vec<_>>().join(", ")
}

fn mermaid_label(text: &str) -> String {
    text.replace('"', "#quot;")
}

fn push_api_list(md: &mut String, apis: &[&ApiEntity]) {
    if apis.is_empty() {
        md.push_str("_No APIs detected._\n\n");
        return;
    }
    for api in apis {
        md.push_str(&format!("- `{} {}` in `{}`", api.method, api.endpoint, api.file_path));
        if let Some(handler) = &api.handler {
            md.push_str(&format!(" (handler `{}`)", handler));
        }
        md.push('\n');
    }
    md.push('\n');
}

// =============================================================================
// Snapshot view
// =============================================================================

struct ModuleView<'a> {
    entity: &'a ModuleEntity,
    classes: Vec<&'a ClassEntity>,
    functions: Vec<&'a FunctionEntity>,
}

struct FeatureView<'a> {
    entity: &'a FeatureEntity,
    /// Included function ids
    members: Vec<&'a str>,
}

/// Typed, ordered view of a snapshot built from its edges.
struct GraphView<'a> {
    name: &'a str,
    language: Option<Language>,
    modules: Vec<ModuleView<'a>>,
    apis: Vec<&'a ApiEntity>,
    features: Vec<FeatureView<'a>>,
    calls: Vec<(&'a FunctionEntity, &'a FunctionEntity)>,
    class_count: usize,
    function_count: usize,
}

impl<'a> GraphView<'a> {
    fn new(snapshot: &'a Snapshot) -> Self {
        let nodes: HashMap<&str, &GraphNode> =
            snapshot.nodes.iter().filter_map(|n| n.id().map(|id| (id, n))).collect();

        let mut view = GraphView {
            name: snapshot.repository.as_str(),
            language: None,
            modules: Vec::new(),
            apis: Vec::new(),
            features: Vec::new(),
            calls: Vec::new(),
            class_count: 0,
            function_count: 0,
        };
        let mut module_slots: HashMap<&str, usize> = HashMap::new();
        let mut feature_slots: HashMap<&str, usize> = HashMap::new();

        for node in &snapshot.nodes {
            match node {
                GraphNode::Repository(r) => {
                    view.name = &r.name;
                    view.language = r.language;
                }
                GraphNode::Module(m) => {
                    if let Some(id) = node.id() {
                        module_slots.insert(id, view.modules.len());
                    }
                    view.modules.push(ModuleView {
                        entity: m,
                        classes: Vec::new(),
                        functions: Vec::new(),
                    });
                }
                GraphNode::Class(_) => view.class_count += 1,
                GraphNode::Function(_) => view.function_count += 1,
                GraphNode::Api(a) => view.apis.push(a),
                GraphNode::Feature(f) => {
                    if let Some(id) = node.id() {
                        feature_slots.insert(id, view.features.len());
                    }
                    view.features.push(FeatureView {
                        entity: f,
                        members: Vec::new(),
                    });
                }
            }
        }

        for edge in &snapshot.edges {
            let (Some(&from), Some(&to)) = (nodes.get(edge.from.as_str()), nodes.get(edge.to.as_str())) else {
                continue;
            };
            match (edge.relation, from, to) {
                (Relation::Defines, _, GraphNode::Class(c)) => {
                    if let Some(&slot) = module_slots.get(edge.from.as_str()) {
                        view.modules[slot].classes.push(c);
                    }
                }
                (Relation::Defines, _, GraphNode::Function(f)) => {
                    if let Some(&slot) = module_slots.get(edge.from.as_str()) {
                        view.modules[slot].functions.push(f);
                    }
                }
                (Relation::Includes, _, GraphNode::Function(_)) => {
                    if let Some(&slot) = feature_slots.get(edge.from.as_str()) {
                        view.features[slot].members.push(edge.to.as_str());
                    }
                }
                (Relation::Calls, GraphNode::Function(caller), GraphNode::Function(callee)) => {
                    view.calls.push((caller, callee));
                }
                _ => {}
            }
        }

        view.modules.sort_by(|a, b| a.entity.file_path.cmp(&b.entity.file_path));
        for module in &mut view.modules {
            module.classes.sort_by(|a, b| a.qualified_name.cmp(&b.qualified_name));
            module.functions.sort_by(|a, b| a.qualified_name.cmp(&b.qualified_name));
        }
        view.apis.sort_by(|a, b| {
            (&a.file_path, a.method, &a.endpoint).cmp(&(&b.file_path, b.method, &b.endpoint))
        });
        view.calls.sort_by(|a, b| {
            (&a.0.file_path, &a.0.qualified_name, &a.1.file_path, &a.1.qualified_name).cmp(&(
                &b.0.file_path,
                &b.0.qualified_name,
                &b.1.file_path,
                &b.1.qualified_name,
            ))
        });
        view
    }

    /// Functions included in a feature or at either end of a call.
    fn participating_functions(&self) -> usize {
        let mut ids: BTreeSet<&str> = BTreeSet::new();
        for feature in &self.features {
            ids.extend(feature.members.iter().copied());
        }
        for (caller, callee) in &self.calls {
            ids.extend(caller.id.as_deref());
            ids.extend(callee.id.as_deref());
        }
        ids.len()
    }

    /// Most imported names with the number of modules importing them.
    fn top_imports(&self, limit: usize) -> Vec<(&'a str, usize)> {
        let mut counts: BTreeMap<&'a str, usize> = BTreeMap::new();
        for module in &self.modules {
            let unique: BTreeSet<&'a str> = module.entity.imports.iter().map(String::as_str).collect();
            for name in unique {
                *counts.entry(name).or_default() += 1;
            }
        }
        let mut ranked: Vec<(&'a str, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(limit);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{CommitRecord, HistoryClassifier};
    use crate::knowledge::{CallLink, FunctionKey, GraphBuilder};
    use crate::knowledge::{ExtractedFile, FeatureGroup};
    use crate::repository::{Repository, RepositoryId};
    use chrono::{TimeZone, Utc};

    fn file(path: &str, functions: &[&str], imports: &[&str]) -> ExtractedFile {
        ExtractedFile {
            module: ModuleEntity {
                id: None,
                name: ModuleEntity::name_from_path(path),
                file_path: path.to_string(),
                language: Language::Python,
                doc_comment: Some("Entry point.\n\nMore detail here.".into()),
                imports: imports.iter().map(|i| i.to_string()).collect(),
                content_hash: String::new(),
                lines: 1,
            },
            classes: vec![],
            functions: functions.iter().map(|f| FunctionEntity::new(*f, path)).collect(),
            warnings: vec![],
        }
    }

    fn snapshot() -> Snapshot {
        let repo = Repository::new(RepositoryId::new("demo").unwrap(), "demo", "mem://demo");
        let mut builder = GraphBuilder::new(&repo, Some(Language::Python));
        builder.add_file(&file("app.py", &["main", "login"], &["os", "auth"]));
        builder.add_file(&file("auth.py", &["check"], &["os"]));
        builder.add_calls(&[CallLink {
            caller: FunctionKey::new("app.py", "login"),
            callee: FunctionKey::new("auth.py", "check"),
        }]);
        builder.add_features(
            &[FeatureGroup {
                label: "Authentication".into(),
                keywords: vec!["login".into()],
                members: vec![FunctionKey::new("app.py", "login")],
            }],
            "features-v1",
        );
        let content = builder.build();
        Snapshot {
            repository: repo.id,
            generation: 1,
            nodes: content.nodes,
            edges: content.edges,
        }
    }

    fn history() -> ClassifiedHistory {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        HistoryClassifier::new().classify(&[
            CommitRecord::new("aaaaaaa111", "feat: add login", at, "ada"),
            CommitRecord::new("bbbbbbb222", "wip", at, "ada"),
        ])
    }

    #[test]
    fn test_confidence_formulas() {
        assert_eq!(architecture_confidence(0, 0, 0), 100);
        assert_eq!(architecture_confidence(2, 1, 0), 67);
        assert_eq!(architecture_confidence(0, 3, 0), 0);
        assert_eq!(architecture_confidence(0, 0, 9), 0);
        assert_eq!(architecture_confidence(1, 0, 9), 10);
        assert_eq!(architecture_confidence(1, 1, 0), 50);
        // More of the repository analyzed never scores lower.
        for unsupported in 0..10 {
            assert!(architecture_confidence(2, 0, unsupported) >= architecture_confidence(1, 1, unsupported));
            assert!(architecture_confidence(1, 0, unsupported) >= architecture_confidence(0, 0, unsupported + 1));
        }
        assert_eq!(changelog_confidence(0, 0), 0);
        assert_eq!(changelog_confidence(1, 2), 50);
        assert_eq!(comprehensive_confidence(100, 4, 4), 100);
        assert_eq!(comprehensive_confidence(100, 0, 4), 75);
        assert!(comprehensive_confidence(50, 2, 4) < comprehensive_confidence(60, 2, 4));
    }

    #[test]
    fn test_synthesize_all_documents() {
        let snapshot = snapshot();
        let history = history();
        let input = SynthesisInput {
            snapshot: &snapshot,
            history: &history,
            parsed_files: 2,
            skipped_files: 0,
            unsupported_files: 0,
        };
        let docs = DocumentSynthesizer::default().synthesize(&input, 3);

        let types: Vec<DocType> = docs.iter().map(|d| d.doc_type).collect();
        assert_eq!(types, DocType::ALL.to_vec());
        assert!(docs.iter().all(|d| d.version == 3 && d.fingerprint == snapshot.fingerprint()));

        let architecture = &docs[0];
        assert_eq!(architecture.confidence, 100);
        assert!(architecture.content.contains("### app (`app.py`)"));
        assert!(architecture.content.contains("- Functions: `login`, `main`"));
        assert!(architecture.content.contains("```mermaid"));
        assert_eq!(architecture.metadata["functions"], 3);

        let changelog = &docs[1];
        assert_eq!(changelog.confidence, 50);
        assert!(changelog.content.contains("## Features\n\n- [2026-03-01] feat: add login (aaaaaaa)"));
        assert!(changelog.content.contains("## Other Changes\n\n- [2026-03-01] wip (bbbbbbb)"));

        let onboarding = &docs[2];
        assert!(onboarding.content.contains("- `app.py` (module)"));
        assert!(onboarding.content.contains("1. `app.py` - 2 functions"));

        let comprehensive = &docs[3];
        assert!(comprehensive.content.contains("- Features: Authentication"));
        assert!(comprehensive.content.contains("`login` → `check`"));
        assert!(comprehensive.content.contains("- `os` (2)"));
        assert!(comprehensive.content.contains("Entry point."));
        assert!(!comprehensive.content.contains("More detail here."));
        // login and check participate out of three functions.
        assert_eq!(comprehensive.confidence, 92);
    }

    #[test]
    fn test_empty_history_changelog() {
        let snapshot = snapshot();
        let history = HistoryClassifier::new().classify(&[]);
        let input = SynthesisInput {
            snapshot: &snapshot,
            history: &history,
            parsed_files: 2,
            skipped_files: 0,
            unsupported_files: 0,
        };
        let doc = DocumentSynthesizer::default().render(DocType::Changelog, &input, 1);
        assert_eq!(doc.confidence, 0);
        assert!(doc.content.contains("No commit history"));
    }
}
