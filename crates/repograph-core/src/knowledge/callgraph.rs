//! Heuristic, name-based call graph.
//!
//! Each identifier a function invokes is matched against the simple names of
//! every function in the repository. No type or import resolution is done:
//! the result is unsound but useful, and never reaches outside the repository.
//!
//! Resolution order for a name with several candidates:
//! 1. candidates declared in the caller's own module
//! 2. every candidate
//!
//! Within a tier the first candidate by `(module path, qualified name)` wins.
//! A function never gets a CALLS edge to itself; recursion and same-named
//! methods calling through to another object are indistinguishable here.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::ontology::FunctionEntity;

/// Repository-wide identity of a function.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FunctionKey {
    /// Owning module's file path
    pub module_path: String,
    pub qualified_name: String,
}

impl FunctionKey {
    pub fn new(module_path: impl Into<String>, qualified_name: impl Into<String>) -> Self {
        Self {
            module_path: module_path.into(),
            qualified_name: qualified_name.into(),
        }
    }

    pub fn of(func: &FunctionEntity) -> Self {
        Self::new(func.file_path.clone(), func.qualified_name.clone())
    }
}

impl std::fmt::Display for FunctionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.module_path, self.qualified_name)
    }
}

/// A resolved caller → callee pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CallLink {
    pub caller: FunctionKey,
    pub callee: FunctionKey,
}

/// Derives CALLS links from extracted functions.
#[derive(Debug, Default)]
pub struct CallGraphBuilder;

impl CallGraphBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Resolve call sites of `functions` to links, sorted and deduplicated.
    pub fn build<'a, I>(&self, functions: I) -> Vec<CallLink>
    where
        I: IntoIterator<Item = &'a FunctionEntity>,
    {
        let functions: Vec<&FunctionEntity> = functions.into_iter().collect();

        // Simple name → candidates, each list sorted by (module path, qualified name).
        let mut by_name: BTreeMap<&str, Vec<FunctionKey>> = BTreeMap::new();
        for func in &functions {
            by_name.entry(func.name.as_str()).or_default().push(FunctionKey::of(func));
        }
        for candidates in by_name.values_mut() {
            candidates.sort();
            candidates.dedup();
        }

        let mut links = BTreeSet::new();
        for func in &functions {
            let caller = FunctionKey::of(func);
            for name in &func.calls {
                let Some(candidates) = by_name.get(name.as_str()) else {
                    continue;
                };
                if let Some(callee) = Self::resolve(&caller, candidates) {
                    links.insert(CallLink {
                        caller: caller.clone(),
                        callee: callee.clone(),
                    });
                }
            }
        }

        links.into_iter().collect()
    }

    fn resolve<'c>(caller: &FunctionKey, candidates: &'c [FunctionKey]) -> Option<&'c FunctionKey> {
        let eligible = |c: &&FunctionKey| *c != caller;
        candidates
            .iter()
            .filter(eligible)
            .find(|c| c.module_path == caller.module_path)
            .or_else(|| candidates.iter().find(eligible))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn func(path: &str, name: &str, calls: &[&str]) -> FunctionEntity {
        let mut f = FunctionEntity::new(name, path);
        f.calls = calls.iter().map(|c| c.to_string()).collect();
        f
    }

    fn method(path: &str, class: &str, name: &str, calls: &[&str]) -> FunctionEntity {
        func(path, name, calls).with_parent(class)
    }

    #[test]
    fn test_cross_module_call() {
        let functions = vec![func("a.py", "foo", &["bar"]), func("b.py", "bar", &[])];
        let links = CallGraphBuilder::new().build(&functions);
        assert_eq!(
            links,
            vec![CallLink {
                caller: FunctionKey::new("a.py", "foo"),
                callee: FunctionKey::new("b.py", "bar"),
            }]
        );
    }

    #[test]
    fn test_unresolved_names_are_dropped() {
        let functions = vec![func("a.py", "foo", &["print", "len"])];
        assert!(CallGraphBuilder::new().build(&functions).is_empty());
    }

    #[test]
    fn test_same_module_preferred() {
        let functions = vec![
            func("a.py", "save", &[]),
            func("z.py", "save", &[]),
            func("z.py", "handler", &["save"]),
        ];
        let links = CallGraphBuilder::new().build(&functions);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].callee, FunctionKey::new("z.py", "save"));
    }

    #[test]
    fn test_stable_order_when_no_local_match() {
        let functions = vec![
            func("m/z.py", "load", &[]),
            method("m/b.py", "Cache", "load", &[]),
            func("m/b.py", "load", &[]),
            func("main.py", "run", &["load"]),
        ];
        let links = CallGraphBuilder::new().build(&functions);
        // "m/b.py" sorts first; within it "Cache.load" precedes "load".
        assert_eq!(links[0].callee, FunctionKey::new("m/b.py", "Cache.load"));
    }

    #[test]
    fn test_no_self_loops() {
        let functions = vec![
            func("a.py", "walk", &["walk"]),
            method("a.py", "Tree", "walk", &["walk"]),
        ];
        let links = CallGraphBuilder::new().build(&functions);
        // Each resolves to the other candidate rather than itself.
        assert_eq!(links.len(), 2);
        assert!(links.iter().all(|l| l.caller != l.callee));

        let lone = vec![func("a.py", "recurse", &["recurse"])];
        assert!(CallGraphBuilder::new().build(&lone).is_empty());
    }

    #[test]
    fn test_build_is_order_independent() {
        let mut functions = vec![
            func("a.py", "foo", &["bar", "baz"]),
            func("b.py", "bar", &["baz"]),
            func("c.py", "baz", &[]),
        ];
        let first = CallGraphBuilder::new().build(&functions);
        functions.reverse();
        let second = CallGraphBuilder::new().build(&functions);
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }
}
