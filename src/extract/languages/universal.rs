//! Language-agnostic route scan used when no stack-specific extractor applies.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

use crate::extract::text::normalize_route;
use crate::extract::{Route, Workspace};

const SOURCE_GLOBS: &[&str] = &[
    "**/*.js", "**/*.mjs", "**/*.cjs", "**/*.jsx", "**/*.ts", "**/*.tsx", "**/*.py", "**/*.rb",
    "**/*.go", "**/*.java", "**/*.kt", "**/*.scala", "**/*.php", "**/*.cs", "**/*.rs", "**/*.ex",
    "**/*.exs", "**/*.cr", "**/*.dart", "**/*.swift",
];

lazy_static! {
    static ref VERB_PATH: Regex =
        Regex::new(r#"(?i)\b(get|post|put|patch|delete)\s*\(?\s*["'`](/[^"'`\s]*)["'`]"#).unwrap();
}

/// Verb-and-path pairs anywhere in source, first occurrence of each
/// `(method, path)` kept.
pub fn universal_routes(ws: &Workspace) -> Vec<Route> {
    let mut seen = HashSet::new();
    ws.scan(SOURCE_GLOBS, verb_paths)
        .into_iter()
        .filter(|r| seen.insert((r.method.clone(), r.path.clone())))
        .collect()
}

pub(crate) fn verb_paths(rel: &str, content: &str) -> Vec<Route> {
    VERB_PATH
        .captures_iter(content)
        .map(|caps| Route::new(&caps[1], normalize_route(&caps[2]), None, rel))
        .collect()
}
