//! Candidate file resolution.
//!
//! Expands a glob relative to a root directory while pruning dependency
//! caches, build output, vendored code and version-control metadata.

use globset::{Glob, GlobMatcher, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::settings::Settings;

/// Directory names that are never descended into.
pub const EXCLUDED_DIRS: &[&str] = &[
    "node_modules",
    "bower_components",
    "vendor",
    "deps",
    "_build",
    "target",
    "build",
    "dist",
    "out",
    ".git",
    ".hg",
    ".svn",
    "__pycache__",
    ".venv",
    "venv",
    "env",
    ".tox",
    ".mypy_cache",
    ".pytest_cache",
    ".next",
    ".nuxt",
    ".svelte-kit",
    ".output",
    "bin",
    "obj",
    "coverage",
    ".gradle",
    ".idea",
    ".vscode",
    "tmp",
    "log",
];

/// Resolves glob patterns to ordered file lists under a root.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    extra_dirs: Vec<String>,
    excluded_paths: Option<GlobSet>,
}

impl Resolver {
    /// Resolver with only the built-in exclusions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver honouring the extra exclusions in `settings`.
    ///
    /// Invalid globs are skipped; [`Settings::validate`] reports them earlier.
    pub fn from_settings(settings: &Settings) -> Self {
        let excluded_paths = if settings.excluded_paths.is_empty() {
            None
        } else {
            let mut builder = GlobSetBuilder::new();
            for pattern in &settings.excluded_paths {
                match Glob::new(pattern) {
                    Ok(glob) => {
                        builder.add(glob);
                    }
                    Err(e) => tracing::warn!("ignoring excluded_paths glob {:?}: {}", pattern, e),
                }
            }
            builder.build().ok()
        };

        Self {
            extra_dirs: settings.excluded_dirs.clone(),
            excluded_paths,
        }
    }

    /// Whether a directory name is pruned from every walk.
    pub fn is_excluded_dir(&self, name: &str) -> bool {
        EXCLUDED_DIRS.contains(&name) || self.extra_dirs.iter().any(|d| d == name)
    }

    /// Expand `pattern` under `root`.
    ///
    /// The result is sorted and deterministic. A missing root or a malformed
    /// pattern yields an empty list.
    pub fn resolve(&self, root: &Path, pattern: &str) -> Vec<PathBuf> {
        let matcher = match compile(pattern) {
            Some(m) => m,
            None => {
                tracing::debug!("unusable glob pattern {:?}", pattern);
                return Vec::new();
            }
        };

        if !root.is_dir() {
            return Vec::new();
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.prunes(e));

        for entry in walker.filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = match entry.path().strip_prefix(root) {
                Ok(r) => r,
                Err(_) => continue,
            };
            if !matcher.is_match(rel) {
                continue;
            }
            if let Some(excluded) = &self.excluded_paths {
                if excluded.is_match(rel) {
                    continue;
                }
            }
            files.push(entry.into_path());
        }

        files
    }

    fn prunes(&self, entry: &DirEntry) -> bool {
        entry.file_type().is_dir() && self.is_excluded_dir(&entry.file_name().to_string_lossy())
    }
}

/// Expand `pattern` under `root` with the built-in exclusions only.
pub fn resolve(root: &Path, pattern: &str) -> Vec<PathBuf> {
    Resolver::new().resolve(root, pattern)
}

/// Path of `path` relative to `root`, with forward slashes.
pub fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn compile(pattern: &str) -> Option<GlobMatcher> {
    globset::GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .ok()
        .map(|g| g.compile_matcher())
}
