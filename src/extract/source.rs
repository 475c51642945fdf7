//! Per-analysis file access shared by all extractors.
//!
//! The `SourceCache` keeps each file's text for the lifetime of one analysis
//! so that several categories scanning the same file read it once. Failed
//! reads are cached as `None` and contribute no facts.

use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::resolve::{relative_path, Resolver};

/// Bytes inspected when deciding whether a file is binary.
const BINARY_SNIFF_BYTES: usize = 8000;

/// Read-through cache of file contents keyed by absolute path.
pub struct SourceCache {
    max_file_bytes: u64,
    entries: RwLock<HashMap<PathBuf, Option<Arc<str>>>>,
}

impl SourceCache {
    pub fn new(max_file_bytes: u64) -> Self {
        Self {
            max_file_bytes,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Text of `path`, or `None` if it is unreadable, binary or too large.
    pub fn read(&self, path: &Path) -> Option<Arc<str>> {
        if let Ok(cache) = self.entries.read() {
            if let Some(entry) = cache.get(path) {
                return entry.clone();
            }
        }

        let loaded = self.load(path);

        if let Ok(mut cache) = self.entries.write() {
            cache.insert(path.to_path_buf(), loaded.clone());
        }
        loaded
    }

    /// Number of distinct paths read so far.
    pub fn len(&self) -> usize {
        self.entries.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn load(&self, path: &Path) -> Option<Arc<str>> {
        match fs::metadata(path) {
            Ok(meta) if meta.len() > self.max_file_bytes => {
                tracing::debug!("skipping {} ({} bytes)", path.display(), meta.len());
                return None;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!("cannot stat {}: {}", path.display(), e);
                return None;
            }
        }

        let bytes = match fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                tracing::debug!("cannot read {}: {}", path.display(), e);
                return None;
            }
        };

        let head = &bytes[..bytes.len().min(BINARY_SNIFF_BYTES)];
        if head.contains(&0) {
            tracing::debug!("skipping binary file {}", path.display());
            return None;
        }

        Some(Arc::from(String::from_utf8_lossy(&bytes).into_owned()))
    }
}

/// Everything an extractor needs for one analysis: the root, the resolver
/// and the shared read cache.
pub struct Workspace<'a> {
    root: &'a Path,
    resolver: &'a Resolver,
    cache: &'a SourceCache,
    parallel: bool,
}

impl<'a> Workspace<'a> {
    pub fn new(root: &'a Path, resolver: &'a Resolver, cache: &'a SourceCache, parallel: bool) -> Self {
        Self {
            root,
            resolver,
            cache,
            parallel,
        }
    }

    pub fn root(&self) -> &Path {
        self.root
    }

    /// Files matching any of `patterns`, in pattern order, without duplicates.
    pub fn files(&self, patterns: &[&str]) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        let mut files = Vec::new();
        for pattern in patterns {
            for path in self.resolver.resolve(self.root, pattern) {
                if seen.insert(path.clone()) {
                    files.push(path);
                }
            }
        }
        files
    }

    /// Read a single file relative to the root.
    pub fn read_rel(&self, rel: &str) -> Option<Arc<str>> {
        self.cache.read(&self.root.join(rel))
    }

    /// Run `extract` over every file matching `patterns` and concatenate the
    /// records in file order.
    ///
    /// `extract` receives the root-relative path and the file text. Files
    /// that cannot be read are skipped.
    pub fn scan<T, F>(&self, patterns: &[&str], extract: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&str, &str) -> Vec<T> + Sync,
    {
        let files = self.files(patterns);
        let per_file = |path: &PathBuf| -> Vec<T> {
            match self.cache.read(path) {
                Some(content) => extract(&relative_path(self.root, path), content.as_ref()),
                None => Vec::new(),
            }
        };

        if self.parallel {
            files.par_iter().map(per_file).collect::<Vec<_>>().into_iter().flatten().collect()
        } else {
            files.iter().flat_map(per_file).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cache_reads_once() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.txt");
        std::fs::write(&path, "first").unwrap();

        let cache = SourceCache::new(1024);
        assert_eq!(cache.read(&path).as_deref(), Some("first"));

        std::fs::write(&path, "second").unwrap();
        assert_eq!(cache.read(&path).as_deref(), Some("first"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_binary_and_oversized_files_skipped() {
        let temp = TempDir::new().unwrap();
        let bin = temp.path().join("blob.py");
        std::fs::write(&bin, [0u8, 159, 146, 150]).unwrap();
        let big = temp.path().join("big.py");
        std::fs::write(&big, "x".repeat(64)).unwrap();

        let cache = SourceCache::new(32);
        assert!(cache.read(&bin).is_none());
        assert!(cache.read(&big).is_none());
        assert!(cache.read(&temp.path().join("missing.py")).is_none());
    }

    #[test]
    fn test_scan_preserves_file_order() {
        let temp = TempDir::new().unwrap();
        for name in ["c.py", "a.py", "b.py"] {
            std::fs::write(temp.path().join(name), name).unwrap();
        }
        let resolver = Resolver::new();
        let cache = SourceCache::new(1024);

        for parallel in [true, false] {
            let ws = Workspace::new(temp.path(), &resolver, &cache, parallel);
            let names = ws.scan(&["**/*.py"], |rel, _| vec![rel.to_string()]);
            assert_eq!(names, vec!["a.py", "b.py", "c.py"]);
        }
    }

    #[test]
    fn test_files_deduplicates_across_patterns() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("services")).unwrap();
        std::fs::write(temp.path().join("services/user_service.py"), "").unwrap();
        let resolver = Resolver::new();
        let cache = SourceCache::new(1024);
        let ws = Workspace::new(temp.path(), &resolver, &cache, false);
        let files = ws.files(&["**/services/**/*.py", "**/*service*.py"]);
        assert_eq!(files.len(), 1);
    }
}
