//! Analysis settings loaded from an optional YAML file.
//!
//! Every field has a default, so an absent file and an empty file behave the
//! same way.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings file names searched for, in order.
pub const DEFAULT_SETTINGS_NAMES: &[&str] = &["stacklens.yaml", ".stacklens.yaml"];

/// Tunable knobs for an analysis run.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Directory names excluded in addition to the built-in set.
    pub excluded_dirs: Vec<String>,
    /// Glob patterns (relative to the analyzed root) to exclude, e.g. "**/fixtures/**".
    pub excluded_paths: Vec<String>,
    /// Files larger than this many bytes are never read.
    pub max_file_bytes: u64,
    /// Run category and per-file extraction on the rayon pool.
    pub parallel: bool,
    /// Number of Python files sniffed for framework imports.
    pub python_sample_limit: usize,
    /// Number of Java/Kotlin files sniffed for framework annotations.
    pub java_sample_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            excluded_dirs: Vec::new(),
            excluded_paths: Vec::new(),
            max_file_bytes: 1024 * 1024,
            parallel: true,
            python_sample_limit: 20,
            java_sample_limit: 30,
        }
    }
}

impl Settings {
    /// Parse settings from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::parse_str(&content)
    }

    /// Parse settings from YAML text. Empty text yields the defaults.
    pub fn parse_str(content: &str) -> anyhow::Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Settings = serde_yaml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that cannot produce a meaningful run.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_file_bytes == 0 {
            anyhow::bail!("max_file_bytes must be greater than zero");
        }
        for pattern in &self.excluded_paths {
            globset::Glob::new(pattern)
                .map_err(|e| anyhow::anyhow!("invalid excluded_paths glob {:?}: {}", pattern, e))?;
        }
        Ok(())
    }

    /// Look for a settings file in `root`, then in the current directory.
    pub fn discover(root: &Path) -> Option<PathBuf> {
        let dirs = [root.to_path_buf(), PathBuf::from(".")];
        dirs.iter()
            .flat_map(|dir| DEFAULT_SETTINGS_NAMES.iter().map(move |name| dir.join(name)))
            .find(|p| p.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_from_empty() {
        let settings = Settings::parse_str("").unwrap();
        assert!(settings.parallel);
        assert_eq!(settings.python_sample_limit, 20);
        assert_eq!(settings.java_sample_limit, 30);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let settings = Settings::parse_str("excluded_dirs: [generated]\nparallel: false\n").unwrap();
        assert_eq!(settings.excluded_dirs, vec!["generated".to_string()]);
        assert!(!settings.parallel);
        assert_eq!(settings.max_file_bytes, 1024 * 1024);
    }

    #[test]
    fn test_invalid_glob_rejected() {
        let err = Settings::parse_str("excluded_paths: [\"a/{b\"]\n").unwrap_err();
        assert!(err.to_string().contains("excluded_paths"));
    }

    #[test]
    fn test_zero_max_file_bytes_rejected() {
        assert!(Settings::parse_str("max_file_bytes: 0\n").is_err());
    }

    #[test]
    fn test_discover_in_root() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(".stacklens.yaml"), "parallel: false\n").unwrap();
        let found = Settings::discover(temp.path()).unwrap();
        assert!(found.ends_with(".stacklens.yaml"));
        assert!(!Settings::parse_file(found).unwrap().parallel);
    }
}
