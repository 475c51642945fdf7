//! Manifest parsing shared by the detector and the config reader.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// The subset of `package.json` the detector cares about.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PackageJson {
    pub name: Option<String>,
    pub version: Option<String>,
    pub dependencies: BTreeMap<String, Value>,
    #[serde(rename = "devDependencies")]
    pub dev_dependencies: BTreeMap<String, Value>,
    #[serde(rename = "peerDependencies")]
    pub peer_dependencies: BTreeMap<String, Value>,
    pub scripts: BTreeMap<String, Value>,
}

impl PackageJson {
    /// Parse `package.json` text. Returns `None` when it is not valid JSON.
    pub fn parse(content: &str) -> Option<Self> {
        serde_json::from_str(content).ok()
    }

    /// Whether any dependency table declares `name`.
    pub fn depends_on(&self, name: &str) -> bool {
        self.dependencies.contains_key(name)
            || self.dev_dependencies.contains_key(name)
            || self.peer_dependencies.contains_key(name)
    }
}

/// Node manifest as seen by the detector: parsed when possible, raw otherwise.
pub enum NodeManifest {
    Parsed(PackageJson),
    Raw(String),
}

impl NodeManifest {
    pub fn load(root: &Path) -> Option<Self> {
        let content = fs::read_to_string(root.join("package.json")).ok()?;
        Some(match PackageJson::parse(&content) {
            Some(pkg) => NodeManifest::Parsed(pkg),
            None => NodeManifest::Raw(content),
        })
    }

    /// Dependency lookup; raw manifests fall back to a quoted-key search.
    pub fn depends_on(&self, name: &str) -> bool {
        match self {
            NodeManifest::Parsed(pkg) => pkg.depends_on(name),
            NodeManifest::Raw(text) => text.contains(&format!("\"{}\"", name)),
        }
    }
}

/// Read a file as text, treating any failure as absent.
pub fn read_marker(root: &Path, name: &str) -> Option<String> {
    fs::read_to_string(root.join(name)).ok()
}

/// Whether `root` directly contains a file with extension `ext`.
pub fn has_file_with_extension(root: &Path, ext: &str) -> bool {
    fs::read_dir(root)
        .map(|entries| {
            entries.flatten().any(|e| {
                let path = e.path();
                path.is_file() && path.extension().and_then(|x| x.to_str()) == Some(ext)
            })
        })
        .unwrap_or(false)
}

/// First file in `root` (sorted by name) with extension `ext`.
pub fn first_file_with_extension(root: &Path, ext: &str) -> Option<std::path::PathBuf> {
    let mut matches: Vec<_> = fs::read_dir(root)
        .ok()?
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().and_then(|x| x.to_str()) == Some(ext))
        .collect();
    matches.sort();
    matches.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_package_json_dependency_tables() {
        let pkg = PackageJson::parse(
            r#"{"name":"web","dependencies":{"react":"^18"},"devDependencies":{"typescript":"^5"}}"#,
        )
        .unwrap();
        assert!(pkg.depends_on("react"));
        assert!(pkg.depends_on("typescript"));
        assert!(!pkg.depends_on("vue"));
        assert_eq!(pkg.name.as_deref(), Some("web"));
    }

    #[test]
    fn test_raw_manifest_fallback() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("package.json"),
            "{ \"dependencies\": { \"express\": \"4\", } }",
        )
        .unwrap();
        let manifest = NodeManifest::load(temp.path()).unwrap();
        assert!(matches!(manifest, NodeManifest::Raw(_)));
        assert!(manifest.depends_on("express"));
        assert!(!manifest.depends_on("hono"));
    }

    #[test]
    fn test_extension_lookup() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("Api.csproj"), "<Project/>").unwrap();
        assert!(has_file_with_extension(temp.path(), "csproj"));
        assert!(!has_file_with_extension(temp.path(), "sln"));
        assert!(first_file_with_extension(temp.path(), "csproj")
            .unwrap()
            .ends_with("Api.csproj"));
    }
}
