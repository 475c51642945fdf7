//! Project metadata: config manifests and the README.
//!
//! Each reader looks at one manifest family in the analyzed root and returns
//! a flat map. Missing or unparseable manifests produce an empty map; a map
//! read from a manifest always carries a `type` key naming it.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::dispatch::CONFIG;
use crate::stack::manifest::{first_file_with_extension, read_marker, PackageJson};
use crate::stack::Stack;

/// Free-form project configuration.
pub type ConfigMap = BTreeMap<String, Value>;

/// README names tried in order.
pub const README_NAMES: &[&str] = &[
    "README.md",
    "readme.md",
    "Readme.md",
    "README.MD",
    "README.rst",
    "README.txt",
    "README",
    "readme.txt",
];

lazy_static! {
    static ref MIX_APP: Regex = Regex::new(r"\bapp:\s*:(\w+)").unwrap();
    static ref MIX_VERSION: Regex = Regex::new(r#"\bversion:\s*"([^"]+)""#).unwrap();
    static ref SETUP_NAME: Regex = Regex::new(r#"\bname\s*=\s*['"]([^'"]+)['"]"#).unwrap();
    static ref SETUP_VERSION: Regex = Regex::new(r#"\bversion\s*=\s*['"]([^'"]+)['"]"#).unwrap();
    static ref RUBY_MODULE: Regex = Regex::new(r"(?m)^module\s+(\w+)").unwrap();
    static ref GEMFILE_RUBY: Regex = Regex::new(r#"(?m)^ruby\s+['"]([^'"]+)['"]"#).unwrap();
    static ref GO_MODULE: Regex = Regex::new(r"(?m)^module\s+(\S+)").unwrap();
    static ref GO_VERSION: Regex = Regex::new(r"(?m)^go\s+(\S+)").unwrap();
    static ref POM_PARENT: Regex = Regex::new(r"(?s)<parent>.*?</parent>").unwrap();
    static ref POM_ARTIFACT: Regex = Regex::new(r"<artifactId>\s*([^<\s]+)\s*</artifactId>").unwrap();
    static ref POM_VERSION: Regex = Regex::new(r"<version>\s*([^<\s]+)\s*</version>").unwrap();
    static ref GRADLE_ROOT: Regex = Regex::new(r#"rootProject\.name\s*=\s*['"]([^'"]+)['"]"#).unwrap();
    static ref TARGET_FRAMEWORK: Regex =
        Regex::new(r"<TargetFrameworks?>\s*([^<]+?)\s*</TargetFrameworks?>").unwrap();
}

/// Configuration for `stack`, read with the reader registered for its language.
pub fn read_config(root: &Path, stack: &Stack) -> ConfigMap {
    match CONFIG.select(stack) {
        Some((_, reader)) => reader(root),
        None => ConfigMap::new(),
    }
}

/// Contents of the first README found in `root`.
pub fn read_readme(root: &Path) -> Option<String> {
    README_NAMES.iter().find_map(|name| {
        let path = root.join(name);
        if path.is_file() {
            fs::read_to_string(path).ok()
        } else {
            None
        }
    })
}

fn tagged(kind: &str) -> ConfigMap {
    let mut map = ConfigMap::new();
    map.insert("type".to_string(), Value::from(kind));
    map
}

fn insert_capture(map: &mut ConfigMap, key: &str, re: &Regex, text: &str) {
    if let Some(caps) = re.captures(text) {
        map.insert(key.to_string(), Value::from(&caps[1]));
    }
}

fn read_toml(root: &Path, name: &str) -> Option<toml::Value> {
    let content = read_marker(root, name)?;
    match content.parse::<toml::Value>() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!("cannot parse {}: {}", name, e);
            None
        }
    }
}

/// String at a dotted path inside a TOML document.
fn toml_str<'a>(value: &'a toml::Value, path: &[&str]) -> Option<&'a str> {
    path.iter()
        .try_fold(value, |v, key| v.get(*key))
        .and_then(|v| v.as_str())
}

/// `mix.exs`: `app` and `version`.
pub fn mix_config(root: &Path) -> ConfigMap {
    let Some(mix) = read_marker(root, "mix.exs") else {
        return ConfigMap::new();
    };
    let mut map = tagged("mix");
    insert_capture(&mut map, "app", &MIX_APP, &mix);
    insert_capture(&mut map, "version", &MIX_VERSION, &mix);
    map
}

/// `pyproject.toml` (PEP 621 or Poetry), else `setup.py`.
pub fn python_config(root: &Path) -> ConfigMap {
    if let Some(pyproject) = read_toml(root, "pyproject.toml") {
        let mut map = tagged("pyproject");
        for key in ["name", "version"] {
            let value = toml_str(&pyproject, &["project", key])
                .or_else(|| toml_str(&pyproject, &["tool", "poetry", key]));
            if let Some(value) = value {
                map.insert(key.to_string(), Value::from(value));
            }
        }
        return map;
    }
    if let Some(setup) = read_marker(root, "setup.py") {
        let mut map = tagged("setup.py");
        insert_capture(&mut map, "name", &SETUP_NAME, &setup);
        insert_capture(&mut map, "version", &SETUP_VERSION, &setup);
        return map;
    }
    ConfigMap::new()
}

/// `package.json`: `name`, `version` and the script names.
pub fn package_config(root: &Path) -> ConfigMap {
    let Some(pkg) = read_marker(root, "package.json").and_then(|c| PackageJson::parse(&c)) else {
        return ConfigMap::new();
    };
    let mut map = tagged("package.json");
    if let Some(name) = pkg.name {
        map.insert("name".to_string(), Value::from(name));
    }
    if let Some(version) = pkg.version {
        map.insert("version".to_string(), Value::from(version));
    }
    if !pkg.scripts.is_empty() {
        let scripts: Vec<Value> = pkg.scripts.keys().map(|k| Value::from(k.as_str())).collect();
        map.insert("scripts".to_string(), Value::Array(scripts));
    }
    map
}

/// `Gemfile` ruby version and the application module from `config/application.rb`.
pub fn ruby_config(root: &Path) -> ConfigMap {
    let Some(gemfile) = read_marker(root, "Gemfile") else {
        return ConfigMap::new();
    };
    let mut map = tagged("gemfile");
    insert_capture(&mut map, "ruby", &GEMFILE_RUBY, &gemfile);
    if let Some(application) = read_marker(root, "config/application.rb") {
        insert_capture(&mut map, "app", &RUBY_MODULE, &application);
    }
    map
}

/// `go.mod`: `module` and `go` directive.
pub fn go_config(root: &Path) -> ConfigMap {
    let Some(gomod) = read_marker(root, "go.mod") else {
        return ConfigMap::new();
    };
    let mut map = tagged("go.mod");
    insert_capture(&mut map, "module", &GO_MODULE, &gomod);
    insert_capture(&mut map, "go", &GO_VERSION, &gomod);
    map
}

/// `Cargo.toml`: package name, version and edition.
pub fn cargo_config(root: &Path) -> ConfigMap {
    let Some(cargo) = read_toml(root, "Cargo.toml") else {
        return ConfigMap::new();
    };
    let mut map = tagged("cargo");
    for key in ["name", "version", "edition"] {
        if let Some(value) = toml_str(&cargo, &["package", key]) {
            map.insert(key.to_string(), Value::from(value));
        }
    }
    if let Some(members) = cargo
        .get("workspace")
        .and_then(|w| w.get("members"))
        .and_then(|m| m.as_array())
    {
        let members: Vec<Value> = members.iter().filter_map(|m| m.as_str()).map(Value::from).collect();
        map.insert("members".to_string(), Value::Array(members));
    }
    map
}

/// `pom.xml` artifact and version, else Gradle's `rootProject.name`.
pub fn jvm_config(root: &Path) -> ConfigMap {
    if let Some(pom) = read_marker(root, "pom.xml") {
        let own = POM_PARENT.replace_all(&pom, "");
        let mut map = tagged("maven");
        insert_capture(&mut map, "name", &POM_ARTIFACT, &own);
        insert_capture(&mut map, "version", &POM_VERSION, &own);
        return map;
    }
    for settings in ["settings.gradle", "settings.gradle.kts"] {
        if let Some(gradle) = read_marker(root, settings) {
            let mut map = tagged("gradle");
            insert_capture(&mut map, "name", &GRADLE_ROOT, &gradle);
            return map;
        }
    }
    if root.join("build.gradle").is_file() || root.join("build.gradle.kts").is_file() {
        return tagged("gradle");
    }
    ConfigMap::new()
}

/// `composer.json`: `name` and `description`.
pub fn composer_config(root: &Path) -> ConfigMap {
    let Some(composer) = read_marker(root, "composer.json")
        .and_then(|c| serde_json::from_str::<Value>(&c).ok())
    else {
        return ConfigMap::new();
    };
    let mut map = tagged("composer");
    for key in ["name", "description"] {
        if let Some(value) = composer.get(key).and_then(|v| v.as_str()) {
            map.insert(key.to_string(), Value::from(value));
        }
    }
    map
}

/// First `*.csproj` in the root: project name and target framework.
pub fn dotnet_config(root: &Path) -> ConfigMap {
    let Some(csproj) = first_file_with_extension(root, "csproj") else {
        return ConfigMap::new();
    };
    let mut map = tagged("csproj");
    if let Some(stem) = csproj.file_stem().and_then(|s| s.to_str()) {
        map.insert("name".to_string(), Value::from(stem));
    }
    if let Ok(content) = fs::read_to_string(&csproj) {
        insert_capture(&mut map, "target_framework", &TARGET_FRAMEWORK, &content);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::{Framework, Language};
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_mix_config() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "mix.exs",
            "def project do\n  [app: :shop, version: \"0.4.1\", elixir: \"~> 1.15\"]\nend\n",
        );
        let config = mix_config(temp.path());
        assert_eq!(config["type"], "mix");
        assert_eq!(config["app"], "shop");
        assert_eq!(config["version"], "0.4.1");
    }

    #[test]
    fn test_pyproject_poetry_and_setup_py() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "pyproject.toml",
            "[tool.poetry]\nname = \"blog\"\nversion = \"1.2.0\"\n",
        );
        let config = python_config(temp.path());
        assert_eq!(config["type"], "pyproject");
        assert_eq!(config["name"], "blog");

        let temp = TempDir::new().unwrap();
        write(temp.path(), "setup.py", "setup(\n    name='legacy',\n    version='0.1',\n)\n");
        let config = python_config(temp.path());
        assert_eq!(config["type"], "setup.py");
        assert_eq!(config["name"], "legacy");
    }

    #[test]
    fn test_package_json_scripts() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "package.json",
            r#"{"name":"web","version":"2.0.0","scripts":{"dev":"next dev","build":"next build"}}"#,
        );
        let config = read_config(temp.path(), &Stack::new(Language::TypeScript, Some(Framework::Next)));
        assert_eq!(config["name"], "web");
        assert_eq!(config["scripts"], serde_json::json!(["build", "dev"]));
    }

    #[test]
    fn test_cargo_and_maven() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "Cargo.toml",
            "[package]\nname = \"svc\"\nversion = \"0.3.0\"\nedition = \"2021\"\n",
        );
        let config = cargo_config(temp.path());
        assert_eq!(config["edition"], "2021");

        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "pom.xml",
            "<project>\n<parent><artifactId>spring-boot-starter-parent</artifactId><version>3.2.0</version></parent>\n<artifactId>orders</artifactId>\n<version>1.0.0</version>\n</project>\n",
        );
        let config = jvm_config(temp.path());
        assert_eq!(config["name"], "orders");
        assert_eq!(config["version"], "1.0.0");
    }

    #[test]
    fn test_csproj_and_missing_manifests() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "Shop.Api.csproj",
            "<Project Sdk=\"Microsoft.NET.Sdk.Web\"><PropertyGroup><TargetFramework>net8.0</TargetFramework></PropertyGroup></Project>",
        );
        let config = dotnet_config(temp.path());
        assert_eq!(config["name"], "Shop.Api");
        assert_eq!(config["target_framework"], "net8.0");

        let empty = TempDir::new().unwrap();
        assert!(go_config(empty.path()).is_empty());
        assert!(read_config(empty.path(), &Stack::unknown()).is_empty());
    }

    #[test]
    fn test_unparseable_package_json_is_empty() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "package.json", "{ not json");
        assert!(package_config(temp.path()).is_empty());
    }

    #[test]
    fn test_readme_order() {
        let temp = TempDir::new().unwrap();
        assert_eq!(read_readme(temp.path()), None);
        write(temp.path(), "README.txt", "plain");
        write(temp.path(), "README.md", "# Title");
        assert_eq!(read_readme(temp.path()).as_deref(), Some("# Title"));
    }
}
