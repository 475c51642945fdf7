//! Marker-file driven stack detection.
//!
//! Checks run in a fixed priority order and the first one whose marker file
//! exists decides the language. There is no scoring: a tree with both a
//! `Gemfile` and a `package.json` is classified by whichever check runs first.

use std::path::Path;

use super::manifest::{has_file_with_extension, read_marker, NodeManifest};
use super::{Framework, Language, Stack};
use crate::resolve::Resolver;
use crate::settings::Settings;

/// A single marker check. Returns `None` when its marker is absent.
type MarkerCheck = fn(&Detector, &Path) -> Option<Stack>;

/// Priority-ordered marker checks.
const CHECKS: &[(&str, MarkerCheck)] = &[
    ("elixir", Detector::check_elixir),
    ("python", Detector::check_python),
    ("ruby", Detector::check_ruby),
    ("node", Detector::check_node),
    ("go", Detector::check_go),
    ("rust", Detector::check_rust),
    ("java", Detector::check_java),
    ("php", Detector::check_php),
    ("csharp", Detector::check_csharp),
];

/// Stack detector configured by [`Settings`].
#[derive(Debug, Clone)]
pub struct Detector {
    resolver: Resolver,
    python_sample_limit: usize,
    java_sample_limit: usize,
}

impl Default for Detector {
    fn default() -> Self {
        Self::new(&Settings::default())
    }
}

impl Detector {
    pub fn new(settings: &Settings) -> Self {
        Self {
            resolver: Resolver::from_settings(settings),
            python_sample_limit: settings.python_sample_limit,
            java_sample_limit: settings.java_sample_limit,
        }
    }

    /// Classify the tree at `root`.
    pub fn detect(&self, root: &Path) -> Stack {
        for (name, check) in CHECKS {
            if let Some(stack) = check(self, root) {
                tracing::debug!(check = *name, stack = %stack, "marker check matched");
                return stack;
            }
        }
        Stack::unknown()
    }

    fn check_elixir(&self, root: &Path) -> Option<Stack> {
        let mix = read_marker(root, "mix.exs")?;
        let framework = if mix.contains("phoenix") {
            Framework::Phoenix
        } else {
            Framework::Elixir
        };
        Some(Stack::new(Language::Elixir, Some(framework)))
    }

    fn check_python(&self, root: &Path) -> Option<Stack> {
        let markers = ["requirements.txt", "pyproject.toml", "setup.py"];
        if !markers.iter().any(|m| root.join(m).is_file()) {
            return None;
        }

        let mut corpus = String::new();
        for marker in markers {
            if let Some(text) = read_marker(root, marker) {
                corpus.push_str(&text);
                corpus.push('\n');
            }
        }
        corpus.push_str(&self.sample(root, "**/*.py", self.python_sample_limit));

        let framework = if corpus.contains("django") {
            Framework::Django
        } else if corpus.contains("fastapi") || corpus.contains("FastAPI") {
            Framework::FastApi
        } else if corpus.contains("flask") || corpus.contains("Flask") {
            Framework::Flask
        } else {
            Framework::Python
        };
        Some(Stack::new(Language::Python, Some(framework)))
    }

    fn check_ruby(&self, root: &Path) -> Option<Stack> {
        if !root.join("Gemfile").is_file() {
            return None;
        }
        let framework = if root.join("config/routes.rb").is_file() || root.join("bin/rails").is_file()
        {
            Framework::Rails
        } else {
            Framework::Ruby
        };
        Some(Stack::new(Language::Ruby, Some(framework)))
    }

    fn check_node(&self, root: &Path) -> Option<Stack> {
        let manifest = NodeManifest::load(root)?;
        let language = if manifest.depends_on("typescript") {
            Language::TypeScript
        } else {
            Language::JavaScript
        };
        let framework = Framework::NODE
            .iter()
            .copied()
            .find(|fw| node_package_names(*fw).iter().any(|n| manifest.depends_on(n)));
        Some(Stack::new(language, framework))
    }

    fn check_go(&self, root: &Path) -> Option<Stack> {
        let gomod = read_marker(root, "go.mod")?;
        let framework = [
            ("gin-gonic/gin", Framework::Gin),
            ("labstack/echo", Framework::Echo),
            ("gofiber/fiber", Framework::Fiber),
            ("gorilla/mux", Framework::Gorilla),
        ]
        .iter()
        .find(|(needle, _)| gomod.contains(*needle))
        .map(|(_, fw)| *fw)
        .unwrap_or(Framework::Go);
        Some(Stack::new(Language::Go, Some(framework)))
    }

    fn check_rust(&self, root: &Path) -> Option<Stack> {
        let cargo = read_marker(root, "Cargo.toml")?;
        let framework = [
            ("actix-web", Framework::Actix),
            ("axum", Framework::Axum),
            ("rocket", Framework::Rocket),
            ("warp", Framework::Warp),
        ]
        .iter()
        .find(|(needle, _)| cargo.contains(*needle))
        .map(|(_, fw)| *fw)
        .unwrap_or(Framework::Rust);
        Some(Stack::new(Language::Rust, Some(framework)))
    }

    fn check_java(&self, root: &Path) -> Option<Stack> {
        let markers = ["pom.xml", "build.gradle", "build.gradle.kts"];
        if !markers.iter().any(|m| root.join(m).is_file()) {
            return None;
        }

        let mut corpus = String::new();
        for marker in markers {
            if let Some(text) = read_marker(root, marker) {
                corpus.push_str(&text);
                corpus.push('\n');
            }
        }
        corpus.push_str(&self.sample(root, "**/*.{java,kt}", self.java_sample_limit));
        let corpus = corpus.to_lowercase();

        let framework = [
            ("spring", Framework::Spring),
            ("quarkus", Framework::Quarkus),
            ("micronaut", Framework::Micronaut),
        ]
        .iter()
        .find(|(needle, _)| corpus.contains(*needle))
        .map(|(_, fw)| *fw)
        .unwrap_or(Framework::Java);
        Some(Stack::new(Language::Java, Some(framework)))
    }

    fn check_php(&self, root: &Path) -> Option<Stack> {
        let composer = read_marker(root, "composer.json")?;
        let framework = if composer.contains("laravel") {
            Framework::Laravel
        } else if composer.contains("symfony") {
            Framework::Symfony
        } else {
            Framework::Php
        };
        Some(Stack::new(Language::Php, Some(framework)))
    }

    fn check_csharp(&self, root: &Path) -> Option<Stack> {
        if has_file_with_extension(root, "csproj") || has_file_with_extension(root, "sln") {
            Some(Stack::new(Language::CSharp, Some(Framework::Dotnet)))
        } else {
            None
        }
    }

    /// Concatenated text of the first `limit` files matching `pattern`.
    fn sample(&self, root: &Path, pattern: &str, limit: usize) -> String {
        self.resolver
            .resolve(root, pattern)
            .into_iter()
            .take(limit)
            .filter_map(|p| std::fs::read_to_string(p).ok())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// npm package names that identify a Node framework.
fn node_package_names(framework: Framework) -> &'static [&'static str] {
    match framework {
        Framework::Next => &["next"],
        Framework::Nuxt => &["nuxt", "nuxt3"],
        Framework::Svelte => &["svelte", "@sveltejs/kit"],
        Framework::Vue => &["vue"],
        Framework::React => &["react"],
        Framework::Express => &["express"],
        Framework::Fastify => &["fastify"],
        Framework::Hono => &["hono"],
        _ => &[],
    }
}

/// Classify the tree at `root` with default settings.
pub fn detect_stack<P: AsRef<Path>>(root: P) -> Stack {
    Detector::default().detect(root.as_ref())
}
