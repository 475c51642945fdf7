//! The analysis aggregate and the entry points that build it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dispatch::{COMPONENTS, CONTROLLERS, MODELS, ROUTES, SERVICES};
use crate::error::AnalyzeError;
use crate::extract::{Component, Controller, Model, Route, Service, SourceCache, Workspace};
use crate::project::{self, ConfigMap};
use crate::resolve::Resolver;
use crate::settings::Settings;
use crate::stack::{Detector, Framework, Language, Stack};

/// Everything extracted from one source tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodebaseAnalysis {
    pub path: String,
    pub language: Language,
    pub framework: Option<Framework>,
    pub routes: Vec<Route>,
    pub models: Vec<Model>,
    pub controllers: Vec<Controller>,
    pub components: Vec<Component>,
    pub services: Vec<Service>,
    pub config: ConfigMap,
    pub readme: Option<String>,
}

impl CodebaseAnalysis {
    pub fn stack(&self) -> Stack {
        Stack::new(self.language, self.framework)
    }

    /// Record counts per category, in output order.
    pub fn counts(&self) -> [(&'static str, usize); 5] {
        [
            ("routes", self.routes.len()),
            ("models", self.models.len()),
            ("controllers", self.controllers.len()),
            ("components", self.components.len()),
            ("services", self.services.len()),
        ]
    }

    /// Whether no category produced any record.
    pub fn is_empty(&self) -> bool {
        self.counts().iter().all(|(_, n)| *n == 0)
    }
}

/// Configured analysis runner.
///
/// ```no_run
/// use stacklens::Analyzer;
///
/// let analysis = Analyzer::new().sequential().analyze("./my-app")?;
/// println!("{} routes", analysis.routes.len());
/// # Ok::<(), stacklens::AnalyzeError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Analyzer {
    settings: Settings,
    resolver: Resolver,
    detector: Detector,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::from_valid(Settings::default())
    }
}

impl Analyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyzer using `settings`, rejected if they fail validation.
    pub fn with_settings(settings: Settings) -> Result<Self, AnalyzeError> {
        settings
            .validate()
            .map_err(|e| AnalyzeError::Settings(e.to_string()))?;
        Ok(Self::from_valid(settings))
    }

    fn from_valid(settings: Settings) -> Self {
        Self {
            resolver: Resolver::from_settings(&settings),
            detector: Detector::new(&settings),
            settings,
        }
    }

    /// Disable rayon for both categories and files.
    pub fn sequential(mut self) -> Self {
        self.settings.parallel = false;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Classify the tree at `path`.
    pub fn detect_stack(&self, path: &str) -> Result<Stack, AnalyzeError> {
        validate_path(path)?;
        Ok(self.detector.detect(Path::new(path)))
    }

    /// Detect the stack of `path` and extract every fact category.
    ///
    /// A missing or empty directory is not an error; it produces an analysis
    /// with no facts.
    pub fn analyze(&self, path: &str) -> Result<CodebaseAnalysis, AnalyzeError> {
        validate_path(path)?;
        let root = Path::new(path);

        let stack = self.detector.detect(root);
        tracing::info!(path, stack = %stack, "analyzing");

        let cache = SourceCache::new(self.settings.max_file_bytes);
        let parallel = self.settings.parallel;
        let ws = Workspace::new(root, &self.resolver, &cache, parallel);

        let routes = || ROUTES.extract("routes", &stack, &ws);
        let models = || MODELS.extract("models", &stack, &ws);
        let controllers = || CONTROLLERS.extract("controllers", &stack, &ws);
        let components = || COMPONENTS.extract("components", &stack, &ws);
        let services = || SERVICES.extract("services", &stack, &ws);

        let ((routes, models), ((controllers, components), services)) = if parallel {
            rayon::join(
                || rayon::join(routes, models),
                || rayon::join(|| rayon::join(controllers, components), services),
            )
        } else {
            ((routes(), models()), ((controllers(), components()), services()))
        };

        let analysis = CodebaseAnalysis {
            path: path.to_string(),
            language: stack.language,
            framework: stack.framework,
            routes,
            models,
            controllers,
            components,
            services,
            config: project::read_config(root, &stack),
            readme: project::read_readme(root),
        };

        tracing::info!(
            stack = %stack,
            files = cache.len(),
            routes = analysis.routes.len(),
            models = analysis.models.len(),
            controllers = analysis.controllers.len(),
            components = analysis.components.len(),
            services = analysis.services.len(),
            "analysis complete"
        );
        Ok(analysis)
    }
}

/// Reject paths that cannot name a directory at all.
fn validate_path(path: &str) -> Result<(), AnalyzeError> {
    if path.trim().is_empty() || path.contains('\0') {
        return Err(AnalyzeError::InvalidPath(path.to_string()));
    }
    Ok(())
}

/// Analyze `path` with default settings.
pub fn analyze(path: &str) -> Result<CodebaseAnalysis, AnalyzeError> {
    Analyzer::default().analyze(path)
}

/// Classify `path` with default settings.
pub fn detect_stack(path: &str) -> Result<Stack, AnalyzeError> {
    Analyzer::default().detect_stack(path)
}
