//! Feature inventory and documentation gaps.
//!
//! Features are named after what a tree exposes: route resources, model
//! entities and user-facing interactions. A feature is a gap when no
//! document title shares a token with its name.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::analysis::CodebaseAnalysis;
use crate::extract::text::snake_case;

/// Controller actions that do not describe a distinct interaction.
const CRUD_ACTIONS: &[&str] = &[
    "index", "show", "new", "create", "edit", "update", "destroy", "delete", "store", "list",
    "get", "post", "put", "patch", "retrieve", "partial_update",
];

/// A help-center or wiki page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Route,
    Entity,
    Interaction,
}

/// A named capability of the analyzed tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    pub kind: FeatureKind,
    /// Route path, or file of the model, component or controller.
    pub origin: String,
}

/// Features and the subset lacking documentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapReport {
    pub features: Vec<Feature>,
    pub gaps: Vec<Feature>,
    pub documents: usize,
}

impl GapReport {
    pub fn new(analysis: &CodebaseAnalysis, documents: &[Document]) -> Self {
        let features = derive_features(analysis);
        let gaps = find_gaps(&features, documents);
        Self {
            features,
            gaps,
            documents: documents.len(),
        }
    }
}

/// First meaningful path segment: not empty, not a parameter, not `api`
/// and not a version like `v2`.
fn route_resource(path: &str) -> Option<&str> {
    path.split('/').find(|seg| {
        !seg.is_empty()
            && !seg.starts_with(':')
            && !seg.starts_with('*')
            && !seg.eq_ignore_ascii_case("api")
            && !is_version(seg)
    })
}

fn is_version(seg: &str) -> bool {
    let digits = seg.strip_prefix('v').or_else(|| seg.strip_prefix('V'));
    matches!(digits, Some(d) if !d.is_empty() && d.chars().all(|c| c.is_ascii_digit() || c == '.'))
}

/// Route, entity and interaction features, first kind winning per name.
pub fn derive_features(analysis: &CodebaseAnalysis) -> Vec<Feature> {
    let mut candidates: Vec<Feature> = Vec::new();

    for route in &analysis.routes {
        if let Some(resource) = route_resource(&route.path) {
            candidates.push(Feature {
                name: snake_case(resource),
                kind: FeatureKind::Route,
                origin: route.path.clone(),
            });
        }
    }
    for model in &analysis.models {
        candidates.push(Feature {
            name: snake_case(&model.name),
            kind: FeatureKind::Entity,
            origin: model.file.clone(),
        });
    }
    for component in analysis.components.iter().filter(|c| !c.props.is_empty()) {
        candidates.push(Feature {
            name: snake_case(&component.name),
            kind: FeatureKind::Interaction,
            origin: component.file.clone(),
        });
    }
    for controller in &analysis.controllers {
        for action in &controller.actions {
            let name = snake_case(action);
            if CRUD_ACTIONS.contains(&name.as_str()) {
                continue;
            }
            candidates.push(Feature {
                name,
                kind: FeatureKind::Interaction,
                origin: controller.file.clone(),
            });
        }
    }

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|f| !f.name.is_empty() && seen.insert(f.name.clone()))
        .collect()
}

/// Lowercased words of `s`, split on punctuation and camelCase humps.
pub fn tokenize(s: &str) -> Vec<String> {
    snake_case(s)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Features whose tokens appear in no document title.
pub fn find_gaps(features: &[Feature], documents: &[Document]) -> Vec<Feature> {
    let documented: HashSet<String> = documents.iter().flat_map(|d| tokenize(&d.title)).collect();
    features
        .iter()
        .filter(|f| {
            let tokens = tokenize(&f.name);
            !tokens.is_empty() && tokens.iter().all(|t| !documented.contains(t))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{Component, Controller, Model, Route};
    use crate::stack::Language;

    fn analysis() -> CodebaseAnalysis {
        CodebaseAnalysis {
            path: ".".to_string(),
            language: Language::Python,
            framework: None,
            routes: vec![
                Route::new("GET", "/api/v1/user_profile/:id", None, "urls.py"),
                Route::new("GET", "/", None, "urls.py"),
                Route::new("POST", "/orders", None, "urls.py"),
            ],
            models: vec![Model::new("OrderItem", Vec::new(), "models.py")],
            controllers: vec![Controller {
                name: "OrdersController".to_string(),
                actions: vec!["index".to_string(), "exportCsv".to_string()],
                file: "views.py".to_string(),
            }],
            components: vec![
                Component::new("SearchBar", vec!["query".to_string()], "SearchBar.tsx"),
                Component::new("Footer", Vec::new(), "Footer.tsx"),
            ],
            services: Vec::new(),
            config: Default::default(),
            readme: None,
        }
    }

    #[test]
    fn test_derive_features() {
        let features = derive_features(&analysis());
        let names: Vec<(&str, FeatureKind)> = features.iter().map(|f| (f.name.as_str(), f.kind)).collect();
        assert_eq!(
            names,
            vec![
                ("user_profile", FeatureKind::Route),
                ("orders", FeatureKind::Route),
                ("order_item", FeatureKind::Entity),
                ("search_bar", FeatureKind::Interaction),
                ("export_csv", FeatureKind::Interaction),
            ]
        );
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("User Profile Guide"), vec!["user", "profile", "guide"]);
        assert_eq!(tokenize("exportCSV-report"), vec!["export", "csv", "report"]);
        assert!(tokenize("--").is_empty());
    }

    #[test]
    fn test_gap_without_documents() {
        let feature = Feature {
            name: "user_profile".to_string(),
            kind: FeatureKind::Route,
            origin: "/user_profile".to_string(),
        };
        assert_eq!(find_gaps(&[feature.clone()], &[]), vec![feature.clone()]);

        let guide = Document {
            title: "User Profile Guide".to_string(),
            content: String::new(),
            source: "wiki".to_string(),
        };
        assert!(find_gaps(&[feature], &[guide]).is_empty());
    }

    #[test]
    fn test_gap_report_counts() {
        let docs = vec![Document {
            title: "Managing orders".to_string(),
            content: String::new(),
            source: String::new(),
        }];
        let report = GapReport::new(&analysis(), &docs);
        assert_eq!(report.documents, 1);
        assert_eq!(report.features.len(), 5);
        let gaps: Vec<&str> = report.gaps.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(gaps, vec!["user_profile", "order_item", "search_bar", "export_csv"]);
    }
}
