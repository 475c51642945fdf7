//! Stack → extractor selection.
//!
//! Every fact category owns a [`Registry`] with three tiers tried in order:
//! an exact `(language, framework)` entry, a language default, and an
//! optional universal fallback. The registries are built once and are
//! read-only afterwards.

use std::collections::HashMap;
use std::path::Path;

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::extract::languages::{
    csharp, elixir, frontend, go, java, javascript, php, python, ruby, rust_lang, universal,
};
use crate::extract::{Component, Controller, Model, Route, Service, Workspace};
use crate::project::{self, ConfigMap};
use crate::stack::{Framework, Language, Stack};

/// A category extractor.
pub type Extractor<T> = fn(&Workspace) -> Vec<T>;

/// A config-manifest reader.
pub type ConfigReader = fn(&Path) -> ConfigMap;

/// Which lookup produced the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Exact,
    LanguageDefault,
    Universal,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Exact => "exact",
            Tier::LanguageDefault => "language_default",
            Tier::Universal => "universal",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Three-tier lookup table for one category.
pub struct Registry<E> {
    exact: HashMap<(Language, Framework), E>,
    language: HashMap<Language, E>,
    universal: Option<E>,
}

impl<E: Copy> Registry<E> {
    fn new() -> Self {
        Self {
            exact: HashMap::new(),
            language: HashMap::new(),
            universal: None,
        }
    }

    /// Register `entry` for each of `frameworks` under `language`.
    fn exact(mut self, language: Language, frameworks: &[Framework], entry: E) -> Self {
        for fw in frameworks {
            self.exact.insert((language, *fw), entry);
        }
        self
    }

    /// Register `entry` for `frameworks` under both Node languages.
    fn node(self, frameworks: &[Framework], entry: E) -> Self {
        self.exact(Language::JavaScript, frameworks, entry)
            .exact(Language::TypeScript, frameworks, entry)
    }

    fn default_for(mut self, languages: &[Language], entry: E) -> Self {
        for language in languages {
            self.language.insert(*language, entry);
        }
        self
    }

    fn universal(mut self, entry: E) -> Self {
        self.universal = Some(entry);
        self
    }

    /// Exact, then language default, then universal.
    pub fn select(&self, stack: &Stack) -> Option<(Tier, E)> {
        if let Some(fw) = stack.framework {
            if let Some(entry) = self.exact.get(&(stack.language, fw)) {
                return Some((Tier::Exact, *entry));
            }
        }
        if let Some(entry) = self.language.get(&stack.language) {
            return Some((Tier::LanguageDefault, *entry));
        }
        self.universal.map(|entry| (Tier::Universal, entry))
    }
}

impl<T> Registry<Extractor<T>> {
    /// Run the selected extractor, or return nothing when none applies.
    pub fn extract(&self, category: &'static str, stack: &Stack, ws: &Workspace) -> Vec<T> {
        match self.select(stack) {
            Some((tier, extractor)) => {
                let records = extractor(ws);
                tracing::debug!(category, %tier, count = records.len(), "extracted");
                records
            }
            None => {
                tracing::debug!(category, stack = %stack, "no extractor registered");
                Vec::new()
            }
        }
    }
}

use Framework as F;
use Language as L;

const NODE: [Language; 2] = [L::JavaScript, L::TypeScript];

pub static ROUTES: Lazy<Registry<Extractor<Route>>> = Lazy::new(|| {
    Registry::<Extractor<Route>>::new()
        .exact(L::Elixir, &[F::Phoenix], elixir::phoenix_routes)
        .exact(L::Python, &[F::Django], python::django_routes)
        .exact(L::Python, &[F::Flask], python::flask_routes)
        .exact(L::Python, &[F::FastApi], python::fastapi_routes)
        .node(&[F::Next], frontend::next_routes)
        .node(&[F::Nuxt], frontend::nuxt_routes)
        .node(&[F::Svelte], frontend::svelte_routes)
        .node(&[F::Vue, F::React], frontend::client_routes)
        .node(&[F::Express, F::Fastify, F::Hono], javascript::server_routes)
        .exact(L::Ruby, &[F::Rails], ruby::rails_routes)
        .exact(L::Go, &[F::Gin, F::Echo, F::Fiber, F::Gorilla], go::go_routes)
        .exact(L::Rust, &[F::Actix], rust_lang::actix_routes)
        .exact(L::Rust, &[F::Rocket], rust_lang::rocket_routes)
        .exact(L::Rust, &[F::Axum], rust_lang::axum_routes)
        .exact(L::Rust, &[F::Warp], rust_lang::warp_routes)
        .exact(L::Java, &[F::Spring], java::spring_routes)
        .exact(L::Java, &[F::Quarkus], java::quarkus_routes)
        .exact(L::Java, &[F::Micronaut], java::micronaut_routes)
        .exact(L::Php, &[F::Laravel], php::laravel_routes)
        .exact(L::Php, &[F::Symfony], php::symfony_routes)
        .exact(L::CSharp, &[F::Dotnet], csharp::dotnet_routes)
        .default_for(&[L::Elixir], elixir::plug_routes)
        .default_for(&NODE, javascript::server_routes)
        .default_for(&[L::Ruby], ruby::sinatra_routes)
        .default_for(&[L::Go], go::go_routes)
        .universal(universal::universal_routes)
});

pub static MODELS: Lazy<Registry<Extractor<Model>>> = Lazy::new(|| {
    Registry::<Extractor<Model>>::new()
        .exact(L::Python, &[F::Django], python::django_models)
        .exact(L::Ruby, &[F::Rails], ruby::rails_models)
        .exact(L::Php, &[F::Laravel], php::laravel_models)
        .default_for(&[L::Elixir], elixir::ecto_models)
        .default_for(&[L::Python], python::python_models)
        .default_for(&[L::JavaScript], javascript::javascript_models)
        .default_for(&[L::TypeScript], javascript::typescript_models)
        .default_for(&[L::Ruby], ruby::rails_models)
        .default_for(&[L::Go], go::go_models)
        .default_for(&[L::Rust], rust_lang::rust_models)
        .default_for(&[L::Java], java::java_models)
        .default_for(&[L::Php], php::php_models)
        .default_for(&[L::CSharp], csharp::dotnet_models)
});

pub static CONTROLLERS: Lazy<Registry<Extractor<Controller>>> = Lazy::new(|| {
    Registry::<Extractor<Controller>>::new()
        .exact(L::Elixir, &[F::Phoenix], elixir::phoenix_controllers)
        .exact(L::Ruby, &[F::Rails], ruby::rails_controllers)
        .exact(L::Python, &[F::Django], python::django_controllers)
        .node(&[F::Express, F::Fastify, F::Hono], javascript::node_controllers)
        .exact(L::Go, &[F::Gin, F::Echo, F::Fiber, F::Gorilla], go::handler_controllers)
        .exact(
            L::Java,
            &[F::Spring, F::Quarkus, F::Micronaut],
            java::jvm_controllers,
        )
        .exact(L::Php, &[F::Laravel, F::Symfony], php::php_controllers)
        .exact(L::CSharp, &[F::Dotnet], csharp::dotnet_controllers)
        .default_for(&NODE, javascript::node_controllers)
});

pub static COMPONENTS: Lazy<Registry<Extractor<Component>>> = Lazy::new(|| {
    Registry::<Extractor<Component>>::new()
        .node(&[F::React, F::Next], frontend::react_components)
        .node(&[F::Vue, F::Nuxt], frontend::vue_components)
        .node(&[F::Svelte], frontend::svelte_components)
        .exact(L::Elixir, &[F::Phoenix], elixir::phoenix_components)
        .exact(L::Ruby, &[F::Rails], ruby::view_components)
        .exact(L::Php, &[F::Laravel], php::blade_components)
        .exact(L::CSharp, &[F::Dotnet], csharp::razor_components)
});

pub static SERVICES: Lazy<Registry<Extractor<Service>>> = Lazy::new(|| {
    Registry::<Extractor<Service>>::new()
        .default_for(&[L::Elixir], elixir::context_services)
        .default_for(&[L::Python], python::python_services)
        .default_for(&NODE, javascript::node_services)
        .default_for(&[L::Ruby], ruby::ruby_services)
        .default_for(&[L::Go], go::go_services)
        .default_for(&[L::Rust], rust_lang::rust_services)
        .default_for(&[L::Java], java::jvm_services)
        .default_for(&[L::Php], php::php_services)
        .default_for(&[L::CSharp], csharp::dotnet_services)
});

pub static CONFIG: Lazy<Registry<ConfigReader>> = Lazy::new(|| {
    Registry::<ConfigReader>::new()
        .default_for(&[L::Elixir], project::mix_config)
        .default_for(&[L::Python], project::python_config)
        .default_for(&NODE, project::package_config)
        .default_for(&[L::Ruby], project::ruby_config)
        .default_for(&[L::Go], project::go_config)
        .default_for(&[L::Rust], project::cargo_config)
        .default_for(&[L::Java], project::jvm_config)
        .default_for(&[L::Php], project::composer_config)
        .default_for(&[L::CSharp], project::dotnet_config)
});

#[cfg(test)]
mod tests {
    use super::*;

    fn tier<E: Copy>(registry: &Registry<E>, language: Language, framework: Option<Framework>) -> Option<Tier> {
        registry.select(&Stack::new(language, framework)).map(|(t, _)| t)
    }

    #[test]
    fn test_exact_before_default() {
        assert_eq!(tier(&*ROUTES, L::Elixir, Some(F::Phoenix)), Some(Tier::Exact));
        assert_eq!(tier(&*ROUTES, L::Elixir, Some(F::Elixir)), Some(Tier::LanguageDefault));
        assert_eq!(tier(&*MODELS, L::Elixir, Some(F::Phoenix)), Some(Tier::LanguageDefault));
    }

    #[test]
    fn test_node_frameworks_registered_for_both_languages() {
        for fw in Framework::NODE {
            assert_eq!(tier(&*ROUTES, L::JavaScript, Some(fw)), Some(Tier::Exact), "{}", fw);
            assert_eq!(tier(&*ROUTES, L::TypeScript, Some(fw)), Some(Tier::Exact), "{}", fw);
        }
        assert_eq!(tier(&*COMPONENTS, L::TypeScript, Some(F::Next)), Some(Tier::Exact));
        assert_eq!(tier(&*ROUTES, L::TypeScript, None), Some(Tier::LanguageDefault));
    }

    #[test]
    fn test_universal_only_for_routes() {
        assert_eq!(tier(&*ROUTES, L::Unknown, None), Some(Tier::Universal));
        assert_eq!(tier(&*ROUTES, L::Python, Some(F::Python)), Some(Tier::Universal));
        assert_eq!(tier(&*MODELS, L::Unknown, None), None);
        assert_eq!(tier(&*CONTROLLERS, L::Rust, Some(F::Axum)), None);
        assert_eq!(tier(&*COMPONENTS, L::Go, Some(F::Gin)), None);
    }

    #[test]
    fn test_every_language_has_services_and_config() {
        for language in Language::ALL {
            if language == L::Unknown {
                assert!(SERVICES.select(&Stack::unknown()).is_none());
                assert!(CONFIG.select(&Stack::unknown()).is_none());
                continue;
            }
            let stack = Stack::new(language, None);
            assert_eq!(SERVICES.select(&stack).map(|(t, _)| t), Some(Tier::LanguageDefault));
            assert_eq!(CONFIG.select(&stack).map(|(t, _)| t), Some(Tier::LanguageDefault));
        }
    }
}
