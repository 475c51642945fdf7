//! Stacklens - stack detection and structural fact extraction.
//!
//! Stacklens classifies a source tree by primary language and web framework,
//! then extracts routes, data models, controllers, UI components and
//! services with regex extractors picked for that stack. Nothing is
//! compiled or executed; every extractor works on source text.
//!
//! # Architecture
//!
//! - `stack`: Language and framework detection from manifests and file sniffing
//! - `extract`: Fact records, the file walker and per-language extractors
//! - `dispatch`: Exact, language-default and universal extractor lookup
//! - `analysis`: The `CodebaseAnalysis` aggregate and `Analyzer` entry point
//! - `project`: Config manifest and README readers
//! - `features`: Feature inventory and documentation gap detection
//! - `settings` / `resolve`: Optional YAML settings and path exclusion
//! - `report`: Output formatting (pretty, JSON)
//!
//! # Adding a New Framework
//!
//! Add the variant to `stack::Framework`, teach `stack::Detector` to
//! recognize it, write its extractors under `extract/languages/` and
//! register them in the tables in `dispatch.rs`.

pub mod analysis;
pub mod cli;
pub mod dispatch;
pub mod error;
pub mod extract;
pub mod features;
pub mod project;
pub mod report;
pub mod resolve;
pub mod settings;
pub mod stack;

pub use analysis::{analyze, detect_stack, Analyzer, CodebaseAnalysis};
pub use dispatch::Tier;
pub use error::AnalyzeError;
pub use extract::{Component, Controller, Field, Model, Route, Service};
pub use features::{derive_features, find_gaps, tokenize, Document, Feature, FeatureKind, GapReport};
pub use settings::Settings;
pub use stack::{Detector, Framework, Language, Stack};
