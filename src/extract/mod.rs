//! Pattern extraction of structural facts.
//!
//! Extraction is textual: compiled regular expressions plus small block
//! scanners (matching braces, indentation, `do ... end`). Nothing here parses
//! or evaluates the target language.

pub(crate) mod languages;
mod records;
mod source;
pub(crate) mod text;

pub use records::{Component, Controller, Field, Model, Route, Service};
pub use source::{SourceCache, Workspace};
