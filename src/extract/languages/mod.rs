//! Per-language extractors.
//!
//! Each module exposes category extractors with the signature
//! `fn(&Workspace) -> Vec<Record>`, built on pure per-file functions that
//! take the root-relative path and the file text.

pub(crate) mod csharp;
pub(crate) mod elixir;
pub(crate) mod frontend;
pub(crate) mod go;
pub(crate) mod java;
pub(crate) mod javascript;
pub(crate) mod php;
pub(crate) mod python;
pub(crate) mod ruby;
pub(crate) mod rust_lang;
pub(crate) mod universal;
