//! Library error type.

use thiserror::Error;

/// Errors returned by [`crate::analyze`] and [`crate::Analyzer`].
///
/// Unreadable files and unmatched patterns are not errors; they simply
/// contribute no facts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalyzeError {
    #[error("invalid path: {0:?}")]
    InvalidPath(String),
    #[error("invalid settings: {0}")]
    Settings(String),
}
