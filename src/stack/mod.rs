//! Stack detection: which language and framework a source tree uses.

mod detector;
pub mod manifest;
mod types;

pub use detector::{detect_stack, Detector};
pub use types::{Framework, Language, Stack};
