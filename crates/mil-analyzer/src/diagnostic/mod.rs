//! Diagnostic types for error reporting.

mod error;
mod span;

pub use error::AnalysisError;
pub use span::Span;
