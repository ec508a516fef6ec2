//! Analyzer error types.
#![allow(unused_assignments)]

use std::path::PathBuf;
use miette::Diagnostic;
use thiserror::Error;

/// Errors that can occur while loading or validating sources.
///
/// Correlation and discovery misses are not errors; they are skipped
/// silently by the analysis passes.
#[allow(unused_assignments)]
#[derive(Error, Diagnostic, Debug)]
pub enum AnalysisError {
    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("Failed to read file '{path}': {message}")]
    #[diagnostic(code(mil::io::read_error))]
    IoError {
        path: PathBuf,
        message: String,
    },

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("Failed to initialize parser")]
    #[diagnostic(code(mil::parse::init_failed))]
    ParserInitFailed,

    #[error("Failed to parse file: {}", path.display())]
    #[diagnostic(code(mil::parse::parse_failed))]
    ParseFailed {
        path: PathBuf,
    },

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Errors exist in the compilation. Correct these issues and try again\n{details}")]
    #[diagnostic(
        code(mil::validation::invalid_compilation),
        help("{count} declaration diagnostic(s) in '{assembly}' must be fixed before publication analysis")
    )]
    InvalidCompilation {
        assembly: String,
        count: usize,
        details: String,
    },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid analyzer configuration '{}': {message}", path.display())]
    #[diagnostic(
        code(mil::config::invalid),
        help("The configuration file must be a JSON object with marker names, e.g. {{ \"processMarker\": \"IProcess\" }}")
    )]
    InvalidConfig {
        path: PathBuf,
        message: String,
    },

    // =========================================================================
    // Frontend Errors
    // =========================================================================
    #[error("Unsupported language: {language}")]
    #[diagnostic(code(mil::frontend::unsupported_language))]
    UnsupportedLanguage {
        language: String,
    },
}

impl AnalysisError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::IoError {
            path: path.into(),
            message: message.into(),
        }
    }
}
