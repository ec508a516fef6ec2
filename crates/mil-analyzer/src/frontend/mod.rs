//! Language frontends for parsing source code into the syntax model.
//!
//! Each frontend is responsible for:
//! 1. Parsing source files in its language
//! 2. Lowering the concrete tree into [`SyntaxUnit`]s
//! 3. Bundling the units of one assembly into a [`Compilation`]

pub mod csharp;

use std::path::Path;
use crate::diagnostic::AnalysisError;
use crate::semantic::Compilation;
use crate::syntax::SyntaxUnit;

/// Trait for language frontends.
pub trait Frontend {
    /// Returns the language name (e.g., "csharp").
    fn language(&self) -> &str;

    /// Returns file extensions this frontend handles (e.g., ["cs"]).
    fn extensions(&self) -> &[&str];

    /// Parses a single source file.
    fn parse_file(&mut self, source: &str, path: &Path) -> Result<SyntaxUnit, AnalysisError>;

    /// Parses all source files in the given directory into one compilation.
    fn parse_directory(&mut self, dir: &Path) -> Result<Compilation, AnalysisError>;
}

/// Creates a frontend for the given language.
pub fn create_frontend(language: &str) -> Result<Box<dyn Frontend>, AnalysisError> {
    match language {
        "csharp" | "cs" | "c#" => Ok(Box::new(csharp::CSharpFrontend::new()?)),
        _ => Err(AnalysisError::UnsupportedLanguage {
            language: language.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_frontend_accepts_csharp_aliases() {
        for name in ["csharp", "cs", "c#"] {
            let frontend = create_frontend(name).unwrap();
            assert_eq!(frontend.language(), "csharp");
            assert_eq!(frontend.extensions(), &["cs"]);
        }
    }

    #[test]
    fn test_create_frontend_rejects_unknown_language() {
        let err = create_frontend("typescript").err().unwrap();
        assert!(matches!(err, AnalysisError::UnsupportedLanguage { .. }));
    }
}
