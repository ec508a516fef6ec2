//! C# frontend for the MIL analyzer.

pub mod parser;

use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::diagnostic::AnalysisError;
use crate::semantic::Compilation;
use crate::syntax::SyntaxUnit;
use super::Frontend;
use parser::CSharpParser;

/// Build output directories that never contain hand-written sources.
const SKIPPED_DIRS: &[&str] = &["bin", "obj", ".git"];

/// C# frontend implementation.
pub struct CSharpFrontend {
    parser: CSharpParser,
}

impl CSharpFrontend {
    /// Creates a new C# frontend.
    pub fn new() -> Result<Self, AnalysisError> {
        Ok(Self {
            parser: CSharpParser::new()?,
        })
    }

    /// Parses in-memory sources into a compilation named `assembly`.
    pub fn parse_sources(
        &mut self,
        assembly: &str,
        sources: &[(PathBuf, String)],
    ) -> Result<Compilation, AnalysisError> {
        let mut units = Vec::with_capacity(sources.len());
        for (path, source) in sources {
            units.push(self.parser.parse(source, path)?);
        }
        Ok(Compilation::new(assembly, units))
    }
}

impl Frontend for CSharpFrontend {
    fn language(&self) -> &str {
        "csharp"
    }

    fn extensions(&self) -> &[&str] {
        &["cs"]
    }

    fn parse_file(&mut self, source: &str, path: &Path) -> Result<SyntaxUnit, AnalysisError> {
        self.parser.parse(source, path)
    }

    fn parse_directory(&mut self, dir: &Path) -> Result<Compilation, AnalysisError> {
        let mut units = Vec::new();

        // Discover C# files
        for entry in WalkDir::new(dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0
                    || !(e.file_type().is_dir()
                        && SKIPPED_DIRS.contains(&e.file_name().to_string_lossy().as_ref()))
            })
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(ext) = path.extension() else {
                continue;
            };
            if !self.extensions().contains(&ext.to_string_lossy().as_ref()) {
                continue;
            }

            let source = std::fs::read_to_string(path)
                .map_err(|e| AnalysisError::io(path, e.to_string()))?;
            let relative = pathdiff::diff_paths(path, dir).unwrap_or_else(|| path.to_path_buf());
            debug!(file = %relative.display(), "parsing source");
            units.push(self.parser.parse(&source, &relative)?);
        }

        let assembly = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "assembly".to_string());
        info!(assembly = %assembly, files = units.len(), "parsed source directory");

        Ok(Compilation::new(&assembly, units))
    }
}
