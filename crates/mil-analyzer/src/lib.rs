//! # MIL Analyzer
//!
//! This crate discovers the messaging architecture of C# sources (commands,
//! events, their handlers, aggregate roots and long-running processes) and
//! describes it in MIL, a compact textual Messaging Intermediate Language.
//!
//! ## Supported Languages
//!
//! - C# (default)
//!
//! ## Architecture
//!
//! ```text
//! Source Code (C#)
//!        │
//!        ▼
//! ┌──────────────┐
//! │   Frontend   │  tree-sitter parsing
//! │ (C# → Syntax)│
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │   Semantic   │  Symbols, binding, data flow,
//! │ (Compilation)│  declaration diagnostics
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │    Walker    │  Role classification and
//! │   (Syntax)   │  publication call sites
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │  Correlate   │  Publication → command → handler
//! │  + Process   │  Process state discovery
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │    Report    │  MIL tokens per section
//! └──────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mil_analyzer::{AnalyzerConfig, MilGenerator};
//!
//! let generator = MilGenerator::new(AnalyzerConfig::default());
//! if let Some(report) = generator.analyze_directory("src/Conference".as_ref())? {
//!     print!("{}", report.render());
//! }
//! ```

pub mod classify;
pub mod config;
pub mod correlate;
pub mod diagnostic;
pub mod frontend;
pub mod mil;
pub mod process;
pub mod report;
pub mod semantic;
pub mod syntax;
pub mod walker;

use std::path::Path;

use tracing::{info, warn};

pub use classify::{Classifier, Role};
pub use config::{AnalyzerConfig, MessagingConventions};
pub use correlate::SemanticAnalyzer;
pub use diagnostic::AnalysisError;
pub use mil::{MilToken, MilTokenType};
pub use process::{ProcessAnalyzer, ProcessDefinition, ProcessInterface};
pub use report::MilReport;
pub use semantic::Compilation;
pub use walker::SyntaxWalker;

use report::ReportSection;

/// Runs the whole analysis for one or more compilations.
pub struct MilGenerator {
    config: AnalyzerConfig,
}

impl MilGenerator {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Parses every source file under `dir` as one assembly and analyzes it.
    ///
    /// Returns `None` when the assembly is excluded by configuration.
    pub fn analyze_directory(&self, dir: &Path) -> Result<Option<MilReport>, AnalysisError> {
        let mut frontend = frontend::create_frontend(&self.config.language)?;
        let compilation = frontend.parse_directory(dir)?;
        Ok(self.generate(&compilation))
    }

    /// Analyzes every compilation that is not excluded, in order.
    pub fn generate_all<'c>(&self, compilations: impl IntoIterator<Item = &'c Compilation>) -> Vec<MilReport> {
        compilations
            .into_iter()
            .filter_map(|compilation| self.generate(compilation))
            .collect()
    }

    /// Builds the MIL report of one compilation.
    ///
    /// This runs the pipeline:
    /// 1. Skip the assembly if it is excluded
    /// 2. Validate the compilation and walk its units
    /// 3. Correlate publication calls (only for valid compilations)
    /// 4. Discover the process state definition
    /// 5. Collect warnings about ambiguous declarations
    pub fn generate(&self, compilation: &Compilation) -> Option<MilReport> {
        let assembly = compilation.assembly_name();
        if self.config.is_excluded(assembly) {
            info!(assembly, "assembly excluded from analysis");
            return None;
        }

        let conventions = self.config.conventions();
        let mut report = MilReport::new(assembly);

        // Phase 1-3: Walk and correlate
        let (walker, publications) = match SemanticAnalyzer::with_conventions(compilation, conventions.clone()) {
            Ok(analyzer) => {
                let publications: Vec<MilToken> = analyzer.get_message_publication_data().collect();
                (analyzer.extract_messaging_syntax(), publications)
            }
            Err(err) => {
                warn!(assembly, error = %err, "compilation failed validation, publication correlation skipped");
                match &err {
                    AnalysisError::InvalidCompilation { count, details, .. } => {
                        report.warn(format!(
                            "publication correlation skipped: {} declaration diagnostic(s)",
                            count
                        ));
                        for line in details.lines() {
                            report.warn(format!("  {}", line));
                        }
                    }
                    other => report.warn(format!("publication correlation skipped: {}", other)),
                }

                let mut walker = SyntaxWalker::new(conventions);
                for unit in compilation.units() {
                    walker.visit(unit);
                }
                (walker, Vec::new())
            }
        };

        report.push_section(ReportSection::from_tokens(report::AGGREGATE_ROOTS, walker.dump_aggregate_roots()));
        report.push_section(ReportSection::from_tokens(report::COMMANDS, walker.dump_command_data()));
        report.push_section(ReportSection::from_tokens(report::EVENTS, walker.dump_event_data()));
        report.push_section(ReportSection::from_tokens(report::MESSAGE_PUBLICATIONS, publications));
        report.push_section(ReportSection::from_lines(report::PUBLICATION_SITES, walker.dump_publication_data()));

        // Phase 4: Process discovery
        let processes = ProcessAnalyzer::new(self.config.process_marker.as_str())
            .get_process_definition(compilation, &self.config.process_type_name)
            .filter(ProcessDefinition::is_complete)
            .map(|definition| [ProcessDefinition::token(Some(&definition)), mil::factory::statement_terminator()]);
        report.push_section(ReportSection::from_tokens(report::PROCESSES, processes.into_iter().flatten()));

        // Phase 5: Warnings
        for duplicate in walker.duplicate_command_handlers() {
            let handlers: Vec<&str> = duplicate.handlers.iter().map(|h| h.name.as_str()).collect();
            report.warn(format!(
                "command {} is handled by {}",
                duplicate.command,
                handlers.join(", ")
            ));
        }
        // Handlers of several message types are expected; a message type
        // that also plays another role is not.
        for (decl, roles) in walker.multi_role_declarations() {
            if !roles.iter().any(|r| matches!(r, Role::Command | Role::Event)) {
                continue;
            }
            let roles: Vec<String> = roles.iter().map(Role::to_string).collect();
            report.warn(format!("{} is declared as {}", decl.name, roles.join(", ")));
        }

        info!(
            assembly,
            commands = walker.commands().len(),
            events = walker.events().len(),
            publications = walker.publications().len(),
            warnings = report.warnings.len(),
            "generated MIL report"
        );
        Some(report)
    }
}
