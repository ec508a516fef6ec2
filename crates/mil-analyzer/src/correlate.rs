//! Semantic correlation of publication call sites with commands and handlers.

use tracing::debug;

use crate::config::MessagingConventions;
use crate::diagnostic::AnalysisError;
use crate::mil::{factory, MilToken};
use crate::semantic::{Compilation, SemanticModel, SourceDiagnostic, UNMODELED_CONSTRUCT};
use crate::syntax::{Expr, MethodKind, TypeDecl, TypeRef};
use crate::walker::{PublicationSite, SyntaxWalker};

/// Fails when the compilation has declaration diagnostics other than
/// unmodeled constructs.
pub fn validate_compilation(compilation: &Compilation) -> Result<(), AnalysisError> {
    let diagnostics: Vec<&SourceDiagnostic> = compilation
        .declaration_diagnostics()
        .iter()
        .filter(|d| d.code != UNMODELED_CONSTRUCT)
        .collect();
    if diagnostics.is_empty() {
        return Ok(());
    }

    let details = diagnostics
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("\n");
    Err(AnalysisError::InvalidCompilation {
        assembly: compilation.assembly_name().to_string(),
        count: diagnostics.len(),
        details,
    })
}

/// Type names that may identify the message sent at a publication site.
///
/// Argument types of the call come first, then the types of locals read
/// outside the call statement, read inside it, flowing out of it and
/// written inside it. Duplicates are dropped.
pub fn publication_candidates(model: &SemanticModel<'_>, site: &PublicationSite<'_>) -> Vec<String> {
    let scope = site.scope();
    let mut candidates: Vec<String> = Vec::new();
    let mut push = |name: &str| {
        if !candidates.iter().any(|c| c == name) {
            candidates.push(name.to_string());
        }
    };

    if let Expr::Invocation { arguments, .. } = site.call {
        for argument in arguments {
            if let Some(ty) = model.type_of_expression(argument, &scope) {
                push(&ty.name);
            }
        }
    }

    let flow = model.analyze_region_data_flow(site.statement.span(), &scope);
    for symbol in flow
        .read_outside
        .iter()
        .chain(&flow.read_inside)
        .chain(&flow.data_flows_out)
        .chain(&flow.written_inside)
    {
        if let Some(ty) = &symbol.ty {
            push(&ty.name);
        }
    }
    candidates
}

/// The first candidate that names a known command.
pub fn match_command_candidate<'c, S: AsRef<str>>(candidates: &'c [String], commands: &[S]) -> Option<&'c str> {
    candidates
        .iter()
        .map(String::as_str)
        .find(|candidate| commands.iter().any(|command| command.as_ref() == *candidate))
}

/// The first handler with a type argument named exactly `command`.
pub fn find_command_handler<'h>(index: &[(&'h TypeDecl, Vec<&TypeRef>)], command: &str) -> Option<&'h TypeDecl> {
    index
        .iter()
        .find(|(_, handled)| handled.iter().any(|t| t.plain_name() == command))
        .map(|(handler, _)| *handler)
}

/// Correlates publication calls in a validated compilation with the commands
/// and command handlers declared in it.
#[derive(Debug, Clone)]
pub struct SemanticAnalyzer<'a> {
    compilation: &'a Compilation,
    conventions: MessagingConventions,
}

impl<'a> SemanticAnalyzer<'a> {
    pub fn new(compilation: &'a Compilation) -> Result<Self, AnalysisError> {
        Self::with_conventions(compilation, MessagingConventions::default())
    }

    pub fn with_conventions(
        compilation: &'a Compilation,
        conventions: MessagingConventions,
    ) -> Result<Self, AnalysisError> {
        validate_compilation(compilation)?;
        Ok(Self {
            compilation,
            conventions,
        })
    }

    pub fn compilation(&self) -> &'a Compilation {
        self.compilation
    }

    /// Walks every unit of the compilation with a fresh walker.
    pub fn extract_messaging_syntax(&self) -> SyntaxWalker<'a> {
        let mut walker = SyntaxWalker::new(self.conventions.clone());
        self.extract_messaging_syntax_into(&mut walker);
        walker
    }

    /// Walks every unit of the compilation, accumulating into `walker`.
    pub fn extract_messaging_syntax_into(&self, walker: &mut SyntaxWalker<'a>) {
        for unit in self.compilation.units() {
            walker.visit(unit);
        }
    }

    /// `Command? -> Handler` tokens for every publication call that can be
    /// tied to a command and its handler. Call sites that cannot be
    /// correlated are skipped.
    pub fn get_message_publication_data(&self) -> impl Iterator<Item = MilToken> + 'a {
        let compilation = self.compilation;
        let walker = self.extract_messaging_syntax();
        let commands: Vec<String> = walker.commands().iter().map(|c| c.name.clone()).collect();
        let handlers = walker.command_handler_index().to_vec();
        let sites = walker.publications().to_vec();

        sites
            .into_iter()
            .filter_map(move |site| correlate_site(compilation, &site, &commands, &handlers))
            .flatten()
    }
}

fn correlate_site(
    compilation: &Compilation,
    site: &PublicationSite<'_>,
    commands: &[String],
    handlers: &[(&TypeDecl, Vec<&TypeRef>)],
) -> Option<[MilToken; 4]> {
    let model = compilation.semantic_model(site.unit);
    let scope = site.scope();

    let Some(method) = model.bind_invocation(site.call, &scope) else {
        debug!(site = %site.location(), "publication call does not bind");
        return None;
    };
    if method.kind() != MethodKind::Ordinary || method.parameter_count() == 0 {
        debug!(site = %site.location(), method = method.name(), "bound method cannot carry a message");
        return None;
    }

    let candidates = publication_candidates(&model, site);
    let Some(command) = match_command_candidate(&candidates, commands) else {
        debug!(site = %site.location(), ?candidates, "no candidate names a command");
        return None;
    };
    let Some(handler) = find_command_handler(handlers, command) else {
        debug!(site = %site.location(), command, "command has no handler");
        return None;
    };

    Some([
        factory::command(command),
        factory::publish(),
        factory::command_handler(&handler.name),
        factory::statement_terminator(),
    ])
}
