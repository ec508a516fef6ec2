//! Semantic layer: symbols, binding, data flow and declaration diagnostics.
//!
//! A [`Compilation`] owns the parsed units of one assembly together with the
//! symbol table built from them. [`SemanticModel`] answers the questions the
//! publication correlator asks about a single unit.

mod binder;
mod dataflow;
mod diagnostics;
mod symbols;

pub use binder::{BindingScope, BoundInvocation, LocalKind, ResolvedType};
pub use dataflow::{DataFlowAnalysis, DataFlowSymbol};
pub use diagnostics::{
    Severity, SourceDiagnostic, DUPLICATE_TYPE, SYNTAX_ERROR, UNMODELED_CONSTRUCT, UNRESOLVED_TYPE,
    WELL_KNOWN_TYPES,
};
pub use symbols::{
    FieldSymbol, MethodSymbol, NamespaceSymbol, ParameterSymbol, PropertySymbol,
    ResolutionContext, SymbolTable, TypeId, TypeSymbol,
};

use tracing::debug;

use crate::diagnostic::Span;
use crate::syntax::{Expr, SyntaxUnit, TypeDecl};
use binder::Binder;

/// The parsed and bound sources of one assembly.
#[derive(Debug, Clone)]
pub struct Compilation {
    assembly_name: String,
    units: Vec<SyntaxUnit>,
    symbols: SymbolTable,
    diagnostics: Vec<SourceDiagnostic>,
}

impl Compilation {
    pub fn new(assembly_name: &str, units: Vec<SyntaxUnit>) -> Self {
        let symbols = SymbolTable::build(&units);
        let diagnostics = diagnostics::declaration_diagnostics(&units, &symbols);
        debug!(
            assembly = assembly_name,
            units = units.len(),
            types = symbols.types().len(),
            diagnostics = diagnostics.len(),
            "built compilation"
        );
        Self {
            assembly_name: assembly_name.to_string(),
            units,
            symbols,
            diagnostics,
        }
    }

    pub fn assembly_name(&self) -> &str {
        &self.assembly_name
    }

    pub fn units(&self) -> &[SyntaxUnit] {
        &self.units
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn global_namespace(&self) -> &NamespaceSymbol {
        self.symbols.global_namespace()
    }

    pub fn type_symbol(&self, id: TypeId) -> &TypeSymbol {
        self.symbols.get(id)
    }

    /// Diagnostics about the declarations of the compilation, including
    /// syntax errors.
    pub fn declaration_diagnostics(&self) -> &[SourceDiagnostic] {
        &self.diagnostics
    }

    /// Semantic model for one of this compilation's units.
    pub fn semantic_model<'c>(&'c self, unit: &'c SyntaxUnit) -> SemanticModel<'c> {
        SemanticModel {
            compilation: self,
            unit,
        }
    }
}

/// Semantic questions about one syntax unit.
#[derive(Debug, Clone, Copy)]
pub struct SemanticModel<'c> {
    compilation: &'c Compilation,
    unit: &'c SyntaxUnit,
}

impl<'c> SemanticModel<'c> {
    fn binder<'m>(&self, scope: &BindingScope<'m>) -> Binder<'c, 'm>
    where
        'c: 'm,
    {
        Binder::new(&self.compilation.symbols, self.unit, scope)
    }

    /// The method an invocation expression calls, if it can be bound.
    pub fn symbol_for_invocation(&self, invocation: &Expr, scope: &BindingScope<'_>) -> Option<&'c MethodSymbol> {
        self.binder(scope).method_for(invocation, 0)
    }

    /// The target of an invocation, including members of receiver types
    /// the compilation only references.
    pub fn bind_invocation(&self, invocation: &Expr, scope: &BindingScope<'_>) -> Option<BoundInvocation<'c>> {
        self.binder(scope).bind_invocation(invocation, 0)
    }

    /// The static type of an expression.
    pub fn type_of_expression(&self, expr: &Expr, scope: &BindingScope<'_>) -> Option<ResolvedType> {
        self.binder(scope).type_of(expr, 0)
    }

    /// Data flow of the enclosing method's locals relative to `region`.
    pub fn analyze_region_data_flow(&self, region: &Span, scope: &BindingScope<'_>) -> DataFlowAnalysis {
        let binder = self.binder(scope);
        dataflow::analyze(&binder, scope.method, region)
    }

    /// The symbol declared by a type declaration.
    pub fn declared_symbol(&self, decl: &TypeDecl) -> Option<&'c TypeSymbol> {
        let symbols = &self.compilation.symbols;
        symbols.lookup_declaration(decl).map(|id| symbols.get(id))
    }
}
