//! Declaration diagnostics reported by a compilation.

use std::collections::HashMap;
use std::fmt;

use crate::diagnostic::Span;
use crate::syntax::{SyntaxUnit, TypeRef};
use super::symbols::{ResolutionContext, SymbolTable, TypeId};

/// Invalid expression term or unexpected token.
pub const SYNTAX_ERROR: u32 = 1525;
/// Type or namespace name could not be found.
pub const UNRESOLVED_TYPE: u32 = 246;
/// Namespace already contains a definition.
pub const DUPLICATE_TYPE: u32 = 101;
/// Source construct the analyzer does not model.
pub const UNMODELED_CONSTRUCT: u32 = 8000;

/// Framework types assumed to be available to every compilation.
pub const WELL_KNOWN_TYPES: &[&str] = &[
    "Object", "String", "Boolean", "Byte", "SByte", "Char", "Decimal", "Double", "Single",
    "Int16", "Int32", "Int64", "UInt16", "UInt32", "UInt64", "Guid", "DateTime",
    "DateTimeOffset", "TimeSpan", "Uri", "Type", "Enum", "Array", "Attribute", "Exception",
    "ArgumentException", "ArgumentNullException", "InvalidOperationException",
    "NotImplementedException", "NotSupportedException", "Nullable", "Lazy", "Tuple",
    "ValueTuple", "KeyValuePair", "Func", "Action", "Predicate", "EventArgs", "EventHandler",
    "IDisposable", "IAsyncDisposable", "IEquatable", "IComparable", "IEnumerable",
    "IEnumerator", "ICollection", "IList", "IReadOnlyCollection", "IReadOnlyList",
    "IDictionary", "IReadOnlyDictionary", "ISet", "List", "Dictionary", "HashSet", "Queue",
    "Stack", "Task", "ValueTask", "CancellationToken", "IAsyncEnumerable", "StringBuilder",
    "Stream", "TextWriter", "TextReader", "Console", "Math", "Span", "ReadOnlySpan", "Memory",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Hidden,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Hidden => write!(f, "hidden"),
        }
    }
}

/// A problem found in the declarations of a compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDiagnostic {
    pub code: u32,
    pub severity: Severity,
    pub message: String,
    pub span: Span,
}

impl SourceDiagnostic {
    fn error(code: u32, message: String, span: Span) -> Self {
        Self {
            code,
            severity: Severity::Error,
            message,
            span,
        }
    }

    /// The diagnostic identifier, e.g. `CS0246`.
    pub fn id(&self) -> String {
        format!("CS{:04}", self.code)
    }
}

impl fmt::Display for SourceDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({},{}): {} {}: {}",
            self.span.file.display(),
            self.span.start_line + 1,
            self.span.start_col + 1,
            self.severity,
            self.id(),
            self.message
        )
    }
}

/// Collects the declaration diagnostics of a set of units.
pub(crate) fn declaration_diagnostics(units: &[SyntaxUnit], table: &SymbolTable) -> Vec<SourceDiagnostic> {
    let mut out = Vec::new();

    for unit in units {
        for span in &unit.syntax_errors {
            out.push(SourceDiagnostic::error(
                SYNTAX_ERROR,
                "Invalid expression term or unexpected token".to_string(),
                span.clone(),
            ));
        }
        for span in &unit.top_level_statements {
            out.push(SourceDiagnostic {
                code: UNMODELED_CONSTRUCT,
                severity: Severity::Hidden,
                message: "Top-level statements are not analyzed".to_string(),
                span: span.clone(),
            });
        }
    }

    duplicate_types(table, &mut out);
    unresolved_types(table, &mut out);
    out
}

fn duplicate_types(table: &SymbolTable, out: &mut Vec<SourceDiagnostic>) {
    let mut seen: HashMap<(&str, Option<TypeId>, &str, usize), TypeId> = HashMap::new();
    for symbol in table.types() {
        let key = (
            symbol.namespace.as_str(),
            symbol.container,
            symbol.name.as_str(),
            symbol.arity(),
        );
        if seen.contains_key(&key) {
            let container = match symbol.container {
                Some(parent) => table.get(parent).name.clone(),
                None if symbol.namespace.is_empty() => "<global namespace>".to_string(),
                None => symbol.namespace.clone(),
            };
            out.push(SourceDiagnostic::error(
                DUPLICATE_TYPE,
                format!(
                    "The namespace '{}' already contains a definition for '{}'",
                    container, symbol.name
                ),
                symbol.spans.first().cloned().unwrap_or_default(),
            ));
        } else {
            seen.insert(key, symbol.id);
        }
    }
}

fn unresolved_types(table: &SymbolTable, out: &mut Vec<SourceDiagnostic>) {
    for symbol in table.types() {
        let ctx = ResolutionContext {
            namespace: &symbol.namespace,
            usings: &symbol.usings,
            enclosing: Some(symbol.id),
        };
        let mut type_parameters: Vec<&str> = Vec::new();
        for id in table.containing_chain(symbol.id) {
            type_parameters.extend(table.get(id).type_parameters.iter().map(String::as_str));
        }

        let checker = TypeChecker {
            table,
            ctx: ResolutionContext {
                // Bases are looked up from outside the type itself
                enclosing: symbol.container,
                ..ctx
            },
            type_parameters: &type_parameters,
        };
        for base in &symbol.bases {
            checker.check(base, out);
        }

        let checker = TypeChecker { ctx, ..checker };
        for property in &symbol.properties {
            checker.check(&property.ty, out);
        }
        for field in &symbol.fields {
            checker.check(&field.ty, out);
        }
        for method in &symbol.methods {
            let mut scope = type_parameters.clone();
            scope.extend(method.type_parameters.iter().map(String::as_str));
            let method_checker = TypeChecker {
                type_parameters: &scope,
                ..checker
            };
            if let Some(ret) = &method.return_type {
                method_checker.check(ret, out);
            }
            for param in &method.parameters {
                if let Some(ty) = &param.ty {
                    method_checker.check(ty, out);
                }
            }
        }
    }
}

#[derive(Clone, Copy)]
struct TypeChecker<'t> {
    table: &'t SymbolTable,
    ctx: ResolutionContext<'t>,
    type_parameters: &'t [&'t str],
}

impl TypeChecker<'_> {
    fn check(&self, ty: &TypeRef, out: &mut Vec<SourceDiagnostic>) {
        match ty {
            TypeRef::Predefined { .. } | TypeRef::Implicit { .. } | TypeRef::Other { .. } => {}
            TypeRef::Array { element, .. } => self.check(element, out),
            TypeRef::Nullable { inner, .. } => self.check(inner, out),
            TypeRef::Simple { .. } | TypeRef::Generic { .. } | TypeRef::Qualified { .. } => {
                for arg in ty.type_arguments() {
                    self.check(arg, out);
                }
                if !self.is_resolvable(ty) {
                    out.push(SourceDiagnostic::error(
                        UNRESOLVED_TYPE,
                        format!(
                            "The type or namespace name '{}' could not be found \
                             (are you missing a using directive or an assembly reference?)",
                            ty.display()
                        ),
                        ty.span().clone(),
                    ));
                }
            }
        }
    }

    fn is_resolvable(&self, ty: &TypeRef) -> bool {
        let name = ty.plain_name();
        if matches!(ty, TypeRef::Simple { .. }) && self.type_parameters.contains(&name) {
            return true;
        }
        if WELL_KNOWN_TYPES.contains(&name) {
            return true;
        }
        if self.table.resolve_in_scope(ty, &self.ctx).is_some() {
            return true;
        }
        // Names that may come from a namespace outside the compilation are
        // given the benefit of the doubt.
        match ty.qualifier() {
            Some(qualifier) => {
                !self.table.declares_namespace(qualifier)
                    && self
                        .table
                        .types_named(qualifier.rsplit('.').next().unwrap_or(qualifier))
                        .is_empty()
            }
            None => self
                .ctx
                .usings
                .iter()
                .any(|u| !self.table.declares_namespace(u)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::csharp::parser::CSharpParser;
    use std::path::PathBuf;

    fn diagnostics(source: &str) -> Vec<SourceDiagnostic> {
        let mut parser = CSharpParser::new().unwrap();
        let unit = parser.parse(source, &PathBuf::from("test.cs")).unwrap();
        let units = vec![unit];
        let table = SymbolTable::build(&units);
        declaration_diagnostics(&units, &table)
    }

    #[test]
    fn test_clean_source_has_no_diagnostics() {
        let diags = diagnostics(
            r#"
            namespace N {
                public interface ICommand { }
                public interface ICommandHandler<T> where T : ICommand { void Handles(T cmd); }
                public class Foo : ICommand { public string Name { get; set; } public List<Foo> All; }
                public class FooHandler : ICommandHandler<Foo> { public void Handles(Foo cmd) { } }
            }
            "#,
        );
        assert!(diags.is_empty(), "{:?}", diags);
    }

    #[test]
    fn test_unresolved_type_is_reported() {
        let diags = diagnostics("namespace N { public class Foo : IMissing { } }");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, UNRESOLVED_TYPE);
        assert_eq!(diags[0].id(), "CS0246");
        assert!(diags[0].message.contains("IMissing"));
    }

    #[test]
    fn test_external_using_suppresses_unresolved_names() {
        let diags = diagnostics("using Vendor.Bus; namespace N { public class Foo : IMessage { } }");
        assert!(diags.is_empty());
    }

    #[test]
    fn test_duplicate_type_is_reported() {
        let diags = diagnostics("namespace N { class A { } class A { } }");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, DUPLICATE_TYPE);
    }

    #[test]
    fn test_top_level_statements_are_hidden_diagnostics() {
        let diags = diagnostics("System.Console.WriteLine(1);\nnamespace N { class A { } }");
        assert!(diags
            .iter()
            .any(|d| d.code == UNMODELED_CONSTRUCT && d.severity == Severity::Hidden));
        assert!(diags.iter().all(|d| d.code != SYNTAX_ERROR));
    }

    #[test]
    fn test_display_uses_one_based_positions() {
        let diags = diagnostics("namespace N {\n  class A : IMissing { }\n}");
        let text = diags[0].to_string();
        assert!(text.starts_with("test.cs(2,13): error CS0246:"), "{}", text);
    }
}
