//! Binding of names and expressions inside method bodies.

use crate::diagnostic::Span;
use crate::syntax::{Block, Expr, MethodDecl, MethodKind, Statement, SyntaxUnit, TypeDecl, TypeRef};
use super::symbols::{MethodSymbol, ResolutionContext, SymbolTable, TypeId, TypeSymbol};

/// Guards against runaway inference through chains of `var` locals.
const MAX_INFERENCE_DEPTH: usize = 32;

const PREDEFINED_TYPES: &[&str] = &[
    "bool", "byte", "sbyte", "char", "decimal", "double", "float", "int", "uint", "nint", "nuint",
    "long", "ulong", "short", "ushort", "object", "string", "dynamic", "void",
];

/// The declaration context an expression is bound in.
#[derive(Debug, Clone, Copy)]
pub struct BindingScope<'s> {
    /// Full dotted name of the enclosing namespace.
    pub namespace: &'s str,
    pub type_decl: Option<&'s TypeDecl>,
    pub method: &'s MethodDecl,
}

/// The type of an expression or local, as far as it could be determined.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedType {
    /// Display name without namespace or generic suffix.
    pub name: String,
    /// The declaring symbol, when the type is declared in the compilation.
    pub symbol: Option<TypeId>,
    pub type_arguments: Vec<ResolvedType>,
    pub is_array: bool,
}

impl ResolvedType {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbol: None,
            type_arguments: Vec::new(),
            is_array: false,
        }
    }

    pub(crate) fn of_symbol(symbol: &TypeSymbol) -> Self {
        Self {
            name: symbol.name.clone(),
            symbol: Some(symbol.id),
            type_arguments: Vec::new(),
            is_array: false,
        }
    }

    /// Named type that is not declared in the compilation, e.g. one coming
    /// from a referenced library.
    pub fn is_external(&self) -> bool {
        self.symbol.is_none() && !self.is_array && !PREDEFINED_TYPES.contains(&self.name.as_str())
    }

    /// Element type when this type is enumerated with `foreach`.
    pub fn element_type(&self) -> Option<ResolvedType> {
        if self.is_array {
            return Some(ResolvedType {
                is_array: false,
                ..self.clone()
            });
        }
        match self.type_arguments.as_slice() {
            [single] => Some(single.clone()),
            _ => None,
        }
    }
}

/// What an invocation expression calls.
#[derive(Debug, Clone)]
pub enum BoundInvocation<'c> {
    /// A method declared in the compilation.
    Method(&'c MethodSymbol),
    /// A member of an external receiver type. Only the call site is known,
    /// so the parameter count is taken from its arguments.
    External {
        receiver: ResolvedType,
        name: String,
        arguments: usize,
    },
}

impl BoundInvocation<'_> {
    pub fn name(&self) -> &str {
        match self {
            BoundInvocation::Method(method) => &method.name,
            BoundInvocation::External { name, .. } => name,
        }
    }

    pub fn kind(&self) -> MethodKind {
        match self {
            BoundInvocation::Method(method) => method.kind,
            BoundInvocation::External { .. } => MethodKind::Ordinary,
        }
    }

    pub fn parameter_count(&self) -> usize {
        match self {
            BoundInvocation::Method(method) => method.parameters.len(),
            BoundInvocation::External { arguments, .. } => *arguments,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalKind {
    Parameter,
    Local,
}

/// A local variable or parameter visible somewhere in a method body.
#[derive(Debug, Clone)]
pub(crate) struct LocalEntry<'m> {
    pub name: &'m str,
    pub kind: LocalKind,
    /// Declared type; `None` when implicitly typed.
    pub ty: Option<&'m TypeRef>,
    pub initializer: Option<&'m Expr>,
    pub foreach_collection: Option<&'m Expr>,
    /// Byte range in which the name refers to this entry.
    pub visible_from: usize,
    pub visible_to: usize,
}

/// Every local and parameter of one method, in declaration order.
#[derive(Debug, Clone, Default)]
pub(crate) struct Locals<'m> {
    pub entries: Vec<LocalEntry<'m>>,
}

impl<'m> Locals<'m> {
    pub fn collect(method: &'m MethodDecl) -> Self {
        let mut locals = Locals::default();
        for param in &method.parameters {
            locals.entries.push(LocalEntry {
                name: &param.name,
                kind: LocalKind::Parameter,
                ty: param.ty.as_ref(),
                initializer: None,
                foreach_collection: None,
                visible_from: method.span.start_byte,
                visible_to: method.span.end_byte,
            });
        }
        if let Some(body) = &method.body {
            locals.block(body);
        }
        locals
    }

    /// Index of the entry `name` refers to at `offset`.
    pub fn lookup(&self, name: &str, offset: usize) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.name == name && e.visible_from <= offset && offset < e.visible_to)
            .max_by_key(|(_, e)| e.visible_from)
            .map(|(index, _)| index)
    }

    fn block(&mut self, block: &'m Block) {
        for statement in &block.statements {
            self.statement(statement, block.span.end_byte);
        }
    }

    fn statement(&mut self, statement: &'m Statement, scope_end: usize) {
        match statement {
            Statement::Block(block) => self.block(block),
            Statement::LocalDeclaration {
                ty, declarators, ..
            } => {
                for declarator in declarators {
                    if let Some(init) = &declarator.initializer {
                        self.expr(init, scope_end);
                    }
                    self.entries.push(LocalEntry {
                        name: &declarator.name,
                        kind: LocalKind::Local,
                        ty: (!ty.is_implicit()).then_some(ty),
                        initializer: declarator.initializer.as_ref(),
                        foreach_collection: None,
                        visible_from: declarator.span.end_byte,
                        visible_to: scope_end,
                    });
                }
            }
            Statement::ForEach {
                ty,
                variable,
                variable_span,
                collection,
                body,
                span,
            } => {
                self.expr(collection, scope_end);
                self.entries.push(LocalEntry {
                    name: variable,
                    kind: LocalKind::Local,
                    ty: (!ty.is_implicit()).then_some(ty),
                    initializer: None,
                    foreach_collection: Some(collection),
                    visible_from: variable_span.end_byte,
                    visible_to: span.end_byte,
                });
                self.statement(body, span.end_byte);
            }
            other => {
                let end = match other {
                    Statement::Compound { span, .. } => span.end_byte,
                    _ => scope_end,
                };
                let (expressions, statements) = other.parts();
                for expr in expressions {
                    self.expr(expr, end);
                }
                for nested in statements {
                    self.statement(nested, nested.span().end_byte.max(end));
                }
            }
        }
    }

    fn expr(&mut self, expr: &'m Expr, scope_end: usize) {
        match expr {
            Expr::Declaration { ty, name, span } => self.entries.push(LocalEntry {
                name,
                kind: LocalKind::Local,
                ty: (!ty.is_implicit()).then_some(ty),
                initializer: None,
                foreach_collection: None,
                visible_from: span.end_byte,
                visible_to: scope_end,
            }),
            Expr::Lambda {
                parameters,
                body,
                span,
            } => {
                for param in parameters {
                    self.entries.push(LocalEntry {
                        name: &param.name,
                        kind: LocalKind::Parameter,
                        ty: param.ty.as_ref(),
                        initializer: None,
                        foreach_collection: None,
                        visible_from: span.start_byte,
                        visible_to: span.end_byte,
                    });
                }
                self.statement(body, span.end_byte);
            }
            other => {
                for child in other.children() {
                    self.expr(child, scope_end);
                }
            }
        }
    }
}

/// Binds names within one method body.
pub(crate) struct Binder<'c, 'm> {
    pub table: &'c SymbolTable,
    pub ctx: ResolutionContext<'m>,
    pub locals: Locals<'m>,
}

impl<'c: 'm, 'm> Binder<'c, 'm> {
    pub fn new(table: &'c SymbolTable, unit: &'c SyntaxUnit, scope: &BindingScope<'m>) -> Self {
        let enclosing = scope.type_decl.and_then(|d| table.lookup_declaration(d));
        let ctx = match enclosing {
            Some(id) => table_context(table, id),
            None => ResolutionContext {
                namespace: scope.namespace,
                usings: &unit.usings,
                enclosing: None,
            },
        };
        Self {
            table,
            ctx,
            locals: Locals::collect(scope.method),
        }
    }

    pub fn resolve(&self, ty: &TypeRef, ctx: &ResolutionContext<'_>) -> Option<ResolvedType> {
        match ty {
            TypeRef::Implicit { .. } => None,
            TypeRef::Array { element, .. } => self.resolve(element, ctx).map(|mut t| {
                t.is_array = true;
                t
            }),
            TypeRef::Nullable { inner, .. } => self.resolve(inner, ctx),
            TypeRef::Predefined { keyword, .. } => Some(ResolvedType::named(keyword.as_str())),
            TypeRef::Other { text, .. } => Some(ResolvedType::named(text.as_str())),
            TypeRef::Simple { .. } | TypeRef::Generic { .. } | TypeRef::Qualified { .. } => {
                Some(ResolvedType {
                    name: ty.plain_name().to_string(),
                    symbol: self.table.resolve(ty, ctx),
                    type_arguments: ty
                        .type_arguments()
                        .iter()
                        .filter_map(|arg| self.resolve(arg, ctx))
                        .collect(),
                    is_array: false,
                })
            }
        }
    }

    pub fn type_of(&self, expr: &Expr, depth: usize) -> Option<ResolvedType> {
        if depth > MAX_INFERENCE_DEPTH {
            return None;
        }
        match expr {
            Expr::Identifier { name, span } => {
                if let Some(index) = self.locals.lookup(name, span.start_byte) {
                    return self.local_type(index, depth + 1);
                }
                if let Some(found) = self
                    .ctx
                    .enclosing
                    .and_then(|enclosing| self.member_type(enclosing, name))
                {
                    return Some(found);
                }
                self.type_named(name)
            }
            Expr::This { .. } => self
                .ctx
                .enclosing
                .map(|id| ResolvedType::of_symbol(self.table.get(id))),
            Expr::Literal { text, .. } => literal_type(text),
            Expr::MemberAccess { receiver, name, .. } => {
                let owner = self.type_of(receiver, depth + 1)?.symbol?;
                self.member_type(owner, name)
            }
            Expr::Invocation { .. } => {
                let method = self.method_for(expr, depth + 1)?;
                let ret = method.return_type.as_ref()?;
                self.resolve(ret, &table_context(self.table, method.containing_type))
            }
            Expr::ObjectCreation { ty, .. } | Expr::Cast { ty, .. } | Expr::Declaration { ty, .. } => {
                self.resolve(ty, &self.ctx)
            }
            Expr::Assignment { value, .. } => self.type_of(value, depth + 1),
            Expr::Lambda { .. } | Expr::Other { .. } => None,
        }
    }

    pub fn local_type(&self, index: usize, depth: usize) -> Option<ResolvedType> {
        let entry = self.locals.entries.get(index)?;
        if let Some(ty) = entry.ty {
            return self.resolve(ty, &self.ctx);
        }
        if let Some(init) = entry.initializer {
            return self.type_of(init, depth + 1);
        }
        entry
            .foreach_collection
            .and_then(|collection| self.type_of(collection, depth + 1))
            .and_then(|t| t.element_type())
    }

    /// Type of a property or field visible on `owner`. Enum members have the
    /// type of their enum.
    fn member_type(&self, owner: TypeId, name: &str) -> Option<ResolvedType> {
        let mut chain = self.table.supertypes(owner);
        // Members of enclosing types are in scope too
        for outer in self.table.containing_chain(owner).into_iter().skip(1) {
            chain.extend(self.table.supertypes(outer));
        }
        for id in chain {
            let symbol = self.table.get(id);
            if let Some(property) = symbol.property(name) {
                return self.resolve(&property.ty, &table_context(self.table, id));
            }
            if let Some(field) = symbol.field(name) {
                return self.resolve(&field.ty, &table_context(self.table, id));
            }
            if symbol.is_enum() && symbol.enum_members.iter().any(|m| m == name) {
                return Some(ResolvedType::of_symbol(symbol));
            }
        }
        None
    }

    fn type_named(&self, name: &str) -> Option<ResolvedType> {
        let probe = TypeRef::simple(name, Span::default());
        self.table
            .resolve(&probe, &self.ctx)
            .map(|id| ResolvedType::of_symbol(self.table.get(id)))
    }

    pub fn method_for(&self, invocation: &Expr, depth: usize) -> Option<&'c MethodSymbol> {
        let Expr::Invocation {
            callee, arguments, ..
        } = invocation
        else {
            return None;
        };
        let (owner, name) = match callee.as_ref() {
            Expr::MemberAccess { receiver, name, .. } => {
                (self.type_of(receiver, depth + 1)?.symbol?, name.as_str())
            }
            Expr::Identifier { name, .. } => (self.ctx.enclosing?, name.as_str()),
            _ => return None,
        };
        self.find_method(owner, name, arguments.len())
    }

    /// Like [`Binder::method_for`], but a member call on an external
    /// receiver type also binds.
    pub fn bind_invocation(&self, invocation: &Expr, depth: usize) -> Option<BoundInvocation<'c>> {
        if let Some(method) = self.method_for(invocation, depth) {
            return Some(BoundInvocation::Method(method));
        }
        let Expr::Invocation {
            callee, arguments, ..
        } = invocation
        else {
            return None;
        };
        let Expr::MemberAccess { receiver, name, .. } = callee.as_ref() else {
            return None;
        };
        let receiver = self.type_of(receiver, depth + 1)?;
        receiver.is_external().then(|| BoundInvocation::External {
            receiver,
            name: name.clone(),
            arguments: arguments.len(),
        })
    }

    /// First method named `name` on `owner` or its supertypes, preferring an
    /// overload whose parameter count matches.
    fn find_method(&self, owner: TypeId, name: &str, arguments: usize) -> Option<&'c MethodSymbol> {
        let table: &'c SymbolTable = self.table;
        let mut fallback = None;
        for id in table.supertypes(owner) {
            for method in table
                .get(id)
                .methods
                .iter()
                .filter(|m| m.name == name && m.kind != MethodKind::Constructor)
            {
                if method.parameters.len() == arguments {
                    return Some(method);
                }
                fallback.get_or_insert(method);
            }
        }
        fallback
    }
}

fn table_context(table: &SymbolTable, id: TypeId) -> ResolutionContext<'_> {
    let symbol = table.get(id);
    ResolutionContext {
        namespace: &symbol.namespace,
        usings: &symbol.usings,
        enclosing: Some(id),
    }
}

fn literal_type(text: &str) -> Option<ResolvedType> {
    let name = if text.starts_with('"') || text.starts_with("@\"") || text.starts_with("$\"") {
        "string"
    } else if text == "true" || text == "false" {
        "bool"
    } else if text.starts_with('\'') {
        "char"
    } else if text.starts_with(|c: char| c.is_ascii_digit()) {
        if text.contains('.') {
            "double"
        } else {
            "int"
        }
    } else {
        return None;
    };
    Some(ResolvedType::named(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_type_of_generic_and_array() {
        let list = ResolvedType {
            type_arguments: vec![ResolvedType::named("Foo")],
            ..ResolvedType::named("List")
        };
        assert_eq!(list.element_type().unwrap().name, "Foo");

        let array = ResolvedType {
            is_array: true,
            ..ResolvedType::named("Foo")
        };
        assert_eq!(array.element_type().unwrap(), ResolvedType::named("Foo"));
        assert!(ResolvedType::named("Foo").element_type().is_none());
    }

    #[test]
    fn test_external_types() {
        assert!(ResolvedType::named("ICommandBus").is_external());
        assert!(!ResolvedType::named("string").is_external());
        let array = ResolvedType {
            is_array: true,
            ..ResolvedType::named("ICommandBus")
        };
        assert!(!array.is_external());
    }

    #[test]
    fn test_literal_types() {
        assert_eq!(literal_type("\"x\"").unwrap().name, "string");
        assert_eq!(literal_type("42").unwrap().name, "int");
        assert_eq!(literal_type("true").unwrap().name, "bool");
        assert!(literal_type("null").is_none());
    }
}
