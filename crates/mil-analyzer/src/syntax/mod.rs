//! Owned syntax model produced by the source frontends.
//!
//! The analysis passes never copy declarations out of this tree; they hold
//! borrowed references (`&'a TypeDecl`, `&'a Expr`) into the units owned by
//! a [`Compilation`](crate::semantic::Compilation).

mod body;

pub use body::{Block, Expr, Statement, VariableDeclarator};

use std::path::PathBuf;
use crate::diagnostic::Span;

/// A parsed source file.
#[derive(Debug, Clone)]
pub struct SyntaxUnit {
    pub path: PathBuf,
    /// Namespaces imported with `using` directives.
    pub usings: Vec<String>,
    pub members: Vec<NamespaceMember>,
    /// Locations of nodes the parser could not make sense of.
    pub syntax_errors: Vec<Span>,
    /// Top-level statements other than local functions; they are not analyzed.
    pub top_level_statements: Vec<Span>,
    pub span: Span,
}

impl SyntaxUnit {
    /// Iterates every type declaration in the unit, including nested types,
    /// in document order.
    pub fn type_declarations(&self) -> Vec<&TypeDecl> {
        let mut out = Vec::new();
        for member in &self.members {
            collect_member_types(member, &mut out);
        }
        out
    }
}

fn collect_member_types<'a>(member: &'a NamespaceMember, out: &mut Vec<&'a TypeDecl>) {
    match member {
        NamespaceMember::Namespace(ns) => {
            for m in &ns.members {
                collect_member_types(m, out);
            }
        }
        NamespaceMember::Type(decl) => collect_nested_types(decl, out),
        NamespaceMember::GlobalMethod(_) => {}
    }
}

fn collect_nested_types<'a>(decl: &'a TypeDecl, out: &mut Vec<&'a TypeDecl>) {
    out.push(decl);
    for nested in decl.nested_types() {
        collect_nested_types(nested, out);
    }
}

/// A member of a namespace (or of the compilation unit itself).
#[derive(Debug, Clone)]
pub enum NamespaceMember {
    Namespace(NamespaceDecl),
    Type(TypeDecl),
    /// A top-level local function.
    GlobalMethod(MethodDecl),
}

/// A namespace declaration (block or file-scoped).
#[derive(Debug, Clone)]
pub struct NamespaceDecl {
    /// Dotted name as written, e.g. `Foo.Message`.
    pub name: String,
    pub usings: Vec<String>,
    pub members: Vec<NamespaceMember>,
    pub span: Span,
}

/// The kind of a type declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Struct,
    Record,
    Interface,
    Enum,
}

impl TypeKind {
    /// Class-like declarations are the ones eligible for role classification.
    pub fn is_class_like(self) -> bool {
        matches!(self, TypeKind::Class | TypeKind::Struct | TypeKind::Record)
    }
}

/// A class-like type declaration.
#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub name: String,
    pub kind: TypeKind,
    pub modifiers: Vec<String>,
    pub type_parameters: Vec<String>,
    /// Base types in declaration order; empty when there is no base list.
    pub bases: Vec<TypeRef>,
    pub members: Vec<Member>,
    /// Member names of an enum declaration, in declaration order.
    pub enum_members: Vec<String>,
    pub span: Span,
}

impl TypeDecl {
    pub fn has_modifier(&self, modifier: &str) -> bool {
        self.modifiers.iter().any(|m| m == modifier)
    }

    pub fn is_abstract(&self) -> bool {
        self.has_modifier("abstract")
    }

    pub fn is_partial(&self) -> bool {
        self.has_modifier("partial")
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDecl> {
        self.members.iter().filter_map(|m| match m {
            Member::Method(method) | Member::Constructor(method) => Some(method),
            _ => None,
        })
    }

    pub fn properties(&self) -> impl Iterator<Item = &PropertyDecl> {
        self.members.iter().filter_map(|m| match m {
            Member::Property(p) => Some(p),
            _ => None,
        })
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDecl> {
        self.members.iter().filter_map(|m| match m {
            Member::Field(f) => Some(f),
            _ => None,
        })
    }

    pub fn nested_types(&self) -> impl Iterator<Item = &TypeDecl> {
        self.members.iter().filter_map(|m| match m {
            Member::Type(t) => Some(t),
            _ => None,
        })
    }
}

/// A member declaration inside a type body.
#[derive(Debug, Clone)]
pub enum Member {
    Method(MethodDecl),
    Constructor(MethodDecl),
    Property(PropertyDecl),
    Field(FieldDecl),
    Type(TypeDecl),
}

/// What kind of callable a [`MethodDecl`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Ordinary,
    Constructor,
    LocalFunction,
}

/// A method, constructor or local function.
#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub name: String,
    pub kind: MethodKind,
    pub modifiers: Vec<String>,
    pub type_parameters: Vec<String>,
    pub return_type: Option<TypeRef>,
    pub parameters: Vec<Parameter>,
    /// `None` for abstract and interface methods.
    pub body: Option<Block>,
    pub span: Span,
}

/// A parameter of a method or lambda.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    /// `None` for implicitly typed lambda parameters.
    pub ty: Option<TypeRef>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct PropertyDecl {
    pub name: String,
    pub ty: TypeRef,
    pub modifiers: Vec<String>,
    pub span: Span,
}

/// One declarator of a field declaration (`int a, b;` yields two).
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeRef,
    pub modifiers: Vec<String>,
    pub span: Span,
}

/// A reference to a type as written in source.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    /// `Foo`
    Simple { name: String, span: Span },
    /// `Foo<A, B>`
    Generic { name: String, args: Vec<TypeRef>, span: Span },
    /// `Ns.Foo` or `Ns.Foo<A>`; `name` is the right-most simple or generic name.
    Qualified { qualifier: String, name: Box<TypeRef>, span: Span },
    /// `int`, `string`, ...
    Predefined { keyword: String, span: Span },
    /// `T[]`
    Array { element: Box<TypeRef>, span: Span },
    /// `T?`
    Nullable { inner: Box<TypeRef>, span: Span },
    /// `var`
    Implicit { span: Span },
    /// Anything else (tuples, pointers, function pointers), kept as text.
    Other { text: String, span: Span },
}

impl TypeRef {
    /// The plain name: the right-most identifier without any generic suffix.
    pub fn plain_name(&self) -> &str {
        match self {
            TypeRef::Simple { name, .. } | TypeRef::Generic { name, .. } => name,
            TypeRef::Qualified { name, .. } => name.plain_name(),
            TypeRef::Predefined { keyword, .. } => keyword,
            TypeRef::Array { element, .. } => element.plain_name(),
            TypeRef::Nullable { inner, .. } => inner.plain_name(),
            TypeRef::Implicit { .. } => "var",
            TypeRef::Other { text, .. } => text,
        }
    }

    /// True for a generic name, qualified or not.
    pub fn is_generic(&self) -> bool {
        match self {
            TypeRef::Generic { .. } => true,
            TypeRef::Qualified { name, .. } => name.is_generic(),
            _ => false,
        }
    }

    /// Type arguments of a generic name; empty for everything else.
    pub fn type_arguments(&self) -> &[TypeRef] {
        match self {
            TypeRef::Generic { args, .. } => args,
            TypeRef::Qualified { name, .. } => name.type_arguments(),
            _ => &[],
        }
    }

    /// The namespace or type qualifier, if the name was written qualified.
    pub fn qualifier(&self) -> Option<&str> {
        match self {
            TypeRef::Qualified { qualifier, .. } => Some(qualifier),
            _ => None,
        }
    }

    pub fn is_implicit(&self) -> bool {
        matches!(self, TypeRef::Implicit { .. })
    }

    pub fn span(&self) -> &Span {
        match self {
            TypeRef::Simple { span, .. }
            | TypeRef::Generic { span, .. }
            | TypeRef::Qualified { span, .. }
            | TypeRef::Predefined { span, .. }
            | TypeRef::Array { span, .. }
            | TypeRef::Nullable { span, .. }
            | TypeRef::Implicit { span }
            | TypeRef::Other { span, .. } => span,
        }
    }

    /// Reconstructs the source form, e.g. `List<Foo>`.
    pub fn display(&self) -> String {
        match self {
            TypeRef::Simple { name, .. } => name.clone(),
            TypeRef::Generic { name, args, .. } => {
                let args: Vec<String> = args.iter().map(TypeRef::display).collect();
                format!("{}<{}>", name, args.join(", "))
            }
            TypeRef::Qualified { qualifier, name, .. } => format!("{}.{}", qualifier, name.display()),
            TypeRef::Predefined { keyword, .. } => keyword.clone(),
            TypeRef::Array { element, .. } => format!("{}[]", element.display()),
            TypeRef::Nullable { inner, .. } => format!("{}?", inner.display()),
            TypeRef::Implicit { .. } => "var".to_string(),
            TypeRef::Other { text, .. } => text.clone(),
        }
    }

    /// Builds an unqualified, non-generic reference (used for synthesized types).
    pub fn simple(name: impl Into<String>, span: Span) -> Self {
        TypeRef::Simple {
            name: name.into(),
            span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple(name: &str) -> TypeRef {
        TypeRef::simple(name, Span::default())
    }

    #[test]
    fn plain_name_strips_qualifier_and_generic_suffix() {
        let generic = TypeRef::Generic {
            name: "ICommandHandler".to_string(),
            args: vec![simple("Foo")],
            span: Span::default(),
        };
        let qualified = TypeRef::Qualified {
            qualifier: "Foo.Message".to_string(),
            name: Box::new(generic.clone()),
            span: Span::default(),
        };

        assert_eq!(generic.plain_name(), "ICommandHandler");
        assert_eq!(qualified.plain_name(), "ICommandHandler");
        assert!(qualified.is_generic());
        assert_eq!(qualified.type_arguments()[0].plain_name(), "Foo");
        assert_eq!(qualified.display(), "Foo.Message.ICommandHandler<Foo>");
    }

    #[test]
    fn non_generic_names_have_no_type_arguments() {
        let t = simple("ICommand");
        assert!(!t.is_generic());
        assert!(t.type_arguments().is_empty());
        assert_eq!(t.qualifier(), None);
    }
}
