//! Declared symbols: types, members and the namespace tree.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::diagnostic::Span;
use crate::syntax::{
    MethodKind, NamespaceDecl, NamespaceMember, SyntaxUnit, TypeDecl, TypeKind, TypeRef,
};

/// Index of a [`TypeSymbol`] in its [`SymbolTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) usize);

/// A declared type. Partial declarations share one symbol.
#[derive(Debug, Clone)]
pub struct TypeSymbol {
    pub id: TypeId,
    pub name: String,
    pub kind: TypeKind,
    /// Full dotted namespace; empty for the global namespace.
    pub namespace: String,
    /// Enclosing type for nested declarations.
    pub container: Option<TypeId>,
    pub type_parameters: Vec<String>,
    pub is_partial: bool,
    pub is_abstract: bool,
    /// Base types as written, across all partial declarations.
    pub bases: Vec<TypeRef>,
    pub base_class: Option<TypeId>,
    /// Directly implemented interfaces declared in the compilation.
    pub interfaces: Vec<TypeId>,
    pub properties: Vec<PropertySymbol>,
    pub fields: Vec<FieldSymbol>,
    pub methods: Vec<MethodSymbol>,
    pub nested_types: Vec<TypeId>,
    pub enum_members: Vec<String>,
    /// Namespaces imported where the type is declared.
    pub usings: Vec<String>,
    pub spans: Vec<Span>,
}

impl TypeSymbol {
    pub fn arity(&self) -> usize {
        self.type_parameters.len()
    }

    pub fn is_enum(&self) -> bool {
        self.kind == TypeKind::Enum
    }

    /// Returns the first property with the given name.
    pub fn property(&self, name: &str) -> Option<&PropertySymbol> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldSymbol> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct PropertySymbol {
    pub name: String,
    pub ty: TypeRef,
}

#[derive(Debug, Clone)]
pub struct FieldSymbol {
    pub name: String,
    pub ty: TypeRef,
}

#[derive(Debug, Clone)]
pub struct ParameterSymbol {
    pub name: String,
    pub ty: Option<TypeRef>,
}

#[derive(Debug, Clone)]
pub struct MethodSymbol {
    pub name: String,
    pub kind: MethodKind,
    pub containing_type: TypeId,
    pub type_parameters: Vec<String>,
    pub parameters: Vec<ParameterSymbol>,
    pub return_type: Option<TypeRef>,
    pub span: Span,
}

/// A namespace and what it directly declares.
#[derive(Debug, Clone, Default)]
pub struct NamespaceSymbol {
    /// Last segment of the name; empty for the global namespace.
    pub name: String,
    pub full_name: String,
    pub namespaces: Vec<NamespaceSymbol>,
    /// Top-level types declared directly in this namespace, in declaration order.
    pub types: Vec<TypeId>,
}

impl NamespaceSymbol {
    pub fn is_global(&self) -> bool {
        self.full_name.is_empty()
    }

    /// Finds a direct child namespace by its last segment.
    pub fn namespace(&self, name: &str) -> Option<&NamespaceSymbol> {
        self.namespaces.iter().find(|ns| ns.name == name)
    }

    fn child_mut(&mut self, segment: &str) -> &mut NamespaceSymbol {
        let index = match self.namespaces.iter().position(|ns| ns.name == segment) {
            Some(index) => index,
            None => {
                let full_name = if self.full_name.is_empty() {
                    segment.to_string()
                } else {
                    format!("{}.{}", self.full_name, segment)
                };
                self.namespaces.push(NamespaceSymbol {
                    name: segment.to_string(),
                    full_name,
                    namespaces: Vec::new(),
                    types: Vec::new(),
                });
                self.namespaces.len() - 1
            }
        };
        &mut self.namespaces[index]
    }

    fn descendant_mut(&mut self, dotted: &str) -> &mut NamespaceSymbol {
        let mut current = self;
        for segment in dotted.split('.').filter(|s| !s.is_empty()) {
            current = current.child_mut(segment);
        }
        current
    }

    /// Types of every descendant namespace, depth-first.
    ///
    /// For each child namespace the types of its own descendants come first,
    /// followed by the child's types. Types declared directly in `self` are
    /// not included, and neither are nested types.
    pub fn walk_types(&self) -> Vec<TypeId> {
        let mut out = Vec::new();
        for child in &self.namespaces {
            out.extend(child.walk_types());
            out.extend(child.types.iter().copied());
        }
        out
    }
}

/// Where a type name is looked up from.
#[derive(Debug, Clone, Copy)]
pub struct ResolutionContext<'s> {
    pub namespace: &'s str,
    pub usings: &'s [String],
    pub enclosing: Option<TypeId>,
}

/// All types declared in a compilation.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    types: Vec<TypeSymbol>,
    global: NamespaceSymbol,
    by_location: HashMap<(PathBuf, usize), TypeId>,
    by_name: HashMap<String, Vec<TypeId>>,
    namespaces: HashSet<String>,
}

impl SymbolTable {
    pub(crate) fn build(units: &[SyntaxUnit]) -> Self {
        let mut table = SymbolTable::default();
        let mut partials: HashMap<(String, Option<TypeId>, String, usize), TypeId> = HashMap::new();

        for unit in units {
            for member in &unit.members {
                table.declare_member(member, "", &unit.usings, &mut partials);
            }
        }
        table.resolve_bases();
        table
    }

    fn declare_member(
        &mut self,
        member: &NamespaceMember,
        namespace: &str,
        usings: &[String],
        partials: &mut HashMap<(String, Option<TypeId>, String, usize), TypeId>,
    ) {
        match member {
            NamespaceMember::Namespace(ns) => self.declare_namespace(ns, namespace, usings, partials),
            NamespaceMember::Type(decl) => {
                let id = self.declare_type(decl, namespace, None, usings, partials);
                let ns = self.global.descendant_mut(namespace);
                if !ns.types.contains(&id) {
                    ns.types.push(id);
                }
            }
            NamespaceMember::GlobalMethod(_) => {}
        }
    }

    fn declare_namespace(
        &mut self,
        decl: &NamespaceDecl,
        parent: &str,
        usings: &[String],
        partials: &mut HashMap<(String, Option<TypeId>, String, usize), TypeId>,
    ) {
        let full_name = if parent.is_empty() {
            decl.name.clone()
        } else {
            format!("{}.{}", parent, decl.name)
        };
        self.global.descendant_mut(&full_name);

        let mut prefix = String::new();
        for segment in full_name.split('.') {
            if !prefix.is_empty() {
                prefix.push('.');
            }
            prefix.push_str(segment);
            self.namespaces.insert(prefix.clone());
        }

        let mut scope_usings = usings.to_vec();
        scope_usings.extend(decl.usings.iter().cloned());
        for member in &decl.members {
            self.declare_member(member, &full_name, &scope_usings, partials);
        }
    }

    fn declare_type(
        &mut self,
        decl: &TypeDecl,
        namespace: &str,
        container: Option<TypeId>,
        usings: &[String],
        partials: &mut HashMap<(String, Option<TypeId>, String, usize), TypeId>,
    ) -> TypeId {
        let key = (
            namespace.to_string(),
            container,
            decl.name.clone(),
            decl.type_parameters.len(),
        );

        let id = match partials.get(&key) {
            Some(&existing) if decl.is_partial() => existing,
            _ => {
                let id = TypeId(self.types.len());
                self.types.push(TypeSymbol {
                    id,
                    name: decl.name.clone(),
                    kind: decl.kind,
                    namespace: namespace.to_string(),
                    container,
                    type_parameters: decl.type_parameters.clone(),
                    is_partial: decl.is_partial(),
                    is_abstract: decl.is_abstract(),
                    bases: Vec::new(),
                    base_class: None,
                    interfaces: Vec::new(),
                    properties: Vec::new(),
                    fields: Vec::new(),
                    methods: Vec::new(),
                    nested_types: Vec::new(),
                    enum_members: Vec::new(),
                    usings: usings.to_vec(),
                    spans: Vec::new(),
                });
                self.by_name.entry(decl.name.clone()).or_default().push(id);
                if decl.is_partial() {
                    partials.insert(key, id);
                }
                if let Some(parent) = container {
                    self.types[parent.0].nested_types.push(id);
                }
                id
            }
        };

        self.by_location
            .insert((decl.span.file.clone(), decl.span.start_byte), id);

        {
            let symbol = &mut self.types[id.0];
            symbol.spans.push(decl.span.clone());
            symbol.bases.extend(decl.bases.iter().cloned());
            symbol.enum_members.extend(decl.enum_members.iter().cloned());
            for property in decl.properties() {
                symbol.properties.push(PropertySymbol {
                    name: property.name.clone(),
                    ty: property.ty.clone(),
                });
            }
            for field in decl.fields() {
                symbol.fields.push(FieldSymbol {
                    name: field.name.clone(),
                    ty: field.ty.clone(),
                });
            }
            for method in decl.methods() {
                symbol.methods.push(MethodSymbol {
                    name: method.name.clone(),
                    kind: method.kind,
                    containing_type: id,
                    type_parameters: method.type_parameters.clone(),
                    parameters: method
                        .parameters
                        .iter()
                        .map(|p| ParameterSymbol {
                            name: p.name.clone(),
                            ty: p.ty.clone(),
                        })
                        .collect(),
                    return_type: method.return_type.clone(),
                    span: method.span.clone(),
                });
            }
        }

        for nested in decl.nested_types() {
            self.declare_type(nested, namespace, Some(id), usings, partials);
        }

        id
    }

    fn resolve_bases(&mut self) {
        for index in 0..self.types.len() {
            let symbol = &self.types[index];
            let ctx = ResolutionContext {
                namespace: &symbol.namespace,
                usings: &symbol.usings,
                enclosing: symbol.container,
            };
            let is_interface = symbol.kind == TypeKind::Interface;

            let mut base_class = None;
            let mut interfaces = Vec::new();
            for (position, base) in symbol.bases.iter().enumerate() {
                let Some(resolved) = self.resolve(base, &ctx) else {
                    continue;
                };
                match self.types[resolved.0].kind {
                    TypeKind::Interface => {
                        if !interfaces.contains(&resolved) {
                            interfaces.push(resolved);
                        }
                    }
                    TypeKind::Class if !is_interface && position == 0 => base_class = Some(resolved),
                    _ => {}
                }
            }

            let symbol = &mut self.types[index];
            symbol.base_class = base_class;
            symbol.interfaces = interfaces;
        }
    }

    pub fn get(&self, id: TypeId) -> &TypeSymbol {
        &self.types[id.0]
    }

    pub fn types(&self) -> &[TypeSymbol] {
        &self.types
    }

    pub fn global_namespace(&self) -> &NamespaceSymbol {
        &self.global
    }

    /// True if any source file declares this namespace (or a namespace below it).
    pub fn declares_namespace(&self, name: &str) -> bool {
        self.namespaces.contains(name)
    }

    /// Maps a declaration back to its symbol.
    pub fn lookup_declaration(&self, decl: &TypeDecl) -> Option<TypeId> {
        self.by_location
            .get(&(decl.span.file.clone(), decl.span.start_byte))
            .copied()
    }

    pub fn types_named(&self, name: &str) -> &[TypeId] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Resolves a type reference following the scoping rules of the
    /// use site. Falls back to a compilation-wide match when exactly one
    /// declared type carries the name.
    pub fn resolve(&self, ty: &TypeRef, ctx: &ResolutionContext<'_>) -> Option<TypeId> {
        self.resolve_in_scope(ty, ctx).or_else(|| {
            let mut candidates = self.candidates(ty)?;
            let first = candidates.next()?;
            candidates.next().is_none().then_some(first)
        })
    }

    /// Resolves a type reference strictly from the use site's scope.
    pub fn resolve_in_scope(&self, ty: &TypeRef, ctx: &ResolutionContext<'_>) -> Option<TypeId> {
        let ty = match ty {
            TypeRef::Nullable { inner, .. } => inner.as_ref(),
            other => other,
        };
        let candidates: Vec<TypeId> = self.candidates(ty)?.collect();
        if candidates.is_empty() {
            return None;
        }

        if let Some(qualifier) = ty.qualifier() {
            return candidates.into_iter().find(|&id| {
                let symbol = self.get(id);
                match symbol.container {
                    Some(parent) => self.get(parent).name == qualifier
                        || qualifier.ends_with(&format!(".{}", self.get(parent).name)),
                    None => {
                        symbol.namespace == qualifier
                            || symbol.namespace.ends_with(&format!(".{}", qualifier))
                            || ctx
                                .usings
                                .iter()
                                .any(|u| symbol.namespace == format!("{}.{}", u, qualifier))
                    }
                }
            });
        }

        // Nested types of the enclosing type chain
        let mut enclosing = ctx.enclosing;
        while let Some(outer) = enclosing {
            if let Some(&found) = candidates
                .iter()
                .find(|&&id| self.get(id).container == Some(outer))
            {
                return Some(found);
            }
            enclosing = self.get(outer).container;
        }

        // Containing namespaces, innermost first
        let mut namespace = ctx.namespace;
        loop {
            if let Some(&found) = candidates.iter().find(|&&id| {
                let symbol = self.get(id);
                symbol.container.is_none() && symbol.namespace == namespace
            }) {
                return Some(found);
            }
            if namespace.is_empty() {
                break;
            }
            namespace = namespace.rsplit_once('.').map(|(parent, _)| parent).unwrap_or("");
        }

        // Imported namespaces
        candidates.into_iter().find(|&id| {
            let symbol = self.get(id);
            symbol.container.is_none() && ctx.usings.iter().any(|u| *u == symbol.namespace)
        })
    }

    fn candidates<'t>(&'t self, ty: &'t TypeRef) -> Option<impl Iterator<Item = TypeId> + 't> {
        let arity = match ty {
            TypeRef::Simple { .. } => 0,
            TypeRef::Generic { args, .. } => args.len(),
            TypeRef::Qualified { name, .. } => name.type_arguments().len(),
            _ => return None,
        };
        Some(
            self.types_named(ty.plain_name())
                .iter()
                .copied()
                .filter(move |&id| self.get(id).arity() == arity),
        )
    }

    /// Enclosing types from innermost to outermost, starting at `id`.
    pub fn containing_chain(&self, id: TypeId) -> Vec<TypeId> {
        let mut chain = vec![id];
        let mut current = self.get(id).container;
        while let Some(outer) = current {
            chain.push(outer);
            current = self.get(outer).container;
        }
        chain
    }

    /// The type itself, then its base classes, then every interface reachable
    /// from them.
    pub fn supertypes(&self, id: TypeId) -> Vec<TypeId> {
        let mut out = Vec::new();
        let mut current = Some(id);
        while let Some(ty) = current {
            if out.contains(&ty) {
                break;
            }
            out.push(ty);
            current = self.get(ty).base_class;
        }

        let mut index = 0;
        while index < out.len() {
            for &iface in &self.get(out[index]).interfaces {
                if !out.contains(&iface) {
                    out.push(iface);
                }
            }
            index += 1;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::csharp::parser::CSharpParser;

    fn table(source: &str) -> SymbolTable {
        let mut parser = CSharpParser::new().unwrap();
        let unit = parser.parse(source, &PathBuf::from("test.cs")).unwrap();
        SymbolTable::build(&[unit])
    }

    fn find<'t>(table: &'t SymbolTable, name: &str) -> &'t TypeSymbol {
        table.get(table.types_named(name)[0])
    }

    #[test]
    fn test_namespace_tree_and_walk_order() {
        let table = table(
            r#"
            class TopLevel { }
            namespace A { class InA { class Nested { } } }
            namespace A.B { class InB { } }
            namespace C { class InC { } }
            "#,
        );

        let global = table.global_namespace();
        assert!(global.is_global());
        assert_eq!(global.types.len(), 1);
        let a = global.namespace("A").unwrap();
        assert_eq!(a.namespace("B").unwrap().full_name, "A.B");

        let names: Vec<&str> = global
            .walk_types()
            .into_iter()
            .map(|id| table.get(id).name.as_str())
            .collect();
        assert_eq!(names, vec!["InB", "InA", "InC"]);
    }

    #[test]
    fn test_interfaces_resolve_through_usings() {
        let table = table(
            r#"
            namespace Contracts { public interface IProcess { } }
            namespace App {
                using Contracts;
                public class Base { }
                public class Proc : Base, IProcess { }
            }
            "#,
        );

        let proc = find(&table, "Proc");
        assert_eq!(proc.interfaces.len(), 1);
        assert_eq!(table.get(proc.interfaces[0]).name, "IProcess");
        assert_eq!(table.get(proc.base_class.unwrap()).name, "Base");
        assert_eq!(table.supertypes(proc.id).len(), 3);
    }

    #[test]
    fn test_partial_declarations_share_a_symbol() {
        let table = table(
            r#"
            namespace N {
                public partial class Split { public int A { get; set; } }
                public partial class Split { public int B { get; set; } }
            }
            "#,
        );

        assert_eq!(table.types_named("Split").len(), 1);
        assert_eq!(find(&table, "Split").properties.len(), 2);
        assert_eq!(table.global_namespace().namespace("N").unwrap().types.len(), 1);
    }

    #[test]
    fn test_nested_type_resolves_from_enclosing_type() {
        let table = table(
            r#"
            namespace N {
                class Proc { public enum State { A } public State Current { get; set; } }
                class Other { public enum State { B } }
            }
            "#,
        );

        let proc = find(&table, "Proc");
        let ctx = ResolutionContext {
            namespace: &proc.namespace,
            usings: &proc.usings,
            enclosing: Some(proc.id),
        };
        let resolved = table.resolve(&proc.properties[0].ty, &ctx).unwrap();
        assert_eq!(table.get(resolved).container, Some(proc.id));
        assert_eq!(table.get(resolved).enum_members, vec!["A"]);
    }
}
