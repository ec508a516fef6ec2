//! C# parser using tree-sitter.

use std::path::Path;
use tree_sitter::{Node, Parser};

use crate::diagnostic::{AnalysisError, Span};
use crate::syntax::*;

const MODIFIER_KEYWORDS: &[&str] = &[
    "public", "private", "protected", "internal", "static", "abstract", "sealed", "partial",
    "virtual", "override", "readonly", "async", "extern", "new", "unsafe", "volatile", "const",
    "required", "file",
];

/// C# parser.
pub struct CSharpParser {
    parser: Parser,
}

impl CSharpParser {
    /// Creates a new C# parser.
    pub fn new() -> Result<Self, AnalysisError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_c_sharp::LANGUAGE.into())
            .map_err(|_| AnalysisError::ParserInitFailed)?;
        Ok(Self { parser })
    }

    /// Parses a C# source file.
    ///
    /// Syntax errors do not fail the parse; they are recorded on the unit
    /// and surface later as declaration diagnostics.
    pub fn parse(&mut self, source: &str, path: &Path) -> Result<SyntaxUnit, AnalysisError> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| AnalysisError::ParseFailed { path: path.to_path_buf() })?;

        let root = tree.root_node();
        let visitor = Visitor::new(source, path);
        Ok(visitor.visit_compilation_unit(root))
    }
}

/// Lowers tree-sitter nodes into the owned syntax model.
struct Visitor<'a> {
    source: &'a str,
    path: &'a Path,
}

impl<'a> Visitor<'a> {
    fn new(source: &'a str, path: &'a Path) -> Self {
        Self { source, path }
    }

    fn span(&self, node: Node) -> Span {
        Span::new(
            self.path.to_path_buf(),
            (node.start_byte(), node.end_byte()),
            (node.start_position().row, node.start_position().column),
            (node.end_position().row, node.end_position().column),
        )
    }

    fn node_text(&self, node: Node) -> &str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    /// Text with all whitespace removed, for dotted names.
    fn compact_text(&self, node: Node) -> String {
        self.node_text(node).split_whitespace().collect()
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn visit_compilation_unit(&self, node: Node) -> SyntaxUnit {
        let mut usings = Vec::new();
        let mut members = Vec::new();
        let mut top_level_statements = Vec::new();
        let mut file_namespace: Option<NamespaceDecl> = None;

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "using_directive" => {
                    if let Some(using) = self.using_name(child) {
                        match file_namespace.as_mut() {
                            Some(ns) => ns.usings.push(using),
                            None => usings.push(using),
                        }
                    }
                }
                "file_scoped_namespace_declaration" => {
                    let mut ns = NamespaceDecl {
                        name: child
                            .child_by_field_name("name")
                            .map(|n| self.compact_text(n))
                            .unwrap_or_default(),
                        usings: Vec::new(),
                        members: Vec::new(),
                        span: self.span(child),
                    };
                    // Depending on the grammar version, declarations after a
                    // file-scoped namespace are either its children or siblings.
                    self.visit_namespace_contents(child, &mut ns);
                    file_namespace = Some(ns);
                }
                "global_statement" => match self.visit_global_statement(child) {
                    Some(method) => members.push(NamespaceMember::GlobalMethod(method)),
                    None => top_level_statements.push(self.span(child)),
                },
                _ => {
                    if let Some(member) = self.visit_namespace_member(child) {
                        match file_namespace.as_mut() {
                            Some(ns) => ns.members.push(member),
                            None => members.push(member),
                        }
                    }
                }
            }
        }

        if let Some(ns) = file_namespace {
            members.push(NamespaceMember::Namespace(ns));
        }

        let mut syntax_errors = Vec::new();
        if node.has_error() {
            self.collect_errors(node, &mut syntax_errors);
        }

        SyntaxUnit {
            path: self.path.to_path_buf(),
            usings,
            members,
            syntax_errors,
            top_level_statements,
            span: self.span(node),
        }
    }

    fn collect_errors(&self, node: Node, out: &mut Vec<Span>) {
        if node.is_error() || node.is_missing() {
            out.push(self.span(node));
            return;
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.has_error() || child.is_missing() {
                self.collect_errors(child, out);
            }
        }
    }

    fn using_name(&self, node: Node) -> Option<String> {
        let mut name = None;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                // Aliases do not import a namespace
                "=" => return None,
                "identifier" | "qualified_name" => name = Some(self.compact_text(child)),
                _ => {}
            }
        }
        name
    }

    fn visit_global_statement(&self, node: Node) -> Option<MethodDecl> {
        let mut cursor = node.walk();
        let inner = node
            .named_children(&mut cursor)
            .find(|c| c.kind() == "local_function_statement")?;
        self.visit_method(inner, MethodKind::LocalFunction)
    }

    fn visit_namespace_member(&self, node: Node) -> Option<NamespaceMember> {
        if node.kind() == "namespace_declaration" {
            return Some(NamespaceMember::Namespace(self.visit_namespace(node)));
        }
        type_kind(node.kind())
            .and_then(|kind| self.visit_type(node, kind))
            .map(NamespaceMember::Type)
    }

    fn visit_namespace(&self, node: Node) -> NamespaceDecl {
        let mut ns = NamespaceDecl {
            name: node
                .child_by_field_name("name")
                .map(|n| self.compact_text(n))
                .unwrap_or_default(),
            usings: Vec::new(),
            members: Vec::new(),
            span: self.span(node),
        };
        if let Some(body) = node.child_by_field_name("body") {
            self.visit_namespace_contents(body, &mut ns);
        }
        ns
    }

    fn visit_namespace_contents(&self, node: Node, ns: &mut NamespaceDecl) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == "using_directive" {
                if let Some(using) = self.using_name(child) {
                    ns.usings.push(using);
                }
            } else if let Some(member) = self.visit_namespace_member(child) {
                ns.members.push(member);
            }
        }
    }

    fn visit_type(&self, node: Node, kind: TypeKind) -> Option<TypeDecl> {
        let name = node.child_by_field_name("name").map(|n| self.node_text(n).to_string())?;

        let mut decl = TypeDecl {
            name,
            kind,
            modifiers: self.modifiers(node),
            type_parameters: Vec::new(),
            bases: Vec::new(),
            members: Vec::new(),
            enum_members: Vec::new(),
            span: self.span(node),
        };

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "type_parameter_list" => decl.type_parameters = self.type_parameters(child),
                "base_list" => decl.bases = self.base_list(child),
                // Positional record parameters become properties
                "parameter_list" if kind == TypeKind::Record => {
                    for param in self.visit_parameters(child) {
                        if let Some(ty) = param.ty {
                            decl.members.push(Member::Property(PropertyDecl {
                                name: param.name,
                                ty,
                                modifiers: vec!["public".to_string()],
                                span: param.span,
                            }));
                        }
                    }
                }
                _ => {}
            }
        }

        if let Some(body) = node.child_by_field_name("body") {
            if kind == TypeKind::Enum {
                decl.enum_members = self.enum_members(body);
            } else {
                decl.members.extend(self.visit_members(body));
            }
        }

        Some(decl)
    }

    fn type_parameters(&self, node: Node) -> Vec<String> {
        let mut out = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() != "type_parameter" {
                continue;
            }
            let name = child.child_by_field_name("name").or_else(|| {
                let mut inner = child.walk();
                let found = child
                    .named_children(&mut inner)
                    .find(|c| c.kind() == "identifier");
                found
            });
            if let Some(name) = name {
                out.push(self.node_text(name).to_string());
            }
        }
        out
    }

    fn base_list(&self, node: Node) -> Vec<TypeRef> {
        let mut out = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "argument_list" | "comment" => {}
                "primary_constructor_base_type" => {
                    let ty = child.child_by_field_name("type").unwrap_or(child);
                    out.push(self.lower_type(ty));
                }
                _ => out.push(self.lower_type(child)),
            }
        }
        out
    }

    fn enum_members(&self, body: Node) -> Vec<String> {
        let mut out = Vec::new();
        let mut cursor = body.walk();
        for child in body.named_children(&mut cursor) {
            if child.kind() != "enum_member_declaration" {
                continue;
            }
            if let Some(name) = child.child_by_field_name("name") {
                out.push(self.node_text(name).to_string());
            }
        }
        out
    }

    fn visit_members(&self, body: Node) -> Vec<Member> {
        let mut members = Vec::new();
        let mut cursor = body.walk();
        for child in body.named_children(&mut cursor) {
            match child.kind() {
                "method_declaration" => {
                    if let Some(method) = self.visit_method(child, MethodKind::Ordinary) {
                        members.push(Member::Method(method));
                    }
                }
                "constructor_declaration" => {
                    if let Some(ctor) = self.visit_method(child, MethodKind::Constructor) {
                        members.push(Member::Constructor(ctor));
                    }
                }
                "property_declaration" => {
                    if let Some(property) = self.visit_property(child) {
                        members.push(Member::Property(property));
                    }
                }
                "field_declaration" => {
                    members.extend(self.visit_field(child).into_iter().map(Member::Field));
                }
                kind => {
                    if let Some(decl) = type_kind(kind).and_then(|k| self.visit_type(child, k)) {
                        members.push(Member::Type(decl));
                    }
                }
            }
        }
        members
    }

    fn visit_method(&self, node: Node, kind: MethodKind) -> Option<MethodDecl> {
        let name = node.child_by_field_name("name").map(|n| self.node_text(n).to_string())?;

        let return_type = node
            .child_by_field_name("returns")
            .or_else(|| node.child_by_field_name("type"))
            .map(|n| self.lower_type(n));

        let parameters = node
            .child_by_field_name("parameters")
            .map(|n| self.visit_parameters(n))
            .unwrap_or_default();

        let mut type_parameters = Vec::new();
        let mut body_node = node.child_by_field_name("body");
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "type_parameter_list" => type_parameters = self.type_parameters(child),
                "block" | "arrow_expression_clause" if body_node.is_none() => body_node = Some(child),
                _ => {}
            }
        }

        Some(MethodDecl {
            name,
            kind,
            modifiers: self.modifiers(node),
            type_parameters,
            return_type,
            parameters,
            body: body_node.and_then(|b| self.visit_body(b)),
            span: self.span(node),
        })
    }

    fn visit_parameters(&self, node: Node) -> Vec<Parameter> {
        let mut out = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() != "parameter" {
                continue;
            }
            let Some(name) = child.child_by_field_name("name") else {
                continue;
            };
            out.push(Parameter {
                name: self.node_text(name).to_string(),
                ty: child.child_by_field_name("type").map(|t| self.lower_type(t)),
                span: self.span(child),
            });
        }
        out
    }

    fn visit_property(&self, node: Node) -> Option<PropertyDecl> {
        let name = node.child_by_field_name("name")?;
        let ty = node.child_by_field_name("type")?;
        Some(PropertyDecl {
            name: self.node_text(name).to_string(),
            ty: self.lower_type(ty),
            modifiers: self.modifiers(node),
            span: self.span(node),
        })
    }

    fn visit_field(&self, node: Node) -> Vec<FieldDecl> {
        let modifiers = self.modifiers(node);
        let mut cursor = node.walk();
        let Some(declaration) = node
            .named_children(&mut cursor)
            .find(|c| c.kind() == "variable_declaration")
        else {
            return Vec::new();
        };
        let Some(ty) = declaration.child_by_field_name("type") else {
            return Vec::new();
        };
        let ty = self.lower_type(ty);

        let mut out = Vec::new();
        let mut inner = declaration.walk();
        for declarator in declaration.named_children(&mut inner) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            if let Some(name) = self.declarator_name(declarator) {
                out.push(FieldDecl {
                    name,
                    ty: ty.clone(),
                    modifiers: modifiers.clone(),
                    span: self.span(declarator),
                });
            }
        }
        out
    }

    fn modifiers(&self, node: Node) -> Vec<String> {
        let mut out = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "modifier" {
                out.push(self.node_text(child).trim().to_string());
            } else if !child.is_named() && MODIFIER_KEYWORDS.contains(&child.kind()) {
                out.push(child.kind().to_string());
            }
        }
        out
    }

    // =========================================================================
    // Types
    // =========================================================================

    fn lower_type(&self, node: Node) -> TypeRef {
        let span = self.span(node);
        match node.kind() {
            "identifier" => {
                let name = self.node_text(node).to_string();
                if name == "var" {
                    TypeRef::Implicit { span }
                } else {
                    TypeRef::Simple { name, span }
                }
            }
            "implicit_type" => TypeRef::Implicit { span },
            "predefined_type" => TypeRef::Predefined {
                keyword: self.node_text(node).to_string(),
                span,
            },
            "generic_name" => {
                let mut name = String::new();
                let mut args = Vec::new();
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    match child.kind() {
                        "identifier" => name = self.node_text(child).to_string(),
                        "type_argument_list" => {
                            let mut inner = child.walk();
                            args = child
                                .named_children(&mut inner)
                                .filter(|c| c.kind() != "comment")
                                .map(|c| self.lower_type(c))
                                .collect();
                        }
                        _ => {}
                    }
                }
                TypeRef::Generic { name, args, span }
            }
            "qualified_name" => {
                let qualifier = node.child_by_field_name("qualifier");
                let name = node.child_by_field_name("name");
                match (qualifier, name) {
                    (Some(qualifier), Some(name)) => TypeRef::Qualified {
                        qualifier: self.compact_text(qualifier),
                        name: Box::new(self.lower_type(name)),
                        span,
                    },
                    _ => {
                        let text = self.compact_text(node);
                        match text.rsplit_once('.') {
                            Some((qualifier, last)) => TypeRef::Qualified {
                                qualifier: qualifier.to_string(),
                                name: Box::new(TypeRef::simple(last, span.clone())),
                                span,
                            },
                            None => TypeRef::Simple { name: text, span },
                        }
                    }
                }
            }
            "alias_qualified_name" => match node.child_by_field_name("name") {
                Some(name) => self.lower_type(name),
                None => TypeRef::Other {
                    text: self.compact_text(node),
                    span,
                },
            },
            "array_type" => match node
                .child_by_field_name("type")
                .or_else(|| node.named_child(0))
            {
                Some(element) => TypeRef::Array {
                    element: Box::new(self.lower_type(element)),
                    span,
                },
                None => TypeRef::Other {
                    text: self.compact_text(node),
                    span,
                },
            },
            "nullable_type" => match node
                .child_by_field_name("type")
                .or_else(|| node.named_child(0))
            {
                Some(inner) => TypeRef::Nullable {
                    inner: Box::new(self.lower_type(inner)),
                    span,
                },
                None => TypeRef::Other {
                    text: self.compact_text(node),
                    span,
                },
            },
            _ => TypeRef::Other {
                text: self.node_text(node).to_string(),
                span,
            },
        }
    }

    // =========================================================================
    // Bodies
    // =========================================================================

    fn visit_body(&self, node: Node) -> Option<Block> {
        match node.kind() {
            "block" => Some(self.visit_block(node)),
            "arrow_expression_clause" => {
                let expr = node.named_child(0)?;
                let span = self.span(node);
                Some(Block {
                    statements: vec![Statement::Expression {
                        expression: self.visit_expr(expr),
                        span: span.clone(),
                    }],
                    span,
                })
            }
            _ => None,
        }
    }

    fn visit_block(&self, node: Node) -> Block {
        let mut statements = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if let Some(statement) = self.visit_statement(child) {
                statements.push(statement);
            }
        }
        Block {
            statements,
            span: self.span(node),
        }
    }

    fn visit_statement(&self, node: Node) -> Option<Statement> {
        let span = self.span(node);
        let statement = match node.kind() {
            "comment" => return None,
            "block" => Statement::Block(self.visit_block(node)),
            "local_declaration_statement" => {
                let mut cursor = node.walk();
                let declaration = node
                    .named_children(&mut cursor)
                    .find(|c| c.kind() == "variable_declaration")?;
                self.visit_variable_declaration(declaration, span)?
            }
            "expression_statement" => {
                let expr = node.named_child(0)?;
                Statement::Expression {
                    expression: self.visit_expr(expr),
                    span,
                }
            }
            "return_statement" => Statement::Return {
                value: node.named_child(0).map(|e| self.visit_expr(e)),
                span,
            },
            "if_statement" => {
                let condition = node.child_by_field_name("condition")?;
                let consequence = node.child_by_field_name("consequence")?;
                let alternative = node.child_by_field_name("alternative").and_then(|alt| {
                    if alt.kind() == "else_clause" {
                        alt.named_child(0)
                    } else {
                        Some(alt)
                    }
                });
                Statement::If {
                    condition: self.visit_expr(condition),
                    then_branch: Box::new(self.visit_statement(consequence)?),
                    else_branch: alternative
                        .and_then(|alt| self.visit_statement(alt))
                        .map(Box::new),
                    span,
                }
            }
            "foreach_statement" => match (
                node.child_by_field_name("type"),
                node.child_by_field_name("left"),
                node.child_by_field_name("right"),
                node.child_by_field_name("body"),
            ) {
                (Some(ty), Some(left), Some(right), Some(body)) if left.kind() == "identifier" => {
                    Statement::ForEach {
                        ty: self.lower_type(ty),
                        variable: self.node_text(left).to_string(),
                        variable_span: self.span(left),
                        collection: self.visit_expr(right),
                        body: Box::new(self.visit_statement(body)?),
                        span,
                    }
                }
                _ => self.visit_compound(node),
            },
            "local_function_statement" => {
                let method = self.visit_method(node, MethodKind::LocalFunction)?;
                let mut statements: Vec<Statement> = method
                    .parameters
                    .into_iter()
                    .filter_map(|p| {
                        let ty = p.ty?;
                        Some(Statement::LocalDeclaration {
                            ty,
                            declarators: vec![VariableDeclarator {
                                name: p.name,
                                initializer: None,
                                span: p.span.clone(),
                            }],
                            span: p.span,
                        })
                    })
                    .collect();
                if let Some(body) = method.body {
                    statements.push(Statement::Block(body));
                }
                Statement::Compound {
                    kind: node.kind().to_string(),
                    expressions: Vec::new(),
                    statements,
                    span,
                }
            }
            _ => self.visit_compound(node),
        };
        Some(statement)
    }

    /// Lowers any other statement-like node to the parts it contains.
    fn visit_compound(&self, node: Node) -> Statement {
        let mut expressions = Vec::new();
        let mut statements = Vec::new();

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            let kind = child.kind();
            match kind {
                "comment" => {}
                "variable_declaration" => {
                    if let Some(decl) = self.visit_variable_declaration(child, self.span(child)) {
                        statements.push(decl);
                    }
                }
                "catch_declaration" => {
                    if let (Some(ty), Some(name)) =
                        (child.child_by_field_name("type"), child.child_by_field_name("name"))
                    {
                        statements.push(Statement::LocalDeclaration {
                            ty: self.lower_type(ty),
                            declarators: vec![VariableDeclarator {
                                name: self.node_text(name).to_string(),
                                initializer: None,
                                span: self.span(name),
                            }],
                            span: self.span(child),
                        });
                    }
                }
                "catch_clause" | "finally_clause" | "switch_body" | "switch_section"
                | "catch_filter_clause" | "else_clause" => statements.push(self.visit_compound(child)),
                _ if is_statement_kind(kind) => {
                    if let Some(statement) = self.visit_statement(child) {
                        statements.push(statement);
                    }
                }
                _ => expressions.push(self.visit_expr(child)),
            }
        }

        Statement::Compound {
            kind: node.kind().to_string(),
            expressions,
            statements,
            span: self.span(node),
        }
    }

    fn visit_variable_declaration(&self, node: Node, span: Span) -> Option<Statement> {
        let ty = self.lower_type(node.child_by_field_name("type")?);
        let mut declarators = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() != "variable_declarator" {
                continue;
            }
            let Some(name) = self.declarator_name(child) else {
                continue;
            };
            declarators.push(VariableDeclarator {
                name,
                initializer: self.declarator_initializer(child).map(|e| self.visit_expr(e)),
                span: self.span(child),
            });
        }
        Some(Statement::LocalDeclaration {
            ty,
            declarators,
            span,
        })
    }

    fn declarator_name(&self, node: Node) -> Option<String> {
        node.child_by_field_name("name")
            .or_else(|| {
                let mut cursor = node.walk();
                let found = node
                    .named_children(&mut cursor)
                    .find(|c| c.kind() == "identifier");
                found
            })
            .map(|n| self.node_text(n).to_string())
    }

    fn declarator_initializer<'t>(&self, node: Node<'t>) -> Option<Node<'t>> {
        if let Some(init) = node.child_by_field_name("initializer") {
            return Some(init);
        }
        let name = node.child_by_field_name("name");
        let mut seen_name = name.is_some();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if Some(child) == name {
                continue;
            }
            match child.kind() {
                "equals_value_clause" => return child.named_child(0),
                "bracketed_argument_list" | "tuple_pattern" | "comment" => {}
                "identifier" if !seen_name => seen_name = true,
                _ => return Some(child),
            }
        }
        None
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn visit_expr(&self, node: Node) -> Expr {
        let span = self.span(node);
        let kind = node.kind();
        match kind {
            "identifier" => Expr::Identifier {
                name: self.node_text(node).to_string(),
                span,
            },
            "generic_name" => Expr::Identifier {
                name: self.lower_type(node).plain_name().to_string(),
                span,
            },
            "this_expression" | "this" => Expr::This { span },
            _ if kind.ends_with("_literal") => Expr::Literal {
                text: self.node_text(node).to_string(),
                span,
            },
            "parenthesized_expression" => match node.named_child(0) {
                Some(inner) => self.visit_expr(inner),
                None => self.visit_other(node),
            },
            "member_access_expression" => {
                match (node.child_by_field_name("expression"), node.child_by_field_name("name")) {
                    (Some(receiver), Some(name)) => Expr::MemberAccess {
                        receiver: Box::new(self.visit_expr(receiver)),
                        name: self.simple_name(name),
                        span,
                    },
                    _ => self.visit_other(node),
                }
            }
            // `a?.B` keeps the member name in a binding node after the `?`
            "conditional_access_expression" => {
                let binding = {
                    let mut cursor = node.walk();
                    let found = node
                        .named_children(&mut cursor)
                        .find(|c| c.kind() == "member_binding_expression");
                    found
                };
                match (
                    node.child_by_field_name("condition"),
                    binding.and_then(|b| b.child_by_field_name("name")),
                ) {
                    (Some(receiver), Some(name)) => Expr::MemberAccess {
                        receiver: Box::new(self.visit_expr(receiver)),
                        name: self.simple_name(name),
                        span,
                    },
                    _ => self.visit_other(node),
                }
            }
            "invocation_expression" => match node.child_by_field_name("function") {
                Some(function) => Expr::Invocation {
                    callee: Box::new(self.visit_expr(function)),
                    arguments: node
                        .child_by_field_name("arguments")
                        .map(|a| self.visit_arguments(a))
                        .unwrap_or_default(),
                    span,
                },
                None => self.visit_other(node),
            },
            "object_creation_expression" | "implicit_object_creation_expression" => {
                let ty = node
                    .child_by_field_name("type")
                    .map(|t| self.lower_type(t))
                    .unwrap_or(TypeRef::Implicit { span: span.clone() });
                let mut arguments = Vec::new();
                let mut initializers = Vec::new();
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    match child.kind() {
                        "argument_list" => arguments = self.visit_arguments(child),
                        "initializer_expression" => initializers = self.visit_initializer(child),
                        _ => {}
                    }
                }
                Expr::ObjectCreation {
                    ty,
                    arguments,
                    initializers,
                    span,
                }
            }
            "assignment_expression" => {
                match (node.child_by_field_name("left"), node.child_by_field_name("right")) {
                    (Some(left), Some(right)) => {
                        let operator = node
                            .child_by_field_name("operator")
                            .map(|op| self.node_text(op).to_string())
                            .or_else(|| {
                                let mut cursor = node.walk();
                                let found = node
                                    .children(&mut cursor)
                                    .find(|c| !c.is_named())
                                    .map(|c| self.node_text(c).to_string());
                                found
                            })
                            .unwrap_or_else(|| "=".to_string());
                        Expr::Assignment {
                            target: Box::new(self.visit_expr(left)),
                            operator,
                            value: Box::new(self.visit_expr(right)),
                            span,
                        }
                    }
                    _ => self.visit_other(node),
                }
            }
            "cast_expression" => {
                match (node.child_by_field_name("type"), node.child_by_field_name("value")) {
                    (Some(ty), Some(value)) => Expr::Cast {
                        ty: self.lower_type(ty),
                        value: Box::new(self.visit_expr(value)),
                        span,
                    },
                    _ => self.visit_other(node),
                }
            }
            "declaration_expression" => {
                match (node.child_by_field_name("type"), node.child_by_field_name("name")) {
                    (Some(ty), Some(name)) => Expr::Declaration {
                        ty: self.lower_type(ty),
                        name: self.node_text(name).to_string(),
                        span,
                    },
                    _ => self.visit_other(node),
                }
            }
            "lambda_expression" | "anonymous_method_expression" => self.visit_lambda(node),
            _ => self.visit_other(node),
        }
    }

    fn visit_other(&self, node: Node) -> Expr {
        let mut cursor = node.walk();
        let children = node
            .named_children(&mut cursor)
            .filter(|c| c.kind() != "comment")
            .map(|c| self.visit_expr(c))
            .collect();
        Expr::Other {
            kind: node.kind().to_string(),
            children,
            span: self.span(node),
        }
    }

    fn simple_name(&self, node: Node) -> String {
        match node.kind() {
            "generic_name" => self.lower_type(node).plain_name().to_string(),
            _ => self.node_text(node).to_string(),
        }
    }

    fn visit_arguments(&self, node: Node) -> Vec<Expr> {
        let mut out = Vec::new();
        let mut cursor = node.walk();
        for argument in node.named_children(&mut cursor) {
            if argument.kind() != "argument" {
                continue;
            }
            let mut inner = argument.walk();
            let value = argument
                .named_children(&mut inner)
                .filter(|c| c.kind() != "name_colon" && c.kind() != "comment")
                .last();
            if let Some(value) = value {
                out.push(self.visit_expr(value));
            }
        }
        out
    }

    fn visit_initializer(&self, node: Node) -> Vec<Expr> {
        let mut out = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "comment" => {}
                // Only the value of `Member = value` belongs to the enclosing scope
                "assignment_expression" => {
                    if let Some(right) = child.child_by_field_name("right") {
                        out.push(self.visit_expr(right));
                    }
                }
                _ => out.push(self.visit_expr(child)),
            }
        }
        out
    }

    fn visit_lambda(&self, node: Node) -> Expr {
        let span = self.span(node);
        let mut parameters = Vec::new();
        let mut body = node.child_by_field_name("body");

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "parameter_list" => parameters = self.visit_parameters(child),
                "identifier" | "implicit_parameter" if parameters.is_empty() && Some(child) != body => {
                    parameters.push(Parameter {
                        name: self.node_text(child).to_string(),
                        ty: None,
                        span: self.span(child),
                    });
                }
                _ => {}
            }
        }
        if body.is_none() {
            let mut cursor = node.walk();
            body = node.named_children(&mut cursor).last();
        }

        let body = match body {
            Some(b) if b.kind() == "block" => Statement::Block(self.visit_block(b)),
            Some(b) => Statement::Expression {
                expression: self.visit_expr(b),
                span: self.span(b),
            },
            None => Statement::Block(Block {
                statements: Vec::new(),
                span: span.clone(),
            }),
        };

        Expr::Lambda {
            parameters,
            body: Box::new(body),
            span,
        }
    }
}

fn type_kind(kind: &str) -> Option<TypeKind> {
    match kind {
        "class_declaration" => Some(TypeKind::Class),
        "struct_declaration" => Some(TypeKind::Struct),
        "record_declaration" | "record_struct_declaration" => Some(TypeKind::Record),
        "interface_declaration" => Some(TypeKind::Interface),
        "enum_declaration" => Some(TypeKind::Enum),
        _ => None,
    }
}

fn is_statement_kind(kind: &str) -> bool {
    kind == "block" || kind.ends_with("_statement")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(source: &str) -> SyntaxUnit {
        let mut parser = CSharpParser::new().unwrap();
        parser.parse(source, &PathBuf::from("test.cs")).unwrap()
    }

    fn first_type(unit: &SyntaxUnit) -> &TypeDecl {
        unit.type_declarations()[0]
    }

    #[test]
    fn test_parse_namespace_and_class() {
        let unit = parse(
            r#"
            using System;
            namespace Foo.Message
            {
                public class Foo : ICommand { }
            }
            "#,
        );

        assert_eq!(unit.usings, vec!["System"]);
        let NamespaceMember::Namespace(ns) = &unit.members[0] else {
            panic!("expected a namespace");
        };
        assert_eq!(ns.name, "Foo.Message");
        let decl = first_type(&unit);
        assert_eq!(decl.name, "Foo");
        assert_eq!(decl.kind, TypeKind::Class);
        assert_eq!(decl.bases.len(), 1);
        assert_eq!(decl.bases[0].plain_name(), "ICommand");
        assert!(unit.syntax_errors.is_empty());
    }

    #[test]
    fn test_parse_generic_base_and_modifiers() {
        let unit = parse(
            r#"
            namespace N {
                public abstract class FooHandler : Base, ICommandHandler<Foo>, ICommandHandler<Bar> { }
            }
            "#,
        );
        let decl = first_type(&unit);
        assert!(decl.is_abstract());
        assert_eq!(decl.bases.len(), 3);
        assert!(!decl.bases[0].is_generic());
        assert!(decl.bases[1].is_generic());
        assert_eq!(decl.bases[1].plain_name(), "ICommandHandler");
        assert_eq!(decl.bases[2].type_arguments()[0].plain_name(), "Bar");
    }

    #[test]
    fn test_parse_members() {
        let unit = parse(
            r#"
            class Process : IProcess {
                public enum ProcessState { NotStarted, Done }
                private int count, total;
                public ProcessState State { get; set; }
                public void Handle(Foo command) { var x = new Bar(); bus.Send(x); }
                public abstract void Nothing();
            }
            "#,
        );
        let decl = first_type(&unit);
        let nested: Vec<_> = decl.nested_types().collect();
        assert_eq!(nested.len(), 1);
        assert_eq!(nested[0].kind, TypeKind::Enum);
        assert_eq!(nested[0].enum_members, vec!["NotStarted", "Done"]);

        let fields: Vec<_> = decl.fields().map(|f| f.name.as_str()).collect();
        assert_eq!(fields, vec!["count", "total"]);

        let property = decl.properties().next().unwrap();
        assert_eq!(property.name, "State");
        assert_eq!(property.ty.plain_name(), "ProcessState");

        let methods: Vec<_> = decl.methods().collect();
        assert_eq!(methods.len(), 2);
        assert_eq!(methods[0].parameters[0].name, "command");
        assert_eq!(methods[0].body.as_ref().unwrap().statements.len(), 2);
        assert!(methods[1].body.is_none());
    }

    #[test]
    fn test_parse_send_invocation() {
        let unit = parse(
            r#"
            class Sender {
                void Go() { bus.Send(new Foo()); }
            }
            "#,
        );
        let method = first_type(&unit).methods().next().unwrap();
        let body = method.body.as_ref().unwrap();
        let Statement::Expression { expression, .. } = &body.statements[0] else {
            panic!("expected an expression statement");
        };
        let Expr::Invocation { callee, arguments, .. } = expression else {
            panic!("expected an invocation");
        };
        assert_eq!(callee.member_name(), Some("Send"));
        assert!(matches!(&arguments[0], Expr::ObjectCreation { ty, .. } if ty.plain_name() == "Foo"));
    }

    #[test]
    fn test_parse_records_expose_positional_properties() {
        let unit = parse("namespace N { public record Reserve(int Seats) : ICommand; }");
        let decl = first_type(&unit);
        assert_eq!(decl.kind, TypeKind::Record);
        assert_eq!(decl.properties().next().unwrap().name, "Seats");
    }

    #[test]
    fn test_parse_reports_syntax_errors() {
        let unit = parse("namespace N { class A { void M() { bus.Send(; } } }");
        assert!(!unit.syntax_errors.is_empty());
    }

    #[test]
    fn test_parser_loads_grammar() {
        assert!(CSharpParser::new().is_ok());
    }

    #[test]
    fn test_parse_null_conditional_invocation() {
        let unit = parse("class Sender { void Go() { bus?.Send(new Foo()); } }");
        let method = first_type(&unit).methods().next().unwrap();
        let body = method.body.as_ref().unwrap();
        let Statement::Expression { expression, .. } = &body.statements[0] else {
            panic!("expected an expression statement");
        };
        let Expr::Invocation { callee, arguments, .. } = expression else {
            panic!("expected an invocation");
        };
        assert_eq!(callee.member_name(), Some("Send"));
        assert!(matches!(callee.as_ref(), Expr::MemberAccess { receiver, .. }
            if matches!(receiver.as_ref(), Expr::Identifier { name, .. } if name == "bus")));
        assert_eq!(arguments.len(), 1);
    }
}
