//! Statements and expressions inside method bodies.

use super::{Parameter, TypeRef};
use crate::diagnostic::Span;

#[derive(Debug, Clone)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Statement {
    Block(Block),
    /// `T a = x, b;` Also used for catch declarations and local function parameters.
    LocalDeclaration {
        ty: TypeRef,
        declarators: Vec<VariableDeclarator>,
        span: Span,
    },
    Expression {
        expression: Expr,
        span: Span,
    },
    Return {
        value: Option<Expr>,
        span: Span,
    },
    If {
        condition: Expr,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
        span: Span,
    },
    ForEach {
        ty: TypeRef,
        variable: String,
        variable_span: Span,
        collection: Expr,
        body: Box<Statement>,
        span: Span,
    },
    /// Any other statement (loops, `using`, `lock`, `try`, `switch`...)
    /// lowered to the expressions and statements it contains.
    Compound {
        kind: String,
        expressions: Vec<Expr>,
        statements: Vec<Statement>,
        span: Span,
    },
}

impl Statement {
    pub fn span(&self) -> &Span {
        match self {
            Statement::Block(block) => &block.span,
            Statement::LocalDeclaration { span, .. }
            | Statement::Expression { span, .. }
            | Statement::Return { span, .. }
            | Statement::If { span, .. }
            | Statement::ForEach { span, .. }
            | Statement::Compound { span, .. } => span,
        }
    }

    /// Expressions and statements directly contained in this statement.
    pub fn parts(&self) -> (Vec<&Expr>, Vec<&Statement>) {
        match self {
            Statement::Block(block) => (Vec::new(), block.statements.iter().collect()),
            Statement::LocalDeclaration { declarators, .. } => (
                declarators.iter().filter_map(|d| d.initializer.as_ref()).collect(),
                Vec::new(),
            ),
            Statement::Expression { expression, .. } => (vec![expression], Vec::new()),
            Statement::Return { value, .. } => (value.iter().collect(), Vec::new()),
            Statement::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                let mut statements = vec![then_branch.as_ref()];
                statements.extend(else_branch.as_deref());
                (vec![condition], statements)
            }
            Statement::ForEach {
                collection, body, ..
            } => (vec![collection], vec![body.as_ref()]),
            Statement::Compound {
                expressions,
                statements,
                ..
            } => (expressions.iter().collect(), statements.iter().collect()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VariableDeclarator {
    pub name: String,
    pub initializer: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Identifier {
        name: String,
        span: Span,
    },
    This {
        span: Span,
    },
    Literal {
        text: String,
        span: Span,
    },
    /// `receiver.name`
    MemberAccess {
        receiver: Box<Expr>,
        name: String,
        span: Span,
    },
    Invocation {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
        span: Span,
    },
    ObjectCreation {
        ty: TypeRef,
        arguments: Vec<Expr>,
        /// Values of an object or collection initializer.
        initializers: Vec<Expr>,
        span: Span,
    },
    Assignment {
        target: Box<Expr>,
        operator: String,
        value: Box<Expr>,
        span: Span,
    },
    Cast {
        ty: TypeRef,
        value: Box<Expr>,
        span: Span,
    },
    /// Declaration expression, e.g. `out Foo x`.
    Declaration {
        ty: TypeRef,
        name: String,
        span: Span,
    },
    Lambda {
        parameters: Vec<Parameter>,
        body: Box<Statement>,
        span: Span,
    },
    Other {
        kind: String,
        children: Vec<Expr>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> &Span {
        match self {
            Expr::Identifier { span, .. }
            | Expr::This { span }
            | Expr::Literal { span, .. }
            | Expr::MemberAccess { span, .. }
            | Expr::Invocation { span, .. }
            | Expr::ObjectCreation { span, .. }
            | Expr::Assignment { span, .. }
            | Expr::Cast { span, .. }
            | Expr::Declaration { span, .. }
            | Expr::Lambda { span, .. }
            | Expr::Other { span, .. } => span,
        }
    }

    /// Direct sub-expressions in source order. Lambda bodies are statements
    /// and are not included.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Identifier { .. }
            | Expr::This { .. }
            | Expr::Literal { .. }
            | Expr::Declaration { .. }
            | Expr::Lambda { .. } => Vec::new(),
            Expr::MemberAccess { receiver, .. } => vec![receiver.as_ref()],
            Expr::Invocation {
                callee, arguments, ..
            } => std::iter::once(callee.as_ref()).chain(arguments).collect(),
            Expr::ObjectCreation {
                arguments,
                initializers,
                ..
            } => arguments.iter().chain(initializers).collect(),
            Expr::Assignment { target, value, .. } => vec![target.as_ref(), value.as_ref()],
            Expr::Cast { value, .. } => vec![value.as_ref()],
            Expr::Other { children, .. } => children.iter().collect(),
        }
    }

    /// Name of the member being accessed, for member access expressions.
    pub fn member_name(&self) -> Option<&str> {
        match self {
            Expr::MemberAccess { name, .. } => Some(name),
            _ => None,
        }
    }
}
