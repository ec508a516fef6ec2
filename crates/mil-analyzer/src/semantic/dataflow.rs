//! Region data-flow over the locals of a method body.

use crate::diagnostic::Span;
use crate::syntax::{Expr, MethodDecl, Statement};
use super::binder::{Binder, LocalKind, Locals, ResolvedType};

/// A local or parameter reported by data-flow analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct DataFlowSymbol {
    pub name: String,
    pub kind: LocalKind,
    pub ty: Option<ResolvedType>,
}

/// Which locals are read and written relative to a region of a method body.
///
/// Each list is in declaration order, parameters first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataFlowAnalysis {
    pub read_inside: Vec<DataFlowSymbol>,
    pub read_outside: Vec<DataFlowSymbol>,
    pub written_inside: Vec<DataFlowSymbol>,
    /// Written inside the region and read after it.
    pub data_flows_out: Vec<DataFlowSymbol>,
}

#[derive(Debug, Clone, Copy)]
struct Occurrence {
    local: usize,
    offset: usize,
    read: bool,
    write: bool,
}

pub(crate) fn analyze(binder: &Binder<'_, '_>, method: &MethodDecl, region: &Span) -> DataFlowAnalysis {
    let mut collector = Collector {
        locals: &binder.locals,
        occurrences: Vec::new(),
    };
    for param in &method.parameters {
        collector.write(&param.name, method.span.start_byte, method.span.start_byte);
    }
    if let Some(body) = &method.body {
        for statement in &body.statements {
            collector.statement(statement);
        }
    }

    let count = binder.locals.entries.len();
    let mut read_inside = vec![false; count];
    let mut read_outside = vec![false; count];
    let mut written_inside = vec![false; count];
    let mut read_after = vec![false; count];

    for occurrence in &collector.occurrences {
        let inside = region.contains_offset(occurrence.offset);
        if occurrence.read {
            if inside {
                read_inside[occurrence.local] = true;
            } else {
                read_outside[occurrence.local] = true;
                if occurrence.offset >= region.end_byte {
                    read_after[occurrence.local] = true;
                }
            }
        }
        if occurrence.write && inside {
            written_inside[occurrence.local] = true;
        }
    }

    let symbols = |flags: &[bool]| -> Vec<DataFlowSymbol> {
        flags
            .iter()
            .enumerate()
            .filter(|(_, set)| **set)
            .map(|(index, _)| {
                let entry = &binder.locals.entries[index];
                DataFlowSymbol {
                    name: entry.name.to_string(),
                    kind: entry.kind,
                    ty: binder.local_type(index, 0),
                }
            })
            .collect()
    };

    let flows_out: Vec<bool> = written_inside
        .iter()
        .zip(&read_after)
        .map(|(written, read)| *written && *read)
        .collect();

    DataFlowAnalysis {
        read_inside: symbols(&read_inside),
        read_outside: symbols(&read_outside),
        written_inside: symbols(&written_inside),
        data_flows_out: symbols(&flows_out),
    }
}

struct Collector<'l, 'm> {
    locals: &'l Locals<'m>,
    occurrences: Vec<Occurrence>,
}

impl Collector<'_, '_> {
    fn record(&mut self, name: &str, lookup_at: usize, offset: usize, read: bool, write: bool) {
        if let Some(local) = self.locals.lookup(name, lookup_at) {
            self.occurrences.push(Occurrence {
                local,
                offset,
                read,
                write,
            });
        }
    }

    fn write(&mut self, name: &str, lookup_at: usize, offset: usize) {
        self.record(name, lookup_at, offset, false, true);
    }

    fn statement(&mut self, statement: &Statement) {
        match statement {
            Statement::LocalDeclaration { declarators, .. } => {
                for declarator in declarators {
                    if let Some(init) = &declarator.initializer {
                        self.expr(init);
                        self.write(&declarator.name, declarator.span.end_byte, declarator.span.start_byte);
                    }
                }
            }
            Statement::ForEach {
                variable,
                variable_span,
                collection,
                body,
                ..
            } => {
                self.expr(collection);
                self.write(variable, variable_span.end_byte, variable_span.start_byte);
                self.statement(body);
            }
            other => {
                let (expressions, statements) = other.parts();
                for expr in expressions {
                    self.expr(expr);
                }
                for nested in statements {
                    self.statement(nested);
                }
            }
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Identifier { name, span } => {
                self.record(name, span.start_byte, span.start_byte, true, false);
            }
            Expr::Assignment {
                target,
                operator,
                value,
                ..
            } => {
                self.expr(value);
                match target.as_ref() {
                    Expr::Identifier { name, span } => {
                        let compound = operator != "=";
                        self.record(name, span.start_byte, span.start_byte, compound, true);
                    }
                    other => self.expr(other),
                }
            }
            Expr::Declaration { name, span, .. } => {
                self.write(name, span.end_byte, span.start_byte);
            }
            Expr::Lambda {
                parameters,
                body,
                span,
            } => {
                for param in parameters {
                    self.write(&param.name, span.start_byte, span.start_byte);
                }
                self.statement(body);
            }
            other => {
                for child in other.children() {
                    self.expr(child);
                }
            }
        }
    }
}
