//! Tree walker that indexes messaging declarations and publication sites.
//!
//! The walker holds references into the syntax units it visits, so the
//! units must outlive it. Visiting the same declaration twice (directly or
//! through another entry point) has no further effect.

use std::collections::HashSet;

use tracing::debug;

use crate::classify::{Classifier, Role};
use crate::config::MessagingConventions;
use crate::mil::{factory, MilToken};
use crate::semantic::BindingScope;
use crate::syntax::{Expr, MethodDecl, NamespaceMember, Statement, SyntaxUnit, TypeDecl, TypeRef};

/// A publish call found in a method body, with the context it was found in.
#[derive(Debug, Clone)]
pub struct PublicationSite<'a> {
    /// The `x.Send` member access.
    pub member_access: &'a Expr,
    /// The invocation whose callee is `member_access`.
    pub call: &'a Expr,
    /// The outermost invocation of the receiver chain containing `call`.
    pub invocation: &'a Expr,
    /// Innermost statement containing the call.
    pub statement: &'a Statement,
    pub method: &'a MethodDecl,
    pub type_decl: Option<&'a TypeDecl>,
    /// Dotted name of the enclosing type, including its containing types.
    pub type_path: String,
    pub namespace: String,
    pub unit: &'a SyntaxUnit,
}

impl<'a> PublicationSite<'a> {
    /// Binding scope for semantic queries about this site.
    pub fn scope(&self) -> BindingScope<'_> {
        BindingScope {
            namespace: &self.namespace,
            type_decl: self.type_decl,
            method: self.method,
        }
    }

    /// `<namespace>.<type>.<method>:[start..end)`, skipping empty parts.
    pub fn location(&self) -> String {
        let path: Vec<&str> = [self.namespace.as_str(), self.type_path.as_str(), self.method.name.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect();
        format!("{}:{}", path.join("."), self.invocation.span())
    }
}

/// A command type argument handled by more than one handler.
#[derive(Debug, Clone)]
pub struct DuplicateHandler<'a> {
    pub command: String,
    pub handlers: Vec<&'a TypeDecl>,
}

/// Where a method body being scanned lives.
struct MethodContext<'a, 'c> {
    unit: &'a SyntaxUnit,
    namespace: &'c str,
    type_decl: Option<&'a TypeDecl>,
    type_path: &'c str,
    method: &'a MethodDecl,
}

fn identity<T>(value: &T) -> usize {
    value as *const T as usize
}

/// Accumulates messaging declarations and publication sites across units.
#[derive(Debug, Clone, Default)]
pub struct SyntaxWalker<'a> {
    classifier: Classifier,
    seen_types: HashSet<usize>,
    seen_methods: HashSet<usize>,
    commands: Vec<&'a TypeDecl>,
    events: Vec<&'a TypeDecl>,
    aggregate_roots: Vec<&'a TypeDecl>,
    command_handler_index: Vec<(&'a TypeDecl, Vec<&'a TypeRef>)>,
    event_handler_index: Vec<(String, Vec<&'a TypeDecl>)>,
    publication_calls: Vec<&'a Expr>,
    publications: Vec<PublicationSite<'a>>,
    multi_role: Vec<(&'a TypeDecl, Vec<Role>)>,
}

impl<'a> SyntaxWalker<'a> {
    pub fn new(conventions: MessagingConventions) -> Self {
        Self {
            classifier: Classifier::new(conventions),
            ..Self::default()
        }
    }

    pub fn conventions(&self) -> &MessagingConventions {
        self.classifier.conventions()
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    /// Visits every declaration and method body of a unit.
    pub fn visit(&mut self, unit: &'a SyntaxUnit) {
        for member in &unit.members {
            self.visit_member(unit, member, "");
        }
    }

    fn visit_member(&mut self, unit: &'a SyntaxUnit, member: &'a NamespaceMember, namespace: &str) {
        match member {
            NamespaceMember::Namespace(ns) => {
                let full_name = if namespace.is_empty() {
                    ns.name.clone()
                } else {
                    format!("{}.{}", namespace, ns.name)
                };
                for inner in &ns.members {
                    self.visit_member(unit, inner, &full_name);
                }
            }
            NamespaceMember::Type(decl) => self.visit_type(unit, decl, namespace, ""),
            NamespaceMember::GlobalMethod(method) => {
                if self.seen_methods.insert(identity(method)) {
                    self.visit_method(&MethodContext {
                        unit,
                        namespace,
                        type_decl: None,
                        type_path: "",
                        method,
                    });
                }
            }
        }
    }

    /// Classifies `decl` and scans its method bodies, then does the same for
    /// its nested types.
    pub fn visit_type(&mut self, unit: &'a SyntaxUnit, decl: &'a TypeDecl, namespace: &str, outer: &str) {
        let type_path = if outer.is_empty() {
            decl.name.clone()
        } else {
            format!("{}.{}", outer, decl.name)
        };

        if self.seen_types.insert(identity(decl)) {
            self.classify(decl);
            for method in decl.methods() {
                if method.body.is_some() && self.seen_methods.insert(identity(method)) {
                    self.visit_method(&MethodContext {
                        unit,
                        namespace,
                        type_decl: Some(decl),
                        type_path: &type_path,
                        method,
                    });
                }
            }
        }

        for nested in decl.nested_types() {
            self.visit_type(unit, nested, namespace, &type_path);
        }
    }

    fn classify(&mut self, decl: &'a TypeDecl) {
        let classification = self.classifier.classify(decl);
        if classification.is_multi_role() {
            debug!(declaration = %decl.name, roles = ?classification.roles(), "declaration matches several roles");
            self.multi_role.push((decl, classification.roles()));
        }

        for (role, handled) in classification.matches {
            match role {
                Role::AggregateRoot => self.aggregate_roots.push(decl),
                Role::Command => self.commands.push(decl),
                Role::CommandHandler => self.command_handler_index.push((decl, handled)),
                Role::Event => self.events.push(decl),
                Role::EventHandler => {
                    for event in handled {
                        self.register_event_handler(event.plain_name(), decl);
                    }
                }
            }
        }
    }

    fn register_event_handler(&mut self, event: &str, handler: &'a TypeDecl) {
        let index = match self.event_handler_index.iter().position(|(key, _)| key == event) {
            Some(index) => index,
            None => {
                self.event_handler_index.push((event.to_string(), Vec::new()));
                self.event_handler_index.len() - 1
            }
        };
        let handlers = &mut self.event_handler_index[index].1;
        if !handlers.iter().any(|h| std::ptr::eq(*h, handler)) {
            handlers.push(handler);
        }
    }

    fn visit_method(&mut self, ctx: &MethodContext<'a, '_>) {
        if let Some(body) = &ctx.method.body {
            for statement in &body.statements {
                self.scan_statement(ctx, statement);
            }
        }
    }

    fn scan_statement(&mut self, ctx: &MethodContext<'a, '_>, statement: &'a Statement) {
        let (expressions, statements) = statement.parts();
        for expr in expressions {
            self.scan_expr(ctx, statement, expr, false);
        }
        for nested in statements {
            self.scan_statement(ctx, nested);
        }
    }

    /// `in_chain` is set while descending through the callee/receiver chain
    /// of an invocation that has already been recorded.
    fn scan_expr(&mut self, ctx: &MethodContext<'a, '_>, statement: &'a Statement, expr: &'a Expr, in_chain: bool) {
        match expr {
            Expr::Invocation {
                callee, arguments, ..
            } => {
                if !in_chain {
                    self.record_chain(ctx, statement, expr);
                }
                self.scan_expr(ctx, statement, callee, true);
                for argument in arguments {
                    self.scan_expr(ctx, statement, argument, false);
                }
            }
            Expr::MemberAccess { receiver, name, .. } => {
                if *name == self.classifier.conventions().publish_keyword {
                    self.publication_calls.push(expr);
                }
                self.scan_expr(ctx, statement, receiver, in_chain);
            }
            Expr::Lambda { body, .. } => self.scan_statement(ctx, body),
            other => {
                for child in other.children() {
                    self.scan_expr(ctx, statement, child, false);
                }
            }
        }
    }

    /// Records every publish call in the receiver chain of `outer`.
    fn record_chain(&mut self, ctx: &MethodContext<'a, '_>, statement: &'a Statement, outer: &'a Expr) {
        let mut current = outer;
        loop {
            match current {
                Expr::Invocation { callee, .. } => {
                    if let Expr::MemberAccess { name, .. } = callee.as_ref() {
                        if *name == self.classifier.conventions().publish_keyword {
                            self.publications.push(PublicationSite {
                                member_access: callee,
                                call: current,
                                invocation: outer,
                                statement,
                                method: ctx.method,
                                type_decl: ctx.type_decl,
                                type_path: ctx.type_path.to_string(),
                                namespace: ctx.namespace.to_string(),
                                unit: ctx.unit,
                            });
                        }
                    }
                    current = callee.as_ref();
                }
                Expr::MemberAccess { receiver, .. } => current = receiver.as_ref(),
                _ => break,
            }
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn commands(&self) -> &[&'a TypeDecl] {
        &self.commands
    }

    pub fn events(&self) -> &[&'a TypeDecl] {
        &self.events
    }

    pub fn aggregate_roots(&self) -> &[&'a TypeDecl] {
        &self.aggregate_roots
    }

    /// Handler declarations with the command types each one handles.
    pub fn command_handler_index(&self) -> &[(&'a TypeDecl, Vec<&'a TypeRef>)] {
        &self.command_handler_index
    }

    /// Event names with the handlers registered for each.
    pub fn event_handler_index(&self) -> &[(String, Vec<&'a TypeDecl>)] {
        &self.event_handler_index
    }

    pub fn command_handlers(&self) -> Vec<&'a TypeDecl> {
        self.command_handler_index.iter().map(|(handler, _)| *handler).collect()
    }

    /// Every event handler once, in order of first registration.
    pub fn event_handlers(&self) -> Vec<&'a TypeDecl> {
        let mut out: Vec<&'a TypeDecl> = Vec::new();
        for (_, handlers) in &self.event_handler_index {
            for handler in handlers {
                if !out.iter().any(|h| std::ptr::eq(*h, *handler)) {
                    out.push(handler);
                }
            }
        }
        out
    }

    pub fn handlers_for_event(&self, event: &str) -> &[&'a TypeDecl] {
        self.event_handler_index
            .iter()
            .find(|(key, _)| key == event)
            .map(|(_, handlers)| handlers.as_slice())
            .unwrap_or(&[])
    }

    /// Every publish member access, including ones that are not invoked.
    pub fn publication_calls(&self) -> &[&'a Expr] {
        &self.publication_calls
    }

    pub fn publications(&self) -> &[PublicationSite<'a>] {
        &self.publications
    }

    pub fn multi_role_declarations(&self) -> &[(&'a TypeDecl, Vec<Role>)] {
        &self.multi_role
    }

    /// Command type arguments handled by more than one handler, in order of
    /// first appearance.
    pub fn duplicate_command_handlers(&self) -> Vec<DuplicateHandler<'a>> {
        let mut grouped: Vec<DuplicateHandler<'a>> = Vec::new();
        for (handler, handled) in &self.command_handler_index {
            for command in handled {
                let name = command.plain_name();
                match grouped.iter_mut().find(|d| d.command == name) {
                    Some(entry) => {
                        if !entry.handlers.iter().any(|h| std::ptr::eq(*h, *handler)) {
                            entry.handlers.push(handler);
                        }
                    }
                    None => grouped.push(DuplicateHandler {
                        command: name.to_string(),
                        handlers: vec![handler],
                    }),
                }
            }
        }
        grouped.retain(|d| d.handlers.len() > 1);
        grouped
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// `Command? -> Handler` per command. The handler is the first one with a
    /// type argument whose name contains the command name.
    pub fn dump_command_data(&self) -> impl Iterator<Item = MilToken> + '_ {
        self.commands.iter().flat_map(move |command| {
            let handler = self
                .command_handler_index
                .iter()
                .find(|(_, handled)| {
                    handled
                        .iter()
                        .any(|t| t.plain_name().contains(command.name.as_str()))
                })
                .map(|(handler, _)| handler.name.clone())
                .unwrap_or_else(|| factory::empty().to_string());
            [
                factory::command(&command.name),
                factory::publish(),
                factory::command_handler(&handler),
                factory::statement_terminator(),
            ]
        })
    }

    /// `Event! -> ` per event, followed by an indented receive line per
    /// handler and a blank line when there are handlers.
    pub fn dump_event_data(&self) -> impl Iterator<Item = MilToken> + '_ {
        self.events.iter().flat_map(move |event| {
            let mut tokens = vec![
                factory::event(&event.name),
                factory::publish(),
                factory::statement_terminator(),
            ];
            let handlers = self.handlers_for_event(&event.name);
            if !handlers.is_empty() {
                for handler in handlers {
                    tokens.extend([
                        factory::indentation(),
                        factory::receive(),
                        factory::event_handler(&handler.name),
                        factory::statement_terminator(),
                    ]);
                }
                tokens.push(factory::statement_terminator());
            }
            tokens
        })
    }

    pub fn dump_aggregate_roots(&self) -> impl Iterator<Item = MilToken> + '_ {
        self.aggregate_roots
            .iter()
            .flat_map(|root| [factory::aggregate_root(&root.name), factory::statement_terminator()])
    }

    pub fn dump_publication_data(&self) -> impl Iterator<Item = String> + '_ {
        self.publications.iter().map(PublicationSite::location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::csharp::parser::CSharpParser;
    use crate::mil::{render, LINE_TERMINATOR as NL};
    use std::path::PathBuf;

    fn parse(source: &str) -> SyntaxUnit {
        let mut parser = CSharpParser::new().unwrap();
        parser.parse(source, &PathBuf::from("test.cs")).unwrap()
    }

    fn names(decls: &[&TypeDecl]) -> Vec<String> {
        decls.iter().map(|d| d.name.clone()).collect()
    }

    #[test]
    fn test_single_command_with_handler() {
        let unit = parse(
            r#"
            namespace N {
                class Foo : ICommand {}
                class FooHandler : ICommandHandler<Foo> { void Handles(Foo c) {} }
            }
            "#,
        );
        let mut walker = SyntaxWalker::default();
        walker.visit(&unit);

        assert_eq!(names(walker.commands()), vec!["Foo"]);
        assert_eq!(names(&walker.command_handlers()), vec!["FooHandler"]);
        let text: String = render(&walker.dump_command_data().collect::<Vec<_>>());
        assert_eq!(text, format!("Foo? -> FooHandler{}", NL));
    }

    #[test]
    fn test_command_handler_matches_by_containment() {
        let unit = parse(
            r#"
            namespace N {
                class Foo : ICommand {}
                class H : ICommandHandler<FooBar> {}
            }
            "#,
        );
        let mut walker = SyntaxWalker::default();
        walker.visit(&unit);

        let text = render(&walker.dump_command_data().collect::<Vec<_>>());
        assert_eq!(text, format!("Foo? -> H{}", NL));
    }

    #[test]
    fn test_orphan_command_has_empty_handler_slot() {
        let unit = parse("namespace N { class Foo : ICommand {} }");
        let mut walker = SyntaxWalker::default();
        walker.visit(&unit);

        let tokens: Vec<MilToken> = walker.dump_command_data().collect();
        assert_eq!(tokens.len(), 4);
        assert_eq!(render(&tokens), format!("Foo? -> {}", NL));
    }

    #[test]
    fn test_multiple_event_handlers() {
        let unit = parse(
            r#"
            namespace N {
                class Bar : IEvent {}
                class H1 : IEventHandler<Bar> {}
                class H2 : IEventHandler<Bar>, IEventHandler<Baz> {}
            }
            "#,
        );
        let mut walker = SyntaxWalker::default();
        walker.visit(&unit);

        assert_eq!(names(walker.handlers_for_event("Bar")), vec!["H1", "H2"]);
        assert_eq!(names(walker.handlers_for_event("Baz")), vec!["H2"]);
        assert_eq!(names(&walker.event_handlers()), vec!["H1", "H2"]);

        let text = render(&walker.dump_event_data().collect::<Vec<_>>());
        assert_eq!(
            text,
            format!("Bar! -> {nl}\t -> H1{nl}\t -> H2{nl}{nl}", nl = NL)
        );
    }

    #[test]
    fn test_event_without_handlers_has_no_trailing_blank_line() {
        let unit = parse("namespace N { class Bar : IEvent {} }");
        let mut walker = SyntaxWalker::default();
        walker.visit(&unit);
        assert_eq!(render(&walker.dump_event_data().collect::<Vec<_>>()), format!("Bar! -> {}", NL));
    }

    #[test]
    fn test_visit_is_idempotent() {
        let unit = parse(
            r#"
            namespace N {
                class Foo : ICommand {}
                class Bar : IEvent {}
                class FooHandler : ICommandHandler<Foo> {}
                class BarHandler : IEventHandler<Bar> { void Go() { bus.Send(new Foo()); } }
            }
            "#,
        );
        let mut walker = SyntaxWalker::default();
        walker.visit(&unit);
        walker.visit(&unit);

        assert_eq!(walker.commands().len(), 1);
        assert_eq!(walker.events().len(), 1);
        assert_eq!(walker.command_handler_index().len(), 1);
        assert_eq!(walker.handlers_for_event("Bar").len(), 1);
        assert_eq!(walker.publications().len(), 1);
    }

    #[test]
    fn test_identity_not_name_deduplicates() {
        let unit = parse(
            r#"
            namespace A { class Foo : ICommand {} }
            namespace B { class Foo : ICommand {} }
            "#,
        );
        let mut walker = SyntaxWalker::default();
        walker.visit(&unit);
        assert_eq!(walker.commands().len(), 2);
    }

    #[test]
    fn test_declaration_without_bases_is_ignored() {
        let unit = parse("namespace N { class Plain { void M() {} } }");
        let mut walker = SyntaxWalker::default();
        walker.visit(&unit);

        assert!(walker.commands().is_empty());
        assert!(walker.events().is_empty());
        assert!(walker.aggregate_roots().is_empty());
        assert!(walker.command_handler_index().is_empty());
        assert!(walker.event_handler_index().is_empty());
    }

    #[test]
    fn test_handler_records_each_handled_command() {
        let unit = parse(
            "namespace N { class Multi : ICommandHandler<A>, ICommandHandler<B>, ICommandHandler<C> {} }",
        );
        let mut walker = SyntaxWalker::default();
        walker.visit(&unit);

        let (handler, handled) = &walker.command_handler_index()[0];
        assert_eq!(handler.name, "Multi");
        assert_eq!(handled.len(), 3);
    }

    #[test]
    fn test_aggregate_roots_and_nested_types() {
        let unit = parse(
            r#"
            namespace N {
                public class SeatsAvailability : EventSourced {
                    public class Reserved : IEvent {}
                }
                public abstract class Base : EventSourced {}
            }
            "#,
        );
        let mut walker = SyntaxWalker::default();
        walker.visit(&unit);

        assert_eq!(names(walker.aggregate_roots()), vec!["SeatsAvailability"]);
        assert_eq!(names(walker.events()), vec!["Reserved"]);
        assert_eq!(
            render(&walker.dump_aggregate_roots().collect::<Vec<_>>()),
            format!("@SeatsAvailability{}", NL)
        );
    }

    #[test]
    fn test_publication_sites_record_outermost_invocation() {
        let unit = parse(
            r#"
            namespace Foo.Web {
                class Site {
                    void Register(Foo cmd) {
                        bus.Send(cmd).Wait();
                        var send = bus.Send;
                    }
                    abstract void Nothing();
                }
            }
            "#,
        );
        let mut walker = SyntaxWalker::default();
        walker.visit(&unit);

        assert_eq!(walker.publication_calls().len(), 2);
        assert_eq!(walker.publications().len(), 1);

        let site = &walker.publications()[0];
        assert_eq!(site.method.name, "Register");
        assert!(matches!(site.invocation, Expr::Invocation { callee, .. } if callee.member_name() == Some("Wait")));
        assert!(matches!(site.call, Expr::Invocation { callee, .. } if callee.member_name() == Some("Send")));
        assert!(site.invocation.span().contains(site.call.span()));

        let lines: Vec<String> = walker.dump_publication_data().collect();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("Foo.Web.Site.Register:["), "{}", lines[0]);
        assert!(lines[0].ends_with(')'));
    }

    #[test]
    fn test_null_conditional_send_is_recorded() {
        let unit = parse("namespace N { class Site { void Go() { bus?.Send(new Foo()); } } }");
        let mut walker = SyntaxWalker::default();
        walker.visit(&unit);

        assert_eq!(walker.publication_calls().len(), 1);
        assert_eq!(walker.publications().len(), 1);
        let site = &walker.publications()[0];
        assert!(matches!(site.call, Expr::Invocation { arguments, .. } if arguments.len() == 1));
    }

    #[test]
    fn test_no_publications_yields_nothing() {
        let unit = parse("namespace N { class A { void M() { Console.WriteLine(1); } } }");
        let mut walker = SyntaxWalker::default();
        walker.visit(&unit);
        assert_eq!(walker.dump_publication_data().count(), 0);
    }

    #[test]
    fn test_custom_publish_keyword() {
        let unit = parse("namespace N { class A { void M() { bus.Publish(x); bus.Send(y); } } }");
        let conventions = MessagingConventions {
            publish_keyword: "Publish".to_string(),
            ..MessagingConventions::default()
        };
        let mut walker = SyntaxWalker::new(conventions);
        walker.visit(&unit);
        assert_eq!(walker.publications().len(), 1);
        assert_eq!(walker.publications()[0].member_access.member_name(), Some("Publish"));
    }

    #[test]
    fn test_duplicate_command_handlers() {
        let unit = parse(
            r#"
            namespace N {
                class Foo : ICommand {}
                class H1 : ICommandHandler<Foo> {}
                class H2 : ICommandHandler<Foo> {}
                class H3 : ICommandHandler<Bar> {}
            }
            "#,
        );
        let mut walker = SyntaxWalker::default();
        walker.visit(&unit);

        let duplicates = walker.duplicate_command_handlers();
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].command, "Foo");
        assert_eq!(names(&duplicates[0].handlers), vec!["H1", "H2"]);
    }

    #[test]
    fn test_multi_role_declarations_are_flagged() {
        let unit = parse("namespace N { class Odd : ICommand, IEvent {} }");
        let mut walker = SyntaxWalker::default();
        walker.visit(&unit);

        assert_eq!(walker.commands().len(), 1);
        assert_eq!(walker.events().len(), 1);
        let (decl, roles) = &walker.multi_role_declarations()[0];
        assert_eq!(decl.name, "Odd");
        assert_eq!(roles, &vec![Role::Command, Role::Event]);
    }
}
