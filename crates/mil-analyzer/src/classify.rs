//! Role classification of type declarations by their base lists.
//!
//! Classification is purely syntactic: a base type matches a marker when
//! its plain name (right-most identifier, no generic suffix) equals the
//! marker name. Aggregate roots are the exception and match on substring.

use std::fmt;

use crate::config::MessagingConventions;
use crate::syntax::{TypeDecl, TypeRef};

/// A messaging role a declaration can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    AggregateRoot,
    Command,
    CommandHandler,
    Event,
    EventHandler,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::AggregateRoot => "aggregate root",
            Role::Command => "command",
            Role::CommandHandler => "command handler",
            Role::Event => "event",
            Role::EventHandler => "event handler",
        };
        f.write_str(name)
    }
}

/// Type-argument lists of every generic base whose plain name is `marker`.
///
/// Non-generic bases are ignored. A declaration without bases yields nothing.
pub fn classify_bases<'a>(decl: &'a TypeDecl, marker: &'a str) -> impl Iterator<Item = &'a [TypeRef]> + 'a {
    decl.bases
        .iter()
        .filter(move |base| base.is_generic() && base.plain_name() == marker)
        .map(TypeRef::type_arguments)
}

/// True if a non-generic base's plain name is `marker`.
pub fn has_simple_base(decl: &TypeDecl, marker: &str) -> bool {
    decl.bases
        .iter()
        .any(|base| !base.is_generic() && base.plain_name() == marker)
}

/// Non-abstract declarations with a base whose plain name contains `marker`.
pub fn is_aggregate_root(decl: &TypeDecl, marker: &str) -> bool {
    !decl.is_abstract() && decl.bases.iter().any(|base| base.plain_name().contains(marker))
}

/// Matches a role; yields the handled type arguments for handler roles and
/// an empty list for the others.
type RoleRule = for<'a> fn(&MessagingConventions, &'a TypeDecl) -> Option<Vec<&'a TypeRef>>;

fn aggregate_root_rule<'a>(c: &MessagingConventions, decl: &'a TypeDecl) -> Option<Vec<&'a TypeRef>> {
    is_aggregate_root(decl, &c.aggregate_root_marker).then(Vec::new)
}

fn command_rule<'a>(c: &MessagingConventions, decl: &'a TypeDecl) -> Option<Vec<&'a TypeRef>> {
    has_simple_base(decl, &c.command_marker).then(Vec::new)
}

fn command_handler_rule<'a>(c: &MessagingConventions, decl: &'a TypeDecl) -> Option<Vec<&'a TypeRef>> {
    handled_types(decl, &c.command_handler_marker)
}

fn event_rule<'a>(c: &MessagingConventions, decl: &'a TypeDecl) -> Option<Vec<&'a TypeRef>> {
    has_simple_base(decl, &c.event_marker).then(Vec::new)
}

fn event_handler_rule<'a>(c: &MessagingConventions, decl: &'a TypeDecl) -> Option<Vec<&'a TypeRef>> {
    handled_types(decl, &c.event_handler_marker)
}

fn handled_types<'a>(decl: &'a TypeDecl, marker: &str) -> Option<Vec<&'a TypeRef>> {
    let mut matched = false;
    let mut handled = Vec::new();
    for base in &decl.bases {
        if base.is_generic() && base.plain_name() == marker {
            matched = true;
            handled.extend(base.type_arguments());
        }
    }
    matched.then_some(handled)
}

/// Applied in order to every class-like declaration; all rules run.
const ROLE_RULES: &[(Role, RoleRule)] = &[
    (Role::AggregateRoot, aggregate_root_rule),
    (Role::Command, command_rule),
    (Role::CommandHandler, command_handler_rule),
    (Role::Event, event_rule),
    (Role::EventHandler, event_handler_rule),
];

/// The roles one declaration matched, in rule order.
#[derive(Debug, Clone, Default)]
pub struct Classification<'a> {
    pub matches: Vec<(Role, Vec<&'a TypeRef>)>,
}

impl<'a> Classification<'a> {
    pub fn has(&self, role: Role) -> bool {
        self.matches.iter().any(|(r, _)| *r == role)
    }

    /// Handled type arguments recorded for a handler role.
    pub fn handled(&self, role: Role) -> &[&'a TypeRef] {
        self.matches
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, handled)| handled.as_slice())
            .unwrap_or(&[])
    }

    pub fn roles(&self) -> Vec<Role> {
        self.matches.iter().map(|(role, _)| *role).collect()
    }

    pub fn is_multi_role(&self) -> bool {
        self.matches.len() > 1
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Classifies declarations against a set of messaging conventions.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    conventions: MessagingConventions,
}

impl Classifier {
    pub fn new(conventions: MessagingConventions) -> Self {
        Self { conventions }
    }

    pub fn conventions(&self) -> &MessagingConventions {
        &self.conventions
    }

    /// Runs every role rule against `decl`. Interfaces and enums are never
    /// classified.
    pub fn classify<'a>(&self, decl: &'a TypeDecl) -> Classification<'a> {
        if !decl.kind.is_class_like() || decl.bases.is_empty() {
            return Classification::default();
        }
        let matches = ROLE_RULES
            .iter()
            .filter_map(|(role, rule)| rule(&self.conventions, decl).map(|handled| (*role, handled)))
            .collect();
        Classification { matches }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Span;
    use crate::syntax::TypeKind;

    fn simple(name: &str) -> TypeRef {
        TypeRef::simple(name, Span::default())
    }

    fn generic(name: &str, args: &[&str]) -> TypeRef {
        TypeRef::Generic {
            name: name.to_string(),
            args: args.iter().map(|a| simple(a)).collect(),
            span: Span::default(),
        }
    }

    fn decl(name: &str, bases: Vec<TypeRef>) -> TypeDecl {
        TypeDecl {
            name: name.to_string(),
            kind: TypeKind::Class,
            modifiers: Vec::new(),
            type_parameters: Vec::new(),
            bases,
            members: Vec::new(),
            enum_members: Vec::new(),
            span: Span::default(),
        }
    }

    #[test]
    fn test_no_base_list_classifies_as_nothing() {
        let plain = decl("Plain", Vec::new());
        let classification = Classifier::default().classify(&plain);
        assert!(classification.is_empty());
        assert_eq!(classify_bases(&plain, "ICommandHandler").count(), 0);
    }

    #[test]
    fn test_command_requires_non_generic_base() {
        let classifier = Classifier::default();
        assert!(classifier.classify(&decl("Foo", vec![simple("ICommand")])).has(Role::Command));
        assert!(!classifier
            .classify(&decl("Foo", vec![generic("ICommand", &["X"])]))
            .has(Role::Command));
    }

    #[test]
    fn test_handler_records_every_matching_generic_base() {
        let handler = decl(
            "Handler",
            vec![
                simple("Base"),
                generic("ICommandHandler", &["A"]),
                generic("IOther", &["Z"]),
                generic("ICommandHandler", &["B"]),
            ],
        );
        let classification = Classifier::default().classify(&handler);
        let handled: Vec<&str> = classification
            .handled(Role::CommandHandler)
            .iter()
            .map(|t| t.plain_name())
            .collect();
        assert_eq!(handled, vec!["A", "B"]);
        assert_eq!(classify_bases(&handler, "ICommandHandler").count(), 2);
    }

    #[test]
    fn test_aggregate_root_matches_substring_and_skips_abstract() {
        let mut root = decl("SeatsAvailability", vec![generic("EventSourcedAggregate", &["Guid"])]);
        assert!(Classifier::default().classify(&root).has(Role::AggregateRoot));

        root.modifiers.push("abstract".to_string());
        assert!(!Classifier::default().classify(&root).has(Role::AggregateRoot));
    }

    #[test]
    fn test_all_roles_are_checked() {
        let both = decl(
            "Odd",
            vec![simple("ICommand"), simple("IEvent"), generic("IEventHandler", &["Odd"])],
        );
        let classification = Classifier::default().classify(&both);
        assert_eq!(
            classification.roles(),
            vec![Role::Command, Role::Event, Role::EventHandler]
        );
        assert!(classification.is_multi_role());
    }

    #[test]
    fn test_interfaces_are_not_classified() {
        let mut iface = decl("IFoo", vec![simple("ICommand")]);
        iface.kind = TypeKind::Interface;
        assert!(Classifier::default().classify(&iface).is_empty());
    }

    #[test]
    fn test_custom_conventions() {
        let conventions = MessagingConventions {
            command_marker: "IMessage".to_string(),
            ..MessagingConventions::default()
        };
        let classifier = Classifier::new(conventions);
        assert!(classifier.classify(&decl("Foo", vec![simple("IMessage")])).has(Role::Command));
        assert_eq!(classifier.conventions().command_marker, "IMessage");
    }
}
