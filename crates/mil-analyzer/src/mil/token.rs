//! Token kinds and tokens of the Messaging Intermediate Language.

use std::fmt;

/// Platform line terminator used to end MIL statements.
pub const LINE_TERMINATOR: &str = if cfg!(windows) { "\r\n" } else { "\n" };

/// Semantic category of a token kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MilTokenType {
    Indeterminate,
    Command,
    CommandHandler,
    Event,
    EventHandler,
    AggregateRoot,
    StateObject,
    Publisher,
    Scope,
    Delay,
    LanguageElement,
    ScopeContinuation,
    Association,
}

/// A token kind: category, marker text and a two-slot format template.
///
/// In the template `{0}` is replaced by the member name and `{1}` by the
/// marker.
#[derive(Debug, PartialEq, Eq)]
pub struct TokenKind {
    pub name: &'static str,
    pub token_type: MilTokenType,
    pub marker: &'static str,
    pub format: &'static str,
}

impl TokenKind {
    const fn new(
        name: &'static str,
        token_type: MilTokenType,
        marker: &'static str,
        format: &'static str,
    ) -> Self {
        Self {
            name,
            token_type,
            marker,
            format,
        }
    }

    /// Renders `member` through this kind's template.
    pub fn render(&self, member: &str) -> String {
        let mut out = String::with_capacity(self.format.len() + member.len() + self.marker.len());
        let mut rest = self.format;
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];
            if let Some(after) = tail.strip_prefix("{0}") {
                out.push_str(member);
                rest = after;
            } else if let Some(after) = tail.strip_prefix("{1}") {
                out.push_str(self.marker);
                rest = after;
            } else {
                out.push('{');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        out
    }
}

pub static COMMAND: TokenKind = TokenKind::new("Command", MilTokenType::Command, "?", "{0}{1}");
pub static EVENT: TokenKind = TokenKind::new("Event", MilTokenType::Event, "!", "{0}{1}");
pub static PUBLISH: TokenKind = TokenKind::new("Publish", MilTokenType::Publisher, " -> ", "{0}{1}");
pub static RECEIVE: TokenKind = TokenKind::new("Receive", MilTokenType::Publisher, " -> ", "{1}{0}");
pub static STATEMENT_TERMINATOR: TokenKind = TokenKind::new(
    "EndOfStatement",
    MilTokenType::LanguageElement,
    LINE_TERMINATOR,
    "{0}{1}",
);
pub static COMMAND_HANDLER: TokenKind =
    TokenKind::new("CommandHandler", MilTokenType::CommandHandler, "", "{1}{0}{1}");
pub static AGGREGATE_ROOT: TokenKind =
    TokenKind::new("AggregateRoot", MilTokenType::AggregateRoot, "@", "{1}{0}");
pub static ORIGIN_ASSOCIATION: TokenKind =
    TokenKind::new("OriginAssociation", MilTokenType::Association, ":", "{0}{1}");
pub static DESTINATION_ASSOCIATION: TokenKind =
    TokenKind::new("DestinationAssociation", MilTokenType::Association, ":", "{1}{0}");
pub static EVENT_HANDLER: TokenKind =
    TokenKind::new("EventHandler", MilTokenType::EventHandler, "", "{1}{0}{1}");
pub static STATE_CHANGE: TokenKind =
    TokenKind::new("StateChange", MilTokenType::StateObject, "*", "{1}{0}");
pub static DELAY: TokenKind = TokenKind::new("Delay", MilTokenType::Delay, " [Delay] ", "{0}{1}");
pub static STATE_DEFINITION: TokenKind =
    TokenKind::new("StateDefinition", MilTokenType::StateObject, "%", "{1}{0}");
pub static EMPTY: TokenKind = TokenKind::new("Empty", MilTokenType::Indeterminate, "", "{0}{1}");
pub static INDENTATION: TokenKind = TokenKind::new("Indentation", MilTokenType::Scope, "\t", "{1}{0}");

/// Every token kind, in registry order.
pub static ALL_TOKEN_KINDS: [&TokenKind; 15] = [
    &COMMAND,
    &EVENT,
    &PUBLISH,
    &RECEIVE,
    &STATEMENT_TERMINATOR,
    &COMMAND_HANDLER,
    &AGGREGATE_ROOT,
    &ORIGIN_ASSOCIATION,
    &DESTINATION_ASSOCIATION,
    &EVENT_HANDLER,
    &STATE_CHANGE,
    &DELAY,
    &STATE_DEFINITION,
    &EMPTY,
    &INDENTATION,
];

/// A token: a registered kind plus the member name it renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MilToken {
    pub kind: &'static TokenKind,
    pub member_name: String,
}

impl MilToken {
    pub fn new(kind: &'static TokenKind, member_name: impl Into<String>) -> Self {
        Self {
            kind,
            member_name: member_name.into(),
        }
    }

    /// True if this token is of exactly the given registered kind.
    pub fn is(&self, kind: &TokenKind) -> bool {
        std::ptr::eq(self.kind, kind)
    }

    pub fn token_type(&self) -> MilTokenType {
        self.kind.token_type
    }
}

impl fmt::Display for MilToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kind.render(&self.member_name))
    }
}

/// Concatenates the rendered text of a token sequence.
pub fn render<'t>(tokens: impl IntoIterator<Item = &'t MilToken>) -> String {
    tokens.into_iter().map(MilToken::to_string).collect()
}
