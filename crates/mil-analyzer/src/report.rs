//! Per-assembly MIL report.
//!
//! A report is a list of titled sections, each holding already rendered MIL
//! text, plus free-form warnings.

use serde::Serialize;

use crate::mil::{render, MilToken, LINE_TERMINATOR};

pub const AGGREGATE_ROOTS: &str = "Aggregate Roots";
pub const COMMANDS: &str = "Commands";
pub const EVENTS: &str = "Events";
pub const MESSAGE_PUBLICATIONS: &str = "Message Publications";
pub const PUBLICATION_SITES: &str = "Publication Sites";
pub const PROCESSES: &str = "Processes";
pub const WARNINGS: &str = "Warnings";

/// Line printed in place of an empty section.
pub const NONE_MARKER: &str = "-- none --";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSection {
    pub title: String,
    pub body: String,
}

impl ReportSection {
    pub fn from_tokens(title: &str, tokens: impl IntoIterator<Item = MilToken>) -> Self {
        let tokens: Vec<MilToken> = tokens.into_iter().collect();
        Self {
            title: title.to_string(),
            body: render(&tokens),
        }
    }

    /// One line per item.
    pub fn from_lines(title: &str, lines: impl IntoIterator<Item = String>) -> Self {
        let body = lines
            .into_iter()
            .map(|line| format!("{}{}", line, LINE_TERMINATOR))
            .collect();
        Self {
            title: title.to_string(),
            body,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// MIL output for one assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MilReport {
    pub assembly: String,
    pub sections: Vec<ReportSection>,
    pub warnings: Vec<String>,
}

impl MilReport {
    pub fn new(assembly: &str) -> Self {
        Self {
            assembly: assembly.to_string(),
            sections: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn push_section(&mut self, section: ReportSection) {
        self.sections.push(section);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn section(&self, title: &str) -> Option<&ReportSection> {
        self.sections.iter().find(|s| s.title == title)
    }

    /// Renders every section under a `== Title ==` header.
    pub fn render(&self) -> String {
        let nl = LINE_TERMINATOR;
        let mut out = format!("# {}{}{}", self.assembly, nl, nl);

        for section in &self.sections {
            out.push_str(&format!("== {} =={}", section.title, nl));
            if section.is_empty() {
                out.push_str(NONE_MARKER);
                out.push_str(nl);
            } else {
                out.push_str(&section.body);
            }
            out.push_str(nl);
        }

        if !self.warnings.is_empty() {
            out.push_str(&format!("== {} =={}", WARNINGS, nl));
            for warning in &self.warnings {
                out.push_str(warning);
                out.push_str(nl);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mil::factory;

    const NL: &str = LINE_TERMINATOR;

    #[test]
    fn test_empty_sections_render_none_marker() {
        let mut report = MilReport::new("Conference.dll");
        report.push_section(ReportSection::from_tokens(AGGREGATE_ROOTS, Vec::new()));
        report.push_section(ReportSection::from_lines(PUBLICATION_SITES, Vec::new()));

        assert_eq!(
            report.render(),
            format!(
                "# Conference.dll{nl}{nl}== Aggregate Roots =={nl}-- none --{nl}{nl}== Publication Sites =={nl}-- none --{nl}{nl}",
                nl = NL
            )
        );
    }

    #[test]
    fn test_token_section_renders_tokens() {
        let mut report = MilReport::new("App");
        report.push_section(ReportSection::from_tokens(
            COMMANDS,
            [
                factory::command("Foo"),
                factory::publish(),
                factory::command_handler("FooHandler"),
                factory::statement_terminator(),
            ],
        ));

        let text = report.render();
        assert!(text.contains(&format!("== Commands =={nl}Foo? -> FooHandler{nl}", nl = NL)));
        assert!(!text.contains(WARNINGS));
        assert_eq!(report.section(COMMANDS).unwrap().body, format!("Foo? -> FooHandler{}", NL));
        assert!(report.section(EVENTS).is_none());
    }

    #[test]
    fn test_warnings_are_listed_last() {
        let mut report = MilReport::new("App");
        report.push_section(ReportSection::from_lines(PUBLICATION_SITES, vec!["N.A.M:[1..5)".to_string()]));
        report.warn("command Foo is handled by H1, H2");

        let text = report.render();
        assert!(text.ends_with(&format!("== Warnings =={nl}command Foo is handled by H1, H2{nl}", nl = NL)));
        assert!(text.contains(&format!("N.A.M:[1..5){}", NL)));
    }

    #[test]
    fn test_report_serializes_to_json() {
        let mut report = MilReport::new("App");
        report.warn("w");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["assembly"], "App");
        assert_eq!(json["warnings"][0], "w");
    }
}
