//! Diagnostics
//!
//! This module turns parse failures, compile errors and grammar warnings
//! into tree-structured diagnostics that can be rendered against their
//! source text.
//!
//! # Example Output
//!
//! ```text
//! error at line 2, column 9:
//! digit = [0-9
//!         ^
//! `- syntax error in grammar source
//!    `- expected one of "]", "\\"
//! ```

use super::ast::ParseFailure;
use super::grammar_analysis::GrammarWarning;
use super::source_location::{SourcePosition, SourceSpan};
use std::fmt;

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Just a note
    Note,
    /// Warning
    Warning,
    /// Error
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Note => write!(f, "note"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A tree-structured diagnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// The message
    pub message: String,
    /// Where it applies; `None` for diagnostics without a source location
    pub span: Option<SourceSpan>,
    /// What was being processed (e.g. a rule name)
    pub context: Option<String>,
    /// Nested notes (causes, expectations)
    pub children: Vec<Diagnostic>,
    /// Severity
    pub severity: Severity,
}

impl Diagnostic {
    /// Create an error diagnostic without a location
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span: None,
            context: None,
            children: Vec::new(),
            severity: Severity::Error,
        }
    }

    /// Create a warning diagnostic without a location
    pub fn warning(message: impl Into<String>) -> Self {
        Self::error(message).with_severity(Severity::Warning)
    }

    /// Create a note
    pub fn note(message: impl Into<String>) -> Self {
        Self::error(message).with_severity(Severity::Note)
    }

    /// Attach a location
    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = Some(span);
        self
    }

    /// Attach a single-position location
    pub fn at(self, position: SourcePosition) -> Self {
        self.with_span(SourceSpan::new(position, position))
    }

    /// Add context
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Add a child diagnostic
    pub fn with_child(mut self, child: Diagnostic) -> Self {
        self.children.push(child);
        self
    }

    /// Set severity
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Diagnostic for a failed parse
    pub fn from_failure(failure: &ParseFailure, message: impl Into<String>) -> Self {
        let mut diagnostic = Self::error(message).at(failure.source_position());
        match failure.expected.as_slice() {
            [] => {}
            [only] => diagnostic = diagnostic.with_child(Self::note(format!("expected {}", only))),
            many => {
                diagnostic = diagnostic.with_child(Self::note(format!(
                    "expected one of {}",
                    many.join(", ")
                )))
            }
        }
        diagnostic
    }

    /// Diagnostic for a grammar warning
    pub fn from_warning(warning: &GrammarWarning) -> Self {
        let mut diagnostic = Self::warning(format!("{}: {}", warning.kind, warning.message))
            .with_context(format!("rule {}", warning.rule));
        if !warning.related.is_empty() {
            diagnostic = diagnostic.with_child(Self::note(warning.related.join(" -> ")));
        }
        diagnostic
    }

    /// The location of the deepest located diagnostic in the tree
    pub fn deepest_position(&self) -> Option<SourcePosition> {
        self.children
            .iter()
            .filter_map(Diagnostic::deepest_position)
            .chain(self.span.map(|span| span.start))
            .max_by_key(|position| position.offset)
    }

    /// Format as ASCII tree
    pub fn ascii_tree(&self) -> String {
        let mut output = String::new();
        self.ascii_tree_impl(&mut output, "", true);
        output
    }

    fn ascii_tree_impl(&self, output: &mut String, prefix: &str, last: bool) {
        let connector = if last { "`- " } else { "|- " };
        let child_prefix = if last { "   " } else { "|  " };

        output.push_str(prefix);
        output.push_str(connector);
        output.push_str(&self.message);

        if let Some(ref ctx) = self.context {
            output.push_str(&format!(" (in {})", ctx));
        }

        output.push('\n');

        for (i, child) in self.children.iter().enumerate() {
            let is_last = i == self.children.len() - 1;
            child.ascii_tree_impl(output, &format!("{}{}", prefix, child_prefix), is_last);
        }
    }

    /// Format with source code context
    pub fn format_with_source(&self, source: &str) -> String {
        let mut output = String::new();

        match self.deepest_position() {
            Some(position) => {
                output.push_str(&format!("{} at {}:\n", self.severity, position));
                output.push_str(&position.excerpt(source));
                output.push('\n');
            }
            None => output.push_str(&format!("{}:\n", self.severity)),
        }

        output.push_str(&self.ascii_tree());
        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.span {
            Some(span) => write!(f, "{} at {}: {}", self.severity, span.start, self.message),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

impl std::error::Error for Diagnostic {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::grammar_analysis::WarningKind;

    #[test]
    fn test_ascii_tree() {
        let diagnostic = Diagnostic::error("failed to parse expression")
            .with_context("expression")
            .with_child(Diagnostic::note("expected \"+\""))
            .with_child(Diagnostic::note("expected \"-\""));

        let tree = diagnostic.ascii_tree();
        assert!(tree.starts_with("`- failed to parse expression (in expression)\n"));
        assert!(tree.contains("   |- expected \"+\""));
        assert!(tree.contains("   `- expected \"-\""));
    }

    #[test]
    fn test_deepest_position() {
        let input = "aaa\nbbb\nccc";
        let parent = Diagnostic::error("parent")
            .at(SourcePosition::from_offset(input, 1))
            .with_child(Diagnostic::note("a").at(SourcePosition::from_offset(input, 9)))
            .with_child(Diagnostic::note("b").at(SourcePosition::from_offset(input, 5)));

        let deepest = parent.deepest_position().unwrap();
        assert_eq!(deepest.offset, 9);
        assert_eq!(deepest.line, 3);
    }

    #[test]
    fn test_format_with_source() {
        let source = "hello world\nthis is a test\nmore text";
        let failure = ParseFailure::new(source, 16, vec!["\"x\"".into(), "\"y\"".into()]);
        let diagnostic = Diagnostic::from_failure(&failure, "unexpected input");

        let formatted = diagnostic.format_with_source(source);
        assert!(formatted.starts_with("error at line 2, column 5:\n"));
        assert!(formatted.contains("this is a test\n    ^"));
        assert!(formatted.contains("expected one of \"x\", \"y\""));
    }

    #[test]
    fn test_from_warning() {
        let warning = GrammarWarning::new(WarningKind::LeftRecursion, "expr", "loops")
            .with_related(vec!["expr".into(), "expr".into()]);
        let diagnostic = Diagnostic::from_warning(&warning);
        assert_eq!(diagnostic.severity, Severity::Warning);
        assert_eq!(diagnostic.to_string(), "warning: left recursion: loops");
        assert!(diagnostic.ascii_tree().contains("expr -> expr"));
    }
}
