//! Developer Experience Tools
//!
//! This module provides debugging, tracing, and visualization tools for
//! developing and debugging grammars.
//!
//! # Features
//! - Parse tracing (rule-by-rule execution)
//! - Syntax tree visualization (pretty printing)
//! - Grammar visualization (Mermaid/DOT diagrams of rule references)
//! - Source excerpts with position markers

use super::ast::{NodeKind, SyntaxNode, SyntaxTree};
use super::grammar::{Grammar, RuleId};
use std::fmt::Write;

/// Syntax tree pretty printer
pub struct TreePrinter {
    /// Indentation string
    indent: String,
    /// Maximum depth to print
    max_depth: Option<usize>,
    /// Whether to print sequence, repetition and optional nodes
    show_structure: bool,
}

impl TreePrinter {
    /// Create a new tree printer
    pub fn new() -> Self {
        Self {
            indent: "  ".to_string(),
            max_depth: None,
            show_structure: false,
        }
    }

    /// Set the indentation string
    pub fn indent(mut self, indent: &str) -> Self {
        self.indent = indent.to_string();
        self
    }

    /// Set the maximum depth to print
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Also print the anonymous structural nodes
    ///
    /// By default only rule, label and terminal nodes are shown.
    pub fn show_structure(mut self, show: bool) -> Self {
        self.show_structure = show;
        self
    }

    /// Print a whole tree
    pub fn print(&self, tree: &SyntaxTree<'_>) -> String {
        self.print_node(tree.root())
    }

    /// Print the subtree below `node`
    pub fn print_node(&self, node: SyntaxNode<'_>) -> String {
        let mut output = String::new();
        self.write_node(node, 0, &mut output);
        output
    }

    fn write_node(&self, node: SyntaxNode<'_>, depth: usize, output: &mut String) {
        let shown = self.show_structure
            || matches!(
                node.kind(),
                NodeKind::Rule(_) | NodeKind::Label(_) | NodeKind::Terminal
            );
        if !shown {
            for child in node.children() {
                self.write_node(child, depth, output);
            }
            return;
        }

        let indent = self.indent.repeat(depth);
        if let Some(max) = self.max_depth {
            if depth > max {
                let _ = writeln!(output, "{}...", indent);
                return;
            }
        }

        let head = match node.kind() {
            NodeKind::Rule(_) => node.rule_name().unwrap_or("?").to_string(),
            NodeKind::Label(_) => format!("{}:", node.label().unwrap_or("?")),
            NodeKind::Terminal => format!("{:?}", node.text()),
            NodeKind::Sequence => "sequence".to_string(),
            NodeKind::Repetition => "repetition".to_string(),
            NodeKind::Optional => "optional".to_string(),
            NodeKind::Predicate => "predicate".to_string(),
        };
        let _ = writeln!(output, "{}{} @ {}..{}", indent, head, node.start(), node.end());

        for child in node.children() {
            self.write_node(child, depth + 1, output);
        }
    }
}

impl Default for TreePrinter {
    fn default() -> Self {
        Self::new()
    }
}

/// Grammar visualizer
///
/// Draws one node per rule and one edge per rule reference.
pub struct GrammarVisualizer<'a> {
    grammar: &'a Grammar,
}

impl<'a> GrammarVisualizer<'a> {
    /// Create a new grammar visualizer
    pub fn new(grammar: &'a Grammar) -> Self {
        Self { grammar }
    }

    /// Generate a Mermaid diagram
    pub fn to_mermaid(&self) -> String {
        let mut output = String::new();
        output.push_str("graph TD\n");

        for (i, rule) in self.grammar.rules().enumerate() {
            let _ = writeln!(output, "  r{}[\"{}\"]", i, rule.name);
        }
        for (i, target) in self.edges() {
            let _ = writeln!(output, "  r{} --> r{}", i, target);
        }
        if let Some(root) = self.grammar.root() {
            let _ = writeln!(output, "  root((root)) --> r{}", root.index());
        }

        output
    }

    /// Generate a GraphViz DOT diagram
    pub fn to_dot(&self) -> String {
        let mut output = String::new();
        output.push_str("digraph Grammar {\n");
        output.push_str("  rankdir=TB;\n");
        output.push_str("  node [shape=box];\n");

        for (i, rule) in self.grammar.rules().enumerate() {
            let style = if rule.is_defined() { "" } else { ", style=dashed" };
            let _ = writeln!(output, "  r{} [label=\"{}\"{}]", i, rule.name, style);
        }
        for (i, target) in self.edges() {
            let _ = writeln!(output, "  r{} -> r{}", i, target);
        }
        if let Some(root) = self.grammar.root() {
            let _ = writeln!(
                output,
                "  r{} [style=filled, fillcolor=lightblue]",
                root.index()
            );
        }

        output.push_str("}\n");
        output
    }

    /// (rule index, referenced rule index) pairs, each edge once
    fn edges(&self) -> Vec<(usize, usize)> {
        let mut edges = Vec::new();
        for (i, rule) in self.grammar.rules().enumerate() {
            let Some(expression) = rule.expression.as_ref() else {
                continue;
            };
            for name in expression.referenced_rules() {
                if let Some(target) = self.grammar.rule_id(name) {
                    let edge = (i, target.index());
                    if !edges.contains(&edge) {
                        edges.push(edge);
                    }
                }
            }
        }
        edges
    }
}

/// Debug trace for parsing
#[derive(Debug, Clone)]
pub struct ParseTrace {
    /// Trace entries
    pub entries: Vec<TraceEntry>,
}

/// A single trace entry
#[derive(Debug, Clone)]
pub struct TraceEntry {
    /// Position in input
    pub position: usize,
    /// Rule being invoked
    pub rule: RuleId,
    /// What happened
    pub action: TraceAction,
    /// Rule nesting depth
    pub depth: usize,
}

/// Trace action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceAction {
    /// Started matching a rule body
    Enter,
    /// Successfully matched
    Match {
        /// The length of the matched input
        length: usize,
    },
    /// Failed to match
    Fail,
    /// Answered from the memo table
    CacheHit,
}

impl ParseTrace {
    /// Create a new empty trace
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add an entry
    pub fn add(&mut self, entry: TraceEntry) {
        self.entries.push(entry);
    }

    /// Format as a readable string
    pub fn format(&self, grammar: &Grammar) -> String {
        let mut output = String::new();
        for entry in &self.entries {
            let indent = "  ".repeat(entry.depth);
            let name = grammar
                .rule(entry.rule)
                .map(|rule| rule.name.as_str())
                .unwrap_or("unknown");

            let _ = match &entry.action {
                TraceAction::Enter => {
                    writeln!(output, "{}-> {} at {}", indent, name, entry.position)
                }
                TraceAction::Match { length } => {
                    writeln!(output, "{}   {} matched {} bytes", indent, name, length)
                }
                TraceAction::Fail => writeln!(output, "{}   {} failed", indent, name),
                TraceAction::CacheHit => writeln!(
                    output,
                    "{}   {} at {} (memoized)",
                    indent, name, entry.position
                ),
            };
        }
        output
    }
}

impl Default for ParseTrace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::parser::PackratParser;
    use crate::runtime::parser_dsl::*;

    fn greeting() -> Grammar {
        GrammarBuilder::new()
            .rule("greeting", ref_("word").then(str(" ")).then(ref_("word")))
            .rule("word", str("hello").or(str("world")).label("w"))
            .build()
    }

    #[test]
    fn test_tree_printer() {
        let grammar = greeting();
        let tree = grammar.parse("hello world").unwrap();

        let output = TreePrinter::new().print(&tree);
        assert!(output.starts_with("greeting @ 0..11"));
        assert!(output.contains("  word @ 0..5"));
        assert!(output.contains("\"world\""));
        assert!(!output.contains("sequence"));

        let structural = TreePrinter::new().show_structure(true).print(&tree);
        assert!(structural.contains("sequence"));
    }

    #[test]
    fn test_tree_printer_max_depth() {
        let grammar = greeting();
        let tree = grammar.parse("hello world").unwrap();
        let output = TreePrinter::new().max_depth(0).print(&tree);
        assert!(output.contains("..."));
    }

    #[test]
    fn test_grammar_visualizer() {
        let grammar = greeting();
        let viz = GrammarVisualizer::new(&grammar);

        let mermaid = viz.to_mermaid();
        assert!(mermaid.contains("graph TD"));
        assert!(mermaid.contains("r0 --> r1"));
        assert_eq!(mermaid.matches("r0 --> r1").count(), 1);

        let dot = viz.to_dot();
        assert!(dot.contains("digraph"));
        assert!(dot.contains("r0 [style=filled"));
    }

    #[test]
    fn test_parse_trace() {
        let grammar = greeting();
        let mut parser = PackratParser::new(&grammar, "hello world").with_trace();
        parser.parse().unwrap();

        let trace = parser.trace().unwrap();
        assert_eq!(trace.entries[0].action, TraceAction::Enter);
        let formatted = trace.format(&grammar);
        assert!(formatted.contains("-> greeting at 0"));
        assert!(formatted.contains("word matched 5 bytes"));
    }
}
