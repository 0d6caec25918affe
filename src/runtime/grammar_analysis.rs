//! Grammar analysis and warnings
//!
//! This module provides static grammar analysis that warns about:
//! - Left recursion (reported as an error by the engine at parse time)
//! - Unreachable alternatives
//! - Rules unreachable from the root
//! - Repetitions of expressions that can match the empty string
//! - References to undefined rules
//!
//! # Example
//!
//! ```
//! use bootpeg::runtime::{Expression, Grammar, GrammarAnalyzer, WarningKind};
//!
//! let mut grammar = Grammar::new();
//! grammar.add_rule("expr", Expression::reference("expr").then(Expression::literal("+")));
//! grammar.set_root("expr");
//!
//! let warnings = GrammarAnalyzer::new(&grammar).analyze();
//! for warning in &warnings {
//!     println!("{}", warning);
//! }
//! assert!(warnings.iter().any(|w| w.kind == WarningKind::LeftRecursion));
//! ```

use super::expression::Expression;
use super::grammar::Grammar;
use std::collections::{HashMap, HashSet};
use LiteralPrefix::{Complete, Partial};

/// Kind of grammar warning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningKind {
    /// Direct or indirect left recursion
    ///
    /// The engine reports a left-recursion error when such a rule is
    /// re-entered. Example: `expr = expr "+" term / term`
    LeftRecursion,

    /// An alternative can never match because an earlier alternative always
    /// matches first
    ///
    /// Example: `"a" / "ab"` - `"ab"` is unreachable
    UnreachableAlternative,

    /// A rule is defined but never reachable from the root
    UnusedRule,

    /// A repetition whose body can match the empty string
    ///
    /// The engine stops such a repetition after its first empty iteration.
    NullableRepetition,

    /// A reference to a rule that has no definition
    UndefinedReference,

    /// Empty sequence or choice
    ///
    /// An empty sequence always matches. An empty choice never matches.
    EmptyComposite,
}

impl std::fmt::Display for WarningKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LeftRecursion => write!(f, "left recursion"),
            Self::UnreachableAlternative => write!(f, "unreachable alternative"),
            Self::UnusedRule => write!(f, "unused rule"),
            Self::NullableRepetition => write!(f, "nullable repetition"),
            Self::UndefinedReference => write!(f, "undefined reference"),
            Self::EmptyComposite => write!(f, "empty composite"),
        }
    }
}

/// A grammar warning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarWarning {
    /// The kind of warning
    pub kind: WarningKind,
    /// The rule where the warning was detected
    pub rule: String,
    /// Human-readable message
    pub message: String,
    /// Related rules (e.g., the path of a left recursion)
    pub related: Vec<String>,
}

impl GrammarWarning {
    /// Create a new warning
    pub fn new(kind: WarningKind, rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            rule: rule.into(),
            message: message.into(),
            related: Vec::new(),
        }
    }

    /// Add related rules to the warning
    pub fn with_related(mut self, rules: Vec<String>) -> Self {
        self.related = rules;
        self
    }
}

impl std::fmt::Display for GrammarWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[rule {}] {}: {}", self.rule, self.kind, self.message)?;
        if !self.related.is_empty() {
            write!(f, " ({})", self.related.join(" -> "))?;
        }
        Ok(())
    }
}

/// Grammar analyzer
pub struct GrammarAnalyzer<'a> {
    grammar: &'a Grammar,
    /// Rules that can match the empty string
    nullable: HashSet<&'a str>,
}

impl<'a> GrammarAnalyzer<'a> {
    /// Create a new analyzer for the given grammar
    pub fn new(grammar: &'a Grammar) -> Self {
        let mut analyzer = Self {
            grammar,
            nullable: HashSet::new(),
        };
        analyzer.compute_nullable_rules();
        analyzer
    }

    /// Analyze the grammar and return all warnings
    pub fn analyze(&self) -> Vec<GrammarWarning> {
        let mut warnings = Vec::new();

        self.detect_undefined_references(&mut warnings);
        self.detect_left_recursion(&mut warnings);
        self.detect_unused_rules(&mut warnings);
        self.detect_expression_issues(&mut warnings);

        warnings
    }

    /// Whether the rule called `name` can match the empty string
    pub fn is_nullable_rule(&self, name: &str) -> bool {
        self.nullable.contains(name)
    }

    /// Whether `expression` can match the empty string
    pub fn is_nullable(&self, expression: &Expression) -> bool {
        match expression {
            Expression::Literal(text) => text.is_empty(),
            Expression::CharacterClass(_) | Expression::AnyCharacter => false,
            Expression::RuleReference(name) => self.nullable.contains(name.as_str()),
            Expression::Sequence(children) => children.iter().all(|c| self.is_nullable(c)),
            Expression::OrderedChoice(alternatives) => {
                alternatives.iter().any(|a| self.is_nullable(a))
            }
            Expression::ZeroOrMore(_)
            | Expression::Optional(_)
            | Expression::AndPredicate(_)
            | Expression::NotPredicate(_) => true,
            Expression::OneOrMore(inner) | Expression::Label(_, inner) => self.is_nullable(inner),
        }
    }

    /// Least fixed point of rule nullability
    fn compute_nullable_rules(&mut self) {
        let grammar = self.grammar;
        loop {
            let mut changed = false;
            for rule in grammar.rules() {
                if self.nullable.contains(rule.name.as_str()) {
                    continue;
                }
                if let Some(expression) = rule.expression.as_ref() {
                    if self.is_nullable(expression) {
                        self.nullable.insert(rule.name.as_str());
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }
    }

    fn detect_undefined_references(&self, warnings: &mut Vec<GrammarWarning>) {
        for rule in self.grammar.rules() {
            let Some(expression) = rule.expression.as_ref() else {
                continue;
            };
            let mut reported = HashSet::new();
            for name in expression.referenced_rules() {
                if self.grammar.get(name).is_none() && reported.insert(name) {
                    warnings.push(GrammarWarning::new(
                        WarningKind::UndefinedReference,
                        &rule.name,
                        format!("reference to undefined rule {}", name),
                    ));
                }
            }
        }
    }

    /// Detect left recursion (direct and indirect)
    ///
    /// A rule is left-recursive when it can invoke itself before consuming
    /// any input.
    fn detect_left_recursion(&self, warnings: &mut Vec<GrammarWarning>) {
        let mut first_calls: HashMap<&str, Vec<&str>> = HashMap::new();
        for rule in self.grammar.rules() {
            let mut calls = Vec::new();
            if let Some(expression) = rule.expression.as_ref() {
                self.collect_first_calls(expression, &mut calls);
            }
            first_calls.insert(rule.name.as_str(), calls);
        }

        for rule in self.grammar.rules() {
            let start = rule.name.as_str();
            let mut visited = HashSet::new();
            if let Some(path) = find_cycle(&first_calls, start, start, &mut visited) {
                let mut chain = vec![start.to_string()];
                chain.extend(path.into_iter().map(str::to_string));
                warnings.push(
                    GrammarWarning::new(
                        WarningKind::LeftRecursion,
                        start,
                        format!(
                            "rule {} can invoke itself without consuming input",
                            start
                        ),
                    )
                    .with_related(chain),
                );
            }
        }
    }

    /// Rules that `expression` may invoke at its start position
    fn collect_first_calls<'e>(&self, expression: &'e Expression, calls: &mut Vec<&'e str>) {
        match expression {
            Expression::Literal(_) | Expression::CharacterClass(_) | Expression::AnyCharacter => {}
            Expression::RuleReference(name) => {
                if !calls.contains(&name.as_str()) {
                    calls.push(name);
                }
            }
            Expression::Sequence(children) => {
                for child in children {
                    self.collect_first_calls(child, calls);
                    if !self.is_nullable(child) {
                        break;
                    }
                }
            }
            Expression::OrderedChoice(alternatives) => {
                for alternative in alternatives {
                    self.collect_first_calls(alternative, calls);
                }
            }
            Expression::ZeroOrMore(inner)
            | Expression::OneOrMore(inner)
            | Expression::Optional(inner)
            | Expression::AndPredicate(inner)
            | Expression::NotPredicate(inner)
            | Expression::Label(_, inner) => self.collect_first_calls(inner, calls),
        }
    }

    /// Detect rules that are never reachable from the root
    fn detect_unused_rules(&self, warnings: &mut Vec<GrammarWarning>) {
        let Some(root) = self.grammar.root_name() else {
            return;
        };
        let mut reachable = HashSet::new();
        let mut pending = vec![root];
        while let Some(name) = pending.pop() {
            if !reachable.insert(name) {
                continue;
            }
            if let Some(expression) = self.grammar.get(name) {
                pending.extend(expression.referenced_rules());
            }
        }

        for rule in self.grammar.rules() {
            if rule.is_defined() && !reachable.contains(rule.name.as_str()) {
                warnings.push(GrammarWarning::new(
                    WarningKind::UnusedRule,
                    &rule.name,
                    format!("rule {} is never reachable from root {}", rule.name, root),
                ));
            }
        }
    }

    /// Per-expression checks: empty composites, nullable repetitions and
    /// unreachable alternatives
    fn detect_expression_issues(&self, warnings: &mut Vec<GrammarWarning>) {
        for rule in self.grammar.rules() {
            if let Some(expression) = rule.expression.as_ref() {
                self.check_expression(&rule.name, expression, warnings);
            }
        }
    }

    fn check_expression(
        &self,
        rule: &str,
        expression: &Expression,
        warnings: &mut Vec<GrammarWarning>,
    ) {
        match expression {
            Expression::Sequence(children) => {
                if children.is_empty() {
                    warnings.push(GrammarWarning::new(
                        WarningKind::EmptyComposite,
                        rule,
                        "empty sequence always matches the empty string",
                    ));
                }
                for child in children {
                    self.check_expression(rule, child, warnings);
                }
            }
            Expression::OrderedChoice(alternatives) => {
                if alternatives.is_empty() {
                    warnings.push(GrammarWarning::new(
                        WarningKind::EmptyComposite,
                        rule,
                        "empty choice never matches",
                    ));
                }
                self.check_alternatives(rule, alternatives, warnings);
                for alternative in alternatives {
                    self.check_expression(rule, alternative, warnings);
                }
            }
            Expression::ZeroOrMore(inner) | Expression::OneOrMore(inner) => {
                if self.is_nullable(inner) {
                    warnings.push(GrammarWarning::new(
                        WarningKind::NullableRepetition,
                        rule,
                        format!("repeated expression {} can match the empty string", inner),
                    ));
                }
                self.check_expression(rule, inner, warnings);
            }
            Expression::Optional(inner)
            | Expression::AndPredicate(inner)
            | Expression::NotPredicate(inner)
            | Expression::Label(_, inner) => self.check_expression(rule, inner, warnings),
            Expression::Literal(_)
            | Expression::CharacterClass(_)
            | Expression::AnyCharacter
            | Expression::RuleReference(_) => {}
        }
    }

    /// An alternative is unreachable when an earlier one always succeeds, or
    /// when an earlier literal is a prefix of it
    fn check_alternatives(
        &self,
        rule: &str,
        alternatives: &[Expression],
        warnings: &mut Vec<GrammarWarning>,
    ) {
        for (i, alternative) in alternatives.iter().enumerate() {
            let earlier = &alternatives[..i];
            let shadowed_by = earlier.iter().find(|previous| {
                always_succeeds(previous)
                    || *previous == alternative
                    || match (literal_prefix(previous), literal_prefix(alternative)) {
                        (Some(Complete(prefix)), Some(Complete(text)) | Some(Partial(text))) => {
                            text.starts_with(prefix.as_str())
                        }
                        _ => false,
                    }
            });
            if let Some(previous) = shadowed_by {
                warnings.push(GrammarWarning::new(
                    WarningKind::UnreachableAlternative,
                    rule,
                    format!(
                        "alternative {} is never tried after {}",
                        alternative, previous
                    ),
                ));
            }
        }
    }
}

/// Literal text an expression starts with, and whether that text is the
/// whole of what it matches
enum LiteralPrefix {
    Complete(String),
    Partial(String),
}

fn literal_prefix(expression: &Expression) -> Option<LiteralPrefix> {
    match expression {
        Expression::Literal(text) => Some(Complete(text.clone())),
        Expression::Label(_, inner) => literal_prefix(inner),
        Expression::Sequence(children) => {
            let mut text = String::new();
            let mut complete = true;
            for child in children {
                match child {
                    Expression::Literal(part) => text.push_str(part),
                    _ => {
                        complete = false;
                        break;
                    }
                }
            }
            if text.is_empty() && !children.is_empty() {
                None
            } else if complete {
                Some(Complete(text))
            } else {
                Some(Partial(text))
            }
        }
        _ => None,
    }
}

/// Whether an expression matches at every position
///
/// Rule references are not followed, so this only reports the obvious cases.
fn always_succeeds(expression: &Expression) -> bool {
    match expression {
        Expression::ZeroOrMore(_) | Expression::Optional(_) => true,
        Expression::Literal(text) => text.is_empty(),
        Expression::Sequence(children) => children.iter().all(always_succeeds),
        Expression::OrderedChoice(alternatives) => alternatives.iter().any(always_succeeds),
        Expression::Label(_, inner) => always_succeeds(inner),
        _ => false,
    }
}

/// Find a path of first calls from `current` back to `target`
fn find_cycle<'g>(
    graph: &HashMap<&'g str, Vec<&'g str>>,
    current: &'g str,
    target: &str,
    visited: &mut HashSet<&'g str>,
) -> Option<Vec<&'g str>> {
    if !visited.insert(current) {
        return None;
    }
    for &next in graph.get(current).map(Vec::as_slice).unwrap_or_default() {
        if next == target {
            return Some(vec![next]);
        }
        if let Some(mut path) = find_cycle(graph, next, target, visited) {
            path.insert(0, next);
            return Some(path);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::parser_dsl::*;

    fn kinds(grammar: &Grammar) -> Vec<WarningKind> {
        GrammarAnalyzer::new(grammar)
            .analyze()
            .into_iter()
            .map(|w| w.kind)
            .collect()
    }

    #[test]
    fn test_clean_grammar_has_no_warnings() {
        let grammar = GrammarBuilder::new()
            .rule("list", ref_("item") >> (str(",") >> ref_("item")).many())
            .rule("item", str("x") | str("y"))
            .build();
        assert!(kinds(&grammar).is_empty());
    }

    #[test]
    fn test_direct_left_recursion() {
        let grammar = GrammarBuilder::new()
            .rule("expr", (ref_("expr") >> str("+")) | str("1"))
            .build();
        let warnings = GrammarAnalyzer::new(&grammar).analyze();
        let warning = warnings
            .iter()
            .find(|w| w.kind == WarningKind::LeftRecursion)
            .unwrap();
        assert_eq!(warning.related, vec!["expr".to_string(), "expr".to_string()]);
    }

    #[test]
    fn test_indirect_left_recursion_through_nullable_prefix() {
        let grammar = GrammarBuilder::new()
            .rule("a", str("x").optional() >> ref_("b"))
            .rule("b", ref_("a") >> str("y"))
            .build();
        let warnings = GrammarAnalyzer::new(&grammar).analyze();
        let warning = warnings
            .iter()
            .find(|w| w.kind == WarningKind::LeftRecursion && w.rule == "a")
            .unwrap();
        assert_eq!(warning.related, vec!["a", "b", "a"]);
        assert!(warning.to_string().contains("a -> b -> a"));
    }

    #[test]
    fn test_unused_rule() {
        let grammar = GrammarBuilder::new()
            .rule("main", str("x"))
            .rule("orphan", str("y"))
            .build();
        let warnings = GrammarAnalyzer::new(&grammar).analyze();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::UnusedRule);
        assert_eq!(warnings[0].rule, "orphan");
    }

    #[test]
    fn test_unreachable_alternatives() {
        let grammar = GrammarBuilder::new()
            .rule("a", str("a") | str("ab"))
            .build();
        assert_eq!(kinds(&grammar), vec![WarningKind::UnreachableAlternative]);

        let grammar = GrammarBuilder::new()
            .rule("a", str("a").optional() | str("b"))
            .build();
        assert_eq!(kinds(&grammar), vec![WarningKind::UnreachableAlternative]);

        let grammar = GrammarBuilder::new()
            .rule("a", str("ab") | str("a"))
            .build();
        assert!(kinds(&grammar).is_empty());
    }

    #[test]
    fn test_nullable_repetition() {
        let grammar = GrammarBuilder::new()
            .rule("a", str("x").optional().many())
            .build();
        assert_eq!(kinds(&grammar), vec![WarningKind::NullableRepetition]);
    }

    #[test]
    fn test_undefined_reference() {
        let grammar = GrammarBuilder::new()
            .rule("a", ref_("missing") >> ref_("missing"))
            .build();
        assert_eq!(kinds(&grammar), vec![WarningKind::UndefinedReference]);
    }

    #[test]
    fn test_empty_composites() {
        let grammar = GrammarBuilder::new()
            .rule("a", seq(vec![]) >> choice(vec![]))
            .build();
        let kinds = kinds(&grammar);
        assert_eq!(
            kinds
                .iter()
                .filter(|k| **k == WarningKind::EmptyComposite)
                .count(),
            2
        );
    }

    #[test]
    fn test_nullable_fixed_point() {
        let grammar = GrammarBuilder::new()
            .rule("a", ref_("b") >> ref_("c"))
            .rule("b", str("x").many())
            .rule("c", ref_("b").optional())
            .build();
        let analyzer = GrammarAnalyzer::new(&grammar);
        assert!(analyzer.is_nullable_rule("a"));
        assert!(analyzer.is_nullable_rule("c"));
    }
}
