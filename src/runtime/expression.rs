//! Parsing expressions
//!
//! [`Expression`] is the closed set of PEG operators every grammar is built
//! from. Expressions are plain data: matching is performed by the packrat
//! engine, which owns the single dispatch over the variants.
//!
//! The `Display` implementation writes an expression back out in grammar
//! syntax, inserting parentheses only where operator precedence requires
//! them, so the text compiles back to an equal expression.
//!
//! # Example
//!
//! ```rust
//! use bootpeg::runtime::expression::*;
//!
//! let digits = Expression::class("0-9").unwrap().one_or_more();
//! let signed = sequence_of(vec![Expression::literal("-").optional(), digits]);
//! assert_eq!(signed.to_string(), r#""-"? [0-9]+"#);
//! ```

use super::ast::{MatchResult, ParseError};
use super::char_class::{CharacterClass, ClassError};
use super::parser::PackratParser;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A parsing expression
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expression {
    /// Match an exact character sequence
    Literal(String),
    /// Match one character against a class
    CharacterClass(CharacterClass),
    /// Match any single character
    AnyCharacter,
    /// Invoke another rule of the same grammar
    RuleReference(String),
    /// Match every child in order
    Sequence(Vec<Expression>),
    /// Try alternatives in order, committing to the first success
    OrderedChoice(Vec<Expression>),
    /// Greedy repetition, zero or more times
    ZeroOrMore(Box<Expression>),
    /// Greedy repetition, one or more times
    OneOrMore(Box<Expression>),
    /// Match the inner expression at most once
    Optional(Box<Expression>),
    /// Succeed if the inner expression matches, consuming nothing
    AndPredicate(Box<Expression>),
    /// Succeed if the inner expression fails, consuming nothing
    NotPredicate(Box<Expression>),
    /// Name a sub-match for later semantic access
    Label(String, Box<Expression>),
}

impl Expression {
    /// Literal text
    pub fn literal(text: impl Into<String>) -> Self {
        Expression::Literal(text.into())
    }

    /// Character class parsed from a bracket body such as `a-z_`
    pub fn class(body: &str) -> Result<Self, ClassError> {
        CharacterClass::parse(body).map(Expression::CharacterClass)
    }

    /// Reference to a named rule
    pub fn reference(name: impl Into<String>) -> Self {
        Expression::RuleReference(name.into())
    }

    /// Repeat this expression zero or more times
    pub fn zero_or_more(self) -> Self {
        Expression::ZeroOrMore(Box::new(self))
    }

    /// Repeat this expression one or more times
    pub fn one_or_more(self) -> Self {
        Expression::OneOrMore(Box::new(self))
    }

    /// Make this expression optional
    pub fn optional(self) -> Self {
        Expression::Optional(Box::new(self))
    }

    /// Positive lookahead on this expression
    pub fn and_predicate(self) -> Self {
        Expression::AndPredicate(Box::new(self))
    }

    /// Negative lookahead on this expression
    pub fn not_predicate(self) -> Self {
        Expression::NotPredicate(Box::new(self))
    }

    /// Attach a label to this expression
    pub fn labeled(self, name: impl Into<String>) -> Self {
        Expression::Label(name.into(), Box::new(self))
    }

    /// Match this expression at `position` using the given engine
    ///
    /// The engine supplies the input, the memo table and the grammar that
    /// rule references resolve against.
    #[inline]
    pub fn match_at(
        &self,
        engine: &mut PackratParser<'_>,
        position: usize,
    ) -> Result<MatchResult, ParseError> {
        engine.match_at(self, position)
    }

    /// Walk this expression depth-first
    pub fn walk<V: ExpressionVisitor + ?Sized>(&self, visitor: &mut V) {
        visitor.enter(self);
        match self {
            Expression::Literal(text) => visitor.visit_literal(text),
            Expression::CharacterClass(class) => visitor.visit_character_class(class),
            Expression::AnyCharacter => visitor.visit_any_character(),
            Expression::RuleReference(name) => visitor.visit_rule_reference(name),
            Expression::Sequence(children) | Expression::OrderedChoice(children) => {
                for child in children {
                    child.walk(visitor);
                }
            }
            Expression::ZeroOrMore(inner)
            | Expression::OneOrMore(inner)
            | Expression::Optional(inner)
            | Expression::AndPredicate(inner)
            | Expression::NotPredicate(inner) => inner.walk(visitor),
            Expression::Label(name, inner) => {
                visitor.visit_label(name);
                inner.walk(visitor);
            }
        }
        visitor.leave(self);
    }

    /// Names of all rules referenced from this expression, in first-seen order
    pub fn referenced_rules(&self) -> Vec<&str> {
        let mut names = Vec::new();
        collect_references(self, &mut names);
        names
    }

    /// Short description used in failure reports
    pub fn describe(&self) -> String {
        match self {
            Expression::AnyCharacter => "any character".to_string(),
            other => other.to_string(),
        }
    }

    fn precedence(&self) -> Precedence {
        match self {
            Expression::OrderedChoice(children) if children.len() > 1 => Precedence::Choice,
            Expression::Sequence(children) if children.len() > 1 => Precedence::Sequence,
            Expression::OrderedChoice(children) => match children.first() {
                Some(only) => only.precedence(),
                None => Precedence::Prefix,
            },
            Expression::Sequence(children) => match children.first() {
                Some(only) => only.precedence(),
                None => Precedence::Atom,
            },
            Expression::AndPredicate(_) | Expression::NotPredicate(_) | Expression::Label(..) => {
                Precedence::Prefix
            }
            Expression::ZeroOrMore(_) | Expression::OneOrMore(_) | Expression::Optional(_) => {
                Precedence::Suffix
            }
            Expression::Literal(_)
            | Expression::CharacterClass(_)
            | Expression::AnyCharacter
            | Expression::RuleReference(_) => Precedence::Atom,
        }
    }

    fn fmt_at(&self, f: &mut fmt::Formatter<'_>, min: Precedence) -> fmt::Result {
        if self.precedence() < min {
            write!(f, "(")?;
            self.fmt_at(f, Precedence::Choice)?;
            return write!(f, ")");
        }

        match self {
            Expression::Literal(text) => write_literal(f, text),
            Expression::CharacterClass(class) => write!(f, "{}", class),
            Expression::AnyCharacter => write!(f, "."),
            Expression::RuleReference(name) => write!(f, "{}", name),
            Expression::Sequence(children) => match children.as_slice() {
                [] => write!(f, "\"\""),
                [only] => only.fmt_at(f, min),
                _ => write_joined(f, children, " ", Precedence::Prefix),
            },
            Expression::OrderedChoice(children) => match children.as_slice() {
                [] => write!(f, "!\"\""),
                [only] => only.fmt_at(f, min),
                _ => write_joined(f, children, " / ", Precedence::Sequence),
            },
            Expression::ZeroOrMore(inner) => {
                inner.fmt_at(f, Precedence::Atom)?;
                write!(f, "*")
            }
            Expression::OneOrMore(inner) => {
                inner.fmt_at(f, Precedence::Atom)?;
                write!(f, "+")
            }
            Expression::Optional(inner) => {
                inner.fmt_at(f, Precedence::Atom)?;
                write!(f, "?")
            }
            Expression::AndPredicate(inner) => {
                write!(f, "&")?;
                fmt_predicate_operand(f, inner)
            }
            Expression::NotPredicate(inner) => {
                write!(f, "!")?;
                fmt_predicate_operand(f, inner)
            }
            Expression::Label(name, inner) => {
                write!(f, "{}:", name)?;
                inner.fmt_at(f, Precedence::Suffix)
            }
        }
    }
}

/// Binding strength of an operator in grammar syntax, loosest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Choice,
    Sequence,
    Prefix,
    Suffix,
    Atom,
}

// A predicate may be followed by a label, which is itself a prefix form
fn fmt_predicate_operand(f: &mut fmt::Formatter<'_>, inner: &Expression) -> fmt::Result {
    match inner {
        Expression::Label(..) => inner.fmt_at(f, Precedence::Prefix),
        _ => inner.fmt_at(f, Precedence::Suffix),
    }
}

fn write_joined(
    f: &mut fmt::Formatter<'_>,
    children: &[Expression],
    separator: &str,
    min: Precedence,
) -> fmt::Result {
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", separator)?;
        }
        child.fmt_at(f, min)?;
    }
    Ok(())
}

fn write_literal(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    write!(f, "\"")?;
    for c in text.chars() {
        match c {
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\t' => write!(f, "\\t")?,
            '\r' => write!(f, "\\r")?,
            '\0' => write!(f, "\\0")?,
            other => write!(f, "{}", other)?,
        }
    }
    write!(f, "\"")
}

fn collect_references<'e>(expr: &'e Expression, names: &mut Vec<&'e str>) {
    match expr {
        Expression::RuleReference(name) => {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
        Expression::Sequence(children) | Expression::OrderedChoice(children) => {
            for child in children {
                collect_references(child, names);
            }
        }
        Expression::ZeroOrMore(inner)
        | Expression::OneOrMore(inner)
        | Expression::Optional(inner)
        | Expression::AndPredicate(inner)
        | Expression::NotPredicate(inner)
        | Expression::Label(_, inner) => collect_references(inner, names),
        Expression::Literal(_) | Expression::CharacterClass(_) | Expression::AnyCharacter => {}
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_at(f, Precedence::Choice)
    }
}

// ============================================================================
// Combinators
// ============================================================================

/// Sequence of expressions; a single element collapses to itself
pub fn sequence_of(mut children: Vec<Expression>) -> Expression {
    if children.len() == 1 {
        return children.remove(0);
    }
    Expression::Sequence(children)
}

/// Ordered choice; a single alternative collapses to itself
pub fn choice_of(mut alternatives: Vec<Expression>) -> Expression {
    if alternatives.len() == 1 {
        return alternatives.remove(0);
    }
    Expression::OrderedChoice(alternatives)
}

/// `inner*`
pub fn zero_or_more(inner: Expression) -> Expression {
    inner.zero_or_more()
}

/// `inner+`
pub fn one_or_more(inner: Expression) -> Expression {
    inner.one_or_more()
}

/// `inner?`
pub fn optional(inner: Expression) -> Expression {
    inner.optional()
}

/// `&inner`
pub fn and_predicate(inner: Expression) -> Expression {
    inner.and_predicate()
}

/// `!inner`
pub fn not_predicate(inner: Expression) -> Expression {
    inner.not_predicate()
}

/// `name:inner`
pub fn labeled(name: impl Into<String>, inner: Expression) -> Expression {
    inner.labeled(name)
}

// ============================================================================
// ExpressionVisitor Trait
// ============================================================================

/// Visitor over the nodes of an expression tree
///
/// `enter` and `leave` bracket every node; the `visit_*` hooks fire for
/// leaves and labels. All methods default to doing nothing.
pub trait ExpressionVisitor {
    /// Called before a node's children are visited
    fn enter(&mut self, _expr: &Expression) {}

    /// Called after a node's children are visited
    fn leave(&mut self, _expr: &Expression) {}

    /// Visit a literal
    fn visit_literal(&mut self, _text: &str) {}

    /// Visit a character class
    fn visit_character_class(&mut self, _class: &CharacterClass) {}

    /// Visit `.`
    fn visit_any_character(&mut self) {}

    /// Visit a rule reference
    fn visit_rule_reference(&mut self, _name: &str) {}

    /// Visit a label name (before its inner expression)
    fn visit_label(&mut self, _name: &str) {}
}

/// Counts expression variants
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpressionCounter {
    /// Literals
    pub literals: usize,
    /// Character classes
    pub classes: usize,
    /// `.` occurrences
    pub any_characters: usize,
    /// Rule references
    pub references: usize,
    /// Sequences
    pub sequences: usize,
    /// Ordered choices
    pub choices: usize,
    /// `*`, `+` and `?`
    pub repetitions: usize,
    /// `&` and `!`
    pub predicates: usize,
    /// Labels
    pub labels: usize,
}

impl ExpressionCounter {
    /// Total number of expression nodes counted
    pub fn total(&self) -> usize {
        self.literals
            + self.classes
            + self.any_characters
            + self.references
            + self.sequences
            + self.choices
            + self.repetitions
            + self.predicates
            + self.labels
    }
}

impl ExpressionVisitor for ExpressionCounter {
    fn enter(&mut self, expr: &Expression) {
        match expr {
            Expression::Literal(_) => self.literals += 1,
            Expression::CharacterClass(_) => self.classes += 1,
            Expression::AnyCharacter => self.any_characters += 1,
            Expression::RuleReference(_) => self.references += 1,
            Expression::Sequence(_) => self.sequences += 1,
            Expression::OrderedChoice(_) => self.choices += 1,
            Expression::ZeroOrMore(_) | Expression::OneOrMore(_) | Expression::Optional(_) => {
                self.repetitions += 1
            }
            Expression::AndPredicate(_) | Expression::NotPredicate(_) => self.predicates += 1,
            Expression::Label(..) => self.labels += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(s: &str) -> Expression {
        Expression::literal(s)
    }

    fn r(name: &str) -> Expression {
        Expression::reference(name)
    }

    #[test]
    fn test_sequence_of_collapses_single() {
        assert_eq!(sequence_of(vec![lit("a")]), lit("a"));
        assert_eq!(
            sequence_of(vec![lit("a"), lit("b")]),
            Expression::Sequence(vec![lit("a"), lit("b")])
        );
        assert_eq!(choice_of(vec![r("x")]), r("x"));
    }

    #[test]
    fn test_display_atoms() {
        assert_eq!(lit("a\"b\\").to_string(), r#""a\"b\\""#);
        assert_eq!(lit("\n").to_string(), r#""\n""#);
        assert_eq!(Expression::AnyCharacter.to_string(), ".");
        assert_eq!(Expression::class("a-z").unwrap().to_string(), "[a-z]");
    }

    #[test]
    fn test_display_suffix_binds_tighter_than_prefix() {
        let e = lit("foo").one_or_more().not_predicate();
        assert_eq!(e.to_string(), r#"!"foo"+"#);

        let e = lit("foo").not_predicate().one_or_more();
        assert_eq!(e.to_string(), r#"(!"foo")+"#);
    }

    #[test]
    fn test_display_nested_lists() {
        let e = sequence_of(vec![
            r("a"),
            choice_of(vec![r("b"), r("c")]),
            sequence_of(vec![r("d"), r("e")]),
        ]);
        assert_eq!(e.to_string(), "a (b / c) (d e)");

        let e = choice_of(vec![
            sequence_of(vec![r("a"), r("b")]),
            choice_of(vec![r("c"), r("d")]),
        ]);
        assert_eq!(e.to_string(), "a b / (c / d)");
    }

    #[test]
    fn test_display_labels() {
        let e = r("x").zero_or_more().labeled("items");
        assert_eq!(e.to_string(), "items:x*");

        let e = r("x").labeled("item").not_predicate();
        assert_eq!(e.to_string(), "!item:x");

        let e = r("x").not_predicate().labeled("guard");
        assert_eq!(e.to_string(), "guard:(!x)");
    }

    #[test]
    fn test_referenced_rules_first_seen_order() {
        let e = sequence_of(vec![r("b"), r("a"), r("b").optional()]);
        assert_eq!(e.referenced_rules(), vec!["b", "a"]);
    }

    #[test]
    fn test_counter_visitor() {
        let e = sequence_of(vec![lit("a"), r("b").zero_or_more().labeled("rest")]);
        let mut counter = ExpressionCounter::default();
        e.walk(&mut counter);
        assert_eq!(counter.sequences, 1);
        assert_eq!(counter.literals, 1);
        assert_eq!(counter.references, 1);
        assert_eq!(counter.repetitions, 1);
        assert_eq!(counter.labels, 1);
        assert_eq!(counter.total(), 5);
    }

    #[test]
    fn test_json_roundtrip() {
        let e = sequence_of(vec![
            Expression::class("^0-9").unwrap().labeled("c"),
            Expression::AnyCharacter.and_predicate(),
        ]);
        let json = serde_json::to_string(&e).unwrap();
        let back: Expression = serde_json::from_str(&json).unwrap();
        assert_eq!(e, back);
    }
}
