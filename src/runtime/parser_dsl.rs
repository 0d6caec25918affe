//! Parser DSL - Idiomatic Rust Grammar Definition
//!
//! This module provides a fluent, composable API for defining PEG grammars
//! in Rust without going through grammar source text. It is also the
//! vocabulary of generated parser sources.
//!
//! # Example
//!
//! ```rust
//! use bootpeg::runtime::parser_dsl::*;
//!
//! // Define a simple grammar
//! let grammar = GrammarBuilder::new()
//!     .rule("greeting", str("hello") >> str(" ") >> ref_("name"))
//!     .rule("name", str("world") | str("there"))
//!     .build();
//!
//! assert!(grammar.parse("hello world").is_ok());
//! ```

use super::char_class::CharacterClass;
use super::expression::Expression;
use super::grammar::Grammar;
use std::ops::{BitOr, Shr};

/// Grammar builder for constructing grammars
///
/// The first rule added becomes the root rule.
pub struct GrammarBuilder {
    grammar: Grammar,
}

impl GrammarBuilder {
    /// Create a new grammar builder
    pub fn new() -> Self {
        Self {
            grammar: Grammar::new(),
        }
    }

    /// Create a builder for a named grammar
    pub fn named(name: &str) -> Self {
        Self {
            grammar: Grammar::named(name),
        }
    }

    /// Add (or replace) a rule
    pub fn rule(mut self, name: &str, expression: Expression) -> Self {
        self.rule_mut(name, expression);
        self
    }

    /// Add (or replace) a rule through a mutable reference
    pub fn rule_mut(&mut self, name: &str, expression: Expression) -> &mut Self {
        self.grammar.add_rule(name, expression);
        if self.grammar.root().is_none() {
            self.grammar.set_root(name);
        }
        self
    }

    /// Designate a different root rule
    pub fn root(mut self, name: &str) -> Self {
        self.grammar.set_root(name);
        self
    }

    /// Build the final grammar
    pub fn build(self) -> Grammar {
        self.grammar
    }
}

impl Default for GrammarBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Combinator methods
// ============================================================================

impl Expression {
    /// Sequence: `self` followed by `next`
    ///
    /// Chained calls extend one flat sequence.
    pub fn then(self, next: Expression) -> Expression {
        match self {
            Expression::Sequence(mut children) if !children.is_empty() => {
                children.push(next);
                Expression::Sequence(children)
            }
            first => Expression::Sequence(vec![first, next]),
        }
    }

    /// Ordered choice: `self`, else `alternative`
    ///
    /// Chained calls extend one flat choice.
    pub fn or(self, alternative: Expression) -> Expression {
        match self {
            Expression::OrderedChoice(mut alternatives) if !alternatives.is_empty() => {
                alternatives.push(alternative);
                Expression::OrderedChoice(alternatives)
            }
            first => Expression::OrderedChoice(vec![first, alternative]),
        }
    }

    /// Zero or more repetitions
    pub fn many(self) -> Expression {
        self.zero_or_more()
    }

    /// One or more repetitions
    pub fn many1(self) -> Expression {
        self.one_or_more()
    }

    /// Positive lookahead
    pub fn lookahead(self) -> Expression {
        self.and_predicate()
    }

    /// Negative lookahead
    pub fn not_ahead(self) -> Expression {
        self.not_predicate()
    }

    /// Name the match of this expression
    pub fn label(self, name: &str) -> Expression {
        self.labeled(name)
    }
}

impl Shr for Expression {
    type Output = Expression;
    fn shr(self, rhs: Expression) -> Self::Output {
        self.then(rhs)
    }
}

impl BitOr for Expression {
    type Output = Expression;
    fn bitor(self, rhs: Expression) -> Self::Output {
        self.or(rhs)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Match a literal string
pub fn str(s: &str) -> Expression {
    Expression::Literal(s.to_string())
}

/// Match any single character
pub fn any() -> Expression {
    Expression::AnyCharacter
}

/// Reference a rule by name
pub fn ref_(name: &str) -> Expression {
    Expression::RuleReference(name.to_string())
}

/// Match one character of a class
pub fn char_class(class: CharacterClass) -> Expression {
    Expression::CharacterClass(class)
}

/// Sequence of expressions, kept exactly as given
pub fn seq(children: Vec<Expression>) -> Expression {
    Expression::Sequence(children)
}

/// Ordered choice of expressions, kept exactly as given
pub fn choice(alternatives: Vec<Expression>) -> Expression {
    Expression::OrderedChoice(alternatives)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::char_class::ClassItem;

    #[test]
    fn test_then_flattens() {
        let expr = str("a").then(str("b")).then(str("c"));
        assert_eq!(expr, seq(vec![str("a"), str("b"), str("c")]));
        assert_eq!(str("a") >> str("b"), seq(vec![str("a"), str("b")]));
    }

    #[test]
    fn test_or_flattens() {
        let expr = str("a") | str("b") | str("c");
        assert_eq!(expr, choice(vec![str("a"), str("b"), str("c")]));
    }

    #[test]
    fn test_suffix_helpers() {
        assert_eq!(str("a").many(), Expression::ZeroOrMore(Box::new(str("a"))));
        assert_eq!(str("a").many1(), Expression::OneOrMore(Box::new(str("a"))));
        assert_eq!(
            str("a").not_ahead(),
            Expression::NotPredicate(Box::new(str("a")))
        );
        assert_eq!(
            str("a").label("x"),
            Expression::Label("x".into(), Box::new(str("a")))
        );
    }

    #[test]
    fn test_builder_root_is_first_rule() {
        let grammar = GrammarBuilder::named("digits")
            .rule("number", ref_("digit").many1())
            .rule(
                "digit",
                char_class(CharacterClass::new(vec![ClassItem::Range('0', '9')])),
            )
            .build();

        assert_eq!(grammar.root_name(), Some("number"));
        assert_eq!(grammar.name(), Some("digits"));
        assert!(grammar.parse("2024").is_ok());
        assert!(grammar.parse("20x4").is_err());
    }

    #[test]
    fn test_builder_explicit_root() {
        let grammar = GrammarBuilder::new()
            .rule("a", str("a"))
            .rule("b", str("b"))
            .root("b")
            .build();
        assert_eq!(grammar.root_name(), Some("b"));
        assert!(grammar.parse("b").is_ok());
    }
}
