//! Metagrammar semantics
//!
//! The metagrammar is the grammar of grammar source text (see
//! `grammars/metagrammar.peg`). Matching it only yields a syntax tree; this
//! module turns that tree into parsing expressions. Value construction is
//! driven by rule names, so any grammar that defines [`REQUIRED_RULES`] with
//! the same labels can stand in for the embedded metagrammar.
//!
//! Rule slots are registered in a [`Grammar`] accumulator passed by `&mut`:
//! every `nonterminal_symbol` installs (or finds) the slot it names, and every
//! `rule_definition` fills its own slot in.

use super::grammar_compiler::CompileError;
use crate::runtime::char_class::CharacterClass;
use crate::runtime::expression::{choice_of, sequence_of, Expression};
use crate::runtime::{Grammar, SyntaxNode};
use std::fmt;

/// Source text of the metagrammar
pub const METAGRAMMAR_SOURCE: &str = include_str!("../../grammars/metagrammar.peg");

/// Name of the metagrammar's root rule
pub const ROOT_RULE: &str = "grammar";

/// Rules whose matches carry a semantic value
pub const REQUIRED_RULES: &[&str] = &[
    "grammar",
    "rule_definition",
    "choice",
    "sequence",
    "primary",
    "suffixed",
    "atomic",
    "parenthesized",
    "prefix",
    "suffix",
    "label",
    "nonterminal_symbol",
    "terminal_symbol",
    "double_quoted",
    "single_quoted",
    "character_class",
    "anything_symbol",
];

/// `&` or `!`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOperator {
    /// `&`: positive lookahead
    And,
    /// `!`: negative lookahead
    Not,
}

impl PrefixOperator {
    /// Wrap `expression` in the predicate
    pub fn apply(self, expression: Expression) -> Expression {
        match self {
            PrefixOperator::And => expression.and_predicate(),
            PrefixOperator::Not => expression.not_predicate(),
        }
    }
}

/// `*`, `+` or `?`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuffixOperator {
    /// `*`
    ZeroOrMore,
    /// `+`
    OneOrMore,
    /// `?`
    Optional,
}

impl SuffixOperator {
    /// Wrap `expression` in the repetition
    pub fn apply(self, expression: Expression) -> Expression {
        match self {
            SuffixOperator::ZeroOrMore => expression.zero_or_more(),
            SuffixOperator::OneOrMore => expression.one_or_more(),
            SuffixOperator::Optional => expression.optional(),
        }
    }
}

/// Semantic value of a metagrammar match
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaValue {
    /// A parsing expression
    Expression(Expression),
    /// A prefix operator waiting for its operand
    Prefix(PrefixOperator),
    /// A suffix operator waiting for its operand
    Suffix(SuffixOperator),
    /// The name of a label (`name:`)
    Label(String),
    /// A rule definition; the rule has been added to the accumulator
    Definition(String),
    /// A whole grammar; every rule is in the accumulator
    Grammar,
}

impl MetaValue {
    /// The expression, if this value is one
    pub fn into_expression(self) -> Option<Expression> {
        match self {
            MetaValue::Expression(expression) => Some(expression),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            MetaValue::Expression(_) => "expression",
            MetaValue::Prefix(_) => "prefix operator",
            MetaValue::Suffix(_) => "suffix operator",
            MetaValue::Label(_) => "label",
            MetaValue::Definition(_) => "rule definition",
            MetaValue::Grammar => "grammar",
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Expression(expression) => write!(f, "{}", expression),
            MetaValue::Prefix(PrefixOperator::And) => write!(f, "&"),
            MetaValue::Prefix(PrefixOperator::Not) => write!(f, "!"),
            MetaValue::Suffix(SuffixOperator::ZeroOrMore) => write!(f, "*"),
            MetaValue::Suffix(SuffixOperator::OneOrMore) => write!(f, "+"),
            MetaValue::Suffix(SuffixOperator::Optional) => write!(f, "?"),
            MetaValue::Label(name) => write!(f, "{}:", name),
            MetaValue::Definition(name) => write!(f, "rule {}", name),
            MetaValue::Grammar => write!(f, "grammar"),
        }
    }
}

// ============================================================================
// Value construction
// ============================================================================

/// Compute the semantic value of a metagrammar match
///
/// `node` must be (or have as its single-child chain) a rule node of the
/// metagrammar. Rule slots and definitions land in `grammar`; the first
/// definition of a whole grammar becomes its root.
pub fn value(node: SyntaxNode<'_>, grammar: &mut Grammar) -> Result<MetaValue, CompileError> {
    let node = node
        .rule_node()
        .ok_or_else(|| malformed(node, "a rule match"))?;
    let rule = node.rule_name().unwrap_or_default();

    match rule {
        "grammar" => {
            let mut root = None;
            for definition in node.labeled_all("definition") {
                match value(definition, grammar)? {
                    MetaValue::Definition(name) => {
                        root.get_or_insert(name);
                    }
                    other => return Err(unexpected(definition, "rule definition", &other)),
                }
            }
            let root = root.ok_or(CompileError::MissingRoot)?;
            grammar.set_root(&root);
            Ok(MetaValue::Grammar)
        }
        "rule_definition" => {
            let name_node = required(node, "name")?;
            let name = name_node.text();
            // Slot first, so a rule precedes the rules its body mentions
            grammar.install_rule(name);
            let body = expression(required(node, "expression")?, grammar)?;
            grammar
                .define(name, body)
                .map_err(|err| CompileError::DuplicateRule {
                    name: err.name,
                    position: name_node.position(),
                })?;
            Ok(MetaValue::Definition(name.to_string()))
        }
        "choice" => {
            let alternatives = collect_expressions(node, "alternative", grammar)?;
            Ok(MetaValue::Expression(choice_of(alternatives)))
        }
        "sequence" => {
            let elements = collect_expressions(node, "element", grammar)?;
            Ok(MetaValue::Expression(sequence_of(elements)))
        }
        "primary" => {
            let mut result = expression(required(node, "expression")?, grammar)?;
            if let Some(label) = optional(node, "name") {
                match value(label, grammar)? {
                    MetaValue::Label(name) => result = result.labeled(name),
                    other => return Err(unexpected(label, "label", &other)),
                }
            }
            // Applied last: `!"a"+` is a predicate over the repetition
            if let Some(operator) = optional(node, "operator") {
                match value(operator, grammar)? {
                    MetaValue::Prefix(prefix) => result = prefix.apply(result),
                    other => return Err(unexpected(operator, "prefix operator", &other)),
                }
            }
            Ok(MetaValue::Expression(result))
        }
        "suffixed" => {
            let mut result = expression(required(node, "expression")?, grammar)?;
            if let Some(operator) = optional(node, "operator") {
                match value(operator, grammar)? {
                    MetaValue::Suffix(suffix) => result = suffix.apply(result),
                    other => return Err(unexpected(operator, "suffix operator", &other)),
                }
            }
            Ok(MetaValue::Expression(result))
        }
        "atomic" | "terminal_symbol" => {
            let inner = node.child(0).ok_or_else(|| malformed(node, "an alternative"))?;
            value(inner, grammar)
        }
        "parenthesized" => {
            let inner = expression(required(node, "expression")?, grammar)?;
            Ok(MetaValue::Expression(inner))
        }
        "prefix" => match node.text() {
            "&" => Ok(MetaValue::Prefix(PrefixOperator::And)),
            "!" => Ok(MetaValue::Prefix(PrefixOperator::Not)),
            _ => Err(malformed(node, "`&` or `!`")),
        },
        "suffix" => match node.text() {
            "*" => Ok(MetaValue::Suffix(SuffixOperator::ZeroOrMore)),
            "+" => Ok(MetaValue::Suffix(SuffixOperator::OneOrMore)),
            "?" => Ok(MetaValue::Suffix(SuffixOperator::Optional)),
            _ => Err(malformed(node, "`*`, `+` or `?`")),
        },
        "label" => {
            let name = required(node, "name")?.text();
            Ok(MetaValue::Label(name.to_string()))
        }
        "nonterminal_symbol" => Ok(MetaValue::Expression(grammar.rule_reference(node.text()))),
        "double_quoted" | "single_quoted" => {
            let body = required(node, "body")?;
            let text = unescape_literal(body)?;
            Ok(MetaValue::Expression(Expression::Literal(text)))
        }
        "character_class" => {
            let body = required(node, "body")?;
            let items = CharacterClass::parse_items(body.text()).map_err(|source| {
                CompileError::InvalidCharacterClass {
                    source,
                    position: body.position(),
                }
            })?;
            let mut class = CharacterClass::new(items);
            if optional(node, "negated").is_some() {
                class = class.negated();
            }
            if optional(node, "flag").is_some() {
                class = class.case_insensitive();
            }
            Ok(MetaValue::Expression(Expression::CharacterClass(class)))
        }
        "anything_symbol" => Ok(MetaValue::Expression(Expression::AnyCharacter)),
        _ => Err(malformed(node, "a rule with a semantic value")),
    }
}

/// Compute a value that must be an expression
pub fn expression(node: SyntaxNode<'_>, grammar: &mut Grammar) -> Result<Expression, CompileError> {
    match value(node, grammar)? {
        MetaValue::Expression(expression) => Ok(expression),
        other => Err(unexpected(node, "expression", &other)),
    }
}

fn collect_expressions(
    node: SyntaxNode<'_>,
    label: &str,
    grammar: &mut Grammar,
) -> Result<Vec<Expression>, CompileError> {
    node.labeled_all(label)
        .into_iter()
        .map(|child| expression(child, grammar))
        .collect()
}

fn required<'t>(node: SyntaxNode<'t>, label: &str) -> Result<SyntaxNode<'t>, CompileError> {
    node.labeled(label)
        .ok_or_else(|| malformed(node, &format!("a match labeled {}", label)))
}

/// A labeled match that may be an unmatched optional
fn optional<'t>(node: SyntaxNode<'t>, label: &str) -> Option<SyntaxNode<'t>> {
    node.labeled(label).and_then(|found| found.present())
}

/// Decode the body of a quoted literal
fn unescape_literal(body: SyntaxNode<'_>) -> Result<String, CompileError> {
    let text = body.text();
    let mut out = String::with_capacity(text.len());
    let mut chars = text.char_indices();
    while let Some((offset, c)) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let escaped = match chars.next() {
            Some((_, escaped)) => escaped,
            None => '\\',
        };
        let decoded = match escaped {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            '\\' | '"' | '\'' => escaped,
            other => {
                return Err(CompileError::InvalidEscape {
                    escape: other,
                    position: body_position(body, offset),
                })
            }
        };
        out.push(decoded);
    }
    Ok(out)
}

fn body_position(body: SyntaxNode<'_>, offset: usize) -> crate::runtime::SourcePosition {
    let mut position = body.position();
    let prefix = &body.text()[..offset];
    match prefix.rfind('\n') {
        Some(newline) => {
            position.line += prefix.matches('\n').count();
            position.column = prefix[newline + 1..].chars().count() + 1;
        }
        None => position.column += prefix.chars().count(),
    }
    position.offset += offset;
    position
}

fn malformed(node: SyntaxNode<'_>, expected: &str) -> CompileError {
    CompileError::MalformedTree {
        rule: node.rule_name().unwrap_or("?").to_string(),
        message: format!("expected {}", expected),
        position: node.position(),
    }
}

fn unexpected(node: SyntaxNode<'_>, expected: &str, found: &MetaValue) -> CompileError {
    CompileError::MalformedTree {
        rule: node
            .rule_node()
            .and_then(|n| n.rule_name())
            .unwrap_or("?")
            .to_string(),
        message: format!("expected {}, found {}", expected, found.kind()),
        position: node.position(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::metagrammar_gen;
    use crate::runtime::char_class::ClassItem;

    fn parse_as(rule: &str, source: &str, grammar: &mut Grammar) -> MetaValue {
        let parser = metagrammar_gen::parser();
        let tree = parser.parse_rule(rule, source).unwrap();
        value(tree.root(), grammar).unwrap()
    }

    fn expr_as(rule: &str, source: &str) -> Expression {
        parse_as(rule, source, &mut Grammar::new())
            .into_expression()
            .unwrap()
    }

    #[test]
    fn test_terminal_quote_styles() {
        assert_eq!(expr_as("terminal_symbol", "'foo'"), Expression::literal("foo"));
        assert_eq!(expr_as("terminal_symbol", "\"foo\""), Expression::literal("foo"));
        assert_eq!(
            expr_as("terminal_symbol", r#""a\"b\\c\n""#),
            Expression::literal("a\"b\\c\n")
        );
    }

    #[test]
    fn test_invalid_escape() {
        let tree = metagrammar_gen::parser()
            .parse_rule("terminal_symbol", r#""a\qb""#)
            .unwrap();
        let err = value(tree.root(), &mut Grammar::new()).unwrap_err();
        match err {
            CompileError::InvalidEscape { escape, position } => {
                assert_eq!(escape, 'q');
                assert_eq!(position.offset, 2);
                assert_eq!(position.column, 3);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_character_class_flags() {
        let class = match expr_as("character_class", "[^a-c]i") {
            Expression::CharacterClass(class) => class,
            other => panic!("not a class: {}", other),
        };
        assert!(class.is_negated());
        assert!(class.is_case_insensitive());
        assert_eq!(class.items(), &[ClassItem::Range('a', 'c')]);
    }

    #[test]
    fn test_reversed_class_range() {
        let tree = metagrammar_gen::parser()
            .parse_rule("character_class", "[z-a]")
            .unwrap();
        let err = value(tree.root(), &mut Grammar::new()).unwrap_err();
        assert!(matches!(err, CompileError::InvalidCharacterClass { .. }));
    }

    #[test]
    fn test_label_and_prefix_order() {
        assert_eq!(
            expr_as("primary", "!x:foo*"),
            Expression::reference("foo")
                .zero_or_more()
                .labeled("x")
                .not_predicate()
        );
    }

    #[test]
    fn test_parenthesized_choice() {
        assert_eq!(
            expr_as("primary", "( 'a' / 'b' )+"),
            choice_of(vec![Expression::literal("a"), Expression::literal("b")]).one_or_more()
        );
    }

    #[test]
    fn test_rule_definition_fills_slot() {
        let mut grammar = Grammar::new();
        let defined = parse_as("rule_definition", "list = item ( ',' item )*", &mut grammar);
        assert_eq!(defined, MetaValue::Definition("list".into()));
        assert_eq!(
            grammar.rule_names().collect::<Vec<_>>(),
            vec!["list", "item"]
        );
        assert!(grammar.contains("list"));
        assert!(!grammar.contains("item"));
    }

    #[test]
    fn test_duplicate_definition() {
        let tree = metagrammar_gen::parser()
            .parse("a = 'x'\nb = 'y'\na = 'z'\n")
            .unwrap();
        let err = value(tree.root(), &mut Grammar::new()).unwrap_err();
        match err {
            CompileError::DuplicateRule { name, position } => {
                assert_eq!(name, "a");
                assert_eq!(position.line, 3);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_value_of_helper_rule_is_malformed() {
        let tree = metagrammar_gen::parser().parse_rule("space", "  ").unwrap();
        let err = value(tree.root(), &mut Grammar::new()).unwrap_err();
        assert!(matches!(err, CompileError::MalformedTree { ref rule, .. } if rule == "space"));
    }

    #[test]
    fn test_meta_value_display() {
        assert_eq!(MetaValue::Prefix(PrefixOperator::Not).to_string(), "!");
        assert_eq!(MetaValue::Label("x".into()).to_string(), "x:");
        assert_eq!(
            MetaValue::Expression(Expression::literal("a").optional()).to_string(),
            "\"a\"?"
        );
    }
}
