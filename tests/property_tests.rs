//! Property-based tests using proptest
//!
//! These tests generate grammars and inputs to check that rendering,
//! compiling and parsing agree with each other.

use bootpeg::compiler::compile;
use bootpeg::runtime::{CharacterClass, ClassItem, Expression, Grammar, ParseError};
use proptest::prelude::*;

const RULES: usize = 3;

// ============================================================================
// Strategies
// ============================================================================

fn class_char() -> impl Strategy<Value = char> {
    prop::sample::select(vec![
        'a', 'k', 'z', 'A', 'Q', '0', '7', ' ', '\t', '\n', '^', '-', ']', '[', '\\', '_', '\u{e9}',
    ])
}

fn class_item() -> impl Strategy<Value = ClassItem> {
    prop_oneof![
        class_char().prop_map(ClassItem::Single),
        (class_char(), class_char()).prop_map(|(a, b)| ClassItem::Range(a.min(b), a.max(b))),
    ]
}

fn character_class() -> impl Strategy<Value = Expression> {
    (prop::collection::vec(class_item(), 1..4), any::<bool>(), any::<bool>()).prop_map(
        |(items, negated, insensitive)| {
            let mut class = CharacterClass::new(items);
            if negated {
                class = class.negated();
            }
            if insensitive {
                class = class.case_insensitive();
            }
            Expression::CharacterClass(class)
        },
    )
}

fn leaf() -> impl Strategy<Value = Expression> {
    prop_oneof![
        "[a-z'\"\\\\ \t\n\u{e9}]{0,4}".prop_map(Expression::literal),
        character_class(),
        Just(Expression::AnyCharacter),
        (0..RULES).prop_map(|i| Expression::reference(format!("r{}", i))),
    ]
}

/// Expressions without single-element or empty composites
fn expression() -> impl Strategy<Value = Expression> {
    leaf().prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 2..4).prop_map(Expression::Sequence),
            prop::collection::vec(inner.clone(), 2..4).prop_map(Expression::OrderedChoice),
            inner.clone().prop_map(Expression::zero_or_more),
            inner.clone().prop_map(Expression::one_or_more),
            inner.clone().prop_map(Expression::optional),
            inner.clone().prop_map(Expression::and_predicate),
            inner.clone().prop_map(Expression::not_predicate),
            ("[a-z][a-z0-9_]{0,5}", inner).prop_map(|(name, e)| e.labeled(name)),
        ]
    })
}

fn grammar() -> impl Strategy<Value = Grammar> {
    prop::collection::vec(expression(), RULES).prop_map(|bodies| {
        let mut grammar = Grammar::new();
        for (i, body) in bodies.into_iter().enumerate() {
            grammar.add_rule(&format!("r{}", i), body);
        }
        grammar.set_root("r0");
        grammar
    })
}

// ============================================================================
// Rendering
// ============================================================================

proptest! {
    /// Grammar source rendered by Display compiles back to an equal grammar
    #[test]
    fn test_display_recompiles(grammar in grammar()) {
        let source = grammar.to_string();
        let compiled = compile(&source);
        prop_assert!(compiled.is_ok(), "{}\n{:?}", source, compiled.as_ref().err());
        prop_assert_eq!(compiled.unwrap(), grammar);
    }

    /// A single expression renders to text that compiles to itself
    #[test]
    fn test_expression_display_is_stable(body in expression()) {
        let mut grammar = Grammar::new();
        grammar.add_rule("start", body.clone());
        for i in 0..RULES {
            grammar.add_rule(&format!("r{}", i), Expression::literal("x"));
        }
        grammar.set_root("start");

        let compiled = compile(&grammar.to_string()).unwrap();
        prop_assert_eq!(compiled.get("start"), Some(&body));
    }
}

// ============================================================================
// Parsing
// ============================================================================

proptest! {
    /// A literal rule matches exactly its own text
    #[test]
    fn test_literal_matches_itself(text in "[a-z0-9 ]{0,12}", other in "[a-z0-9 ]{0,12}") {
        let mut grammar = Grammar::new();
        grammar.add_rule("start", Expression::literal(text.clone()));
        grammar.set_root("start");

        prop_assert!(grammar.parse(&text).is_ok());
        prop_assert_eq!(grammar.parse(&other).is_ok(), other == text);
    }

    /// Failures are reported inside the input and never abort the parse
    #[test]
    fn test_failure_position_within_input(input in "[0-9+*() ]{0,24}") {
        let grammar = compile(
            "sum = product (space? '+' space? product)*
             product = atom (space? '*' space? atom)*
             atom = [0-9]+ / '(' space? sum space? ')'
             space = ' '+",
        )
        .unwrap();

        match grammar.parse(&input) {
            Ok(tree) => prop_assert_eq!(tree.root().text(), input.as_str()),
            Err(ParseError::Failed(failure)) => {
                prop_assert!(failure.position <= input.len());
                prop_assert!(!failure.expected.is_empty());
            }
            Err(other) => prop_assert!(false, "fatal error {:?}", other),
        }
    }

    /// Negation flips membership for every character
    #[test]
    fn test_negated_class_complements(items in prop::collection::vec(class_item(), 1..4), c in any::<char>()) {
        let class = CharacterClass::new(items.clone());
        let negated = CharacterClass::new(items).negated();
        prop_assert_ne!(class.matches(c), negated.matches(c));
    }
}
