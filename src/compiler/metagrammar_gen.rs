//! Metagrammar parser
//!
//! Rendering of `grammars/metagrammar.peg` in the format of
//! `RustGenerator::with_crate_path("crate")`. This is the trusted build that
//! compiles grammar source, the metagrammar source included; regenerate it
//! with `bootpeg bootstrap -o src/compiler/metagrammar_gen.rs`.

use crate::compiler::GeneratedParser;
use crate::runtime::parser_dsl::*;
use crate::runtime::{CharacterClass, ClassItem, Grammar, ParseError, SyntaxTree};
use std::sync::OnceLock;

/// Build the grammar
pub fn grammar() -> Grammar {
    let mut grammar = Grammar::new();
    grammar.add_rule("grammar", seq(vec![ref_("gap").optional(), ref_("rule_definition").label("definition"), seq(vec![ref_("gap"), ref_("rule_definition").label("definition")]).many(), ref_("gap").optional()]));
    grammar.add_rule("rule_definition", seq(vec![ref_("identifier").label("name"), ref_("space").optional(), str("="), ref_("space").optional(), ref_("choice").label("expression")]));
    grammar.add_rule("choice", seq(vec![ref_("sequence").label("alternative"), seq(vec![ref_("space").optional(), str("/"), ref_("space").optional(), ref_("sequence").label("alternative")]).many()]));
    grammar.add_rule("sequence", seq(vec![ref_("primary").label("element"), seq(vec![ref_("space"), ref_("rule_head").not_ahead(), ref_("primary").label("element")]).many()]));
    grammar.add_rule("primary", seq(vec![ref_("prefix").optional().label("operator"), ref_("label").optional().label("name"), ref_("suffixed").label("expression")]));
    grammar.add_rule("suffixed", seq(vec![ref_("atomic").label("expression"), ref_("suffix").optional().label("operator")]));
    grammar.add_rule("atomic", choice(vec![ref_("terminal_symbol"), ref_("character_class"), ref_("anything_symbol"), ref_("parenthesized"), ref_("nonterminal_symbol")]));
    grammar.add_rule("parenthesized", seq(vec![str("("), ref_("space").optional(), ref_("choice").label("expression"), ref_("space").optional(), str(")")]));
    grammar.add_rule("prefix", choice(vec![str("&"), str("!")]));
    grammar.add_rule("suffix", choice(vec![str("*"), str("+"), str("?")]));
    grammar.add_rule("label", seq(vec![ref_("identifier").label("name"), str(":")]));
    grammar.add_rule("rule_head", seq(vec![ref_("identifier"), ref_("space").optional(), str("=")]));
    grammar.add_rule("nonterminal_symbol", ref_("identifier"));
    grammar.add_rule("identifier", seq(vec![char_class(CharacterClass::new(vec![ClassItem::Range('a', 'z'), ClassItem::Range('A', 'Z'), ClassItem::Single('_')])), char_class(CharacterClass::new(vec![ClassItem::Range('a', 'z'), ClassItem::Range('A', 'Z'), ClassItem::Range('0', '9'), ClassItem::Single('_')])).many()]));
    grammar.add_rule("terminal_symbol", choice(vec![ref_("double_quoted"), ref_("single_quoted")]));
    grammar.add_rule("double_quoted", seq(vec![str("\""), choice(vec![ref_("escape"), seq(vec![str("\"").not_ahead(), any()])]).many().label("body"), str("\"")]));
    grammar.add_rule("single_quoted", seq(vec![str("'"), choice(vec![ref_("escape"), seq(vec![str("'").not_ahead(), any()])]).many().label("body"), str("'")]));
    grammar.add_rule("escape", seq(vec![str("\\"), any()]));
    grammar.add_rule("character_class", seq(vec![str("["), str("^").optional().label("negated"), choice(vec![ref_("escape"), seq(vec![str("]").not_ahead(), any()])]).many1().label("body"), str("]"), str("i").optional().label("flag")]));
    grammar.add_rule("anything_symbol", str("."));
    grammar.add_rule("space", char_class(CharacterClass::new(vec![ClassItem::Single(' '), ClassItem::Single('\t'), ClassItem::Single('\n')])).many1());
    grammar.add_rule("gap", choice(vec![ref_("space"), ref_("comment")]).many1());
    grammar.add_rule("comment", seq(vec![str("#"), seq(vec![str("\n").not_ahead(), any()]).many()]));
    grammar.set_root("grammar");
    grammar
}

/// Shared parser instance
pub fn parser() -> &'static GeneratedParser {
    static PARSER: OnceLock<GeneratedParser> = OnceLock::new();
    PARSER.get_or_init(|| GeneratedParser::unchecked(grammar()))
}

/// Parse `input` from the root rule
pub fn parse(input: &str) -> Result<SyntaxTree<'_>, ParseError> {
    parser().parse(input)
}

/// Parse `input` from the `grammar` rule
pub fn parse_grammar(input: &str) -> Result<SyntaxTree<'_>, ParseError> {
    parser().parse_rule("grammar", input)
}

/// Parse `input` from the `rule_definition` rule
pub fn parse_rule_definition(input: &str) -> Result<SyntaxTree<'_>, ParseError> {
    parser().parse_rule("rule_definition", input)
}

/// Parse `input` from the `choice` rule
pub fn parse_choice(input: &str) -> Result<SyntaxTree<'_>, ParseError> {
    parser().parse_rule("choice", input)
}

/// Parse `input` from the `sequence` rule
pub fn parse_sequence(input: &str) -> Result<SyntaxTree<'_>, ParseError> {
    parser().parse_rule("sequence", input)
}

/// Parse `input` from the `primary` rule
pub fn parse_primary(input: &str) -> Result<SyntaxTree<'_>, ParseError> {
    parser().parse_rule("primary", input)
}

/// Parse `input` from the `suffixed` rule
pub fn parse_suffixed(input: &str) -> Result<SyntaxTree<'_>, ParseError> {
    parser().parse_rule("suffixed", input)
}

/// Parse `input` from the `atomic` rule
pub fn parse_atomic(input: &str) -> Result<SyntaxTree<'_>, ParseError> {
    parser().parse_rule("atomic", input)
}

/// Parse `input` from the `parenthesized` rule
pub fn parse_parenthesized(input: &str) -> Result<SyntaxTree<'_>, ParseError> {
    parser().parse_rule("parenthesized", input)
}

/// Parse `input` from the `prefix` rule
pub fn parse_prefix(input: &str) -> Result<SyntaxTree<'_>, ParseError> {
    parser().parse_rule("prefix", input)
}

/// Parse `input` from the `suffix` rule
pub fn parse_suffix(input: &str) -> Result<SyntaxTree<'_>, ParseError> {
    parser().parse_rule("suffix", input)
}

/// Parse `input` from the `label` rule
pub fn parse_label(input: &str) -> Result<SyntaxTree<'_>, ParseError> {
    parser().parse_rule("label", input)
}

/// Parse `input` from the `rule_head` rule
pub fn parse_rule_head(input: &str) -> Result<SyntaxTree<'_>, ParseError> {
    parser().parse_rule("rule_head", input)
}

/// Parse `input` from the `nonterminal_symbol` rule
pub fn parse_nonterminal_symbol(input: &str) -> Result<SyntaxTree<'_>, ParseError> {
    parser().parse_rule("nonterminal_symbol", input)
}

/// Parse `input` from the `identifier` rule
pub fn parse_identifier(input: &str) -> Result<SyntaxTree<'_>, ParseError> {
    parser().parse_rule("identifier", input)
}

/// Parse `input` from the `terminal_symbol` rule
pub fn parse_terminal_symbol(input: &str) -> Result<SyntaxTree<'_>, ParseError> {
    parser().parse_rule("terminal_symbol", input)
}

/// Parse `input` from the `double_quoted` rule
pub fn parse_double_quoted(input: &str) -> Result<SyntaxTree<'_>, ParseError> {
    parser().parse_rule("double_quoted", input)
}

/// Parse `input` from the `single_quoted` rule
pub fn parse_single_quoted(input: &str) -> Result<SyntaxTree<'_>, ParseError> {
    parser().parse_rule("single_quoted", input)
}

/// Parse `input` from the `escape` rule
pub fn parse_escape(input: &str) -> Result<SyntaxTree<'_>, ParseError> {
    parser().parse_rule("escape", input)
}

/// Parse `input` from the `character_class` rule
pub fn parse_character_class(input: &str) -> Result<SyntaxTree<'_>, ParseError> {
    parser().parse_rule("character_class", input)
}

/// Parse `input` from the `anything_symbol` rule
pub fn parse_anything_symbol(input: &str) -> Result<SyntaxTree<'_>, ParseError> {
    parser().parse_rule("anything_symbol", input)
}

/// Parse `input` from the `space` rule
pub fn parse_space(input: &str) -> Result<SyntaxTree<'_>, ParseError> {
    parser().parse_rule("space", input)
}

/// Parse `input` from the `gap` rule
pub fn parse_gap(input: &str) -> Result<SyntaxTree<'_>, ParseError> {
    parser().parse_rule("gap", input)
}

/// Parse `input` from the `comment` rule
pub fn parse_comment(input: &str) -> Result<SyntaxTree<'_>, ParseError> {
    parser().parse_rule("comment", input)
}
