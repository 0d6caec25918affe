//! Code generation
//!
//! Lowers a [`Grammar`] into an executable parser unit. Two forms exist:
//!
//! - [`generate`] produces a [`GeneratedParser`] in memory: the frozen rule
//!   table plus the execution primitives it delegates to, with one
//!   [`RuleEntry`] per rule.
//! - [`RustGenerator`] renders the same unit as Rust source that rebuilds
//!   the grammar with the [`parser_dsl`](crate::runtime::parser_dsl) and
//!   exposes `parse` plus one `parse_<rule>` function per rule.
//!
//! Both are deterministic: identical grammars give identical parsers and
//! byte-identical source.

use super::grammar_compiler::CompileError;
use crate::runtime::{
    ClassItem, ExecutionEngine, Expression, ExpressionCounter, Grammar, PackratEngine, ParseError,
    ParserConfig, SyntaxTree,
};
use std::fmt::{self, Write};
use std::sync::Arc;

// ============================================================================
// In-memory parser units
// ============================================================================

/// Validate `grammar` and freeze it into a parser unit on the packrat engine
///
/// # Example
///
/// ```
/// use bootpeg::compiler::{compile, generate};
///
/// let grammar = compile("list = item (',' item)*\nitem = [a-z]+\n").unwrap();
/// let parser = generate(grammar).unwrap();
///
/// assert!(parser.parse("a,bc,d").is_ok());
/// assert!(parser.entry("item").unwrap().parse("abc").is_ok());
/// ```
pub fn generate(grammar: Grammar) -> Result<GeneratedParser, CompileError> {
    grammar.validate()?;
    if grammar.root().is_none() {
        return Err(CompileError::MissingRoot);
    }
    Ok(GeneratedParser::unchecked(grammar))
}

/// An executable parser for one grammar
///
/// Cloning is cheap: the grammar and the engine are shared.
#[derive(Clone)]
pub struct GeneratedParser {
    grammar: Arc<Grammar>,
    engine: Arc<dyn ExecutionEngine>,
    config: ParserConfig,
}

impl GeneratedParser {
    /// Wrap a grammar without validating it
    ///
    /// Used by rendered parser sources, whose grammar was validated when the
    /// source was generated.
    pub fn unchecked(grammar: Grammar) -> Self {
        Self {
            grammar: Arc::new(grammar),
            engine: Arc::new(PackratEngine),
            config: ParserConfig::default(),
        }
    }

    /// Delegate to different execution primitives
    pub fn with_engine(mut self, engine: Arc<dyn ExecutionEngine>) -> Self {
        self.engine = engine;
        self
    }

    /// Use a custom parser configuration
    pub fn with_config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    /// The frozen grammar
    #[inline]
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// The execution primitives this unit delegates to
    pub fn engine(&self) -> Arc<dyn ExecutionEngine> {
        Arc::clone(&self.engine)
    }

    /// Name of the execution engine
    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Parser configuration
    #[inline]
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse `input` from the root rule
    pub fn parse<'a>(&'a self, input: &'a str) -> Result<SyntaxTree<'a>, ParseError> {
        let root = self.grammar.root_name().ok_or(ParseError::NoRootRule)?;
        self.parse_rule(root, input)
    }

    /// Parse `input` from the rule called `rule`
    pub fn parse_rule<'a>(
        &'a self,
        rule: &str,
        input: &'a str,
    ) -> Result<SyntaxTree<'a>, ParseError> {
        self.engine
            .parse_rule(&self.grammar, rule, input, 0, self.config)
    }

    /// Entry point for the rule called `rule`
    pub fn entry(&self, rule: &str) -> Option<RuleEntry<'_>> {
        let id = self.grammar.rule_id(rule)?;
        let name = self.grammar.rule(id)?.name.as_str();
        Some(RuleEntry { parser: self, name })
    }

    /// Entry points of every rule, in grammar order
    pub fn entries(&self) -> impl Iterator<Item = RuleEntry<'_>> {
        self.grammar
            .rule_names()
            .map(move |name| RuleEntry { parser: self, name })
    }

    /// Names of all rules, in grammar order
    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.grammar.rule_names()
    }
}

impl fmt::Debug for GeneratedParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedParser")
            .field("grammar", &self.grammar.name())
            .field("root", &self.grammar.root_name())
            .field("rules", &self.grammar.len())
            .field("engine", &self.engine.name())
            .finish()
    }
}

/// Entry point of one rule of a [`GeneratedParser`]
#[derive(Clone, Copy)]
pub struct RuleEntry<'p> {
    parser: &'p GeneratedParser,
    name: &'p str,
}

impl<'p> RuleEntry<'p> {
    /// Rule name
    #[inline]
    pub fn name(&self) -> &'p str {
        self.name
    }

    /// Parse `input` from this rule
    pub fn parse<'a>(&self, input: &'a str) -> Result<SyntaxTree<'a>, ParseError>
    where
        'p: 'a,
    {
        self.parse_at(input, 0)
    }

    /// Parse `input` from this rule, starting at byte offset `start`
    pub fn parse_at<'a>(&self, input: &'a str, start: usize) -> Result<SyntaxTree<'a>, ParseError>
    where
        'p: 'a,
    {
        let parser: &'a GeneratedParser = self.parser;
        parser
            .engine
            .parse_rule(&parser.grammar, self.name, input, start, parser.config)
    }
}

impl fmt::Debug for RuleEntry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleEntry").field("name", &self.name).finish()
    }
}

// ============================================================================
// Rust source rendering
// ============================================================================

/// Renders grammars as Rust parser modules
///
/// # Example
///
/// ```
/// use bootpeg::compiler::{compile, RustGenerator};
///
/// let grammar = compile("word = [a-z]+\n").unwrap();
/// let source = RustGenerator::new().render(&grammar);
///
/// assert!(source.contains("pub fn parse_word(input: &str)"));
/// assert_eq!(source, RustGenerator::new().render(&grammar));
/// ```
#[derive(Debug, Clone)]
pub struct RustGenerator {
    crate_path: String,
    header: Option<String>,
}

impl RustGenerator {
    /// Generator for modules outside this crate
    pub fn new() -> Self {
        Self {
            crate_path: "bootpeg".to_string(),
            header: None,
        }
    }

    /// Path used to reach this crate from the generated module
    ///
    /// `"crate"` renders a module that lives inside this crate.
    pub fn with_crate_path(mut self, path: &str) -> Self {
        self.crate_path = path.to_string();
        self
    }

    /// Replace the module doc comment (one `//!` line per input line)
    pub fn with_header(mut self, header: &str) -> Self {
        self.header = Some(header.to_string());
        self
    }

    /// Render `grammar` as a Rust module
    pub fn render(&self, grammar: &Grammar) -> String {
        let mut out = String::new();
        // Writing into a String never fails
        let _ = self.write_to(&mut out, grammar);
        out
    }

    /// Write `grammar` as a Rust module into `out`
    pub fn write_to<W: Write>(&self, out: &mut W, grammar: &Grammar) -> fmt::Result {
        let krate = &self.crate_path;

        let header = self.header.clone().unwrap_or_else(|| match grammar.name() {
            Some(name) => format!("Parser for the `{}` grammar\n\nGenerated by bootpeg. Do not edit.", name),
            None => "Generated parser\n\nGenerated by bootpeg. Do not edit.".to_string(),
        });
        for line in header.lines() {
            if line.is_empty() {
                out.write_str("//!\n")?;
            } else {
                writeln!(out, "//! {}", line)?;
            }
        }
        out.write_char('\n')?;

        writeln!(out, "use {}::compiler::GeneratedParser;", krate)?;
        writeln!(out, "use {}::runtime::parser_dsl::*;", krate)?;
        let runtime_types = if uses_classes(grammar) {
            "CharacterClass, ClassItem, Grammar, ParseError, SyntaxTree"
        } else {
            "Grammar, ParseError, SyntaxTree"
        };
        writeln!(out, "use {}::runtime::{{{}}};", krate, runtime_types)?;
        out.write_str("use std::sync::OnceLock;\n\n")?;

        out.write_str("/// Build the grammar\n")?;
        out.write_str("pub fn grammar() -> Grammar {\n")?;
        match grammar.name() {
            Some(name) => writeln!(out, "    let mut grammar = Grammar::named({:?});", name)?,
            None => out.write_str("    let mut grammar = Grammar::new();\n")?,
        }
        for rule in grammar.rules() {
            match &rule.expression {
                Some(expression) => writeln!(
                    out,
                    "    grammar.add_rule({:?}, {});",
                    rule.name,
                    render_expression(expression)
                )?,
                None => writeln!(out, "    grammar.install_rule({:?});", rule.name)?,
            }
        }
        if let Some(root) = grammar.root_name() {
            writeln!(out, "    grammar.set_root({:?});", root)?;
        }
        out.write_str("    grammar\n}\n\n")?;

        out.write_str("/// Shared parser instance\n")?;
        out.write_str("pub fn parser() -> &'static GeneratedParser {\n")?;
        out.write_str("    static PARSER: OnceLock<GeneratedParser> = OnceLock::new();\n")?;
        out.write_str("    PARSER.get_or_init(|| GeneratedParser::unchecked(grammar()))\n}\n\n")?;

        out.write_str("/// Parse `input` from the root rule\n")?;
        out.write_str("pub fn parse(input: &str) -> Result<SyntaxTree<'_>, ParseError> {\n")?;
        out.write_str("    parser().parse(input)\n}\n")?;

        for (rule, function) in entry_functions(grammar) {
            out.write_char('\n')?;
            writeln!(out, "/// Parse `input` from the `{}` rule", rule)?;
            writeln!(
                out,
                "pub fn {}(input: &str) -> Result<SyntaxTree<'_>, ParseError> {{",
                function
            )?;
            writeln!(out, "    parser().parse_rule({:?}, input)\n}}", rule)?;
        }

        Ok(())
    }
}

impl Default for RustGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Render one expression as DSL calls
pub fn render_expression(expression: &Expression) -> String {
    match expression {
        Expression::Literal(text) => format!("str({:?})", text),
        Expression::AnyCharacter => "any()".to_string(),
        Expression::RuleReference(name) => format!("ref_({:?})", name),
        Expression::CharacterClass(class) => {
            let items: Vec<String> = class
                .items()
                .iter()
                .map(|item| match *item {
                    ClassItem::Single(c) => format!("ClassItem::Single({:?})", c),
                    ClassItem::Range(lo, hi) => format!("ClassItem::Range({:?}, {:?})", lo, hi),
                })
                .collect();
            let mut out = format!("char_class(CharacterClass::new(vec![{}])", items.join(", "));
            if class.is_negated() {
                out.push_str(".negated()");
            }
            if class.is_case_insensitive() {
                out.push_str(".case_insensitive()");
            }
            out.push(')');
            out
        }
        Expression::Sequence(children) => format!("seq(vec![{}])", render_list(children)),
        Expression::OrderedChoice(children) => format!("choice(vec![{}])", render_list(children)),
        Expression::ZeroOrMore(inner) => format!("{}.many()", render_expression(inner)),
        Expression::OneOrMore(inner) => format!("{}.many1()", render_expression(inner)),
        Expression::Optional(inner) => format!("{}.optional()", render_expression(inner)),
        Expression::AndPredicate(inner) => format!("{}.lookahead()", render_expression(inner)),
        Expression::NotPredicate(inner) => format!("{}.not_ahead()", render_expression(inner)),
        Expression::Label(name, inner) => format!("{}.label({:?})", render_expression(inner), name),
    }
}

fn render_list(children: &[Expression]) -> String {
    children
        .iter()
        .map(render_expression)
        .collect::<Vec<_>>()
        .join(", ")
}

fn uses_classes(grammar: &Grammar) -> bool {
    let mut counter = ExpressionCounter::default();
    grammar.visit_expressions(&mut counter);
    counter.classes > 0
}

/// `parse_<rule>` function names, made unique after sanitizing
fn entry_functions(grammar: &Grammar) -> Vec<(&str, String)> {
    let mut taken: Vec<String> = Vec::new();
    let mut functions = Vec::new();
    for rule in grammar.rules().filter(|rule| rule.is_defined()) {
        let base: String = format!("parse_{}", rule.name)
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        let mut name = base.clone();
        let mut suffix = 2;
        while taken.contains(&name) {
            name = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        taken.push(name.clone());
        functions.push((rule.name.as_str(), name));
    }
    functions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use crate::runtime::parser_dsl::{ref_, str, GrammarBuilder};

    #[test]
    fn test_generate_rejects_undefined_rules() {
        let grammar = GrammarBuilder::new().rule("a", ref_("b")).build();
        assert!(matches!(
            generate(grammar),
            Err(CompileError::UndefinedRule(_))
        ));
    }

    #[test]
    fn test_generate_requires_root() {
        let mut grammar = Grammar::new();
        grammar.add_rule("a", str("a"));
        assert!(matches!(generate(grammar), Err(CompileError::MissingRoot)));
    }

    #[test]
    fn test_entries_cover_every_rule() {
        let grammar = compile("pair = key '=' value\nkey = [a-z]+\nvalue = [0-9]+\n").unwrap();
        let parser = generate(grammar).unwrap();

        let names: Vec<&str> = parser.entries().map(|entry| entry.name()).collect();
        assert_eq!(names, vec!["pair", "key", "value"]);

        assert!(parser.parse("x=1").is_ok());
        assert!(parser.entry("value").unwrap().parse("42").is_ok());
        assert!(parser.entry("value").unwrap().parse("x").is_err());
        assert!(parser.entry("missing").is_none());
    }

    #[test]
    fn test_parse_at_offset() {
        let grammar = compile("value = [0-9]+\n").unwrap();
        let parser = generate(grammar).unwrap();
        let tree = parser.entry("value").unwrap().parse_at("ab12", 2).unwrap();
        assert_eq!(tree.root().range(), 2..4);
    }

    #[test]
    fn test_render_expression_dsl() {
        let expression = compile("a = !'x' [^0-9]i? b:. ('y' / 'z')*\n")
            .unwrap()
            .get("a")
            .cloned()
            .unwrap();
        assert_eq!(
            render_expression(&expression),
            "seq(vec![str(\"x\").not_ahead(), \
             char_class(CharacterClass::new(vec![ClassItem::Range('0', '9')]).negated().case_insensitive()).optional(), \
             any().label(\"b\"), \
             choice(vec![str(\"y\"), str(\"z\")]).many()])"
        );
    }

    #[test]
    fn test_render_is_deterministic() {
        let grammar = compile("list = item+\nitem = 'a' / 'b'\n").unwrap();
        let first = RustGenerator::new().render(&grammar);
        let second = RustGenerator::new().render(&grammar.clone());
        assert_eq!(first, second);
        assert!(first.contains("    grammar.add_rule(\"list\", ref_(\"item\").many1());\n"));
        assert!(first.contains("    grammar.set_root(\"list\");\n"));
        assert!(first.contains("pub fn parse_item(input: &str)"));
        assert!(!first.contains("ClassItem"));
    }

    #[test]
    fn test_render_crate_path_and_header() {
        let grammar = compile("x = 'x'\n").unwrap();
        let source = RustGenerator::new()
            .with_crate_path("crate")
            .with_header("Custom header\n\nSecond paragraph")
            .render(&grammar);
        assert!(source.starts_with("//! Custom header\n//!\n//! Second paragraph\n\n"));
        assert!(source.contains("use crate::compiler::GeneratedParser;\n"));
    }

    /// Sink that accepts `limit` bytes and then fails
    struct LimitedSink {
        written: String,
        limit: usize,
    }

    impl Write for LimitedSink {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            if self.written.len() + s.len() > self.limit {
                return Err(fmt::Error);
            }
            self.written.push_str(s);
            Ok(())
        }
    }

    #[test]
    fn test_write_to_matches_render() {
        let grammar = compile("list = item+\nitem = [a-z]\n").unwrap();
        let generator = RustGenerator::new();
        let mut out = String::new();
        generator.write_to(&mut out, &grammar).unwrap();
        assert_eq!(out, generator.render(&grammar));
    }

    #[test]
    fn test_write_to_propagates_sink_errors() {
        let grammar = compile("list = item+\nitem = [a-z]\n").unwrap();
        let mut sink = LimitedSink {
            written: String::new(),
            limit: 64,
        };
        assert!(RustGenerator::new().write_to(&mut sink, &grammar).is_err());
        assert!(sink.written.len() <= 64);
    }

    #[test]
    fn test_entry_function_names_are_unique() {
        let mut grammar = Grammar::new();
        grammar.add_rule("a-b", str("1"));
        grammar.add_rule("a_b", str("2"));
        grammar.set_root("a-b");
        let functions = entry_functions(&grammar);
        assert_eq!(functions[0].1, "parse_a_b");
        assert_eq!(functions[1].1, "parse_a_b_2");
    }

    #[test]
    fn test_custom_engine_is_used() {
        struct Refusing;
        impl ExecutionEngine for Refusing {
            fn name(&self) -> &str {
                "refusing"
            }
            fn parse_rule<'a>(
                &self,
                _grammar: &'a Grammar,
                _rule: &str,
                _input: &'a str,
                _start: usize,
                _config: ParserConfig,
            ) -> Result<SyntaxTree<'a>, ParseError> {
                Err(ParseError::NoRootRule)
            }
        }

        let grammar = compile("x = 'x'\n").unwrap();
        let parser = generate(grammar).unwrap().with_engine(Arc::new(Refusing));
        assert_eq!(parser.engine_name(), "refusing");
        assert_eq!(parser.parse("x").unwrap_err(), ParseError::NoRootRule);
    }
}
