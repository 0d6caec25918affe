//! Grammar compiler
//!
//! Turns grammar source text into a validated [`Grammar`] by running the
//! metagrammar over it and computing the semantic value of the match.
//!
//! # Example
//!
//! ```
//! use bootpeg::compiler::GrammarCompiler;
//!
//! let compiler = GrammarCompiler::new();
//! let grammar = compiler
//!     .compile("number = digit+\ndigit = [0-9]\n")
//!     .unwrap();
//!
//! assert_eq!(grammar.root_name(), Some("number"));
//! assert!(grammar.parse("2024").is_ok());
//! ```

use super::codegen::GeneratedParser;
use super::metagrammar::{self, MetaValue, ROOT_RULE};
use super::metagrammar_gen;
use crate::runtime::{
    ClassError, Diagnostic, ExecutionEngine, Grammar, ParseError, ParseFailure, SourcePosition,
    UndefinedRuleError,
};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Logging macros - no-op when logging feature is disabled
#[cfg(not(feature = "logging"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

/// Logging macros - use log crate when logging feature is enabled
#[cfg(feature = "logging")]
macro_rules! log_debug {
    ($($arg:tt)*) => { log::debug!($($arg)*) };
}

#[cfg(feature = "logging")]
macro_rules! log_warn {
    ($($arg:tt)*) => { log::warn!($($arg)*) };
}

// ============================================================================
// Errors
// ============================================================================

/// Grammar source that does not match the metagrammar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// Furthest failure of the metagrammar parse
    pub failure: ParseFailure,
    /// The offending source line with a caret under the failure column
    pub excerpt: String,
}

impl SyntaxError {
    /// Build from a failed metagrammar parse of `source`
    pub fn new(source: &str, failure: ParseFailure) -> Self {
        let excerpt = failure.source_position().excerpt(source);
        Self { failure, excerpt }
    }

    /// Position of the furthest failure
    pub fn position(&self) -> SourcePosition {
        self.failure.source_position()
    }

    /// Tree-structured diagnostic for this error
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::from_failure(&self.failure, "syntax error in grammar source")
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "syntax error at line {}, column {}",
            self.failure.line, self.failure.column
        )?;
        match self.failure.expected.as_slice() {
            [] => {}
            [only] => write!(f, ": expected {}", only)?,
            many => write!(f, ": expected one of {}", many.join(", "))?,
        }
        write!(f, "\n{}", self.excerpt)
    }
}

impl std::error::Error for SyntaxError {}

/// Error raised while compiling grammar source
#[derive(Debug)]
pub enum CompileError {
    /// The source does not match the metagrammar
    Syntax(SyntaxError),

    /// Rule references that never get a definition
    UndefinedRule(UndefinedRuleError),

    /// A rule is defined twice
    DuplicateRule {
        /// Rule name
        name: String,
        /// Position of the second definition
        position: SourcePosition,
    },

    /// A character class body is not valid
    InvalidCharacterClass {
        /// What is wrong with the class
        source: ClassError,
        /// Position of the class body
        position: SourcePosition,
    },

    /// A quoted literal uses an unknown escape
    InvalidEscape {
        /// The character after the backslash
        escape: char,
        /// Position of the backslash
        position: SourcePosition,
    },

    /// The syntax tree does not have the shape the value construction expects
    ///
    /// Only happens with a metagrammar that names its rules or labels
    /// differently from the embedded one.
    MalformedTree {
        /// Rule being evaluated
        rule: String,
        /// What was wrong
        message: String,
        /// Where the match starts
        position: SourcePosition,
    },

    /// The source defines no rules, or the grammar has no root
    MissingRoot,

    /// Reading a grammar file failed
    Io {
        /// File that could not be read
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The engine aborted the parse (left recursion, limits, bad entry rule)
    Engine(ParseError),
}

impl CompileError {
    /// Turn a failed metagrammar parse of `source` into a compile error
    pub fn from_parse(source: &str, error: ParseError) -> Self {
        match error {
            ParseError::Failed(failure) => CompileError::Syntax(SyntaxError::new(source, failure)),
            other => CompileError::Engine(other),
        }
    }

    /// Source position the error refers to, if any
    pub fn position(&self) -> Option<SourcePosition> {
        match self {
            CompileError::Syntax(err) => Some(err.position()),
            CompileError::DuplicateRule { position, .. }
            | CompileError::InvalidCharacterClass { position, .. }
            | CompileError::InvalidEscape { position, .. }
            | CompileError::MalformedTree { position, .. } => Some(*position),
            _ => None,
        }
    }

    /// Tree-structured diagnostic for this error
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            CompileError::Syntax(err) => err.to_diagnostic(),
            CompileError::UndefinedRule(err) => {
                let mut diagnostic = Diagnostic::error("undefined rules");
                for name in &err.names {
                    diagnostic =
                        diagnostic.with_child(Diagnostic::note(format!("no definition for {}", name)));
                }
                diagnostic
            }
            CompileError::MalformedTree { rule, message, .. } => {
                self.located(Diagnostic::error(message.clone()).with_context(format!("rule {}", rule)))
            }
            other => other.located(Diagnostic::error(other.to_string())),
        }
    }

    fn located(&self, diagnostic: Diagnostic) -> Diagnostic {
        match self.position() {
            Some(position) => diagnostic.at(position),
            None => diagnostic,
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Syntax(err) => write!(f, "{}", err),
            CompileError::UndefinedRule(err) => write!(f, "{}", err),
            CompileError::DuplicateRule { name, position } => {
                write!(f, "rule {} is defined more than once (at {})", name, position)
            }
            CompileError::InvalidCharacterClass { source, position } => {
                write!(f, "invalid character class at {}: {}", position, source)
            }
            CompileError::InvalidEscape { escape, position } => {
                write!(f, "invalid escape \\{} at {}", escape, position)
            }
            CompileError::MalformedTree {
                rule,
                message,
                position,
            } => write!(f, "malformed {} match at {}: {}", rule, position, message),
            CompileError::MissingRoot => write!(f, "grammar defines no rules"),
            CompileError::Io { path, source } => {
                write!(f, "cannot read {}: {}", path.display(), source)
            }
            CompileError::Engine(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CompileError::Syntax(err) => Some(err),
            CompileError::UndefinedRule(err) => Some(err),
            CompileError::InvalidCharacterClass { source, .. } => Some(source),
            CompileError::Io { source, .. } => Some(source),
            CompileError::Engine(err) => Some(err),
            _ => None,
        }
    }
}

impl From<UndefinedRuleError> for CompileError {
    fn from(err: UndefinedRuleError) -> Self {
        CompileError::UndefinedRule(err)
    }
}

// ============================================================================
// Compiler
// ============================================================================

/// Compiles grammar source text with a metagrammar parser
#[derive(Debug, Clone)]
pub struct GrammarCompiler {
    metagrammar: GeneratedParser,
}

impl GrammarCompiler {
    /// Compiler backed by the embedded metagrammar
    pub fn new() -> Self {
        Self {
            metagrammar: metagrammar_gen::parser().clone(),
        }
    }

    /// Compiler backed by an already generated metagrammar parser
    pub fn from_parser(metagrammar: GeneratedParser) -> Self {
        Self { metagrammar }
    }

    /// Compiler backed by a metagrammar given as a grammar
    pub fn from_metagrammar(metagrammar: Grammar) -> Result<Self, CompileError> {
        Ok(Self::from_parser(super::codegen::generate(metagrammar)?))
    }

    /// Run the metagrammar on different execution primitives
    pub fn with_engine(mut self, engine: Arc<dyn ExecutionEngine>) -> Self {
        self.metagrammar = self.metagrammar.with_engine(engine);
        self
    }

    /// The metagrammar this compiler parses with
    pub fn metagrammar(&self) -> &Grammar {
        self.metagrammar.grammar()
    }

    /// The generated metagrammar parser
    pub fn parser(&self) -> &GeneratedParser {
        &self.metagrammar
    }

    /// Execution primitives the metagrammar runs on
    pub fn engine(&self) -> Arc<dyn ExecutionEngine> {
        self.metagrammar.engine()
    }

    /// Compile grammar source into a validated grammar
    ///
    /// Nothing is returned unless the whole source parses, every rule value
    /// can be built and every rule reference resolves.
    pub fn compile(&self, source: &str) -> Result<Grammar, CompileError> {
        log_debug!(
            "compiling {} bytes of grammar source on {}",
            source.len(),
            self.metagrammar.engine_name()
        );

        let tree = self
            .metagrammar
            .parse_rule(ROOT_RULE, source)
            .map_err(|err| CompileError::from_parse(source, err))?;

        let mut grammar = Grammar::new();
        match metagrammar::value(tree.root(), &mut grammar)? {
            MetaValue::Grammar => {}
            other => {
                return Err(CompileError::MalformedTree {
                    rule: ROOT_RULE.to_string(),
                    message: format!("expected a grammar, found {}", other),
                    position: SourcePosition::start(),
                })
            }
        }
        grammar.validate()?;
        if grammar.root().is_none() {
            return Err(CompileError::MissingRoot);
        }

        #[cfg(feature = "logging")]
        for warning in grammar.analyze_warnings() {
            log_warn!("{}", warning);
        }
        log_debug!(
            "compiled grammar with {} rules, root {:?}",
            grammar.len(),
            grammar.root_name()
        );

        Ok(grammar)
    }

    /// Compile the grammar file at `path`
    ///
    /// The grammar is named after the file stem.
    pub fn compile_file(&self, path: impl AsRef<Path>) -> Result<Grammar, CompileError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| CompileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut grammar = self.compile(&source)?;
        if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
            grammar.set_name(stem);
        }
        Ok(grammar)
    }

    /// Parse `source` as a single metagrammar rule and return its value
    ///
    /// Rule slots and definitions are registered in `grammar`; no validation
    /// is done, so fragments may refer to rules defined elsewhere.
    ///
    /// ```
    /// use bootpeg::compiler::{GrammarCompiler, MetaValue};
    /// use bootpeg::runtime::{Expression, Grammar};
    ///
    /// let mut grammar = Grammar::new();
    /// let value = GrammarCompiler::new()
    ///     .compile_as("nonterminal_symbol", "expr", &mut grammar)
    ///     .unwrap();
    ///
    /// assert_eq!(value, MetaValue::Expression(Expression::reference("expr")));
    /// assert_eq!(grammar.len(), 1);
    /// ```
    pub fn compile_as(
        &self,
        rule: &str,
        source: &str,
        grammar: &mut Grammar,
    ) -> Result<MetaValue, CompileError> {
        let tree = self
            .metagrammar
            .parse_rule(rule, source)
            .map_err(|err| CompileError::from_parse(source, err))?;
        metagrammar::value(tree.root(), grammar)
    }
}

impl Default for GrammarCompiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Compile grammar source with the embedded metagrammar
pub fn compile(source: &str) -> Result<Grammar, CompileError> {
    GrammarCompiler::new().compile(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::expression::{choice_of, sequence_of};
    use crate::runtime::Expression;

    #[test]
    fn test_compile_simple_grammar() {
        let grammar = compile("greeting = 'hello' space name\nspace = ' '+\nname = [a-z]+\n")
            .unwrap();
        assert_eq!(grammar.root_name(), Some("greeting"));
        assert_eq!(
            grammar.get("greeting"),
            Some(&sequence_of(vec![
                Expression::literal("hello"),
                Expression::reference("space"),
                Expression::reference("name"),
            ]))
        );
        assert!(grammar.parse("hello  world").is_ok());
        assert!(grammar.parse("hello").is_err());
    }

    #[test]
    fn test_compile_multiline_choice_and_comments() {
        let source = "# values\nvalue = 'true'\n      / 'false'   # booleans\n\n# done\n";
        let grammar = compile(source).unwrap();
        assert_eq!(
            grammar.get("value"),
            Some(&choice_of(vec![
                Expression::literal("true"),
                Expression::literal("false"),
            ]))
        );
    }

    #[test]
    fn test_syntax_error_position() {
        let err = compile("a = 'x'\nb = [0-9").unwrap_err();
        match err {
            CompileError::Syntax(syntax) => {
                assert_eq!(syntax.failure.line, 2);
                assert!(syntax.excerpt.starts_with("b = [0-9"));
                assert!(syntax.to_string().starts_with("syntax error at line 2"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_undefined_rules_are_reported() {
        let err = compile("start = a b\na = 'a'\n").unwrap_err();
        match err {
            CompileError::UndefinedRule(undefined) => assert_eq!(undefined.names, vec!["b"]),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_empty_source_is_syntax_error() {
        assert!(matches!(compile(""), Err(CompileError::Syntax(_))));
        assert!(matches!(compile("# nothing\n"), Err(CompileError::Syntax(_))));
    }

    #[test]
    fn test_compile_as_is_idempotent() {
        let compiler = GrammarCompiler::new();
        let mut grammar = Grammar::new();
        let first = compiler
            .compile_as("nonterminal_symbol", "item", &mut grammar)
            .unwrap();
        let second = compiler
            .compile_as("nonterminal_symbol", "item", &mut grammar)
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(grammar.len(), 1);
        assert_eq!(grammar.rule_names().collect::<Vec<_>>(), vec!["item"]);
    }

    #[test]
    fn test_compile_as_unknown_rule() {
        let err = GrammarCompiler::new()
            .compile_as("no_such_rule", "x", &mut Grammar::new())
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::Engine(ParseError::UndefinedRule { .. })
        ));
    }

    #[test]
    fn test_compile_file_missing() {
        let err = GrammarCompiler::new()
            .compile_file("/nonexistent/grammar.peg")
            .unwrap_err();
        assert!(matches!(err, CompileError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/grammar.peg"));
    }

    #[test]
    fn test_diagnostic_for_duplicate_rule() {
        let source = "a = 'x'\na = 'y'\n";
        let err = compile(source).unwrap_err();
        let diagnostic = err.to_diagnostic();
        let rendered = diagnostic.format_with_source(source);
        assert!(rendered.starts_with("error at line 2, column 1:"));
        assert!(rendered.contains("defined more than once"));
    }
}
