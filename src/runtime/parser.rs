//! Packrat Parser
//!
//! This module implements the execution engine that runs any [`Grammar`]
//! (the metagrammar included) against an input string. Every expression
//! variant is matched by the single exhaustive dispatch in
//! [`PackratParser::match_at`]; rule invocations are memoized per
//! `(rule, position)` in a [`MemoTable`] owned by the parser instance.

use super::{
    arena::{NodeId, SyntaxArena},
    ast::{MatchResult, NodeKind, ParseError, ParseFailure, ParseStats, SyntaxTree},
    cache::{MemoEntry, MemoTable},
    char_class::CharacterClass,
    debug::{ParseTrace, TraceAction, TraceEntry},
    expression::Expression,
    grammar::{Grammar, RuleId},
};

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

/// Default maximum input size: 100 MB
pub const DEFAULT_MAX_INPUT_SIZE: usize = 100 * 1024 * 1024;

/// Default maximum rule nesting depth
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 1000;

/// Expectation recorded when a top-level parse leaves input unconsumed
const END_OF_INPUT: &str = "end of input";

/// Parser configuration
///
/// # Example
///
/// ```
/// use bootpeg::runtime::ParserConfig;
///
/// let config = ParserConfig::new()
///     .with_max_recursion_depth(200)
///     .with_consume_all_input(false);
/// assert_eq!(config.max_recursion_depth, 200);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserConfig {
    /// Maximum input size in bytes
    pub max_input_size: usize,
    /// Maximum nesting of rule invocations
    pub max_recursion_depth: usize,
    /// Whether a top-level parse must consume the whole input
    pub consume_all_input: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_input_size: DEFAULT_MAX_INPUT_SIZE,
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
            consume_all_input: true,
        }
    }
}

impl ParserConfig {
    /// Create a configuration with default limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum input size
    pub fn with_max_input_size(mut self, size: usize) -> Self {
        self.max_input_size = size;
        self
    }

    /// Set the maximum rule nesting depth
    pub fn with_max_recursion_depth(mut self, depth: usize) -> Self {
        self.max_recursion_depth = depth;
        self
    }

    /// Set whether top-level parses must consume all input
    pub fn with_consume_all_input(mut self, consume: bool) -> Self {
        self.consume_all_input = consume;
        self
    }
}

/// Memoizing recursive-descent parser for one input
///
/// A parser borrows the grammar and the input for its whole life and owns
/// the node arena and the memo table. Each top-level parse starts from an
/// empty memo table, so results never leak from one invocation into
/// another.
///
/// # Example
///
/// ```
/// use bootpeg::runtime::parser_dsl::{str, GrammarBuilder};
/// use bootpeg::runtime::PackratParser;
///
/// let grammar = GrammarBuilder::new()
///     .rule("greeting", str("hello").then(str(" world").optional()))
///     .build();
///
/// let mut parser = PackratParser::new(&grammar, "hello world");
/// let tree = parser.parse().unwrap();
/// assert_eq!(tree.root().text(), "hello world");
/// ```
pub struct PackratParser<'a> {
    grammar: &'a Grammar,
    input: &'a str,
    arena: SyntaxArena,
    memo: MemoTable,
    config: ParserConfig,
    depth: usize,
    furthest: usize,
    expected: Vec<String>,
    predicate_depth: usize,
    trace: Option<ParseTrace>,
}

impl<'a> PackratParser<'a> {
    /// Create a parser with default configuration
    pub fn new(grammar: &'a Grammar, input: &'a str) -> Self {
        Self::with_config(grammar, input, ParserConfig::default())
    }

    /// Create a parser with the given configuration
    pub fn with_config(grammar: &'a Grammar, input: &'a str, config: ParserConfig) -> Self {
        Self {
            grammar,
            input,
            arena: SyntaxArena::for_input(input.len()),
            memo: MemoTable::for_input(input.len(), grammar.len()),
            config,
            depth: 0,
            furthest: 0,
            expected: Vec::new(),
            predicate_depth: 0,
            trace: None,
        }
    }

    /// Record a trace of rule invocations
    pub fn with_trace(mut self) -> Self {
        self.trace = Some(ParseTrace::new());
        self
    }

    /// The recorded trace, if tracing is enabled
    pub fn trace(&self) -> Option<&ParseTrace> {
        self.trace.as_ref()
    }

    /// The grammar rule references resolve against
    #[inline]
    pub fn grammar(&self) -> &'a Grammar {
        self.grammar
    }

    /// The input being parsed
    #[inline]
    pub fn input(&self) -> &'a str {
        self.input
    }

    /// The active configuration
    #[inline]
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Memoization counters so far
    pub fn stats(&self) -> ParseStats {
        let (memo_hits, memo_misses, _) = self.memo.stats();
        ParseStats {
            memo_hits,
            memo_misses,
            nodes: self.arena.len(),
        }
    }

    /// Parse the whole input from the grammar's root rule
    pub fn parse(&mut self) -> Result<SyntaxTree<'a>, ParseError> {
        let grammar = self.grammar;
        let root = grammar.root_name().ok_or(ParseError::NoRootRule)?;
        self.parse_rule_at(root, 0)
    }

    /// Parse the whole input from the rule called `name`
    pub fn parse_rule(&mut self, name: &str) -> Result<SyntaxTree<'a>, ParseError> {
        self.parse_rule_at(name, 0)
    }

    /// Parse from the rule called `name`, starting at byte offset `start`
    ///
    /// With [`ParserConfig::consume_all_input`] set, a match that stops short
    /// of the end of input is reported as a failure expecting end of input.
    pub fn parse_rule_at(
        &mut self,
        name: &str,
        start: usize,
    ) -> Result<SyntaxTree<'a>, ParseError> {
        self.check_input_size()?;
        let id = self
            .grammar
            .rule_id(name)
            .ok_or_else(|| ParseError::UndefinedRule {
                name: name.to_string(),
            })?;
        self.reset(start);
        if !self.input.is_char_boundary(start) {
            return Err(ParseError::Failed(self.failure()));
        }

        log_debug!("parsing {} bytes from rule {} at {}", self.input.len(), name, start);

        match self.match_rule(id, start)? {
            MatchResult::Success { node, end } => {
                if self.config.consume_all_input && end < self.input.len() {
                    self.record_failure(end, || END_OF_INPUT.to_string());
                    return Err(ParseError::Failed(self.failure()));
                }
                Ok(self.take_tree(node))
            }
            MatchResult::Failure { .. } => Err(ParseError::Failed(self.failure())),
        }
    }

    /// Match a single expression at `start` with a fresh memo table
    ///
    /// Unlike the rule entry points this never requires the match to reach
    /// the end of input. On success the node can be turned into a tree with
    /// [`PackratParser::into_tree`].
    pub fn parse_expression(
        &mut self,
        expression: &Expression,
        start: usize,
    ) -> Result<MatchResult, ParseError> {
        self.check_input_size()?;
        self.reset(start);
        if !self.input.is_char_boundary(start) {
            return Ok(MatchResult::Failure { position: start });
        }
        self.match_at(expression, start)
    }

    /// Turn the node of a successful match into a tree
    pub fn into_tree(mut self, node: NodeId) -> SyntaxTree<'a> {
        self.take_tree(node)
    }

    /// The furthest failure recorded so far
    pub fn failure(&self) -> ParseFailure {
        ParseFailure::new(self.input, self.furthest, self.expected.clone())
    }

    /// Match `expression` at `position`
    ///
    /// This is the single dispatch point over expression variants.
    pub fn match_at(
        &mut self,
        expression: &Expression,
        position: usize,
    ) -> Result<MatchResult, ParseError> {
        let result = match expression {
            Expression::Literal(text) => self.match_literal(expression, text, position),

            Expression::CharacterClass(class) => self.match_class(expression, class, position),

            Expression::AnyCharacter => match self.input[position..].chars().next() {
                Some(c) => self.terminal(position, position + c.len_utf8()),
                None => self.fail(position, expression),
            },

            Expression::RuleReference(name) => {
                let id = self
                    .grammar
                    .rule_id(name)
                    .ok_or_else(|| ParseError::UndefinedRule { name: name.clone() })?;
                self.match_rule(id, position)?
            }

            Expression::Sequence(children) => {
                let mut nodes = Vec::with_capacity(children.len());
                let mut current = position;
                for child in children {
                    match self.match_at(child, current)? {
                        MatchResult::Success { node, end } => {
                            nodes.push(node);
                            current = end;
                        }
                        MatchResult::Failure { .. } => {
                            return Ok(MatchResult::Failure { position });
                        }
                    }
                }
                let node = self
                    .arena
                    .alloc(NodeKind::Sequence, position, current, &nodes);
                MatchResult::Success { node, end: current }
            }

            Expression::OrderedChoice(alternatives) => {
                for alternative in alternatives {
                    let result = self.match_at(alternative, position)?;
                    if result.is_success() {
                        return Ok(result);
                    }
                }
                MatchResult::Failure { position }
            }

            Expression::ZeroOrMore(inner) => self.match_repetition(inner, position, 0)?,

            Expression::OneOrMore(inner) => self.match_repetition(inner, position, 1)?,

            Expression::Optional(inner) => match self.match_at(inner, position)? {
                MatchResult::Success { node, end } => {
                    let node = self
                        .arena
                        .alloc(NodeKind::Optional, position, end, &[node]);
                    MatchResult::Success { node, end }
                }
                MatchResult::Failure { .. } => MatchResult::Success {
                    node: self.arena.leaf(NodeKind::Optional, position, position),
                    end: position,
                },
            },

            Expression::AndPredicate(inner) => {
                if self.match_predicate_operand(inner, position)? {
                    self.lookahead(position)
                } else {
                    self.record_failure(position, || inner.describe());
                    MatchResult::Failure { position }
                }
            }

            Expression::NotPredicate(inner) => {
                if self.match_predicate_operand(inner, position)? {
                    self.record_failure(position, || {
                        format!("anything except {}", inner.describe())
                    });
                    MatchResult::Failure { position }
                } else {
                    self.lookahead(position)
                }
            }

            Expression::Label(name, inner) => match self.match_at(inner, position)? {
                MatchResult::Success { node, end } => {
                    let label = self.arena.intern_label(name);
                    let node = self
                        .arena
                        .alloc(NodeKind::Label(label), position, end, &[node]);
                    MatchResult::Success { node, end }
                }
                failure => failure,
            },
        };
        Ok(result)
    }

    // ========================================================================
    // Rule invocation
    // ========================================================================

    fn match_rule(&mut self, id: RuleId, position: usize) -> Result<MatchResult, ParseError> {
        let grammar = self.grammar;
        let rule = grammar.rule(id).ok_or_else(|| ParseError::UndefinedRule {
            name: format!("#{}", id.index()),
        })?;

        match self.memo.lookup(id, position) {
            Some(MemoEntry::InProgress) => {
                return Err(ParseError::LeftRecursion {
                    rule: rule.name.clone(),
                    position,
                });
            }
            Some(MemoEntry::Success { node, end }) => {
                self.trace_event(id, position, TraceAction::CacheHit);
                return Ok(MatchResult::Success { node, end });
            }
            Some(MemoEntry::Failure) => {
                self.trace_event(id, position, TraceAction::CacheHit);
                return Ok(MatchResult::Failure { position });
            }
            None => {}
        }

        let expression = rule
            .expression
            .as_ref()
            .ok_or_else(|| ParseError::UndefinedRule {
                name: rule.name.clone(),
            })?;

        if self.depth >= self.config.max_recursion_depth {
            return Err(ParseError::RecursionLimitExceeded {
                depth: self.depth + 1,
                max_depth: self.config.max_recursion_depth,
            });
        }

        self.trace_event(id, position, TraceAction::Enter);
        self.memo.begin(id, position);
        self.depth += 1;
        let result = self.match_at(expression, position);
        self.depth -= 1;

        match result? {
            MatchResult::Success { node, end } => {
                let node = self
                    .arena
                    .alloc(NodeKind::Rule(id), position, end, &[node]);
                // Matches inside lookahead recorded none of their inner
                // failures, so a later hit outside it would lose them
                if self.predicate_depth == 0 {
                    self.memo.store(id, position, MemoEntry::Success { node, end });
                } else {
                    self.memo.forget(id, position);
                }
                self.trace_event(
                    id,
                    position,
                    TraceAction::Match {
                        length: end - position,
                    },
                );
                Ok(MatchResult::Success { node, end })
            }
            MatchResult::Failure { .. } => {
                if self.predicate_depth == 0 {
                    self.memo.store(id, position, MemoEntry::Failure);
                } else {
                    self.memo.forget(id, position);
                }
                self.trace_event(id, position, TraceAction::Fail);
                Ok(MatchResult::Failure { position })
            }
        }
    }

    // ========================================================================
    // Terminals and composites
    // ========================================================================

    #[inline]
    fn match_literal(
        &mut self,
        expression: &Expression,
        text: &str,
        position: usize,
    ) -> MatchResult {
        if self.input.as_bytes()[position..].starts_with(text.as_bytes()) {
            self.terminal(position, position + text.len())
        } else {
            self.fail(position, expression)
        }
    }

    #[inline]
    fn match_class(
        &mut self,
        expression: &Expression,
        class: &CharacterClass,
        position: usize,
    ) -> MatchResult {
        match self.input[position..].chars().next() {
            Some(c) if class.matches(c) => self.terminal(position, position + c.len_utf8()),
            _ => self.fail(position, expression),
        }
    }

    fn match_repetition(
        &mut self,
        inner: &Expression,
        position: usize,
        min: usize,
    ) -> Result<MatchResult, ParseError> {
        let mut nodes = Vec::new();
        let mut current = position;
        while let MatchResult::Success { node, end } = self.match_at(inner, current)? {
            nodes.push(node);
            // A zero-width iteration would repeat forever
            if end == current {
                break;
            }
            current = end;
        }
        if nodes.len() < min {
            return Ok(MatchResult::Failure { position });
        }
        let node = self
            .arena
            .alloc(NodeKind::Repetition, position, current, &nodes);
        Ok(MatchResult::Success { node, end: current })
    }

    /// Match a predicate operand without recording expectations
    fn match_predicate_operand(
        &mut self,
        inner: &Expression,
        position: usize,
    ) -> Result<bool, ParseError> {
        self.predicate_depth += 1;
        let result = self.match_at(inner, position);
        self.predicate_depth -= 1;
        Ok(result?.is_success())
    }

    #[inline]
    fn lookahead(&mut self, position: usize) -> MatchResult {
        MatchResult::Success {
            node: self.arena.leaf(NodeKind::Predicate, position, position),
            end: position,
        }
    }

    #[inline]
    fn terminal(&mut self, start: usize, end: usize) -> MatchResult {
        MatchResult::Success {
            node: self.arena.leaf(NodeKind::Terminal, start, end),
            end,
        }
    }

    #[inline]
    fn fail(&mut self, position: usize, expression: &Expression) -> MatchResult {
        self.record_failure(position, || expression.describe());
        MatchResult::Failure { position }
    }

    // ========================================================================
    // Failure tracking
    // ========================================================================

    /// Record an expectation at `position` if it is at least as far as any so far
    fn record_failure<F: FnOnce() -> String>(&mut self, position: usize, describe: F) {
        if self.predicate_depth > 0 || position < self.furthest {
            return;
        }
        if position > self.furthest {
            self.furthest = position;
            self.expected.clear();
        }
        let description = describe();
        if !self.expected.contains(&description) {
            self.expected.push(description);
        }
    }

    fn check_input_size(&self) -> Result<(), ParseError> {
        if self.input.len() > self.config.max_input_size {
            return Err(ParseError::InputTooLarge {
                input_size: self.input.len(),
                max_size: self.config.max_input_size,
            });
        }
        Ok(())
    }

    fn reset(&mut self, start: usize) {
        self.arena.reset();
        self.memo.clear();
        self.depth = 0;
        self.predicate_depth = 0;
        self.furthest = start;
        self.expected.clear();
        if let Some(trace) = self.trace.as_mut() {
            trace.entries.clear();
        }
    }

    fn take_tree(&mut self, node: NodeId) -> SyntaxTree<'a> {
        let stats = self.stats();
        log_debug!(
            "parse succeeded: {} nodes, {} memo hits, {} misses",
            stats.nodes,
            stats.memo_hits,
            stats.memo_misses
        );
        let arena = std::mem::take(&mut self.arena);
        self.memo.clear();
        SyntaxTree::new(self.input, self.grammar, arena, node, stats)
    }

    #[inline]
    fn trace_event(&mut self, rule: RuleId, position: usize, action: TraceAction) {
        let depth = self.depth;
        if let Some(trace) = self.trace.as_mut() {
            trace.add(TraceEntry {
                position,
                rule,
                action,
                depth,
            });
        }
    }
}

// ============================================================================
// Execution engines
// ============================================================================

/// Execution primitives a parser unit delegates to
///
/// A generated parser holds its engine behind this trait so that a freshly
/// compiled parser can be bound to the primitives of another build.
pub trait ExecutionEngine: Send + Sync {
    /// Short name of the engine, used in diagnostics
    fn name(&self) -> &str;

    /// Parse `input` from the rule called `rule`, starting at `start`
    fn parse_rule<'a>(
        &self,
        grammar: &'a Grammar,
        rule: &str,
        input: &'a str,
        start: usize,
        config: ParserConfig,
    ) -> Result<SyntaxTree<'a>, ParseError>;
}

/// The memoizing engine of this crate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackratEngine;

impl ExecutionEngine for PackratEngine {
    fn name(&self) -> &str {
        "packrat"
    }

    fn parse_rule<'a>(
        &self,
        grammar: &'a Grammar,
        rule: &str,
        input: &'a str,
        start: usize,
        config: ParserConfig,
    ) -> Result<SyntaxTree<'a>, ParseError> {
        PackratParser::with_config(grammar, input, config).parse_rule_at(rule, start)
    }
}
