//! Syntax trees and parse results
//!
//! A successful parse produces a [`SyntaxTree`]: the arena of nodes built
//! during matching together with the input and grammar they refer to.
//! [`SyntaxNode`] is a cheap `Copy` handle into that tree.

use super::arena::{NodeId, SyntaxArena};
use super::grammar::{Grammar, RuleId};
use super::source_location::{SourcePosition, SourceSpan};
use super::transform::{Transform, TransformError, Value};
use std::fmt;

/// What a syntax node was produced by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Literal, character class or `.`
    Terminal,
    /// A rule invocation; the single child is the rule body
    Rule(RuleId),
    /// A sequence; one child per element
    Sequence,
    /// `*` or `+`; one child per iteration
    Repetition,
    /// `?`; zero or one child
    Optional,
    /// `&` or `!`; always zero-width and childless
    Predicate,
    /// `name:`; the single child is the labeled match (the label is interned in the arena)
    Label(u32),
}

/// Outcome of matching an expression at a position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    /// The expression matched, producing `node` and ending at `end`
    Success {
        /// Node for the match
        node: NodeId,
        /// Byte offset just past the match
        end: usize,
    },
    /// The expression did not match at `position`
    Failure {
        /// Byte offset where matching was attempted
        position: usize,
    },
}

impl MatchResult {
    /// Whether this is a success
    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, MatchResult::Success { .. })
    }

    /// End offset of a success
    #[inline]
    pub fn end(&self) -> Option<usize> {
        match self {
            MatchResult::Success { end, .. } => Some(*end),
            MatchResult::Failure { .. } => None,
        }
    }
}

/// The furthest point a failed parse reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    /// Byte offset of the furthest failure
    pub position: usize,
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based)
    pub column: usize,
    /// Descriptions of what would have allowed the parse to continue
    pub expected: Vec<String>,
}

impl ParseFailure {
    /// Build a failure at `position`, computing line and column from `input`
    pub fn new(input: &str, position: usize, expected: Vec<String>) -> Self {
        let pos = SourcePosition::from_offset(input, position);
        Self {
            position,
            line: pos.line,
            column: pos.column,
            expected,
        }
    }

    /// The failure position as a [`SourcePosition`]
    pub fn source_position(&self) -> SourcePosition {
        SourcePosition::new(self.position, self.line, self.column)
    }
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse failed at line {}, column {}", self.line, self.column)?;
        match self.expected.as_slice() {
            [] => Ok(()),
            [only] => write!(f, ": expected {}", only),
            many => write!(f, ": expected one of {}", many.join(", ")),
        }
    }
}

/// Parse error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The input does not match the grammar
    Failed(ParseFailure),

    /// A referenced rule has no definition
    UndefinedRule {
        /// Name of the rule
        name: String,
    },

    /// The grammar has no root rule
    NoRootRule,

    /// A rule was re-entered at the same position while still being matched
    LeftRecursion {
        /// Name of the rule
        rule: String,
        /// Byte offset of the re-entry
        position: usize,
    },

    /// Rule nesting exceeded the configured limit
    RecursionLimitExceeded {
        /// Current recursion depth
        depth: usize,
        /// Maximum allowed depth
        max_depth: usize,
    },

    /// Input exceeds maximum allowed size
    InputTooLarge {
        /// Size of the input in bytes
        input_size: usize,
        /// Maximum allowed size
        max_size: usize,
    },
}

impl ParseError {
    /// The failure report, if this is an ordinary mismatch
    pub fn failure(&self) -> Option<&ParseFailure> {
        match self {
            ParseError::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Whether this error aborted the parse rather than reporting a mismatch
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ParseError::Failed(_))
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Failed(failure) => write!(f, "{}", failure),
            ParseError::UndefinedRule { name } => write!(f, "undefined rule: {}", name),
            ParseError::NoRootRule => write!(f, "grammar has no root rule"),
            ParseError::LeftRecursion { rule, position } => write!(
                f,
                "left recursion: rule {} re-entered at offset {} without consuming input",
                rule, position
            ),
            ParseError::RecursionLimitExceeded { depth, max_depth } => write!(
                f,
                "recursion limit exceeded: depth {} exceeds limit of {}",
                depth, max_depth
            ),
            ParseError::InputTooLarge {
                input_size,
                max_size,
            } => write!(
                f,
                "input too large: {} bytes exceeds limit of {} bytes",
                input_size, max_size
            ),
        }
    }
}

impl std::error::Error for ParseError {}

/// Memoization counters of one parse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    /// Rule invocations answered from the memo table
    pub memo_hits: u64,
    /// Rule invocations that had to be matched
    pub memo_misses: u64,
    /// Nodes allocated in the arena (including those of abandoned branches)
    pub nodes: usize,
}

/// The result of a successful parse
pub struct SyntaxTree<'a> {
    input: &'a str,
    grammar: &'a Grammar,
    arena: SyntaxArena,
    root: NodeId,
    stats: ParseStats,
}

impl<'a> SyntaxTree<'a> {
    pub(crate) fn new(
        input: &'a str,
        grammar: &'a Grammar,
        arena: SyntaxArena,
        root: NodeId,
        stats: ParseStats,
    ) -> Self {
        Self {
            input,
            grammar,
            arena,
            root,
            stats,
        }
    }

    /// The root node
    #[inline]
    pub fn root(&self) -> SyntaxNode<'_> {
        SyntaxNode {
            tree: self,
            id: self.root,
        }
    }

    /// A node by id
    ///
    /// Returns `None` for ids that do not belong to this tree.
    pub fn node(&self, id: NodeId) -> Option<SyntaxNode<'_>> {
        (id.index() < self.arena.len()).then_some(SyntaxNode { tree: self, id })
    }

    /// The parsed input
    #[inline]
    pub fn input(&self) -> &'a str {
        self.input
    }

    /// The grammar the input was parsed with
    #[inline]
    pub fn grammar(&self) -> &'a Grammar {
        self.grammar
    }

    /// Memoization counters of the parse
    #[inline]
    pub fn stats(&self) -> ParseStats {
        self.stats
    }

    /// Semantic value of the root node
    pub fn value(&self) -> Value {
        self.root().value()
    }
}

impl fmt::Debug for SyntaxTree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntaxTree")
            .field("root", &self.root())
            .field("stats", &self.stats)
            .finish()
    }
}

/// Handle to one node of a [`SyntaxTree`]
#[derive(Clone, Copy)]
pub struct SyntaxNode<'t> {
    tree: &'t SyntaxTree<'t>,
    id: NodeId,
}

impl<'t> SyntaxNode<'t> {
    /// Node id within the tree
    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// What produced this node
    #[inline]
    pub fn kind(&self) -> NodeKind {
        self.tree.arena.kind(self.id)
    }

    /// Start byte offset
    #[inline]
    pub fn start(&self) -> usize {
        self.tree.arena.start(self.id)
    }

    /// End byte offset (exclusive)
    #[inline]
    pub fn end(&self) -> usize {
        self.tree.arena.end(self.id)
    }

    /// Byte range of the match
    #[inline]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start()..self.end()
    }

    /// Line/column span of the match
    pub fn span(&self) -> SourceSpan {
        SourceSpan::from_offsets(self.tree.input, self.start(), self.end())
    }

    /// Line/column position of the start of the match
    pub fn position(&self) -> SourcePosition {
        SourcePosition::from_offset(self.tree.input, self.start())
    }

    /// The matched text
    #[inline]
    pub fn text(&self) -> &'t str {
        &self.tree.input[self.start()..self.end()]
    }

    /// Whether the match consumed nothing
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start() == self.end()
    }

    /// Number of children
    #[inline]
    pub fn child_count(&self) -> usize {
        self.tree.arena.children(self.id).len()
    }

    /// Child by position
    pub fn child(&self, index: usize) -> Option<SyntaxNode<'t>> {
        let tree = self.tree;
        tree.arena
            .children(self.id)
            .get(index)
            .map(|&id| SyntaxNode { tree, id })
    }

    /// Children in match order
    pub fn children(&self) -> impl Iterator<Item = SyntaxNode<'t>> + 't {
        let tree = self.tree;
        tree.arena
            .children(self.id)
            .iter()
            .map(move |&id| SyntaxNode { tree, id })
    }

    /// Rule id if this is a rule node
    #[inline]
    pub fn rule_id(&self) -> Option<RuleId> {
        match self.kind() {
            NodeKind::Rule(id) => Some(id),
            _ => None,
        }
    }

    /// Rule name if this is a rule node
    pub fn rule_name(&self) -> Option<&'t str> {
        let grammar: &'t Grammar = self.tree.grammar;
        self.rule_id()
            .and_then(|id| grammar.rule(id))
            .map(|rule| rule.name.as_str())
    }

    /// Label name if this is a label node
    pub fn label(&self) -> Option<&'t str> {
        match self.kind() {
            NodeKind::Label(index) => Some(self.tree.arena.label(index)),
            _ => None,
        }
    }

    /// Find the match labeled `name` within this node
    ///
    /// The search is pre-order and stays inside the current rule: it does
    /// not look into nested rule invocations or into other labeled matches.
    /// Returns the labeled match itself, not the label node.
    pub fn labeled(&self, name: &str) -> Option<SyntaxNode<'t>> {
        let tree = self.tree;
        let mut stack: Vec<NodeId> = tree.arena.children(self.id).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            match tree.arena.kind(id) {
                NodeKind::Label(index) => {
                    if tree.arena.label(index) == name {
                        return tree
                            .arena
                            .children(id)
                            .first()
                            .map(|&child| SyntaxNode { tree, id: child });
                    }
                }
                NodeKind::Rule(_) => {}
                _ => stack.extend(tree.arena.children(id).iter().rev().copied()),
            }
        }
        None
    }

    /// Every match labeled `name` within this node, in input order
    ///
    /// Same scoping as [`SyntaxNode::labeled`]; repetitions contribute one
    /// match per iteration.
    pub fn labeled_all(&self, name: &str) -> Vec<SyntaxNode<'t>> {
        let tree = self.tree;
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = tree.arena.children(self.id).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            match tree.arena.kind(id) {
                NodeKind::Label(index) => {
                    if tree.arena.label(index) == name {
                        if let Some(&child) = tree.arena.children(id).first() {
                            found.push(SyntaxNode { tree, id: child });
                        }
                    }
                }
                NodeKind::Rule(_) => {}
                _ => stack.extend(tree.arena.children(id).iter().rev().copied()),
            }
        }
        found
    }

    /// The inner match of an optional node, or the node itself otherwise
    ///
    /// An optional that did not match yields `None`.
    pub fn present(&self) -> Option<SyntaxNode<'t>> {
        match self.kind() {
            NodeKind::Optional => self.child(0),
            _ => Some(*self),
        }
    }

    /// First rule node at or below this node, following single-child chains
    pub fn rule_node(&self) -> Option<SyntaxNode<'t>> {
        let mut node = *self;
        loop {
            if node.rule_id().is_some() {
                return Some(node);
            }
            if node.child_count() != 1 {
                return None;
            }
            node = node.child(0)?;
        }
    }

    /// Generic semantic value of this node
    ///
    /// Terminals and label-free composites become their text; rule and label
    /// nodes become single-key hashes; composites with labeled children
    /// become a hash of those labels; predicates are `nil`.
    pub fn value(&self) -> Value {
        super::transform::node_to_value(*self)
    }

    /// Semantic value after applying `transform`
    pub fn value_with(&self, transform: &Transform) -> Result<Value, TransformError> {
        transform.apply(&self.value())
    }
}

impl fmt::Debug for SyntaxNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("SyntaxNode");
        s.field("kind", &self.kind()).field("range", &self.range());
        if let Some(name) = self.rule_name() {
            s.field("rule", &name);
        }
        if let Some(label) = self.label() {
            s.field("label", &label);
        }
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_failure_display() {
        let failure = ParseFailure::new("ab\ncd", 4, vec!["\"x\"".into(), "\"y\"".into()]);
        assert_eq!(failure.line, 2);
        assert_eq!(failure.column, 2);
        assert_eq!(
            failure.to_string(),
            "parse failed at line 2, column 2: expected one of \"x\", \"y\""
        );
    }

    #[test]
    fn test_parse_error_fatality() {
        let failed = ParseError::Failed(ParseFailure::new("", 0, vec![]));
        assert!(!failed.is_fatal());
        assert!(failed.failure().is_some());

        let left = ParseError::LeftRecursion {
            rule: "expr".into(),
            position: 3,
        };
        assert!(left.is_fatal());
        assert!(left.to_string().contains("expr"));
    }

    #[test]
    fn test_match_result_accessors() {
        let ok = MatchResult::Success {
            node: NodeId::from_index(0),
            end: 4,
        };
        assert!(ok.is_success());
        assert_eq!(ok.end(), Some(4));
        assert_eq!(MatchResult::Failure { position: 2 }.end(), None);
    }

    #[test]
    fn test_parse_error_is_std_error() {
        fn assert_error<E: std::error::Error>(_: &E) {}
        assert_error(&ParseError::NoRootRule);
    }
}
