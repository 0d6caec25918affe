//! Runtime: the expression model and the packrat engine
//!
//! Everything needed to represent a grammar and run it against input lives
//! here; the [`crate::compiler`] module builds grammars from source text on
//! top of it.
//!
//! # Module Organization
//!
//! ## Expression Model
//! - [`Expression`] - Parsing expression (closed sum type)
//! - [`CharacterClass`] - Bracketed character sets
//! - [`Grammar`] - Rule table with a designated root
//! - [`parser_dsl`] - Combinator DSL and [`GrammarBuilder`](parser_dsl::GrammarBuilder)
//!
//! ## Engine
//! - [`PackratParser`] - Memoizing recursive-descent parser
//! - [`ExecutionEngine`] - Execution primitives a parser unit delegates to
//! - [`MemoTable`] - Per-parse memo table
//! - [`SyntaxArena`] - Arena of syntax nodes
//! - [`SyntaxTree`] / [`SyntaxNode`] - Parse results
//!
//! ## Diagnostics
//! - [`error`] - Tree-structured diagnostics
//! - [`grammar_analysis`] - Static grammar warnings
//! - [`source_location`] - Line/column tracking
//! - [`debug`] - Tracing and visualization
//!
//! ## Values
//! - [`transform`] - Semantic values and rule-keyed transforms
//!
//! ## Batch Parsing
//! - [`parallel`] - Many inputs at once, on rayon when enabled

// ============================================================================
// Module Declarations
// ============================================================================

pub mod arena;
pub mod ast;
pub mod cache;
pub mod char_class;
pub mod debug;
pub mod error;
pub mod expression;
pub mod grammar;
pub mod grammar_analysis;
pub mod parser;
pub mod parser_dsl;
pub mod source_location;
pub mod transform;

// Batch parsing (always available, uses rayon when feature is enabled)
pub mod parallel;

// ============================================================================
// Core Types
// ============================================================================

pub use arena::{NodeId, SyntaxArena};
pub use ast::{
    MatchResult, NodeKind, ParseError, ParseFailure, ParseStats, SyntaxNode, SyntaxTree,
};
pub use char_class::{CharacterClass, ClassError, ClassItem};
pub use expression::{Expression, ExpressionCounter, ExpressionVisitor};
pub use grammar::{DuplicateRuleError, Grammar, Rule, RuleId, UndefinedRuleError};
pub use parser::{ExecutionEngine, PackratEngine, PackratParser, ParserConfig};

// ============================================================================
// Caching
// ============================================================================

pub use cache::{MemoEntry, MemoTable};

// ============================================================================
// Diagnostics
// ============================================================================

pub use debug::{GrammarVisualizer, ParseTrace, TraceAction, TreePrinter};
pub use error::{Diagnostic, Severity};
pub use grammar_analysis::{GrammarAnalyzer, GrammarWarning, WarningKind};
pub use source_location::{offset_to_line_col, SourcePosition, SourceSpan};

// ============================================================================
// Transforms
// ============================================================================

pub use transform::{Transform, TransformError, Value};

// ============================================================================
// Batch Parsing
// ============================================================================

pub use parallel::{parse_batch_parallel, parse_batch_parallel_owned, parse_batch_with_config};
