//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and functions from
//! bootpeg. Importing it with a wildcard import brings the core types into
//! scope:
//!
//! ```
//! use bootpeg::prelude::*;
//! ```
//!
//! # Re-exported Items
//!
//! ## Core Types
//! - [`Expression`] - Parsing expression
//! - [`Grammar`] - Rule table with a root rule
//! - [`PackratParser`] - The packrat engine
//! - [`SyntaxTree`] / [`SyntaxNode`] - Parse results
//! - [`ParseError`] / [`ParseFailure`] - Parse errors
//!
//! ## Parser DSL
//! - [`str()`] - Match a literal string
//! - [`any()`] - Match any single character
//! - [`ref_()`] - Reference to another rule
//! - [`char_class()`] - Match one character of a class
//! - [`seq()`] - Match a sequence of expressions
//! - [`choice()`] - Match the first of several expressions
//! - [`GrammarBuilder`] - Builder for constructing grammars
//!
//! ## Compiler
//! - [`compile()`] - Grammar source to [`Grammar`]
//! - [`generate()`] - [`Grammar`] to [`GeneratedParser`]
//! - [`GrammarCompiler`] - Compiler with a configurable metagrammar
//!
//! ## Transforms
//! - [`Transform`] - Rule-keyed value transforms
//! - [`Value`] - Dynamic value type

// ============================================================================
// Core Types
// ============================================================================

pub use crate::runtime::{
    CharacterClass, ClassItem, Expression, Grammar, PackratParser, ParseError, ParseFailure,
    ParserConfig, SyntaxNode, SyntaxTree,
};

// ============================================================================
// Parser DSL
// ============================================================================

pub use crate::runtime::parser_dsl::{any, char_class, choice, ref_, seq, str, GrammarBuilder};

// ============================================================================
// Compiler
// ============================================================================

pub use crate::compiler::{compile, generate, CompileError, GeneratedParser, GrammarCompiler};

// ============================================================================
// Error Handling
// ============================================================================

pub use crate::runtime::error::{Diagnostic, Severity};

// ============================================================================
// Transforms
// ============================================================================

pub use crate::runtime::transform::{Transform, Value};
