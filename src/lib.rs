//! bootpeg - Self-Hosting PEG Compiler
//!
//! bootpeg reads grammars written in a small parsing-expression language,
//! turns them into parsers and runs those parsers with a memoizing (packrat)
//! recursive-descent engine. The grammar language is itself described by a
//! grammar, the metagrammar, which the compiler compiles with itself.
//!
//! It provides:
//! - A closed parsing-expression model with a combinator DSL
//! - A packrat engine with furthest-failure error reporting
//! - The metagrammar and a grammar compiler built on it
//! - Code generation to in-memory parsers and to Rust source
//! - A staged bootstrap that rebuilds the compiler from its own source
//! - Developer tools (tracing, tree printing, grammar visualization)
//!
//! ## Quick Start
//!
//! ```rust
//! use bootpeg::compiler::{compile, generate};
//!
//! let grammar = compile(
//!     "sum = number (space? '+' space? number)*
//!      number = [0-9]+
//!      space = ' '+",
//! )
//! .unwrap();
//!
//! let parser = generate(grammar).unwrap();
//! let tree = parser.parse("1 + 22+333").unwrap();
//! assert_eq!(tree.root().text(), "1 + 22+333");
//! ```
//!
//! ## Using the Parser DSL
//!
//! ```rust
//! use bootpeg::prelude::*;
//!
//! let grammar = GrammarBuilder::new()
//!     .rule("greeting", str("hello") >> str(" ") >> ref_("name"))
//!     .rule("name", str("world") | str("there"))
//!     .build();
//!
//! assert!(grammar.parse("hello there").is_ok());
//! ```
//!
//! ## Feature Flags
//!
//! - `logging` - Enable debug logging using the `log` crate
//! - `parallel` - Parse batches of inputs on rayon's thread pool
//! - `cli` - The `bootpeg` command line tool (default)

// Lint configuration for production quality
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(clippy::all)]
#![allow(clippy::new_without_default)]
// Allow some pedantic lints that are too noisy
#![allow(clippy::module_inception)]
#![allow(clippy::redundant_closure)]

// Prelude module for convenient imports
pub mod prelude;

// Expression model and packrat engine
pub mod runtime;

// Metagrammar, grammar compiler, code generation and bootstrap
pub mod compiler;

/// Re-export commonly used types for convenience
pub use compiler::{compile, generate, CompileError, GeneratedParser, GrammarCompiler};
pub use runtime::{
    // Debug tools
    debug::{GrammarVisualizer, ParseTrace, TreePrinter},
    // Diagnostics
    error::{Diagnostic, Severity},
    // Parser DSL
    parser_dsl::{any, char_class, choice, ref_, seq, str, GrammarBuilder},
    // Transform
    transform::{Transform, Value},
    Expression,
    Grammar,
    PackratParser,
    ParseError,
    SyntaxNode,
    SyntaxTree,
};
