//! Compiler: grammar source text to executable parsers
//!
//! # Module Organization
//!
//! - [`metagrammar`] - Semantic values of metagrammar matches
//! - [`metagrammar_gen`] - The metagrammar as a rendered parser (trusted build)
//! - [`grammar_compiler`] - Source text to validated [`Grammar`](crate::runtime::Grammar)
//! - [`codegen`] - Grammars to parser units and Rust source
//! - [`bootstrap`] - Rebuilding the compiler with itself

pub mod bootstrap;
pub mod codegen;
pub mod grammar_compiler;
pub mod metagrammar;
pub mod metagrammar_gen;

pub use bootstrap::{
    bootstrap, load_trusted_build, BootstrapArtifact, BootstrapError, TrustedBuild, Version,
    VersionConstraint,
};
pub use codegen::{generate, render_expression, GeneratedParser, RuleEntry, RustGenerator};
pub use grammar_compiler::{compile, CompileError, GrammarCompiler, SyntaxError};
pub use metagrammar::{MetaValue, PrefixOperator, SuffixOperator, METAGRAMMAR_SOURCE};
