//! Integration tests for the bootstrap loader
//!
//! These tests rebuild the grammar compiler from metagrammar source with a
//! trusted build, including sources that extend or break the language.

use bootpeg::compiler::bootstrap::BootstrapStage;
use bootpeg::compiler::{
    bootstrap, load_trusted_build, metagrammar_gen, BootstrapError, CompileError, GrammarCompiler,
    TrustedBuild, METAGRAMMAR_SOURCE,
};

const SPACE_RULE: &str = "space = [ \\t\\n]+";

/// Metagrammar source that also accepts carriage returns as whitespace
fn crlf_metagrammar() -> String {
    let source = METAGRAMMAR_SOURCE.replace(SPACE_RULE, "space = [ \\t\\n\\r]+");
    assert_ne!(source, METAGRAMMAR_SOURCE);
    source
}

// ============================================================================
// Trusted Builds
// ============================================================================

#[test]
fn test_embedded_build_satisfies_current_version() {
    let trusted = load_trusted_build(&format!("={}", env!("CARGO_PKG_VERSION"))).unwrap();
    assert_eq!(trusted.version().to_string(), env!("CARGO_PKG_VERSION"));
    assert_eq!(trusted.compiler().metagrammar(), &metagrammar_gen::grammar());
}

#[test]
fn test_unavailable_trusted_build() {
    match load_trusted_build(">= 1000.0") {
        Err(BootstrapError::TrustedBuildUnavailable { available, .. }) => {
            assert_eq!(available, env!("CARGO_PKG_VERSION"));
        }
        other => panic!("expected an unavailable build, got {:?}", other.map(|_| ())),
    }
    assert!(matches!(
        load_trusted_build("< 0.0.1"),
        Err(BootstrapError::TrustedBuildUnavailable { .. })
    ));
}

#[test]
fn test_invalid_constraint() {
    assert!(matches!(
        load_trusted_build("~> 1.0"),
        Err(BootstrapError::InvalidConstraint { .. })
    ));
}

// ============================================================================
// Fixed Point
// ============================================================================

#[test]
fn test_bootstrap_embedded_metagrammar() {
    let trusted = load_trusted_build("*").unwrap();
    let artifact = bootstrap(trusted, METAGRAMMAR_SOURCE).unwrap();

    assert_eq!(artifact.grammar(), &metagrammar_gen::grammar());
    let compiler = artifact.into_compiler();
    let grammar = compiler.compile("word = [a-z]+").unwrap();
    assert!(grammar.parse("bootstrap").is_ok());
}

#[test]
fn test_bootstrap_extended_language() {
    let source = crlf_metagrammar();
    let windows = "first = 'a'\r\nsecond = 'b'\r\n";

    // The trusted build does not know about carriage returns
    assert!(GrammarCompiler::new().compile(windows).is_err());

    let artifact = bootstrap(load_trusted_build("*").unwrap(), &source).unwrap();
    let grammar = artifact.compiler().compile(windows).unwrap();
    assert_eq!(grammar.root_name(), Some("first"));
    assert_eq!(grammar.len(), 2);
}

#[test]
fn test_bootstrap_from_snapshot_chain() {
    let first = bootstrap(load_trusted_build("*").unwrap(), &crlf_metagrammar()).unwrap();
    let snapshot = first.snapshot().unwrap();

    // The extended compiler is trusted to build the embedded language again
    let trusted = TrustedBuild::from_snapshot(&snapshot).unwrap();
    assert_eq!(trusted.version(), first.version());
    let second = bootstrap(trusted, METAGRAMMAR_SOURCE).unwrap();
    assert_eq!(second.grammar(), &metagrammar_gen::grammar());
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_broken_source_fails_in_trusted_stage() {
    let source = METAGRAMMAR_SOURCE.replace(SPACE_RULE, "space = [ \\t\\n");
    match bootstrap(load_trusted_build("*").unwrap(), &source) {
        Err(BootstrapError::Compile { stage, source }) => {
            assert_eq!(stage, BootstrapStage::Trusted);
            assert!(matches!(source, CompileError::Syntax(_)));
        }
        other => panic!("expected a compile error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_renamed_rule_is_missing() {
    let source = METAGRAMMAR_SOURCE.replace("anything_symbol", "dot_symbol");
    match bootstrap(load_trusted_build("*").unwrap(), &source) {
        Err(BootstrapError::MissingRule { names }) => {
            assert_eq!(names, vec!["anything_symbol".to_string()]);
        }
        other => panic!("expected a missing rule, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_candidate_that_changes_literals_breaks_fixed_point() {
    // The candidate keeps the quotes in the body of double-quoted literals
    let original = r#"double_quoted = "\"" body:(escape / !"\"" .)* "\"""#;
    let altered = r#"double_quoted = body:("\"" (escape / !"\"" .)* "\"")"#;
    let source = METAGRAMMAR_SOURCE.replace(original, altered);
    assert_ne!(source, METAGRAMMAR_SOURCE);

    match bootstrap(load_trusted_build("*").unwrap(), &source) {
        Err(BootstrapError::FixedPointMismatch { rules }) => {
            assert!(rules.contains(&"double_quoted".to_string()));
            assert!(!rules.contains(&"identifier".to_string()));
        }
        other => panic!("expected a fixed point mismatch, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_corrupt_snapshot() {
    assert!(matches!(
        TrustedBuild::from_snapshot("{\"version\": \"0.1.0\"}"),
        Err(BootstrapError::Snapshot(_))
    ));
}
