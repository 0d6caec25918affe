//! Bootstrap loader
//!
//! The grammar language is described by a grammar, so building the compiler
//! needs a compiler. The loader runs the two-stage build:
//!
//! 1. [`load_trusted_build`] yields a previously trusted compiler (the
//!    embedded [`metagrammar_gen`](super::metagrammar_gen) rendering, or a
//!    JSON snapshot written by an earlier bootstrap).
//! 2. [`bootstrap`] compiles new metagrammar source with it, checks that the
//!    candidate has every rule the value construction needs, binds the
//!    candidate to the trusted execution primitives and requires it to
//!    reproduce itself from the same source.
//!
//! The trusted build is consumed by [`bootstrap`]; the returned
//! [`BootstrapArtifact`] is the only compiler left standing.
//!
//! # Example
//!
//! ```
//! use bootpeg::compiler::{bootstrap, load_trusted_build, METAGRAMMAR_SOURCE};
//!
//! let trusted = load_trusted_build(">= 0.1.0").unwrap();
//! let artifact = bootstrap(trusted, METAGRAMMAR_SOURCE).unwrap();
//!
//! let grammar = artifact.compiler().compile("greeting = 'hi'\n").unwrap();
//! assert!(grammar.parse("hi").is_ok());
//! ```

use super::codegen::RustGenerator;
use super::grammar_compiler::{CompileError, GrammarCompiler};
use super::metagrammar::{REQUIRED_RULES, ROOT_RULE};
use crate::runtime::{ExecutionEngine, Grammar};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Logging macros - no-op when logging feature is disabled
#[cfg(not(feature = "logging"))]
macro_rules! log_info {
    ($($arg:tt)*) => {};
}

/// Logging macros - use log crate when logging feature is enabled
#[cfg(feature = "logging")]
macro_rules! log_info {
    ($($arg:tt)*) => { log::info!($($arg)*) };
}

/// Version of the embedded trusted build
pub const TRUSTED_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Module doc of the rendered metagrammar parser
pub const GENERATED_HEADER: &str = "Metagrammar parser

Rendering of `grammars/metagrammar.peg` in the format of
`RustGenerator::with_crate_path(\"crate\")`. This is the trusted build that
compiles grammar source, the metagrammar source included; regenerate it
with `bootpeg bootstrap -o src/compiler/metagrammar_gen.rs`.";

// ============================================================================
// Versions
// ============================================================================

/// A `major.minor.patch` version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// Major version
    pub major: u64,
    /// Minor version
    pub minor: u64,
    /// Patch version
    pub patch: u64,
}

impl Version {
    /// Create a version
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse `major[.minor[.patch]]`; missing parts are zero
    pub fn parse(text: &str) -> Result<Self, BootstrapError> {
        let invalid = || BootstrapError::InvalidConstraint {
            constraint: text.to_string(),
        };
        let mut parts = text.trim().split('.');
        let mut next = |required: bool| -> Result<u64, BootstrapError> {
            match parts.next() {
                Some(part) => part.parse().map_err(|_| invalid()),
                None if required => Err(invalid()),
                None => Ok(0),
            }
        };
        let version = Version::new(next(true)?, next(false)?, next(false)?);
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(version)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Comparison operator of a [`VersionConstraint`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    /// `*`: any version
    Any,
    /// `=`
    Exact,
    /// `>`
    Greater,
    /// `>=`
    GreaterEq,
    /// `<`
    Less,
    /// `<=`
    LessEq,
}

/// Requirement on the version of the trusted build
///
/// ```
/// use bootpeg::compiler::bootstrap::{Version, VersionConstraint};
///
/// let constraint = VersionConstraint::parse(">= 0.1").unwrap();
/// assert!(constraint.matches(Version::new(0, 1, 3)));
/// assert!(!constraint.matches(Version::new(0, 0, 9)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionConstraint {
    /// Operator
    pub comparator: Comparator,
    /// Version the operator compares against
    pub version: Version,
}

impl VersionConstraint {
    /// A constraint every version satisfies
    pub const ANY: VersionConstraint = VersionConstraint {
        comparator: Comparator::Any,
        version: Version::new(0, 0, 0),
    };

    /// Parse `*`, `=x.y.z`, `>x.y.z`, `>=x.y.z`, `<x.y.z`, `<=x.y.z` or a bare
    /// version (exact match)
    pub fn parse(text: &str) -> Result<Self, BootstrapError> {
        let text = text.trim();
        if text == "*" || text.is_empty() {
            return Ok(Self::ANY);
        }
        let (comparator, rest) = if let Some(rest) = text.strip_prefix(">=") {
            (Comparator::GreaterEq, rest)
        } else if let Some(rest) = text.strip_prefix("<=") {
            (Comparator::LessEq, rest)
        } else if let Some(rest) = text.strip_prefix('>') {
            (Comparator::Greater, rest)
        } else if let Some(rest) = text.strip_prefix('<') {
            (Comparator::Less, rest)
        } else if let Some(rest) = text.strip_prefix('=') {
            (Comparator::Exact, rest)
        } else {
            (Comparator::Exact, text)
        };
        let version = Version::parse(rest).map_err(|_| BootstrapError::InvalidConstraint {
            constraint: text.to_string(),
        })?;
        Ok(Self {
            comparator,
            version,
        })
    }

    /// Whether `version` satisfies the constraint
    pub fn matches(&self, version: Version) -> bool {
        let ordering = version.cmp(&self.version);
        match self.comparator {
            Comparator::Any => true,
            Comparator::Exact => ordering == Ordering::Equal,
            Comparator::Greater => ordering == Ordering::Greater,
            Comparator::GreaterEq => ordering != Ordering::Less,
            Comparator::Less => ordering == Ordering::Less,
            Comparator::LessEq => ordering != Ordering::Greater,
        }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.comparator {
            Comparator::Any => return write!(f, "*"),
            Comparator::Exact => "=",
            Comparator::Greater => ">",
            Comparator::GreaterEq => ">=",
            Comparator::Less => "<",
            Comparator::LessEq => "<=",
        };
        write!(f, "{}{}", op, self.version)
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Which compiler of the bootstrap failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStage {
    /// The trusted build compiling the new source
    Trusted,
    /// The candidate recompiling the same source
    Candidate,
}

impl fmt::Display for BootstrapStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapStage::Trusted => write!(f, "trusted build"),
            BootstrapStage::Candidate => write!(f, "candidate compiler"),
        }
    }
}

/// Fatal error of the bootstrap; no compiler is produced
#[derive(Debug)]
pub enum BootstrapError {
    /// No trusted build satisfies the version constraint
    TrustedBuildUnavailable {
        /// The requested constraint
        constraint: String,
        /// Version of the build that was available
        available: String,
    },

    /// A version or constraint could not be parsed
    InvalidConstraint {
        /// The offending text
        constraint: String,
    },

    /// A compiler failed on the metagrammar source
    Compile {
        /// Which compiler failed
        stage: BootstrapStage,
        /// Underlying error
        source: CompileError,
    },

    /// The candidate lacks rules the value construction dispatches on
    MissingRule {
        /// Every missing rule
        names: Vec<String>,
    },

    /// The candidate does not reproduce itself
    FixedPointMismatch {
        /// Rules whose definitions differ between the two compilations
        rules: Vec<String>,
    },

    /// A trusted-build snapshot could not be read or written
    Snapshot(serde_json::Error),
}

impl fmt::Display for BootstrapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapError::TrustedBuildUnavailable {
                constraint,
                available,
            } => write!(
                f,
                "no trusted build satisfies {} (available: {})",
                constraint, available
            ),
            BootstrapError::InvalidConstraint { constraint } => {
                write!(f, "invalid version constraint: {}", constraint)
            }
            BootstrapError::Compile { stage, source } => {
                write!(f, "{} failed to compile the metagrammar: {}", stage, source)
            }
            BootstrapError::MissingRule { names } => {
                write!(f, "candidate metagrammar is missing rules: {}", names.join(", "))
            }
            BootstrapError::FixedPointMismatch { rules } => write!(
                f,
                "candidate compiler does not reproduce itself; differing rules: {}",
                rules.join(", ")
            ),
            BootstrapError::Snapshot(err) => write!(f, "invalid snapshot: {}", err),
        }
    }
}

impl std::error::Error for BootstrapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BootstrapError::Compile { source, .. } => Some(source),
            BootstrapError::Snapshot(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for BootstrapError {
    fn from(err: serde_json::Error) -> Self {
        BootstrapError::Snapshot(err)
    }
}

// ============================================================================
// Trusted builds
// ============================================================================

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: String,
    metagrammar: Grammar,
}

/// A compiler that is trusted to compile the metagrammar
#[derive(Debug)]
pub struct TrustedBuild {
    version: Version,
    compiler: GrammarCompiler,
}

impl TrustedBuild {
    /// The build embedded in this crate
    pub fn embedded() -> Result<Self, BootstrapError> {
        Ok(Self {
            version: Version::parse(TRUSTED_VERSION)?,
            compiler: GrammarCompiler::new(),
        })
    }

    /// A build whose metagrammar comes from a JSON snapshot
    ///
    /// The snapshot format is the one written by
    /// [`BootstrapArtifact::snapshot`].
    pub fn from_snapshot(json: &str) -> Result<Self, BootstrapError> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        let version = Version::parse(&snapshot.version)?;
        check_required_rules(&snapshot.metagrammar)?;
        let compiler = GrammarCompiler::from_metagrammar(snapshot.metagrammar).map_err(|source| {
            BootstrapError::Compile {
                stage: BootstrapStage::Trusted,
                source,
            }
        })?;
        Ok(Self { version, compiler })
    }

    /// Version of the build
    pub fn version(&self) -> Version {
        self.version
    }

    /// The trusted compiler
    pub fn compiler(&self) -> &GrammarCompiler {
        &self.compiler
    }

    /// Compile grammar source with the trusted compiler
    pub fn compile(&self, source: &str) -> Result<Grammar, CompileError> {
        self.compiler.compile(source)
    }

    /// Execution primitives of the trusted build
    pub fn engine(&self) -> Arc<dyn ExecutionEngine> {
        self.compiler.engine()
    }
}

/// Load the embedded trusted build if it satisfies `constraint`
pub fn load_trusted_build(constraint: &str) -> Result<TrustedBuild, BootstrapError> {
    let constraint = VersionConstraint::parse(constraint)?;
    let build = TrustedBuild::embedded()?;
    if !constraint.matches(build.version) {
        return Err(BootstrapError::TrustedBuildUnavailable {
            constraint: constraint.to_string(),
            available: build.version.to_string(),
        });
    }
    log_info!("loaded trusted build {}", build.version);
    Ok(build)
}

// ============================================================================
// Bootstrap
// ============================================================================

/// Result of a successful bootstrap
#[derive(Debug)]
pub struct BootstrapArtifact {
    version: Version,
    grammar: Grammar,
    compiler: GrammarCompiler,
}

impl BootstrapArtifact {
    /// Version the artifact was built as
    pub fn version(&self) -> Version {
        self.version
    }

    /// The new metagrammar
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// The new compiler
    pub fn compiler(&self) -> &GrammarCompiler {
        &self.compiler
    }

    /// Take the new compiler
    pub fn into_compiler(self) -> GrammarCompiler {
        self.compiler
    }

    /// JSON snapshot that [`TrustedBuild::from_snapshot`] can load
    pub fn snapshot(&self) -> Result<String, BootstrapError> {
        let snapshot = Snapshot {
            version: self.version.to_string(),
            metagrammar: self.grammar.clone(),
        };
        Ok(serde_json::to_string_pretty(&snapshot)?)
    }

    /// Rust source of the new metagrammar parser, for use inside this crate
    pub fn render_rust(&self) -> String {
        RustGenerator::new()
            .with_crate_path("crate")
            .with_header(GENERATED_HEADER)
            .render(&self.grammar)
    }
}

/// Build a new compiler from metagrammar `source` with a trusted build
pub fn bootstrap(trusted: TrustedBuild, source: &str) -> Result<BootstrapArtifact, BootstrapError> {
    log_info!("bootstrapping with trusted build {}", trusted.version);

    let candidate_grammar = trusted
        .compile(source)
        .map_err(|source| BootstrapError::Compile {
            stage: BootstrapStage::Trusted,
            source,
        })?;
    check_required_rules(&candidate_grammar)?;

    let candidate = GrammarCompiler::from_metagrammar(candidate_grammar.clone())
        .map_err(|source| BootstrapError::Compile {
            stage: BootstrapStage::Trusted,
            source,
        })?
        .with_engine(trusted.engine());

    let recompiled = candidate
        .compile(source)
        .map_err(|source| BootstrapError::Compile {
            stage: BootstrapStage::Candidate,
            source,
        })?;
    if recompiled != candidate_grammar {
        return Err(BootstrapError::FixedPointMismatch {
            rules: differing_rules(&candidate_grammar, &recompiled),
        });
    }

    let version = trusted.version;
    drop(trusted);
    log_info!(
        "bootstrap reached a fixed point with {} rules",
        candidate_grammar.len()
    );

    Ok(BootstrapArtifact {
        version,
        grammar: candidate_grammar,
        compiler: candidate,
    })
}

fn check_required_rules(grammar: &Grammar) -> Result<(), BootstrapError> {
    let names: Vec<String> = REQUIRED_RULES
        .iter()
        .filter(|name| !grammar.contains(name))
        .map(|name| name.to_string())
        .collect();
    if !names.is_empty() {
        return Err(BootstrapError::MissingRule { names });
    }
    if grammar.root_name() != Some(ROOT_RULE) {
        return Err(BootstrapError::MissingRule {
            names: vec![format!("{} (as root)", ROOT_RULE)],
        });
    }
    Ok(())
}

fn differing_rules(expected: &Grammar, actual: &Grammar) -> Vec<String> {
    let mut rules: Vec<String> = expected
        .rule_names()
        .filter(|name| expected.get(name) != actual.get(name))
        .map(str::to_string)
        .collect();
    for name in actual.rule_names() {
        if !expected.contains(name) && !rules.iter().any(|r| r == name) {
            rules.push(name.to_string());
        }
    }
    if rules.is_empty() && expected.root_name() != actual.root_name() {
        rules.push(format!("root {:?}", actual.root_name()));
    }
    rules
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{metagrammar_gen, METAGRAMMAR_SOURCE};

    #[test]
    fn test_version_parse() {
        assert_eq!(Version::parse("1.2.3").unwrap(), Version::new(1, 2, 3));
        assert_eq!(Version::parse("2").unwrap(), Version::new(2, 0, 0));
        assert!(Version::parse("1.x").is_err());
        assert!(Version::parse("1.2.3.4").is_err());
    }

    #[test]
    fn test_constraints() {
        let v = Version::new(0, 1, 3);
        assert!(VersionConstraint::parse("*").unwrap().matches(v));
        assert!(VersionConstraint::parse("=0.1.3").unwrap().matches(v));
        assert!(VersionConstraint::parse("0.1.3").unwrap().matches(v));
        assert!(VersionConstraint::parse(">0.1.2").unwrap().matches(v));
        assert!(!VersionConstraint::parse(">0.1.3").unwrap().matches(v));
        assert!(VersionConstraint::parse("<= 0.1.3").unwrap().matches(v));
        assert!(!VersionConstraint::parse("<0.1").unwrap().matches(v));
        assert_eq!(
            VersionConstraint::parse(">= 1.0").unwrap().to_string(),
            ">=1.0.0"
        );
    }

    #[test]
    fn test_load_trusted_build_rejects_future_version() {
        let err = load_trusted_build(">= 999.0.0").unwrap_err();
        assert!(matches!(err, BootstrapError::TrustedBuildUnavailable { .. }));
        assert!(matches!(
            load_trusted_build("latest"),
            Err(BootstrapError::InvalidConstraint { .. })
        ));
    }

    #[test]
    fn test_bootstrap_reaches_fixed_point() {
        let trusted = load_trusted_build("*").unwrap();
        let artifact = bootstrap(trusted, METAGRAMMAR_SOURCE).unwrap();
        assert_eq!(artifact.grammar(), &metagrammar_gen::grammar());
        assert_eq!(artifact.compiler().engine().name(), "packrat");
    }

    #[test]
    fn test_bootstrap_rejects_broken_source() {
        let trusted = load_trusted_build("*").unwrap();
        let err = bootstrap(trusted, "grammar = (").unwrap_err();
        assert!(matches!(
            err,
            BootstrapError::Compile {
                stage: BootstrapStage::Trusted,
                ..
            }
        ));
    }

    #[test]
    fn test_bootstrap_rejects_missing_rules() {
        let trusted = load_trusted_build("*").unwrap();
        let err = bootstrap(trusted, "grammar = 'x'\n").unwrap_err();
        match err {
            BootstrapError::MissingRule { names } => {
                assert!(names.contains(&"rule_definition".to_string()));
                assert!(!names.contains(&"grammar".to_string()));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let trusted = TrustedBuild::embedded().unwrap();
        let artifact = bootstrap(trusted, METAGRAMMAR_SOURCE).unwrap();
        let json = artifact.snapshot().unwrap();

        let reloaded = TrustedBuild::from_snapshot(&json).unwrap();
        assert_eq!(reloaded.version(), artifact.version());
        assert_eq!(reloaded.compiler().metagrammar(), artifact.grammar());

        let again = bootstrap(reloaded, METAGRAMMAR_SOURCE).unwrap();
        assert_eq!(again.grammar(), artifact.grammar());
    }

    #[test]
    fn test_snapshot_errors() {
        assert!(matches!(
            TrustedBuild::from_snapshot("{"),
            Err(BootstrapError::Snapshot(_))
        ));
        let empty = r#"{"version": "0.1.0", "metagrammar": {"root": null, "rules": []}}"#;
        assert!(matches!(
            TrustedBuild::from_snapshot(empty),
            Err(BootstrapError::MissingRule { .. })
        ));
    }

    #[test]
    fn test_render_rust_uses_crate_paths() {
        let artifact = bootstrap(TrustedBuild::embedded().unwrap(), METAGRAMMAR_SOURCE).unwrap();
        let source = artifact.render_rust();
        assert!(source.starts_with("//! Metagrammar parser\n//!\n"));
        assert!(source.contains("use crate::compiler::GeneratedParser;"));
        assert!(source.contains("pub fn parse_character_class(input: &str)"));
    }
}
