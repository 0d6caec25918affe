//! Command-line interface for bootpeg
//!
//! Usage:
//!   bootpeg compile `<grammar>` [-o `<out>`] [--format rust|json|grammar]  - Compile a grammar file
//!   bootpeg parse `<grammar>` `<input>...` [--rule `<name>`] [--tree]        - Parse input files
//!   bootpeg check `<grammar>` [--graph dot|mermaid]                         - Report grammar warnings
//!   bootpeg bootstrap [--source `<peg>`] [--trusted `<json>`] [-o `<out>`]      - Rebuild the metagrammar parser

use bootpeg::compiler::bootstrap::{bootstrap, load_trusted_build, TrustedBuild};
use bootpeg::compiler::{generate, CompileError, GrammarCompiler, RustGenerator, METAGRAMMAR_SOURCE};
use bootpeg::runtime::parallel::parse_batch_parallel;
use bootpeg::runtime::{Diagnostic, Grammar, GrammarVisualizer, ParseError, TreePrinter};
use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "bootpeg", version, about = "Self-hosting PEG compiler")]
struct Cli {
    /// Print debug logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a grammar file and write the result
    Compile {
        /// Grammar source file
        grammar: PathBuf,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Rust)]
        format: OutputFormat,
        /// Path of the bootpeg crate as seen from the generated module
        #[arg(long, default_value = "bootpeg")]
        crate_path: String,
    },
    /// Parse input files with a grammar
    Parse {
        /// Grammar source file
        grammar: PathBuf,
        /// Input files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Start rule (the grammar's root when omitted)
        #[arg(long)]
        rule: Option<String>,
        /// Print the syntax tree instead of the semantic value
        #[arg(long)]
        tree: bool,
    },
    /// Compile a grammar and report warnings
    Check {
        /// Grammar source file
        grammar: PathBuf,
        /// Also print the rule reference graph
        #[arg(long, value_enum)]
        graph: Option<GraphFormat>,
    },
    /// Rebuild the metagrammar parser with a trusted build
    Bootstrap {
        /// Metagrammar source (the embedded source when omitted)
        #[arg(long)]
        source: Option<PathBuf>,
        /// Trusted build snapshot (the embedded build when omitted)
        #[arg(long)]
        trusted: Option<PathBuf>,
        /// Version constraint for the embedded trusted build
        #[arg(long, default_value = "*")]
        require: String,
        /// Write the rendered Rust parser here
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Write a JSON snapshot of the new build here
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Rust module built on the parser DSL
    Rust,
    /// JSON rule table
    Json,
    /// Normalized grammar source
    Grammar,
}

#[derive(Clone, Copy, ValueEnum)]
enum GraphFormat {
    /// Graphviz DOT
    Dot,
    /// Mermaid flowchart
    Mermaid,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Compile {
            grammar,
            output,
            format,
            crate_path,
        } => handle_compile(&grammar, output.as_deref(), format, &crate_path),
        Command::Parse {
            grammar,
            inputs,
            rule,
            tree,
        } => handle_parse(&grammar, &inputs, rule.as_deref(), tree),
        Command::Check { grammar, graph } => handle_check(&grammar, graph),
        Command::Bootstrap {
            source,
            trusted,
            require,
            output,
            snapshot,
        } => handle_bootstrap(
            source.as_deref(),
            trusted.as_deref(),
            &require,
            output.as_deref(),
            snapshot.as_deref(),
        ),
    };

    match result {
        Ok(code) => code,
        Err(message) => {
            eprintln!("{}", message);
            ExitCode::FAILURE
        }
    }
}

/// Compile a grammar file, rendering errors against its source
fn load_grammar(path: &Path) -> Result<Grammar, String> {
    let source = read(path)?;
    let mut grammar = GrammarCompiler::new()
        .compile(&source)
        .map_err(|err| render_compile_error(path, &source, &err))?;
    if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
        grammar.set_name(stem);
    }
    Ok(grammar)
}

fn render_compile_error(path: &Path, source: &str, err: &CompileError) -> String {
    format!(
        "{}: {}",
        path.display(),
        err.to_diagnostic().format_with_source(source)
    )
}

fn read(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| format!("Error reading {}: {}", path.display(), e))
}

fn write_output(path: Option<&Path>, contents: &str) -> Result<(), String> {
    match path {
        Some(path) => std::fs::write(path, contents)
            .map_err(|e| format!("Error writing {}: {}", path.display(), e)),
        None => {
            print!("{}", contents);
            Ok(())
        }
    }
}

/// Handle the compile command
fn handle_compile(
    path: &Path,
    output: Option<&Path>,
    format: OutputFormat,
    crate_path: &str,
) -> Result<ExitCode, String> {
    let grammar = load_grammar(path)?;
    let rendered = match format {
        OutputFormat::Rust => RustGenerator::new()
            .with_crate_path(crate_path)
            .render(&grammar),
        OutputFormat::Json => {
            let mut json = grammar
                .to_json_pretty()
                .map_err(|e| format!("Error serializing grammar: {}", e))?;
            json.push('\n');
            json
        }
        OutputFormat::Grammar => grammar.to_string(),
    };
    write_output(output, &rendered)?;
    Ok(ExitCode::SUCCESS)
}

/// Handle the parse command
fn handle_parse(
    grammar_path: &Path,
    inputs: &[PathBuf],
    rule: Option<&str>,
    tree: bool,
) -> Result<ExitCode, String> {
    let grammar = load_grammar(grammar_path)?;
    let parser = generate(grammar).map_err(|e| e.to_string())?;
    let sources = inputs
        .iter()
        .map(|path| read(path))
        .collect::<Result<Vec<_>, _>>()?;

    let results = match rule {
        Some(rule) => sources
            .iter()
            .map(|source| parser.parse_rule(rule, source))
            .collect::<Vec<_>>(),
        None => {
            let refs: Vec<&str> = sources.iter().map(String::as_str).collect();
            parse_batch_parallel(parser.grammar(), &refs)
        }
    };

    let printer = TreePrinter::new();
    let mut failed = false;
    for ((path, source), result) in inputs.iter().zip(&sources).zip(results) {
        if inputs.len() > 1 {
            println!("== {}", path.display());
        }
        match result {
            Ok(parsed) if tree => print!("{}", printer.print(&parsed)),
            Ok(parsed) => println!("{}", parsed.value()),
            Err(ParseError::Failed(failure)) => {
                failed = true;
                let diagnostic = Diagnostic::from_failure(&failure, "input does not match");
                eprintln!("{}: {}", path.display(), diagnostic.format_with_source(source));
            }
            Err(err) => {
                failed = true;
                eprintln!("{}: {}", path.display(), err);
            }
        }
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Handle the check command
fn handle_check(path: &Path, graph: Option<GraphFormat>) -> Result<ExitCode, String> {
    let grammar = load_grammar(path)?;
    let warnings = grammar.analyze_warnings();
    for warning in &warnings {
        println!("{}", Diagnostic::from_warning(warning).ascii_tree().trim_end());
    }
    println!(
        "{}: {} rules, {} warnings",
        path.display(),
        grammar.len(),
        warnings.len()
    );

    match graph {
        Some(GraphFormat::Dot) => print!("{}", GrammarVisualizer::new(&grammar).to_dot()),
        Some(GraphFormat::Mermaid) => print!("{}", GrammarVisualizer::new(&grammar).to_mermaid()),
        None => {}
    }
    Ok(ExitCode::SUCCESS)
}

/// Handle the bootstrap command
fn handle_bootstrap(
    source: Option<&Path>,
    trusted: Option<&Path>,
    require: &str,
    output: Option<&Path>,
    snapshot: Option<&Path>,
) -> Result<ExitCode, String> {
    let source_text = match source {
        Some(path) => read(path)?,
        None => METAGRAMMAR_SOURCE.to_string(),
    };
    let trusted = match trusted {
        Some(path) => TrustedBuild::from_snapshot(&read(path)?),
        None => load_trusted_build(require),
    }
    .map_err(|e| format!("Bootstrap failed: {}", e))?;

    let artifact =
        bootstrap(trusted, &source_text).map_err(|e| format!("Bootstrap failed: {}", e))?;

    if let Some(path) = snapshot {
        let json = artifact
            .snapshot()
            .map_err(|e| format!("Bootstrap failed: {}", e))?;
        write_output(Some(path), &json)?;
    }
    if output.is_some() || snapshot.is_none() {
        write_output(output, &artifact.render_rust())?;
    }
    eprintln!(
        "bootstrap {}: fixed point reached with {} rules",
        artifact.version(),
        artifact.grammar().len()
    );
    Ok(ExitCode::SUCCESS)
}

fn log_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    }
}

/// Send log records to stderr; `verbose` enables debug output
fn init_logging(verbose: bool) {
    if let Err(e) = TermLogger::init(
        log_level(verbose),
        ConfigBuilder::new().set_time_format_custom(&[]).build(),
        TerminalMode::Stderr,
        ColorChoice::Never,
    ) {
        eprintln!("warning: logging disabled: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_flag_sets_log_level() {
        let cli = Cli::try_parse_from(["bootpeg", "-v", "check", "grammar.peg"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(log_level(cli.verbose), LevelFilter::Debug);

        let cli = Cli::try_parse_from(["bootpeg", "check", "grammar.peg"]).unwrap();
        assert!(!cli.verbose);
        assert_eq!(log_level(cli.verbose), LevelFilter::Warn);
    }

    #[test]
    fn test_verbose_flag_is_global() {
        let cli = Cli::try_parse_from(["bootpeg", "check", "grammar.peg", "--verbose"]).unwrap();
        assert_eq!(log_level(cli.verbose), LevelFilter::Debug);
    }
}
