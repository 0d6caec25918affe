//! Batch parsing support
//!
//! Independent inputs share nothing but the (immutable) grammar, so each one
//! gets its own parser, arena and memo table. With the `parallel` feature
//! the batch is spread over rayon's thread pool; without it the inputs are
//! parsed one after another with the same results.
//!
//! ```toml
//! [dependencies]
//! bootpeg = { version = "0.1", features = ["parallel"] }
//! ```
//!
//! # Example
//!
//! ```rust
//! use bootpeg::runtime::parser_dsl::{str, GrammarBuilder};
//! use bootpeg::runtime::parallel::parse_batch_parallel;
//!
//! let grammar = GrammarBuilder::new().rule("word", str("hi")).build();
//! let results = parse_batch_parallel(&grammar, &["hi", "ho", "hi"]);
//!
//! // Results are in same order as inputs
//! assert!(results[0].is_ok());
//! assert!(results[1].is_err());
//! ```

use super::ast::{ParseError, SyntaxTree};
use super::grammar::Grammar;
use super::parser::{PackratParser, ParserConfig};
use super::transform::Value;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Parse multiple inputs from the root rule, in parallel when enabled
///
/// Results are returned in the same order as `inputs`.
pub fn parse_batch_parallel<'a>(
    grammar: &'a Grammar,
    inputs: &[&'a str],
) -> Vec<Result<SyntaxTree<'a>, ParseError>> {
    parse_batch_with_config(grammar, inputs, ParserConfig::default())
}

/// Parse multiple inputs from the root rule with a custom configuration
#[cfg(feature = "rayon")]
pub fn parse_batch_with_config<'a>(
    grammar: &'a Grammar,
    inputs: &[&'a str],
    config: ParserConfig,
) -> Vec<Result<SyntaxTree<'a>, ParseError>> {
    inputs
        .par_iter()
        .map(|input| PackratParser::with_config(grammar, *input, config).parse())
        .collect()
}

/// Parse multiple inputs sequentially (fallback when rayon is not available)
#[cfg(not(feature = "rayon"))]
pub fn parse_batch_with_config<'a>(
    grammar: &'a Grammar,
    inputs: &[&'a str],
    config: ParserConfig,
) -> Vec<Result<SyntaxTree<'a>, ParseError>> {
    inputs
        .iter()
        .map(|input| PackratParser::with_config(grammar, *input, config).parse())
        .collect()
}

/// Parse multiple owned inputs and return their semantic values
///
/// The trees borrow their input, so only the values outlive the call.
#[cfg(feature = "rayon")]
pub fn parse_batch_parallel_owned(
    grammar: &Grammar,
    inputs: Vec<String>,
) -> Vec<Result<Value, ParseError>> {
    inputs
        .into_par_iter()
        .map(|input| grammar.parse(&input).map(|tree| tree.value()))
        .collect()
}

/// Parse multiple owned inputs sequentially (fallback)
#[cfg(not(feature = "rayon"))]
pub fn parse_batch_parallel_owned(
    grammar: &Grammar,
    inputs: Vec<String>,
) -> Vec<Result<Value, ParseError>> {
    inputs
        .into_iter()
        .map(|input| grammar.parse(&input).map(|tree| tree.value()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::parser_dsl::{str, GrammarBuilder};
    use super::*;

    #[test]
    fn test_parse_batch() {
        let grammar = GrammarBuilder::new().rule("test", str("hello")).build();

        let inputs = vec!["hello", "hello", "hello"];
        let results = parse_batch_parallel(&grammar, &inputs);

        assert_eq!(results.len(), 3);
        for result in results {
            assert!(result.is_ok());
        }
    }

    #[test]
    fn test_parse_batch_with_failures() {
        let grammar = GrammarBuilder::new().rule("test", str("hello")).build();

        let inputs = vec!["hello", "world", "hello"];
        let results = parse_batch_parallel(&grammar, &inputs);

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
    }

    #[test]
    fn test_parse_batch_with_config() {
        let grammar = GrammarBuilder::new().rule("test", str("hello")).build();
        let config = ParserConfig::new().with_consume_all_input(false);

        let results = parse_batch_with_config(&grammar, &["hello!", "hello"], config);
        assert!(results.iter().all(Result::is_ok));
    }

    #[test]
    fn test_parse_batch_owned() {
        let grammar = GrammarBuilder::new().rule("test", str("hello")).build();

        let inputs = vec!["hello".to_string(), "nope".to_string()];
        let results = parse_batch_parallel_owned(&grammar, inputs);

        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0].as_ref().unwrap(),
            &Value::hash(vec![("test", Value::string("hello"))])
        );
        assert!(results[1].is_err());
    }
}
