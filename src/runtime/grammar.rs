//! Grammar types for bootpeg
//!
//! A [`Grammar`] maps rule names to parsing expressions and designates a
//! root rule. Rules are stored in insertion order and addressed by
//! [`RuleId`] so the engine can key its memo table without hashing names.
//!
//! A rule *slot* can exist before its definition: the grammar compiler
//! installs a slot the first time a name is referenced and fills it in when
//! the definition is reached. [`Grammar::validate`] reports every slot that
//! was never filled.

use super::ast::{ParseError, SyntaxTree};
use super::expression::{Expression, ExpressionVisitor};
use super::grammar_analysis::{GrammarAnalyzer, GrammarWarning};
use super::parser::PackratParser;
use ahash::RandomState;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a rule within its grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(u32);

impl RuleId {
    /// Position of the rule in insertion order
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A named rule, possibly not yet defined
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Rule name
    pub name: String,
    /// Defining expression, `None` for a slot installed by a forward reference
    pub expression: Option<Expression>,
}

impl Rule {
    /// Whether the rule has a definition
    #[inline]
    pub fn is_defined(&self) -> bool {
        self.expression.is_some()
    }
}

/// One or more rule references that do not resolve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndefinedRuleError {
    /// Every unresolved name, in first-seen order
    pub names: Vec<String>,
}

impl fmt::Display for UndefinedRuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.names.len() == 1 {
            write!(f, "undefined rule: {}", self.names[0])
        } else {
            write!(f, "undefined rules: {}", self.names.join(", "))
        }
    }
}

impl std::error::Error for UndefinedRuleError {}

/// Error raised when defining a rule whose name is already defined
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateRuleError {
    /// The rule name
    pub name: String,
}

impl fmt::Display for DuplicateRuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule {} is defined more than once", self.name)
    }
}

impl std::error::Error for DuplicateRuleError {}

/// A complete grammar
///
/// Equality ignores rule order and the grammar name: two grammars are equal
/// when they have the same root and the same rule map.
#[derive(Clone, Serialize, Deserialize)]
#[serde(from = "GrammarRepr", into = "GrammarRepr")]
pub struct Grammar {
    name: Option<String>,
    rules: Vec<Rule>,
    index: HashMap<String, RuleId, RandomState>,
    root: Option<RuleId>,
}

#[derive(Serialize, Deserialize)]
struct GrammarRepr {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default)]
    root: Option<String>,
    rules: Vec<Rule>,
}

impl From<GrammarRepr> for Grammar {
    fn from(repr: GrammarRepr) -> Self {
        let mut grammar = Grammar::new();
        grammar.name = repr.name;
        for rule in repr.rules {
            let id = grammar.install_rule(&rule.name);
            grammar.rules[id.index()].expression = rule.expression;
        }
        if let Some(root) = repr.root {
            grammar.set_root(&root);
        }
        grammar
    }
}

impl From<Grammar> for GrammarRepr {
    fn from(grammar: Grammar) -> Self {
        let root = grammar.root_name().map(str::to_string);
        GrammarRepr {
            name: grammar.name,
            root,
            rules: grammar.rules,
        }
    }
}

impl Grammar {
    /// Create a new empty grammar
    #[inline]
    pub fn new() -> Self {
        Self {
            name: None,
            rules: Vec::new(),
            index: HashMap::with_hasher(RandomState::new()),
            root: None,
        }
    }

    /// Create an empty grammar with a name
    pub fn named(name: impl Into<String>) -> Self {
        let mut grammar = Self::new();
        grammar.name = Some(name.into());
        grammar
    }

    /// Grammar name, if any
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Set the grammar name
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Look up or create the slot for `name`
    ///
    /// Idempotent: installing the same name twice returns the same id and
    /// never touches an existing definition.
    pub fn install_rule(&mut self, name: &str) -> RuleId {
        if let Some(&id) = self.index.get(name) {
            return id;
        }
        let id = RuleId(self.rules.len() as u32);
        self.rules.push(Rule {
            name: name.to_string(),
            expression: None,
        });
        self.index.insert(name.to_string(), id);
        id
    }

    /// Install a slot for `name` and return a reference expression to it
    pub fn rule_reference(&mut self, name: &str) -> Expression {
        self.install_rule(name);
        Expression::RuleReference(name.to_string())
    }

    /// Add or replace a rule definition
    pub fn add_rule(&mut self, name: &str, expression: Expression) -> RuleId {
        let id = self.install_rule(name);
        self.rules[id.index()].expression = Some(expression);
        id
    }

    /// Define a rule, failing if it already has a definition
    pub fn define(
        &mut self,
        name: &str,
        expression: Expression,
    ) -> Result<RuleId, DuplicateRuleError> {
        let id = self.install_rule(name);
        let rule = &mut self.rules[id.index()];
        if rule.expression.is_some() {
            return Err(DuplicateRuleError {
                name: name.to_string(),
            });
        }
        rule.expression = Some(expression);
        Ok(id)
    }

    /// Designate the root rule, installing a slot if needed
    pub fn set_root(&mut self, name: &str) {
        self.root = Some(self.install_rule(name));
    }

    /// Id of the root rule
    #[inline]
    pub fn root(&self) -> Option<RuleId> {
        self.root
    }

    /// Name of the root rule
    pub fn root_name(&self) -> Option<&str> {
        self.root.map(|id| self.rules[id.index()].name.as_str())
    }

    /// Id of the rule called `name`
    #[inline]
    pub fn rule_id(&self, name: &str) -> Option<RuleId> {
        self.index.get(name).copied()
    }

    /// Rule by id
    #[inline]
    pub fn rule(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(id.index())
    }

    /// Defining expression of the rule called `name`
    pub fn get(&self, name: &str) -> Option<&Expression> {
        self.rule_id(name)
            .and_then(|id| self.rules[id.index()].expression.as_ref())
    }

    /// Whether a rule called `name` has a definition
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All rules in insertion order
    #[inline]
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// All rule names in insertion order
    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|rule| rule.name.as_str())
    }

    /// Number of rules (including undefined slots)
    #[inline]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the grammar has no rules at all
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Names that are referenced or installed but never defined
    pub fn undefined_rules(&self) -> Vec<String> {
        let mut collector = ReferenceCollector::default();
        for rule in &self.rules {
            if let Some(expression) = &rule.expression {
                expression.walk(&mut collector);
            }
        }

        let mut missing: Vec<String> = Vec::new();
        let slots = self
            .rules
            .iter()
            .filter(|rule| !rule.is_defined())
            .map(|rule| rule.name.as_str());
        for name in slots.chain(collector.names.iter().map(String::as_str)) {
            if !self.contains(name) && !missing.iter().any(|m| m == name) {
                missing.push(name.to_string());
            }
        }
        missing
    }

    /// Check that every rule reference resolves
    pub fn validate(&self) -> Result<(), UndefinedRuleError> {
        let names = self.undefined_rules();
        if names.is_empty() {
            Ok(())
        } else {
            Err(UndefinedRuleError { names })
        }
    }

    /// Walk every defined rule body in insertion order
    pub fn visit_expressions<V: ExpressionVisitor>(&self, visitor: &mut V) {
        for rule in &self.rules {
            if let Some(expression) = &rule.expression {
                expression.walk(visitor);
            }
        }
    }

    /// Serialize to JSON
    #[inline]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to indented JSON
    #[inline]
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON
    #[inline]
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Analyze the grammar for potential issues and return warnings
    ///
    /// # Example
    ///
    /// ```
    /// use bootpeg::runtime::{Expression, Grammar, WarningKind};
    ///
    /// let mut grammar = Grammar::new();
    /// grammar.add_rule("expr", Expression::reference("expr"));
    /// grammar.set_root("expr");
    ///
    /// let warnings = grammar.analyze_warnings();
    /// assert!(warnings.iter().any(|w| w.kind == WarningKind::LeftRecursion));
    /// ```
    pub fn analyze_warnings(&self) -> Vec<GrammarWarning> {
        GrammarAnalyzer::new(self).analyze()
    }

    /// One-shot parse of `input` from the root rule
    ///
    /// # Example
    ///
    /// ```
    /// use bootpeg::runtime::parser_dsl::{str, GrammarBuilder};
    ///
    /// let grammar = GrammarBuilder::new()
    ///     .rule("hello", str("hello"))
    ///     .build();
    ///
    /// assert!(grammar.parse("hello").is_ok());
    /// assert!(grammar.parse("help").is_err());
    /// ```
    pub fn parse<'a>(&'a self, input: &'a str) -> Result<SyntaxTree<'a>, ParseError> {
        PackratParser::new(self, input).parse()
    }

    /// One-shot parse of `input` from the rule called `rule`
    pub fn parse_rule<'a>(
        &'a self,
        rule: &str,
        input: &'a str,
    ) -> Result<SyntaxTree<'a>, ParseError> {
        PackratParser::new(self, input).parse_rule(rule)
    }
}

impl Default for Grammar {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Grammar {
    fn eq(&self, other: &Self) -> bool {
        self.root_name() == other.root_name()
            && self.rules.len() == other.rules.len()
            && self.rules.iter().all(|rule| {
                other
                    .rule_id(&rule.name)
                    .and_then(|id| other.rule(id))
                    .is_some_and(|theirs| theirs.expression == rule.expression)
            })
    }
}

impl Eq for Grammar {}

impl fmt::Debug for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grammar")
            .field("name", &self.name)
            .field("root", &self.root_name())
            .field("rules", &self.rules)
            .finish()
    }
}

/// Renders the grammar in its own source language, one rule per line
impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The root goes first so that the text compiles back to the same root
        let ordered = self
            .root
            .into_iter()
            .chain((0..self.rules.len() as u32).map(RuleId).filter(|id| Some(*id) != self.root));
        for id in ordered {
            let rule = &self.rules[id.index()];
            if let Some(expression) = &rule.expression {
                writeln!(f, "{} = {}", rule.name, expression)?;
            }
        }
        Ok(())
    }
}

/// Collects referenced rule names in first-seen order
#[derive(Debug, Default)]
pub struct ReferenceCollector {
    /// Names seen so far
    pub names: Vec<String>,
}

impl ExpressionVisitor for ReferenceCollector {
    fn visit_rule_reference(&mut self, name: &str) {
        if !self.names.iter().any(|n| n == name) {
            self.names.push(name.to_string());
        }
    }
}
