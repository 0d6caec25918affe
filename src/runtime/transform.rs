//! Semantic Values and Transformations
//!
//! Every syntax node has a generic semantic value ([`Value`]) computed on
//! demand from the tree. A [`Transform`] then rewrites those generic values
//! into whatever a grammar's user needs, rule by rule.
//!
//! # Example
//!
//! ```rust
//! use bootpeg::runtime::transform::*;
//!
//! // Define transform rules
//! let transform = Transform::new()
//!     .rule("int", |v| {
//!         let n = v.as_int().ok_or_else(|| TransformError::Custom("not an int".to_string()))?;
//!         Ok(Value::int(n * 2))
//!     });
//!
//! // Create a value to transform
//! let value = Value::hash(vec![("int", Value::int(21))]);
//!
//! // Apply transform
//! let result = transform.apply(&value).unwrap();
//! assert_eq!(result.as_int(), Some(42));
//! ```

use super::ast::{NodeKind, SyntaxNode};
use std::collections::HashMap;
use std::fmt;

/// A semantic value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Null/nil value
    #[default]
    Nil,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Float value
    Float(f64),
    /// String value
    String(String),
    /// Array of values
    Array(Vec<Value>),
    /// Hash/object of key-value pairs
    Hash(HashMap<String, Value>),
}

impl Value {
    /// Create a nil value
    pub fn nil() -> Self {
        Value::Nil
    }

    /// Create a boolean value
    pub fn bool(b: bool) -> Self {
        Value::Bool(b)
    }

    /// Create an integer value
    pub fn int(n: i64) -> Self {
        Value::Int(n)
    }

    /// Create a float value
    pub fn float(f: f64) -> Self {
        Value::Float(f)
    }

    /// Create a string value
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    /// Create an array value
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(items)
    }

    /// Create a hash value
    pub fn hash(pairs: Vec<(impl Into<String>, Value)>) -> Self {
        let mut map = HashMap::new();
        for (k, v) in pairs {
            map.insert(k.into(), v);
        }
        Value::Hash(map)
    }

    /// Check if this is nil
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Get as boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Get as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as array
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Get as hash
    pub fn as_hash(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Hash(h) => Some(h),
            _ => None,
        }
    }

    /// Get a hash value by key
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Hash(h) => h.get(key),
            _ => None,
        }
    }

    /// Get an array element by index
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        match self {
            Value::Array(arr) => arr.get(index),
            _ => None,
        }
    }

    /// Short name of the value's type
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Hash(_) => "hash",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Array(arr) => {
                write!(f, "[")?;
                for (i, v) in arr.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Hash(h) => {
                let mut keys: Vec<&String> = h.keys().collect();
                keys.sort();
                write!(f, "{{")?;
                for (i, k) in keys.into_iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}: {}", k, h[k])?;
                }
                write!(f, "}}")
            }
        }
    }
}

// ============================================================================
// Tree to value
// ============================================================================

/// Generic semantic value of a syntax node
///
/// * terminals become their text;
/// * a rule node becomes `{rule_name: value of its body}`;
/// * a label node becomes `{label: value of its match}`;
/// * a sequence holding labeled matches becomes the hash of those labels;
/// * other sequences and repetitions become their text when every part is
///   text, and the array of their non-nil parts otherwise;
/// * an optional is the value of its match or nil; predicates are nil.
pub(crate) fn node_to_value(node: SyntaxNode<'_>) -> Value {
    match node.kind() {
        NodeKind::Terminal => Value::String(node.text().to_string()),
        NodeKind::Rule(_) => {
            let name = node.rule_name().unwrap_or_default();
            let inner = node.child(0).map(node_to_value).unwrap_or_default();
            Value::hash(vec![(name, inner)])
        }
        NodeKind::Label(_) => {
            let name = node.label().unwrap_or_default();
            let inner = node.child(0).map(node_to_value).unwrap_or_default();
            Value::hash(vec![(name, inner)])
        }
        NodeKind::Sequence => {
            let mut labels = HashMap::new();
            collect_labels(node, &mut labels);
            if labels.is_empty() {
                composite_value(node)
            } else {
                Value::Hash(labels)
            }
        }
        NodeKind::Repetition => composite_value(node),
        NodeKind::Optional => node.child(0).map(node_to_value).unwrap_or_default(),
        NodeKind::Predicate => Value::Nil,
    }
}

/// Gather labeled matches of a sequence, looking through nested sequences
/// and optionals but not into rules, repetitions or other labels
fn collect_labels(node: SyntaxNode<'_>, labels: &mut HashMap<String, Value>) {
    for child in node.children() {
        match child.kind() {
            NodeKind::Label(_) => {
                let name = child.label().unwrap_or_default().to_string();
                let value = child.child(0).map(node_to_value).unwrap_or_default();
                labels.insert(name, value);
            }
            NodeKind::Sequence | NodeKind::Optional => collect_labels(child, labels),
            _ => {}
        }
    }
}

fn composite_value(node: SyntaxNode<'_>) -> Value {
    let values: Vec<Value> = node.children().map(node_to_value).collect();
    if values
        .iter()
        .all(|v| matches!(v, Value::String(_) | Value::Nil))
    {
        Value::String(node.text().to_string())
    } else {
        Value::Array(values.into_iter().filter(|v| !v.is_nil()).collect())
    }
}

// ============================================================================
// Transform
// ============================================================================

/// Error during transformation
#[derive(Debug, Clone)]
pub enum TransformError {
    /// Rule not found
    RuleNotFound(String),
    /// Type mismatch
    TypeMismatch {
        /// Expected type name
        expected: String,
        /// Actual type name found
        actual: String,
    },
    /// Missing field
    MissingField(String),
    /// Custom error
    Custom(String),
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformError::RuleNotFound(name) => write!(f, "transform rule not found: {}", name),
            TransformError::TypeMismatch { expected, actual } => {
                write!(f, "type mismatch: expected {}, got {}", expected, actual)
            }
            TransformError::MissingField(field) => write!(f, "missing field: {}", field),
            TransformError::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for TransformError {}

type TransformFn = Box<dyn Fn(&Value) -> Result<Value, TransformError> + Send + Sync>;

/// A rule-keyed rewriting of semantic values
///
/// A single-key hash whose key names a registered rule is replaced by the
/// result of that rule applied to the (already transformed) inner value.
/// Everything else is transformed structurally.
pub struct Transform {
    rules: HashMap<String, TransformFn>,
    default: Option<TransformFn>,
    strict: bool,
}

impl Transform {
    /// Create a new empty transform
    pub fn new() -> Self {
        Self {
            rules: HashMap::new(),
            default: None,
            strict: false,
        }
    }

    /// Add a transformation rule
    pub fn rule<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, TransformError> + Send + Sync + 'static,
    {
        self.rules.insert(name.to_string(), Box::new(f));
        self
    }

    /// Set the transform applied to leaf values
    pub fn default_rule<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, TransformError> + Send + Sync + 'static,
    {
        self.default = Some(Box::new(f));
        self
    }

    /// Fail on single-key hashes that have no rule
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Apply the transform to a value
    pub fn apply(&self, value: &Value) -> Result<Value, TransformError> {
        match value {
            Value::Hash(h) => {
                if h.len() == 1 {
                    if let Some((key, inner)) = h.iter().next() {
                        if let Some(rule) = self.rules.get(key) {
                            let transformed_inner = self.apply(inner)?;
                            return rule(&transformed_inner);
                        }
                        if self.strict {
                            return Err(TransformError::RuleNotFound(key.clone()));
                        }
                    }
                }

                let mut result = HashMap::with_capacity(h.len());
                for (k, v) in h {
                    result.insert(k.clone(), self.apply(v)?);
                }
                Ok(Value::Hash(result))
            }
            Value::Array(arr) => {
                let result: Result<Vec<Value>, TransformError> =
                    arr.iter().map(|v| self.apply(v)).collect();
                Ok(Value::Array(result?))
            }
            _ => match &self.default {
                Some(default) => default(value),
                None => Ok(value.clone()),
            },
        }
    }

    /// Check if a rule exists
    pub fn has_rule(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract an integer from a value
pub fn extract_int(value: &Value) -> Result<i64, TransformError> {
    value.as_int().ok_or_else(|| TransformError::TypeMismatch {
        expected: "int".to_string(),
        actual: value.type_name().to_string(),
    })
}

/// Extract a string from a value
pub fn extract_string(value: &Value) -> Result<String, TransformError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| TransformError::TypeMismatch {
            expected: "string".to_string(),
            actual: value.type_name().to_string(),
        })
}

/// Extract a hash field
pub fn extract_field<'a>(value: &'a Value, field: &str) -> Result<&'a Value, TransformError> {
    value
        .get(field)
        .ok_or_else(|| TransformError::MissingField(field.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::grammar::Grammar;
    use crate::runtime::parser_dsl::*;

    fn sum_grammar() -> Grammar {
        GrammarBuilder::new()
            .rule(
                "sum",
                ref_("number")
                    .label("left")
                    .then(str("+"))
                    .then(ref_("number").label("right")),
            )
            .rule(
                "number",
                char_class(crate::runtime::CharacterClass::parse("0-9").unwrap()).many1(),
            )
            .build()
    }

    #[test]
    fn test_value_accessors() {
        let v = Value::hash(vec![("a", Value::int(1)), ("b", Value::string("x"))]);
        assert_eq!(v.get("a").and_then(Value::as_int), Some(1));
        assert_eq!(v.get("b").and_then(Value::as_str), Some("x"));
        assert!(v.get("c").is_none());
        assert_eq!(Value::int(2).as_float(), Some(2.0));
        assert_eq!(v.type_name(), "hash");
    }

    #[test]
    fn test_display_sorts_keys() {
        let v = Value::hash(vec![("z", Value::Nil), ("a", Value::array(vec![Value::int(1)]))]);
        assert_eq!(v.to_string(), "{\"a\": [1], \"z\": nil}");
    }

    #[test]
    fn test_node_values() {
        let grammar = sum_grammar();
        let tree = grammar.parse("12+30").unwrap();
        let value = tree.value();

        let sum = value.get("sum").unwrap();
        let left = sum.get("left").unwrap();
        assert_eq!(left.get("number").and_then(Value::as_str), Some("12"));
        let right = sum.get("right").unwrap();
        assert_eq!(right.get("number").and_then(Value::as_str), Some("30"));
    }

    #[test]
    fn test_transform_evaluates() {
        let grammar = sum_grammar();
        let tree = grammar.parse("12+30").unwrap();

        let transform = Transform::new()
            .rule("number", |v| {
                let text = extract_string(v)?;
                text.parse::<i64>()
                    .map(Value::int)
                    .map_err(|e| TransformError::Custom(e.to_string()))
            })
            .rule("sum", |v| {
                let left = extract_int(extract_field(v, "left")?)?;
                let right = extract_int(extract_field(v, "right")?)?;
                Ok(Value::int(left + right))
            });

        let result = tree.root().value_with(&transform).unwrap();
        assert_eq!(result.as_int(), Some(42));
    }

    #[test]
    fn test_strict_transform() {
        let value = Value::hash(vec![("unknown", Value::Nil)]);
        let err = Transform::new().strict().apply(&value).unwrap_err();
        assert!(matches!(err, TransformError::RuleNotFound(name) if name == "unknown"));
    }

    #[test]
    fn test_repetition_of_rules_is_array() {
        let grammar = GrammarBuilder::new()
            .rule("list", ref_("item").many())
            .rule("item", str("x").or(str("y")))
            .build();
        let tree = grammar.parse("xyx").unwrap();
        let items = tree.value();
        let items = items.get("list").and_then(Value::as_array).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[1].get("item").and_then(Value::as_str), Some("y"));
    }

    #[test]
    fn test_default_rule_on_leaves() {
        let transform = Transform::new().default_rule(|v| match v {
            Value::String(s) => Ok(Value::string(s.to_uppercase())),
            other => Ok(other.clone()),
        });
        let value = Value::array(vec![Value::string("a"), Value::Nil]);
        assert_eq!(
            transform.apply(&value).unwrap(),
            Value::array(vec![Value::string("A"), Value::Nil])
        );
    }
}
