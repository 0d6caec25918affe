//! Character classes
//!
//! A character class matches exactly one character against a set of ranges
//! and singletons, optionally negated and optionally case-insensitive.
//!
//! Membership of ASCII characters is answered from a 128-bit lookup table
//! computed when the class is built; other characters fall back to a scan
//! over the class items.
//!
//! # Example
//!
//! ```rust
//! use bootpeg::runtime::char_class::CharacterClass;
//!
//! let class = CharacterClass::parse(r"A-C123\]").unwrap();
//! assert!(class.matches('B'));
//! assert!(class.matches(']'));
//! assert!(!class.matches('D'));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// One member of a character class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassItem {
    /// A single character
    Single(char),
    /// An inclusive range of characters
    Range(char, char),
}

impl ClassItem {
    #[inline]
    fn contains(&self, c: char) -> bool {
        match *self {
            ClassItem::Single(s) => s == c,
            ClassItem::Range(lo, hi) => lo <= c && c <= hi,
        }
    }
}

/// A set of characters matched as one unit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "ClassRepr", into = "ClassRepr")]
pub struct CharacterClass {
    items: Vec<ClassItem>,
    negated: bool,
    case_insensitive: bool,
    /// Membership bitmap for ASCII characters, derived from the fields above
    ascii: u128,
}

#[derive(Serialize, Deserialize)]
struct ClassRepr {
    items: Vec<ClassItem>,
    #[serde(default)]
    negated: bool,
    #[serde(default)]
    case_insensitive: bool,
}

impl From<ClassRepr> for CharacterClass {
    fn from(repr: ClassRepr) -> Self {
        let mut class = CharacterClass::new(repr.items);
        class.negated = repr.negated;
        class.case_insensitive = repr.case_insensitive;
        class.rebuild_table();
        class
    }
}

impl From<CharacterClass> for ClassRepr {
    fn from(class: CharacterClass) -> Self {
        ClassRepr {
            items: class.items,
            negated: class.negated,
            case_insensitive: class.case_insensitive,
        }
    }
}

/// Error produced when a class body cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassError {
    /// The body contains no characters
    Empty,
    /// A range whose start is greater than its end, such as `z-a`
    ReversedRange {
        /// Start of the range
        start: char,
        /// End of the range
        end: char,
    },
    /// A backslash at the very end of the body
    DanglingEscape,
}

impl fmt::Display for ClassError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassError::Empty => write!(f, "empty character class"),
            ClassError::ReversedRange { start, end } => {
                write!(f, "reversed range {:?}-{:?} in character class", start, end)
            }
            ClassError::DanglingEscape => write!(f, "dangling escape in character class"),
        }
    }
}

impl std::error::Error for ClassError {}

impl CharacterClass {
    /// Create a class from its items
    pub fn new(items: Vec<ClassItem>) -> Self {
        let mut class = Self {
            items,
            negated: false,
            case_insensitive: false,
            ascii: 0,
        };
        class.rebuild_table();
        class
    }

    /// Return this class with negation switched on
    pub fn negated(mut self) -> Self {
        self.negated = true;
        self.rebuild_table();
        self
    }

    /// Return this class with case-insensitive matching switched on
    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self.rebuild_table();
        self
    }

    /// Parse the body of a bracketed class (the text between `[` and `]`)
    ///
    /// A leading `^` negates the class. Backslash escapes `\n`, `\t`, `\r`
    /// and `\0` name control characters; any other escaped character stands
    /// for itself, which is how `\]`, `\\`, `\-` and `\^` are written.
    pub fn parse(body: &str) -> Result<Self, ClassError> {
        let (negated, body) = match body.strip_prefix('^') {
            Some(rest) if !rest.is_empty() => (true, rest),
            _ => (false, body),
        };

        let class = Self::new(Self::parse_items(body)?);
        Ok(if negated { class.negated() } else { class })
    }

    /// Parse class items without interpreting a leading `^`
    ///
    /// Used when the negation marker has already been consumed by the caller.
    pub fn parse_items(body: &str) -> Result<Vec<ClassItem>, ClassError> {
        let chars = decode_class_chars(body)?;
        if chars.is_empty() {
            return Err(ClassError::Empty);
        }

        let mut items = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            let (c, _) = chars[i];
            let is_range = i + 2 < chars.len() && chars[i + 1] == ('-', false);
            if is_range {
                let (end, _) = chars[i + 2];
                if c > end {
                    return Err(ClassError::ReversedRange { start: c, end });
                }
                items.push(ClassItem::Range(c, end));
                i += 3;
            } else {
                items.push(ClassItem::Single(c));
                i += 1;
            }
        }

        Ok(items)
    }

    /// Items of this class in source order
    #[inline]
    pub fn items(&self) -> &[ClassItem] {
        &self.items
    }

    /// Whether the class is negated
    #[inline]
    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Whether the class ignores letter case
    #[inline]
    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// Test a single character for membership
    #[inline]
    pub fn matches(&self, c: char) -> bool {
        if c.is_ascii() {
            return self.ascii & (1u128 << c as u32) != 0;
        }
        self.matches_slow(c)
    }

    fn matches_slow(&self, c: char) -> bool {
        let hit = self.contains(c)
            || (self.case_insensitive
                && (single_case(c.to_lowercase()).is_some_and(|l| self.contains(l))
                    || single_case(c.to_uppercase()).is_some_and(|u| self.contains(u))));
        hit != self.negated
    }

    #[inline]
    fn contains(&self, c: char) -> bool {
        self.items.iter().any(|item| item.contains(c))
    }

    fn rebuild_table(&mut self) {
        self.ascii = 0;
        for b in 0u8..128 {
            if self.matches_slow(b as char) {
                self.ascii |= 1u128 << b;
            }
        }
    }

    /// Render the class body with every special character escaped
    pub fn body_source(&self) -> String {
        let mut out = String::new();
        if self.negated {
            out.push('^');
        }
        for (i, item) in self.items.iter().enumerate() {
            let (first, last) = match *item {
                ClassItem::Single(c) => (c, None),
                ClassItem::Range(lo, hi) => (lo, Some(hi)),
            };
            // A literal '^' in first position would read back as negation
            if first == '^' && i == 0 && !self.negated {
                out.push_str("\\^");
            } else {
                push_class_char(&mut out, first);
            }
            if let Some(hi) = last {
                out.push('-');
                push_class_char(&mut out, hi);
            }
        }
        out
    }
}

impl PartialEq for CharacterClass {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
            && self.negated == other.negated
            && self.case_insensitive == other.case_insensitive
    }
}

impl Eq for CharacterClass {}

impl std::hash::Hash for CharacterClass {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.items.hash(state);
        self.negated.hash(state);
        self.case_insensitive.hash(state);
    }
}

impl fmt::Display for CharacterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.body_source())?;
        if self.case_insensitive {
            write!(f, "i")?;
        }
        Ok(())
    }
}

/// Decode escapes; the flag records whether the character was escaped
fn decode_class_chars(body: &str) -> Result<Vec<(char, bool)>, ClassError> {
    let mut out = Vec::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            let escaped = chars.next().ok_or(ClassError::DanglingEscape)?;
            out.push((unescape_char(escaped), true));
        } else {
            out.push((c, false));
        }
    }
    Ok(out)
}

/// Map the character following a backslash to the character it denotes
#[inline]
pub(crate) fn unescape_char(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        other => other,
    }
}

fn push_class_char(out: &mut String, c: char) {
    match c {
        ']' | '\\' | '-' => {
            out.push('\\');
            out.push(c);
        }
        '\n' => out.push_str("\\n"),
        '\t' => out.push_str("\\t"),
        '\r' => out.push_str("\\r"),
        '\0' => out.push_str("\\0"),
        _ => out.push(c),
    }
}

fn single_case<I: Iterator<Item = char>>(mut mapped: I) -> Option<char> {
    let first = mapped.next()?;
    match mapped.next() {
        None => Some(first),
        Some(_) => None,
    }
}
