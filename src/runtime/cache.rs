//! Packrat memo table
//!
//! The memo table records the outcome of every rule invocation of one parse,
//! keyed by `(rule, position)`. An entry is marked [`MemoEntry::InProgress`]
//! while its rule body is being matched; finding that mark again means the
//! rule re-entered itself without consuming input.
//!
//! The table lives exactly as long as the engine that owns it, so a memo
//! entry can never leak from one input into another.

use super::arena::NodeId;
use super::grammar::RuleId;
use ahash::RandomState;
use hashbrown::HashMap;
use std::mem;

/// Memoized state of a rule invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoEntry {
    /// The rule body is currently being matched at this position
    InProgress,
    /// The rule matched, producing `node` and ending at `end`
    Success {
        /// Rule node of the match
        node: NodeId,
        /// Byte offset just past the match
        end: usize,
    },
    /// The rule failed at this position
    Failure,
}

/// Memo table for one parse invocation
pub struct MemoTable {
    entries: HashMap<(RuleId, usize), MemoEntry, RandomState>,
    hits: u64,
    misses: u64,
}

impl Default for MemoTable {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl MemoTable {
    /// Create a table with room for `estimated_entries`
    #[inline]
    pub fn new(estimated_entries: usize) -> Self {
        Self {
            entries: HashMap::with_capacity_and_hasher(estimated_entries, RandomState::new()),
            hits: 0,
            misses: 0,
        }
    }

    /// Create a table sized for a given input and grammar
    #[inline]
    pub fn for_input(input_len: usize, rule_count: usize) -> Self {
        // Most rules are tried at only a fraction of the positions
        let estimated = (input_len / 4).saturating_mul(rule_count.min(8));
        Self::new(estimated.clamp(64, 500_000))
    }

    /// Look up an entry, counting hits and misses
    ///
    /// An in-progress entry is returned but counted as neither.
    #[inline]
    pub fn lookup(&mut self, rule: RuleId, position: usize) -> Option<MemoEntry> {
        match self.entries.get(&(rule, position)).copied() {
            Some(MemoEntry::InProgress) => Some(MemoEntry::InProgress),
            Some(entry) => {
                self.hits += 1;
                Some(entry)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Mark an invocation as in progress
    #[inline]
    pub fn begin(&mut self, rule: RuleId, position: usize) {
        self.entries.insert((rule, position), MemoEntry::InProgress);
    }

    /// Record the final outcome of an invocation
    #[inline]
    pub fn store(&mut self, rule: RuleId, position: usize, entry: MemoEntry) {
        self.entries.insert((rule, position), entry);
    }

    /// Drop the entry of an invocation so it is matched again next time
    #[inline]
    pub fn forget(&mut self, rule: RuleId, position: usize) {
        self.entries.remove(&(rule, position));
    }

    /// Remove every entry and reset the statistics
    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }

    /// Get cache statistics: (hits, misses, hit_rate)
    pub fn stats(&self) -> (u64, u64, f64) {
        let total = self.hits + self.misses;
        let rate = if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        };
        (self.hits, self.misses, rate)
    }

    /// Number of entries
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Estimate heap usage in bytes
    pub fn memory_usage(&self) -> usize {
        self.entries.capacity() * mem::size_of::<((RuleId, usize), MemoEntry)>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::grammar::Grammar;

    fn rule_ids() -> (RuleId, RuleId) {
        let mut grammar = Grammar::new();
        (grammar.install_rule("a"), grammar.install_rule("b"))
    }

    #[test]
    fn test_basic_operations() {
        let (a, b) = rule_ids();
        let mut memo = MemoTable::default();

        assert_eq!(memo.lookup(a, 0), None);
        memo.store(
            a,
            0,
            MemoEntry::Success {
                node: NodeId::from_index(3),
                end: 5,
            },
        );
        memo.store(b, 0, MemoEntry::Failure);

        assert_eq!(
            memo.lookup(a, 0),
            Some(MemoEntry::Success {
                node: NodeId::from_index(3),
                end: 5
            })
        );
        assert_eq!(memo.lookup(b, 0), Some(MemoEntry::Failure));
        assert_eq!(memo.lookup(b, 1), None);
        assert_eq!(memo.len(), 2);
    }

    #[test]
    fn test_in_progress_not_counted() {
        let (a, _) = rule_ids();
        let mut memo = MemoTable::new(16);
        memo.begin(a, 7);

        assert_eq!(memo.lookup(a, 7), Some(MemoEntry::InProgress));
        assert_eq!(memo.stats(), (0, 0, 0.0));
    }

    #[test]
    fn test_hit_rate() {
        let (a, _) = rule_ids();
        let mut memo = MemoTable::for_input(100, 4);
        memo.lookup(a, 0);
        memo.store(a, 0, MemoEntry::Failure);
        memo.lookup(a, 0);
        memo.lookup(a, 0);
        memo.lookup(a, 0);

        let (hits, misses, rate) = memo.stats();
        assert_eq!(hits, 3);
        assert_eq!(misses, 1);
        assert!((rate - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_clear() {
        let (a, _) = rule_ids();
        let mut memo = MemoTable::default();
        memo.store(a, 0, MemoEntry::Failure);
        memo.clear();
        assert!(memo.is_empty());
        assert_eq!(memo.stats().0, 0);
    }
}
