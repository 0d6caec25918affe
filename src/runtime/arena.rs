//! Arena allocator for syntax nodes
//!
//! All nodes of one parse live in a single vector and refer to their
//! children through ranges of a shared child pool, so building a node is an
//! O(1) push and dropping a tree frees everything at once. Label names are
//! interned so a label node stores only a small index.

use super::ast::NodeKind;
use ahash::RandomState;
use hashbrown::HashMap;
use std::mem;

/// Index of a node within its arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Build an id from a raw index
    #[inline]
    pub fn from_index(index: usize) -> Self {
        NodeId(index as u32)
    }

    /// Raw index of the node
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy)]
struct NodeData {
    kind: NodeKind,
    start: u32,
    end: u32,
    /// Offset of the first child in the child pool
    first_child: u32,
    child_count: u32,
}

/// The arena allocator
#[derive(Debug)]
pub struct SyntaxArena {
    nodes: Vec<NodeData>,
    child_pool: Vec<NodeId>,
    labels: Vec<String>,
    label_index: HashMap<String, u32, RandomState>,
}

impl Default for SyntaxArena {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntaxArena {
    /// Create a new arena with default capacity
    #[inline]
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create a new arena with room for `capacity` nodes
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            child_pool: Vec::with_capacity(capacity),
            labels: Vec::new(),
            label_index: HashMap::with_hasher(RandomState::new()),
        }
    }

    /// Create a new arena sized for a given input length
    ///
    /// Typical grammars create a handful of nodes per input character.
    #[inline]
    pub fn for_input(input_len: usize) -> Self {
        let estimated_nodes = input_len.saturating_mul(2).clamp(64, 1_000_000);
        Self::with_capacity(estimated_nodes)
    }

    /// Number of allocated nodes
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no node has been allocated
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop every node, keeping allocated memory and interned labels
    #[inline]
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.child_pool.clear();
    }

    /// Allocate a node whose children are `children`, in order
    pub fn alloc(&mut self, kind: NodeKind, start: usize, end: usize, children: &[NodeId]) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let first_child = self.child_pool.len() as u32;
        self.child_pool.extend_from_slice(children);
        self.nodes.push(NodeData {
            kind,
            start: start as u32,
            end: end as u32,
            first_child,
            child_count: children.len() as u32,
        });
        id
    }

    /// Allocate a childless node
    #[inline]
    pub fn leaf(&mut self, kind: NodeKind, start: usize, end: usize) -> NodeId {
        self.alloc(kind, start, end, &[])
    }

    /// Intern a label name and return its index
    pub fn intern_label(&mut self, name: &str) -> u32 {
        if let Some(&index) = self.label_index.get(name) {
            return index;
        }
        let index = self.labels.len() as u32;
        self.labels.push(name.to_string());
        self.label_index.insert(name.to_string(), index);
        index
    }

    /// Label name by index
    #[inline]
    pub fn label(&self, index: u32) -> &str {
        self.labels
            .get(index as usize)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Kind of a node
    #[inline]
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id.index()].kind
    }

    /// Start offset of a node
    #[inline]
    pub fn start(&self, id: NodeId) -> usize {
        self.nodes[id.index()].start as usize
    }

    /// End offset of a node
    #[inline]
    pub fn end(&self, id: NodeId) -> usize {
        self.nodes[id.index()].end as usize
    }

    /// Children of a node
    #[inline]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        let node = &self.nodes[id.index()];
        let first = node.first_child as usize;
        &self.child_pool[first..first + node.child_count as usize]
    }

    /// Estimate heap usage in bytes
    pub fn memory_usage(&self) -> usize {
        self.nodes.capacity() * mem::size_of::<NodeData>()
            + self.child_pool.capacity() * mem::size_of::<NodeId>()
            + self.labels.iter().map(String::capacity).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_and_children() {
        let mut arena = SyntaxArena::new();
        let a = arena.leaf(NodeKind::Terminal, 0, 1);
        let b = arena.leaf(NodeKind::Terminal, 1, 3);
        let seq = arena.alloc(NodeKind::Sequence, 0, 3, &[a, b]);

        assert_eq!(arena.len(), 3);
        assert_eq!(arena.children(seq), &[a, b]);
        assert!(arena.children(a).is_empty());
        assert_eq!(arena.start(seq), 0);
        assert_eq!(arena.end(seq), 3);
        assert_eq!(arena.kind(seq), NodeKind::Sequence);
    }

    #[test]
    fn test_intern_label() {
        let mut arena = SyntaxArena::new();
        let first = arena.intern_label("name");
        let second = arena.intern_label("value");
        let again = arena.intern_label("name");

        assert_eq!(first, again);
        assert_ne!(first, second);
        assert_eq!(arena.label(second), "value");
        assert_eq!(arena.label(99), "");
    }

    #[test]
    fn test_reset_keeps_labels() {
        let mut arena = SyntaxArena::for_input(100);
        let label = arena.intern_label("x");
        arena.leaf(NodeKind::Label(label), 0, 0);
        arena.reset();

        assert!(arena.is_empty());
        assert_eq!(arena.label(label), "x");
    }

    #[test]
    fn test_memory_usage_grows() {
        let mut arena = SyntaxArena::with_capacity(1);
        let before = arena.memory_usage();
        for i in 0..100 {
            arena.leaf(NodeKind::Terminal, i, i + 1);
        }
        assert!(arena.memory_usage() > before);
    }
}
