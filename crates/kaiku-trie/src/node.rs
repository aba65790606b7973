//! Trie node: one edge label, literal children, an optional wildcard child,
//! and the handler sets that fire when a dispatched name matches.

use std::cell::OnceCell;
use std::hash::Hash;

use indexmap::IndexSet;
use rustc_hash::{FxBuildHasher, FxHashMap};

use crate::kmp;

/// Handler set with insertion-order iteration.
pub(crate) type FxIndexSet<T> = IndexSet<T, FxBuildHasher>;

/// One node of the pattern trie.
///
/// `label` is the edge from the parent; the root and freshly created
/// wildcard children carry an empty label. Labels never contain `*`: the
/// wildcard transition is structural, held in the `wildcard` slot.
///
/// Handler sets are `None` rather than empty so that `is_empty` and the
/// shrink rules can test presence cheaply; every mutation compacts an
/// emptied set back to `None`.
#[derive(Debug, Clone)]
pub(crate) struct TrieNode<H> {
    pub(crate) label: Vec<u8>,
    /// Literal children, keyed by the first byte of the child's label.
    pub(crate) children: FxHashMap<u8, TrieNode<H>>,
    /// Child reached by consuming a `*` of the stored pattern.
    pub(crate) wildcard: Option<Box<TrieNode<H>>>,
    /// Handlers that fire on every matching dispatch.
    pub(crate) permanent: Option<FxIndexSet<H>>,
    /// Handlers that fire at most once; dispatch consumes them.
    pub(crate) oneshot: Option<FxIndexSet<H>>,
    /// Cached KMP failure table for `label`; reset whenever `label` changes.
    failure: OnceCell<Vec<u32>>,
}

impl<H> TrieNode<H> {
    pub(crate) fn new(label: Vec<u8>) -> Self {
        Self {
            label,
            children: FxHashMap::default(),
            wildcard: None,
            permanent: None,
            oneshot: None,
            failure: OnceCell::new(),
        }
    }

    /// Length of the longest common prefix of `label` and `query[cursor..]`.
    pub(crate) fn longest_prefix_match(&self, query: &[u8], cursor: usize) -> usize {
        self.label
            .iter()
            .zip(&query[cursor..])
            .take_while(|(a, b)| a == b)
            .count()
    }

    /// Failure table for `label`, computed on first use.
    pub(crate) fn failure_table(&self) -> &[u32] {
        self.failure.get_or_init(|| kmp::failure_table(&self.label))
    }

    pub(crate) fn has_handlers(&self) -> bool {
        self.permanent.is_some() || self.oneshot.is_some()
    }

    /// Combined size of both handler sets.
    pub(crate) fn handler_count(&self) -> usize {
        self.permanent.as_ref().map_or(0, IndexSet::len)
            + self.oneshot.as_ref().map_or(0, IndexSet::len)
    }

    /// True when nothing keeps this node alive.
    pub(crate) fn is_empty(&self) -> bool {
        !self.has_handlers() && self.children.is_empty() && self.wildcard.is_none()
    }

    /// Returns the wildcard child, creating an empty-labeled one if absent.
    pub(crate) fn wildcard_or_insert(&mut self) -> &mut TrieNode<H> {
        self.wildcard
            .get_or_insert_with(|| Box::new(TrieNode::new(Vec::new())))
    }

    /// Splits this node in place: it becomes an interior node labeled
    /// `label[..at]` whose sole literal child carries `label[at..]` together
    /// with all previous state. `at` must be a proper prefix length.
    pub(crate) fn split(&mut self, at: usize) {
        debug_assert!(at < self.label.len());
        let tail_label = self.label.split_off(at);
        let key = tail_label[0];
        let mut tail = TrieNode::new(tail_label);
        std::mem::swap(&mut tail.children, &mut self.children);
        tail.wildcard = self.wildcard.take();
        tail.permanent = self.permanent.take();
        tail.oneshot = self.oneshot.take();
        self.failure = OnceCell::new();
        self.children.insert(key, tail);
    }

    /// Restores the radix compression invariant at this node.
    ///
    /// Returns true when the node no longer needs to exist on its own: it is
    /// fully empty (the caller may detach it) or it absorbed its single
    /// literal child. Nodes with an empty label never merge; the root must
    /// keep its empty label and a wildcard-slot node's label is never
    /// scanned by dispatch.
    pub(crate) fn shrink(&mut self) -> bool {
        if self.has_handlers() || self.wildcard.is_some() {
            return false;
        }
        match self.children.len() {
            0 => true,
            1 if self.label.is_empty() => true,
            1 => {
                let key = self.children.keys().next().copied();
                if let Some(child) = key.and_then(|k| self.children.remove(&k)) {
                    self.label.extend_from_slice(&child.label);
                    self.children = child.children;
                    self.wildcard = child.wildcard;
                    self.permanent = child.permanent;
                    self.oneshot = child.oneshot;
                    self.failure = OnceCell::new();
                }
                true
            }
            _ => false,
        }
    }
}

impl<H: Eq + Hash> TrieNode<H> {
    pub(crate) fn add_handler(&mut self, handler: H, oneshot: bool) {
        let set = if oneshot {
            &mut self.oneshot
        } else {
            &mut self.permanent
        };
        set.get_or_insert_with(FxIndexSet::default).insert(handler);
    }

    /// Deletes `handler` from the permanent set, else from the one-shot set,
    /// compacting an emptied set to `None`. With no handler given, clears
    /// both sets. Returns whether anything was deleted.
    pub(crate) fn erase_handlers(&mut self, handler: Option<&H>) -> bool {
        match handler {
            Some(h) => {
                if let Some(set) = self.permanent.as_mut() {
                    if set.shift_remove(h) {
                        if set.is_empty() {
                            self.permanent = None;
                        }
                        return true;
                    }
                }
                if let Some(set) = self.oneshot.as_mut() {
                    if set.shift_remove(h) {
                        if set.is_empty() {
                            self.oneshot = None;
                        }
                        return true;
                    }
                }
                false
            }
            None => {
                let had = self.has_handlers();
                self.permanent = None;
                self.oneshot = None;
                had
            }
        }
    }
}
