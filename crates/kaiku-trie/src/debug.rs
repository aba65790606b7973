//! Internal consistency checks used by the test suites.

use crate::node::TrieNode;
use crate::trie::PatternTrie;

impl<H> PatternTrie<H> {
    /// Walks the whole trie and panics on the first structural invariant
    /// violation. Intended for tests and debugging, not for production
    /// paths.
    ///
    /// Checked per node: children are keyed by the first byte of their
    /// label and labels are never empty or contain `*`; handler sets are
    /// compacted away when empty; no non-root literal node is a single
    /// child pass-through without handlers or a wildcard. Wildcard-slot
    /// nodes must keep an empty label (dispatch never scans it) and are
    /// allowed to be pass-throughs.
    pub fn validate(&self) {
        assert!(self.root.label.is_empty(), "root label must stay empty");
        validate_node(&self.root, true, false);
    }
}

fn validate_node<H>(node: &TrieNode<H>, is_root: bool, in_wildcard_slot: bool) {
    assert!(
        !node.label.contains(&b'*'),
        "labels never contain the wildcard byte"
    );
    assert!(
        node.permanent.as_ref().is_none_or(|set| !set.is_empty()),
        "empty permanent set must be compacted to None"
    );
    assert!(
        node.oneshot.as_ref().is_none_or(|set| !set.is_empty()),
        "empty oneshot set must be compacted to None"
    );

    if in_wildcard_slot {
        assert!(node.label.is_empty(), "wildcard-slot node must stay unlabeled");
        assert!(!node.is_empty(), "empty wildcard-slot node must be detached");
    } else if !is_root {
        assert!(!node.label.is_empty(), "non-root literal node needs a label");
        let pass_through =
            !node.has_handlers() && node.wildcard.is_none() && node.children.len() == 1;
        assert!(!pass_through, "single-child pass-through must be merged");
        assert!(!node.is_empty(), "empty node must be detached");
    }

    for (key, child) in &node.children {
        assert_eq!(
            Some(key),
            child.label.first(),
            "child key must equal the first label byte"
        );
        validate_node(child, false, false);
    }
    if let Some(wildcard) = node.wildcard.as_deref() {
        validate_node(wildcard, false, true);
    }
}
