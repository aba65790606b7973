//! Multi-match dispatch: discover every subscription matching an emitted
//! name, then fire handlers, consume one-shots, and clean up bottom-up.
//!
//! Dispatch runs in two phases. Discovery walks the trie with an explicit
//! work stack, alternating literal descent with KMP scans for the literal
//! segments that follow a wildcard, and records a branch for every way the
//! name can be consumed. Invocation then fires the recorded branches and
//! unwinds them in LIFO order (post-order over the trie), so a node's
//! subtree is cleaned before the node itself. Because the branch set is
//! complete before the first handler is reported, subscriptions made while
//! a dispatch is being processed never join that dispatch.
//!
//! Branches identify nodes by their root path instead of holding parent
//! pointers. All firing happens before the first structural change, while
//! every recorded path still resolves; during cleanup a path that no
//! longer resolves was emptied or merged away through another branch and
//! is skipped.

use rustc_hash::FxHashSet;

use crate::kmp;
use crate::node::TrieNode;
use crate::trie::{node_at_mut, Path, PatternTrie, Step};

/// Final hop of a recorded branch.
#[derive(Debug, Clone, Copy)]
enum Tail {
    /// The whole name was consumed at the node: fire its own sets and its
    /// trailing-wildcard child's sets.
    Terminal,
    /// The name continues with this byte and the node has a wildcard child
    /// that absorbs the rest: fire the wildcard child's sets, then clean up
    /// the keyed literal child.
    Pending(u8),
}

/// A trail captured by discovery. The hops `path[trail_start..]` are the
/// literal transitions this trail unwinds through; the steps before
/// `trail_start` only locate the trail in the trie.
#[derive(Debug)]
struct Branch {
    path: Path,
    trail_start: usize,
    tail: Tail,
}

struct WorkItem<'t, H> {
    cursor: usize,
    node: &'t TrieNode<H>,
    path: Path,
    trail_start: usize,
}

impl<H> PatternTrie<H> {
    /// Reports every handler whose pattern matches `name` to `sink`,
    /// consuming the one-shots among them, and returns whether any handler
    /// fired. `*` in `name` is an ordinary character.
    ///
    /// Handlers on one node are reported in insertion order, permanent
    /// before one-shot; no order is defined across distinct patterns. Each
    /// node's sets are reported at most once per dispatch, no matter how
    /// many wildcard alignments reach them.
    pub fn dispatch(&mut self, name: &str, mut sink: impl FnMut(&H)) -> bool {
        let name = name.as_bytes();
        let branches = self.discover(name);
        self.invoke(branches, &mut sink)
    }

    fn discover(&self, name: &[u8]) -> Vec<Branch> {
        let mut branches = Vec::new();
        let mut work = vec![WorkItem {
            cursor: 0,
            node: &self.root,
            path: Path::new(),
            trail_start: 0,
        }];

        while let Some(WorkItem {
            cursor,
            node,
            path,
            trail_start,
        }) = work.pop()
        {
            if cursor == name.len() {
                branches.push(Branch {
                    path,
                    trail_start,
                    tail: Tail::Terminal,
                });
                continue;
            }

            let key = name[cursor];
            let literal = node
                .children
                .get(&key)
                .filter(|child| name[cursor..].starts_with(&child.label));

            let Some(wildcard) = node.wildcard.as_deref() else {
                if let Some(child) = literal {
                    let mut child_path = path;
                    child_path.push(Step::Literal(key));
                    work.push(WorkItem {
                        cursor: cursor + child.label.len(),
                        node: child,
                        path: child_path,
                        trail_start,
                    });
                }
                continue;
            };

            // the wildcard child may absorb the whole remaining suffix
            branches.push(Branch {
                path: path.clone(),
                trail_start,
                tail: Tail::Pending(key),
            });

            // the literal descent continues on a trail of its own; its
            // cleanup is anchored by the branch recorded above
            if let Some(child) = literal {
                let mut child_path = path.clone();
                child_path.push(Step::Literal(key));
                let trail_start = child_path.len();
                work.push(WorkItem {
                    cursor: cursor + child.label.len(),
                    node: child,
                    path: child_path,
                    trail_start,
                });
            }

            // every literal child of the wildcard can resume matching at
            // each place its label occurs in the remaining name
            let mut wildcard_path = path;
            wildcard_path.push(Step::Wildcard);
            for (child_key, child) in &wildcard.children {
                let table = child.failure_table();
                kmp::scan(&name[cursor..], &child.label, table, |end| {
                    let mut grand_path = wildcard_path.clone();
                    grand_path.push(Step::Literal(*child_key));
                    work.push(WorkItem {
                        cursor: cursor + end + 1,
                        node: child,
                        path: grand_path,
                        trail_start: wildcard_path.len(),
                    });
                });
            }
        }
        branches
    }

    /// Fires the captured branches, then cleans up the structure they
    /// touched. The two sweeps are separate so that every recorded path
    /// still resolves while handlers are being reported; only the cleanup
    /// sweep moves nodes around, and by then a path that fails to resolve
    /// was already handled through another branch.
    fn invoke(&mut self, mut branches: Vec<Branch>, sink: &mut impl FnMut(&H)) -> bool {
        let mut any_fired = false;
        // firing targets already reported this dispatch: a node's path for
        // its own sets, the path extended by a wildcard step for its
        // wildcard child's sets
        let mut fired: FxHashSet<Path> = FxHashSet::default();

        for branch in branches.iter().rev() {
            let Some(node) = node_at_mut(&mut self.root, &branch.path) else {
                continue;
            };
            fire_wildcard_sets(node, &branch.path, &mut fired, sink, &mut any_fired);
            if matches!(branch.tail, Tail::Terminal) {
                fire_own_sets(node, &branch.path, &mut fired, sink, &mut any_fired);
            }
        }

        while let Some(Branch {
            mut path,
            trail_start,
            tail,
        }) = branches.pop()
        {
            let mut keep_unwinding = match node_at_mut(&mut self.root, &path) {
                None => true,
                Some(node) => {
                    detach_wildcard_if_empty(node);
                    if let Tail::Pending(key) = tail {
                        detach_child_if_empty(node, key);
                    }
                    node.shrink()
                }
            };

            while keep_unwinding && path.len() > trail_start {
                let Some(Step::Literal(key)) = path.pop() else {
                    break;
                };
                keep_unwinding = match node_at_mut(&mut self.root, &path) {
                    None => true,
                    Some(parent) => {
                        detach_wildcard_if_empty(parent);
                        detach_child_if_empty(parent, key);
                        parent.shrink()
                    }
                };
            }
        }
        any_fired
    }
}

/// Fires the sets of `node`'s wildcard child and consumes its one-shots.
fn fire_wildcard_sets<H>(
    node: &mut TrieNode<H>,
    path: &Path,
    fired: &mut FxHashSet<Path>,
    sink: &mut impl FnMut(&H),
    any_fired: &mut bool,
) {
    let Some(wildcard) = node.wildcard.as_deref_mut() else {
        return;
    };
    let mut target = path.clone();
    target.push(Step::Wildcard);
    if fired.insert(target) {
        fire_sets(wildcard, sink, any_fired);
    }
}

/// Fires `node`'s own sets and consumes its one-shots.
fn fire_own_sets<H>(
    node: &mut TrieNode<H>,
    path: &Path,
    fired: &mut FxHashSet<Path>,
    sink: &mut impl FnMut(&H),
    any_fired: &mut bool,
) {
    if fired.insert(path.clone()) {
        fire_sets(node, sink, any_fired);
    }
}

fn fire_sets<H>(node: &mut TrieNode<H>, sink: &mut impl FnMut(&H), any_fired: &mut bool) {
    if let Some(set) = &node.permanent {
        for handler in set {
            sink(handler);
            *any_fired = true;
        }
    }
    if let Some(set) = node.oneshot.take() {
        for handler in &set {
            sink(handler);
            *any_fired = true;
        }
    }
}

fn detach_wildcard_if_empty<H>(node: &mut TrieNode<H>) {
    if node.wildcard.as_deref().is_some_and(|wildcard| wildcard.is_empty()) {
        node.wildcard = None;
    }
}

fn detach_child_if_empty<H>(node: &mut TrieNode<H>, key: u8) {
    if node.children.get(&key).is_some_and(|child| child.is_empty()) {
        node.children.remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(trie: &mut PatternTrie<u32>, name: &str) -> (bool, Vec<u32>) {
        let mut fired = Vec::new();
        let any = trie.dispatch(name, |id| fired.push(*id));
        fired.sort_unstable();
        (any, fired)
    }

    #[test]
    fn test_exact_match() {
        let mut trie = PatternTrie::new();
        trie.insert("abc", 1, false);
        assert_eq!(collect(&mut trie, "abc"), (true, vec![1]));
        assert_eq!(collect(&mut trie, "abd"), (false, vec![]));
        assert_eq!(collect(&mut trie, "ab"), (false, vec![]));
        assert_eq!(collect(&mut trie, "abcd"), (false, vec![]));
    }

    #[test]
    fn test_bare_wildcard_matches_everything() {
        let mut trie = PatternTrie::new();
        trie.insert("*", 1, false);
        assert_eq!(collect(&mut trie, ""), (true, vec![1]));
        assert_eq!(collect(&mut trie, "*"), (true, vec![1]));
        assert_eq!(collect(&mut trie, "anything"), (true, vec![1]));
    }

    #[test]
    fn test_empty_pattern_matches_empty_name_only() {
        let mut trie = PatternTrie::new();
        trie.insert("", 1, false);
        assert_eq!(collect(&mut trie, ""), (true, vec![1]));
        assert_eq!(collect(&mut trie, "a"), (false, vec![]));
    }

    #[test]
    fn test_wildcard_consumes_empty_run() {
        let mut trie = PatternTrie::new();
        trie.insert("a*a", 1, false);
        assert_eq!(collect(&mut trie, "aa"), (true, vec![1]));
        assert_eq!(collect(&mut trie, "a"), (false, vec![]));
        assert_eq!(collect(&mut trie, "axya"), (true, vec![1]));
    }

    #[test]
    fn test_leading_wildcard_suffix_match() {
        let mut trie = PatternTrie::new();
        trie.insert("*cc", 1, false);
        assert_eq!(collect(&mut trie, "cc"), (true, vec![1]));
        assert_eq!(collect(&mut trie, "abcc"), (true, vec![1]));
        assert_eq!(collect(&mut trie, "abc"), (false, vec![]));
        assert_eq!(collect(&mut trie, "ccc"), (true, vec![1]));
    }

    #[test]
    fn test_star_in_name_is_literal() {
        let mut trie = PatternTrie::new();
        trie.insert("a", 1, false);
        trie.insert("*", 2, false);
        assert_eq!(collect(&mut trie, "*"), (true, vec![2]));
        assert_eq!(collect(&mut trie, "a*"), (true, vec![2]));
    }

    #[test]
    fn test_overlapping_alignments_fire_once() {
        // "a" occurs twice in "aa"; both alignments reach the same terminal
        let mut trie = PatternTrie::new();
        trie.insert("*a*", 1, false);
        let mut fired = Vec::new();
        assert!(trie.dispatch("aa", |id| fired.push(*id)));
        assert_eq!(fired, vec![1]);
    }

    #[test]
    fn test_oneshot_consumed_on_first_match() {
        let mut trie = PatternTrie::new();
        trie.insert("a*", 1, true);
        assert_eq!(collect(&mut trie, "ab"), (true, vec![1]));
        assert_eq!(collect(&mut trie, "ab"), (false, vec![]));
        assert!(trie.is_empty());
    }

    #[test]
    fn test_oneshot_drain_shrinks_structure() {
        let mut trie = PatternTrie::new();
        trie.insert("a*b*c", 1, true);
        trie.insert("abc", 2, false);
        assert_eq!(collect(&mut trie, "abc"), (true, vec![1, 2]));
        // only the literal "abc" subscription is left
        assert_eq!(trie.node_count(), 2);
        assert_eq!(collect(&mut trie, "abc"), (true, vec![2]));
    }

    #[test]
    fn test_permanent_survives_dispatch() {
        let mut trie = PatternTrie::new();
        trie.insert("*x", 1, false);
        for _ in 0..3 {
            assert_eq!(collect(&mut trie, "yx"), (true, vec![1]));
        }
    }

    #[test]
    fn test_wildcard_chain_alignment() {
        let mut trie = PatternTrie::new();
        trie.insert("a*b*c", 1, false);
        assert_eq!(collect(&mut trie, "abc"), (true, vec![1]));
        assert_eq!(collect(&mut trie, "axbyc"), (true, vec![1]));
        assert_eq!(collect(&mut trie, "abcbc"), (true, vec![1]));
        assert_eq!(collect(&mut trie, "acb"), (false, vec![]));
    }

    #[test]
    fn test_trailing_wildcard_on_terminal_node() {
        let mut trie = PatternTrie::new();
        trie.insert("ab", 1, false);
        trie.insert("ab*", 2, false);
        assert_eq!(collect(&mut trie, "ab"), (true, vec![1, 2]));
        assert_eq!(collect(&mut trie, "abc"), (true, vec![2]));
    }

    #[test]
    fn test_sibling_subtrees_matched_through_one_wildcard_child() {
        // "g" occurs twice in the name; one alignment drains the "a" fork,
        // the other must still fire the "b" fork even though the shared
        // "g" node gets restructured by the first one's cleanup
        let mut trie = PatternTrie::new();
        trie.insert("*ga*", 1, true);
        trie.insert("*gb", 2, true);

        assert_eq!(collect(&mut trie, "gagb"), (true, vec![1, 2]));
        assert!(trie.is_empty());
    }

    #[test]
    fn test_dispatch_on_empty_trie() {
        let mut trie: PatternTrie<u32> = PatternTrie::new();
        assert_eq!(collect(&mut trie, "a"), (false, vec![]));
        assert_eq!(collect(&mut trie, ""), (false, vec![]));
    }
}
