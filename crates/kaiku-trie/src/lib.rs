//! # kaiku-trie
//!
//! Compressed pattern trie (radix tree) with wildcard multi-match dispatch.
//!
//! Subscriptions are literal strings in which each `*` matches any run of
//! characters, including the empty one. Dispatching a concrete name finds
//! every stored pattern whose language contains it in a single pass over
//! the shared index.
//!
//! ## The problem
//!
//! A naive subscription registry checks every pattern against every emitted
//! name. With thousands of subscriptions that is O(patterns) work per emit,
//! almost all of it on patterns that share prefixes with each other.
//!
//! ## The solution
//!
//! Contiguous literal runs are compressed into edge labels and shared, so
//! common prefixes are walked once. Wildcards are a dedicated child slot on
//! any node; the literal segment that follows one is located with the
//! Knuth–Morris–Pratt failure function, so a wildcard hop costs O(name +
//! segment) rather than a retry per alignment. Removal and one-shot
//! consumption shrink the trie back to minimal form as they go.
//!
//! ## Example
//!
//! ```
//! use kaiku_trie::PatternTrie;
//!
//! let mut trie = PatternTrie::new();
//! trie.insert("order.*.shipped", "warehouse", false);
//! trie.insert("order.eu.*", "customs", false);
//! trie.insert("*", "audit", true);
//!
//! let mut fired = Vec::new();
//! assert!(trie.dispatch("order.eu.shipped", |tag| fired.push(*tag)));
//! fired.sort();
//! assert_eq!(fired, vec!["audit", "customs", "warehouse"]);
//!
//! // the "*" subscription was a one-shot and is gone now
//! let mut fired = Vec::new();
//! trie.dispatch("order.eu.shipped", |tag| fired.push(*tag));
//! fired.sort();
//! assert_eq!(fired, vec!["customs", "warehouse"]);
//! ```
//!
//! ## Key operations
//!
//! - [`PatternTrie::insert`] - subscribe a handler, permanent or one-shot
//! - [`PatternTrie::remove`] - unsubscribe; the trie re-compresses itself
//! - [`PatternTrie::dispatch`] - fire every subscription matching a name
//! - [`PatternTrie::patterns`] - lazily enumerate the stored patterns
//! - [`PatternTrie::handlers`] - exact-pattern lookup

mod debug;
mod dispatch;
mod iter;
mod kmp;
mod node;
mod trie;

pub use iter::Patterns;
pub use trie::PatternTrie;
