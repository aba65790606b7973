//! The event emitter: wildcard pattern subscriptions over the trie, plus
//! plain opaque-token subscriptions.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use indexmap::IndexSet;
use rustc_hash::{FxBuildHasher, FxHashMap};
use smallvec::SmallVec;
use tracing::{debug, trace};

use kaiku_trie::PatternTrie;

use crate::handler::Handler;

type FxIndexSet<T> = IndexSet<T, FxBuildHasher>;

/// Opaque subscription key for the non-pattern side of the emitter.
///
/// Tokens are process-unique and carry no matching semantics: an emit on a
/// token reaches exactly the handlers subscribed to that token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token(u64);

impl Token {
    /// Returns a fresh, process-unique token.
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Handler sets of one token subscription.
struct TokenSets<A: 'static> {
    permanent: FxIndexSet<Handler<A>>,
    oneshot: FxIndexSet<Handler<A>>,
}

impl<A> Default for TokenSets<A> {
    fn default() -> Self {
        Self {
            permanent: FxIndexSet::default(),
            oneshot: FxIndexSet::default(),
        }
    }
}

impl<A> TokenSets<A> {
    fn is_empty(&self) -> bool {
        self.permanent.is_empty() && self.oneshot.is_empty()
    }
}

struct EmitterState<A: 'static> {
    patterns: PatternTrie<Handler<A>>,
    tokens: FxHashMap<Token, TokenSets<A>>,
}

/// An event emitter dispatching to wildcard pattern subscriptions.
///
/// String subscriptions go through the pattern trie: a `*` in a pattern
/// matches any run of characters, while a `*` in an emitted name is an
/// ordinary character. Token subscriptions live in a plain map beside the
/// trie.
///
/// An `Emitter` is a handle to shared state; a clone is a second handle to
/// the same subscriptions. `emit` completes the whole matching and
/// one-shot-consumption pass and releases the state before invoking the
/// first handler, so a handler may subscribe or unsubscribe through a
/// clone of the emitter while an emit is in flight. A subscription made
/// this way to a pattern matching the in-flight name fires from the next
/// emit, never the current one, and the set of handlers an emit invokes is
/// fixed once its matching pass completes. Within one subscription set,
/// handlers run in subscription order; across patterns the order is
/// unspecified.
///
/// # Example
/// ```
/// use kaiku_emitter::{Emitter, Handler};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let hits = Arc::new(AtomicUsize::new(0));
/// let counted = Arc::clone(&hits);
///
/// let emitter = Emitter::new();
/// emitter.on(
///     "task.*.done",
///     Handler::new(move |_: &String| {
///         counted.fetch_add(1, Ordering::Relaxed);
///     }),
/// );
///
/// assert!(emitter.emit("task.42.done", &"payload".to_string()));
/// assert!(!emitter.emit("task.42.started", &"payload".to_string()));
/// assert_eq!(hits.load(Ordering::Relaxed), 1);
/// ```
pub struct Emitter<A: 'static> {
    state: Arc<Mutex<EmitterState<A>>>,
}

impl<A> Emitter<A> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(EmitterState {
                patterns: PatternTrie::new(),
                tokens: FxHashMap::default(),
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, EmitterState<A>> {
        // handlers run with the lock released, so a panicking handler
        // cannot poison the state mid-mutation
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribes `handler` to every event whose name matches `pattern`.
    pub fn on(&self, pattern: &str, handler: Handler<A>) {
        trace!(pattern, "subscribe");
        self.state().patterns.insert(pattern, handler, false);
    }

    /// Like [`on`](Self::on), but the subscription is consumed by the first
    /// matching emit.
    pub fn once(&self, pattern: &str, handler: Handler<A>) {
        trace!(pattern, "subscribe once");
        self.state().patterns.insert(pattern, handler, true);
    }

    /// Unsubscribes `handler` from `pattern`, or every handler of the
    /// pattern when `handler` is `None`. Unknown patterns and handlers are
    /// ignored.
    pub fn off(&self, pattern: &str, handler: Option<&Handler<A>>) {
        trace!(pattern, "unsubscribe");
        self.state().patterns.remove(pattern, handler);
    }

    /// Fires every subscription matching `name` with `arg`, consuming the
    /// one-shots among them. Returns whether any handler ran.
    pub fn emit(&self, name: &str, arg: &A) -> bool {
        let mut fired: SmallVec<[Handler<A>; 8]> = SmallVec::new();
        let any = self
            .state()
            .patterns
            .dispatch(name, |handler| fired.push(handler.clone()));
        debug!(name, fired = fired.len(), "emit");
        for handler in &fired {
            handler.call(arg);
        }
        any
    }

    /// Subscribes `handler` to `token`.
    pub fn on_token(&self, token: Token, handler: Handler<A>) {
        trace!(?token, "subscribe");
        self.state()
            .tokens
            .entry(token)
            .or_default()
            .permanent
            .insert(handler);
    }

    /// Subscribes `handler` to `token` for a single emit.
    pub fn once_token(&self, token: Token, handler: Handler<A>) {
        trace!(?token, "subscribe once");
        self.state()
            .tokens
            .entry(token)
            .or_default()
            .oneshot
            .insert(handler);
    }

    /// Unsubscribes `handler` from `token`, or every handler of the token
    /// when `handler` is `None`.
    pub fn off_token(&self, token: Token, handler: Option<&Handler<A>>) {
        trace!(?token, "unsubscribe");
        let mut state = self.state();
        let Some(sets) = state.tokens.get_mut(&token) else {
            return;
        };
        match handler {
            Some(h) => {
                if !sets.permanent.shift_remove(h) {
                    sets.oneshot.shift_remove(h);
                }
            }
            None => {
                sets.permanent.clear();
                sets.oneshot.clear();
            }
        }
        if sets.is_empty() {
            state.tokens.remove(&token);
        }
    }

    /// Fires every handler subscribed to `token`, consuming its one-shots.
    /// Returns whether any handler ran.
    pub fn emit_token(&self, token: Token, arg: &A) -> bool {
        let mut fired: SmallVec<[Handler<A>; 8]> = SmallVec::new();
        {
            let mut state = self.state();
            let Some(sets) = state.tokens.get_mut(&token) else {
                return false;
            };
            fired.extend(sets.permanent.iter().cloned());
            fired.extend(sets.oneshot.drain(..));
            if sets.is_empty() {
                state.tokens.remove(&token);
            }
        }
        if fired.is_empty() {
            return false;
        }
        debug!(?token, fired = fired.len(), "emit token");
        for handler in &fired {
            handler.call(arg);
        }
        true
    }

    /// The stored patterns, collected. Order is unspecified.
    pub fn patterns(&self) -> Vec<String> {
        self.state().patterns.patterns().collect()
    }

    /// Handlers subscribed to exactly `pattern`, permanent first.
    pub fn listeners(&self, pattern: &str) -> Vec<Handler<A>> {
        self.state().patterns.handlers(pattern)
    }

    /// Number of handlers subscribed to exactly `pattern`.
    pub fn listener_count(&self, pattern: &str) -> usize {
        self.state().patterns.handlers_count(pattern)
    }

    /// Drops every subscription, pattern and token alike.
    pub fn clear(&self) {
        let mut state = self.state();
        state.patterns.clear();
        state.tokens.clear();
    }
}

impl<A> Clone for Emitter<A> {
    /// Returns a second handle to the same emitter.
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<A> Default for Emitter<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for Emitter<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Emitter")
            .field("patterns", &state.patterns)
            .field("tokens", &state.tokens.len())
            .finish()
    }
}
