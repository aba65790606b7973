//! # kaiku-emitter
//!
//! Event emitter with wildcard subscriptions, built on the
//! [`kaiku-trie`](kaiku_trie) pattern index.
//!
//! Subscribers register for event names with literal patterns that may
//! embed `*` wildcards; emitting a name fires every matching subscription
//! in one pass. Handlers are type-erased closures with reference identity,
//! so the handle returned by [`Handler::new`] (or any clone of it) is also
//! the key for unsubscribing. An [`Emitter`] is itself a cloneable handle
//! to shared state, which lets a running handler re-register through a
//! clone; such subscriptions take effect from the next emit. Opaque
//! [`Token`] subscriptions sit beside the pattern index for callers that
//! key subscriptions by identity rather than by name.
//!
//! ```
//! use kaiku_emitter::{Emitter, Handler};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let seen = Arc::new(AtomicUsize::new(0));
//! let counted = Arc::clone(&seen);
//!
//! let emitter: Emitter<Vec<String>> = Emitter::new();
//! let audit = Handler::new(move |args: &Vec<String>| {
//!     counted.fetch_add(args.len(), Ordering::Relaxed);
//! });
//! emitter.on("user.*", audit.clone());
//!
//! emitter.emit("user.login", &vec!["alice".into()]);
//! emitter.emit("billing.charge", &vec!["19.99".into()]);
//! assert_eq!(seen.load(Ordering::Relaxed), 1);
//!
//! emitter.off("user.*", Some(&audit));
//! assert!(!emitter.emit("user.logout", &vec![]));
//! ```

mod emitter;
mod handler;

pub use emitter::{Emitter, Token};
pub use handler::Handler;
