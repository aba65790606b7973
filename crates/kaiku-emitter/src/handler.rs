//! Type-erased event callbacks with reference identity.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A subscription callback taking the emitted argument by reference.
///
/// `Handler` is a shared reference to a closure: cloning it clones the
/// reference, not the closure. Two handlers are equal exactly when they
/// point at the same closure, so a clone can be used to unsubscribe the
/// original while two separately built handlers never collide, even if
/// their code is identical.
pub struct Handler<A: 'static> {
    callback: Arc<dyn Fn(&A) + Send + Sync>,
}

impl<A> Handler<A> {
    pub fn new(callback: impl Fn(&A) + Send + Sync + 'static) -> Self {
        Self {
            callback: Arc::new(callback),
        }
    }

    /// Invokes the underlying closure.
    pub fn call(&self, arg: &A) {
        (self.callback)(arg);
    }
}

impl<A> Clone for Handler<A> {
    fn clone(&self) -> Self {
        Self {
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<A> PartialEq for Handler<A> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.callback, &other.callback)
    }
}

impl<A> Eq for Handler<A> {}

impl<A> Hash for Handler<A> {
    fn hash<S: Hasher>(&self, state: &mut S) {
        (Arc::as_ptr(&self.callback) as *const () as usize).hash(state);
    }
}

impl<A> fmt::Debug for Handler<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler({:p})", Arc::as_ptr(&self.callback))
    }
}
