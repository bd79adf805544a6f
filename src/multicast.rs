//! Multicast: no-payload subscriber list on top of `DenseHashSet`.

use crate::dense_hash_set::DenseHashSet;
use crate::error::SetError;
use crate::identity::{identity_hash, Action};
use crate::prime::DEFAULT_CAPACITY;
use crate::view::{self, CollectionView};
use core::fmt;
use tracing::trace;

/// Set of [`Action`]s invoked together.
///
/// Handlers run synchronously in current storage order. A handler that
/// subscribes or unsubscribes on the same multicast during `invoke` gets
/// [`SetError::ConcurrentModification`].
pub struct Multicast {
    handlers: DenseHashSet<Action>,
}

impl Multicast {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(requested: usize) -> Self {
        Self {
            handlers: DenseHashSet::with_capacity(requested),
        }
    }

    pub fn try_with_capacity(requested: usize) -> Result<Self, SetError> {
        Ok(Self {
            handlers: DenseHashSet::try_with_capacity(requested)?,
        })
    }

    /// Fails with `DuplicateValue` if an equal action is already subscribed.
    pub fn subscribe(&self, action: Action) -> Result<(), SetError> {
        let hash = identity_hash(&action);
        self.handlers.insert(action, hash)
    }

    /// Returns whether a matching action was subscribed. Unsubscribing an
    /// unknown action is a no-op.
    pub fn unsubscribe(&self, action: &Action) -> Result<bool, SetError> {
        Ok(self
            .handlers
            .remove(action, identity_hash(action))?
            .is_some())
    }

    pub fn is_subscribed(&self, action: &Action) -> Result<bool, SetError> {
        self.handlers.contains(action, identity_hash(action))
    }

    /// Call every subscribed action once, in storage order.
    ///
    /// Fails with `ConcurrentModification` if called from inside one of its
    /// own handlers.
    pub fn invoke(&self) -> Result<(), SetError> {
        let handlers = self.handlers.enumerate()?;
        trace!(handlers = handlers.len(), "invoking multicast");
        for action in handlers {
            action.call();
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.handlers.capacity()
    }

    pub fn snapshot(&self) -> Vec<Action> {
        self.handlers.snapshot()
    }
}

impl Default for Multicast {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectionView for Multicast {
    type Item = Action;

    fn len(&self) -> usize {
        Multicast::len(self)
    }

    fn capacity(&self) -> usize {
        Multicast::capacity(self)
    }

    fn snapshot(&self) -> Vec<Action> {
        Multicast::snapshot(self)
    }
}

impl fmt::Debug for Multicast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        view::fmt_collection(f, "Multicast", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    struct Recorder {
        name: &'static str,
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl Recorder {
        fn record(&self) {
            self.log.borrow_mut().push(self.name);
        }
    }

    #[test]
    fn invoke_runs_every_handler_once() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let m = Multicast::new();
        for name in ["a", "b", "c"] {
            let r = Rc::new(Recorder {
                name,
                log: Rc::clone(&log),
            });
            m.subscribe(Action::bound(&r, Recorder::record)).unwrap();
        }
        m.invoke().unwrap();
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
        m.invoke().unwrap();
        assert_eq!(log.borrow().len(), 6);
    }

    #[test]
    fn unsubscribe_with_fresh_instance() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let r = Rc::new(Recorder {
            name: "r",
            log: Rc::clone(&log),
        });
        let m = Multicast::new();
        m.subscribe(Action::bound(&r, Recorder::record)).unwrap();
        assert!(m
            .is_subscribed(&Action::bound(&r, Recorder::record))
            .unwrap());
        assert!(m.unsubscribe(&Action::bound(&r, Recorder::record)).unwrap());
        assert!(!m.unsubscribe(&Action::bound(&r, Recorder::record)).unwrap());
        m.invoke().unwrap();
        assert!(log.borrow().is_empty());
        assert!(m.is_empty());
    }

    #[test]
    fn duplicate_subscribe_is_rejected() {
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let f: Rc<dyn Fn()> = Rc::new(move || h.set(h.get() + 1));
        let m = Multicast::new();
        m.subscribe(Action::shared(Rc::clone(&f))).unwrap();
        assert_eq!(
            m.subscribe(Action::shared(f)),
            Err(SetError::DuplicateValue)
        );
        m.invoke().unwrap();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn empty_invoke_is_ok() {
        let m = Multicast::default();
        m.invoke().unwrap();
        assert_eq!(m.capacity(), 7);
        assert_eq!(format!("{m:?}"), "Multicast { len: 0, capacity: 7, items: [] }");
    }
}
