//! Callback identity and allocation-free identity hashing.
//!
//! A callback is a function optionally bound to a receiver. Two callbacks
//! built separately from the same receiver and the same function are equal
//! and hash the same, so a subscriber can unsubscribe without keeping the
//! instance it subscribed with.
//!
//! Receiver identity is the address of its `Rc` allocation. A bound callback
//! holds a strong reference, so the address stays valid (and unique) for as
//! long as any copy of the callback exists. Function identity is the function
//! pointer address; the compiler may merge identical functions, so distinct
//! but identical free functions can compare equal.

use core::fmt;
use core::hash::{Hash, Hasher};
use std::rc::Rc;

/// Receiver and function addresses of a callback.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Identity {
    receiver: Option<usize>,
    function: usize,
}

impl Identity {
    pub fn receiver(&self) -> Option<usize> {
        self.receiver
    }

    pub fn function(&self) -> usize {
        self.function
    }

    /// Receiver address when bound, function address otherwise, folded to
    /// 32 bits. Integer arithmetic only.
    #[inline]
    pub fn hash32(&self) -> u32 {
        fold(self.receiver.unwrap_or(self.function))
    }
}

#[inline]
fn fold(addr: usize) -> u32 {
    let a = addr as u64;
    (a ^ (a >> 32)) as u32
}

#[inline]
fn rc_addr<R: ?Sized>(rc: &Rc<R>) -> usize {
    Rc::as_ptr(rc) as *const () as usize
}

/// A function, optionally bound to a receiver, invoked through `F`.
///
/// Cloning is a reference-count bump. Equality and hashing use only the
/// [`Identity`].
pub struct Callback<F: ?Sized> {
    identity: Identity,
    call: Rc<F>,
}

/// Callback taking no payload.
pub type Action = Callback<dyn Fn()>;

/// Callback receiving a mutable event record.
pub type EventHandler<E> = Callback<dyn Fn(&mut E)>;

impl<F: ?Sized> Callback<F> {
    pub fn identity(&self) -> Identity {
        self.identity
    }

    pub fn is_bound(&self) -> bool {
        self.identity.receiver.is_some()
    }
}

/// 32-bit identity hash of `callback`; see [`Identity::hash32`].
#[inline]
pub fn identity_hash<F: ?Sized>(callback: &Callback<F>) -> u32 {
    callback.identity.hash32()
}

impl Callback<dyn Fn()> {
    /// Unbound function.
    pub fn from_fn(f: fn()) -> Self {
        let call: Rc<dyn Fn()> = Rc::new(f);
        Self {
            identity: Identity {
                receiver: None,
                function: f as usize,
            },
            call,
        }
    }

    /// `method` bound to `receiver`.
    pub fn bound<R: 'static>(receiver: &Rc<R>, method: fn(&R)) -> Self {
        let r = Rc::clone(receiver);
        Self {
            identity: Identity {
                receiver: Some(rc_addr(receiver)),
                function: method as usize,
            },
            call: Rc::new(move || method(&r)),
        }
    }

    /// Shared closure; the closure's allocation acts as the receiver, so
    /// clones of the same `Rc` are the same callback.
    pub fn shared(f: Rc<dyn Fn()>) -> Self {
        Self {
            identity: Identity {
                receiver: Some(rc_addr(&f)),
                function: 0,
            },
            call: f,
        }
    }

    #[inline]
    pub fn call(&self) {
        (self.call)()
    }
}

impl<E: 'static> Callback<dyn Fn(&mut E)> {
    pub fn from_fn(f: fn(&mut E)) -> Self {
        let call: Rc<dyn Fn(&mut E)> = Rc::new(f);
        Self {
            identity: Identity {
                receiver: None,
                function: f as usize,
            },
            call,
        }
    }

    pub fn bound<R: 'static>(receiver: &Rc<R>, method: fn(&R, &mut E)) -> Self {
        let r = Rc::clone(receiver);
        Self {
            identity: Identity {
                receiver: Some(rc_addr(receiver)),
                function: method as usize,
            },
            call: Rc::new(move |e: &mut E| method(&r, e)),
        }
    }

    pub fn shared(f: Rc<dyn Fn(&mut E)>) -> Self {
        Self {
            identity: Identity {
                receiver: Some(rc_addr(&f)),
                function: 0,
            },
            call: f,
        }
    }

    #[inline]
    pub fn call(&self, event: &mut E) {
        (self.call)(event)
    }
}

impl<F: ?Sized> Clone for Callback<F> {
    fn clone(&self) -> Self {
        Self {
            identity: self.identity,
            call: Rc::clone(&self.call),
        }
    }
}

impl<F: ?Sized> PartialEq for Callback<F> {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl<F: ?Sized> Eq for Callback<F> {}

impl<F: ?Sized> Hash for Callback<F> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity.hash(state);
    }
}

impl<F: ?Sized> fmt::Debug for Callback<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("receiver", &self.identity.receiver)
            .field("function", &format_args!("{:#x}", self.identity.function))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Counter {
        hits: Cell<u32>,
    }

    impl Counter {
        fn bump(&self) {
            self.hits.set(self.hits.get() + 1);
        }
        fn bump_twice(&self) {
            self.hits.set(self.hits.get() + 2);
        }
    }

    fn noop() {}

    #[test]
    fn same_receiver_and_method_are_equal() {
        let c = Rc::new(Counter { hits: Cell::new(0) });
        let a = Action::bound(&c, Counter::bump);
        let b = Action::bound(&c, Counter::bump);
        assert_eq!(a, b);
        assert_eq!(identity_hash(&a), identity_hash(&b));
        assert!(a.is_bound());
    }

    #[test]
    fn same_receiver_different_method_share_hash_but_differ() {
        let c = Rc::new(Counter { hits: Cell::new(0) });
        let a = Action::bound(&c, Counter::bump);
        let b = Action::bound(&c, Counter::bump_twice);
        assert_ne!(a, b);
        assert_eq!(identity_hash(&a), identity_hash(&b));
    }

    #[test]
    fn different_receivers_differ() {
        let c1 = Rc::new(Counter { hits: Cell::new(0) });
        let c2 = Rc::new(Counter { hits: Cell::new(0) });
        let a = Action::bound(&c1, Counter::bump);
        let b = Action::bound(&c2, Counter::bump);
        assert_ne!(a, b);
        // Two live allocations cannot share an address.
        assert_ne!(a.identity().receiver(), b.identity().receiver());
        assert_ne!(identity_hash(&a), identity_hash(&b));
    }

    #[test]
    fn free_functions_hash_by_function() {
        let a = Action::from_fn(noop);
        let b = Action::from_fn(noop);
        assert_eq!(a, b);
        assert!(!a.is_bound());
        assert_eq!(identity_hash(&a), fold(noop as fn() as usize));
    }

    #[test]
    fn shared_closure_identity_follows_the_rc() {
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let f: Rc<dyn Fn()> = Rc::new(move || h.set(h.get() + 1));
        let a = Action::shared(Rc::clone(&f));
        let b = Action::shared(f);
        assert_eq!(a, b);
        a.call();
        b.call();
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn bound_call_reaches_receiver() {
        let c = Rc::new(Counter { hits: Cell::new(0) });
        let a = Action::bound(&c, Counter::bump_twice);
        a.call();
        assert_eq!(c.hits.get(), 2);
    }

    #[test]
    fn event_handler_amends_record() {
        fn add_one(e: &mut u32) {
            *e += 1;
        }
        let h = EventHandler::<u32>::from_fn(add_one);
        let mut e = 41;
        h.call(&mut e);
        assert_eq!(e, 42);
        assert_eq!(h, EventHandler::<u32>::from_fn(add_one));
    }

    #[test]
    fn fold_mixes_high_bits() {
        assert_eq!(fold(0x10), 0x10);
        #[cfg(target_pointer_width = "64")]
        assert_eq!(fold(0x0000_0001_0000_0010usize), 0x11);
    }
}
