//! dense-multicast: a dense, prime-sized hash set keyed by caller-supplied
//! hashes, and the callback registries built on it.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: store unique subscriber callbacks with O(1) average
//!   subscribe/unsubscribe, packed storage for fast invocation, and a hard
//!   stop on mutating a set while it is being walked.
//! - Layers:
//!   - `prime`: capacity sizing (smallest prime >= request, >= 2).
//!   - `DenseHashSet<T>`: bucket array + dense entry array with per-bucket
//!     back-linked chains; the set never hashes values itself.
//!   - `identity`: `Callback<F>` (function optionally bound to an `Rc`
//!     receiver) and its 32-bit identity hash.
//!   - `Multicast` / `EventBus<E>`: subscriber lists over the set; `EventBuses`
//!     hands out one bus per event type.
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync`; no atomics, no locks.
//! - Live entries occupy `[0, len)`; removal moves the last entry into the
//!   hole, so storage order is insertion order only until the first removal.
//! - Capacity only grows: when full, the next prime >= 2x.
//! - Duplicate inserts fail; removing an absent value is a no-op.
//!
//! Enumeration guard
//! - `DenseHashSet::enumerate` raises a flag until the enumerator is
//!   exhausted or dropped. While it is raised `insert`/`remove` return
//!   `SetError::ConcurrentModification`, and so does a second `enumerate`.
//! - Handlers run while the guard is up, so a handler that subscribes or
//!   unsubscribes on the list invoking it gets that error back and the
//!   current pass still reaches every handler.
//! - The guard is a reentrancy check, not a lock.
//!
//! Reentrancy policy and interior mutability
//! - All operations take `&self`; storage sits in a `RefCell`. The only user
//!   code run while storage is mutably borrowed is `T: PartialEq`; a
//!   mutation attempted from there fails with `ConcurrentModification`.
//! - `remove` hands the removed value back after the borrow is released,
//!   so its `Drop` may reenter safely.
//!
//! Identity
//! - A bound callback's identity is its receiver's `Rc` address plus the
//!   method address; the callback keeps the receiver alive, so the address
//!   cannot be reused while subscribed. Free functions hash by their own
//!   address.
//!
//! Notes and non-goals
//! - No shrinking, no persistence, no thread safety.
//! - Corruption (a chain longer than the capacity) is reported as
//!   `SetError::Corruption`; `SetError::is_fatal` marks it as an assertion
//!   failure rather than a recoverable condition.

pub mod dense_hash_set;
mod dense_hash_set_proptest;
pub mod error;
pub mod event_bus;
mod guard;
pub mod identity;
pub mod multicast;
pub mod prime;
pub mod view;

// Public surface
pub use dense_hash_set::{DenseHashSet, Enumerator};
pub use error::SetError;
pub use event_bus::{BusEvent, EventBus, EventBuses};
pub use identity::{identity_hash, Action, Callback, EventHandler, Identity};
pub use multicast::Multicast;
pub use view::CollectionView;
