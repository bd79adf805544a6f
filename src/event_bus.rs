//! EventBus: payload-carrying subscriber list, one per event type, and the
//! registry that hands out those buses.

use crate::dense_hash_set::DenseHashSet;
use crate::error::SetError;
use crate::identity::{identity_hash, EventHandler};
use crate::prime::{DEFAULT_CAPACITY, MAX_CAPACITY};
use crate::view::{self, CollectionView};
use core::any::{type_name, Any, TypeId};
use core::cell::RefCell;
use core::fmt;
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::{debug, trace};

/// Marker for event record types carried by an [`EventBus`].
pub trait BusEvent: 'static {}

/// Set of [`EventHandler`]s for one event record type.
///
/// `raise` passes the same record by `&mut` to each handler in storage
/// order, so later handlers observe amendments made by earlier ones.
pub struct EventBus<E: BusEvent> {
    handlers: DenseHashSet<EventHandler<E>>,
}

impl<E: BusEvent> EventBus<E> {
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

    pub fn subscribe(&self, handler: EventHandler<E>) -> Result<(), SetError> {
        let hash = identity_hash(&handler);
        self.handlers.insert(handler, hash)
    }

    /// Returns whether a matching handler was subscribed.
    pub fn unsubscribe(&self, handler: &EventHandler<E>) -> Result<bool, SetError> {
        Ok(self
            .handlers
            .remove(handler, identity_hash(handler))?
            .is_some())
    }

    pub fn is_subscribed(&self, handler: &EventHandler<E>) -> Result<bool, SetError> {
        self.handlers.contains(handler, identity_hash(handler))
    }

    /// Deliver `event` to every handler. Fails with `ConcurrentModification`
    /// if called from inside one of this bus's handlers.
    pub fn raise(&self, event: &mut E) -> Result<(), SetError> {
        let handlers = self.handlers.enumerate()?;
        trace!(
            event = type_name::<E>(),
            handlers = handlers.len(),
            "raising event"
        );
        for handler in handlers {
            handler.call(event);
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

    pub fn snapshot(&self) -> Vec<EventHandler<E>> {
        self.handlers.snapshot()
    }
}

impl<E: BusEvent> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: BusEvent> CollectionView for EventBus<E> {
    type Item = EventHandler<E>;

    fn len(&self) -> usize {
        EventBus::len(self)
    }

    fn capacity(&self) -> usize {
        EventBus::capacity(self)
    }

    fn snapshot(&self) -> Vec<EventHandler<E>> {
        EventBus::snapshot(self)
    }
}

impl<E: BusEvent> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        view::fmt_collection(f, "EventBus", self)
    }
}

/// One lazily created [`EventBus`] per event type.
///
/// Owned by the application context and passed to whoever needs a bus,
/// which keeps creation order explicit and lets tests use isolated
/// registries.
pub struct EventBuses {
    buses: RefCell<HashMap<TypeId, Rc<dyn Any>>>,
    bus_capacity: usize,
}

impl EventBuses {
    pub fn new() -> Self {
        Self {
            buses: RefCell::new(HashMap::new()),
            bus_capacity: DEFAULT_CAPACITY,
        }
    }

    /// Registry whose buses start with capacity request `requested`.
    pub fn with_bus_capacity(requested: usize) -> Result<Self, SetError> {
        if requested > MAX_CAPACITY {
            return Err(SetError::InvalidArgument(
                "bus capacity exceeds MAX_CAPACITY",
            ));
        }
        Ok(Self {
            buses: RefCell::new(HashMap::new()),
            bus_capacity: requested,
        })
    }

    /// The bus for `E`, created on first access.
    pub fn bus<E: BusEvent>(&self) -> Rc<EventBus<E>> {
        let any = {
            let mut buses = self.buses.borrow_mut();
            let entry = buses.entry(TypeId::of::<E>()).or_insert_with(|| {
                debug!(event = type_name::<E>(), "creating event bus");
                Rc::new(EventBus::<E>::with_capacity(self.bus_capacity)) as Rc<dyn Any>
            });
            Rc::clone(entry)
        };
        any.downcast::<EventBus<E>>()
            .expect("bus is stored under its own event type id")
    }

    /// The bus for `E` if it has been created.
    pub fn get<E: BusEvent>(&self) -> Option<Rc<EventBus<E>>> {
        let any = self.buses.borrow().get(&TypeId::of::<E>()).cloned()?;
        any.downcast::<EventBus<E>>().ok()
    }

    /// Number of buses created so far.
    pub fn len(&self) -> usize {
        self.buses.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buses.borrow().is_empty()
    }
}

impl Default for EventBuses {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBuses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBuses")
            .field("buses", &self.len())
            .field("bus_capacity", &self.bus_capacity)
            .finish()
    }
}
