// EventBus and EventBuses integration tests.
use dense_multicast::{BusEvent, EventBus, EventBuses, EventHandler, SetError};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Debug, Default, PartialEq)]
struct Scored {
    points: u32,
    notes: Vec<&'static str>,
}
impl BusEvent for Scored {}

struct Multiplier {
    factor: u32,
}

impl Multiplier {
    fn apply(&self, e: &mut Scored) {
        e.points *= self.factor;
        e.notes.push("multiplied");
    }
}

fn base_points(e: &mut Scored) {
    e.points += 10;
    e.notes.push("base");
}

// Test: raise passes one record through every handler in order.
// Verifies: later handlers see earlier amendments.
#[test]
fn raise_threads_record_through_handlers() {
    let bus = EventBus::<Scored>::new();
    let m = Rc::new(Multiplier { factor: 3 });
    bus.subscribe(EventHandler::<Scored>::from_fn(base_points)).unwrap();
    bus.subscribe(EventHandler::<Scored>::bound(&m, Multiplier::apply)).unwrap();
    let mut e = Scored::default();
    bus.raise(&mut e).unwrap();
    assert_eq!(e.points, 30);
    assert_eq!(e.notes, vec!["base", "multiplied"]);
}

// Test: unsubscribe with a rebuilt handler and duplicate rejection.
#[test]
fn subscribe_contract_matches_multicast() {
    let bus = EventBus::<Scored>::new();
    let m = Rc::new(Multiplier { factor: 2 });
    bus.subscribe(EventHandler::<Scored>::bound(&m, Multiplier::apply)).unwrap();
    assert_eq!(
        bus.subscribe(EventHandler::<Scored>::bound(&m, Multiplier::apply)),
        Err(SetError::DuplicateValue)
    );
    assert!(bus.is_subscribed(&EventHandler::<Scored>::bound(&m, Multiplier::apply)).unwrap());
    assert!(bus.unsubscribe(&EventHandler::<Scored>::bound(&m, Multiplier::apply)).unwrap());
    assert!(!bus.unsubscribe(&EventHandler::<Scored>::bound(&m, Multiplier::apply)).unwrap());
    assert!(bus.is_empty());
}

// Test: handler mutating its own bus during raise.
// Verifies: ConcurrentModification; remaining handlers still run.
#[test]
fn unsubscribe_from_handler_during_raise_fails() {
    struct Quitter {
        buses: Rc<EventBuses>,
        outcome: RefCell<Option<Result<bool, SetError>>>,
    }
    impl Quitter {
        fn on_scored(&self, e: &mut Scored) {
            e.notes.push("quitter");
            let bus = self.buses.bus::<Scored>();
            let me = bus
                .snapshot()
                .into_iter()
                .find(|h| h.identity().receiver() == Some(self as *const Self as usize));
            if let Some(me) = me {
                *self.outcome.borrow_mut() = Some(bus.unsubscribe(&me));
            }
        }
    }

    let buses = Rc::new(EventBuses::new());
    let q = Rc::new(Quitter {
        buses: Rc::clone(&buses),
        outcome: RefCell::new(None),
    });
    let bus = buses.bus::<Scored>();
    bus.subscribe(EventHandler::<Scored>::bound(&q, Quitter::on_scored)).unwrap();
    bus.subscribe(EventHandler::<Scored>::from_fn(base_points)).unwrap();

    let mut e = Scored::default();
    bus.raise(&mut e).unwrap();
    assert_eq!(e.notes, vec!["quitter", "base"]);
    assert_eq!(
        *q.outcome.borrow(),
        Some(Err(SetError::ConcurrentModification))
    );
    assert_eq!(bus.len(), 2);
    bus.unsubscribe(&EventHandler::<Scored>::bound(&q, Quitter::on_scored)).unwrap();
}

// Test: the registry hands out one lazily created bus per type.
#[test]
fn registry_is_lazy_and_per_type() {
    struct Tick;
    impl BusEvent for Tick {}

    let buses = EventBuses::new();
    assert!(buses.is_empty());
    let calls = Rc::new(Cell::new(0));
    let c = Rc::clone(&calls);
    let handler: Rc<dyn Fn(&mut Tick)> = Rc::new(move |_: &mut Tick| c.set(c.get() + 1));
    buses
        .bus::<Tick>()
        .subscribe(EventHandler::<Tick>::shared(handler))
        .unwrap();
    buses.bus::<Tick>().raise(&mut Tick).unwrap();
    assert_eq!(calls.get(), 1);
    assert_eq!(buses.len(), 1);
    assert!(buses.get::<Scored>().is_none());
    assert_eq!(buses.bus::<Scored>().len(), 0);
    assert_eq!(buses.len(), 2);
}
